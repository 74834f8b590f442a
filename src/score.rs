//! Score and reward tally
//!
//! The default scoring collaborator: one point per turn survived, a best
//! score that outlives the run, and a count of collected currency. The host
//! persists it on its own, like settings.

use serde::{Deserialize, Serialize};

use crate::sim::GameEvent;

/// Running score for one player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    /// Turns survived in the current run
    pub score: u32,
    /// Best score across runs
    pub best: u32,
    /// Currency collected across runs
    pub currency: u64,
    /// Set once the current run ended
    #[serde(skip)]
    pub finished: bool,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one game event; returns true if the best score changed
    pub fn record(&mut self, event: &GameEvent) -> bool {
        match *event {
            GameEvent::TurnStarted { turn } => {
                self.score = turn;
                if self.score > self.best {
                    self.best = self.score;
                    return true;
                }
            }
            GameEvent::CurrencyCollected { .. } => self.currency += 1,
            GameEvent::GameOver { turn } => {
                self.finished = true;
                log::info!("Run finished at turn {turn}, best {}", self.best);
            }
            GameEvent::BlockDestroyed { .. } | GameEvent::BallCollected { .. } => {}
        }
        false
    }

    /// Start a new run, keeping best score and currency
    pub fn reset_run(&mut self) {
        self.score = 0;
        self.finished = false;
    }
}
