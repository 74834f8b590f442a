//! Aim-to-impulse projection
//!
//! The aim line (origin through the touch point) is clipped against a box of
//! half-width `w` around the origin:
//! - steep lines (|slope| >= 1) exit through the top edge, y = origin.y + w
//! - shallow lines exit through the side the slope points to, x = origin.x ± w
//!
//! The impulse is the offset to that edge point divided by a damping constant,
//! so the launch strength never depends on how far away the player touched.

use glam::Vec2;

/// Projects aim points onto a fixed box around the launch origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryProjector {
    /// Half-width of the box around the origin
    pub half_width: f32,
    /// Divisor turning the box offset into an impulse
    pub damping: f32,
}

impl TrajectoryProjector {
    pub fn new(half_width: f32, damping: f32) -> Self {
        Self {
            half_width,
            damping,
        }
    }

    /// Point where the aim line leaves the box, `None` when aim == origin
    pub fn edge_point(&self, origin: Vec2, aim: Vec2) -> Option<Vec2> {
        project_to_box(origin, aim, self.half_width)
    }

    /// Launch impulse toward `aim`, `None` when aim == origin
    pub fn impulse(&self, origin: Vec2, aim: Vec2) -> Option<Vec2> {
        self.edge_point(origin, aim)
            .map(|edge| (edge - origin) / self.damping)
    }
}

/// Clip the line through `origin` and `aim` to a box of half-width `reach`
pub fn project_to_box(origin: Vec2, aim: Vec2, reach: f32) -> Option<Vec2> {
    let rise = aim.y - origin.y;
    let run = aim.x - origin.x;

    if rise == 0.0 && run == 0.0 {
        return None;
    }

    // Vertical line: slope is infinite, always the top edge
    if run == 0.0 {
        return Some(Vec2::new(origin.x, origin.y + reach));
    }

    let slope = rise / run;
    if slope.abs() >= 1.0 {
        // y = origin.y + reach, solve the line for x
        Some(Vec2::new(origin.x + reach / slope, origin.y + reach))
    } else {
        let side = if slope > 0.0 {
            1.0
        } else if slope < 0.0 {
            -1.0
        } else {
            run.signum()
        };
        let dx = reach * side;
        Some(Vec2::new(origin.x + dx, origin.y + slope * dx))
    }
}
