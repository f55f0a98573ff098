//! Rail-based navigation
//!
//! The walkable area is a set of parallel horizontal lanes ("rails"), each
//! an X range with its own Y band. Rails are ordered by X and may overlap
//! at their seams to allow lane transitions. This is not a pathfinder: the
//! only queries are point-to-rail projection and a two-point segment test
//! against active barriers, so blocked movement is vetoed, not rerouted.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One walk lane, immutable per stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rail {
    /// Covered X range, `[x_start, x_end)`
    pub x_start: f32,
    pub x_end: f32,
    /// Vertical band of the lane
    pub top_y: f32,
    pub bottom_y: f32,
    /// Preferred resting Y for actors on this rail
    pub rest_y: f32,
}

impl Rail {
    pub fn contains_x(&self, x: f32) -> bool {
        x >= self.x_start && x < self.x_end
    }

    pub fn center_y(&self) -> f32 {
        (self.top_y + self.bottom_y) / 2.0
    }

    pub fn clamp_y(&self, y: f32) -> f32 {
        y.clamp(self.top_y, self.bottom_y)
    }
}

/// Transient movement blocker owned by an active encounter zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    pub x: f32,
    pub top_y: f32,
    pub bottom_y: f32,
    pub active: bool,
}

impl Barrier {
    /// True when a straight move from `from` to `to` crosses this barrier
    /// inside its Y band. The path Y is interpolated linearly at the
    /// barrier's X.
    pub fn blocks(&self, from: Vec2, to: Vec2) -> bool {
        if !self.active {
            return false;
        }
        let (min_x, max_x) = if from.x <= to.x {
            (from.x, to.x)
        } else {
            (to.x, from.x)
        };
        if self.x < min_x || self.x > max_x {
            return false;
        }
        let span = to.x - from.x;
        let y_at_barrier = if span.abs() < f32::EPSILON {
            from.y
        } else {
            let t = (self.x - from.x) / span;
            from.y + (to.y - from.y) * t
        };
        y_at_barrier >= self.top_y && y_at_barrier <= self.bottom_y
    }
}

/// Stage navigation data, built once from the ordered rail list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavMesh {
    rails: Vec<Rail>,
}

impl NavMesh {
    /// Rails must be ordered by X and cover every playable X position.
    /// Coverage holes are content bugs; see `validate`.
    pub fn new(rails: Vec<Rail>) -> Self {
        debug_assert!(!rails.is_empty());
        Self { rails }
    }

    pub fn rails(&self) -> &[Rail] {
        &self.rails
    }

    /// World X bounds spanned by the rail list
    pub fn x_bounds(&self) -> (f32, f32) {
        let first = self.rails.first().expect("nav mesh has no rails");
        let last = self.rails.last().expect("nav mesh has no rails");
        (first.x_start, last.x_end)
    }

    /// Rail occupied at (x, y). Among rails whose X range contains `x` the
    /// one with the vertical center closest to `y` wins, which settles
    /// overlapping seam segments. Outside all ranges the nearest edge rail
    /// is returned.
    pub fn rail_at(&self, x: f32, y: f32) -> &Rail {
        let mut best: Option<&Rail> = None;
        let mut best_dist = f32::MAX;
        for rail in &self.rails {
            if !rail.contains_x(x) {
                continue;
            }
            let dist = (rail.center_y() - y).abs();
            if dist < best_dist {
                best_dist = dist;
                best = Some(rail);
            }
        }
        best.unwrap_or_else(|| {
            // Off both ends: clamp to the closer edge rail
            let first = &self.rails[0];
            let last = &self.rails[self.rails.len() - 1];
            if x < first.x_start { first } else { last }
        })
    }

    /// Clamp a point into the walkable area: X into world bounds, then Y
    /// into the band of the rail found there
    pub fn project_to_nearest_rail(&self, x: f32, y: f32) -> Vec2 {
        let (min_x, max_x) = self.x_bounds();
        let cx = x.clamp(min_x, max_x);
        let rail = self.rail_at(cx, y);
        Vec2::new(cx, rail.clamp_y(y))
    }

    /// Two-point segment test against every active barrier
    pub fn is_path_blocked(&self, from: Vec2, to: Vec2, barriers: &[Barrier]) -> bool {
        barriers.iter().any(|b| b.blocks(from, to))
    }

    /// Content validation: every X in the spanned range must fall on at
    /// least one rail. Caught by tests, not at runtime.
    pub fn validate(&self) -> Result<(), String> {
        if self.rails.is_empty() {
            return Err("nav mesh has no rails".into());
        }
        for pair in self.rails.windows(2) {
            if pair[1].x_start > pair[0].x_end {
                return Err(format!(
                    "coverage hole between x={} and x={}",
                    pair[0].x_end, pair[1].x_start
                ));
            }
        }
        for rail in &self.rails {
            if rail.x_end <= rail.x_start || rail.bottom_y < rail.top_y {
                return Err(format!("degenerate rail: {rail:?}"));
            }
            if rail.rest_y < rail.top_y || rail.rest_y > rail.bottom_y {
                return Err(format!("rest_y outside band: {rail:?}"));
            }
        }
        Ok(())
    }
}
