//! Frame-window and rectangle overlap math
//!
//! Pure helpers with no state. Hit tests use strict inequality so
//! edge-touching rectangles never count as a hit.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, origin at top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle centered on a point
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self {
            x: center.x - size.x / 2.0,
            y: center.y - size.y / 2.0,
            w: size.x,
            h: size.y,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Strict AABB overlap test. Touching edges do not intersect.
pub fn rect_intersects(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && b.x < a.x + a.w && a.y < b.y + b.h && b.y < a.y + a.h
}

/// True iff `frame` lies within the inclusive window `[start, end]`
pub fn is_frame_in_window(frame: u32, start: u32, end: u32) -> bool {
    frame >= start && frame <= end
}

/// Combo-window membership. A missing window never matches.
pub fn is_frame_in_combo_window(frame: u32, window: Option<(u32, u32)>) -> bool {
    match window {
        Some((start, end)) => is_frame_in_window(frame, start, end),
        None => false,
    }
}
