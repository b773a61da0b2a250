//! Screen-space geometry used throughout the zone model.
//!
//! All coordinates are `f64` with the origin at the top-left of the virtual
//! screen and y growing downwards, the same convention the window system
//! reports.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }

    pub fn distance_to(&self, other: Point) -> f64 { (self.x - other.x).hypot(self.y - other.y) }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The normalized coordinate space zones are authored in.
pub const UNIT_RECT: Rect = Rect { x: 0.0, y: 0.0, width: 1.0, height: 1.0 };

/// Slack allowed when comparing normalized coordinates that went through
/// float scaling.
pub const EPSILON: f64 = 1e-9;

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self { Self { x, y, width, height } }

    pub fn max_x(&self) -> f64 { self.x + self.width }

    pub fn max_y(&self) -> f64 { self.y + self.height }

    pub fn area(&self) -> f64 { self.width * self.height }

    pub fn is_empty(&self) -> bool { !(self.width > 0.0 && self.height > 0.0) }

    /// Closed containment: points on the edges count as inside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.max_x() && point.y >= self.y && point.y <= self.max_y()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.max_x() <= self.max_x() + EPSILON
            && other.max_y() <= self.max_y() + EPSILON
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Rect::new(x, y, max_x - x, max_y - y)
    }

    /// Shrinks the rectangle by the given amounts, never below zero size.
    pub fn inset(&self, top: f64, left: f64, bottom: f64, right: f64) -> Rect {
        Rect::new(
            self.x + left,
            self.y + top,
            (self.width - left - right).max(0.0),
            (self.height - top - bottom).max(0.0),
        )
    }

    /// Distance from `point` to the nearest point of this rectangle's
    /// outline. Zero when the point lies on an edge.
    pub fn distance_to_perimeter(&self, point: Point) -> f64 {
        if self.contains(point) {
            let to_left = point.x - self.x;
            let to_right = self.max_x() - point.x;
            let to_top = point.y - self.y;
            let to_bottom = self.max_y() - point.y;
            to_left.min(to_right).min(to_top).min(to_bottom)
        } else {
            let dx = (self.x - point.x).max(0.0).max(point.x - self.max_x());
            let dy = (self.y - point.y).max(0.0).max(point.y - self.max_y());
            dx.hypot(dy)
        }
    }

    /// Maps a rectangle expressed in unit coordinates onto `bounds`.
    pub fn scale_from_unit(&self, bounds: &Rect) -> Rect {
        Rect::new(
            bounds.x + bounds.width * self.x,
            bounds.y + bounds.height * self.y,
            bounds.width * self.width,
            bounds.height * self.height,
        )
    }

    /// Inverse of [`Rect::scale_from_unit`]. Returns `None` for degenerate
    /// bounds.
    pub fn normalize_within(&self, bounds: &Rect) -> Option<Rect> {
        if bounds.is_empty() {
            return None;
        }
        Some(Rect::new(
            (self.x - bounds.x) / bounds.width,
            (self.y - bounds.y) / bounds.height,
            self.width / bounds.width,
            self.height / bounds.height,
        ))
    }

    pub fn round(&self) -> Rect {
        let x = self.x.round();
        let y = self.y.round();
        Rect::new(x, y, (self.max_x().round() - x).max(0.0), (self.max_y().round() - y).max(0.0))
    }

    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}
