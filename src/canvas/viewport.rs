//! Viewport transform between screen space and world space.
//!
//! The viewport owns a pan offset (in screen pixels) and a zoom scale:
//!
//! ```text
//! screen = world * scale + offset
//! world  = (screen - offset) / scale
//! ```
//!
//! Every zoom operation is anchored: the world point under the anchor screen
//! point stays under it after the scale changes.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

use crate::models::GridPosition;
use crate::{Error, Result};

/// 2D point/vector, used for both screen and world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate the distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Point halfway between `self` and `other`
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Round to the integer grid used by persistence.
    pub fn round(&self) -> GridPosition {
        GridPosition::new(self.x.round() as i64, self.y.round() as i64)
    }
}

impl From<GridPosition> for Point {
    fn from(p: GridPosition) -> Self {
        Point::new(p.x as f64, p.y as f64)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Size of a screen-space rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Allowed zoom range.
///
/// Different surfaces use different bounds (a board canvas allows 0.25-2.4,
/// embedded previews are tighter), so the range is configuration rather
/// than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    /// Validate and build a range.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min > max {
            return Err(Error::Config(format!(
                "scale bounds must satisfy 0 < min <= max, got {}..{}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Clamp a scale into the range
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min, self.max)
    }
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self {
            min: 0.25,
            max: 2.4,
        }
    }
}

/// Pan offset and zoom scale of the visible canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Screen-space position of the world origin
    pub offset: Point,
    /// Zoom level (1.0 = 100%)
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Point::default(),
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport at the given offset and scale
    pub fn new(offset_x: f64, offset_y: f64, scale: f64) -> Self {
        Self {
            offset: Point::new(offset_x, offset_y),
            scale,
        }
    }

    /// Map a screen point into world space
    pub fn screen_to_world(&self, screen: Point) -> Point {
        (screen - self.offset) / self.scale
    }

    /// Map a world point into screen space
    pub fn world_to_screen(&self, world: Point) -> Point {
        world * self.scale + self.offset
    }

    /// Change the scale by `delta_scale`, keeping the world point under
    /// `screen` fixed.
    pub fn zoom_at(&mut self, screen: Point, delta_scale: f64, bounds: &ScaleBounds) {
        self.zoom_to(screen, self.scale + delta_scale, bounds);
    }

    /// Set the scale to `target` (clamped), keeping the world point under
    /// `screen` fixed.
    pub fn zoom_to(&mut self, screen: Point, target: f64, bounds: &ScaleBounds) {
        let world = self.screen_to_world(screen);
        let new_scale = bounds.clamp(target);
        self.offset = screen - world * new_scale;
        self.scale = new_scale;
    }

    /// Translate the canvas. Unclamped: the board is infinite.
    pub fn pan_by(&mut self, delta: Point) {
        self.offset = self.offset + delta;
    }

    /// Put `world` at the centre of a screen of the given size
    pub fn center_on(&mut self, world: Point, screen: Size) {
        let center = Point::new(screen.width / 2.0, screen.height / 2.0);
        self.offset = center - world * self.scale;
    }

    /// Back to `{0, 0, 1}`
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
