//! 2D geometry primitives in project (world) space.
//!
//! Coordinates follow the drawing's world convention: +X right, +Y up. A
//! [`Bounds2D`] is stored as origin plus extent; its `y` is the bottom edge.

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

/// A point in project space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    /// Squared Euclidean distance; used on query hot paths to skip the sqrt.
    pub fn distance_squared_to(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn midpoint(&self, other: &Point2D) -> Point2D {
        Point2D::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Rejects NaN and infinite coordinates.
    pub fn validate(&self) -> Result<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(GeometryError::NonFiniteCoordinate {
                x: self.x,
                y: self.y,
            })
        }
    }
}

/// Axis-aligned rectangle `{x, y, width, height}` with `width, height >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds2D {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds2D {
    /// Creates bounds, normalising a negative extent by moving the origin so
    /// the invariant `width >= 0 && height >= 0` always holds.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let (x, width) = if width < 0.0 { (x + width, -width) } else { (x, width) };
        let (y, height) = if height < 0.0 {
            (y + height, -height)
        } else {
            (y, height)
        };
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates bounds from two opposite corners in any order.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let min_x = x1.min(x2);
        let min_y = y1.min(y2);
        Self::new(min_x, min_y, x1.max(x2) - min_x, y1.max(y2) - min_y)
    }

    /// A square of side `2 * half_extent` centered on `center`.
    pub fn from_center(center: Point2D, half_extent: f64) -> Self {
        let half = half_extent.abs();
        Self::new(center.x - half, center.y - half, half * 2.0, half * 2.0)
    }

    /// Strict constructor for bounds coming from outside the engine.
    pub fn try_new(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        if !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite()) {
            return Err(GeometryError::InvalidBounds {
                width,
                height,
                reason: "coordinates must be finite".to_string(),
            });
        }
        if width < 0.0 || height < 0.0 {
            return Err(GeometryError::InvalidBounds {
                width,
                height,
                reason: "extent must not be negative".to_string(),
            });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Closed containment: points on the edges are inside.
    pub fn contains_point(&self, point: &Point2D) -> bool {
        point.x >= self.x && point.x <= self.max_x() && point.y >= self.y && point.y <= self.max_y()
    }

    pub fn contains_bounds(&self, other: &Bounds2D) -> bool {
        other.x >= self.x
            && other.max_x() <= self.max_x()
            && other.y >= self.y
            && other.max_y() <= self.max_y()
    }

    /// Closed intersection: touching edges count as intersecting.
    pub fn intersects(&self, other: &Bounds2D) -> bool {
        self.x <= other.max_x()
            && other.x <= self.max_x()
            && self.y <= other.max_y()
            && other.y <= self.max_y()
    }

    /// Splits into four equal quadrants ordered SW, SE, NW, NE, so that the
    /// index of a quadrant is `east as usize | (north as usize) << 1`.
    pub fn quadrants(&self) -> [Bounds2D; 4] {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        let mid_x = self.x + half_w;
        let mid_y = self.y + half_h;
        [
            Bounds2D::new(self.x, self.y, half_w, half_h),
            Bounds2D::new(mid_x, self.y, half_w, half_h),
            Bounds2D::new(self.x, mid_y, half_w, half_h),
            Bounds2D::new(mid_x, mid_y, half_w, half_h),
        ]
    }

    /// Smallest bounds containing every point, or `None` for an empty slice.
    pub fn enclosing(points: &[Point2D]) -> Option<Bounds2D> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Bounds2D::from_corners(min_x, min_y, max_x, max_y))
    }
}

/// Viewport transform supplied by the drawing UI each frame.
///
/// `x`/`y` are the screen-space offset of the world origin and `scale` is the
/// zoom factor (screen pixels per world unit).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl ViewTransform {
    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    /// Identity transform (no pan, 100% zoom).
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn is_valid(&self) -> bool {
        self.scale.is_finite() && self.scale > 0.0 && self.x.is_finite() && self.y.is_finite()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(GeometryError::InvalidScale { scale: self.scale })
        }
    }

    /// ```text
    /// world = (screen - offset) / scale
    /// ```
    pub fn screen_to_world(&self, screen: Point2D) -> Point2D {
        Point2D::new((screen.x - self.x) / self.scale, (screen.y - self.y) / self.scale)
    }

    pub fn world_to_screen(&self, world: Point2D) -> Point2D {
        Point2D::new(world.x * self.scale + self.x, world.y * self.scale + self.y)
    }

    /// Converts a screen-space pixel radius into a world-space radius.
    pub fn screen_radius_to_world(&self, pixels: f64) -> f64 {
        pixels / self.scale
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}
