//! Error handling for DuctKit core types
//!
//! Geometry errors are raised at the boundary where project geometry enters
//! the snap engine. The spatial index itself assumes well-formed, finite input
//! and reports out-of-bounds inserts as a plain `false`, not as an error.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Represents malformed input geometry: non-finite coordinates, negative
/// extents and shapes too degenerate to produce snap points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A coordinate is NaN or infinite
    #[error("Non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate {
        /// The X component as supplied.
        x: f64,
        /// The Y component as supplied.
        y: f64,
    },

    /// Bounds have a negative or non-finite extent
    #[error("Invalid bounds {width}x{height}: {reason}")]
    InvalidBounds {
        /// The supplied width.
        width: f64,
        /// The supplied height.
        height: f64,
        /// Why the bounds were rejected.
        reason: String,
    },

    /// A geometry element cannot produce meaningful snap points
    #[error("Degenerate {element}: {reason}")]
    Degenerate {
        /// The kind of element, e.g. "room" or "duct segment".
        element: String,
        /// Why the element was rejected.
        reason: String,
    },

    /// A view transform with a non-positive or non-finite scale
    #[error("Invalid view scale {scale}")]
    InvalidScale {
        /// The rejected scale.
        scale: f64,
    },
}

impl GeometryError {
    /// Create a degenerate-geometry error
    pub fn degenerate(element: impl Into<String>, reason: impl Into<String>) -> Self {
        GeometryError::Degenerate {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error was caused by NaN or infinite input
    pub fn is_non_finite(&self) -> bool {
        matches!(self, GeometryError::NonFiniteCoordinate { .. })
    }
}

/// Result type using GeometryError
pub type Result<T> = std::result::Result<T, GeometryError>;
