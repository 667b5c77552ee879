//! Error types for the snap engine.
//!
//! Spatial queries never fail: an out-of-bounds insert is a plain `false` and
//! an empty result is an empty `Vec` or `None`. [`SnapError`] covers the
//! boundaries around them: configuration at session construction, geometry
//! entering the registry and operations the batch processor cannot apply.

use ductkit_core::GeometryError;
use ductkit_settings::ConfigError;
use thiserror::Error;

use crate::batcher::{OperationKind, OperationTarget};
use crate::snap_point::ElementId;

/// Snap engine error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapError {
    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed project geometry
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A snap point lies outside the spatial index bounds
    #[error("Snap point {id} at ({x}, {y}) is outside the index bounds")]
    OutOfBounds { id: u64, x: f64, y: f64 },

    /// No geometry element is registered under this id
    #[error("Unknown geometry element {0}")]
    UnknownElement(ElementId),

    /// The processor has no meaning for this kind/target combination
    #[error("Unsupported operation: {kind} on {target}")]
    UnsupportedOperation {
        kind: OperationKind,
        target: OperationTarget,
    },
}

/// Result type using SnapError
pub type Result<T> = std::result::Result<T, SnapError>;
