//! Snap point payloads stored in the spatial index.

use std::fmt;

use ductkit_core::SnapPointType;
use serde::{Deserialize, Serialize};

use crate::spatial_index::SpatialObject;

/// Identifier of a project geometry element (room, segment, equipment, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// What a snap candidate is and which element it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapPoint {
    pub kind: SnapPointType,
    pub element: ElementId,
}

impl SnapPoint {
    pub fn new(kind: SnapPointType, element: ElementId) -> Self {
        Self { kind, element }
    }
}

/// A snap candidate as stored in the index.
pub type SnapObject = SpatialObject<SnapPoint>;
