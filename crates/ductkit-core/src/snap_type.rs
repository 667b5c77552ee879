//! Semantic categories of snap points.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of snap point categories.
///
/// The resolver ranks candidates by a configurable order over these
/// categories; the enum itself carries no priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapPointType {
    /// Connection port on a piece of equipment (AHU, diffuser, fan)
    EquipmentPort,
    /// End of a duct segment or centerline vertex
    Endpoint,
    /// Room corner
    Corner,
    /// Midpoint of a centerline span
    CenterlineMidpoint,
    /// Junction where a branch leaves a trunk line
    BranchPoint,
}

impl SnapPointType {
    /// Every category, in the default priority order.
    pub const ALL: [SnapPointType; 5] = [
        SnapPointType::EquipmentPort,
        SnapPointType::Endpoint,
        SnapPointType::Corner,
        SnapPointType::CenterlineMidpoint,
        SnapPointType::BranchPoint,
    ];
}

impl fmt::Display for SnapPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EquipmentPort => write!(f, "equipment port"),
            Self::Endpoint => write!(f, "endpoint"),
            Self::Corner => write!(f, "corner"),
            Self::CenterlineMidpoint => write!(f, "centerline midpoint"),
            Self::BranchPoint => write!(f, "branch point"),
        }
    }
}
