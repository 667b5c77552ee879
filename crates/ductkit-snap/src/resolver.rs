//! Magnetic snap resolution.
//!
//! [`SnapResolver::resolve`] turns a cursor position into an attracted
//! position plus an optional typed [`SnapResult`]:
//!
//! 1. The pixel thresholds are converted into world radii by dividing by the
//!    view scale.
//! 2. The index is queried once with the (wider) magnetic radius.
//! 3. Candidates inside the snap radius are ranked by type priority, then by
//!    distance, then by id; the best one is a hard snap.
//! 4. Otherwise the nearest candidate inside the magnetic radius attracts the
//!    cursor weakly.
//! 5. With no candidate the cursor is returned unchanged.
//!
//! Resolution is a pure function of the index contents and its inputs.

use std::cmp::Ordering;
use std::collections::HashMap;

use ductkit_core::{Point2D, SnapPointType, ViewTransform};
use ductkit_settings::SnapSettings;

use crate::snap_point::{SnapObject, SnapPoint};
use crate::spatial_index::SpatialIndex;

/// How firmly a candidate holds the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapStrength {
    /// Within the snap threshold
    Snap,
    /// Within the magnetic threshold only
    Magnetic,
}

/// The selected candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    pub snap_point: SnapObject,
    /// World-space distance from the cursor
    pub distance: f64,
    pub strength: SnapStrength,
}

impl SnapResult {
    pub fn kind(&self) -> SnapPointType {
        self.snap_point.payload.kind
    }
}

/// Output of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub attracted_position: Point2D,
    pub snap: Option<SnapResult>,
}

impl Resolution {
    /// The cursor, unchanged, with nothing snapped.
    pub fn unsnapped(cursor: Point2D) -> Self {
        Self {
            attracted_position: cursor,
            snap: None,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snap.is_some()
    }

    pub fn strength(&self) -> Option<SnapStrength> {
        self.snap.as_ref().map(|s| s.strength)
    }
}

#[derive(Debug, Clone)]
pub struct SnapResolver {
    snap_threshold_px: f64,
    magnetic_threshold_px: f64,
    ranks: HashMap<SnapPointType, usize>,
}

impl SnapResolver {
    pub fn new(settings: &SnapSettings) -> Self {
        let ranks = settings
            .type_priority
            .iter()
            .enumerate()
            .map(|(rank, kind)| (*kind, rank))
            .collect();
        Self {
            snap_threshold_px: settings.snap_threshold_px,
            magnetic_threshold_px: settings.magnetic_threshold_px,
            ranks,
        }
    }

    pub fn snap_threshold_px(&self) -> f64 {
        self.snap_threshold_px
    }

    pub fn magnetic_threshold_px(&self) -> f64 {
        self.magnetic_threshold_px
    }

    /// Priority rank of a category; lower wins. Unlisted categories rank
    /// after every listed one, in declaration order.
    pub fn rank(&self, kind: SnapPointType) -> usize {
        self.ranks.get(&kind).copied().unwrap_or_else(|| {
            let fallback = SnapPointType::ALL
                .iter()
                .position(|k| *k == kind)
                .unwrap_or(SnapPointType::ALL.len());
            self.ranks.len() + fallback
        })
    }

    /// Resolves a world-space cursor against the index.
    pub fn resolve(
        &self,
        index: &SpatialIndex<SnapPoint>,
        cursor: Point2D,
        view: &ViewTransform,
    ) -> Resolution {
        if !view.is_valid() || !cursor.is_finite() {
            return Resolution::unsnapped(cursor);
        }

        let snap_radius = view.screen_radius_to_world(self.snap_threshold_px);
        let magnetic_radius = view.screen_radius_to_world(self.magnetic_threshold_px);
        let candidates: Vec<(f64, &SnapObject)> = index
            .query_radius(cursor, magnetic_radius.max(snap_radius))
            .into_iter()
            .map(|obj| (obj.position.distance_to(&cursor), obj))
            .collect();

        let hard = candidates
            .iter()
            .filter(|(distance, _)| *distance <= snap_radius)
            .min_by(|(da, a), (db, b)| {
                self.rank(a.payload.kind)
                    .cmp(&self.rank(b.payload.kind))
                    .then_with(|| by_distance_then_id(*da, a, *db, b))
            });

        let (distance, obj, strength) = match hard {
            Some((distance, obj)) => (*distance, *obj, SnapStrength::Snap),
            None => match candidates
                .iter()
                .min_by(|(da, a), (db, b)| by_distance_then_id(*da, a, *db, b))
            {
                Some((distance, obj)) => (*distance, *obj, SnapStrength::Magnetic),
                None => return Resolution::unsnapped(cursor),
            },
        };

        Resolution {
            attracted_position: obj.position,
            snap: Some(SnapResult {
                snap_point: obj.clone(),
                distance,
                strength,
            }),
        }
    }
}

fn by_distance_then_id(da: f64, a: &SnapObject, db: f64, b: &SnapObject) -> Ordering {
    da.partial_cmp(&db)
        .unwrap_or(Ordering::Equal)
        .then(a.id.cmp(&b.id))
}

impl Default for SnapResolver {
    fn default() -> Self {
        Self::new(&SnapSettings::default())
    }
}
