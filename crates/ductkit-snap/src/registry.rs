//! Snap point registry.
//!
//! Owns the mapping from project geometry elements to the snap objects
//! derived from them and allocates their ids. The registry never touches the
//! spatial index: every change comes back as a list of [`BatchOperation`]s
//! that the caller routes through the mutation batcher.

use std::collections::BTreeMap;
use std::time::Duration;

use ductkit_core::{GeometryError, Point2D, SnapPointType};
use serde::{Deserialize, Serialize};

use crate::batcher::{BatchOperation, OperationTarget};
use crate::error::{Result, SnapError};
use crate::snap_point::{ElementId, SnapObject, SnapPoint};

/// Project geometry that produces snap points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryElement {
    /// Room outline; one corner snap per vertex
    Room { corners: Vec<Point2D> },
    /// Straight duct run; both ends and the midpoint
    DuctSegment { start: Point2D, end: Point2D },
    /// Polyline centerline; every vertex and every span midpoint
    Centerline { points: Vec<Point2D> },
    /// Equipment with connection ports
    Equipment { position: Point2D, ports: Vec<Point2D> },
    /// Junction where a branch leaves a trunk
    BranchPoint { position: Point2D },
}

impl GeometryElement {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Room { .. } => "room",
            Self::DuctSegment { .. } => "duct segment",
            Self::Centerline { .. } => "centerline",
            Self::Equipment { .. } => "equipment",
            Self::BranchPoint { .. } => "branch point",
        }
    }

    fn coordinates(&self) -> Vec<Point2D> {
        match self {
            Self::Room { corners } => corners.clone(),
            Self::DuctSegment { start, end } => vec![*start, *end],
            Self::Centerline { points } => points.clone(),
            Self::Equipment { position, ports } => {
                let mut all = vec![*position];
                all.extend_from_slice(ports);
                all
            }
            Self::BranchPoint { position } => vec![*position],
        }
    }

    /// Rejects geometry that cannot produce meaningful snap points.
    pub fn validate(&self) -> std::result::Result<(), GeometryError> {
        for point in self.coordinates() {
            point.validate()?;
        }

        match self {
            Self::Room { corners } => {
                if corners.len() < 3 {
                    return Err(GeometryError::degenerate(
                        self.name(),
                        format!("needs at least 3 corners, got {}", corners.len()),
                    ));
                }
                if polygon_area(corners).abs() <= f64::EPSILON {
                    return Err(GeometryError::degenerate(self.name(), "zero area"));
                }
            }
            Self::DuctSegment { start, end } => {
                if start == end {
                    return Err(GeometryError::degenerate(self.name(), "zero length"));
                }
            }
            Self::Centerline { points } => {
                if points.len() < 2 {
                    return Err(GeometryError::degenerate(
                        self.name(),
                        format!("needs at least 2 points, got {}", points.len()),
                    ));
                }
                if points.windows(2).any(|span| span[0] == span[1]) {
                    return Err(GeometryError::degenerate(
                        self.name(),
                        "contains a zero-length span",
                    ));
                }
            }
            Self::Equipment { .. } | Self::BranchPoint { .. } => {}
        }
        Ok(())
    }

    /// Snap points derived from this element, in a stable order.
    pub fn snap_points(&self) -> Vec<(SnapPointType, Point2D)> {
        match self {
            Self::Room { corners } => corners
                .iter()
                .map(|c| (SnapPointType::Corner, *c))
                .collect(),
            Self::DuctSegment { start, end } => vec![
                (SnapPointType::Endpoint, *start),
                (SnapPointType::Endpoint, *end),
                (SnapPointType::CenterlineMidpoint, start.midpoint(end)),
            ],
            Self::Centerline { points } => {
                let mut snaps: Vec<(SnapPointType, Point2D)> = points
                    .iter()
                    .map(|p| (SnapPointType::Endpoint, *p))
                    .collect();
                snaps.extend(
                    points
                        .windows(2)
                        .map(|span| (SnapPointType::CenterlineMidpoint, span[0].midpoint(&span[1]))),
                );
                snaps
            }
            Self::Equipment { ports, .. } => ports
                .iter()
                .map(|p| (SnapPointType::EquipmentPort, *p))
                .collect(),
            Self::BranchPoint { position } => vec![(SnapPointType::BranchPoint, *position)],
        }
    }
}

/// Shoelace formula; signed area of a closed polygon.
fn polygon_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice / 2.0
}

/// Read-only view of the registered geometry, pulled by the build pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    pub elements: Vec<(ElementId, GeometryElement)>,
}

impl GeometrySnapshot {
    pub fn centerlines(&self) -> impl Iterator<Item = (ElementId, &[Point2D])> {
        self.elements.iter().filter_map(|(id, element)| match element {
            GeometryElement::Centerline { points } => Some((*id, points.as_slice())),
            _ => None,
        })
    }

    pub fn branch_points(&self) -> impl Iterator<Item = (ElementId, Point2D)> + '_ {
        self.elements.iter().filter_map(|(id, element)| match element {
            GeometryElement::BranchPoint { position } => Some((*id, *position)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Debug, Clone)]
struct RegisteredElement {
    element: GeometryElement,
    objects: Vec<u64>,
}

/// Geometry element to snap object bookkeeping.
#[derive(Debug, Default)]
pub struct SnapPointRegistry {
    next_object_id: u64,
    elements: BTreeMap<ElementId, RegisteredElement>,
}

impl SnapPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces an element.
    ///
    /// When the element already exists and derives the same number of snap
    /// points, its objects are updated in place and keep their ids. Otherwise
    /// the old objects are removed and new ones added. Every change ends with
    /// a cache invalidation.
    pub fn upsert(
        &mut self,
        id: ElementId,
        element: GeometryElement,
        now: Duration,
    ) -> Result<Vec<BatchOperation>> {
        element.validate()?;
        let derived = element.snap_points();

        let mut operations = Vec::with_capacity(derived.len() * 2 + 1);
        let previous = self.elements.remove(&id);
        let objects = match previous {
            Some(old) if old.objects.len() == derived.len() => {
                for (object_id, (kind, position)) in old.objects.iter().zip(&derived) {
                    operations.push(BatchOperation::update(
                        Self::object(*object_id, *kind, *position, id),
                        now,
                    ));
                }
                old.objects
            }
            previous => {
                if let Some(old) = previous {
                    operations.extend(old.objects.iter().map(|oid| BatchOperation::remove(*oid, now)));
                }
                derived
                    .iter()
                    .map(|(kind, position)| {
                        let object_id = self.allocate_id();
                        operations.push(BatchOperation::add(
                            Self::object(object_id, *kind, *position, id),
                            now,
                        ));
                        object_id
                    })
                    .collect()
            }
        };

        tracing::debug!(
            "Registered {} {} with {} snap point(s)",
            element.name(),
            id,
            objects.len()
        );
        self.elements
            .insert(id, RegisteredElement { element, objects });
        operations.push(BatchOperation::invalidate(OperationTarget::Cache, now));
        Ok(operations)
    }

    /// Unregisters an element and removes its snap points.
    pub fn remove(&mut self, id: ElementId, now: Duration) -> Result<Vec<BatchOperation>> {
        let registered = self
            .elements
            .remove(&id)
            .ok_or(SnapError::UnknownElement(id))?;
        let mut operations: Vec<BatchOperation> = registered
            .objects
            .iter()
            .map(|oid| BatchOperation::remove(*oid, now))
            .collect();
        operations.push(BatchOperation::invalidate(OperationTarget::Cache, now));
        tracing::debug!("Unregistered {} {}", registered.element.name(), id);
        Ok(operations)
    }

    /// Unregisters everything.
    pub fn clear(&mut self, now: Duration) -> Vec<BatchOperation> {
        let mut operations: Vec<BatchOperation> = std::mem::take(&mut self.elements)
            .into_values()
            .flat_map(|registered| registered.objects)
            .map(|oid| BatchOperation::remove(oid, now))
            .collect();
        if !operations.is_empty() {
            operations.push(BatchOperation::invalidate(OperationTarget::Cache, now));
        }
        operations
    }

    pub fn get(&self, id: ElementId) -> Option<&GeometryElement> {
        self.elements.get(&id).map(|r| &r.element)
    }

    /// Ids of the snap objects derived from an element.
    pub fn object_ids(&self, id: ElementId) -> Option<&[u64]> {
        self.elements.get(&id).map(|r| r.objects.as_slice())
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Number of registered elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of snap points across all elements.
    pub fn point_count(&self) -> usize {
        self.elements.values().map(|r| r.objects.len()).sum()
    }

    pub fn snapshot(&self) -> GeometrySnapshot {
        GeometrySnapshot {
            elements: self
                .elements
                .iter()
                .map(|(id, r)| (*id, r.element.clone()))
                .collect(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_object_id;
        self.next_object_id += 1;
        id
    }

    fn object(object_id: u64, kind: SnapPointType, position: Point2D, element: ElementId) -> SnapObject {
        SnapObject::new(object_id, position, SnapPoint::new(kind, element))
    }
}
