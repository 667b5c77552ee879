use ductkit_core::{Bounds2D, Point2D, SnapPointType, ViewTransform};
use ductkit_settings::SnapSettings;
use ductkit_snap::{
    ElementId, Resolution, SnapObject, SnapPoint, SnapResolver, SnapStrength, SpatialIndex,
};

fn index(points: &[(u64, SnapPointType, f64, f64)]) -> SpatialIndex<SnapPoint> {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 1000.0, 1000.0), 10, 8);
    for (id, kind, x, y) in points {
        assert!(index.insert(SnapObject::new(
            *id,
            Point2D::new(*x, *y),
            SnapPoint::new(*kind, ElementId(100 + *id)),
        )));
    }
    index
}

fn identity() -> ViewTransform {
    ViewTransform::identity()
}

#[test]
fn test_empty_index_returns_cursor() {
    let resolver = SnapResolver::default();
    let cursor = Point2D::new(500.0, 500.0);
    let resolution = resolver.resolve(&index(&[]), cursor, &identity());
    assert_eq!(resolution, Resolution::unsnapped(cursor));
    assert!(!resolution.is_snapped());
}

#[test]
fn test_type_priority_beats_distance_inside_snap_radius() {
    let idx = index(&[
        (1, SnapPointType::Corner, 501.0, 500.0),
        (2, SnapPointType::EquipmentPort, 508.0, 500.0),
    ]);
    let resolver = SnapResolver::default();
    let resolution = resolver.resolve(&idx, Point2D::new(500.0, 500.0), &identity());

    let snap = resolution.snap.expect("snapped");
    assert_eq!(snap.snap_point.id, 2);
    assert_eq!(snap.kind(), SnapPointType::EquipmentPort);
    assert_eq!(snap.strength, SnapStrength::Snap);
    assert_eq!(snap.distance, 8.0);
    assert_eq!(resolution.attracted_position, Point2D::new(508.0, 500.0));
}

#[test]
fn test_configured_priority_order_is_respected() {
    let idx = index(&[
        (1, SnapPointType::Corner, 501.0, 500.0),
        (2, SnapPointType::EquipmentPort, 508.0, 500.0),
    ]);
    let settings = SnapSettings {
        type_priority: vec![
            SnapPointType::Corner,
            SnapPointType::EquipmentPort,
            SnapPointType::Endpoint,
            SnapPointType::CenterlineMidpoint,
            SnapPointType::BranchPoint,
        ],
        ..SnapSettings::default()
    };
    let resolution = SnapResolver::new(&settings).resolve(&idx, Point2D::new(500.0, 500.0), &identity());
    assert_eq!(resolution.snap.map(|s| s.snap_point.id), Some(1));
}

#[test]
fn test_same_type_prefers_nearer_then_lower_id() {
    let idx = index(&[
        (5, SnapPointType::Endpoint, 504.0, 500.0),
        (3, SnapPointType::Endpoint, 496.0, 500.0),
        (9, SnapPointType::Endpoint, 502.0, 500.0),
    ]);
    let resolver = SnapResolver::default();
    let resolution = resolver.resolve(&idx, Point2D::new(500.0, 500.0), &identity());
    assert_eq!(resolution.snap.map(|s| s.snap_point.id), Some(9));

    let idx = index(&[
        (5, SnapPointType::Endpoint, 504.0, 500.0),
        (3, SnapPointType::Endpoint, 496.0, 500.0),
    ]);
    let resolution = resolver.resolve(&idx, Point2D::new(500.0, 500.0), &identity());
    assert_eq!(resolution.snap.map(|s| s.snap_point.id), Some(3));
}

#[test]
fn test_magnetic_picks_nearest_regardless_of_type() {
    let idx = index(&[
        (1, SnapPointType::EquipmentPort, 518.0, 500.0),
        (2, SnapPointType::BranchPoint, 500.0, 513.0),
    ]);
    let resolver = SnapResolver::default();
    let resolution = resolver.resolve(&idx, Point2D::new(500.0, 500.0), &identity());

    let snap = resolution.snap.expect("magnetic");
    assert_eq!(snap.strength, SnapStrength::Magnetic);
    assert_eq!(snap.snap_point.id, 2);
    assert_eq!(resolution.attracted_position, Point2D::new(500.0, 513.0));
}

#[test]
fn test_snap_candidate_wins_over_nearer_magnetic_type() {
    // A hard snap wins even with a higher-priority type in magnetic range.
    let idx = index(&[
        (1, SnapPointType::BranchPoint, 509.0, 500.0),
        (2, SnapPointType::EquipmentPort, 515.0, 500.0),
    ]);
    let resolution = SnapResolver::default().resolve(&idx, Point2D::new(500.0, 500.0), &identity());
    let snap = resolution.snap.expect("snapped");
    assert_eq!(snap.snap_point.id, 1);
    assert_eq!(snap.strength, SnapStrength::Snap);
}

#[test]
fn test_beyond_magnetic_radius_is_unsnapped() {
    let idx = index(&[(1, SnapPointType::Endpoint, 521.0, 500.0)]);
    let cursor = Point2D::new(500.0, 500.0);
    let resolution = SnapResolver::default().resolve(&idx, cursor, &identity());
    assert_eq!(resolution, Resolution::unsnapped(cursor));
}

#[test]
fn test_zoomed_out_view_widens_world_radius() {
    let idx = index(&[(1, SnapPointType::Corner, 530.0, 500.0)]);
    let cursor = Point2D::new(500.0, 500.0);

    // 30 world units is 15px at half zoom: magnetic, not snap.
    let half = ViewTransform::new(40.0, -20.0, 0.5);
    assert_eq!(
        SnapResolver::default().resolve(&idx, cursor, &half).strength(),
        Some(SnapStrength::Magnetic)
    );

    // At quarter zoom it is 7.5px: a hard snap.
    let quarter = ViewTransform::new(0.0, 0.0, 0.25);
    assert_eq!(
        SnapResolver::default().resolve(&idx, cursor, &quarter).strength(),
        Some(SnapStrength::Snap)
    );
}
