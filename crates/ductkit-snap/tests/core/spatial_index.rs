use ductkit_core::{Bounds2D, Point2D};
use ductkit_settings::IndexSettings;
use ductkit_snap::spatial_index::{SpatialIndex, SpatialObject};

fn object(id: u64, x: f64, y: f64) -> SpatialObject<&'static str> {
    SpatialObject::new(id, Point2D::new(x, y), "payload")
}

fn ids(objects: &[&SpatialObject<&'static str>]) -> Vec<u64> {
    objects.iter().map(|o| o.id).collect()
}

#[test]
fn test_spatial_index_creation() {
    let index: SpatialIndex<()> = SpatialIndex::new(Bounds2D::new(-100.0, -100.0, 200.0, 200.0), 8, 16);
    let stats = index.stats();
    assert_eq!(stats.total_objects, 0);
    assert_eq!(stats.node_count, 1);
    assert_eq!(stats.leaf_count, 1);
    assert!(index.is_empty());
}

#[test]
fn test_spatial_index_from_settings() {
    let settings = IndexSettings {
        max_points: 2,
        max_depth: 1,
        min_node_size: 1.0,
    };
    let mut index = SpatialIndex::from_settings(Bounds2D::new(0.0, 0.0, 100.0, 100.0), &settings);
    for i in 0..20 {
        index.insert(object(i, 10.0, 10.0));
    }
    let stats = index.stats();
    assert_eq!(stats.max_depth, 1);
    assert_eq!(stats.node_count, 5);
}

#[test]
fn test_spatial_index_insert_and_query() {
    let mut index = SpatialIndex::new(Bounds2D::new(-100.0, -100.0, 200.0, 200.0), 8, 16);

    assert!(index.insert(object(0, 5.0, 5.0)));
    assert!(index.insert(object(1, 10.0, 10.0)));
    assert!(index.insert(object(2, -50.0, 80.0)));

    let results = index.query(&Bounds2D::new(7.0, 7.0, 5.0, 5.0));
    assert_eq!(ids(&results), vec![1]);

    // Edges are inclusive.
    let results = index.query(&Bounds2D::new(5.0, 5.0, 5.0, 5.0));
    assert_eq!(ids(&results), vec![0, 1]);
}

#[test]
fn test_spatial_index_query_disjoint_from_root() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 8, 16);
    index.insert(object(1, 50.0, 50.0));
    assert!(index.query(&Bounds2D::new(150.0, 150.0, 10.0, 10.0)).is_empty());
}

#[test]
fn test_spatial_index_query_matches_position_not_extent() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 8, 16);
    index.insert(object(1, 20.0, 20.0).with_bounds(Bounds2D::new(10.0, 10.0, 20.0, 20.0)));

    assert!(index.query(&Bounds2D::new(10.0, 10.0, 5.0, 5.0)).is_empty());
    assert_eq!(index.query(&Bounds2D::new(18.0, 18.0, 4.0, 4.0)).len(), 1);
}

#[test]
fn test_spatial_index_remove() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 2, 8);
    for i in 0..30 {
        index.insert(object(i, (i * 3) as f64, (i * 3) as f64));
    }

    assert!(index.remove(10));
    assert!(!index.remove(10));
    assert!(!index.remove(999));
    assert_eq!(index.len(), 29);
    assert!(!index.contains(10));
    assert!(index.get(10).is_none());
    assert!(!ids(&index.query(&index.bounds())).contains(&10));

    // Re-inserting makes it visible again.
    assert!(index.insert(object(10, 30.0, 30.0)));
    assert!(ids(&index.query(&index.bounds())).contains(&10));
}

#[test]
fn test_spatial_index_query_radius_exact() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 4, 8);
    index.insert(object(1, 53.0, 54.0)); // distance 5
    index.insert(object(2, 57.0, 57.0)); // in the square, distance ~9.9
    index.insert(object(3, 58.0, 58.0)); // in the square, distance ~11.3

    let found = index.query_radius(Point2D::new(50.0, 50.0), 10.0);
    assert_eq!(ids(&found), vec![1, 2]);
}

#[test]
fn test_spatial_index_find_nearest() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 4, 8);
    assert!(index.find_nearest(Point2D::new(50.0, 50.0), None).is_none());

    index.insert(object(1, 10.0, 10.0));
    index.insert(object(2, 60.0, 60.0));
    index.insert(object(3, 90.0, 90.0));

    let nearest = index.find_nearest(Point2D::new(55.0, 55.0), None);
    assert_eq!(nearest.map(|o| o.id), Some(2));

    assert!(index.find_nearest(Point2D::new(55.0, 55.0), Some(5.0)).is_none());
    let nearest = index.find_nearest(Point2D::new(55.0, 55.0), Some(7.5));
    assert_eq!(nearest.map(|o| o.id), Some(2));
}

#[test]
fn test_spatial_index_clear() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 2, 8);
    for i in 0..10 {
        index.insert(object(i, i as f64 * 9.0, 50.0));
    }
    assert!(index.stats().node_count > 1);

    index.clear();
    assert!(index.is_empty());
    assert!(index.query(&index.bounds()).is_empty());
    assert_eq!(index.stats().node_count, 1);
}

#[test]
fn test_spatial_index_stats() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 8, 16);

    for i in 0..20 {
        let v = (i as f64) * 5.0;
        index.insert(object(i, v, v));
    }

    let stats = index.stats();
    assert!(stats.node_count > 1);
    assert_eq!(stats.total_objects, 20);
    assert_eq!(stats.leaf_count % 3, 1);
    assert!(stats.memory_usage > 0);
}

#[test]
fn test_spatial_index_rebuild_compacts() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 4, 8);
    for i in 0..200 {
        index.insert(object(i, (i % 20) as f64 * 5.0, (i / 20) as f64 * 10.0));
    }
    let before = index.stats().node_count;
    for i in 10..200 {
        index.remove(i);
    }
    // Removal never merges nodes.
    assert_eq!(index.stats().node_count, before);

    assert_eq!(index.rebuild(), 0);
    assert!(index.stats().node_count < before);
    assert_eq!(index.len(), 10);
}

#[test]
fn test_spatial_index_set_bounds_drops_outsiders() {
    let mut index = SpatialIndex::new(Bounds2D::new(0.0, 0.0, 100.0, 100.0), 4, 8);
    index.insert(object(1, 10.0, 10.0));
    index.insert(object(2, 90.0, 90.0));

    assert_eq!(index.set_bounds(Bounds2D::new(0.0, 0.0, 50.0, 50.0)), 1);
    assert_eq!(index.len(), 1);
    assert!(index.contains(1));
    assert!(!index.contains(2));
}

#[test]
fn test_spatial_index_stress() {
    let mut index = SpatialIndex::new(Bounds2D::new(-10000.0, -10000.0, 20000.0, 20000.0), 8, 16);

    for i in 0..1000 {
        let x = ((i as f64) % 50.0) * 10.0;
        let y = ((i / 50) as f64) * 10.0;
        index.insert(object(i, x, y));
    }

    let stats = index.stats();
    assert_eq!(stats.total_objects, 1000);

    let results = index.query(&Bounds2D::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(results.len(), 11 * 11);
}

#[test]
fn test_spatial_index_large_coordinates() {
    let mut index: SpatialIndex<&'static str> = SpatialIndex::default();

    index.insert(object(1, 1005.0, 1005.0));
    let results = index.query_radius(Point2D::new(1005.0, 1005.0), 1.0);
    assert_eq!(ids(&results), vec![1]);

    index.insert(object(2, 50005.0, -49995.0));
    let results = index.query_radius(Point2D::new(50005.0, -49995.0), 1.0);
    assert_eq!(ids(&results), vec![2]);
}
