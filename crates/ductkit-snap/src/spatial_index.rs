//! Spatial indexing for fast snap candidate lookup.
//!
//! Implements a point quadtree over [`SpatialObject`]s. Queries are answered
//! by visiting only the nodes whose bounds intersect the query region, so
//! region, radius and nearest-neighbour lookups stay sub-linear in the number
//! of indexed objects.
//!
//! Nodes split lazily: a leaf becomes four equal quadrants once it holds more
//! than `max_points` objects, is shallower than `max_depth` and is still
//! larger than `min_node_size` in both directions. Splits are never undone;
//! [`SpatialIndex::rebuild`] is the only way to compact the tree.
//!
//! Quadrant membership is half-open: a position exactly on a split line
//! belongs to the east and/or north child. Point objects therefore always
//! descend to a leaf. An object carrying its own bounds descends only while a
//! child contains those bounds entirely; otherwise it stays at the parent.
//!
//! Results of [`SpatialIndex::query`] and [`SpatialIndex::query_radius`] are
//! sorted by id, and [`SpatialIndex::find_nearest`] breaks distance ties
//! towards the lower id.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::mem;

use ductkit_core::{Bounds2D, Point2D};
use ductkit_settings::IndexSettings;

/// An indexed object: a position, optional extent and caller payload.
///
/// Identity is by `id`; two objects with the same id are the same entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialObject<T> {
    pub id: u64,
    pub position: Point2D,
    pub bounds: Option<Bounds2D>,
    pub payload: T,
}

impl<T> SpatialObject<T> {
    /// Creates a point object with no extent.
    pub fn new(id: u64, position: Point2D, payload: T) -> Self {
        Self {
            id,
            position,
            bounds: None,
            payload,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds2D) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Statistics about the index structure.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpatialIndexStats {
    pub total_objects: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    /// Depth of the deepest node (the root is depth 0)
    pub max_depth: usize,
    /// Estimated heap footprint of nodes and objects in bytes
    pub memory_usage: usize,
}

struct QuadNode<T> {
    bounds: Bounds2D,
    depth: usize,
    objects: Vec<SpatialObject<T>>,
    children: Option<Box<[QuadNode<T>; 4]>>,
}

impl<T> QuadNode<T> {
    fn new(bounds: Bounds2D, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            objects: Vec::new(),
            children: None,
        }
    }

    /// Index of the child quadrant that owns `point` (SW, SE, NW, NE).
    fn quadrant_of(&self, point: &Point2D) -> usize {
        let center = self.bounds.center();
        let east = point.x >= center.x;
        let north = point.y >= center.y;
        east as usize | (north as usize) << 1
    }

    /// The child that should hold `obj`, if it fits entirely in one.
    ///
    /// Halving can round a child's max edge below its parent's, so a point
    /// on the parent's max edge may fit no child and stays at the parent.
    fn child_for(&self, obj: &SpatialObject<T>) -> Option<usize> {
        let children = self.children.as_ref()?;
        let quadrant = self.quadrant_of(&obj.position);
        let child = &children[quadrant].bounds;
        if !child.contains_point(&obj.position) {
            return None;
        }
        match &obj.bounds {
            Some(extent) if !child.contains_bounds(extent) => None,
            _ => Some(quadrant),
        }
    }

    fn insert(&mut self, obj: SpatialObject<T>, params: &SplitParams) {
        if let Some(quadrant) = self.child_for(&obj) {
            if let Some(children) = self.children.as_mut() {
                children[quadrant].insert(obj, params);
                return;
            }
        }

        self.objects.push(obj);
        if self.children.is_none() && params.should_split(self) {
            self.subdivide(params);
        }
    }

    fn subdivide(&mut self, params: &SplitParams) {
        let depth = self.depth + 1;
        let [sw, se, nw, ne] = self.bounds.quadrants();
        self.children = Some(Box::new([
            QuadNode::new(sw, depth),
            QuadNode::new(se, depth),
            QuadNode::new(nw, depth),
            QuadNode::new(ne, depth),
        ]));
        tracing::trace!(
            "Subdivided node at depth {} holding {} objects",
            self.depth,
            self.objects.len()
        );

        for obj in mem::take(&mut self.objects) {
            self.insert(obj, params);
        }
    }

    /// Removes `id`, following the quadrant path of `position`.
    fn remove(&mut self, id: u64, position: &Point2D) -> Option<SpatialObject<T>> {
        if let Some(pos) = self.objects.iter().position(|o| o.id == id) {
            return Some(self.objects.remove(pos));
        }
        let quadrant = self.quadrant_of(position);
        self.children.as_mut()?[quadrant].remove(id, position)
    }

    /// Removes `id` wherever it is, scanning every node.
    fn remove_anywhere(&mut self, id: u64) -> Option<SpatialObject<T>> {
        if let Some(pos) = self.objects.iter().position(|o| o.id == id) {
            return Some(self.objects.remove(pos));
        }
        self.children
            .as_mut()?
            .iter_mut()
            .find_map(|child| child.remove_anywhere(id))
    }

    fn find(&self, id: u64, position: &Point2D) -> Option<&SpatialObject<T>> {
        if let Some(obj) = self.objects.iter().find(|o| o.id == id) {
            return Some(obj);
        }
        let quadrant = self.quadrant_of(position);
        self.children.as_ref()?[quadrant].find(id, position)
    }

    fn query<'a>(&'a self, region: &Bounds2D, out: &mut Vec<&'a SpatialObject<T>>) {
        out.extend(
            self.objects
                .iter()
                .filter(|o| region.contains_point(&o.position)),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.bounds.intersects(region) {
                    child.query(region, out);
                }
            }
        }
    }

    fn drain_into(&mut self, out: &mut Vec<SpatialObject<T>>) {
        out.append(&mut self.objects);
        if let Some(children) = self.children.take() {
            for mut child in *children {
                child.drain_into(out);
            }
        }
    }

    fn collect_stats(&self, stats: &mut SpatialIndexStats) {
        stats.node_count += 1;
        stats.total_objects += self.objects.len();
        stats.max_depth = stats.max_depth.max(self.depth);
        match &self.children {
            Some(children) => children.iter().for_each(|c| c.collect_stats(stats)),
            None => stats.leaf_count += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitParams {
    max_points: usize,
    max_depth: usize,
    min_node_size: f64,
}

impl SplitParams {
    fn should_split<T>(&self, node: &QuadNode<T>) -> bool {
        node.objects.len() > self.max_points
            && node.depth < self.max_depth
            && node.bounds.width > self.min_node_size
            && node.bounds.height > self.min_node_size
    }
}

/// Quadtree spatial index.
pub struct SpatialIndex<T> {
    root: QuadNode<T>,
    params: SplitParams,
    locations: HashMap<u64, Point2D>,
}

impl<T> SpatialIndex<T> {
    /// Default smallest splittable node, in world units.
    pub const DEFAULT_MIN_NODE_SIZE: f64 = 1.0;

    /// Creates an empty index over `bounds`.
    pub fn new(bounds: Bounds2D, max_points: usize, max_depth: usize) -> Self {
        Self {
            root: QuadNode::new(bounds, 0),
            params: SplitParams {
                max_points: max_points.max(1),
                max_depth,
                min_node_size: Self::DEFAULT_MIN_NODE_SIZE,
            },
            locations: HashMap::new(),
        }
    }

    pub fn with_min_node_size(mut self, min_node_size: f64) -> Self {
        self.params.min_node_size = min_node_size;
        self
    }

    /// Creates an index using configured subdivision parameters.
    pub fn from_settings(bounds: Bounds2D, settings: &IndexSettings) -> Self {
        Self::new(bounds, settings.max_points, settings.max_depth)
            .with_min_node_size(settings.min_node_size)
    }

    /// Root bounds.
    pub fn bounds(&self) -> Bounds2D {
        self.root.bounds
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.locations.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&SpatialObject<T>> {
        let position = self.locations.get(&id)?;
        self.root.find(id, position)
    }

    /// Inserts an object. Returns false, leaving the index untouched, if its
    /// position lies outside the root bounds.
    ///
    /// Inserting an id that is already indexed replaces the old object.
    pub fn insert(&mut self, obj: SpatialObject<T>) -> bool {
        if !self.root.bounds.contains_point(&obj.position) {
            return false;
        }
        if self.locations.contains_key(&obj.id) {
            self.remove(obj.id);
        }
        self.locations.insert(obj.id, obj.position);
        self.root.insert(obj, &self.params);
        true
    }

    /// Removes an object by id. Returns true if it was indexed.
    pub fn remove(&mut self, id: u64) -> bool {
        self.take(id).is_some()
    }

    /// Removes an object by id and hands it back.
    pub fn take(&mut self, id: u64) -> Option<SpatialObject<T>> {
        let position = self.locations.remove(&id)?;
        self.root
            .remove(id, &position)
            .or_else(|| self.root.remove_anywhere(id))
    }

    /// All objects whose position lies within `region` (edges included).
    pub fn query(&self, region: &Bounds2D) -> Vec<&SpatialObject<T>> {
        let mut found = Vec::new();
        if self.root.bounds.intersects(region) {
            self.root.query(region, &mut found);
        }
        found.sort_unstable_by_key(|o| o.id);
        found
    }

    /// All objects within Euclidean distance `radius` of `center`.
    pub fn query_radius(&self, center: Point2D, radius: f64) -> Vec<&SpatialObject<T>> {
        if radius.is_nan() || radius < 0.0 || !center.is_finite() {
            return Vec::new();
        }
        let limit = radius * radius;
        let square = Bounds2D::from_center(center, radius);
        // An infinite square has NaN max edges; the root covers everything.
        let region = if square.is_finite() {
            square
        } else {
            self.root.bounds
        };
        let mut found = self.query(&region);
        found.retain(|o| o.position.distance_squared_to(&center) <= limit);
        found
    }

    /// The object closest to `point`, searching within `max_distance` or, when
    /// unset, within the larger side of the root bounds.
    pub fn find_nearest(
        &self,
        point: Point2D,
        max_distance: Option<f64>,
    ) -> Option<&SpatialObject<T>> {
        let radius = max_distance
            .unwrap_or_else(|| self.root.bounds.width.max(self.root.bounds.height));
        self.query_radius(point, radius)
            .into_iter()
            .map(|o| (o.position.distance_squared_to(&point), o))
            .min_by(|(da, a), (db, b)| {
                da.partial_cmp(db)
                    .unwrap_or(Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            })
            .map(|(_, o)| o)
    }

    /// Iterates over every indexed object in tree order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            stack: vec![&self.root],
            current: Default::default(),
        }
    }

    /// Removes every object and collapses the tree to its root.
    pub fn clear(&mut self) {
        self.root = QuadNode::new(self.root.bounds, 0);
        self.locations.clear();
    }

    /// Reinserts every object into a fresh tree over the current root bounds.
    ///
    /// Returns the number of objects that no longer fit and were dropped.
    pub fn rebuild(&mut self) -> usize {
        let mut objects = Vec::with_capacity(self.locations.len());
        self.root.drain_into(&mut objects);
        self.clear();

        let total = objects.len();
        let mut rejected = 0;
        for obj in objects {
            if !self.insert(obj) {
                rejected += 1;
            }
        }

        if rejected > 0 {
            tracing::warn!(
                "Spatial index rebuild dropped {} of {} objects outside {:?}",
                rejected,
                total,
                self.root.bounds
            );
        } else {
            tracing::debug!("Spatial index rebuilt with {} objects", total);
        }
        rejected
    }

    /// Replaces the root bounds and rebuilds. Returns the number of objects
    /// that fell outside the new bounds.
    pub fn set_bounds(&mut self, bounds: Bounds2D) -> usize {
        self.root.bounds = bounds;
        self.rebuild()
    }

    pub fn stats(&self) -> SpatialIndexStats {
        let mut stats = SpatialIndexStats::default();
        self.root.collect_stats(&mut stats);
        stats.memory_usage = stats.node_count * mem::size_of::<QuadNode<T>>()
            + stats.total_objects * mem::size_of::<SpatialObject<T>>()
            + self.locations.len() * mem::size_of::<(u64, Point2D)>();
        stats
    }
}

impl<T> Default for SpatialIndex<T> {
    /// A large index suitable for building-scale drawings.
    fn default() -> Self {
        Self::new(Bounds2D::new(-100_000.0, -100_000.0, 200_000.0, 200_000.0), 10, 8)
    }
}

impl<T> fmt::Debug for SpatialIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("bounds", &self.root.bounds)
            .field("objects", &self.len())
            .finish()
    }
}

/// Depth-first iterator over indexed objects.
pub struct Iter<'a, T> {
    stack: Vec<&'a QuadNode<T>>,
    current: std::slice::Iter<'a, SpatialObject<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a SpatialObject<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(obj) = self.current.next() {
                return Some(obj);
            }
            let node = self.stack.pop()?;
            if let Some(children) = &node.children {
                self.stack.extend(children.iter());
            }
            self.current = node.objects.iter();
        }
    }
}

impl<'a, T> IntoIterator for &'a SpatialIndex<T> {
    type Item = &'a SpatialObject<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
