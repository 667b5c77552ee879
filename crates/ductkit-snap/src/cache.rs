//! Memoised snap resolutions.
//!
//! A pointer that stops moving keeps asking the same question; the cache
//! answers it without touching the index. Entries are keyed on the exact
//! cursor coordinates and view scale, evicted oldest-first, and the whole
//! cache is cleared whenever the index changes.

use std::collections::{HashMap, VecDeque};

use ductkit_core::{Point2D, ViewTransform};

use crate::resolver::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    x: u64,
    y: u64,
    scale: u64,
}

impl CacheKey {
    fn new(cursor: Point2D, view: &ViewTransform) -> Self {
        Self {
            x: cursor.x.to_bits(),
            y: cursor.y.to_bits(),
            scale: view.scale.to_bits(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapCache {
    capacity: usize,
    entries: HashMap<CacheKey, Resolution>,
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

impl SnapCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, cursor: Point2D, view: &ViewTransform) -> Option<Resolution> {
        if self.capacity == 0 {
            return None;
        }
        match self.entries.get(&CacheKey::new(cursor, view)) {
            Some(resolution) => {
                self.hits += 1;
                Some(resolution.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, cursor: Point2D, view: &ViewTransform, resolution: Resolution) {
        if self.capacity == 0 {
            return;
        }
        let key = CacheKey::new(cursor, view);
        if self.entries.insert(key, resolution).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Drops every entry. Hit and miss counts are kept.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::trace!("Snap cache cleared ({} entries)", self.entries.len());
        }
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Fraction of lookups served from the cache, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
