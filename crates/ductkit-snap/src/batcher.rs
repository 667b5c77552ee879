//! Batched, priority-ordered mutation processing.
//!
//! Producers enqueue [`BatchOperation`]s under a batch key. A key's queue is
//! flushed when it reaches the batch size (synchronously, inside
//! [`MutationBatcher::enqueue`]) or when the batch delay has elapsed since
//! the first unflushed operation, whichever comes first. A flush stable-sorts
//! the queue by priority and hands each operation to the registered
//! processor.
//!
//! Operations flushed while no processor is registered are dropped with a
//! warning and counted in [`BatchStats::dropped`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use ductkit_core::{ObserverList, SubscriptionId, TaskScheduler, TimerHandle};
use ductkit_settings::BatchSettings;

use crate::error::Result;
use crate::snap_point::SnapObject;

/// Batch key for snap point adds, removes and updates.
pub const SNAP_POINTS_KEY: &str = "snapPoints";
/// Batch key for cache invalidation.
pub const CACHE_KEY: &str = "cache";
/// Batch key for whole-index maintenance.
pub const SPATIAL_INDEX_KEY: &str = "spatialIndex";

/// Operation priorities; lower runs first within a batch.
pub mod priority {
    pub const REMOVE: i32 = 0;
    pub const UPDATE: i32 = 1;
    pub const ADD: i32 = 2;
    pub const INVALIDATE: i32 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Add,
    Remove,
    Update,
    Invalidate,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
            Self::Update => write!(f, "update"),
            Self::Invalidate => write!(f, "invalidate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationTarget {
    SnapPoint,
    Cache,
    SpatialIndex,
}

impl OperationTarget {
    /// The batch key operations on this target are queued under.
    pub fn batch_key(&self) -> &'static str {
        match self {
            Self::SnapPoint => SNAP_POINTS_KEY,
            Self::Cache => CACHE_KEY,
            Self::SpatialIndex => SPATIAL_INDEX_KEY,
        }
    }
}

impl fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SnapPoint => write!(f, "snap point"),
            Self::Cache => write!(f, "cache"),
            Self::SpatialIndex => write!(f, "spatial index"),
        }
    }
}

/// Operation payload.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationData {
    /// A complete snap object, for adds and updates
    Object(SnapObject),
    /// An object id, for removals
    Id(u64),
    None,
}

/// A deferred mutation, consumed once by the batcher.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperation {
    pub kind: OperationKind,
    pub target: OperationTarget,
    pub data: OperationData,
    /// Creation time on the session clock
    pub timestamp: Duration,
    /// Lower is more urgent
    pub priority: i32,
}

impl BatchOperation {
    pub fn new(
        kind: OperationKind,
        target: OperationTarget,
        data: OperationData,
        timestamp: Duration,
    ) -> Self {
        let priority = match kind {
            OperationKind::Remove => priority::REMOVE,
            OperationKind::Update => priority::UPDATE,
            OperationKind::Add => priority::ADD,
            OperationKind::Invalidate => priority::INVALIDATE,
        };
        Self {
            kind,
            target,
            data,
            timestamp,
            priority,
        }
    }

    pub fn add(object: SnapObject, timestamp: Duration) -> Self {
        Self::new(
            OperationKind::Add,
            OperationTarget::SnapPoint,
            OperationData::Object(object),
            timestamp,
        )
    }

    pub fn update(object: SnapObject, timestamp: Duration) -> Self {
        Self::new(
            OperationKind::Update,
            OperationTarget::SnapPoint,
            OperationData::Object(object),
            timestamp,
        )
    }

    pub fn remove(id: u64, timestamp: Duration) -> Self {
        Self::new(
            OperationKind::Remove,
            OperationTarget::SnapPoint,
            OperationData::Id(id),
            timestamp,
        )
    }

    pub fn invalidate(target: OperationTarget, timestamp: Duration) -> Self {
        Self::new(
            OperationKind::Invalidate,
            target,
            OperationData::None,
            timestamp,
        )
    }

    /// The snap object this operation acts on, if any.
    pub fn object_id(&self) -> Option<u64> {
        match (self.target, &self.data) {
            (OperationTarget::SnapPoint, OperationData::Object(obj)) => Some(obj.id),
            (OperationTarget::SnapPoint, OperationData::Id(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Applies one operation. Errors are logged and counted, never propagated.
pub type OperationProcessor = Box<dyn FnMut(&BatchOperation) -> Result<()>>;

/// Outcome of one flush, delivered to flush observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub key: String,
    pub applied: usize,
    pub failed: usize,
    pub dropped: usize,
    /// Operations replaced by a later one on the same snap object
    pub superseded: usize,
}

/// Cumulative counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchStats {
    pub flushes: u64,
    pub processed: u64,
    pub failed: u64,
    pub dropped: u64,
    pub superseded: u64,
}

#[derive(Default)]
struct BatchQueue {
    operations: Vec<BatchOperation>,
    timer: Option<TimerHandle>,
}

struct BatcherInner {
    timers: Rc<dyn TaskScheduler>,
    batch_size: Cell<usize>,
    batch_delay: Cell<Duration>,
    queues: RefCell<HashMap<String, BatchQueue>>,
    processor: RefCell<Option<OperationProcessor>>,
    flushing: Cell<bool>,
    stats: Cell<BatchStats>,
    observers: ObserverList<FlushReport>,
}

/// Per-key operation queues with size and delay triggered flushing.
///
/// Cloning yields another handle to the same batcher.
#[derive(Clone)]
pub struct MutationBatcher {
    inner: Rc<BatcherInner>,
}

impl MutationBatcher {
    pub fn new(timers: Rc<dyn TaskScheduler>, batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            inner: Rc::new(BatcherInner {
                timers,
                batch_size: Cell::new(batch_size.max(1)),
                batch_delay: Cell::new(batch_delay),
                queues: RefCell::new(HashMap::new()),
                processor: RefCell::new(None),
                flushing: Cell::new(false),
                stats: Cell::new(BatchStats::default()),
                observers: ObserverList::new(),
            }),
        }
    }

    pub fn from_settings(timers: Rc<dyn TaskScheduler>, settings: &BatchSettings) -> Self {
        Self::new(timers, settings.batch_size, settings.batch_delay())
    }

    /// Current time on the batcher's clock, for stamping operations.
    pub fn now(&self) -> Duration {
        self.inner.timers.now()
    }

    pub fn batch_size(&self) -> usize {
        self.inner.batch_size.get()
    }

    /// Sets the size trigger. Takes effect from the next enqueue.
    pub fn set_batch_size(&self, batch_size: usize) {
        self.inner.batch_size.set(batch_size.max(1));
    }

    pub fn batch_delay(&self) -> Duration {
        self.inner.batch_delay.get()
    }

    pub fn set_batch_delay(&self, delay: Duration) {
        self.inner.batch_delay.set(delay);
    }

    /// Registers the processor, replacing any previous one.
    ///
    /// Has no effect when called from inside the processor itself.
    pub fn set_processor<F>(&self, processor: F)
    where
        F: FnMut(&BatchOperation) -> Result<()> + 'static,
    {
        match self.inner.processor.try_borrow_mut() {
            Ok(mut slot) => *slot = Some(Box::new(processor)),
            Err(_) => tracing::warn!("Cannot replace the batch processor while it is running"),
        }
    }

    pub fn clear_processor(&self) {
        if let Ok(mut slot) = self.inner.processor.try_borrow_mut() {
            *slot = None;
        }
    }

    pub fn has_processor(&self) -> bool {
        self.inner
            .processor
            .try_borrow()
            .map(|slot| slot.is_some())
            .unwrap_or(true)
    }

    /// Queues an operation under `key`.
    pub fn enqueue(&self, key: &str, operation: BatchOperation) {
        let len = {
            let mut queues = self.inner.queues.borrow_mut();
            let queue = queues.entry(key.to_string()).or_default();
            queue.operations.push(operation);
            queue.operations.len()
        };

        if len >= self.inner.batch_size.get() {
            BatcherInner::flush(&self.inner, key);
        } else {
            BatcherInner::ensure_timer(&self.inner, key);
        }
    }

    /// Flushes one key now. Returns the number of operations taken off the
    /// queue, whether they were applied, failed or dropped.
    pub fn flush(&self, key: &str) -> usize {
        BatcherInner::flush(&self.inner, key)
    }

    /// Flushes every key that has queued operations.
    pub fn flush_all(&self) -> usize {
        let mut keys: Vec<String> = self
            .inner
            .queues
            .borrow()
            .iter()
            .filter(|(_, queue)| !queue.operations.is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys.iter()
            .map(|key| BatcherInner::flush(&self.inner, key))
            .sum()
    }

    pub fn pending(&self, key: &str) -> bool {
        self.pending_len(key) > 0
    }

    pub fn pending_len(&self, key: &str) -> usize {
        self.inner
            .queues
            .borrow()
            .get(key)
            .map_or(0, |queue| queue.operations.len())
    }

    pub fn total_pending(&self) -> usize {
        self.inner
            .queues
            .borrow()
            .values()
            .map(|queue| queue.operations.len())
            .sum()
    }

    /// Cancels every pending batch-delay timer. Queued operations stay
    /// queued until the next flush.
    pub fn cancel_timers(&self) -> usize {
        let mut queues = self.inner.queues.borrow_mut();
        queues
            .values_mut()
            .filter_map(|queue| queue.timer.take())
            .filter(|timer| self.inner.timers.cancel(*timer))
            .count()
    }

    pub fn stats(&self) -> BatchStats {
        self.inner.stats.get()
    }

    /// Registers an observer called after every flush.
    pub fn on_flush<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&FlushReport) + 'static,
    {
        self.inner.observers.subscribe(observer)
    }

    pub fn remove_flush_observer(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }
}

impl BatcherInner {
    fn ensure_timer(inner: &Rc<Self>, key: &str) {
        let needs_timer = inner
            .queues
            .borrow()
            .get(key)
            .is_some_and(|queue| queue.timer.is_none() && !queue.operations.is_empty());
        if !needs_timer {
            return;
        }

        let weak: Weak<Self> = Rc::downgrade(inner);
        let owned_key = key.to_string();
        let handle = inner.timers.schedule(
            inner.batch_delay.get(),
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    if let Some(queue) = inner.queues.borrow_mut().get_mut(&owned_key) {
                        queue.timer = None;
                    }
                    BatcherInner::flush(&inner, &owned_key);
                }
            }),
        );
        if let Some(queue) = inner.queues.borrow_mut().get_mut(key) {
            queue.timer = Some(handle);
        }
    }

    fn flush(inner: &Rc<Self>, key: &str) -> usize {
        if inner.flushing.get() {
            // Re-entered from the processor: leave the ops for the batch timer.
            Self::ensure_timer(inner, key);
            return 0;
        }

        let mut operations = {
            let mut queues = inner.queues.borrow_mut();
            let Some(queue) = queues.get_mut(key) else {
                return 0;
            };
            if let Some(timer) = queue.timer.take() {
                inner.timers.cancel(timer);
            }
            std::mem::take(&mut queue.operations)
        };
        if operations.is_empty() {
            return 0;
        }

        let count = operations.len();
        let superseded = coalesce(&mut operations);
        operations.sort_by_key(|op| op.priority);
        let mut report = FlushReport {
            key: key.to_string(),
            applied: 0,
            failed: 0,
            dropped: 0,
            superseded,
        };

        inner.flushing.set(true);
        {
            let mut processor = inner.processor.borrow_mut();
            match processor.as_mut() {
                Some(process) => {
                    for op in &operations {
                        match process(op) {
                            Ok(()) => report.applied += 1,
                            Err(e) => {
                                tracing::warn!(
                                    "Batch '{}': {} {} failed: {}",
                                    key,
                                    op.kind,
                                    op.target,
                                    e
                                );
                                report.failed += 1;
                            }
                        }
                    }
                }
                None => {
                    tracing::warn!(
                        "No batch processor registered; dropping {} operation(s) from '{}'",
                        operations.len(),
                        key
                    );
                    report.dropped = operations.len();
                }
            }
        }
        inner.flushing.set(false);

        let mut stats = inner.stats.get();
        stats.flushes += 1;
        stats.processed += report.applied as u64;
        stats.failed += report.failed as u64;
        stats.dropped += report.dropped as u64;
        stats.superseded += report.superseded as u64;
        inner.stats.set(stats);

        tracing::debug!(
            "Flushed batch '{}': {} applied, {} failed, {} dropped, {} superseded",
            key,
            report.applied,
            report.failed,
            report.dropped,
            report.superseded
        );
        inner.observers.notify(&report);
        count
    }
}

/// Keeps only the last queued operation per snap object, so the priority
/// sort can never run an earlier add or update after a later remove.
/// Returns the number of operations discarded.
fn coalesce(operations: &mut Vec<BatchOperation>) -> usize {
    let mut last: HashMap<u64, usize> = HashMap::new();
    for (position, op) in operations.iter().enumerate() {
        if let Some(id) = op.object_id() {
            last.insert(id, position);
        }
    }

    let before = operations.len();
    let mut position = 0;
    operations.retain(|op| {
        let keep = op
            .object_id()
            .map_or(true, |id| last.get(&id) == Some(&position));
        position += 1;
        keep
    });
    before - operations.len()
}

impl fmt::Debug for MutationBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationBatcher")
            .field("batch_size", &self.batch_size())
            .field("batch_delay", &self.batch_delay())
            .field("pending", &self.total_pending())
            .field("stats", &self.stats())
            .finish()
    }
}
