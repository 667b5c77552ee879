//! Drawing session: one snap engine instance.
//!
//! A [`DrawingSession`] owns the spatial index, registry, resolver, snap
//! cache, interaction scheduler, mutation batcher, frame monitor and
//! adaptive tuner for a single drawing, and wires them together:
//!
//! - geometry edits go through the registry into the batcher, whose
//!   processor applies them to the index and invalidates the cache;
//! - pointer samples are debounced on the `mouseMove` key and resolved,
//!   publishing [`SessionEvent::SnapChanged`] when the result changes;
//! - a repeating timer evaluates the frame score and applies tuning.
//!
//! Observers are called synchronously, in registration order, on the thread
//! that triggered the change. No internal borrow is held while they run, so
//! they may call back into the session.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use ductkit_core::{
    Bounds2D, GeometryError, ObserverList, Point2D, SubscriptionId, TaskScheduler, TimerHandle,
    ViewTransform,
};
use ductkit_settings::EngineConfig;

use crate::adaptive::{AdaptiveTuner, TuningAdjustment, TuningState};
use crate::batcher::{
    BatchOperation, FlushReport, MutationBatcher, OperationData, OperationKind, OperationTarget,
};
use crate::cache::SnapCache;
use crate::debounce::{InteractionKind, InteractionScheduler};
use crate::error::{Result, SnapError};
use crate::performance::FrameMonitor;
use crate::registry::{GeometryElement, GeometrySnapshot, SnapPointRegistry};
use crate::resolver::{Resolution, SnapResolver};
use crate::snap_point::{ElementId, SnapPoint};
use crate::spatial_index::SpatialIndex;

/// One pointer sample in world coordinates with the view it was taken in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: Point2D,
    pub view: ViewTransform,
}

/// A source of pointer samples the session can drain.
pub trait PointerSource {
    /// Next buffered sample, or `None` when drained.
    fn poll(&mut self) -> Option<PointerSample>;
}

/// State changes published to session observers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A debounced pointer resolution differs from the previous one
    SnapChanged(Resolution),
    /// A batch was flushed
    BatchApplied { key: String, applied: usize },
    /// The index was rebuilt
    IndexRebuilt { objects: usize, rejected: usize },
    /// The adaptive tuner changed the timing parameters
    TuningAdjusted(TuningAdjustment),
}

/// Numbers for a status or debug panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStats {
    pub total_objects: usize,
    pub max_depth: usize,
    pub node_count: usize,
    /// Mean wall time of uncached resolutions
    pub average_query_time: Duration,
    pub cache_hit_rate: f64,
    pub memory_usage: usize,
    pub dropped_operations: u64,
    pub failed_operations: u64,
    pub pending_operations: usize,
    pub debounce_delay: Duration,
    pub batch_size: usize,
    pub performance_score: Option<f64>,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} objects, {} nodes (depth {}), query {:?}, cache {:.0}%, {} KiB, \
             delay {:?}, batch {}, dropped {}, failed {}",
            self.total_objects,
            self.node_count,
            self.max_depth,
            self.average_query_time,
            self.cache_hit_rate * 100.0,
            self.memory_usage / 1024,
            self.debounce_delay,
            self.batch_size,
            self.dropped_operations,
            self.failed_operations
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct QueryTiming {
    count: u32,
    total: Duration,
}

struct SessionInner {
    timers: Rc<dyn TaskScheduler>,
    index: RefCell<SpatialIndex<SnapPoint>>,
    registry: RefCell<SnapPointRegistry>,
    resolver: SnapResolver,
    cache: RefCell<SnapCache>,
    scheduler: InteractionScheduler,
    batcher: MutationBatcher,
    monitor: RefCell<FrameMonitor>,
    tuner: RefCell<AdaptiveTuner>,
    adaptive_interval: Option<Duration>,
    tuning_timer: Cell<Option<TimerHandle>>,
    observers: ObserverList<SessionEvent>,
    latest: RefCell<Option<Resolution>>,
    timing: Cell<QueryTiming>,
    pointer: RefCell<Option<Box<dyn PointerSource>>>,
}

/// The snap engine for one drawing.
pub struct DrawingSession {
    inner: Rc<SessionInner>,
}

impl DrawingSession {
    /// Creates a session over `canvas`, validating `config` first.
    pub fn new(
        canvas: Bounds2D,
        config: &EngineConfig,
        timers: Rc<dyn TaskScheduler>,
    ) -> Result<Self> {
        config.validate()?;
        validate_canvas(&canvas)?;

        let scheduler = InteractionScheduler::new(timers.clone(), &config.debounce);
        let batcher = MutationBatcher::from_settings(timers.clone(), &config.batching);
        let tuner = AdaptiveTuner::new(
            config.adaptive.clone(),
            TuningState {
                debounce_delay: scheduler.pointer_delay(),
                batch_size: batcher.batch_size(),
            },
        );

        let inner = Rc::new(SessionInner {
            timers,
            index: RefCell::new(SpatialIndex::from_settings(canvas, &config.index)),
            registry: RefCell::new(SnapPointRegistry::new()),
            resolver: SnapResolver::new(&config.snap),
            cache: RefCell::new(SnapCache::new(config.snap.cache_capacity)),
            scheduler,
            batcher,
            monitor: RefCell::new(FrameMonitor::from_settings(&config.monitor)),
            tuner: RefCell::new(tuner),
            adaptive_interval: config
                .adaptive
                .enabled
                .then(|| config.adaptive.evaluation_interval()),
            tuning_timer: Cell::new(None),
            observers: ObserverList::new(),
            latest: RefCell::new(None),
            timing: Cell::new(QueryTiming::default()),
            pointer: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        inner.batcher.set_processor(move |op| match weak.upgrade() {
            Some(inner) => inner.apply(op),
            None => Ok(()),
        });
        let weak = Rc::downgrade(&inner);
        inner.batcher.on_flush(move |report: &FlushReport| {
            if let Some(inner) = weak.upgrade() {
                inner.observers.notify(&SessionEvent::BatchApplied {
                    key: report.key.clone(),
                    applied: report.applied,
                });
            }
        });
        SessionInner::schedule_tuning(&inner);

        tracing::info!(
            "Drawing session created over {:?} (snap {}px, magnetic {}px)",
            canvas,
            config.snap.snap_threshold_px,
            config.snap.magnetic_threshold_px
        );
        Ok(Self { inner })
    }

    /// Registers or replaces a geometry element. Returns the number of snap
    /// points it produces; they reach the index when the batch flushes.
    pub fn upsert_element(&self, id: ElementId, element: GeometryElement) -> Result<usize> {
        let operations = self
            .inner
            .registry
            .borrow_mut()
            .upsert(id, element, self.inner.timers.now())?;
        let count = operations
            .iter()
            .filter(|op| op.target == OperationTarget::SnapPoint && op.kind != OperationKind::Remove)
            .count();
        self.inner.enqueue_all(operations);
        Ok(count)
    }

    /// Unregisters a geometry element. Returns the number of snap points
    /// queued for removal.
    pub fn remove_element(&self, id: ElementId) -> Result<usize> {
        let operations = self
            .inner
            .registry
            .borrow_mut()
            .remove(id, self.inner.timers.now())?;
        let count = operations
            .iter()
            .filter(|op| op.kind == OperationKind::Remove)
            .count();
        self.inner.enqueue_all(operations);
        Ok(count)
    }

    /// Unregisters every geometry element.
    pub fn clear_elements(&self) -> usize {
        let operations = self
            .inner
            .registry
            .borrow_mut()
            .clear(self.inner.timers.now());
        let count = operations
            .iter()
            .filter(|op| op.kind == OperationKind::Remove)
            .count();
        self.inner.enqueue_all(operations);
        count
    }

    /// Registered geometry for the build pipeline.
    pub fn snapshot(&self) -> GeometrySnapshot {
        self.inner.registry.borrow().snapshot()
    }

    /// Queues a full index rebuild on the `spatialIndex` batch key.
    pub fn request_rebuild(&self) {
        self.inner.enqueue_all(vec![BatchOperation::invalidate(
            OperationTarget::SpatialIndex,
            self.inner.timers.now(),
        )]);
    }

    /// Rebuilds the index now. Returns the number of objects dropped because
    /// they no longer fit the canvas.
    pub fn rebuild_index(&self) -> usize {
        self.inner.rebuild(None)
    }

    /// Changes the canvas bounds and rebuilds the index.
    pub fn set_canvas_bounds(&self, canvas: Bounds2D) -> Result<usize> {
        validate_canvas(&canvas)?;
        Ok(self.inner.rebuild(Some(canvas)))
    }

    pub fn canvas_bounds(&self) -> Bounds2D {
        self.inner.index.borrow().bounds()
    }

    /// Records a pointer sample. Resolution runs once the pointer delay has
    /// passed without a newer sample.
    pub fn pointer_moved(&self, cursor: Point2D, view: ViewTransform) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.invoke_kind(
            &InteractionKind::MouseMove,
            move |(cursor, view): (Point2D, ViewTransform)| {
                if let Some(inner) = weak.upgrade() {
                    inner.publish_resolution(cursor, view);
                }
            },
            (cursor, view),
        );
    }

    /// Debounced one-shot snap query; `callback` receives the resolution of
    /// the last request made within the window.
    pub fn request_snap<F>(&self, cursor: Point2D, view: ViewTransform, callback: F)
    where
        F: FnOnce(Resolution) + 'static,
    {
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.invoke_kind(
            &InteractionKind::SnapQuery,
            move |(cursor, view): (Point2D, ViewTransform)| {
                if let Some(inner) = weak.upgrade() {
                    let resolution = inner.resolve(cursor, &view);
                    callback(resolution);
                }
            },
            (cursor, view),
        );
    }

    /// Resolves immediately, bypassing the debounce layer.
    pub fn resolve_now(&self, cursor: Point2D, view: ViewTransform) -> Resolution {
        self.inner.resolve(cursor, &view)
    }

    /// The last resolution published from pointer movement.
    pub fn latest_resolution(&self) -> Option<Resolution> {
        self.inner.latest.borrow().clone()
    }

    /// Debounces a drawing operation under `drawing_<op_id>`.
    pub fn schedule_drawing<F>(&self, op_id: &str, handler: F)
    where
        F: FnOnce() + 'static,
    {
        self.inner.scheduler.invoke_kind(
            &InteractionKind::Drawing(op_id.to_string()),
            move |()| handler(),
            (),
        );
    }

    pub fn attach_pointer_source(&self, source: Box<dyn PointerSource>) {
        *self.inner.pointer.borrow_mut() = Some(source);
    }

    pub fn detach_pointer_source(&self) -> Option<Box<dyn PointerSource>> {
        self.inner.pointer.borrow_mut().take()
    }

    /// Drains the attached pointer source into [`DrawingSession::pointer_moved`].
    /// Returns the number of samples read.
    pub fn pump_pointer(&self) -> usize {
        let samples: Vec<PointerSample> = match self.inner.pointer.borrow_mut().as_mut() {
            Some(source) => std::iter::from_fn(|| source.poll()).collect(),
            None => return 0,
        };
        for sample in &samples {
            self.pointer_moved(sample.position, sample.view);
        }
        samples.len()
    }

    pub fn record_frame(&self, frame_time: Duration) {
        self.inner.monitor.borrow_mut().record_frame(frame_time);
    }

    /// Runs one adaptive evaluation now instead of waiting for the timer.
    pub fn evaluate_performance(&self) -> Option<TuningAdjustment> {
        self.inner.run_tuning()
    }

    pub fn performance_score(&self) -> Option<f64> {
        self.inner.monitor.borrow().score()
    }

    pub fn flush_all_batches(&self) -> usize {
        self.inner.batcher.flush_all()
    }

    pub fn flush_all_debounced(&self) -> usize {
        self.inner.scheduler.flush_all()
    }

    pub fn cancel_all_debounced(&self) -> usize {
        self.inner.scheduler.cancel_all()
    }

    pub fn scheduler(&self) -> &InteractionScheduler {
        &self.inner.scheduler
    }

    pub fn batcher(&self) -> &MutationBatcher {
        &self.inner.batcher
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + 'static,
    {
        self.inner.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    pub fn stats(&self) -> EngineStats {
        let index = self.inner.index.borrow().stats();
        let batches = self.inner.batcher.stats();
        let timing = self.inner.timing.get();
        EngineStats {
            total_objects: index.total_objects,
            max_depth: index.max_depth,
            node_count: index.node_count,
            average_query_time: if timing.count == 0 {
                Duration::ZERO
            } else {
                timing.total / timing.count
            },
            cache_hit_rate: self.inner.cache.borrow().hit_rate(),
            memory_usage: index.memory_usage,
            dropped_operations: batches.dropped,
            failed_operations: batches.failed,
            pending_operations: self.inner.batcher.total_pending(),
            debounce_delay: self.inner.scheduler.pointer_delay(),
            batch_size: self.inner.batcher.batch_size(),
            performance_score: self.inner.monitor.borrow().score(),
        }
    }
}

impl Drop for DrawingSession {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.tuning_timer.take() {
            self.inner.timers.cancel(handle);
        }
        self.inner.scheduler.cancel_all();
        self.inner.batcher.cancel_timers();
        self.inner.batcher.clear_processor();
    }
}

impl fmt::Debug for DrawingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingSession")
            .field("canvas", &self.canvas_bounds())
            .field("elements", &self.inner.registry.borrow().len())
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

impl SessionInner {
    fn enqueue_all(&self, operations: Vec<BatchOperation>) {
        for op in operations {
            let key = op.target.batch_key();
            self.batcher.enqueue(key, op);
        }
    }

    /// Batch processor: applies one operation to the index or cache.
    fn apply(&self, op: &BatchOperation) -> Result<()> {
        match (op.target, op.kind, &op.data) {
            (OperationTarget::SnapPoint, OperationKind::Add, OperationData::Object(obj)) => {
                let inserted = self.index.borrow_mut().insert(obj.clone());
                self.cache.borrow_mut().clear();
                if inserted {
                    Ok(())
                } else {
                    Err(out_of_bounds(obj.id, obj.position))
                }
            }
            (OperationTarget::SnapPoint, OperationKind::Update, OperationData::Object(obj)) => {
                let mut index = self.index.borrow_mut();
                index.remove(obj.id);
                let inserted = index.insert(obj.clone());
                drop(index);
                self.cache.borrow_mut().clear();
                if inserted {
                    Ok(())
                } else {
                    Err(out_of_bounds(obj.id, obj.position))
                }
            }
            (OperationTarget::SnapPoint, OperationKind::Remove, OperationData::Id(id)) => {
                if !self.index.borrow_mut().remove(*id) {
                    tracing::debug!("Snap point {} was not indexed", id);
                }
                self.cache.borrow_mut().clear();
                Ok(())
            }
            (OperationTarget::Cache, OperationKind::Invalidate, _) => {
                self.cache.borrow_mut().clear();
                Ok(())
            }
            (OperationTarget::SpatialIndex, OperationKind::Invalidate, _) => {
                let rejected = self.index.borrow_mut().rebuild();
                self.cache.borrow_mut().clear();
                if rejected > 0 {
                    tracing::warn!("Queued rebuild dropped {} snap point(s)", rejected);
                }
                Ok(())
            }
            (target, kind, _) => Err(SnapError::UnsupportedOperation { kind, target }),
        }
    }

    fn rebuild(&self, bounds: Option<Bounds2D>) -> usize {
        let (objects, rejected) = {
            let mut index = self.index.borrow_mut();
            let rejected = match bounds {
                Some(bounds) => index.set_bounds(bounds),
                None => index.rebuild(),
            };
            (index.len(), rejected)
        };
        self.cache.borrow_mut().clear();
        tracing::info!(
            "Spatial index rebuilt: {} objects kept, {} rejected",
            objects,
            rejected
        );
        self.observers
            .notify(&SessionEvent::IndexRebuilt { objects, rejected });
        rejected
    }

    fn resolve(&self, cursor: Point2D, view: &ViewTransform) -> Resolution {
        if let Some(cached) = self.cache.borrow_mut().get(cursor, view) {
            return cached;
        }

        let started = Instant::now();
        let resolution = self
            .resolver
            .resolve(&self.index.borrow(), cursor, view);
        let elapsed = started.elapsed();

        let mut timing = self.timing.get();
        timing.count = timing.count.saturating_add(1);
        timing.total += elapsed;
        self.timing.set(timing);

        self.cache
            .borrow_mut()
            .insert(cursor, view, resolution.clone());
        resolution
    }

    fn publish_resolution(&self, cursor: Point2D, view: ViewTransform) {
        let resolution = self.resolve(cursor, &view);
        let changed = self.latest.borrow().as_ref() != Some(&resolution);
        *self.latest.borrow_mut() = Some(resolution.clone());
        if changed {
            self.observers
                .notify(&SessionEvent::SnapChanged(resolution));
        }
    }

    fn schedule_tuning(inner: &Rc<Self>) {
        let Some(interval) = inner.adaptive_interval else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(inner);
        let handle = inner.timers.schedule(
            interval,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.tuning_timer.set(None);
                    inner.run_tuning();
                    SessionInner::schedule_tuning(&inner);
                }
            }),
        );
        inner.tuning_timer.set(Some(handle));
    }

    fn run_tuning(&self) -> Option<TuningAdjustment> {
        let score = self.monitor.borrow().score()?;
        let adjustment = self
            .tuner
            .borrow_mut()
            .evaluate(score, self.timers.now())?;
        self.scheduler
            .set_pointer_delay(adjustment.current.debounce_delay);
        self.batcher.set_batch_size(adjustment.current.batch_size);
        self.observers
            .notify(&SessionEvent::TuningAdjusted(adjustment));
        Some(adjustment)
    }
}

fn out_of_bounds(id: u64, position: Point2D) -> SnapError {
    SnapError::OutOfBounds {
        id,
        x: position.x,
        y: position.y,
    }
}

fn validate_canvas(canvas: &Bounds2D) -> std::result::Result<(), GeometryError> {
    if !canvas.is_finite() || canvas.width <= 0.0 || canvas.height <= 0.0 {
        return Err(GeometryError::InvalidBounds {
            width: canvas.width,
            height: canvas.height,
            reason: "canvas must have a finite, positive area".to_string(),
        });
    }
    Ok(())
}
