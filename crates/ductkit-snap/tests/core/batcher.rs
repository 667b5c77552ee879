use std::rc::Rc;
use std::time::Duration;

use ductkit_core::{shared, Point2D, SnapPointType, TimerQueue};
use ductkit_snap::batcher::{CACHE_KEY, SNAP_POINTS_KEY};
use ductkit_snap::{
    BatchOperation, ElementId, MutationBatcher, OperationData, OperationTarget, SnapObject,
    SnapPoint,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn add(id: u64) -> BatchOperation {
    BatchOperation::add(
        SnapObject::new(
            id,
            Point2D::new(id as f64, id as f64),
            SnapPoint::new(SnapPointType::Endpoint, ElementId(1)),
        ),
        Duration::ZERO,
    )
}

fn op_id(op: &BatchOperation) -> u64 {
    match &op.data {
        OperationData::Object(obj) => obj.id,
        OperationData::Id(id) => *id,
        OperationData::None => u64::MAX,
    }
}

fn recording_batcher(
    batch_size: usize,
) -> (Rc<TimerQueue>, MutationBatcher, ductkit_core::Shared<Vec<u64>>) {
    let timers = Rc::new(TimerQueue::manual());
    let batcher = MutationBatcher::new(timers.clone(), batch_size, ms(16));
    let seen = shared(Vec::new());
    let log = seen.clone();
    batcher.set_processor(move |op| {
        log.borrow_mut().push(op_id(op));
        Ok(())
    });
    (timers, batcher, seen)
}

#[test]
fn test_batch_size_triggers_immediate_flush() {
    let (timers, batcher, seen) = recording_batcher(3);

    batcher.enqueue(SNAP_POINTS_KEY, add(1));
    batcher.enqueue(SNAP_POINTS_KEY, add(2));
    assert!(seen.borrow().is_empty());
    assert_eq!(batcher.pending_len(SNAP_POINTS_KEY), 2);

    batcher.enqueue(SNAP_POINTS_KEY, add(3));
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    assert!(!batcher.pending(SNAP_POINTS_KEY));
    // The delay timer was cancelled by the size-triggered flush.
    assert_eq!(timers.pending_count(), 0);
}

#[test]
fn test_batch_delay_triggers_flush() {
    let (timers, batcher, seen) = recording_batcher(50);

    batcher.enqueue(SNAP_POINTS_KEY, add(1));
    timers.advance(ms(10));
    batcher.enqueue(SNAP_POINTS_KEY, add(2));
    timers.advance(ms(5));
    assert!(seen.borrow().is_empty());

    // Measured from the first unflushed operation, not the last.
    timers.advance(ms(1));
    assert_eq!(*seen.borrow(), vec![1, 2]);
}

#[test]
fn test_priority_order_is_stable() {
    let (_, batcher, seen) = recording_batcher(50);

    batcher.enqueue(SNAP_POINTS_KEY, add(1));
    batcher.enqueue(SNAP_POINTS_KEY, BatchOperation::remove(2, Duration::ZERO));
    batcher.enqueue(SNAP_POINTS_KEY, add(3).with_priority(0));
    batcher.enqueue(SNAP_POINTS_KEY, BatchOperation::remove(4, Duration::ZERO));
    batcher.enqueue(SNAP_POINTS_KEY, add(5));

    assert_eq!(batcher.flush(SNAP_POINTS_KEY), 5);
    assert_eq!(*seen.borrow(), vec![2, 3, 4, 1, 5]);
}

#[test]
fn test_keys_flush_independently() {
    let (timers, batcher, seen) = recording_batcher(2);

    batcher.enqueue(SNAP_POINTS_KEY, add(1));
    batcher.enqueue(
        CACHE_KEY,
        BatchOperation::invalidate(OperationTarget::Cache, Duration::ZERO),
    );
    assert!(seen.borrow().is_empty());

    batcher.enqueue(SNAP_POINTS_KEY, add(2));
    assert_eq!(*seen.borrow(), vec![1, 2]);
    assert!(batcher.pending(CACHE_KEY));

    timers.advance(ms(16));
    assert_eq!(seen.borrow().len(), 3);
}

#[test]
fn test_missing_processor_drops_and_counts() {
    let timers = Rc::new(TimerQueue::manual());
    let batcher = MutationBatcher::new(timers.clone(), 50, ms(16));
    assert!(!batcher.has_processor());

    batcher.enqueue(SNAP_POINTS_KEY, add(1));
    batcher.enqueue(SNAP_POINTS_KEY, add(2));
    timers.advance(ms(16));

    let stats = batcher.stats();
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.processed, 0);
    assert!(!batcher.pending(SNAP_POINTS_KEY));
}

#[test]
fn test_flush_all_processes_every_key() {
    let (timers, batcher, seen) = recording_batcher(50);
    batcher.enqueue(SNAP_POINTS_KEY, add(1));
    batcher.enqueue(CACHE_KEY, add(2));
    batcher.enqueue("spatialIndex", add(3));

    assert_eq!(batcher.flush_all(), 3);
    assert_eq!(seen.borrow().len(), 3);
    assert_eq!(batcher.total_pending(), 0);
    assert_eq!(timers.pending_count(), 0);
    assert_eq!(batcher.flush_all(), 0);
}

#[test]
fn test_batch_size_change_applies_to_next_enqueue() {
    let (_, batcher, seen) = recording_batcher(50);
    for id in 0..5 {
        batcher.enqueue(SNAP_POINTS_KEY, add(id));
    }
    batcher.set_batch_size(6);
    assert!(seen.borrow().is_empty());

    batcher.enqueue(SNAP_POINTS_KEY, add(5));
    assert_eq!(seen.borrow().len(), 6);

    batcher.set_batch_size(0);
    assert_eq!(batcher.batch_size(), 1);
}
