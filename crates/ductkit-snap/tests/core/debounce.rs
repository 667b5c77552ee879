use std::rc::Rc;
use std::time::Duration;

use ductkit_core::{shared, TimerQueue};
use ductkit_settings::DebounceSettings;
use ductkit_snap::{InteractionKind, InteractionScheduler};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn setup() -> (Rc<TimerQueue>, InteractionScheduler) {
    let timers = Rc::new(TimerQueue::manual());
    let scheduler = InteractionScheduler::new(timers.clone(), &DebounceSettings::default());
    (timers, scheduler)
}

#[test]
fn test_trailing_edge_last_call_wins() {
    let (timers, scheduler) = setup();
    let calls = shared(Vec::new());

    for value in ["a1", "a2"] {
        let calls = calls.clone();
        scheduler.invoke("k", ms(10), move |v: &'static str| calls.borrow_mut().push(v), value);
        timers.advance(ms(4));
    }
    assert!(calls.borrow().is_empty());
    assert!(scheduler.pending("k"));

    timers.advance(ms(6));
    assert_eq!(*calls.borrow(), vec!["a2"]);
    assert!(!scheduler.pending("k"));

    timers.advance(ms(100));
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn test_delay_restarts_on_each_call() {
    let (timers, scheduler) = setup();
    let calls = shared(0);

    for _ in 0..5 {
        let calls = calls.clone();
        scheduler.invoke("k", ms(8), move |_: ()| *calls.borrow_mut() += 1, ());
        timers.advance(ms(7));
    }
    assert_eq!(*calls.borrow(), 0);
    timers.advance(ms(1));
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_cancel_prevents_invocation() {
    let (timers, scheduler) = setup();
    let calls = shared(0);
    let c = calls.clone();
    scheduler.invoke("k", ms(8), move |_: ()| *c.borrow_mut() += 1, ());

    assert!(scheduler.cancel("k"));
    assert!(!scheduler.cancel("k"));
    assert!(!scheduler.pending("k"));

    timers.advance(ms(50));
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn test_flush_runs_immediately_once() {
    let (timers, scheduler) = setup();
    let calls = shared(Vec::new());

    for value in [1, 2, 3] {
        let calls = calls.clone();
        scheduler.invoke("k", ms(8), move |v: i32| calls.borrow_mut().push(v), value);
    }
    assert!(scheduler.flush("k"));
    assert_eq!(*calls.borrow(), vec![3]);
    assert!(!scheduler.pending("k"));
    assert!(!scheduler.flush("k"));

    timers.advance(ms(50));
    assert_eq!(*calls.borrow(), vec![3]);
}

#[test]
fn test_keys_are_independent() {
    let (timers, scheduler) = setup();
    let calls = shared(Vec::new());

    let c = calls.clone();
    scheduler.invoke_kind(
        &InteractionKind::MouseMove,
        move |v: &'static str| c.borrow_mut().push(v),
        "pointer",
    );
    let c = calls.clone();
    scheduler.invoke_kind(
        &InteractionKind::Drawing("duct-7".to_string()),
        move |v: &'static str| c.borrow_mut().push(v),
        "drawing",
    );
    assert_eq!(scheduler.pending_count(), 2);
    assert!(scheduler.pending("mouseMove"));
    assert!(scheduler.pending("drawing_duct-7"));

    timers.advance(ms(8));
    assert_eq!(*calls.borrow(), vec!["pointer"]);

    timers.advance(ms(8));
    assert_eq!(*calls.borrow(), vec!["pointer", "drawing"]);
}

#[test]
fn test_flush_all_and_cancel_all() {
    let (timers, scheduler) = setup();
    let calls = shared(Vec::new());
    for key in ["b", "a", "c"] {
        let c = calls.clone();
        scheduler.invoke(key, ms(8), move |k: &'static str| c.borrow_mut().push(k), key);
    }

    assert_eq!(scheduler.flush_all(), 3);
    assert_eq!(*calls.borrow(), vec!["a", "b", "c"]);
    assert_eq!(timers.pending_count(), 0);

    for key in ["x", "y"] {
        let c = calls.clone();
        scheduler.invoke(key, ms(8), move |k: &'static str| c.borrow_mut().push(k), key);
    }
    assert_eq!(scheduler.cancel_all(), 2);
    timers.advance(ms(50));
    assert_eq!(calls.borrow().len(), 3);
}

#[test]
fn test_pointer_delay_adjustment_applies_to_new_calls() {
    let (timers, scheduler) = setup();
    scheduler.set_pointer_delay(ms(20));
    let calls = shared(0);
    let c = calls.clone();
    scheduler.invoke_kind(&InteractionKind::MouseMove, move |_: ()| *c.borrow_mut() += 1, ());

    timers.advance(ms(19));
    assert_eq!(*calls.borrow(), 0);
    timers.advance(ms(1));
    assert_eq!(*calls.borrow(), 1);
}
