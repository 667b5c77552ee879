//! Trailing-edge debouncing of high-frequency interaction input.
//!
//! Each logical key owns at most one pending invocation. Invoking a key again
//! before its delay elapses replaces both the timer and the pending call, so
//! only the last call within a window runs, exactly once.
//!
//! Pointer movement and snap queries share the pointer delay (8 ms by
//! default, roughly 120 fps); drawing operations use a longer delay (16 ms,
//! roughly 60 fps) that never drops below the pointer delay.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use ductkit_core::{Callback, TaskScheduler, TimerHandle};
use ductkit_settings::DebounceSettings;

/// Debounce key for pointer movement.
pub const MOUSE_MOVE_KEY: &str = "mouseMove";
/// Debounce key for snap queries.
pub const SNAP_QUERY_KEY: &str = "snapQuery";

/// Typed interaction channels with their own keys and delays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    MouseMove,
    SnapQuery,
    /// A drawing operation, keyed by its operation id
    Drawing(String),
}

impl InteractionKind {
    pub fn key(&self) -> String {
        match self {
            Self::MouseMove => MOUSE_MOVE_KEY.to_string(),
            Self::SnapQuery => SNAP_QUERY_KEY.to_string(),
            Self::Drawing(op) => format!("drawing_{op}"),
        }
    }
}

struct DebounceSlot {
    generation: u64,
    timer: TimerHandle,
    call: Callback,
}

struct SchedulerInner {
    timers: Rc<dyn TaskScheduler>,
    slots: RefCell<HashMap<String, DebounceSlot>>,
    next_generation: Cell<u64>,
    pointer_delay: Cell<Duration>,
    snap_query_delay: Cell<Duration>,
    drawing_delay: Duration,
}

/// Per-key trailing-edge debouncer.
///
/// Cloning yields another handle to the same scheduler, so handlers may
/// capture a clone and re-enter it.
#[derive(Clone)]
pub struct InteractionScheduler {
    inner: Rc<SchedulerInner>,
}

impl InteractionScheduler {
    pub fn new(timers: Rc<dyn TaskScheduler>, settings: &DebounceSettings) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                timers,
                slots: RefCell::new(HashMap::new()),
                next_generation: Cell::new(0),
                pointer_delay: Cell::new(settings.mouse_move_delay()),
                snap_query_delay: Cell::new(settings.snap_query_delay()),
                drawing_delay: settings.drawing_delay(),
            }),
        }
    }

    /// Schedules `handler(args)` to run after `delay`, replacing any pending
    /// call for `key`.
    pub fn invoke<A, F>(&self, key: &str, delay: Duration, handler: F, args: A)
    where
        A: 'static,
        F: FnOnce(A) + 'static,
    {
        let generation = self.inner.next_generation.get();
        self.inner.next_generation.set(generation + 1);

        let weak: Weak<SchedulerInner> = Rc::downgrade(&self.inner);
        let owned_key = key.to_string();
        let timer = self.inner.timers.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    if let Some(call) = inner.take_if_current(&owned_key, generation) {
                        call();
                    }
                }
            }),
        );

        let slot = DebounceSlot {
            generation,
            timer,
            call: Box::new(move || handler(args)),
        };
        let replaced = self.inner.slots.borrow_mut().insert(key.to_string(), slot);
        if let Some(old) = replaced {
            self.inner.timers.cancel(old.timer);
        }
    }

    /// Like [`InteractionScheduler::invoke`], using the channel's key and delay.
    pub fn invoke_kind<A, F>(&self, kind: &InteractionKind, handler: F, args: A)
    where
        A: 'static,
        F: FnOnce(A) + 'static,
    {
        self.invoke(&kind.key(), self.delay_for(kind), handler, args);
    }

    /// Discards the pending call for `key` without running it.
    pub fn cancel(&self, key: &str) -> bool {
        match self.inner.slots.borrow_mut().remove(key) {
            Some(slot) => {
                self.inner.timers.cancel(slot.timer);
                true
            }
            None => false,
        }
    }

    /// Runs the pending call for `key` immediately.
    pub fn flush(&self, key: &str) -> bool {
        let slot = self.inner.slots.borrow_mut().remove(key);
        match slot {
            Some(slot) => {
                self.inner.timers.cancel(slot.timer);
                (slot.call)();
                true
            }
            None => false,
        }
    }

    pub fn pending(&self, key: &str) -> bool {
        self.inner.slots.borrow().contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    /// Runs every pending call now, in key order. Returns how many ran.
    pub fn flush_all(&self) -> usize {
        let mut slots: Vec<(String, DebounceSlot)> =
            self.inner.slots.borrow_mut().drain().collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, slot) in &slots {
            self.inner.timers.cancel(slot.timer);
        }
        let count = slots.len();
        for (_, slot) in slots {
            (slot.call)();
        }
        count
    }

    /// Discards every pending call. Returns how many were discarded.
    pub fn cancel_all(&self) -> usize {
        let slots: Vec<DebounceSlot> = self
            .inner
            .slots
            .borrow_mut()
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        for slot in &slots {
            self.inner.timers.cancel(slot.timer);
        }
        slots.len()
    }

    pub fn delay_for(&self, kind: &InteractionKind) -> Duration {
        match kind {
            InteractionKind::MouseMove => self.pointer_delay(),
            InteractionKind::SnapQuery => self.inner.snap_query_delay.get(),
            InteractionKind::Drawing(_) => self.drawing_delay(),
        }
    }

    pub fn pointer_delay(&self) -> Duration {
        self.inner.pointer_delay.get()
    }

    pub fn drawing_delay(&self) -> Duration {
        self.inner.drawing_delay.max(self.pointer_delay())
    }

    /// Sets the delay for pointer movement and snap queries. Pending calls
    /// keep their original deadline.
    pub fn set_pointer_delay(&self, delay: Duration) {
        self.inner.pointer_delay.set(delay);
        self.inner.snap_query_delay.set(delay);
    }
}

impl SchedulerInner {
    fn take_if_current(&self, key: &str, generation: u64) -> Option<Callback> {
        let mut slots = self.slots.borrow_mut();
        if slots.get(key)?.generation != generation {
            return None;
        }
        slots.remove(key).map(|slot| slot.call)
    }
}

impl fmt::Debug for InteractionScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionScheduler")
            .field("pending", &self.pending_count())
            .field("pointer_delay", &self.pointer_delay())
            .field("drawing_delay", &self.drawing_delay())
            .finish()
    }
}
