//! Injectable scheduled-task capability.
//!
//! Every deferred piece of work in the snap engine (debounce delays, batch
//! delays, the adaptive tuning interval) is expressed through
//! [`TaskScheduler`] instead of ambient wall-clock timers. [`TimerQueue`] is
//! the single implementation: with a manual clock it is a virtual clock for
//! tests, with a monotonic clock the host event loop pumps it every frame.
//!
//! Tasks run on the thread that pumps the queue, to completion, in deadline
//! order; tasks with equal deadlines run in scheduling order.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{Duration, Instant};

use crate::types::Callback;

/// Handle returned by [`TaskScheduler::schedule`], used to cancel the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timer({})", self.0)
    }
}

/// Capability to run a task after a delay, measured on the scheduler's clock.
pub trait TaskScheduler {
    /// Time elapsed on this scheduler's clock since it was created.
    fn now(&self) -> Duration;

    /// Runs `task` once, no earlier than `delay` from now.
    fn schedule(&self, delay: Duration, task: Callback) -> TimerHandle;

    /// Cancels a pending task. Returns false if it already ran or was cancelled.
    fn cancel(&self, handle: TimerHandle) -> bool;

    /// Whether the task behind `handle` is still waiting to run.
    fn is_scheduled(&self, handle: TimerHandle) -> bool;
}

enum ClockSource {
    Manual(Cell<Duration>),
    Monotonic(Instant),
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    tasks: BTreeMap<(Duration, u64), Callback>,
    deadlines: HashMap<u64, Duration>,
}

/// Deadline-ordered task queue implementing [`TaskScheduler`].
pub struct TimerQueue {
    clock: ClockSource,
    state: RefCell<QueueState>,
}

impl TimerQueue {
    /// A queue on a virtual clock that only moves through [`TimerQueue::advance`].
    pub fn manual() -> Self {
        Self {
            clock: ClockSource::Manual(Cell::new(Duration::ZERO)),
            state: RefCell::new(QueueState::default()),
        }
    }

    /// A queue on the monotonic wall clock; call [`TimerQueue::run_due`] from
    /// the event loop.
    pub fn monotonic() -> Self {
        Self {
            clock: ClockSource::Monotonic(Instant::now()),
            state: RefCell::new(QueueState::default()),
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.clock, ClockSource::Manual(_))
    }

    pub fn pending_count(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.state.borrow().tasks.keys().next().map(|(due, _)| *due)
    }

    /// Runs every task whose deadline has passed. Returns the number run.
    pub fn run_due(&self) -> usize {
        self.run_until(self.now())
    }

    /// Moves a manual clock forward by `by`, running due tasks at their own
    /// deadlines along the way. A monotonic clock cannot be moved, so this
    /// only runs what is already due.
    pub fn advance(&self, by: Duration) -> usize {
        match &self.clock {
            ClockSource::Manual(now) => {
                let target = now.get() + by;
                self.run_until(target)
            }
            ClockSource::Monotonic(_) => {
                tracing::debug!("advance() on a monotonic timer queue only runs due tasks");
                self.run_due()
            }
        }
    }

    /// Runs everything currently queued, regardless of deadline.
    pub fn run_all(&self) -> usize {
        let mut fired = 0;
        while let Some(due) = self.next_deadline() {
            fired += self.run_until(due);
        }
        fired
    }

    fn run_until(&self, target: Duration) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let key = match state.tasks.keys().next() {
                    Some(&key) if key.0 <= target => key,
                    _ => break,
                };
                state.deadlines.remove(&key.1);
                state.tasks.remove(&key).map(|task| (key.0, task))
            };
            if let Some((due, task)) = next {
                if let ClockSource::Manual(now) = &self.clock {
                    if due > now.get() {
                        now.set(due);
                    }
                }
                task();
                fired += 1;
            }
        }
        if let ClockSource::Manual(now) = &self.clock {
            if target > now.get() {
                now.set(target);
            }
        }
        fired
    }
}

impl TaskScheduler for TimerQueue {
    fn now(&self) -> Duration {
        match &self.clock {
            ClockSource::Manual(now) => now.get(),
            ClockSource::Monotonic(start) => start.elapsed(),
        }
    }

    fn schedule(&self, delay: Duration, task: Callback) -> TimerHandle {
        let due = self.now() + delay;
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.tasks.insert((due, id), task);
        state.deadlines.insert(id, due);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut state = self.state.borrow_mut();
        match state.deadlines.remove(&handle.0) {
            Some(due) => state.tasks.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.state.borrow().deadlines.contains_key(&handle.0)
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("manual", &self.is_manual())
            .field("now", &self.now())
            .field("pending", &self.pending_count())
            .finish()
    }
}
