//! Observer list for synchronous state-change notification.
//!
//! Replaces a global event bus: each drawing session owns its own
//! [`ObserverList`], observers are called on the notifying thread within the
//! same turn as the state change, in registration order.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use crate::types::DataCallback;

/// Subscription handle for unsubscribing an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Ordered list of observers for events of type `E`.
pub struct ObserverList<E> {
    observers: RefCell<Vec<(SubscriptionId, DataCallback<E>)>>,
}

impl<E> ObserverList<E> {
    pub fn new() -> Self {
        Self {
            observers: RefCell::new(Vec::new()),
        }
    }

    /// Registers an observer; it will be called after all earlier ones.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&E) + 'static,
    {
        let id = SubscriptionId::new();
        let observer: DataCallback<E> = Rc::new(observer);
        self.observers.borrow_mut().push((id, observer));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        let removed = observers.len() != before;
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Calls every observer with `event` and returns how many were called.
    ///
    /// The list is snapshotted first, so observers may subscribe or
    /// unsubscribe while being notified; such changes apply from the next
    /// notification on.
    pub fn notify(&self, event: &E) -> usize {
        let snapshot: Vec<DataCallback<E>> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in &snapshot {
            observer(event);
        }
        snapshot.len()
    }

    pub fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.borrow().is_empty()
    }
}

impl<E> Default for ObserverList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ObserverList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.len())
            .finish()
    }
}
