//! Type aliases for commonly used complex types.
//!
//! The snap engine runs on a single cooperative thread (the UI event loop),
//! so shared state is `Rc<RefCell<T>>` rather than `Arc<Mutex<T>>`.
//!
//! ## Usage
//!
//! ```rust
//! use ductkit_core::types::*;
//!
//! let counter: Shared<u32> = shared(0);
//! *counter.borrow_mut() += 1;
//! assert_eq!(*counter.borrow(), 1);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

/// A reference-counted, interior-mutable wrapper for single-threaded sharing.
pub type Shared<T> = Rc<RefCell<T>>;

/// A one-shot deferred callback, as queued on a timer.
pub type Callback = Box<dyn FnOnce()>;

/// A repeatable callback receiving a value by reference.
pub type DataCallback<T> = Rc<dyn Fn(&T)>;

/// Create a new `Shared<T>` from a value.
#[inline]
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}
