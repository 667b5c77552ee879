//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Aliases for `Rc<RefCell<T>>` shared state and callbacks.

pub mod aliases;

pub use aliases::*;
