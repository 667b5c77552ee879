//! # DuctKit Core
//!
//! Core types and utilities shared by the DuctKit snap engine crates:
//! world-space geometry, geometry errors, the injectable timer capability and
//! the synchronous observer list that replaces global event emitters.

pub mod error;
pub mod geometry;
pub mod observer;
pub mod snap_type;
pub mod timer;
pub mod types;

pub use error::{GeometryError, Result};
pub use geometry::{Bounds2D, Point2D, ViewTransform};
pub use observer::{ObserverList, SubscriptionId};
pub use snap_type::SnapPointType;
pub use timer::{TaskScheduler, TimerHandle, TimerQueue};

// Re-export type aliases for convenience
pub use types::{shared, Callback, DataCallback, Shared};
