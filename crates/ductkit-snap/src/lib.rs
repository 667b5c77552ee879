//! # DuctKit Snap
//!
//! Real-time snapping engine for interactive HVAC centerline drawing.
//!
//! ## Components
//!
//! - **Spatial Index**: quadtree over candidate snap points with region,
//!   radius and nearest-neighbour queries
//! - **Snap Point Registry**: derives snap points from project geometry and
//!   emits batched index mutations
//! - **Snap Resolver**: turns a cursor into an attracted position plus a typed
//!   snap result, using a hard snap radius and a wider magnetic radius
//! - **Interaction Scheduler**: trailing-edge debouncing per interaction key
//! - **Mutation Batcher**: priority-ordered batches flushed on size or delay
//! - **Adaptive Tuner**: adjusts debounce delay and batch size from the
//!   measured frame score
//!
//! ## Architecture
//!
//! ```text
//! geometry change ─> Registry ─> MutationBatcher ─> SpatialIndex
//! pointer move ─> InteractionScheduler ─> SnapResolver ─> SpatialIndex query
//!                                              └─> Resolution (to the UI)
//! FrameMonitor ─> AdaptiveTuner ─> scheduler delay / batch size
//! ```
//!
//! Everything runs on one thread. Deferred work goes through the
//! [`ductkit_core::TaskScheduler`] capability, and a [`DrawingSession`] owns
//! one instance of each component.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use ductkit_core::{Bounds2D, Point2D, TimerQueue, ViewTransform};
//! use ductkit_settings::EngineConfig;
//! use ductkit_snap::{DrawingSession, ElementId, GeometryElement};
//!
//! let timers = Rc::new(TimerQueue::manual());
//! let session = DrawingSession::new(
//!     Bounds2D::new(0.0, 0.0, 1000.0, 1000.0),
//!     &EngineConfig::default(),
//!     timers.clone(),
//! )?;
//! session.upsert_element(
//!     ElementId(1),
//!     GeometryElement::DuctSegment {
//!         start: Point2D::new(100.0, 100.0),
//!         end: Point2D::new(300.0, 100.0),
//!     },
//! )?;
//! session.flush_all_batches();
//! let resolution = session.resolve_now(Point2D::new(103.0, 98.0), ViewTransform::identity());
//! ```

pub mod adaptive;
pub mod batcher;
pub mod cache;
pub mod debounce;
pub mod error;
pub mod performance;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod snap_point;
pub mod spatial_index;

pub use adaptive::{AdaptiveTuner, TuningAdjustment, TuningDirection, TuningState};
pub use batcher::{
    BatchOperation, BatchStats, FlushReport, MutationBatcher, OperationData, OperationKind,
    OperationProcessor, OperationTarget,
};
pub use cache::SnapCache;
pub use debounce::{InteractionKind, InteractionScheduler};
pub use error::{Result, SnapError};
pub use performance::FrameMonitor;
pub use registry::{GeometryElement, GeometrySnapshot, SnapPointRegistry};
pub use resolver::{Resolution, SnapResolver, SnapResult, SnapStrength};
pub use session::{DrawingSession, EngineStats, PointerSample, PointerSource, SessionEvent};
pub use snap_point::{ElementId, SnapObject, SnapPoint};
pub use spatial_index::{SpatialIndex, SpatialIndexStats, SpatialObject};
