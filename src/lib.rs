//! # DuctKit
//!
//! Real-time snapping engine for interactive HVAC centerline drawing.
//!
//! ## Architecture
//!
//! DuctKit is organized as a workspace with multiple crates:
//!
//! 1. **ductkit-core** - Geometry, timers, observers, error types
//! 2. **ductkit-settings** - Engine configuration loading and validation
//! 3. **ductkit-snap** - Spatial index, snap resolution, debouncing, batching, tuning
//! 4. **ductkit** - Logging setup and a demo driver over a scripted pointer

pub use ductkit_core::{
    Bounds2D, GeometryError, Point2D, SnapPointType, TaskScheduler, TimerQueue, ViewTransform,
};
pub use ductkit_settings::{EngineConfig, SettingsError};
pub use ductkit_snap::{
    DrawingSession, ElementId, EngineStats, GeometryElement, PointerSample, PointerSource,
    Resolution, SessionEvent, SnapError, SnapResult, SnapStrength,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
