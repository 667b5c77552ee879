//! DuctKit Settings Crate
//!
//! Handles snap engine configuration: defaults, JSON/TOML persistence and
//! validation.

pub mod config;
pub mod error;

pub use config::{
    AdaptiveSettings, BatchSettings, DebounceSettings, EngineConfig, IndexSettings,
    MonitorSettings, SnapSettings,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
