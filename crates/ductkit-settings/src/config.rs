//! Engine configuration for the snap engine.
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats; the default location is in the platform config
//! directory.
//!
//! Configuration is organized into logical sections:
//! - Snap thresholds and type priority
//! - Spatial index subdivision parameters
//! - Debounce delays per interaction channel
//! - Mutation batching
//! - Adaptive tuning bounds and thresholds
//! - Frame monitoring
//!
//! Every value is tunable per deployment; [`EngineConfig::validate`] is the
//! single place where bad values are rejected.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ductkit_core::SnapPointType;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// Snap resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    /// Hard-snap radius in screen pixels
    pub snap_threshold_px: f64,
    /// Magnetic attraction radius in screen pixels
    pub magnetic_threshold_px: f64,
    /// Snap point categories from most to least preferred. Categories not
    /// listed rank after every listed one.
    pub type_priority: Vec<SnapPointType>,
    /// Maximum number of memoised resolutions
    pub cache_capacity: usize,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            snap_threshold_px: 10.0,
            magnetic_threshold_px: 20.0,
            type_priority: SnapPointType::ALL.to_vec(),
            cache_capacity: 256,
        }
    }
}

/// Spatial index subdivision settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Objects a leaf holds before it subdivides
    pub max_points: usize,
    /// Maximum tree depth (root is depth 0)
    pub max_depth: usize,
    /// Nodes this small or smaller never subdivide (world units)
    pub min_node_size: f64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            max_points: 10,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

/// Debounce delays per interaction channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceSettings {
    /// Pointer movement delay in milliseconds (~120 fps)
    pub mouse_move_ms: u64,
    /// Snap query delay in milliseconds
    pub snap_query_ms: u64,
    /// Drawing-operation delay in milliseconds (~60 fps)
    pub drawing_ms: u64,
}

impl DebounceSettings {
    pub fn mouse_move_delay(&self) -> Duration {
        Duration::from_millis(self.mouse_move_ms)
    }

    pub fn snap_query_delay(&self) -> Duration {
        Duration::from_millis(self.snap_query_ms)
    }

    pub fn drawing_delay(&self) -> Duration {
        Duration::from_millis(self.drawing_ms)
    }
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            mouse_move_ms: 8,
            snap_query_ms: 8,
            drawing_ms: 16,
        }
    }
}

/// Mutation batching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Queue length that triggers an immediate flush
    pub batch_size: usize,
    /// Milliseconds after the first queued operation before a flush
    pub batch_delay_ms: u64,
}

impl BatchSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_delay_ms: 16,
        }
    }
}

/// Adaptive tuning settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveSettings {
    /// Whether the tuner runs at all
    pub enabled: bool,
    /// How often the performance score is evaluated
    pub evaluation_interval_ms: u64,
    /// Minimum time between two applied adjustments
    pub min_adjustment_interval_ms: u64,
    /// Scores below this back off (longer delay, bigger batches)
    pub low_score_threshold: f64,
    /// Scores above this tighten (shorter delay, smaller batches)
    pub high_score_threshold: f64,
    /// Debounce delay floor
    pub min_delay_ms: u64,
    /// Debounce delay ceiling
    pub max_delay_ms: u64,
    /// Delay change per adjustment
    pub delay_step_ms: u64,
    /// Batch size floor
    pub min_batch_size: usize,
    /// Batch size ceiling
    pub max_batch_size: usize,
    /// Batch size change per adjustment
    pub batch_step: usize,
}

impl AdaptiveSettings {
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_millis(self.evaluation_interval_ms)
    }

    pub fn min_adjustment_interval(&self) -> Duration {
        Duration::from_millis(self.min_adjustment_interval_ms)
    }
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            evaluation_interval_ms: 5_000,
            min_adjustment_interval_ms: 10_000,
            low_score_threshold: 60.0,
            high_score_threshold: 95.0,
            min_delay_ms: 8,
            max_delay_ms: 32,
            delay_step_ms: 4,
            min_batch_size: 20,
            max_batch_size: 100,
            batch_step: 10,
        }
    }
}

/// Frame monitoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Frame rate that scores 100
    pub target_fps: f64,
    /// Number of recent frames averaged
    pub window_size: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            window_size: 60,
        }
    }
}

/// Complete engine configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub snap: SnapSettings,
    pub index: IndexSettings,
    pub debounce: DebounceSettings,
    pub batching: BatchSettings,
    pub adaptive: AdaptiveSettings,
    pub monitor: MonitorSettings,
}

impl EngineConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location: `<config dir>/ductkit/engine.toml`.
    pub fn default_config_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("ductkit").join("engine.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no platform config directory".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = match Self::format_of(path)? {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Load config from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Self::format_of(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("Failed to write {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    fn format_of(path: &Path) -> ConfigResult<ConfigFormat> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(ConfigFormat::Json),
            Some("toml") => Ok(ConfigFormat::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        // Snap thresholds
        let snap = &self.snap;
        if !(snap.snap_threshold_px.is_finite() && snap.snap_threshold_px > 0.0) {
            return Err(ConfigError::out_of_range(
                "snap.snap_threshold_px",
                snap.snap_threshold_px,
            ));
        }
        if !snap.magnetic_threshold_px.is_finite()
            || snap.magnetic_threshold_px < snap.snap_threshold_px
        {
            return Err(ConfigError::Inconsistent(format!(
                "magnetic threshold {}px is smaller than snap threshold {}px",
                snap.magnetic_threshold_px, snap.snap_threshold_px
            )));
        }
        for (i, kind) in snap.type_priority.iter().enumerate() {
            if snap.type_priority[..i].contains(kind) {
                return Err(ConfigError::Inconsistent(format!(
                    "snap type '{}' listed twice in type_priority",
                    kind
                )));
            }
        }

        // Spatial index
        if self.index.max_points == 0 {
            return Err(ConfigError::out_of_range("index.max_points", 0));
        }
        if !(self.index.min_node_size.is_finite() && self.index.min_node_size > 0.0) {
            return Err(ConfigError::out_of_range(
                "index.min_node_size",
                self.index.min_node_size,
            ));
        }

        // Batching
        if self.batching.batch_size == 0 {
            return Err(ConfigError::out_of_range("batching.batch_size", 0));
        }

        // Monitoring
        if !(self.monitor.target_fps.is_finite() && self.monitor.target_fps > 0.0) {
            return Err(ConfigError::out_of_range(
                "monitor.target_fps",
                self.monitor.target_fps,
            ));
        }
        if self.monitor.window_size == 0 {
            return Err(ConfigError::out_of_range("monitor.window_size", 0));
        }

        self.validate_adaptive()
    }

    fn validate_adaptive(&self) -> ConfigResult<()> {
        let adaptive = &self.adaptive;
        if !adaptive.enabled {
            return Ok(());
        }

        if adaptive.evaluation_interval_ms == 0 {
            return Err(ConfigError::out_of_range(
                "adaptive.evaluation_interval_ms",
                0,
            ));
        }
        if adaptive.min_delay_ms > adaptive.max_delay_ms {
            return Err(ConfigError::Inconsistent(format!(
                "adaptive delay floor {}ms exceeds ceiling {}ms",
                adaptive.min_delay_ms, adaptive.max_delay_ms
            )));
        }
        if adaptive.min_batch_size == 0 || adaptive.min_batch_size > adaptive.max_batch_size {
            return Err(ConfigError::Inconsistent(format!(
                "adaptive batch floor {} must be in 1..={}",
                adaptive.min_batch_size, adaptive.max_batch_size
            )));
        }
        if !(0.0..=100.0).contains(&adaptive.low_score_threshold)
            || !(0.0..=100.0).contains(&adaptive.high_score_threshold)
            || adaptive.low_score_threshold >= adaptive.high_score_threshold
        {
            return Err(ConfigError::Inconsistent(format!(
                "score thresholds must satisfy 0 <= low ({}) < high ({}) <= 100",
                adaptive.low_score_threshold, adaptive.high_score_threshold
            )));
        }

        let delay = self.debounce.mouse_move_ms;
        if delay < adaptive.min_delay_ms || delay > adaptive.max_delay_ms {
            return Err(ConfigError::Inconsistent(format!(
                "pointer delay {}ms is outside adaptive bounds {}..={}ms",
                delay, adaptive.min_delay_ms, adaptive.max_delay_ms
            )));
        }
        let batch = self.batching.batch_size;
        if batch < adaptive.min_batch_size || batch > adaptive.max_batch_size {
            return Err(ConfigError::Inconsistent(format!(
                "batch size {} is outside adaptive bounds {}..={}",
                batch, adaptive.min_batch_size, adaptive.max_batch_size
            )));
        }

        Ok(())
    }
}

enum ConfigFormat {
    Json,
    Toml,
}
