//! Configuration for the aggregation engine and the data service.
//!
//! [`EngineConfig`] is fixed when the engine is built. [`ConfigFile`] loads
//! both engine and service settings from an INI file.

mod file;

pub use file::{config_file_path, ConfigFile, ConfigFileError};

use thiserror::Error;

use crate::coord::MAX_ZOOM;

/// Point count at or above which aggregated rendering is used.
///
/// Zero means every viewport is aggregated and the exact path is never taken.
/// That is the shipped behaviour; raise it to render small result sets as
/// individual points.
pub const DEFAULT_COARSE_THRESHOLD: u64 = 0;

/// Zoom levels added to the map zoom to pick the aggregation tile zoom.
///
/// 0 is very coarse (one tile per map tile), 2 is fine (16 per map tile).
pub const DEFAULT_COARSE_GRANULARITY: u8 = 2;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5984/nodes";
pub const DEFAULT_NODES_SPATIAL: &str = "_spatial/nodes";
pub const DEFAULT_NODES_COARSE: &str = "_view/nodes_coarse";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("coarse_granularity {0} exceeds the maximum zoom level")]
    GranularityTooLarge(u8),

    #[error("max_zoom {0} exceeds the supported maximum zoom level")]
    MaxZoomTooLarge(u8),
}

/// Aggregation engine settings. Immutable once the engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Probe counts at or above this use per-tile aggregation.
    pub coarse_threshold: u64,

    /// How many zoom levels finer than the map the aggregation grid is.
    pub coarse_granularity: u8,

    /// Ceiling for the aggregation zoom, applied on top of the map's own maximum.
    pub max_zoom: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coarse_threshold: DEFAULT_COARSE_THRESHOLD,
            coarse_granularity: DEFAULT_COARSE_GRANULARITY,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl EngineConfig {
    pub fn with_coarse_threshold(mut self, threshold: u64) -> Self {
        self.coarse_threshold = threshold;
        self
    }

    pub fn with_coarse_granularity(mut self, granularity: u8) -> Self {
        self.coarse_granularity = granularity;
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coarse_granularity > MAX_ZOOM {
            return Err(ConfigError::GranularityTooLarge(self.coarse_granularity));
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(ConfigError::MaxZoomTooLarge(self.max_zoom));
        }
        Ok(())
    }

    /// Zoom of the aggregation grid for a map at `map_zoom` whose own ceiling is `map_max_zoom`.
    pub fn tile_zoom(&self, map_zoom: u8, map_max_zoom: u8) -> u8 {
        let ceiling = map_max_zoom.min(self.max_zoom);
        map_zoom
            .saturating_add(self.coarse_granularity)
            .min(ceiling)
    }

    /// Whether a probe count selects the aggregated path.
    #[inline]
    pub fn aggregates(&self, count: u64) -> bool {
        count >= self.coarse_threshold
    }
}

/// Where the point database and its views live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Database URL, e.g. `http://localhost:5984/nodes`.
    pub base_url: String,

    /// Spatial view path, relative to `base_url`.
    pub nodes_spatial: String,

    /// Grouped-count view path, relative to `base_url`.
    pub nodes_coarse: String,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            nodes_spatial: DEFAULT_NODES_SPATIAL.to_string(),
            nodes_coarse: DEFAULT_NODES_COARSE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
