//! Pipeline configuration.

use std::path::PathBuf;

use crate::cache::CacheConfig;

/// Inputs and cache settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Header-less `address,latitude,longitude` CSV, sorted by address.
    pub stations_path: PathBuf,

    /// Session log CSV with a header row, sorted by address.
    pub sessions_path: PathBuf,

    /// Where and how stage results are cached.
    pub cache: CacheConfig,
}

impl PipelineConfig {
    /// Create a config with the default cache settings.
    pub fn new(stations_path: impl Into<PathBuf>, sessions_path: impl Into<PathBuf>) -> Self {
        Self {
            stations_path: stations_path.into(),
            sessions_path: sessions_path.into(),
            cache: CacheConfig::default(),
        }
    }

    /// Replace the cache settings.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
