//! Fetch pipeline configuration

use core_runtime::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of albums kept by [`AlbumCache`](crate::cache::AlbumCache)
pub const DEFAULT_ALBUM_CACHE_CAPACITY: usize = 64;

/// Tuning knobs for batch resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound on in-flight lookups per batch. `None` dispatches one task
    /// per identifier at once.
    pub max_concurrent: Option<usize>,

    /// Albums retained by the album cache
    pub album_cache_capacity: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: None,
            album_cache_capacity: DEFAULT_ALBUM_CACHE_CAPACITY,
        }
    }
}

impl FetchConfig {
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = Some(limit);
        self
    }

    pub fn with_album_cache_capacity(mut self, capacity: usize) -> Self {
        self.album_cache_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == Some(0) {
            return Err(Error::Config(
                "fetch.max_concurrent must be greater than zero".to_string(),
            ));
        }

        if self.album_cache_capacity == 0 {
            return Err(Error::Config(
                "fetch.album_cache_capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
