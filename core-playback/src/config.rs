//! # Player Configuration
//!
//! Configuration types for the playback engine, controller and projector.

use core_library::FetchConfig;
use core_runtime::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Player configuration.
///
/// Every field has a default, so partial documents deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Interval between position samples taken from the transport.
    ///
    /// Default: 500ms (twice per second).
    #[serde(default = "default_sample_interval")]
    pub sample_interval: Duration,

    /// How long engine-driven position updates are ignored by the projector
    /// after a scrub ends. Covers the transport's reporting lag after a seek.
    ///
    /// Default: 800ms.
    #[serde(default = "default_seek_cooldown")]
    pub seek_cooldown: Duration,

    /// Capacity of the playback event bus.
    ///
    /// Default: 100 events.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Base URL that relative content locators are resolved against.
    ///
    /// Default: none (relative locators are handed to the transport as is).
    #[serde(default)]
    pub content_base_url: Option<String>,

    /// Batch resolution settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_sample_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_seek_cooldown() -> Duration {
    Duration::from_millis(800)
}

fn default_event_buffer_size() -> usize {
    core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            seek_cooldown: default_seek_cooldown(),
            event_buffer_size: default_event_buffer_size(),
            content_base_url: None,
            fetch: FetchConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Create a configuration tuned for snappier position feedback.
    ///
    /// - Faster sampling (250ms)
    /// - Shorter post-scrub cooldown (400ms)
    pub fn responsive() -> Self {
        Self {
            sample_interval: Duration::from_millis(250),
            seek_cooldown: Duration::from_millis(400),
            ..Default::default()
        }
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_seek_cooldown(mut self, cooldown: Duration) -> Self {
        self.seek_cooldown = cooldown;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    pub fn with_content_base_url(mut self, base: impl Into<String>) -> Self {
        self.content_base_url = Some(base.into());
        self
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval.is_zero() {
            return Err(Error::Config(
                "sample_interval must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than zero".to_string(),
            ));
        }

        if let Some(base) = &self.content_base_url {
            let parsed = Url::parse(base)
                .map_err(|e| Error::Config(format!("content_base_url is invalid: {}", e)))?;
            if parsed.cannot_be_a_base() {
                return Err(Error::Config(format!(
                    "content_base_url cannot be used as a base: {}",
                    base
                )));
            }
        }

        self.fetch.validate()
    }
}
