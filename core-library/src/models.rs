//! Domain models for the music catalogue
//!
//! Records are plain data handed out by the resolver collaborator. They are
//! immutable once resolved; the only mutable attribute (a track's liked flag)
//! changes exclusively through [`LikeStore`](crate::repositories::LikeStore).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Domain Models
// =============================================================================

/// Playable media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque identifier
    pub id: String,
    pub title: String,
    /// Owning album
    pub album_id: String,
    /// Owning artist
    pub artist_id: String,
    /// Nominal duration in seconds, possibly approximate
    #[serde(default)]
    pub duration: Option<f64>,
    /// Artwork locator
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub is_liked: bool,
    /// Content locator; absent means the track cannot be played
    #[serde(default)]
    pub locator: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        album_id: impl Into<String>,
        artist_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            album_id: album_id.into(),
            artist_id: artist_id.into(),
            duration: None,
            artwork_url: None,
            is_liked: false,
            locator: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn liked(mut self, is_liked: bool) -> Self {
        self.is_liked = is_liked;
        self
    }

    /// Nominal duration usable as a provisional value: finite and positive,
    /// otherwise zero.
    pub fn nominal_duration(&self) -> f64 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0)
    }

    /// Trimmed content locator, or `None` when the track cannot be played.
    pub fn playable_locator(&self) -> Option<&str> {
        self.locator
            .as_deref()
            .map(str::trim)
            .filter(|locator| !locator.is_empty())
    }
}

/// Album with its ordered track listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist_id: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    /// Track count as advertised by the catalogue; may disagree with `track_ids`
    pub track_count: usize,
    /// Track identifiers in album order
    pub track_ids: Vec<String>,
}

impl Album {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist_id: impl Into<String>,
        track_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_id: artist_id.into(),
            release_date: None,
            artwork_url: None,
            track_count: track_ids.len(),
            track_ids,
        }
    }
}

/// Performing artist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
}

impl Artist {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bio: None,
            artwork_url: None,
        }
    }
}

/// User playlist: an ordered list of track identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub artwork_url: Option<String>,
    pub track_ids: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl Playlist {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner_id: impl Into<String>,
        track_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.into(),
            artwork_url: None,
            track_ids,
            is_public: false,
        }
    }

    pub fn track_count(&self) -> usize {
        self.track_ids.len()
    }
}
