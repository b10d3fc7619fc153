//! # Collaborator Traits
//!
//! Boundaries to the catalogue and the local store. Playback and the fetch
//! pipeline only ever talk to these traits; concrete backends (remote API,
//! local database, in-memory fixture) live behind them.
//!
//! - `TrackResolver` - per-identifier and bulk lookups against the catalogue
//! - `LikeStore` - the locally persisted liked flag of a track

use crate::error::{LibraryError, Result};
use crate::models::{Album, Artist, Track};
use async_trait::async_trait;

pub mod memory;

pub use memory::{BulkMode, InMemoryLibrary};

/// Catalogue lookups
///
/// Every call may suspend and may fail. Timeouts are the implementation's
/// responsibility.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolve a track by its identifier
    ///
    /// # Returns
    /// - `Ok(Some(track))` if found
    /// - `Ok(None)` if the catalogue has no such track
    /// - `Err` if the lookup itself failed
    async fn resolve_track(&self, id: &str) -> Result<Option<Track>>;

    /// Resolve an album record (without its tracks)
    async fn resolve_album(&self, id: &str) -> Result<Option<Album>>;

    /// Resolve an artist record
    ///
    /// The default reports artist lookups as unavailable.
    async fn resolve_artist(&self, id: &str) -> Result<Option<Artist>> {
        let _ = id;
        Err(LibraryError::Unsupported("artist lookup".to_string()))
    }

    /// Bulk resolution of many identifiers in one call
    ///
    /// Implementations may return fewer tracks than requested and in any
    /// order. The default reports the bulk path as unavailable.
    async fn resolve_playlist_tracks(&self, ids: &[String]) -> Result<Vec<Track>> {
        let _ = ids;
        Err(LibraryError::Unsupported(
            "bulk playlist resolution".to_string(),
        ))
    }
}

/// Locally persisted liked flags
#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Read the liked flag of a track
    ///
    /// # Returns
    /// - `Ok(Some(flag))` if the track has a local record
    /// - `Ok(None)` if there is no local record
    async fn resolve_liked_flag(&self, id: &str) -> Result<Option<bool>>;

    /// Persist the liked flag of a track
    ///
    /// # Errors
    /// Returns `NotFound` if the track has no local record.
    async fn set_liked_flag(&self, id: &str, liked: bool) -> Result<()>;
}
