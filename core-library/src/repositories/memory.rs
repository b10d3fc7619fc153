//! In-memory catalogue and local store
//!
//! Backs demos and tests. Lookups can be made to fail or to take a while on a
//! per-identifier basis so that batch behaviour can be exercised without a
//! network.

use crate::error::{LibraryError, Result};
use crate::models::{Album, Artist, Track};
use crate::repositories::{LikeStore, TrackResolver};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

/// How the bulk lookup path behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkMode {
    /// Bulk lookups report `Unsupported`
    #[default]
    Unavailable,
    /// Bulk lookups return every known track
    Complete,
    /// Bulk lookups return at most this many tracks
    Partial(usize),
}

#[derive(Default)]
struct LibraryState {
    tracks: HashMap<String, Track>,
    albums: HashMap<String, Album>,
    artists: HashMap<String, Artist>,
    failing: HashSet<String>,
    latency: HashMap<String, Duration>,
    bulk: BulkMode,
}

/// Thread-safe in-memory implementation of [`TrackResolver`] and [`LikeStore`]
#[derive(Default)]
pub struct InMemoryLibrary {
    state: RwLock<LibraryState>,
    track_lookups: AtomicUsize,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library pre-populated with `tracks`
    pub fn with_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        let library = Self::new();
        for track in tracks {
            library.insert_track(track);
        }
        library
    }

    pub fn insert_track(&self, track: Track) {
        self.state.write().tracks.insert(track.id.clone(), track);
    }

    pub fn insert_album(&self, album: Album) {
        self.state.write().albums.insert(album.id.clone(), album);
    }

    pub fn insert_artist(&self, artist: Artist) {
        self.state.write().artists.insert(artist.id.clone(), artist);
    }

    pub fn remove_track(&self, id: &str) -> Option<Track> {
        self.state.write().tracks.remove(id)
    }

    pub fn track(&self, id: &str) -> Option<Track> {
        self.state.read().tracks.get(id).cloned()
    }

    /// Make every lookup of `id` fail with a resolver error
    pub fn fail_on(&self, id: impl Into<String>) {
        self.state.write().failing.insert(id.into());
    }

    /// Delay every lookup of `id` by `delay`
    pub fn set_latency(&self, id: impl Into<String>, delay: Duration) {
        self.state.write().latency.insert(id.into(), delay);
    }

    pub fn set_bulk_mode(&self, mode: BulkMode) {
        self.state.write().bulk = mode;
    }

    /// Number of per-identifier track lookups served so far
    pub fn track_lookups(&self) -> usize {
        self.track_lookups.load(Ordering::SeqCst)
    }

    /// Apply configured latency and failure for `id`.
    async fn gate(&self, id: &str) -> Result<()> {
        let (delay, failing) = {
            let state = self.state.read();
            (state.latency.get(id).copied(), state.failing.contains(id))
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if failing {
            return Err(LibraryError::Resolver(format!("lookup of {} failed", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackResolver for InMemoryLibrary {
    #[instrument(skip(self))]
    async fn resolve_track(&self, id: &str) -> Result<Option<Track>> {
        self.track_lookups.fetch_add(1, Ordering::SeqCst);
        self.gate(id).await?;
        Ok(self.state.read().tracks.get(id).cloned())
    }

    #[instrument(skip(self))]
    async fn resolve_album(&self, id: &str) -> Result<Option<Album>> {
        self.gate(id).await?;
        Ok(self.state.read().albums.get(id).cloned())
    }

    #[instrument(skip(self))]
    async fn resolve_artist(&self, id: &str) -> Result<Option<Artist>> {
        self.gate(id).await?;
        Ok(self.state.read().artists.get(id).cloned())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn resolve_playlist_tracks(&self, ids: &[String]) -> Result<Vec<Track>> {
        let state = self.state.read();
        let limit = match state.bulk {
            BulkMode::Unavailable => {
                return Err(LibraryError::Unsupported(
                    "bulk playlist resolution".to_string(),
                ))
            }
            BulkMode::Complete => usize::MAX,
            BulkMode::Partial(limit) => limit,
        };

        let tracks: Vec<Track> = ids
            .iter()
            .filter(|id| !state.failing.contains(id.as_str()))
            .filter_map(|id| state.tracks.get(id).cloned())
            .take(limit)
            .collect();

        debug!(resolved = tracks.len(), "Bulk lookup served");
        Ok(tracks)
    }
}

#[async_trait]
impl LikeStore for InMemoryLibrary {
    async fn resolve_liked_flag(&self, id: &str) -> Result<Option<bool>> {
        Ok(self.state.read().tracks.get(id).map(|track| track.is_liked))
    }

    async fn set_liked_flag(&self, id: &str, liked: bool) -> Result<()> {
        let mut state = self.state.write();
        let track = state
            .tracks
            .get_mut(id)
            .ok_or_else(|| LibraryError::not_found("track", id))?;
        track.is_liked = liked;
        Ok(())
    }
}
