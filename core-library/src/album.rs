//! Album loading through the fetch pipeline and album cache

use crate::cache::AlbumCache;
use crate::error::{LibraryError, Result};
use crate::fetch::FetchPipeline;
use crate::models::{Album, Track};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A loaded album with its resolvable tracks in album order
#[derive(Debug, Clone)]
pub struct LoadedAlbum {
    pub album: Album,
    pub tracks: Arc<Vec<Track>>,
    /// `true` when served from the cache without touching the resolver
    pub from_cache: bool,
}

impl LoadedAlbum {
    /// Identifiers of the resolved tracks, ready to become a playback sequence
    pub fn track_ids(&self) -> Vec<String> {
        self.tracks.iter().map(|track| track.id.clone()).collect()
    }
}

/// Resolves albums and their tracks, caching the result
pub struct AlbumLoader {
    pipeline: FetchPipeline,
    cache: Arc<AlbumCache>,
}

impl AlbumLoader {
    pub fn new(pipeline: FetchPipeline, cache: Arc<AlbumCache>) -> Self {
        Self { pipeline, cache }
    }

    pub fn cache(&self) -> &Arc<AlbumCache> {
        &self.cache
    }

    /// Load an album record and its tracks.
    ///
    /// Tracks that fail to resolve are omitted; the remaining ones keep album
    /// order.
    ///
    /// # Errors
    /// - `NotFound` if the album does not exist
    /// - `Resolver` if the album record lookup fails
    #[instrument(skip(self))]
    pub async fn load_album(&self, album_id: &str) -> Result<LoadedAlbum> {
        if let Some((album, tracks)) = self.cache.get(album_id) {
            debug!("Album served from cache");
            return Ok(LoadedAlbum {
                album,
                tracks,
                from_cache: true,
            });
        }

        let album = self
            .pipeline
            .resolver()
            .resolve_album(album_id)
            .await?
            .ok_or_else(|| LibraryError::not_found("album", album_id))?;

        let tracks = self.pipeline.resolve_ordered(&album.track_ids).await;
        debug!(
            listed = album.track_ids.len(),
            resolved = tracks.len(),
            "Album tracks resolved"
        );

        let tracks = self.cache.insert(album.clone(), tracks);
        Ok(LoadedAlbum {
            album,
            tracks,
            from_cache: false,
        })
    }

    /// Drop a cached album so the next load goes back to the resolver
    pub fn invalidate(&self, album_id: &str) -> bool {
        self.cache.evict(album_id)
    }
}
