//! Album cache service
//!
//! Keeps recently loaded albums together with their resolved tracks. The cache
//! is an ordinary value: whoever constructs it owns it and hands clones of the
//! `Arc` to the components that need it.

use crate::config::FetchConfig;
use crate::models::{Album, Track};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedAlbum {
    album: Album,
    tracks: Arc<Vec<Track>>,
}

/// Bounded LRU cache of `(album, tracks)` keyed by album identifier
pub struct AlbumCache {
    entries: Mutex<LruCache<String, CachedAlbum>>,
}

impl AlbumCache {
    /// Create a cache holding at most `capacity` albums (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Create a cache sized by `config.album_cache_capacity`.
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.album_cache_capacity)
    }

    pub fn get_album(&self, album_id: &str) -> Option<Album> {
        self.entries
            .lock()
            .get(album_id)
            .map(|entry| entry.album.clone())
    }

    pub fn get_tracks(&self, album_id: &str) -> Option<Arc<Vec<Track>>> {
        self.entries
            .lock()
            .get(album_id)
            .map(|entry| Arc::clone(&entry.tracks))
    }

    /// Fetch album and tracks in one lookup
    pub fn get(&self, album_id: &str) -> Option<(Album, Arc<Vec<Track>>)> {
        self.entries
            .lock()
            .get(album_id)
            .map(|entry| (entry.album.clone(), Arc::clone(&entry.tracks)))
    }

    /// Insert or replace an album; the least recently used entry is evicted
    /// when the cache is full.
    pub fn insert(&self, album: Album, tracks: Vec<Track>) -> Arc<Vec<Track>> {
        let tracks = Arc::new(tracks);
        let key = album.id.clone();
        let evicted = self.entries.lock().push(
            key.clone(),
            CachedAlbum {
                album,
                tracks: Arc::clone(&tracks),
            },
        );

        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                debug!(album_id = %evicted_key, "Album evicted from cache");
            }
        }
        tracks
    }

    /// Remove one album. Returns `true` if it was cached.
    pub fn evict(&self, album_id: &str) -> bool {
        self.entries.lock().pop(album_id).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl std::fmt::Debug for AlbumCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
