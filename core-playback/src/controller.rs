//! # Playback Controller
//!
//! Translates user-level commands (play this track from that list, next,
//! previous, like) into engine operations while owning the playlist cursor.
//!
//! Commands that touch the cursor run one at a time in issue order. A command
//! that fails leaves both the cursor and the engine session as they were.

use crate::cursor::PlaylistCursor;
use crate::engine::PlaybackEngine;
use crate::error::{PlaybackError, Result};
use core_library::{
    AlbumCache, AlbumLoader, FetchPipeline, LibraryError, LikeStore, Playlist, Track,
    TrackResolver,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Next,
    Previous,
}

/// Command surface over the engine, the resolver and the like store.
pub struct PlaybackController {
    engine: Arc<PlaybackEngine>,
    resolver: Arc<dyn TrackResolver>,
    likes: Arc<dyn LikeStore>,
    pipeline: FetchPipeline,
    albums: AlbumLoader,
    cursor: RwLock<PlaylistCursor>,
    commands: tokio::sync::Mutex<()>,
}

impl PlaybackController {
    /// Create a controller. Batch lookups use the engine's fetch settings and
    /// loaded albums are kept in `album_cache`.
    pub fn new(
        engine: Arc<PlaybackEngine>,
        resolver: Arc<dyn TrackResolver>,
        likes: Arc<dyn LikeStore>,
        album_cache: Arc<AlbumCache>,
    ) -> Self {
        let pipeline = FetchPipeline::new(Arc::clone(&resolver), engine.config().fetch.clone());
        let albums = AlbumLoader::new(pipeline.clone(), album_cache);

        Self {
            engine,
            resolver,
            likes,
            pipeline,
            albums,
            cursor: RwLock::new(PlaylistCursor::default()),
            commands: tokio::sync::Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    /// Snapshot of the playlist cursor.
    pub fn cursor(&self) -> PlaylistCursor {
        self.cursor.read().clone()
    }

    /// Play `id`, remembering `sequence` as the surrounding playlist.
    ///
    /// The cursor index points at `id` within `sequence`, or is absent when
    /// `id` is not part of it.
    ///
    /// # Errors
    /// - `TrackNotFound` if the resolver cannot produce the track
    /// - `NotPlayable` if the track has no content locator
    #[instrument(skip(self, sequence), fields(sequence_len = sequence.len()))]
    pub async fn play_track(&self, id: &str, sequence: Vec<String>) -> Result<()> {
        let _command = self.commands.lock().await;
        let track = self.resolve(id).await?;
        self.start(track, sequence).await
    }

    /// Play the first entry of `sequence`.
    ///
    /// # Errors
    /// Returns `EmptySequence` for an empty list, otherwise as [`play_track`](Self::play_track).
    pub async fn play_sequence(&self, sequence: Vec<String>) -> Result<()> {
        let first = sequence.first().cloned().ok_or(PlaybackError::EmptySequence)?;
        self.play_track(&first, sequence).await
    }

    /// Load an album through the fetch pipeline and play it from the start.
    ///
    /// Tracks that cannot be resolved are left out of the sequence.
    #[instrument(skip(self))]
    pub async fn play_album(&self, album_id: &str) -> Result<()> {
        let _command = self.commands.lock().await;
        let loaded = self.albums.load_album(album_id).await?;

        let first = loaded
            .tracks
            .first()
            .cloned()
            .ok_or(PlaybackError::EmptySequence)?;
        debug!(
            tracks = loaded.tracks.len(),
            from_cache = loaded.from_cache,
            "Album ready"
        );
        self.start(first, loaded.track_ids()).await
    }

    /// Resolve a playlist (bulk first, per track as fallback) and play it.
    ///
    /// Unresolvable entries are left out of the sequence.
    #[instrument(skip(self, playlist), fields(playlist_id = %playlist.id))]
    pub async fn play_playlist(&self, playlist: &Playlist) -> Result<()> {
        let _command = self.commands.lock().await;
        let tracks = self
            .pipeline
            .resolve_playlist_tracks_with_fallback(&playlist.track_ids)
            .await;

        let sequence: Vec<String> = tracks.iter().map(|track| track.id.clone()).collect();
        let first = tracks
            .into_iter()
            .next()
            .ok_or(PlaybackError::EmptySequence)?;
        self.start(first, sequence).await
    }

    /// Advance to the next entry of the sequence.
    ///
    /// # Errors
    /// - `NoActiveSequence` when the current track is not part of a sequence
    /// - `EndOfPlaylist` on the last entry
    /// - `TrackNotFound` if the next track cannot be resolved
    pub async fn play_next(&self) -> Result<()> {
        self.step(Step::Next).await
    }

    /// Go back to the previous entry of the sequence.
    ///
    /// # Errors
    /// - `NoActiveSequence` when the current track is not part of a sequence
    /// - `BeginningOfPlaylist` on the first entry
    /// - `TrackNotFound` if the previous track cannot be resolved
    pub async fn play_previous(&self) -> Result<()> {
        self.step(Step::Previous).await
    }

    /// Flip the liked flag of `id` in the local store and return the new value.
    ///
    /// # Errors
    /// Returns `TrackNotFoundLocally` if the store has no record of the track.
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, id: &str) -> Result<bool> {
        let current = self
            .likes
            .resolve_liked_flag(id)
            .await?
            .ok_or_else(|| PlaybackError::TrackNotFoundLocally(id.to_string()))?;

        let liked = !current;
        self.likes
            .set_liked_flag(id, liked)
            .await
            .map_err(|e| match e {
                LibraryError::NotFound { .. } => PlaybackError::TrackNotFoundLocally(id.to_string()),
                other => PlaybackError::Library(other),
            })?;

        info!(liked, "Like toggled");
        Ok(liked)
    }

    pub async fn seek(&self, seconds: f64) {
        self.engine.seek(seconds).await;
    }

    pub async fn toggle_play_pause(&self) {
        self.engine.toggle_play_pause().await;
    }

    pub async fn play(&self) {
        self.engine.play().await;
    }

    pub async fn pause(&self) {
        self.engine.pause().await;
    }

    #[instrument(skip(self))]
    async fn step(&self, step: Step) -> Result<()> {
        let _command = self.commands.lock().await;

        let (index, id) = {
            let cursor = self.cursor.read();
            let (index, id) = match step {
                Step::Next => cursor.peek_next()?,
                Step::Previous => cursor.peek_previous()?,
            };
            (index, id.to_string())
        };

        let track = self.resolve(&id).await?;
        self.engine.load(track).await?;
        self.cursor.write().move_to(index);
        debug!(index, track_id = %id, "Cursor moved");

        self.engine.play().await;
        Ok(())
    }

    /// Load `track`, rebuild the cursor around it and start playback.
    async fn start(&self, track: Track, sequence: Vec<String>) -> Result<()> {
        let id = track.id.clone();
        self.engine.load(track).await?;

        let cursor = PlaylistCursor::new(sequence, &id);
        debug!(index = ?cursor.index(), len = cursor.len(), "Cursor rebuilt");
        *self.cursor.write() = cursor;

        self.engine.play().await;
        Ok(())
    }

    async fn resolve(&self, id: &str) -> Result<Track> {
        match self.resolver.resolve_track(id).await {
            Ok(Some(track)) => Ok(track),
            Ok(None) => Err(PlaybackError::TrackNotFound(id.to_string())),
            Err(e) => {
                warn!(track_id = %id, error = %e, "Track lookup failed");
                Err(PlaybackError::TrackNotFound(id.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::simulated::SimulatedTransport;
    use core_library::{Album, InMemoryLibrary};
    use mockall::mock;

    mock! {
        pub Likes {}

        #[async_trait::async_trait]
        impl LikeStore for Likes {
            async fn resolve_liked_flag(&self, id: &str) -> core_library::Result<Option<bool>>;
            async fn set_liked_flag(&self, id: &str, liked: bool) -> core_library::Result<()>;
        }
    }

    mock! {
        pub Resolver {}

        #[async_trait::async_trait]
        impl TrackResolver for Resolver {
            async fn resolve_track(&self, id: &str) -> core_library::Result<Option<Track>>;
            async fn resolve_album(&self, id: &str) -> core_library::Result<Option<Album>>;
            async fn resolve_playlist_tracks(&self, ids: &[String]) -> core_library::Result<Vec<Track>>;
        }
    }

    fn engine() -> Arc<PlaybackEngine> {
        Arc::new(
            PlaybackEngine::new(Arc::new(SimulatedTransport::new()), PlayerConfig::default())
                .unwrap(),
        )
    }

    fn controller(resolver: Arc<dyn TrackResolver>, likes: Arc<dyn LikeStore>) -> PlaybackController {
        let engine = engine();
        let cache = Arc::new(AlbumCache::from_config(&engine.config().fetch));
        PlaybackController::new(engine, resolver, likes, cache)
    }

    #[tokio::test]
    async fn test_toggle_like_flips_flag() {
        let mut likes = MockLikes::new();
        likes
            .expect_resolve_liked_flag()
            .withf(|id| id == "t1")
            .returning(|_| Ok(Some(false)));
        likes
            .expect_set_liked_flag()
            .withf(|id, liked| id == "t1" && *liked)
            .times(1)
            .returning(|_, _| Ok(()));

        let controller = controller(Arc::new(InMemoryLibrary::new()), Arc::new(likes));
        assert!(controller.toggle_like("t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_like_without_local_record() {
        let mut likes = MockLikes::new();
        likes.expect_resolve_liked_flag().returning(|_| Ok(None));
        likes.expect_set_liked_flag().never();

        let controller = controller(Arc::new(InMemoryLibrary::new()), Arc::new(likes));
        let err = controller.toggle_like("ghost").await.unwrap_err();
        assert!(matches!(err, PlaybackError::TrackNotFoundLocally(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_toggle_like_record_vanishing_mid_write() {
        let mut likes = MockLikes::new();
        likes.expect_resolve_liked_flag().returning(|_| Ok(Some(true)));
        likes
            .expect_set_liked_flag()
            .returning(|id, _| Err(LibraryError::not_found("track", id)));

        let controller = controller(Arc::new(InMemoryLibrary::new()), Arc::new(likes));
        assert!(matches!(
            controller.toggle_like("t1").await,
            Err(PlaybackError::TrackNotFoundLocally(_))
        ));
    }

    #[tokio::test]
    async fn test_resolver_error_surfaces_as_not_found() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve_track()
            .returning(|_| Err(LibraryError::Resolver("timeout".into())));

        let controller = controller(Arc::new(resolver), Arc::new(MockLikes::new()));
        let err = controller
            .play_track("t1", vec!["t1".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, PlaybackError::TrackNotFound(id) if id == "t1"));
        assert!(controller.cursor().is_empty());
        assert!(controller.engine().current_track().is_none());
    }

    #[tokio::test]
    async fn test_play_sequence_rejects_empty() {
        let controller = controller(Arc::new(InMemoryLibrary::new()), Arc::new(MockLikes::new()));
        assert!(matches!(
            controller.play_sequence(Vec::new()).await,
            Err(PlaybackError::EmptySequence)
        ));
    }
}
