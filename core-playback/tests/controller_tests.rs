//! Integration tests for the playback controller
//!
//! Runs the controller against the in-memory library and the simulated
//! transport to check cursor movement, navigation boundaries and the way
//! failed commands leave the session alone.

use core_library::{Album, AlbumCache, BulkMode, FetchConfig, InMemoryLibrary, Playlist, Track};
use core_playback::{
    PlaybackController, PlaybackEngine, PlaybackError, PlaybackState, PlayerConfig,
    SimulatedTransport,
};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Helpers
// ============================================================================

fn song(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), "al1", "ar1")
        .with_duration(120.0)
        .with_locator(format!("songs/{}.mp3", id))
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

struct Fixture {
    controller: Arc<PlaybackController>,
    library: Arc<InMemoryLibrary>,
    transport: SimulatedTransport,
}

fn fixture(tracks: &[&str]) -> Fixture {
    let library = Arc::new(InMemoryLibrary::with_tracks(
        tracks.iter().map(|id| song(id)),
    ));
    let transport = SimulatedTransport::new();
    let config =
        PlayerConfig::default().with_fetch(FetchConfig::default().with_album_cache_capacity(4));
    let engine = Arc::new(
        PlaybackEngine::new(Arc::new(transport.clone()), config).expect("valid config"),
    );
    let cache = Arc::new(AlbumCache::from_config(&engine.config().fetch));
    let controller = Arc::new(PlaybackController::new(
        engine,
        library.clone(),
        library.clone(),
        cache,
    ));

    Fixture {
        controller,
        library,
        transport,
    }
}

fn current_id(controller: &PlaybackController) -> Option<String> {
    controller.engine().current_track().map(|track| track.id)
}

// ============================================================================
// play_track
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_play_track_builds_cursor_and_plays() {
    let fx = fixture(&["s1", "s2", "s3"]);

    fx.controller
        .play_track("s2", ids(&["s1", "s2", "s3"]))
        .await
        .unwrap();

    let cursor = fx.controller.cursor();
    assert_eq!(cursor.index(), Some(1));
    assert_eq!(cursor.current_id(), Some("s2"));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("s2"));
    assert_eq!(fx.controller.engine().state(), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_play_track_outside_sequence_has_no_index() {
    let fx = fixture(&["s1", "s2", "x"]);

    fx.controller.play_track("x", ids(&["s1", "s2"])).await.unwrap();
    assert_eq!(fx.controller.cursor().index(), None);
    assert_eq!(current_id(&fx.controller).as_deref(), Some("x"));

    let err = fx.controller.play_next().await.unwrap_err();
    assert!(matches!(err, PlaybackError::NoActiveSequence));
    let err = fx.controller.play_previous().await.unwrap_err();
    assert!(matches!(err, PlaybackError::NoActiveSequence));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("x"));
}

#[tokio::test(start_paused = true)]
async fn test_play_unknown_track_keeps_current_session() {
    let fx = fixture(&["s1", "s2"]);
    fx.controller.play_track("s1", ids(&["s1", "s2"])).await.unwrap();

    let err = fx
        .controller
        .play_track("ghost", ids(&["ghost"]))
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::TrackNotFound(id) if id == "ghost"));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("s1"));
    assert_eq!(fx.controller.cursor().sequence(), ids(&["s1", "s2"]).as_slice());
    assert_eq!(fx.transport.opened(), ids(&["s1"]));
}

#[tokio::test(start_paused = true)]
async fn test_play_sequence_starts_at_first_entry() {
    let fx = fixture(&["s1", "s2"]);
    fx.controller.play_sequence(ids(&["s2", "s1"])).await.unwrap();

    assert_eq!(current_id(&fx.controller).as_deref(), Some("s2"));
    assert_eq!(fx.controller.cursor().index(), Some(0));
}

// ============================================================================
// Navigation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_previous_at_start_is_refused() {
    let fx = fixture(&["s1", "s2", "s3"]);
    fx.controller
        .play_track("s1", ids(&["s1", "s2", "s3"]))
        .await
        .unwrap();

    let err = fx.controller.play_previous().await.unwrap_err();
    assert!(matches!(err, PlaybackError::BeginningOfPlaylist));
    assert!(err.is_navigation_boundary());
    assert_eq!(fx.controller.cursor().index(), Some(0));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("s1"));
}

#[tokio::test(start_paused = true)]
async fn test_next_at_end_is_refused() {
    let fx = fixture(&["s1", "s2"]);
    fx.controller.play_track("s2", ids(&["s1", "s2"])).await.unwrap();

    let err = fx.controller.play_next().await.unwrap_err();
    assert!(matches!(err, PlaybackError::EndOfPlaylist));
    assert_eq!(fx.controller.cursor().index(), Some(1));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("s2"));
}

#[tokio::test(start_paused = true)]
async fn test_next_and_previous_walk_the_sequence() {
    let fx = fixture(&["s1", "s2", "s3"]);
    fx.controller
        .play_track("s1", ids(&["s1", "s2", "s3"]))
        .await
        .unwrap();

    fx.controller.play_next().await.unwrap();
    fx.controller.play_next().await.unwrap();
    assert_eq!(fx.controller.cursor().index(), Some(2));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("s3"));

    fx.controller.play_previous().await.unwrap();
    assert_eq!(fx.controller.cursor().index(), Some(1));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("s2"));
    assert_eq!(fx.controller.engine().state(), PlaybackState::Playing);
    assert_eq!(fx.transport.opened(), ids(&["s1", "s2", "s3", "s2"]));
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_next_leaves_cursor_in_place() {
    let fx = fixture(&["s1", "s3"]);
    fx.controller
        .play_track("s1", ids(&["s1", "s2", "s3"]))
        .await
        .unwrap();

    let err = fx.controller.play_next().await.unwrap_err();
    assert!(matches!(err, PlaybackError::TrackNotFound(id) if id == "s2"));
    assert_eq!(fx.controller.cursor().index(), Some(0));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("s1"));
    assert_eq!(fx.controller.engine().state(), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_failing_lookup_on_next_leaves_cursor_in_place() {
    let fx = fixture(&["s1", "s2"]);
    fx.library.fail_on("s2");
    fx.controller.play_track("s1", ids(&["s1", "s2"])).await.unwrap();

    assert!(matches!(
        fx.controller.play_next().await,
        Err(PlaybackError::TrackNotFound(_))
    ));
    assert_eq!(fx.controller.cursor().index(), Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_unplayable_next_leaves_cursor_in_place() {
    let fx = fixture(&["s1"]);
    let mut silent = song("s2");
    silent.locator = None;
    fx.library.insert_track(silent);
    fx.controller.play_track("s1", ids(&["s1", "s2"])).await.unwrap();

    assert!(matches!(
        fx.controller.play_next().await,
        Err(PlaybackError::NotPlayable(_))
    ));
    assert_eq!(fx.controller.cursor().index(), Some(0));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("s1"));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_steps_apply_in_order() {
    let fx = fixture(&["a", "b", "c"]);
    fx.library.set_latency("b", Duration::from_millis(300));
    fx.controller
        .play_track("a", ids(&["a", "b", "c"]))
        .await
        .unwrap();

    let first = tokio::spawn({
        let controller = Arc::clone(&fx.controller);
        async move { controller.play_next().await }
    });
    tokio::task::yield_now().await;
    let second = tokio::spawn({
        let controller = Arc::clone(&fx.controller);
        async move { controller.play_next().await }
    });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(fx.controller.cursor().index(), Some(2));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("c"));
}

// ============================================================================
// Albums and playlists
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_play_album_skips_missing_tracks_and_caches() {
    let fx = fixture(&["t1", "t2", "t4"]);
    fx.library.insert_album(Album::new(
        "al1",
        "Album",
        "ar1",
        ids(&["t1", "t2", "t3", "t4"]),
    ));
    fx.library.set_latency("t1", Duration::from_millis(200));

    fx.controller.play_album("al1").await.unwrap();

    let cursor = fx.controller.cursor();
    assert_eq!(cursor.sequence(), ids(&["t1", "t2", "t4"]).as_slice());
    assert_eq!(cursor.index(), Some(0));
    assert_eq!(current_id(&fx.controller).as_deref(), Some("t1"));

    let lookups = fx.library.track_lookups();
    fx.controller.play_album("al1").await.unwrap();
    assert_eq!(fx.library.track_lookups(), lookups);
}

#[tokio::test(start_paused = true)]
async fn test_album_cache_holds_configured_number_of_albums() {
    let fx = fixture(&["t1", "t2", "t3", "t4", "t5"]);
    for n in 1..=5 {
        fx.library.insert_album(Album::new(
            format!("al{n}"),
            format!("Album {n}"),
            "ar1",
            ids(&[&format!("t{n}")]),
        ));
    }

    for n in 1..=5 {
        fx.controller.play_album(&format!("al{n}")).await.unwrap();
    }

    // Four most recent albums are served from the cache.
    let lookups = fx.library.track_lookups();
    fx.controller.play_album("al5").await.unwrap();
    fx.controller.play_album("al2").await.unwrap();
    assert_eq!(fx.library.track_lookups(), lookups);

    // The oldest was evicted and is resolved again.
    fx.controller.play_album("al1").await.unwrap();
    assert_eq!(fx.library.track_lookups(), lookups + 1);
}

#[tokio::test(start_paused = true)]
async fn test_play_unknown_album() {
    let fx = fixture(&["t1"]);
    let err = fx.controller.play_album("nope").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(current_id(&fx.controller).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_play_album_without_resolvable_tracks() {
    let fx = fixture(&[]);
    fx.library
        .insert_album(Album::new("al1", "Album", "ar1", ids(&["gone"])));

    assert!(matches!(
        fx.controller.play_album("al1").await,
        Err(PlaybackError::EmptySequence)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_play_playlist_fills_partial_bulk_result() {
    let fx = fixture(&["p1", "p2", "p3"]);
    fx.library.set_bulk_mode(BulkMode::Partial(1));
    let playlist = Playlist::new("pl", "Mix", "me", ids(&["p3", "p1", "missing", "p2"]));

    fx.controller.play_playlist(&playlist).await.unwrap();

    let cursor = fx.controller.cursor();
    assert_eq!(cursor.sequence(), ids(&["p3", "p1", "p2"]).as_slice());
    assert_eq!(current_id(&fx.controller).as_deref(), Some("p3"));

    fx.controller.play_next().await.unwrap();
    assert_eq!(current_id(&fx.controller).as_deref(), Some("p1"));
}

// ============================================================================
// Likes and pass-through commands
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_toggle_like_against_library() {
    let fx = fixture(&["s1"]);

    assert!(fx.controller.toggle_like("s1").await.unwrap());
    assert!(fx.library.track("s1").unwrap().is_liked);
    assert!(!fx.controller.toggle_like("s1").await.unwrap());
    assert!(!fx.library.track("s1").unwrap().is_liked);

    assert!(matches!(
        fx.controller.toggle_like("ghost").await,
        Err(PlaybackError::TrackNotFoundLocally(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_transport_commands_pass_through() {
    let fx = fixture(&["s1"]);
    fx.controller.play_track("s1", ids(&["s1"])).await.unwrap();

    fx.controller.toggle_play_pause().await;
    assert_eq!(fx.controller.engine().state(), PlaybackState::Paused);

    fx.controller.seek(42.0).await;
    assert_eq!(fx.controller.engine().position(), 42.0);

    fx.controller.play().await;
    assert!(fx.controller.engine().is_playing());
    fx.controller.pause().await;
    assert!(!fx.controller.engine().is_playing());
}
