//! Integration tests for the state projector
//!
//! Checks that the projection follows the engine, that a drag holds the
//! indicator, and that the cooldown after a drag keeps it from snapping back.

use core_library::{Artist, InMemoryLibrary, Track};
use core_playback::{PlaybackEngine, PlayerConfig, SimulatedTransport, StateProjector};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn track(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), "album", "artist")
        .with_duration(100.0)
        .with_locator(format!("songs/{}.mp3", id))
}

fn engine_with(config: PlayerConfig) -> (Arc<PlaybackEngine>, SimulatedTransport) {
    let transport = SimulatedTransport::new()
        .with_media("a", 100.0)
        .with_media("b", 50.0)
        .with_duration_delay(Duration::from_millis(100));
    let engine = PlaybackEngine::new(Arc::new(transport.clone()), config).expect("valid config");
    (Arc::new(engine), transport)
}

#[tokio::test(start_paused = true)]
async fn test_projection_starts_empty() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let projector = StateProjector::spawn(engine);

    let state = projector.current();
    assert_eq!(state.title(), "No track");
    assert!(!state.is_playing);
    assert_eq!(state.position, 0.0);
    assert_eq!(state.duration, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_projection_follows_engine() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let projector = StateProjector::spawn(Arc::clone(&engine));

    engine.load(track("a")).await.unwrap();
    engine.play().await;
    sleep(Duration::from_millis(1100)).await;

    let state = projector.current();
    assert_eq!(state.title(), "Song a");
    assert!(state.is_playing);
    assert_eq!(state.duration, 100.0);
    assert_eq!(state.position, engine.position());
    assert!(state.position > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_projection_seeds_from_running_engine() {
    let (engine, _) = engine_with(PlayerConfig::default());
    engine.load(track("a")).await.unwrap();
    engine.play().await;
    sleep(Duration::from_millis(600)).await;

    let projector = StateProjector::spawn(Arc::clone(&engine));
    let state = projector.current();
    assert_eq!(state.title(), "Song a");
    assert!(state.is_playing);
    assert_eq!(state.position, engine.position());
}

#[tokio::test(start_paused = true)]
async fn test_updates_are_deduplicated() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let projector = StateProjector::spawn(Arc::clone(&engine));
    engine.load(track("a")).await.unwrap();
    sleep(Duration::from_millis(200)).await;

    let mut updates = projector.subscribe();
    updates.borrow_and_update();

    // Paused at zero: samples repeat the same value.
    sleep(Duration::from_secs(2)).await;
    assert!(!updates.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_scrub_holds_position_and_seeks_on_release() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let projector = StateProjector::spawn(Arc::clone(&engine));
    engine.load(track("a")).await.unwrap();
    engine.play().await;
    sleep(Duration::from_millis(1100)).await;

    projector.begin_scrub();
    projector.update_scrub(60.0);
    assert!(projector.current().is_scrubbing);

    // Engine samples keep arriving but do not move the indicator.
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(projector.current().position, 60.0);
    assert!(engine.position() < 60.0);

    projector.end_scrub().await;
    let state = projector.current();
    assert!(!state.is_scrubbing);
    assert_eq!(state.position, 60.0);
    assert_eq!(engine.position(), 60.0);

    sleep(Duration::from_millis(1100)).await;
    let position = projector.current().position;
    assert!(position > 60.0 && position < 62.0, "position {position}");
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_ignores_stale_engine_positions() {
    let (engine, transport) = engine_with(PlayerConfig::default());
    let projector = StateProjector::spawn(Arc::clone(&engine));
    engine.load(track("a")).await.unwrap();
    engine.play().await;
    sleep(Duration::from_millis(1100)).await;

    projector.begin_scrub();
    projector.update_scrub(10.0);
    projector.end_scrub().await;

    // Let the engine publish an out-of-date reading right after release.
    engine.pause().await;
    transport.inject_position(2.0);
    sleep(Duration::from_millis(600)).await;
    assert_eq!(engine.position(), 2.0);
    assert_eq!(projector.current().position, 10.0);

    // Past the cooldown the engine is authoritative again.
    transport.inject_position(3.0);
    sleep(Duration::from_millis(600)).await;
    assert_eq!(projector.current().position, 3.0);
}

#[tokio::test(start_paused = true)]
async fn test_scrub_clamps_to_duration() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let projector = StateProjector::spawn(Arc::clone(&engine));
    engine.load(track("b")).await.unwrap();
    sleep(Duration::from_millis(200)).await;

    projector.update_scrub(20.0);
    assert_eq!(projector.current().position, 0.0);

    projector.begin_scrub();
    projector.update_scrub(500.0);
    assert_eq!(projector.current().position, 50.0);
    projector.update_scrub(-1.0);
    assert_eq!(projector.current().position, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_track_change_ends_scrub() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let projector = StateProjector::spawn(Arc::clone(&engine));
    engine.load(track("a")).await.unwrap();
    sleep(Duration::from_millis(10)).await;

    projector.begin_scrub();
    projector.update_scrub(40.0);
    engine.load(track("b")).await.unwrap();
    sleep(Duration::from_millis(10)).await;

    let state = projector.current();
    assert_eq!(state.title(), "Song b");
    assert!(!state.is_scrubbing);
    assert_eq!(state.position, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_lagging_projector_resynchronises() {
    let (engine, _) = engine_with(PlayerConfig::default().with_event_buffer_size(1));
    let projector = StateProjector::spawn(Arc::clone(&engine));

    engine.load(track("a")).await.unwrap();
    engine.play().await;
    engine.load(track("b")).await.unwrap();
    engine.play().await;
    sleep(Duration::from_millis(1100)).await;
    engine.pause().await;
    sleep(Duration::from_millis(10)).await;

    let state = projector.current();
    let snapshot = engine.snapshot();
    assert_eq!(state.track, snapshot.track);
    assert_eq!(state.is_playing, snapshot.is_playing);
    assert_eq!(state.position, snapshot.position);
    assert_eq!(state.duration, snapshot.duration);
}

#[tokio::test(start_paused = true)]
async fn test_unload_clears_projection() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let projector = StateProjector::spawn(Arc::clone(&engine));
    engine.load(track("a")).await.unwrap();
    engine.play().await;
    sleep(Duration::from_millis(600)).await;

    engine.unload().await;
    sleep(Duration::from_millis(10)).await;

    let state = projector.current();
    assert_eq!(state.title(), "No track");
    assert!(!state.is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_artist_follows_current_track() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let library = Arc::new(InMemoryLibrary::new());
    library.insert_artist(Artist::new("artist", "Slow Artist"));
    library.insert_artist(Artist::new("other", "Other Artist"));
    library.set_latency("artist", Duration::from_millis(500));

    let projector = StateProjector::spawn_with_artists(Arc::clone(&engine), library);
    assert!(projector.current().artist.is_none());

    engine.load(track("a")).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    let other = Track::new("b", "Song b", "album", "other")
        .with_duration(50.0)
        .with_locator("songs/b.mp3");
    engine.load(other).await.unwrap();

    sleep(Duration::from_millis(100)).await;
    assert_eq!(projector.current().artist.unwrap().name, "Other Artist");

    // The lookup for the first track lands late and is discarded.
    sleep(Duration::from_millis(600)).await;
    let state = projector.current();
    assert_eq!(state.title(), "Song b");
    assert_eq!(state.artist.unwrap().name, "Other Artist");
}

#[tokio::test(start_paused = true)]
async fn test_failed_artist_lookup_projects_none() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let library = Arc::new(InMemoryLibrary::new());
    library.insert_artist(Artist::new("artist", "Band"));
    library.fail_on("artist");

    let projector = StateProjector::spawn_with_artists(Arc::clone(&engine), library);
    engine.load(track("a")).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    let state = projector.current();
    assert_eq!(state.title(), "Song a");
    assert!(state.artist.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_artist_cleared_on_unload() {
    let (engine, _) = engine_with(PlayerConfig::default());
    let library = Arc::new(InMemoryLibrary::new());
    library.insert_artist(Artist::new("artist", "Band"));

    let projector = StateProjector::spawn_with_artists(Arc::clone(&engine), library);
    engine.load(track("a")).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(projector.current().artist.unwrap().name, "Band");

    engine.unload().await;
    sleep(Duration::from_millis(50)).await;
    assert!(projector.current().artist.is_none());
}
