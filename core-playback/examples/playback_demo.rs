//! # Playback Demo
//!
//! Plays a small album through the simulated transport: loads it through the
//! fetch pipeline, skips forward, scrubs, toggles a like and lets the last
//! track run to its end while printing the projected state.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use anyhow::Context;
use core_library::{Album, AlbumCache, Artist, InMemoryLibrary, Track};
use core_playback::{
    PlaybackController, PlaybackEngine, PlaybackError, PlayerConfig, ProjectedState,
    SimulatedTransport, StateProjector,
};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::sync::Arc;
use std::time::Duration;

fn print_state(label: &str, state: &ProjectedState) {
    println!(
        "[{:<10}] {:<14} {:<12} {:>5.1}s / {:>5.1}s ({:>3.0}%) {}",
        label,
        state.title(),
        state.artist.as_ref().map_or("-", |artist| artist.name.as_str()),
        state.position,
        state.duration,
        state.progress() * 100.0,
        if state.is_playing { "playing" } else { "stopped" },
    );
}

fn build_library() -> InMemoryLibrary {
    let library = InMemoryLibrary::with_tracks([
        Track::new("t1", "Opening", "al1", "ar1")
            .with_duration(2.0)
            .with_locator("albums/al1/01.mp3"),
        Track::new("t2", "Interlude", "al1", "ar1")
            .with_duration(1.5)
            .with_locator("albums/al1/02.mp3"),
        Track::new("t3", "Finale", "al1", "ar1")
            .with_duration(2.5)
            .with_locator("albums/al1/03.mp3"),
    ]);

    library.insert_album(Album::new(
        "al1",
        "Demo Album",
        "ar1",
        vec!["t1".into(), "t2".into(), "missing".into(), "t3".into()],
    ));
    library.insert_artist(Artist::new("ar1", "Demo Band"));
    // One slow lookup; the album still comes back in order.
    library.set_latency("t1", Duration::from_millis(150));
    library
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )
    .context("failed to initialise logging")?;

    let config = PlayerConfig::responsive().with_content_base_url("http://media.local:8000/");

    let transport = SimulatedTransport::new()
        .with_media("t1", 2.2)
        .with_media("t2", 1.6)
        .with_media("t3", 2.4)
        .with_duration_delay(Duration::from_millis(100));

    let engine = Arc::new(PlaybackEngine::new(Arc::new(transport), config)?);
    let library = Arc::new(build_library());
    let controller = PlaybackController::new(
        Arc::clone(&engine),
        library.clone(),
        library.clone(),
        Arc::new(AlbumCache::from_config(&engine.config().fetch)),
    );
    let projector = StateProjector::spawn_with_artists(Arc::clone(&engine), library.clone());

    println!("=== Album ===");
    controller.play_album("al1").await?;
    println!("sequence: {:?}", controller.cursor().sequence());
    tokio::time::sleep(Duration::from_millis(700)).await;
    print_state("playing", &projector.current());

    println!("\n=== Navigation ===");
    match controller.play_previous().await {
        Err(e) if e.is_navigation_boundary() => println!("previous refused: {}", e),
        other => other?,
    }
    controller.play_next().await?;
    tokio::time::sleep(Duration::from_millis(400)).await;
    print_state("next", &projector.current());

    println!("\n=== Scrub ===");
    projector.begin_scrub();
    projector.update_scrub(1.2);
    print_state("dragging", &projector.current());
    projector.end_scrub().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    print_state("released", &projector.current());

    println!("\n=== Like ===");
    let liked = controller.toggle_like("t2").await?;
    println!("t2 liked: {}", liked);
    if let Err(PlaybackError::TrackNotFoundLocally(id)) = controller.toggle_like("nope").await {
        println!("no local record for {}", id);
    }

    println!("\n=== Run to end ===");
    controller.play_next().await?;
    let mut updates = projector.subscribe();
    while engine.state() != core_playback::PlaybackState::Ended {
        updates
            .changed()
            .await
            .context("projector stopped publishing")?;
    }
    print_state("ended", &projector.current());

    match controller.play_next().await {
        Err(PlaybackError::EndOfPlaylist) => println!("end of playlist reached"),
        other => other?,
    }

    engine.unload().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_state("unloaded", &projector.current());
    Ok(())
}
