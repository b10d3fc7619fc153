//! # State Projector
//!
//! Folds the engine's event stream into one [`ProjectedState`] snapshot for a
//! presentation layer and publishes it through a `watch` channel.
//!
//! The projector also arbitrates the position while a consumer drags a seek
//! control. During the drag the consumer's value wins over engine samples.
//! After the drag ends, engine positions are ignored for a cooldown window so
//! that samples taken before the transport caught up with the seek do not
//! snap the indicator back.
//!
//! Given a [`TrackResolver`], the projector also looks up the artist of the
//! current track. Lookups finishing after the track changed are discarded.

use crate::engine::{EngineSnapshot, PlaybackEngine};
use crate::events::PlaybackEvent;
use core_library::{Artist, Track, TrackResolver};
use core_runtime::events::RecvError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Title shown when nothing is loaded.
pub const NO_TRACK_TITLE: &str = "No track";

/// Simplified, deduplicated view of playback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectedState {
    pub track: Option<Track>,
    /// Artist of `track`, once resolved.
    pub artist: Option<Artist>,
    pub is_playing: bool,
    pub position: f64,
    pub duration: f64,
    /// A consumer is currently dragging the position.
    pub is_scrubbing: bool,
}

impl ProjectedState {
    pub fn title(&self) -> &str {
        self.track
            .as_ref()
            .map_or(NO_TRACK_TITLE, |track| track.title.as_str())
    }

    /// Fraction of the track played, in `[0, 1]`. 0 when the duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// The projection fold, independent of any channel or task.
#[derive(Debug, Clone)]
pub struct ProjectionState {
    state: ProjectedState,
    cooldown: Duration,
    suppress_until: Option<Instant>,
    /// Track whose artist lookup has been handed out.
    artist_requested_for: Option<String>,
}

impl ProjectionState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: ProjectedState::default(),
            cooldown,
            suppress_until: None,
            artist_requested_for: None,
        }
    }

    pub fn state(&self) -> &ProjectedState {
        &self.state
    }

    /// Replace the projection with an engine snapshot. Scrub state survives.
    pub fn seed(&mut self, snapshot: &EngineSnapshot, now: Instant) -> bool {
        let before = self.state.clone();
        if self.state.track != snapshot.track {
            self.reset_scrub();
            self.change_track(snapshot.track.clone());
        }
        self.state.is_playing = snapshot.is_playing;
        self.state.duration = snapshot.duration;
        if self.accepts_engine_position(now) {
            self.state.position = snapshot.position;
        }
        self.state != before
    }

    /// Fold one engine event. Returns `true` if the projection changed.
    pub fn apply(&mut self, event: &PlaybackEvent, now: Instant) -> bool {
        let before = self.state.clone();
        match event {
            PlaybackEvent::TrackChanged(track) => {
                // A new session always starts at zero.
                self.reset_scrub();
                self.change_track(track.clone());
                self.state.position = 0.0;
            }
            PlaybackEvent::PlayingChanged(playing) => self.state.is_playing = *playing,
            PlaybackEvent::PositionChanged(position) => {
                if self.accepts_engine_position(now) {
                    self.state.position = *position;
                }
            }
            PlaybackEvent::DurationChanged(duration) => self.state.duration = *duration,
            PlaybackEvent::StateChanged(_) | PlaybackEvent::Error { .. } => {}
        }
        self.state != before
    }

    /// Hand out the artist lookup the current track still needs, at most
    /// once per track: `(track_id, artist_id)`.
    pub fn take_artist_request(&mut self) -> Option<(String, String)> {
        let track = self.state.track.as_ref()?;
        let known = self
            .state
            .artist
            .as_ref()
            .is_some_and(|artist| artist.id == track.artist_id);
        if known || self.artist_requested_for.as_deref() == Some(track.id.as_str()) {
            return None;
        }
        self.artist_requested_for = Some(track.id.clone());
        Some((track.id.clone(), track.artist_id.clone()))
    }

    /// Record the outcome of an artist lookup made for `track_id`.
    ///
    /// Ignored when another track has been loaded since.
    pub fn set_artist(&mut self, track_id: &str, artist: Option<Artist>) -> bool {
        let current = self.state.track.as_ref().map(|track| track.id.as_str());
        if current != Some(track_id) || self.state.artist == artist {
            return false;
        }
        self.state.artist = artist;
        true
    }

    pub fn begin_scrub(&mut self) -> bool {
        let changed = !self.state.is_scrubbing;
        self.state.is_scrubbing = true;
        self.suppress_until = None;
        changed
    }

    /// Set the consumer-held position. Ignored unless a scrub is active.
    pub fn update_scrub(&mut self, position: f64) -> bool {
        if !self.state.is_scrubbing || !position.is_finite() {
            return false;
        }
        let position = self.clamp(position);
        let changed = self.state.position != position;
        self.state.position = position;
        changed
    }

    /// Finish the drag and start the cooldown.
    ///
    /// Returns the position to seek to, or `None` if no scrub was active.
    pub fn end_scrub(&mut self, now: Instant) -> Option<f64> {
        if !self.state.is_scrubbing {
            return None;
        }
        self.state.is_scrubbing = false;
        self.suppress_until = Some(now + self.cooldown);
        Some(self.state.position)
    }

    fn accepts_engine_position(&mut self, now: Instant) -> bool {
        if self.state.is_scrubbing {
            return false;
        }
        match self.suppress_until {
            Some(until) if now < until => false,
            Some(_) => {
                self.suppress_until = None;
                true
            }
            None => true,
        }
    }

    /// Switch tracks, keeping the artist only if the new track shares it.
    fn change_track(&mut self, track: Option<Track>) {
        let keeps_artist = match (&track, &self.state.artist) {
            (Some(track), Some(artist)) => track.artist_id == artist.id,
            _ => false,
        };
        if !keeps_artist {
            self.state.artist = None;
        }
        if track.is_none() {
            self.artist_requested_for = None;
        }
        self.state.track = track;
    }

    fn reset_scrub(&mut self) {
        self.state.is_scrubbing = false;
        self.suppress_until = None;
    }

    fn clamp(&self, position: f64) -> f64 {
        if self.state.duration > 0.0 {
            position.clamp(0.0, self.state.duration)
        } else {
            position.max(0.0)
        }
    }
}

/// Background consumer of engine events publishing [`ProjectedState`].
pub struct StateProjector {
    engine: Arc<PlaybackEngine>,
    fold: Arc<Mutex<ProjectionState>>,
    sender: Arc<watch::Sender<ProjectedState>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StateProjector {
    /// Start projecting `engine` with the engine's configured seek cooldown.
    pub fn spawn(engine: Arc<PlaybackEngine>) -> Self {
        let cooldown = engine.config().seek_cooldown;
        Self::spawn_with_cooldown(engine, cooldown)
    }

    pub fn spawn_with_cooldown(engine: Arc<PlaybackEngine>, cooldown: Duration) -> Self {
        Self::start(engine, cooldown, None)
    }

    /// Like [`spawn`](Self::spawn), additionally projecting the artist of the
    /// current track resolved through `artists`.
    pub fn spawn_with_artists(
        engine: Arc<PlaybackEngine>,
        artists: Arc<dyn TrackResolver>,
    ) -> Self {
        let cooldown = engine.config().seek_cooldown;
        Self::start(engine, cooldown, Some(artists))
    }

    fn start(
        engine: Arc<PlaybackEngine>,
        cooldown: Duration,
        artists: Option<Arc<dyn TrackResolver>>,
    ) -> Self {
        // Subscribe before seeding so nothing falls between the two.
        let events = engine.subscribe();

        let mut fold = ProjectionState::new(cooldown);
        fold.seed(&engine.snapshot(), Instant::now());

        let (sender, _) = watch::channel(fold.state().clone());
        let sender = Arc::new(sender);
        let fold = Arc::new(Mutex::new(fold));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            Arc::clone(&engine),
            events,
            Projection {
                fold: Arc::clone(&fold),
                sender: Arc::clone(&sender),
                artists,
                cancel: cancel.clone(),
            },
        ));

        Self {
            engine,
            fold,
            sender,
            cancel,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProjectedState> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> ProjectedState {
        self.sender.borrow().clone()
    }

    pub fn begin_scrub(&self) {
        let mut fold = self.fold.lock();
        if fold.begin_scrub() {
            publish(&self.sender, fold.state());
        }
    }

    pub fn update_scrub(&self, position: f64) {
        let mut fold = self.fold.lock();
        if fold.update_scrub(position) {
            publish(&self.sender, fold.state());
        }
    }

    /// Finish the drag and seek the engine to the scrubbed position.
    pub async fn end_scrub(&self) {
        let target = {
            let mut fold = self.fold.lock();
            let target = fold.end_scrub(Instant::now());
            publish(&self.sender, fold.state());
            target
        };

        if let Some(target) = target {
            debug!(target, "Scrub finished");
            self.engine.seek(target).await;
        }
    }
}

impl Drop for StateProjector {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

fn publish(sender: &watch::Sender<ProjectedState>, state: &ProjectedState) {
    sender.send_if_modified(|current| {
        if current != state {
            *current = state.clone();
            true
        } else {
            false
        }
    });
}

/// Shared handles of a running projector.
#[derive(Clone)]
struct Projection {
    fold: Arc<Mutex<ProjectionState>>,
    sender: Arc<watch::Sender<ProjectedState>>,
    artists: Option<Arc<dyn TrackResolver>>,
    cancel: CancellationToken,
}

impl Projection {
    /// Publish after a fold change and start any artist lookup it calls for.
    fn changed(&self, fold: &mut ProjectionState) {
        publish(&self.sender, fold.state());
        let Some(resolver) = &self.artists else {
            return;
        };
        if let Some((track_id, artist_id)) = fold.take_artist_request() {
            tokio::spawn(lookup_artist(
                Arc::clone(resolver),
                track_id,
                artist_id,
                self.clone(),
            ));
        }
    }
}

async fn run(
    engine: Arc<PlaybackEngine>,
    mut events: core_runtime::events::Receiver<PlaybackEvent>,
    projection: Projection,
) {
    projection.changed(&mut projection.fold.lock());

    loop {
        let received = tokio::select! {
            _ = projection.cancel.cancelled() => break,
            received = events.recv() => received,
        };

        match received {
            Ok(event) => {
                let mut fold = projection.fold.lock();
                if fold.apply(&event, Instant::now()) {
                    projection.changed(&mut fold);
                }
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Projector lagged, resynchronising from snapshot");
                let snapshot = engine.snapshot();
                let mut fold = projection.fold.lock();
                if fold.seed(&snapshot, Instant::now()) {
                    projection.changed(&mut fold);
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn lookup_artist(
    resolver: Arc<dyn TrackResolver>,
    track_id: String,
    artist_id: String,
    projection: Projection,
) {
    let resolved = tokio::select! {
        _ = projection.cancel.cancelled() => return,
        resolved = resolver.resolve_artist(&artist_id) => resolved,
    };

    let artist = match resolved {
        Ok(Some(artist)) => Some(artist),
        Ok(None) => {
            debug!(%artist_id, "Artist not found");
            None
        }
        Err(e) => {
            debug!(%artist_id, error = %e, "Artist lookup failed");
            None
        }
    };

    let mut fold = projection.fold.lock();
    if fold.set_artist(&track_id, artist) {
        publish(&projection.sender, fold.state());
    }
}
