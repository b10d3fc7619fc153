//! # Playback Engine
//!
//! Owns the single active transport session and publishes its observable
//! state (current track, playing flag, position, duration) on an event bus.
//!
//! ## Session lifecycle
//!
//! ```text
//! Idle ──load──> Loading ──play──> Playing <──play/pause──> Paused
//!                                     │                        │
//!                                     ├──transport end──> Ended
//!                                     └──transport error─> Failed
//! ```
//!
//! `load` is serialised with itself and with `unload`. Every session gets a
//! fresh generation number; the sampler task, the report listener and every
//! transport acknowledgement check it before touching published state, so a
//! torn-down session can never write into its successor.

use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::events::{PlaybackEvent, PlaybackState};
use crate::transport::{
    TaggedReport, Transport, TransportObserver, TransportReport, TransportRequest,
    TransportSessionId,
};
use core_library::Track;
use core_runtime::events::{EventBus, EventStream, Receiver};
use core_runtime::logging::redact_locator;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

/// Consistent copy of everything the engine publishes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSnapshot {
    pub track: Option<Track>,
    pub state: PlaybackState,
    pub is_playing: bool,
    /// Seconds, always finite and non-negative.
    pub position: f64,
    /// Seconds; the track's nominal duration until the transport reports one.
    pub duration: f64,
    /// Whether `duration` came from the transport.
    pub duration_authoritative: bool,
    /// Message of the last transport failure of the current session.
    pub last_error: Option<String>,
    /// Generation of the current session (0 before the first load).
    pub generation: u64,
}

impl EngineSnapshot {
    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|track| track.id.as_str())
    }
}

struct ActiveSession {
    id: TransportSessionId,
    generation: u64,
    track_id: String,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveSession {
    fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Published state plus the live session, guarded together.
struct EngineInner {
    published: EngineSnapshot,
    session: Option<ActiveSession>,
    events: EventBus<PlaybackEvent>,
}

impl EngineInner {
    fn emit(&self, event: PlaybackEvent) {
        self.events.emit(event);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.published.generation == generation
            && self
                .session
                .as_ref()
                .is_some_and(|session| session.generation == generation)
    }

    fn set_track(&mut self, track: Option<Track>) {
        if self.published.track != track {
            self.published.track = track.clone();
            self.emit(PlaybackEvent::TrackChanged(track));
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.published.state != state {
            debug!(from = %self.published.state, to = %state, "State transition");
            self.published.state = state;
            self.emit(PlaybackEvent::StateChanged(state));
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.published.is_playing != playing {
            self.published.is_playing = playing;
            self.emit(PlaybackEvent::PlayingChanged(playing));
        }
    }

    fn set_position(&mut self, seconds: f64) {
        if self.published.position != seconds {
            self.published.position = seconds;
            self.emit(PlaybackEvent::PositionChanged(seconds));
        }
    }

    fn set_duration(&mut self, seconds: f64, authoritative: bool) {
        self.published.duration_authoritative = authoritative;
        if self.published.duration != seconds {
            self.published.duration = seconds;
            self.emit(PlaybackEvent::DurationChanged(seconds));
        }
    }

    fn record_failure(&mut self, message: String) {
        let track_id = self
            .published
            .track
            .as_ref()
            .map(|track| track.id.clone())
            .unwrap_or_default();

        self.published.last_error = Some(message.clone());
        self.set_playing(false);
        self.set_state(PlaybackState::Failed);
        self.emit(PlaybackEvent::Error { track_id, message });
    }

    fn apply_report(&mut self, tagged: TaggedReport) {
        if !self.is_current(tagged.generation) {
            debug!(generation = tagged.generation, "Dropping report from stale session");
            return;
        }

        match tagged.report {
            TransportReport::DurationChanged(seconds) => {
                if seconds.is_finite() && seconds > 0.0 {
                    self.set_duration(seconds, true);
                } else {
                    trace!(seconds, "Ignoring unusable duration report");
                }
            }
            TransportReport::Ended => {
                if self.published.state.is_terminal() {
                    return;
                }
                self.set_playing(false);
                self.set_state(PlaybackState::Ended);
                self.set_position(self.published.duration);
                info!(generation = tagged.generation, "Track ended");
            }
            TransportReport::Failed(message) => {
                if self.published.state == PlaybackState::Failed {
                    return;
                }
                warn!(generation = tagged.generation, error = %message, "Transport reported failure");
                self.record_failure(message);
            }
        }
    }

    fn apply_sample(&mut self, generation: u64, seconds: f64) {
        if !self.is_current(generation) || self.published.state.is_terminal() {
            return;
        }

        if !seconds.is_finite() || seconds < 0.0 {
            trace!(generation, "Discarding unusable position sample");
            return;
        }

        if self.published.duration_authoritative && seconds > self.published.duration {
            trace!(generation, seconds, "Discarding sample past the end of media");
            return;
        }

        if self.published.state == PlaybackState::Playing && seconds < self.published.position {
            trace!(generation, seconds, "Discarding sample behind the playhead");
            return;
        }

        self.set_position(seconds);
    }
}

/// The playback state machine.
pub struct PlaybackEngine {
    transport: Arc<dyn Transport>,
    config: PlayerConfig,
    base_url: Option<Url>,
    inner: Arc<Mutex<EngineInner>>,
    events: EventBus<PlaybackEvent>,
    load_lock: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

impl PlaybackEngine {
    /// Create an engine driving `transport`.
    ///
    /// # Errors
    /// Returns `Config` if the configuration does not validate.
    pub fn new(transport: Arc<dyn Transport>, config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        let base_url = config
            .content_base_url
            .as_deref()
            .map(parse_base_url)
            .transpose()?;

        let events = EventBus::new(config.event_buffer_size);
        let inner = EngineInner {
            published: EngineSnapshot::default(),
            session: None,
            events: events.clone(),
        };

        Ok(Self {
            transport,
            config,
            base_url,
            inner: Arc::new(Mutex::new(inner)),
            events,
            load_lock: tokio::sync::Mutex::new(()),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus<PlaybackEvent> {
        &self.events
    }

    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn stream(&self) -> EventStream<PlaybackEvent> {
        self.events.stream()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.inner.lock().published.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.lock().published.state
    }

    pub fn current_track(&self) -> Option<Track> {
        self.inner.lock().published.track.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().published.is_playing
    }

    pub fn position(&self) -> f64 {
        self.inner.lock().published.position
    }

    pub fn duration(&self) -> f64 {
        self.inner.lock().published.duration
    }

    /// Full content locator for `track`.
    ///
    /// Absolute locators are used as is; relative ones are joined onto the
    /// configured base URL when there is one.
    ///
    /// # Errors
    /// Returns `NotPlayable` if the track has no usable locator.
    pub fn resolve_locator(&self, track: &Track) -> Result<String> {
        let raw = track
            .playable_locator()
            .ok_or_else(|| PlaybackError::NotPlayable(track.id.clone()))?;

        if Url::parse(raw).is_ok() {
            return Ok(raw.to_string());
        }

        match &self.base_url {
            Some(base) => base
                .join(raw)
                .map(String::from)
                .map_err(|_| PlaybackError::NotPlayable(track.id.clone())),
            None => Ok(raw.to_string()),
        }
    }

    /// Load `track` into a fresh session.
    ///
    /// Tears down the current session first unless it already plays this
    /// track and has not ended or failed, in which case this is a no-op.
    /// Position is reset to 0 and duration seeded from the track's nominal
    /// duration. A transport that refuses to open leaves the engine `Failed`.
    ///
    /// # Errors
    /// Returns `NotPlayable` (without touching the current session) if the
    /// track has no content locator.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn load(&self, track: Track) -> Result<()> {
        let locator = self.resolve_locator(&track)?;
        let _loading = self.load_lock.lock().await;

        let (previous, generation) = {
            let mut inner = self.inner.lock();
            let already_loaded = !inner.published.state.is_terminal()
                && inner
                    .session
                    .as_ref()
                    .is_some_and(|session| session.track_id == track.id);
            if already_loaded {
                debug!("Track already loaded");
                return Ok(());
            }

            let previous = inner.session.take().map(|mut session| {
                session.stop();
                session
            });

            inner.published.generation += 1;
            inner.published.last_error = None;
            let generation = inner.published.generation;

            inner.set_track(Some(track.clone()));
            inner.set_state(PlaybackState::Loading);
            inner.set_playing(false);
            inner.set_position(0.0);
            inner.set_duration(track.nominal_duration(), false);
            (previous, generation)
        };

        if let Some(previous) = previous {
            self.close_session(previous.id, previous.generation).await;
        }

        let (observer, reports) = TransportObserver::channel(generation);
        let request = TransportRequest {
            track_id: track.id.clone(),
            locator: locator.clone(),
            nominal_duration: track.nominal_duration(),
        };
        debug!(generation, locator = %redact_locator(&locator), "Opening transport session");

        let session_id = match self.transport.open(request, observer).await {
            Ok(id) => id,
            Err(e) => {
                warn!(generation, error = %e, "Transport refused to open session");
                let mut inner = self.inner.lock();
                if inner.published.generation == generation {
                    inner.record_failure(e.to_string());
                }
                return Ok(());
            }
        };

        // Registered under the same lock the tasks check, so reports queued
        // during `open` are applied rather than dropped as stale.
        let cancel = self.shutdown.child_token();
        {
            let mut inner = self.inner.lock();
            let tasks = vec![
                tokio::spawn(listen(Arc::clone(&self.inner), reports, cancel.clone())),
                tokio::spawn(sample(
                    Arc::clone(&self.inner),
                    Arc::clone(&self.transport),
                    session_id,
                    generation,
                    self.config.sample_interval,
                    cancel.clone(),
                )),
            ];
            inner.session = Some(ActiveSession {
                id: session_id,
                generation,
                track_id: track.id,
                cancel,
                tasks,
            });
        }

        info!(generation, session = %session_id, "Session opened");
        Ok(())
    }

    /// Tear down the current session and return to `Idle`.
    #[instrument(skip(self))]
    pub async fn unload(&self) {
        let _loading = self.load_lock.lock().await;

        let previous = {
            let mut inner = self.inner.lock();
            let previous = inner.session.take().map(|mut session| {
                session.stop();
                session
            });

            inner.published.generation += 1;
            inner.published.last_error = None;
            inner.set_track(None);
            inner.set_state(PlaybackState::Idle);
            inner.set_playing(false);
            inner.set_position(0.0);
            inner.set_duration(0.0, false);
            previous
        };

        if let Some(previous) = previous {
            self.close_session(previous.id, previous.generation).await;
            info!("Session unloaded");
        }
    }

    /// Start or resume playback. No-op without a session or while playing.
    #[instrument(skip(self))]
    pub async fn play(&self) {
        let Some((session, generation)) =
            self.command_target(|state| matches!(state, PlaybackState::Loading | PlaybackState::Paused))
        else {
            return;
        };

        if let Err(e) = self.transport.play(session).await {
            self.transport_failed(generation, e);
            return;
        }

        let mut inner = self.inner.lock();
        if inner.is_current(generation)
            && matches!(
                inner.published.state,
                PlaybackState::Loading | PlaybackState::Paused
            )
        {
            inner.set_state(PlaybackState::Playing);
            inner.set_playing(true);
        }
    }

    /// Pause playback. No-op unless playing.
    #[instrument(skip(self))]
    pub async fn pause(&self) {
        let Some((session, generation)) =
            self.command_target(|state| state == PlaybackState::Playing)
        else {
            return;
        };

        if let Err(e) = self.transport.pause(session).await {
            self.transport_failed(generation, e);
            return;
        }

        let mut inner = self.inner.lock();
        if inner.is_current(generation) && inner.published.state == PlaybackState::Playing {
            inner.set_state(PlaybackState::Paused);
            inner.set_playing(false);
        }
    }

    pub async fn toggle_play_pause(&self) {
        match self.state() {
            PlaybackState::Playing => self.pause().await,
            PlaybackState::Loading | PlaybackState::Paused => self.play().await,
            state => debug!(%state, "Toggle ignored"),
        }
    }

    /// Seek to `seconds`, clamped to `[0, duration]`.
    ///
    /// With an unknown duration (0) only the lower bound applies. Non-finite
    /// targets are ignored. The lifecycle state is left unchanged.
    #[instrument(skip(self))]
    pub async fn seek(&self, seconds: f64) {
        if !seconds.is_finite() {
            debug!("Ignoring non-finite seek target");
            return;
        }

        let Some((session, generation)) =
            self.command_target(|state| state.accepts_transport_commands())
        else {
            return;
        };

        let duration = self.duration();
        let target = if duration > 0.0 {
            seconds.clamp(0.0, duration)
        } else {
            seconds.max(0.0)
        };

        if let Err(e) = self.transport.seek(session, target).await {
            warn!(generation, error = %e, "Seek rejected by transport");
            return;
        }

        let mut inner = self.inner.lock();
        if inner.is_current(generation) && !inner.published.state.is_terminal() {
            inner.set_position(target);
        }
    }

    /// Session and generation to address, if the current state allows `allowed`.
    fn command_target(
        &self,
        allowed: impl Fn(PlaybackState) -> bool,
    ) -> Option<(TransportSessionId, u64)> {
        let inner = self.inner.lock();
        let session = inner.session.as_ref()?;
        if !allowed(inner.published.state) {
            debug!(state = %inner.published.state, "Command ignored in current state");
            return None;
        }
        Some((session.id, session.generation))
    }

    fn transport_failed(&self, generation: u64, error: PlaybackError) {
        let mut inner = self.inner.lock();
        if inner.is_current(generation) {
            warn!(generation, error = %error, "Transport command failed");
            inner.record_failure(error.to_string());
        }
    }

    async fn close_session(&self, session: TransportSessionId, generation: u64) {
        if let Err(e) = self.transport.close(session).await {
            warn!(generation, error = %e, "Failed to close transport session");
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown.cancel();

        let Some(mut session) = self.inner.lock().session.take() else {
            return;
        };
        session.stop();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let transport = Arc::clone(&self.transport);
            handle.spawn(async move {
                if let Err(e) = transport.close(session.id).await {
                    warn!(error = %e, "Failed to close transport session on shutdown");
                }
            });
        }
    }
}

/// Normalise a base URL so relative locators join under its path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| PlaybackError::Config(format!("content_base_url is invalid: {}", e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Forward transport reports into the engine until the session is torn down.
async fn listen(
    inner: Arc<Mutex<EngineInner>>,
    mut reports: UnboundedReceiver<TaggedReport>,
    cancel: CancellationToken,
) {
    loop {
        let tagged = tokio::select! {
            _ = cancel.cancelled() => break,
            received = reports.recv() => match received {
                Some(tagged) => tagged,
                None => break,
            },
        };
        inner.lock().apply_report(tagged);
    }
}

/// Periodically pull the playhead position from the transport.
async fn sample(
    inner: Arc<Mutex<EngineInner>>,
    transport: Arc<dyn Transport>,
    session: TransportSessionId,
    generation: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        {
            let inner = inner.lock();
            if !inner.is_current(generation) {
                break;
            }
            if inner.published.state.is_terminal() {
                continue;
            }
        }

        let raw = tokio::select! {
            _ = cancel.cancelled() => break,
            raw = transport.position(session) => raw,
        };

        match raw {
            Ok(seconds) => inner.lock().apply_sample(generation, seconds),
            Err(e) => trace!(generation, error = %e, "Position sample failed"),
        }
    }

    trace!(generation, "Sampler stopped");
}
