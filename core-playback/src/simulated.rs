//! # Simulated Transport
//!
//! A clock-driven [`Transport`] that renders nothing. Position advances with
//! `tokio::time` while playing, the media duration is reported after a lookup
//! delay and `Ended` fires when the playhead reaches the end. Hooks let demos
//! and tests inject odd positions, late duration reports and failures.
//!
//! Like many real backends it does not cancel a pending duration report when a
//! session is closed; the late report still reaches the closed session's
//! observer.

use crate::error::{PlaybackError, Result};
use crate::transport::{Transport, TransportObserver, TransportRequest, TransportSessionId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

const DEFAULT_DURATION_DELAY: Duration = Duration::from_millis(200);

struct SimSession {
    track_id: String,
    observer: TransportObserver,
    media_duration: Option<f64>,
    playing: bool,
    /// Position at `resumed_at`, or the frozen position while paused.
    base_position: f64,
    resumed_at: Instant,
    /// Bumped by every play/pause/seek; invalidates scheduled end-of-media.
    epoch: u64,
    end_task: Option<JoinHandle<()>>,
}

impl SimSession {
    fn position(&self) -> f64 {
        let mut position = self.base_position;
        if self.playing {
            position += self.resumed_at.elapsed().as_secs_f64();
        }
        match self.media_duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

#[derive(Default)]
struct SimState {
    sessions: HashMap<TransportSessionId, SimSession>,
    latest: Option<TransportSessionId>,
    media: HashMap<String, f64>,
    refuse_open: HashSet<String>,
    injected_position: Option<f64>,
    duration_delay: Option<Duration>,
    opened: Vec<String>,
    closed: usize,
}

/// In-process transport driven by the tokio clock.
#[derive(Clone, Default)]
pub struct SimulatedTransport {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the real media duration of a track, reported after the duration delay.
    pub fn with_media(self, track_id: impl Into<String>, duration: f64) -> Self {
        self.state.lock().media.insert(track_id.into(), duration);
        self
    }

    /// Delay between open and the duration report (default 200ms).
    pub fn with_duration_delay(self, delay: Duration) -> Self {
        self.state.lock().duration_delay = Some(delay);
        self
    }

    /// Make `open` fail for a track.
    pub fn refuse(&self, track_id: impl Into<String>) {
        self.state.lock().refuse_open.insert(track_id.into());
    }

    /// Every subsequent `position` call returns `value` until cleared.
    pub fn inject_position(&self, value: f64) {
        self.state.lock().injected_position = Some(value);
    }

    pub fn clear_injected_position(&self) {
        self.state.lock().injected_position = None;
    }

    /// Send a duration report through the latest session's observer.
    pub fn report_duration(&self, seconds: f64) -> bool {
        self.with_latest_observer(|observer| observer.duration_changed(seconds))
    }

    /// Report a playback failure on the latest session.
    pub fn fail(&self, message: &str) -> bool {
        self.with_latest_observer(|observer| observer.failed(message))
    }

    /// Jump the latest session to the end of its media and report `Ended`.
    pub fn finish(&self) -> bool {
        let mut state = self.state.lock();
        let Some(id) = state.latest else {
            return false;
        };
        let Some(session) = state.sessions.get_mut(&id) else {
            return false;
        };
        session.epoch += 1;
        session.playing = false;
        session.base_position = session.media_duration.unwrap_or(session.base_position);
        if let Some(task) = session.end_task.take() {
            task.abort();
        }
        session.observer.ended()
    }

    /// Track ids in the order sessions were opened.
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    pub fn closed_count(&self) -> usize {
        self.state.lock().closed
    }

    /// Sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }

    pub fn latest_track(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .latest
            .and_then(|id| state.sessions.get(&id))
            .map(|session| session.track_id.clone())
    }

    fn with_latest_observer(&self, f: impl FnOnce(&TransportObserver) -> bool) -> bool {
        let state = self.state.lock();
        state
            .latest
            .and_then(|id| state.sessions.get(&id))
            .map(|session| f(&session.observer))
            .unwrap_or(false)
    }

    /// Schedule the end-of-media report for a playing session.
    fn schedule_end(&self, id: TransportSessionId, session: &mut SimSession) {
        if let Some(task) = session.end_task.take() {
            task.abort();
        }
        let Some(duration) = session.media_duration else {
            return;
        };

        let remaining = (duration - session.base_position).max(0.0);
        let epoch = session.epoch;
        let state = Arc::clone(&self.state);

        session.end_task = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(remaining)).await;

            let mut state = state.lock();
            let Some(session) = state.sessions.get_mut(&id) else {
                return;
            };
            if session.epoch != epoch || !session.playing {
                return;
            }
            session.playing = false;
            session.base_position = duration;
            session.end_task = None;
            trace!(track_id = %session.track_id, "Simulated media ended");
            session.observer.ended();
        }));
    }

    fn session_error(id: TransportSessionId) -> PlaybackError {
        PlaybackError::TransportFailure(format!("unknown session {}", id))
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn open(
        &self,
        request: TransportRequest,
        observer: TransportObserver,
    ) -> Result<TransportSessionId> {
        let mut state = self.state.lock();
        state.opened.push(request.track_id.clone());

        if state.refuse_open.contains(&request.track_id) {
            return Err(PlaybackError::TransportFailure(format!(
                "cannot open {}",
                request.locator
            )));
        }

        let id = TransportSessionId::new();
        let media_duration = state.media.get(&request.track_id).copied();

        if let Some(duration) = media_duration {
            let delay = state.duration_delay.unwrap_or(DEFAULT_DURATION_DELAY);
            let reporter = observer.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                reporter.duration_changed(duration);
            });
        }

        debug!(track_id = %request.track_id, session = %id, "Simulated session opened");
        state.sessions.insert(
            id,
            SimSession {
                track_id: request.track_id,
                observer,
                media_duration,
                playing: false,
                base_position: 0.0,
                resumed_at: Instant::now(),
                epoch: 0,
                end_task: None,
            },
        );
        state.latest = Some(id);
        Ok(id)
    }

    async fn play(&self, session: TransportSessionId) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .sessions
            .get_mut(&session)
            .ok_or_else(|| Self::session_error(session))?;

        if !entry.playing {
            entry.epoch += 1;
            entry.playing = true;
            entry.resumed_at = Instant::now();
            self.schedule_end(session, entry);
        }
        Ok(())
    }

    async fn pause(&self, session: TransportSessionId) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .sessions
            .get_mut(&session)
            .ok_or_else(|| Self::session_error(session))?;

        if entry.playing {
            entry.base_position = entry.position();
            entry.playing = false;
            entry.epoch += 1;
            if let Some(task) = entry.end_task.take() {
                task.abort();
            }
        }
        Ok(())
    }

    async fn seek(&self, session: TransportSessionId, seconds: f64) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .sessions
            .get_mut(&session)
            .ok_or_else(|| Self::session_error(session))?;

        entry.base_position = match entry.media_duration {
            Some(duration) => seconds.clamp(0.0, duration),
            None => seconds.max(0.0),
        };
        entry.resumed_at = Instant::now();
        entry.epoch += 1;
        if entry.playing {
            self.schedule_end(session, entry);
        }
        Ok(())
    }

    async fn position(&self, session: TransportSessionId) -> Result<f64> {
        let state = self.state.lock();
        let entry = state
            .sessions
            .get(&session)
            .ok_or_else(|| Self::session_error(session))?;
        Ok(state.injected_position.unwrap_or_else(|| entry.position()))
    }

    async fn close(&self, session: TransportSessionId) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(mut entry) = state.sessions.remove(&session) {
            if let Some(task) = entry.end_task.take() {
                task.abort();
            }
            state.closed += 1;
            debug!(track_id = %entry.track_id, "Simulated session closed");
        }
        if state.latest == Some(session) {
            state.latest = None;
        }
        Ok(())
    }
}
