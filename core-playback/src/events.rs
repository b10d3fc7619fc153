//! # Playback Events
//!
//! The engine publishes every observable change as one [`PlaybackEvent`] on an
//! [`EventBus`](core_runtime::EventBus). Each field (current track, playing
//! flag, position, duration) has its own variant so consumers can follow any
//! subset of them from a single subscription.

use core_library::Track;
use core_runtime::events::{BusEvent, EventSeverity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the engine's single transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No session.
    #[default]
    Idle,
    /// Transport constructed, playback not started yet.
    Loading,
    Playing,
    Paused,
    /// Natural end of media reached.
    Ended,
    /// The transport reported a failure.
    Failed,
}

impl PlaybackState {
    /// `Ended` and `Failed` end the current session; only a new load leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Ended | PlaybackState::Failed)
    }

    /// Whether play/pause/seek have a session to act on.
    pub fn accepts_transport_commands(&self) -> bool {
        matches!(
            self,
            PlaybackState::Loading | PlaybackState::Playing | PlaybackState::Paused
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
            PlaybackState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Change notifications published by the playback engine.
///
/// Events are only emitted when the published value actually changes.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// The current track changed (`None` after unload).
    TrackChanged(Option<Track>),
    PlayingChanged(bool),
    /// Published position in seconds. Always finite and non-negative.
    PositionChanged(f64),
    /// Published duration in seconds. Always finite and non-negative.
    DurationChanged(f64),
    StateChanged(PlaybackState),
    /// A transport failure, recorded against the track it happened on.
    Error { track_id: String, message: String },
}

impl BusEvent for PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::TrackChanged(_) => "Current track changed",
            PlaybackEvent::PlayingChanged(_) => "Playing flag changed",
            PlaybackEvent::PositionChanged(_) => "Position updated",
            PlaybackEvent::DurationChanged(_) => "Duration updated",
            PlaybackEvent::StateChanged(_) => "Playback state changed",
            PlaybackEvent::Error { .. } => "Playback failed",
        }
    }

    fn severity(&self) -> EventSeverity {
        match self {
            PlaybackEvent::PositionChanged(_) | PlaybackEvent::DurationChanged(_) => {
                EventSeverity::Debug
            }
            PlaybackEvent::TrackChanged(_)
            | PlaybackEvent::PlayingChanged(_)
            | PlaybackEvent::StateChanged(_) => EventSeverity::Info,
            PlaybackEvent::Error { .. } => EventSeverity::Error,
        }
    }
}
