//! # Playback Error Types
//!
//! Errors surfaced by the playback engine and controller.

use core_library::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// The catalogue could not resolve the requested track.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// The like-toggle target has no local record.
    #[error("Track not found locally: {0}")]
    TrackNotFoundLocally(String),

    /// The track carries no content locator.
    #[error("Track has no playable content: {0}")]
    NotPlayable(String),

    // ========================================================================
    // Navigation Errors
    // ========================================================================
    /// Next/previous requested while the current track is not part of a sequence.
    #[error("No active sequence")]
    NoActiveSequence,

    /// Next requested on the last entry of the sequence.
    #[error("End of playlist")]
    EndOfPlaylist,

    /// Previous requested on the first entry of the sequence.
    #[error("Beginning of playlist")]
    BeginningOfPlaylist,

    /// Attempted to play an empty sequence.
    #[error("Sequence is empty")]
    EmptySequence,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The underlying transport reported a failure.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Library error from core-library.
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` for expected navigation outcomes that leave state untouched.
    pub fn is_navigation_boundary(&self) -> bool {
        matches!(
            self,
            PlaybackError::NoActiveSequence
                | PlaybackError::EndOfPlaylist
                | PlaybackError::BeginningOfPlaylist
        )
    }

    /// Returns `true` if this error means a track could not be found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PlaybackError::TrackNotFound(_)
                | PlaybackError::TrackNotFoundLocally(_)
                | PlaybackError::Library(LibraryError::NotFound { .. })
        )
    }
}

impl From<core_runtime::Error> for PlaybackError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::Config(msg) => PlaybackError::Config(msg),
            other => PlaybackError::Internal(other.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
