//! # Playback Module
//!
//! Drives an opaque transport and keeps a consistent view of playback.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback engine: one transport session at a time, position sampling
//!   and authoritative duration tracking
//! - The playback controller: playlist cursor, next/previous and like toggles
//! - The state projector: a deduplicated snapshot with scrub arbitration
//! - A clock-driven simulated transport for demos and tests

pub mod config;
pub mod controller;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod events;
pub mod projector;
pub mod simulated;
pub mod transport;

pub use config::PlayerConfig;
pub use controller::PlaybackController;
pub use cursor::PlaylistCursor;
pub use engine::{EngineSnapshot, PlaybackEngine};
pub use error::{PlaybackError, Result};
pub use events::{PlaybackEvent, PlaybackState};
pub use projector::{ProjectedState, ProjectionState, StateProjector};
pub use simulated::SimulatedTransport;
pub use transport::{
    TaggedReport, Transport, TransportObserver, TransportReport, TransportRequest,
    TransportSessionId,
};
