//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the player core:
//! - Logging and tracing infrastructure
//! - Event bus system
//! - Shared error type for configuration and runtime failures
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the library and playback crates
//! depend on. It establishes the logging conventions and the broadcast event
//! mechanism used to push playback state to observers.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{EventBus, EventStream};
