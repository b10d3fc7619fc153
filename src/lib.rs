//! Workspace facade crate.
//!
//! Host applications can depend on `player-workspace` alone and reach the
//! runtime, library and playback crates through these re-exports. Playback is
//! behind the default `playback` feature so library-only consumers (e.g. a
//! catalogue browser) can skip the engine.

pub use core_library as library;
pub use core_runtime as runtime;

#[cfg(feature = "playback")]
pub use core_playback as playback;
