//! # Library Module
//!
//! Catalogue-facing side of the player.
//!
//! ## Overview
//!
//! This module provides:
//! - Domain models for tracks, albums and playlists
//! - Collaborator traits for the track resolver and the local like store
//! - The ordered concurrent fetch pipeline, with a bulk-first playlist path
//! - An explicitly owned album cache and an album loader built on it
//! - An in-memory library for demos and tests

pub mod album;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod repositories;

pub use album::{AlbumLoader, LoadedAlbum};
pub use cache::AlbumCache;
pub use config::FetchConfig;
pub use error::{LibraryError, Result};
pub use fetch::FetchPipeline;
pub use models::{Album, Artist, Playlist, Track};
pub use repositories::{BulkMode, InMemoryLibrary, LikeStore, TrackResolver};
