//! # Ordered Concurrent Fetch
//!
//! Resolves an ordered list of track identifiers into track records with one
//! concurrent lookup per identifier. Completion order is irrelevant: each task
//! carries the input index of its identifier and the batch is reassembled by
//! that index once every task has finished. A lookup that fails, panics or
//! finds nothing is dropped from the output; it never aborts the batch.

use crate::config::FetchConfig;
use crate::models::Track;
use crate::repositories::TrackResolver;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

/// Batch resolver over a [`TrackResolver`]
#[derive(Clone)]
pub struct FetchPipeline {
    resolver: Arc<dyn TrackResolver>,
    config: FetchConfig,
}

impl FetchPipeline {
    pub fn new(resolver: Arc<dyn TrackResolver>, config: FetchConfig) -> Self {
        Self { resolver, config }
    }

    pub fn resolver(&self) -> &Arc<dyn TrackResolver> {
        &self.resolver
    }

    /// Resolve `ids` concurrently, preserving input order and omitting every
    /// identifier that could not be resolved.
    ///
    /// The output never holds more entries than `ids`.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn resolve_ordered(&self, ids: &[String]) -> Vec<Track> {
        if ids.is_empty() {
            return Vec::new();
        }

        let limiter = self
            .config
            .max_concurrent
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        let mut tasks = JoinSet::new();
        for (index, id) in ids.iter().cloned().enumerate() {
            let resolver = Arc::clone(&self.resolver);
            let limiter = limiter.clone();

            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return (index, None),
                    },
                    None => None,
                };

                let resolved = match resolver.resolve_track(&id).await {
                    Ok(Some(track)) => Some(track),
                    Ok(None) => {
                        debug!(track_id = %id, index, "Track not found, omitting");
                        None
                    }
                    Err(e) => {
                        warn!(track_id = %id, index, error = %e, "Track lookup failed, omitting");
                        None
                    }
                };
                (index, resolved)
            });
        }

        let mut slots: Vec<(usize, Option<Track>)> = Vec::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(slot) => slots.push(slot),
                Err(e) => warn!(error = %e, "Lookup task aborted, omitting"),
            }
        }

        slots.sort_by_key(|(index, _)| *index);
        let tracks: Vec<Track> = slots.into_iter().filter_map(|(_, track)| track).collect();

        debug!(requested = ids.len(), resolved = tracks.len(), "Batch resolved");
        tracks
    }

    /// Resolve a playlist through the resolver's bulk path, falling back to
    /// [`resolve_ordered`](Self::resolve_ordered) for whatever the bulk call
    /// did not return (or for everything when it fails).
    ///
    /// The result is always in input order.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn resolve_playlist_tracks_with_fallback(&self, ids: &[String]) -> Vec<Track> {
        if ids.is_empty() {
            return Vec::new();
        }

        let bulk = match self.resolver.resolve_playlist_tracks(ids).await {
            Ok(tracks) => tracks,
            Err(e) => {
                debug!(error = %e, "Bulk lookup unavailable, resolving individually");
                return self.resolve_ordered(ids).await;
            }
        };

        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut found: HashMap<String, Track> = bulk
            .into_iter()
            .filter(|track| wanted.contains(track.id.as_str()))
            .map(|track| (track.id.clone(), track))
            .collect();

        let mut seen = HashSet::new();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains_key(id.as_str()) && seen.insert(id.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            debug!(missing = missing.len(), "Bulk lookup partial, filling gaps");
            for track in self.resolve_ordered(&missing).await {
                found.insert(track.id.clone(), track);
            }
        }

        ids.iter().filter_map(|id| found.get(id).cloned()).collect()
    }
}
