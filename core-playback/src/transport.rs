//! # Transport Boundary
//!
//! The transport is the opaque primitive that actually decodes and renders
//! audio for a content locator. The engine drives it through [`Transport`] and
//! learns about asynchronous outcomes (authoritative duration, natural end,
//! failure) through the [`TransportObserver`] it registers when opening a
//! session.
//!
//! Every report an observer sends is tagged with the generation of the session
//! it was registered for. Once the engine tears a session down, the observer's
//! channel is closed and any report still in flight is discarded, so a slow
//! transport can never mutate state that belongs to a newer session.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of one transport session, issued by the transport on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportSessionId(Uuid);

impl TransportSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransportSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransportSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the engine asks the transport to open.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub track_id: String,
    /// Fully resolved content locator.
    pub locator: String,
    /// Duration hint from track metadata, 0 when unknown.
    pub nominal_duration: f64,
}

/// Asynchronous outcome reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportReport {
    /// The transport learned the media's real duration (seconds).
    DurationChanged(f64),
    /// Playback reached the end of the media.
    Ended,
    /// Playback failed.
    Failed(String),
}

/// A report together with the generation of the session it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedReport {
    pub generation: u64,
    pub report: TransportReport,
}

/// Handler the engine registers with the transport when a session opens.
///
/// Cheap to clone; transports may hand copies to their own background tasks.
#[derive(Debug, Clone)]
pub struct TransportObserver {
    generation: u64,
    sender: mpsc::UnboundedSender<TaggedReport>,
}

impl TransportObserver {
    pub fn new(generation: u64, sender: mpsc::UnboundedSender<TaggedReport>) -> Self {
        Self { generation, sender }
    }

    /// Create an observer along with the receiving end of its channel.
    pub fn channel(generation: u64) -> (Self, mpsc::UnboundedReceiver<TaggedReport>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(generation, sender), receiver)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the session has been torn down.
    pub fn is_attached(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Deliver a report. Returns `false` if nobody is listening any more.
    pub fn report(&self, report: TransportReport) -> bool {
        self.sender
            .send(TaggedReport {
                generation: self.generation,
                report,
            })
            .is_ok()
    }

    pub fn duration_changed(&self, seconds: f64) -> bool {
        self.report(TransportReport::DurationChanged(seconds))
    }

    pub fn ended(&self) -> bool {
        self.report(TransportReport::Ended)
    }

    pub fn failed(&self, message: impl Into<String>) -> bool {
        self.report(TransportReport::Failed(message.into()))
    }
}

/// The opaque playback primitive.
///
/// Implementations own decoding, buffering and output. All methods address a
/// session by the id returned from [`open`](Transport::open); calls against a
/// closed session may fail and the engine treats such failures as stale.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Construct a session for `request` and register `observer` for its
    /// asynchronous reports.
    async fn open(
        &self,
        request: TransportRequest,
        observer: TransportObserver,
    ) -> Result<TransportSessionId>;

    async fn play(&self, session: TransportSessionId) -> Result<()>;

    async fn pause(&self, session: TransportSessionId) -> Result<()>;

    /// Jump to `seconds` from the start of the media.
    async fn seek(&self, session: TransportSessionId, seconds: f64) -> Result<()>;

    /// Current raw playhead position in seconds.
    ///
    /// The value is not sanitised: it may be NaN, infinite or beyond the end
    /// of the media.
    async fn position(&self, session: TransportSessionId) -> Result<f64>;

    /// Release every resource held for the session.
    async fn close(&self, session: TransportSessionId) -> Result<()>;
}
