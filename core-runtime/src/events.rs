//! # Event Bus
//!
//! Typed fan-out of change notifications over `tokio::sync::broadcast`.
//!
//! The playback engine owns one [`EventBus`] and emits every published change
//! on it. The state projector and any host observer hold their own receiver,
//! so a slow observer never holds up the engine:
//!
//! ```text
//!   engine ──emit──> EventBus ──> projector
//!                        └──────> host observer(s)
//! ```
//!
//! A receiver that falls more than the buffer size behind gets
//! `RecvError::Lagged(n)` once and then continues with the newest events.
//! Consumers that need a consistent picture resynchronise from a snapshot at
//! that point. `RecvError::Closed` means the producer is gone.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Buffer size used by [`EventBus::default`].
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// High-frequency updates such as position samples
    Debug,
    Info,
    Warning,
    Error,
}

/// Implemented by every event type carried on an [`EventBus`].
pub trait BusEvent: Clone + Send + fmt::Debug + 'static {
    fn description(&self) -> &str;

    fn severity(&self) -> EventSeverity {
        EventSeverity::Debug
    }
}

/// Multi-producer, multi-consumer bus for events of type `E`.
///
/// Cloning the bus yields another producer handle for the same channel.
pub struct EventBus<E: BusEvent> {
    sender: broadcast::Sender<E>,
}

impl<E: BusEvent> EventBus<E> {
    /// `capacity` is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send `event` to every current receiver.
    ///
    /// Returns how many receivers it reached. Emitting with nobody listening
    /// is not an error; the event is simply dropped.
    pub fn emit(&self, event: E) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// New receiver. Only events emitted from now on are delivered.
    pub fn subscribe(&self) -> Receiver<E> {
        self.sender.subscribe()
    }

    pub fn stream(&self) -> EventStream<E> {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: BusEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

type Predicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// Receiver that skips events not matching a predicate.
pub struct EventStream<E: BusEvent> {
    receiver: Receiver<E>,
    predicate: Option<Predicate<E>>,
}

impl<E: BusEvent> EventStream<E> {
    pub fn new(receiver: Receiver<E>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    /// Keep only events for which `predicate` holds. Replaces any earlier
    /// predicate.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Keep only events at or above `min`.
    pub fn min_severity(self, min: EventSeverity) -> Self {
        self.filter(move |event| event.severity() >= min)
    }

    fn wants(&self, event: &E) -> bool {
        self.predicate.as_ref().map_or(true, |predicate| predicate(event))
    }

    /// Wait for the next matching event.
    pub async fn recv(&mut self) -> Result<E, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event that is already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Result<E, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(Ok(event)),
                Ok(_) => {}
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl<E: BusEvent> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}
