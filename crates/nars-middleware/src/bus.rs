//! Topic-based publish/subscribe channel for reasoner output.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others, and without the publisher (the scheduler) ever waiting.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Input`] | External tasks accepted into memory |
//! | [`Topic::Derivations`] | Tasks produced by the rule engine |
//! | [`Topic::Memory`] | Concepts forgotten under capacity pressure |
//! | [`Topic::Status`] | Lifecycle notices: stop requested, driver finished |
//!
//! # Example
//!
//! ```rust
//! use nars_middleware::{EventBus, Topic};
//! use nars_types::{Event, EventPayload};
//!
//! let bus = EventBus::default();
//! let mut rx = bus.subscribe_to(Topic::Derivations);
//!
//! bus.publish_to(Topic::Derivations, Event::new("demo", 1, EventPayload::Derived("<a --> c>.".into())))
//!     .unwrap();
//! assert_eq!(rx.try_recv().unwrap().cycle, 1);
//! ```

use nars_types::{Event, NarsError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the output bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// External tasks accepted into the novel-task bag.
    Input,
    /// Tasks derived by the rule engine.
    Derivations,
    /// Memory housekeeping: concepts forgotten.
    Memory,
    /// Lifecycle notices.
    Status,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::Input, Topic::Derivations, Topic::Memory, Topic::Status];
}

/// Shared output bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    input: broadcast::Sender<Event>,
    derivations: broadcast::Sender<Event>,
    memory: broadcast::Sender<Event>,
    status: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (input, _) = broadcast::channel(capacity);
        let (derivations, _) = broadcast::channel(capacity);
        let (memory, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self {
            input,
            derivations,
            memory,
            status,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    /// Returns `Ok(0)` when no subscribers are currently listening on the
    /// topic (this is a normal condition, not an error).
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, NarsError> {
        let sender = self.topic_sender(topic);
        if sender.receiver_count() == 0 {
            return Ok(0);
        }
        sender
            .send(event)
            .map_err(|e| NarsError::Channel(format!("{topic:?} send error: {e}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of receivers currently listening on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Input => &self.input,
            Topic::Derivations => &self.derivations,
            Topic::Memory => &self.memory,
            Topic::Status => &self.status,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// A receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking receive for callers outside an async runtime.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Everything buffered right now, skipping over any lag gap.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                }
                Err(_) => return events,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
