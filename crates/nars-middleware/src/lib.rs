//! `nars-middleware` – output plumbing for the reasoner.
//!
//! Carries human-readable status and derivation lines from the scheduler to
//! whatever front-end is listening, without the scheduler knowing or caring
//! who that is.
//!
//! # Modules
//!
//! - [`bus`] – Typed, topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
