//! `nars-types` – shared vocabulary for the reasoner workspace.
//!
//! Everything that crosses a crate boundary lives here: the [`Term`] a
//! concept is keyed by, the opaque [`Truth`] and [`Budget`] records, the
//! [`Task`] unit of work, the [`Event`] envelope published on the output bus,
//! and the global [`NarsError`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Largest representable priority.  Priorities live in `[0, 1)`.
pub const MAX_PRIORITY: f32 = 1.0 - f32::EPSILON;

/// Connectors that turn a two-component compound into a statement.
pub const COPULAS: [&str; 4] = ["-->", "<->", "==>", "<=>"];

// ─────────────────────────────────────────────────────────────────────────────
// Term
// ─────────────────────────────────────────────────────────────────────────────

/// The atomic unit of represented meaning.  Concepts and links are keyed by
/// terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// A bare word such as `bird`.
    Atom(String),
    /// A connector applied to an ordered list of component terms.  When the
    /// connector is one of [`COPULAS`] and there are exactly two components
    /// the compound is a statement (`<subject copula predicate>`).
    Compound {
        connector: String,
        components: Vec<Term>,
    },
}

impl Term {
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn compound(connector: impl Into<String>, components: Vec<Term>) -> Self {
        Term::Compound {
            connector: connector.into(),
            components,
        }
    }

    /// Build a `<subject copula predicate>` statement.
    pub fn statement(subject: Term, copula: impl Into<String>, predicate: Term) -> Self {
        Term::compound(copula, vec![subject, predicate])
    }

    /// Direct components of a compound; empty for atoms.
    pub fn components(&self) -> &[Term] {
        match self {
            Term::Atom(_) => &[],
            Term::Compound { components, .. } => components,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Term::Compound { .. })
    }

    /// `true` for two-component compounds whose connector is a copula.
    pub fn is_statement(&self) -> bool {
        match self {
            Term::Atom(_) => false,
            Term::Compound {
                connector,
                components,
            } => components.len() == 2 && COPULAS.contains(&connector.as_str()),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(name) => write!(f, "{name}"),
            Term::Compound {
                connector,
                components,
            } if self.is_statement() => {
                write!(f, "<{} {} {}>", components[0], connector, components[1])
            }
            Term::Compound {
                connector,
                components,
            } => {
                write!(f, "({connector}")?;
                for c in components {
                    write!(f, ", {c}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Truth and budget
// ─────────────────────────────────────────────────────────────────────────────

/// Evidential truth of a judgment or goal.  The arithmetic over it belongs to
/// the external truth module; the core only stores and ranks it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Truth {
    pub frequency: f32,
    pub confidence: f32,
}

impl Truth {
    /// Both components are clamped to `[0, 1]`.
    pub fn new(frequency: f32, confidence: f32) -> Self {
        Self {
            frequency: frequency.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

impl Default for Truth {
    fn default() -> Self {
        Self::new(1.0, 0.9)
    }
}

impl fmt::Display for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{:.2};{:.2}%", self.frequency, self.confidence)
    }
}

/// Attention budget attached to every item stored in a bag.
///
/// * `priority` – short-term claim on processing, in `[0, 1)`.
/// * `durability` – how slowly priority decays, in `[0, 1]`.
/// * `quality` – long-term usefulness; priority never decays below a floor
///   derived from it.
/// * `last_forgotten` – logical time of the last decay, used to compute the
///   elapsed time on the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub priority: f32,
    pub durability: f32,
    pub quality: f32,
    #[serde(default)]
    pub last_forgotten: u64,
}

impl Budget {
    pub fn new(priority: f32, durability: f32, quality: f32) -> Self {
        Self {
            priority: priority.clamp(0.0, MAX_PRIORITY),
            durability: durability.clamp(0.0, 1.0),
            quality: quality.clamp(0.0, 1.0),
            last_forgotten: 0,
        }
    }

    /// Same budget, stamped as last decayed at `time`.
    pub fn at(mut self, time: u64) -> Self {
        self.last_forgotten = time;
        self
    }

    /// Set the priority, clamped to `[0, 1)`.
    pub fn set_priority(&mut self, priority: f32) {
        self.priority = if priority.is_nan() {
            0.0
        } else {
            priority.clamp(0.0, MAX_PRIORITY)
        };
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(0.8, 0.8, 0.5)
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${:.2};{:.2};{:.2}$",
            self.priority, self.durability, self.quality
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sentence and task
// ─────────────────────────────────────────────────────────────────────────────

/// What kind of work a sentence asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Punctuation {
    /// `.` – a belief.
    Judgment,
    /// `?` – a question to be answered.
    Question,
    /// `!` – a goal to be achieved.
    Goal,
}

impl Punctuation {
    pub fn symbol(&self) -> char {
        match self {
            Punctuation::Judgment => '.',
            Punctuation::Question => '?',
            Punctuation::Goal => '!',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '.' => Some(Punctuation::Judgment),
            '?' => Some(Punctuation::Question),
            '!' => Some(Punctuation::Goal),
            _ => None,
        }
    }
}

/// A term with punctuation and (for judgments and goals) a truth value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub content: Term,
    pub punctuation: Punctuation,
    pub truth: Option<Truth>,
}

impl Sentence {
    pub fn judgment(content: Term, truth: Truth) -> Self {
        Self {
            content,
            punctuation: Punctuation::Judgment,
            truth: Some(truth),
        }
    }

    pub fn question(content: Term) -> Self {
        Self {
            content,
            punctuation: Punctuation::Question,
            truth: None,
        }
    }

    pub fn goal(content: Term, truth: Truth) -> Self {
        Self {
            content,
            punctuation: Punctuation::Goal,
            truth: Some(truth),
        }
    }

    /// Identity key: two sentences with the same key are the same sentence.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.content, self.punctuation.symbol())?;
        if let Some(truth) = &self.truth {
            write!(f, " {truth}")?;
        }
        Ok(())
    }
}

/// A unit of input or derived work awaiting processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub sentence: Sentence,
    pub budget: Budget,
    /// Key of the task this one was derived from; `None` for external input.
    pub parent: Option<String>,
}

impl Task {
    pub fn new(sentence: Sentence, budget: Budget) -> Self {
        Self {
            sentence,
            budget,
            parent: None,
        }
    }

    pub fn derived(sentence: Sentence, budget: Budget, parent: &Task) -> Self {
        Self {
            sentence,
            budget,
            parent: Some(parent.key()),
        }
    }

    pub fn key(&self) -> String {
        self.sentence.key()
    }

    pub fn term(&self) -> &Term {
        &self.sentence.content
    }

    pub fn is_input(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.budget, self.sentence)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output events
// ─────────────────────────────────────────────────────────────────────────────

/// Envelope for every message published on the output bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"nars-runtime::scheduler"`
    pub source: String,
    /// Logical clock of the reasoner when the event was produced.
    pub cycle: u64,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, cycle: u64, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            cycle,
            payload,
        }
    }
}

/// Human-readable lines the reasoner reports to its front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// An external task entered the novel-task bag.
    InputAccepted(String),
    /// The rule collaborator produced a new task.
    Derived(String),
    /// A concept was evicted from long-term memory.
    ConceptForgotten(String),
    /// Lifecycle notices (stop requested, driver finished, ...).
    Status(String),
}

impl fmt::Display for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventPayload::InputAccepted(s) => write!(f, "IN: {s}"),
            EventPayload::Derived(s) => write!(f, "OUT: {s}"),
            EventPayload::ConceptForgotten(s) => write!(f, "FORGOT: {s}"),
            EventPayload::Status(s) => write!(f, "STATUS: {s}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type.  Capacity pressure and empty selections are normal
/// outcomes and never surface here.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum NarsError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
