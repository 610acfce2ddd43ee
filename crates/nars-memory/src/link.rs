//! Task links, term links and the novelty protocol that pairs them.
//!
//! A [`TermLink`] points from a concept to a structurally related term.  A
//! [`TaskLink`] points from a concept to a task that is relevant to it and
//! carries a [`NoveltyRecord`]: a short rolling window of the term links it
//! was recently paired with.
//!
//! [`Bag::take_out_matching`] uses that record to avoid handing the same
//! (task link, term link) pair to the rule engine cycle after cycle.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use nars_memory::{Bag, BagConfig, LinkRole, StandardBudget, TaskLink, TermLink};
//! use nars_types::{Budget, Sentence, Task, Term, Truth};
//!
//! let policy = Arc::new(StandardBudget::default());
//! let mut term_links = Bag::with_seed(BagConfig::new(8, 100, 50.0), policy, 1);
//! term_links.put_in(TermLink::new(Term::atom("bird"), LinkRole::Component(0), Budget::default()));
//!
//! let statement = Term::statement(Term::atom("bird"), "-->", Term::atom("animal"));
//! let task = Task::new(Sentence::judgment(statement, Truth::default()), Budget::default());
//! let mut task_link = TaskLink::new(task, Budget::default(), 4);
//!
//! // First pairing is novel …
//! let link = term_links.take_out_matching(&mut task_link, 3, 0).unwrap();
//! term_links.put_back(link, 0);
//! // … the same pairing again is not.
//! assert!(term_links.take_out_matching(&mut task_link, 3, 0).is_none());
//! assert_eq!(term_links.len(), 1);
//! ```

use std::collections::VecDeque;
use std::fmt;

use nars_types::{Budget, Task, Term};
use serde::{Deserialize, Serialize};

use crate::bag::{Bag, Item};

/// Bag of structural links owned by one concept.
pub type TermLinkBag = Bag<TermLink>;

/// Bag of task links owned by one concept.
pub type TaskLinkBag = Bag<TaskLink>;

// ─────────────────────────────────────────────────────────────────────────────
// TermLink
// ─────────────────────────────────────────────────────────────────────────────

/// Direction of a structural relation, with the component position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkRole {
    /// The owning concept is a compound; the target is its component at
    /// this index.
    Component(usize),
    /// The owning concept is a component; the target is a compound that
    /// contains it at this index.
    Compound(usize),
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRole::Component(i) => write!(f, "component#{i}"),
            LinkRole::Compound(i) => write!(f, "compound#{i}"),
        }
    }
}

/// Structural association from a concept to another term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermLink {
    pub target: Term,
    pub role: LinkRole,
    pub budget: Budget,
}

impl TermLink {
    pub fn new(target: Term, role: LinkRole, budget: Budget) -> Self {
        Self {
            target,
            role,
            budget,
        }
    }
}

impl Item for TermLink {
    type Key = String;

    fn key(&self) -> String {
        format!("{} {}", self.role, self.target)
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NoveltyRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Rolling window of the term-link keys a task link was recently paired
/// with.  The oldest entry is dropped once the window is full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyRecord {
    capacity: usize,
    recent: VecDeque<String>,
}

impl NoveltyRecord {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            recent: VecDeque::with_capacity(capacity),
        }
    }

    /// `true` if `key` is not in the window.
    pub fn is_novel(&self, key: &str) -> bool {
        !self.recent.iter().any(|k| k == key)
    }

    pub fn record(&mut self, key: String) {
        if self.capacity == 0 {
            return;
        }
        self.recent.push_back(key);
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TaskLink
// ─────────────────────────────────────────────────────────────────────────────

/// Association from a concept to a task relevant to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLink {
    pub task: Task,
    /// The link's own budget; independent of the task's.
    pub budget: Budget,
    novelty: NoveltyRecord,
}

impl TaskLink {
    pub fn new(task: Task, budget: Budget, novelty_record_length: usize) -> Self {
        Self {
            task,
            budget,
            novelty: NoveltyRecord::new(novelty_record_length),
        }
    }

    /// `true` unless `term_link` is among the recently paired term links.
    pub fn is_novel(&self, term_link: &TermLink) -> bool {
        self.novelty.is_novel(&term_link.key())
    }

    pub fn record_pairing(&mut self, term_link: &TermLink) {
        self.novelty.record(term_link.key());
    }

    pub fn novelty(&self) -> &NoveltyRecord {
        &self.novelty
    }
}

impl Item for TaskLink {
    type Key = String;

    fn key(&self) -> String {
        self.task.key()
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Novelty-constrained retrieval
// ─────────────────────────────────────────────────────────────────────────────

impl Bag<TermLink> {
    /// Take out a term link that `task_link` has not been paired with
    /// recently.
    ///
    /// Makes at most `max_attempts` draws.  A non-novel link is put back
    /// (decayed as of `now`) before the next draw.  A novel link is recorded
    /// in the task link's novelty window and returned; the caller owns it
    /// until it is put back.  `None` means the bag was empty or no fresh
    /// pairing turned up within the attempt budget.
    pub fn take_out_matching(
        &mut self,
        task_link: &mut TaskLink,
        max_attempts: usize,
        now: u64,
    ) -> Option<TermLink> {
        for _ in 0..max_attempts {
            let term_link = self.take_out()?;
            if task_link.is_novel(&term_link) {
                task_link.record_pairing(&term_link);
                return Some(term_link);
            }
            self.put_back(term_link, now);
        }
        None
    }
}
