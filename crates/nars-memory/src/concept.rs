//! [`Concept`] – the long-term memory record for one term.
//!
//! A concept owns exactly one [`TaskLinkBag`], one [`TermLinkBag`] and three
//! bounded sentence tables (beliefs, questions, goals).  When the concept is
//! evicted from the [`ConceptStore`](crate::store::ConceptStore) all of it is
//! dropped with it.
//!
//! Links refer to other concepts by [`Term`] only; the target concept is
//! resolved through the store when needed.

use std::sync::Arc;

use nars_types::{Budget, Punctuation, Task, Term};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::bag::{Bag, BagConfig, Item};
use crate::budget::BudgetPolicy;
use crate::link::{LinkRole, TaskLink, TaskLinkBag, TermLink, TermLinkBag};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Shape of every concept created by a store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConceptConfig {
    pub task_links: BagConfig,
    pub term_links: BagConfig,
    /// Length of each task link's recent-pairing window.
    pub novelty_record_length: usize,
    pub belief_capacity: usize,
    pub question_capacity: usize,
    pub goal_capacity: usize,
}

impl Default for ConceptConfig {
    fn default() -> Self {
        Self {
            task_links: BagConfig::new(20, 100, 20.0),
            term_links: BagConfig::new(100, 100, 50.0),
            novelty_record_length: 10,
            belief_capacity: 7,
            question_capacity: 5,
            goal_capacity: 7,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SentenceTable
// ─────────────────────────────────────────────────────────────────────────────

/// How a [`SentenceTable`] orders its entries and picks what to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableOrder {
    /// Highest confidence first; the least confident entry is dropped.
    Confidence,
    /// Arrival order; the oldest entry is dropped.
    Fifo,
}

/// Bounded list of tasks held by a concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceTable {
    capacity: usize,
    order: TableOrder,
    entries: Vec<Task>,
}

impl SentenceTable {
    pub fn new(capacity: usize, order: TableOrder) -> Self {
        Self {
            capacity,
            order,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Add `task`, returning whatever had to make room for it.
    ///
    /// A task whose sentence is already present only raises the resident
    /// task's priority.  When full, a newcomer that ranks below every
    /// resident is itself returned.
    pub fn add(&mut self, task: Task) -> Option<Task> {
        if self.capacity == 0 {
            return Some(task);
        }
        let key = task.key();
        if let Some(existing) = self.entries.iter_mut().find(|t| t.key() == key) {
            if task.budget.priority > existing.budget.priority {
                existing.budget.set_priority(task.budget.priority);
            }
            return None;
        }

        match self.order {
            TableOrder::Fifo => {
                self.entries.push(task);
                if self.entries.len() > self.capacity {
                    return Some(self.entries.remove(0));
                }
                None
            }
            TableOrder::Confidence => {
                let confidence = confidence_of(&task);
                let pos = self
                    .entries
                    .iter()
                    .position(|t| confidence_of(t) < confidence)
                    .unwrap_or(self.entries.len());
                self.entries.insert(pos, task);
                if self.entries.len() > self.capacity {
                    return self.entries.pop();
                }
                None
            }
        }
    }

    /// Best entry: highest confidence, or oldest for FIFO tables.
    pub fn first(&self) -> Option<&Task> {
        self.entries.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn confidence_of(task: &Task) -> f32 {
    task.sentence.truth.map_or(0.0, |t| t.confidence)
}

// ─────────────────────────────────────────────────────────────────────────────
// Concept
// ─────────────────────────────────────────────────────────────────────────────

pub struct Concept {
    term: Term,
    budget: Budget,
    task_links: TaskLinkBag,
    term_links: TermLinkBag,
    beliefs: SentenceTable,
    questions: SentenceTable,
    goals: SentenceTable,
    novelty_record_length: usize,
}

impl Concept {
    /// Empty concept for `term`.  `seed` fixes the selection order of both
    /// link bags.
    pub fn new(
        term: Term,
        budget: Budget,
        config: &ConceptConfig,
        policy: Arc<dyn BudgetPolicy>,
        seed: u64,
    ) -> Self {
        Self {
            term,
            budget,
            task_links: Bag::with_seed(config.task_links, Arc::clone(&policy), seed),
            term_links: Bag::with_seed(config.term_links, policy, seed.wrapping_add(1)),
            beliefs: SentenceTable::new(config.belief_capacity, TableOrder::Confidence),
            questions: SentenceTable::new(config.question_capacity, TableOrder::Fifo),
            goals: SentenceTable::new(config.goal_capacity, TableOrder::Confidence),
            novelty_record_length: config.novelty_record_length,
        }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    /// File `task` into the table matching its punctuation.
    ///
    /// Returns the task displaced from that table, if any.
    pub fn process(&mut self, task: &Task) -> Option<Task> {
        let displaced = match task.sentence.punctuation {
            Punctuation::Judgment => self.beliefs.add(task.clone()),
            Punctuation::Question => self.questions.add(task.clone()),
            Punctuation::Goal => self.goals.add(task.clone()),
        };
        trace!(concept = %self.term, task = %task.sentence, "task processed");
        displaced
    }

    /// The most confident belief, if the concept holds any.
    pub fn select_belief(&self) -> Option<&Task> {
        self.beliefs.first()
    }

    /// Insert (or merge) a task link to `task`.  Returns an evicted link.
    pub fn link_task(&mut self, task: &Task, budget: Budget) -> Option<TaskLink> {
        self.task_links
            .put_in(TaskLink::new(task.clone(), budget, self.novelty_record_length))
    }

    /// Insert (or merge) a term link to `target`.  Returns an evicted link.
    pub fn link_term(&mut self, target: Term, role: LinkRole, budget: Budget) -> Option<TermLink> {
        self.term_links.put_in(TermLink::new(target, role, budget))
    }

    pub fn task_links(&self) -> &TaskLinkBag {
        &self.task_links
    }

    pub fn task_links_mut(&mut self) -> &mut TaskLinkBag {
        &mut self.task_links
    }

    pub fn term_links(&self) -> &TermLinkBag {
        &self.term_links
    }

    pub fn term_links_mut(&mut self) -> &mut TermLinkBag {
        &mut self.term_links
    }

    pub fn beliefs(&self) -> &SentenceTable {
        &self.beliefs
    }

    pub fn questions(&self) -> &SentenceTable {
        &self.questions
    }

    pub fn goals(&self) -> &SentenceTable {
        &self.goals
    }
}

impl Item for Concept {
    type Key = Term;

    fn key(&self) -> Term {
        self.term.clone()
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}

impl std::fmt::Debug for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Concept")
            .field("term", &self.term)
            .field("budget", &self.budget)
            .field("task_links", &self.task_links.len())
            .field("term_links", &self.term_links.len())
            .field("beliefs", &self.beliefs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use nars_types::{Sentence, Truth};

    use super::*;
    use crate::budget::StandardBudget;

    fn statement(s: &str, p: &str) -> Term {
        Term::statement(Term::atom(s), "-->", Term::atom(p))
    }

    fn belief(s: &str, p: &str, confidence: f32) -> Task {
        Task::new(
            Sentence::judgment(statement(s, p), Truth::new(1.0, confidence)),
            Budget::default(),
        )
    }

    fn concept(term: Term) -> Concept {
        Concept::new(
            term,
            Budget::default(),
            &ConceptConfig::default(),
            Arc::new(StandardBudget::default()),
            3,
        )
    }

    /// A new concept has empty tables and link bags.
    #[test]
    fn new_concept_is_empty() {
        let c = concept(Term::atom("x"));
        assert!(c.task_links().is_empty());
        assert!(c.term_links().is_empty());
        assert!(c.beliefs().is_empty());
        assert!(c.select_belief().is_none());
    }

    /// Sentences land in the table for their punctuation.
    #[test]
    fn process_routes_by_punctuation() {
        let mut c = concept(statement("a", "b"));
        c.process(&belief("a", "b", 0.9));
        c.process(&Task::new(Sentence::question(statement("a", "b")), Budget::default()));
        c.process(&Task::new(
            Sentence::goal(statement("a", "b"), Truth::default()),
            Budget::default(),
        ));
        assert_eq!(c.beliefs().len(), 1);
        assert_eq!(c.questions().len(), 1);
        assert_eq!(c.goals().len(), 1);
    }

    /// The most confident belief is selected.
    #[test]
    fn select_belief_prefers_confidence() {
        let mut c = concept(statement("a", "b"));
        c.process(&belief("a", "b", 0.3));
        c.process(&belief("a", "c", 0.95));
        c.process(&belief("a", "d", 0.6));
        let best = c.select_belief().unwrap();
        assert_eq!(best.term(), &statement("a", "c"));
    }

    /// A full belief table drops its least confident entry.
    #[test]
    fn belief_table_drops_least_confident() {
        let mut table = SentenceTable::new(2, TableOrder::Confidence);
        assert!(table.add(belief("a", "b", 0.5)).is_none());
        assert!(table.add(belief("a", "c", 0.9)).is_none());
        let dropped = table.add(belief("a", "d", 0.7)).unwrap();
        assert_eq!(dropped.term(), &statement("a", "b"));
        assert_eq!(table.len(), 2);
    }

    /// A weaker newcomer does not enter a full table.
    #[test]
    fn weak_newcomer_bounces_off_full_table() {
        let mut table = SentenceTable::new(1, TableOrder::Confidence);
        table.add(belief("a", "b", 0.9));
        let dropped = table.add(belief("a", "c", 0.1)).unwrap();
        assert_eq!(dropped.term(), &statement("a", "c"));
    }

    /// Questions are kept first in, first out.
    #[test]
    fn question_table_is_fifo() {
        let mut table = SentenceTable::new(2, TableOrder::Fifo);
        for p in ["b", "c", "d"] {
            table.add(Task::new(Sentence::question(statement("a", p)), Budget::default()));
        }
        let terms: Vec<_> = table.iter().map(|t| t.term().to_string()).collect();
        assert_eq!(terms, vec!["<a --> c>", "<a --> d>"]);
    }

    /// A repeated sentence is not stored twice.
    #[test]
    fn duplicate_sentence_only_raises_priority() {
        let mut table = SentenceTable::new(3, TableOrder::Confidence);
        let mut low = belief("a", "b", 0.9);
        low.budget = Budget::new(0.2, 0.5, 0.5);
        let mut high = low.clone();
        high.budget = Budget::new(0.7, 0.5, 0.5);
        table.add(low);
        assert!(table.add(high).is_none());
        assert_eq!(table.len(), 1);
        assert!((table.first().unwrap().budget.priority - 0.7).abs() < 1e-6);
    }

    /// Linking the same task twice keeps one link.
    #[test]
    fn link_task_merges_duplicates() {
        let mut c = concept(statement("a", "b"));
        let task = belief("a", "b", 0.9);
        c.link_task(&task, Budget::new(0.3, 0.5, 0.5));
        c.link_task(&task, Budget::new(0.6, 0.5, 0.5));
        assert_eq!(c.task_links().len(), 1);
        let link = c.task_links().get(&task.key()).unwrap();
        assert!(link.budget.priority >= 0.6 - 1e-6);
    }

    /// The same target under two roles gives two links.
    #[test]
    fn link_term_keeps_roles_apart() {
        let mut c = concept(Term::atom("a"));
        let compound = statement("a", "b");
        c.link_term(compound.clone(), LinkRole::Compound(0), Budget::default());
        c.link_term(compound, LinkRole::Compound(1), Budget::default());
        assert_eq!(c.term_links().len(), 2);
    }

    /// A concept is keyed by its term.
    #[test]
    fn concept_key_is_its_term() {
        let c = concept(Term::atom("x"));
        assert_eq!(c.key(), Term::atom("x"));
    }
}
