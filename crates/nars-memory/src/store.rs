//! [`ConceptStore`] – bounded long-term memory keyed by term.
//!
//! The store is a [`Bag`] of [`Concept`]s.  The bag's key index doubles as
//! the term → concept lookup table, so a concept is either in both the
//! priority structure and the lookup or in neither.
//!
//! Creating a concept in a full store forgets the weakest one, together with
//! its link bags and sentence tables.  The terms of forgotten concepts are
//! queued for reporting and drained with [`ConceptStore::take_forgotten`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use nars_memory::{BagConfig, ConceptConfig, ConceptStore, StandardBudget};
//! use nars_types::Term;
//!
//! let mut store = ConceptStore::new(
//!     BagConfig::new(2, 100, 10.0),
//!     ConceptConfig::default(),
//!     Arc::new(StandardBudget::default()),
//!     Some(7),
//! );
//! store.get_or_create(&Term::atom("bird"), 0);
//! assert!(store.contains(&Term::atom("bird")));
//!
//! let concept = store.select_one().unwrap();
//! store.return_one(concept, 1);
//! assert_eq!(store.len(), 1);
//! ```

use std::sync::Arc;

use nars_types::{Budget, Term};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::bag::{Bag, BagConfig, BagStats, Item};
use crate::budget::BudgetPolicy;
use crate::concept::{Concept, ConceptConfig};

pub struct ConceptStore {
    concepts: Bag<Concept>,
    concept_config: ConceptConfig,
    policy: Arc<dyn BudgetPolicy>,
    /// Seeds the link bags of newly created concepts.
    seeder: StdRng,
    initial_budget: Budget,
    forgotten: Vec<Term>,
}

impl ConceptStore {
    /// `seed` makes concept selection and every concept's link selection
    /// reproducible; `None` draws from system entropy.
    pub fn new(
        config: BagConfig,
        concept_config: ConceptConfig,
        policy: Arc<dyn BudgetPolicy>,
        seed: Option<u64>,
    ) -> Self {
        let mut seeder = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let concepts = Bag::with_seed(config, Arc::clone(&policy), seeder.next_u64());
        Self {
            concepts,
            concept_config,
            policy,
            seeder,
            initial_budget: Budget::default(),
            forgotten: Vec::new(),
        }
    }

    /// Budget given to concepts created by [`get_or_create`](Self::get_or_create).
    pub fn with_initial_budget(mut self, budget: Budget) -> Self {
        self.initial_budget = budget;
        self
    }

    // -------------------------------------------------------------------------
    // Creation and lookup
    // -------------------------------------------------------------------------

    /// Return the concept for `term`, creating an empty one if needed.
    ///
    /// Creation at capacity evicts the weakest resident concept.
    pub fn get_or_create(&mut self, term: &Term, now: u64) -> &mut Concept {
        let budget = self.initial_budget.at(now);
        self.get_or_create_with(term, budget)
    }

    /// As [`get_or_create`](Self::get_or_create), with an explicit budget for
    /// a newly created concept.  An existing concept keeps its budget.
    pub fn get_or_create_with(&mut self, term: &Term, budget: Budget) -> &mut Concept {
        if !self.concepts.contains(term) {
            let concept = Concept::new(
                term.clone(),
                budget,
                &self.concept_config,
                Arc::clone(&self.policy),
                self.seeder.next_u64(),
            );
            debug!(term = %term, "concept created");
            if let Some(evicted) = self.concepts.put_in(concept) {
                self.record_forgotten(evicted);
            }
        }
        match self.concepts.get_mut(term) {
            Some(concept) => concept,
            None => unreachable!("concept {term} missing right after insertion"),
        }
    }

    /// Raise the concept's budget toward `budget` by merging, refiling it at
    /// its new level.  Returns `false` if the concept is not resident.
    pub fn activate(&mut self, term: &Term, budget: Budget) -> bool {
        let Some(mut concept) = self.concepts.pick_out(term) else {
            return false;
        };
        let merged = self.policy.merge(concept.budget(), &budget);
        *concept.budget_mut() = merged;
        if let Some(evicted) = self.concepts.put_in(concept) {
            self.record_forgotten(evicted);
        }
        true
    }

    /// Take the concept for `term` out of the store, creating it if needed,
    /// and merge `budget` into it.  While held the concept cannot be
    /// forgotten; hand it back with [`put_in`](Self::put_in).
    pub fn take_activated(&mut self, term: &Term, budget: Budget, now: u64) -> Concept {
        let mut concept = match self.concepts.pick_out(term) {
            Some(concept) => concept,
            None => {
                debug!(term = %term, "concept created");
                Concept::new(
                    term.clone(),
                    self.initial_budget.at(now),
                    &self.concept_config,
                    Arc::clone(&self.policy),
                    self.seeder.next_u64(),
                )
            }
        };
        let merged = self.policy.merge(concept.budget(), &budget);
        *concept.budget_mut() = merged;
        concept
    }

    /// File a held concept at its current budget without decay.  At capacity
    /// the weakest resident is forgotten to make room.
    pub fn put_in(&mut self, concept: Concept) {
        if let Some(evicted) = self.concepts.put_in(concept) {
            self.record_forgotten(evicted);
        }
    }

    pub fn get(&self, term: &Term) -> Option<&Concept> {
        self.concepts.get(term)
    }

    /// Mutable access for link and table updates.  Do not change the
    /// concept's budget through it; use [`activate`](Self::activate).
    pub fn get_mut(&mut self, term: &Term) -> Option<&mut Concept> {
        self.concepts.get_mut(term)
    }

    pub fn contains(&self, term: &Term) -> bool {
        self.concepts.contains(term)
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Take out a concept by priority-biased draw.  The caller owns it until
    /// [`return_one`](Self::return_one).
    pub fn select_one(&mut self) -> Option<Concept> {
        self.concepts.take_out()
    }

    /// Decay `concept` as of `now` and put it back.
    pub fn return_one(&mut self, concept: Concept, now: u64) {
        if let Some(evicted) = self.concepts.put_back(concept, now) {
            self.record_forgotten(evicted);
        }
    }

    // -------------------------------------------------------------------------
    // Reporting
    // -------------------------------------------------------------------------

    /// Terms forgotten since the last call, oldest first.
    pub fn take_forgotten(&mut self) -> Vec<Term> {
        std::mem::take(&mut self.forgotten)
    }

    /// Concepts from the highest level down.
    pub fn iter(&self) -> impl Iterator<Item = &Concept> + '_ {
        self.concepts.iter()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.concepts.capacity()
    }

    pub fn mass(&self) -> f64 {
        self.concepts.mass()
    }

    pub fn stats(&self) -> BagStats {
        self.concepts.stats()
    }

    /// Verify the underlying bag's invariants.  See [`Bag::assert_consistent`].
    pub fn assert_consistent(&self) {
        self.concepts.assert_consistent();
    }

    fn record_forgotten(&mut self, concept: Concept) {
        debug!(
            term = %concept.term(),
            task_links = concept.task_links().len(),
            term_links = concept.term_links().len(),
            "concept forgotten"
        );
        self.forgotten.push(concept.term().clone());
    }
}

impl std::fmt::Debug for ConceptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConceptStore")
            .field("concepts", &self.concepts)
            .field("forgotten", &self.forgotten.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::StandardBudget;
    use crate::link::LinkRole;

    fn store(capacity: usize) -> ConceptStore {
        ConceptStore::new(
            BagConfig::new(capacity, 100, 10.0),
            ConceptConfig::default(),
            Arc::new(StandardBudget::default()),
            Some(5),
        )
    }

    /// Asking twice for a term yields one concept.
    #[test]
    fn get_or_create_is_idempotent() {
        let mut s = store(4);
        let x = Term::atom("x");
        s.get_or_create(&x, 0);
        s.get_or_create(&x, 1);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&x).unwrap().term(), &x);
    }

    /// A new concept in a full store forgets the weakest.
    #[test]
    fn third_concept_evicts_the_weaker_of_the_first_two() {
        let mut s = store(2);
        let (a, b, c) = (Term::atom("A"), Term::atom("B"), Term::atom("C"));
        s.get_or_create(&a, 0);
        s.get_or_create(&b, 0);
        // A gets attention, so B is now the weakest.
        assert!(s.activate(&a, Budget::new(0.95, 0.8, 0.5)));

        s.get_or_create(&c, 0);

        assert_eq!(s.len(), 2);
        assert!(s.contains(&a));
        assert!(!s.contains(&b));
        assert!(s.contains(&c));
        assert_eq!(s.take_forgotten(), vec![b]);
        assert!(s.take_forgotten().is_empty());
    }

    /// Explicit budgets decide which concept is forgotten.
    #[test]
    fn explicit_budgets_decide_eviction() {
        let mut s = store(2);
        let (a, b, c) = (Term::atom("A"), Term::atom("B"), Term::atom("C"));
        s.get_or_create_with(&a, Budget::new(0.2, 0.5, 0.5));
        s.get_or_create_with(&b, Budget::new(0.6, 0.5, 0.5));
        s.get_or_create_with(&c, Budget::new(0.4, 0.5, 0.5));
        assert!(!s.contains(&a));
        assert!(s.contains(&b));
        assert!(s.contains(&c));
    }

    /// A forgotten concept loses its links.
    #[test]
    fn eviction_discards_the_concept_links() {
        let mut s = store(1);
        let a = Term::atom("A");
        s.get_or_create(&a, 0)
            .link_term(Term::atom("z"), LinkRole::Compound(0), Budget::default());
        s.get_or_create(&Term::atom("B"), 0);
        assert!(!s.contains(&a));
        // A fresh concept for A starts empty.
        assert!(s.get_or_create(&a, 1).term_links().is_empty());
    }

    /// A selected concept comes back decayed.
    #[test]
    fn select_and_return_round_trip() {
        let mut s = store(4);
        let x = Term::atom("x");
        s.get_or_create(&x, 0);
        let concept = s.select_one().unwrap();
        assert!(!s.contains(&x));
        s.return_one(concept, 10);
        assert!(s.contains(&x));
        // Returned concept has decayed.
        assert!(s.get(&x).unwrap().priority() < Budget::default().priority);
    }

    /// Selecting from an empty store yields nothing.
    #[test]
    fn select_on_empty_store_is_none() {
        let mut s = store(4);
        assert!(s.select_one().is_none());
    }

    /// A concept held outside the store survives a full store.
    #[test]
    fn held_concept_cannot_be_forgotten() {
        let mut s = store(2);
        let (ab, a, b) = (Term::atom("AB"), Term::atom("A"), Term::atom("B"));
        let mut held = s.take_activated(&ab, Budget::new(0.9, 0.8, 0.5), 0);
        s.get_or_create(&a, 0);
        s.get_or_create(&b, 0);
        assert!(!s.contains(&ab));

        held.link_term(a.clone(), LinkRole::Component(0), Budget::default());
        s.put_in(held);

        assert_eq!(s.len(), 2);
        assert_eq!(s.get(&ab).unwrap().term_links().len(), 1);
        assert_eq!(s.take_forgotten(), vec![a]);
    }

    /// Taking an existing concept raises its budget.
    #[test]
    fn take_activated_merges_into_an_existing_concept() {
        let mut s = store(4);
        let x = Term::atom("x");
        s.get_or_create_with(&x, Budget::new(0.3, 0.5, 0.5));
        let held = s.take_activated(&x, Budget::new(0.9, 0.5, 0.5), 2);
        assert!(s.is_empty());
        assert!(held.priority() > 0.3);
        s.put_in(held);
        assert_eq!(s.len(), 1);
    }

    /// The initial budget only applies to new concepts.
    #[test]
    fn initial_budget_applies_to_new_concepts_only() {
        let mut s = store(4).with_initial_budget(Budget::new(0.2, 0.5, 0.5));
        let x = Term::atom("x");
        assert!((s.get_or_create(&x, 0).priority() - 0.2).abs() < 1e-6);

        let y = Term::atom("y");
        s.get_or_create_with(&y, Budget::new(0.6, 0.5, 0.5));
        assert!((s.get_or_create(&y, 1).priority() - 0.6).abs() < 1e-6);
    }

    /// Activating an unknown term creates nothing.
    #[test]
    fn activate_unknown_term_is_false() {
        let mut s = store(4);
        assert!(!s.activate(&Term::atom("ghost"), Budget::default()));
        assert!(s.is_empty());
    }

    /// Activation never lowers priority.
    #[test]
    fn activate_never_lowers_priority() {
        let mut s = store(4);
        let x = Term::atom("x");
        s.get_or_create_with(&x, Budget::new(0.7, 0.5, 0.5));
        s.activate(&x, Budget::new(0.1, 0.1, 0.1));
        assert!(s.get(&x).unwrap().priority() >= 0.7 - 1e-6);
    }
}
