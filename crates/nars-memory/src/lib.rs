//! `nars-memory` – bounded, priority-driven memory.
//!
//! Everything the reasoner remembers lives in a [`Bag`]: a fixed-capacity
//! store that hands out items with a probability biased toward (but never
//! monopolised by) high priority, decays items as they are used, and forgets
//! the weakest item when it overflows.
//!
//! # Modules
//!
//! - [`budget`] – [`BudgetPolicy`]: the merge and decay arithmetic bags
//!   delegate to, and its default [`StandardBudget`].
//! - [`bag`] – the generic [`Bag`] and the [`Item`] capability it stores.
//! - [`link`] – [`TermLink`], [`TaskLink`] and novelty-constrained retrieval
//!   ([`Bag::take_out_matching`]).
//! - [`concept`] – [`Concept`]: one term's link bags and sentence tables.
//! - [`store`] – [`ConceptStore`]: the bounded bag of all concepts.
//!
//! Tasks waiting to be attached to a concept are held in a [`NovelTaskBag`].

pub mod bag;
pub mod budget;
pub mod concept;
pub mod link;
pub mod store;

pub use bag::{Bag, BagConfig, BagStats, Item};
pub use budget::{BudgetPolicy, DEFAULT_RELATIVE_THRESHOLD, StandardBudget};
pub use concept::{Concept, ConceptConfig, SentenceTable, TableOrder};
pub use link::{LinkRole, NoveltyRecord, TaskLink, TaskLinkBag, TermLink, TermLinkBag};
pub use store::ConceptStore;

/// Bag of freshly created tasks not yet attached to a concept.
pub type NovelTaskBag = Bag<nars_types::Task>;
