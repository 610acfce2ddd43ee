//! [`ReasonerConfig`] – every tunable constant of the memory and scheduler.
//!
//! None of the defaults are load-bearing for correctness; they only shape
//! how attention is spread.  All fields fall back to their default when
//! absent from a serialised config.

use nars_memory::{BagConfig, ConceptConfig};
use nars_types::NarsError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Maximum number of concepts held in memory.
    pub concept_capacity: usize,
    /// Task links per concept.
    pub task_link_capacity: usize,
    /// Term links per concept.
    pub term_link_capacity: usize,
    /// Pending tasks awaiting attachment to a concept.
    pub novel_task_capacity: usize,
    /// Priority buckets per bag.
    pub levels: usize,
    /// Draw budget for one novelty-constrained term-link selection.
    pub max_matched_term_links: usize,
    /// Length of each task link's recent-pairing window.
    pub novelty_record_length: usize,
    pub concept_forget_cycles: f32,
    pub task_link_forget_cycles: f32,
    pub term_link_forget_cycles: f32,
    pub novel_task_forget_cycles: f32,
    pub belief_capacity: usize,
    pub question_capacity: usize,
    pub goal_capacity: usize,
    /// Fixes every random draw when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            concept_capacity: 1000,
            task_link_capacity: 20,
            term_link_capacity: 100,
            novel_task_capacity: 100,
            levels: 100,
            max_matched_term_links: 10,
            novelty_record_length: 10,
            concept_forget_cycles: 10.0,
            task_link_forget_cycles: 20.0,
            term_link_forget_cycles: 50.0,
            novel_task_forget_cycles: 5.0,
            belief_capacity: 7,
            question_capacity: 5,
            goal_capacity: 7,
            seed: None,
        }
    }
}

impl ReasonerConfig {
    /// Reject values the bags cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`NarsError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), NarsError> {
        let positive = [
            ("concept_capacity", self.concept_capacity),
            ("task_link_capacity", self.task_link_capacity),
            ("term_link_capacity", self.term_link_capacity),
            ("novel_task_capacity", self.novel_task_capacity),
            ("levels", self.levels),
            ("max_matched_term_links", self.max_matched_term_links),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(NarsError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        let cycles = [
            ("concept_forget_cycles", self.concept_forget_cycles),
            ("task_link_forget_cycles", self.task_link_forget_cycles),
            ("term_link_forget_cycles", self.term_link_forget_cycles),
            ("novel_task_forget_cycles", self.novel_task_forget_cycles),
        ];
        for (name, value) in cycles {
            if !(value.is_finite() && value > 0.0) {
                return Err(NarsError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn concept_bag(&self) -> BagConfig {
        BagConfig::new(self.concept_capacity, self.levels, self.concept_forget_cycles)
    }

    pub fn novel_task_bag(&self) -> BagConfig {
        BagConfig::new(
            self.novel_task_capacity,
            self.levels,
            self.novel_task_forget_cycles,
        )
    }

    pub fn concept(&self) -> ConceptConfig {
        ConceptConfig {
            task_links: BagConfig::new(
                self.task_link_capacity,
                self.levels,
                self.task_link_forget_cycles,
            ),
            term_links: BagConfig::new(
                self.term_link_capacity,
                self.levels,
                self.term_link_forget_cycles,
            ),
            novelty_record_length: self.novelty_record_length,
            belief_capacity: self.belief_capacity,
            question_capacity: self.question_capacity,
            goal_capacity: self.goal_capacity,
        }
    }
}
