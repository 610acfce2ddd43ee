//! [`RuleEngine`] – the inference collaborator the scheduler calls once per
//! cycle.
//!
//! The scheduler only routes what the engine returns; it never inspects how
//! a derivation was made.  Implementations must be pure: the same inputs
//! yield the same outputs and nothing outside the return value changes.

use nars_types::Task;

pub trait RuleEngine: Send {
    /// Derive new tasks from `task` and, when one was found, a belief held
    /// by a structurally related concept.  An empty result is normal.
    fn apply_rules(&self, task: &Task, belief: Option<&Task>) -> Vec<Task>;
}

/// Engine that never derives anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRules;

impl RuleEngine for NoRules {
    fn apply_rules(&self, _task: &Task, _belief: Option<&Task>) -> Vec<Task> {
        Vec::new()
    }
}

impl<F> RuleEngine for F
where
    F: Fn(&Task, Option<&Task>) -> Vec<Task> + Send,
{
    fn apply_rules(&self, task: &Task, belief: Option<&Task>) -> Vec<Task> {
        self(task, belief)
    }
}

#[cfg(test)]
mod tests {
    use nars_types::{Budget, Sentence, Term, Truth};

    use super::*;

    fn task() -> Task {
        Task::new(
            Sentence::judgment(
                Term::statement(Term::atom("a"), "-->", Term::atom("b")),
                Truth::default(),
            ),
            Budget::default(),
        )
    }

    /// The empty rule set derives nothing.
    #[test]
    fn no_rules_derives_nothing() {
        assert!(NoRules.apply_rules(&task(), None).is_empty());
    }

    /// A closure can serve as the rule engine.
    #[test]
    fn closures_are_engines() {
        let echo = |t: &Task, _b: Option<&Task>| vec![t.clone()];
        let out = echo.apply_rules(&task(), None);
        assert_eq!(out, vec![task()]);
    }
}
