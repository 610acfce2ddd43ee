//! [`InputHandle`] – the producer side of the novel-task bag.
//!
//! The novel-task bag is the only piece of reasoner state with two writers:
//! the scheduler draining it and whatever thread accepts external input.  It
//! sits behind one [`parking_lot::Mutex`] that is held for a single insert or
//! a single drain step, never across a whole cycle.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use nars_memory::{BagConfig, StandardBudget};
//! use nars_runtime::InputHandle;
//! use nars_types::{Budget, Sentence, Task, Term, Truth};
//!
//! let handle = InputHandle::new(BagConfig::new(8, 100, 5.0), Arc::new(StandardBudget::default()), Some(1));
//! let producer = handle.clone();
//! std::thread::spawn(move || {
//!     let task = Task::new(Sentence::judgment(Term::atom("sky"), Truth::default()), Budget::default());
//!     producer.input(task);
//! })
//! .join()
//! .unwrap();
//! assert_eq!(handle.pending(), 1);
//! ```

use std::sync::Arc;

use nars_memory::{BagConfig, BudgetPolicy, NovelTaskBag};
use nars_types::Task;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

/// Cloneable, thread-safe handle to the novel-task bag.
#[derive(Clone)]
pub struct InputHandle {
    novel: Arc<Mutex<NovelTaskBag>>,
}

impl InputHandle {
    pub fn new(config: BagConfig, policy: Arc<dyn BudgetPolicy>, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| StdRng::from_entropy().next_u64());
        Self {
            novel: Arc::new(Mutex::new(NovelTaskBag::with_seed(config, policy, seed))),
        }
    }

    /// Queue `task` for the scheduler.  Returns a task forgotten to make
    /// room, if the bag was full.
    pub fn input(&self, task: Task) -> Option<Task> {
        let evicted = self.novel.lock().put_in(task);
        if let Some(ref dropped) = evicted {
            debug!(task = %dropped, "novel task forgotten");
        }
        evicted
    }

    /// Take one task by priority-biased draw.
    pub(crate) fn take_one(&self) -> Option<Task> {
        self.novel.lock().take_out()
    }

    /// Number of tasks waiting.
    pub fn pending(&self) -> usize {
        self.novel.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.novel.lock().is_empty()
    }

    /// Run `f` with the bag locked.  For diagnostics.
    pub fn with_bag<R>(&self, f: impl FnOnce(&NovelTaskBag) -> R) -> R {
        f(&self.novel.lock())
    }
}

impl std::fmt::Debug for InputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use nars_memory::StandardBudget;
    use nars_types::{Budget, Sentence, Term, Truth};

    use super::*;

    fn handle(capacity: usize) -> InputHandle {
        InputHandle::new(
            BagConfig::new(capacity, 100, 5.0),
            Arc::new(StandardBudget::default()),
            Some(9),
        )
    }

    fn task(name: &str, priority: f32) -> Task {
        Task::new(
            Sentence::judgment(Term::atom(name), Truth::default()),
            Budget::new(priority, 0.5, 0.5),
        )
    }

    /// Every clone of a handle feeds the same bag.
    #[test]
    fn clones_share_one_bag() {
        let a = handle(4);
        let b = a.clone();
        a.input(task("x", 0.5));
        assert_eq!(b.pending(), 1);
        assert!(b.take_one().is_some());
        assert!(a.is_empty());
    }

    /// A full bag forgets its weakest task.
    #[test]
    fn overflow_forgets_the_weakest() {
        let h = handle(1);
        h.input(task("weak", 0.1));
        let dropped = h.input(task("strong", 0.9)).unwrap();
        assert_eq!(dropped.term(), &Term::atom("weak"));
        assert_eq!(h.pending(), 1);
    }

    /// Parallel producers never push the bag past capacity.
    #[test]
    fn concurrent_producers_never_overfill() {
        let h = handle(16);
        let threads: Vec<_> = (0..4)
            .map(|t| {
                let h = h.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        h.input(task(&format!("t{t}-{i}"), 0.5));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(h.pending(), 16);
        h.with_bag(|bag| bag.assert_consistent());
    }
}
