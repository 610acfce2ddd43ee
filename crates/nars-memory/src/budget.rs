//! Budget merge and decay policies.
//!
//! The bags never do budget arithmetic themselves.  They call a
//! [`BudgetPolicy`] for the two numeric operations they need:
//!
//! * **merge** – combine the budget of an item already in a bag with the
//!   budget of a duplicate being inserted.  Must be monotonic: the merged
//!   priority is never lower than either input.
//! * **decay** – move a priority toward its floor after the item has been
//!   used.  Must be contractive: never below the floor, never upward.
//!
//! [`StandardBudget`] is the default policy:
//!
//! ```text
//! merge:  component-wise max
//! floor:  quality × relative_threshold
//! decay:  floor + (priority − floor) × durability^elapsed
//! ```
//!
//! where `elapsed` is measured in forgetting periods (logical cycles since the
//! last decay divided by the owning bag's `forget_cycles`).

use std::fmt;

use nars_types::Budget;

/// Fraction of an item's quality that its priority may never decay below.
pub const DEFAULT_RELATIVE_THRESHOLD: f32 = 0.1;

/// Numeric policy used by every [`Bag`](crate::bag::Bag).
pub trait BudgetPolicy: Send + Sync + fmt::Debug {
    /// Combine `existing` with a duplicate's `incoming` budget.
    fn merge(&self, existing: &Budget, incoming: &Budget) -> Budget;

    /// Decay `priority` toward `floor` over `elapsed` forgetting periods.
    fn decay(&self, priority: f32, durability: f32, floor: f32, elapsed: f32) -> f32;

    /// The lowest priority decay may reach for `budget`.
    fn floor(&self, budget: &Budget) -> f32 {
        budget.quality * DEFAULT_RELATIVE_THRESHOLD
    }

    /// Apply forgetting to `budget` at logical time `now`.
    ///
    /// The elapsed time is taken from `budget.last_forgotten`, which is then
    /// stamped with `now`.
    fn forget(&self, budget: &mut Budget, forget_cycles: f32, now: u64) {
        let cycles = now.saturating_sub(budget.last_forgotten) as f32;
        let elapsed = cycles / forget_cycles.max(f32::MIN_POSITIVE);
        let floor = self.floor(budget);
        let decayed = self.decay(budget.priority, budget.durability, floor, elapsed);
        budget.set_priority(decayed);
        budget.last_forgotten = now;
    }
}

/// Default merge/decay policy.
#[derive(Debug, Clone, Copy)]
pub struct StandardBudget {
    /// Fraction of quality that forms the decay floor.
    pub relative_threshold: f32,
}

impl Default for StandardBudget {
    fn default() -> Self {
        Self {
            relative_threshold: DEFAULT_RELATIVE_THRESHOLD,
        }
    }
}

impl BudgetPolicy for StandardBudget {
    fn merge(&self, existing: &Budget, incoming: &Budget) -> Budget {
        Budget {
            priority: existing.priority.max(incoming.priority),
            durability: existing.durability.max(incoming.durability),
            quality: existing.quality.max(incoming.quality),
            last_forgotten: existing.last_forgotten.max(incoming.last_forgotten),
        }
    }

    fn decay(&self, priority: f32, durability: f32, floor: f32, elapsed: f32) -> f32 {
        if elapsed <= 0.0 || elapsed.is_nan() || priority <= floor {
            return priority;
        }
        let factor = durability.clamp(0.0, 1.0).powf(elapsed);
        let decayed = floor + (priority - floor) * factor;
        if decayed.is_finite() {
            decayed.clamp(floor, priority)
        } else {
            floor
        }
    }

    fn floor(&self, budget: &Budget) -> f32 {
        budget.quality * self.relative_threshold
    }
}
