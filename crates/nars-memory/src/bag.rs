//! [`Bag`] – bounded, priority-leveled store with probabilistic take-out.
//!
//! # Layout
//!
//! ```text
//! level 99 │ k7 → k2 → k9        (FIFO per level)
//! level 98 │
//!   ...    │
//! level  0 │ k4
//!
//! index: key → (level, item)
//! ```
//!
//! An item with priority `p` always sits in level `floor(p × levels)`
//! (clamped to `levels − 1`).  Within a level the queue is FIFO, so the
//! oldest item of the lowest non-empty level is the one forgotten when the
//! bag overflows.
//!
//! # Selection
//!
//! [`Bag::take_out`] draws a level with probability proportional to
//! `level + 1` among the non-empty levels and pops the front of that queue.
//! This is the closed form of "sample a level with an increasing bias until a
//! non-empty one is hit": every non-empty level keeps a nonzero chance on
//! every call, and higher levels win more often without ever winning always.
//!
//! # Forgetting
//!
//! [`Bag::put_back`] decays the item's priority through the bag's
//! [`BudgetPolicy`] before re-inserting it, so items that were just used lose
//! some of their claim on attention.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use nars_types::{Budget, Task};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::budget::BudgetPolicy;

// ─────────────────────────────────────────────────────────────────────────────
// Item capability
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can be stored in a [`Bag`].
pub trait Item {
    /// Stable identity.  Two items with equal keys are never both in a bag.
    type Key: Clone + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;

    fn budget(&self) -> &Budget;

    fn budget_mut(&mut self) -> &mut Budget;

    fn priority(&self) -> f32 {
        self.budget().priority
    }
}

impl Item for Task {
    type Key = String;

    fn key(&self) -> String {
        Task::key(self)
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration and telemetry
// ─────────────────────────────────────────────────────────────────────────────

/// Sizing and forgetting-rate policy for one bag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BagConfig {
    /// Maximum number of items held at once.
    pub capacity: usize,
    /// Number of equal-width priority buckets partitioning `[0, 1)`.
    pub levels: usize,
    /// Logical cycles per forgetting period; larger means slower decay.
    pub forget_cycles: f32,
}

impl BagConfig {
    pub fn new(capacity: usize, levels: usize, forget_cycles: f32) -> Self {
        Self {
            capacity,
            levels,
            forget_cycles,
        }
    }
}

/// Running counters, for introspection only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagStats {
    pub put_ins: u64,
    pub merges: u64,
    pub take_outs: u64,
    pub evictions: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Bag
// ─────────────────────────────────────────────────────────────────────────────

struct Slot<T> {
    level: usize,
    item: T,
}

/// Generic bounded priority bag.  See the module docs for the algorithm.
pub struct Bag<T: Item> {
    capacity: usize,
    levels: usize,
    forget_cycles: f32,
    queues: Vec<VecDeque<T::Key>>,
    index: HashMap<T::Key, Slot<T>>,
    /// Sum of held priorities.  Telemetry only.
    mass: f64,
    stats: BagStats,
    policy: Arc<dyn BudgetPolicy>,
    rng: StdRng,
}

impl<T: Item> Bag<T> {
    /// Create an empty bag seeded from system entropy.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `levels` is zero.
    pub fn new(config: BagConfig, policy: Arc<dyn BudgetPolicy>) -> Self {
        Self::with_rng(config, policy, StdRng::from_entropy())
    }

    /// Create an empty bag whose selection sequence is reproducible.
    pub fn with_seed(config: BagConfig, policy: Arc<dyn BudgetPolicy>, seed: u64) -> Self {
        Self::with_rng(config, policy, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: BagConfig, policy: Arc<dyn BudgetPolicy>, rng: StdRng) -> Self {
        assert!(config.capacity > 0, "bag capacity must be positive");
        assert!(config.levels > 0, "bag must have at least one level");
        Self {
            capacity: config.capacity,
            levels: config.levels,
            forget_cycles: config.forget_cycles,
            queues: (0..config.levels).map(|_| VecDeque::new()).collect(),
            index: HashMap::with_capacity(config.capacity),
            mass: 0.0,
            stats: BagStats::default(),
            policy,
            rng,
        }
    }

    // -------------------------------------------------------------------------
    // Core contract
    // -------------------------------------------------------------------------

    /// Insert `item`.
    ///
    /// A duplicate key merges budgets into the resident item (the incoming
    /// item is dropped) and refiles it under the merged priority.  Otherwise,
    /// when the bag is full, the oldest item of the lowest non-empty level is
    /// evicted first and returned.
    pub fn put_in(&mut self, item: T) -> Option<T> {
        self.stats.put_ins += 1;
        let key = item.key();

        if let Entry::Occupied(mut entry) = self.index.entry(key.clone()) {
            let slot = entry.get_mut();
            let old_level = slot.level;
            let old_priority = slot.item.priority();
            let merged = self.policy.merge(slot.item.budget(), item.budget());
            *slot.item.budget_mut() = merged;
            let new_level = level_for(slot.item.priority(), self.levels);
            slot.level = new_level;
            self.mass += f64::from(slot.item.priority()) - f64::from(old_priority);
            self.stats.merges += 1;

            remove_key(&mut self.queues[old_level], &key);
            self.queues[new_level].push_back(key);
            self.debug_check();
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict_lowest()
        } else {
            None
        };

        let level = level_for(item.priority(), self.levels);
        self.mass += f64::from(item.priority());
        self.queues[level].push_back(key.clone());
        self.index.insert(key, Slot { level, item });

        assert!(
            self.index.len() <= self.capacity,
            "bag over capacity: {} > {}",
            self.index.len(),
            self.capacity
        );
        self.debug_check();
        evicted
    }

    /// Remove and return an item chosen by the priority-biased draw, or
    /// `None` when the bag is empty.
    pub fn take_out(&mut self) -> Option<T> {
        if self.index.is_empty() {
            return None;
        }
        let level = self.select_level();
        let key = self.queues[level]
            .pop_front()
            .unwrap_or_else(|| panic!("bag selected empty level {level}"));
        let item = self.detach(&key, level);
        self.stats.take_outs += 1;
        self.debug_check();
        Some(item)
    }

    /// Decay `item` as of logical time `now`, then [`put_in`](Self::put_in).
    pub fn put_back(&mut self, mut item: T, now: u64) -> Option<T> {
        self.policy
            .forget(item.budget_mut(), self.forget_cycles, now);
        self.put_in(item)
    }

    /// Remove the item with `key`, bypassing priority order.
    pub fn pick_out(&mut self, key: &T::Key) -> Option<T> {
        let level = self.index.get(key)?.level;
        if !remove_key(&mut self.queues[level], key) {
            panic!("bag index lists {key:?} at level {level} but the queue does not");
        }
        let item = self.detach(key, level);
        self.debug_check();
        Some(item)
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.index.get(key).map(|slot| &slot.item)
    }

    /// Mutable access to a resident item.
    ///
    /// The budget must not be changed through this reference; re-prioritise
    /// with [`pick_out`](Self::pick_out) followed by [`put_in`](Self::put_in).
    pub fn get_mut(&mut self, key: &T::Key) -> Option<&mut T> {
        self.index.get_mut(key).map(|slot| &mut slot.item)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.index.contains_key(key)
    }

    /// Items from the highest level down, FIFO order within a level.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.queues
            .iter()
            .rev()
            .flat_map(|queue| queue.iter())
            .filter_map(|key| self.index.get(key).map(|slot| &slot.item))
    }

    // -------------------------------------------------------------------------
    // Telemetry
    // -------------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn forget_cycles(&self) -> f32 {
        self.forget_cycles
    }

    /// Sum of the priorities currently held.
    pub fn mass(&self) -> f64 {
        self.mass.max(0.0)
    }

    pub fn stats(&self) -> BagStats {
        self.stats
    }

    /// Level an item of `priority` would be filed under.
    pub fn level_of(&self, priority: f32) -> usize {
        level_for(priority, self.levels)
    }

    /// Verify every structural invariant, panicking on the first violation.
    ///
    /// Runs automatically after each mutation in debug builds.
    pub fn assert_consistent(&self) {
        let queued: usize = self.queues.iter().map(VecDeque::len).sum();
        assert_eq!(
            queued,
            self.index.len(),
            "bag queues hold {queued} keys but the index holds {}",
            self.index.len()
        );
        assert!(self.index.len() <= self.capacity, "bag over capacity");
        for (level, queue) in self.queues.iter().enumerate() {
            for key in queue {
                let slot = self
                    .index
                    .get(key)
                    .unwrap_or_else(|| panic!("queued key {key:?} missing from index"));
                assert_eq!(slot.level, level, "key {key:?} filed under the wrong level");
                assert_eq!(
                    level_for(slot.item.priority(), self.levels),
                    level,
                    "key {key:?} priority does not match its level"
                );
            }
        }
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn select_level(&mut self) -> usize {
        let total: usize = self
            .queues
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.is_empty())
            .map(|(level, _)| level + 1)
            .sum();
        let mut draw = self.rng.gen_range(0..total);
        for (level, queue) in self.queues.iter().enumerate() {
            if queue.is_empty() {
                continue;
            }
            let weight = level + 1;
            if draw < weight {
                return level;
            }
            draw -= weight;
        }
        unreachable!("weighted level draw exceeded total weight {total}")
    }

    fn evict_lowest(&mut self) -> Option<T> {
        let level = self.queues.iter().position(|q| !q.is_empty())?;
        let key = self.queues[level].pop_front()?;
        let item = self.detach(&key, level);
        self.stats.evictions += 1;
        Some(item)
    }

    /// Drop `key` from the index once its queue entry is already gone.
    fn detach(&mut self, key: &T::Key, level: usize) -> T {
        let slot = self
            .index
            .remove(key)
            .unwrap_or_else(|| panic!("queued key {key:?} missing from bag index"));
        assert_eq!(slot.level, level, "key {key:?} filed under the wrong level");
        self.mass -= f64::from(slot.item.priority());
        slot.item
    }

    fn debug_check(&self) {
        #[cfg(debug_assertions)]
        self.assert_consistent();
    }
}

impl<T: Item> fmt::Debug for Bag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bag")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .field("levels", &self.levels)
            .field("mass", &self.mass())
            .finish()
    }
}

fn level_for(priority: f32, levels: usize) -> usize {
    // `as usize` saturates: NaN and negatives land in level 0.
    ((priority * levels as f32).floor() as usize).min(levels - 1)
}

fn remove_key<K: PartialEq>(queue: &mut VecDeque<K>, key: &K) -> bool {
    match queue.iter().position(|k| k == key) {
        Some(pos) => {
            queue.remove(pos);
            true
        }
        None => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
