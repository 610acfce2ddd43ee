//! [`Scheduler`] – the working cycle.
//!
//! One call to [`Scheduler::tick`] runs one bounded step of the reasoner:
//!
//! 1. **Drain** – take at most one task from the novel-task bag, create its
//!    concept if needed, activate the concept, build the task's structural
//!    links and file the task into the concept's sentence tables.
//! 2. **Cycle** – select a concept, one of its task links and a term link
//!    the task link has not been paired with recently; hand the task and the
//!    target concept's best belief to the [`RuleEngine`] and queue whatever it
//!    derives as novel tasks.  Everything taken out is put back with decay.
//! 3. **Advance** the logical clock by one.
//!
//! # States
//!
//! ```text
//!            tick, input pending            tick, nothing pending
//!  Draining ────────────────────▶ Draining ───────────────────────▶ Idle
//!     ▲                                                              │
//!     └────────────── input arrives, next tick ◀────────────────────┘
//!
//!  any state ── stop() or StopHandle::request_stop() ──▶ Stopped (terminal)
//! ```
//!
//! `Cycling` is the state while the inference half of a tick runs.  A stop
//! requested through a [`StopHandle`] while a tick is in flight takes effect
//! at the start of the next tick; a tick is never abandoned half way.
//!
//! # Example
//!
//! ```rust
//! use nars_runtime::{ReasonerConfig, Scheduler, SchedulerState};
//! use nars_types::{Budget, Sentence, Task, Term, Truth};
//!
//! let mut scheduler = Scheduler::new(ReasonerConfig { seed: Some(1), ..Default::default() }).unwrap();
//! let bird = Term::statement(Term::atom("bird"), "-->", Term::atom("animal"));
//! scheduler.input(Task::new(Sentence::judgment(bird.clone(), Truth::default()), Budget::default()));
//!
//! scheduler.tick();
//! assert!(scheduler.memory().contains(&bird));
//! assert_eq!(scheduler.state(), SchedulerState::Idle);
//!
//! scheduler.stop();
//! assert!(scheduler.is_finished());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nars_memory::{BudgetPolicy, Concept, ConceptStore, Item, LinkRole, StandardBudget};
use nars_middleware::{EventBus, Topic};
use nars_types::{Budget, Event, EventPayload, NarsError, Task};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, trace_span, warn};

use crate::config::ReasonerConfig;
use crate::input::InputHandle;
use crate::rules::{NoRules, RuleEngine};

/// `source` field of every event the scheduler publishes.
const EVENT_SOURCE: &str = "nars-runtime::scheduler";

/// Mixed into the configured seed so the novel-task bag and the concept
/// store draw from different streams.
const NOVEL_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

// ─────────────────────────────────────────────────────────────────────────────
// State and stop handle
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    /// No pending input; ticks still run inference over memory.
    Idle,
    /// Novel tasks are waiting to be attached to concepts.
    Draining,
    /// The inference half of a tick is running.
    Cycling,
    /// Terminal.  Ticks are no-ops.
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Draining => "draining",
            SchedulerState::Cycling => "cycling",
            SchedulerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Cross-thread stop request, honoured at the next tick boundary.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// One concept as seen by [`Scheduler::snapshot_report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptSummary {
    pub term: String,
    pub budget: Budget,
    pub task_links: usize,
    pub term_links: usize,
    pub beliefs: usize,
    pub questions: usize,
    pub goals: usize,
}

/// Diagnostic view of the whole reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub clock: u64,
    pub state: SchedulerState,
    pub novel_tasks: usize,
    pub concept_capacity: usize,
    pub concept_mass: f64,
    /// Highest priority first.
    pub concepts: Vec<ConceptSummary>,
}

impl fmt::Display for MemorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "clock={} state={} novel={} concepts={}/{} mass={:.2}",
            self.clock,
            self.state,
            self.novel_tasks,
            self.concepts.len(),
            self.concept_capacity,
            self.concept_mass
        )?;
        for c in &self.concepts {
            writeln!(
                f,
                "  {} {}  task_links={} term_links={} beliefs={} questions={} goals={}",
                c.budget, c.term, c.task_links, c.term_links, c.beliefs, c.questions, c.goals
            )?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

/// The reasoner's control loop and the owner of all of its memory.
///
/// At most one `tick` runs at a time (it takes `&mut self`).  Input may
/// arrive concurrently through an [`InputHandle`].
pub struct Scheduler {
    config: ReasonerConfig,
    state: SchedulerState,
    clock: u64,
    memory: ConceptStore,
    input: InputHandle,
    rules: Box<dyn RuleEngine>,
    bus: EventBus,
    stop: StopHandle,
}

impl Scheduler {
    /// Build a scheduler with the default budget policy and no rules.
    ///
    /// # Errors
    ///
    /// Returns [`NarsError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: ReasonerConfig) -> Result<Self, NarsError> {
        Self::with_policy(config, Arc::new(StandardBudget::default()))
    }

    /// As [`new`](Self::new), with a caller-supplied merge/decay policy.
    pub fn with_policy(
        config: ReasonerConfig,
        policy: Arc<dyn BudgetPolicy>,
    ) -> Result<Self, NarsError> {
        config.validate()?;
        let memory = ConceptStore::new(
            config.concept_bag(),
            config.concept(),
            Arc::clone(&policy),
            config.seed,
        );
        let input = InputHandle::new(
            config.novel_task_bag(),
            policy,
            config.seed.map(|s| s ^ NOVEL_SEED_SALT),
        );
        info!(
            concepts = config.concept_capacity,
            levels = config.levels,
            seeded = config.seed.is_some(),
            "scheduler initialised"
        );
        Ok(Self {
            config,
            state: SchedulerState::Draining,
            clock: 0,
            memory,
            input,
            rules: Box::new(NoRules),
            bus: EventBus::default(),
            stop: StopHandle::default(),
        })
    }

    /// Replace the rule engine.
    pub fn with_rules(mut self, rules: impl RuleEngine + 'static) -> Self {
        self.rules = Box::new(rules);
        self
    }

    /// Publish on `bus` instead of a private one.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    // -------------------------------------------------------------------------
    // Front-end API
    // -------------------------------------------------------------------------

    /// Queue a task.  Returns a task forgotten to make room, if any.
    pub fn input(&self, task: Task) -> Option<Task> {
        self.input.input(task)
    }

    /// Run one working cycle.
    pub fn tick(&mut self) {
        if self.state == SchedulerState::Stopped {
            return;
        }
        if self.stop.is_stop_requested() {
            self.stop();
            return;
        }

        let span = trace_span!("tick", clock = self.clock);
        let _entered = span.enter();

        self.state = SchedulerState::Draining;
        self.drain_one();

        self.state = SchedulerState::Cycling;
        self.cycle();

        self.report_forgotten();
        self.clock += 1;
        self.state = if self.input.is_empty() {
            SchedulerState::Idle
        } else {
            SchedulerState::Draining
        };
    }

    /// `true` once the scheduler has stopped.
    pub fn is_finished(&self) -> bool {
        self.state == SchedulerState::Stopped
    }

    /// Stop immediately.  Idempotent.
    ///
    /// The [`StopHandle`] reports a stop request from here on, so holders of
    /// the handle can tell a stopped scheduler apart without locking it.
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Stopped {
            return;
        }
        self.stop.request_stop();
        self.state = SchedulerState::Stopped;
        info!(clock = self.clock, "scheduler stopped");
        let notice = format!("stopped at cycle {}", self.clock);
        self.publish(Topic::Status, EventPayload::Status(notice));
    }

    /// Human-readable dump of memory.
    pub fn snapshot(&self) -> String {
        self.snapshot_report().to_string()
    }

    pub fn snapshot_report(&self) -> MemorySnapshot {
        let concepts = self
            .memory
            .iter()
            .map(|c| ConceptSummary {
                term: c.term().to_string(),
                budget: *c.budget(),
                task_links: c.task_links().len(),
                term_links: c.term_links().len(),
                beliefs: c.beliefs().len(),
                questions: c.questions().len(),
                goals: c.goals().len(),
            })
            .collect();
        MemorySnapshot {
            clock: self.clock,
            state: self.state,
            novel_tasks: self.input.pending(),
            concept_capacity: self.memory.capacity(),
            concept_mass: self.memory.mass(),
            concepts,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Logical time: the number of completed ticks.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn memory(&self) -> &ConceptStore {
        &self.memory
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    pub fn input_handle(&self) -> InputHandle {
        self.input.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    // -------------------------------------------------------------------------
    // Working cycle
    // -------------------------------------------------------------------------

    fn drain_one(&mut self) {
        // Lock is held only inside take_one.
        let Some(task) = self.input.take_one() else {
            return;
        };
        let now = self.clock;
        let budget = task.budget.at(now);

        // Held outside the store until filed, so creating the component
        // concepts can only forget other concepts.
        let mut concept = self.memory.take_activated(task.term(), budget, now);
        self.link_structure(&mut concept, &task, budget, now);
        concept.process(&task);
        self.memory.put_in(concept);

        debug!(task = %task, "task accepted");
        if task.is_input() {
            self.publish(Topic::Input, EventPayload::InputAccepted(task.to_string()));
        }
    }

    /// Link a compound task's concept with its components, both ways, and
    /// give every one of those concepts a task link to the task.  Atoms have
    /// no structure and get no links.
    fn link_structure(&mut self, concept: &mut Concept, task: &Task, budget: Budget, now: u64) {
        let term = task.term();
        if !term.is_compound() {
            return;
        }
        concept.link_task(task, budget);
        for (index, component) in term.components().iter().enumerate() {
            let component_concept = self.memory.get_or_create(component, now);
            component_concept.link_term(term.clone(), LinkRole::Compound(index), budget);
            component_concept.link_task(task, budget);
            concept.link_term(component.clone(), LinkRole::Component(index), budget);
        }
    }

    fn cycle(&mut self) {
        let now = self.clock;
        let Some(mut concept) = self.memory.select_one() else {
            return;
        };
        let Some(mut task_link) = concept.task_links_mut().take_out() else {
            self.memory.return_one(concept, now);
            return;
        };

        let term_link = concept.term_links_mut().take_out_matching(
            &mut task_link,
            self.config.max_matched_term_links,
            now,
        );

        if let Some(term_link) = term_link {
            let derived = {
                let belief = if &term_link.target == concept.term() {
                    concept.select_belief()
                } else {
                    self.memory
                        .get(&term_link.target)
                        .and_then(Concept::select_belief)
                };
                trace!(
                    concept = %concept.term(),
                    task = %task_link.task.sentence,
                    target = %term_link.target,
                    has_belief = belief.is_some(),
                    "applying rules"
                );
                self.rules.apply_rules(&task_link.task, belief)
            };
            for task in derived {
                self.route_derived(task);
            }
            concept.term_links_mut().put_back(term_link, now);
        }

        concept.task_links_mut().put_back(task_link, now);
        self.memory.return_one(concept, now);
    }

    fn route_derived(&mut self, task: Task) {
        debug!(task = %task, "derived");
        self.publish(Topic::Derivations, EventPayload::Derived(task.to_string()));
        if let Some(dropped) = self.input.input(task) {
            trace!(task = %dropped, "derived task displaced from novel bag");
        }
    }

    fn report_forgotten(&mut self) {
        for term in self.memory.take_forgotten() {
            self.publish(Topic::Memory, EventPayload::ConceptForgotten(term.to_string()));
        }
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        let event = Event::new(EVENT_SOURCE, self.clock, payload);
        if let Err(e) = self.bus.publish_to(topic, event) {
            warn!(error = %e, ?topic, "failed to publish scheduler event");
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("memory", &self.memory)
            .field("input", &self.input)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
