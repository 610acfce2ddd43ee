//! `nars-runtime` – the reasoner's working cycle.
//!
//! Owns the memory built in `nars-memory` and drives it one bounded step at
//! a time.
//!
//! # Modules
//!
//! - [`scheduler`] – [`Scheduler`][scheduler::Scheduler]: the
//!   drain → select → link → infer → return cycle and its
//!   Idle/Draining/Cycling/Stopped state machine.  Exposes `tick`, `input`,
//!   `is_finished` and `snapshot` to front-ends and publishes accepted
//!   inputs, derivations and forgotten concepts on the
//!   [`EventBus`][nars_middleware::EventBus].
//! - [`input`] – [`InputHandle`][input::InputHandle]: thread-safe producer
//!   handle onto the novel-task bag.
//! - [`rules`] – [`RuleEngine`][rules::RuleEngine]: the inference
//!   collaborator.  Only [`NoRules`][rules::NoRules] ships here.
//! - [`driver`] – [`Driver`][driver::Driver]: runs ticks on a dedicated
//!   thread under a step bound, idle or stop-request policy.
//! - [`config`] – [`ReasonerConfig`][config::ReasonerConfig]: capacities,
//!   level count, forgetting rates, novelty window and seed.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export
//!   to Jaeger, Grafana Tempo, or any OTLP-compatible collector.

pub mod config;
pub mod driver;
pub mod input;
pub mod rules;
pub mod scheduler;
pub mod telemetry;

pub use config::ReasonerConfig;
pub use driver::{Driver, DriverConfig, DriverReport, FinishReason};
pub use input::InputHandle;
pub use rules::{NoRules, RuleEngine};
pub use scheduler::{ConceptSummary, MemorySnapshot, Scheduler, SchedulerState, StopHandle};
pub use telemetry::{TracerProviderGuard, init_tracing};
