//! [`Driver`] – runs scheduler ticks on a dedicated thread.
//!
//! The scheduler itself never decides when to stop.  The driver applies the
//! front-end's policy: a step bound, "stop once input is exhausted", or an
//! explicit stop request.  All three end the same way, with the scheduler in
//! its terminal state.
//!
//! The scheduler sits behind a [`parking_lot::Mutex`] so the front-end can
//! inspect it (snapshots, stats) between ticks; the lock is held for exactly
//! one tick at a time.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use nars_runtime::{Driver, DriverConfig, FinishReason, ReasonerConfig, Scheduler};
//!
//! let scheduler = Arc::new(Mutex::new(Scheduler::new(ReasonerConfig::default()).unwrap()));
//! let driver = Driver::spawn(Arc::clone(&scheduler), DriverConfig {
//!     max_steps: Some(10),
//!     ..Default::default()
//! });
//! let report = driver.join();
//! assert_eq!(report.steps, 10);
//! assert_eq!(report.reason, FinishReason::StepBound);
//! assert!(scheduler.lock().is_finished());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nars_middleware::Topic;
use nars_types::{Event, EventPayload};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::scheduler::{Scheduler, SchedulerState, StopHandle};

/// How long a paused driver sleeps between checks.
const PAUSE_POLL: Duration = Duration::from_millis(10);

// ─────────────────────────────────────────────────────────────────────────────
// Configuration and outcome
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Stop after this many ticks.
    pub max_steps: Option<u64>,
    /// Stop once the novel-task bag is empty after a tick.
    pub stop_when_idle: bool,
    /// Pause between ticks; zero only yields.
    pub tick_interval: Duration,
    /// Start in the paused state.
    pub start_paused: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            stop_when_idle: false,
            tick_interval: Duration::ZERO,
            start_paused: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Stop was requested, or the scheduler was already stopped.
    StopRequested,
    StepBound,
    InputExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverReport {
    /// Ticks run by this driver.
    pub steps: u64,
    pub reason: FinishReason,
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

pub struct Driver {
    handle: JoinHandle<DriverReport>,
    stop: StopHandle,
    paused: Arc<AtomicBool>,
}

impl Driver {
    /// Start ticking `scheduler` on a new thread.
    pub fn spawn(scheduler: Arc<Mutex<Scheduler>>, config: DriverConfig) -> Self {
        let stop = scheduler.lock().stop_handle();
        let paused = Arc::new(AtomicBool::new(config.start_paused));
        let thread_paused = Arc::clone(&paused);
        let handle = thread::spawn(move || run(&scheduler, config, &thread_paused));
        Self {
            handle,
            stop,
            paused,
        }
    }

    /// Ask the driver to stop before its next tick.
    pub fn stop(&self) {
        self.stop.request_stop();
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Wait for the driver thread to finish.
    ///
    /// A panic on the driver thread (an internal invariant violation) is
    /// re-raised here.
    pub fn join(self) -> DriverReport {
        match self.handle.join() {
            Ok(report) => report,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn run(scheduler: &Mutex<Scheduler>, config: DriverConfig, paused: &AtomicBool) -> DriverReport {
    let mut steps = 0u64;
    let reason = loop {
        if paused.load(Ordering::Acquire) {
            let stopping = {
                let s = scheduler.lock();
                s.is_finished() || s.stop_handle().is_stop_requested()
            };
            if !stopping {
                thread::sleep(PAUSE_POLL);
                continue;
            }
        }

        let mut s = scheduler.lock();
        if config.max_steps.is_some_and(|max| steps >= max) {
            s.stop();
            break FinishReason::StepBound;
        }
        s.tick();
        if s.is_finished() {
            break FinishReason::StopRequested;
        }
        steps += 1;
        if config.stop_when_idle && s.state() == SchedulerState::Idle {
            s.stop();
            break FinishReason::InputExhausted;
        }
        drop(s);

        if config.tick_interval.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(config.tick_interval);
        }
    };

    let s = scheduler.lock();
    info!(steps, ?reason, clock = s.clock(), "driver finished");
    let event = Event::new(
        "nars-runtime::driver",
        s.clock(),
        EventPayload::Status(format!("driver finished after {steps} steps ({reason:?})")),
    );
    if let Err(e) = s.bus().publish_to(Topic::Status, event) {
        warn!(error = %e, "failed to publish driver status");
    }
    DriverReport { steps, reason }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use nars_types::{Budget, Sentence, Task, Term, Truth};

    use super::*;
    use crate::config::ReasonerConfig;

    fn shared() -> Arc<Mutex<Scheduler>> {
        let config = ReasonerConfig {
            seed: Some(21),
            ..Default::default()
        };
        Arc::new(Mutex::new(Scheduler::new(config).unwrap()))
    }

    fn judgment(name: &str) -> Task {
        Task::new(
            Sentence::judgment(Term::atom(name), Truth::default()),
            Budget::default(),
        )
    }

    /// The step bound stops the scheduler after exactly that many ticks.
    #[test]
    fn step_bound_stops_the_scheduler() {
        let scheduler = shared();
        scheduler.lock().input(judgment("x"));
        let report = Driver::spawn(
            Arc::clone(&scheduler),
            DriverConfig {
                max_steps: Some(5),
                ..Default::default()
            },
        )
        .join();
        assert_eq!(report, DriverReport { steps: 5, reason: FinishReason::StepBound });
        let s = scheduler.lock();
        assert!(s.is_finished());
        assert_eq!(s.clock(), 5);
    }

    /// `stop_when_idle` ends the run once the novel bag is empty.
    #[test]
    fn stops_once_input_is_exhausted() {
        let scheduler = shared();
        scheduler.lock().input(judgment("x"));
        scheduler.lock().input(judgment("y"));
        let report = Driver::spawn(
            Arc::clone(&scheduler),
            DriverConfig {
                stop_when_idle: true,
                ..Default::default()
            },
        )
        .join();
        assert_eq!(report.reason, FinishReason::InputExhausted);
        assert_eq!(report.steps, 2);
        assert_eq!(scheduler.lock().memory().len(), 2);
    }

    /// An unbounded run ends on `stop`.
    #[test]
    fn explicit_stop_ends_an_unbounded_run() {
        let scheduler = shared();
        let driver = Driver::spawn(
            Arc::clone(&scheduler),
            DriverConfig {
                tick_interval: Duration::from_millis(1),
                ..Default::default()
            },
        );
        thread::sleep(Duration::from_millis(20));
        driver.stop();
        let report = driver.join();
        assert_eq!(report.reason, FinishReason::StopRequested);
        assert!(scheduler.lock().is_finished());
    }

    /// The clock stands still while paused.
    #[test]
    fn paused_driver_does_not_tick() {
        let scheduler = shared();
        let driver = Driver::spawn(
            Arc::clone(&scheduler),
            DriverConfig {
                start_paused: true,
                ..Default::default()
            },
        );
        thread::sleep(Duration::from_millis(30));
        assert_eq!(scheduler.lock().clock(), 0);
        assert!(driver.is_paused());

        driver.resume();
        thread::sleep(Duration::from_millis(30));
        driver.pause();
        thread::sleep(Duration::from_millis(20));
        let paused_at = scheduler.lock().clock();
        assert!(paused_at > 0);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(scheduler.lock().clock(), paused_at);

        driver.stop();
        assert_eq!(driver.join().reason, FinishReason::StopRequested);
    }

    /// A stopped scheduler makes the driver return at once.
    #[test]
    fn already_stopped_scheduler_finishes_immediately() {
        let scheduler = shared();
        scheduler.lock().stop();
        let report = Driver::spawn(Arc::clone(&scheduler), DriverConfig::default()).join();
        assert_eq!(report, DriverReport { steps: 0, reason: FinishReason::StopRequested });
    }

    /// Tasks queued from another thread while the driver ticks are all
    /// drained, and neither bag is left inconsistent.
    #[test]
    fn input_from_another_thread_is_drained_during_a_run() {
        let scheduler = shared();
        let input = scheduler.lock().input_handle();
        let driver = Driver::spawn(Arc::clone(&scheduler), DriverConfig::default());

        let producer = {
            let input = input.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    input.input(judgment(&format!("t{i}")));
                    if i % 10 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
            })
        };
        producer.join().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while input.pending() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        driver.stop();
        assert_eq!(driver.join().reason, FinishReason::StopRequested);

        assert_eq!(input.pending(), 0);
        input.with_bag(|bag| bag.assert_consistent());
        let s = scheduler.lock();
        s.memory().assert_consistent();
        for i in 0..50 {
            assert!(s.memory().contains(&Term::atom(format!("t{i}"))), "t{i}");
        }
    }

    /// The driver announces its finish on the status topic.
    #[test]
    fn finish_is_announced_on_the_status_topic() {
        let scheduler = shared();
        let mut status = scheduler.lock().bus().subscribe_to(Topic::Status);
        Driver::spawn(
            Arc::clone(&scheduler),
            DriverConfig {
                max_steps: Some(1),
                ..Default::default()
            },
        )
        .join();
        let lines: Vec<String> = status.drain().iter().map(|e| e.payload.to_string()).collect();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[1].contains("driver finished after 1 steps"));
    }
}
