//! Core discrete event simulation engine.
//!
//! This crate provides the building blocks every higher layer runs on:
//! simulated time, a deterministic event scheduler, one-shot tasks and
//! executors that drive a [`Simulation`] to a stopping condition.
//!
//! # Architecture Overview
//!
//! - [`Simulation`]: owns the [`Scheduler`] and the [`SimulationConfig`].
//!   Use it to run simulations and inspect their state.
//! - [`Scheduler`]: the event queue plus the clock. Every event is a
//!   [`Task`]; closures scheduled with [`Scheduler::schedule_closure`] or
//!   [`Scheduler::timeout`] are the common case.
//!
//! The engine is single threaded. Handles shared between tasks use `Rc`, and
//! nothing here is `Send`.
//!
//! # Basic Usage
//!
//! ```rust
//! use des_core::{Execute, Executor, SimTime, Simulation, SimulationConfig};
//!
//! let mut simulation = Simulation::new(SimulationConfig::default());
//! simulation.timeout(SimTime::from_millis(100), |scheduler| {
//!     assert_eq!(scheduler.time(), SimTime::from_millis(100));
//! });
//! simulation.execute(Executor::unbound());
//! assert_eq!(simulation.time(), SimTime::from_millis(100));
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], which represents simulation time (not wall-clock time).
//! Events at the same instant run in the order they were scheduled, so a run
//! is fully determined by its configuration and inputs.

pub mod error;
pub mod execute;
pub mod ids;
pub mod logging;
pub mod scheduler;
pub mod task;
pub mod time;
pub mod types;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, trace};

pub use error::{EventError, SimError};
pub use execute::{Execute, Executor, InspectingExecutor, RunSummary, StopReason};
pub use logging::{
    init_detailed_simulation_logging, init_simulation_logging, init_simulation_logging_with_level,
    process_span, resource_span, simulation_span,
};
pub use scheduler::Scheduler;
pub use task::{ClosureTask, Task, TaskHandle, TaskId, TimeoutTask};
pub use time::SimTime;
pub use types::EventId;

/// Run-wide settings, read once when the simulation is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for every deterministic id handed out during the run.
    pub seed: u64,
    /// Whether modelled failures (such as resource timeouts) are injected.
    pub simulate_failures: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            simulate_failures: true,
        }
    }
}

impl SimulationConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// ```
    /// # use des_core::SimulationConfig;
    /// let config = SimulationConfig::from_json(r#"{ "seed": 9 }"#).unwrap();
    /// assert_eq!(config.seed, 9);
    /// assert!(config.simulate_failures);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        serde_json::from_str(json).map_err(|e| SimError::Configuration(e.to_string()))
    }
}

/// Simulation struct that puts the scheduler and its configuration together.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Simulation {
    config: SimulationConfig,
    scheduler: Scheduler,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        let scheduler = Scheduler::with_seed(config.seed);
        Self { config, scheduler }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.scheduler.time()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mutable access to the scheduler, for wiring processes and resources
    /// before (or between) runs.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Performs one step of the simulation. Returns `true` if there was in fact an event
    /// available to process, and `false` otherwise, which signifies that the simulation
    /// ended.
    pub fn step(&mut self) -> bool {
        let Some(event) = self.scheduler.pop() else {
            return false;
        };
        trace!(
            event_id = %event.id(),
            event_time = %event.time(),
            task_id = %event.task_id(),
            "Processing simulation step"
        );
        self.scheduler.execute_task(event.task_id());
        true
    }

    /// Runs the entire simulation.
    ///
    /// The stopping condition and other execution details depend on the executor used.
    /// See [`Execute`] and [`Executor`] for more details.
    #[instrument(skip(self, executor), fields(initial_time = %self.time(), seed = self.config.seed))]
    pub fn execute<E: Execute>(&mut self, executor: E) -> RunSummary {
        info!("Starting simulation execution");
        let summary = executor.execute(self);
        info!(
            final_time = %self.time(),
            steps = summary.steps,
            reason = ?summary.reason,
            "Simulation execution completed"
        );
        summary
    }

    /// Returns the time of the next scheduled event, or None if no events are scheduled.
    pub fn peek_next_event_time(&self) -> Option<SimTime> {
        self.scheduler.next_event_time()
    }

    pub fn has_pending_events(&self) -> bool {
        self.scheduler.next_event_time().is_some()
    }

    /// Schedule a closure as a task
    pub fn schedule_closure<F, R>(&mut self, delay: SimTime, closure: F) -> TaskHandle<R>
    where
        F: FnOnce(&mut Scheduler) -> R + 'static,
        R: 'static,
    {
        self.scheduler.schedule_closure(delay, closure)
    }

    /// Schedule a timeout callback
    pub fn timeout<F>(&mut self, delay: SimTime, callback: F) -> TaskHandle<()>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        self.scheduler.timeout(delay, callback)
    }

    /// Cancel a scheduled task
    pub fn cancel_task<T>(&mut self, handle: TaskHandle<T>) -> bool {
        self.scheduler.cancel_task(handle)
    }

    /// Get the result of a completed task
    pub fn get_task_result<T: 'static>(&mut self, handle: TaskHandle<T>) -> Option<T> {
        self.scheduler.get_task_result(handle)
    }
}
