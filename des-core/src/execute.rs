//! Driving a simulation to a stopping point.
//!
//! An [`Executor`] combines an optional time horizon with an optional step
//! budget; whichever is hit first ends the run. With neither, the run goes on
//! until the event queue is empty.

use crate::{SimTime, Simulation};

/// Simulation execution trait.
pub trait Execute {
    /// Runs `sim` until the executor's stopping condition holds.
    fn execute(self, sim: &mut Simulation) -> RunSummary;
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No events left.
    Drained,
    /// The next event lies past the horizon.
    Horizon,
    /// The step budget is used up.
    StepLimit,
}

/// Outcome of one [`Execute::execute`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Events popped, including skipped cancelled ones.
    pub steps: usize,
    pub reason: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Executor {
    horizon: Option<SimTime>,
    step_limit: Option<usize>,
}

impl Executor {
    /// Runs until no events are left.
    #[must_use]
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Runs every event scheduled at or before `time`.
    #[must_use]
    pub fn timed(time: SimTime) -> Self {
        Self::unbound().with_horizon(time)
    }

    /// Runs at most `steps` events.
    #[must_use]
    pub fn steps(steps: usize) -> Self {
        Self::unbound().with_step_limit(steps)
    }

    #[must_use]
    pub fn with_horizon(mut self, time: SimTime) -> Self {
        self.horizon = Some(time);
        self
    }

    #[must_use]
    pub fn with_step_limit(mut self, steps: usize) -> Self {
        self.step_limit = Some(steps);
        self
    }

    /// Calls `inspect` after every step, with the simulation as it stands.
    #[must_use]
    pub fn inspect<F>(self, inspect: F) -> InspectingExecutor<F>
    where
        F: FnMut(&Simulation),
    {
        InspectingExecutor {
            executor: self,
            inspect,
        }
    }

    fn drive(self, sim: &mut Simulation, mut after_step: impl FnMut(&Simulation)) -> RunSummary {
        let mut steps = 0;
        let reason = loop {
            if self.step_limit.is_some_and(|limit| steps >= limit) {
                break StopReason::StepLimit;
            }
            match sim.peek_next_event_time() {
                None => break StopReason::Drained,
                Some(next) if self.horizon.is_some_and(|horizon| next > horizon) => {
                    break StopReason::Horizon
                }
                Some(_) => {}
            }
            sim.step();
            steps += 1;
            after_step(sim);
        };
        RunSummary { steps, reason }
    }
}

impl Execute for Executor {
    fn execute(self, sim: &mut Simulation) -> RunSummary {
        self.drive(sim, |_| {})
    }
}

/// [`Executor`] with a per-step callback, see [`Executor::inspect`].
pub struct InspectingExecutor<F> {
    executor: Executor,
    inspect: F,
}

impl<F> Execute for InspectingExecutor<F>
where
    F: FnMut(&Simulation),
{
    fn execute(self, sim: &mut Simulation) -> RunSummary {
        self.executor.drive(sim, self.inspect)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Scheduler;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Re-arms itself every 2s until it has ticked ten times.
    fn tick(counter: Rc<Cell<usize>>, scheduler: &mut Scheduler) {
        counter.set(counter.get() + 1);
        if counter.get() < 10 {
            scheduler.schedule_closure(SimTime::from_secs(2), move |s| tick(counter, s));
        }
    }

    fn ticking_simulation() -> (Simulation, Rc<Cell<usize>>) {
        let mut sim = Simulation::default();
        let counter = Rc::new(Cell::new(0));
        let c = counter.clone();
        sim.schedule_closure(SimTime::zero(), move |s| tick(c, s));
        (sim, counter)
    }

    #[test]
    fn test_steps() {
        let (mut sim, counter) = ticking_simulation();
        let summary = Executor::steps(4).execute(&mut sim);
        assert_eq!(counter.get(), 4);
        assert_eq!(
            summary,
            RunSummary {
                steps: 4,
                reason: StopReason::StepLimit
            }
        );
    }

    #[test]
    fn test_step_budget_larger_than_run() {
        let (mut sim, counter) = ticking_simulation();
        let summary = Executor::steps(100).execute(&mut sim);
        assert_eq!(counter.get(), 10);
        assert_eq!(summary.reason, StopReason::Drained);
        assert!(!sim.has_pending_events());
    }

    #[test]
    fn test_timed_stops_at_last_event_before_horizon() {
        let (mut sim, counter) = ticking_simulation();
        let summary = Executor::timed(SimTime::from_secs(5)).execute(&mut sim);
        assert_eq!(counter.get(), 3);
        assert_eq!(sim.time(), SimTime::from_secs(4));
        assert_eq!(summary.reason, StopReason::Horizon);
    }

    #[test]
    fn test_first_limit_reached_wins() {
        let (mut sim, counter) = ticking_simulation();
        let summary = Executor::timed(SimTime::from_secs(100))
            .with_step_limit(2)
            .execute(&mut sim);
        assert_eq!(counter.get(), 2);
        assert_eq!(summary.reason, StopReason::StepLimit);

        let summary = Executor::steps(100)
            .with_horizon(SimTime::from_secs(6))
            .execute(&mut sim);
        assert_eq!(counter.get(), 4);
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.reason, StopReason::Horizon);
    }

    #[test]
    fn test_inspect_runs_after_each_step() {
        let (mut sim, _counter) = ticking_simulation();
        let mut seen = Vec::new();
        let summary = Executor::unbound()
            .inspect(|sim| seen.push(sim.time()))
            .execute(&mut sim);
        assert_eq!(seen.len(), summary.steps);
        assert_eq!(seen.len(), 10);
        assert_eq!(seen.last(), Some(&SimTime::from_secs(18)));
    }
}
