//! Shared process bodies and sensors for the resource integration tests.
#![allow(dead_code)]

use des_core::{Scheduler, SimTime, Simulation};
use des_resources::{
    AcquireTimeout, Continuation, LifeCycle, PassiveResource, PassiveResourceConfig,
    PassiveResourceSensor, ProcessId, SimProcess,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Granted,
    Released,
    TimedOut,
    Failed,
}

/// `(time, process name, process id, outcome)` in the order things happened.
pub type Journal = Rc<RefCell<Vec<(SimTime, String, ProcessId, Outcome)>>>;

enum Phase {
    Acquire,
    Queued,
    Release,
}

/// Acquires `amount` units, holds them for `service`, releases them.
pub struct Worker {
    resource: PassiveResource,
    amount: u64,
    service: SimTime,
    timeout: AcquireTimeout,
    phase: Phase,
    journal: Journal,
}

impl Worker {
    pub fn new(
        resource: &PassiveResource,
        amount: u64,
        service: SimTime,
        timeout: AcquireTimeout,
        journal: &Journal,
    ) -> Self {
        Self {
            resource: resource.clone(),
            amount,
            service,
            timeout,
            phase: Phase::Acquire,
            journal: journal.clone(),
        }
    }

    fn record(&self, process: &SimProcess, scheduler: &Scheduler, outcome: Outcome) {
        self.journal.borrow_mut().push((
            scheduler.time(),
            process.name().to_string(),
            process.id(),
            outcome,
        ));
    }

    fn work(&mut self, process: &SimProcess, scheduler: &mut Scheduler) -> Continuation {
        self.record(process, scheduler, Outcome::Granted);
        self.phase = Phase::Release;
        process.hold(self.service, scheduler);
        Continuation::Yield
    }
}

impl LifeCycle for Worker {
    fn step(&mut self, process: &SimProcess, scheduler: &mut Scheduler) -> Continuation {
        match self.phase {
            Phase::Acquire => {
                match self.resource.acquire(process, self.amount, self.timeout, scheduler) {
                    Ok(true) => self.work(process, scheduler),
                    Ok(false) => {
                        self.phase = Phase::Queued;
                        Continuation::Yield
                    }
                    Err(_) => {
                        self.record(process, scheduler, Outcome::Failed);
                        Continuation::Done
                    }
                }
            }
            Phase::Queued => {
                if process.take_failure().is_some() {
                    self.record(process, scheduler, Outcome::TimedOut);
                    return Continuation::Done;
                }
                self.work(process, scheduler)
            }
            Phase::Release => {
                self.resource.release(process, self.amount, scheduler);
                self.record(process, scheduler, Outcome::Released);
                Continuation::Done
            }
        }
    }
}

/// Spawns a [`Worker`] once `arrival` has passed. The process handle is
/// pushed to `spawned` when it exists.
pub fn spawn_at(
    sim: &mut Simulation,
    arrival: SimTime,
    name: &str,
    worker: Worker,
    spawned: &Rc<RefCell<Vec<SimProcess>>>,
) {
    let name = name.to_string();
    let spawned = spawned.clone();
    sim.timeout(arrival, move |scheduler| {
        let process = SimProcess::spawn(scheduler, &name, worker);
        spawned.borrow_mut().push(process);
    });
}

pub fn pool(sim: &Simulation, capacity: u64) -> PassiveResource {
    PassiveResource::standalone(
        PassiveResourceConfig::new(capacity, "pool", "Connection Pool", "assembly-1"),
        sim.config(),
    )
    .unwrap()
}

pub fn outcomes_of(journal: &Journal, name: &str) -> Vec<(SimTime, Outcome)> {
    journal
        .borrow()
        .iter()
        .filter(|(_, n, _, _)| n == name)
        .map(|(t, _, _, o)| (*t, *o))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Request,
    Acquire,
    Release,
}

/// Sensor recording every notification as `(kind, process name, amount)`.
#[derive(Default)]
pub struct Recorder {
    pub seen: RefCell<Vec<(Notification, String, u64)>>,
}

impl Recorder {
    fn push(&self, kind: Notification, process: &SimProcess, amount: u64) {
        self.seen
            .borrow_mut()
            .push((kind, process.name().to_string(), amount));
    }

    pub fn kinds(&self) -> Vec<Notification> {
        self.seen.borrow().iter().map(|(k, _, _)| *k).collect()
    }
}

impl PassiveResourceSensor for Recorder {
    fn on_request(&self, process: &SimProcess, amount: u64) {
        self.push(Notification::Request, process, amount);
    }

    fn on_acquire(&self, process: &SimProcess, amount: u64) {
        self.push(Notification::Acquire, process, amount);
    }

    fn on_release(&self, process: &SimProcess, amount: u64) {
        self.push(Notification::Release, process, amount);
    }
}

/// Sensor that checks `held + available == capacity` after every change.
pub struct CapacityAudit {
    pub resource: PassiveResource,
    pub held: Cell<u64>,
    pub peak: Cell<u64>,
}

impl CapacityAudit {
    pub fn new(resource: &PassiveResource) -> Self {
        Self {
            resource: resource.clone(),
            held: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    fn check(&self) {
        let available = self.resource.available();
        assert!(available <= self.resource.capacity());
        assert_eq!(self.held.get() + available, self.resource.capacity());
    }
}

impl PassiveResourceSensor for CapacityAudit {
    fn on_request(&self, _process: &SimProcess, _amount: u64) {
        self.check();
    }

    fn on_acquire(&self, _process: &SimProcess, amount: u64) {
        self.held.set(self.held.get() + amount);
        self.peak.set(self.peak.get().max(self.held.get()));
        self.check();
    }

    fn on_release(&self, _process: &SimProcess, amount: u64) {
        self.held.set(self.held.get() - amount);
        self.check();
    }
}
