//! Fair passive resource.
//!
//! A passive resource is a pool of `capacity` interchangeable units with no
//! processing of its own (connections, buffers, locks). Processes acquire a
//! number of units, hold them for a while, and release them.
//!
//! # Fairness
//!
//! Grants follow arrival order strictly. A request is granted immediately
//! only if nobody is waiting (or the requester is the head of the queue) and
//! enough units are free. A newcomer never overtakes an earlier waiter, even
//! when it would fit on its own.
//!
//! When units come back, the queue is drained from the head: every head entry
//! that fits is granted and its process resumed, until the first entry that
//! does not fit. Entries further back wait, whatever their size.
//!
//! # Example
//!
//! ```
//! use des_core::{Execute, Executor, Scheduler, SimTime, Simulation};
//! use des_resources::{
//!     AcquireTimeout, Continuation, LifeCycle, PassiveResource, PassiveResourceConfig, SimProcess,
//! };
//!
//! struct Job {
//!     pool: PassiveResource,
//!     holding: bool,
//! }
//!
//! impl LifeCycle for Job {
//!     fn step(&mut self, me: &SimProcess, scheduler: &mut Scheduler) -> Continuation {
//!         if self.holding {
//!             self.pool.release(me, 1, scheduler);
//!             return Continuation::Done;
//!         }
//!         self.holding = true;
//!         if self.pool.acquire(me, 1, AcquireTimeout::Disabled, scheduler).unwrap() {
//!             me.hold(SimTime::from_millis(10), scheduler);
//!         }
//!         // Either holding for 10ms or queued until a release resumes us.
//!         Continuation::Yield
//!     }
//! }
//!
//! let mut sim = Simulation::default();
//! let pool = PassiveResource::standalone(
//!     PassiveResourceConfig::new(1, "pool", "Pool", "system"),
//!     sim.config(),
//! )
//! .unwrap();
//!
//! for name in ["a", "b"] {
//!     let job = Job { pool: pool.clone(), holding: false };
//!     SimProcess::spawn(sim.scheduler_mut(), name, job);
//! }
//! sim.execute(Executor::unbound());
//! assert_eq!(pool.available(), 1);
//! ```
//!
//! Note that a queued job is resumed *holding* its units, so its next step
//! goes straight to release here; real bodies usually hold first.

use des_core::{resource_span, Scheduler, SimTime, SimulationConfig, TaskHandle};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace, warn};

use crate::config::{PassiveResourceConfig, ResourceId};
use crate::control::{SimulationControl, SimulationGate};
use crate::error::ResourceError;
use crate::failure::{DefaultFailureCatalog, FailureCatalog, SimFailure};
use crate::observer::{ObserverRegistry, PassiveResourceSensor};
use crate::process::SimProcess;
use crate::timeout::{AcquireTimeout, ResourceTimeout};

/// Identity of one wait-queue entry, unique per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaitingId(pub u64);

impl fmt::Display for WaitingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Waiting({})", self.0)
    }
}

/// A process waiting for units, as stored in the wait queue.
#[derive(Debug, Clone)]
pub struct WaitingProcess {
    id: WaitingId,
    process: SimProcess,
    amount: u64,
    enqueued_at: SimTime,
    timeout: Option<TaskHandle<()>>,
}

impl WaitingProcess {
    pub fn id(&self) -> WaitingId {
        self.id
    }

    pub fn process(&self) -> &SimProcess {
        &self.process
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn enqueued_at(&self) -> SimTime {
        self.enqueued_at
    }

    /// Handle of the armed timeout event, if one guards this entry.
    pub fn timeout(&self) -> Option<TaskHandle<()>> {
        self.timeout
    }

    fn disarm(&self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.timeout {
            if scheduler.cancel_task(handle) {
                trace!(waiting = %self.id, "Timeout disarmed");
            }
        }
    }
}

struct ResourceState {
    available: u64,
    queue: VecDeque<WaitingProcess>,
    next_waiting_id: u64,
}

impl ResourceState {
    fn can_proceed(&self, process: &SimProcess, amount: u64) -> bool {
        self.queue.front().map_or(true, |head| head.process == *process) && amount <= self.available
    }
}

pub(crate) struct ResourceShared {
    id: ResourceId,
    name: String,
    capacity: u64,
    simulate_failures: bool,
    control: Rc<dyn SimulationControl>,
    catalog: Rc<dyn FailureCatalog>,
    state: RefCell<ResourceState>,
    observers: RefCell<ObserverRegistry>,
    notifying: Cell<bool>,
}

/// Handle to a fair passive resource. Clones share the same resource.
#[derive(Clone)]
pub struct PassiveResource {
    inner: Rc<ResourceShared>,
}

impl PassiveResource {
    /// Builds a resource from its configuration.
    ///
    /// `simulate_failures` is read from `simulation` once, here; later changes
    /// to the configuration do not affect existing resources.
    pub fn new(
        config: PassiveResourceConfig,
        simulation: &SimulationConfig,
        control: Rc<dyn SimulationControl>,
        catalog: Rc<dyn FailureCatalog>,
    ) -> Result<Self, ResourceError> {
        config.validate()?;
        let resource = Self {
            inner: Rc::new(ResourceShared {
                id: config.id(),
                name: config.resource_name,
                capacity: config.capacity,
                simulate_failures: simulation.simulate_failures,
                control,
                catalog,
                state: RefCell::new(ResourceState {
                    available: config.capacity,
                    queue: VecDeque::new(),
                    next_waiting_id: 0,
                }),
                observers: RefCell::new(ObserverRegistry::new()),
                notifying: Cell::new(false),
            }),
        };
        debug!(
            resource = %resource,
            capacity = resource.inner.capacity,
            simulate_failures = resource.inner.simulate_failures,
            "Passive resource created"
        );
        Ok(resource)
    }

    /// A resource with an always-running gate and the default failure catalog.
    pub fn standalone(
        config: PassiveResourceConfig,
        simulation: &SimulationConfig,
    ) -> Result<Self, ResourceError> {
        Self::new(
            config,
            simulation,
            Rc::new(SimulationGate::new()),
            Rc::new(DefaultFailureCatalog),
        )
    }

    pub fn id(&self) -> &ResourceId {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn capacity(&self) -> u64 {
        self.inner.capacity
    }

    /// Units currently free.
    pub fn available(&self) -> u64 {
        self.inner.state.borrow().available
    }

    pub fn simulates_failures(&self) -> bool {
        self.inner.simulate_failures
    }

    /// Snapshot of the wait queue, head first.
    pub fn waiting_processes(&self) -> Vec<WaitingProcess> {
        self.inner.state.borrow().queue.iter().cloned().collect()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    /// Whether the entry `id` is still in the wait queue.
    pub fn is_waiting(&self, id: WaitingId) -> bool {
        self.inner.state.borrow().queue.iter().any(|w| w.id == id)
    }

    /// Whether `process` has an entry in the wait queue.
    pub fn is_queued(&self, process: &SimProcess) -> bool {
        self.inner.state.borrow().queue.iter().any(|w| w.process == *process)
    }

    pub fn add_observer(&self, observer: Rc<dyn PassiveResourceSensor>) {
        self.inner.observers.borrow_mut().add(observer);
    }

    /// Removing an observer that is not registered does nothing.
    pub fn remove_observer(&self, observer: &Rc<dyn PassiveResourceSensor>) {
        self.inner.observers.borrow_mut().remove(observer);
    }

    /// Requests `amount` units for `process`.
    ///
    /// Returns `Ok(true)` when the units were granted on the spot and the
    /// process keeps running. Returns `Ok(false)` when the process was queued
    /// and suspended; its body must yield, and it is resumed either holding
    /// the units or with a pending [`SimFailure`] (see
    /// [`SimProcess::take_failure`]).
    ///
    /// With failure simulation enabled, [`AcquireTimeout::After`] a zero delay
    /// fails at once with `Err` instead of queueing, and a positive delay arms
    /// a timeout event for the queued entry.
    ///
    /// While the simulation is not running the call grants without touching
    /// any state.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is zero, if `process` is already waiting in some
    /// wait queue, or if called from within a notification of this resource.
    #[instrument(skip_all, fields(resource = %self.inner.id, process = %process, amount = amount))]
    pub fn acquire(
        &self,
        process: &SimProcess,
        amount: u64,
        timeout: AcquireTimeout,
        scheduler: &mut Scheduler,
    ) -> Result<bool, SimFailure> {
        assert!(amount > 0, "{process} requested zero units of {self}");
        self.assert_not_notifying("acquire");

        if !self.inner.control.is_running() {
            debug!("Simulation stopped, granting without contention");
            return Ok(true);
        }
        if let Some(other) = process.waiting_on() {
            panic!("{process} requested {amount} units of {self} while already waiting on {other}");
        }

        self.notify(|observers| observers.fire_request(process, amount));

        let granted = self.inner.state.borrow().can_proceed(process, amount);
        if granted {
            self.grant_access(process, amount);
            return Ok(true);
        }

        debug!(
            available = self.available(),
            queued = self.queue_len(),
            "Process is waiting"
        );
        let waiting_id = self.next_waiting_id();
        let timeout = self.process_timeout(timeout, waiting_id, process, scheduler)?;
        self.inner.state.borrow_mut().queue.push_back(WaitingProcess {
            id: waiting_id,
            process: process.clone(),
            amount,
            enqueued_at: scheduler.time(),
            timeout,
        });
        process.set_waiting_on(Some(self.inner.id.clone()));
        process.suspend();
        Ok(false)
    }

    /// Returns `amount` units and grants queued requests that now fit, in
    /// arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the release would push the free units above capacity.
    #[instrument(skip_all, fields(resource = %self.inner.id, process = %process, amount = amount))]
    pub fn release(&self, process: &SimProcess, amount: u64, scheduler: &mut Scheduler) {
        self.assert_not_notifying("release");

        if !self.inner.control.is_running() {
            debug!("Simulation stopped, ignoring release");
            return;
        }

        {
            let mut state = self.inner.state.borrow_mut();
            let Some(available) = state
                .available
                .checked_add(amount)
                .filter(|available| *available <= self.inner.capacity)
            else {
                panic!(
                    "{process} released {amount} units of {self}, exceeding its capacity of {} ({} free)",
                    self.inner.capacity, state.available
                );
            };
            state.available = available;
        }
        debug!(available = self.available(), "Process released units");
        self.notify(|observers| observers.fire_release(process, amount));

        self.notify_waiting_processes(scheduler);
    }

    /// Removes the queue entry of `process` without granting it and cancels
    /// its armed timeout.
    ///
    /// The other entries keep their order. The process is not resumed: the
    /// caller decides what happens to it next.
    pub fn cancel(&self, process: &SimProcess, scheduler: &mut Scheduler) -> Option<WaitingProcess> {
        let entry = {
            let mut state = self.inner.state.borrow_mut();
            let position = state.queue.iter().position(|w| w.process == *process)?;
            state.queue.remove(position)
        }?;
        process.set_waiting_on(None);
        entry.disarm(scheduler);
        debug!(resource = %self, process = %process, waiting = %entry.id, "Waiting process cancelled");
        Some(entry)
    }

    /// Removes the entry `id` from the queue, if still there.
    pub(crate) fn remove(&self, id: WaitingId) -> Option<WaitingProcess> {
        let entry = {
            let mut state = self.inner.state.borrow_mut();
            let position = state.queue.iter().position(|w| w.id == id)?;
            state.queue.remove(position)
        }?;
        entry.process.set_waiting_on(None);
        Some(entry)
    }

    /// Builds the timeout failure for `process` from the failure catalog.
    pub(crate) fn timeout_failure(&self, process: &SimProcess, time: SimTime) -> SimFailure {
        let failure_type = self
            .inner
            .catalog
            .resource_timeout_failure_type(&self.inner.id.context, &self.inner.id.resource);
        SimFailure {
            failure_type,
            resource: self.inner.id.clone(),
            process: process.id(),
            time,
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<ResourceShared> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<ResourceShared>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn next_waiting_id(&self) -> WaitingId {
        let mut state = self.inner.state.borrow_mut();
        state.next_waiting_id += 1;
        WaitingId(state.next_waiting_id)
    }

    /// Applies the timeout policy to a request that is about to wait.
    fn process_timeout(
        &self,
        timeout: AcquireTimeout,
        waiting_id: WaitingId,
        process: &SimProcess,
        scheduler: &mut Scheduler,
    ) -> Result<Option<TaskHandle<()>>, SimFailure> {
        if !self.inner.simulate_failures {
            return Ok(None);
        }
        let AcquireTimeout::After(delay) = timeout else {
            return Ok(None);
        };
        if delay.is_zero() {
            let failure = self.timeout_failure(process, scheduler.time());
            warn!(failure = %failure, "Immediate resource timeout");
            return Err(failure);
        }

        let event = ResourceTimeout::new(self, waiting_id, scheduler.time() + delay);
        let handle = scheduler.schedule_task(delay, event);
        trace!(waiting = %waiting_id, deadline = %(scheduler.time() + delay), "Timeout armed");
        Ok(Some(handle))
    }

    fn grant_access(&self, process: &SimProcess, amount: u64) {
        {
            let mut state = self.inner.state.borrow_mut();
            let Some(available) = state.available.checked_sub(amount) else {
                panic!(
                    "More resource than available have been acquired: {process} took {amount} of {self} with {} free",
                    state.available
                );
            };
            state.available = available;
        }
        debug!(resource = %self, process = %process, amount, available = self.available(), "Process acquires units");
        self.notify(|observers| observers.fire_acquire(process, amount));
    }

    fn notify_waiting_processes(&self, scheduler: &mut Scheduler) {
        let _span = resource_span(&self.inner.name, &self.inner.id.to_string()).entered();
        loop {
            let head = {
                let state = self.inner.state.borrow();
                state
                    .queue
                    .front()
                    .filter(|head| state.can_proceed(&head.process, head.amount))
                    .map(|head| (head.process.clone(), head.amount))
            };
            let Some((process, amount)) = head else {
                break;
            };

            self.grant_access(&process, amount);
            let granted = self.inner.state.borrow_mut().queue.pop_front();
            if let Some(entry) = granted {
                entry.disarm(scheduler);
            }
            process.set_waiting_on(None);
            process.resume(scheduler);
        }
        trace!(queued = self.queue_len(), available = self.available(), "Wait queue drained");
    }

    fn notify(&self, fire: impl FnOnce(&ObserverRegistry)) {
        // Snapshot so sensors may register or unregister while being notified.
        let observers = self.inner.observers.borrow().clone();
        if observers.is_empty() {
            return;
        }
        self.inner.notifying.set(true);
        fire(&observers);
        self.inner.notifying.set(false);
    }

    fn assert_not_notifying(&self, operation: &str) {
        assert!(
            !self.inner.notifying.get(),
            "{operation} on {self} called from one of its own observer notifications"
        );
    }
}

impl fmt::Display for PassiveResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.inner.name, self.inner.id)
    }
}

impl fmt::Debug for PassiveResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("PassiveResource")
            .field("id", &self.inner.id)
            .field("capacity", &self.inner.capacity)
            .field("available", &state.available)
            .field("queued", &state.queue.len())
            .finish()
    }
}
