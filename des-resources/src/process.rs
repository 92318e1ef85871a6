//! Simulated processes.
//!
//! A process is a unit of simulated work that can wait for a resource without
//! holding a host thread. Its body is a [`LifeCycle`] state machine: every
//! time the process is scheduled the driver calls [`LifeCycle::step`], which
//! runs until the body either finishes or suspends itself and yields.
//!
//! ```text
//!             spawn                    suspend()
//!   (new) ──────────────► Runnable ─────────────► Waiting
//!                           │   ▲                   │
//!                   Done    │   └───── resume() ────┘
//!                           ▼
//!                       Terminated
//! ```
//!
//! Resuming never runs the body inline. It schedules the next step at the
//! current simulated time, behind whatever is already due.
//!
//! Besides full life-cycle processes there is a *carrier* variant with no
//! body at all. It only carries identity through APIs that expect a process,
//! for event-style callers that never block; suspend and resume are no-ops on
//! it.

use des_core::ids::UUID_DOMAIN_PROCESS;
use des_core::{process_span, Scheduler, SimTime};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::config::ResourceId;
use crate::failure::SimFailure;

/// Stable identity of a process, derived from the simulation seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub Uuid);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Runnable,
    Waiting,
    Terminated,
}

/// What a body tells the driver when it gives control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// The process suspended itself and waits to be resumed.
    Yield,
    /// The unit of work is complete.
    Done,
}

/// Body of a full life-cycle process.
///
/// `step` is called on spawn and after every resume. Implementations keep
/// their own program counter (usually an enum) to know where to continue.
/// Returning [`Continuation::Yield`] is only valid after the process has
/// suspended itself, directly or through a blocking `acquire`.
pub trait LifeCycle: 'static {
    fn step(&mut self, process: &SimProcess, scheduler: &mut Scheduler) -> Continuation;
}

enum ProcessKind {
    LifeCycle(RefCell<Option<Box<dyn LifeCycle>>>),
    Carrier,
}

struct ProcessInner {
    id: ProcessId,
    name: String,
    kind: ProcessKind,
    state: Cell<ProcessState>,
    waiting_on: RefCell<Option<ResourceId>>,
    pending_failures: RefCell<VecDeque<SimFailure>>,
}

/// Handle to a simulated process.
///
/// Cloning copies the handle. Equality and hashing use the [`ProcessId`], so
/// every clone compares equal to the original.
#[derive(Clone)]
pub struct SimProcess {
    inner: Rc<ProcessInner>,
}

impl SimProcess {
    fn create(scheduler: &mut Scheduler, name: &str, kind: ProcessKind) -> Self {
        Self {
            inner: Rc::new(ProcessInner {
                id: ProcessId(scheduler.next_id(UUID_DOMAIN_PROCESS)),
                name: name.to_string(),
                kind,
                state: Cell::new(ProcessState::Runnable),
                waiting_on: RefCell::new(None),
                pending_failures: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Creates a runnable process and schedules its first step at the current time.
    #[instrument(skip(scheduler, body), fields(time = %scheduler.time()))]
    pub fn spawn<L: LifeCycle>(scheduler: &mut Scheduler, name: &str, body: L) -> Self {
        let process = Self::create(
            scheduler,
            name,
            ProcessKind::LifeCycle(RefCell::new(Some(Box::new(body)))),
        );
        debug!(process = %process, "Process spawned");
        process.schedule_step(SimTime::zero(), scheduler);
        process
    }

    /// Creates a carrier process: identity only, no life-cycle.
    pub fn carrier(scheduler: &mut Scheduler, name: &str) -> Self {
        let process = Self::create(scheduler, name, ProcessKind::Carrier);
        trace!(process = %process, "Carrier process created");
        process
    }

    pub fn id(&self) -> ProcessId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> ProcessState {
        self.inner.state.get()
    }

    pub fn is_carrier(&self) -> bool {
        matches!(self.inner.kind, ProcessKind::Carrier)
    }

    /// The resource whose wait queue currently holds this process, if any.
    pub fn waiting_on(&self) -> Option<ResourceId> {
        self.inner.waiting_on.borrow().clone()
    }

    pub(crate) fn set_waiting_on(&self, resource: Option<ResourceId>) {
        *self.inner.waiting_on.borrow_mut() = resource;
    }

    /// Moves a runnable process to `Waiting`. The body must then return
    /// [`Continuation::Yield`] to hand control back to the scheduler.
    ///
    /// # Panics
    ///
    /// Panics if the process is not `Runnable`.
    pub fn suspend(&self) {
        if self.is_carrier() {
            trace!(process = %self, "Suspend ignored for carrier process");
            return;
        }
        let state = self.state();
        assert!(
            state == ProcessState::Runnable,
            "cannot suspend {self}: process is {state:?}, expected Runnable"
        );
        self.inner.state.set(ProcessState::Waiting);
        debug!(process = %self, "Process suspended");
    }

    /// Moves a waiting process back to `Runnable` and schedules its next step
    /// at the current simulated time.
    ///
    /// # Panics
    ///
    /// Panics if the process is not `Waiting`.
    pub fn resume(&self, scheduler: &mut Scheduler) {
        if self.is_carrier() {
            trace!(process = %self, "Resume ignored for carrier process");
            return;
        }
        let state = self.state();
        assert!(
            state == ProcessState::Waiting,
            "cannot resume {self}: process is {state:?}, expected Waiting"
        );
        self.inner.state.set(ProcessState::Runnable);
        debug!(process = %self, time = %scheduler.time(), "Process resumed");
        self.schedule_step(SimTime::zero(), scheduler);
    }

    /// Suspends the process and resumes it `delay` later. Bodies use this to
    /// model time spent working while holding resources.
    pub fn hold(&self, delay: SimTime, scheduler: &mut Scheduler) {
        self.suspend();
        if self.is_carrier() {
            return;
        }
        let process = self.clone();
        scheduler.timeout(delay, move |scheduler| process.resume(scheduler));
    }

    /// Hands a modelled failure to the process and wakes it so its body can
    /// deal with it. A carrier only keeps the failure for its owner to take.
    ///
    /// Failures queue up until taken; none is dropped.
    pub(crate) fn raise_failure(&self, failure: SimFailure, scheduler: &mut Scheduler) {
        let pending = {
            let mut failures = self.inner.pending_failures.borrow_mut();
            failures.push_back(failure);
            failures.len()
        };
        if pending > 1 {
            trace!(process = %self, pending, "Earlier failures not taken yet");
        }
        if self.is_carrier() {
            return;
        }
        self.resume(scheduler);
    }

    /// Takes the oldest failure delivered while the process was waiting, if any.
    pub fn take_failure(&self) -> Option<SimFailure> {
        self.inner.pending_failures.borrow_mut().pop_front()
    }

    pub fn has_pending_failure(&self) -> bool {
        !self.inner.pending_failures.borrow().is_empty()
    }

    /// Number of delivered failures not taken yet.
    pub fn pending_failures(&self) -> usize {
        self.inner.pending_failures.borrow().len()
    }

    fn schedule_step(&self, delay: SimTime, scheduler: &mut Scheduler) {
        let process = self.clone();
        scheduler.timeout(delay, move |scheduler| process.run_step(scheduler));
    }

    fn run_step(&self, scheduler: &mut Scheduler) {
        let ProcessKind::LifeCycle(slot) = &self.inner.kind else {
            return;
        };
        let state = self.state();
        assert!(
            state == ProcessState::Runnable,
            "{self} was scheduled to run while {state:?}"
        );

        let id = self.inner.id.to_string();
        let _span = process_span(&self.inner.name, &id).entered();

        let mut body = slot
            .borrow_mut()
            .take()
            .expect("life-cycle body is only absent while it is running");
        let continuation = body.step(self, scheduler);
        *slot.borrow_mut() = Some(body);

        match continuation {
            Continuation::Yield => {
                assert!(
                    self.state() == ProcessState::Waiting,
                    "{self} yielded without suspending"
                );
                trace!(process = %self, "Process yielded");
            }
            Continuation::Done => {
                assert!(
                    self.state() == ProcessState::Runnable,
                    "{self} finished while {:?}",
                    self.state()
                );
                self.inner.state.set(ProcessState::Terminated);
                slot.borrow_mut().take();
                debug!(process = %self, time = %scheduler.time(), "Process terminated");
            }
        }
    }
}

impl PartialEq for SimProcess {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SimProcess {}

impl Hash for SimProcess {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for SimProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.inner.name, self.inner.id)
    }
}

impl fmt::Debug for SimProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimProcess")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("carrier", &self.is_carrier())
            .finish()
    }
}
