//! Task system for one-shot scheduled work
//!
//! Tasks are the only kind of event the scheduler runs. A task executes once
//! at its scheduled time, may schedule further tasks, and a non-unit result
//! is kept by the scheduler until collected through the matching
//! [`TaskHandle`].
//!
//! Process continuations and resource timeouts are both expressed as tasks.

use crate::Scheduler;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use tracing::{instrument, trace};
use uuid::Uuid;

/// Unique identifier for tasks.
///
/// Assigned by the scheduler from the simulation seed, so identical runs see
/// identical task ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub Uuid);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// Handle for a scheduled task, allowing cancellation and type-safe result retrieval
pub struct TaskHandle<T> {
    id: TaskId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TaskHandle<T> {}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish()
    }
}

/// Trait for tasks that can be executed by the scheduler
pub trait Task: 'static {
    /// The type returned by this task
    type Output: 'static;

    fn execute(self, scheduler: &mut Scheduler) -> Self::Output;
}

/// Type-erased task execution. Returns the output to keep, if any.
pub(crate) trait TaskExecution {
    fn execute(self: Box<Self>, scheduler: &mut Scheduler) -> Option<Box<dyn Any>>;
}

pub(crate) struct TaskWrapper<T: Task> {
    task: T,
}

impl<T: Task> TaskWrapper<T> {
    pub(crate) fn new(task: T) -> Self {
        Self { task }
    }
}

impl<T: Task> TaskExecution for TaskWrapper<T> {
    fn execute(self: Box<Self>, scheduler: &mut Scheduler) -> Option<Box<dyn Any>> {
        let output = self.task.execute(scheduler);
        if TypeId::of::<T::Output>() == TypeId::of::<()>() {
            return None;
        }
        Some(Box::new(output))
    }
}

/// A task that executes a closure and keeps its return value
pub struct ClosureTask<F, R> {
    closure: F,
    _marker: PhantomData<fn() -> R>,
}

impl<F, R> ClosureTask<F, R>
where
    F: FnOnce(&mut Scheduler) -> R + 'static,
    R: 'static,
{
    pub fn new(closure: F) -> Self {
        Self {
            closure,
            _marker: PhantomData,
        }
    }
}

impl<F, R> Task for ClosureTask<F, R>
where
    F: FnOnce(&mut Scheduler) -> R + 'static,
    R: 'static,
{
    type Output = R;

    #[instrument(skip(self, scheduler), fields(task_type = "ClosureTask", time = %scheduler.time()))]
    fn execute(self, scheduler: &mut Scheduler) -> Self::Output {
        trace!("Executing closure task");
        (self.closure)(scheduler)
    }
}

/// A callback that fires once after a delay.
///
/// This is the event-scheduler contract the resource layer relies on for
/// timeouts: the callback runs at `schedule time + delay`, in global event
/// order.
pub struct TimeoutTask<F> {
    callback: F,
}

impl<F> TimeoutTask<F>
where
    F: FnOnce(&mut Scheduler) + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> Task for TimeoutTask<F>
where
    F: FnOnce(&mut Scheduler) + 'static,
{
    type Output = ();

    #[instrument(skip(self, scheduler), fields(task_type = "TimeoutTask", time = %scheduler.time()))]
    fn execute(self, scheduler: &mut Scheduler) -> Self::Output {
        trace!("Executing timeout task");
        (self.callback)(scheduler);
    }
}
