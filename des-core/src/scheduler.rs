use std::any::{type_name, Any};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::trace;
use uuid::Uuid;

use crate::error::{EventError, SimError};
use crate::ids::{IdGenerator, UUID_DOMAIN_TASK};
use crate::task::{ClosureTask, Task, TaskExecution, TaskHandle, TaskId, TaskWrapper, TimeoutTask};
use crate::types::EventId;
use crate::SimTime;

/// Entry stored in the scheduler's priority queue: which task runs and when.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventEntry {
    id: EventId,
    time: SimTime,
    task_id: TaskId,
}

impl EventEntry {
    pub(crate) fn id(&self) -> EventId {
        self.id
    }

    pub(crate) fn time(&self) -> SimTime {
        self.time
    }

    pub(crate) fn task_id(&self) -> TaskId {
        self.task_id
    }
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior in BinaryHeap. Same-time events pop in
        // scheduling order.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Scheduler keeps the current time and the upcoming events.
///
/// See the [crate-level documentation](index.html) for more information.
pub struct Scheduler {
    next_event_id: u64,
    events: BinaryHeap<EventEntry>,
    now: SimTime,
    ids: IdGenerator,
    pending_tasks: HashMap<TaskId, Box<dyn TaskExecution>>,
    completed_task_results: HashMap<TaskId, Box<dyn Any>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Scheduler {
    /// Creates a scheduler whose ids derive from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            next_event_id: 0,
            events: BinaryHeap::default(),
            now: SimTime::zero(),
            ids: IdGenerator::new(seed),
            pending_tasks: HashMap::new(),
            completed_task_results: HashMap::new(),
        }
    }

    #[must_use]
    pub fn time(&self) -> SimTime {
        self.now
    }

    /// Next deterministic id in `domain`, see [`crate::ids`].
    pub fn next_id(&mut self, domain: u64) -> Uuid {
        self.ids.next(domain)
    }

    /// Time of the next queued event, `None` once the queue is empty.
    ///
    /// Events of cancelled tasks stay queued until they are popped and skipped,
    /// so they count here.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.events.peek().map(|event| event.time)
    }

    /// Removes and returns the next scheduled event, advancing the clock to its time.
    pub(crate) fn pop(&mut self) -> Option<EventEntry> {
        let event = self.events.pop()?;
        self.now = event.time;
        Some(event)
    }

    /// Schedule a task to run `delay` after the current time.
    pub fn schedule_task<T: Task>(&mut self, delay: SimTime, task: T) -> TaskHandle<T::Output> {
        let task_id = TaskId(self.ids.next(UUID_DOMAIN_TASK));
        let time = self.time() + delay;
        self.schedule_task_at(time, task_id, Box::new(TaskWrapper::new(task)));
        TaskHandle::new(task_id)
    }

    fn schedule_task_at(&mut self, time: SimTime, task_id: TaskId, task: Box<dyn TaskExecution>) {
        self.pending_tasks.insert(task_id, task);
        self.next_event_id += 1;
        let id = EventId(self.next_event_id);
        trace!(event_id = %id, task_id = %task_id, time = %time, "Task scheduled");
        self.events.push(EventEntry { id, time, task_id });
    }

    /// Schedule a closure as a task
    pub fn schedule_closure<F, R>(&mut self, delay: SimTime, closure: F) -> TaskHandle<R>
    where
        F: FnOnce(&mut Scheduler) -> R + 'static,
        R: 'static,
    {
        self.schedule_task(delay, ClosureTask::new(closure))
    }

    /// Schedule a closure at the current time, behind everything already due now.
    pub fn schedule_now<F>(&mut self, closure: F) -> TaskHandle<()>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        self.schedule_task(SimTime::zero(), TimeoutTask::new(closure))
    }

    /// Schedule a timeout callback
    pub fn timeout<F>(&mut self, delay: SimTime, callback: F) -> TaskHandle<()>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        self.schedule_task(delay, TimeoutTask::new(callback))
    }

    /// Cancel a scheduled task. Returns `false` if it already ran or was cancelled.
    pub fn cancel_task<T>(&mut self, handle: TaskHandle<T>) -> bool {
        self.pending_tasks.remove(&handle.id()).is_some()
    }

    /// Whether the task behind `handle` is still waiting to run.
    pub fn is_pending<T>(&self, handle: TaskHandle<T>) -> bool {
        self.pending_tasks.contains_key(&handle.id())
    }

    /// Runs the task if it is still pending. Cancelled tasks are skipped.
    ///
    /// Only non-unit outputs are kept for collection.
    pub(crate) fn execute_task(&mut self, task_id: TaskId) -> bool {
        if let Some(task) = self.pending_tasks.remove(&task_id) {
            if let Some(result) = task.execute(self) {
                self.completed_task_results.insert(task_id, result);
            }
            true
        } else {
            trace!(task_id = %task_id, "Skipping cancelled task");
            false
        }
    }

    /// Get the result of a completed task. Tasks returning `()` have none.
    pub fn get_task_result<T: 'static>(&mut self, handle: TaskHandle<T>) -> Option<T> {
        self.take_task_result(handle).ok()
    }

    /// Like [`Scheduler::get_task_result`], but says why nothing came back.
    pub fn take_task_result<T: 'static>(&mut self, handle: TaskHandle<T>) -> Result<T, SimError> {
        let boxed = self
            .completed_task_results
            .remove(&handle.id())
            .ok_or_else(|| EventError::ResultNotFound(handle.id().to_string()))?;
        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| {
                EventError::TypeMismatch {
                    expected: type_name::<T>().to_string(),
                }
                .into()
            })
    }
}
