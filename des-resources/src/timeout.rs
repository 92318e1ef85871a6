//! Timeout events for waiting acquisitions.

use des_core::{Scheduler, SimTime, Task};
use serde::{Deserialize, Serialize};
use std::rc::Weak;
use tracing::{instrument, trace, warn};

use crate::passive::{PassiveResource, ResourceShared, WaitingId};

/// Timeout policy of one acquire call.
///
/// Timeouts only take effect when failure simulation is enabled for the
/// resource; otherwise every request may wait indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AcquireTimeout {
    /// Wait as long as it takes.
    #[default]
    Disabled,
    /// Give up after the given delay. A zero delay fails at once if the
    /// request cannot be granted immediately.
    After(SimTime),
}

impl AcquireTimeout {
    /// Maps the `(enabled, value)` pair found in model files.
    pub fn new(enabled: bool, value: SimTime) -> Self {
        if enabled {
            AcquireTimeout::After(value)
        } else {
            AcquireTimeout::Disabled
        }
    }
}

/// Scheduled event guarding one wait-queue entry.
///
/// When it fires while its entry is still queued, the entry is removed and a
/// resource-timeout failure is raised on the waiting process. If the entry
/// was granted or cancelled first the event does nothing.
pub(crate) struct ResourceTimeout {
    resource: Weak<ResourceShared>,
    waiting_id: WaitingId,
    deadline: SimTime,
}

impl ResourceTimeout {
    pub(crate) fn new(resource: &PassiveResource, waiting_id: WaitingId, deadline: SimTime) -> Self {
        Self {
            resource: resource.downgrade(),
            waiting_id,
            deadline,
        }
    }
}

impl Task for ResourceTimeout {
    type Output = ();

    #[instrument(skip_all, fields(waiting = %self.waiting_id, deadline = %self.deadline))]
    fn execute(self, scheduler: &mut Scheduler) {
        debug_assert_eq!(scheduler.time(), self.deadline);
        let Some(resource) = PassiveResource::upgrade(&self.resource) else {
            trace!("Resource dropped before timeout");
            return;
        };
        let Some(entry) = resource.remove(self.waiting_id) else {
            trace!(resource = %resource, "Entry no longer waiting, timeout ignored");
            return;
        };

        let failure = resource.timeout_failure(entry.process(), scheduler.time());
        warn!(
            resource = %resource,
            process = %entry.process(),
            waited = ?(scheduler.time() - entry.enqueued_at()),
            "Resource acquisition timed out"
        );
        entry.process().raise_failure(failure, scheduler);
    }
}
