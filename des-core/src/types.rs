//! Core newtypes shared by the scheduler and its callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequence number of a scheduled event.
///
/// Assigned in scheduling order; events with the same timestamp run in
/// ascending `EventId` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.0)
    }
}
