//! Fair passive resources for discrete event simulation.
//!
//! This crate resolves contention between simulated processes for finite,
//! shared resources on top of the `des-core` engine. It provides:
//!
//! - [`SimProcess`]: a unit of simulated work that can suspend while waiting
//!   and be resumed later, driven by a [`LifeCycle`] body.
//! - [`PassiveResource`]: a pool of units granted in strict arrival order,
//!   with optional acquisition timeouts that turn long waits into
//!   [`SimFailure`]s.
//! - [`PassiveResourceSensor`]: observers notified on every request,
//!   acquisition and release.
//! - [`SimulationControl`]: the gate that switches contention off once the
//!   run is shutting down.
//!
//! Everything runs on the single simulation thread; handles are `Rc` based
//! and clones share state.

pub mod config;
pub mod control;
pub mod error;
pub mod failure;
pub mod observer;
pub mod passive;
pub mod process;
pub mod timeout;

pub use config::{PassiveResourceConfig, ResourceId};
pub use control::{SimulationControl, SimulationGate};
pub use error::ResourceError;
pub use failure::{DefaultFailureCatalog, FailureCatalog, FailureType, SimFailure};
pub use observer::{ObserverRegistry, PassiveResourceSensor};
pub use passive::{PassiveResource, WaitingId, WaitingProcess};
pub use process::{Continuation, LifeCycle, ProcessId, ProcessState, SimProcess};
pub use timeout::AcquireTimeout;
