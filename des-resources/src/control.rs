//! Simulation-control gate.
//!
//! The resource layer only ever asks one question of the surrounding
//! simulation control: is the run still going? Once it is not, acquire and
//! release stop contending so in-flight processes can finish.

use std::cell::Cell;
use std::rc::Rc;

pub trait SimulationControl {
    fn is_running(&self) -> bool;
}

/// Shared on/off switch implementing [`SimulationControl`].
///
/// Clones share the same flag, so the driver can keep one copy and hand
/// another to every resource.
#[derive(Debug, Clone)]
pub struct SimulationGate {
    running: Rc<Cell<bool>>,
}

impl Default for SimulationGate {
    fn default() -> Self {
        Self {
            running: Rc::new(Cell::new(true)),
        }
    }
}

impl SimulationGate {
    /// A gate that starts out running.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn start(&self) {
        self.running.set(true);
    }
}

impl SimulationControl for SimulationGate {
    fn is_running(&self) -> bool {
        self.running.get()
    }
}
