//! Observer registry for passive resources.
//!
//! Sensors are notified on every request, acquisition and release. They are
//! receivers only: a notification carries the process and the amount, and a
//! sensor that calls back into the resource that notified it panics.

use std::rc::Rc;
use tracing::trace;

use crate::process::SimProcess;

/// Listener for passive resource events.
pub trait PassiveResourceSensor {
    /// A process asked for `amount` units. Fired before the grant decision,
    /// so it is seen for requests that end up waiting too.
    fn on_request(&self, process: &SimProcess, amount: u64);

    /// `amount` units were handed to `process`; the capacity is already reduced.
    fn on_acquire(&self, process: &SimProcess, amount: u64);

    /// `process` returned `amount` units; the capacity is already increased.
    fn on_release(&self, process: &SimProcess, amount: u64);
}

fn same_sensor(a: &Rc<dyn PassiveResourceSensor>, b: &Rc<dyn PassiveResourceSensor>) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// Set of sensors attached to one resource. Registration is by handle
/// identity; listeners are notified in no particular guaranteed order.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Vec<Rc<dyn PassiveResourceSensor>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `observer` unless that same handle is already registered.
    pub fn add(&mut self, observer: Rc<dyn PassiveResourceSensor>) -> bool {
        if self.observers.iter().any(|o| same_sensor(o, &observer)) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Removes `observer`. Removing a handle that is not registered is a no-op.
    pub fn remove(&mut self, observer: &Rc<dyn PassiveResourceSensor>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !same_sensor(o, observer));
        before != self.observers.len()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn fire_request(&self, process: &SimProcess, amount: u64) {
        trace!(listeners = self.len(), process = %process, amount, "Fan-out request");
        for observer in &self.observers {
            observer.on_request(process, amount);
        }
    }

    pub fn fire_acquire(&self, process: &SimProcess, amount: u64) {
        trace!(listeners = self.len(), process = %process, amount, "Fan-out acquire");
        for observer in &self.observers {
            observer.on_acquire(process, amount);
        }
    }

    pub fn fire_release(&self, process: &SimProcess, amount: u64) {
        trace!(listeners = self.len(), process = %process, amount, "Fan-out release");
        for observer in &self.observers {
            observer.on_release(process, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use des_core::Scheduler;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Tally {
        events: RefCell<Vec<(&'static str, u64)>>,
    }

    impl PassiveResourceSensor for Tally {
        fn on_request(&self, _process: &SimProcess, amount: u64) {
            self.events.borrow_mut().push(("request", amount));
        }

        fn on_acquire(&self, _process: &SimProcess, amount: u64) {
            self.events.borrow_mut().push(("acquire", amount));
        }

        fn on_release(&self, _process: &SimProcess, amount: u64) {
            self.events.borrow_mut().push(("release", amount));
        }
    }

    #[test]
    fn test_fan_out_reaches_every_listener() {
        let mut scheduler = Scheduler::default();
        let process = SimProcess::carrier(&mut scheduler, "carrier");
        let a = Rc::new(Tally::default());
        let b = Rc::new(Tally::default());

        let mut registry = ObserverRegistry::new();
        registry.add(a.clone());
        registry.add(b.clone());
        registry.fire_request(&process, 2);
        registry.fire_acquire(&process, 2);
        registry.fire_release(&process, 2);

        let expected = vec![("request", 2), ("acquire", 2), ("release", 2)];
        assert_eq!(*a.events.borrow(), expected);
        assert_eq!(*b.events.borrow(), expected);
    }

    #[test]
    fn test_duplicate_add_and_idempotent_remove() {
        let tally: Rc<dyn PassiveResourceSensor> = Rc::new(Tally::default());
        let stranger: Rc<dyn PassiveResourceSensor> = Rc::new(Tally::default());

        let mut registry = ObserverRegistry::new();
        assert!(registry.add(tally.clone()));
        assert!(!registry.add(tally.clone()));
        assert_eq!(registry.len(), 1);

        assert!(!registry.remove(&stranger));
        assert!(registry.remove(&tally));
        assert!(!registry.remove(&tally));
        assert!(registry.is_empty());
    }
}
