//! Integration tests for the Task system

use des_core::{EventError, Execute, Executor, SimError, SimTime, Simulation, Task, TaskHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

#[test]
fn test_task_execution_in_simulation() {
    let mut sim = Simulation::default();

    let executed = Rc::new(Cell::new(false));
    let executed_clone = executed.clone();

    // Schedule a task to execute after 100ms
    let _handle: TaskHandle<()> = sim.schedule_closure(
        SimTime::from_duration(Duration::from_millis(100)),
        move |_scheduler| executed_clone.set(true),
    );

    Executor::timed(SimTime::from_millis(200)).execute(&mut sim);

    assert!(executed.get());
}

#[test]
fn test_timeout_task_in_simulation() {
    let mut sim = Simulation::default();

    let fired_at = Rc::new(Cell::new(None));
    let fired_clone = fired_at.clone();

    sim.timeout(SimTime::from_millis(50), move |scheduler| {
        fired_clone.set(Some(scheduler.time()));
    });

    Executor::timed(SimTime::from_millis(100)).execute(&mut sim);

    assert_eq!(fired_at.get(), Some(SimTime::from_millis(50)));
}

#[test]
fn test_task_cancellation() {
    let mut sim = Simulation::default();

    let executed = Rc::new(Cell::new(false));
    let executed_clone = executed.clone();

    let handle = sim.schedule_closure(SimTime::from_millis(100), move |_scheduler| {
        executed_clone.set(true);
    });
    assert!(sim.scheduler().is_pending(handle));

    // Cancel the task before it executes
    assert!(sim.cancel_task(handle));
    assert!(!sim.cancel_task(handle));

    Executor::timed(SimTime::from_millis(200)).execute(&mut sim);

    assert!(!executed.get());
    assert!(sim.get_task_result(handle).is_none());
}

#[test]
fn test_multiple_tasks_execution_order() {
    let mut sim = Simulation::default();
    let execution_order = Rc::new(RefCell::new(Vec::new()));

    for (label, millis) in [(1, 100), (2, 50), (3, 150)] {
        let order = execution_order.clone();
        sim.schedule_closure(SimTime::from_millis(millis), move |_scheduler| {
            order.borrow_mut().push(label);
        });
    }

    Executor::timed(SimTime::from_millis(200)).execute(&mut sim);

    // Tasks should execute in time order: 2, 1, 3
    assert_eq!(*execution_order.borrow(), vec![2, 1, 3]);
}

#[test]
fn test_same_time_tasks_run_in_scheduling_order() {
    let mut sim = Simulation::default();
    let execution_order = Rc::new(RefCell::new(Vec::new()));

    for label in 0..10 {
        let order = execution_order.clone();
        sim.schedule_closure(SimTime::from_millis(5), move |_scheduler| {
            order.borrow_mut().push(label);
        });
    }

    sim.execute(Executor::unbound());
    assert_eq!(*execution_order.borrow(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_task_scheduling_from_within_task() {
    let mut sim = Simulation::default();

    let execution_count = Rc::new(Cell::new(0));
    let count_clone = execution_count.clone();

    // Schedule a task that schedules another task
    sim.schedule_closure(SimTime::from_millis(50), move |scheduler| {
        count_clone.set(count_clone.get() + 1);

        let count_inner = count_clone.clone();
        scheduler.schedule_closure(SimTime::from_millis(50), move |_scheduler| {
            count_inner.set(count_inner.get() + 1);
        });
    });

    Executor::timed(SimTime::from_millis(200)).execute(&mut sim);

    assert_eq!(execution_count.get(), 2);
    assert_eq!(sim.time(), SimTime::from_millis(100));
}

#[test]
fn test_schedule_now_runs_after_current_event() {
    let mut sim = Simulation::default();
    let log = Rc::new(RefCell::new(Vec::new()));

    let outer = log.clone();
    sim.timeout(SimTime::from_millis(1), move |scheduler| {
        let inner = outer.clone();
        scheduler.schedule_now(move |scheduler| inner.borrow_mut().push(("now", scheduler.time())));
        outer.borrow_mut().push(("outer", scheduler.time()));
    });

    sim.execute(Executor::unbound());
    assert_eq!(
        *log.borrow(),
        vec![
            ("outer", SimTime::from_millis(1)),
            ("now", SimTime::from_millis(1)),
        ]
    );
}

#[test]
fn test_task_with_return_value() {
    let mut sim = Simulation::default();

    let handle = sim.schedule_closure(SimTime::from_millis(50), |_scheduler| -> i32 { 42 });

    Executor::timed(SimTime::from_millis(100)).execute(&mut sim);

    assert_eq!(sim.get_task_result(handle), Some(42));
    // Results are handed out once.
    assert_eq!(sim.get_task_result(handle), None);
}

#[test]
fn test_missing_result_is_reported() {
    let mut sim = Simulation::default();
    let handle = sim.schedule_closure(SimTime::from_millis(50), |_scheduler| 7u8);

    let err = sim.scheduler_mut().take_task_result(handle).unwrap_err();
    assert!(matches!(err, SimError::Event(EventError::ResultNotFound(_))));
}

#[test]
fn test_custom_task_implementation() {
    struct CounterTask {
        count: i32,
    }

    impl Task for CounterTask {
        type Output = i32;

        fn execute(self, _scheduler: &mut des_core::Scheduler) -> Self::Output {
            self.count * 2
        }
    }

    let mut sim = Simulation::default();

    let handle = sim
        .scheduler_mut()
        .schedule_task(SimTime::from_millis(50), CounterTask { count: 21 });

    Executor::timed(SimTime::from_millis(100)).execute(&mut sim);

    assert_eq!(sim.get_task_result(handle), Some(42));
}

#[test]
fn test_unit_task_results_are_not_kept() {
    let mut sim = Simulation::default();
    let fired = Rc::new(Cell::new(0));

    for i in 0..10_000 {
        let fired = fired.clone();
        sim.timeout(SimTime::from_micros(i), move |_scheduler| fired.set(fired.get() + 1));
    }
    let last = sim.timeout(SimTime::from_secs(1), |_scheduler| {});

    let summary = sim.execute(Executor::unbound());

    assert_eq!(summary.steps, 10_001);
    assert_eq!(fired.get(), 10_000);
    assert_eq!(sim.get_task_result(last), None);
}
