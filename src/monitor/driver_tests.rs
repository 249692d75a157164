//! Tests for the monitor lifecycle using a scripted backend.

use super::*;
use crate::monitor::ChangeKind;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// One scripted response of the mock backend.
enum Step {
    Events(Vec<ChangeEvent>),
    TimedOut,
    Interrupted,
    Fail(MonitorError),
}

/// A backend replaying a script, counting how often it is released.
struct MockBackend {
    steps: VecDeque<Step>,
    released: Rc<Cell<usize>>,
}

impl Backend for MockBackend {
    fn process(
        &mut self,
        _timeout: Option<Duration>,
        emit: &mut dyn FnMut(ChangeEvent),
    ) -> Result<ProcessOutcome, MonitorError> {
        match self.steps.pop_front() {
            Some(Step::Events(events)) => {
                let count = events.len();
                for event in events {
                    emit(event);
                }
                Ok(ProcessOutcome::Processed(count))
            }
            Some(Step::Interrupted) => Ok(ProcessOutcome::Interrupted),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::TimedOut) | None => Ok(ProcessOutcome::TimedOut),
        }
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

/// Shared observations of a test monitor.
#[derive(Default, Clone)]
struct Probe {
    events: Rc<RefCell<Vec<ChangeEvent>>>,
    opened: Rc<Cell<usize>>,
    released: Rc<Cell<usize>>,
}

fn monitor_with(steps: Vec<Step>) -> (Monitor<MockBackend>, Probe) {
    let probe = Probe::default();
    let sink = Rc::clone(&probe.events);
    let opened = Rc::clone(&probe.opened);
    let released = Rc::clone(&probe.released);
    let mut steps = Some(steps);

    let monitor = Monitor::with_backend(
        move |event| sink.borrow_mut().push(event),
        move || {
            opened.set(opened.get() + 1);
            Ok(MockBackend {
                steps: steps.take().unwrap_or_default().into(),
                released: Rc::clone(&released),
            })
        },
    );
    (monitor, probe)
}

fn eth1_added() -> ChangeEvent {
    ChangeEvent::added("eth1", "10.0.0.2".parse().unwrap())
}

mod lifecycle {
    use super::*;

    #[test]
    fn new_monitor_is_created_without_opening_backend() {
        let (monitor, probe) = monitor_with(vec![]);

        assert_eq!(monitor.state(), MonitorState::Created);
        assert!(!monitor.is_running());
        assert_eq!(monitor.last_error_code(), 0);
        assert_eq!(monitor.last_error_message(), "");
        assert_eq!(probe.opened.get(), 0);
    }

    #[test]
    fn start_opens_exactly_one_backend() {
        let (mut monitor, probe) = monitor_with(vec![]);

        monitor.start().unwrap();

        assert_eq!(monitor.state(), MonitorState::Running);
        assert_eq!(probe.opened.get(), 1);
    }

    #[test]
    fn second_start_is_rejected_and_recorded() {
        let (mut monitor, probe) = monitor_with(vec![]);
        monitor.start().unwrap();

        let result = monitor.start();

        assert!(matches!(
            result,
            Err(MonitorError::InvalidState {
                operation: "start",
                state: MonitorState::Running
            })
        ));
        assert_eq!(monitor.last_error_code(), 16);
        assert!(monitor.is_running());
        assert_eq!(probe.opened.get(), 1);
    }

    #[test]
    fn failed_open_leaves_monitor_created() {
        let mut attempts = 0;
        let mut monitor: Monitor<MockBackend> = Monitor::with_backend(
            |_| {},
            move || {
                attempts += 1;
                if attempts == 1 {
                    Err(MonitorError::Unsupported)
                } else {
                    Ok(MockBackend {
                        steps: VecDeque::new(),
                        released: Rc::default(),
                    })
                }
            },
        );

        assert!(matches!(monitor.start(), Err(MonitorError::Unsupported)));
        assert_eq!(monitor.state(), MonitorState::Created);
        assert_eq!(monitor.last_error_code(), 99);

        monitor.start().unwrap();
        assert!(monitor.is_running());
    }

    #[test]
    fn stop_releases_backend_once() {
        let (mut monitor, probe) = monitor_with(vec![]);
        monitor.start().unwrap();

        monitor.stop().unwrap();

        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert_eq!(probe.released.get(), 1);
    }

    #[test]
    fn second_stop_reports_not_running_without_side_effects() {
        let (mut monitor, probe) = monitor_with(vec![]);
        monitor.start().unwrap();
        monitor.stop().unwrap();

        let result = monitor.stop();

        assert!(matches!(result, Err(MonitorError::NotRunning)));
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert_eq!(probe.released.get(), 1);
    }

    #[test]
    fn stopped_monitor_cannot_restart() {
        let (mut monitor, probe) = monitor_with(vec![]);
        monitor.start().unwrap();
        monitor.stop().unwrap();

        assert!(monitor.start().is_err());
        assert_eq!(probe.opened.get(), 1);
    }

    #[test]
    fn drop_releases_running_backend() {
        let (mut monitor, probe) = monitor_with(vec![]);
        monitor.start().unwrap();

        drop(monitor);

        assert_eq!(probe.released.get(), 1);
    }

    #[test]
    fn destroy_after_stop_does_not_release_twice() {
        let (mut monitor, probe) = monitor_with(vec![]);
        monitor.start().unwrap();
        monitor.stop().unwrap();

        monitor.destroy();

        assert_eq!(probe.released.get(), 1);
    }

    #[test]
    fn destroy_without_start_opens_nothing() {
        let (monitor, probe) = monitor_with(vec![]);

        monitor.destroy();

        assert_eq!(probe.opened.get(), 0);
        assert_eq!(probe.released.get(), 0);
    }

    #[test]
    fn missing_callback_is_rejected() {
        let result = Monitor::from_callback(None);
        assert!(matches!(result, Err(MonitorError::MissingCallback)));
    }

    #[test]
    fn present_callback_creates_monitor() {
        let monitor = Monitor::from_callback(Some(Box::new(|_| {}))).unwrap();
        assert_eq!(monitor.state(), MonitorState::Created);
    }

    #[test]
    fn state_displays_lowercase() {
        assert_eq!(MonitorState::Created.to_string(), "created");
        assert_eq!(MonitorState::Running.to_string(), "running");
        assert_eq!(MonitorState::Stopped.to_string(), "stopped");
    }
}

mod process {
    use super::*;

    #[test]
    fn process_before_start_reports_not_running() {
        let (mut monitor, _) = monitor_with(vec![]);

        let result = monitor.process(Some(Duration::ZERO));

        assert!(matches!(result, Err(MonitorError::NotRunning)));
        assert_eq!(monitor.last_error_code(), 3);
        assert_eq!(monitor.state(), MonitorState::Created);
    }

    #[test]
    fn delivers_single_added_event() {
        let (mut monitor, probe) = monitor_with(vec![Step::Events(vec![eth1_added()])]);
        monitor.start().unwrap();

        let outcome = monitor.process(Some(Duration::from_millis(100))).unwrap();

        assert_eq!(outcome, ProcessOutcome::Processed(1));
        let events = probe.events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].interface, "eth1");
        assert_eq!(events[0].address.to_string(), "10.0.0.2");
        assert_eq!(events[0].kind, ChangeKind::Added);
    }

    #[test]
    fn delivers_events_in_backend_order() {
        let (mut monitor, probe) = monitor_with(vec![Step::Events(vec![
            ChangeEvent::removed("eth0", "192.168.1.5".parse().unwrap()),
            ChangeEvent::added("eth0", "192.168.1.6".parse().unwrap()),
        ])]);
        monitor.start().unwrap();

        monitor.process(None).unwrap();

        let kinds: Vec<_> = probe.events.borrow().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [ChangeKind::Removed, ChangeKind::Added]);
    }

    #[test]
    fn quiet_backend_times_out_without_events() {
        let (mut monitor, probe) = monitor_with(vec![Step::TimedOut]);
        monitor.start().unwrap();

        let outcome = monitor.process(Some(Duration::from_millis(100))).unwrap();

        assert_eq!(outcome, ProcessOutcome::TimedOut);
        assert!(probe.events.borrow().is_empty());
        assert!(monitor.is_running());
    }

    #[test]
    fn fatal_error_stops_monitor_and_releases_backend() {
        let (mut monitor, probe) = monitor_with(vec![Step::Fail(MonitorError::Disconnected)]);
        monitor.start().unwrap();

        let result = monitor.process(Some(Duration::ZERO));

        assert!(matches!(result, Err(MonitorError::Disconnected)));
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert_eq!(probe.released.get(), 1);
        assert_eq!(monitor.last_error_code(), 32);
        assert!(monitor.last_error_message().contains("disconnected"));
    }

    #[test]
    fn non_fatal_error_keeps_monitor_running() {
        let (mut monitor, probe) =
            monitor_with(vec![Step::Fail(MonitorError::Protocol { errno: 1 })]);
        monitor.start().unwrap();

        assert!(monitor.process(Some(Duration::ZERO)).is_err());

        assert!(monitor.is_running());
        assert_eq!(probe.released.get(), 0);
        assert_eq!(monitor.last_error().unwrap().code, 1);
    }

    #[test]
    fn last_error_is_overwritten_by_next_failure() {
        let (mut monitor, _) = monitor_with(vec![Step::Fail(MonitorError::Protocol { errno: 7 })]);
        monitor.start().unwrap();
        let _ = monitor.start();
        assert_eq!(monitor.last_error_code(), 16);

        let _ = monitor.process(Some(Duration::ZERO));

        assert_eq!(monitor.last_error_code(), 7);
    }
}

mod process_blocking {
    use super::*;

    #[test]
    fn requires_running_monitor() {
        let (mut monitor, _) = monitor_with(vec![]);
        assert!(matches!(
            monitor.process_blocking(),
            Err(MonitorError::NotRunning)
        ));
    }

    /// A monitor whose callback counts events and requests shutdown.
    fn self_stopping(steps: Vec<Step>) -> (Monitor<MockBackend>, Rc<Cell<usize>>) {
        let shutdown = ShutdownHandle::new();
        let trigger = shutdown.clone();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let mut steps = Some(steps);

        let monitor = Monitor::with_backend(
            move |_| {
                counter.set(counter.get() + 1);
                trigger.trigger();
            },
            move || {
                Ok(MockBackend {
                    steps: steps.take().unwrap_or_default().into(),
                    released: Rc::default(),
                })
            },
        )
        .with_shutdown(shutdown)
        .with_slice(Duration::from_millis(10))
        .with_interrupt_backoff(Duration::from_millis(1));
        (monitor, seen)
    }

    #[test]
    fn ends_when_shutdown_is_triggered() {
        let (mut monitor, seen) = self_stopping(vec![
            Step::TimedOut,
            Step::Events(vec![eth1_added()]),
            Step::Events(vec![eth1_added()]),
        ]);
        monitor.start().unwrap();

        monitor.process_blocking().unwrap();

        assert_eq!(seen.get(), 1);
        assert!(monitor.is_running());
    }

    #[test]
    fn interrupted_wait_is_retried() {
        let (mut monitor, seen) =
            self_stopping(vec![Step::Interrupted, Step::Events(vec![eth1_added()])]);
        monitor.start().unwrap();

        monitor.process_blocking().unwrap();

        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn already_triggered_handle_returns_immediately() {
        let (mut monitor, seen) = self_stopping(vec![Step::Events(vec![eth1_added()])]);
        monitor.start().unwrap();
        monitor.shutdown_handle().trigger();

        monitor.process_blocking().unwrap();

        assert_eq!(seen.get(), 0);
    }

    #[test]
    fn fatal_error_aborts_loop_and_stops_monitor() {
        let (mut monitor, probe) = monitor_with(vec![
            Step::Events(vec![eth1_added()]),
            Step::Fail(MonitorError::last_os_error("recv")),
        ]);
        monitor = monitor.with_slice(Duration::from_millis(1));
        monitor.start().unwrap();

        let result = monitor.process_blocking();

        assert!(matches!(result, Err(MonitorError::Io { .. })));
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert_eq!(probe.events.borrow().len(), 1);
        assert_eq!(probe.released.get(), 1);
    }
}

mod shutdown_handle {
    use super::*;

    #[test]
    fn clones_share_flag() {
        let handle = ShutdownHandle::new();
        let clone = handle.clone();

        assert!(!handle.is_triggered());
        clone.trigger();
        assert!(handle.is_triggered());
    }

    #[test]
    fn is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ShutdownHandle>();
    }
}
