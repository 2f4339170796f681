//! Command dispatcher tests.
//!
//! Drive the full init / run / teardown lifecycle against the recording
//! driver and check the exact driver call sequence for each command.

mod common;

use common::{Call, Probe, RecordingDriver, fast_config};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use stepctl::dispatcher::CommandDispatcher;
use stepctl::driver_registry::DriverRegistry;
use stepctl::error::ControlError;
use stepctl_common::command::{Command, CommandKind};
use stepctl_common::config::{ControllerConfig, TargetPolicy};
use stepctl_common::driver::{DriverError, NullEvents};

fn start(config: &ControllerConfig) -> (CommandDispatcher, Probe) {
    let (driver, probe) = RecordingDriver::new();
    let dispatcher =
        CommandDispatcher::init_with_driver(Box::new(driver), config, Arc::new(NullEvents))
            .expect("init");
    (dispatcher, probe)
}

fn input(lines: &str) -> Cursor<Vec<u8>> {
    Cursor::new(lines.as_bytes().to_vec())
}

#[test]
fn init_configures_then_homes() {
    let config = fast_config();
    let (dispatcher, probe) = start(&config);

    assert_eq!(
        probe.commands(),
        vec![
            Call::Open,
            Call::WaitForAttach,
            Call::Acceleration(config.motor.acceleration),
            Call::VelocityLimit(config.motor.velocity_limit),
            Call::CurrentLimit(config.motor.current_limit),
            Call::Engaged(false),
            Call::SetPosition(5500),
            Call::Engaged(true),
            Call::Target(0),
        ]
    );
    assert_eq!(probe.position(), 0);
    assert!(dispatcher.watchdog().is_some());

    dispatcher.teardown().unwrap();
}

#[test]
fn move_disengage_move_scenario() {
    let (mut dispatcher, probe) = start(&fast_config());
    probe.clear();

    let summary = dispatcher.run(input("100\n-2\n100\n")).unwrap();

    assert_eq!(
        probe.commands(),
        vec![
            Call::Target(100),
            Call::Engaged(false),
            Call::Engaged(true),
            Call::Target(100),
        ]
    );
    // Already at 100: a single read, no waiting
    let calls = probe.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[Call::Target(100), Call::ReadPosition]
    );

    let snap = dispatcher.controller().snapshot();
    assert!(snap.engaged);
    assert_eq!(snap.target_position, Some(100));
    assert_eq!(summary.count(CommandKind::MoveTo), 2);
    assert_eq!(summary.count(CommandKind::Disengage), 1);

    dispatcher.teardown().unwrap();
}

#[test]
fn repeated_move_does_not_cycle_engagement() {
    let (mut dispatcher, probe) = start(&fast_config());
    dispatcher.run(input("42\n")).unwrap();
    probe.clear();

    dispatcher.run(input("42\n42\n")).unwrap();
    assert_eq!(probe.commands(), vec![Call::Target(42), Call::Target(42)]);
    assert_eq!(probe.positions(), Vec::<i64>::new());
}

#[test]
fn reset_from_any_position_returns_to_origin() {
    for start_at in [0, 17, 3000, -250] {
        let (mut dispatcher, probe) = start(&fast_config());
        dispatcher.dispatch(Command::MoveTo(start_at)).unwrap();
        probe.clear();

        dispatcher.run(input("-1\n")).unwrap();

        assert_eq!(
            probe.commands(),
            vec![
                Call::Engaged(false),
                Call::SetPosition(5500),
                Call::Engaged(true),
                Call::Target(0),
            ]
        );
        assert_eq!(probe.position(), 0);
        let snap = dispatcher.controller().snapshot();
        assert!(snap.engaged);
        assert_eq!(snap.target_position, Some(0));
    }
}

#[test]
fn make_noise_steps_out_and_back() {
    let (mut dispatcher, probe) = start(&fast_config());
    dispatcher.run(input("200\n")).unwrap();
    probe.clear();

    dispatcher.run(input("-4\n")).unwrap();

    assert_eq!(probe.commands(), vec![Call::Target(250), Call::Target(200)]);
    assert_eq!(probe.positions(), vec![250, 200]);
    assert_eq!(probe.position(), 200);
    assert_eq!(
        dispatcher.controller().snapshot().target_position,
        Some(200)
    );
}

#[test]
fn make_noise_at_end_stop_under_bounded_policies() {
    for policy in [TargetPolicy::Reject, TargetPolicy::Clamp] {
        let mut config = fast_config();
        config.motor.target_policy = policy;
        let (mut dispatcher, probe) = start(&config);
        dispatcher.run(input("5500\n")).unwrap();
        probe.clear();

        dispatcher.run(input("-4\n")).unwrap();

        assert_eq!(
            probe.commands(),
            vec![Call::Target(5550), Call::Target(5500)],
            "{policy:?}"
        );
        assert_eq!(probe.positions(), vec![5550, 5500], "{policy:?}");
    }
}

#[test]
fn make_noise_near_integer_limit_steps_back() {
    let (mut dispatcher, probe) = start(&fast_config());
    let origin = i64::MAX - 10;
    dispatcher.dispatch(Command::MoveTo(origin)).unwrap();
    probe.clear();

    dispatcher.run(input("-4\n")).unwrap();

    assert_eq!(
        probe.commands(),
        vec![Call::Target(origin - 50), Call::Target(origin)]
    );
    assert_eq!(probe.position(), origin);
}

#[test]
fn control_values_never_become_targets() {
    let (mut dispatcher, probe) = start(&fast_config());
    dispatcher.run(input("-2\n")).unwrap();
    probe.clear();

    dispatcher.run(input("-3\n")).unwrap();

    assert_eq!(probe.commands(), vec![Call::Engaged(true)]);
    assert!(probe.engaged());
    assert_eq!(
        dispatcher.controller().snapshot().target_position,
        Some(0)
    );
}

#[test]
fn negative_non_reserved_values_are_targets() {
    let (mut dispatcher, probe) = start(&fast_config());
    probe.clear();

    dispatcher.run(input("-5\n")).unwrap();
    assert_eq!(probe.commands(), vec![Call::Target(-5)]);
    assert_eq!(probe.position(), -5);
}

#[test]
fn malformed_line_stops_before_next_command() {
    let (mut dispatcher, probe) = start(&fast_config());
    probe.clear();

    let result = dispatcher.run(input("100\nabc\n200\n"));
    match result {
        Err(ControlError::Parse(e)) => assert_eq!(e.line, "abc"),
        other => panic!("expected parse error, got {other:?}"),
    }
    assert_eq!(probe.commands(), vec![Call::Target(100)]);
    assert_eq!(
        dispatcher.controller().snapshot().target_position,
        Some(100)
    );
}

#[test]
fn blank_line_is_malformed() {
    let (mut dispatcher, _probe) = start(&fast_config());
    assert!(matches!(
        dispatcher.run(input("\n")),
        Err(ControlError::Parse(_))
    ));
}

#[test]
fn driver_error_is_fatal() {
    let (mut dispatcher, probe) = start(&fast_config());
    probe.fail_target(DriverError::Device {
        code: 9,
        description: "motor stalled".to_string(),
    });

    let err = dispatcher.run(input("10\n20\n")).unwrap_err();
    assert_eq!(err.code(), 9);
    assert!(matches!(err, ControlError::Driver(_)));
}

#[test]
fn stalled_move_times_out() {
    let mut config = fast_config();
    config.motor.move_timeout_ms = Some(20);
    let (mut dispatcher, probe) = start(&config);
    probe.stall();

    let err = dispatcher.run(input("100\n-3\n")).unwrap_err();
    assert!(matches!(err, ControlError::MoveTimeout { target: 100, .. }));
    // The engage on the next line was never read
    assert_eq!(probe.commands().last(), Some(&Call::Target(100)));
}

#[test]
fn attach_failure_releases_driver() {
    let (driver, probe) = RecordingDriver::new();
    probe.fail_attach();

    let result =
        CommandDispatcher::init_with_driver(Box::new(driver), &fast_config(), Arc::new(NullEvents));

    assert!(matches!(
        result,
        Err(ControlError::Driver(DriverError::AttachTimeout(_)))
    ));
    assert_eq!(
        probe.commands(),
        vec![Call::Open, Call::WaitForAttach, Call::Close]
    );
}

#[test]
fn teardown_disengages_then_closes_once() {
    let (dispatcher, probe) = start(&fast_config());
    probe.clear();

    dispatcher.teardown().unwrap();
    assert_eq!(probe.commands(), vec![Call::Engaged(false), Call::Close]);
    assert!(!probe.engaged());
}

#[test]
fn drop_tears_down() {
    let (dispatcher, probe) = start(&fast_config());
    probe.clear();

    drop(dispatcher);
    assert_eq!(probe.commands(), vec![Call::Engaged(false), Call::Close]);
}

#[test]
fn end_of_input_returns_summary() {
    let (mut dispatcher, _probe) = start(&fast_config());
    let summary = dispatcher.run(input("")).unwrap();
    assert_eq!(summary.total(), 0);
}

#[test]
fn simulation_driver_end_to_end() {
    let config = fast_config();
    let registry = DriverRegistry::with_builtin();
    let mut dispatcher =
        CommandDispatcher::init(&registry, &config, Arc::new(NullEvents)).expect("init");

    let controller = dispatcher.controller();
    assert_eq!(controller.current_position().unwrap(), 0);

    let summary = dispatcher
        .run(input("100\n-2\n100\n-4\n4000\n-1\n"))
        .unwrap();
    assert_eq!(summary.total(), 6);
    assert_eq!(controller.current_position().unwrap(), 0);
    assert!(controller.snapshot().engaged);

    dispatcher.teardown().unwrap();
    assert!(controller.snapshot().closed);
}

#[test]
fn unknown_driver_fails_init() {
    let mut config = fast_config();
    config.driver.name = "phidget".to_string();
    let registry = DriverRegistry::with_builtin();

    let result = CommandDispatcher::init(&registry, &config, Arc::new(NullEvents));
    assert!(matches!(
        result,
        Err(ControlError::Driver(DriverError::DriverNotFound(_)))
    ));
}

#[test]
fn simulated_attach_timeout() {
    let mut config = fast_config();
    config.driver.attach_timeout_ms = 10;
    config.driver.simulation.fail_attach = true;
    let registry = DriverRegistry::with_builtin();

    let started = std::time::Instant::now();
    let result = CommandDispatcher::init(&registry, &config, Arc::new(NullEvents));
    assert!(matches!(
        result,
        Err(ControlError::Driver(DriverError::AttachTimeout(_)))
    ));
    assert!(started.elapsed() >= Duration::from_millis(10));
}
