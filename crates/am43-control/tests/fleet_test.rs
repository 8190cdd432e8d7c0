//! Integration tests for the fleet dispatcher.
//!
//! Each test builds a fleet of simulated actuators, runs one action across
//! it and checks the merged status, the per-device reports, and the frames
//! each actuator actually received.

use am43_control::{
    BlindsAction, CancelToken, DeviceEntry, DeviceError, FleetConfig, FleetDispatcher,
    PostActionPolicy, RetryPolicy, SessionConfig, SessionError,
};
use am43_protocol::*;
use am43_sim::{FaultPlan, SimConnector, SimHandle, SimProfile};
use std::time::{Duration, Instant};

/// Session settings short enough for tests.
fn fast_session() -> SessionConfig {
    SessionConfig::default().with_response_timeout(Duration::from_millis(100))
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(10))
}

/// Build a fleet from `(name, address, profile)` triples.
fn fleet(
    devices: Vec<(&str, &str, SimProfile)>,
    session: SessionConfig,
) -> (FleetDispatcher<SimConnector>, Vec<SimHandle>) {
    let mut connector = SimConnector::new();
    let mut handles = Vec::new();
    let mut entries = Vec::new();
    for (name, address, profile) in devices {
        handles.push(connector.add(address, profile));
        entries.push(DeviceEntry::new(name, address));
    }
    let config = FleetConfig::new(entries)
        .with_session(session)
        .with_retry(fast_retry());
    let dispatcher = FleetDispatcher::new(connector, config).expect("valid config");
    (dispatcher, handles)
}

fn opcodes(handle: &SimHandle) -> Vec<(u8, Vec<u8>)> {
    handle
        .commands()
        .into_iter()
        .map(|frame| (frame.opcode, frame.payload))
        .collect()
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_close_single_device() {
    let (mut dispatcher, handles) = fleet(
        vec![("living_room", "02:4E:F0:E3:8A:2B", SimProfile::with_readings(80, 0, 10))],
        fast_session(),
    );

    let outcome = dispatcher.perform_action("Close", &CancelToken::new());

    assert!(outcome.success);
    assert!(outcome.all_succeeded);
    assert!(outcome.any_succeeded);
    assert!(!outcome.cancelled);
    assert_eq!(outcome.action, BlindsAction::Close);
    assert_eq!(outcome.status.battery, Some(80));
    assert_eq!(outcome.status.position, Some(0));
    assert_eq!(outcome.status.light, Some(10));

    assert_eq!(
        opcodes(&handles[0]),
        vec![
            (ID_MOVE_AUTO, vec![100]),
            (ID_BATTERY, vec![STATUS_REQUEST_BYTE]),
            (ID_LIGHT, vec![STATUS_REQUEST_BYTE]),
            (ID_POSITION, vec![STATUS_REQUEST_BYTE]),
            (ID_POSITION, vec![ACK_OK]),
        ]
    );
    assert_eq!(handles[0].disconnects(), 1);
    assert!(!handles[0].is_connected());
}

#[test]
fn test_unknown_action_reports_status_only() {
    let (mut dispatcher, handles) = fleet(
        vec![("study", "AA:00", SimProfile::with_readings(64, 30, 2))],
        fast_session(),
    );

    let outcome = dispatcher.perform_action("favicon.ico", &CancelToken::new());
    assert_eq!(outcome.action, BlindsAction::Status);
    assert!(outcome.success);
    assert_eq!(outcome.status.position, Some(30));
    assert_eq!(handles[0].commands()[0].opcode, ID_BATTERY);
}

#[test]
fn test_open_moves_the_blind() {
    let profile = SimProfile::with_readings(80, 100, 10).with_travel_per_poll(100);
    let (mut dispatcher, handles) = fleet(vec![("study", "AA:00", profile)], fast_session());

    let outcome = dispatcher.dispatch(BlindsAction::Open, &CancelToken::new());
    assert!(outcome.success);
    assert_eq!(outcome.status.position, Some(0));
    assert_eq!(handles[0].with_actuator(|a| a.position()), 0);
}

// ============================================================================
// Isolation and aggregation
// ============================================================================

#[test]
fn test_unreachable_device_does_not_stop_the_fleet() {
    let (mut dispatcher, handles) = fleet(
        vec![
            ("first", "AA:01", SimProfile::with_readings(90, 0, 20)),
            (
                "second",
                "AA:02",
                SimProfile::default().with_faults(FaultPlan::unreachable()),
            ),
            ("third", "AA:03", SimProfile::with_readings(70, 0, 30)),
        ],
        fast_session(),
    );

    let outcome = dispatcher.dispatch(BlindsAction::Status, &CancelToken::new());

    assert_eq!(handles[1].connect_attempts(), 2);
    assert_eq!(handles[2].connect_attempts(), 1);
    assert_eq!(outcome.devices.len(), 3);

    assert!(outcome.success);
    assert!(!outcome.all_succeeded);
    assert!(outcome.any_succeeded);

    let second = &outcome.devices[1];
    assert_eq!(second.name, "second");
    assert_eq!(second.attempts, 2);
    assert!(matches!(
        second.error,
        Some(DeviceError::Connection(ref failure)) if failure.attempts == 2
    ));
    assert_eq!(outcome.failures().count(), 1);

    // Third device wrote last
    assert_eq!(outcome.status.battery, Some(70));
    assert_eq!(outcome.status.light, Some(30));
}

#[test]
fn test_success_follows_last_device() {
    let (mut dispatcher, _handles) = fleet(
        vec![
            ("first", "AA:01", SimProfile::with_readings(90, 0, 20)),
            (
                "last",
                "AA:02",
                SimProfile::default().with_faults(FaultPlan::unreachable()),
            ),
        ],
        fast_session(),
    );

    let outcome = dispatcher.dispatch(BlindsAction::Status, &CancelToken::new());
    assert!(!outcome.success);
    assert!(outcome.any_succeeded);
    assert!(!outcome.all_succeeded);
    // Readings from the first device survive
    assert_eq!(outcome.status.battery, Some(90));
}

#[test]
fn test_silent_device_faults_but_keeps_earlier_readings() {
    let (mut dispatcher, handles) = fleet(
        vec![
            ("first", "AA:01", SimProfile::with_readings(90, 5, 20)),
            (
                "quiet",
                "AA:02",
                SimProfile::default().with_faults(FaultPlan::silent()),
            ),
        ],
        fast_session(),
    );

    let outcome = dispatcher.dispatch(BlindsAction::Stop, &CancelToken::new());
    assert!(!outcome.success);
    assert_eq!(
        outcome.devices[1].error,
        Some(DeviceError::Session(SessionError::Timeout {
            command: "MoveManual(stop)",
            timeout_ms: 100
        }))
    );
    assert_eq!(outcome.status.battery, Some(90));
    assert_eq!(outcome.status.position, Some(5));
    // The faulted session still released its link
    assert_eq!(handles[1].disconnects(), 1);
}

#[test]
fn test_noisy_device_still_succeeds() {
    let profile = SimProfile::with_readings(80, 0, 10).with_faults(FaultPlan::noisy(4));
    let (mut dispatcher, _handles) = fleet(vec![("noisy", "AA:01", profile)], fast_session());

    let outcome = dispatcher.dispatch(BlindsAction::Close, &CancelToken::new());
    assert!(outcome.success, "{:?}", outcome.devices[0].error);
    assert_eq!(outcome.status.battery, Some(80));
    assert_eq!(outcome.status.light, Some(10));
}

#[test]
fn test_rejected_write_is_reported() {
    let profile = SimProfile::default().with_faults(FaultPlan::rejecting_writes());
    let (mut dispatcher, handles) = fleet(vec![("stuck", "AA:01", profile)], fast_session());

    let outcome = dispatcher.dispatch(BlindsAction::Open, &CancelToken::new());
    assert!(!outcome.success);
    assert!(matches!(
        outcome.devices[0].error,
        Some(DeviceError::Session(SessionError::Write { command: "MoveAuto", .. }))
    ));
    assert_eq!(handles[0].disconnects(), 1);
}

#[test]
fn test_fresh_status_per_invocation() {
    let (mut dispatcher, handles) = fleet(
        vec![("study", "AA:01", SimProfile::with_readings(80, 0, 10))],
        fast_session(),
    );

    let first = dispatcher.dispatch(BlindsAction::Status, &CancelToken::new());
    assert_eq!(first.status.battery, Some(80));

    handles[0].set_faults(FaultPlan::unreachable());
    let second = dispatcher.dispatch(BlindsAction::Status, &CancelToken::new());
    assert_eq!(second.status, DeviceStatus::unknown());
}

#[test]
fn test_empty_fleet() {
    let (mut dispatcher, _handles) = fleet(Vec::new(), fast_session());
    let outcome = dispatcher.dispatch(BlindsAction::Close, &CancelToken::new());
    assert!(!outcome.success);
    assert!(!outcome.all_succeeded);
    assert!(!outcome.any_succeeded);
    assert!(outcome.devices.is_empty());
}

// ============================================================================
// Session options
// ============================================================================

#[test]
fn test_close_then_stop_policy() {
    let session = fast_session().with_post_action(PostActionPolicy::CloseThenStop);
    let (mut dispatcher, handles) = fleet(
        vec![("study", "AA:01", SimProfile::with_readings(80, 0, 10))],
        session,
    );

    let outcome = dispatcher.dispatch(BlindsAction::Open, &CancelToken::new());
    assert!(outcome.success);

    let sent = opcodes(&handles[0]);
    assert_eq!(sent[0], (ID_MOVE_AUTO, vec![0]));
    assert_eq!(sent[1], (ID_MOVE_AUTO, vec![100]));
    assert_eq!(sent[2], (ID_MOVE_MANUAL, vec![MANUAL_STOP]));
    assert_eq!(sent[3], (ID_BATTERY, vec![STATUS_REQUEST_BYTE]));
}

#[test]
fn test_login_before_action() {
    let profile = SimProfile::with_readings(80, 0, 10).with_required_login(DEFAULT_PIN);
    let (mut dispatcher, handles) =
        fleet(vec![("study", "AA:01", profile)], fast_session().with_pin(DEFAULT_PIN));

    let outcome = dispatcher.dispatch(BlindsAction::Close, &CancelToken::new());
    assert!(outcome.success);
    assert_eq!(opcodes(&handles[0])[0], (ID_LOGIN, vec![0x22, 0xB8]));
}

#[test]
fn test_wrong_pin_is_rejected() {
    let profile = SimProfile::default().with_required_login(1234);
    let (mut dispatcher, _handles) =
        fleet(vec![("study", "AA:01", profile)], fast_session().with_pin(DEFAULT_PIN));

    let outcome = dispatcher.dispatch(BlindsAction::Close, &CancelToken::new());
    assert!(!outcome.success);
    assert_eq!(
        outcome.devices[0].error,
        Some(DeviceError::Session(SessionError::LoginRejected))
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancelled_before_start() {
    let (mut dispatcher, handles) = fleet(
        vec![("study", "AA:01", SimProfile::default())],
        fast_session(),
    );
    let cancel = CancelToken::new();
    cancel.cancel();

    let outcome = dispatcher.dispatch(BlindsAction::Close, &cancel);
    assert!(outcome.cancelled);
    assert!(!outcome.success);
    assert!(outcome.devices.is_empty());
    assert_eq!(handles[0].connect_attempts(), 0);
}

#[test]
fn test_deadline_aborts_long_retry() {
    let mut connector = SimConnector::new();
    let first = connector.add(
        "AA:01",
        SimProfile::default().with_faults(FaultPlan::unreachable()),
    );
    let second = connector.add("AA:02", SimProfile::default());
    let config = FleetConfig::new(vec![
        DeviceEntry::new("first", "AA:01"),
        DeviceEntry::new("second", "AA:02"),
    ])
    .with_session(fast_session())
    .with_retry(RetryPolicy::new(2, Duration::from_secs(30)));
    let mut dispatcher = FleetDispatcher::new(connector, config).unwrap();

    let start = Instant::now();
    let outcome = dispatcher.dispatch(
        BlindsAction::Close,
        &CancelToken::with_timeout(Duration::from_millis(100)),
    );

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(outcome.cancelled);
    assert_eq!(first.connect_attempts(), 1);
    assert_eq!(second.connect_attempts(), 0);
    assert_eq!(outcome.devices.len(), 1);
}

#[test]
fn test_deadline_interrupts_silent_device() {
    let session = SessionConfig::default().with_response_timeout(Duration::from_secs(10));
    let (mut dispatcher, handles) = fleet(
        vec![(
            "quiet",
            "AA:01",
            SimProfile::default().with_faults(FaultPlan::silent()),
        )],
        session,
    );

    let start = Instant::now();
    let outcome = dispatcher.dispatch(
        BlindsAction::Close,
        &CancelToken::with_timeout(Duration::from_millis(50)),
    );

    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(outcome.cancelled);
    assert!(!outcome.success);
    assert_eq!(
        outcome.devices[0].error,
        Some(DeviceError::Session(SessionError::Cancelled))
    );
    assert_eq!(handles[0].disconnects(), 1);
    assert!(!handles[0].is_connected());
}

#[test]
fn test_invalid_config_is_refused() {
    let config = FleetConfig::new(vec![
        DeviceEntry::new("twin", "AA:01"),
        DeviceEntry::new("twin", "AA:02"),
    ]);
    assert!(FleetDispatcher::new(SimConnector::new(), config).is_err());
}
