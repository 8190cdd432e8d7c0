//! Integration tests for a single actuator session over the simulator.
//!
//! These cover cancellation while a session is blocked waiting for a reply
//! that never comes.

use am43_control::{
    ActuatorSession, BlindsAction, CancelToken, SessionConfig, SessionError, SessionState,
};
use am43_link::Connector;
use am43_sim::{FaultPlan, SimConnector, SimHandle, SimLink, SimProfile};
use std::thread;
use std::time::{Duration, Instant};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

fn quiet_session() -> (ActuatorSession<SimLink>, SimHandle) {
    let mut connector = SimConnector::new();
    let handle = connector.add(
        "AA:01",
        SimProfile::default().with_faults(FaultPlan::silent()),
    );
    let link = connector.connect(handle.address()).unwrap();
    let config = SessionConfig::default().with_response_timeout(RESPONSE_TIMEOUT);
    (ActuatorSession::new("quiet", link, config), handle)
}

#[test]
fn test_deadline_interrupts_response_wait() {
    let (mut session, handle) = quiet_session();

    let start = Instant::now();
    let result = session.run(
        BlindsAction::Close,
        &CancelToken::with_timeout(Duration::from_millis(50)),
    );

    assert_eq!(result, Err(SessionError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(session.state(), SessionState::Faulted);
    // The move was written before the wait started
    assert_eq!(handle.commands().len(), 1);

    session.close().unwrap();
    assert_eq!(handle.disconnects(), 1);
    assert!(!handle.is_connected());
}

#[test]
fn test_explicit_cancel_interrupts_response_wait() {
    let (mut session, handle) = quiet_session();

    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let start = Instant::now();
    let result = session.run(BlindsAction::Status, &cancel);
    worker.join().unwrap();

    assert_eq!(result, Err(SessionError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(session.state(), SessionState::Faulted);

    session.close().unwrap();
    assert_eq!(handle.disconnects(), 1);
}
