//! Tests for the launch sequence.

use std::fs;
use std::io;
use std::net::TcpStream;
use std::sync::Arc;

use mockall::{Sequence, mock};
use rstest::rstest;

use super::*;
use crate::commands;
use crate::health::HealthReporter;
use crate::tests::support::{HealthEvent, RecordingHealthReporter, TestConfigLoader};

mock! {
    pub Signals {}
    impl ProcessSignals for Signals {
        fn wait(&mut self) -> Result<SignalAction, SignalError>;
    }
}

const SAY_HELLO_ONLY: &str = r#"{"commands": [{"commandName": "say_hello", "modulePath": "builtin"}]}"#;

fn plan(
    loader: TestConfigLoader,
    reporter: &Arc<RecordingHealthReporter>,
    signals: MockSignals,
) -> LaunchPlan<TestConfigLoader, MockSignals> {
    LaunchPlan {
        loader,
        reporter: Arc::clone(reporter) as Arc<dyn HealthReporter>,
        signals,
        catalog: commands::catalog(),
    }
}

fn started_address(events: &[HealthEvent]) -> Option<std::net::SocketAddr> {
    events.iter().find_map(|event| match event {
        HealthEvent::ServiceStarted(addr) => Some(*addr),
        _ => None,
    })
}

#[rstest]
fn stop_signal_shuts_the_service_down() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let mut signals = MockSignals::new();
    signals.expect_wait().times(1).returning(|| Ok(SignalAction::Stop));

    run_daemon_with(plan(TestConfigLoader::new(), &reporter, signals)).expect("daemon runs");

    let events = reporter.events();
    assert_eq!(events.first(), Some(&HealthEvent::BootstrapStarting));
    assert!(events.contains(&HealthEvent::BootstrapSucceeded));
    assert_eq!(events.last(), Some(&HealthEvent::ServiceStopping));
    let addr = started_address(&events).expect("service started");
    assert!(TcpStream::connect(addr).is_err(), "listener closed after stop");
}

#[rstest]
fn reload_signal_republishes_the_registry_file() {
    let loader = TestConfigLoader::new().with_registry(SAY_HELLO_ONLY);
    let registry_path = loader.registry_path();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let mut sequence = Sequence::new();
    let mut signals = MockSignals::new();
    signals
        .expect_wait()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(move || {
            let both = r#"{"commands": [
                {"commandName": "say_hello", "modulePath": "builtin"},
                {"commandName": "delete_element", "modulePath": "builtin"}
            ]}"#;
            fs::write(&registry_path, both).expect("rewrite registry");
            Ok(SignalAction::Reload)
        });
    signals
        .expect_wait()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|| Ok(SignalAction::Stop));

    run_daemon_with(plan(loader, &reporter, signals)).expect("daemon runs");

    let loaded: Vec<_> = reporter
        .events()
        .into_iter()
        .filter_map(|event| match event {
            HealthEvent::CommandsLoaded(names) => Some(names),
            _ => None,
        })
        .collect();
    assert_eq!(
        loaded,
        vec![
            vec![String::from("say_hello")],
            vec![String::from("say_hello"), String::from("delete_element")],
        ]
    );
}

#[rstest]
fn failed_reload_keeps_the_daemon_running() {
    let loader = TestConfigLoader::new().with_registry(SAY_HELLO_ONLY);
    let registry_path = loader.registry_path();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let mut sequence = Sequence::new();
    let mut signals = MockSignals::new();
    signals
        .expect_wait()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(move || {
            fs::write(&registry_path, "{ not json").expect("corrupt registry");
            Ok(SignalAction::Reload)
        });
    signals
        .expect_wait()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|| Ok(SignalAction::Stop));

    run_daemon_with(plan(loader, &reporter, signals)).expect("daemon runs");

    let events = reporter.events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::CommandsReloadFailed(_))),
        "reload failure reported: {events:?}"
    );
    assert_eq!(events.last(), Some(&HealthEvent::ServiceStopping));
}

#[rstest]
fn malformed_registry_file_aborts_startup() {
    let loader = TestConfigLoader::new().with_registry("[1, 2");
    let reporter = Arc::new(RecordingHealthReporter::default());
    let mut signals = MockSignals::new();
    signals.expect_wait().never();

    let error = run_daemon_with(plan(loader, &reporter, signals)).expect_err("startup fails");

    assert_eq!(error.code(), hostbridge_protocol::ErrorCode::ConfigurationError);
    assert!(
        reporter
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)))
    );
    assert!(started_address(&reporter.events()).is_none());
}

#[rstest]
fn signal_errors_still_stop_the_service() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let mut signals = MockSignals::new();
    signals.expect_wait().times(1).returning(|| {
        Err(SignalError::Install {
            source: io::Error::other("signal source gone"),
        })
    });

    let error = run_daemon_with(plan(TestConfigLoader::new(), &reporter, signals))
        .expect_err("signal failure surfaces");

    assert!(matches!(error, LaunchError::Signals(_)));
    assert_eq!(reporter.events().last(), Some(&HealthEvent::ServiceStopping));
}
