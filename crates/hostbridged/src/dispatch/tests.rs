//! Unit tests for the dispatcher.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hostbridge_commands::test_support::{FnCommand, StubCommand};
use hostbridge_commands::{
    Command, CommandDescriptor, CommandError, CommandRegistry, Document, HostJob, parse_params,
};
use hostbridge_protocol::{ErrorCode, Request, RequestId};
use rstest::{fixture, rstest};
use serde::Deserialize;
use serde_json::{Value, json};

use super::*;
use crate::bridge::{HostRuntime, HostRuntimeHandle};

struct Harness {
    dispatcher: Dispatcher,
    host: Option<HostRuntimeHandle>,
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(host) = self.host.take() {
            host.stop();
            let _ = host.join();
        }
    }
}

#[derive(Deserialize)]
struct AddParams {
    a: i64,
    b: i64,
}

struct AddCommand;

impl Command for AddCommand {
    fn name(&self) -> &str {
        "add"
    }

    fn prepare(
        &self,
        params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        let AddParams { a, b } = parse_params(params)?;
        Ok(Box::new(move |_document: &mut Document| Ok(json!(a + b))))
    }
}

struct PanickingPrepare;

impl Command for PanickingPrepare {
    fn name(&self) -> &str {
        "fragile"
    }

    fn prepare(
        &self,
        _params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        panic!("prepare exploded")
    }
}

fn registry() -> CommandRegistry {
    let registry = CommandRegistry::new();
    registry.register(
        CommandDescriptor::builtin("say_hello"),
        Box::new(FnCommand::new("say_hello", |_params, _document: &mut Document| {
            Ok(json!({"execute": true}))
        })),
    );
    registry.register(CommandDescriptor::builtin("add"), Box::new(AddCommand));
    registry.register(CommandDescriptor::builtin("fragile"), Box::new(PanickingPrepare));
    registry.register(
        CommandDescriptor::builtin("missing_element"),
        Box::new(FnCommand::new("missing_element", |_params, _document: &mut Document| {
            Err(CommandError::host(ErrorCode::ElementNotFound, "element 42 not found")
                .with_data(json!({"elementId": "42"})))
        })),
    );
    registry.register(
        CommandDescriptor::builtin("sleepy").with_timeout(Duration::from_millis(50)),
        Box::new(
            FnCommand::new("sleepy", |_params, _document: &mut Document| {
                thread::sleep(Duration::from_millis(300));
                Ok(json!("late"))
            })
            .with_timeout(Duration::from_secs(30)),
        ),
    );
    registry.register(
        CommandDescriptor::builtin("echo"),
        Box::new(StubCommand::new("echo")),
    );
    registry
}

#[fixture]
fn harness() -> Harness {
    let runtime = HostRuntime::new(Document::default());
    let bridge = runtime.bridge();
    let host = runtime.spawn(Duration::from_millis(5)).expect("spawn host");
    Harness {
        dispatcher: Dispatcher::new(Arc::new(registry()), bridge, Duration::from_secs(5)),
        host: Some(host),
    }
}

fn call(harness: &Harness, message: &str) -> Value {
    let bytes = harness
        .dispatcher
        .handle_message(message.as_bytes())
        .expect("a response");
    assert_eq!(bytes.last(), Some(&b'\n'));
    serde_json::from_slice(&bytes).expect("response is JSON")
}

#[rstest]
fn say_hello_round_trips_id_and_result(harness: Harness) {
    let response = call(&harness, r#"{"jsonrpc":"2.0","method":"say_hello","id":"1"}"#);
    assert_eq!(
        response,
        json!({"jsonrpc": "2.0", "id": "1", "result": {"execute": true}})
    );
}

#[rstest]
fn numeric_ids_are_echoed_as_strings(harness: Harness) {
    let response = call(&harness, r#"{"jsonrpc":"2.0","method":"say_hello","id":7}"#);
    assert_eq!(response["id"], json!("7"));
}

#[rstest]
fn unknown_methods_name_the_method(harness: Harness) {
    let response = call(&harness, r#"{"jsonrpc":"2.0","method":"fly","id":"2"}"#);
    assert_eq!(response["id"], json!("2"));
    assert_eq!(response["error"]["code"], json!(-32601));
    assert!(response["error"]["message"].as_str().unwrap_or_default().contains("fly"));
    assert_eq!(response["error"]["data"], json!({"method": "fly"}));
}

#[rstest]
#[case::wrong_version(r#"{"jsonrpc":"1.0","method":"say_hello","id":"3"}"#, -32600)]
#[case::missing_method(r#"{"jsonrpc":"2.0","id":"3"}"#, -32600)]
#[case::scalar_params(r#"{"jsonrpc":"2.0","method":"add","params":4,"id":"3"}"#, -32600)]
#[case::malformed(r#"{"jsonrpc":"2.0","method":"#, -32700)]
fn protocol_failures_use_a_null_id(harness: Harness, #[case] message: &str, #[case] code: i64) {
    let response = call(&harness, message);
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"]["code"], json!(code));
}

#[rstest]
fn parameters_are_converted_by_the_command(harness: Harness) {
    let ok = call(
        &harness,
        r#"{"jsonrpc":"2.0","method":"add","params":{"a":2,"b":3},"id":"4"}"#,
    );
    assert_eq!(ok["result"], json!(5));

    let bad = call(
        &harness,
        r#"{"jsonrpc":"2.0","method":"add","params":{"a":"two"},"id":"5"}"#,
    );
    assert_eq!(bad["id"], json!("5"));
    assert_eq!(bad["error"]["code"], json!(-33105));
}

#[rstest]
fn domain_errors_keep_code_message_and_data(harness: Harness) {
    let response = call(
        &harness,
        r#"{"jsonrpc":"2.0","method":"missing_element","id":"6"}"#,
    );
    assert_eq!(
        response["error"],
        json!({"code": -33004, "message": "element 42 not found", "data": {"elementId": "42"}})
    );
}

#[rstest]
fn panics_while_preparing_become_internal_errors(harness: Harness) {
    let response = call(&harness, r#"{"jsonrpc":"2.0","method":"fragile","id":"8"}"#);
    assert_eq!(response["error"]["code"], json!(-32603));
    assert!(response["error"].get("data").is_none());
}

#[rstest]
fn descriptor_timeout_overrides_command_default(harness: Harness) {
    let started = Instant::now();
    let response = call(&harness, r#"{"jsonrpc":"2.0","method":"sleepy","id":"9"}"#);
    assert!(started.elapsed() < Duration::from_millis(290));
    assert_eq!(response["error"]["code"], json!(-33001));
    assert_eq!(
        response["error"]["message"],
        json!("Command 'sleepy' timed out after 50 ms")
    );

    let follow_up = call(&harness, r#"{"jsonrpc":"2.0","method":"say_hello","id":"10"}"#);
    assert_eq!(follow_up["result"], json!({"execute": true}));
}

#[rstest]
fn notifications_run_without_a_response(harness: Harness) {
    for message in [
        r#"{"jsonrpc":"2.0","method":"say_hello"}"#,
        r#"{"jsonrpc":"2.0","method":"say_hello","id":null}"#,
        r#"{"jsonrpc":"2.0","method":"fly","id":""}"#,
    ] {
        assert!(harness.dispatcher.handle_message(message.as_bytes()).is_none());
    }
}

#[rstest]
fn execute_passes_params_through(harness: Harness) {
    let request = Request::new(
        "echo",
        Some(json!(["a", 1])),
        Some(RequestId::new("11")),
    );
    let response = harness.dispatcher.execute(&request).expect("a response");
    assert_eq!(response.id(), Some(&RequestId::new("11")));
    let Response::Success { result, .. } = response else {
        panic!("expected success");
    };
    assert_eq!(result["params"], json!(["a", 1]));
}

#[test]
fn stopped_host_maps_to_bridge_error_codes() {
    let bridge = HostRuntime::new(Document::default()).bridge();
    let dispatcher = Dispatcher::new(Arc::new(registry()), bridge, Duration::from_secs(1));
    let bytes = dispatcher
        .handle_message(br#"{"jsonrpc":"2.0","method":"say_hello","id":"12"}"#)
        .expect("a response");
    let response: Value = serde_json::from_slice(&bytes).expect("response is JSON");
    assert_eq!(response["error"]["code"], json!(-33102));
}
