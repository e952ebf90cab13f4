//! Unit tests for command errors.

use rstest::rstest;
use serde_json::json;

use super::*;

#[rstest]
#[case(CommandError::invalid_params("x"), -32602)]
#[case(CommandError::ParameterParsing { message: "x".into() }, -33105)]
#[case(CommandError::host(ErrorCode::ElementNotFound, "x"), -33004)]
#[case(CommandError::Reported { code: 42, message: "x".into(), data: None }, 42)]
#[case(CommandError::internal("x"), -32603)]
fn maps_variants_to_wire_codes(#[case] error: CommandError, #[case] expected: i32) {
    assert_eq!(error.code(), expected);
}

#[test]
fn host_errors_keep_their_message_verbatim() {
    let error = CommandError::host(ErrorCode::ViewNotFound, "no active view");
    assert_eq!(error.to_string(), "no active view");
}

#[test]
fn error_object_carries_data() {
    let error = CommandError::host(ErrorCode::ElementNotFound, "element '7' not found")
        .with_data(json!({"elementId": "7"}));
    let object = error.to_error_object();
    assert_eq!(object.code, -33004);
    assert_eq!(object.message, "element '7' not found");
    assert_eq!(object.data, Some(json!({"elementId": "7"})));
}

#[test]
fn data_is_ignored_for_parameter_errors() {
    let error = CommandError::invalid_params("limit must be positive").with_data(json!(1));
    assert!(error.data().is_none());
}

#[test]
fn wraps_serde_errors() {
    let source = serde_json::from_str::<u32>("\"nope\"").expect_err("must fail");
    let error = CommandError::from_params_error(&source);
    assert_eq!(error.code(), ErrorCode::CommandParameterParsingFailed.code());
    assert!(error.to_string().starts_with("failed to parse parameters"));
}
