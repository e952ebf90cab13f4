//! Request decoding and validation.
//!
//! Decoding happens in two steps: the bytes are parsed into a JSON value, and
//! the value is then checked against the envelope rules. The two failure modes
//! map onto different error codes, so they are kept apart in
//! [`ProtocolError`].

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{ErrorCode, JSONRPC_VERSION};

/// Identifier correlating a response with its request.
///
/// Identifiers are always carried as strings. Numeric identifiers sent by
/// clients are normalised to their decimal form when decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    /// Wraps a string identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Errors raised while decoding a request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not valid JSON.
    #[error("invalid JSON: {source}")]
    Parse {
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The payload is JSON but not a valid request envelope.
    #[error("invalid request: {message}")]
    Invalid {
        /// Explanation of the violated rule.
        message: String,
    },
}

impl ProtocolError {
    /// Builds an [`ProtocolError::Invalid`] error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Returns the wire code used when answering this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { .. } => ErrorCode::ParseError,
            Self::Invalid { .. } => ErrorCode::InvalidRequest,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(source: serde_json::Error) -> Self {
        Self::Parse { source }
    }
}

/// A validated request envelope.
///
/// # Example
///
/// ```
/// use hostbridge_protocol::Request;
///
/// let request = Request::from_slice(br#"{"jsonrpc":"2.0","method":"say_hello","id":7}"#)
///     .expect("valid request");
/// assert_eq!(request.method(), "say_hello");
/// assert_eq!(request.id().map(|id| id.as_str()), Some("7"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    params: Option<Value>,
    id: Option<RequestId>,
}

impl Request {
    /// Builds a request directly, bypassing wire validation.
    pub fn new(method: impl Into<String>, params: Option<Value>, id: Option<RequestId>) -> Self {
        Self {
            method: method.into(),
            params,
            id,
        }
    }

    /// Parses and validates raw request bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] when the bytes are not JSON and
    /// [`ProtocolError::Invalid`] when the envelope breaks a protocol rule.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Validates an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Invalid`] when the value is not an object,
    /// carries a version other than `"2.0"`, lacks a non-empty `method`, has
    /// `params` that are neither an object nor an array, or has an id that is
    /// neither a string nor a number.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut envelope) = value else {
            return Err(ProtocolError::invalid("request must be a JSON object"));
        };
        check_version(&envelope)?;
        let method = take_method(&mut envelope)?;
        let params = take_params(&mut envelope)?;
        let id = take_id(&mut envelope)?;
        Ok(Self { method, params, id })
    }

    /// Returns the requested command name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the parameter tree, if any.
    #[must_use]
    pub const fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    /// Returns the request identifier, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// Returns `true` when no response is expected.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

fn check_version(envelope: &Map<String, Value>) -> Result<(), ProtocolError> {
    match envelope.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => Ok(()),
        Some(Value::String(version)) => Err(ProtocolError::invalid(format!(
            "unsupported jsonrpc version '{version}'"
        ))),
        Some(_) => Err(ProtocolError::invalid("jsonrpc must be a string")),
        None => Err(ProtocolError::invalid("jsonrpc field is missing")),
    }
}

fn take_method(envelope: &mut Map<String, Value>) -> Result<String, ProtocolError> {
    match envelope.remove("method") {
        Some(Value::String(method)) if !method.trim().is_empty() => Ok(method),
        Some(Value::String(_)) => Err(ProtocolError::invalid("method field is empty")),
        Some(_) => Err(ProtocolError::invalid("method must be a string")),
        None => Err(ProtocolError::invalid("method field is missing")),
    }
}

fn take_params(envelope: &mut Map<String, Value>) -> Result<Option<Value>, ProtocolError> {
    match envelope.remove("params") {
        None | Some(Value::Null) => Ok(None),
        Some(params @ (Value::Object(_) | Value::Array(_))) => Ok(Some(params)),
        Some(_) => Err(ProtocolError::invalid(
            "params must be an object or an array",
        )),
    }
}

fn take_id(envelope: &mut Map<String, Value>) -> Result<Option<RequestId>, ProtocolError> {
    match envelope.remove("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Ok(None),
        Some(Value::String(id)) => Ok(Some(RequestId(id))),
        Some(Value::Number(number)) => Ok(Some(RequestId(number.to_string()))),
        Some(_) => Err(ProtocolError::invalid("id must be a string or a number")),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_minimal_request() {
        let request = Request::from_slice(br#"{"jsonrpc":"2.0","method":"say_hello","id":"1"}"#)
            .expect("decode");
        assert_eq!(request.method(), "say_hello");
        assert_eq!(request.id(), Some(&RequestId::new("1")));
        assert!(request.params().is_none());
        assert!(!request.is_notification());
    }

    #[test]
    fn keeps_object_params() {
        let request = Request::from_slice(
            br#"{"jsonrpc":"2.0","method":"delete_element","params":{"elementIds":["a"]},"id":"2"}"#,
        )
        .expect("decode");
        assert_eq!(request.params(), Some(&json!({"elementIds": ["a"]})));
    }

    #[rstest]
    #[case(json!(1), Some("1"))]
    #[case(json!(-12), Some("-12"))]
    #[case(json!("abc"), Some("abc"))]
    #[case(json!(""), None)]
    #[case(Value::Null, None)]
    fn normalises_ids(#[case] id: Value, #[case] expected: Option<&str>) {
        let request = Request::from_value(json!({"jsonrpc": "2.0", "method": "m", "id": id}))
            .expect("decode");
        assert_eq!(request.id().map(RequestId::as_str), expected);
    }

    #[test]
    fn missing_id_is_notification() {
        let request =
            Request::from_value(json!({"jsonrpc": "2.0", "method": "m"})).expect("decode");
        assert!(request.is_notification());
    }

    #[test]
    fn rejects_malformed_json() {
        let error = Request::from_slice(b"{not json").expect_err("must fail");
        assert!(matches!(error, ProtocolError::Parse { .. }));
        assert_eq!(error.code(), ErrorCode::ParseError);
    }

    #[rstest]
    #[case::wrong_version(json!({"jsonrpc": "1.0", "method": "m"}))]
    #[case::missing_version(json!({"method": "m"}))]
    #[case::numeric_version(json!({"jsonrpc": 2, "method": "m"}))]
    #[case::missing_method(json!({"jsonrpc": "2.0"}))]
    #[case::empty_method(json!({"jsonrpc": "2.0", "method": "  "}))]
    #[case::numeric_method(json!({"jsonrpc": "2.0", "method": 3}))]
    #[case::scalar_params(json!({"jsonrpc": "2.0", "method": "m", "params": 5}))]
    #[case::object_id(json!({"jsonrpc": "2.0", "method": "m", "id": {"a": 1}}))]
    #[case::not_an_object(json!([1, 2, 3]))]
    fn rejects_invalid_envelopes(#[case] value: Value) {
        let error = Request::from_value(value).expect_err("must fail");
        assert!(matches!(error, ProtocolError::Invalid { .. }));
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }
}
