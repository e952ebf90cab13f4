//! Response envelopes.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{ErrorCode, JSONRPC_VERSION, ProtocolError, RequestId};

/// Fixed document written if serialising a response ever fails.
const FALLBACK_RESPONSE: &[u8] =
    br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal JSON-RPC error."}}"#;

/// Error payload of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    /// Wire error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// Builds an error payload from a taxonomy code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Builds an error payload carrying the code's fixed description.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.description())
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A response envelope. Exactly one of `result` or `error` is present on
/// the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The call completed.
    Success {
        /// Identifier of the originating request.
        id: RequestId,
        /// Command result.
        result: Value,
    },
    /// The call failed.
    Error {
        /// Identifier of the originating request, `None` when it could not be
        /// determined.
        id: Option<RequestId>,
        /// Failure detail.
        error: ErrorObject,
    },
}

#[derive(Serialize)]
struct Envelope<'a> {
    jsonrpc: &'static str,
    id: Option<&'a RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorObject>,
}

impl Response {
    /// Builds a success envelope.
    #[must_use]
    pub const fn success(id: RequestId, result: Value) -> Self {
        Self::Success { id, result }
    }

    /// Builds an error envelope.
    #[must_use]
    pub const fn error(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self::Error { id, error }
    }

    /// Returns the echoed identifier.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Success { id, .. } => Some(id),
            Self::Error { id, .. } => id.as_ref(),
        }
    }

    /// Returns the error payload for failed calls.
    #[must_use]
    pub const fn error_object(&self) -> Option<&ErrorObject> {
        match self {
            Self::Success { .. } => None,
            Self::Error { error, .. } => Some(error),
        }
    }

    /// Serialises the envelope as a single JSON document.
    ///
    /// This never fails: if serialisation is somehow impossible a fixed
    /// internal error document is returned instead.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let envelope = match self {
            Self::Success { id, result } => Envelope {
                jsonrpc: JSONRPC_VERSION,
                id: Some(id),
                result: Some(result),
                error: None,
            },
            Self::Error { id, error } => Envelope {
                jsonrpc: JSONRPC_VERSION,
                id: id.as_ref(),
                result: None,
                error: Some(error),
            },
        };
        serde_json::to_vec(&envelope).unwrap_or_else(|_| FALLBACK_RESPONSE.to_vec())
    }

    /// Parses a response envelope, as a client reading the daemon would.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] when the bytes are not JSON and
    /// [`ProtocolError::Invalid`] when the envelope does not carry exactly
    /// one of `result` or `error`, or a success lacks an id.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(mut envelope) = value else {
            return Err(ProtocolError::invalid("response must be a JSON object"));
        };
        if envelope.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(ProtocolError::invalid("response must carry jsonrpc 2.0"));
        }
        let id = response_id(envelope.remove("id"))?;
        match (envelope.remove("result"), envelope.remove("error")) {
            (Some(result), None) => {
                let success_id =
                    id.ok_or_else(|| ProtocolError::invalid("success without an id"))?;
                Ok(Self::Success {
                    id: success_id,
                    result,
                })
            }
            (None, Some(Value::Object(error))) => Ok(Self::Error {
                id,
                error: error_object(error)?,
            }),
            (None, Some(_)) => Err(ProtocolError::invalid("error must be an object")),
            _ => Err(ProtocolError::invalid(
                "response must carry exactly one of result or error",
            )),
        }
    }
}

fn response_id(id: Option<Value>) -> Result<Option<RequestId>, ProtocolError> {
    match id {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(RequestId::new(text))),
        Some(Value::Number(number)) => Ok(Some(RequestId::new(number.to_string()))),
        Some(_) => Err(ProtocolError::invalid("id must be a string, a number or null")),
    }
}

fn error_object(mut error: Map<String, Value>) -> Result<ErrorObject, ProtocolError> {
    let code = error
        .get("code")
        .and_then(Value::as_i64)
        .and_then(|code| i32::try_from(code).ok())
        .ok_or_else(|| ProtocolError::invalid("error code must be a 32-bit integer"))?;
    let message = match error.remove("message") {
        Some(Value::String(message)) => message,
        _ => return Err(ProtocolError::invalid("error message must be a string")),
    };
    Ok(ErrorObject {
        code,
        message,
        data: error.remove("data"),
    })
}
