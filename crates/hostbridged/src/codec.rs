//! Wire encoding and stream framing for JSON-RPC messages.
//!
//! Responses are written as one JSON document followed by `\n`. Incoming
//! bytes are accepted either newline-delimited or as bare concatenated
//! documents; [`MessageBuffer`] reassembles documents split across reads and
//! yields every complete document in arrival order.

use hostbridge_protocol::{ErrorCode, ErrorObject, ProtocolError, Request, RequestId, Response};
use serde::de::IgnoredAny;
use serde_json::Value;
use thiserror::Error;

/// Upper bound on buffered bytes for a single incomplete document.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Decodes one request document.
///
/// # Errors
///
/// Returns [`ProtocolError::Parse`] for malformed JSON and
/// [`ProtocolError::Invalid`] for structurally invalid envelopes.
pub fn decode(bytes: &[u8]) -> Result<Request, ProtocolError> {
    Request::from_slice(bytes)
}

/// Encodes a response as a newline-terminated document.
#[must_use]
pub fn encode(response: &Response) -> Vec<u8> {
    let mut bytes = response.to_vec();
    bytes.push(b'\n');
    bytes
}

/// Encodes a success response.
#[must_use]
pub fn encode_success(id: RequestId, result: Value) -> Vec<u8> {
    encode(&Response::success(id, result))
}

/// Encodes an error response.
#[must_use]
pub fn encode_error(
    id: Option<RequestId>,
    code: ErrorCode,
    message: &str,
    data: Option<Value>,
) -> Vec<u8> {
    let mut error = ErrorObject::new(code, message);
    if let Some(data) = data {
        error = error.with_data(data);
    }
    encode(&Response::error(id, error))
}

/// Builds the error response for a request that failed to decode.
///
/// The id is never echoed because it cannot be trusted yet.
#[must_use]
pub fn decode_failure(error: &ProtocolError) -> Response {
    Response::error(None, ErrorObject::new(error.code(), error.to_string()))
}

/// Errors raised while buffering stream input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The pending document grew beyond the configured limit.
    #[error("request of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Buffered size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// Item extracted from a [`MessageBuffer`].
#[derive(Debug)]
pub enum Frame {
    /// A complete JSON document.
    Message(Vec<u8>),
    /// Bytes that cannot be parsed as JSON. The buffer has been discarded.
    Malformed(serde_json::Error),
}

/// Accumulates stream input and splits it into JSON documents.
#[derive(Debug)]
pub struct MessageBuffer {
    pending: Vec<u8>,
    limit: usize,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new(MAX_REQUEST_BYTES)
    }
}

impl MessageBuffer {
    /// Creates an empty buffer holding at most `limit` bytes.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
        }
    }

    /// Appends bytes read from the stream.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] when the buffered bytes exceed the
    /// limit. The buffer is cleared in that case.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.pending.extend_from_slice(bytes);
        let size = self.pending.len();
        if size > self.limit {
            self.pending.clear();
            return Err(FrameError::TooLarge {
                size,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Returns the number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Extracts the next complete document, if any.
    ///
    /// Returns `None` while the buffered bytes hold only whitespace or an
    /// incomplete document.
    pub fn next_frame(&mut self) -> Option<Frame> {
        let start = self
            .pending
            .iter()
            .position(|byte| !byte.is_ascii_whitespace());
        let Some(start) = start else {
            self.pending.clear();
            return None;
        };
        let scanned = {
            let remaining = self.pending.get(start..).unwrap_or_default();
            let mut stream =
                serde_json::Deserializer::from_slice(remaining).into_iter::<IgnoredAny>();
            match stream.next() {
                Some(Ok(_)) => Ok(Some(start + stream.byte_offset())),
                Some(Err(error)) if error.is_eof() => Ok(None),
                Some(Err(error)) => Err(error),
                None => Ok(None),
            }
        };
        match scanned {
            Ok(Some(end)) => {
                let message: Vec<u8> = self.pending.drain(..end).skip(start).collect();
                Some(Frame::Message(message))
            }
            Ok(None) => None,
            Err(error) => {
                self.skip_line(start, error.line());
                Some(Frame::Malformed(error))
            }
        }
    }

    /// Drops everything up to and including the newline ending `line`
    /// (1-based, counted from `start`). Clears the buffer when that line has
    /// no newline yet.
    fn skip_line(&mut self, start: usize, line: usize) {
        let newline = self
            .pending
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, byte)| **byte == b'\n')
            .nth(line.saturating_sub(1))
            .map(|(index, _)| index);
        match newline {
            Some(index) => {
                self.pending.drain(..=index);
            }
            None => self.pending.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn message(frame: Option<Frame>) -> Value {
        match frame {
            Some(Frame::Message(bytes)) => serde_json::from_slice(&bytes).expect("valid JSON"),
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[test]
    fn responses_are_newline_terminated() {
        let bytes = encode_success(RequestId::new("1"), json!({"execute": true}));
        assert_eq!(bytes.last(), Some(&b'\n'));
        let value: Value = serde_json::from_slice(&bytes).expect("valid JSON");
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": "1", "result": {"execute": true}}));
    }

    #[test]
    fn error_responses_carry_data() {
        let bytes = encode_error(
            Some(RequestId::new("7")),
            ErrorCode::MethodNotFound,
            "Method 'nope' not found",
            Some(json!({"method": "nope"})),
        );
        let value: Value = serde_json::from_slice(&bytes).expect("valid JSON");
        assert_eq!(value["error"]["code"], json!(-32601));
        assert_eq!(value["error"]["data"], json!({"method": "nope"}));
        assert_eq!(value["id"], json!("7"));
    }

    #[rstest]
    #[case::malformed(b"{not json".as_slice(), ErrorCode::ParseError)]
    #[case::wrong_version(br#"{"jsonrpc":"1.0","method":"m","id":"1"}"#.as_slice(), ErrorCode::InvalidRequest)]
    fn decode_failures_never_echo_the_id(#[case] input: &[u8], #[case] expected: ErrorCode) {
        let error = decode(input).expect_err("decode should fail");
        let response = decode_failure(&error);
        assert_eq!(response.id(), None);
        assert_eq!(
            response.error_object().map(|error| error.code),
            Some(expected.code())
        );
    }

    #[test]
    fn reassembles_documents_split_across_reads() {
        let mut buffer = MessageBuffer::default();
        buffer.extend(br#"{"jsonrpc":"2.0","met"#).expect("extend");
        assert!(buffer.next_frame().is_none());
        buffer.extend(br#"hod":"say_hello","id":"1"}"#).expect("extend");
        assert_eq!(message(buffer.next_frame())["method"], json!("say_hello"));
        assert!(buffer.is_empty());
    }

    #[rstest]
    #[case::newline_delimited(b"{\"a\":1}\n{\"a\":2}\n".as_slice())]
    #[case::concatenated(b"{\"a\":1}{\"a\":2}".as_slice())]
    #[case::padded(b"  {\"a\":1}\r\n\t{\"a\":2}  ".as_slice())]
    fn yields_documents_in_order(#[case] input: &[u8]) {
        let mut buffer = MessageBuffer::default();
        buffer.extend(input).expect("extend");
        assert_eq!(message(buffer.next_frame()), json!({"a": 1}));
        assert_eq!(message(buffer.next_frame()), json!({"a": 2}));
        assert!(buffer.next_frame().is_none());
        assert!(buffer.is_empty());
    }

    #[rstest]
    #[case::single_line(b"{\"a\":}\n{\"b\":1}\n".as_slice())]
    #[case::error_on_second_line(b"{\"a\":\n }\n{\"b\":1}\n".as_slice())]
    fn malformed_line_is_skipped_and_later_lines_survive(#[case] input: &[u8]) {
        let mut buffer = MessageBuffer::default();
        buffer.extend(input).expect("extend");
        assert!(matches!(buffer.next_frame(), Some(Frame::Malformed(_))));
        assert_eq!(message(buffer.next_frame()), json!({"b": 1}));
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn malformed_input_without_newline_discards_the_buffer() {
        let mut buffer = MessageBuffer::default();
        buffer.extend(b"{\"a\":}{\"b\":1}").expect("extend");
        assert!(matches!(buffer.next_frame(), Some(Frame::Malformed(_))));
        assert!(buffer.is_empty());
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn oversized_input_is_rejected() {
        let mut buffer = MessageBuffer::new(8);
        let error = buffer.extend(b"{\"key\":\"value\"}").expect_err("too large");
        assert_eq!(error, FrameError::TooLarge { size: 15, limit: 8 });
        assert!(buffer.is_empty());
    }
}
