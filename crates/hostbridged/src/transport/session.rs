//! Per-connection request loop.
//!
//! A session reads the socket in fixed chunks, feeds a [`MessageBuffer`],
//! and answers every complete document in arrival order before reading
//! again. Requests on one connection are therefore handled strictly in
//! sequence; concurrency comes from running many sessions at once.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use hostbridge_protocol::{ErrorCode, ProtocolError};
use tracing::{debug, warn};

use super::{ConnectionHandler, LISTENER_TARGET, SessionError};
use crate::codec::{self, Frame, MAX_REQUEST_BYTES, MessageBuffer};
use crate::dispatch::Dispatcher;

/// Size of each socket read.
pub const READ_CHUNK_BYTES: usize = 8 * 1024;

/// How often an idle session checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed its side of the connection.
    ClientClosed,
    /// The service is stopping.
    Shutdown,
    /// The client sent a document larger than the request limit.
    Oversized,
}

/// Serves JSON-RPC requests on a connection.
#[derive(Debug, Clone)]
pub struct SessionHandler {
    dispatcher: Arc<Dispatcher>,
    max_request_bytes: usize,
}

impl SessionHandler {
    /// Creates a handler that answers requests through `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            max_request_bytes: MAX_REQUEST_BYTES,
        }
    }

    /// Overrides the per-document size limit.
    #[must_use]
    pub const fn with_max_request_bytes(mut self, limit: usize) -> Self {
        self.max_request_bytes = limit;
        self
    }

    /// Runs the request loop on `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the socket fails.
    pub fn serve(&self, stream: &mut TcpStream, shutdown: &AtomicBool) -> Result<SessionEnd, SessionError> {
        stream
            .set_read_timeout(Some(POLL_INTERVAL))
            .map_err(SessionError::Configure)?;
        let mut buffer = MessageBuffer::new(self.max_request_bytes);
        let mut chunk = [0_u8; READ_CHUNK_BYTES];
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return Ok(SessionEnd::Shutdown);
            }
            let read = match stream.read(&mut chunk) {
                Ok(0) => {
                    if !buffer.is_empty() {
                        debug!(
                            target: LISTENER_TARGET,
                            pending = buffer.len(),
                            "client closed with an incomplete request"
                        );
                    }
                    return Ok(SessionEnd::ClientClosed);
                }
                Ok(read) => read,
                Err(error) if is_retryable(&error) => continue,
                Err(error) => return Err(SessionError::Read(error)),
            };
            if let Err(error) = buffer.extend(chunk.get(..read).unwrap_or_default()) {
                warn!(target: LISTENER_TARGET, %error, "closing session");
                let reply = codec::encode_error(None, ErrorCode::ParseError, &error.to_string(), None);
                write_reply(stream, &reply)?;
                return Ok(SessionEnd::Oversized);
            }
            while let Some(frame) = buffer.next_frame() {
                if let Some(reply) = self.answer(frame) {
                    write_reply(stream, &reply)?;
                }
            }
        }
    }

    fn answer(&self, frame: Frame) -> Option<Vec<u8>> {
        match frame {
            Frame::Message(bytes) => self.dispatcher.handle_message(&bytes),
            Frame::Malformed(source) => {
                let error = ProtocolError::from(source);
                warn!(target: LISTENER_TARGET, %error, "discarding malformed input");
                Some(codec::encode(&codec::decode_failure(&error)))
            }
        }
    }
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, mut stream: TcpStream, shutdown: &AtomicBool) {
        let peer = stream.peer_addr().ok();
        match self.serve(&mut stream, shutdown) {
            Ok(end) => debug!(target: LISTENER_TARGET, ?peer, ?end, "session ended"),
            Err(error) => warn!(target: LISTENER_TARGET, ?peer, %error, "session failed"),
        }
    }
}

fn is_retryable(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

fn write_reply(stream: &mut TcpStream, reply: &[u8]) -> Result<(), SessionError> {
    stream.write_all(reply).map_err(SessionError::Write)?;
    stream.flush().map_err(SessionError::Write)
}
