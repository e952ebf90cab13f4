//! Client-side helpers for exercising a running service over TCP.
//!
//! Enabled for unit tests and through the `test-support` feature.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use serde_json::Value;

/// How long a read waits before reporting that no response arrived.
pub const RESPONSE_WAIT: Duration = Duration::from_secs(5);

/// Line-oriented JSON-RPC client.
#[derive(Debug)]
pub struct TestClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl TestClient {
    /// Connects to `addr`.
    ///
    /// # Errors
    ///
    /// Returns the socket error when the connection fails.
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let writer = TcpStream::connect(addr)?;
        writer.set_read_timeout(Some(RESPONSE_WAIT))?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(Self { writer, reader })
    }

    /// Writes raw bytes without framing.
    ///
    /// # Errors
    ///
    /// Returns the socket error when the write fails.
    pub fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }

    /// Writes `request` followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns the socket error when the write fails.
    pub fn send(&mut self, request: &Value) -> io::Result<()> {
        let mut bytes = serde_json::to_vec(request)?;
        bytes.push(b'\n');
        self.send_raw(&bytes)
    }

    /// Reads one newline-terminated response.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::UnexpectedEof`] when the server closed the
    /// connection, [`io::ErrorKind::WouldBlock`] or
    /// [`io::ErrorKind::TimedOut`] when nothing arrived in time, and
    /// [`io::ErrorKind::InvalidData`] when the line is not JSON.
    pub fn read_response(&mut self) -> io::Result<Value> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            ));
        }
        serde_json::from_str(&line).map_err(io::Error::from)
    }

    /// Sends `request` and reads its response.
    ///
    /// # Errors
    ///
    /// See [`Self::send`] and [`Self::read_response`].
    pub fn call(&mut self, request: &Value) -> io::Result<Value> {
        self.send(request)?;
        self.read_response()
    }

    /// Waits up to `wait` for a response and returns `None` if none came.
    ///
    /// # Errors
    ///
    /// Returns socket errors other than a read timeout.
    pub fn try_read_response(&mut self, wait: Duration) -> io::Result<Option<Value>> {
        self.writer.set_read_timeout(Some(wait))?;
        let outcome = match self.read_response() {
            Ok(value) => Ok(Some(value)),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(error),
        };
        self.writer.set_read_timeout(Some(RESPONSE_WAIT))?;
        outcome
    }

    /// Returns `true` once the server has closed the connection.
    #[must_use]
    pub fn is_closed_by_server(&mut self) -> bool {
        let mut line = String::new();
        matches!(self.reader.read_line(&mut line), Ok(0))
    }

    /// Closes the client's write half.
    ///
    /// # Errors
    ///
    /// Returns the socket error when the shutdown fails.
    pub fn finish_writing(&self) -> io::Result<()> {
        self.writer.shutdown(Shutdown::Write)
    }
}
