//! Connection handling abstraction for the listener.

use std::net::TcpStream;
use std::sync::atomic::AtomicBool;

/// Handles accepted connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection until it ends or `shutdown` is raised.
    ///
    /// Runs on a thread dedicated to the connection. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: TcpStream, shutdown: &AtomicBool);
}
