//! TCP transport for JSON-RPC clients.
//!
//! [`TcpCommandListener`] accepts connections on a background thread and
//! hands each one to a [`ConnectionHandler`] on its own thread. The daemon
//! uses [`SessionHandler`], which reads requests until the client hangs up
//! and answers each one through the [`Dispatcher`](crate::Dispatcher).

mod errors;
mod handler;
mod listener;
mod session;
#[cfg(test)]
mod test_utils;

pub use self::errors::{ListenerError, SessionError};
pub use self::handler::ConnectionHandler;
pub use self::listener::{ListenerHandle, TcpCommandListener};
pub use self::session::{READ_CHUNK_BYTES, SessionEnd, SessionHandler};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
