//! Wire types shared by the hostbridge daemon and its command crates.
//!
//! Clients talk to the daemon using a JSON-RPC 2.0 shaped protocol. Each
//! request names a command (`method`), carries an optional parameter tree,
//! and optionally an identifier. Requests without an identifier are
//! notifications and never receive a response.
//!
//! ```json
//! {"jsonrpc":"2.0","method":"say_hello","id":"1"}
//! ```
//!
//! The daemon answers with exactly one success or error envelope:
//!
//! ```json
//! {"jsonrpc":"2.0","id":"1","result":{"execute":true}}
//! {"jsonrpc":"2.0","id":null,"error":{"code":-32600,"message":"..."}}
//! ```
//!
//! Error codes come from the closed [`ErrorCode`] taxonomy, which covers the
//! standard JSON-RPC range plus host, plugin and application specific codes.

mod error_code;
mod request;
mod response;

pub use self::error_code::ErrorCode;
pub use self::request::{ProtocolError, Request, RequestId};
pub use self::response::{ErrorObject, Response};

/// Protocol version tag every request must carry.
pub const JSONRPC_VERSION: &str = "2.0";
