//! Commands compiled into the daemon.
//!
//! Each command converts its parameters on the session thread and returns a
//! host job that reads or edits the [`Document`](hostbridge_commands::Document).
//! [`catalog`] lists them for the [`CommandLoader`](hostbridge_commands::CommandLoader).

mod elements;
mod hello;
mod view;

use std::time::Duration;

use hostbridge_commands::BuiltinCatalog;

pub use self::elements::{CreateElements, DeleteElements};
pub use self::hello::SayHello;
pub use self::view::{CurrentViewElements, CurrentViewInfo};

/// Timeout for read-only queries.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for bulk element creation.
pub const CREATE_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for element deletion.
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(15);

/// Returns the catalogue of built-in commands.
#[must_use]
pub fn catalog() -> BuiltinCatalog {
    BuiltinCatalog::new()
        .with(SayHello::NAME, || Box::new(SayHello))
        .with(CurrentViewInfo::NAME, || Box::new(CurrentViewInfo))
        .with(CurrentViewElements::NAME, || Box::new(CurrentViewElements))
        .with(CreateElements::NAME, || Box::new(CreateElements))
        .with(DeleteElements::NAME, || Box::new(DeleteElements))
}
