//! Command model, registry, and loading for the host bridge daemon.
//!
//! A [`Command`] turns request parameters into a [`HostJob`]: a closure that
//! runs later on the host thread with exclusive access to the [`Document`].
//! Commands are registered in a [`CommandRegistry`] whose table is swapped
//! atomically by the [`CommandLoader`] when the registry file is reloaded.
//! Implementations come either from a compiled-in [`BuiltinCatalog`] or from
//! plugin executables described by manifests (see [`plugin`]).

pub mod command;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod loader;
pub mod plugin;
pub mod registry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
#[cfg(test)]
mod tests;

pub use self::command::{Command, HostHandle, HostJob, parse_params};
pub use self::descriptor::{CommandDescriptor, ModuleSource, VERSION_PLACEHOLDER};
pub use self::document::{
    Document, DocumentError, Element, ElementId, NewElement, Transaction, View, ViewId,
};
pub use self::error::CommandError;
pub use self::loader::{
    BuiltinCatalog, CommandFactory, CommandLoader, FailedCommand, LoadError, LoadReport,
};
pub use self::registry::{CommandRegistry, CommandTable, RegisteredCommand, RegistryError};
