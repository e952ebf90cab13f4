//! Live command registry with atomic replacement.
//!
//! The registry publishes an immutable [`CommandTable`] behind an
//! `RwLock<Arc<_>>`. Lookups hold the read lock only long enough to clone
//! the `Arc`. Reloads are serialised by a separate mutex, build the
//! replacement table without touching the published one, and then swap it
//! in under a brief write lock, so readers see either the old table or the
//! new one and never a partially built mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use thiserror::Error;
use tracing::warn;

use crate::command::Command;
use crate::descriptor::CommandDescriptor;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Errors raised by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No command is registered under the name.
    #[error("command '{name}' is not registered")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },
}

/// A descriptor paired with its loaded implementation.
#[derive(Clone)]
pub struct RegisteredCommand {
    descriptor: Arc<CommandDescriptor>,
    command: Arc<dyn Command>,
}

impl RegisteredCommand {
    /// Pairs a descriptor with its implementation.
    #[must_use]
    pub fn new(descriptor: CommandDescriptor, command: Box<dyn Command>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            command: Arc::from(command),
        }
    }

    /// Returns the registration metadata.
    #[must_use]
    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    /// Returns the implementation.
    #[must_use]
    pub fn command(&self) -> &dyn Command {
        self.command.as_ref()
    }
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Immutable name-to-command mapping.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    entries: BTreeMap<String, RegisteredCommand>,
}

impl CommandTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a command under its descriptor's name.
    ///
    /// A later insert under the same name replaces the earlier one; the
    /// replaced entry is returned and a warning is logged.
    pub fn insert(
        &mut self,
        descriptor: CommandDescriptor,
        command: Box<dyn Command>,
    ) -> Option<RegisteredCommand> {
        let name = descriptor.name().to_owned();
        let previous = self
            .entries
            .insert(name.clone(), RegisteredCommand::new(descriptor, command));
        if previous.is_some() {
            warn!(
                target: REGISTRY_TARGET,
                command = %name,
                "duplicate command registration; keeping the later entry"
            );
        }
        previous
    }

    /// Looks up a command by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredCommand> {
        self.entries.get(name)
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Iterates over the registered commands in name order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCommand> {
        self.entries.values()
    }

    /// Returns the number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Thread-safe registry shared by every session.
///
/// # Example
///
/// ```
/// use hostbridge_commands::{CommandRegistry, CommandTable};
///
/// let registry = CommandRegistry::new();
/// assert!(registry.resolve("say_hello").is_err());
/// registry
///     .reload(|| Ok::<_, std::convert::Infallible>(CommandTable::new()))
///     .expect("reload");
/// assert!(registry.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct CommandRegistry {
    live: RwLock<Arc<CommandTable>>,
    reload_lock: Mutex<()>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry publishing `table`.
    #[must_use]
    pub fn with_table(table: CommandTable) -> Self {
        Self {
            live: RwLock::new(Arc::new(table)),
            reload_lock: Mutex::new(()),
        }
    }

    /// Returns the currently published table.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CommandTable> {
        let guard = self.live.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Resolves a command by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no command has the name.
    pub fn resolve(&self, name: &str) -> Result<RegisteredCommand, RegistryError> {
        self.snapshot()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_owned(),
            })
    }

    /// Adds one command to the live table.
    ///
    /// The current table is copied, extended and republished, so concurrent
    /// readers are unaffected.
    pub fn register(&self, descriptor: CommandDescriptor, command: Box<dyn Command>) {
        let _reload = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = CommandTable::clone(&self.snapshot());
        table.insert(descriptor, command);
        self.publish(table);
    }

    /// Replaces the whole table with the one produced by `build`.
    ///
    /// Only one reload runs at a time. When `build` fails the published
    /// table is left untouched.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `build`.
    pub fn reload<E>(&self, build: impl FnOnce() -> Result<CommandTable, E>) -> Result<(), E> {
        let _reload = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let table = build()?;
        self.publish(table);
        Ok(())
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.snapshot().names()
    }

    /// Returns the descriptors of every registered command.
    #[must_use]
    pub fn descriptors(&self) -> Vec<CommandDescriptor> {
        self.snapshot()
            .iter()
            .map(|entry| entry.descriptor().clone())
            .collect()
    }

    /// Returns the number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` when no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn publish(&self, table: CommandTable) {
        let replacement = Arc::new(table);
        let mut guard = self.live.write().unwrap_or_else(PoisonError::into_inner);
        *guard = replacement;
    }
}
