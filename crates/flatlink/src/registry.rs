// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command registry: named commands, their declared argument schemas, and
//! the handlers dispatched when a request arrives.
//!
//! Handlers run in registration order and there may be any number per
//! command, including zero for commands that are advertised before being
//! wired up. Re-registering an existing command keeps the original schema;
//! only the new handler is appended. The registry is shared between the
//! caller-facing [`crate::Service`] and its worker thread, so every method
//! takes `&self`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::protocol::types::{ArgSpec, Command, CommandDescription};

/// Callback invoked with each decoded request for its command. Shared
/// ownership lets one closure serve several commands.
pub type CommandHandler = Arc<dyn Fn(&Command) + Send + Sync>;

struct CommandEntry {
    schema: Vec<ArgSpec>,
    handlers: Vec<CommandHandler>,
}

/// Thread-safe map from command name to schema and handler chain.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, CommandEntry>>,
}

fn recover_read<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::debug!("[REGISTRY] {} read lock poisoned, recovering", what);
            poisoned.into_inner()
        }
    }
}

fn recover_write<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::debug!("[REGISTRY] {} write lock poisoned, recovering", what);
            poisoned.into_inner()
        }
    }
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with its argument schema and, optionally, a first
    /// handler.
    ///
    /// Always succeeds. When the command already exists its schema is kept
    /// untouched and any handler given here is appended to the existing
    /// chain, so independent subsystems can hook the same command without
    /// coordinating.
    pub fn register_command(
        &self,
        name: &str,
        schema: Vec<ArgSpec>,
        handler: Option<CommandHandler>,
    ) -> bool {
        let mut commands = recover_write(&self.commands, "commands");
        if let Some(entry) = commands.get_mut(name) {
            log::debug!("[REGISTRY] register_command keeping schema (exists) command='{name}'");
            if let Some(handler) = handler {
                entry.handlers.push(handler);
            }
            return true;
        }
        log::debug!(
            "[REGISTRY] register_command inserted command='{name}' args={}",
            schema.len()
        );
        let handlers = handler.into_iter().collect();
        commands.insert(name.to_string(), CommandEntry { schema, handlers });
        true
    }

    /// Appends a handler to an already registered command. Returns `false`
    /// and changes nothing when the command is unknown.
    pub fn register_handler(&self, name: &str, handler: CommandHandler) -> bool {
        let mut commands = recover_write(&self.commands, "commands");
        match commands.get_mut(name) {
            Some(entry) => {
                entry.handlers.push(handler);
                true
            }
            None => {
                log::error!("[REGISTRY] register_handler for unknown command '{name}'");
                false
            }
        }
    }

    /// Runs every handler registered for `request`'s command, in
    /// registration order. Returns `false` without side effects when the
    /// command is unknown; a known command with zero handlers dispatches
    /// successfully. A panicking handler is caught and logged, the rest of
    /// the chain still runs.
    pub fn dispatch(&self, request: &Command) -> bool {
        // Handlers run outside the lock so they may register new commands.
        let handlers = {
            let commands = recover_read(&self.commands, "commands");
            match commands.get(&request.name) {
                Some(entry) => entry.handlers.clone(),
                None => {
                    log::error!("[REGISTRY] no such command '{}'", request.name);
                    return false;
                }
            }
        };
        for handler in &handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(request);
            }));
            if result.is_err() {
                log::error!("[REGISTRY] handler panicked during '{}'", request.name);
            }
        }
        true
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        recover_read(&self.commands, "commands").contains_key(name)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        recover_read(&self.commands, "commands").len()
    }

    /// Declared schema of `name`, when registered.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<Vec<ArgSpec>> {
        recover_read(&self.commands, "commands").get(name).map(|e| e.schema.clone())
    }

    /// Snapshot of every command and schema, the shape advertised in
    /// discovery responses.
    #[must_use]
    pub fn describe(&self) -> Vec<CommandDescription> {
        recover_read(&self.commands, "commands")
            .iter()
            .map(|(name, entry)| CommandDescription {
                name: name.clone(),
                args: entry.schema.clone(),
            })
            .collect()
    }
}
