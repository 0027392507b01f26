//! Command registry.
//!
//! Maps a normalised command name plus invocation kind to its handler
//! record. The registry is filled once at startup and read concurrently
//! afterwards; nothing mutates it while events are dispatched.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::descriptor::InvocationKind;
use crate::handler::Handler;
use crate::path::{normalize, path_to_string};
use crate::requirement::RequirementDescriptor;
use crate::schema::{CompiledOption, ParameterSpec};

/// A compiled, dispatchable command.
#[derive(Clone)]
pub struct HandlerRecord {
    /// Lowercase name segments, at most three for slash commands.
    pub full_name: Vec<String>,
    pub description: String,
    pub kinds: BTreeSet<InvocationKind>,
    pub handler: Arc<dyn Handler>,
    pub params: Vec<ParameterSpec>,
    pub requirements: Vec<RequirementDescriptor>,
}

impl HandlerRecord {
    /// Canonical space-joined name.
    pub fn name(&self) -> String {
        path_to_string(&self.full_name)
    }

    /// Command options in declaration order.
    pub fn options(&self) -> impl Iterator<Item = &CompiledOption> {
        self.params.iter().filter_map(ParameterSpec::option)
    }
}

impl fmt::Debug for HandlerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("full_name", &self.full_name)
            .field("kinds", &self.kinds)
            .field("params", &self.params)
            .field("requirements", &self.requirements)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate {kind} command: '{name}' is already registered")]
    Duplicate { name: String, kind: InvocationKind },
}

/// Lookup table from `(name, kind)` to handler record.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    records: Vec<Arc<HandlerRecord>>,
    index: HashMap<(String, InvocationKind), usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers records, failing without changes if any `(name, kind)` pair
    /// is already taken by a different record.
    ///
    /// Registering the same record again is a no-op. Records without name
    /// segments are skipped.
    pub fn register<I>(&mut self, records: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = Arc<HandlerRecord>>,
    {
        let mut pending: HashMap<(String, InvocationKind), Arc<HandlerRecord>> = HashMap::new();
        let mut order: Vec<(String, InvocationKind)> = Vec::new();

        for record in records {
            if record.full_name.is_empty() {
                debug!("Skipping command with an empty name");
                continue;
            }
            let name = record.name();
            for kind in &record.kinds {
                let key = (name.clone(), *kind);
                let taken_by = self
                    .index
                    .get(&key)
                    .map(|&i| &self.records[i])
                    .or_else(|| pending.get(&key));
                match taken_by {
                    Some(existing) if Arc::ptr_eq(existing, &record) => {}
                    Some(_) => {
                        return Err(RegistryError::Duplicate {
                            name: name.clone(),
                            kind: *kind,
                        })
                    }
                    None => {
                        order.push(key.clone());
                        pending.insert(key, Arc::clone(&record));
                    }
                }
            }
        }

        for key in order {
            let Some(record) = pending.remove(&key) else {
                continue;
            };
            let idx = match self.records.iter().position(|r| Arc::ptr_eq(r, &record)) {
                Some(idx) => idx,
                None => {
                    self.records.push(record);
                    self.records.len() - 1
                }
            };
            debug!(command = %key.0, kind = %key.1, "Registered command");
            self.index.insert(key, idx);
        }
        Ok(())
    }

    /// Finds the record for `name`, which may use any case and either
    /// separator.
    pub fn lookup(&self, name: &str, kind: InvocationKind) -> Option<&Arc<HandlerRecord>> {
        self.index
            .get(&(normalize(name), kind))
            .map(|&i| &self.records[i])
    }

    /// Records of one kind, in registration order.
    pub fn list_by_kind(&self, kind: InvocationKind) -> Vec<Arc<HandlerRecord>> {
        self.records
            .iter()
            .filter(|r| r.kinds.contains(&kind))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<HandlerRecord>> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
