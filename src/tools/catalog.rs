//! Per-session tool catalog
//!
//! Holds the built-in descriptors fixed at session start, the dynamic portion
//! installed by the latest successful registry search, and the name to
//! registry-identifier map accumulated over the whole session.

use std::collections::HashMap;

use log::warn;

use crate::llm::ToolDefinition;

use super::definition::{ToolDescriptor, ToolKind};

/// How a tool name resolves against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Handled in-process
    Builtin,
    /// Executed remotely with this registry identifier
    Dynamic(String),
    /// Dynamic descriptor present but no identifier was ever recorded
    Unresolvable,
    /// Not a known tool
    Unknown,
}

/// Tool catalog for one session
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    builtins: Vec<ToolDescriptor>,
    dynamic: Vec<ToolDescriptor>,
    identifiers: HashMap<String, String>,
}

impl ToolCatalog {
    /// Create a catalog with the given built-in descriptors
    pub fn new(builtins: Vec<ToolDescriptor>) -> Self {
        let mut deduped: Vec<ToolDescriptor> = Vec::with_capacity(builtins.len());
        for mut desc in builtins {
            desc.kind = ToolKind::Builtin;
            match deduped.iter_mut().find(|d| d.name == desc.name) {
                Some(existing) => *existing = desc,
                None => deduped.push(desc),
            }
        }

        Self {
            builtins: deduped,
            dynamic: Vec::new(),
            identifiers: HashMap::new(),
        }
    }

    /// Replace the dynamic portion with `entries`
    ///
    /// Built-ins are untouched. Entries named like a built-in are dropped;
    /// duplicate names within `entries` keep the last one.
    pub fn reset_dynamic(&mut self, entries: impl IntoIterator<Item = ToolDescriptor>) {
        let mut next: Vec<ToolDescriptor> = Vec::new();
        for mut desc in entries {
            if self.is_builtin(&desc.name) {
                warn!("Discovered tool '{}' collides with a built-in; dropping it", desc.name);
                continue;
            }
            desc.kind = ToolKind::Dynamic;
            match next.iter_mut().find(|d| d.name == desc.name) {
                Some(existing) => *existing = desc,
                None => next.push(desc),
            }
        }
        self.dynamic = next;
    }

    /// Remember the registry identifier for a discovered tool name
    ///
    /// Kept for the rest of the session, across later `reset_dynamic` calls.
    pub fn record_identifier(&mut self, name: impl Into<String>, identifier: impl Into<String>) {
        let name = name.into();
        let identifier = identifier.into();

        if self.is_builtin(&name) {
            warn!("Ignoring registry identifier '{}' for built-in '{}'", identifier, name);
            return;
        }

        if let Some(previous) = self.identifiers.get(&name)
            && *previous != identifier
        {
            warn!(
                "Registry identifier for '{}' changed from '{}' to '{}'",
                name, previous, identifier
            );
        }
        self.identifiers.insert(name, identifier);
    }

    /// Tool definitions offered to the model: built-ins, then dynamic
    pub fn snapshot(&self) -> Vec<ToolDefinition> {
        self.builtins
            .iter()
            .chain(self.dynamic.iter())
            .map(ToolDescriptor::to_definition)
            .collect()
    }

    /// Resolve a tool name to where it runs
    pub fn resolve(&self, name: &str) -> Resolution {
        if self.is_builtin(name) {
            return Resolution::Builtin;
        }

        let in_dynamic = self.dynamic.iter().any(|d| d.name == name);
        match (self.identifiers.get(name), in_dynamic) {
            (Some(identifier), _) => Resolution::Dynamic(identifier.clone()),
            (None, true) => Resolution::Unresolvable,
            (None, false) => Resolution::Unknown,
        }
    }

    /// Get a descriptor from the current catalog
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.builtins
            .iter()
            .chain(self.dynamic.iter())
            .find(|d| d.name == name)
    }

    /// Check if a name is in the current catalog
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of descriptors currently offered
    pub fn len(&self) -> usize {
        self.builtins.len() + self.dynamic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn builtins(&self) -> &[ToolDescriptor] {
        &self.builtins
    }

    pub fn dynamic(&self) -> &[ToolDescriptor] {
        &self.dynamic
    }

    pub fn identifier_for(&self, name: &str) -> Option<&str> {
        self.identifiers.get(name).map(String::as_str)
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.builtins.iter().any(|d| d.name == name)
    }
}
