//! Canonical identity handling for member and account names.
//!
//! A name's canonical form is the casing it was stored with; every lookup is
//! case-insensitive. The roster keeps a lowercase → canonical index next to
//! the ordered name list, rebuilt only when membership changes.

use std::collections::HashMap;

/// Result of a membership toggle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToggleAction {
    /// The name was appended, stored exactly as submitted.
    Added(String),
    /// A case-insensitive match existed and was removed; carries the stored
    /// casing of the removed entry.
    Removed(String),
}

/// An ordered name roster with case-insensitive lookup.
///
/// Invariant: no two stored names are equal under case-insensitive
/// comparison. Duplicates in the underlying document (e.g. hand-edited
/// files) are tolerated on load; `resolve` then returns the first match.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    names: Vec<String>,
    index: HashMap<String, String>,
}

impl Roster {
    pub fn from_names(names: &[String]) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for name in names {
            index
                .entry(name.to_lowercase())
                .or_insert_with(|| name.clone());
        }
        Self {
            names: names.to_vec(),
            index,
        }
    }

    /// Resolves free text to the canonical stored name, first match wins.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.index.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }

    /// Adds the name if absent, removes the stored entry if present.
    pub fn toggle(&mut self, submitted: &str) -> ToggleAction {
        let submitted = submitted.trim();
        let key = submitted.to_lowercase();

        if let Some(canonical) = self.index.remove(&key) {
            self.names.retain(|n| n.to_lowercase() != key);
            ToggleAction::Removed(canonical)
        } else {
            self.names.push(submitted.to_string());
            self.index.insert(key, submitted.to_string());
            ToggleAction::Added(submitted.to_string())
        }
    }
}
