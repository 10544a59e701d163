//! Key selection: which field identifies a record of a given shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DiffError, Result};
use crate::shape::ShapeAnalysis;

/// Signature to selected key field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMapping(BTreeMap<String, String>);

impl KeyMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected field for `signature`, ignoring blank entries.
    pub fn get(&self, signature: &str) -> Option<&str> {
        self.0
            .get(signature)
            .map(String::as_str)
            .filter(|field| !field.trim().is_empty())
    }

    pub fn set(&mut self, signature: impl Into<String>, field: impl Into<String>) {
        self.0.insert(signature.into(), field.into());
    }

    pub fn remove(&mut self, signature: &str) -> Option<String> {
        self.0.remove(signature)
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.0.contains_key(signature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fills entries missing or blank in `self` with those from
    /// `suggestions`. Non-blank entries are never replaced.
    pub fn merge_missing(mut self, suggestions: KeyMapping) -> KeyMapping {
        for (signature, field) in suggestions.0 {
            if self.get(&signature).is_none() {
                self.0.insert(signature, field);
            }
        }
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Key fields that can be chosen without asking: shapes with exactly one
/// candidate. When both sides propose a different unique field for the same
/// signature, the before side wins.
pub fn suggest_keys(before: &ShapeAnalysis, after: &ShapeAnalysis) -> KeyMapping {
    let mut suggestions = KeyMapping::new();
    for shape in before.shapes.iter().chain(&after.shapes) {
        if let Some(field) = shape.unique_candidate() {
            if !suggestions.contains(&shape.signature) {
                suggestions.set(shape.signature.clone(), field);
            }
        }
    }
    suggestions
}

/// Returns `existing` with auto-selected keys added where no entry exists yet.
pub fn resolve_keys(
    before: &ShapeAnalysis,
    after: &ShapeAnalysis,
    existing: &KeyMapping,
) -> KeyMapping {
    let suggestions = suggest_keys(before, after);
    let resolved = existing.clone().merge_missing(suggestions);
    debug!(
        existing = existing.len(),
        resolved = resolved.len(),
        "resolved key selections"
    );
    resolved
}

/// Signatures present in both inventories that still lack a key field.
pub fn missing_key_selections(
    before: &ShapeAnalysis,
    after: &ShapeAnalysis,
    mapping: &KeyMapping,
) -> Vec<String> {
    before
        .signatures()
        .filter(|sig| after.contains(sig) && mapping.get(sig).is_none())
        .map(str::to_string)
        .collect()
}

/// Gate run before diffing: every shared shape needs a key field.
pub fn validate_key_selection(
    before: &ShapeAnalysis,
    after: &ShapeAnalysis,
    mapping: &KeyMapping,
) -> Result<()> {
    match missing_key_selections(before, after, mapping).into_iter().next() {
        Some(signature) => Err(DiffError::MissingKeySelection { signature }),
        None => Ok(()),
    }
}
