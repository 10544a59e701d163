//! Fatal errors and non-fatal warnings produced by the engine.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result type alias using the engine's [`DiffError`].
pub type Result<T> = std::result::Result<T, DiffError>;

/// Which of the two compared collections something came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Before,
    After,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Before => f.write_str("before"),
            Side::After => f.write_str("after"),
        }
    }
}

/// Errors that abort an operation; nothing partial is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// The collection is not an array, or (`index` set) an element is not an object.
    #[error("{}", describe_invalid_input(.side, .index, .found))]
    InvalidInputShape {
        side: Option<Side>,
        index: Option<usize>,
        found: &'static str,
    },

    /// A shape present in both collections has no key field selected.
    #[error("no key field selected for shape \"{signature}\" (present in both collections)")]
    MissingKeySelection { signature: String },
}

fn describe_invalid_input(side: &Option<Side>, index: &Option<usize>, found: &str) -> String {
    let input = match side {
        Some(side) => format!("{side} collection"),
        None => "collection".to_string(),
    };
    match index {
        Some(i) => format!("invalid {input}: element {i} is {found}, expected an object"),
        None => format!("invalid {input}: expected an array of objects, found {found}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    /// A non-object element was skipped.
    InvalidRecord,
    /// The configured key field is missing, not a string, or blank.
    InvalidKeyValue,
    /// Two records on the same side share a key value.
    DuplicateKey,
    /// A shape has no field usable as a key.
    NoKeyCandidates,
}

/// A recoverable issue reported alongside an otherwise complete result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_value: Option<String>,
    /// The offending value, for warnings about a field's content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Warning {
    pub(crate) fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            side: None,
            index: None,
            signature: None,
            field: None,
            key_value: None,
            value: None,
        }
    }

    pub(crate) fn at(mut self, side: Side, index: usize) -> Self {
        self.side = Some(side);
        self.index = Some(index);
        self
    }

    pub(crate) fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub(crate) fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub(crate) fn key_value(mut self, key_value: &str) -> Self {
        self.key_value = Some(key_value.to_string());
        self
    }

    pub(crate) fn value(mut self, value: &Value) -> Self {
        self.value = Some(value.clone());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
