//! The polymorphic result value stored under each selector id.
//!
//! A selector evaluation produces a scalar string, a list, a nested map, or
//! a list of maps depending on the selector kind. The shapes serialize
//! transparently (untagged), so the output document reads the same as the
//! original export format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single extracted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A bare string (e.g. a single text match).
    Text(String),
    /// A list of values (multiple matches, table rows, element maps).
    List(Vec<Value>),
    /// A nested mapping (element children, table header/rows, sub-scrapes).
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Wrap a list of strings, collapsing a single match to a bare string.
    ///
    /// Returns `None` for an empty list — empty results are omitted from
    /// the output map entirely.
    pub fn collapsed(mut items: Vec<String>) -> Option<Value> {
        match items.len() {
            0 => None,
            1 => Some(Value::Text(items.remove(0))),
            _ => Some(Value::List(items.into_iter().map(Value::Text).collect())),
        }
    }

    /// Wrap a list of strings without collapsing.
    pub fn list_of(items: Vec<String>) -> Value {
        Value::List(items.into_iter().map(Value::Text).collect())
    }

    /// Compact single-line rendering, used for the CSV export column.
    pub fn to_compact_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
