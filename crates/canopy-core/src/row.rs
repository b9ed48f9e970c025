//! Rows and row identities

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{CanopyError, Result, Value};

/// Field names probed, in order, when resolving a row's identity
pub const IDENTITY_FIELDS: [&str; 2] = ["id", "_id"];

/// Stable key correlating a displayed row with its record across re-fetches.
///
/// Resolved from the `id` field, falling back to `_id`, and finally to the
/// row's position in the data set it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowId {
    Int(i64),
    Text(String),
    Index(usize),
}

impl RowId {
    /// Derive an identity from a field value, if the value can serve as one
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int64(v) => Some(RowId::Int(*v)),
            Value::Float64(v) if v.fract() == 0.0 && v.is_finite() => Some(RowId::Int(*v as i64)),
            Value::String(s) if !s.is_empty() => Some(RowId::Text(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowId::Int(v) => write!(f, "{}", v),
            RowId::Text(s) => write!(f, "{}", s),
            RowId::Index(i) => write!(f, "#{}", i),
        }
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        RowId::Int(value)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId::Text(value.to_string())
    }
}

/// One data record plus its identity
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    fields: IndexMap<String, Value>,
}

impl Row {
    /// Create a row, resolving its identity from `id`/`_id` or `index`
    pub fn new(index: usize, fields: IndexMap<String, Value>) -> Self {
        let id = IDENTITY_FIELDS
            .iter()
            .filter_map(|name| fields.get(*name))
            .find_map(RowId::from_value)
            .unwrap_or(RowId::Index(index));
        Self { id, fields }
    }

    /// Create a row from `(field, value)` pairs
    pub fn from_pairs<K, V>(index: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(index, fields)
    }

    /// Create a row from a JSON object
    pub fn from_json(index: usize, value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Self::new(
                index,
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
            other => Err(CanopyError::InvalidRow(format!(
                "row {} is not a JSON object: {}",
                index, other
            ))),
        }
    }

    /// Parse a JSON array of objects into rows
    pub fn rows_from_json(value: serde_json::Value) -> Result<Vec<Self>> {
        match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| Self::from_json(index, item))
                .collect(),
            other => Err(CanopyError::InvalidRow(format!(
                "expected an array of rows, got: {}",
                other
            ))),
        }
    }

    pub fn id(&self) -> &RowId {
        &self.id
    }

    /// Get a field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    /// Return a copy of this row with `field` set to `value`.
    ///
    /// The identity is kept even when an identity field is rewritten.
    pub fn with_field(&self, field: &str, value: Value) -> Row {
        let mut fields = self.fields.clone();
        fields.insert(field.to_string(), value);
        Row {
            id: self.id.clone(),
            fields,
        }
    }

    /// Return a copy of this row with `field` removed, preserving the order
    /// of the remaining fields
    pub fn without_field(&self, field: &str) -> Row {
        let mut fields = self.fields.clone();
        fields.shift_remove(field);
        Row {
            id: self.id.clone(),
            fields,
        }
    }

    /// Convert to a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}
