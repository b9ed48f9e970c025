//! Row cache snapshots
//!
//! [`RowCache`] is an immutable, identity-indexed snapshot of the rows a grid
//! displays. Every change (an optimistic patch, its rollback, a row insert)
//! produces a new snapshot that shares untouched rows with the previous one,
//! so readers holding an old snapshot are never affected by a later write.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{Row, RowId, Value};

/// Monotonic id assigned to each commit attempt
pub type MutationId = u64;

/// A provisional cell change applied ahead of server confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticPatch {
    pub row_id: RowId,
    pub field: String,
    /// Value before the patch; `None` when the field was absent
    pub previous_value: Option<Value>,
    pub new_value: Value,
    pub mutation_id: MutationId,
}

/// Immutable snapshot of the current data set keyed by row identity
#[derive(Debug, Clone, Default)]
pub struct RowCache {
    rows: Arc<Vec<Arc<Row>>>,
    index: Arc<HashMap<RowId, usize>>,
    version: u64,
}

impl RowCache {
    pub fn new(rows: Vec<Row>) -> Self {
        Self::from_shared(rows.into_iter().map(Arc::new).collect(), 0)
    }

    fn from_shared(rows: Vec<Arc<Row>>, version: u64) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            if index.contains_key(row.id()) {
                tracing::warn!(row_id = %row.id(), position, "duplicate row identity, keeping first");
                continue;
            }
            index.insert(row.id().clone(), position);
        }
        Self {
            rows: Arc::new(rows),
            index: Arc::new(index),
            version,
        }
    }

    /// Row by identity
    pub fn get(&self, id: &RowId) -> Option<&Row> {
        self.index.get(id).map(|&i| self.rows[i].as_ref())
    }

    /// Current value of one cell; `None` when the row or field is absent
    pub fn value(&self, id: &RowId, field: &str) -> Option<&Value> {
        self.get(id).and_then(|row| row.get(field))
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.index.contains_key(id)
    }

    /// Rows in data-source order
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &Row> {
        self.rows.iter().map(|r| r.as_ref())
    }

    /// Shared row handles in data-source order, for views that outlive
    /// a borrow of the cache
    pub fn shared_rows(&self) -> impl ExactSizeIterator<Item = &Arc<Row>> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Incremented by every snapshot-producing write
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether two handles point at the very same snapshot
    pub fn same_snapshot(&self, other: &RowCache) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
    }

    fn replace_row(&self, id: &RowId, f: impl FnOnce(&Row) -> Row) -> Option<Self> {
        let position = *self.index.get(id)?;
        let mut rows: Vec<Arc<Row>> = self.rows.as_ref().clone();
        let updated = f(&rows[position]);
        rows[position] = Arc::new(updated);
        Some(Self {
            rows: Arc::new(rows),
            index: Arc::clone(&self.index),
            version: self.version + 1,
        })
    }

    /// Apply a patch, producing a new snapshot. An unknown row leaves the
    /// cache unchanged.
    pub fn apply_patch(&self, patch: &OptimisticPatch) -> Self {
        self.set_value(&patch.row_id, &patch.field, patch.new_value.clone())
    }

    /// Undo a patch by restoring its previous value, or removing the field
    /// when it did not exist before
    pub fn rollback(&self, patch: &OptimisticPatch) -> Self {
        match &patch.previous_value {
            Some(previous) => self.set_value(&patch.row_id, &patch.field, previous.clone()),
            None => self
                .replace_row(&patch.row_id, |row| row.without_field(&patch.field))
                .unwrap_or_else(|| {
                    tracing::warn!(row_id = %patch.row_id, field = %patch.field, "rollback for unknown row ignored");
                    self.clone()
                }),
        }
    }

    /// Set one cell, producing a new snapshot
    pub fn set_value(&self, id: &RowId, field: &str, value: Value) -> Self {
        self.replace_row(id, |row| row.with_field(field, value))
            .unwrap_or_else(|| {
                tracing::warn!(row_id = %id, field, "write to unknown row ignored");
                self.clone()
            })
    }

    /// Prepend a row, as an optimistic create does
    pub fn insert_front(&self, row: Row) -> Self {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(Arc::new(row));
        rows.extend(self.rows.iter().cloned());
        Self::from_shared(rows, self.version + 1)
    }

    /// Drop a row by identity, as an optimistic delete does
    pub fn remove(&self, id: &RowId) -> Self {
        if !self.contains(id) {
            return self.clone();
        }
        let rows = self
            .rows
            .iter()
            .filter(|row| row.id() != id)
            .cloned()
            .collect();
        Self::from_shared(rows, self.version + 1)
    }

    /// Swap in a freshly fetched data set, keeping the version monotonic
    pub fn replace_rows(&self, rows: Vec<Row>) -> Self {
        Self::from_shared(rows.into_iter().map(Arc::new).collect(), self.version + 1)
    }
}

impl PartialEq for RowCache {
    fn eq(&self, other: &Self) -> bool {
        self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(other.rows.iter())
                .all(|(a, b)| a == b)
    }
}
