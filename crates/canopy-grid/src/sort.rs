//! Sorting state and stable row sorting
//!
//! Header clicks cycle a column through unsorted → ascending → descending →
//! unsorted. With multi-sort off, clicking another column replaces the
//! current sort; with multi-sort on, sorts accumulate in click order.

use std::cmp::Ordering;
use std::ops::Deref;

use canopy_core::{ColumnSet, Row, Value};
use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Wire form used in server requests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    /// Header indicator
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Ascending => "▲",
            Self::Descending => "▼",
        }
    }
}

/// One active sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column_id: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column_id: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column_id: column_id.into(),
            direction,
        }
    }

    pub fn ascending(column_id: impl Into<String>) -> Self {
        Self::new(column_id, SortDirection::Ascending)
    }

    pub fn descending(column_id: impl Into<String>) -> Self {
        Self::new(column_id, SortDirection::Descending)
    }
}

/// Where null values land in sorted output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NullPosition {
    First,
    /// Nulls sort after every value in both directions
    #[default]
    Last,
}

/// Ordered list of active sorts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    keys: Vec<SortKey>,
    multi: bool,
    null_position: NullPosition,
}

impl SortState {
    pub fn new(multi: bool) -> Self {
        Self {
            multi,
            ..Self::default()
        }
    }

    pub fn with_null_position(mut self, null_position: NullPosition) -> Self {
        self.null_position = null_position;
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Switching multi-sort off keeps only the highest-priority sort
    pub fn set_multi(&mut self, multi: bool) {
        self.multi = multi;
        if !multi {
            self.keys.truncate(1);
        }
    }

    pub fn null_position(&self) -> NullPosition {
        self.null_position
    }

    /// Highest-priority sort
    pub fn primary(&self) -> Option<&SortKey> {
        self.keys.first()
    }

    pub fn direction_of(&self, column_id: &str) -> Option<SortDirection> {
        self.keys
            .iter()
            .find(|k| k.column_id == column_id)
            .map(|k| k.direction)
    }

    /// Advance `column_id` one step through the header-click cycle and
    /// return its new direction, `None` meaning unsorted
    pub fn toggle(&mut self, column_id: &str) -> Option<SortDirection> {
        let next = match self.direction_of(column_id) {
            None => Some(SortDirection::Ascending),
            Some(SortDirection::Ascending) => Some(SortDirection::Descending),
            Some(SortDirection::Descending) => None,
        };

        if self.multi {
            match (next, self.keys.iter().position(|k| k.column_id == column_id)) {
                (Some(direction), Some(i)) => self.keys[i].direction = direction,
                (Some(direction), None) => self.keys.push(SortKey::new(column_id, direction)),
                (None, Some(i)) => {
                    self.keys.remove(i);
                }
                (None, None) => {}
            }
        } else {
            self.keys.clear();
            if let Some(direction) = next {
                self.keys.push(SortKey::new(column_id, direction));
            }
        }

        tracing::debug!(column_id, direction = ?next, sorts = self.keys.len(), "sort toggled");
        next
    }

    /// Replace the whole sort list; only the first key is kept unless
    /// multi-sort is enabled
    pub fn set(&mut self, mut keys: Vec<SortKey>) {
        if !self.multi {
            keys.truncate(1);
        }
        self.keys = keys;
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    fn compare_values(&self, a: &Value, b: &Value, direction: SortDirection) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => match self.null_position {
                NullPosition::First => Ordering::Less,
                NullPosition::Last => Ordering::Greater,
            },
            (false, true) => match self.null_position {
                NullPosition::First => Ordering::Greater,
                NullPosition::Last => Ordering::Less,
            },
            (false, false) => match direction {
                SortDirection::Ascending => a.compare(b),
                SortDirection::Descending => a.compare(b).reverse(),
            },
        }
    }

    /// Stable sort of `rows` by the active keys. Keys naming unknown or
    /// unsortable columns are skipped; equal rows keep their input order.
    pub fn sort_rows<R: Deref<Target = Row>>(&self, columns: &ColumnSet, rows: &mut Vec<R>) {
        let active: Vec<_> = self
            .keys
            .iter()
            .filter_map(|key| {
                columns
                    .get(&key.column_id)
                    .filter(|c| c.sortable)
                    .map(|c| (c, key.direction))
            })
            .collect();
        if active.is_empty() {
            return;
        }

        // Read every sort value once up front
        let mut decorated: Vec<(Vec<Value>, R)> = rows
            .drain(..)
            .map(|row| {
                let values = active.iter().map(|(c, _)| c.value_of(&row)).collect();
                (values, row)
            })
            .collect();

        decorated.sort_by(|(a, _), (b, _)| {
            active
                .iter()
                .enumerate()
                .map(|(i, (_, direction))| self.compare_values(&a[i], &b[i], *direction))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        rows.extend(decorated.into_iter().map(|(_, row)| row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::ColumnDescriptor;
    use pretty_assertions::assert_eq;

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDescriptor::text("name", "Name"),
            ColumnDescriptor::number("age", "Age"),
            ColumnDescriptor::text("note", "Note").sortable(false),
        ])
        .unwrap()
    }

    fn rows() -> Vec<Row> {
        [("Narra", Some(30)), ("Acacia", None), ("Molave", Some(12)), ("Yakal", Some(30))]
            .into_iter()
            .enumerate()
            .map(|(i, (name, age))| {
                let age = age.map(Value::Int64).unwrap_or(Value::Null);
                Row::from_pairs(i, [("id", Value::Int64(i as i64 + 1)), ("name", Value::from(name)), ("age", age)])
            })
            .collect()
    }

    fn names(rows: &[&Row]) -> Vec<String> {
        rows.iter()
            .map(|r| r.get("name").map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_toggle_cycle_single_mode() {
        let mut state = SortState::new(false);
        assert_eq!(state.toggle("age"), Some(SortDirection::Ascending));
        assert_eq!(state.toggle("age"), Some(SortDirection::Descending));
        assert_eq!(state.toggle("age"), None);
        assert!(state.is_empty());
    }

    #[test]
    fn test_other_column_replaces_sort_in_single_mode() {
        let mut state = SortState::new(false);
        state.toggle("age");
        state.toggle("age");
        assert_eq!(state.toggle("name"), Some(SortDirection::Ascending));
        assert_eq!(state.keys(), &[SortKey::ascending("name")]);
        assert_eq!(state.direction_of("age"), None);
    }

    #[test]
    fn test_multi_sort_accumulates_in_click_order() {
        let mut state = SortState::new(true);
        state.toggle("age");
        state.toggle("name");
        state.toggle("age");
        assert_eq!(
            state.keys(),
            &[SortKey::descending("age"), SortKey::ascending("name")]
        );
        state.toggle("age");
        assert_eq!(state.keys(), &[SortKey::ascending("name")]);
    }

    #[test]
    fn test_sort_is_stable_and_nulls_last() {
        let data = rows();
        let cols = columns();
        let mut state = SortState::new(false);

        state.toggle("age");
        let mut view: Vec<&Row> = data.iter().collect();
        state.sort_rows(&cols, &mut view);
        assert_eq!(names(&view), vec!["Molave", "Narra", "Yakal", "Acacia"]);

        state.toggle("age");
        let mut view: Vec<&Row> = data.iter().collect();
        state.sort_rows(&cols, &mut view);
        // Ties keep input order and nulls stay last when descending
        assert_eq!(names(&view), vec!["Narra", "Yakal", "Molave", "Acacia"]);
    }

    #[test]
    fn test_unsortable_column_is_ignored() {
        let data = rows();
        let mut state = SortState::new(false);
        state.set(vec![SortKey::descending("note")]);
        let mut view: Vec<&Row> = data.iter().collect();
        state.sort_rows(&columns(), &mut view);
        assert_eq!(names(&view), vec!["Narra", "Acacia", "Molave", "Yakal"]);
    }
}
