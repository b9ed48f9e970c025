//! Row selection keyed by row identity

use canopy_core::RowId;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Whether more than one row may be selected at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Single,
    #[default]
    Multi,
}

/// Selected row identities, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSelection {
    mode: SelectionMode,
    selected: IndexSet<RowId>,
}

impl RowSelection {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            selected: IndexSet::new(),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Flip one row. In single mode selecting a row deselects any other.
    /// Returns whether the row is now selected.
    pub fn toggle(&mut self, id: &RowId) -> bool {
        if self.selected.shift_remove(id) {
            return false;
        }
        self.select(id.clone());
        true
    }

    pub fn select(&mut self, id: RowId) {
        if self.mode == SelectionMode::Single {
            self.selected.clear();
        }
        self.selected.insert(id);
    }

    pub fn deselect(&mut self, id: &RowId) -> bool {
        self.selected.shift_remove(id)
    }

    /// Select every given row; in single mode only the first is kept
    pub fn select_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a RowId>) {
        match self.mode {
            SelectionMode::Single => {
                if let Some(first) = ids.into_iter().next() {
                    self.select(first.clone());
                }
            }
            SelectionMode::Multi => self.selected.extend(ids.into_iter().cloned()),
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.selected.contains(id)
    }

    /// Whether every given row is selected (false for no rows)
    pub fn contains_all<'a>(&self, ids: impl IntoIterator<Item = &'a RowId>) -> bool {
        let mut any = false;
        for id in ids {
            if !self.selected.contains(id) {
                return false;
            }
            any = true;
        }
        any
    }

    /// Drop identities no longer present; returns how many were removed
    pub fn retain(&mut self, keep: impl Fn(&RowId) -> bool) -> usize {
        let before = self.selected.len();
        self.selected.retain(|id| keep(id));
        before - self.selected.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowId> {
        self.selected.iter()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
