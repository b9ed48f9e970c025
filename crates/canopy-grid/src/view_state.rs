//! View state store
//!
//! [`ViewStateStore`] owns every piece of interactive grid state and notifies
//! subscribers synchronously after each change. The only lag is the global
//! filter: keystrokes update the raw text at once, while the value the
//! pipeline filters by settles after the debounce delay.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use canopy_core::{Result, RowId};
use serde::{Deserialize, Serialize};

use crate::debounce::{DEFAULT_DEBOUNCE, Debounced};
use crate::filter::{ColumnFilter, ColumnFilters};
use crate::pagination::{DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE_OPTIONS, PaginationState};
use crate::selection::{RowSelection, SelectionMode};
use crate::sort::{SortDirection, SortKey, SortState};

/// Table row density preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    Compact,
    #[default]
    Normal,
    Spacious,
}

impl Density {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compact => "Compact",
            Self::Normal => "Normal",
            Self::Spacious => "Spacious",
        }
    }

    /// Blank padding lines above and below cell text
    pub fn padding_lines(&self) -> usize {
        match self {
            Self::Compact | Self::Normal => 0,
            Self::Spacious => 1,
        }
    }

    pub fn all() -> &'static [Density] {
        &[Self::Compact, Self::Normal, Self::Spacious]
    }
}

/// Initial configuration of a store
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    pub multi_sort: bool,
    pub selection_mode: SelectionMode,
    pub search_debounce: Duration,
    pub density: Density,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            multi_sort: false,
            selection_mode: SelectionMode::Multi,
            search_debounce: DEFAULT_DEBOUNCE,
            density: Density::Normal,
        }
    }
}

/// All interactive state of one grid
#[derive(Debug, Clone)]
pub struct ViewState {
    pub sorting: SortState,
    pub column_filters: ColumnFilters,
    pub global_filter: Debounced<String>,
    /// Columns absent from the map are visible
    pub column_visibility: HashMap<String, bool>,
    pub row_selection: RowSelection,
    pub pagination: PaginationState,
    pub density: Density,
}

impl ViewState {
    pub fn new(options: &ViewOptions) -> Result<Self> {
        Ok(Self {
            sorting: SortState::new(options.multi_sort),
            column_filters: ColumnFilters::new(),
            global_filter: Debounced::new(String::new(), options.search_debounce),
            column_visibility: HashMap::new(),
            row_selection: RowSelection::new(options.selection_mode),
            pagination: PaginationState::new(
                options.page_size,
                options.page_size_options.clone(),
            )?,
            density: options.density,
        })
    }

    pub fn is_visible(&self, column_id: &str) -> bool {
        self.column_visibility.get(column_id).copied().unwrap_or(true)
    }

    /// Settled global filter text, trimmed
    pub fn global_filter(&self) -> &str {
        self.global_filter.settled().trim()
    }

    /// Column filters that actually constrain rows
    pub fn active_filters(&self) -> impl Iterator<Item = (&String, &ColumnFilter)> {
        self.column_filters.iter().filter(|(_, f)| f.is_active())
    }
}

/// What part of the state changed
#[derive(Debug, Clone, PartialEq)]
pub enum ViewStateChange {
    Sorting {
        column_id: Option<String>,
        direction: Option<SortDirection>,
    },
    ColumnFilters,
    /// Raw search text changed; the pipeline input has not yet
    GlobalFilterInput(String),
    /// Search text settled and now applies
    GlobalFilter(String),
    ColumnVisibility,
    RowSelection,
    Pagination { page_index: usize, page_size: usize },
    Density(Density),
}

type Listener = Box<dyn FnMut(&ViewStateChange, &ViewState) + Send>;

/// Single source of truth for a grid's interactive state
pub struct ViewStateStore {
    state: ViewState,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for ViewStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStateStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ViewStateStore {
    pub fn new(options: &ViewOptions) -> Result<Self> {
        Ok(Self {
            state: ViewState::new(options)?,
            listeners: Vec::new(),
        })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Register a listener called synchronously after every change
    pub fn subscribe(&mut self, listener: impl FnMut(&ViewStateChange, &ViewState) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, change: ViewStateChange) {
        tracing::debug!(?change, "view state changed");
        for listener in &mut self.listeners {
            listener(&change, &self.state);
        }
    }

    fn reset_page(&mut self) {
        if self.state.pagination.page_index != 0 {
            self.state.pagination.page_index = 0;
            self.emit_pagination();
        }
    }

    fn emit_pagination(&mut self) {
        let change = ViewStateChange::Pagination {
            page_index: self.state.pagination.page_index,
            page_size: self.state.pagination.page_size(),
        };
        self.emit(change);
    }

    // ============ Sorting ============

    /// Header click; returns the column's new direction. Sorting returns
    /// the cursor to the first page.
    pub fn toggle_sort(&mut self, column_id: &str) -> Option<SortDirection> {
        let direction = self.state.sorting.toggle(column_id);
        self.emit(ViewStateChange::Sorting {
            column_id: Some(column_id.to_string()),
            direction,
        });
        self.reset_page();
        direction
    }

    pub fn set_sorting(&mut self, keys: Vec<SortKey>) {
        self.state.sorting.set(keys);
        let primary = self.state.sorting.primary().cloned();
        self.emit(ViewStateChange::Sorting {
            column_id: primary.as_ref().map(|k| k.column_id.clone()),
            direction: primary.map(|k| k.direction),
        });
        self.reset_page();
    }

    pub fn clear_sorting(&mut self) {
        if self.state.sorting.is_empty() {
            return;
        }
        self.state.sorting.clear();
        self.emit(ViewStateChange::Sorting {
            column_id: None,
            direction: None,
        });
        self.reset_page();
    }

    pub fn set_multi_sort(&mut self, multi: bool) {
        self.state.sorting.set_multi(multi);
    }

    // ============ Filters ============

    /// Set one column's filter; an inactive filter clears it
    pub fn set_column_filter(&mut self, column_id: &str, filter: ColumnFilter) {
        if filter.is_active() {
            self.state.column_filters.insert(column_id.to_string(), filter);
        } else if self.state.column_filters.shift_remove(column_id).is_none() {
            return;
        }
        self.emit(ViewStateChange::ColumnFilters);
        self.reset_page();
    }

    pub fn clear_column_filter(&mut self, column_id: &str) {
        if self.state.column_filters.shift_remove(column_id).is_some() {
            self.emit(ViewStateChange::ColumnFilters);
            self.reset_page();
        }
    }

    pub fn clear_column_filters(&mut self) {
        if self.state.column_filters.is_empty() {
            return;
        }
        self.state.column_filters.clear();
        self.emit(ViewStateChange::ColumnFilters);
        self.reset_page();
    }

    /// Record a keystroke in the search box
    pub fn set_global_filter_input(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        self.state.global_filter.set(text.clone(), now);
        self.emit(ViewStateChange::GlobalFilterInput(text));
    }

    /// Apply the search text if its quiet period has elapsed; returns
    /// whether the pipeline input changed
    pub fn poll_global_filter(&mut self, now: Instant) -> bool {
        match self.state.global_filter.poll(now).cloned() {
            Some(settled) => {
                self.apply_global_filter(settled);
                true
            }
            None => false,
        }
    }

    /// Apply pending search text immediately
    pub fn flush_global_filter(&mut self) -> bool {
        match self.state.global_filter.flush().cloned() {
            Some(settled) => {
                self.apply_global_filter(settled);
                true
            }
            None => false,
        }
    }

    /// Clear the search box without waiting for the debounce
    pub fn clear_global_filter(&mut self) {
        let had_filter = !self.state.global_filter.settled().is_empty();
        self.state.global_filter.reset(String::new());
        self.emit(ViewStateChange::GlobalFilterInput(String::new()));
        if had_filter {
            self.apply_global_filter(String::new());
        }
    }

    fn apply_global_filter(&mut self, settled: String) {
        self.emit(ViewStateChange::GlobalFilter(settled));
        self.reset_page();
    }

    /// When pending search input will settle
    pub fn global_filter_deadline(&self) -> Option<Instant> {
        self.state.global_filter.deadline()
    }

    // ============ Column visibility ============

    pub fn set_column_visible(&mut self, column_id: &str, visible: bool) {
        if self.state.is_visible(column_id) == visible {
            return;
        }
        self.state
            .column_visibility
            .insert(column_id.to_string(), visible);
        self.emit(ViewStateChange::ColumnVisibility);
    }

    pub fn toggle_column_visibility(&mut self, column_id: &str) -> bool {
        let visible = !self.state.is_visible(column_id);
        self.set_column_visible(column_id, visible);
        visible
    }

    /// Show every column again
    pub fn reset_column_visibility(&mut self) {
        if self.state.column_visibility.values().all(|v| *v) {
            self.state.column_visibility.clear();
            return;
        }
        self.state.column_visibility.clear();
        self.emit(ViewStateChange::ColumnVisibility);
    }

    // ============ Selection ============

    pub fn toggle_row_selection(&mut self, id: &RowId) -> bool {
        let selected = self.state.row_selection.toggle(id);
        self.emit(ViewStateChange::RowSelection);
        selected
    }

    /// Select all of `ids`, or clear them when they are all selected already
    pub fn toggle_rows_selection<'a>(&mut self, ids: impl IntoIterator<Item = &'a RowId> + Clone) {
        if self.state.row_selection.contains_all(ids.clone()) {
            for id in ids {
                self.state.row_selection.deselect(id);
            }
        } else {
            self.state.row_selection.select_all(ids);
        }
        self.emit(ViewStateChange::RowSelection);
    }

    /// Empty the selection without touching any other state
    pub fn clear_selection(&mut self) {
        if self.state.row_selection.is_empty() {
            return;
        }
        self.state.row_selection.clear();
        self.emit(ViewStateChange::RowSelection);
    }

    /// Forget selected rows that no longer exist
    pub fn retain_selection(&mut self, keep: impl Fn(&RowId) -> bool) {
        if self.state.row_selection.retain(keep) > 0 {
            self.emit(ViewStateChange::RowSelection);
        }
    }

    // ============ Pagination ============

    /// Move to `page_index`. With a known page count, an index past the
    /// last page is dropped and `false` returned.
    pub fn set_page_index(&mut self, page_index: usize, page_count: Option<usize>) -> bool {
        if let Some(count) = page_count.filter(|count| page_index >= (*count).max(1)) {
            tracing::warn!(page_index, page_count = count, "dropping out-of-range page index");
            return false;
        }
        if self.state.pagination.page_index == page_index {
            return true;
        }
        self.state.pagination.page_index = page_index;
        self.emit_pagination();
        true
    }

    pub fn first_page(&mut self) {
        if self.state.pagination.first().is_some() {
            self.emit_pagination();
        }
    }

    pub fn prev_page(&mut self) {
        if self.state.pagination.prev().is_some() {
            self.emit_pagination();
        }
    }

    pub fn next_page(&mut self, total: usize) {
        if self.state.pagination.next(total).is_some() {
            self.emit_pagination();
        }
    }

    pub fn last_page(&mut self, total: usize) {
        if self.state.pagination.last(total).is_some() {
            self.emit_pagination();
        }
    }

    /// Change the page size and return to page 0; zero is rejected
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        let previous_index = self.state.pagination.page_index;
        let changed = self.state.pagination.set_page_size(page_size)?.is_some();
        if changed || previous_index != 0 {
            self.emit_pagination();
        }
        Ok(())
    }

    // ============ Density ============

    pub fn set_density(&mut self, density: Density) {
        if self.state.density != density {
            self.state.density = density;
            self.emit(ViewStateChange::Density(density));
        }
    }
}
