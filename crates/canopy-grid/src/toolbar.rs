//! Toolbar and header view-models
//!
//! Plain data describing what the toolbar, header row and pagination bar
//! should show, plus the [`ToolbarAction`] a renderer dispatches back.

use canopy_core::{ColumnKind, ColumnSet, SelectOption};
use itertools::Itertools;

use crate::filter::ColumnFilter;
use crate::pipeline::{DerivedPage, GridStatus};
use crate::sort::SortDirection;
use crate::view_state::{Density, ViewState};

/// User intent raised by a toolbar, header or pagination control
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarAction {
    /// Keystroke in the global search box
    Search(String),
    ClearSearch,
    SetColumnFilter {
        column_id: String,
        filter: ColumnFilter,
    },
    ClearColumnFilter(String),
    ClearColumnFilters,
    ToggleColumn(String),
    ResetColumns,
    SetDensity(Density),
    /// Header click
    Sort(String),
    ToggleRow(canopy_core::RowId),
    /// Select every row on the visible page, or clear them if all are selected
    TogglePageSelection,
    ClearSelection,
    FirstPage,
    PrevPage,
    NextPage,
    LastPage,
    SetPageSize(usize),
    Refresh,
    Export,
}

/// One header cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub column_id: String,
    pub title: String,
    pub sortable: bool,
    pub direction: Option<SortDirection>,
    /// 1-based position among active sorts, shown only with multi-sort
    pub sort_priority: Option<usize>,
}

impl HeaderCell {
    pub fn label(&self) -> String {
        match (self.direction, self.sort_priority) {
            (Some(direction), Some(priority)) => {
                format!("{} {}{}", self.title, direction.indicator(), priority)
            }
            (Some(direction), None) => format!("{} {}", self.title, direction.indicator()),
            (None, _) => self.title.clone(),
        }
    }
}

/// Header cells for the visible columns
pub fn header_cells(columns: &ColumnSet, state: &ViewState) -> Vec<HeaderCell> {
    let multi = state.sorting.is_multi() && state.sorting.keys().len() > 1;
    columns
        .iter()
        .filter(|c| state.is_visible(&c.id))
        .map(|c| {
            let position = state.sorting.keys().iter().position(|k| k.column_id == c.id);
            HeaderCell {
                column_id: c.id.clone(),
                title: c.title.clone(),
                sortable: c.sortable,
                direction: state.sorting.direction_of(&c.id),
                sort_priority: position.filter(|_| multi).map(|p| p + 1),
            }
        })
        .collect()
}

/// State of the first/prev/next/last buttons and the page indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationControls {
    pub can_first: bool,
    pub can_prev: bool,
    pub can_next: bool,
    pub can_last: bool,
    pub page_label: String,
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
}

impl PaginationControls {
    /// All buttons are disabled while the data source reports an error
    pub fn new(page: &DerivedPage, state: &ViewState) -> Self {
        let enabled = !matches!(page.status, GridStatus::Error(_) | GridStatus::Loading { .. });
        let can_prev = enabled && page.page_index > 0;
        let can_next = enabled && page.page_index.saturating_add(1) < page.page_count;
        Self {
            can_first: can_prev,
            can_prev,
            can_next,
            can_last: can_next,
            page_label: page.page_label(),
            page_size: state.pagination.page_size(),
            page_size_options: state.pagination.selector_options(),
        }
    }
}

/// Selected vs filtered row counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSummary {
    pub selected: usize,
    pub total_filtered: usize,
}

impl SelectionSummary {
    pub fn new(page: &DerivedPage, state: &ViewState) -> Self {
        Self {
            selected: state.row_selection.len(),
            total_filtered: page.total_filtered,
        }
    }

    pub fn label(&self) -> String {
        format!("{} of {} row(s) selected.", self.selected, self.total_filtered)
    }
}

/// One entry of the column visibility checklist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityMenuItem {
    pub column_id: String,
    pub title: String,
    pub visible: bool,
}

/// Checklist entries for columns that can be hidden
pub fn visibility_menu(columns: &ColumnSet, state: &ViewState) -> Vec<VisibilityMenuItem> {
    columns
        .iter()
        .filter(|c| c.hideable)
        .map(|c| VisibilityMenuItem {
            column_id: c.id.clone(),
            title: c.title.clone(),
            visible: state.is_visible(&c.id),
        })
        .collect()
}

/// Input shown in a column filter popover
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterInput {
    Text,
    Select(Vec<SelectOption>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    pub column_id: String,
    pub title: String,
    pub input: FilterInput,
    /// Current filter as displayed, if one is set
    pub current: Option<String>,
}

/// Popover fields for every visible, filterable column
pub fn filter_fields(columns: &ColumnSet, state: &ViewState) -> Vec<FilterField> {
    columns
        .iter()
        .filter(|c| c.filterable && state.is_visible(&c.id))
        .map(|c| FilterField {
            column_id: c.id.clone(),
            title: c.title.clone(),
            input: match &c.kind {
                ColumnKind::Select { options } => FilterInput::Select(options.clone()),
                _ => FilterInput::Text,
            },
            current: state.column_filters.get(&c.id).map(ColumnFilter::describe),
        })
        .collect()
}

/// One-line summary of active column filters, e.g. `Name: tree, Age: > 3`
pub fn active_filter_summary(columns: &ColumnSet, state: &ViewState) -> Option<String> {
    if state.column_filters.is_empty() {
        return None;
    }
    Some(
        state
            .active_filters()
            .map(|(id, filter)| {
                let title = columns.get(id).map_or(id.as_str(), |c| c.title.as_str());
                format!("{}: {}", title, filter.describe())
            })
            .join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DEFAULT_EMPTY_MESSAGE, PipelineMode, SourceStatus, derive};
    use crate::view_state::{ViewOptions, ViewStateStore};
    use canopy_core::{ColumnDescriptor, Row, RowCache, RowId, Value};

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDescriptor::text("name", "Name"),
            ColumnDescriptor::number("age", "Age"),
            ColumnDescriptor::select("status", "Status", vec![SelectOption::new("a", "A")]),
            ColumnDescriptor::text("id", "ID").hideable(false),
        ])
        .unwrap()
    }

    fn cache() -> RowCache {
        RowCache::new(
            (0..5)
                .map(|i| Row::from_pairs(i, [("id", Value::Int64(i as i64)), ("age", Value::Int64(i as i64))]))
                .collect(),
        )
    }

    fn page(store: &ViewStateStore, source: &SourceStatus) -> DerivedPage {
        derive(&cache(), &columns(), store.state(), &PipelineMode::default(), source, DEFAULT_EMPTY_MESSAGE)
    }

    fn store() -> ViewStateStore {
        ViewStateStore::new(&ViewOptions {
            page_size: 2,
            ..ViewOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_pagination_controls_at_bounds() {
        let mut s = store();
        let controls = PaginationControls::new(&page(&s, &SourceStatus::default()), s.state());
        assert!(!controls.can_first && !controls.can_prev);
        assert!(controls.can_next && controls.can_last);
        assert_eq!(controls.page_label, "Page 1 of 3");

        s.last_page(5);
        let controls = PaginationControls::new(&page(&s, &SourceStatus::default()), s.state());
        assert!(controls.can_prev && !controls.can_next);
        assert_eq!(controls.page_label, "Page 3 of 3");
    }

    #[test]
    fn test_pagination_disabled_on_fetch_error() {
        let s = store();
        let failed = SourceStatus {
            loading: false,
            error: Some("offline".into()),
        };
        let controls = PaginationControls::new(&page(&s, &failed), s.state());
        assert!(!controls.can_next && !controls.can_last);
    }

    #[test]
    fn test_selection_summary() {
        let mut s = store();
        s.toggle_row_selection(&RowId::Int(1));
        let summary = SelectionSummary::new(&page(&s, &SourceStatus::default()), s.state());
        assert_eq!(summary.label(), "1 of 5 row(s) selected.");
    }

    #[test]
    fn test_menus() {
        let mut s = store();
        s.set_column_visible("age", false);
        let menu = visibility_menu(&columns(), s.state());
        assert_eq!(menu.len(), 3);
        assert!(!menu[1].visible);

        let fields = filter_fields(&columns(), s.state());
        assert_eq!(fields.len(), 3);
        assert!(matches!(fields[1].input, FilterInput::Select(_)));
    }

    #[test]
    fn test_header_labels() {
        let mut s = store();
        s.toggle_sort("age");
        s.toggle_sort("age");
        let headers = header_cells(&columns(), s.state());
        assert_eq!(headers[1].label(), "Age ▼");
        assert_eq!(headers[0].label(), "Name");
    }

    #[test]
    fn test_filter_summary() {
        let mut s = store();
        assert_eq!(active_filter_summary(&columns(), s.state()), None);
        s.set_column_filter("name", ColumnFilter::text("tree"));
        assert_eq!(active_filter_summary(&columns(), s.state()), Some("Name: tree".to_string()));
    }
}
