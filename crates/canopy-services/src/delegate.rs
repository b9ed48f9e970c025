//! Caller hooks fired by the grid engine
//!
//! Every hook defaults to a no-op, so a delegate only implements what its
//! data source needs. Server-side hooks are how a remote source learns that
//! it should re-fetch; the engine itself never fetches.

use std::sync::Arc;

use canopy_core::{ColumnSet, Row};
use canopy_grid::{ColumnFilters, SortDirection};

pub trait GridDelegate: Send + Sync {
    /// Sort changed; `None` direction means the column is unsorted
    fn on_sort_change(&self, _column_id: Option<&str>, _direction: Option<SortDirection>) {}

    fn on_filter_change(&self, _filters: &ColumnFilters) {}

    /// Settled global search text changed
    fn on_search_change(&self, _global_filter: &str) {}

    fn on_page_change(&self, _page_index: usize, _page_size: usize) {}

    /// Selection set changed
    fn on_row_select(&self, _selected: &[Arc<Row>]) {}

    /// Refresh button pressed
    fn on_refresh(&self) {}

    /// Export requested with the rows in the configured scope
    fn on_export(&self, _rows: &[Arc<Row>], _columns: &ColumnSet) {}
}

/// Delegate that ignores every hook
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelegate;

impl GridDelegate for NoopDelegate {}
