//! Parameters for server-side fetches
//!
//! Summarises the view state for a remote source that sorts, filters and
//! pages on its own.

use canopy_grid::{ColumnFilter, ViewState};
use indexmap::IndexMap;
use serde::Serialize;

/// What a remote fetch needs to return one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerRequest {
    /// 0-based page
    pub page: usize,
    pub page_size: usize,
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
    pub filters: IndexMap<String, ColumnFilter>,
    pub global_filter: Option<String>,
}

impl ServerRequest {
    pub fn from_view_state(state: &ViewState) -> Self {
        let primary = state.sorting.primary();
        let global = state.global_filter();
        Self {
            page: state.pagination.page_index,
            page_size: state.pagination.page_size(),
            sort_by: primary.map(|k| k.column_id.clone()),
            sort_order: primary.map(|k| k.direction.as_str().to_string()),
            filters: state
                .active_filters()
                .map(|(id, filter)| (id.clone(), filter.clone()))
                .collect(),
            global_filter: (!global.is_empty()).then(|| global.to_string()),
        }
    }

    /// Request for the following page, for prefetching. `None` once the
    /// last page is reached.
    pub fn next_page_request(&self, total_count: usize) -> Option<Self> {
        let next = self.page.saturating_add(1);
        if next.saturating_mul(self.page_size) >= total_count {
            return None;
        }
        Some(Self {
            page: next,
            ..self.clone()
        })
    }

    /// Query-string form, e.g. for a REST backend
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ];
        if let (Some(by), Some(order)) = (&self.sort_by, &self.sort_order) {
            pairs.push(("sort_by".to_string(), by.clone()));
            pairs.push(("sort_order".to_string(), order.clone()));
        }
        if let Some(search) = &self.global_filter {
            pairs.push(("search".to_string(), search.clone()));
        }
        for (column_id, filter) in &self.filters {
            pairs.push((format!("filter[{}]", column_id), filter.describe()));
        }
        pairs
    }
}
