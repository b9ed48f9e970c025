//! Derivation pipeline
//!
//! Turns a row cache snapshot plus view state into the rows to render:
//! global filter, then column filters, then sort, then paginate. Each stage
//! can be handed to a remote source instead, in which case the pipeline
//! trusts its input for that stage.

use std::sync::Arc;

use canopy_core::{ColumnSet, Row, RowCache};

use crate::filter::matches_global;
use crate::view_state::ViewState;

/// Placeholder shown when there are no rows to render
pub const DEFAULT_EMPTY_MESSAGE: &str = "No data available";

/// Which stages run remotely
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineMode {
    pub server_side_pagination: bool,
    pub server_side_sorting: bool,
    pub server_side_filtering: bool,
    /// Row count reported by the remote source for server-side pagination
    pub total_count: Option<usize>,
}

/// Data source status as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// What the grid body should render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridStatus {
    /// Show this many placeholder rows
    Loading { placeholder_rows: usize },
    Error(String),
    Empty(String),
    Rows,
}

/// Pipeline output for one render
#[derive(Debug, Clone)]
pub struct DerivedPage {
    /// Rows of the visible page, in display order
    pub rows: Vec<Arc<Row>>,
    /// Filtered and sorted rows before pagination
    pub filtered: Vec<Arc<Row>>,
    pub total_filtered: usize,
    pub page_count: usize,
    pub page_index: usize,
    pub page_size: usize,
    pub status: GridStatus,
}

impl DerivedPage {
    /// "Page X of Y", where Y is never below one
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page_index.saturating_add(1), self.page_count.max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row identities on the visible page
    pub fn row_ids(&self) -> impl Iterator<Item = &canopy_core::RowId> {
        self.rows.iter().map(|r| r.id())
    }
}

/// Run the pipeline. Pure and synchronous: equal inputs give equal output.
pub fn derive(
    cache: &RowCache,
    columns: &ColumnSet,
    state: &ViewState,
    mode: &PipelineMode,
    source: &SourceStatus,
    empty_message: &str,
) -> DerivedPage {
    let mut rows: Vec<Arc<Row>> = cache.shared_rows().cloned().collect();

    if !mode.server_side_filtering {
        let needle = state.global_filter();
        if !needle.is_empty() {
            let searchable: Vec<_> = columns
                .iter()
                .filter(|c| c.filterable && state.is_visible(&c.id))
                .collect();
            rows.retain(|row| matches_global(row, searchable.iter().copied(), needle));
        }

        for (column_id, filter) in state.active_filters() {
            match columns.get(column_id) {
                Some(column) => rows.retain(|row| filter.matches(column, row)),
                None => tracing::debug!(column_id = %column_id, "filter on unknown column ignored"),
            }
        }
    }

    if !mode.server_side_sorting {
        state.sorting.sort_rows(columns, &mut rows);
    }

    let pagination = &state.pagination;
    let (page_rows, total_filtered) = if mode.server_side_pagination {
        let total = mode.total_count.unwrap_or(rows.len());
        (rows.clone(), total)
    } else {
        let range = pagination.range(rows.len());
        (rows[range].to_vec(), rows.len())
    };
    let page_count = pagination.page_count(total_filtered);

    let status = if source.loading {
        GridStatus::Loading {
            placeholder_rows: pagination.page_size(),
        }
    } else if let Some(error) = &source.error {
        GridStatus::Error(error.clone())
    } else if page_rows.is_empty() {
        GridStatus::Empty(empty_message.to_string())
    } else {
        GridStatus::Rows
    };

    tracing::debug!(
        input = cache.len(),
        filtered = total_filtered,
        page = pagination.page_index,
        visible = page_rows.len(),
        "derived grid page"
    );

    DerivedPage {
        rows: page_rows,
        filtered: rows,
        total_filtered,
        page_count,
        page_index: pagination.page_index,
        page_size: pagination.page_size(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ColumnFilter;
    use crate::view_state::{ViewOptions, ViewStateStore};
    use canopy_core::{ColumnDescriptor, RowId, Value};
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ColumnDescriptor::text("name", "Name"),
            ColumnDescriptor::number("age", "Age"),
        ])
        .unwrap()
    }

    fn cache(n: i64) -> RowCache {
        RowCache::new(
            (1..=n)
                .map(|i| {
                    Row::from_pairs(
                        (i - 1) as usize,
                        [("id", Value::Int64(i)), ("name", Value::String(format!("r{i}"))), ("age", Value::Int64(50 - i))],
                    )
                })
                .collect(),
        )
    }

    fn store(page_size: usize) -> ViewStateStore {
        ViewStateStore::new(&ViewOptions {
            page_size,
            ..ViewOptions::default()
        })
        .unwrap()
    }

    fn ids(rows: &[Arc<Row>]) -> Vec<RowId> {
        rows.iter().map(|r| r.id().clone()).collect()
    }

    fn run(cache: &RowCache, store: &ViewStateStore) -> DerivedPage {
        derive(
            cache,
            &columns(),
            store.state(),
            &PipelineMode::default(),
            &SourceStatus::default(),
            DEFAULT_EMPTY_MESSAGE,
        )
    }

    #[test]
    fn test_pages_partition_filtered_rows() {
        let data = cache(5);
        let mut s = store(2);

        let page = run(&data, &s);
        assert_eq!(ids(&page.rows), vec![RowId::Int(1), RowId::Int(2)]);
        assert_eq!(page.page_count, 3);

        s.next_page(5);
        assert_eq!(ids(&run(&data, &s).rows), vec![RowId::Int(3), RowId::Int(4)]);
        s.next_page(5);
        assert_eq!(ids(&run(&data, &s).rows), vec![RowId::Int(5)]);

        s.set_page_size(3).unwrap();
        let page = run(&data, &s);
        assert_eq!(page.page_index, 0);
        assert_eq!(ids(&page.rows), vec![RowId::Int(1), RowId::Int(2), RowId::Int(3)]);
    }

    #[test]
    fn test_every_page_size_reassembles_sorted_rows() {
        let data = cache(7);
        for size in 1..=8 {
            let mut s = store(size);
            s.toggle_sort("age");
            let expected = ids(&run(&data, &s).filtered);

            let mut collected = Vec::new();
            let pages = run(&data, &s).page_count;
            for page in 0..pages {
                s.set_page_index(page, Some(pages));
                collected.extend(ids(&run(&data, &s).rows));
            }
            assert_eq!(collected, expected, "page size {size}");
        }
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let data = cache(6);
        let mut s = store(4);
        s.toggle_sort("name");
        s.set_column_filter("name", ColumnFilter::text("r"));
        let a = run(&data, &s);
        let b = run(&data, &s);
        assert_eq!(ids(&a.rows), ids(&b.rows));
        assert_eq!(a.total_filtered, b.total_filtered);
    }

    #[test]
    fn test_global_filter_skips_hidden_columns() {
        let data = RowCache::new(vec![
            Row::from_pairs(0, [("name", Value::from("Narra")), ("age", Value::Int64(3))]),
            Row::from_pairs(1, [("name", Value::from("Acacia")), ("age", Value::Int64(4))]),
        ]);
        let mut s = store(10);
        let now = Instant::now();
        s.set_global_filter_input("narra", now);
        s.flush_global_filter();
        assert_eq!(ids(&run(&data, &s).rows), vec![RowId::Index(0)]);

        s.set_column_visible("name", false);
        assert_eq!(run(&data, &s).status, GridStatus::Empty(DEFAULT_EMPTY_MESSAGE.into()));
    }

    #[test]
    fn test_out_of_range_page_renders_empty() {
        let data = cache(3);
        let mut s = store(2);
        s.set_page_index(5, None);
        let page = run(&data, &s);
        assert!(page.rows.is_empty());
        assert_eq!(page.total_filtered, 3);

        s.set_page_index(usize::MAX, None);
        let page = run(&data, &s);
        assert!(page.rows.is_empty());
        assert_eq!(page.page_label(), format!("Page {} of 2", usize::MAX));
    }

    #[test]
    fn test_server_side_sort_and_filter_trust_input() {
        let data = cache(3);
        let mut s = store(10);
        s.toggle_sort("age");
        s.toggle_sort("age");
        s.set_column_filter("name", ColumnFilter::text("r2"));
        let now = Instant::now();
        s.set_global_filter_input("zzz", now);
        s.flush_global_filter();

        let local = run(&data, &s);
        assert!(local.rows.is_empty());

        let mode = PipelineMode {
            server_side_sorting: true,
            server_side_filtering: true,
            ..PipelineMode::default()
        };
        let page = derive(&data, &columns(), s.state(), &mode, &SourceStatus::default(), "none");
        assert_eq!(ids(&page.rows), vec![RowId::Int(1), RowId::Int(2), RowId::Int(3)]);
        assert_eq!(page.total_filtered, 3);
        assert_eq!(page.status, GridStatus::Rows);
    }

    #[test]
    fn test_server_side_pagination_trusts_input() {
        let data = cache(3);
        let s = store(3);
        let mode = PipelineMode {
            server_side_pagination: true,
            total_count: Some(10),
            ..PipelineMode::default()
        };
        let page = derive(&data, &columns(), s.state(), &mode, &SourceStatus::default(), "none");
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.page_count, 4);
        assert_eq!(page.page_label(), "Page 1 of 4");
    }

    #[test]
    fn test_status_precedence() {
        let s = store(5);
        let empty = RowCache::default();
        let loading = SourceStatus {
            loading: true,
            error: None,
        };
        let failed = SourceStatus {
            loading: false,
            error: Some("boom".into()),
        };
        let page = derive(&empty, &columns(), s.state(), &PipelineMode::default(), &loading, "none");
        assert_eq!(page.status, GridStatus::Loading { placeholder_rows: 5 });
        let page = derive(&empty, &columns(), s.state(), &PipelineMode::default(), &failed, "none");
        assert_eq!(page.status, GridStatus::Error("boom".into()));
        let page = derive(&empty, &columns(), s.state(), &PipelineMode::default(), &SourceStatus::default(), "none");
        assert_eq!(page.status, GridStatus::Empty("none".into()));
        assert_eq!(page.page_label(), "Page 1 of 1");
    }
}
