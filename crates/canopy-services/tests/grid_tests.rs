//! Integration tests for the DataGrid engine facade

mod common;

use std::sync::Arc;
use std::time::Duration;

use canopy_core::{ColumnDescriptor, ColumnSet, Row, RowId, Value};
use canopy_grid::{
    ColumnFilter, EditKey, EditState, GridStatus, SortDirection, ToolbarAction, ViewOptions,
};
use canopy_services::{
    CellStatus, CommitOutcome, DataGrid, DataSource, EditResult, ExportScope, GridOptions,
    MutationError,
};
use common::{MockMutator, RecordingDelegate, inventory_columns, inventory_rows, numbered_rows};
use pretty_assertions::assert_eq;

fn grid_with(columns: ColumnSet, options: GridOptions, mutator: MockMutator) -> DataGrid {
    DataGrid::new(columns, options)
        .unwrap()
        .with_mutator(Arc::new(mutator))
}

fn inventory_grid(mutator: MockMutator) -> DataGrid {
    let mut grid = grid_with(inventory_columns(), GridOptions::default(), mutator);
    grid.set_data(DataSource::rows(inventory_rows()));
    grid
}

fn paged_options(page_size: usize) -> GridOptions {
    GridOptions {
        view: ViewOptions {
            page_size,
            ..ViewOptions::default()
        },
        ..GridOptions::default()
    }
}

/// Await a submitted edit and hand its resolution back to the grid
async fn settle(grid: &mut DataGrid, result: EditResult) -> Option<CommitOutcome> {
    let pending = result.into_pending()?;
    let resolution = pending.resolve().await;
    grid.finish_commit(&resolution);
    Some(resolution.outcome)
}

fn visible_ids(grid: &DataGrid) -> Vec<i64> {
    grid.page()
        .rows
        .iter()
        .filter_map(|r| match r.id() {
            RowId::Int(i) => Some(*i),
            _ => None,
        })
        .collect()
}

// ============ Sorting Tests ============

#[test]
fn test_header_clicks_cycle_single_column_sort() {
    let columns = ColumnSet::new(vec![
        ColumnDescriptor::text("name", "Name"),
        ColumnDescriptor::number("age", "Age"),
    ])
    .unwrap();
    let rows = Row::rows_from_json(serde_json::json!([
        {"id": 1, "name": "Eve", "age": 40},
        {"id": 2, "name": "Bo", "age": 25},
        {"id": 3, "name": "Cy", "age": 33},
        {"id": 4, "name": "Al", "age": 51},
        {"id": 5, "name": "Di", "age": 19},
    ]))
    .unwrap();
    let mut grid = DataGrid::new(columns, GridOptions::default()).unwrap();
    grid.set_data(DataSource::rows(rows));

    assert!(grid.header_click("age"));
    assert_eq!(visible_ids(&grid), vec![5, 2, 3, 1, 4]);

    grid.header_click("age");
    assert_eq!(visible_ids(&grid), vec![4, 1, 3, 2, 5]);
    assert_eq!(
        grid.state().sorting.direction_of("age"),
        Some(SortDirection::Descending)
    );

    grid.header_click("name");
    assert_eq!(visible_ids(&grid), vec![4, 2, 3, 5, 1]);
    assert_eq!(grid.state().sorting.direction_of("age"), None);
    assert_eq!(
        grid.state().sorting.direction_of("name"),
        Some(SortDirection::Ascending)
    );
}

#[test]
fn test_unsortable_header_is_ignored() {
    let columns = ColumnSet::new(vec![
        ColumnDescriptor::text("name", "Name").sortable(false),
    ])
    .unwrap();
    let mut grid = DataGrid::new(columns, GridOptions::default()).unwrap();
    assert!(!grid.header_click("name"));
    assert!(!grid.header_click("missing"));
    assert!(grid.state().sorting.is_empty());
}

// ============ Search Tests ============

#[tokio::test(start_paused = true)]
async fn test_global_search_filters_after_debounce() {
    let mut grid = inventory_grid(MockMutator::new());

    grid.search_input("narra");
    assert_eq!(visible_ids(&grid), vec![1, 2, 3]);
    assert!(!grid.poll_search());

    tokio::time::advance(grid.search_debounce()).await;
    assert!(grid.poll_search());
    assert_eq!(visible_ids(&grid), vec![1]);

    grid.clear_search();
    assert_eq!(visible_ids(&grid), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_only_the_last_keystroke_is_applied() {
    let delegate = Arc::new(RecordingDelegate::default());
    let mut grid = inventory_grid(MockMutator::new()).with_delegate(delegate.clone());

    grid.search_input("a");
    tokio::time::advance(Duration::from_millis(100)).await;
    grid.search_input("ac");
    tokio::time::advance(Duration::from_millis(100)).await;
    grid.search_input("aca");
    assert!(!grid.poll_search());

    assert!(grid.settle_search().await);
    assert_eq!(grid.state().global_filter(), "aca");
    assert_eq!(visible_ids(&grid), vec![2]);
    assert_eq!(delegate.events(), vec!["search aca".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_search_settle_returns_to_first_page() {
    let mut grid = grid_with(
        ColumnSet::infer(&numbered_rows(5)),
        paged_options(2),
        MockMutator::new(),
    );
    grid.set_data(DataSource::rows(numbered_rows(5)));
    grid.last_page();
    assert_eq!(grid.state().pagination.page_index, 2);

    grid.search_input("tree");
    assert_eq!(grid.state().pagination.page_index, 2);
    grid.settle_search().await;
    assert_eq!(grid.state().pagination.page_index, 0);
}

// ============ Column Filter Tests ============

#[test]
fn test_column_filter_and_clear() {
    let mut grid = inventory_grid(MockMutator::new());

    grid.set_column_filter("status", ColumnFilter::Value(Value::from("active")))
        .unwrap();
    assert_eq!(visible_ids(&grid), vec![1, 3]);

    grid.set_column_filter("name", ColumnFilter::text("mol")).unwrap();
    assert_eq!(visible_ids(&grid), vec![3]);

    assert!(grid.set_column_filter("nope", ColumnFilter::text("x")).is_err());

    grid.dispatch(ToolbarAction::ClearColumnFilters).unwrap();
    assert_eq!(visible_ids(&grid), vec![1, 2, 3]);
}

#[test]
fn test_filter_with_no_match_renders_empty_state() {
    let mut grid = inventory_grid(MockMutator::new());
    grid.set_column_filter("name", ColumnFilter::text("balete"))
        .unwrap();

    let page = grid.page();
    assert!(page.is_empty());
    assert_eq!(page.status, GridStatus::Empty("No data available".to_string()));
    assert_eq!(page.page_label(), "Page 1 of 1");
}

// ============ Pagination Tests ============

#[test]
fn test_page_size_change_resets_to_first_page() {
    let rows = numbered_rows(5);
    let mut grid = DataGrid::new(ColumnSet::infer(&rows), paged_options(2)).unwrap();
    grid.set_data(DataSource::rows(rows));

    assert_eq!(visible_ids(&grid), vec![1, 2]);
    grid.next_page();
    assert_eq!(visible_ids(&grid), vec![3, 4]);
    grid.next_page();
    assert_eq!(visible_ids(&grid), vec![5]);
    grid.next_page();
    assert_eq!(visible_ids(&grid), vec![5]);

    grid.set_page_size(3).unwrap();
    assert_eq!(grid.state().pagination.page_index, 0);
    assert_eq!(visible_ids(&grid), vec![1, 2, 3]);
    assert!(grid.set_page_size(0).is_err());
}

#[test]
fn test_out_of_range_page_is_dropped() {
    let rows = numbered_rows(5);
    let mut grid = DataGrid::new(ColumnSet::infer(&rows), paged_options(2)).unwrap();
    grid.set_data(DataSource::rows(rows));

    assert!(grid.go_to_page(2));
    assert!(!grid.go_to_page(3));
    assert_eq!(grid.state().pagination.page_index, 2);
}

#[test]
fn test_pagination_disabled_on_fetch_error() {
    let rows = numbered_rows(5);
    let mut grid = DataGrid::new(ColumnSet::infer(&rows), paged_options(2)).unwrap();
    grid.set_data(DataSource {
        rows,
        error: Some("connection reset".to_string()),
        ..DataSource::default()
    });

    grid.next_page();
    assert_eq!(grid.state().pagination.page_index, 0);
    assert_eq!(grid.status(), GridStatus::Error("connection reset".to_string()));
    let controls = grid.pagination_controls();
    assert!(!controls.can_next);
}

#[test]
fn test_server_side_pagination_trusts_input() {
    let options = GridOptions {
        server_side_pagination: true,
        ..paged_options(2)
    };
    let rows = numbered_rows(2);
    let mut grid = DataGrid::new(ColumnSet::infer(&rows), options).unwrap();
    grid.set_data(DataSource::rows(rows).with_total_count(9));

    let page = grid.page();
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.total_filtered, 9);
    assert_eq!(page.page_count, 5);

    grid.next_page();
    let request = grid.server_request();
    assert_eq!(request.page, 1);
    assert_eq!(request.page_size, 2);
}

// ============ Selection Tests ============

#[test]
fn test_selection_survives_only_for_existing_rows() {
    let delegate = Arc::new(RecordingDelegate::default());
    let mut grid = inventory_grid(MockMutator::new()).with_delegate(delegate.clone());

    grid.toggle_page_selection();
    assert_eq!(grid.selection_summary().label(), "3 of 3 row(s) selected.");

    let remaining: Vec<Row> = inventory_rows().into_iter().take(2).collect();
    grid.set_data(DataSource::rows(remaining));
    assert_eq!(*delegate.selected.lock(), vec![RowId::Int(1), RowId::Int(2)]);

    grid.toggle_page_selection();
    assert!(grid.selected_rows().is_empty());
}

// ============ Editing Tests ============

#[tokio::test]
async fn test_invalid_number_input_commits_zero() {
    let mutator = MockMutator::new();
    let log = mutator.call_log.clone();
    let mut grid = inventory_grid(mutator);

    assert!(grid.cell_click(&RowId::Int(1), "quantity"));
    grid.edit_input("abc");
    let result = grid.edit_key(EditKey::Enter).unwrap();
    assert!(matches!(grid.edit_state(), EditState::Committing(_)));

    assert_eq!(settle(&mut grid, result).await, Some(CommitOutcome::Committed));
    assert_eq!(*grid.edit_state(), EditState::Idle);
    assert_eq!(
        log.lock().clone(),
        vec![(RowId::Int(1), "quantity".to_string(), Value::Int64(0))]
    );
    let row = grid.page().rows[0].clone();
    assert_eq!(grid.cell_text(&row, "quantity").as_deref(), Some("0"));
}

#[tokio::test]
async fn test_escape_cancels_without_commit() {
    let mutator = MockMutator::new();
    let log = mutator.call_log.clone();
    let mut grid = inventory_grid(mutator);

    grid.cell_click(&RowId::Int(2), "name");
    grid.edit_input("Balete");
    assert_eq!(
        grid.edit_key(EditKey::Escape).unwrap(),
        EditResult::Cancelled
    );
    assert!(log.lock().is_empty());
    assert_eq!(
        grid.coordinator().cache().value(&RowId::Int(2), "name"),
        Some(&Value::from("Acacia"))
    );
}

#[tokio::test]
async fn test_select_and_toggle_commit_immediately() {
    let mut grid = inventory_grid(MockMutator::new());

    grid.cell_click(&RowId::Int(1), "status");
    assert!(matches!(
        grid.choose_option("felled").unwrap(),
        EditResult::Rejected(_)
    ));
    let result = grid.choose_option("retired").unwrap();
    assert_eq!(settle(&mut grid, result).await, Some(CommitOutcome::Committed));

    grid.cell_click(&RowId::Int(1), "native");
    let result = grid.toggle_cell().unwrap();
    settle(&mut grid, result).await;
    let cache = grid.coordinator().cache();
    assert_eq!(cache.value(&RowId::Int(1), "status"), Some(&Value::from("retired")));
    assert_eq!(cache.value(&RowId::Int(1), "native"), Some(&Value::Bool(false)));
}

#[tokio::test]
async fn test_failed_cell_reopens_with_attempted_value() {
    let mut grid = inventory_grid(MockMutator::new().with_failure());

    grid.cell_click(&RowId::Int(3), "name");
    grid.edit_input("Yakal");
    let result = grid.confirm_edit().unwrap();
    assert!(matches!(
        settle(&mut grid, result).await,
        Some(CommitOutcome::RolledBack(_))
    ));
    assert!(matches!(
        grid.cell_status(&RowId::Int(3), "name"),
        Some(CellStatus::Failed { .. })
    ));
    assert_eq!(grid.take_notifications().len(), 1);

    assert!(grid.cell_click(&RowId::Int(3), "name"));
    let draft = grid.editor().session().map(|s| s.draft.display_text());
    assert_eq!(draft.as_deref(), Some("Yakal"));
}

#[tokio::test(start_paused = true)]
async fn test_grid_stays_usable_while_commit_in_flight() {
    let mutator = MockMutator::new()
        .with_reply(
            Duration::from_millis(200),
            Err(MutationError::Rejected("quantity must be positive".into())),
        )
        .with_reply(Duration::from_millis(50), Ok(()));
    let mut grid = inventory_grid(mutator);

    assert!(grid.cell_click(&RowId::Int(1), "quantity"));
    grid.edit_input("-1");
    let first = grid
        .edit_key(EditKey::Enter)
        .unwrap()
        .into_pending()
        .unwrap();

    let (first_resolution, second_outcome) = tokio::join!(first.resolve(), async {
        let page = grid.page();
        let row = page.rows.iter().find(|r| r.id() == &RowId::Int(1)).unwrap();
        assert_eq!(grid.cell_text(row, "quantity").as_deref(), Some("-1"));
        assert!(matches!(grid.edit_state(), EditState::Committing(_)));

        assert!(grid.cell_click(&RowId::Int(2), "name"));
        grid.edit_input("Balete");
        let result = grid.confirm_edit().unwrap();
        settle(&mut grid, result).await
    });

    assert_eq!(second_outcome, Some(CommitOutcome::Committed));
    assert!(matches!(first_resolution.outcome, CommitOutcome::RolledBack(_)));
    grid.finish_commit(&first_resolution);
    assert_eq!(*grid.edit_state(), EditState::Idle);

    let cache = grid.coordinator().cache();
    assert_eq!(cache.value(&RowId::Int(1), "quantity"), Some(&Value::Int64(3)));
    assert_eq!(cache.value(&RowId::Int(2), "name"), Some(&Value::from("Balete")));
    assert_eq!(grid.take_notifications().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_row_vanishing_mid_commit_returns_editor_to_idle() {
    let mut grid = inventory_grid(MockMutator::new().with_delay(Duration::from_millis(100)));

    grid.cell_click(&RowId::Int(3), "quantity");
    grid.edit_input("9");
    let pending = grid
        .edit_key(EditKey::Enter)
        .unwrap()
        .into_pending()
        .unwrap();

    // Re-supplying the same rows keeps the commit and its value
    grid.set_data(DataSource::rows(inventory_rows()));
    assert!(matches!(grid.edit_state(), EditState::Committing(_)));
    assert_eq!(
        grid.coordinator().cache().value(&RowId::Int(3), "quantity"),
        Some(&Value::Int64(9))
    );

    let remaining: Vec<Row> = inventory_rows()
        .into_iter()
        .filter(|r| r.id() != &RowId::Int(3))
        .collect();
    grid.set_data(DataSource::rows(remaining));
    assert_eq!(*grid.edit_state(), EditState::Idle);

    let resolution = pending.resolve().await;
    assert_eq!(resolution.outcome, CommitOutcome::Discarded);
    grid.finish_commit(&resolution);
    assert!(grid.take_notifications().is_empty());
}

#[test]
fn test_editing_without_mutator_is_read_only() {
    let mut grid = DataGrid::new(inventory_columns(), GridOptions::default()).unwrap();
    grid.set_data(DataSource::rows(inventory_rows()));

    assert!(grid.editor().is_read_only());
    assert!(!grid.cell_click(&RowId::Int(1), "name"));
    assert_eq!(*grid.edit_state(), EditState::Idle);
}

#[test]
fn test_data_change_discards_open_edit() {
    let mut grid = inventory_grid(MockMutator::new());
    assert!(grid.cell_click(&RowId::Int(1), "name"));

    grid.set_data(DataSource::rows(inventory_rows()));
    assert_eq!(*grid.edit_state(), EditState::Idle);
}

#[test]
fn test_editing_disabled_while_loading() {
    let mut grid = inventory_grid(MockMutator::new());
    grid.set_data(DataSource {
        rows: inventory_rows(),
        loading: true,
        ..DataSource::default()
    });
    assert!(!grid.cell_click(&RowId::Int(1), "name"));
    assert!(matches!(grid.status(), GridStatus::Loading { placeholder_rows: 10 }));
}

#[tokio::test]
async fn test_commit_cell_checks_column() {
    let grid = inventory_grid(MockMutator::new());
    assert_eq!(
        grid.commit_cell(RowId::Int(1), "nope", Value::Null).await,
        Err(MutationError::UnknownColumn("nope".to_string()))
    );

    let columns = ColumnSet::new(vec![ColumnDescriptor::text("name", "Name")]).unwrap();
    let mut grid = grid_with(columns, GridOptions::default(), MockMutator::new());
    grid.set_data(DataSource::rows(inventory_rows()));
    assert_eq!(
        grid.commit_cell(RowId::Int(1), "name", Value::from("x")).await,
        Err(MutationError::ReadOnlyColumn("name".to_string()))
    );
}

// ============ Server-side Tests ============

#[test]
fn test_server_side_sort_and_filter_leave_rows_to_the_source() {
    let delegate = Arc::new(RecordingDelegate::default());
    let options = GridOptions {
        server_side_sorting: true,
        server_side_filtering: true,
        ..GridOptions::default()
    };
    let mut grid = DataGrid::new(inventory_columns(), options)
        .unwrap()
        .with_delegate(delegate.clone());
    grid.set_data(DataSource::rows(inventory_rows()));

    grid.header_click("quantity");
    grid.header_click("quantity");
    grid.set_column_filter("status", ColumnFilter::text("retired"))
        .unwrap();

    assert_eq!(visible_ids(&grid), vec![1, 2, 3]);
    assert_eq!(
        delegate.events(),
        vec![
            "sort quantity asc".to_string(),
            "sort quantity desc".to_string(),
            "filter 1".to_string(),
        ]
    );

    let request = grid.server_request();
    assert_eq!(request.page, 0);
    assert_eq!(request.sort_by.as_deref(), Some("quantity"));
    assert_eq!(request.sort_order.as_deref(), Some("desc"));
    assert_eq!(
        request.filters.get("status"),
        Some(&ColumnFilter::text("retired"))
    );
}

// ============ Toolbar Tests ============

#[test]
fn test_toolbar_hooks_reach_delegate() {
    let delegate = Arc::new(RecordingDelegate::default());
    let rows = numbered_rows(5);
    let mut grid = DataGrid::new(ColumnSet::infer(&rows), paged_options(2))
        .unwrap()
        .with_delegate(delegate.clone());
    grid.set_data(DataSource::rows(rows));

    grid.dispatch(ToolbarAction::NextPage).unwrap();
    grid.dispatch(ToolbarAction::Sort("name".to_string())).unwrap();
    grid.dispatch(ToolbarAction::Refresh).unwrap();

    assert_eq!(
        delegate.events(),
        vec![
            "page 1 2".to_string(),
            "sort name asc".to_string(),
            "page 0 2".to_string(),
            "refresh".to_string(),
        ]
    );
}

#[test]
fn test_export_scope() {
    let delegate = Arc::new(RecordingDelegate::default());
    let rows = numbered_rows(5);
    let mut grid = DataGrid::new(ColumnSet::infer(&rows), paged_options(2))
        .unwrap()
        .with_delegate(delegate.clone());
    grid.set_data(DataSource::rows(rows.clone()));

    assert_eq!(grid.export().len(), 5);
    assert_eq!(*delegate.exported.lock(), 5);

    let options = GridOptions {
        export_scope: ExportScope::Page,
        ..paged_options(2)
    };
    let mut grid = DataGrid::new(ColumnSet::infer(&rows), options).unwrap();
    grid.set_data(DataSource::rows(rows));
    assert_eq!(grid.export().len(), 2);

    let csv = grid.export_csv().unwrap();
    assert_eq!(csv, "id,name,quantity\n1,\"Tree 1\",1\n2,\"Tree 2\",2\n");
}

#[test]
fn test_hidden_column_leaves_export_and_search() {
    let mut grid = inventory_grid(MockMutator::new());
    assert!(!grid.toggle_column("name").unwrap());
    assert!(!grid.state().is_visible("name"));
    assert!(grid.header_cells().iter().all(|h| h.column_id != "name"));

    grid.store_mut().set_global_filter_input("narra", std::time::Instant::now());
    grid.store_mut().flush_global_filter();
    assert!(grid.page().is_empty());

    grid.reset_columns();
    assert!(grid.state().is_visible("name"));
    assert_eq!(visible_ids(&grid), vec![1]);
}
