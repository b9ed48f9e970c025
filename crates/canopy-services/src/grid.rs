//! Grid engine facade
//!
//! [`DataGrid`] wires the view state store, derivation pipeline, cell edit
//! controller and mutation coordinator together behind the operations a
//! renderer calls: header clicks, search keystrokes, filter and pagination
//! controls, cell clicks and editor keys.

use std::sync::Arc;
use std::time::Duration;

use canopy_core::{ColumnSet, Result, Row, RowId, Value};
use canopy_grid::edit::EditOutcome;
use canopy_grid::{
    CellEditController, CellRef, ColumnFilter, DerivedPage, EditKey, EditState, GridStatus,
    NumericInputPolicy, PaginationControls, PipelineMode, SelectionSummary, SourceStatus,
    ToolbarAction, ViewOptions, ViewState, ViewStateStore, derive, pipeline, toolbar,
};

use crate::coordinator::{
    CellStatus, CommitOutcome, CoordinatorOptions, InFlightCommit, MutationCoordinator,
    Notification,
};
use crate::delegate::{GridDelegate, NoopDelegate};
use crate::error::{MutationError, ServiceResult};
use crate::export::{CsvOptions, ExportError, ExportScope, to_csv};
use crate::mutator::CellMutator;
use crate::server::ServerRequest;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct GridOptions {
    pub view: ViewOptions,
    pub server_side_pagination: bool,
    pub server_side_sorting: bool,
    pub server_side_filtering: bool,
    pub optimistic_updates: bool,
    pub invalidate_on_success: bool,
    pub numeric_policy: NumericInputPolicy,
    pub empty_state_message: String,
    pub export_scope: ExportScope,
    pub csv: CsvOptions,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            view: ViewOptions::default(),
            server_side_pagination: false,
            server_side_sorting: false,
            server_side_filtering: false,
            optimistic_updates: true,
            invalidate_on_success: true,
            numeric_policy: NumericInputPolicy::CoerceToZero,
            empty_state_message: pipeline::DEFAULT_EMPTY_MESSAGE.to_string(),
            export_scope: ExportScope::Filtered,
            csv: CsvOptions::default(),
        }
    }
}

/// One render's worth of data from the caller
#[derive(Debug, Clone, Default)]
pub struct DataSource {
    pub rows: Vec<Row>,
    pub loading: bool,
    pub error: Option<String>,
    /// Total row count on the server, for server-side pagination
    pub total_count: Option<usize>,
}

impl DataSource {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_total_count(mut self, total_count: usize) -> Self {
        self.total_count = Some(total_count);
        self
    }
}

/// A confirmed edit whose remote write is in flight.
///
/// The local effects are already applied. It owns everything it needs, so
/// the grid stays usable while [`PendingCommit::resolve`] is awaited; hand
/// the resolution back with [`DataGrid::finish_commit`].
pub struct PendingCommit {
    cell: CellRef,
    coordinator: Arc<MutationCoordinator>,
    commit: InFlightCommit,
}

impl PendingCommit {
    pub fn cell(&self) -> &CellRef {
        &self.cell
    }

    pub fn value(&self) -> &Value {
        self.commit.value()
    }

    /// Await the remote write and fold its outcome into the cache
    pub async fn resolve(self) -> CommitResolution {
        let outcome = self.coordinator.complete(self.commit).await;
        CommitResolution {
            cell: self.cell,
            outcome,
        }
    }
}

impl std::fmt::Debug for PendingCommit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommit")
            .field("cell", &self.cell)
            .field("commit", &self.commit)
            .finish()
    }
}

impl PartialEq for PendingCommit {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell && self.commit.mutation_id() == other.commit.mutation_id()
    }
}

/// How a [`PendingCommit`] ended
#[derive(Debug, Clone, PartialEq)]
pub struct CommitResolution {
    pub cell: CellRef,
    pub outcome: CommitOutcome,
}

/// Result of an editor interaction routed through the engine
#[derive(Debug, PartialEq)]
pub enum EditResult {
    /// The edit is applied locally and its remote write is in flight
    Submitted(PendingCommit),
    /// Input refused; the editor is still open
    Rejected(String),
    Cancelled,
    Ignored,
}

impl EditResult {
    pub fn into_pending(self) -> Option<PendingCommit> {
        match self {
            EditResult::Submitted(pending) => Some(pending),
            _ => None,
        }
    }
}

pub struct DataGrid {
    columns: ColumnSet,
    options: GridOptions,
    store: ViewStateStore,
    editor: CellEditController,
    coordinator: Arc<MutationCoordinator>,
    delegate: Arc<dyn GridDelegate>,
    source: SourceStatus,
    total_count: Option<usize>,
}

impl std::fmt::Debug for DataGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataGrid")
            .field("columns", &self.columns.len())
            .field("store", &self.store)
            .field("editor", &self.editor)
            .field("source", &self.source)
            .finish()
    }
}

impl DataGrid {
    /// Create an engine with no data, no mutator and a no-op delegate
    pub fn new(columns: ColumnSet, options: GridOptions) -> Result<Self> {
        let store = ViewStateStore::new(&options.view)?;
        let coordinator = MutationCoordinator::new(
            Default::default(),
            None,
            Self::coordinator_options(&options),
        );
        let mut grid = Self {
            editor: CellEditController::new(options.numeric_policy),
            columns,
            options,
            store,
            coordinator: Arc::new(coordinator),
            delegate: Arc::new(NoopDelegate),
            source: SourceStatus::default(),
            total_count: None,
        };
        grid.sync_editability();
        Ok(grid)
    }

    fn coordinator_options(options: &GridOptions) -> CoordinatorOptions {
        CoordinatorOptions {
            optimistic: options.optimistic_updates,
            invalidate_on_success: options.invalidate_on_success,
        }
    }

    /// Attach the remote commit hook; required for inline editing
    pub fn with_mutator(mut self, mutator: Arc<dyn CellMutator>) -> Self {
        let cache = self.coordinator.cache();
        self.coordinator = Arc::new(MutationCoordinator::new(
            cache,
            Some(mutator),
            Self::coordinator_options(&self.options),
        ));
        self.sync_editability();
        self
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn GridDelegate>) -> Self {
        self.delegate = delegate;
        self
    }

    /// Editable columns without a commit hook degrade to read-only
    fn sync_editability(&mut self) {
        let read_only = !self.coordinator.has_mutator();
        if read_only && self.columns.has_editable() {
            tracing::warn!("editable columns configured without a commit handler; editing disabled");
        }
        self.editor.set_read_only(read_only);
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn state(&self) -> &ViewState {
        self.store.state()
    }

    pub fn store_mut(&mut self) -> &mut ViewStateStore {
        &mut self.store
    }

    pub fn edit_state(&self) -> &EditState {
        self.editor.state()
    }

    pub fn editor(&self) -> &CellEditController {
        &self.editor
    }

    /// Shared handle for issuing commits outside the engine's borrow
    pub fn coordinator(&self) -> Arc<MutationCoordinator> {
        Arc::clone(&self.coordinator)
    }

    // ============ Data ============

    /// Accept a new data set from the caller. Any open edit is discarded,
    /// a commit whose row vanished stops blocking the editor, and selected
    /// rows that vanished are forgotten.
    pub fn set_data(&mut self, source: DataSource) {
        let cache = self.coordinator.replace_rows(source.rows);
        tracing::debug!(
            rows = cache.len(),
            loading = source.loading,
            error = source.error.as_deref(),
            "data source updated"
        );
        self.source = SourceStatus {
            loading: source.loading,
            error: source.error,
        };
        self.total_count = source.total_count;

        let vanished = self.editor.discard_if_missing(|id| cache.contains(id));
        if !vanished && self.editor.session().is_some() {
            tracing::debug!("data changed; discarding open edit");
            self.editor.reset();
        }

        let before = self.state().row_selection.len();
        self.store.retain_selection(|id| cache.contains(id));
        if self.state().row_selection.len() != before {
            self.fire_row_select();
        }
    }

    fn pipeline_mode(&self) -> PipelineMode {
        PipelineMode {
            server_side_pagination: self.options.server_side_pagination,
            server_side_sorting: self.options.server_side_sorting,
            server_side_filtering: self.options.server_side_filtering,
            total_count: self.total_count,
        }
    }

    /// Rows to render right now
    pub fn page(&self) -> DerivedPage {
        derive(
            &self.coordinator.cache(),
            &self.columns,
            self.store.state(),
            &self.pipeline_mode(),
            &self.source,
            &self.options.empty_state_message,
        )
    }

    fn controls_enabled(&self) -> bool {
        self.source.error.is_none() && !self.source.loading
    }

    /// Display text for one cell of `row`
    pub fn cell_text(&self, row: &Row, column_id: &str) -> Option<String> {
        self.columns.get(column_id).map(|c| c.display(row))
    }

    pub fn cell_status(&self, row_id: &RowId, column_id: &str) -> Option<CellStatus> {
        let field = self.columns.get(column_id)?.field_key()?;
        self.coordinator.cell_status(row_id, field)
    }

    /// Drain transient notifications
    pub fn take_notifications(&self) -> Vec<Notification> {
        self.coordinator.take_notifications()
    }

    // ============ Sorting ============

    /// Header click on `column_id`; unsortable columns ignore it
    pub fn header_click(&mut self, column_id: &str) -> bool {
        if !self.columns.get(column_id).is_some_and(|c| c.sortable) {
            return false;
        }
        let page_before = self.page_position();
        let direction = self.store.toggle_sort(column_id);
        self.delegate.on_sort_change(Some(column_id), direction);
        self.fire_page_change_since(page_before);
        true
    }

    // ============ Search ============

    /// Keystroke in the global search box
    pub fn search_input(&mut self, text: impl Into<String>) {
        let now = tokio::time::Instant::now().into_std();
        self.store.set_global_filter_input(text, now);
    }

    /// Apply search input whose quiet period has elapsed
    pub fn poll_search(&mut self) -> bool {
        let now = tokio::time::Instant::now().into_std();
        let page_before = self.page_position();
        if !self.store.poll_global_filter(now) {
            return false;
        }
        self.delegate.on_search_change(self.store.state().global_filter());
        self.fire_page_change_since(page_before);
        true
    }

    /// Wait out the debounce delay and apply the final search text
    pub async fn settle_search(&mut self) -> bool {
        if let Some(deadline) = self.store.global_filter_deadline() {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }
        self.poll_search()
    }

    /// Apply pending search text without waiting for the debounce
    pub fn flush_search(&mut self) -> bool {
        let page_before = self.page_position();
        if !self.store.flush_global_filter() {
            return false;
        }
        self.delegate.on_search_change(self.store.state().global_filter());
        self.fire_page_change_since(page_before);
        true
    }

    pub fn clear_search(&mut self) {
        let page_before = self.page_position();
        let had_filter = !self.store.state().global_filter().is_empty();
        self.store.clear_global_filter();
        if had_filter {
            self.delegate.on_search_change("");
        }
        self.fire_page_change_since(page_before);
    }

    /// Time the search debounce waits for
    pub fn search_debounce(&self) -> Duration {
        self.store.state().global_filter.delay()
    }

    // ============ Column filters ============

    pub fn set_column_filter(&mut self, column_id: &str, filter: ColumnFilter) -> Result<()> {
        self.columns.require(column_id)?;
        let page_before = self.page_position();
        self.store.set_column_filter(column_id, filter);
        self.delegate.on_filter_change(&self.store.state().column_filters);
        self.fire_page_change_since(page_before);
        Ok(())
    }

    pub fn clear_column_filter(&mut self, column_id: &str) {
        let page_before = self.page_position();
        self.store.clear_column_filter(column_id);
        self.delegate.on_filter_change(&self.store.state().column_filters);
        self.fire_page_change_since(page_before);
    }

    pub fn clear_column_filters(&mut self) {
        let page_before = self.page_position();
        self.store.clear_column_filters();
        self.delegate.on_filter_change(&self.store.state().column_filters);
        self.fire_page_change_since(page_before);
    }

    // ============ Pagination ============

    fn page_position(&self) -> (usize, usize) {
        let p = &self.store.state().pagination;
        (p.page_index, p.page_size())
    }

    fn fire_page_change_since(&self, before: (usize, usize)) {
        let after = self.page_position();
        if after != before {
            self.delegate.on_page_change(after.0, after.1);
        }
    }

    fn total_rows(&self) -> usize {
        self.page().total_filtered
    }

    pub fn first_page(&mut self) {
        if self.controls_enabled() {
            let before = self.page_position();
            self.store.first_page();
            self.fire_page_change_since(before);
        }
    }

    pub fn prev_page(&mut self) {
        if self.controls_enabled() {
            let before = self.page_position();
            self.store.prev_page();
            self.fire_page_change_since(before);
        }
    }

    pub fn next_page(&mut self) {
        if self.controls_enabled() {
            let before = self.page_position();
            let total = self.total_rows();
            self.store.next_page(total);
            self.fire_page_change_since(before);
        }
    }

    pub fn last_page(&mut self) {
        if self.controls_enabled() {
            let before = self.page_position();
            let total = self.total_rows();
            self.store.last_page(total);
            self.fire_page_change_since(before);
        }
    }

    /// Jump to a page; indices past the last page are dropped
    pub fn go_to_page(&mut self, page_index: usize) -> bool {
        if !self.controls_enabled() {
            return false;
        }
        let before = self.page_position();
        let page_count = self.page().page_count;
        let moved = self.store.set_page_index(page_index, Some(page_count));
        self.fire_page_change_since(before);
        moved
    }

    /// Change the page size; returns to the first page
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        let before = self.page_position();
        self.store.set_page_size(page_size)?;
        self.fire_page_change_since(before);
        Ok(())
    }

    // ============ Selection ============

    /// Selected rows still present in the data set, in selection order
    pub fn selected_rows(&self) -> Vec<Arc<Row>> {
        let cache = self.coordinator.cache();
        let by_id: std::collections::HashMap<&RowId, &Arc<Row>> =
            cache.shared_rows().map(|r| (r.id(), r)).collect();
        self.store
            .state()
            .row_selection
            .iter()
            .filter_map(|id| by_id.get(id).map(|r| Arc::clone(r)))
            .collect()
    }

    fn fire_row_select(&self) {
        let selected = self.selected_rows();
        self.delegate.on_row_select(&selected);
    }

    pub fn toggle_row(&mut self, row_id: &RowId) -> bool {
        let selected = self.store.toggle_row_selection(row_id);
        self.fire_row_select();
        selected
    }

    /// Select every row on the visible page, or deselect them all if they
    /// already are
    pub fn toggle_page_selection(&mut self) {
        let page = self.page();
        let ids: Vec<RowId> = page.row_ids().cloned().collect();
        self.store.toggle_rows_selection(ids.iter());
        self.fire_row_select();
    }

    pub fn clear_selection(&mut self) {
        if self.state().row_selection.is_empty() {
            return;
        }
        self.store.clear_selection();
        self.fire_row_select();
    }

    // ============ Visibility ============

    pub fn toggle_column(&mut self, column_id: &str) -> Result<bool> {
        let column = self.columns.require(column_id)?;
        if !column.hideable {
            return Ok(true);
        }
        Ok(self.store.toggle_column_visibility(column_id))
    }

    pub fn reset_columns(&mut self) {
        self.store.reset_column_visibility();
    }

    // ============ Toolbar ============

    pub fn refresh(&self) {
        tracing::debug!("refresh requested");
        self.delegate.on_refresh();
    }

    /// Rows in the configured export scope, also handed to the delegate
    pub fn export(&self) -> Vec<Arc<Row>> {
        let page = self.page();
        let rows = match self.options.export_scope {
            ExportScope::Filtered => page.filtered,
            ExportScope::Page => page.rows,
        };
        tracing::info!(rows = rows.len(), scope = ?self.options.export_scope, "export requested");
        self.delegate.on_export(&rows, &self.columns);
        rows
    }

    /// Export the configured scope as CSV over the visible columns
    pub fn export_csv(&self) -> std::result::Result<String, ExportError> {
        let rows = self.export();
        let columns: Vec<_> = self
            .columns
            .iter()
            .filter(|c| self.state().is_visible(&c.id))
            .collect();
        to_csv(&rows, &columns, &self.options.csv)
    }

    /// Parameters for a remote fetch of the current view
    pub fn server_request(&self) -> ServerRequest {
        ServerRequest::from_view_state(self.store.state())
    }

    pub fn pagination_controls(&self) -> PaginationControls {
        PaginationControls::new(&self.page(), self.store.state())
    }

    pub fn selection_summary(&self) -> SelectionSummary {
        SelectionSummary::new(&self.page(), self.store.state())
    }

    pub fn header_cells(&self) -> Vec<toolbar::HeaderCell> {
        toolbar::header_cells(&self.columns, self.store.state())
    }

    pub fn visibility_menu(&self) -> Vec<toolbar::VisibilityMenuItem> {
        toolbar::visibility_menu(&self.columns, self.store.state())
    }

    pub fn filter_fields(&self) -> Vec<toolbar::FilterField> {
        toolbar::filter_fields(&self.columns, self.store.state())
    }

    /// Route a toolbar, header or pagination action
    pub fn dispatch(&mut self, action: ToolbarAction) -> Result<()> {
        tracing::debug!(?action, "toolbar action");
        match action {
            ToolbarAction::Search(text) => self.search_input(text),
            ToolbarAction::ClearSearch => self.clear_search(),
            ToolbarAction::SetColumnFilter { column_id, filter } => {
                self.set_column_filter(&column_id, filter)?
            }
            ToolbarAction::ClearColumnFilter(column_id) => self.clear_column_filter(&column_id),
            ToolbarAction::ClearColumnFilters => self.clear_column_filters(),
            ToolbarAction::ToggleColumn(column_id) => {
                self.toggle_column(&column_id)?;
            }
            ToolbarAction::ResetColumns => self.reset_columns(),
            ToolbarAction::SetDensity(density) => self.store.set_density(density),
            ToolbarAction::Sort(column_id) => {
                self.header_click(&column_id);
            }
            ToolbarAction::ToggleRow(row_id) => {
                self.toggle_row(&row_id);
            }
            ToolbarAction::TogglePageSelection => self.toggle_page_selection(),
            ToolbarAction::ClearSelection => self.clear_selection(),
            ToolbarAction::FirstPage => self.first_page(),
            ToolbarAction::PrevPage => self.prev_page(),
            ToolbarAction::NextPage => self.next_page(),
            ToolbarAction::LastPage => self.last_page(),
            ToolbarAction::SetPageSize(size) => self.set_page_size(size)?,
            ToolbarAction::Refresh => self.refresh(),
            ToolbarAction::Export => {
                self.export();
            }
        }
        Ok(())
    }

    // ============ Editing ============

    /// Open an editor on a cell. A cell whose last commit failed reopens
    /// with the value that was attempted.
    pub fn cell_click(&mut self, row_id: &RowId, column_id: &str) -> bool {
        if !self.controls_enabled() {
            return false;
        }
        let Some(column) = self.columns.get(column_id) else {
            return false;
        };
        let cache = self.coordinator.cache();
        let Some(row) = cache.get(row_id) else {
            return false;
        };

        let failed = column
            .field_key()
            .and_then(|field| self.coordinator.cell_status(row_id, field));
        match failed {
            Some(CellStatus::Failed { attempted, .. }) => {
                self.editor.begin_with_value(row_id, column, &attempted)
            }
            Some(CellStatus::Saving) => false,
            None => self.editor.begin(row, column),
        }
    }

    pub fn edit_input(&mut self, text: impl Into<String>) -> bool {
        self.editor.update_draft(text)
    }

    pub fn cancel_edit(&mut self) -> EditResult {
        match self.editor.cancel() {
            EditOutcome::Cancelled => EditResult::Cancelled,
            _ => EditResult::Ignored,
        }
    }

    /// Enter commits the draft, Escape discards it
    pub fn edit_key(&mut self, key: EditKey) -> ServiceResult<EditResult> {
        let outcome = self.editor.handle_key(key, &self.columns);
        self.submit(outcome)
    }

    /// Explicit confirm button
    pub fn confirm_edit(&mut self) -> ServiceResult<EditResult> {
        let outcome = self.editor.confirm(&self.columns);
        self.submit(outcome)
    }

    /// Choice in a select editor; commits immediately
    pub fn choose_option(&mut self, value: &str) -> ServiceResult<EditResult> {
        let outcome = self.editor.choose(value, &self.columns);
        self.submit(outcome)
    }

    /// Flip a boolean editor; commits immediately
    pub fn toggle_cell(&mut self) -> ServiceResult<EditResult> {
        let outcome = self.editor.toggle(&self.columns);
        self.submit(outcome)
    }

    /// Apply a confirmed edit locally and hand back its remote write
    fn submit(&mut self, outcome: EditOutcome) -> ServiceResult<EditResult> {
        let request = match outcome {
            EditOutcome::Commit(request) => request,
            EditOutcome::Cancelled => return Ok(EditResult::Cancelled),
            EditOutcome::Ignored => return Ok(EditResult::Ignored),
            EditOutcome::Rejected(reason) => return Ok(EditResult::Rejected(reason)),
        };

        let cell = request.cell();
        match self
            .coordinator
            .begin_commit(request.row_id, &request.field, request.value)
        {
            Ok(commit) => Ok(EditResult::Submitted(PendingCommit {
                cell,
                coordinator: Arc::clone(&self.coordinator),
                commit,
            })),
            Err(err) => {
                tracing::warn!(column_id = %cell.column_id, error = %err, "commit not issued");
                self.editor.finish(&cell);
                Err(err)
            }
        }
    }

    /// Return the editor to `Idle` once a submitted commit resolves. An
    /// editor since opened on another cell is left alone.
    pub fn finish_commit(&mut self, resolution: &CommitResolution) {
        tracing::debug!(
            column_id = %resolution.cell.column_id,
            outcome = ?resolution.outcome,
            "edit commit resolved"
        );
        self.editor.finish(&resolution.cell);
    }

    /// Commit a value directly, bypassing the editor (e.g. scripted edits)
    pub async fn commit_cell(
        &self,
        row_id: RowId,
        column_id: &str,
        value: Value,
    ) -> ServiceResult<CommitOutcome> {
        let column = self
            .columns
            .get(column_id)
            .ok_or_else(|| MutationError::UnknownColumn(column_id.to_string()))?;
        if !column.is_editable() {
            return Err(MutationError::ReadOnlyColumn(column_id.to_string()));
        }
        if let Some(error) = &self.source.error {
            return Err(MutationError::FetchError(error.clone()));
        }
        let field = column.field_key().unwrap_or(column_id).to_string();
        self.coordinator.commit(row_id, &field, value).await
    }

    /// Whether `cell` currently has an open editor
    pub fn is_editing(&self, cell: &CellRef) -> bool {
        self.editor.is_editing(cell)
    }

    /// Current status of the page body
    pub fn status(&self) -> GridStatus {
        self.page().status
    }
}
