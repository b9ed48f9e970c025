//! Canopy Grid - Framework-agnostic grid state and derivation
//!
//! Everything here is synchronous and independent of any UI toolkit:
//!
//! - `ViewStateStore` - sorting, filters, search, visibility, selection and
//!   pagination, with synchronous change notification
//! - `derive` - the filter → sort → paginate pipeline
//! - `CellEditController` - the single-cell inline edit state machine
//! - Toolbar, header and pagination view-models

pub mod debounce;
pub mod edit;
pub mod filter;
pub mod pagination;
pub mod pipeline;
pub mod selection;
pub mod sort;
pub mod toolbar;
pub mod view_state;

pub use debounce::Debounced;
pub use edit::{
    CellEditController, CellRef, CommitRequest, EditKey, EditOutcome, EditSession, EditState,
    EditorDraft, NumericInputPolicy,
};
pub use filter::{ColumnFilter, ColumnFilters, FilterCondition, FilterOperator};
pub use pagination::{PaginationEvent, PaginationState};
pub use pipeline::{DerivedPage, GridStatus, PipelineMode, SourceStatus, derive};
pub use selection::{RowSelection, SelectionMode};
pub use sort::{NullPosition, SortDirection, SortKey, SortState};
pub use toolbar::{
    FilterField, FilterInput, HeaderCell, PaginationControls, SelectionSummary, ToolbarAction,
    VisibilityMenuItem,
};
pub use view_state::{Density, ViewOptions, ViewState, ViewStateChange, ViewStateStore};
