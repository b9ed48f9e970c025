//! Canopy Services Layer
//!
//! This crate sits between a renderer and the synchronous grid state in
//! `canopy-grid`. It owns everything that talks to the outside world.
//!
//! # Architecture
//!
//! ```text
//! Renderer / CLI (canopy-app)
//!     ↓
//! Service Layer (canopy-services) ← This crate
//!     ↓
//! Grid State (canopy-grid)
//!     ↓
//! Row Model (canopy-core)
//! ```
//!
//! # Services
//!
//! - [`DataGrid`] - Engine facade driven by UI events
//! - [`MutationCoordinator`] - Optimistic cell commits with rollback
//! - [`GridDelegate`] - Caller hooks for server-side sources and exports
//! - [`ServerRequest`] - Fetch parameters for remote sorting, filtering and paging
//!
//! # Design Principles
//!
//! 1. **No UI dependencies** - Nothing here knows how cells are drawn
//! 2. **One writer per cell** - Only the latest commit for a cell may
//!    resolve into the cache
//! 3. **The engine never fetches** - Remote sources are told, via the
//!    delegate, that they should

mod coordinator;
mod delegate;
mod error;
pub mod export;
mod grid;
mod mutator;
mod server;

pub use coordinator::{
    CellKey, CellStatus, CommitOutcome, CoordinatorOptions, InFlightCommit, MutationCoordinator,
    Notification, NotificationLevel,
};
pub use delegate::{GridDelegate, NoopDelegate};
pub use error::{MutationError, ServiceResult};
pub use export::{CsvOptions, ExportError, ExportScope};
pub use grid::{CommitResolution, DataGrid, DataSource, EditResult, GridOptions, PendingCommit};
pub use mutator::CellMutator;
pub use server::ServerRequest;
