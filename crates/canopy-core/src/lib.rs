//! Canopy Core - Core types for the editable data grid
//!
//! This crate provides the fundamental types that all other Canopy crates
//! depend on. It defines:
//!
//! - `Value` - A cell value that can represent any column kind
//! - `Row` and `RowId` - One data record and its stable identity
//! - `ColumnDescriptor` and `ColumnSet` - Declarative column definitions
//! - `RowCache` - Immutable, snapshot-versioned row model with patch/rollback
//! - Display formatting helpers for currency, dates and booleans

mod cache;
mod column;
mod error;
pub mod format;
mod row;
mod types;

pub use cache::*;
pub use column::*;
pub use error::*;
pub use row::*;
pub use types::*;
