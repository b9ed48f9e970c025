//! Remote mutation seam

use async_trait::async_trait;
use canopy_core::{RowId, Value};

use crate::error::ServiceResult;

/// Writes one cell to the remote source of truth.
///
/// A rejected future is the only thing that rolls an optimistic edit back.
#[async_trait]
pub trait CellMutator: Send + Sync {
    async fn update_cell(&self, row_id: &RowId, field: &str, value: &Value) -> ServiceResult<()>;
}
