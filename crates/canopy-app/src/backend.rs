//! In-memory stand-in for a remote data source

use std::time::Duration;

use async_trait::async_trait;
use canopy_core::{Row, RowId, Value};
use canopy_services::{CellMutator, MutationError, ServiceResult};
use parking_lot::Mutex;

/// Holds rows "on the server" and accepts cell writes after an optional
/// simulated latency
pub struct InMemoryBackend {
    rows: Mutex<Vec<Row>>,
    latency: Duration,
    fail_with: Option<String>,
}

impl InMemoryBackend {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            latency: Duration::ZERO,
            fail_with: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Reject every write with `message`
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Current server-side rows, as a refetch would return them
    pub fn fetch(&self) -> Vec<Row> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl CellMutator for InMemoryBackend {
    #[tracing::instrument(skip(self, value), fields(row_id = %row_id))]
    async fn update_cell(&self, row_id: &RowId, field: &str, value: &Value) -> ServiceResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(message) = &self.fail_with {
            tracing::debug!(%message, "backend rejecting write");
            return Err(MutationError::Rejected(message.clone()));
        }

        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|r| r.id() == row_id)
            .ok_or_else(|| MutationError::UnknownRow(row_id.clone()))?;
        *row = row.with_field(field, value.clone());
        tracing::debug!("backend stored value");
        Ok(())
    }
}
