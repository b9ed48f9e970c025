//! Optimistic mutation coordinator
//!
//! Owns the row cache and applies cell edits ahead of the remote write.
//! Each commit is tagged with a per-cell mutation id; only the resolution
//! carrying the latest id issued for a cell may touch that cell's cache
//! slot, so a slow, stale response can never overwrite a newer edit.

use std::collections::HashMap;
use std::sync::Arc;

use canopy_core::{MutationId, OptimisticPatch, Row, RowCache, RowId, Value};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{MutationError, ServiceResult};
use crate::mutator::CellMutator;

/// One cell addressed by row identity and field name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CellKey {
    pub row_id: RowId,
    pub field: String,
}

impl CellKey {
    pub fn new(row_id: RowId, field: impl Into<String>) -> Self {
        Self {
            row_id,
            field: field.into(),
        }
    }
}

/// Per-cell save indicator
#[derive(Debug, Clone, PartialEq)]
pub enum CellStatus {
    /// Remote write in flight and the cache still shows the old value
    Saving,
    /// Last write failed; `attempted` seeds the editor on retry
    Failed { attempted: Value, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Transient message for the UI to show and then drop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub cell: Option<CellKey>,
}

impl Notification {
    pub fn error(message: impl Into<String>, cell: Option<CellKey>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level: NotificationLevel::Error,
            message: message.into(),
            cell,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level: NotificationLevel::Info,
            message: message.into(),
            cell: None,
        }
    }
}

/// How a commit ended
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The remote write succeeded and the cache holds the new value
    Committed,
    /// The remote write failed and the cell was restored
    RolledBack(MutationError),
    /// A newer commit to the same cell was issued meanwhile
    Superseded,
    /// The row or field went away before the write resolved
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Write the cache before the remote call resolves
    pub optimistic: bool,
    /// Count a non-refetching invalidation after each success
    pub invalidate_on_success: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            optimistic: true,
            invalidate_on_success: true,
        }
    }
}

/// Latest unresolved commit for a cell
#[derive(Debug, Clone)]
struct PendingCell {
    patch: OptimisticPatch,
    /// Last value known to be on the server; the rollback target
    baseline: Option<Value>,
}

#[derive(Debug, Default)]
struct State {
    cache: RowCache,
    next_id: MutationId,
    /// Latest id ever issued per cell
    issued: HashMap<CellKey, MutationId>,
    pending: HashMap<CellKey, PendingCell>,
    statuses: HashMap<CellKey, CellStatus>,
    notifications: Vec<Notification>,
    invalidations: u64,
}

impl State {
    /// Drop bookkeeping for cells whose row is no longer cached
    fn forget_missing_rows(&mut self) {
        let cache = &self.cache;
        self.pending.retain(|key, _| cache.contains(&key.row_id));
        self.statuses.retain(|key, _| cache.contains(&key.row_id));
        self.issued.retain(|key, _| cache.contains(&key.row_id));
    }
}

/// A commit whose local effects are applied and whose remote write is
/// still to be awaited with [`MutationCoordinator::complete`]
#[derive(Clone)]
pub struct InFlightCommit {
    mutator: Arc<dyn CellMutator>,
    key: CellKey,
    mutation_id: MutationId,
    value: Value,
}

impl InFlightCommit {
    pub fn cell(&self) -> &CellKey {
        &self.key
    }

    pub fn mutation_id(&self) -> MutationId {
        self.mutation_id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl std::fmt::Debug for InFlightCommit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightCommit")
            .field("key", &self.key)
            .field("mutation_id", &self.mutation_id)
            .field("value", &self.value)
            .finish()
    }
}

pub struct MutationCoordinator {
    mutator: Option<Arc<dyn CellMutator>>,
    options: CoordinatorOptions,
    state: Mutex<State>,
}

impl std::fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("has_mutator", &self.mutator.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl MutationCoordinator {
    pub fn new(
        cache: RowCache,
        mutator: Option<Arc<dyn CellMutator>>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            mutator,
            options,
            state: Mutex::new(State {
                cache,
                ..State::default()
            }),
        }
    }

    pub fn has_mutator(&self) -> bool {
        self.mutator.is_some()
    }

    pub fn options(&self) -> CoordinatorOptions {
        self.options
    }

    /// Current cache snapshot
    pub fn cache(&self) -> RowCache {
        self.state.lock().cache.clone()
    }

    /// Swap in a freshly fetched data set.
    ///
    /// Commits still in flight for cells that exist in the new rows are
    /// kept: the fetched value becomes their rollback target and, in
    /// optimistic mode, the pending value is laid back over it. Commits for
    /// cells that vanished are forgotten and resolve as discarded.
    pub fn replace_rows(&self, rows: Vec<Row>) -> RowCache {
        let optimistic = self.options.optimistic;
        let mut state = self.state.lock();
        let mut cache = state.cache.replace_rows(rows);

        let before = state.pending.len();
        let mut vanished = Vec::new();
        state.pending.retain(|key, pending| {
            let Some(row) = cache.get(&key.row_id) else {
                return false;
            };
            let fetched = row.get(&key.field).cloned();
            if fetched.is_none() && pending.baseline.is_some() {
                vanished.push(key.clone());
                return false;
            }
            pending.baseline = fetched.clone();
            pending.patch.previous_value = fetched;
            if optimistic {
                cache = cache.apply_patch(&pending.patch);
            }
            true
        });
        if before > 0 {
            tracing::debug!(
                kept = state.pending.len(),
                dropped = before - state.pending.len(),
                "data refreshed with commits in flight"
            );
        }

        for key in &vanished {
            state.statuses.remove(key);
        }
        state.cache = cache;
        state.forget_missing_rows();
        state.cache.clone()
    }

    /// Prepend a row without a remote write
    pub fn insert_row(&self, row: Row) -> RowCache {
        let mut state = self.state.lock();
        state.cache = state.cache.insert_front(row);
        state.cache.clone()
    }

    /// Drop a row without a remote write
    pub fn remove_row(&self, row_id: &RowId) -> RowCache {
        let mut state = self.state.lock();
        state.cache = state.cache.remove(row_id);
        state.forget_missing_rows();
        state.cache.clone()
    }

    pub fn cell_status(&self, row_id: &RowId, field: &str) -> Option<CellStatus> {
        self.state
            .lock()
            .statuses
            .get(&CellKey::new(row_id.clone(), field))
            .cloned()
    }

    /// Forget a failure marker, e.g. once the user has seen it
    pub fn clear_cell_status(&self, row_id: &RowId, field: &str) {
        self.state
            .lock()
            .statuses
            .remove(&CellKey::new(row_id.clone(), field));
    }

    pub fn pending_patch(&self, row_id: &RowId, field: &str) -> Option<OptimisticPatch> {
        self.state
            .lock()
            .pending
            .get(&CellKey::new(row_id.clone(), field))
            .map(|p| p.patch.clone())
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Cells with a mutation id still outstanding
    pub fn tracked_cell_count(&self) -> usize {
        self.state.lock().issued.len()
    }

    /// Drain queued notifications
    pub fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut self.state.lock().notifications)
    }

    pub fn notify(&self, notification: Notification) {
        self.state.lock().notifications.push(notification);
    }

    /// Number of non-refetching invalidations signalled so far
    pub fn invalidation_count(&self) -> u64 {
        self.state.lock().invalidations
    }

    /// Commit one cell edit.
    ///
    /// Fails without touching any state when no mutator is configured or
    /// the row is not in the cache. Otherwise the edit is applied (or
    /// marked saving), the remote write awaited, and the outcome folded in.
    #[tracing::instrument(skip(self, row_id, value), fields(row_id = %row_id))]
    pub async fn commit(
        &self,
        row_id: RowId,
        field: &str,
        value: Value,
    ) -> ServiceResult<CommitOutcome> {
        let commit = self.begin_commit(row_id, field, value)?;
        Ok(self.complete(commit).await)
    }

    /// Issue a mutation id and apply the edit locally, without waiting on
    /// the remote write
    pub fn begin_commit(
        &self,
        row_id: RowId,
        field: &str,
        value: Value,
    ) -> ServiceResult<InFlightCommit> {
        let mutator = self.mutator.clone().ok_or(MutationError::NoMutator)?;
        let key = CellKey::new(row_id.clone(), field);

        let mut state = self.state.lock();
        if !state.cache.contains(&row_id) {
            tracing::warn!(row_id = %row_id, "commit for unknown row ignored");
            return Err(MutationError::UnknownRow(row_id));
        }

        state.next_id += 1;
        let mutation_id = state.next_id;
        state.issued.insert(key.clone(), mutation_id);

        let current = state.cache.value(&row_id, field).cloned();
        let baseline = match state.pending.get(&key) {
            Some(pending) => {
                tracing::debug!(
                    superseded = pending.patch.mutation_id,
                    mutation_id,
                    "superseding in-flight commit"
                );
                pending.baseline.clone()
            }
            None => current.clone(),
        };
        let patch = OptimisticPatch {
            row_id,
            field: field.to_string(),
            previous_value: current,
            new_value: value.clone(),
            mutation_id,
        };

        if self.options.optimistic {
            state.cache = state.cache.apply_patch(&patch);
            state.statuses.remove(&key);
        } else {
            state.statuses.insert(key.clone(), CellStatus::Saving);
        }
        state.pending.insert(key.clone(), PendingCell { patch, baseline });

        Ok(InFlightCommit {
            mutator,
            key,
            mutation_id,
            value,
        })
    }

    /// Await the remote write of a begun commit and fold in its outcome
    #[tracing::instrument(
        skip(self, commit),
        fields(row_id = %commit.key.row_id, mutation_id = commit.mutation_id)
    )]
    pub async fn complete(&self, commit: InFlightCommit) -> CommitOutcome {
        let InFlightCommit {
            mutator,
            key,
            mutation_id,
            value,
        } = commit;
        let result = mutator.update_cell(&key.row_id, &key.field, &value).await;

        let mut state = self.state.lock();
        self.resolve(&mut state, &key, mutation_id, value, result)
    }

    fn resolve(
        &self,
        state: &mut State,
        key: &CellKey,
        mutation_id: MutationId,
        value: Value,
        result: ServiceResult<()>,
    ) -> CommitOutcome {
        let is_latest = state.issued.get(key) == Some(&mutation_id);
        let pending_id = state.pending.get(key).map(|p| p.patch.mutation_id);
        if is_latest {
            state.issued.remove(key);
        }

        if !state.cache.contains(&key.row_id) {
            tracing::debug!(mutation_id, "row vanished before commit resolved");
            if is_latest {
                state.pending.remove(key);
                state.statuses.remove(key);
            }
            return CommitOutcome::Discarded;
        }

        if !is_latest {
            // A stale success still tells us what the server now holds
            if result.is_ok() && pending_id.is_some() {
                if let Some(pending) = state.pending.get_mut(key) {
                    pending.baseline = Some(value.clone());
                }
                if !self.options.optimistic {
                    state.cache = state.cache.set_value(&key.row_id, &key.field, value);
                }
            }
            tracing::debug!(mutation_id, ok = result.is_ok(), "ignoring stale resolution");
            return CommitOutcome::Superseded;
        }

        let Some(pending) = state.pending.remove(key) else {
            tracing::debug!(mutation_id, "field vanished before commit resolved");
            return CommitOutcome::Discarded;
        };

        match result {
            Ok(()) => {
                if !self.options.optimistic {
                    state.cache = state.cache.apply_patch(&pending.patch);
                }
                state.statuses.remove(key);
                if self.options.invalidate_on_success {
                    state.invalidations += 1;
                }
                tracing::info!(field = %key.field, mutation_id, "cell update committed");
                CommitOutcome::Committed
            }
            Err(err) => {
                if self.options.optimistic {
                    let rollback = OptimisticPatch {
                        previous_value: pending.baseline.clone(),
                        ..pending.patch.clone()
                    };
                    state.cache = state.cache.rollback(&rollback);
                }
                let message = err.to_string();
                state.statuses.insert(
                    key.clone(),
                    CellStatus::Failed {
                        attempted: value,
                        message: message.clone(),
                    },
                );
                state.notifications.push(Notification::error(
                    format!("Failed to update {}: {}", key.field, message),
                    Some(key.clone()),
                ));
                tracing::info!(field = %key.field, mutation_id, error = %message, "cell update rolled back");
                CommitOutcome::RolledBack(err)
            }
        }
    }
}
