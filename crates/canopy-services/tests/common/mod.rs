//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use canopy_core::{ColumnDescriptor, ColumnSet, Row, RowId, SelectOption, Value};
use canopy_grid::{ColumnFilters, SortDirection};
use canopy_services::{CellMutator, GridDelegate, MutationError, ServiceResult};
use serde_json::json;

/// One scripted reply from the mock backend
#[derive(Debug, Clone)]
pub struct Reply {
    pub delay: Duration,
    pub result: ServiceResult<()>,
}

/// Mock remote mutator for testing commit coordination without a backend.
///
/// Replies are consumed in call order; once the script runs out every call
/// succeeds after `default_delay`.
pub struct MockMutator {
    pub default_delay: Duration,
    pub should_fail: bool,
    pub replies: Arc<parking_lot::Mutex<VecDeque<Reply>>>,
    /// Log of all calls made, for assertion in tests
    pub call_log: Arc<parking_lot::Mutex<Vec<(RowId, String, Value)>>>,
}

impl MockMutator {
    pub fn new() -> Self {
        Self {
            default_delay: Duration::ZERO,
            should_fail: false,
            replies: Arc::new(parking_lot::Mutex::new(VecDeque::new())),
            call_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn with_reply(self, delay: Duration, result: ServiceResult<()>) -> Self {
        self.replies.lock().push_back(Reply { delay, result });
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().len()
    }

    pub fn call_log(&self) -> Vec<(RowId, String, Value)> {
        self.call_log.lock().clone()
    }
}

#[async_trait]
impl CellMutator for MockMutator {
    async fn update_cell(&self, row_id: &RowId, field: &str, value: &Value) -> ServiceResult<()> {
        self.call_log
            .lock()
            .push((row_id.clone(), field.to_string(), value.clone()));

        let reply = self.replies.lock().pop_front();
        let (delay, result) = match reply {
            Some(reply) => (reply.delay, reply.result),
            None if self.should_fail => (
                self.default_delay,
                Err(MutationError::Rejected("backend refused the update".into())),
            ),
            None => (self.default_delay, Ok(())),
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

/// Delegate that records every hook invocation
#[derive(Default)]
pub struct RecordingDelegate {
    pub events: parking_lot::Mutex<Vec<String>>,
    pub selected: parking_lot::Mutex<Vec<RowId>>,
    pub exported: parking_lot::Mutex<usize>,
}

impl RecordingDelegate {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl GridDelegate for RecordingDelegate {
    fn on_sort_change(&self, column_id: Option<&str>, direction: Option<SortDirection>) {
        self.events.lock().push(format!(
            "sort {} {}",
            column_id.unwrap_or("-"),
            direction.map(|d| d.as_str()).unwrap_or("none")
        ));
    }

    fn on_filter_change(&self, filters: &ColumnFilters) {
        self.events.lock().push(format!("filter {}", filters.len()));
    }

    fn on_search_change(&self, global_filter: &str) {
        self.events.lock().push(format!("search {}", global_filter));
    }

    fn on_page_change(&self, page_index: usize, page_size: usize) {
        self.events
            .lock()
            .push(format!("page {} {}", page_index, page_size));
    }

    fn on_row_select(&self, selected: &[Arc<Row>]) {
        *self.selected.lock() = selected.iter().map(|r| r.id().clone()).collect();
        self.events.lock().push(format!("select {}", selected.len()));
    }

    fn on_refresh(&self) {
        self.events.lock().push("refresh".to_string());
    }

    fn on_export(&self, rows: &[Arc<Row>], _columns: &canopy_core::ColumnSet) {
        *self.exported.lock() = rows.len();
        self.events.lock().push(format!("export {}", rows.len()));
    }
}

/// Tree inventory columns used across tests
pub fn inventory_columns() -> ColumnSet {
    ColumnSet::new(vec![
        ColumnDescriptor::text("name", "Name").editable(),
        ColumnDescriptor::number("quantity", "Quantity").editable(),
        ColumnDescriptor::currency("price", "Price").editable(),
        ColumnDescriptor::select(
            "status",
            "Status",
            vec![
                SelectOption::new("active", "Active"),
                SelectOption::new("retired", "Retired"),
            ],
        )
        .editable(),
        ColumnDescriptor::boolean("native", "Native").editable(),
        ColumnDescriptor::date("planted", "Planted").editable(),
    ])
    .expect("columns are unique")
}

pub fn inventory_rows() -> Vec<Row> {
    Row::rows_from_json(json!([
        {"id": 1, "name": "Narra", "quantity": 3, "price": 120.5, "status": "active", "native": true, "planted": "2020-01-31"},
        {"id": 2, "name": "Acacia", "quantity": 5, "price": 80, "status": "retired", "native": false, "planted": "2019-06-12"},
        {"id": 3, "name": "Molave", "quantity": 1, "price": 300, "status": "active", "native": true, "planted": "2021-03-03"},
    ]))
    .expect("valid rows")
}

/// `count` rows with ids `1..=count` and a name per row
pub fn numbered_rows(count: i64) -> Vec<Row> {
    (1..=count)
        .map(|i| {
            Row::from_pairs(
                (i - 1) as usize,
                [
                    ("id", Value::Int64(i)),
                    ("name", Value::from(format!("Tree {}", i))),
                    ("quantity", Value::Int64(i)),
                ],
            )
        })
        .collect()
}
