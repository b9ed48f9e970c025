//! Cell edit controller
//!
//! An explicit three-state machine: `Idle`, `Editing` one cell, or
//! `Committing` that cell while its mutation is in flight. At most one
//! cell is ever being edited; opening another cell while a commit is in
//! flight leaves that commit to the mutation coordinator.

use canopy_core::{ColumnDescriptor, ColumnKind, ColumnSet, Row, RowId, SelectOption, Value, format};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What to do with numeric input that does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericInputPolicy {
    /// Commit `0` instead
    #[default]
    CoerceToZero,
    /// Refuse to commit and stay in edit mode
    Reject,
}

impl NumericInputPolicy {
    pub fn from_coerce_flag(coerce_invalid_numeric_input_to_zero: bool) -> Self {
        if coerce_invalid_numeric_input_to_zero {
            Self::CoerceToZero
        } else {
            Self::Reject
        }
    }
}

/// Address of one cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row_id: RowId,
    pub column_id: String,
}

impl CellRef {
    pub fn new(row_id: RowId, column_id: impl Into<String>) -> Self {
        Self {
            row_id,
            column_id: column_id.into(),
        }
    }
}

/// Draft value held by the per-kind editor
#[derive(Debug, Clone, PartialEq)]
pub enum EditorDraft {
    Text(String),
    Number(String),
    /// `YYYY-MM-DD`
    Date(String),
    Select {
        options: Vec<SelectOption>,
        value: String,
    },
    Toggle(bool),
    Custom(String),
}

impl EditorDraft {
    /// Initial draft for `column` seeded from the current cell value
    pub fn for_column(column: &ColumnDescriptor, current: &Value) -> Self {
        match &column.kind {
            ColumnKind::Text => Self::Text(current.to_search_text()),
            ColumnKind::Number | ColumnKind::Currency { .. } => {
                Self::Number(current.to_search_text())
            }
            ColumnKind::Date => Self::Date(format::format_date(current)),
            ColumnKind::Select { options } => Self::Select {
                options: options.clone(),
                value: current.to_search_text(),
            },
            ColumnKind::Boolean => Self::Toggle(current.is_truthy()),
            ColumnKind::Custom => Self::Custom(current.to_search_text()),
        }
    }

    /// Text shown in the editor input
    pub fn display_text(&self) -> String {
        match self {
            Self::Text(s) | Self::Number(s) | Self::Date(s) | Self::Custom(s) => s.clone(),
            Self::Select { value, .. } => value.clone(),
            Self::Toggle(b) => format::format_bool(&Value::Bool(*b)).to_string(),
        }
    }

    /// Select and toggle editors commit on choice
    pub fn commits_immediately(&self) -> bool {
        matches!(self, Self::Select { .. } | Self::Toggle(_))
    }
}

/// Parse number editor input. Integers stay integers.
pub fn parse_numeric_input(input: &str) -> Option<Value> {
    let input = input.trim();
    if let Ok(i) = input.parse::<i64>() {
        return Some(Value::Int64(i));
    }
    input
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float64)
}

/// One in-progress edit
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    pub cell: CellRef,
    pub draft: EditorDraft,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing(EditSession),
    Committing(CellRef),
}

/// Mutation request produced by a confirmed edit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub row_id: RowId,
    pub column_id: String,
    pub field: String,
    pub value: Value,
}

impl CommitRequest {
    pub fn cell(&self) -> CellRef {
        CellRef::new(self.row_id.clone(), self.column_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Enter,
    Escape,
}

/// Result of an editor interaction
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Hand this to the mutation coordinator, then call `finish`
    Commit(CommitRequest),
    Cancelled,
    /// Nothing to do in the current state
    Ignored,
    /// Input refused; the editor stays open
    Rejected(String),
}

#[derive(Debug, Clone, Default)]
pub struct CellEditController {
    state: EditState,
    numeric_policy: NumericInputPolicy,
    read_only: bool,
}

impl CellEditController {
    pub fn new(numeric_policy: NumericInputPolicy) -> Self {
        Self {
            state: EditState::Idle,
            numeric_policy,
            read_only: false,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn numeric_policy(&self) -> NumericInputPolicy {
        self.numeric_policy
    }

    /// A grid without a commit hook edits nothing
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        if read_only {
            self.reset();
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn session(&self) -> Option<&EditSession> {
        match &self.state {
            EditState::Editing(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_editing(&self, cell: &CellRef) -> bool {
        self.session().is_some_and(|s| &s.cell == cell)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, EditState::Idle)
    }

    /// Open an editor on a cell click, seeded from the current value.
    /// Only possible from `Idle` on an editable column.
    pub fn begin(&mut self, row: &Row, column: &ColumnDescriptor) -> bool {
        let current = column.value_of(row);
        self.begin_with_value(row.id(), column, &current)
    }

    /// Open an editor seeded with `value`, as when retrying a failed commit
    pub fn begin_with_value(&mut self, row_id: &RowId, column: &ColumnDescriptor, value: &Value) -> bool {
        if self.read_only || !column.is_editable() || self.session().is_some() {
            return false;
        }
        let session = EditSession {
            cell: CellRef::new(row_id.clone(), column.id.clone()),
            draft: EditorDraft::for_column(column, value),
        };
        tracing::debug!(row_id = %row_id, column_id = %column.id, "editing cell");
        self.state = EditState::Editing(session);
        true
    }

    /// Replace the draft text of a free-form editor
    pub fn update_draft(&mut self, input: impl Into<String>) -> bool {
        let EditState::Editing(session) = &mut self.state else {
            return false;
        };
        match &mut session.draft {
            EditorDraft::Text(s) | EditorDraft::Number(s) | EditorDraft::Date(s) | EditorDraft::Custom(s) => {
                *s = input.into();
                true
            }
            EditorDraft::Select { .. } | EditorDraft::Toggle(_) => false,
        }
    }

    /// Pick a select option; commits at once. Values outside the option
    /// set are refused.
    pub fn choose(&mut self, value: &str, columns: &ColumnSet) -> EditOutcome {
        let EditState::Editing(session) = &mut self.state else {
            return EditOutcome::Ignored;
        };
        let EditorDraft::Select { options, value: current } = &mut session.draft else {
            return EditOutcome::Ignored;
        };
        if !options.iter().any(|o| o.value == value) {
            return EditOutcome::Rejected(format!("'{}' is not one of the column's options", value));
        }
        *current = value.to_string();
        self.confirm(columns)
    }

    /// Flip a boolean cell; commits at once
    pub fn toggle(&mut self, columns: &ColumnSet) -> EditOutcome {
        let EditState::Editing(session) = &mut self.state else {
            return EditOutcome::Ignored;
        };
        let EditorDraft::Toggle(value) = &mut session.draft else {
            return EditOutcome::Ignored;
        };
        *value = !*value;
        self.confirm(columns)
    }

    pub fn handle_key(&mut self, key: EditKey, columns: &ColumnSet) -> EditOutcome {
        match key {
            EditKey::Enter => self.confirm(columns),
            EditKey::Escape => self.cancel(),
        }
    }

    /// Convert the draft and move to `Committing`
    pub fn confirm(&mut self, columns: &ColumnSet) -> EditOutcome {
        let EditState::Editing(session) = &self.state else {
            return EditOutcome::Ignored;
        };
        let Some(column) = columns.get(&session.cell.column_id) else {
            tracing::warn!(column_id = %session.cell.column_id, "edited column no longer exists");
            self.reset();
            return EditOutcome::Cancelled;
        };
        let Some(field) = column.field_key() else {
            self.reset();
            return EditOutcome::Cancelled;
        };

        let value = match self.convert(column, &session.draft) {
            Ok(value) => value,
            Err(reason) => {
                tracing::debug!(column_id = %column.id, %reason, "edit input rejected");
                return EditOutcome::Rejected(reason);
            }
        };

        let request = CommitRequest {
            row_id: session.cell.row_id.clone(),
            column_id: session.cell.column_id.clone(),
            field: field.to_string(),
            value,
        };
        self.state = EditState::Committing(request.cell());
        EditOutcome::Commit(request)
    }

    fn convert(&self, column: &ColumnDescriptor, draft: &EditorDraft) -> Result<Value, String> {
        match draft {
            EditorDraft::Text(s) => Ok(Value::String(s.clone())),
            EditorDraft::Number(s) => match (parse_numeric_input(s), self.numeric_policy) {
                (Some(value), _) => Ok(value),
                (None, NumericInputPolicy::CoerceToZero) => {
                    tracing::debug!(input = %s, "coercing invalid numeric input to 0");
                    Ok(Value::Int64(0))
                }
                (None, NumericInputPolicy::Reject) => Err(format!("'{}' is not a number", s)),
            },
            EditorDraft::Date(s) if s.trim().is_empty() => Ok(Value::Null),
            EditorDraft::Date(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", s)),
            EditorDraft::Select { value, .. } => Ok(Value::String(value.clone())),
            EditorDraft::Toggle(b) => Ok(Value::Bool(*b)),
            EditorDraft::Custom(s) => Ok(match &column.parser {
                Some(parser) => parser(s),
                None => Value::String(s.clone()),
            }),
        }
    }

    /// Leave edit mode, discarding the draft
    pub fn cancel(&mut self) -> EditOutcome {
        match self.state {
            EditState::Editing(_) => {
                self.state = EditState::Idle;
                EditOutcome::Cancelled
            }
            _ => EditOutcome::Ignored,
        }
    }

    /// The commit for `cell` resolved, successfully or not
    pub fn finish(&mut self, cell: &CellRef) {
        if matches!(&self.state, EditState::Committing(c) if c == cell) {
            self.state = EditState::Idle;
        }
    }

    /// Drop to `Idle` if the cell being edited or committed belongs to a
    /// row that no longer exists
    pub fn discard_if_missing(&mut self, exists: impl Fn(&RowId) -> bool) -> bool {
        let row_id = match &self.state {
            EditState::Idle => return false,
            EditState::Editing(session) => &session.cell.row_id,
            EditState::Committing(cell) => &cell.row_id,
        };
        if exists(row_id) {
            return false;
        }
        tracing::debug!(row_id = %row_id, "discarding edit for vanished row");
        self.state = EditState::Idle;
        true
    }

    pub fn reset(&mut self) {
        self.state = EditState::Idle;
    }
}
