//! CSV export of grid rows
//!
//! Writes raw cell values (not display-formatted) for every field-backed
//! column: strings quoted with `"` doubled, nested JSON encoded and quoted,
//! nulls blank. An empty row set exports as empty output.

use std::io::Write;
use std::sync::Arc;

use canopy_core::{ColumnDescriptor, Row, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors during CSV export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Exported text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("No exportable columns")]
    NoColumns,
}

/// Which rows an export receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    /// Every filtered and sorted row, ignoring pagination
    #[default]
    Filtered,
    /// Only the visible page
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub include_headers: bool,
    pub field_delimiter: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            include_headers: true,
            field_delimiter: ',',
        }
    }
}

const QUALIFIER: char = '"';

fn qualify(value: &str) -> String {
    let escaped = value.replace(QUALIFIER, "\"\"");
    format!("{}{}{}", QUALIFIER, escaped, QUALIFIER)
}

/// Header titles are written bare unless they would break the record
fn header_cell(title: &str, delimiter: char) -> String {
    if title.contains(delimiter) || title.contains(QUALIFIER) || title.contains('\n') {
        qualify(title)
    } else {
        title.to_string()
    }
}

fn value_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(_) | Value::Int64(_) | Value::Float64(_) => value.to_string(),
        Value::String(s) => qualify(s),
        Value::Date(_) | Value::DateTime(_) => qualify(&value.to_string()),
        Value::Json(json) => qualify(&json.to_string()),
    }
}

/// Write `rows` as CSV; returns the number of data rows written
pub fn write_csv<W: Write>(
    writer: &mut W,
    rows: &[Arc<Row>],
    columns: &[&ColumnDescriptor],
    options: &CsvOptions,
) -> Result<usize, ExportError> {
    let columns: Vec<_> = columns
        .iter()
        .filter(|c| c.field_key().is_some())
        .collect();
    if columns.is_empty() {
        return Err(ExportError::NoColumns);
    }
    if rows.is_empty() {
        return Ok(0);
    }

    let delimiter = options.field_delimiter.to_string();

    if options.include_headers {
        let header = columns
            .iter()
            .map(|c| header_cell(&c.title, options.field_delimiter))
            .collect::<Vec<_>>()
            .join(&delimiter);
        writeln!(writer, "{}", header)?;
    }

    for row in rows {
        let line = columns
            .iter()
            .map(|c| value_cell(&c.value_of(row)))
            .collect::<Vec<_>>()
            .join(&delimiter);
        writeln!(writer, "{}", line)?;
    }

    writer.flush()?;
    tracing::debug!(rows = rows.len(), columns = columns.len(), "exported CSV");
    Ok(rows.len())
}

/// Render `rows` as a CSV string
pub fn to_csv(
    rows: &[Arc<Row>],
    columns: &[&ColumnDescriptor],
    options: &CsvOptions,
) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, rows, columns, options)?;
    Ok(String::from_utf8(buffer)?)
}
