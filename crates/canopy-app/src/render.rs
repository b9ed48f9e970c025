//! Terminal rendering of a derived grid page

use std::sync::Arc;

use canopy_core::Row;
use canopy_grid::{Density, GridStatus};
use canopy_services::{DataGrid, Notification, NotificationLevel};
use comfy_table::{Cell, ContentArrangement, Table, presets};

fn table_for(density: Density) -> Table {
    let mut table = Table::new();
    match density {
        Density::Compact => table.load_preset(presets::UTF8_FULL_CONDENSED),
        Density::Normal | Density::Spacious => table.load_preset(presets::UTF8_FULL),
    };
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Pad cell text with blank lines for the spacious density
fn padded(text: String, lines: usize) -> String {
    if lines == 0 {
        return text;
    }
    let pad = "\n".repeat(lines);
    format!("{pad}{text}{pad}")
}

/// Render the visible page, or the status placeholder, as a table
pub fn render_page(grid: &DataGrid) -> Table {
    let state = grid.state();
    let density = state.density;
    let mut table = table_for(density);

    let headers = grid.header_cells();
    table.set_header(headers.iter().map(|h| Cell::new(h.label())));

    let page = grid.page();
    match &page.status {
        GridStatus::Loading { placeholder_rows } => {
            for _ in 0..*placeholder_rows {
                table.add_row(headers.iter().map(|_| Cell::new("…")));
            }
        }
        GridStatus::Error(message) => {
            table.add_row(vec![Cell::new(format!("Error: {}", message))]);
        }
        GridStatus::Empty(message) => {
            table.add_row(vec![Cell::new(message)]);
        }
        GridStatus::Rows => add_rows(&mut table, grid, &page.rows),
    }
    table
}

/// Render specific rows over the visible columns, ignoring pagination
pub fn render_rows(grid: &DataGrid, rows: &[Arc<Row>]) -> Table {
    let mut table = table_for(grid.state().density);
    table.set_header(grid.header_cells().iter().map(|h| Cell::new(h.label())));
    add_rows(&mut table, grid, rows);
    table
}

fn add_rows(table: &mut Table, grid: &DataGrid, rows: &[Arc<Row>]) {
    let headers = grid.header_cells();
    let padding = grid.state().density.padding_lines();
    for row in rows {
        table.add_row(headers.iter().map(|h| {
            let text = grid.cell_text(row, &h.column_id).unwrap_or_default();
            Cell::new(padded(text, padding))
        }));
    }
}

/// One-line footer: page position and selection
pub fn footer(grid: &DataGrid) -> String {
    let controls = grid.pagination_controls();
    let summary = grid.selection_summary();
    let mut parts = vec![controls.page_label, format!("{} row(s)", summary.total_filtered)];
    if summary.selected > 0 {
        parts.push(summary.label());
    }
    if let Some(filters) = canopy_grid::toolbar::active_filter_summary(grid.columns(), grid.state()) {
        parts.push(format!("filters: {}", filters));
    }
    parts.join(" | ")
}

pub fn notification_line(notification: &Notification) -> String {
    let tag = match notification.level {
        NotificationLevel::Info => "info",
        NotificationLevel::Error => "error",
    };
    format!("[{}] {}", tag, notification.message)
}
