//! `canopy` - browse and edit JSON row sets in the terminal
//!
//! ```text
//! canopy view trees.json --sort quantity --desc --search narra --page 2
//! canopy view trees.json --filter status=active --export -
//! canopy edit trees.json --row 3 --column quantity --value 12 --latency-ms 200
//! canopy settings --init
//! ```

mod backend;
mod logging;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use canopy_core::{ColumnKind, ColumnSet, Row, RowId};
use canopy_grid::{ColumnFilter, Density, EditorDraft, FilterCondition, FilterOperator};
use canopy_services::{CommitOutcome, DataGrid, DataSource, EditResult, ExportScope};
use canopy_settings::CanopySettings;
use clap::{Args, Parser, Subcommand};

use crate::backend::InMemoryBackend;
use crate::logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "canopy", version, about = "Sort, filter, page and edit JSON rows")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, env = "CANOPY_SETTINGS")]
    settings: Option<PathBuf>,

    /// Verbose console logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one page of a JSON array of objects
    View(ViewArgs),
    /// Edit one cell through the optimistic commit path
    Edit(EditArgs),
    /// Show the effective settings
    Settings {
        /// Write the effective settings to the settings file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args)]
struct ViewArgs {
    /// JSON file holding an array of row objects
    file: PathBuf,

    /// Sort by column; repeat with multi-sort enabled
    #[arg(long)]
    sort: Vec<String>,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Global search text
    #[arg(long)]
    search: Option<String>,

    /// Column filter, `column=value`
    #[arg(long)]
    filter: Vec<String>,

    /// Structured filter, e.g. `"quantity >= 3"` or `"name begins with n"`
    #[arg(long = "where")]
    conditions: Vec<String>,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long)]
    page_size: Option<usize>,

    /// Hide a column
    #[arg(long)]
    hide: Vec<String>,

    /// Select a row by id
    #[arg(long)]
    select: Vec<String>,

    #[arg(long, value_parser = ["compact", "normal", "spacious"])]
    density: Option<String>,

    /// Write CSV to this path, `-` for stdout. A bare file name is written
    /// to the exports directory.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Export only the visible page instead of every filtered row
    #[arg(long)]
    export_page: bool,
}

#[derive(Args)]
struct EditArgs {
    file: PathBuf,

    /// Row id (`#N` addresses a row without an id by position)
    #[arg(long)]
    row: String,

    #[arg(long)]
    column: String,

    /// Text typed into the editor
    #[arg(long)]
    value: String,

    /// Simulated backend latency
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Make the backend reject the write
    #[arg(long)]
    fail: bool,

    /// Write the backend's rows back to the file after a successful commit
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    };
    if let Err(err) = logging::init(config) {
        eprintln!("warning: logging unavailable: {err:#}");
    }

    let settings = load_settings(cli.settings.as_deref());

    match cli.command {
        Command::View(args) => run_view(args, &settings),
        Command::Edit(args) => run_edit(args, &settings).await,
        Command::Settings { init } => run_settings(init, cli.settings.as_deref(), &settings),
    }
}

fn load_settings(path: Option<&Path>) -> CanopySettings {
    let loaded = match path {
        Some(path) => CanopySettings::load_from(path),
        None => CanopySettings::load(),
    };
    loaded.unwrap_or_else(|err| {
        tracing::warn!("Failed to load settings, using defaults: {:#}", err);
        CanopySettings::default()
    })
}

fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let json: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("{:?} is not valid JSON", path))?;
    let rows = Row::rows_from_json(json).with_context(|| format!("{:?} is not a row array", path))?;
    tracing::debug!(rows = rows.len(), ?path, "loaded rows");
    Ok(rows)
}

fn parse_row_id(text: &str) -> RowId {
    if let Some(index) = text.strip_prefix('#').and_then(|i| i.parse().ok()) {
        return RowId::Index(index);
    }
    text.parse::<i64>()
        .map(RowId::Int)
        .unwrap_or_else(|_| RowId::Text(text.to_string()))
}

/// Parse `column op value`, matching the longest operator label
fn parse_condition(text: &str) -> Result<(String, FilterCondition)> {
    let text = text.trim();
    let (column, rest) = text
        .split_once(char::is_whitespace)
        .with_context(|| format!("expected `column operator value`, got {:?}", text))?;
    let rest = rest.trim_start();

    let mut operators = FilterOperator::all().to_vec();
    operators.sort_by_key(|op| std::cmp::Reverse(op.label().len()));
    let operator = operators
        .into_iter()
        .find(|op| {
            rest.get(..op.label().len())
                .is_some_and(|head| head.eq_ignore_ascii_case(op.label()))
        })
        .with_context(|| format!("unknown operator in {:?}", text))?;
    let operand = rest[operator.label().len()..].trim();

    let condition = if operator.requires_two_values() {
        let (low, high) = operand
            .split_once(" and ")
            .with_context(|| format!("expected `low and high` in {:?}", text))?;
        FilterCondition::between(low.trim(), high.trim())
    } else {
        FilterCondition::new(operator, operand)
    };
    Ok((column.to_string(), condition))
}

fn parse_density(text: &str) -> Density {
    match text {
        "compact" => Density::Compact,
        "spacious" => Density::Spacious,
        _ => Density::Normal,
    }
}

fn run_view(args: ViewArgs, settings: &CanopySettings) -> Result<()> {
    let rows = load_rows(&args.file)?;
    let columns = ColumnSet::infer(&rows);

    let mut options = settings.grid_options();
    if args.export_page {
        options.export_scope = ExportScope::Page;
    }
    if let Some(density) = &args.density {
        options.view.density = parse_density(density);
    }

    let mut grid = DataGrid::new(columns, options)?;
    grid.set_data(DataSource::rows(rows));

    if let Some(page_size) = args.page_size {
        grid.set_page_size(page_size)?;
    }
    for column_id in &args.hide {
        grid.columns().require(column_id)?;
        grid.store_mut().set_column_visible(column_id, false);
    }
    for arg in &args.filter {
        let (column_id, value) = arg
            .split_once('=')
            .with_context(|| format!("expected `column=value`, got {:?}", arg))?;
        grid.set_column_filter(column_id.trim(), ColumnFilter::text(value))?;
    }
    for arg in &args.conditions {
        let (column_id, condition) = parse_condition(arg)?;
        grid.set_column_filter(&column_id, ColumnFilter::Condition(condition))?;
    }
    if let Some(search) = &args.search {
        grid.search_input(search.as_str());
        grid.flush_search();
    }
    for column_id in &args.sort {
        if !grid.header_click(column_id) {
            bail!("column {:?} does not exist or is not sortable", column_id);
        }
        if args.desc {
            grid.header_click(column_id);
        }
    }
    for id in &args.select {
        grid.toggle_row(&parse_row_id(id));
    }
    if args.page > 1 && !grid.go_to_page(args.page - 1) {
        tracing::warn!(page = args.page, "page out of range; showing the first page");
    }

    println!("{}", render::render_page(&grid));
    println!("{}", render::footer(&grid));

    if let Some(path) = &args.export {
        let csv = grid.export_csv()?;
        if path.as_os_str() == "-" {
            print!("{}", csv);
        } else {
            let path = canopy_settings::export_path(path)?;
            std::fs::write(&path, csv).with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("exported to {}", path.display());
        }
    }
    Ok(())
}

async fn run_edit(args: EditArgs, settings: &CanopySettings) -> Result<()> {
    let rows = load_rows(&args.file)?;
    let columns = ColumnSet::new(ColumnSet::infer(&rows).iter().cloned().map(|c| c.editable()).collect())?;

    let mut backend =
        InMemoryBackend::new(rows.clone()).with_latency(Duration::from_millis(args.latency_ms));
    if args.fail {
        backend = backend.with_failure("rejected by --fail");
    }
    let backend = Arc::new(backend);

    let mut grid = DataGrid::new(columns, settings.grid_options())?.with_mutator(backend.clone());
    grid.set_data(DataSource::rows(rows));

    let row_id = parse_row_id(&args.row);
    let kind = grid.columns().require(&args.column)?.kind.clone();
    if !grid.cell_click(&row_id, &args.column) {
        bail!("cell {}/{} cannot be edited", row_id, args.column);
    }

    let result = match kind {
        ColumnKind::Select { .. } => grid.choose_option(&args.value)?,
        ColumnKind::Boolean => {
            let wanted = matches!(args.value.to_ascii_lowercase().as_str(), "true" | "yes" | "1");
            let current = grid.editor().session().map(|s| &s.draft);
            if current == Some(&EditorDraft::Toggle(wanted)) {
                grid.cancel_edit()
            } else {
                grid.toggle_cell()?
            }
        }
        _ => {
            grid.edit_input(args.value.as_str());
            grid.confirm_edit()?
        }
    };

    let outcome = match result {
        EditResult::Submitted(pending) => {
            eprintln!("saving {} = {}", pending.cell().column_id, pending.value());
            let resolution = pending.resolve().await;
            grid.finish_commit(&resolution);
            Some(resolution.outcome)
        }
        EditResult::Rejected(reason) => bail!("input rejected: {}", reason),
        EditResult::Cancelled => {
            eprintln!("value unchanged");
            None
        }
        EditResult::Ignored => {
            eprintln!("nothing to commit");
            None
        }
    };

    let invalidations = grid.coordinator().invalidation_count();
    match &outcome {
        Some(CommitOutcome::Committed) => eprintln!("committed"),
        Some(CommitOutcome::RolledBack(err)) => eprintln!("rolled back: {}", err),
        Some(other) => eprintln!("commit resolved as {:?}", other),
        None => {}
    }
    for notification in grid.take_notifications() {
        eprintln!("{}", render::notification_line(&notification));
    }

    // A committed write invalidates the cache; refetch what the backend holds
    if invalidations > 0 {
        grid.set_data(DataSource::rows(backend.fetch()));
    }
    let cache = grid.coordinator().cache();
    let edited: Vec<_> = cache
        .shared_rows()
        .filter(|r| r.id() == &row_id)
        .cloned()
        .collect();
    println!("{}", render::render_rows(&grid, &edited));

    if args.save && outcome == Some(CommitOutcome::Committed) {
        let json = serde_json::Value::Array(backend.fetch().iter().map(Row::to_json).collect());
        std::fs::write(&args.file, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Failed to write {:?}", args.file))?;
        eprintln!("saved {}", args.file.display());
    }
    Ok(())
}

fn run_settings(init: bool, path: Option<&Path>, settings: &CanopySettings) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => CanopySettings::settings_path()?,
    };
    if init {
        canopy_settings::ensure_directories()?;
        settings.save_to(&path)?;
        eprintln!("wrote {}", path.display());
    }
    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
