use std::collections::HashMap;
use std::fmt::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::{debug, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tableview::{
    Column, DEFAULT_PAGE_SIZE, EditOutcome, FilterSpec, Message, Model, RowId, RowView, SortDirection,
    SortSpec, Value, ViewConfig, ViewData, ViewListener,
};

mod loader;

use loader::{AppError, load_table};

#[derive(Parser, Debug)]
#[command(name = "tableview", version)]
#[command(about = "Filter, sort, group and page through a CSV, Parquet or Arrow file", long_about = None)]
struct Args {
    /// Data file to load (`~` and environment variables are expanded).
    file: String,
    /// Column key to sort by.
    #[arg(long, value_name = "KEY")]
    sort: Option<String>,
    /// Sort descending instead of ascending.
    #[arg(long, requires = "sort")]
    desc: bool,
    /// Case-insensitive text searched in every column.
    #[arg(short, long)]
    query: Option<String>,
    /// Keep only rows whose column equals the value ("all" disables it).
    #[arg(long, value_name = "KEY=VALUE")]
    category: Option<String>,
    /// Group rows by a column instead of paginating.
    #[arg(long, value_name = "KEY")]
    group_by: Option<String>,
    /// Expand every group.
    #[arg(long, requires = "group_by")]
    expand_all: bool,
    /// 1-based page to show.
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,
    /// Edit a cell before rendering. May be repeated.
    #[arg(long, value_name = "ID:KEY=VALUE")]
    edit: Vec<String>,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .init();
}

/// Logs committed edits. The file on disk is never written.
struct LogListener;

impl ViewListener for LogListener {
    fn on_row_updated(&mut self, row_id: RowId, column_key: &str, value: &Value) -> Result<(), String> {
        info!("Row {row_id}: {column_key} <- {value}");
        Ok(())
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let path = shellexpand::full(&args.file).map_err(|e| AppError::InvalidArgument(e.to_string()))?;
    let table = load_table(PathBuf::from(path.as_ref()))?;
    info!("Loaded {} with {} rows", table.name, table.rows.len());

    let mut model = Model::new(table.columns, table.rows, &build_config(&args)?, LogListener)?;
    for edit in &args.edit {
        apply_edit(&mut model, edit)?;
    }
    if args.expand_all {
        model.update(Message::ExpandAllGroups)?;
    }
    model.update(Message::GoToPage(args.page))?;

    print!("{}", render(model.columns(), model.sort_spec(), &model.view_data())?);
    Ok(())
}

fn build_config(args: &Args) -> Result<ViewConfig, AppError> {
    let mut filter = FilterSpec::query(args.query.clone().unwrap_or_default());
    if let Some(category) = &args.category {
        let (key, value) = category
            .split_once('=')
            .ok_or_else(|| AppError::InvalidArgument(format!("expected KEY=VALUE, got \"{category}\"")))?;
        filter.category_key = Some(key.to_string());
        filter.category_value = Some(value.to_string());
    }

    let sort = match (&args.sort, args.desc) {
        (Some(key), false) => SortSpec::ascending(key),
        (Some(key), true) => SortSpec::descending(key),
        (None, _) => SortSpec::default(),
    };

    let mut config = ViewConfig::default()
        .page_size(args.page_size)
        .sort(sort)
        .filter(filter);
    if let Some(key) = &args.group_by {
        config = config.group_column(key);
    }
    debug!("{config:?}");
    Ok(config)
}

/// Parses `ID:KEY=VALUE`.
fn parse_edit(edit: &str) -> Result<(RowId, &str, &str), AppError> {
    let invalid = || AppError::InvalidArgument(format!("expected ID:KEY=VALUE, got \"{edit}\""));
    let (id, rest) = edit.split_once(':').ok_or_else(invalid)?;
    let (key, value) = rest.split_once('=').ok_or_else(invalid)?;
    let id = id.trim().parse::<u64>().map_err(|_| invalid())?;
    Ok((RowId(id), key, value))
}

fn apply_edit(model: &mut Model, edit: &str) -> Result<(), AppError> {
    let (row_id, key, value) = parse_edit(edit)?;
    if !model.start_edit(row_id, key)? {
        return Err(AppError::InvalidArgument(format!("cell {row_id}:{key} cannot be edited")));
    }
    model.change_edit_value(value);
    match model.commit_edit()? {
        EditOutcome::Committed { previous, .. } => {
            debug!("{row_id}:{key} changed from {previous}");
            Ok(())
        }
        EditOutcome::Invalid(message) | EditOutcome::Rejected(message) => {
            model.cancel_edit();
            Err(AppError::InvalidArgument(format!("{row_id}:{key}: {message}")))
        }
        EditOutcome::NotEditing => Ok(()),
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("∅"),
        v => v.to_string().replace("\r\n", " ↵ ").replace('\n', " ↵ "),
    }
}

fn render_row(out: &mut String, row: &RowView) -> std::fmt::Result {
    let cells: Vec<String> = row.values.iter().map(format_cell).collect();
    let mark = if row.selected { "*" } else { "" };
    writeln!(out, "{mark}{}\t{}", row.id, cells.join("\t"))
}

/// Tab separated table plus a one line summary.
fn render(columns: &[Column], sort: &SortSpec, data: &ViewData) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .map(|c| match (&sort.column_key, sort.direction) {
            (Some(key), SortDirection::Ascending) if *key == c.key => format!("{} ▲", c.label),
            (Some(key), SortDirection::Descending) if *key == c.key => format!("{} ▼", c.label),
            _ => c.label.clone(),
        })
        .collect();
    writeln!(out, "id\t{}", header.join("\t"))?;

    match &data.groups {
        None => {
            for row in &data.visible_rows {
                render_row(&mut out, row)?;
            }
            if data.filtered_count == 0 {
                writeln!(out, "No rows match ({} total)", data.total_count)?;
            } else {
                writeln!(
                    out,
                    "Showing {}-{} of {} rows ({} total), page {}/{}",
                    data.page.start_index + 1,
                    data.page.end_index,
                    data.filtered_count,
                    data.total_count,
                    data.page.current,
                    data.page.total
                )?;
            }
        }
        Some(groups) => {
            let rows: HashMap<RowId, &RowView> = data.visible_rows.iter().map(|r| (r.id, r)).collect();
            for group in groups {
                let marker = if group.expanded { "▾" } else { "▸" };
                writeln!(out, "{marker} {} ({} items)", group.key, group.count)?;
                if group.expanded {
                    for row in group.row_ids.iter().filter_map(|id| rows.get(id)) {
                        render_row(&mut out, row)?;
                    }
                }
            }
            writeln!(
                out,
                "{} groups, {} of {} rows",
                groups.len(),
                data.filtered_count,
                data.total_count
            )?;
        }
    }
    Ok(out)
}
