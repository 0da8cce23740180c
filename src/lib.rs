pub mod aggregate;
pub mod clean;
pub mod cli;
pub mod data;
pub mod display;
pub mod filter;
pub mod io_utils;
pub mod reconcile;
pub mod schema;
pub mod session;
pub mod table;
pub mod transform;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, info, warn};

use crate::{
    aggregate::{AggregateSpec, GroupKey, Reducer},
    cli::{
        AggregateArgs, CleanArgs, Cli, Commands, FilterArgs, InputArgs, OverviewArgs,
        ReconcileArgs, ReducerArg,
    },
    filter::EqualsOutcome,
    schema::{ColumnKind, PipelineConfig},
    session::AnalysisSession,
    table::Table,
    transform::string_ops,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("table_align", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Reconcile(args) => handle_reconcile(&args),
        Commands::Clean(args) => handle_clean(&args),
        Commands::Filter(args) => handle_filter(&args),
        Commands::Aggregate(args) => handle_aggregate(&args),
        Commands::Overview(args) => handle_overview(&args),
    }
}

fn load_inputs(args: &InputArgs) -> Result<(PipelineConfig, Table)> {
    let config = PipelineConfig::load(&args.schema)
        .with_context(|| format!("Loading schema from {:?}", args.schema))?;
    let table = Table::from_csv_path(&args.input, args.delimiter, args.input_encoding.as_deref())
        .with_context(|| format!("Loading table from {:?}", args.input))?;
    info!(
        "Loaded {} row(s) x {} column(s) from '{}'",
        table.row_count(),
        table.column_count(),
        args.input.display()
    );
    Ok((config, table))
}

fn handle_reconcile(args: &ReconcileArgs) -> Result<()> {
    let (config, table) = load_inputs(&args.input)?;
    let schema = config.schema()?;
    let binding = reconcile::reconcile(table.headers(), &schema, config.threshold, config.mode)
        .with_context(|| format!("Reconciling headers from {:?}", args.input.input))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&binding)?);
        return Ok(());
    }

    let (headers, rows) = display::binding_rows(&binding);
    display::print_table(&headers, &rows);
    if !binding.unresolved().is_empty() {
        warn!("Unresolved: {}", binding.unresolved().iter().join(", "));
    }
    info!(
        "Bound {} of {} canonical column(s) at threshold {}",
        binding.bound().len(),
        schema.len(),
        config.threshold
    );
    Ok(())
}

fn handle_clean(args: &CleanArgs) -> Result<()> {
    let (config, table) = load_inputs(&args.input)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input.input, args.input.delimiter);
    let session = AnalysisSession::prepare(config, table)?;
    session
        .table()
        .write_csv(args.output.as_deref(), delimiter)
        .with_context(|| format!("Writing cleaned table to {:?}", output_label(&args.output)))?;
    info!(
        "Cleaned {} row(s); {} column warning(s)",
        session.table().row_count(),
        session.warnings().len()
    );
    Ok(())
}

fn handle_filter(args: &FilterArgs) -> Result<()> {
    let (config, table) = load_inputs(&args.input)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input.input, args.input.delimiter);
    let session = AnalysisSession::prepare(config, table)?;

    let subset = if let Some(value) = &args.equals {
        let probe = match session.binding().get(&args.column).map(|b| b.kind) {
            Some(ColumnKind::Text) => string_ops::title_case(value.trim()).into_owned(),
            _ => value.clone(),
        };
        match session.filter_equals(&args.column, &probe)? {
            EqualsOutcome::Rows(subset) => subset,
            EqualsOutcome::UnknownValue { valid } => {
                println!(
                    "'{}' is not a value of {}. Valid values: {}",
                    probe,
                    args.column,
                    valid.iter().map(|v| format!("'{v}'")).join(", ")
                );
                return Ok(());
            }
        }
    } else if let (Some(from), Some(to)) = (&args.from, &args.to) {
        session.filter_range(&args.column, from, to)?
    } else {
        anyhow::bail!("Provide either --equals or both --from and --to");
    };

    info!(
        "Kept {} of {} row(s)",
        subset.row_count(),
        session.table().row_count()
    );
    subset
        .write_csv(args.output.as_deref(), delimiter)
        .with_context(|| format!("Writing filtered table to {:?}", output_label(&args.output)))?;
    Ok(())
}

fn handle_aggregate(args: &AggregateArgs) -> Result<()> {
    let (config, table) = load_inputs(&args.input)?;
    let session = AnalysisSession::prepare(config, table)?;

    let mut group_keys: Vec<GroupKey> = args
        .group_by
        .iter()
        .map(|name| GroupKey::Column(name.trim().to_string()))
        .collect();
    if let Some(period) = &args.period_from {
        group_keys.push(GroupKey::Period(period.trim().to_string()));
    }
    let spec = AggregateSpec {
        group_keys,
        measure: args.measure.clone(),
        reducer: match args.reducer {
            ReducerArg::Mean => Reducer::Mean,
            ReducerArg::Sum => Reducer::Sum,
            ReducerArg::Count => Reducer::Count,
            ReducerArg::Size => Reducer::Size,
        },
    };

    let mut result = session.aggregate(&spec)?;
    if let Some(top) = args.top {
        result = result.top_n(top);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    display::print_table(&display::result_headers(&result), &result.display_rows());
    info!("Aggregated into {} group(s)", result.len());
    Ok(())
}

fn handle_overview(args: &OverviewArgs) -> Result<()> {
    let (config, table) = load_inputs(&args.input)?;
    let session = AnalysisSession::prepare(config, table)?;
    print!("{}", display::overview_lines(&session.overview()));
    let (headers, rows) = display::binding_rows(session.binding());
    display::print_table(&headers, &rows);
    Ok(())
}

fn output_label(path: &Option<std::path::PathBuf>) -> String {
    path.as_deref()
        .map(Path::display)
        .map(|d| d.to_string())
        .unwrap_or_else(|| "stdout".to_string())
}
