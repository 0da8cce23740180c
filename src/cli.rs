use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile messy tabular headers against a canonical schema and analyze the result",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Match raw CSV headers against the canonical schema and print the binding
    Reconcile(ReconcileArgs),
    /// Normalize bound columns and write the cleaned table
    Clean(CleanArgs),
    /// Keep rows matching an equality or inclusive-range predicate on a canonical column
    Filter(FilterArgs),
    /// Group, reduce, and rank rows over canonical columns
    Aggregate(AggregateArgs),
    /// Summarize the cleaned table: row count, bound columns, ordinal span
    Overview(OverviewArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Canonical schema file (targets, kinds, threshold, binding mode)
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Emit the binding as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Canonical column to filter on
    #[arg(short = 'c', long = "column")]
    pub column: String,
    /// Keep rows whose column equals this value
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub equals: Option<String>,
    /// Inclusive lower bound for a date or year column
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    /// Inclusive upper bound for a date or year column
    #[arg(long, requires = "from")]
    pub to: Option<String>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Canonical columns to group by (comma separated)
    #[arg(short = 'g', long = "group-by", value_delimiter = ',')]
    pub group_by: Vec<String>,
    /// Derive a period (year-month) grouping key from this temporal column
    #[arg(long = "period-from")]
    pub period_from: Option<String>,
    /// Canonical measure column for mean/sum/count
    #[arg(short = 'm', long = "measure")]
    pub measure: Option<String>,
    /// Reduction to apply per group
    #[arg(short = 'r', long = "reducer", value_enum, default_value = "size")]
    pub reducer: ReducerArg,
    /// Keep only the first N ranked rows
    #[arg(long)]
    pub top: Option<usize>,
    /// Emit the result as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct OverviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReducerArg {
    Mean,
    Sum,
    Count,
    Size,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
