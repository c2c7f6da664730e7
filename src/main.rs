//! comparator: run comparison plans and ad-hoc queries against configured sources.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use comparator::config::{DbConfig, DbEntry};
use comparator::{output, ComparatorResult, ComparisonPlan};

#[derive(Parser)]
#[command(name = "comparator")]
#[command(about = "Compare query results across databases")]
#[command(version)]
struct Cli {
    /// Source config file (defaults to $COMPARATOR_CONFIG_FILE, then ~/.comparator/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every comparison in a plan file; exits 1 if any check fails
    Run {
        /// Plan file (YAML)
        #[arg(short, long)]
        plan: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Run one query against a configured source
    Query {
        /// Source name from the config file
        #[arg(short, long)]
        source: String,

        /// SQL query to execute
        #[arg(short = 'q', long)]
        sql: String,

        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// Also write the result to this Parquet file
        #[arg(long)]
        parquet: Option<PathBuf>,
    },
    /// List configured sources
    Sources,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_plan(dbs: &DbConfig, plan: PathBuf, format: Format) -> Result<bool> {
    let plan = ComparisonPlan::from_path(&plan)?;
    let mut set = plan.build(dbs)?;
    info!(comparisons = set.len(), "running plan");

    let outcomes: Vec<ComparatorResult> = set.run_comparisons()?.into_iter().flatten().collect();
    match format {
        Format::Json => println!("{}", output::outcomes_json(&outcomes)?),
        Format::Table => print!("{}", output::outcomes_table(&outcomes)),
        Format::Csv => print!("{}", output::outcomes_csv(&outcomes)),
    }
    eprintln!("\n{}", output::summary(&outcomes));

    Ok(outcomes.iter().all(ComparatorResult::is_truthy))
}

fn run_query(
    dbs: &DbConfig,
    source: &str,
    sql: &str,
    format: Format,
    parquet: Option<PathBuf>,
) -> Result<()> {
    let source = dbs.connect(source)?;
    let result = source.query(sql)?;

    match format {
        Format::Table => print!("{}", output::result_table(&result)),
        Format::Csv => print!("{}", output::result_csv(&result)),
        Format::Json => println!("{}", output::result_json(&result)?),
    }

    if let Some(path) = parquet {
        result
            .write_parquet(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote parquet");
    }

    eprintln!("\n{} rows returned", result.len());
    Ok(())
}

fn list_sources(dbs: &DbConfig) {
    let headers: Vec<String> = ["name", "kind", "path", "read_only"]
        .into_iter()
        .map(String::from)
        .collect();
    let rows: Vec<Vec<String>> = dbs
        .names()
        .filter_map(|name| dbs.get(name))
        .map(|entry: &DbEntry| {
            vec![
                entry.name.clone(),
                format!("{:?}", entry.kind).to_lowercase(),
                entry
                    .path
                    .as_ref()
                    .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string()),
                entry.read_only.to_string(),
            ]
        })
        .collect();
    print!("{}", output::render_table(&headers, &rows));
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let dbs = DbConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { plan, format } => {
            if !run_plan(&dbs, plan, format)? {
                process::exit(1);
            }
        }
        Commands::Query {
            source,
            sql,
            format,
            parquet,
        } => run_query(&dbs, &source, &sql, format, parquet)?,
        Commands::Sources => list_sources(&dbs),
    }

    Ok(())
}
