//! Marketflow CLI — daily market-data ingestion into the warehouse raw layer.
//!
//! Commands:
//! - `ingest` — extract prices, company info, and benchmark series from Yahoo
//!   Finance and append them to the raw layer, one tracked run per dataset
//! - `check` — local smoke test: profiles, warehouse connection, extractors,
//!   and a mini end-to-end pipeline, with a PASS/FAIL summary
//! - `query` — run a SQL statement against the warehouse and print the result

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use marketflow_core::{
    extract_benchmark_series, extract_company_info, extract_prices, read_profiles, run_all,
    DateWindow, Dataset, IngestOptions, Period, QueryTable, RawLoader, Tickers, YahooClient,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "marketflow", about = "Marketflow — market-data ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConnectionArgs {
    /// Path to the ticker config (TOML).
    #[arg(long, default_value = "config/tickers.toml")]
    tickers: PathBuf,

    /// Path to the profiles file (YAML).
    #[arg(long, default_value = "config/profiles.yml")]
    profiles: PathBuf,

    /// Profile name to resolve from the profiles file.
    #[arg(long, default_value = "marketflow")]
    profile: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract from Yahoo Finance and append to the warehouse raw layer.
    Ingest {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Datasets to run: prices, company-info, benchmarks. Defaults to all.
        #[arg(long)]
        dataset: Vec<Dataset>,

        /// Start date (YYYY-MM-DD). With --end, overrides --period.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). With --start, overrides --period.
        #[arg(long)]
        end: Option<String>,

        /// Relative period: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
        #[arg(long, default_value = "1y")]
        period: Period,
    },
    /// Smoke-test each pipeline component and report PASS/FAIL per stage.
    Check {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Run one SQL statement against the warehouse and print the table.
    Query {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// The SQL statement.
        sql: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            connection,
            dataset,
            start,
            end,
            period,
        } => cmd_ingest(connection, dataset, start, end, period),
        Commands::Check { connection } => cmd_check(connection),
        Commands::Query { connection, sql } => cmd_query(connection, &sql),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn cmd_ingest(
    connection: ConnectionArgs,
    datasets: Vec<Dataset>,
    start: Option<String>,
    end: Option<String>,
    period: Period,
) -> Result<()> {
    let tickers = Tickers::from_file(&connection.tickers)?;
    let params = read_profiles(&connection.profiles, &connection.profile)?;
    let mut loader = RawLoader::connect(&params)?;

    let start = start.as_deref().map(parse_date).transpose()?;
    let end = end.as_deref().map(parse_date).transpose()?;
    let opts = IngestOptions {
        window: DateWindow::from_options(start, end, period),
        ..IngestOptions::default()
    };

    let datasets = if datasets.is_empty() {
        Dataset::all().to_vec()
    } else {
        datasets
    };

    let provider = YahooClient::new();
    info!(
        stocks = tickers.stocks.len(),
        benchmarks = tickers.benchmarks.len(),
        datasets = datasets.len(),
        "starting ingestion"
    );

    let report = run_all(&provider, &mut loader, &datasets, &tickers, &opts);

    for run in &report.runs {
        println!(
            "{} {}: {} record(s) [{}]",
            if run.status == marketflow_core::RunStatus::Completed {
                "OK:  "
            } else {
                "FAIL:"
            },
            run.dataset_name,
            run.records_loaded,
            run.run_id,
        );
    }

    if !report.all_succeeded() {
        bail!(
            "ingestion failed for dataset(s): {}",
            report.failed_datasets().join(", ")
        );
    }
    Ok(())
}

/// One smoke-test stage: run it, report PASS/FAIL, never abort the driver.
fn stage(name: &str, results: &mut Vec<(String, bool)>, f: impl FnOnce() -> Result<()>) {
    println!("\n=== {name} ===");
    let outcome = f();
    match &outcome {
        Ok(()) => println!("PASS: {name}"),
        Err(e) => println!("FAIL: {name}: {e:#}"),
    }
    results.push((name.to_string(), outcome.is_ok()));
}

fn cmd_check(connection: ConnectionArgs) -> Result<()> {
    let mut results: Vec<(String, bool)> = Vec::new();

    stage("profiles", &mut results, || {
        let params = read_profiles(&connection.profiles, &connection.profile)?;
        println!(
            "  database: {}\n  schema: {}",
            params.database.display(),
            params.schema
        );
        Ok(())
    });

    stage("warehouse connection", &mut results, || {
        let params = read_profiles(&connection.profiles, &connection.profile)?;
        let loader = RawLoader::connect(&params)?;
        let table = loader.execute_query("SELECT sqlite_version() AS version")?;
        println!("  version: {}", cell(&table, 0, 0));
        Ok(())
    });

    stage("extractors", &mut results, || {
        let tickers = Tickers::from_file(&connection.tickers)?;
        let stocks: Vec<String> = tickers.stocks.iter().take(3).cloned().collect();
        let benchmarks: Vec<String> = tickers.benchmarks.iter().take(2).cloned().collect();
        let window = DateWindow::Period(Period::FiveDays);
        let provider = YahooClient::new();

        let prices = extract_prices(&provider, &stocks, &window)?;
        println!("  {} price record(s)", prices.len());

        let companies =
            extract_company_info(&provider, &stocks, Duration::from_millis(100));
        println!("  {} company record(s)", companies.len());

        let benches = extract_benchmark_series(&provider, &benchmarks, &window)?;
        println!("  {} benchmark record(s)", benches.len());
        Ok(())
    });

    stage("full pipeline", &mut results, || {
        let tickers = Tickers::from_file(&connection.tickers)?;
        let mini = Tickers {
            stocks: tickers.stocks.iter().take(2).cloned().collect(),
            benchmarks: tickers.benchmarks.iter().take(1).cloned().collect(),
        };
        let params = read_profiles(&connection.profiles, &connection.profile)?;
        let mut loader = RawLoader::connect(&params)?;
        let provider = YahooClient::new();
        let opts = IngestOptions {
            window: DateWindow::Period(Period::FiveDays),
            ..IngestOptions::default()
        };

        let report = run_all(&provider, &mut loader, &Dataset::all(), &mini, &opts);
        for run in &report.runs {
            println!(
                "  {}: {} ({} record(s))",
                run.dataset_name, run.status, run.records_loaded
            );
        }

        let count = loader.row_count("stock_prices_daily")?;
        println!("  total price records in warehouse: {count}");

        if !report.all_succeeded() {
            bail!(
                "dataset(s) failed: {}",
                report.failed_datasets().join(", ")
            );
        }
        Ok(())
    });

    println!("\n=== summary ===");
    for (name, passed) in &results {
        println!("{}: {name}", if *passed { "PASS" } else { "FAIL" });
    }

    if results.iter().any(|(_, passed)| !passed) {
        bail!("some checks failed");
    }
    println!("all checks passed");
    Ok(())
}

fn cmd_query(connection: ConnectionArgs, sql: &str) -> Result<()> {
    let params = read_profiles(&connection.profiles, &connection.profile)?;
    let loader = RawLoader::connect(&params)?;
    let table = loader.execute_query(sql)?;

    println!("{}", table.columns.join(" | "));
    for row in &table.rows {
        let rendered: Vec<&str> = row
            .iter()
            .map(|v| v.as_deref().unwrap_or("NULL"))
            .collect();
        println!("{}", rendered.join(" | "));
    }
    println!("({} row(s))", table.rows.len());
    Ok(())
}

fn cell(table: &QueryTable, row: usize, col: usize) -> &str {
    table
        .rows
        .get(row)
        .and_then(|r| r.get(col))
        .and_then(|v| v.as_deref())
        .unwrap_or("NULL")
}
