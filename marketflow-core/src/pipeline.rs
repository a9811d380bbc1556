//! Pipeline orchestration — one run record per dataset attempt.
//!
//! Per dataset the state machine is:
//! started-record → extract → load → completed-record (records_loaded from the
//! load result) or failed-record (error text captured). No retries. Datasets
//! are independent: one failure never stops the others. The terminal record
//! is persisted to the state store; the started record's id doubles as the
//! load's run label.

use crate::config::Tickers;
use crate::extract::{
    self, DateWindow, ExtractError, Period, COMPANY_INFO_PAUSE,
};
use crate::load::{self, RawLoader, RawTable};
use crate::provider::MarketDataProvider;
use crate::run::{RunRecord, RunStatus};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

/// The three datasets one pipeline invocation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    StockPrices,
    CompanyInfo,
    BenchmarkSeries,
}

impl Dataset {
    /// Dataset name; also the raw-layer destination.
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::StockPrices => load::STOCK_PRICES_DAILY,
            Dataset::CompanyInfo => load::COMPANY_INFO,
            Dataset::BenchmarkSeries => load::BENCHMARK_SERIES_DAILY,
        }
    }

    /// All datasets, in ingestion order.
    pub fn all() -> [Dataset; 3] {
        [
            Dataset::StockPrices,
            Dataset::CompanyInfo,
            Dataset::BenchmarkSeries,
        ]
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prices" => Ok(Dataset::StockPrices),
            "company-info" => Ok(Dataset::CompanyInfo),
            "benchmarks" => Ok(Dataset::BenchmarkSeries),
            other => Err(format!(
                "unknown dataset '{other}' (expected prices, company-info, benchmarks)"
            )),
        }
    }
}

/// Options shared by all dataset runs in one invocation.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Date window for price and benchmark extraction.
    pub window: DateWindow,
    /// Politeness pause between company-info requests.
    pub company_pause: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            window: DateWindow::Period(Period::OneYear),
            company_pause: COMPANY_INFO_PAUSE,
        }
    }
}

/// Outcome of one pipeline invocation: the terminal run record per dataset.
#[derive(Debug)]
pub struct PipelineReport {
    pub runs: Vec<RunRecord>,
}

impl PipelineReport {
    pub fn all_succeeded(&self) -> bool {
        self.runs
            .iter()
            .all(|r| r.status == RunStatus::Completed)
    }

    /// Names of datasets whose run failed.
    pub fn failed_datasets(&self) -> Vec<&str> {
        self.runs
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
            .map(|r| r.dataset_name.as_str())
            .collect()
    }
}

/// Run one dataset through extract → load and return its terminal record.
///
/// The terminal record is persisted to the state store before returning; a
/// state-store write failure downgrades the outcome to failed.
pub fn run_dataset(
    provider: &dyn MarketDataProvider,
    loader: &mut RawLoader,
    dataset: Dataset,
    tickers: &Tickers,
    opts: &IngestOptions,
) -> RunRecord {
    let started = RunRecord::started(dataset.name());
    info!(dataset = %dataset, run_id = started.run_id.as_str(), "run started");

    let terminal = match dataset {
        Dataset::StockPrices => finish(
            loader,
            dataset,
            &started.run_id,
            extract::extract_prices(provider, &tickers.stocks, &opts.window),
        ),
        Dataset::CompanyInfo => finish(
            loader,
            dataset,
            &started.run_id,
            Ok(extract::extract_company_info(
                provider,
                &tickers.stocks,
                opts.company_pause,
            )),
        ),
        Dataset::BenchmarkSeries => finish(
            loader,
            dataset,
            &started.run_id,
            extract::extract_benchmark_series(provider, &tickers.benchmarks, &opts.window),
        ),
    };

    match terminal.status {
        RunStatus::Completed => info!(
            dataset = %dataset,
            run_id = terminal.run_id.as_str(),
            records_loaded = terminal.records_loaded,
            "run completed"
        ),
        _ => error!(
            dataset = %dataset,
            run_id = terminal.run_id.as_str(),
            error = terminal.error_message.as_deref().unwrap_or(""),
            "run failed"
        ),
    }

    if let Err(e) = loader.record_run(&terminal) {
        error!(dataset = %dataset, error = %e, "failed to persist run record");
        return RunRecord::failed(
            dataset.name(),
            format!("state store write failed: {e}"),
        );
    }

    terminal
}

/// Fold an extraction outcome and the subsequent load into a terminal record.
fn finish<T: RawTable>(
    loader: &mut RawLoader,
    dataset: Dataset,
    run_label: &str,
    extracted: Result<Vec<T>, ExtractError>,
) -> RunRecord {
    match extracted {
        Ok(rows) => match loader.load_to_raw(&rows, dataset.name(), run_label) {
            Ok(result) => RunRecord::completed(dataset.name(), result.records_loaded),
            Err(e) => RunRecord::failed(dataset.name(), e),
        },
        Err(e) => RunRecord::failed(dataset.name(), e),
    }
}

/// Run the given datasets independently and collect their terminal records.
pub fn run_all(
    provider: &dyn MarketDataProvider,
    loader: &mut RawLoader,
    datasets: &[Dataset],
    tickers: &Tickers,
    opts: &IngestOptions,
) -> PipelineReport {
    let runs = datasets
        .iter()
        .map(|&dataset| run_dataset(provider, loader, dataset, tickers, opts))
        .collect();
    PipelineReport { runs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::{day, full_bar, MockProvider};
    use crate::provider::CompanyProfile;

    fn tickers(stocks: &[&str], benchmarks: &[&str]) -> Tickers {
        Tickers {
            stocks: stocks.iter().map(|s| s.to_string()).collect(),
            benchmarks: benchmarks.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn opts() -> IngestOptions {
        IngestOptions {
            window: DateWindow::Period(Period::FiveDays),
            company_pause: Duration::ZERO,
        }
    }

    fn provider_with_everything() -> MockProvider {
        MockProvider::default()
            .with_bars("AAA", vec![full_bar(day(1), 10.0, 100), full_bar(day(2), 10.5, 120)])
            .with_bars("SPY", vec![full_bar(day(1), 450.0, 9000)])
            .with_profile("AAA", CompanyProfile::default())
    }

    #[test]
    fn successful_invocation_completes_every_dataset() {
        let provider = provider_with_everything();
        let mut loader = RawLoader::open_in_memory("raw").unwrap();

        let report = run_all(
            &provider,
            &mut loader,
            &Dataset::all(),
            &tickers(&["AAA"], &["SPY"]),
            &opts(),
        );

        assert!(report.all_succeeded());
        assert_eq!(report.runs.len(), 3);
        assert_eq!(report.runs[0].records_loaded, 2);
        assert_eq!(report.runs[1].records_loaded, 1);
        assert_eq!(report.runs[2].records_loaded, 1);

        // One terminal record per attempt in the state store, none "started".
        let table = loader
            .execute_query("SELECT status FROM raw_ingestion_runs")
            .unwrap();
        assert_eq!(table.rows.len(), 3);
        for row in &table.rows {
            assert_eq!(row[0].as_deref(), Some("completed"));
        }
    }

    #[test]
    fn extract_failure_produces_a_failed_record() {
        // Provider knows nothing: price extraction fails at batch level.
        let provider = MockProvider::default();
        let mut loader = RawLoader::open_in_memory("raw").unwrap();

        let record = run_dataset(
            &provider,
            &mut loader,
            Dataset::StockPrices,
            &tickers(&["AAA"], &["SPY"]),
            &opts(),
        );

        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.records_loaded, 0);
        assert!(record
            .error_message
            .as_deref()
            .unwrap()
            .contains("no data extracted"));

        let table = loader
            .execute_query("SELECT status, error_message FROM raw_ingestion_runs")
            .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0].as_deref(), Some("failed"));
    }

    #[test]
    fn one_dataset_failure_does_not_stop_the_others() {
        // Benchmarks missing; stocks and company info present.
        let provider = MockProvider::default()
            .with_bars("AAA", vec![full_bar(day(1), 10.0, 100)])
            .with_profile("AAA", CompanyProfile::default());
        let mut loader = RawLoader::open_in_memory("raw").unwrap();

        let report = run_all(
            &provider,
            &mut loader,
            &Dataset::all(),
            &tickers(&["AAA"], &["SPY"]),
            &opts(),
        );

        assert!(!report.all_succeeded());
        assert_eq!(report.failed_datasets(), vec!["benchmark_series_daily"]);
        assert_eq!(report.runs[0].status, RunStatus::Completed);
        assert_eq!(report.runs[1].status, RunStatus::Completed);
        assert_eq!(report.runs[2].status, RunStatus::Failed);
    }

    #[test]
    fn company_info_run_completes_with_degraded_rows() {
        // No profile for BBB: it still lands as a degraded row, run completes.
        let provider = MockProvider::default().with_profile("AAA", CompanyProfile::default());
        let mut loader = RawLoader::open_in_memory("raw").unwrap();

        let record = run_dataset(
            &provider,
            &mut loader,
            Dataset::CompanyInfo,
            &tickers(&["AAA", "BBB"], &["SPY"]),
            &opts(),
        );

        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.records_loaded, 2);

        let table = loader
            .execute_query("SELECT symbol, error FROM raw_company_info ORDER BY symbol")
            .unwrap();
        assert_eq!(table.rows[0][1], None);
        assert!(table.rows[1][1].as_deref().unwrap().contains("BBB"));
    }

    #[test]
    fn dataset_names_parse_from_cli_strings() {
        assert_eq!("prices".parse::<Dataset>().unwrap(), Dataset::StockPrices);
        assert_eq!(
            "company-info".parse::<Dataset>().unwrap(),
            Dataset::CompanyInfo
        );
        assert_eq!(
            "benchmarks".parse::<Dataset>().unwrap(),
            Dataset::BenchmarkSeries
        );
        assert!("everything".parse::<Dataset>().is_err());
    }
}
