//! Marketflow Core — daily market-data ingestion into a warehouse raw layer.
//!
//! This crate contains the ingestion pipeline:
//! - Run tracking (unique run ids, immutable run records)
//! - Ticker config and warehouse connection profiles
//! - A market-data provider trait with a Yahoo Finance client
//! - Extractors for daily prices, company info, and benchmark series
//! - An append-only raw-layer loader with run-record persistence
//! - A per-dataset orchestrator that folds load results back into run records

pub mod config;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod profile;
pub mod provider;
pub mod run;

pub use config::Tickers;
pub use extract::{
    extract_benchmark_series, extract_company_info, extract_prices, BarRow, CompanyRow,
    DateWindow, Period,
};
pub use load::{LoadResult, QueryTable, RawLoader};
pub use pipeline::{run_all, run_dataset, Dataset, IngestOptions, PipelineReport};
pub use profile::{read_profiles, WarehouseParams};
pub use provider::{MarketDataProvider, ProviderError, YahooClient};
pub use run::{generate_run_id, RunRecord, RunStatus};
