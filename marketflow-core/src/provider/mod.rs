//! Market-data provider trait and structured error types.
//!
//! The [`MarketDataProvider`] trait abstracts over the upstream data source
//! (Yahoo Finance in production) so implementations can be swapped and mocked
//! for tests. Raw types keep missing values as `Option` — the extractors own
//! the critical-column filtering, not the provider.

pub mod yahoo;

pub use yahoo::YahooClient;

use chrono::NaiveDate;
use thiserror::Error;

/// A raw daily OHLCV bar as returned by the provider, before filtering.
///
/// Any field except `date` may be missing; the price extractors drop bars
/// without a close or volume before handoff to the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<u64>,
}

/// Raw company profile and fundamentals for one symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyProfile {
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<u64>,
    pub enterprise_value: Option<i64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_day_average: Option<f64>,
    pub two_hundred_day_average: Option<f64>,
    pub shares_outstanding: Option<u64>,
    pub float_shares: Option<u64>,
    pub employees: Option<u64>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub website: Option<String>,
    pub business_summary: Option<String>,
}

/// Structured error types for provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider error: {0}")]
    Other(String),
}

/// Trait for market-data providers.
///
/// Implementations handle the specifics of one upstream source. The extractors
/// sit above this trait and own per-symbol failure policy and throttling.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for one symbol over an inclusive date range.
    fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, ProviderError>;

    /// Fetch the company profile and fundamentals for one symbol.
    fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError>;
}
