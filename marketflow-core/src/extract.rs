//! Extractors — turn ticker symbols plus a date window into typed raw tables.
//!
//! Three dataset kinds share one contract shape:
//! - daily stock prices and benchmark series produce [`BarRow`]s
//! - company info produces [`CompanyRow`]s
//!
//! Per-symbol failure policy: a symbol that fails upstream is logged as a
//! warning and either omitted (prices, benchmarks) or emitted as a degraded
//! row carrying only `symbol`, `ingested_at`, and `error` (company info). A
//! batch never aborts because one symbol failed; price extraction errors only
//! when no symbol yields data at all.

use crate::provider::MarketDataProvider;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Fixed pause between sequential company-info requests. Politeness toward
/// the upstream provider, not a backoff algorithm.
pub const COMPANY_INFO_PAUSE: Duration = Duration::from_millis(100);

/// Relative period keywords accepted in place of an explicit date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// Resolve to an inclusive calendar date range ending at `today`.
    ///
    /// Trading-period keywords map to slightly wider calendar spans (5d covers
    /// a full week) so the provider returns the full set of trading days.
    fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days_back = match self {
            Period::OneDay => 1,
            Period::FiveDays => 7,
            Period::OneMonth => 30,
            Period::ThreeMonths => 91,
            Period::SixMonths => 182,
            Period::OneYear => 365,
            Period::TwoYears => 730,
            Period::FiveYears => 1826,
            Period::TenYears => 3652,
            Period::YearToDate => {
                let jan1 = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap();
                return (jan1, today);
            }
            Period::Max => {
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
                return (epoch, today);
            }
        };
        (today - chrono::Duration::days(days_back), today)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Period::OneDay),
            "5d" => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            "10y" => Ok(Period::TenYears),
            "ytd" => Ok(Period::YearToDate),
            "max" => Ok(Period::Max),
            other => Err(format!(
                "unknown period '{other}' (expected 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max)"
            )),
        }
    }
}

/// Date window for an extraction: an explicit inclusive range or a relative
/// period keyword. Mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Range { start: NaiveDate, end: NaiveDate },
    Period(Period),
}

impl DateWindow {
    /// Combine optional CLI-style inputs. An explicit range takes precedence
    /// over the period when both endpoints are given.
    pub fn from_options(start: Option<NaiveDate>, end: Option<NaiveDate>, period: Period) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => DateWindow::Range { start, end },
            _ => DateWindow::Period(period),
        }
    }

    /// Resolve to a concrete inclusive `(start, end)` pair.
    pub fn resolve(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            DateWindow::Range { start, end } => (*start, *end),
            DateWindow::Period(period) => period.resolve(today),
        }
    }
}

/// One daily OHLCV row, post-filter.
///
/// `close` and `volume` are the critical columns: provider bars missing
/// either are dropped before the row is built. The other prices stay
/// nullable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub adj_close: Option<f64>,
    pub volume: u64,
    pub ingested_at: NaiveDateTime,
}

/// One company-info row. A degraded row (symbol failure) has `error`
/// populated and everything between `symbol` and `ingested_at` absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRow {
    pub symbol: String,
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
    pub error: Option<String>,
    pub ingested_at: NaiveDateTime,
}

/// Batch-level extraction failure.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no data extracted for any of {attempted} symbol(s)")]
    NoData { attempted: usize },
}

/// Extract daily OHLCV rows for a set of stock symbols.
///
/// Rows with a missing close or volume never reach the output. Returns an
/// empty table for an empty symbol list; errors only when every symbol in a
/// non-empty list fails or yields nothing.
pub fn extract_prices(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    window: &DateWindow,
) -> Result<Vec<BarRow>, ExtractError> {
    extract_bars(provider, symbols, window, "stock prices")
}

/// Extract daily benchmark series rows. Same shape and policy as
/// [`extract_prices`]; only the destination differs downstream.
pub fn extract_benchmark_series(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    window: &DateWindow,
) -> Result<Vec<BarRow>, ExtractError> {
    extract_bars(provider, symbols, window, "benchmark series")
}

fn extract_bars(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    window: &DateWindow,
    dataset: &str,
) -> Result<Vec<BarRow>, ExtractError> {
    if symbols.is_empty() {
        return Ok(Vec::new());
    }

    let today = Local::now().date_naive();
    let (start, end) = window.resolve(today);
    info!(
        dataset,
        symbols = symbols.len(),
        %start,
        %end,
        "extracting daily bars"
    );

    let mut rows = Vec::new();
    let mut any_data = false;

    for symbol in symbols {
        match provider.daily_bars(symbol, start, end) {
            Ok(bars) => {
                any_data = true;
                let ingested_at = Local::now().naive_local();
                for bar in bars {
                    // Critical-column filter: close and volume must be present.
                    let (Some(close), Some(volume)) = (bar.close, bar.volume) else {
                        continue;
                    };
                    rows.push(BarRow {
                        symbol: symbol.clone(),
                        date: bar.date,
                        open: bar.open,
                        high: bar.high,
                        low: bar.low,
                        close,
                        adj_close: bar.adj_close,
                        volume,
                        ingested_at,
                    });
                }
            }
            Err(e) => {
                warn!(dataset, symbol = symbol.as_str(), error = %e, "no data for symbol");
            }
        }
    }

    if !any_data {
        return Err(ExtractError::NoData {
            attempted: symbols.len(),
        });
    }

    info!(dataset, rows = rows.len(), "extraction finished");
    Ok(rows)
}

/// Extract company info and fundamentals, one row per symbol.
///
/// A symbol that fails upstream still yields a degraded row so the ticker is
/// not lost; the batch itself never fails. `pause` is the fixed politeness
/// delay between sequential requests (pass `Duration::ZERO` in tests).
pub fn extract_company_info(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    pause: Duration,
) -> Vec<CompanyRow> {
    info!(symbols = symbols.len(), "extracting company info");

    let mut rows = Vec::with_capacity(symbols.len());

    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            std::thread::sleep(pause);
        }

        let ingested_at = Local::now().naive_local();
        match provider.company_profile(symbol) {
            Ok(profile) => rows.push(CompanyRow {
                symbol: symbol.clone(),
                company_name: profile.company_name,
                sector: profile.sector,
                industry: profile.industry,
                market_cap: profile.market_cap,
                enterprise_value: profile.enterprise_value,
                pe_ratio: profile.pe_ratio,
                forward_pe: profile.forward_pe,
                peg_ratio: profile.peg_ratio,
                price_to_book: profile.price_to_book,
                dividend_yield: profile.dividend_yield,
                beta: profile.beta,
                fifty_two_week_high: profile.fifty_two_week_high,
                fifty_two_week_low: profile.fifty_two_week_low,
                fifty_day_average: profile.fifty_day_average,
                two_hundred_day_average: profile.two_hundred_day_average,
                shares_outstanding: profile.shares_outstanding,
                float_shares: profile.float_shares,
                employees: profile.employees,
                country: profile.country,
                city: profile.city,
                website: profile.website,
                business_summary: profile.business_summary,
                error: None,
                ingested_at,
            }),
            Err(e) => {
                warn!(symbol = symbol.as_str(), error = %e, "company info fetch failed");
                rows.push(CompanyRow {
                    symbol: symbol.clone(),
                    error: Some(e.to_string()),
                    ingested_at,
                    ..CompanyRow::default()
                });
            }
        }
    }

    info!(rows = rows.len(), "company info extraction finished");
    rows
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Mock provider shared by extractor and pipeline tests.

    use crate::provider::{CompanyProfile, DailyBar, MarketDataProvider, ProviderError};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    /// Scripted provider: per-symbol canned bars/profiles, unknown symbols fail.
    #[derive(Default)]
    pub struct MockProvider {
        pub bars: HashMap<String, Vec<DailyBar>>,
        pub profiles: HashMap<String, CompanyProfile>,
    }

    impl MockProvider {
        pub fn with_bars(mut self, symbol: &str, bars: Vec<DailyBar>) -> Self {
            self.bars.insert(symbol.to_string(), bars);
            self
        }

        pub fn with_profile(mut self, symbol: &str, profile: CompanyProfile) -> Self {
            self.profiles.insert(symbol.to_string(), profile);
            self
        }
    }

    impl MarketDataProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn daily_bars(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<DailyBar>, ProviderError> {
            self.bars
                .get(symbol)
                .cloned()
                .ok_or_else(|| ProviderError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
        }

        fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError> {
            self.profiles
                .get(symbol)
                .cloned()
                .ok_or_else(|| ProviderError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
        }
    }

    /// A fully-populated bar for `date`.
    pub fn full_bar(date: NaiveDate, close: f64, volume: u64) -> DailyBar {
        DailyBar {
            date,
            open: Some(close - 1.0),
            high: Some(close + 1.0),
            low: Some(close - 2.0),
            close: Some(close),
            adj_close: Some(close),
            volume: Some(volume),
        }
    }

    pub fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{day, full_bar, MockProvider};
    use super::*;
    use crate::provider::DailyBar;

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn explicit_range_takes_precedence_over_period() {
        let start = day(1);
        let end = day(10);
        let window = DateWindow::from_options(Some(start), Some(end), Period::OneYear);
        assert_eq!(window.resolve(day(20)), (start, end));
    }

    #[test]
    fn period_used_when_range_is_incomplete() {
        let window = DateWindow::from_options(Some(day(1)), None, Period::FiveDays);
        let (start, end) = window.resolve(day(20));
        assert_eq!(end, day(20));
        assert_eq!(start, day(13));
    }

    #[test]
    fn ytd_resolves_to_january_first() {
        let (start, end) = DateWindow::Period(Period::YearToDate).resolve(day(20));
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(end, day(20));
    }

    #[test]
    fn period_keywords_round_trip() {
        for s in ["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"] {
            assert_eq!(s.parse::<Period>().unwrap().as_str(), s);
        }
        assert!("2w".parse::<Period>().is_err());
    }

    #[test]
    fn empty_symbol_list_yields_empty_table() {
        let provider = MockProvider::default();
        let rows = extract_prices(&provider, &[], &DateWindow::Period(Period::FiveDays)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn failing_symbol_is_omitted_and_batch_continues() {
        let provider =
            MockProvider::default().with_bars("AAA", vec![full_bar(day(1), 10.0, 500)]);
        let rows = extract_prices(
            &provider,
            &symbols(&["AAA", "BBB"]),
            &DateWindow::Period(Period::FiveDays),
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAA");
        assert_eq!(rows[0].close, 10.0);
    }

    #[test]
    fn all_symbols_failing_is_a_batch_error() {
        let provider = MockProvider::default();
        let err = extract_prices(
            &provider,
            &symbols(&["AAA", "BBB"]),
            &DateWindow::Period(Period::FiveDays),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::NoData { attempted: 2 }));
    }

    #[test]
    fn bars_missing_close_or_volume_are_dropped() {
        let bars = vec![
            full_bar(day(1), 10.0, 500),
            DailyBar {
                close: None,
                ..full_bar(day(2), 11.0, 500)
            },
            DailyBar {
                volume: None,
                ..full_bar(day(3), 12.0, 500)
            },
            full_bar(day(4), 13.0, 700),
        ];
        let provider = MockProvider::default().with_bars("AAA", bars);
        let rows = extract_prices(
            &provider,
            &symbols(&["AAA"]),
            &DateWindow::Period(Period::FiveDays),
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(1));
        assert_eq!(rows[1].date, day(4));
    }

    #[test]
    fn company_info_emits_degraded_row_for_failing_symbol() {
        let provider = MockProvider::default().with_profile(
            "AAA",
            crate::provider::CompanyProfile {
                company_name: Some("Alpha Corp".into()),
                sector: Some("Technology".into()),
                peg_ratio: Some(2.1),
                city: Some("Austin".into()),
                ..Default::default()
            },
        );

        let rows = extract_company_info(&provider, &symbols(&["AAA", "BBB"]), Duration::ZERO);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "AAA");
        assert_eq!(rows[0].company_name.as_deref(), Some("Alpha Corp"));
        assert_eq!(rows[0].peg_ratio, Some(2.1));
        assert_eq!(rows[0].city.as_deref(), Some("Austin"));
        assert!(rows[0].error.is_none());

        assert_eq!(rows[1].symbol, "BBB");
        assert!(rows[1].company_name.is_none());
        assert!(rows[1]
            .error
            .as_deref()
            .unwrap()
            .contains("symbol not found"));
    }

    #[test]
    fn company_info_with_empty_list_yields_empty_table() {
        let provider = MockProvider::default();
        assert!(extract_company_info(&provider, &[], Duration::ZERO).is_empty());
    }
}
