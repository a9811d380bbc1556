//! Yahoo Finance client.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API and company
//! profiles/fundamentals from the v10 quoteSummary API, over a blocking
//! reqwest client with a bounded request timeout.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; parse failures surface as [`ProviderError::ResponseFormat`].

use super::{CompanyProfile, DailyBar, MarketDataProvider, ProviderError};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance v10 quoteSummary API response.
#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryModules {
    #[serde(default)]
    asset_profile: Option<AssetProfile>,
    #[serde(default)]
    summary_detail: Option<SummaryDetail>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatistics>,
    #[serde(default)]
    price: Option<PriceModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    country: Option<String>,
    city: Option<String>,
    website: Option<String>,
    full_time_employees: Option<u64>,
    long_business_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    // Yahoo spells these with a capitalized PE, which camelCase would miss.
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<WrappedValue>,
    dividend_yield: Option<WrappedValue>,
    beta: Option<WrappedValue>,
    fifty_two_week_high: Option<WrappedValue>,
    fifty_two_week_low: Option<WrappedValue>,
    fifty_day_average: Option<WrappedValue>,
    two_hundred_day_average: Option<WrappedValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    #[serde(rename = "forwardPE")]
    forward_pe: Option<WrappedValue>,
    peg_ratio: Option<WrappedValue>,
    price_to_book: Option<WrappedValue>,
    enterprise_value: Option<WrappedValue>,
    shares_outstanding: Option<WrappedValue>,
    float_shares: Option<WrappedValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    market_cap: Option<WrappedValue>,
}

/// Yahoo wraps numeric fields as `{"raw": 1.23, "fmt": "1.23"}`.
#[derive(Debug, Default, Deserialize)]
struct WrappedValue {
    raw: Option<f64>,
}

impl WrappedValue {
    fn as_f64(opt: &Option<Self>) -> Option<f64> {
        opt.as_ref().and_then(|v| v.raw)
    }

    fn as_u64(opt: &Option<Self>) -> Option<u64> {
        opt.as_ref().and_then(|v| v.raw).map(|v| v as u64)
    }

    // Enterprise value can go negative when cash exceeds market cap plus debt.
    fn as_i64(opt: &Option<Self>) -> Option<i64> {
        opt.as_ref().and_then(|v| v.raw).map(|v| v as i64)
    }
}

/// Blocking Yahoo Finance client.
pub struct YahooClient {
    client: reqwest::blocking::Client,
}

impl YahooClient {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Build the chart API URL for a symbol and inclusive date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let end_ts = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    /// Build the quoteSummary API URL for a symbol.
    fn summary_url(symbol: &str) -> String {
        format!(
            "https://query2.finance.yahoo.com/v10/finance/quoteSummary/{symbol}\
             ?modules=assetProfile,summaryDetail,defaultKeyStatistics,price"
        )
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        symbol: &str,
        url: &str,
    ) -> Result<T, ProviderError> {
        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ProviderError::NetworkUnreachable(e.to_string())
            } else {
                ProviderError::Other(e.to_string())
            }
        })?;

        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(ProviderError::Other(format!("HTTP {status} for {symbol}")));
        }

        resp.json().map_err(|e| {
            ProviderError::ResponseFormat(format!("failed to parse response for {symbol}: {e}"))
        })
    }

    /// Parse the chart API response into raw daily bars.
    ///
    /// Missing OHLCV values are kept as `None`; bars where every field is
    /// missing (holidays, non-trading days) are skipped entirely.
    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<DailyBar>, ProviderError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    ProviderError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    ProviderError::ResponseFormat(format!("{}: {}", err.code, err.description))
                }
            } else {
                ProviderError::ResponseFormat("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormat("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| ProviderError::ResponseFormat("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormat("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    ProviderError::ResponseFormat(format!("invalid timestamp: {ts}"))
                })?;

            let bar = DailyBar {
                date,
                open: quote.open.get(i).copied().flatten(),
                high: quote.high.get(i).copied().flatten(),
                low: quote.low.get(i).copied().flatten(),
                close: quote.close.get(i).copied().flatten(),
                adj_close: adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten()),
                volume: quote.volume.get(i).copied().flatten(),
            };

            if bar.open.is_none()
                && bar.high.is_none()
                && bar.low.is_none()
                && bar.close.is_none()
                && bar.volume.is_none()
            {
                continue;
            }

            bars.push(bar);
        }

        if bars.is_empty() {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(bars)
    }

    /// Parse the quoteSummary response into a company profile.
    fn parse_summary(symbol: &str, resp: SummaryResponse) -> Result<CompanyProfile, ProviderError> {
        let result = resp.quote_summary.result.ok_or_else(|| {
            if let Some(err) = resp.quote_summary.error {
                if err.code == "Not Found" {
                    ProviderError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    ProviderError::ResponseFormat(format!("{}: {}", err.code, err.description))
                }
            } else {
                ProviderError::ResponseFormat("empty result with no error".into())
            }
        })?;

        let modules = result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormat("result array is empty".into()))?;

        let asset = modules.asset_profile.unwrap_or_default();
        let detail = modules.summary_detail.unwrap_or_default();
        let stats = modules.default_key_statistics.unwrap_or_default();
        let price = modules.price.unwrap_or_default();

        Ok(CompanyProfile {
            // Fall back to the ticker symbol so a bare listing still names itself.
            company_name: price
                .long_name
                .or(price.short_name)
                .or_else(|| Some(symbol.to_string())),
            sector: asset.sector,
            industry: asset.industry,
            market_cap: WrappedValue::as_u64(&price.market_cap),
            enterprise_value: WrappedValue::as_i64(&stats.enterprise_value),
            pe_ratio: WrappedValue::as_f64(&detail.trailing_pe),
            forward_pe: WrappedValue::as_f64(&stats.forward_pe),
            peg_ratio: WrappedValue::as_f64(&stats.peg_ratio),
            price_to_book: WrappedValue::as_f64(&stats.price_to_book),
            dividend_yield: WrappedValue::as_f64(&detail.dividend_yield),
            beta: WrappedValue::as_f64(&detail.beta),
            fifty_two_week_high: WrappedValue::as_f64(&detail.fifty_two_week_high),
            fifty_two_week_low: WrappedValue::as_f64(&detail.fifty_two_week_low),
            fifty_day_average: WrappedValue::as_f64(&detail.fifty_day_average),
            two_hundred_day_average: WrappedValue::as_f64(&detail.two_hundred_day_average),
            shares_outstanding: WrappedValue::as_u64(&stats.shares_outstanding),
            float_shares: WrappedValue::as_u64(&stats.float_shares),
            employees: asset.full_time_employees,
            country: asset.country,
            city: asset.city,
            website: asset.website,
            business_summary: asset.long_business_summary,
        })
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataProvider for YahooClient {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, ProviderError> {
        let url = Self::chart_url(symbol, start, end);
        let chart: ChartResponse = self.get_json(symbol, &url)?;
        Self::parse_chart(symbol, chart)
    }

    fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError> {
        let url = Self::summary_url(symbol);
        let summary: SummaryResponse = self.get_json(symbol, &url)?;
        Self::parse_summary(symbol, summary)
    }
}
