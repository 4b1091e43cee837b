//! Yahoo Finance HTTP adapter.
//!
//! Prices come from the v8 chart API, metadata from the v10 quoteSummary
//! API. Both are queried with a blocking reqwest client; response parsing
//! is kept in free functions so it can be tested without a network.

use crate::domain::error::TrendscanError;
use crate::domain::price_bar::PriceBar;
use crate::domain::symbol::Symbol;
use crate::domain::ticker_info::TickerInfo;
use crate::ports::data_port::{PriceSourcePort, TickerInfoPort};
use chrono::{DateTime, Duration, NaiveDate};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration as StdDuration;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "assetProfile,summaryDetail,price";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) trendscan/0.1";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    #[serde(default)]
    result: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    error: Option<ApiError>,
}

/// Decode a chart API response into bars, in exchange-local dates.
///
/// Bars without a close are dropped. Missing adjusted closes fall back to
/// the close, missing open/high/low to the close as well.
pub fn parse_chart(body: &str) -> Result<Vec<PriceBar>, String> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| format!("malformed chart response: {e}"))?;
    if let Some(err) = envelope.chart.error {
        return Err(format!("{}: {}", err.code, err.description));
    }
    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adj = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .unwrap_or_default()
        .adjclose;
    let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(close) = at(&quote.close, i) else {
            continue;
        };
        let Some(local) = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0) else {
            continue;
        };
        bars.push(PriceBar {
            date: local.date_naive(),
            open: at(&quote.open, i).unwrap_or(close),
            high: at(&quote.high, i).unwrap_or(close),
            low: at(&quote.low, i).unwrap_or(close),
            close,
            adjusted_close: at(&adj, i).unwrap_or(close),
            volume: at(&quote.volume, i).unwrap_or(0.0) as i64,
        });
    }
    Ok(bars)
}

/// Merge quoteSummary modules into one flat map.
///
/// `{raw, fmt}` wrappers resolve to `raw`; empty wrappers become null. The
/// first module to define a key wins.
pub fn parse_quote_summary(body: &str) -> Result<TickerInfo, String> {
    let envelope: SummaryEnvelope =
        serde_json::from_str(body).map_err(|e| format!("malformed quoteSummary response: {e}"))?;
    if let Some(err) = envelope.quote_summary.error {
        return Err(format!("{}: {}", err.code, err.description));
    }
    let Some(modules) = envelope
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
    else {
        return Err("empty quoteSummary result".to_string());
    };

    let mut fields = Map::new();
    for (_, module) in modules {
        let Value::Object(entries) = module else {
            continue;
        };
        for (key, value) in entries {
            fields.entry(key).or_insert_with(|| unwrap_raw(value));
        }
    }
    Ok(TickerInfo::new(fields))
}

fn unwrap_raw(value: Value) -> Value {
    match value {
        Value::Object(mut obj) => match obj.remove("raw") {
            Some(raw) => raw,
            None if obj.is_empty() => Value::Null,
            None => Value::Object(obj),
        },
        other => other,
    }
}

pub struct YahooAdapter {
    client: Client,
}

impl YahooAdapter {
    pub fn new(timeout_secs: u64) -> Result<Self, TrendscanError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrendscanError::Io(std::io::Error::other(e)))?;
        Ok(Self { client })
    }

    fn get(&self, symbol: &Symbol, url: &str, query: &[(&str, String)]) -> Result<String, TrendscanError> {
        let failed = |reason: String| TrendscanError::SourceFetchFailed {
            symbol: symbol.display(),
            reason,
        };
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        let body = response.text().map_err(|e| failed(e.to_string()))?;
        if !status.is_success() && status.as_u16() != 404 {
            return Err(failed(format!("HTTP {status}")));
        }
        Ok(body)
    }
}

fn epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}

impl PriceSourcePort for YahooAdapter {
    fn fetch(
        &self,
        symbol: &Symbol,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, TrendscanError> {
        let url = format!("{CHART_URL}/{}", symbol.display());
        let query = [
            ("period1", epoch(start_date).to_string()),
            ("period2", epoch(end_date + Duration::days(1)).to_string()),
            ("interval", "1d".to_string()),
            ("events", "div,splits".to_string()),
        ];
        let body = self.get(symbol, &url, &query)?;
        let bars = parse_chart(&body).map_err(|reason| TrendscanError::SourceFetchFailed {
            symbol: symbol.display(),
            reason,
        })?;
        debug!(symbol = %symbol, bars = bars.len(), %start_date, %end_date, "chart fetched");
        Ok(bars)
    }
}

impl TickerInfoPort for YahooAdapter {
    fn fetch_info(&self, symbol: &Symbol) -> Result<TickerInfo, TrendscanError> {
        let url = format!("{SUMMARY_URL}/{}", symbol.display());
        let body = self.get(symbol, &url, &[("modules", SUMMARY_MODULES.to_string())])?;
        parse_quote_summary(&body).map_err(|reason| TrendscanError::DataUnavailable {
            symbol: symbol.display(),
            reason,
        })
    }
}
