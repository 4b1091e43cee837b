#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use trendscan::domain::error::TrendscanError;
pub use trendscan::domain::price_bar::PriceBar;
use trendscan::domain::price_series::PriceSeries;
use trendscan::domain::symbol::Symbol;
use trendscan::domain::ticker_info::TickerInfo;
use trendscan::ports::archive_port::ArchivePort;
use trendscan::ports::data_port::{PriceSourcePort, TickerInfoPort};

#[derive(Default)]
pub struct MemoryArchive {
    pub series: Mutex<HashMap<Symbol, PriceSeries>>,
    pub writes: Mutex<usize>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(self, symbol: &Symbol, bars: Vec<PriceBar>) -> Self {
        self.series
            .lock()
            .unwrap()
            .insert(symbol.clone(), PriceSeries::new(bars).unwrap());
        self
    }

    pub fn get(&self, symbol: &Symbol) -> Option<PriceSeries> {
        self.series.lock().unwrap().get(symbol).cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl ArchivePort for MemoryArchive {
    fn load(&self, symbol: &Symbol) -> Result<Option<PriceSeries>, TrendscanError> {
        Ok(self.get(symbol))
    }

    fn store(&self, symbol: &Symbol, series: &PriceSeries) -> Result<(), TrendscanError> {
        *self.writes.lock().unwrap() += 1;
        self.series
            .lock()
            .unwrap()
            .insert(symbol.clone(), series.clone());
        Ok(())
    }
}

/// Price source serving fixed bars per ticker, filtered to the requested
/// range, and recording every request.
pub struct ScriptedSource {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
    pub failures: Mutex<HashMap<String, usize>>,
    pub calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_lowercase(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_lowercase(), reason.to_string());
        self
    }

    /// Fail the first `count` requests for `ticker`, then serve normally.
    pub fn failing_first(self, ticker: &str, count: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(ticker.to_lowercase(), count);
        self
    }

    pub fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }
}

impl PriceSourcePort for ScriptedSource {
    fn fetch(
        &self,
        symbol: &Symbol,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, TrendscanError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.ticker().to_string(), start_date, end_date));
        if let Some(reason) = self.errors.get(symbol.ticker()) {
            return Err(TrendscanError::SourceFetchFailed {
                symbol: symbol.display(),
                reason: reason.clone(),
            });
        }
        if let Some(left) = self.failures.lock().unwrap().get_mut(symbol.ticker()) {
            if *left > 0 {
                *left -= 1;
                return Err(TrendscanError::SourceFetchFailed {
                    symbol: symbol.display(),
                    reason: "connection reset".into(),
                });
            }
        }
        Ok(self
            .data
            .get(symbol.ticker())
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct StaticInfo {
    pub data: HashMap<String, TickerInfo>,
}

impl StaticInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info(mut self, ticker: &str, value: Value) -> Self {
        let fields: Map<String, Value> = match value {
            Value::Object(m) => m,
            _ => panic!("ticker info must be a JSON object"),
        };
        self.data
            .insert(ticker.to_lowercase(), TickerInfo::new(fields));
        self
    }
}

impl TickerInfoPort for StaticInfo {
    fn fetch_info(&self, symbol: &Symbol) -> Result<TickerInfo, TrendscanError> {
        self.data
            .get(symbol.ticker())
            .cloned()
            .ok_or_else(|| TrendscanError::DataUnavailable {
                symbol: symbol.display(),
                reason: "no info".into(),
            })
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// One flat bar per calendar day from `start`, priced by `price(i)`.
pub fn daily_bars(start: &str, count: usize, price: impl Fn(usize) -> f64) -> Vec<PriceBar> {
    let start = date(start);
    (0..count)
        .map(|i| PriceBar::flat(start + Duration::days(i as i64), price(i), 1_000))
        .collect()
}

/// Daily bars covering `[start, end]` inclusive, priced by day offset.
pub fn bars_between(start: &str, end: &str, price: impl Fn(usize) -> f64) -> Vec<PriceBar> {
    let count = (date(end) - date(start)).num_days() as usize + 1;
    daily_bars(start, count, price)
}

pub fn is_strictly_increasing(series: &PriceSeries) -> bool {
    series.bars().windows(2).all(|w| w[0].date < w[1].date)
}
