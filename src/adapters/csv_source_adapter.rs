//! Offline price source reading Yahoo-format CSV downloads.
//!
//! Expects `<dir>/<TICKER>.csv` with columns
//! `Date,Open,High,Low,Close,Adj Close,Volume`. Rows with `null` prices are
//! skipped, as Yahoo emits them for non-trading days.

use crate::domain::error::TrendscanError;
use crate::domain::price_bar::PriceBar;
use crate::domain::symbol::Symbol;
use crate::ports::data_port::PriceSourcePort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const COLUMNS: [&str; 7] = ["Date", "Open", "High", "Low", "Close", "Adj Close", "Volume"];

pub struct CsvSourceAdapter {
    base_path: PathBuf,
}

impl CsvSourceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Upper-case file name first, as downloaded, then the stored ticker form.
    fn csv_path(&self, symbol: &Symbol) -> Option<PathBuf> {
        [symbol.display(), symbol.ticker().to_string()]
            .into_iter()
            .map(|name| self.base_path.join(format!("{name}.csv")))
            .find(|p| p.exists())
    }
}

impl PriceSourcePort for CsvSourceAdapter {
    fn fetch(
        &self,
        symbol: &Symbol,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, TrendscanError> {
        let failed = |reason: String| TrendscanError::SourceFetchFailed {
            symbol: symbol.display(),
            reason,
        };

        let path = self
            .csv_path(symbol)
            .ok_or_else(|| failed(format!("no file in {}", self.base_path.display())))?;
        let content = fs::read_to_string(&path)
            .map_err(|e| failed(format!("failed to read {}: {e}", path.display())))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| failed(format!("CSV parse error: {e}")))?
            .clone();
        let mut index = [0usize; 7];
        for (slot, name) in index.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| failed(format!("missing {name} column")))?;
        }
        let [date_i, open_i, high_i, low_i, close_i, adj_i, volume_i] = index;

        let mut bars = Vec::new();
        let mut skipped = 0usize;
        for result in rdr.records() {
            let record = result.map_err(|e| failed(format!("CSV parse error: {e}")))?;

            let date_str = record.get(date_i).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| failed(format!("invalid date '{date_str}': {e}")))?;
            if date < start_date || date > end_date {
                continue;
            }

            let price = |i: usize| -> Option<f64> { record.get(i)?.trim().parse().ok() };
            let (Some(open), Some(high), Some(low), Some(close), Some(adjusted_close)) = (
                price(open_i),
                price(high_i),
                price(low_i),
                price(close_i),
                price(adj_i),
            ) else {
                skipped += 1;
                continue;
            };
            let volume = record
                .get(volume_i)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(0.0) as i64;

            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                adjusted_close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        debug!(symbol = %symbol, bars = bars.len(), skipped, path = %path.display(), "csv source read");
        Ok(bars)
    }
}
