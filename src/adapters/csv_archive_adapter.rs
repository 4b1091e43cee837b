//! On-disk CSV price archive.
//!
//! Layout: `<base>/<market>/price_history/<storage_key>.csv` with header
//! `Date,Open,High,Low,Close,AdjustedClose,Volume`. Stores write a `.tmp`
//! sibling and rename it over the archive.

use crate::domain::error::TrendscanError;
use crate::domain::price_bar::PriceBar;
use crate::domain::price_series::PriceSeries;
use crate::domain::symbol::Symbol;
use crate::ports::archive_port::ArchivePort;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArchiveRecord {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    adjusted_close: f64,
    volume: i64,
}

impl From<&PriceBar> for ArchiveRecord {
    fn from(bar: &PriceBar) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            adjusted_close: bar.adjusted_close,
            volume: bar.volume,
        }
    }
}

impl From<ArchiveRecord> for PriceBar {
    fn from(r: ArchiveRecord) -> Self {
        PriceBar {
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            adjusted_close: r.adjusted_close,
            volume: r.volume,
        }
    }
}

pub struct CsvArchiveAdapter {
    base_path: PathBuf,
}

impl CsvArchiveAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn archive_path(&self, symbol: &Symbol) -> PathBuf {
        self.base_path
            .join(symbol.market())
            .join("price_history")
            .join(format!("{}.csv", symbol.storage_key()))
    }

    fn write_records(path: &Path, series: &PriceSeries) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for bar in series.bars() {
            writer.serialize(ArchiveRecord::from(bar))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn storage_error(path: &Path, reason: impl ToString) -> TrendscanError {
    TrendscanError::Storage {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

impl ArchivePort for CsvArchiveAdapter {
    fn load(&self, symbol: &Symbol) -> Result<Option<PriceSeries>, TrendscanError> {
        let path = self.archive_path(symbol);
        let mut reader = match csv::Reader::from_path(&path) {
            Ok(r) => r,
            Err(e) => {
                return match e.kind() {
                    csv::ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {
                        Ok(None)
                    }
                    _ => Err(storage_error(&path, e)),
                };
            }
        };

        let bars = reader
            .deserialize::<ArchiveRecord>()
            .map(|r| r.map(PriceBar::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TrendscanError::InvalidSeries {
                reason: format!("{}: {e}", path.display()),
            })?;

        debug!(symbol = %symbol, bars = bars.len(), "archive loaded");
        PriceSeries::new(bars).map(Some)
    }

    fn store(&self, symbol: &Symbol, series: &PriceSeries) -> Result<(), TrendscanError> {
        let path = self.archive_path(symbol);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| storage_error(dir, e))?;
        }

        let temp_path = path.with_extension("csv.tmp");
        if let Err(e) = Self::write_records(&temp_path, series) {
            error!(error = %e, path = %temp_path.display(), "failed to write temp archive");
            let _ = fs::remove_file(&temp_path);
            return Err(storage_error(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            error!(error = %e, "failed to rename temp archive");
            let _ = fs::remove_file(&temp_path);
            return Err(storage_error(&path, e));
        }

        debug!(symbol = %symbol, bars = series.len(), path = %path.display(), "archive written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample() -> PriceSeries {
        PriceSeries::new(vec![
            PriceBar {
                date: day(15),
                open: 100.0,
                high: 110.0,
                low: 90.0,
                close: 105.0,
                adjusted_close: 104.5,
                volume: 50_000,
            },
            PriceBar::flat(day(16), 110.25, 60_000),
        ])
        .unwrap()
    }

    #[test]
    fn missing_archive_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvArchiveAdapter::new(dir.path().to_path_buf());
        assert!(adapter.load(&Symbol::infer("aapl")).unwrap().is_none());
    }

    #[test]
    fn store_then_load_preserves_bars() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvArchiveAdapter::new(dir.path().to_path_buf());
        let sym = Symbol::infer("air.nz");

        adapter.store(&sym, &sample()).unwrap();
        let loaded = adapter.load(&sym).unwrap().unwrap();

        assert_eq!(loaded, sample());
        assert!(dir.path().join("nz/price_history/air-nz.csv").exists());
        assert!(!dir.path().join("nz/price_history/air-nz.csv.tmp").exists());
    }

    #[test]
    fn archive_has_expected_header() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvArchiveAdapter::new(dir.path().to_path_buf());
        let sym = Symbol::infer("aapl");
        adapter.store(&sym, &sample()).unwrap();

        let content = fs::read_to_string(adapter.archive_path(&sym)).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Open,High,Low,Close,AdjustedClose,Volume")
        );
        assert_eq!(lines.next(), Some("2024-01-15,100.0,110.0,90.0,105.0,104.5,50000"));
    }

    #[test]
    fn store_replaces_previous_archive() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvArchiveAdapter::new(dir.path().to_path_buf());
        let sym = Symbol::infer("aapl");
        adapter.store(&sym, &sample()).unwrap();

        let shorter = PriceSeries::new(vec![PriceBar::flat(day(20), 1.0, 1)]).unwrap();
        adapter.store(&sym, &shorter).unwrap();
        assert_eq!(adapter.load(&sym).unwrap().unwrap(), shorter);
    }

    #[test]
    fn unsorted_archive_is_invalid() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvArchiveAdapter::new(dir.path().to_path_buf());
        let sym = Symbol::infer("aapl");
        let path = adapter.archive_path(&sym);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "Date,Open,High,Low,Close,AdjustedClose,Volume\n\
             2024-01-16,1,1,1,1,1,1\n\
             2024-01-15,1,1,1,1,1,1\n",
        )
        .unwrap();

        let err = adapter.load(&sym).unwrap_err();
        assert!(matches!(err, TrendscanError::InvalidSeries { .. }));
    }

    #[test]
    fn malformed_row_is_invalid() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvArchiveAdapter::new(dir.path().to_path_buf());
        let sym = Symbol::infer("aapl");
        let path = adapter.archive_path(&sym);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "Date,Open,High,Low,Close,AdjustedClose,Volume\n2024-01-15,abc,1,1,1,1,1\n",
        )
        .unwrap();

        assert!(adapter.load(&sym).is_err());
    }
}
