//! CSV screening report.
//!
//! Fixed columns first, then the sorted union of extra ticker-info keys with
//! `longBusinessSummary` last. Unknown values are empty cells.

use crate::domain::error::TrendscanError;
use crate::domain::screener::ScreeningRow;
use crate::ports::report_port::ReportPort;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::info;

pub const STABLE_COLUMNS: [&str; 15] = [
    "Security",
    "Symbol",
    "Sector",
    "RSI",
    "Trend Template",
    "Current Close",
    "Div. Rate",
    "Div. Yield",
    "Payout Ratio",
    "Simulation % Return",
    "50 Day MA",
    "150 Day MA",
    "200 Day MA",
    "52 Week Low",
    "52 Week High",
];

const SUMMARY_KEY: &str = "longBusinessSummary";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Extra columns present in any row, in output order.
    pub fn extra_columns(rows: &[ScreeningRow]) -> Vec<String> {
        let keys: BTreeSet<&String> = rows.iter().flat_map(|r| r.extras.keys()).collect();
        let has_summary = keys.iter().any(|k| *k == SUMMARY_KEY);
        keys.into_iter()
            .filter(|k| *k != SUMMARY_KEY)
            .cloned()
            .chain(has_summary.then(|| SUMMARY_KEY.to_string()))
            .collect()
    }

    fn record(row: &ScreeningRow, extras: &[String]) -> Vec<String> {
        let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        let mut cells = vec![
            row.security.clone(),
            row.symbol.clone(),
            row.sector.clone(),
            row.rsi.to_string(),
            row.verdict.to_string(),
            row.current_close.to_string(),
            opt(row.dividend_rate),
            opt(row.dividend_yield),
            opt(row.payout_ratio),
            opt(row.simulated_return),
            row.sma_50.to_string(),
            row.sma_150.to_string(),
            row.sma_200.to_string(),
            row.low_52w.to_string(),
            row.high_52w.to_string(),
        ];
        cells.extend(
            extras
                .iter()
                .map(|k| row.extras.get(k).cloned().unwrap_or_default()),
        );
        cells
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, rows: &[ScreeningRow], output_path: &str) -> Result<(), TrendscanError> {
        let storage = |reason: String| TrendscanError::Storage {
            path: output_path.to_string(),
            reason,
        };

        if let Some(dir) = Path::new(output_path).parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| storage(e.to_string()))?;
        }

        let extras = Self::extra_columns(rows);
        let mut writer = csv::Writer::from_path(output_path).map_err(|e| storage(e.to_string()))?;
        writer
            .write_record(STABLE_COLUMNS.iter().copied().chain(extras.iter().map(String::as_str)))
            .map_err(|e| storage(e.to_string()))?;
        for row in rows {
            writer
                .write_record(Self::record(row, &extras))
                .map_err(|e| storage(e.to_string()))?;
        }
        writer.flush().map_err(|e| storage(e.to_string()))?;

        info!(path = output_path, rows = rows.len(), "report written");
        Ok(())
    }
}
