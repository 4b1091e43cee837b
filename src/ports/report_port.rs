//! Screening report port.

use crate::domain::error::TrendscanError;
use crate::domain::screener::ScreeningRow;

/// Port for writing the screening table.
pub trait ReportPort {
    fn write(&self, rows: &[ScreeningRow], output_path: &str) -> Result<(), TrendscanError>;
}
