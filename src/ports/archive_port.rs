//! Durable per-symbol archive port.

use crate::domain::error::TrendscanError;
use crate::domain::price_series::PriceSeries;
use crate::domain::symbol::Symbol;

pub trait ArchivePort: Send + Sync {
    /// `Ok(None)` when no archive exists for the symbol.
    fn load(&self, symbol: &Symbol) -> Result<Option<PriceSeries>, TrendscanError>;

    /// Replace the archive atomically. A failed write leaves the previous
    /// archive intact.
    fn store(&self, symbol: &Symbol, series: &PriceSeries) -> Result<(), TrendscanError>;
}
