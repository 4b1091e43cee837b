//! Price source and ticker-info collaborator ports.

use crate::domain::error::TrendscanError;
use crate::domain::price_bar::PriceBar;
use crate::domain::symbol::Symbol;
use crate::domain::ticker_info::TickerInfo;
use chrono::NaiveDate;

/// External daily price source.
///
/// Rows may come back unsorted, duplicated, or outside the requested range;
/// callers filter. Unknown symbols may yield an empty vector or an error.
pub trait PriceSourcePort: Send + Sync {
    fn fetch(
        &self,
        symbol: &Symbol,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, TrendscanError>;
}

/// Company metadata lookup.
pub trait TickerInfoPort: Send + Sync {
    fn fetch_info(&self, symbol: &Symbol) -> Result<TickerInfo, TrendscanError>;
}
