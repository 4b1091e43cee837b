//! Daily price bar.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// Bar with every price field set to `price`.
    pub fn flat(date: NaiveDate, price: f64, volume: i64) -> Self {
        Self {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            adjusted_close: price,
            volume,
        }
    }

    /// Percentage change of adjusted close relative to `previous`.
    pub fn change_pct(&self, previous: &PriceBar) -> Option<f64> {
        if previous.adjusted_close == 0.0 {
            return None;
        }
        Some((self.adjusted_close - previous.adjusted_close) / previous.adjusted_close * 100.0)
    }
}
