//! Ordered daily price history for one symbol.
//!
//! Invariant: dates are strictly increasing. Every constructor either checks
//! it or establishes it.

use crate::domain::error::TrendscanError;
use crate::domain::price_bar::PriceBar;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, TrendscanError> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(TrendscanError::InvalidSeries {
                    reason: format!(
                        "date {} does not follow {}",
                        pair[1].date, pair[0].date
                    ),
                });
            }
        }
        Ok(Self { bars })
    }

    /// Sort by date and drop repeated dates, keeping the first occurrence.
    pub fn from_unordered(bars: Vec<PriceBar>) -> Self {
        let mut seen = HashSet::with_capacity(bars.len());
        let mut unique: Vec<PriceBar> = bars.into_iter().filter(|b| seen.insert(b.date)).collect();
        unique.sort_by_key(|b| b.date);
        Self { bars: unique }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn adjusted_closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.adjusted_close).collect()
    }

    /// Bars with `start <= date <= end`.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        Self {
            bars: self
                .bars
                .iter()
                .filter(|b| b.date >= start && b.date <= end)
                .cloned()
                .collect(),
        }
    }

    /// Bars with `date >= start`.
    pub fn since(&self, start: NaiveDate) -> PriceSeries {
        let from = self.bars.partition_point(|b| b.date < start);
        Self {
            bars: self.bars[from..].to_vec(),
        }
    }
}
