//! Weekly and monthly aggregation of a daily series.
//!
//! Buckets are labelled by their left edge: weekly buckets (Monday to Sunday)
//! carry the date of the Sunday before them, monthly buckets carry the last
//! day of the previous month. Buckets with no bars are omitted.

use crate::domain::price_bar::PriceBar;
use crate::domain::price_series::PriceSeries;
use chrono::{Datelike, Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Weekly,
    Monthly,
}

impl Period {
    fn label(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Weekly => {
                let days_from_monday = date.weekday().num_days_from_monday() as i64;
                date - Duration::days(days_from_monday + 1)
            }
            Period::Monthly => {
                let first = date.with_day(1).unwrap_or(date);
                first - Duration::days(1)
            }
        }
    }
}

pub fn resample(series: &PriceSeries, period: Period) -> PriceSeries {
    let mut out: Vec<PriceBar> = Vec::new();
    let mut current: Option<NaiveDate> = None;

    for bar in series.bars() {
        let label = period.label(bar.date);
        match (current, out.last_mut()) {
            (Some(l), Some(agg)) if l == label => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.adjusted_close = bar.adjusted_close;
                agg.volume += bar.volume;
            }
            _ => {
                out.push(PriceBar {
                    date: label,
                    ..bar.clone()
                });
                current = Some(label);
            }
        }
    }

    PriceSeries::from_unordered(out)
}
