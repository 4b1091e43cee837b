//! Trailing low/high of adjusted close. 260 bars approximates 52 weeks.

use crate::domain::error::TrendscanError;
use crate::domain::price_series::PriceSeries;

pub const DEFAULT_EXTREMA_WINDOW: usize = 260;

pub fn extrema(series: &PriceSeries, window: usize) -> Result<(f64, f64), TrendscanError> {
    if window == 0 || series.len() < window {
        return Err(TrendscanError::insufficient(series.len(), window.max(1)));
    }

    let bars = &series.bars()[series.len() - window..];
    let (low, high) = bars.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
        (lo.min(b.adjusted_close), hi.max(b.adjusted_close))
    });
    Ok((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_bar::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn make_series(prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        PriceSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| PriceBar::flat(start + Duration::days(i as i64), p, 10))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn extrema_over_trailing_window() {
        let series = make_series(&[1.0, 50.0, 7.0, 3.0, 9.0, 4.0]);
        // last 4 bars: 7, 3, 9, 4
        assert_eq!(extrema(&series, 4).unwrap(), (3.0, 9.0));
    }

    #[test]
    fn extrema_full_series() {
        let series = make_series(&[5.0, 2.0, 8.0]);
        assert_eq!(extrema(&series, 3).unwrap(), (2.0, 8.0));
    }

    #[test]
    fn extrema_insufficient_history() {
        let series = make_series(&[5.0, 2.0]);
        assert!(matches!(
            extrema(&series, DEFAULT_EXTREMA_WINDOW),
            Err(TrendscanError::InsufficientHistory {
                bars: 2,
                required: 260
            })
        ));
    }
}
