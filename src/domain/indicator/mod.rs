//! Technical indicators over a price series.
//!
//! - `sma`: trailing simple moving average of adjusted close
//! - `rsi`: relative strength index over the trailing window
//! - `extrema`: trailing low/high of adjusted close
//!
//! Moving averages are keyed by window length in [`MovingAverages`]; there are
//! no string-named indicator columns.

pub mod extrema;
pub mod rsi;
pub mod sma;

use crate::domain::error::TrendscanError;
use crate::domain::price_series::PriceSeries;
use std::collections::BTreeMap;

pub use extrema::{extrema, DEFAULT_EXTREMA_WINDOW};
pub use rsi::{rsi, DEFAULT_RSI_PERIOD};
pub use sma::simple_moving_average;

/// One value per bar; `None` while the window is still filling.
pub type IndicatorLine = Vec<Option<f64>>;

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Moving averages keyed by window length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovingAverages {
    lines: BTreeMap<usize, IndicatorLine>,
}

impl MovingAverages {
    /// Compute SMAs for every window, rounded to cents.
    pub fn compute(series: &PriceSeries, windows: &[usize]) -> Result<Self, TrendscanError> {
        let mut lines = BTreeMap::new();
        for &window in windows {
            let line = simple_moving_average(series, window)?
                .into_iter()
                .map(|v| v.map(|x| round_to(x, 2)))
                .collect();
            lines.insert(window, line);
        }
        Ok(Self { lines })
    }

    pub fn at(&self, window: usize, index: usize) -> Option<f64> {
        self.lines.get(&window)?.get(index).copied().flatten()
    }

    pub fn latest(&self, window: usize) -> Option<f64> {
        self.lines.get(&window)?.last().copied().flatten()
    }

    pub fn windows(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines.keys().copied()
    }
}

/// Latest-bar annotations used by the trend screen.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub moving_averages: MovingAverages,
    pub rsi: f64,
    pub low_52w: f64,
    pub high_52w: f64,
}

impl IndicatorSet {
    pub fn compute(
        series: &PriceSeries,
        sma_windows: &[usize],
        rsi_period: usize,
    ) -> Result<Self, TrendscanError> {
        let moving_averages = MovingAverages::compute(series, sma_windows)?;
        let (low_52w, high_52w) = extrema(series, DEFAULT_EXTREMA_WINDOW)?;
        let rsi = rsi(series, rsi_period)?;
        Ok(Self {
            moving_averages,
            rsi,
            low_52w,
            high_52w,
        })
    }
}
