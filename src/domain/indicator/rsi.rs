//! RSI (Relative Strength Index) over the trailing window.
//!
//! The window covers the `period` bars that end one bar before the most
//! recent bar, giving `period - 1` bar-to-bar deltas of adjusted close:
//! - smma_up   = sum(positive deltas) / period
//! - smma_down = -sum(negative deltas) / period
//!
//! Formula: RSI = 100 - (100 / (1 + smma_up / smma_down))
//! If smma_down == 0: RSI = 100
//!
//! The most recent bar never enters the window. Needs `period + 1` bars.

use crate::domain::error::TrendscanError;
use crate::domain::price_series::PriceSeries;

pub const DEFAULT_RSI_PERIOD: usize = 14;

pub fn rsi(series: &PriceSeries, period: usize) -> Result<f64, TrendscanError> {
    if period < 2 {
        return Err(TrendscanError::config_invalid(
            "screen",
            "rsi_period",
            format!("period must be at least 2, got {period}"),
        ));
    }
    let required = period + 1;
    if series.len() < required {
        return Err(TrendscanError::insufficient(series.len(), required));
    }

    let closes = series.adjusted_closes();
    let n = closes.len();
    // bars n-p-1 ..= n-2
    let window = &closes[n - period - 1..n - 1];

    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > 0.0 {
            gains += delta;
        } else if delta < 0.0 {
            losses -= delta;
        }
    }

    let smma_up = gains / period as f64;
    let smma_down = losses / period as f64;

    if smma_down == 0.0 {
        return Ok(100.0);
    }

    let rs = smma_up / smma_down;
    Ok(100.0 - 100.0 / (1.0 + rs))
}
