//! Simple Moving Average over adjusted close.
//!
//! SMA[i] = mean(adj[i-n+1..=i]). Warmup: first (n-1) bars are `None`.

use crate::domain::error::TrendscanError;
use crate::domain::indicator::IndicatorLine;
use crate::domain::price_series::PriceSeries;

pub fn simple_moving_average(
    series: &PriceSeries,
    window: usize,
) -> Result<IndicatorLine, TrendscanError> {
    if window == 0 || series.len() < window {
        return Err(TrendscanError::insufficient(series.len(), window.max(1)));
    }

    let closes = series.adjusted_closes();
    let mut values = Vec::with_capacity(closes.len());
    let mut sum = 0.0;

    for (i, &close) in closes.iter().enumerate() {
        sum += close;
        if i >= window {
            sum -= closes[i - window];
        }
        if i + 1 < window {
            values.push(None);
        } else {
            values.push(Some(sum / window as f64));
        }
    }

    Ok(values)
}
