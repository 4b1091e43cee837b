//! Trend template screen and the report row it produces.
//!
//! Eight conditions over the latest indicators, combined with AND:
//!
//! | # | Condition                          |
//! |---|------------------------------------|
//! | 1 | close > SMA150 > SMA200            |
//! | 2 | SMA150 > SMA200                    |
//! | 3 | SMA200 now > SMA200 20 bars ago    |
//! | 4 | SMA50 > SMA150 > SMA200            |
//! | 5 | close > SMA50                      |
//! | 6 | close >= 1.30 x 52-week low        |
//! | 7 | close >= 0.75 x 52-week high       |
//! | 8 | RSI > 70                           |

use crate::domain::backtest::BacktestOutcome;
use crate::domain::error::TrendscanError;
use crate::domain::indicator::{round_to, IndicatorSet};
use crate::domain::price_series::PriceSeries;
use crate::domain::symbol::Symbol;
use crate::domain::ticker_info::TickerInfo;
use std::collections::BTreeMap;
use std::fmt;

pub const SMA_WINDOWS: [usize; 3] = [50, 150, 200];

/// How far back the SMA200 trend sample is taken, counted from the end.
pub const SMA200_LOOKBACK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendInputs {
    pub close: f64,
    pub sma_50: f64,
    pub sma_150: f64,
    pub sma_200: f64,
    /// SMA200 sampled `SMA200_LOOKBACK` bars from the end; 0.0 when unavailable.
    pub sma_200_prior: f64,
    pub low_52w: f64,
    pub high_52w: f64,
    pub rsi: f64,
}

impl TrendInputs {
    pub fn from_indicators(
        series: &PriceSeries,
        indicators: &IndicatorSet,
    ) -> Result<Self, TrendscanError> {
        let last = series
            .last()
            .ok_or_else(|| TrendscanError::insufficient(0, 1))?;
        let mas = &indicators.moving_averages;
        let latest = |window: usize| {
            mas.latest(window)
                .ok_or_else(|| TrendscanError::insufficient(series.len(), window))
        };

        let sma_200_prior = series
            .len()
            .checked_sub(SMA200_LOOKBACK)
            .and_then(|idx| mas.at(200, idx))
            .unwrap_or(0.0);

        Ok(Self {
            close: last.adjusted_close,
            sma_50: latest(50)?,
            sma_150: latest(150)?,
            sma_200: latest(200)?,
            sma_200_prior,
            low_52w: indicators.low_52w,
            high_52w: indicators.high_52w,
            rsi: indicators.rsi,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendConditions(pub [bool; 8]);

impl TrendConditions {
    pub fn evaluate(i: &TrendInputs) -> Self {
        Self([
            i.close > i.sma_150 && i.sma_150 > i.sma_200,
            i.sma_150 > i.sma_200,
            i.sma_200 > i.sma_200_prior,
            i.sma_50 > i.sma_150 && i.sma_150 > i.sma_200,
            i.close > i.sma_50,
            i.close >= 1.3 * i.low_52w,
            i.close >= 0.75 * i.high_52w,
            i.rsi > 70.0,
        ])
    }

    pub fn verdict(&self) -> Verdict {
        if self.0.iter().all(|&c| c) {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// 1-based numbers of the conditions that did not hold.
    pub fn failed(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, c)| !**c)
            .map(|(i, _)| i + 1)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningRow {
    pub symbol: String,
    pub security: String,
    pub sector: String,
    pub rsi: f64,
    pub verdict: Verdict,
    pub current_close: f64,
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    /// `None` when the simulation produced no trades.
    pub simulated_return: Option<f64>,
    pub sma_50: f64,
    pub sma_150: f64,
    pub sma_200: f64,
    pub low_52w: f64,
    pub high_52w: f64,
    pub extras: BTreeMap<String, String>,
}

impl ScreeningRow {
    pub fn build(
        symbol: &Symbol,
        inputs: &TrendInputs,
        verdict: Verdict,
        info: &TickerInfo,
        backtest: &BacktestOutcome,
    ) -> Self {
        Self {
            symbol: symbol.display(),
            security: info.long_name().to_string(),
            sector: info.sector().to_string(),
            rsi: round_to(inputs.rsi, 2),
            verdict,
            current_close: round_to(inputs.close, 2),
            dividend_rate: info.number("dividendRate").map(|v| round_to(v, 2)),
            dividend_yield: info.number("dividendYield").map(|v| round_to(v, 4)),
            payout_ratio: info.number("payoutRatio").map(|v| round_to(v, 4)),
            simulated_return: backtest.total_return(),
            sma_50: inputs.sma_50,
            sma_150: inputs.sma_150,
            sma_200: inputs.sma_200,
            low_52w: inputs.low_52w,
            high_52w: inputs.high_52w,
            extras: info.extras(),
        }
    }
}
