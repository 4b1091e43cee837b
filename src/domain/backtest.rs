//! Moving-average band crossover backtest.
//!
//! Two SMA groups are computed over the series. At each bar the fast band's
//! minimum is compared with the slow band's maximum:
//! - FLAT and fast_min > slow_max: enter at adjusted close
//! - LONG and fast_min < slow_max: exit, record (exit/entry - 1) * 100
//!
//! A position still open at the last bar is closed at that bar's price.
//! Bars where any SMA is still warming up cause no transition.

use crate::domain::error::TrendscanError;
use crate::domain::indicator::{round_to, MovingAverages};
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;

pub const DEFAULT_FAST_WINDOWS: [usize; 6] = [3, 5, 8, 10, 12, 15];
pub const DEFAULT_SLOW_WINDOWS: [usize; 6] = [30, 35, 40, 45, 50, 60];

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Simulation covers bars on or after this date.
    pub start_date: NaiveDate,
    pub fast_windows: Vec<usize>,
    pub slow_windows: Vec<usize>,
}

impl BacktestConfig {
    pub fn with_start(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            fast_windows: DEFAULT_FAST_WINDOWS.to_vec(),
            slow_windows: DEFAULT_SLOW_WINDOWS.to_vec(),
        }
    }

    fn all_windows(&self) -> Vec<usize> {
        let mut windows: Vec<usize> = self
            .fast_windows
            .iter()
            .chain(&self.slow_windows)
            .copied()
            .collect();
        windows.sort_unstable();
        windows.dedup();
        windows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Flat,
    Long,
}

#[derive(Debug, Clone)]
pub struct BacktestState {
    pub position: Position,
    pub entry_price: f64,
    pub trade_returns: Vec<f64>,
}

impl BacktestState {
    pub fn new() -> Self {
        Self {
            position: Position::Flat,
            entry_price: 0.0,
            trade_returns: Vec::new(),
        }
    }

    /// Apply one bar's band comparison.
    pub fn step(&mut self, fast_min: f64, slow_max: f64, price: f64) {
        match self.position {
            Position::Flat if fast_min > slow_max => {
                self.position = Position::Long;
                self.entry_price = price;
            }
            Position::Long if fast_min < slow_max => self.close(price),
            _ => {}
        }
    }

    fn close(&mut self, price: f64) {
        self.trade_returns
            .push((price / self.entry_price - 1.0) * 100.0);
        self.position = Position::Flat;
    }

    pub fn finish(mut self, last_price: f64) -> BacktestOutcome {
        if self.position == Position::Long {
            self.close(last_price);
        }
        BacktestOutcome::from_trades(self.trade_returns)
    }
}

impl Default for BacktestState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BacktestOutcome {
    NoSignal,
    Traded {
        /// Compounded percentage return, rounded to 2 places.
        total_return: f64,
        trade_returns: Vec<f64>,
    },
}

impl BacktestOutcome {
    pub fn from_trades(trade_returns: Vec<f64>) -> Self {
        if trade_returns.is_empty() {
            return BacktestOutcome::NoSignal;
        }
        let growth: f64 = trade_returns.iter().map(|r| 1.0 + r / 100.0).product();
        BacktestOutcome::Traded {
            total_return: round_to((growth - 1.0) * 100.0, 2),
            trade_returns,
        }
    }

    pub fn total_return(&self) -> Option<f64> {
        match self {
            BacktestOutcome::NoSignal => None,
            BacktestOutcome::Traded { total_return, .. } => Some(*total_return),
        }
    }

    pub fn trade_count(&self) -> usize {
        match self {
            BacktestOutcome::NoSignal => 0,
            BacktestOutcome::Traded { trade_returns, .. } => trade_returns.len(),
        }
    }
}

/// Replay the crossover strategy over the part of `series` covered by `config`.
pub fn simulate(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestOutcome, TrendscanError> {
    let series = series.since(config.start_date);
    let Some(last) = series.last() else {
        return Err(TrendscanError::insufficient(0, 1));
    };

    let windows = config.all_windows();
    if series.len() < windows.last().copied().unwrap_or(0) {
        return Ok(BacktestOutcome::NoSignal);
    }

    let mas = MovingAverages::compute(&series, &windows)?;
    let band = |windows: &[usize], i: usize| -> Option<Vec<f64>> {
        windows.iter().map(|&w| mas.at(w, i)).collect()
    };

    let mut state = BacktestState::new();
    for (i, bar) in series.bars().iter().enumerate() {
        let (Some(fast), Some(slow)) = (band(&config.fast_windows, i), band(&config.slow_windows, i))
        else {
            continue;
        };
        let fast_min = fast.iter().copied().fold(f64::INFINITY, f64::min);
        let slow_max = slow.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        state.step(fast_min, slow_max, bar.adjusted_close);
    }

    Ok(state.finish(last.adjusted_close))
}
