//! Screening pipeline: Store -> Indicators -> Screener -> Simulator per symbol.
//!
//! Symbols are independent. Per-symbol failures become `SkippedSymbol`
//! records; `Storage` and `Io` errors abort the run and no further symbol
//! is started. With more than one worker the symbols run on a bounded rayon
//! pool, and rows still come out in input order.

use crate::domain::backtest::{simulate, BacktestConfig, BacktestOutcome};
use crate::domain::error::TrendscanError;
use crate::domain::history_store::{is_stale, PriceHistoryStore};
use crate::domain::indicator::{IndicatorSet, DEFAULT_RSI_PERIOD};
use crate::domain::label_cache::LabelCache;
use crate::domain::screener::{ScreeningRow, TrendConditions, TrendInputs, Verdict, SMA_WINDOWS};
use crate::domain::symbol::Symbol;
use crate::domain::ticker_info::TickerInfo;
use crate::ports::data_port::TickerInfoPort;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    Always,
    Never,
    #[default]
    Stale,
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(RefreshMode::Always),
            "never" => Ok(RefreshMode::Never),
            "stale" => Ok(RefreshMode::Stale),
            other => Err(format!("expected always, never or stale, got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub history_start: NaiveDate,
    pub rsi_period: usize,
    pub refresh: RefreshMode,
    pub pass_only: bool,
    pub workers: usize,
    pub backtest: BacktestConfig,
}

impl PipelineConfig {
    pub fn new(history_start: NaiveDate, backtest: BacktestConfig) -> Self {
        Self {
            history_start,
            rsi_period: DEFAULT_RSI_PERIOD,
            refresh: RefreshMode::default(),
            pass_only: false,
            workers: 1,
            backtest,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: Symbol,
    pub reason: String,
}

impl fmt::Display for SkippedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.symbol, self.reason)
    }
}

#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub rows: Vec<ScreeningRow>,
    pub skipped: Vec<SkippedSymbol>,
}

impl PipelineOutcome {
    pub fn passed(&self) -> usize {
        self.rows.iter().filter(|r| r.verdict == Verdict::Pass).count()
    }
}

pub struct ScreeningPipeline<'a> {
    store: &'a PriceHistoryStore<'a>,
    info: &'a dyn TickerInfoPort,
    config: PipelineConfig,
}

impl<'a> ScreeningPipeline<'a> {
    pub fn new(
        store: &'a PriceHistoryStore<'a>,
        info: &'a dyn TickerInfoPort,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            info,
            config,
        }
    }

    /// Screen `symbols`, which must already be de-duplicated.
    pub fn run(
        &self,
        symbols: &[Symbol],
        labels: &LabelCache,
    ) -> Result<PipelineOutcome, TrendscanError> {
        info!(
            symbols = symbols.len(),
            workers = self.config.workers,
            "screening started"
        );

        let mut outcome = PipelineOutcome::default();
        if self.config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|e| TrendscanError::Io(std::io::Error::other(e)))?;
            let aborted = AtomicBool::new(false);
            // `None` marks symbols never started after a fatal error.
            let results: Vec<Option<Result<Option<ScreeningRow>, TrendscanError>>> =
                pool.install(|| {
                    symbols
                        .par_iter()
                        .map(|s| {
                            if aborted.load(Ordering::Relaxed) {
                                return None;
                            }
                            let result = self.screen_symbol(s, labels);
                            if matches!(&result, Err(e) if e.is_fatal()) {
                                aborted.store(true, Ordering::Relaxed);
                            }
                            Some(result)
                        })
                        .collect()
                });
            for (symbol, result) in symbols.iter().zip(results) {
                if let Some(result) = result {
                    record(&mut outcome, symbol, result)?;
                }
            }
        } else {
            for symbol in symbols {
                record(&mut outcome, symbol, self.screen_symbol(symbol, labels))?;
            }
        }

        info!(
            rows = outcome.rows.len(),
            passed = outcome.passed(),
            skipped = outcome.skipped.len(),
            "screening finished"
        );
        Ok(outcome)
    }

    /// `Ok(None)` when the row was filtered out by `pass_only`.
    pub fn screen_symbol(
        &self,
        symbol: &Symbol,
        labels: &LabelCache,
    ) -> Result<Option<ScreeningRow>, TrendscanError> {
        let today = self.store.today();
        let allow_fetch = self.should_fetch(symbol)?;
        let series =
            self.store
                .get_series(symbol, self.config.history_start, today, allow_fetch)?;

        let indicators = IndicatorSet::compute(&series, &SMA_WINDOWS, self.config.rsi_period)?;
        let inputs = TrendInputs::from_indicators(&series, &indicators)?;
        let conditions = TrendConditions::evaluate(&inputs);
        let verdict = conditions.verdict();
        debug!(symbol = %symbol, %verdict, failed = ?conditions.failed(), "trend template evaluated");

        if self.config.pass_only && verdict == Verdict::Fail {
            return Ok(None);
        }

        let info = self.info.fetch_info(symbol).unwrap_or_else(|e| {
            warn!(symbol = %symbol, error = %e, "ticker info unavailable");
            TickerInfo::unknown()
        });

        let backtest = match simulate(&series, &self.config.backtest) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "backtest skipped");
                BacktestOutcome::NoSignal
            }
        };

        let label = labels.get_or_insert(symbol, &series, &info);
        debug!(symbol = %symbol, %label, trades = backtest.trade_count(), "row built");

        Ok(Some(ScreeningRow::build(
            symbol, &inputs, verdict, &info, &backtest,
        )))
    }

    fn should_fetch(&self, symbol: &Symbol) -> Result<bool, TrendscanError> {
        needs_fetch(self.store, symbol, self.config.refresh)
    }
}

/// Fold one symbol's result into `outcome`. Fatal errors are returned.
fn record(
    outcome: &mut PipelineOutcome,
    symbol: &Symbol,
    result: Result<Option<ScreeningRow>, TrendscanError>,
) -> Result<(), TrendscanError> {
    match result {
        Ok(Some(row)) => outcome.rows.push(row),
        Ok(None) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "symbol skipped");
            outcome.skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: e.to_string(),
            });
        }
    }
    Ok(())
}

/// Whether `mode` calls for a source fetch before reading `symbol`.
pub fn needs_fetch(
    store: &PriceHistoryStore<'_>,
    symbol: &Symbol,
    mode: RefreshMode,
) -> Result<bool, TrendscanError> {
    Ok(match mode {
        RefreshMode::Always => true,
        RefreshMode::Never => false,
        RefreshMode::Stale => match store.archive_range(symbol) {
            Ok(None) => true,
            Ok(Some((_, last, _))) => is_stale(last, store.today()),
            Err(e) if e.is_fatal() => return Err(e),
            // unreadable archives are rebuilt from the source
            Err(_) => true,
        },
    })
}
