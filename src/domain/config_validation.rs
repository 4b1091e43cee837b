//! Configuration validation.
//!
//! Validates every config value before a command runs. The parsing helpers
//! here are shared with the CLI config builders.

use crate::domain::error::TrendscanError;
use crate::domain::pipeline::RefreshMode;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const SOURCE_KINDS: [&str; 2] = ["yahoo", "csv"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TrendscanError> {
    validate_source(config)?;
    validate_screen(config)?;
    validate_backtest(config)?;
    Ok(())
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), TrendscanError> {
    let kind = config
        .get_string("source", "kind")
        .unwrap_or_else(|| "yahoo".to_string());
    if !SOURCE_KINDS.contains(&kind.trim()) {
        return Err(TrendscanError::config_invalid(
            "source",
            "kind",
            format!("unknown source '{kind}', expected yahoo or csv"),
        ));
    }
    if kind.trim() == "csv" {
        match config.get_string("source", "dir") {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(TrendscanError::ConfigMissing {
                    section: "source".to_string(),
                    key: "dir".to_string(),
                });
            }
        }
    }
    if config.get_int("source", "timeout_secs", 30) <= 0 {
        return Err(TrendscanError::config_invalid(
            "source",
            "timeout_secs",
            "timeout_secs must be positive",
        ));
    }
    Ok(())
}

fn validate_screen(config: &dyn ConfigPort) -> Result<(), TrendscanError> {
    parse_date(config, "screen", "start_date", default_history_start())?;
    if config.get_int("screen", "rsi_period", 14) < 2 {
        return Err(TrendscanError::config_invalid(
            "screen",
            "rsi_period",
            "rsi_period must be at least 2",
        ));
    }
    parse_refresh(config)?;
    if config.get_int("screen", "workers", 1) < 1 {
        return Err(TrendscanError::config_invalid(
            "screen",
            "workers",
            "workers must be at least 1",
        ));
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), TrendscanError> {
    parse_date(config, "backtest", "start_date", default_backtest_start())?;
    let fast = parse_windows(config, "fast_windows", &crate::domain::backtest::DEFAULT_FAST_WINDOWS)?;
    let slow = parse_windows(config, "slow_windows", &crate::domain::backtest::DEFAULT_SLOW_WINDOWS)?;

    let fast_max = fast.iter().max().copied().unwrap_or(0);
    let slow_min = slow.iter().min().copied().unwrap_or(0);
    if fast_max >= slow_min {
        return Err(TrendscanError::config_invalid(
            "backtest",
            "fast_windows",
            "every fast window must be shorter than every slow window",
        ));
    }
    Ok(())
}

pub fn default_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

pub fn default_backtest_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 5, 1).unwrap_or_default()
}

/// `YYYY-MM-DD` value of `[section] key`, or `default` when absent.
pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: NaiveDate,
) -> Result<NaiveDate, TrendscanError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            TrendscanError::config_invalid(
                section,
                key,
                format!("invalid {key} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

pub fn parse_refresh(config: &dyn ConfigPort) -> Result<RefreshMode, TrendscanError> {
    match config.get_string("screen", "refresh") {
        None => Ok(RefreshMode::default()),
        Some(s) => s
            .parse()
            .map_err(|reason: String| TrendscanError::config_invalid("screen", "refresh", reason)),
    }
}

/// Comma-separated `[backtest]` window list; `default` when absent.
pub fn parse_windows(
    config: &dyn ConfigPort,
    key: &str,
    default: &[usize],
) -> Result<Vec<usize>, TrendscanError> {
    let Some(items) = config.get_list("backtest", key) else {
        return Ok(default.to_vec());
    };
    if items.is_empty() {
        return Err(TrendscanError::config_invalid(
            "backtest",
            key,
            format!("{key} must not be empty"),
        ));
    }
    items
        .iter()
        .map(|item| match item.parse::<usize>() {
            Ok(w) if w > 0 => Ok(w),
            _ => Err(TrendscanError::config_invalid(
                "backtest",
                key,
                format!("'{item}' is not a positive window length"),
            )),
        })
        .collect()
}
