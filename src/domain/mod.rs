//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod history_store;
pub mod indicator;
pub mod label_cache;
pub mod pipeline;
pub mod price_bar;
pub mod price_series;
pub mod resample;
pub mod screener;
pub mod symbol;
pub mod ticker_info;
pub mod universe;
