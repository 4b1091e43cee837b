//! Concrete adapter implementations for ports.

pub mod cached_info_adapter;
pub mod csv_archive_adapter;
pub mod csv_report_adapter;
pub mod csv_source_adapter;
pub mod file_config_adapter;
#[cfg(feature = "yahoo")]
pub mod yahoo_adapter;
