//! File cache in front of a ticker-info source.
//!
//! Entries live at `<base>/<market>/info/<storage_key>.json`. With `reload`
//! set, every lookup goes to the inner source and rewrites the entry.
//! Without an inner source the cache is read-only.

use crate::domain::error::TrendscanError;
use crate::domain::symbol::Symbol;
use crate::domain::ticker_info::TickerInfo;
use crate::ports::data_port::TickerInfoPort;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct CachedInfoAdapter {
    base_path: PathBuf,
    inner: Option<Box<dyn TickerInfoPort>>,
    reload: bool,
}

impl CachedInfoAdapter {
    pub fn new(base_path: PathBuf, inner: Box<dyn TickerInfoPort>, reload: bool) -> Self {
        Self {
            base_path,
            inner: Some(inner),
            reload,
        }
    }

    pub fn read_only(base_path: PathBuf) -> Self {
        Self {
            base_path,
            inner: None,
            reload: false,
        }
    }

    pub fn cache_path(&self, symbol: &Symbol) -> PathBuf {
        self.base_path
            .join(symbol.market())
            .join("info")
            .join(format!("{}.json", symbol.storage_key()))
    }

    fn read_cached(&self, symbol: &Symbol) -> Option<TickerInfo> {
        let path = self.cache_path(symbol);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Map<String, Value>>(&content) {
            Ok(fields) => Some(TickerInfo::new(fields)),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "discarding corrupt info cache");
                None
            }
        }
    }

    fn write_cached(&self, symbol: &Symbol, info: &TickerInfo) -> std::io::Result<()> {
        let path = self.cache_path(symbol);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let body = serde_json::to_string_pretty(info.fields()).map_err(std::io::Error::other)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, body)?;
        fs::rename(&temp_path, &path)
    }
}

impl TickerInfoPort for CachedInfoAdapter {
    fn fetch_info(&self, symbol: &Symbol) -> Result<TickerInfo, TrendscanError> {
        if !self.reload {
            if let Some(info) = self.read_cached(symbol) {
                debug!(symbol = %symbol, "info cache hit");
                return Ok(info);
            }
        }

        let Some(inner) = &self.inner else {
            return Err(TrendscanError::DataUnavailable {
                symbol: symbol.display(),
                reason: "not in info cache".into(),
            });
        };
        let info = inner.fetch_info(symbol)?;
        if let Err(e) = self.write_cached(symbol, &info) {
            warn!(symbol = %symbol, error = %e, "failed to write info cache");
        }
        Ok(info)
    }
}
