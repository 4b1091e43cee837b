//! Ticker symbols and market tags.

use std::fmt;

pub const DEFAULT_MARKET: &str = "us";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    ticker: String,
    market: String,
}

impl Symbol {
    pub fn new(ticker: &str, market: &str) -> Self {
        Self {
            ticker: ticker.trim().to_lowercase(),
            market: market.trim().to_lowercase(),
        }
    }

    /// Build a symbol, inferring the market from a `.nz` suffix.
    pub fn infer(ticker: &str) -> Self {
        let ticker = ticker.trim().to_lowercase();
        let market = if ticker.ends_with(".nz") {
            "nz"
        } else {
            DEFAULT_MARKET
        };
        Self::new(&ticker, market)
    }

    /// Ticker as passed to the data source.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    /// Filesystem-safe form used for archive file names.
    pub fn storage_key(&self) -> String {
        self.ticker.replace('.', "-")
    }

    pub fn display(&self) -> String {
        self.ticker.to_uppercase()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_replaces_dots() {
        let s = Symbol::new("BRK.B", "us");
        assert_eq!(s.storage_key(), "brk-b");
        assert_eq!(Symbol::infer("air.nz").storage_key(), "air-nz");
    }

    #[test]
    fn infer_market_from_suffix() {
        assert_eq!(Symbol::infer("AIR.NZ").market(), "nz");
        assert_eq!(Symbol::infer("aapl").market(), "us");
        assert_eq!(Symbol::infer("brk.b").market(), "us");
    }

    #[test]
    fn display_is_upper_case() {
        let s = Symbol::infer(" msft ");
        assert_eq!(s.ticker(), "msft");
        assert_eq!(s.to_string(), "MSFT");
    }

    #[test]
    fn normalized_symbols_compare_equal() {
        assert_eq!(Symbol::new("AAPL", "US"), Symbol::new("aapl", "us"));
    }
}
