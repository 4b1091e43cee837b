//! Symbol list parsing.
//!
//! Lists come from a comma-separated config value or a file with one symbol
//! per line. Repeats are dropped, keeping the first occurrence, so every
//! archive in a run has a single writer.

use crate::domain::symbol::Symbol;
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("symbol list is empty")]
    Empty,
}

/// Parse a comma-separated list, inferring each symbol's market.
pub fn parse_symbols(input: &str) -> Result<Vec<Symbol>, UniverseError> {
    collect_unique(input.split(','))
}

/// Parse a symbols file: one per line, blank lines and `#` comments ignored.
pub fn parse_symbols_file(content: &str) -> Result<Vec<Symbol>, UniverseError> {
    collect_unique(content.lines().map(|line| match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }))
}

fn collect_unique<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Vec<Symbol>, UniverseError> {
    let mut seen = HashSet::new();
    let symbols: Vec<Symbol> = tokens
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Symbol::infer)
        .filter(|s| seen.insert(s.clone()))
        .collect();

    if symbols.is_empty() {
        return Err(UniverseError::Empty);
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickers(symbols: &[Symbol]) -> Vec<&str> {
        symbols.iter().map(Symbol::ticker).collect()
    }

    #[test]
    fn test_parse_symbols_basic() {
        let result = parse_symbols("AAPL,MSFT,air.nz").unwrap();
        assert_eq!(tickers(&result), vec!["aapl", "msft", "air.nz"]);
        assert_eq!(result[2].market(), "nz");
    }

    #[test]
    fn test_parse_symbols_with_whitespace() {
        let result = parse_symbols("  aapl , msft ,,  nvda  ").unwrap();
        assert_eq!(tickers(&result), vec!["aapl", "msft", "nvda"]);
    }

    #[test]
    fn test_parse_symbols_dedupes_keeping_first() {
        let result = parse_symbols("msft,AAPL,msft,aapl,ko").unwrap();
        assert_eq!(tickers(&result), vec!["msft", "aapl", "ko"]);
    }

    #[test]
    fn test_parse_symbols_empty() {
        assert_eq!(parse_symbols(" , ,"), Err(UniverseError::Empty));
    }

    #[test]
    fn test_parse_symbols_file() {
        let content = "# S&P sample\naapl\n\nmsft  # software\nbrk-b\naapl\n";
        let result = parse_symbols_file(content).unwrap();
        assert_eq!(tickers(&result), vec!["aapl", "msft", "brk-b"]);
    }
}
