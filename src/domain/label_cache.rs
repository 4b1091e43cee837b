//! Display labels such as `Apple (AAPL) +1.25%`, memoized per run.

use crate::domain::price_series::PriceSeries;
use crate::domain::symbol::Symbol;
use crate::domain::ticker_info::TickerInfo;
use std::collections::HashMap;
use std::sync::Mutex;

/// Owned by one pipeline run and shared by reference with its workers.
#[derive(Debug, Default)]
pub struct LabelCache {
    labels: Mutex<HashMap<Symbol, String>>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<String> {
        self.labels.lock().ok()?.get(symbol).cloned()
    }

    pub fn get_or_insert(&self, symbol: &Symbol, series: &PriceSeries, info: &TickerInfo) -> String {
        if let Some(label) = self.get(symbol) {
            return label;
        }
        let label = format_label(symbol, series, info);
        if let Ok(mut labels) = self.labels.lock() {
            labels.entry(symbol.clone()).or_insert_with(|| label.clone());
        }
        label
    }

    pub fn len(&self) -> usize {
        self.labels.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn format_label(symbol: &Symbol, series: &PriceSeries, info: &TickerInfo) -> String {
    let name = info
        .short_name()
        .map(|n| format!("{n} "))
        .unwrap_or_default();

    let bars = series.bars();
    let change = match bars {
        [.., prev, last] => last.change_pct(prev).map(|pct| {
            if pct > 0.0 {
                format!(" +{pct:.2}%")
            } else {
                format!(" {pct:.2}%")
            }
        }),
        _ => None,
    }
    .unwrap_or_default();

    format!("{name}({}){change}", symbol.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_bar::PriceBar;
    use chrono::NaiveDate;
    use serde_json::json;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    PriceBar::flat(NaiveDate::from_ymd_opt(2024, 5, (i + 1) as u32).unwrap(), p, 1)
                })
                .collect(),
        )
        .unwrap()
    }

    fn named(name: &str) -> TickerInfo {
        match json!({ "shortName": name }) {
            serde_json::Value::Object(m) => TickerInfo::new(m),
            _ => unreachable!(),
        }
    }

    #[test]
    fn label_with_name_and_gain() {
        let label = format_label(&Symbol::infer("aapl"), &series(&[100.0, 101.25]), &named("Apple Inc."));
        assert_eq!(label, "Apple Inc. (AAPL) +1.25%");
    }

    #[test]
    fn label_with_loss() {
        let label = format_label(&Symbol::infer("ko"), &series(&[50.0, 49.0]), &named("Coca-Cola"));
        assert_eq!(label, "Coca-Cola (KO) -2.00%");
    }

    #[test]
    fn label_without_name_or_history() {
        let label = format_label(&Symbol::infer("air.nz"), &series(&[3.0]), &TickerInfo::unknown());
        assert_eq!(label, "(AIR.NZ)");
    }

    #[test]
    fn cache_memoizes_first_label() {
        let cache = LabelCache::new();
        let sym = Symbol::infer("aapl");
        let first = cache.get_or_insert(&sym, &series(&[100.0, 110.0]), &named("Apple"));
        let second = cache.get_or_insert(&sym, &series(&[100.0, 90.0]), &named("Other"));

        assert_eq!(first, "Apple (AAPL) +10.00%");
        assert_eq!(second, first);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&sym), Some(first));
    }
}
