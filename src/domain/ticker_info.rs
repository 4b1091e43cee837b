//! Ticker metadata as returned by the info collaborator.
//!
//! Missing or null keys are unknown, never an error.

use chrono::DateTime;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keys that are either promoted to dedicated row columns or dropped.
pub const EXCLUDED_KEYS: &[&str] = &[
    "longName",
    "sector",
    "address1",
    "address2",
    "companyOfficers",
    "fax",
    "isEsgPopulated",
    "logo_url",
    "market",
    "phone",
    "quoteType",
    "symbol",
    "tradeable",
    "payoutRatio",
    "gmtOffSetMilliseconds",
    "maxAge",
    "uuid",
];

/// Keys holding epoch seconds, rendered as calendar dates.
pub const DATE_KEYS: &[&str] = &[
    "dateShortInterest",
    "exDividendDate",
    "lastDividendDate",
    "lastFiscalYearEnd",
    "lastSplitDate",
    "mostRecentQuarter",
    "nextFiscalYearEnd",
    "sharesShortPreviousMonthDate",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerInfo {
    fields: Map<String, Value>,
}

impl TickerInfo {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn long_name(&self) -> &str {
        self.text("longName").unwrap_or("")
    }

    pub fn short_name(&self) -> Option<&str> {
        self.text("shortName").filter(|s| !s.is_empty())
    }

    pub fn sector(&self) -> &str {
        self.text("sector").unwrap_or("")
    }

    /// Pass-through fields rendered as text, excluding promoted and null keys.
    pub fn extras(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter(|(k, v)| !EXCLUDED_KEYS.contains(&k.as_str()) && !v.is_null())
            .map(|(k, v)| (k.clone(), render_field(k, v)))
            .collect()
    }
}

fn render_field(key: &str, value: &Value) -> String {
    if DATE_KEYS.contains(&key) {
        if let Some(date) = value
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    match value {
        Value::String(s) if key == "industry" => s.replace('—', "-"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
