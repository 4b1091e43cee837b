//! Price history cache and synchronizer.
//!
//! Merges freshly fetched ranges into the per-symbol archive. The archive's
//! newest day is always refetched, since it may have been captured
//! mid-session. Older missing history is backfilled in front. A source
//! response that cannot be merged, or an archive that cannot be parsed,
//! triggers one full-range refetch.
//!
//! The merged series is built completely in memory before the archive port
//! replaces the old file, so a failure never corrupts a committed archive.

use crate::domain::error::TrendscanError;
use crate::domain::price_bar::PriceBar;
use crate::domain::price_series::PriceSeries;
use crate::domain::symbol::Symbol;
use crate::ports::archive_port::ArchivePort;
use crate::ports::data_port::PriceSourcePort;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::{debug, info, warn};

pub struct PriceHistoryStore<'a> {
    archive: &'a dyn ArchivePort,
    source: &'a dyn PriceSourcePort,
    today: NaiveDate,
}

impl<'a> PriceHistoryStore<'a> {
    pub fn new(
        archive: &'a dyn ArchivePort,
        source: &'a dyn PriceSourcePort,
        today: NaiveDate,
    ) -> Self {
        Self {
            archive,
            source,
            today,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Bars for `[start_date, end_date]`, refreshing the archive first when
    /// `allow_fetch` is set.
    pub fn get_series(
        &self,
        symbol: &Symbol,
        start_date: NaiveDate,
        end_date: NaiveDate,
        allow_fetch: bool,
    ) -> Result<PriceSeries, TrendscanError> {
        let full = if allow_fetch {
            self.refresh(symbol, start_date, end_date)?
        } else {
            self.archive
                .load(symbol)?
                .ok_or_else(|| TrendscanError::DataUnavailable {
                    symbol: symbol.display(),
                    reason: "no archive and fetching is disabled".into(),
                })?
        };

        let series = full.range(start_date, end_date);
        if series.is_empty() {
            return Err(TrendscanError::DataUnavailable {
                symbol: symbol.display(),
                reason: format!("no bars between {start_date} and {end_date}"),
            });
        }
        Ok(series)
    }

    /// First date, last date and bar count of the stored archive.
    pub fn archive_range(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TrendscanError> {
        let Some(series) = self.archive.load(symbol)? else {
            return Ok(None);
        };
        Ok(match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => Some((first, last, series.len())),
            _ => None,
        })
    }

    /// Bring the archive up to date and return all of it.
    fn refresh(
        &self,
        symbol: &Symbol,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, TrendscanError> {
        let archived = match self.archive.load(symbol) {
            Ok(Some(series)) if !series.is_empty() => series,
            Ok(_) => {
                debug!(symbol = %symbol, "no archive, fetching full range");
                return self.replace_with_full_range(symbol, start_date, end_date);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "unreadable archive, fetching full range");
                return self.replace_with_full_range(symbol, start_date, end_date);
            }
        };

        match self.merge_incremental(symbol, &archived, start_date) {
            Ok(merged) => {
                self.archive.store(symbol, &merged)?;
                info!(
                    symbol = %symbol,
                    bars = merged.len(),
                    added = merged.len().saturating_sub(archived.len()),
                    "archive merged"
                );
                Ok(merged)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "incremental merge failed, refetching full range");
                self.replace_with_full_range(symbol, start_date, end_date)
            }
        }
    }

    fn merge_incremental(
        &self,
        symbol: &Symbol,
        archived: &PriceSeries,
        start_date: NaiveDate,
    ) -> Result<PriceSeries, TrendscanError> {
        let (Some(oldest), Some(newest)) = (archived.first_date(), archived.last_date()) else {
            return Err(TrendscanError::InvalidSeries {
                reason: "archive has no bounds".into(),
            });
        };

        let mut backfill: Vec<PriceBar> = Vec::new();
        if start_date < oldest {
            let rows = self
                .source
                .fetch(symbol, start_date, oldest - Duration::days(1))?;
            backfill = PriceSeries::from_unordered(
                rows.into_iter()
                    .filter(|b| b.date >= start_date && b.date < oldest)
                    .collect(),
            )
            .into_bars();
            debug!(symbol = %symbol, bars = backfill.len(), "backfilled older history");
        }

        let tail_end = self.today.max(newest);
        let fresh = PriceSeries::from_unordered(
            self.source
                .fetch(symbol, newest, tail_end)?
                .into_iter()
                .filter(|b| b.date >= newest)
                .collect(),
        );
        if fresh.is_empty() {
            return Err(TrendscanError::SourceFetchFailed {
                symbol: symbol.display(),
                reason: format!("no rows returned from {newest}"),
            });
        }

        let kept = archived.bars().iter().filter(|b| b.date < newest).cloned();
        let merged: Vec<PriceBar> = backfill
            .into_iter()
            .chain(kept)
            .chain(fresh.into_bars())
            .collect();
        PriceSeries::new(merged)
    }

    fn replace_with_full_range(
        &self,
        symbol: &Symbol,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, TrendscanError> {
        let rows = self.source.fetch(symbol, start_date, end_date)?;
        let series = PriceSeries::from_unordered(
            rows.into_iter()
                .filter(|b| b.date >= start_date && b.date <= end_date)
                .collect(),
        );
        if series.is_empty() {
            return Err(TrendscanError::DataUnavailable {
                symbol: symbol.display(),
                reason: format!("source returned no rows for {start_date}..{end_date}"),
            });
        }
        self.archive.store(symbol, &series)?;
        info!(symbol = %symbol, bars = series.len(), "archive replaced");
        Ok(series)
    }
}

/// Whether an archive ending on `last_date` needs refreshing on `today`.
///
/// Fresh only when `last_date` falls inside the slack window before
/// `today`: three days on weekends, two on weekdays.
pub fn is_stale(last_date: NaiveDate, today: NaiveDate) -> bool {
    let slack = match today.weekday() {
        Weekday::Sat | Weekday::Sun => 3,
        _ => 2,
    };
    last_date <= today - Duration::days(slack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn daily(start: &str, end: &str, price: f64) -> Vec<PriceBar> {
        let mut out = Vec::new();
        let mut day = d(start);
        while day <= d(end) {
            out.push(PriceBar::flat(day, price, 100));
            day += Duration::days(1);
        }
        out
    }

    #[derive(Default)]
    struct MemoryArchive {
        data: Mutex<HashMap<Symbol, PriceSeries>>,
        writes: Mutex<usize>,
    }

    impl ArchivePort for MemoryArchive {
        fn load(&self, symbol: &Symbol) -> Result<Option<PriceSeries>, TrendscanError> {
            Ok(self.data.lock().unwrap().get(symbol).cloned())
        }

        fn store(&self, symbol: &Symbol, series: &PriceSeries) -> Result<(), TrendscanError> {
            *self.writes.lock().unwrap() += 1;
            self.data
                .lock()
                .unwrap()
                .insert(symbol.clone(), series.clone());
            Ok(())
        }
    }

    /// Serves bars from a fixed history, filtered to the requested range.
    struct FixedSource {
        bars: Vec<PriceBar>,
        calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    }

    impl FixedSource {
        fn new(bars: Vec<PriceBar>) -> Self {
            Self {
                bars,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl PriceSourcePort for FixedSource {
        fn fetch(
            &self,
            _symbol: &Symbol,
            start_date: NaiveDate,
            end_date: NaiveDate,
        ) -> Result<Vec<PriceBar>, TrendscanError> {
            self.calls.lock().unwrap().push((start_date, end_date));
            Ok(self
                .bars
                .iter()
                .filter(|b| b.date >= start_date && b.date <= end_date)
                .cloned()
                .collect())
        }
    }

    struct FailingSource;

    impl PriceSourcePort for FailingSource {
        fn fetch(
            &self,
            symbol: &Symbol,
            _start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<Vec<PriceBar>, TrendscanError> {
            Err(TrendscanError::SourceFetchFailed {
                symbol: symbol.display(),
                reason: "connection reset".into(),
            })
        }
    }

    #[test]
    fn first_fetch_persists_full_range() {
        let archive = MemoryArchive::default();
        let source = FixedSource::new(daily("2024-01-01", "2024-01-31", 10.0));
        let store = PriceHistoryStore::new(&archive, &source, d("2024-01-31"));
        let sym = Symbol::infer("aapl");

        let series = store
            .get_series(&sym, d("2024-01-10"), d("2024-01-20"), true)
            .unwrap();

        assert_eq!(series.len(), 11);
        let stored = archive.load(&sym).unwrap().unwrap();
        assert_eq!(stored.first_date(), Some(d("2024-01-10")));
        assert_eq!(stored.last_date(), Some(d("2024-01-20")));
    }

    #[test]
    fn newest_archived_day_is_refreshed() {
        let archive = MemoryArchive::default();
        let sym = Symbol::infer("aapl");
        let mut old = daily("2024-01-01", "2024-01-05", 10.0);
        // Stale intraday capture of the newest day.
        old.last_mut().unwrap().adjusted_close = 1.0;
        archive.store(&sym, &PriceSeries::new(old).unwrap()).unwrap();

        let source = FixedSource::new(daily("2024-01-01", "2024-01-08", 10.0));
        let store = PriceHistoryStore::new(&archive, &source, d("2024-01-08"));
        let series = store
            .get_series(&sym, d("2024-01-01"), d("2024-01-08"), true)
            .unwrap();

        assert_eq!(series.len(), 8);
        assert!(series.bars().iter().all(|b| b.adjusted_close == 10.0));
        assert_eq!(
            source.calls.lock().unwrap().as_slice(),
            &[(d("2024-01-05"), d("2024-01-08"))]
        );
    }

    #[test]
    fn backfill_requests_only_missing_prefix() {
        let archive = MemoryArchive::default();
        let sym = Symbol::infer("msft");
        archive
            .store(
                &sym,
                &PriceSeries::new(daily("2024-02-01", "2024-02-10", 5.0)).unwrap(),
            )
            .unwrap();

        let source = FixedSource::new(daily("2024-01-01", "2024-02-10", 5.0));
        let store = PriceHistoryStore::new(&archive, &source, d("2024-02-10"));
        store
            .get_series(&sym, d("2024-01-15"), d("2024-02-10"), true)
            .unwrap();

        let calls = source.calls.lock().unwrap().clone();
        assert_eq!(calls[0], (d("2024-01-15"), d("2024-01-31")));
        assert_eq!(calls[1], (d("2024-02-10"), d("2024-02-10")));

        let stored = archive.load(&sym).unwrap().unwrap();
        assert_eq!(stored.first_date(), Some(d("2024-01-15")));
        assert_eq!(stored.len(), 27);
    }

    #[test]
    fn returns_only_requested_subrange() {
        let archive = MemoryArchive::default();
        let sym = Symbol::infer("aapl");
        archive
            .store(
                &sym,
                &PriceSeries::new(daily("2024-01-01", "2024-03-01", 1.0)).unwrap(),
            )
            .unwrap();
        let source = FixedSource::new(daily("2024-01-01", "2024-03-05", 1.0));
        let store = PriceHistoryStore::new(&archive, &source, d("2024-03-05"));

        let series = store
            .get_series(&sym, d("2024-02-01"), d("2024-02-10"), true)
            .unwrap();
        assert_eq!(series.first_date(), Some(d("2024-02-01")));
        assert_eq!(series.last_date(), Some(d("2024-02-10")));
        // The archive still grew to today.
        assert_eq!(archive.load(&sym).unwrap().unwrap().last_date(), Some(d("2024-03-05")));
    }

    #[test]
    fn offline_read_without_archive_is_unavailable() {
        let archive = MemoryArchive::default();
        let source = FixedSource::new(Vec::new());
        let store = PriceHistoryStore::new(&archive, &source, d("2024-01-01"));

        let result = store.get_series(&Symbol::infer("aapl"), d("2023-01-01"), d("2024-01-01"), false);
        assert!(matches!(result, Err(TrendscanError::DataUnavailable { .. })));
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn offline_read_uses_archive_as_is() {
        let archive = MemoryArchive::default();
        let sym = Symbol::infer("aapl");
        archive
            .store(&sym, &PriceSeries::new(daily("2024-01-01", "2024-01-10", 3.0)).unwrap())
            .unwrap();
        let source = FixedSource::new(Vec::new());
        let store = PriceHistoryStore::new(&archive, &source, d("2024-06-01"));

        let series = store
            .get_series(&sym, d("2024-01-05"), d("2024-06-01"), false)
            .unwrap();
        assert_eq!(series.len(), 6);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_fetch_keeps_previous_archive() {
        let archive = MemoryArchive::default();
        let sym = Symbol::infer("aapl");
        let original = PriceSeries::new(daily("2024-01-01", "2024-01-10", 3.0)).unwrap();
        archive.store(&sym, &original).unwrap();

        let store = PriceHistoryStore::new(&archive, &FailingSource, d("2024-01-20"));
        let result = store.get_series(&sym, d("2024-01-01"), d("2024-01-20"), true);

        assert!(matches!(result, Err(TrendscanError::SourceFetchFailed { .. })));
        assert_eq!(archive.load(&sym).unwrap().unwrap(), original);
        assert_eq!(*archive.writes.lock().unwrap(), 1);
    }

    #[test]
    fn empty_source_for_unknown_symbol() {
        let archive = MemoryArchive::default();
        let source = FixedSource::new(Vec::new());
        let store = PriceHistoryStore::new(&archive, &source, d("2024-01-20"));

        let result = store.get_series(&Symbol::infer("zzzz"), d("2024-01-01"), d("2024-01-20"), true);
        assert!(matches!(result, Err(TrendscanError::DataUnavailable { .. })));
        assert_eq!(*archive.writes.lock().unwrap(), 0);
    }

    #[test]
    fn archive_range_reports_bounds() {
        let archive = MemoryArchive::default();
        let sym = Symbol::infer("aapl");
        let source = FixedSource::new(Vec::new());
        let store = PriceHistoryStore::new(&archive, &source, d("2024-01-20"));
        assert_eq!(store.archive_range(&sym).unwrap(), None);

        archive
            .store(&sym, &PriceSeries::new(daily("2024-01-01", "2024-01-10", 3.0)).unwrap())
            .unwrap();
        assert_eq!(
            store.archive_range(&sym).unwrap(),
            Some((d("2024-01-01"), d("2024-01-10"), 10))
        );
    }

    #[test]
    fn staleness_on_weekdays() {
        // 2024-01-10 is a Wednesday
        assert!(!is_stale(d("2024-01-10"), d("2024-01-10")));
        assert!(!is_stale(d("2024-01-09"), d("2024-01-10")));
        // Monday's archive misses Tuesday's bar
        assert!(is_stale(d("2024-01-08"), d("2024-01-10")));
        assert!(is_stale(d("2024-01-07"), d("2024-01-10")));
    }

    #[test]
    fn staleness_on_weekends() {
        // 2024-01-13 is a Saturday; Friday's close is fresh
        assert!(!is_stale(d("2024-01-12"), d("2024-01-13")));
        assert!(!is_stale(d("2024-01-11"), d("2024-01-13")));
        // Wednesday's archive misses Thursday and Friday
        assert!(is_stale(d("2024-01-10"), d("2024-01-13")));
        assert!(is_stale(d("2024-01-09"), d("2024-01-13")));
    }
}
