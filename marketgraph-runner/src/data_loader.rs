//! Quote loading for the pipeline.
//!
//! Each symbol of the universe is fetched through the retry wrapper in
//! canonical order. A symbol whose retries are exhausted is logged and
//! dropped; the run continues with the rest. After loading, series whose
//! length differs from the most common length are dropped too, since the
//! aligner does not re-index by timestamp.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marketgraph_core::data::{fetch_with_retry, DataProvider, DataSource, RetryPolicy};
use marketgraph_core::domain::{PriceSeries, SymbolTable};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("universe is empty")]
    EmptyUniverse,

    #[error("no symbol could be loaded ({skipped} skipped)")]
    NothingLoaded { skipped: usize },
}

/// Why a symbol was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// All fetch attempts failed; carries the last error message.
    FetchFailed(String),
    /// The provider returned no samples.
    Empty,
    /// Series length differs from the length shared by most symbols.
    LengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub id: String,
    pub reason: SkipReason,
}

/// Result of loading quotes, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Loaded symbols in canonical order.
    pub table: SymbolTable,
    /// One series per entry of `table`, same order, equal lengths.
    pub series: Vec<PriceSeries>,
    pub skipped: Vec<SkippedSymbol>,
    pub source: DataSource,
    /// Whether the quotes are synthetic rather than market data.
    pub has_synthetic: bool,
}

impl LoadedData {
    pub fn n_samples(&self) -> usize {
        self.series.first().map_or(0, PriceSeries::len)
    }
}

/// Fetch every symbol of `universe` from `provider`.
pub fn load_series(
    universe: &SymbolTable,
    provider: &dyn DataProvider,
    policy: &RetryPolicy,
) -> Result<LoadedData, LoadError> {
    if universe.is_empty() {
        return Err(LoadError::EmptyUniverse);
    }

    let mut fetched: Vec<PriceSeries> = Vec::with_capacity(universe.len());
    let mut skipped = Vec::new();

    for symbol in universe {
        info!("Fetching quote history for {}", symbol.id);
        match fetch_with_retry(provider, &symbol.id, policy) {
            Ok(series) if series.is_empty() => {
                warn!("skipping {}: provider returned no samples", symbol.id);
                skipped.push(SkippedSymbol {
                    id: symbol.id.clone(),
                    reason: SkipReason::Empty,
                });
            }
            Ok(mut series) => {
                let missing = series.missing_count();
                if missing > 0 {
                    warn!("{}: {missing} sample(s) with missing fields", symbol.id);
                }
                // providers may echo a differently-cased or bare ticker
                series.symbol = symbol.id.clone();
                fetched.push(series);
            }
            Err(e) => {
                warn!("skipping {}: {e}", symbol.id);
                skipped.push(SkippedSymbol {
                    id: symbol.id.clone(),
                    reason: SkipReason::FetchFailed(e.into_last().to_string()),
                });
            }
        }
    }

    if fetched.is_empty() {
        return Err(LoadError::NothingLoaded {
            skipped: skipped.len(),
        });
    }

    let expected = modal_length(&fetched);
    let (series, short): (Vec<_>, Vec<_>) =
        fetched.into_iter().partition(|s| s.len() == expected);
    for s in short {
        warn!(
            "skipping {}: {} samples, expected {expected}",
            s.symbol,
            s.len()
        );
        skipped.push(SkippedSymbol {
            id: s.symbol.clone(),
            reason: SkipReason::LengthMismatch {
                expected,
                actual: s.len(),
            },
        });
    }

    let table = universe.retain(|sym| series.iter().any(|s| s.symbol == sym.id));
    info!(
        "loaded {} of {} symbols ({} samples each)",
        table.len(),
        universe.len(),
        expected
    );

    let source = provider.source();
    Ok(LoadedData {
        table,
        series,
        skipped,
        source,
        has_synthetic: source == DataSource::Synthetic,
    })
}

/// Most common series length; ties go to the longer length.
fn modal_length(series: &[PriceSeries]) -> usize {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for s in series {
        *counts.entry(s.len()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map_or(0, |(len, _)| len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use marketgraph_core::data::DataError;
    use marketgraph_core::domain::PriceSample;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted provider: per-symbol failure count before success, and series length.
    struct ScriptedProvider {
        failures: HashMap<&'static str, u32>,
        lengths: HashMap<&'static str, usize>,
        calls: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                failures: HashMap::new(),
                lengths: HashMap::new(),
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn failing(mut self, symbol: &'static str, times: u32) -> Self {
            self.failures.insert(symbol, times);
            self
        }

        fn with_length(mut self, symbol: &'static str, len: usize) -> Self {
            self.lengths.insert(symbol, len);
            self
        }

        fn calls(&self, symbol: &str) -> u32 {
            self.calls.lock().unwrap().get(symbol).copied().unwrap_or(0)
        }
    }

    impl DataProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn source(&self) -> DataSource {
            DataSource::Fixture
        }

        fn fetch(&self, symbol: &str) -> Result<PriceSeries, DataError> {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(symbol.to_string()).or_default();
            *n += 1;
            if *n <= self.failures.get(symbol).copied().unwrap_or(0) {
                return Err(DataError::NetworkUnreachable(format!("attempt {n}")));
            }
            let len = self.lengths.get(symbol).copied().unwrap_or(10);
            let start = NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap();
            let samples = (0..len)
                .map(|t| PriceSample {
                    timestamp: start + Duration::minutes(15 * t as i64),
                    open: 10.0,
                    high: 11.0,
                    low: 9.0,
                    close: 10.0 + t as f64 * 0.1,
                    volume: 100.0,
                })
                .collect();
            Ok(PriceSeries::new(symbol, samples))
        }
    }

    fn universe() -> SymbolTable {
        SymbolTable::from_pairs([("X:A", "A"), ("X:B", "B"), ("X:C", "C")])
    }

    #[test]
    fn loads_all_symbols_in_canonical_order() {
        let provider = ScriptedProvider::new();
        let loaded = load_series(&universe(), &provider, &RetryPolicy::default()).unwrap();
        assert_eq!(loaded.table.ids(), vec!["X:A", "X:B", "X:C"]);
        let order: Vec<_> = loaded.series.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(order, vec!["X:A", "X:B", "X:C"]);
        assert!(loaded.skipped.is_empty());
        assert_eq!(loaded.n_samples(), 10);
        assert!(!loaded.has_synthetic);
    }

    #[test]
    fn permanently_failing_symbol_is_skipped() {
        let provider = ScriptedProvider::new().failing("X:B", 99);
        let loaded = load_series(&universe(), &provider, &RetryPolicy::new(3)).unwrap();

        assert_eq!(loaded.table.ids(), vec!["X:A", "X:C"]);
        assert_eq!(provider.calls("X:B"), 3);
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].id, "X:B");
        assert!(matches!(
            &loaded.skipped[0].reason,
            SkipReason::FetchFailed(msg) if msg.contains("attempt 3")
        ));
    }

    #[test]
    fn transient_failure_recovers() {
        let provider = ScriptedProvider::new().failing("X:A", 1);
        let loaded = load_series(&universe(), &provider, &RetryPolicy::new(2)).unwrap();
        assert_eq!(loaded.table.len(), 3);
        assert_eq!(provider.calls("X:A"), 2);
        assert_eq!(provider.calls("X:C"), 1);
    }

    #[test]
    fn odd_length_series_is_dropped() {
        let provider = ScriptedProvider::new().with_length("X:C", 7);
        let loaded = load_series(&universe(), &provider, &RetryPolicy::default()).unwrap();
        assert_eq!(loaded.table.ids(), vec!["X:A", "X:B"]);
        assert_eq!(
            loaded.skipped[0].reason,
            SkipReason::LengthMismatch {
                expected: 10,
                actual: 7
            }
        );
    }

    #[test]
    fn empty_series_is_skipped() {
        let provider = ScriptedProvider::new().with_length("X:A", 0);
        let loaded = load_series(&universe(), &provider, &RetryPolicy::default()).unwrap();
        assert_eq!(loaded.table.ids(), vec!["X:B", "X:C"]);
        assert_eq!(loaded.skipped[0].reason, SkipReason::Empty);
    }

    #[test]
    fn everything_failing_is_an_error() {
        let provider = ScriptedProvider::new()
            .failing("X:A", 9)
            .failing("X:B", 9)
            .failing("X:C", 9);
        let err = load_series(&universe(), &provider, &RetryPolicy::new(1)).unwrap_err();
        assert!(matches!(err, LoadError::NothingLoaded { skipped: 3 }));
    }

    #[test]
    fn modal_length_prefers_longer_on_tie() {
        let provider = ScriptedProvider::new().with_length("X:A", 4);
        let a = provider.fetch("X:A").unwrap();
        let b = provider.fetch("X:B").unwrap();
        assert_eq!(modal_length(&[a, b]), 10);
    }
}
