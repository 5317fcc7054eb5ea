//! Per-symbol intraday price series.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Value used in place of a missing numeric field.
///
/// Missing fields are filled rather than dropped so that every series keeps
/// its full length and the series can be stacked into a matrix.
pub const MISSING_SENTINEL: f64 = -1.0;

/// One sampling bucket of OHLCV data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceSample {
    /// Close minus open for this bucket.
    pub fn variation(&self) -> f64 {
        self.close - self.open
    }

    /// True if any numeric field carries the missing-value sentinel.
    pub fn has_missing(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .any(|v| *v == MISSING_SENTINEL)
    }
}

/// Ordered samples for one symbol at a fixed sampling interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, samples: Vec<PriceSample>) -> Self {
        Self {
            symbol: symbol.into(),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.open).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.close).collect()
    }

    pub fn variations(&self) -> Vec<f64> {
        self.samples.iter().map(PriceSample::variation).collect()
    }

    /// Number of samples with at least one sentinel-filled field.
    pub fn missing_count(&self) -> usize {
        self.samples.iter().filter(|s| s.has_missing()).count()
    }
}
