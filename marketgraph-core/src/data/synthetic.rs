//! Deterministic synthetic quotes for offline runs and demos.
//!
//! Each symbol loads on one of a few latent factors (picked from a BLAKE3
//! hash of its id) plus idiosyncratic noise, so the generated basket has
//! real co-movement structure for the analysis to recover. The same symbol
//! always produces the same series.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, DataProvider, DataSource};
use crate::domain::{PriceSample, PriceSeries};

/// Synthetic provider with a fixed number of latent factors.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    samples: usize,
    factors: usize,
    loading: f64,
    start: NaiveDateTime,
    interval: Duration,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap_or_default();
        Self {
            samples: 100,
            factors: 4,
            loading: 0.8,
            start,
            interval: Duration::minutes(15),
        }
    }
}

impl SyntheticProvider {
    pub fn new(samples: usize, factors: usize) -> Self {
        Self {
            samples,
            factors: factors.max(1),
            ..Self::default()
        }
    }

    /// Weight of the shared factor in each variation (0 = pure noise).
    pub fn with_loading(mut self, loading: f64) -> Self {
        self.loading = loading.clamp(0.0, 1.0);
        self
    }

    /// Latent factor index a symbol loads on.
    pub fn factor_of(&self, symbol: &str) -> usize {
        let hash = blake3::hash(symbol.as_bytes());
        let bytes = hash.as_bytes();
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        (u64::from_le_bytes(head) % self.factors as u64) as usize
    }

    fn factor_path(&self, factor: usize) -> Vec<f64> {
        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&(factor as u64).to_le_bytes());
        seed[8..16].copy_from_slice(b"mgfactor");
        let mut rng = StdRng::from_seed(seed);
        (0..self.samples).map(|_| gaussianish(&mut rng)).collect()
    }
}

/// Sum of uniforms: a bounded, roughly normal draw with unit variance.
fn gaussianish(rng: &mut StdRng) -> f64 {
    let sum: f64 = (0..12).map(|_| rng.gen_range(0.0..1.0)).sum();
    sum - 6.0
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        if symbol.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let factor = self.factor_path(self.factor_of(symbol));
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let idio = (1.0 - self.loading * self.loading).sqrt();
        let scale = rng.gen_range(0.2..1.0);
        let mut price = rng.gen_range(20.0..300.0);

        let samples = factor
            .iter()
            .enumerate()
            .map(|(t, f)| {
                let variation = scale * (self.loading * f + idio * gaussianish(&mut rng));
                let open = price;
                let close = open + variation;
                let wick = rng.gen_range(0.0..0.5) * scale;
                price = close;
                PriceSample {
                    timestamp: self.start + self.interval * t as i32,
                    open,
                    high: open.max(close) + wick,
                    low: open.min(close) - wick,
                    close,
                    volume: rng.gen_range(10_000.0..500_000.0_f64).round(),
                }
            })
            .collect();

        Ok(PriceSeries::new(symbol, samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_series_is_deterministic() {
        let provider = SyntheticProvider::new(30, 3);
        let a = provider.fetch("NYSE:XOM").unwrap();
        let b = provider.fetch("NYSE:XOM").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 30);
    }

    #[test]
    fn different_symbols_differ() {
        let provider = SyntheticProvider::default();
        let xom = provider.fetch("NYSE:XOM").unwrap();
        let cvx = provider.fetch("NYSE:CVX").unwrap();
        assert_ne!(xom.variations(), cvx.variations());
    }

    #[test]
    fn timestamps_advance_by_interval() {
        let provider = SyntheticProvider::new(3, 1);
        let series = provider.fetch("NYSE:KO").unwrap();
        let step = series.samples[1].timestamp - series.samples[0].timestamp;
        assert_eq!(step, Duration::minutes(15));
    }

    #[test]
    fn same_factor_symbols_co_move() {
        let provider = SyntheticProvider::new(200, 1).with_loading(0.95);
        let a = provider.fetch("NYSE:PEP").unwrap().variations();
        let b = provider.fetch("NYSE:KO").unwrap().variations();
        let corr = correlation(&a, &b);
        assert!(corr > 0.7, "expected strong co-movement, got {corr}");
    }

    fn correlation(a: &[f64], b: &[f64]) -> f64 {
        let n = a.len() as f64;
        let ma = a.iter().sum::<f64>() / n;
        let mb = b.iter().sum::<f64>() / n;
        let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
        let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
        let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
        cov / (va * vb).sqrt()
    }
}
