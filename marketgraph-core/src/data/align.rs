//! Stacking per-symbol series into the variation matrix.
//!
//! Rows follow the order of the input series (callers pass them in canonical
//! symbol order); columns are sample positions. Series are not re-indexed by
//! timestamp, so every series must already have the same length.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceSeries;

#[derive(Debug, Error, PartialEq)]
pub enum AlignError {
    #[error("no series to align")]
    Empty,

    #[error("series for '{symbol}' has {actual} samples, expected {expected}")]
    LengthMismatch {
        symbol: String,
        expected: usize,
        actual: usize,
    },
}

/// N_symbols × T matrix of close − open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationMatrix {
    pub symbols: Vec<String>,
    pub values: DMatrix<f64>,
}

impl VariationMatrix {
    pub fn n_symbols(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.values.ncols()
    }

    /// One symbol's variation row.
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.values.row(index).iter().copied().collect()
    }
}

/// Stack open and close columns and take close − open element-wise.
pub fn variation_matrix(series: &[PriceSeries]) -> Result<VariationMatrix, AlignError> {
    let first = series.first().ok_or(AlignError::Empty)?;
    let expected = first.len();

    for s in series {
        if s.len() != expected {
            return Err(AlignError::LengthMismatch {
                symbol: s.symbol.clone(),
                expected,
                actual: s.len(),
            });
        }
    }

    let n = series.len();
    let close = DMatrix::from_fn(n, expected, |i, t| series[i].samples[t].close);
    let open = DMatrix::from_fn(n, expected, |i, t| series[i].samples[t].open);

    Ok(VariationMatrix {
        symbols: series.iter().map(|s| s.symbol.clone()).collect(),
        values: close - open,
    })
}
