//! Column-wise variance normalization.
//!
//! The variation matrix is transposed to T × N and each column divided by
//! its population standard deviation. Columns are not centered.

use nalgebra::DMatrix;
use thiserror::Error;

use crate::data::VariationMatrix;

#[derive(Debug, Error, PartialEq)]
pub enum StandardizeError {
    #[error("symbol '{symbol}' (column {index}) has zero or non-finite variance")]
    DegenerateColumn { index: usize, symbol: String },

    #[error("need at least one sample, got an empty matrix")]
    Empty,
}

/// T × N matrix with unit-variance columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedVariation {
    pub symbols: Vec<String>,
    pub values: DMatrix<f64>,
}

impl StandardizedVariation {
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_symbols(&self) -> usize {
        self.values.ncols()
    }

    /// N × T view: one row per symbol, one feature per time bucket.
    pub fn points(&self) -> DMatrix<f64> {
        self.values.transpose()
    }
}

/// Population standard deviation (divides by the count).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

pub fn standardize(variation: &VariationMatrix) -> Result<StandardizedVariation, StandardizeError> {
    if variation.values.is_empty() {
        return Err(StandardizeError::Empty);
    }

    let mut values = variation.values.transpose();
    for (index, mut column) in values.column_iter_mut().enumerate() {
        let std = population_std(column.as_slice());
        if !std.is_finite() || std == 0.0 {
            return Err(StandardizeError::DegenerateColumn {
                index,
                symbol: variation.symbols.get(index).cloned().unwrap_or_default(),
            });
        }
        column /= std;
    }

    Ok(StandardizedVariation {
        symbols: variation.symbols.clone(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variation(rows: &[&[f64]]) -> VariationMatrix {
        let n = rows.len();
        let t = rows[0].len();
        VariationMatrix {
            symbols: (0..n).map(|i| format!("S{i}")).collect(),
            values: DMatrix::from_fn(n, t, |i, j| rows[i][j]),
        }
    }

    #[test]
    fn columns_have_unit_std() {
        let v = variation(&[&[1.0, 2.0, 3.0, 4.0], &[10.0, -10.0, 5.0, 0.0]]);
        let x = standardize(&v).unwrap();
        assert_eq!(x.n_samples(), 4);
        assert_eq!(x.n_symbols(), 2);
        for col in x.values.column_iter() {
            let std = population_std(col.as_slice());
            assert!((std - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn mean_is_not_removed() {
        let v = variation(&[&[2.0, 4.0]]);
        let x = standardize(&v).unwrap();
        // std of [2, 4] is 1, so values are unchanged
        assert_eq!(x.values[(0, 0)], 2.0);
        assert_eq!(x.values[(1, 0)], 4.0);
    }

    #[test]
    fn constant_column_is_degenerate() {
        let v = variation(&[&[1.0, 2.0, 3.0], &[0.5, 0.5, 0.5]]);
        let err = standardize(&v).unwrap_err();
        assert_eq!(
            err,
            StandardizeError::DegenerateColumn {
                index: 1,
                symbol: "S1".into()
            }
        );
    }
}
