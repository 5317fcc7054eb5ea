//! Partial correlations, edge thresholding and node sizing.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("precision matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("precision diagonal entry {index} is not positive ({value})")]
    NonPositiveDiagonal { index: usize, value: f64 },

    #[error("{what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Visual parameters of the composed graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStyle {
    /// Edges are kept when |partial correlation| exceeds this.
    pub edge_threshold: f64,
    /// Distance between a node and its label anchor.
    pub label_offset: f64,
    pub node_scale: f64,
    pub edge_width_scale: f64,
    /// Fraction of the strongest edge weight that saturates the edge color.
    pub edge_color_ceiling: f64,
}

impl Default for GraphStyle {
    fn default() -> Self {
        Self {
            edge_threshold: 0.02,
            label_offset: 0.002,
            node_scale: 100.0,
            edge_width_scale: 15.0,
            edge_color_ceiling: 0.7,
        }
    }
}

impl GraphStyle {
    pub fn with_edge_threshold(mut self, threshold: f64) -> Self {
        self.edge_threshold = threshold;
        self
    }

    pub fn with_label_offset(mut self, offset: f64) -> Self {
        self.label_offset = offset;
        self
    }

    pub fn with_node_scale(mut self, scale: f64) -> Self {
        self.node_scale = scale;
        self
    }
}

fn check_precision(precision: &DMatrix<f64>) -> Result<(), LayoutError> {
    let (rows, cols) = precision.shape();
    if rows != cols {
        return Err(LayoutError::NotSquare { rows, cols });
    }
    for (index, &value) in precision.diagonal().iter().enumerate() {
        if !(value > 0.0 && value.is_finite()) {
            return Err(LayoutError::NonPositiveDiagonal { index, value });
        }
    }
    Ok(())
}

/// Scale the precision matrix by `1 / sqrt(P_ii · P_jj)`.
///
/// The diagonal of the result is 1. Off-diagonal signs are kept as they
/// appear in the precision matrix; only magnitudes matter downstream.
pub fn partial_correlations(precision: &DMatrix<f64>) -> Result<DMatrix<f64>, LayoutError> {
    check_precision(precision)?;
    let d: Vec<f64> = precision.diagonal().iter().map(|v| v.sqrt()).collect();
    Ok(DMatrix::from_fn(precision.nrows(), precision.ncols(), |i, j| {
        precision[(i, j)] / (d[i] * d[j])
    }))
}

/// Rendered node sizes: `node_scale / P_ii`, larger for higher marginal variance.
pub fn node_sizes(precision: &DMatrix<f64>, node_scale: f64) -> Result<Vec<f64>, LayoutError> {
    check_precision(precision)?;
    Ok(precision.diagonal().iter().map(|p| node_scale / p).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub i: usize,
    pub j: usize,
    /// Absolute partial correlation.
    pub weight: f64,
}

/// Upper-triangular edges (`i < j`) in row-major order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeSet {
    edges: Vec<Edge>,
}

impl EdgeSet {
    pub fn from_partial_correlations(partial: &DMatrix<f64>, threshold: f64) -> Self {
        let n = partial.nrows().min(partial.ncols());
        let mut edges = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let weight = partial[(i, j)].abs();
                if weight > threshold {
                    edges.push(Edge { i, j, weight });
                }
            }
        }
        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        self.edges.iter().any(|e| e.i == lo && e.j == hi)
    }

    pub fn max_weight(&self) -> f64 {
        self.edges.iter().fold(0.0, |m, e| m.max(e.weight))
    }
}
