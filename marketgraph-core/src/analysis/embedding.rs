//! Locally linear embedding into the plane.
//!
//! Uses an exact dense symmetric eigen-decomposition so identical input
//! always yields identical coordinates. Eigenvector signs are normalized so
//! the largest-magnitude entry is positive.
//!
//! Coordinates are entries of unit-norm eigenvectors and therefore lie in
//! [-1, 1]; label placement relies on this sub-unit scale.

use log::debug;
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EmbeddingError {
    #[error("need at least 3 points for a 2-D embedding, got {points}")]
    TooFewPoints { points: usize },

    #[error("neighborhood of point {index} is degenerate")]
    SingularNeighborhood { index: usize },

    #[error("embedding produced non-finite coordinates")]
    NonFinite,
}

/// Locally linear embedding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocallyLinearEmbedding {
    pub n_neighbors: usize,
    /// Tikhonov regularization of the local Gram matrices, relative to their trace.
    pub reg: f64,
}

impl Default for LocallyLinearEmbedding {
    fn default() -> Self {
        Self {
            n_neighbors: 6,
            reg: 1e-3,
        }
    }
}

/// One 2-D coordinate per symbol, in canonical symbol order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub coords: Vec<[f64; 2]>,
}

impl Embedding {
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.coords.iter().map(|c| c[0]).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.coords.iter().map(|c| c[1]).collect()
    }
}

impl LocallyLinearEmbedding {
    /// Embed the rows of `points` (one row per symbol).
    pub fn fit_transform(&self, points: &DMatrix<f64>) -> Result<Embedding, EmbeddingError> {
        let n = points.nrows();
        if n < 3 {
            return Err(EmbeddingError::TooFewPoints { points: n });
        }

        let k = self.n_neighbors.clamp(1, n - 1);
        if k != self.n_neighbors {
            debug!("clamping n_neighbors from {} to {k} for {n} points", self.n_neighbors);
        }

        let weights = self.barycenter_weights(points, k)?;
        let residual = DMatrix::<f64>::identity(n, n) - weights;
        let m = residual.transpose() * &residual;

        let eig = SymmetricEigen::new(m);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            eig.eigenvalues[a]
                .total_cmp(&eig.eigenvalues[b])
                .then(a.cmp(&b))
        });

        // the bottom eigenvector is the constant one; skip it
        let first = normalized_sign(eig.eigenvectors.column(order[1]).clone_owned());
        let second = normalized_sign(eig.eigenvectors.column(order[2]).clone_owned());

        let coords: Vec<[f64; 2]> = (0..n).map(|i| [first[i], second[i]]).collect();
        if coords.iter().flatten().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite);
        }

        Ok(Embedding { coords })
    }

    /// Row-stochastic reconstruction weights of each point from its `k` nearest neighbors.
    fn barycenter_weights(
        &self,
        points: &DMatrix<f64>,
        k: usize,
    ) -> Result<DMatrix<f64>, EmbeddingError> {
        let n = points.nrows();
        let mut weights = DMatrix::<f64>::zeros(n, n);

        for i in 0..n {
            let neighbors = nearest_neighbors(points, i, k);
            let center = points.row(i);
            let local = DMatrix::from_fn(k, points.ncols(), |r, c| {
                points[(neighbors[r], c)] - center[c]
            });

            let mut gram = &local * local.transpose();
            let trace = gram.trace();
            let ridge = if trace > 0.0 { self.reg * trace } else { self.reg };
            for d in 0..k {
                gram[(d, d)] += ridge;
            }

            let w = gram
                .lu()
                .solve(&DVector::from_element(k, 1.0))
                .ok_or(EmbeddingError::SingularNeighborhood { index: i })?;
            let total = w.sum();
            if total == 0.0 || !total.is_finite() {
                return Err(EmbeddingError::SingularNeighborhood { index: i });
            }
            for (slot, &j) in neighbors.iter().enumerate() {
                weights[(i, j)] = w[slot] / total;
            }
        }

        Ok(weights)
    }
}

/// The `k` rows closest to row `i` (excluding `i`), ties broken by lower index.
fn nearest_neighbors(points: &DMatrix<f64>, i: usize, k: usize) -> Vec<usize> {
    let mut candidates: Vec<(f64, usize)> = (0..points.nrows())
        .filter(|&j| j != i)
        .map(|j| ((points.row(j) - points.row(i)).norm_squared(), j))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    candidates.into_iter().take(k).map(|(_, j)| j).collect()
}

fn normalized_sign(mut v: DVector<f64>) -> DVector<f64> {
    let pivot = v.iter().fold(0.0_f64, |best, x| {
        if x.abs() > best.abs() {
            *x
        } else {
            best
        }
    });
    if pivot < 0.0 {
        v.neg_mut();
    }
    v
}
