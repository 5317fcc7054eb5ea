//! Exemplar clustering by affinity propagation.
//!
//! Similarities are the learned covariance entries; every symbol's
//! preference is the median similarity, so the number of clusters falls out
//! of the data. Symbols with no covariance to any other symbol are their own
//! exemplars and are kept out of the message passing, where their exact-zero
//! similarities would otherwise tie with the preference.

use log::{debug, warn};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relative magnitude below which a similarity counts as zero.
const ISOLATION_EPS: f64 = 1e-12;

#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    #[error("similarity matrix is empty")]
    Empty,

    #[error("similarity matrix must be square, got {rows}×{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("similarity matrix contains non-finite values")]
    NonFinite,
}

/// Affinity propagation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffinityPropagation {
    pub damping: f64,
    pub max_iter: usize,
    /// Iterations with an unchanged exemplar set required to stop.
    pub convergence_iter: usize,
    /// Seed for the tie-breaking jitter.
    pub seed: u64,
}

impl Default for AffinityPropagation {
    fn default() -> Self {
        Self {
            damping: 0.5,
            max_iter: 200,
            convergence_iter: 15,
            seed: 0,
        }
    }
}

/// Cluster label per symbol, in canonical symbol order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    /// `labels[i]` is the cluster of symbol `i`; labels are `0..n_clusters`.
    pub labels: Vec<usize>,
    /// `exemplars[label]` is the symbol index representing that cluster.
    pub exemplars: Vec<usize>,
    pub converged: bool,
}

impl ClusterAssignment {
    pub fn n_clusters(&self) -> usize {
        self.exemplars.len()
    }

    pub fn max_label(&self) -> usize {
        self.labels.iter().copied().max().unwrap_or(0)
    }

    /// Symbol indices in cluster `label`.
    pub fn members(&self, label: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Position of `label` on a [0, 1] color ramp.
    pub fn color_fraction(&self, label: usize) -> f64 {
        let max = self.max_label();
        if max == 0 {
            0.0
        } else {
            label as f64 / max as f64
        }
    }
}

struct Propagated {
    /// Local exemplar index of every point, if any exemplar emerged.
    exemplar_of: Option<Vec<usize>>,
    converged: bool,
    iterations: usize,
}

impl AffinityPropagation {
    pub fn fit(&self, similarity: &DMatrix<f64>) -> Result<ClusterAssignment, ClusterError> {
        let (rows, cols) = similarity.shape();
        if rows != cols {
            return Err(ClusterError::NotSquare { rows, cols });
        }
        if rows == 0 {
            return Err(ClusterError::Empty);
        }
        if !similarity.iter().all(|v| v.is_finite()) {
            return Err(ClusterError::NonFinite);
        }

        let n = rows;
        if n == 1 {
            return Ok(ClusterAssignment {
                labels: vec![0],
                exemplars: vec![0],
                converged: true,
            });
        }

        let preference = median(similarity.iter().copied());
        let scale = similarity.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let isolated: Vec<bool> = (0..n)
            .map(|i| (0..n).all(|j| j == i || similarity[(i, j)].abs() <= ISOLATION_EPS * scale))
            .collect();

        let mut exemplar_of: Vec<usize> = (0..n).collect();
        let active: Vec<usize> = (0..n).filter(|&i| !isolated[i]).collect();
        let mut converged = true;

        if active.len() >= 2 {
            let sub = similarity.select_rows(&active).select_columns(&active);
            let outcome = self.propagate(&sub, preference);
            converged = outcome.converged;
            if !converged {
                warn!(
                    "affinity propagation did not converge after {} iterations",
                    outcome.iterations
                );
            } else {
                debug!("affinity propagation converged after {} iterations", outcome.iterations);
            }
            match outcome.exemplar_of {
                Some(local) => {
                    for (pos, &global) in active.iter().enumerate() {
                        exemplar_of[global] = active[local[pos]];
                    }
                }
                None => warn!("no exemplars emerged; every symbol is its own cluster"),
            }
        }

        let mut exemplars = exemplar_of.clone();
        exemplars.sort_unstable();
        exemplars.dedup();
        let labels = exemplar_of
            .iter()
            .map(|e| exemplars.binary_search(e).unwrap_or(0))
            .collect();

        Ok(ClusterAssignment {
            labels,
            exemplars,
            converged,
        })
    }

    fn propagate(&self, similarity: &DMatrix<f64>, preference: f64) -> Propagated {
        let n = similarity.nrows();
        let damping = self.damping;
        let window = self.convergence_iter.max(1);

        let mut s = similarity.clone();
        s.fill_diagonal(preference);
        let mut rng = StdRng::seed_from_u64(self.seed);
        for v in s.iter_mut() {
            *v += (f64::EPSILON * *v + f64::MIN_POSITIVE * 100.0) * rng.gen_range(-1.0..1.0);
        }

        let mut r = DMatrix::<f64>::zeros(n, n);
        let mut a = DMatrix::<f64>::zeros(n, n);
        let mut history = vec![vec![false; n]; window];
        let mut exemplar = vec![false; n];
        let mut converged = false;
        let mut iterations = 0;

        for it in 0..self.max_iter {
            iterations = it + 1;

            // Responsibilities
            for i in 0..n {
                let (mut first, mut first_idx, mut second) = (f64::NEG_INFINITY, 0, f64::NEG_INFINITY);
                for k in 0..n {
                    let v = a[(i, k)] + s[(i, k)];
                    if v > first {
                        second = first;
                        first = v;
                        first_idx = k;
                    } else if v > second {
                        second = v;
                    }
                }
                for k in 0..n {
                    let competing = if k == first_idx { second } else { first };
                    let update = s[(i, k)] - competing;
                    r[(i, k)] = damping * r[(i, k)] + (1.0 - damping) * update;
                }
            }

            // Availabilities
            for k in 0..n {
                let positive = |i: usize| if i == k { r[(i, k)] } else { r[(i, k)].max(0.0) };
                let column_sum: f64 = (0..n).map(positive).sum();
                for i in 0..n {
                    let rest = column_sum - positive(i);
                    let update = if i == k { rest } else { rest.min(0.0) };
                    a[(i, k)] = damping * a[(i, k)] + (1.0 - damping) * update;
                }
            }

            for k in 0..n {
                exemplar[k] = a[(k, k)] + r[(k, k)] > 0.0;
            }
            history[it % window] = exemplar.clone();

            if it >= window {
                let stable = (0..n).all(|k| {
                    let hits = history.iter().filter(|e| e[k]).count();
                    hits == 0 || hits == window
                });
                if stable && exemplar.iter().any(|e| *e) {
                    converged = true;
                    break;
                }
            }
        }

        Propagated {
            exemplar_of: assign(&s, &exemplar),
            converged,
            iterations,
        }
    }
}

/// Assign every point to its most similar exemplar, then move each exemplar
/// to the member with the highest total similarity to its cluster.
fn assign(s: &DMatrix<f64>, exemplar: &[bool]) -> Option<Vec<usize>> {
    let n = s.nrows();
    let mut centers: Vec<usize> = (0..n).filter(|&k| exemplar[k]).collect();
    if centers.is_empty() {
        return None;
    }

    let nearest = |centers: &[usize]| -> Vec<usize> {
        (0..n)
            .map(|i| {
                if let Some(pos) = centers.iter().position(|&c| c == i) {
                    return pos;
                }
                argmax(centers.iter().map(|&c| s[(i, c)]))
            })
            .collect()
    };

    let cluster_of = nearest(&centers);
    for (k, center) in centers.iter_mut().enumerate() {
        let members: Vec<usize> = (0..n).filter(|&i| cluster_of[i] == k).collect();
        let best = argmax(
            members
                .iter()
                .map(|&j| members.iter().map(|&i| s[(i, j)]).sum::<f64>()),
        );
        *center = members[best];
    }

    let cluster_of = nearest(&centers);
    Some(cluster_of.into_iter().map(|k| centers[k]).collect())
}

/// Index of the first maximum.
fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best_value = v;
            best = i;
        }
    }
    best
}

/// Median; the mean of the two middle values for an even count.
pub fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_similarity() -> DMatrix<f64> {
        // two tight groups {0,1,2} and {3,4,5}, no exact ties
        DMatrix::from_fn(6, 6, |i, j| {
            let gap = (i as f64 - j as f64).abs();
            if i == j {
                1.0
            } else if (i < 3) == (j < 3) {
                0.8 - 0.05 * gap
            } else {
                0.1 - 0.01 * gap
            }
        })
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median([3.0, 1.0, 2.0].into_iter()), 2.0);
        assert_eq!(median([4.0, 1.0, 3.0, 2.0].into_iter()), 2.5);
    }

    #[test]
    fn recovers_two_blocks() {
        let result = AffinityPropagation::default().fit(&block_similarity()).unwrap();
        assert_eq!(result.n_clusters(), 2);
        assert_eq!(result.labels, vec![0, 0, 0, 1, 1, 1]);
        assert!(result.converged);
    }

    #[test]
    fn isolated_symbols_are_singletons() {
        let mut s = DMatrix::<f64>::identity(5, 5);
        s[(0, 1)] = 0.6;
        s[(1, 0)] = 0.6;
        let result = AffinityPropagation::default().fit(&s).unwrap();
        let (l2, l3, l4) = (result.labels[2], result.labels[3], result.labels[4]);
        assert!(l2 != l3 && l3 != l4 && l2 != l4);
        for isolated in [2, 3, 4] {
            assert_eq!(result.members(result.labels[isolated]), vec![isolated]);
        }
    }

    #[test]
    fn labels_are_gapless() {
        let result = AffinityPropagation::default().fit(&block_similarity()).unwrap();
        let max = result.max_label();
        for label in 0..=max {
            assert!(!result.members(label).is_empty());
        }
        assert_eq!(result.exemplars.len(), max + 1);
    }

    #[test]
    fn same_input_same_output() {
        let ap = AffinityPropagation::default();
        let a = ap.fit(&block_similarity()).unwrap();
        let b = ap.fit(&block_similarity()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_symbol_is_one_cluster() {
        let result = AffinityPropagation::default()
            .fit(&DMatrix::from_element(1, 1, 1.0))
            .unwrap();
        assert_eq!(result.labels, vec![0]);
    }

    #[test]
    fn rejects_bad_shapes() {
        let err = AffinityPropagation::default()
            .fit(&DMatrix::zeros(2, 3))
            .unwrap_err();
        assert_eq!(err, ClusterError::NotSquare { rows: 2, cols: 3 });
    }

    #[test]
    fn color_fraction_spans_unit_interval() {
        let result = AffinityPropagation::default().fit(&block_similarity()).unwrap();
        assert_eq!(result.color_fraction(0), 0.0);
        assert_eq!(result.color_fraction(result.max_label()), 1.0);
    }
}
