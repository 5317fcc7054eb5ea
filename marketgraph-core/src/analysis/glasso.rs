//! Sparse inverse covariance estimation (graphical lasso).
//!
//! Coordinate-descent graphical lasso plus a cross-validated search for
//! the l1 penalty:
//! - contiguous K-fold split of the samples
//! - log-spaced alpha grid from `alpha_max` down to `0.01 · alpha_max`
//! - warm-started path per fold, scored by held-out log-likelihood
//! - repeated grid refinement around the best alpha
//! - final refit on all samples at the selected alpha

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::covariance::{alpha_max, empirical_covariance, inverse_spd, log_likelihood};

#[derive(Debug, Error, PartialEq)]
pub enum GlassoError {
    #[error("need at least {required} samples and 2 symbols, got {samples} samples × {features} symbols")]
    InsufficientSamples {
        samples: usize,
        features: usize,
        required: usize,
    },

    #[error("graphical lasso produced no valid precision matrix at alpha = {alpha}")]
    NonConvergence { alpha: f64 },

    #[error("no alpha on the cross-validation path produced a finite score")]
    NoFiniteScore,
}

/// Single-penalty solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphicalLasso {
    pub alpha: f64,
    /// Dual-gap tolerance for the outer loop.
    pub tol: f64,
    /// Relative-change tolerance for each lasso sub-problem.
    pub enet_tol: f64,
    pub max_iter: usize,
}

impl Default for GraphicalLasso {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            tol: 1e-4,
            enet_tol: 1e-4,
            max_iter: 100,
        }
    }
}

/// Covariance and precision estimated at one penalty.
#[derive(Debug, Clone)]
pub struct GlassoFit {
    pub covariance: DMatrix<f64>,
    pub precision: DMatrix<f64>,
    pub n_iter: usize,
    pub dual_gap: f64,
    pub converged: bool,
}

impl GraphicalLasso {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn fit(&self, emp_cov: &DMatrix<f64>) -> Result<GlassoFit, GlassoError> {
        self.fit_from(emp_cov, None)
    }

    /// Fit starting from `init` (a previous covariance estimate) if given.
    pub fn fit_from(
        &self,
        emp_cov: &DMatrix<f64>,
        init: Option<&DMatrix<f64>>,
    ) -> Result<GlassoFit, GlassoError> {
        let p = emp_cov.nrows();
        let alpha = self.alpha;

        if alpha == 0.0 {
            let precision =
                inverse_spd(emp_cov).ok_or(GlassoError::NonConvergence { alpha })?;
            return Ok(GlassoFit {
                covariance: emp_cov.clone(),
                precision,
                n_iter: 0,
                dual_gap: 0.0,
                converged: true,
            });
        }

        let mut cov = init.unwrap_or(emp_cov) * 0.95;
        cov.set_diagonal(&emp_cov.diagonal());
        let mut prec = inverse_spd(&cov).ok_or(GlassoError::NonConvergence { alpha })?;

        let mut dual_gap = f64::INFINITY;
        let mut n_iter = 0;
        let mut converged = false;

        while n_iter < self.max_iter {
            n_iter += 1;
            for idx in 0..p {
                let others: Vec<usize> = (0..p).filter(|&k| k != idx).collect();
                let sub = cov.select_rows(&others).select_columns(&others);
                let row = DVector::from_iterator(p - 1, others.iter().map(|&k| emp_cov[(idx, k)]));

                let denom = prec[(idx, idx)] + 1000.0 * f64::EPSILON;
                let mut coefs =
                    DVector::from_iterator(p - 1, others.iter().map(|&k| -prec[(k, idx)] / denom));
                lasso_gram_cd(&sub, &row, alpha, &mut coefs, self.max_iter, self.enet_tol);

                let cross: f64 = others
                    .iter()
                    .zip(coefs.iter())
                    .map(|(&k, c)| cov[(k, idx)] * c)
                    .sum();
                let pii = 1.0 / (cov[(idx, idx)] - cross);
                prec[(idx, idx)] = pii;
                for (&k, c) in others.iter().zip(coefs.iter()) {
                    prec[(k, idx)] = -pii * c;
                    prec[(idx, k)] = -pii * c;
                }

                let updated = &sub * &coefs;
                for (&k, v) in others.iter().zip(updated.iter()) {
                    cov[(idx, k)] = *v;
                    cov[(k, idx)] = *v;
                }
            }

            if !prec.iter().all(|v| v.is_finite()) {
                return Err(GlassoError::NonConvergence { alpha });
            }

            dual_gap = dual_gap_of(emp_cov, &prec, alpha);
            if dual_gap.abs() < self.tol {
                converged = true;
                break;
            }
        }

        Ok(GlassoFit {
            covariance: cov,
            precision: prec,
            n_iter,
            dual_gap,
            converged,
        })
    }
}

/// Duality gap of the graphical lasso objective.
pub fn dual_gap_of(emp_cov: &DMatrix<f64>, precision: &DMatrix<f64>, alpha: f64) -> f64 {
    let p = precision.nrows() as f64;
    let mut gap = emp_cov.component_mul(precision).sum() - p;
    let off_diag: f64 = precision.iter().map(|v| v.abs()).sum::<f64>()
        - precision.diagonal().iter().map(|v| v.abs()).sum::<f64>();
    gap += alpha * off_diag;
    gap
}

/// Minimize `½ wᵀQw − qᵀw + α‖w‖₁` by cyclic coordinate descent, in place.
fn lasso_gram_cd(
    q_mat: &DMatrix<f64>,
    q_vec: &DVector<f64>,
    alpha: f64,
    w: &mut DVector<f64>,
    max_iter: usize,
    tol: f64,
) {
    let k = q_vec.len();
    for _ in 0..max_iter {
        let mut w_max = 0.0_f64;
        let mut d_w_max = 0.0_f64;

        for ii in 0..k {
            let qii = q_mat[(ii, ii)];
            if qii == 0.0 {
                continue;
            }
            let old = w[ii];
            let mut tmp = q_vec[ii];
            for j in 0..k {
                if j != ii {
                    tmp -= q_mat[(ii, j)] * w[j];
                }
            }
            w[ii] = tmp.signum() * (tmp.abs() - alpha).max(0.0) / qii;

            d_w_max = d_w_max.max((w[ii] - old).abs());
            w_max = w_max.max(w[ii].abs());
        }

        if w_max == 0.0 || d_w_max / w_max < tol {
            break;
        }
    }
}

// ─── Cross-validation ───────────────────────────────────────────────

/// Cross-validated penalty selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphicalLassoCv {
    pub folds: usize,
    pub n_alphas: usize,
    pub n_refinements: usize,
    pub tol: f64,
    pub enet_tol: f64,
    pub max_iter: usize,
}

impl Default for GraphicalLassoCv {
    fn default() -> Self {
        Self {
            folds: 3,
            n_alphas: 4,
            n_refinements: 4,
            tol: 1e-4,
            enet_tol: 1e-4,
            max_iter: 100,
        }
    }
}

/// Mean held-out score of one alpha. `None` when no fold scored finitely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvPoint {
    pub alpha: f64,
    pub score: Option<f64>,
}

/// Result of a cross-validated fit.
#[derive(Debug, Clone)]
pub struct CvFit {
    pub alpha: f64,
    pub covariance: DMatrix<f64>,
    pub precision: DMatrix<f64>,
    /// Every alpha visited, in descending order.
    pub path: Vec<CvPoint>,
    pub converged: bool,
}

impl GraphicalLassoCv {
    fn solver(&self, max_iter: usize) -> GraphicalLasso {
        GraphicalLasso {
            alpha: 0.0,
            tol: self.tol,
            enet_tol: self.enet_tol,
            max_iter,
        }
    }

    /// Select alpha on `x` (samples × symbols) and refit on all samples.
    pub fn fit(&self, x: &DMatrix<f64>) -> Result<CvFit, GlassoError> {
        let (n, p) = x.shape();
        let required = self.folds.max(2);
        if n < required || p < 2 {
            return Err(GlassoError::InsufficientSamples {
                samples: n,
                features: p,
                required,
            });
        }

        let emp_cov = empirical_covariance(x);
        let top = alpha_max(&emp_cov);
        if top <= 0.0 {
            debug!("empirical covariance is diagonal, skipping alpha search");
            let fit = self.solver(self.max_iter).with_alpha(0.0).fit(&emp_cov)?;
            return Ok(CvFit {
                alpha: 0.0,
                covariance: fit.covariance,
                precision: fit.precision,
                path: Vec::new(),
                converged: true,
            });
        }

        let folds = contiguous_folds(n, self.folds);
        let n_alphas = self.n_alphas.max(2);
        let mut alphas = logspace(top, 0.01 * top, n_alphas);
        let mut path: Vec<(f64, f64)> = Vec::new();
        let mut best_index = 0;

        for round in 0..self.n_refinements.max(1) {
            let scores = self.score_alphas(x, &folds, &alphas);
            path.extend(alphas.iter().copied().zip(scores));
            path.sort_by(|a, b| b.0.total_cmp(&a.0));

            let mut best_score = f64::NEG_INFINITY;
            let mut last_finite = 0;
            best_index = 0;
            for (i, &(_, score)) in path.iter().enumerate() {
                let score = if score >= 0.1 / f64::EPSILON {
                    f64::NAN
                } else {
                    score
                };
                if score.is_finite() {
                    last_finite = i;
                }
                if score >= best_score {
                    best_score = score;
                    best_index = i;
                }
            }

            let last = path.len() - 1;
            let (upper, lower) = if best_index == 0 {
                (path[0].0, path[1].0)
            } else if best_index == last_finite && best_index != last {
                (path[best_index].0, path[best_index + 1].0)
            } else if best_index == last {
                (path[best_index].0, 0.01 * path[best_index].0)
            } else {
                (path[best_index - 1].0, path[best_index + 1].0)
            };

            debug!(
                "refinement {}: best alpha {:.5} (score {:.4})",
                round + 1,
                path[best_index].0,
                best_score
            );

            let grid = logspace(upper, lower, n_alphas + 2);
            alphas = grid[1..grid.len() - 1].to_vec();
        }

        if path.iter().all(|(_, s)| !s.is_finite()) {
            return Err(GlassoError::NoFiniteScore);
        }

        let alpha = path[best_index].0;
        let fit = self.solver(self.max_iter).with_alpha(alpha).fit(&emp_cov)?;
        if !fit.converged {
            warn!(
                "graphical lasso stopped at max_iter={} with dual gap {:.3e} (alpha = {alpha:.5})",
                self.max_iter, fit.dual_gap
            );
        }

        Ok(CvFit {
            alpha,
            covariance: fit.covariance,
            precision: fit.precision,
            path: path
                .into_iter()
                .map(|(alpha, score)| CvPoint {
                    alpha,
                    score: score.is_finite().then_some(score),
                })
                .collect(),
            converged: fit.converged,
        })
    }

    /// Mean held-out log-likelihood of each alpha across folds.
    fn score_alphas(&self, x: &DMatrix<f64>, folds: &[(usize, usize)], alphas: &[f64]) -> Vec<f64> {
        let solver = self.solver((self.max_iter / 10).max(1));
        let mut totals = vec![0.0; alphas.len()];

        for &(start, end) in folds {
            let train: Vec<usize> = (0..x.nrows()).filter(|t| *t < start || *t >= end).collect();
            let test: Vec<usize> = (start..end).collect();
            let train_cov = empirical_covariance(&x.select_rows(&train));
            let test_cov = empirical_covariance(&x.select_rows(&test));

            let mut warm = train_cov.clone();
            for (slot, &alpha) in totals.iter_mut().zip(alphas) {
                let score = match solver.with_alpha(alpha).fit_from(&train_cov, Some(&warm)) {
                    Ok(fit) => {
                        let s = log_likelihood(&test_cov, &fit.precision);
                        warm = fit.covariance;
                        s
                    }
                    Err(_) => f64::NEG_INFINITY,
                };
                *slot += if score.is_finite() {
                    score
                } else {
                    f64::NEG_INFINITY
                };
            }
        }

        let k = folds.len() as f64;
        totals.into_iter().map(|t| t / k).collect()
    }
}

/// `[start, end)` ranges of K contiguous folds; the first `n mod k` folds get one extra sample.
pub fn contiguous_folds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let k = k.clamp(1, n.max(1));
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = n / k + usize::from(i < n % k);
        folds.push((start, start + size));
        start += size;
    }
    folds
}

/// `count` values log-spaced from `from` to `to` inclusive.
pub fn logspace(from: f64, to: f64, count: usize) -> Vec<f64> {
    let (a, b) = (from.log10(), to.log10());
    match count {
        0 => Vec::new(),
        1 => vec![from],
        _ => (0..count)
            .map(|i| 10f64.powf(a + (b - a) * i as f64 / (count - 1) as f64))
            .collect(),
    }
}
