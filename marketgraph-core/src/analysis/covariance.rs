//! Empirical covariance and Gaussian log-likelihood helpers.

use nalgebra::{Cholesky, DMatrix};

/// Maximum-likelihood covariance of the rows of `x` (samples × features).
///
/// Columns are centered; the sum of products is divided by the sample count.
pub fn empirical_covariance(x: &DMatrix<f64>) -> DMatrix<f64> {
    let n = x.nrows();
    if n == 0 {
        return DMatrix::zeros(x.ncols(), x.ncols());
    }
    let mut centered = x.clone();
    for mut column in centered.column_iter_mut() {
        let mean = column.mean();
        column.add_scalar_mut(-mean);
    }
    (centered.transpose() * &centered) / n as f64
}

/// log det of a symmetric matrix, or `None` if it is not positive definite.
pub fn log_det(m: &DMatrix<f64>) -> Option<f64> {
    let chol = Cholesky::new(m.clone())?;
    let diag = chol.l_dirty().diagonal();
    let value = 2.0 * diag.iter().map(|d| d.ln()).sum::<f64>();
    value.is_finite().then_some(value)
}

/// Gaussian log-likelihood of data with empirical covariance `emp_cov` under `precision`.
///
/// Returns `-inf` when the precision is not positive definite.
pub fn log_likelihood(emp_cov: &DMatrix<f64>, precision: &DMatrix<f64>) -> f64 {
    let Some(logdet) = log_det(precision) else {
        return f64::NEG_INFINITY;
    };
    let p = precision.nrows() as f64;
    let trace = emp_cov.component_mul(precision).sum();
    (-trace + logdet - p * (2.0 * std::f64::consts::PI).ln()) / 2.0
}

/// Largest absolute off-diagonal entry: the smallest penalty that zeroes every off-diagonal coefficient.
pub fn alpha_max(emp_cov: &DMatrix<f64>) -> f64 {
    let n = emp_cov.nrows();
    let mut max = 0.0_f64;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                max = max.max(emp_cov[(i, j)].abs());
            }
        }
    }
    max
}

/// Inverse of a symmetric positive-definite matrix, falling back to LU.
pub fn inverse_spd(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    match Cholesky::new(m.clone()) {
        Some(chol) => Some(chol.inverse()),
        None => m.clone().try_inverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covariance_of_two_columns() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 4.0, 8.0]);
        let s = empirical_covariance(&x);
        // var([1,2,3,4]) = 1.25, second column is twice the first
        assert!((s[(0, 0)] - 1.25).abs() < 1e-12);
        assert!((s[(0, 1)] - 2.5).abs() < 1e-12);
        assert!((s[(1, 1)] - 5.0).abs() < 1e-12);
        assert_eq!(s[(0, 1)], s[(1, 0)]);
    }

    #[test]
    fn log_det_of_diagonal() {
        let m = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![2.0, 3.0]));
        assert!((log_det(&m).unwrap() - 6.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn log_det_rejects_indefinite() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(log_det(&m).is_none());
        assert_eq!(log_likelihood(&DMatrix::identity(2, 2), &m), f64::NEG_INFINITY);
    }

    #[test]
    fn alpha_max_ignores_diagonal() {
        let m = DMatrix::from_row_slice(3, 3, &[9.0, 0.3, -0.7, 0.3, 9.0, 0.1, -0.7, 0.1, 9.0]);
        assert!((alpha_max(&m) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn likelihood_of_identity() {
        let eye = DMatrix::<f64>::identity(2, 2);
        let expected = (-2.0 - 2.0 * (2.0 * std::f64::consts::PI).ln()) / 2.0;
        assert!((log_likelihood(&eye, &eye) - expected).abs() < 1e-12);
    }
}
