//! Small dense linear algebra on `ndarray` — Cholesky factorisation and solves.

use crate::error::FitError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Lower-triangular `L` with `a = L Lᵀ`. Fails when `a` is not positive definite.
pub fn cholesky(a: ArrayView2<'_, f64>) -> Result<Array2<f64>, FitError> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(FitError::ShapeMismatch(format!(
            "cholesky needs a square matrix, got {}x{}",
            n,
            a.ncols()
        )));
    }
    let scale = a.diag().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let tol = scale * 1e-12;

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut d = a[[j, j]];
        for k in 0..j {
            d -= l[[j, k]] * l[[j, k]];
        }
        if !d.is_finite() || d <= tol {
            return Err(FitError::Singular);
        }
        let d = d.sqrt();
        l[[j, j]] = d;
        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / d;
        }
    }
    Ok(l)
}

/// Solve `L z = b` for lower-triangular `L`.
pub fn forward_substitute(l: &Array2<f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut s = b[i];
        for k in 0..i {
            s -= l[[i, k]] * z[k];
        }
        z[i] = s / l[[i, i]];
    }
    z
}

/// Solve `Lᵀ x = z` for lower-triangular `L`.
pub fn back_substitute(l: &Array2<f64>, z: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut s = z[i];
        for k in (i + 1)..n {
            s -= l[[k, i]] * x[k];
        }
        x[i] = s / l[[i, i]];
    }
    x
}

/// Solve `a x = b` given the Cholesky factor of `a`.
pub fn cholesky_solve(l: &Array2<f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    let z = forward_substitute(l, b);
    back_substitute(l, z.view())
}

/// `log |a|` from the Cholesky factor of `a`.
pub fn log_det(l: &Array2<f64>) -> f64 {
    2.0 * l.diag().iter().map(|v| v.ln()).sum::<f64>()
}

/// Squared Mahalanobis norm `dᵀ a⁻¹ d` given the Cholesky factor of `a`.
pub fn mahalanobis_sq(l: &Array2<f64>, d: ArrayView1<'_, f64>) -> f64 {
    let z = forward_substitute(l, d);
    z.dot(&z)
}

/// Column means of `x`.
pub fn column_means(x: ArrayView2<'_, f64>) -> Array1<f64> {
    x.mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()))
}

/// Scatter matrix `Σ (xᵢ - mean)(xᵢ - mean)ᵀ` (not normalised).
pub fn scatter(x: ArrayView2<'_, f64>, mean: &Array1<f64>) -> Array2<f64> {
    let centered = &x - &mean.view().insert_axis(Axis(0));
    centered.t().dot(&centered)
}
