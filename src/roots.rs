use crate::{
    eigenvalues::EigenvalueBackend,
    error::{FactorizationError, Result},
};
use ndarray::Array2;
use num_complex::Complex;
use num_traits::Float;

/// Computes the roots of a real polynomial.
///
/// The coefficients are given in order of decreasing powers, so that
/// `coefficients[0]` is the leading coefficient, which must be nonzero. The
/// roots are computed as the eigenvalues of the balanced companion matrix.
pub fn polynomial_roots<T, B>(coefficients: &[T], eigenvalue_backend: &B) -> Result<Vec<Complex<T>>>
where
    T: Float,
    B: EigenvalueBackend<T>,
{
    let Some((&leading, rest)) = coefficients.split_first() else {
        return Ok(Vec::new());
    };
    if leading == T::zero() || !leading.is_finite() {
        return Err(FactorizationError::RootFinding(
            "leading polynomial coefficient is zero".to_string(),
        )
        .into());
    }
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    let mut companion = companion_matrix(leading, rest);
    balance_matrix(&mut companion);
    Ok(eigenvalue_backend.eigenvalues(companion)?)
}

// Companion matrix of the monic polynomial z^n + (rest[0] / leading) z^(n-1)
// + ... + rest[n - 1] / leading. The first row holds the negated
// coefficients and the subdiagonal is one.
fn companion_matrix<T: Float>(leading: T, rest: &[T]) -> Array2<T> {
    let n = rest.len();
    let mut companion = Array2::zeros((n, n));
    for (j, &c) in rest.iter().enumerate() {
        companion[(0, j)] = -c / leading;
    }
    for j in 1..n {
        companion[(j, j - 1)] = T::one();
    }
    companion
}

// Balances a matrix for eigenvalue calculation with the iteration of Parlett
// and Reinsch [3]. Each step scales a row by 1/f and the matching column by
// f, with f a power of two, so no rounding errors are introduced.
//
// The permutation step of [3], which isolates eigenvalues, is not done. A
// companion matrix with nonzero constant term has no rows or columns to
// isolate.
fn balance_matrix<T: Float>(a: &mut Array2<T>) {
    let gamma = T::from(0.95).unwrap();
    let two = T::from(2.0).unwrap();
    let four = T::from(4.0).unwrap();
    let zero = T::zero();

    let n = a.nrows();
    let mut converged = false;
    while !converged {
        converged = true;
        for j in 0..n {
            // off-diagonal norms of row j and column j
            let (row_norm, mut col_norm) =
                (0..n)
                    .filter(|&k| k != j)
                    .fold((zero, zero), |(row, col), k| {
                        (row + a[(j, k)].abs(), col + a[(k, j)].abs())
                    });
            if row_norm == zero || col_norm == zero {
                continue;
            }
            let norm_sum = row_norm + col_norm;
            // f = 2^sigma with 2^(2 sigma - 1) < row_norm / col_norm <=
            // 2^(2 sigma + 1). col_norm ends up multiplied by f^2.
            let mut f = T::one();
            while col_norm.is_normal() && col_norm <= row_norm / two {
                f = f * two;
                col_norm = col_norm * four;
            }
            while col_norm.is_normal() && col_norm > row_norm * two {
                f = f / two;
                col_norm = col_norm / four;
            }
            if !col_norm.is_normal() {
                return;
            }
            // Rescale only if col_norm * f + row_norm / f decreases enough.
            // Both sides are multiplied by f.
            if row_norm + col_norm < gamma * norm_sum * f {
                converged = false;
                for k in (0..n).filter(|&k| k != j) {
                    a[(j, k)] = a[(j, k)] / f;
                    a[(k, j)] = a[(k, j)] * f;
                }
            }
        }
    }
}
