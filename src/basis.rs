use crate::grid::FrequencyGrid;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use num_traits::Float;

/// Power spectrum basis.
///
/// An M x (N + 1) matrix whose row i is
/// `[1, 2 cos(w_i), 2 cos(2 w_i), ..., 2 cos(N w_i)]`. Multiplying it by an
/// autocorrelation vector `r` gives the power spectrum
/// `R(w_i) = r[0] + sum_k 2 r[k] cos(k w_i)` at every grid frequency.
///
/// Band matrices are obtained with [`BasisMatrix::select`], so that all the
/// bands share the numerical values of the full-grid matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisMatrix<T> {
    matrix: Array2<T>,
}

impl<T: Float> BasisMatrix<T> {
    /// Computes the basis over a frequency grid for a filter of order `order`.
    pub fn new(grid: &FrequencyGrid<T>, order: usize) -> BasisMatrix<T> {
        let two = T::from(2.0).unwrap();
        let matrix = Array2::from_shape_fn((grid.len(), order + 1), |(i, k)| {
            if k == 0 {
                T::one()
            } else {
                two * (T::from(k).unwrap() * grid.freqs()[i]).cos()
            }
        });
        BasisMatrix::from_array(matrix, grid.len(), order)
    }

    fn from_array(matrix: Array2<T>, rows: usize, order: usize) -> BasisMatrix<T> {
        assert_eq!(matrix.nrows(), rows, "basis matrix has the wrong number of rows");
        assert_eq!(matrix.ncols(), order + 1, "basis matrix has the wrong number of columns");
        BasisMatrix { matrix }
    }

    /// Returns the matrix formed by the rows listed in `indices`.
    pub fn select(&self, indices: &[usize]) -> BasisMatrix<T> {
        BasisMatrix::from_array(
            self.matrix.select(Axis(0), indices),
            indices.len(),
            self.order(),
        )
    }

    /// Evaluates the power spectrum at the frequencies of each row.
    ///
    /// # Panics
    ///
    /// Panics if `r` does not have N + 1 elements.
    pub fn response(&self, r: ArrayView1<'_, T>) -> Array1<T> {
        assert_eq!(r.len(), self.matrix.ncols());
        self.matrix
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(r.iter())
                    .fold(T::zero(), |acc, (&a, &x)| acc + a * x)
            })
            .collect()
    }
}

impl<T> BasisMatrix<T> {
    /// Returns the filter order N.
    pub fn order(&self) -> usize {
        self.matrix.ncols() - 1
    }

    /// Returns the number of rows.
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Returns the underlying matrix.
    pub fn matrix(&self) -> &Array2<T> {
        &self.matrix
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn dc_column_is_one() {
        let grid = FrequencyGrid::<f64>::new(7, 15).unwrap();
        let basis = BasisMatrix::new(&grid, 7);
        assert_eq!(basis.nrows(), 105);
        assert_eq!(basis.order(), 7);
        assert!(basis.matrix().column(0).iter().all(|&x| x == 1.0));
    }

    #[test]
    fn rows_at_dc_and_nyquist() {
        let grid = FrequencyGrid::<f64>::new(3, 15).unwrap();
        let basis = BasisMatrix::new(&grid, 3);
        let m = basis.matrix();
        for k in 1..=3 {
            assert!((m[(0, k)] - 2.0).abs() < 1e-12);
            let nyquist = if k % 2 == 0 { 2.0 } else { -2.0 };
            assert!((m[(44, k)] - nyquist).abs() < 1e-12);
        }
    }

    #[test]
    fn selected_rows_match_full_grid() {
        let grid = FrequencyGrid::<f64>::new(5, 15).unwrap();
        let basis = BasisMatrix::new(&grid, 5);
        let band = basis.select(&[3, 10, 40]);
        assert_eq!(band.nrows(), 3);
        assert_eq!(band.matrix().row(1), basis.matrix().row(10));
    }

    #[test]
    fn response_of_single_delay() {
        // h = [1, 1] has r = [2, 1] and |H(w)|^2 = 2 + 2 cos(w).
        let grid = FrequencyGrid::<f64>::new(1, 15).unwrap();
        let basis = BasisMatrix::new(&grid, 1);
        let response = basis.response(array![2.0, 1.0].view());
        for (&w, &p) in grid.freqs().iter().zip(response.iter()) {
            assert!((p - (2.0 + 2.0 * w.cos())).abs() < 1e-12);
        }
    }
}
