use crate::{bands::BandIndices, basis::BasisMatrix};
use ndarray::{Array1, Array2, ArrayView1, s};
use num_traits::Float;

/// Linear constraints on the autocorrelation sequence.
///
/// The constraints bound the power spectrum `R(w) = A(w) r` at the grid
/// samples of each band:
///
/// - passband: `Lp^2 <= R(w) <= Up^2`, with `Lp = 10^(-delta/20)` and
///   `Up = 10^(delta/20)` for a passband ripple of `delta` dB;
/// - stopband: `0 <= R(w) <= Sp^2`, with `Sp = 10^(-A/20)` for an attenuation
///   of `A` dB;
/// - transition band: `R(w) >= 0`.
///
/// Together, the lower bounds make `R` non-negative on the whole grid, so that
/// it is a valid power spectrum. The stopband bound can be replaced when the
/// inequalities are formed, which is how the oracle tightens it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSystem<T> {
    passband: BasisMatrix<T>,
    stopband: BasisMatrix<T>,
    transition: BasisMatrix<T>,
    passband_lower_sq: T,
    passband_upper_sq: T,
    stopband_upper_sq: T,
}

impl<T: Float> ConstraintSystem<T> {
    /// Builds the constraints from the full-grid basis and the band partition.
    pub fn new(
        basis: &BasisMatrix<T>,
        bands: &BandIndices,
        passband_ripple_db: T,
        stopband_attenuation_db: T,
    ) -> ConstraintSystem<T> {
        let ten = T::from(10.0).unwrap();
        let twenty = T::from(20.0).unwrap();
        let lp = ten.powf(-passband_ripple_db / twenty);
        let up = ten.powf(passband_ripple_db / twenty);
        let sp = ten.powf(-stopband_attenuation_db / twenty);
        ConstraintSystem {
            passband: basis.select(&bands.passband),
            stopband: basis.select(&bands.stopband),
            transition: basis.select(&bands.transition),
            passband_lower_sq: lp * lp,
            passband_upper_sq: up * up,
            stopband_upper_sq: sp * sp,
        }
    }

    /// Returns the number of unknowns, N + 1.
    pub fn num_coefficients(&self) -> usize {
        self.passband.order() + 1
    }

    /// Returns the lower bound `Lp^2` on the passband power spectrum.
    pub fn passband_lower_sq(&self) -> T {
        self.passband_lower_sq
    }

    /// Returns the upper bound `Up^2` on the passband power spectrum.
    pub fn passband_upper_sq(&self) -> T {
        self.passband_upper_sq
    }

    /// Returns the specified bound `Sp^2` on the stopband power spectrum.
    pub fn stopband_upper_sq(&self) -> T {
        self.stopband_upper_sq
    }

    fn num_rows(&self) -> usize {
        2 * self.passband.nrows() + 2 * self.stopband.nrows() + self.transition.nrows()
    }

    /// Forms the inequalities `G r <= h` for a stopband bound `stopband_sq`.
    pub fn inequalities(&self, stopband_sq: T) -> (Array2<T>, Array1<T>) {
        let n = self.num_coefficients();
        let mut g = Array2::zeros((self.num_rows(), n));
        let mut h = Array1::zeros(self.num_rows());
        let zero = T::zero();
        let mut row = 0;
        let mut push = |a: ArrayView1<'_, T>, sign: T, bound: T| {
            g.slice_mut(s![row, ..]).zip_mut_with(&a, |x, &y| *x = sign * y);
            h[row] = bound;
            row += 1;
        };
        let one = T::one();
        for a in self.passband.matrix().rows() {
            push(a, one, self.passband_upper_sq);
            push(a, -one, -self.passband_lower_sq);
        }
        for a in self.stopband.matrix().rows() {
            push(a, one, stopband_sq);
            push(a, -one, zero);
        }
        for a in self.transition.matrix().rows() {
            push(a, -one, zero);
        }
        (g, h)
    }

    /// Forms the inequalities of the minimax problem over `(r, t)`.
    ///
    /// The stopband upper bound is replaced by `A(w) r - t <= 0`, so the last
    /// unknown is the stopband bound itself.
    pub fn minimax_inequalities(&self) -> (Array2<T>, Array1<T>) {
        let (g, h) = self.inequalities(T::zero());
        let n = self.num_coefficients();
        let mut g_ext = Array2::zeros((g.nrows(), n + 1));
        g_ext.slice_mut(s![.., ..n]).assign(&g);
        // the stopband upper bounds are the even rows after the passband rows
        let first = 2 * self.passband.nrows();
        for j in 0..self.stopband.nrows() {
            g_ext[(first + 2 * j, n)] = -T::one();
        }
        (g_ext, h)
    }

    /// Returns the largest value of the power spectrum of `r` on the stopband
    /// samples.
    pub fn max_stopband_response(&self, r: &[T]) -> T {
        self.stopband
            .response(ArrayView1::from(r))
            .fold(T::neg_infinity(), |acc, &p| acc.max(p))
    }

    /// Returns the largest violation of the constraints by `r` when the
    /// stopband bound is `stopband_sq`, or zero if all the constraints hold.
    pub fn max_violation(&self, r: &[T], stopband_sq: T) -> T {
        let r = ArrayView1::from(r);
        let zero = T::zero();
        let passband = self.passband.response(r).fold(zero, |acc, &p| {
            acc.max(self.passband_lower_sq - p)
                .max(p - self.passband_upper_sq)
        });
        let stopband = self
            .stopband
            .response(r)
            .fold(zero, |acc, &p| acc.max(p - stopband_sq).max(-p));
        let transition = self
            .transition
            .response(r)
            .fold(zero, |acc, &p| acc.max(-p));
        passband.max(stopband).max(transition)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::FrequencyGrid;
    use std::f64::consts::PI;

    fn lowpass_constraints() -> ConstraintSystem<f64> {
        let grid = FrequencyGrid::new(10, 15).unwrap();
        let basis = BasisMatrix::new(&grid, 10);
        let bands = BandIndices::partition(&grid, 0.3 * PI, 0.5 * PI).unwrap();
        ConstraintSystem::new(&basis, &bands, 1.0, 20.0)
    }

    #[test]
    fn squared_bounds() {
        let c = lowpass_constraints();
        assert!((c.passband_lower_sq() - 10f64.powf(-0.1)).abs() < 1e-12);
        assert!((c.passband_upper_sq() - 10f64.powf(0.1)).abs() < 1e-12);
        assert!((c.stopband_upper_sq() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn inequality_shapes() {
        let c = lowpass_constraints();
        let (g, h) = c.inequalities(0.01);
        assert_eq!(g.ncols(), 11);
        assert_eq!(g.nrows(), h.len());
        let (g, h) = c.minimax_inequalities();
        assert_eq!(g.ncols(), 12);
        assert_eq!(g.nrows(), h.len());
        // only stopband upper bounds involve t
        let with_t = g.column(11).iter().filter(|&&x| x != 0.0).count();
        assert_eq!(with_t, c.stopband.nrows());
    }

    #[test]
    fn flat_spectrum() {
        // r = [1, 0, ..., 0] is an all-pass power spectrum R = 1. It meets
        // the passband constraints and violates the stopband bound by 0.99.
        let c = lowpass_constraints();
        let mut r = vec![0.0; 11];
        r[0] = 1.0;
        assert!((c.max_violation(&r, 0.01) - 0.99).abs() < 1e-12);
        assert!((c.max_stopband_response(&r) - 1.0).abs() < 1e-12);
        assert_eq!(c.max_violation(&r, 1.0), 0.0);
        let (g, h) = c.inequalities(1.0);
        let gr = g.dot(&ndarray::Array1::from(r));
        assert!(gr.iter().zip(h.iter()).all(|(a, b)| a <= &(b + 1e-12)));
    }

    #[test]
    fn negative_spectrum_is_a_violation() {
        let c = lowpass_constraints();
        let mut r = vec![0.0; 11];
        r[0] = -0.5;
        assert!((c.max_violation(&r, 0.01) - (c.passband_lower_sq() + 0.5)).abs() < 1e-12);
    }
}
