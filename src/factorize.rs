//! Spectral factorization.
//!
//! This module recovers the causal minimum-phase taps `h` of a filter from
//! the autocorrelation sequence `r` of its power spectrum, so that
//! `|H(w)|^2 = r[0] + sum_k 2 r[k] cos(k w)`. This is the inverse of
//! [`autocorrelation`].

use crate::{
    basis::BasisMatrix,
    eigenvalues::EigenvalueBackend,
    error::{FactorizationError, Result},
    roots::polynomial_roots,
    types::{FactorizationMethod, power_response},
};
use log::{debug, warn};
use ndarray::ArrayView1;
use num_complex::Complex;
use num_traits::{Float, FloatConst};
use rustfft::{FftNum, FftPlanner};

// Largest value to which the unit circle tolerance is widened when the roots
// cannot be split into a factor of the expected degree.
const MAX_UNIT_CIRCLE_TOLERANCE: f64 = 1e-3;

/// Computes the autocorrelation sequence of a filter.
///
/// Returns `r[k] = sum_i h[i] h[i + k]` for `k = 0, ..., h.len() - 1`.
pub fn autocorrelation<T: Float>(h: &[T]) -> Vec<T> {
    (0..h.len())
        .map(|k| {
            h.iter()
                .zip(h[k..].iter())
                .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
        })
        .collect()
}

/// Spectral factorizer.
///
/// The factorizer checks that the autocorrelation sequence defines a
/// non-negative power spectrum and then recovers the minimum-phase taps with
/// the configured [`FactorizationMethod`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFactorizer<T> {
    method: FactorizationMethod,
    unit_circle_tolerance: T,
    spectrum_tolerance: T,
}

impl<T: Float + FloatConst + FftNum> SpectralFactorizer<T> {
    /// Creates a factorizer.
    ///
    /// Roots whose magnitude is within `unit_circle_tolerance` of one are
    /// treated as lying on the unit circle. Power spectrum samples below
    /// `-spectrum_tolerance * max(r[0], 1)` are rejected as negative.
    pub fn new(
        method: FactorizationMethod,
        unit_circle_tolerance: T,
        spectrum_tolerance: T,
    ) -> SpectralFactorizer<T> {
        SpectralFactorizer {
            method,
            unit_circle_tolerance,
            spectrum_tolerance,
        }
    }

    /// Factorizes the autocorrelation sequence `r`.
    ///
    /// The power spectrum is checked for negative values at the rows of
    /// `basis`, which is normally the basis of the design grid. The returned
    /// taps have the same length as `r`.
    pub fn factorize<B: EigenvalueBackend<T>>(
        &self,
        r: &[T],
        basis: &BasisMatrix<T>,
        eigenvalue_backend: &B,
    ) -> Result<Vec<T>> {
        let r0 = r.first().copied().unwrap_or_else(T::zero);
        if !(r0 > T::zero()) {
            return Err(FactorizationError::ZeroEnergy.into());
        }
        let min_value = basis
            .response(ArrayView1::from(r))
            .fold(T::infinity(), |acc, &x| acc.min(x));
        if min_value < -self.spectrum_tolerance * r0.max(T::one()) {
            return Err(FactorizationError::NegativeSpectrum {
                min_value: min_value.to_f64().unwrap_or(f64::NAN),
            }
            .into());
        }
        match self.method {
            FactorizationMethod::Roots => self.factorize_roots(r, eigenvalue_backend),
            FactorizationMethod::Cepstrum { oversampling } => {
                Ok(factorize_cepstrum(r, oversampling.max(1)))
            }
        }
    }

    fn factorize_roots<B: EigenvalueBackend<T>>(
        &self,
        r: &[T],
        eigenvalue_backend: &B,
    ) -> Result<Vec<T>> {
        let r0 = r[0];
        // Trailing coefficients that vanish lower the degree of the factor.
        // The taps are zero-padded afterwards.
        let negligible = T::epsilon() * r0;
        let degree = r
            .iter()
            .rposition(|x| Float::abs(*x) > negligible)
            .unwrap_or(0);
        let mut taps = vec![T::zero(); r.len()];
        if degree == 0 {
            taps[0] = r0.sqrt();
            return Ok(taps);
        }

        // z^N P(z) has the palindromic coefficients r[N], ..., r[0], ..., r[N]
        let coefficients: Vec<T> = r[1..=degree]
            .iter()
            .rev()
            .chain(r[..=degree].iter())
            .copied()
            .collect();
        let roots = polynomial_roots(&coefficients, eigenvalue_backend)?;
        debug!("power spectrum polynomial of degree {} has {} roots", 2 * degree, roots.len());

        let selected = select_minimum_phase(&roots, degree, self.unit_circle_tolerance)?;

        // Expand prod (1 - z_k z^-1) and fix the gain so that the energy of
        // the taps is r[0].
        let mut g = vec![Complex::new(T::one(), T::zero())];
        for &z in &selected {
            g.push(Complex::new(T::zero(), T::zero()));
            for k in (1..g.len()).rev() {
                let prev = g[k - 1];
                g[k] = g[k] - z * prev;
            }
        }
        let energy = g.iter().fold(T::zero(), |acc, z| acc + z.re * z.re);
        let gain = (r0 / energy).sqrt();
        for (t, z) in taps.iter_mut().zip(g.iter()) {
            *t = gain * z.re;
        }
        Ok(taps)
    }
}

// Selects the `degree` roots of the minimum-phase factor. The unit circle
// tolerance is widened by decades, up to MAX_UNIT_CIRCLE_TOLERANCE, until the
// selection has the right number of roots.
fn select_minimum_phase<T: Float>(
    roots: &[Complex<T>],
    degree: usize,
    unit_circle_tolerance: T,
) -> Result<Vec<Complex<T>>> {
    let max_tolerance = T::from(MAX_UNIT_CIRCLE_TOLERANCE).unwrap();
    let ten = T::from(10.0).unwrap();
    let mut tolerance = unit_circle_tolerance;
    loop {
        let selected = minimum_phase_roots(roots, tolerance);
        if selected.len() == degree {
            return Ok(selected);
        }
        if tolerance >= max_tolerance {
            return Err(FactorizationError::RootCount {
                expected: degree,
                found: selected.len(),
            }
            .into());
        }
        warn!(
            "found {} minimum-phase roots instead of {} with unit circle tolerance {:e}",
            selected.len(),
            degree,
            tolerance.to_f64().unwrap_or(f64::NAN)
        );
        tolerance = (tolerance * ten).min(max_tolerance);
    }
}

// Selects the roots of the minimum-phase factor: the roots strictly inside
// the unit circle and one root for each pair of roots on the unit circle.
// Roots on the circle are paired with their nearest neighbour, and each pair
// contributes its midpoint projected onto the circle.
fn minimum_phase_roots<T: Float>(roots: &[Complex<T>], tolerance: T) -> Vec<Complex<T>> {
    let one = T::one();
    let mut selected: Vec<Complex<T>> = roots
        .iter()
        .filter(|z| z.norm() < one - tolerance)
        .copied()
        .collect();
    let mut on_circle: Vec<Complex<T>> = roots
        .iter()
        .filter(|z| (z.norm() - one).abs() <= tolerance)
        .copied()
        .collect();
    while let Some(z) = on_circle.pop() {
        let nearest = on_circle
            .iter()
            .enumerate()
            .map(|(j, w)| (j, (w - z).norm()))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let Some((j, _)) = nearest else {
            // unpaired root; the count check rejects this selection
            break;
        };
        let w = on_circle.swap_remove(j);
        let mid = (z + w) / T::from(2.0).unwrap();
        let norm = mid.norm();
        selected.push(if norm > T::zero() { mid / norm } else { z });
    }
    selected
}

// Kolmogorov's method. The log magnitude alpha = log|H| = log(R) / 2 is
// sampled densely on [0, 2 pi), the minimum phase is obtained as its Hilbert
// transform by an FFT, and the taps are the inverse DFT of exp(alpha + j phi)
// at the N + 1 frequencies 2 pi k / (N + 1).
fn factorize_cepstrum<T: Float + FloatConst + FftNum>(r: &[T], oversampling: usize) -> Vec<T> {
    let n = r.len();
    let m = oversampling * n;
    let zero = T::zero();
    let half = T::from(0.5).unwrap();
    let m_t = T::from(m).unwrap();
    let two_pi = T::PI() + T::PI();
    // floor for the power spectrum, so that zeros on the unit circle give a
    // finite log
    let floor = r[0] * T::epsilon() * T::epsilon();
    let alpha: Vec<T> = (0..m)
        .map(|i| {
            let w = two_pi * T::from(i).unwrap() / m_t;
            half * Float::abs(power_response(r, w)).max(floor).ln()
        })
        .collect();

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(m);
    let inverse = planner.plan_fft_inverse(m);
    let mut buffer: Vec<Complex<T>> = alpha.iter().map(|&a| Complex::new(a, zero)).collect();
    forward.process(&mut buffer);
    // j * sign(k) * A[k], with the DC and Nyquist bins removed
    let mid = m / 2;
    for (k, x) in buffer.iter_mut().enumerate() {
        let a = if k == 0 || k == mid {
            Complex::new(zero, zero)
        } else if k < mid {
            *x
        } else {
            -*x
        };
        *x = Complex::new(-a.im, a.re);
    }
    inverse.process(&mut buffer);
    let phase: Vec<T> = buffer.iter().map(|z| z.re / m_t).collect();

    let mut spectrum: Vec<Complex<T>> = (0..n)
        .map(|k| {
            let i = k * oversampling;
            Complex::new(zero, phase[i]).exp() * alpha[i].exp()
        })
        .collect();
    planner.plan_fft_inverse(n).process(&mut spectrum);
    let n_t = T::from(n).unwrap();
    spectrum.iter().map(|z| z.re / n_t).collect()
}
