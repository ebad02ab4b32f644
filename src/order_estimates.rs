//! FIR filter order estimates.
//!
//! This module contains functions to estimate the order of the minimum-phase
//! lowpass filter needed to meet some design requirements. They can be used
//! to choose the order passed to [`FilterSpec::new`](crate::FilterSpec::new),
//! or to pick a larger order after a design fails as infeasible.

use std::f64::consts::PI;

/// Estimates the required filter order using Kaiser's formula.
///
/// The estimate is computed for the linear-phase filter whose amplitude
/// response is the power spectrum `R(w)` of the design. Its ripples are
/// obtained by centering the passband bounds `[Lp^2, Up^2]` at one, giving
///
/// - `delta_1 = (Up^2 - Lp^2) / (Up^2 + Lp^2)`,
/// - `delta_2 = 2 Sp^2 / (Up^2 + Lp^2)`,
///
/// where the bounds are computed from the passband ripple and the stopband
/// attenuation in dB. Kaiser's formula
///
/// ```text
/// N_lin = (-20 log10(sqrt(delta_1 delta_2)) - 13) / (14.6 delta_f)
/// ```
///
/// with `delta_f = (stopband_edge - passband_edge) / (2 pi)` estimates the
/// order of the linear-phase filter. The minimum-phase factor has half of
/// that order.
///
/// The band edges are given in radians per sample. The estimate is at least
/// one.
///
/// J. Kaiser, "Nonrecursive Digital Filter Design Using the I0-sinh Window
/// Function," in Proc. IEEE Int. Symp. Circuits and Systems, pp. 20-23, 1974.
pub fn kaiser(
    passband_edge: f64,
    stopband_edge: f64,
    passband_ripple_db: f64,
    stopband_attenuation_db: f64,
) -> usize {
    let lower = 10f64.powf(-passband_ripple_db / 10.0);
    let upper = 10f64.powf(passband_ripple_db / 10.0);
    let stopband = 10f64.powf(-stopband_attenuation_db / 10.0);
    let delta_1 = (upper - lower) / (upper + lower);
    let delta_2 = 2.0 * stopband / (upper + lower);
    let delta_f = (stopband_edge - passband_edge) / (2.0 * PI);
    let linear_order = (-20.0 * (delta_1 * delta_2).sqrt().log10() - 13.0) / (14.6 * delta_f);
    ((linear_order / 2.0).ceil() as usize).max(1)
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;

    #[test]
    fn kaiser() {
        assert_eq!(super::kaiser(0.3 * PI, 0.5 * PI, 1.0, 20.0), 5);
        assert_eq!(super::kaiser(0.3 * PI, 0.5 * PI, 1.0, 35.9), 11);
        assert_eq!(super::kaiser(0.4 * PI, 0.42 * PI, 1.0, 20.0), 47);
        let ripple_db = 20.0 * 1.025f64.log10();
        assert_eq!(super::kaiser(0.12 * PI, 0.2 * PI, ripple_db, 35.5), 31);
        // very loose requirements
        assert_eq!(super::kaiser(0.3 * PI, 0.9 * PI, 3.0, 3.0), 1);
    }
}
