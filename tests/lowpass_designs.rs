#![cfg(any(
    feature = "lapack-backend",
    feature = "faer-backend",
    feature = "nalgebra-backend"
))]

use num_traits::Zero;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use specfact_fir::{
    BandIndices, BasisMatrix, ConstraintSystem, FactorizationMethod, FilterSpec, FrequencyGrid,
    LowpassDesign, Objective, ParametersBuilder, autocorrelation, design_lowpass,
    error::{Error, InvalidSpec},
};
use std::{f64::consts::PI, sync::Arc, time::Duration};

struct FirResponseCalculator {
    fft: Arc<dyn Fft<f64>>,
    buffer: Box<[Complex<f64>]>,
}

impl FirResponseCalculator {
    fn new(num_points: usize) -> FirResponseCalculator {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(2 * num_points);
        let buffer = vec![Complex::zero(); 2 * num_points].into_boxed_slice();
        FirResponseCalculator { fft, buffer }
    }

    // frequencies in radians per sample
    fn frequencies(&self) -> Vec<f64> {
        let scale = 2.0 * PI / self.buffer.len() as f64;
        (0..self.buffer.len() / 2)
            .map(|j| j as f64 * scale)
            .collect()
    }

    // squared magnitude response
    fn compute(&mut self, taps: &[f64]) -> Vec<f64> {
        assert!(taps.len() <= self.buffer.len());
        self.buffer.fill(Complex::zero());
        for (b, &t) in self.buffer.iter_mut().zip(taps.iter()) {
            *b = t.into();
        }
        self.fft.process(&mut self.buffer);
        self.buffer[..self.buffer.len() / 2]
            .iter()
            .map(|z| z.norm_sqr())
            .collect()
    }
}

// Checks a squared magnitude response against the design bounds. Frequencies
// closer than one grid step to a band edge are skipped, since the optimizer
// only constrains the response at the grid samples. The tolerances are in dB.
fn check_response(
    response_calculator: &mut FirResponseCalculator,
    design: &LowpassDesign<f64>,
    response: &[f64],
    grid_step: f64,
    passband_tolerance_db: f64,
    stopband_tolerance_db: f64,
) {
    let (lower, upper) = design.passband_bounds;
    let passband_slack = 10f64.powf(passband_tolerance_db / 10.0);
    let stopband_slack = 10f64.powf(stopband_tolerance_db / 10.0);
    for (&w, &h) in response_calculator.frequencies().iter().zip(response.iter()) {
        if w <= design.passband_edge - grid_step {
            assert!(h >= lower / passband_slack, "passband at {w}: {h} < {lower}");
            assert!(h <= upper * passband_slack, "passband at {w}: {h} > {upper}");
        } else if w >= design.stopband_edge + grid_step {
            assert!(
                h <= design.stopband_bound * stopband_slack,
                "stopband at {w}: {h} > {}",
                design.stopband_bound
            );
        }
    }
}

fn grid_step(order: usize) -> f64 {
    PI / (15 * order - 1) as f64
}

fn constraints(order: usize, wp: f64, ws: f64, ripple_db: f64, atten_db: f64) -> ConstraintSystem<f64> {
    let grid = FrequencyGrid::new(order, 15).unwrap();
    let basis = BasisMatrix::new(&grid, order);
    let bands = BandIndices::partition(&grid, wp, ws).unwrap();
    ConstraintSystem::new(&basis, &bands, ripple_db, atten_db)
}

#[test]
fn lowpass() {
    let spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0).unwrap();
    let design = design_lowpass(&spec).unwrap();
    assert_eq!(design.impulse_response.len(), 11);
    assert_eq!(design.autocorrelation.len(), 11);
    let r0 = design.autocorrelation[0];
    assert!(r0 > 0.0 && r0 < 2.0);
    // the bisection finds about -35.9 dB
    let attenuation = design.stopband_attenuation_db();
    assert!(attenuation > 35.0 && attenuation < 37.0, "{attenuation}");
    assert_eq!(design.num_lp_solves, design.num_bisection_iterations + 1);

    let mut response_calculator = FirResponseCalculator::new(4096);
    let response = response_calculator.compute(&design.impulse_response);
    check_response(
        &mut response_calculator,
        &design,
        &response,
        grid_step(10),
        0.1,
        0.5,
    );
}

#[test]
fn lowpass_infeasible() {
    let spec = FilterSpec::new(5, 0.4 * PI, 0.42 * PI, 1.0, 20.0).unwrap();
    match design_lowpass(&spec) {
        Err(Error::Infeasible {
            best_stopband_sq,
            best_stopband_db,
        }) => {
            assert!((best_stopband_sq - 0.534).abs() < 0.01, "{best_stopband_sq}");
            assert!(best_stopband_db > -20.0);
            assert!((best_stopband_db - 10.0 * best_stopband_sq.log10()).abs() < 1e-12);
        }
        other => panic!("expected an infeasible design, got {other:?}"),
    }
}

#[test]
fn lowpass_vanishing_transition_band() {
    let wp = 0.3 * PI;
    let spec = FilterSpec::new(10, wp, wp + 1e-9, 1.0, 20.0).unwrap();
    match design_lowpass(&spec) {
        Ok(design) => {
            let c = constraints(10, wp, wp + 1e-9, 1.0, 20.0);
            assert!(c.max_violation(&design.autocorrelation, design.stopband_bound) <= 1e-6);
        }
        Err(Error::Infeasible { .. }) => (),
        Err(e) => panic!("unexpected error {e}"),
    }
}

#[test]
fn idempotent() {
    let spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0).unwrap();
    let a = design_lowpass(&spec).unwrap();
    let b = design_lowpass(&spec).unwrap();
    assert_eq!(a.impulse_response, b.impulse_response);
    assert_eq!(a.autocorrelation, b.autocorrelation);
    assert_eq!(a.stopband_bound, b.stopband_bound);
}

#[test]
fn round_trip() {
    let (wp, ws) = (0.3 * PI, 0.5 * PI);
    let c = constraints(10, wp, ws, 1.0, 20.0);
    for objective in [Objective::Feasibility, Objective::Bisection] {
        for method in [FactorizationMethod::Roots, FactorizationMethod::cepstrum()] {
            let mut spec = FilterSpec::new(10, wp, ws, 1.0, 20.0).unwrap();
            spec.set_objective(objective).set_factorization_method(method);
            let design = design_lowpass(&spec).unwrap();
            assert!(c.max_violation(&design.autocorrelation, design.stopband_bound) <= 1e-6);
            let r = autocorrelation(&design.impulse_response);
            for (a, b) in r.iter().zip(design.autocorrelation.iter()) {
                assert!((a - b).abs() < 1e-4, "{objective:?} {method:?}: {r:?}");
            }
            let violation = c.max_violation(&r, design.stopband_bound);
            assert!(violation <= 1e-3, "{objective:?} {method:?}: {violation}");
        }
    }
}

#[test]
fn objectives_agree() {
    let mut spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0).unwrap();
    spec.set_objective(Objective::Feasibility);
    let feasibility = design_lowpass(&spec).unwrap();
    assert_eq!(feasibility.num_lp_solves, 1);
    assert!((feasibility.stopband_bound - 0.01).abs() < 1e-15);
    spec.set_objective(Objective::Bisection);
    let bisection = design_lowpass(&spec).unwrap();
    spec.set_objective(Objective::Minimax);
    let minimax = design_lowpass(&spec).unwrap();
    assert!(bisection.stopband_bound < feasibility.stopband_bound);
    let difference = bisection.stopband_attenuation_db() - minimax.stopband_attenuation_db();
    assert!(difference.abs() < 0.01, "{difference}");
    // the minimum energy tie-break
    assert!(feasibility.autocorrelation[0] <= bisection.autocorrelation[0] + 1e-9);
}

#[test]
fn linear_phase_taps() {
    let spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0).unwrap();
    let design = design_lowpass(&spec).unwrap();
    let taps = design.linear_phase_taps();
    assert_eq!(taps.len(), 21);
    for k in 0..10 {
        assert_eq!(taps[k], taps[20 - k]);
    }
    assert_eq!(taps[10], design.autocorrelation[0]);
    // The zero-phase amplitude of the linear-phase filter is the power
    // spectrum, which is non-negative, so the squared magnitude of its
    // response is the square of the power spectrum.
    let mut response_calculator = FirResponseCalculator::new(4096);
    let response: Vec<f64> = response_calculator
        .compute(&taps)
        .into_iter()
        .map(f64::sqrt)
        .collect();
    check_response(
        &mut response_calculator,
        &design,
        &response,
        grid_step(10),
        0.1,
        0.5,
    );
    for (&w, &p) in response_calculator.frequencies().iter().zip(response.iter()).step_by(64) {
        assert!((p - design.power_response(w).abs()).abs() < 1e-9);
    }
}

#[test]
fn passband_extremes() {
    let spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0).unwrap();
    let design = design_lowpass(&spec).unwrap();
    let (min, max) = design.passband_extremes(1000);
    let (lower, upper) = design.passband_bounds;
    // the passband edge is not a grid sample, so the response there can be
    // slightly below the lower bound
    assert!(min >= lower * 0.95 && max <= upper * 1.01);
    assert!(min < max);
}

#[test]
fn larger_order() {
    let spec = FilterSpec::from_ripples(32, 0.12 * PI, 0.2 * PI, 0.025, 0.125).unwrap();
    let design = design_lowpass(&spec).unwrap();
    assert_eq!(design.impulse_response.len(), 33);
    let attenuation = design.stopband_attenuation_db();
    assert!(attenuation > 34.0 && attenuation < 37.0, "{attenuation}");
    let mut response_calculator = FirResponseCalculator::new(8192);
    let response = response_calculator.compute(&design.impulse_response);
    check_response(
        &mut response_calculator,
        &design,
        &response,
        grid_step(32),
        0.1,
        1.0,
    );
}

#[test]
fn time_limit() {
    let mut spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0).unwrap();
    spec.set_time_limit(Some(Duration::ZERO));
    assert!(matches!(design_lowpass(&spec), Err(Error::Timeout { .. })));
}

#[test]
fn invalid_specifications() {
    let invalid = |result: Result<FilterSpec<f64>, Error>| match result {
        Err(Error::InvalidSpec(e)) => e,
        other => panic!("expected an invalid specification, got {other:?}"),
    };
    assert_eq!(
        invalid(FilterSpec::new(0, 0.3 * PI, 0.5 * PI, 1.0, 20.0)),
        InvalidSpec::OrderZero
    );
    assert_eq!(
        invalid(FilterSpec::new(10, 0.5 * PI, 0.3 * PI, 1.0, 20.0)),
        InvalidSpec::BandEdgesWrongOrder
    );
    assert_eq!(
        invalid(FilterSpec::new(10, 0.3 * PI, 1.5 * PI, 1.0, 20.0)),
        InvalidSpec::BandEdgesOutOfBounds
    );
    assert!(matches!(
        invalid(FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 0.0, 20.0)),
        InvalidSpec::RippleOutOfRange(_)
    ));
    assert!(matches!(
        invalid(FilterSpec::from_ripples(10, 0.3 * PI, 0.5 * PI, 0.1, 1.5)),
        InvalidSpec::RippleOutOfRange(_)
    ));

    let spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0).unwrap();
    let setting_error = |spec: &FilterSpec<f64>| match design_lowpass(spec) {
        Err(Error::InvalidSpec(e)) => e,
        other => panic!("expected an invalid setting, got {other:?}"),
    };
    assert!(matches!(
        setting_error(spec.clone().set_solver_tolerance(0.0)),
        InvalidSpec::SolverSetting(_)
    ));
    assert!(matches!(
        setting_error(spec.clone().set_grid_density(0)),
        InvalidSpec::SolverSetting(_)
    ));
    assert!(matches!(
        setting_error(spec.clone().set_grid_density(1)),
        InvalidSpec::GridTooCoarse {
            samples: 10,
            required: 11
        }
    ));
    assert!(matches!(
        setting_error(spec.clone().set_grid_density(usize::MAX / 2)),
        InvalidSpec::GridTooLarge { order: 10, .. }
    ));
    assert!(matches!(
        setting_error(
            spec.clone()
                .set_factorization_method(FactorizationMethod::Cepstrum { oversampling: 0 })
        ),
        InvalidSpec::SolverSetting(_)
    ));
}
