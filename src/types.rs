use crate::error::{InvalidSpec, Result};
use itertools::{Itertools, MinMaxResult};
use num_traits::{Float, FloatConst};
use std::time::Duration;

/// Optimization objective of the feasibility oracle.
///
/// Every objective breaks ties between feasible solutions by choosing the
/// autocorrelation sequence with the smallest zero-lag coefficient `r[0]`,
/// which is the energy of the filter taps. This makes designs deterministic.
/// It is a linear criterion and differs from choosing the sequence with the
/// smallest Euclidean norm `||r||_2`, which would require a quadratic
/// program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Objective {
    /// Find any solution that meets the stopband bound of the specification.
    Feasibility,
    /// Tighten the stopband bound by bisection, re-solving a feasibility
    /// problem at each step, and keep the last feasible solution.
    #[default]
    Bisection,
    /// Minimize the stopband bound directly with a single linear program.
    Minimax,
}

/// Method used to recover filter taps from an autocorrelation sequence.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum FactorizationMethod {
    /// Root finding on the power spectrum polynomial.
    ///
    /// The roots inside the unit circle, and one root of each pair on the
    /// unit circle, form the minimum-phase factor.
    #[default]
    Roots,
    /// Kolmogorov's cepstral method.
    ///
    /// The log power spectrum is sampled on `oversampling * (N + 1)` points,
    /// the minimum phase is obtained as its Hilbert transform, and the taps
    /// are obtained by an inverse FFT.
    Cepstrum {
        /// Oversampling factor of the frequency sampling.
        oversampling: usize,
    },
}

impl FactorizationMethod {
    /// Kolmogorov's method with the default oversampling factor of 100.
    pub fn cepstrum() -> FactorizationMethod {
        FactorizationMethod::Cepstrum { oversampling: 100 }
    }
}

/// Lowpass filter specification.
///
/// This struct holds the band edges and ripple requirements of the lowpass
/// filter, together with the settings used by the optimizer. It implements
/// [`DesignParameters`], which is what [`design_lowpass`](super::design_lowpass)
/// consumes, and [`ParametersBuilder`], which allows the default settings to
/// be changed.
///
/// Band edges are given in radians per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec<T> {
    order: usize,
    passband_edge: T,
    stopband_edge: T,
    passband_ripple_db: T,
    stopband_attenuation_db: T,
    solver_tolerance: T,
    max_bisection_iters: usize,
    max_solver_iterations: usize,
    time_limit: Option<Duration>,
    objective: Objective,
    grid_density: usize,
    factorization_method: FactorizationMethod,
    unit_circle_tolerance: T,
}

impl<T: Float + FloatConst> FilterSpec<T> {
    /// Creates a new lowpass specification.
    ///
    /// The filter has `order + 1` taps. The passband ripple is the allowed
    /// deviation of the magnitude response around 0 dB, in dB, and the
    /// stopband attenuation is the minimum attenuation in the stopband, in
    /// dB. Both must be positive. The band edges must satisfy
    /// `0 < passband_edge < stopband_edge < pi`.
    ///
    /// The remaining settings are given default values, which can be changed
    /// with the methods of [`ParametersBuilder`].
    pub fn new(
        order: usize,
        passband_edge: T,
        stopband_edge: T,
        passband_ripple_db: T,
        stopband_attenuation_db: T,
    ) -> Result<FilterSpec<T>> {
        if order == 0 {
            return Err(InvalidSpec::OrderZero.into());
        }
        check_band_edges(passband_edge, stopband_edge)?;
        if !(passband_ripple_db.is_finite() && passband_ripple_db > T::zero()) {
            return Err(InvalidSpec::RippleOutOfRange("passband ripple must be positive").into());
        }
        if !(stopband_attenuation_db.is_finite() && stopband_attenuation_db > T::zero()) {
            return Err(
                InvalidSpec::RippleOutOfRange("stopband attenuation must be positive").into(),
            );
        }
        Ok(FilterSpec {
            order,
            passband_edge,
            stopband_edge,
            passband_ripple_db,
            stopband_attenuation_db,
            solver_tolerance: T::from(1e-6).unwrap(),
            max_bisection_iters: 40,
            max_solver_iterations: 50_000,
            time_limit: None,
            objective: Objective::default(),
            grid_density: 15,
            factorization_method: FactorizationMethod::default(),
            unit_circle_tolerance: T::from(1e-6).unwrap(),
        })
    }

    /// Creates a new lowpass specification from linear ripples.
    ///
    /// `passband_ripple` is the allowed relative deviation of the passband
    /// magnitude, which is converted to `20 * log10(1 + passband_ripple)` dB,
    /// and `stopband_ripple` is the allowed stopband magnitude, which is
    /// converted to an attenuation of `-20 * log10(stopband_ripple)` dB. Both
    /// ripples must lie in the open interval (0, 1).
    pub fn from_ripples(
        order: usize,
        passband_edge: T,
        stopband_edge: T,
        passband_ripple: T,
        stopband_ripple: T,
    ) -> Result<FilterSpec<T>> {
        let zero = T::zero();
        let one = T::one();
        if !(passband_ripple > zero && passband_ripple < one) {
            return Err(InvalidSpec::RippleOutOfRange("passband ripple must lie in (0, 1)").into());
        }
        if !(stopband_ripple > zero && stopband_ripple < one) {
            return Err(InvalidSpec::RippleOutOfRange("stopband ripple must lie in (0, 1)").into());
        }
        let twenty = T::from(20.0).unwrap();
        FilterSpec::new(
            order,
            passband_edge,
            stopband_edge,
            twenty * (one + passband_ripple).log10(),
            -twenty * stopband_ripple.log10(),
        )
    }
}

pub(crate) fn check_band_edges<T: Float + FloatConst>(
    passband_edge: T,
    stopband_edge: T,
) -> Result<()> {
    let zero = T::zero();
    let pi = T::PI();
    let in_bounds = |w: T| w.is_finite() && w > zero && w < pi;
    if !in_bounds(passband_edge) || !in_bounds(stopband_edge) {
        return Err(InvalidSpec::BandEdgesOutOfBounds.into());
    }
    if passband_edge >= stopband_edge {
        return Err(InvalidSpec::BandEdgesWrongOrder.into());
    }
    Ok(())
}

/// Lowpass design parameters trait.
///
/// This trait defines the methods that [`design_lowpass`](super::design_lowpass)
/// uses to obtain the filter requirements and the optimizer settings. It is
/// implemented by [`FilterSpec`]. The design function assumes that each of
/// these methods returns the same value every time it is called during a
/// design.
pub trait DesignParameters<T> {
    /// Returns the filter order N. The filter has N + 1 taps.
    fn order(&self) -> usize;

    /// Returns the passband edge in radians per sample.
    fn passband_edge(&self) -> T;

    /// Returns the stopband edge in radians per sample.
    fn stopband_edge(&self) -> T;

    /// Returns the passband ripple in dB, around 0 dB.
    fn passband_ripple_db(&self) -> T;

    /// Returns the minimum stopband attenuation in dB.
    fn stopband_attenuation_db(&self) -> T;

    /// Returns the solver tolerance.
    ///
    /// This is the relative precision at which the bisection stops, and the
    /// tolerance used to validate that the solutions found by the linear
    /// programming solver meet the constraints. The validation tolerance is
    /// never below `100 * T::epsilon()`. With `f32` this is about `1.2e-5`,
    /// so `f32` designs only reach a stopband bound within that distance of
    /// the optimum, and are limited to roughly 50 dB of attenuation.
    fn solver_tolerance(&self) -> T;

    /// Returns the maximum number of bisection iterations.
    fn max_bisection_iters(&self) -> usize;

    /// Returns the maximum number of simplex iterations of each linear
    /// program.
    fn max_solver_iterations(&self) -> usize;

    /// Returns the wall-clock budget for the whole optimization, if any.
    fn time_limit(&self) -> Option<Duration>;

    /// Returns the optimization objective.
    fn objective(&self) -> Objective;

    /// Returns the grid density.
    ///
    /// The frequency grid has `grid_density * order` samples.
    fn grid_density(&self) -> usize;

    /// Returns the spectral factorization method.
    fn factorization_method(&self) -> FactorizationMethod;

    /// Returns the tolerance used to decide that a root of the power spectrum
    /// polynomial lies on the unit circle.
    fn unit_circle_tolerance(&self) -> T;
}

impl<T: Copy> DesignParameters<T> for FilterSpec<T> {
    fn order(&self) -> usize {
        self.order
    }
    fn passband_edge(&self) -> T {
        self.passband_edge
    }
    fn stopband_edge(&self) -> T {
        self.stopband_edge
    }
    fn passband_ripple_db(&self) -> T {
        self.passband_ripple_db
    }
    fn stopband_attenuation_db(&self) -> T {
        self.stopband_attenuation_db
    }
    fn solver_tolerance(&self) -> T {
        self.solver_tolerance
    }
    fn max_bisection_iters(&self) -> usize {
        self.max_bisection_iters
    }
    fn max_solver_iterations(&self) -> usize {
        self.max_solver_iterations
    }
    fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
    fn objective(&self) -> Objective {
        self.objective
    }
    fn grid_density(&self) -> usize {
        self.grid_density
    }
    fn factorization_method(&self) -> FactorizationMethod {
        self.factorization_method
    }
    fn unit_circle_tolerance(&self) -> T {
        self.unit_circle_tolerance
    }
}

/// Lowpass design parameters setter trait.
///
/// This trait is implemented by [`FilterSpec`] and allows the default
/// settings to be modified. The values are validated when the design is run.
pub trait ParametersBuilder<T>: DesignParameters<T> {
    /// Sets the solver tolerance. See [`DesignParameters::solver_tolerance`].
    fn set_solver_tolerance(&mut self, tolerance: T) -> &mut Self;

    /// Sets the maximum number of bisection iterations.
    fn set_max_bisection_iters(&mut self, iterations: usize) -> &mut Self;

    /// Sets the maximum number of simplex iterations of each linear program.
    fn set_max_solver_iterations(&mut self, iterations: usize) -> &mut Self;

    /// Sets or clears the wall-clock budget of the optimization.
    fn set_time_limit(&mut self, limit: Option<Duration>) -> &mut Self;

    /// Sets the optimization objective.
    fn set_objective(&mut self, objective: Objective) -> &mut Self;

    /// Sets the grid density. See [`DesignParameters::grid_density`].
    fn set_grid_density(&mut self, density: usize) -> &mut Self;

    /// Sets the spectral factorization method.
    fn set_factorization_method(&mut self, method: FactorizationMethod) -> &mut Self;

    /// Sets the unit circle tolerance of the root-finding factorization.
    fn set_unit_circle_tolerance(&mut self, tolerance: T) -> &mut Self;
}

impl<T: Copy> ParametersBuilder<T> for FilterSpec<T> {
    fn set_solver_tolerance(&mut self, tolerance: T) -> &mut Self {
        self.solver_tolerance = tolerance;
        self
    }

    fn set_max_bisection_iters(&mut self, iterations: usize) -> &mut Self {
        self.max_bisection_iters = iterations;
        self
    }

    fn set_max_solver_iterations(&mut self, iterations: usize) -> &mut Self {
        self.max_solver_iterations = iterations;
        self
    }

    fn set_time_limit(&mut self, limit: Option<Duration>) -> &mut Self {
        self.time_limit = limit;
        self
    }

    fn set_objective(&mut self, objective: Objective) -> &mut Self {
        self.objective = objective;
        self
    }

    fn set_grid_density(&mut self, density: usize) -> &mut Self {
        self.grid_density = density;
        self
    }

    fn set_factorization_method(&mut self, method: FactorizationMethod) -> &mut Self {
        self.factorization_method = method;
        self
    }

    fn set_unit_circle_tolerance(&mut self, tolerance: T) -> &mut Self {
        self.unit_circle_tolerance = tolerance;
        self
    }
}

/// A lowpass FIR design produced by [`design_lowpass`](super::design_lowpass).
///
/// The type parameter `T` corresponds to the scalar type used in the
/// calculations.
#[derive(Debug, Clone)]
pub struct LowpassDesign<T> {
    /// Minimum-phase impulse response of the filter.
    ///
    /// This contains the N + 1 causal taps `h`, whose squared magnitude
    /// response is the power spectrum defined by `autocorrelation`.
    pub impulse_response: Vec<T>,
    /// Autocorrelation sequence `r[0], ..., r[N]` found by the optimizer.
    pub autocorrelation: Vec<T>,
    /// Bound on the squared magnitude response in the stopband that the
    /// design was solved for.
    pub stopband_bound: T,
    /// Lower and upper bounds on the squared magnitude response in the
    /// passband.
    pub passband_bounds: (T, T),
    /// Passband edge, in radians per sample.
    pub passband_edge: T,
    /// Stopband edge, in radians per sample.
    pub stopband_edge: T,
    /// Number of linear programs solved.
    pub num_lp_solves: usize,
    /// Number of bisection steps performed.
    pub num_bisection_iterations: usize,
    /// Total number of simplex iterations over all the linear programs.
    pub lp_iterations: usize,
}

impl<T: Float + FloatConst> LowpassDesign<T> {
    /// Returns the stopband attenuation of the design in dB.
    pub fn stopband_attenuation_db(&self) -> T {
        -T::from(10.0).unwrap() * self.stopband_bound.log10()
    }

    /// Evaluates the power spectrum `sum r[k] * 2 cos(k w)` at frequency `w`.
    pub fn power_response(&self, w: T) -> T {
        power_response(&self.autocorrelation, w)
    }

    /// Returns the smallest and largest values of the power spectrum over
    /// `num_points` evenly spaced frequencies in the passband.
    pub fn passband_extremes(&self, num_points: usize) -> (T, T) {
        let last = T::from(num_points.max(2) - 1).unwrap();
        let values = (0..num_points.max(2))
            .map(|j| self.power_response(T::from(j).unwrap() * self.passband_edge / last));
        // unwrap will fail if the autocorrelation contains NaN's
        match values.minmax_by(|a, b| a.partial_cmp(b).unwrap()) {
            MinMaxResult::MinMax(min, max) => (min, max),
            MinMaxResult::OneElement(x) => (x, x),
            MinMaxResult::NoElements => (T::nan(), T::nan()),
        }
    }

    /// Returns the linear-phase taps associated with the design.
    ///
    /// This is the symmetric sequence `r[N], ..., r[1], r[0], r[1], ...,
    /// r[N]` of 2N + 1 taps. It is the convolution of the minimum-phase taps
    /// with their time reversal, so its zero-phase amplitude response is the
    /// power spectrum of the design.
    pub fn linear_phase_taps(&self) -> Vec<T> {
        self.autocorrelation
            .iter()
            .skip(1)
            .rev()
            .chain(self.autocorrelation.iter())
            .copied()
            .collect()
    }
}

pub(crate) fn power_response<T: Float>(r: &[T], w: T) -> T {
    let two = T::from(2.0).unwrap();
    r.iter()
        .enumerate()
        .skip(1)
        .fold(r[0], |acc, (k, &rk)| acc + two * rk * (T::from(k).unwrap() * w).cos())
}
