//! # FIR lowpass design by spectral factorization
//!
//! The [`specfact_fir`](crate) crate designs FIR lowpass filters of a fixed
//! order N by optimizing over the power spectrum of the filter instead of
//! over its taps. The power spectrum of a filter with taps `h` is
//!
//! ```text
//! |H(w)|^2 = r[0] + 2 r[1] cos(w) + ... + 2 r[N] cos(N w),
//! ```
//!
//! where `r` is the autocorrelation sequence of `h`. Bounds on `|H(w)|^2` are
//! linear in `r`, so a lowpass specification with passband ripple and
//! stopband attenuation requirements becomes a linear program once the
//! frequency axis is sampled on a dense grid. The solution `r` is then
//! converted into the causal minimum-phase taps `h` by spectral
//! factorization.
//!
//! The design proceeds in the following stages:
//!
//! 1. A uniform [`FrequencyGrid`] over `[0, pi]` is built, and the
//!    [`BasisMatrix`] of cosines evaluates the power spectrum on it.
//!
//! 2. The grid is partitioned into a passband, a transition band and a
//!    stopband ([`BandIndices`]). The transition band is only constrained by
//!    the non-negativity of the power spectrum.
//!
//! 3. The [`ConstraintSystem`] bounds the power spectrum to
//!    `[Lp^2, Up^2]` in the passband and to `[0, Sp^2]` in the stopband.
//!
//! 4. The [`FeasibilityOracle`] solves linear programs over these
//!    constraints with a dense simplex solver ([`linprog`]). By default it
//!    tightens the stopband bound by bisection to maximize the stopband
//!    attenuation (see [`Objective`]).
//!
//! 5. The [`SpectralFactorizer`] recovers the taps, either by finding the
//!    roots of the power spectrum polynomial, or with Kolmogorov's cepstral
//!    method (see [`FactorizationMethod`]).
//!
//! The linear-phase filter whose taps are the symmetric sequence
//! `r[N], ..., r[0], ..., r[N]` is also available, since its zero-phase
//! amplitude response is the designed power spectrum.
//!
//! ## Examples
//!
//! The main function of this crate is [`design_lowpass`], which takes a
//! [`DesignParameters`] object defining the filter to be constructed and
//! returns a [`LowpassDesign`] struct containing the filter taps and other
//! information. The parameters are usually given with [`FilterSpec`].
//!
//! The following designs a lowpass filter of order 10, with a passband edge
//! at 0.3 pi, a stopband edge at 0.5 pi, a passband ripple of 1 dB and a
//! minimum stopband attenuation of 20 dB.
//!
//! ```
//! # #[cfg(any(feature = "lapack-backend", feature = "faer-backend", feature = "nalgebra-backend"))]
//! # fn main() -> Result<(), specfact_fir::error::Error> {
//! use specfact_fir::{FilterSpec, design_lowpass};
//! use std::f64::consts::PI;
//!
//! let spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0)?;
//! let design = design_lowpass(&spec)?;
//! assert_eq!(design.impulse_response.len(), 11);
//! assert!(design.stopband_attenuation_db() >= 20.0);
//! # Ok(())
//! # }
//! # #[cfg(not(any(feature = "lapack-backend", feature = "faer-backend", feature = "nalgebra-backend")))]
//! # fn main() {}
//! ```
//!
//! The optimizer settings can be changed with the methods of
//! [`ParametersBuilder`]. This designs the same filter without bisection,
//! so that the stopband bound is exactly the specified one, and uses the
//! cepstral factorization method.
//!
//! ```
//! # #[cfg(any(feature = "lapack-backend", feature = "faer-backend", feature = "nalgebra-backend"))]
//! # fn main() -> Result<(), specfact_fir::error::Error> {
//! use specfact_fir::{
//!     FactorizationMethod, FilterSpec, Objective, ParametersBuilder, design_lowpass,
//! };
//! use std::f64::consts::PI;
//!
//! let mut spec = FilterSpec::new(10, 0.3 * PI, 0.5 * PI, 1.0, 20.0)?;
//! spec.set_objective(Objective::Feasibility)
//!     .set_factorization_method(FactorizationMethod::cepstrum());
//! let design = design_lowpass(&spec)?;
//! assert_eq!(design.num_lp_solves, 1);
//! # Ok(())
//! # }
//! # #[cfg(not(any(feature = "lapack-backend", feature = "faer-backend", feature = "nalgebra-backend")))]
//! # fn main() {}
//! ```
//!
//! When the requirements cannot be met with the given order, the design
//! fails with [`Error::Infeasible`](error::Error::Infeasible), which reports
//! the best stopband level that can be achieved. The
//! [`order_estimates`] module can be used to choose an order.
//!
//! ## Building
//!
//! The root-finding factorization computes eigenvalues of companion
//! matrices. The `specfact_fir` crate supports different backends to solve
//! eigenvalue problems. These are selected with feature flags. See
//! [`EigenvalueBackend`] for more details. By default, only the faer backend
//! is enabled, which is a pure Rust implementation.
//!
//! Another supported backend uses `ndarray_linalg` to solve eigenvalue
//! problems with LAPACK. It is enabled with the `lapack-backend` feature
//! flag. Exactly one of the features `openblas-static`, `openblas-system`,
//! `netlib-static`, `netlib-system`, `intel-mkl-static` and
//! `intel-mkl-system` needs to be enabled together with `lapack-backend` to
//! select how to link against LAPACK.
//!
//! ## Logging
//!
//! The crate logs the progress of the design with the [`log`] facade. The
//! bisection steps are logged at the debug level and the simplex iteration
//! counts at the trace level. No logger is installed by the crate.
//!
//! ## References
//!
//! \[1\] S.-P. Wu, S. Boyd and L. Vandenberghe, "FIR Filter Design via
//! Spectral Factorization and Convex Optimization," in Applied and
//! Computational Control, Signals, and Circuits, Birkhauser, 1999.
//!
//! \[2\] A. Kolmogorov, "Sur l'interpolation et extrapolation des suites
//! stationnaires," C. R. Acad. Sci. Paris, vol. 208, pp. 2043-2045, 1939.
//!
//! \[3\] B.N. Parlett and C. Reinsch, "Balancing a matrix for calculation of
//! eigenvalues and eigenvectors". Numer. Math. 13, 293–304 (1969).
//!

#![warn(missing_docs)]

use log::debug;
use num_traits::{Float, FloatConst};
use rustfft::FftNum;

mod bands;
pub use bands::BandIndices;
mod basis;
pub use basis::BasisMatrix;
mod constraints;
pub use constraints::ConstraintSystem;
mod eigenvalues;
#[cfg(any(
    feature = "faer-backend",
    feature = "lapack-backend",
    feature = "nalgebra-backend"
))]
pub use eigenvalues::DefaultEigenvalueBackend;
#[cfg(feature = "faer-backend")]
pub use eigenvalues::FaerBackend;
#[cfg(feature = "lapack-backend")]
pub use eigenvalues::LapackBackend;
#[cfg(feature = "nalgebra-backend")]
pub use eigenvalues::NalgebraBackend;
pub use eigenvalues::{EigenvalueBackend, EigenvaluesError};
pub mod error;
use error::{InvalidSpec, Result};
mod factorize;
pub use factorize::{SpectralFactorizer, autocorrelation};
mod grid;
pub use grid::FrequencyGrid;
mod oracle;
pub use oracle::{FeasibilityOracle, OracleOptions, OracleSolution};
pub mod order_estimates;
mod roots;
pub use roots::polynomial_roots;
mod simplex;
pub use simplex::{LinProgOptions, LinProgResult, LinProgStatus, linprog};
mod types;
pub use types::{
    DesignParameters, FactorizationMethod, FilterSpec, LowpassDesign, Objective,
    ParametersBuilder,
};

/// Lowpass FIR design by linear programming and spectral factorization.
///
/// This function designs the lowpass filter described by `parameters`. It
/// solves for the autocorrelation sequence of the filter with the
/// [`FeasibilityOracle`] and factorizes it with the [`SpectralFactorizer`].
///
/// The type parameter `T` represents the scalar used in all the
/// computations. The type parameter `P` represents the type of the design
/// parameters. It needs to implement the [`DesignParameters`] trait.
///
/// This function uses the [`DefaultEigenvalueBackend`] to compute
/// eigenvalues. The backend that is selected as default backend depends on
/// the feature flags. Use [`design_lowpass_with_backend`] to specify a
/// particular eigenvalue backend.
///
/// # Examples
///
/// See the [crate-level examples](crate#examples).
#[cfg(any(
    feature = "lapack-backend",
    feature = "faer-backend",
    feature = "nalgebra-backend"
))]
pub fn design_lowpass<T, P>(parameters: &P) -> Result<LowpassDesign<T>>
where
    T: Float + FloatConst + FftNum,
    P: DesignParameters<T>,
    DefaultEigenvalueBackend: EigenvalueBackend<T>,
{
    design_lowpass_with_backend(parameters, &DefaultEigenvalueBackend::default())
}

/// Lowpass FIR design with eigenvalue backend.
///
/// This function behaves like [`design_lowpass`], but it additionally allows
/// an eigenvalue backend to be specified. The eigenvalue backend must support
/// the scalar type `T` that is used. See the [`EigenvalueBackend`] trait for
/// more details.
pub fn design_lowpass_with_backend<T, P, B>(
    parameters: &P,
    eigenvalue_backend: &B,
) -> Result<LowpassDesign<T>>
where
    T: Float + FloatConst + FftNum,
    P: DesignParameters<T>,
    B: EigenvalueBackend<T>,
{
    check_parameters(parameters)?;
    let order = parameters.order();
    let passband_edge = parameters.passband_edge();
    let stopband_edge = parameters.stopband_edge();

    let grid = FrequencyGrid::new(order, parameters.grid_density())?;
    let basis = BasisMatrix::new(&grid, order);
    let bands = BandIndices::partition(&grid, passband_edge, stopband_edge)?;
    debug!(
        "grid of {} samples: {} passband, {} transition, {} stopband",
        grid.len(),
        bands.passband.len(),
        bands.transition.len(),
        bands.stopband.len()
    );
    let constraints = ConstraintSystem::new(
        &basis,
        &bands,
        parameters.passband_ripple_db(),
        parameters.stopband_attenuation_db(),
    );

    let oracle = FeasibilityOracle::new(
        &constraints,
        OracleOptions {
            tolerance: parameters.solver_tolerance(),
            max_bisection_iters: parameters.max_bisection_iters(),
            max_solver_iterations: parameters.max_solver_iterations(),
            time_limit: parameters.time_limit(),
        },
    );
    let solution = oracle.solve(parameters.objective())?;
    debug!(
        "oracle solved {} linear programs ({} simplex iterations)",
        solution.num_lp_solves, solution.lp_iterations
    );

    let factorizer = SpectralFactorizer::new(
        parameters.factorization_method(),
        parameters.unit_circle_tolerance(),
        parameters.solver_tolerance(),
    );
    let impulse_response =
        factorizer.factorize(&solution.autocorrelation, &basis, eigenvalue_backend)?;

    Ok(LowpassDesign {
        impulse_response,
        autocorrelation: solution.autocorrelation,
        stopband_bound: solution.stopband_sq,
        passband_bounds: (
            constraints.passband_lower_sq(),
            constraints.passband_upper_sq(),
        ),
        passband_edge,
        stopband_edge,
        num_lp_solves: solution.num_lp_solves,
        num_bisection_iterations: solution.num_bisection_iterations,
        lp_iterations: solution.lp_iterations,
    })
}

// Checks the parameters before any work is done. FilterSpec validates the
// filter requirements when it is constructed, but other implementations of
// DesignParameters may not, and the settings are never validated by the
// setters.
fn check_parameters<T: Float + FloatConst, P: DesignParameters<T>>(parameters: &P) -> Result<()> {
    if parameters.order() == 0 {
        return Err(InvalidSpec::OrderZero.into());
    }
    types::check_band_edges(parameters.passband_edge(), parameters.stopband_edge())?;
    let positive = |x: T| x.is_finite() && x > T::zero();
    if !positive(parameters.passband_ripple_db()) {
        return Err(InvalidSpec::RippleOutOfRange("passband ripple must be positive").into());
    }
    if !positive(parameters.stopband_attenuation_db()) {
        return Err(InvalidSpec::RippleOutOfRange("stopband attenuation must be positive").into());
    }
    if !positive(parameters.solver_tolerance()) {
        return Err(InvalidSpec::SolverSetting("solver tolerance").into());
    }
    if parameters.max_bisection_iters() == 0 {
        return Err(InvalidSpec::SolverSetting("maximum bisection iterations").into());
    }
    if parameters.max_solver_iterations() == 0 {
        return Err(InvalidSpec::SolverSetting("maximum solver iterations").into());
    }
    if parameters.grid_density() == 0 {
        return Err(InvalidSpec::SolverSetting("grid density").into());
    }
    let unit_circle_tolerance = parameters.unit_circle_tolerance();
    if !(positive(unit_circle_tolerance) && unit_circle_tolerance < T::one()) {
        return Err(InvalidSpec::SolverSetting("unit circle tolerance").into());
    }
    if let FactorizationMethod::Cepstrum { oversampling: 0 } = parameters.factorization_method() {
        return Err(InvalidSpec::SolverSetting("cepstrum oversampling").into());
    }
    Ok(())
}
