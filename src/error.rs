//! Error types used by `specfact_fir`.

use thiserror::Error;

/// `specfact_fir` `Result` type.
pub type Result<T> = core::result::Result<T, Error>;

/// `specfact_fir` error.
///
/// This enum represents all the errors that can be produced while designing a
/// filter. No partial design is ever returned together with an error.
#[derive(Error, Debug)]
pub enum Error {
    /// The filter specification is malformed.
    ///
    /// This is detected before any optimization is attempted.
    #[error("invalid filter specification: {0}")]
    InvalidSpec(InvalidSpec),
    /// No autocorrelation sequence satisfies the constraints.
    ///
    /// The bands are too tight for the requested filter order. The error
    /// carries the tightest squared stopband bound that the oracle found to
    /// be achievable, so that the caller can decide how much to relax the
    /// specification or how much to increase the order.
    #[error(
        "no filter of this order meets the specification \
         (tightest achievable stopband level is {best_stopband_db:.2} dB)"
    )]
    Infeasible {
        /// Tightest achievable bound on the squared magnitude in the stopband.
        best_stopband_sq: f64,
        /// The same bound in dB, `10 * log10(best_stopband_sq)`.
        best_stopband_db: f64,
    },
    /// The linear programming solver exhausted its iteration or time budget.
    ///
    /// Unlike [`Error::Infeasible`], this does not prove that the
    /// specification cannot be met.
    #[error("solver budget exhausted after {iterations} simplex iterations")]
    Timeout {
        /// Number of simplex iterations performed before giving up.
        iterations: usize,
    },
    /// The autocorrelation sequence could not be factorized into filter taps.
    #[error("spectral factorization failed: {0}")]
    Factorization(FactorizationError),
}

/// Invalid filter specification error.
///
/// This enum classifies the ways in which a filter specification can be
/// rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidSpec {
    /// The filter order is zero.
    #[error("the filter order must be positive")]
    OrderZero,
    /// The frequency grid has fewer samples than unknowns.
    #[error("the frequency grid has {samples} samples, at least {required} are needed")]
    GridTooCoarse {
        /// Number of samples in the grid.
        samples: usize,
        /// Minimum number of samples required.
        required: usize,
    },
    /// The number of grid samples does not fit in a `usize`.
    #[error("a grid of density {density} for order {order} is too large")]
    GridTooLarge {
        /// Filter order.
        order: usize,
        /// Grid density.
        density: usize,
    },
    /// A band edge is not finite or lies outside of (0, pi).
    #[error("band edges must lie in the open interval (0, pi)")]
    BandEdgesOutOfBounds,
    /// The passband edge is not below the stopband edge.
    #[error("the passband edge must be below the stopband edge")]
    BandEdgesWrongOrder,
    /// A ripple or attenuation value is out of range.
    #[error("ripple specification out of range: {0}")]
    RippleOutOfRange(&'static str),
    /// A solver setting is not positive.
    #[error("solver setting must be positive: {0}")]
    SolverSetting(&'static str),
    /// No grid sample falls in the passband.
    #[error("no grid sample falls in the passband")]
    EmptyPassband,
    /// No grid sample falls in the stopband.
    #[error("no grid sample falls in the stopband")]
    EmptyStopband,
}

impl From<InvalidSpec> for Error {
    fn from(value: InvalidSpec) -> Error {
        Error::InvalidSpec(value)
    }
}

/// Spectral factorization error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FactorizationError {
    /// The power spectrum takes a negative value on the design grid.
    ///
    /// This indicates that the solver tolerance was violated.
    #[error("power spectrum is negative ({min_value:e}) at a grid frequency")]
    NegativeSpectrum {
        /// Smallest sampled value of the power spectrum.
        min_value: f64,
    },
    /// The zero-lag autocorrelation, which is the filter energy, is not
    /// positive.
    #[error("the autocorrelation at lag zero is not positive")]
    ZeroEnergy,
    /// The roots of the power spectrum polynomial could not be computed.
    #[error("root finding failed: {0}")]
    RootFinding(String),
    /// The roots could not be split into a minimum-phase factor of the
    /// expected degree.
    #[error("expected {expected} minimum-phase roots, found {found}")]
    RootCount {
        /// Degree of the minimum-phase factor.
        expected: usize,
        /// Number of roots assigned to it.
        found: usize,
    },
}

impl From<FactorizationError> for Error {
    fn from(value: FactorizationError) -> Error {
        Error::Factorization(value)
    }
}
