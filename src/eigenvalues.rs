use crate::error::{Error, FactorizationError};
use ndarray::Array2;
use num_complex::Complex;

/// Eigenvalue backend.
///
/// This trait models a backend that computes the eigenvalues of square
/// matrices with real scalars of type `T`. The spectral factorizer finds the
/// roots of the power spectrum polynomial as the eigenvalues of its companion
/// matrix.
///
/// Several Rust linear algebra libraries are supported through types that
/// implement this trait. They are optional and selected with feature flags:
///
/// - `faer-backend` feature flag (enabled by default). This defines the
///   `FaerBackend` backend, which uses `faer` to compute eigenvalues.
///
/// - `nalgebra-backend` feature flag. This defines the `NalgebraBackend`,
///   which uses `nalgebra` to compute eigenvalues.
///
/// - `lapack-backend` feature flag. This defines the `LapackBackend` backend,
///   which uses `ndarray_linalg` to compute eigenvalues with LAPACK.
pub trait EigenvalueBackend<T> {
    /// Computes the eigenvalues of a real square matrix with scalar type `T`.
    ///
    /// An error is returned if the eigenvalues cannot be computed.
    ///
    /// # Panics
    ///
    /// This function is allowed to panic if `matrix` is not a square matrix.
    fn eigenvalues(&self, matrix: Array2<T>) -> Result<Vec<Complex<T>>>;
}

type Result<T> = std::result::Result<T, EigenvaluesError>;

/// Eigenvalue calculation error.
///
/// This struct represents an error obtained by an eigenvalue backend during an
/// eigenvalue computation. The error contains a descriptive string of the
/// problem.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct EigenvaluesError(pub String);

impl From<EigenvaluesError> for Error {
    fn from(value: EigenvaluesError) -> Error {
        FactorizationError::RootFinding(value.0).into()
    }
}

#[cfg(any(
    feature = "lapack-backend",
    feature = "faer-backend",
    feature = "nalgebra-backend"
))]
macro_rules! default_eigenvalue_doc {
    () => {
        r#" Default eigenvalue backend.

 This defines the default eigenvalue backend, which depends on what feature
 flags are enabled. The selected default backend is the first available from this priority list:

 - `lapack-backend`
 - `faer-backend`
 - `nalgebra-backend`
"#
    };
}

#[doc = default_eigenvalue_doc!()]
#[cfg(feature = "lapack-backend")]
pub type DefaultEigenvalueBackend = LapackBackend;

#[doc = default_eigenvalue_doc!()]
#[cfg(all(not(feature = "lapack-backend"), feature = "faer-backend"))]
pub type DefaultEigenvalueBackend = FaerBackend;

#[doc = default_eigenvalue_doc!()]
#[cfg(all(
    not(any(feature = "lapack-backend", feature = "faer-backend")),
    feature = "nalgebra-backend"
))]
pub type DefaultEigenvalueBackend = NalgebraBackend;

#[cfg(feature = "lapack-backend")]
pub use lapack::LapackBackend;

#[cfg(feature = "lapack-backend")]
mod lapack {
    use super::*;
    use ndarray_linalg::{EigVals, error::LinalgError};

    /// LAPACK eigenvalue backend.
    ///
    /// This is an eigenvalue backend that uses [`ndarray_linalg`] to compute
    /// eigenvalues with LAPACK. It supports the scalar types natively
    /// supported by LAPACK, which are `f64` and `f32`.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct LapackBackend {}

    macro_rules! impl_lapack {
        ($t:ty) => {
            impl EigenvalueBackend<$t> for LapackBackend {
                fn eigenvalues(&self, matrix: Array2<$t>) -> Result<Vec<Complex<$t>>> {
                    let eig = matrix.eigvals()?;
                    Ok(eig.into_iter().map(|z| Complex::new(z.re, z.im)).collect())
                }
            }
        };
    }

    impl_lapack!(f64);
    impl_lapack!(f32);

    impl From<LinalgError> for EigenvaluesError {
        fn from(value: LinalgError) -> EigenvaluesError {
            EigenvaluesError(value.to_string())
        }
    }
}

#[cfg(feature = "faer-backend")]
pub use faer::FaerBackend;

#[cfg(feature = "faer-backend")]
mod faer {
    use super::*;
    use ::faer::{linalg::evd::EvdError, traits::RealField};
    use faer_ext::IntoFaer;

    /// faer eigenvalue backend.
    ///
    /// This is an eigenvalue backend that uses [`faer`](::faer) to compute
    /// eigenvalues. The calculations are done natively with the scalar type
    /// of the design.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct FaerBackend {}

    /// Marker trait used to mark for which types `T` that have the trait
    /// [`RealField`](RealField), the trait `EigenvalueBackend<T>` is
    /// implemented for `FaerBackend`.
    ///
    /// A blanket implementation over `RealField` would prevent specialized
    /// implementations for other scalar types, because the upstream crate
    /// could implement `RealField` for them at any point.
    pub trait IsRealField: RealField {}
    impl IsRealField for f64 {}
    impl IsRealField for f32 {}

    impl<T: IsRealField> EigenvalueBackend<T> for FaerBackend {
        fn eigenvalues(&self, matrix: Array2<T>) -> Result<Vec<Complex<T>>> {
            let matrix = matrix.view().into_faer();
            let eig = matrix.eigenvalues()?;
            Ok(eig)
        }
    }

    impl From<EvdError> for EigenvaluesError {
        fn from(value: EvdError) -> EigenvaluesError {
            match value {
                EvdError::NoConvergence => EigenvaluesError("no convergence".to_string()),
            }
        }
    }
}

#[cfg(feature = "nalgebra-backend")]
pub use nalgebra::NalgebraBackend;

#[cfg(feature = "nalgebra-backend")]
mod nalgebra {
    use super::*;
    use ::nalgebra::{DMatrix, RealField};

    /// nalgebra eigenvalue backend.
    ///
    /// This is an eigenvalue backend that uses [`nalgebra`](::nalgebra) to
    /// compute eigenvalues. It supports `f32` and `f64`.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct NalgebraBackend {}

    /// Marker trait used to mark for which types `T` that have the trait
    /// [`RealField`](RealField), the trait `EigenvalueBackend<T>` is
    /// implemented for `NalgebraBackend`.
    pub trait IsRealField: RealField {}
    impl IsRealField for f64 {}
    impl IsRealField for f32 {}

    impl<T: IsRealField> EigenvalueBackend<T> for NalgebraBackend {
        fn eigenvalues(&self, matrix: Array2<T>) -> Result<Vec<Complex<T>>> {
            let matrix = DMatrix::from_row_iterator(matrix.nrows(), matrix.ncols(), matrix);
            let eig = matrix.complex_eigenvalues();
            Ok(eig.into_iter().cloned().collect())
        }
    }
}
