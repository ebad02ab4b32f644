//! Feasibility oracle.
//!
//! The oracle finds an autocorrelation sequence that satisfies a
//! [`ConstraintSystem`] by solving linear programs with [`linprog`]. Among
//! the feasible sequences, the linear programs select the one with the
//! smallest `r[0]`, which is the energy of the filter taps.

use crate::{
    constraints::ConstraintSystem,
    error::{Error, Result},
    simplex::{LinProgOptions, LinProgStatus, linprog},
    types::Objective,
};
use log::{debug, trace, warn};
use ndarray::{Array1, Array2};
use num_traits::Float;
use std::time::{Duration, Instant};

/// Options of the feasibility oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleOptions<T> {
    /// Relative precision of the bisection, and absolute tolerance with which
    /// solutions are checked against the constraints. The latter is never
    /// below `100 * T::epsilon()`.
    pub tolerance: T,
    /// Maximum number of bisection steps.
    pub max_bisection_iters: usize,
    /// Maximum number of simplex iterations of each linear program.
    pub max_solver_iterations: usize,
    /// Wall-clock budget for a call to [`FeasibilityOracle::solve`].
    pub time_limit: Option<Duration>,
}

/// Solution found by the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSolution<T> {
    /// Autocorrelation sequence `r[0], ..., r[N]`.
    pub autocorrelation: Vec<T>,
    /// Stopband bound on the squared magnitude that `autocorrelation`
    /// satisfies.
    ///
    /// This is the bound of the last feasible linear program, unless the
    /// power spectrum of `autocorrelation` exceeds it by more than the
    /// relative tolerance on some stopband sample. Then it is the largest
    /// stopband value of the power spectrum.
    pub stopband_sq: T,
    /// Number of linear programs solved.
    pub num_lp_solves: usize,
    /// Number of bisection steps performed.
    pub num_bisection_iterations: usize,
    /// Total number of simplex iterations.
    pub lp_iterations: usize,
}

/// Feasibility oracle.
#[derive(Debug)]
pub struct FeasibilityOracle<'a, T> {
    constraints: &'a ConstraintSystem<T>,
    options: OracleOptions<T>,
}

// Book-keeping of one call to solve.
struct Run<'a, T> {
    constraints: &'a ConstraintSystem<T>,
    tolerance: T,
    validation_tolerance: T,
    lp_options: LinProgOptions<T>,
    num_lp_solves: usize,
    num_bisection_iterations: usize,
    lp_iterations: usize,
}

impl<'a, T: Float> FeasibilityOracle<'a, T> {
    /// Creates an oracle for the given constraints.
    pub fn new(constraints: &'a ConstraintSystem<T>, options: OracleOptions<T>) -> Self {
        FeasibilityOracle {
            constraints,
            options,
        }
    }

    /// Solves the design problem with the given objective.
    ///
    /// Fails with [`Error::Infeasible`] if the stopband bound of the
    /// constraints cannot be met. In that case the error reports the
    /// tightest bound that can be met, found by bisection. Fails with
    /// [`Error::Timeout`] if the solver budget is exhausted.
    pub fn solve(&self, objective: Objective) -> Result<OracleSolution<T>> {
        let mut run = Run {
            constraints: self.constraints,
            tolerance: self.options.tolerance,
            validation_tolerance: self
                .options
                .tolerance
                .max(T::epsilon() * T::from(100.0).unwrap()),
            lp_options: LinProgOptions {
                max_iterations: self.options.max_solver_iterations,
                deadline: self.options.time_limit.map(|limit| Instant::now() + limit),
                ..LinProgOptions::default()
            },
            num_lp_solves: 0,
            num_bisection_iterations: 0,
            lp_iterations: 0,
        };
        let max_iters = self.options.max_bisection_iters;
        let specified = self.constraints.stopband_upper_sq();
        let (autocorrelation, bound) = match objective {
            Objective::Feasibility => match run.feasible(specified)? {
                Some(r) => (r, specified),
                None => return Err(run.infeasible(max_iters)?),
            },
            Objective::Bisection => match run.feasible(specified)? {
                Some(r) => run.tighten(r, specified, max_iters)?,
                None => return Err(run.infeasible(max_iters)?),
            },
            Objective::Minimax => run.minimax(specified)?,
        };
        // Validation is absolute, so bounds near or below the validation
        // tolerance are checked against the solution itself.
        let measured = self.constraints.max_stopband_response(&autocorrelation);
        let stopband_sq = if measured > bound * (T::one() + self.options.tolerance) {
            debug!(
                "stopband bound {:e} exceeded by the solution, reporting {:e}",
                bound.to_f64().unwrap_or(f64::NAN),
                measured.to_f64().unwrap_or(f64::NAN)
            );
            measured
        } else {
            bound
        };
        Ok(OracleSolution {
            autocorrelation,
            stopband_sq,
            num_lp_solves: run.num_lp_solves,
            num_bisection_iterations: run.num_bisection_iterations,
            lp_iterations: run.lp_iterations,
        })
    }
}

impl<T: Float> Run<'_, T> {
    fn linprog(
        &mut self,
        c: Array1<T>,
        (g, h): (Array2<T>, Array1<T>),
    ) -> Result<LinProgStatus<T>> {
        self.num_lp_solves += 1;
        match linprog(&c, &g, &h, &self.lp_options) {
            Ok(result) => {
                trace!(
                    "linear program {} finished after {} iterations",
                    self.num_lp_solves, result.iterations
                );
                self.lp_iterations += result.iterations;
                Ok(result.status)
            }
            Err(Error::Timeout { iterations }) => Err(Error::Timeout {
                iterations: self.lp_iterations + iterations,
            }),
            Err(e) => Err(e),
        }
    }

    // Solves the feasibility problem for a stopband bound. Returns the
    // minimum energy solution, or None if there is no solution that passes
    // validation.
    fn feasible(&mut self, stopband_sq: T) -> Result<Option<Vec<T>>> {
        let n = self.constraints.num_coefficients();
        let c = Array1::from_shape_fn(n, |j| if j == 0 { T::one() } else { T::zero() });
        let status = self.linprog(c, self.constraints.inequalities(stopband_sq))?;
        Ok(match status {
            LinProgStatus::Optimal { x, .. } => self.validate(x.to_vec(), stopband_sq),
            LinProgStatus::Infeasible => None,
            LinProgStatus::Unbounded => {
                warn!("feasibility problem reported as unbounded");
                None
            }
        })
    }

    fn validate(&self, r: Vec<T>, stopband_sq: T) -> Option<Vec<T>> {
        let violation = self.constraints.max_violation(&r, stopband_sq);
        if violation <= self.validation_tolerance {
            Some(r)
        } else {
            debug!(
                "discarding solution that violates the constraints by {:e}",
                violation.to_f64().unwrap_or(f64::NAN)
            );
            None
        }
    }

    fn converged(&self, lo: T, hi: T, max_iters: usize) -> bool {
        self.num_bisection_iterations >= max_iters || hi - lo <= self.tolerance * hi
    }

    // Bisects the stopband bound downwards from a feasible bound, keeping the
    // last feasible solution.
    fn tighten(&mut self, mut best: Vec<T>, hi: T, max_iters: usize) -> Result<(Vec<T>, T)> {
        let two = T::from(2.0).unwrap();
        let mut lo = T::zero();
        let mut hi = hi;
        while !self.converged(lo, hi, max_iters) {
            let mid = (lo + hi) / two;
            self.num_bisection_iterations += 1;
            match self.feasible(mid)? {
                Some(r) => {
                    hi = mid;
                    best = r;
                }
                None => lo = mid,
            }
            debug!(
                "bisection step {}: stopband bound in [{:e}, {:e}]",
                self.num_bisection_iterations,
                lo.to_f64().unwrap_or(f64::NAN),
                hi.to_f64().unwrap_or(f64::NAN),
            );
        }
        Ok((best, hi))
    }

    // Bisects the stopband bound upwards from an infeasible bound to find the
    // tightest achievable one, and returns the corresponding error. Any
    // bound of one or more is feasible, since r = [1, 0, ..., 0] satisfies
    // it.
    fn infeasible(&mut self, max_iters: usize) -> Result<Error> {
        let two = T::from(2.0).unwrap();
        let mut lo = self.constraints.stopband_upper_sq();
        let mut hi = T::one();
        if lo >= hi {
            return Ok(infeasible_error(hi));
        }
        while !self.converged(lo, hi, max_iters) {
            let mid = (lo + hi) / two;
            self.num_bisection_iterations += 1;
            if self.feasible(mid)?.is_some() {
                hi = mid;
            } else {
                lo = mid;
            }
            debug!(
                "bisection step {}: achievable stopband bound in [{:e}, {:e}]",
                self.num_bisection_iterations,
                lo.to_f64().unwrap_or(f64::NAN),
                hi.to_f64().unwrap_or(f64::NAN),
            );
        }
        Ok(infeasible_error(hi))
    }

    // Minimizes the stopband bound t directly, then re-solves the feasibility
    // problem slightly above the optimum to obtain the minimum energy
    // solution.
    fn minimax(&mut self, specified: T) -> Result<(Vec<T>, T)> {
        let n = self.constraints.num_coefficients();
        let c = Array1::from_shape_fn(n + 1, |j| if j == n { T::one() } else { T::zero() });
        let status = self.linprog(c, self.constraints.minimax_inequalities())?;
        let LinProgStatus::Optimal { x, .. } = status else {
            warn!("minimax problem has no solution");
            return Err(infeasible_error(T::one()));
        };
        let t = x[n].max(T::zero());
        debug!("minimax stopband bound {:e}", t.to_f64().unwrap_or(f64::NAN));
        if t > specified * (T::one() + self.tolerance) {
            return Err(infeasible_error(t));
        }
        let bound = (t * (T::one() + self.tolerance)).min(specified);
        if let Some(r) = self.feasible(bound)? {
            return Ok((r, bound));
        }
        // fall back to the minimax solution itself
        let r = x.iter().take(n).copied().collect();
        match self.validate(r, bound) {
            Some(r) => Ok((r, bound)),
            None => Err(infeasible_error(t)),
        }
    }
}

fn infeasible_error<T: Float>(best: T) -> Error {
    let best_stopband_sq = best.to_f64().unwrap_or(f64::NAN);
    Error::Infeasible {
        best_stopband_sq,
        best_stopband_db: 10.0 * best_stopband_sq.log10(),
    }
}
