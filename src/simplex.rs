//! Dense linear programming solver.
//!
//! Solves
//!
//! ```text
//! minimize    c^T x
//! subject to  G x <= h
//! ```
//!
//! over free variables `x`. The design problems have few unknowns (N + 1 or
//! N + 2) and many inequalities (of the order of the grid size), so the solver
//! works on the dual problem in standard form,
//!
//! ```text
//! minimize    h^T y
//! subject to  G^T y = -c,  y >= 0,
//! ```
//!
//! whose tableau only has as many rows as `x` has entries. A two-phase
//! tableau simplex is used, and the primal solution is read from the simplex
//! multipliers of the final basis, which are the reduced costs of the
//! artificial columns.

use crate::error::{Error, Result};
use ndarray::{Array1, Array2, s};
use num_traits::Float;
use std::{cmp::Ordering, time::Instant};

// Number of consecutive degenerate pivots after which pricing switches from
// Dantzig's rule to Bland's rule.
const DEGENERATE_RUN: usize = 50;

// Number of pivots between two recomputations of the tableau from the basis.
const REFACTOR_INTERVAL: usize = 50;

/// Options for the linear programming solver.
#[derive(Debug, Clone, PartialEq)]
pub struct LinProgOptions<T> {
    /// Maximum number of simplex iterations over both phases.
    pub max_iterations: usize,
    /// Tolerance for reduced costs, pivot elements and phase 1 feasibility.
    pub tolerance: T,
    /// Point in time after which the solver gives up.
    pub deadline: Option<Instant>,
}

impl<T: Float> Default for LinProgOptions<T> {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            tolerance: T::from(1e-9)
                .unwrap()
                .max(T::epsilon() * T::from(1e3).unwrap()),
            deadline: None,
        }
    }
}

/// Outcome of a linear program.
#[derive(Debug, Clone, PartialEq)]
pub enum LinProgStatus<T> {
    /// An optimal solution was found.
    Optimal {
        /// Optimal solution vector.
        x: Array1<T>,
        /// Optimal objective value.
        objective: T,
    },
    /// No `x` satisfies the constraints.
    Infeasible,
    /// The objective is unbounded below on the feasible set.
    Unbounded,
}

/// Result of [`linprog`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinProgResult<T> {
    /// Outcome of the linear program.
    pub status: LinProgStatus<T>,
    /// Number of simplex iterations performed.
    pub iterations: usize,
}

/// Solves `min c^T x` subject to `G x <= h`.
///
/// Returns [`Error::Timeout`] if the iteration budget or the deadline in
/// `options` is exhausted.
///
/// # Panics
///
/// Panics if the dimensions of `c`, `g` and `h` are not consistent.
pub fn linprog<T: Float>(
    c: &Array1<T>,
    g: &Array2<T>,
    h: &Array1<T>,
    options: &LinProgOptions<T>,
) -> Result<LinProgResult<T>> {
    assert_eq!(g.ncols(), c.len());
    assert_eq!(g.nrows(), h.len());
    let mut tableau = Tableau::new(c, g, options);

    // Phase 1: minimize the sum of the artificial variables.
    let m = g.nrows();
    let n = c.len();
    let phase1_cost: Vec<T> = (0..m + n)
        .map(|j| if j < m { T::zero() } else { T::one() })
        .collect();
    tableau.run(&phase1_cost, false)?;
    tableau.refactor();
    let infeasibility = tableau.artificial_sum();
    let scale = tableau
        .initial_rhs
        .iter()
        .fold(T::one(), |acc, &b| acc.max(b.abs()));
    if infeasibility > options.tolerance * scale {
        // The dual has no feasible point, so the primal is unbounded (or
        // infeasible, which the design problems never are when the dual is).
        return Ok(LinProgResult {
            status: LinProgStatus::Unbounded,
            iterations: tableau.iterations,
        });
    }
    tableau.drive_out_artificials();

    // Phase 2: minimize h^T y, keeping the artificial variables at zero.
    let phase2_cost: Vec<T> = h
        .iter()
        .copied()
        .chain(std::iter::repeat_n(T::zero(), n))
        .collect();
    let bounded = tableau.run(&phase2_cost, true)?;
    if !bounded {
        // An unbounded dual certifies that the primal is infeasible.
        return Ok(LinProgResult {
            status: LinProgStatus::Infeasible,
            iterations: tableau.iterations,
        });
    }
    tableau.refactor();
    tableau.compute_reduced_costs(&phase2_cost);
    let x: Array1<T> = (0..n)
        .map(|i| -tableau.row_sign[i] * tableau.reduced_costs[m + i])
        .collect();
    let objective = c
        .iter()
        .zip(x.iter())
        .fold(T::zero(), |acc, (&a, &b)| acc + a * b);
    Ok(LinProgResult {
        status: LinProgStatus::Optimal { x, objective },
        iterations: tableau.iterations,
    })
}

struct Tableau<'a, T> {
    // n x (m + n) constraint matrix of the dual in the current basis
    a: Array2<T>,
    rhs: Array1<T>,
    // constraint matrix and right hand side before any pivot, used to
    // recompute the tableau from the basis
    initial: Array2<T>,
    initial_rhs: Array1<T>,
    // sign applied to each row so that the initial right hand side is
    // non-negative
    row_sign: Vec<T>,
    basis: Vec<usize>,
    reduced_costs: Array1<T>,
    num_structural: usize,
    iterations: usize,
    options: &'a LinProgOptions<T>,
}

impl<'a, T: Float> Tableau<'a, T> {
    fn new(c: &Array1<T>, g: &Array2<T>, options: &'a LinProgOptions<T>) -> Tableau<'a, T> {
        let m = g.nrows();
        let n = g.ncols();
        let row_sign: Vec<T> = c
            .iter()
            .map(|&cj| if cj > T::zero() { -T::one() } else { T::one() })
            .collect();
        let a = Array2::from_shape_fn((n, m + n), |(i, j)| {
            if j < m {
                row_sign[i] * g[(j, i)]
            } else if j - m == i {
                T::one()
            } else {
                T::zero()
            }
        });
        let rhs: Array1<T> = (0..n).map(|i| -row_sign[i] * c[i]).collect();
        Tableau {
            initial: a.clone(),
            initial_rhs: rhs.clone(),
            a,
            rhs,
            row_sign,
            basis: (m..m + n).collect(),
            reduced_costs: Array1::zeros(m + n),
            num_structural: m,
            iterations: 0,
            options,
        }
    }

    fn is_artificial(&self, j: usize) -> bool {
        j >= self.num_structural
    }

    fn artificial_sum(&self) -> T {
        self.basis
            .iter()
            .zip(self.rhs.iter())
            .filter(|(j, _)| self.is_artificial(**j))
            .fold(T::zero(), |acc, (_, &b)| acc + b)
    }

    fn compute_reduced_costs(&mut self, cost: &[T]) {
        for (j, d) in self.reduced_costs.iter_mut().enumerate() {
            *d = self
                .basis
                .iter()
                .enumerate()
                .fold(cost[j], |acc, (i, &b)| acc - cost[b] * self.a[(i, j)]);
        }
    }

    // Recomputes the tableau as B^-1 [A | b] from the initial data, using
    // Gaussian elimination with partial pivoting on the basis columns. This
    // discards the rounding errors accumulated by the pivots. The tableau is
    // left untouched if the basis matrix is numerically singular.
    fn refactor(&mut self) {
        let n = self.basis.len();
        let width = self.initial.ncols();
        let mut w = Array2::zeros((n, n + width + 1));
        for i in 0..n {
            for (k, &b) in self.basis.iter().enumerate() {
                w[(i, k)] = self.initial[(i, b)];
            }
            w.slice_mut(s![i, n..n + width])
                .assign(&self.initial.row(i));
            w[(i, n + width)] = self.initial_rhs[i];
        }
        let singular = T::from(1e-14).unwrap();
        for k in 0..n {
            let Some(p) = (k..n).max_by(|&i, &j| {
                w[(i, k)]
                    .abs()
                    .partial_cmp(&w[(j, k)].abs())
                    .unwrap_or(Ordering::Equal)
            }) else {
                return;
            };
            if w[(p, k)].abs() < singular {
                return;
            }
            if p != k {
                for j in 0..w.ncols() {
                    w.swap((k, j), (p, j));
                }
            }
            let pivot = w[(k, k)];
            w.row_mut(k).mapv_inplace(|x| x / pivot);
            let pivot_row = w.row(k).to_owned();
            for i in 0..n {
                let f = w[(i, k)];
                if i != k && f != T::zero() {
                    w.row_mut(i)
                        .zip_mut_with(&pivot_row, |x, &y| *x = *x - f * y);
                }
            }
        }
        self.a.assign(&w.slice(s![.., n..n + width]));
        self.rhs.assign(&w.column(n + width));
    }

    // Runs simplex iterations with the given costs until optimality. Returns
    // false if the problem is unbounded. In phase 2 the artificial variables
    // are not allowed to enter the basis, and those still basic at zero level
    // leave it as soon as their row is involved in a pivot.
    fn run(&mut self, cost: &[T], phase2: bool) -> Result<bool> {
        let tol = self.options.tolerance;
        self.compute_reduced_costs(cost);
        let mut degenerate_pivots = 0;
        let mut since_refactor = 0;
        // columns whose ratio test found no pivot even after a refactor; they
        // can only be reconsidered once the basis changes
        let mut skipped = Vec::new();
        let mut rechecked = false;
        loop {
            if since_refactor >= REFACTOR_INTERVAL {
                self.refactor();
                self.compute_reduced_costs(cost);
                since_refactor = 0;
            }
            let bland = degenerate_pivots >= DEGENERATE_RUN;
            let Some(enter) = self.entering(phase2, bland, &skipped) else {
                return Ok(true);
            };
            let Some(leave) = self.leaving(enter, phase2) else {
                if !rechecked {
                    // the reduced cost may be rounding noise
                    self.refactor();
                    self.compute_reduced_costs(cost);
                    since_refactor = 0;
                    rechecked = true;
                    continue;
                }
                if phase2 {
                    return Ok(false);
                }
                // phase 1 is bounded below by zero
                skipped.push(enter);
                continue;
            };
            if self.iterations >= self.options.max_iterations
                || self.options.deadline.is_some_and(|d| Instant::now() >= d)
            {
                return Err(Error::Timeout {
                    iterations: self.iterations,
                });
            }
            let step = self.rhs[leave] / self.a[(leave, enter)];
            if step.abs() <= tol {
                degenerate_pivots += 1;
            } else {
                degenerate_pivots = 0;
            }
            self.pivot(leave, enter);
            self.iterations += 1;
            since_refactor += 1;
            skipped.clear();
            rechecked = false;
        }
    }

    fn entering(&self, phase2: bool, bland: bool, skipped: &[usize]) -> Option<usize> {
        let tol = self.options.tolerance;
        let allowed = |j: usize| !(phase2 && self.is_artificial(j)) && !skipped.contains(&j);
        let mut candidates = self
            .reduced_costs
            .iter()
            .enumerate()
            .filter(|&(j, &d)| allowed(j) && d < -tol);
        if bland {
            candidates.next().map(|(j, _)| j)
        } else {
            // most negative reduced cost, lowest index on ties
            candidates
                .fold(None, |best: Option<(usize, T)>, (j, &d)| match best {
                    Some((_, db)) if db <= d => best,
                    _ => Some((j, d)),
                })
                .map(|(j, _)| j)
        }
    }

    // Harris ratio test. The first pass finds the minimum ratio with the
    // right hand sides relaxed by the tolerance. The second pass picks, among
    // the rows whose exact ratio does not exceed it, the one with the largest
    // pivot element.
    fn leaving(&self, enter: usize, phase2: bool) -> Option<usize> {
        let tol = self.options.tolerance;
        let zero = T::zero();
        let column = self.a.column(enter);
        // (relaxed ratio, exact ratio, pivot magnitude) of each eligible row
        let ratios = column.iter().enumerate().filter_map(|(i, &alpha)| {
            if phase2 && self.is_artificial(self.basis[i]) && alpha.abs() > tol {
                Some((i, zero, zero, alpha.abs()))
            } else if alpha > tol {
                let b = self.rhs[i].max(zero);
                Some((i, (b + tol) / alpha, b / alpha, alpha))
            } else {
                None
            }
        });
        let theta = ratios
            .clone()
            .map(|(_, relaxed, _, _)| relaxed)
            .reduce(|a, b| a.min(b))?;
        ratios
            .filter(|&(_, _, exact, _)| exact <= theta)
            .fold(None, |best: Option<(usize, T)>, (i, _, _, mag)| match best {
                Some((_, mb)) if mb >= mag => best,
                _ => Some((i, mag)),
            })
            .map(|(i, _)| i)
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let p = self.a[(row, col)];
        self.a.row_mut(row).mapv_inplace(|x| x / p);
        self.rhs[row] = self.rhs[row] / p;
        let pivot_row = self.a.row(row).to_owned();
        let pivot_rhs = self.rhs[row];
        for i in 0..self.a.nrows() {
            if i == row {
                continue;
            }
            let f = self.a[(i, col)];
            if f != T::zero() {
                self.a
                    .row_mut(i)
                    .zip_mut_with(&pivot_row, |x, &y| *x = *x - f * y);
                self.rhs[i] = self.rhs[i] - f * pivot_rhs;
            }
        }
        let d = self.reduced_costs[col];
        if d != T::zero() {
            self.reduced_costs
                .zip_mut_with(&pivot_row, |x, &y| *x = *x - d * y);
        }
        self.basis[row] = col;
    }

    // Replaces the artificial variables that are basic at zero level after
    // phase 1 by structural variables. Rows in which every structural entry
    // vanishes are redundant and keep their artificial variable.
    fn drive_out_artificials(&mut self) {
        let tol = self.options.tolerance;
        for i in 0..self.basis.len() {
            if !self.is_artificial(self.basis[i]) {
                continue;
            }
            let best = self
                .a
                .row(i)
                .iter()
                .take(self.num_structural)
                .enumerate()
                .fold(None, |best: Option<(usize, T)>, (j, &x)| match best {
                    Some((_, xb)) if xb >= x.abs() => best,
                    _ => Some((j, x.abs())),
                });
            if let Some((j, x)) = best {
                if x > tol {
                    self.pivot(i, j);
                    self.rhs[i] = T::zero();
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    fn solve(c: Array1<f64>, g: Array2<f64>, h: Array1<f64>) -> LinProgResult<f64> {
        linprog(&c, &g, &h, &LinProgOptions::default()).unwrap()
    }

    #[test]
    fn small_maximization() {
        // maximize x + 2y s.t. x + y <= 4, x <= 2, y <= 3, x, y >= 0
        let c = array![-1.0, -2.0];
        let g = array![
            [1.0, 1.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [-1.0, 0.0],
            [0.0, -1.0]
        ];
        let h = array![4.0, 2.0, 3.0, 0.0, 0.0];
        let result = solve(c, g, h);
        let LinProgStatus::Optimal { x, objective } = result.status else {
            panic!("expected an optimal solution, got {:?}", result.status);
        };
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
        assert!((objective + 7.0).abs() < 1e-9);
    }

    #[test]
    fn free_variables() {
        // minimize x subject to x >= -3 and x <= 5
        let result = solve(array![1.0], array![[-1.0], [1.0]], array![3.0, 5.0]);
        let LinProgStatus::Optimal { x, .. } = result.status else {
            panic!("expected an optimal solution");
        };
        assert!((x[0] + 3.0).abs() < 1e-9);
    }

    #[test]
    fn infeasible() {
        // x <= 1 and x >= 2
        let result = solve(array![0.0], array![[1.0], [-1.0]], array![1.0, -2.0]);
        assert_eq!(result.status, LinProgStatus::Infeasible);
    }

    #[test]
    fn unbounded() {
        // minimize -x subject to x >= 0
        let result = solve(array![-1.0], array![[-1.0]], array![0.0]);
        assert_eq!(result.status, LinProgStatus::Unbounded);
    }

    #[test]
    fn feasibility_with_null_objective() {
        // 1 <= x + y <= 2, x - y = 0 written as two inequalities
        let g = array![[1.0, 1.0], [-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]];
        let h = array![2.0, -1.0, 0.0, 0.0];
        let result = solve(array![0.0, 0.0], g.clone(), h.clone());
        let LinProgStatus::Optimal { x, .. } = result.status else {
            panic!("expected a feasible point");
        };
        let gx = g.dot(&x);
        assert!(gx.iter().zip(h.iter()).all(|(a, b)| *a <= b + 1e-9));
    }

    #[test]
    fn iteration_budget() {
        let c = array![-1.0, -2.0];
        let g = array![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
        let h = array![4.0, 2.0, 3.0, 0.0, 0.0];
        let options = LinProgOptions {
            max_iterations: 0,
            ..LinProgOptions::default()
        };
        assert!(matches!(
            linprog(&c, &g, &h, &options),
            Err(Error::Timeout { iterations: 0 })
        ));
    }
}
