//! Dense QP problem and the interior-point backend that solves it.
//!
//! The stacked problem is
//!
//! ```text
//! minimize    ½ xᵀQx + Cᵀx
//! subject to  A_eq x = b_eq
//!             A_ineq x <= b_ineq
//!             lower <= x <= upper
//! ```
//!
//! and is handed to Clarabel with equality rows in a zero cone and
//! inequality rows plus finite bounds in a non-negative cone.

use std::time::{Duration, Instant};

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{self, NonnegativeConeT, ZeroConeT},
};
use nalgebra::{DMatrix, DVector};

use crate::config::SolverConfig;
use crate::error::SolveFailure;

/// Aggregate problem over the full decision vector.
#[derive(Debug, Clone, PartialEq)]
pub struct QpProblem {
    pub q: DMatrix<f64>,
    pub c: DVector<f64>,
    pub a_eq: DMatrix<f64>,
    pub b_eq: DVector<f64>,
    pub a_ineq: DMatrix<f64>,
    pub b_ineq: DVector<f64>,
    /// Per-variable bounds, `-inf`/`+inf` when unbounded.
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl QpProblem {
    /// Unconstrained problem with zero objective over `nr_vars` variables.
    pub fn new(nr_vars: usize) -> Self {
        Self {
            q: DMatrix::zeros(nr_vars, nr_vars),
            c: DVector::zeros(nr_vars),
            a_eq: DMatrix::zeros(0, nr_vars),
            b_eq: DVector::zeros(0),
            a_ineq: DMatrix::zeros(0, nr_vars),
            b_ineq: DVector::zeros(0),
            lower: DVector::from_element(nr_vars, f64::NEG_INFINITY),
            upper: DVector::from_element(nr_vars, f64::INFINITY),
        }
    }

    pub fn nr_vars(&self) -> usize {
        self.c.len()
    }

    /// Number of finite bound entries on either side.
    pub fn nr_finite_bounds(&self) -> usize {
        self.lower.iter().chain(self.upper.iter()).filter(|v| v.is_finite()).count()
    }

    pub fn objective(&self, x: &DVector<f64>) -> f64 {
        0.5 * x.dot(&(&self.q * x)) + self.c.dot(x)
    }
}

/// Raw result of a backend solve.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSolution {
    pub x: DVector<f64>,
    pub iterations: u32,
    pub solve_time: Duration,
}

/// The external QP solve.
pub trait QpBackend: Send {
    fn name(&self) -> &'static str;

    fn solve(&mut self, problem: &QpProblem, config: &SolverConfig) -> Result<BackendSolution, SolveFailure>;
}

/// Clarabel interior-point solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

impl QpBackend for ClarabelBackend {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&mut self, problem: &QpProblem, config: &SolverConfig) -> Result<BackendSolution, SolveFailure> {
        let start = Instant::now();
        let n = problem.nr_vars();
        let (a_all, b_all, cones) = stack_rows(problem);
        if a_all.nrows() == 0 {
            let x = solve_unconstrained(problem)?;
            return Ok(BackendSolution {
                x,
                iterations: 0,
                solve_time: start.elapsed(),
            });
        }

        let p_csc = dmatrix_to_csc_upper_tri(&problem.q);
        let a_csc = dmatrix_to_csc(&a_all);
        let settings = DefaultSettingsBuilder::default()
            .max_iter(config.max_iter)
            .verbose(config.verbose)
            .tol_gap_abs(config.tol_gap_abs)
            .tol_gap_rel(config.tol_gap_rel)
            .tol_feas(config.tol_feas)
            .build()
            .map_err(|e| SolveFailure::Setup(format!("{e:?}")))?;

        let q_slice: Vec<f64> = problem.c.iter().copied().collect();
        let b_slice: Vec<f64> = b_all.iter().copied().collect();
        let mut solver = DefaultSolver::new(&p_csc, &q_slice, &a_csc, &b_slice, &cones, settings)
            .map_err(|e| SolveFailure::Setup(format!("{e:?}")))?;
        solver.solve();
        let sol = &solver.solution;

        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => Ok(BackendSolution {
                x: DVector::from_column_slice(&sol.x[..n]),
                iterations: sol.iterations,
                solve_time: start.elapsed(),
            }),
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => Err(SolveFailure::Infeasible),
            status => Err(SolveFailure::NotConverged(format!("{status:?}"))),
        }
    }
}

/// Stack equality rows, inequality rows and finite bounds as `A x + s = b`.
fn stack_rows(problem: &QpProblem) -> (DMatrix<f64>, DVector<f64>, Vec<SupportedConeT<f64>>) {
    let n = problem.nr_vars();
    let n_eq = problem.a_eq.nrows();
    let n_ineq = problem.a_ineq.nrows();
    let n_bound = problem.nr_finite_bounds();
    let rows = n_eq + n_ineq + n_bound;

    let mut a = DMatrix::zeros(rows, n);
    let mut b = DVector::zeros(rows);
    a.view_mut((0, 0), (n_eq, n)).copy_from(&problem.a_eq);
    b.rows_mut(0, n_eq).copy_from(&problem.b_eq);
    a.view_mut((n_eq, 0), (n_ineq, n)).copy_from(&problem.a_ineq);
    b.rows_mut(n_eq, n_ineq).copy_from(&problem.b_ineq);

    // x_i <= u_i and -x_i <= -l_i.
    let mut row = n_eq + n_ineq;
    for i in 0..n {
        if problem.upper[i].is_finite() {
            a[(row, i)] = 1.0;
            b[row] = problem.upper[i];
            row += 1;
        }
        if problem.lower[i].is_finite() {
            a[(row, i)] = -1.0;
            b[row] = -problem.lower[i];
            row += 1;
        }
    }

    let mut cones = Vec::with_capacity(2);
    if n_eq > 0 {
        cones.push(ZeroConeT(n_eq));
    }
    if n_ineq + n_bound > 0 {
        cones.push(NonnegativeConeT(n_ineq + n_bound));
    }
    (a, b, cones)
}

/// `x = -Q⁻¹C` when nothing constrains the problem.
fn solve_unconstrained(problem: &QpProblem) -> Result<DVector<f64>, SolveFailure> {
    let chol = problem.q.clone().cholesky().ok_or(SolveFailure::NotPositiveDefinite)?;
    Ok(chol.solve(&(-&problem.c)))
}

// ---------------------------------------------------------------------------
// CSC helpers
// ---------------------------------------------------------------------------

/// Convert a nalgebra `DMatrix<f64>` to Clarabel's `CscMatrix<f64>`.
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Upper triangle of a symmetric `DMatrix<f64>` as a `CscMatrix<f64>`.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows.saturating_sub(1)) {
            // Symmetric part of m.
            let v = 0.5 * (m[(i, j)] + m[(j, i)]);
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}
