//! Constraint capabilities and the concrete physical constraints.
//!
//! A constraint contributes rows through up to three capability blocks:
//! [`EqualityBlock`] (`A x = b`), [`InequalityBlock`] (`A x <= b`) and
//! [`BoundBlock`] (`lower <= x[begin..] <= upper`). The solver checks each
//! block through [`Constraint::equality`], [`Constraint::inequality`] and
//! [`Constraint::bound`].

mod contact_acc;
mod friction_cone;
mod motion;

pub use contact_acc::ContactAccConstr;
pub use friction_cone::FrictionConeConstr;
pub use motion::{MotionConstr, TorqueBounds};

use nalgebra::{DMatrix, DVector};
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use crate::error::{Capability, QpError};
use crate::layout::SolverData;
use crate::registry::AsAny;

/// A hard requirement on the decision vector.
///
/// `update_nr_vars` is a purely structural resize for a new layout;
/// `update` refills the numeric rows for the current state and fails if the
/// constraint was not resized for `data` first.
pub trait Constraint: AsAny {
    fn name(&self) -> &str;

    fn update_nr_vars(&mut self, mb: &MultiBody, data: &SolverData) -> Result<(), QpError>;

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError>;

    fn equality(&self) -> Option<&EqualityBlock> {
        None
    }

    fn inequality(&self) -> Option<&InequalityBlock> {
        None
    }

    fn bound(&self) -> Option<&BoundBlock> {
        None
    }

    /// Whether the constraint provides `capability`.
    fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Equality => self.equality().is_some(),
            Capability::Inequality => self.inequality().is_some(),
            Capability::Bound => self.bound().is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// Capability blocks
// ---------------------------------------------------------------------------

/// Rows of `A x = b`.
#[derive(Debug, Clone, Default)]
pub struct EqualityBlock {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl EqualityBlock {
    /// Zero `rows x nr_vars` system.
    pub fn resize(&mut self, rows: usize, nr_vars: usize) {
        self.a = DMatrix::zeros(rows, nr_vars);
        self.b = DVector::zeros(rows);
    }

    pub fn nr_eq_lines(&self) -> usize {
        self.a.nrows()
    }

    pub const fn matrix(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub const fn vector(&self) -> &DVector<f64> {
        &self.b
    }

    /// Mutable `(A, b)` for refilling rows in place.
    pub fn parts_mut(&mut self) -> (&mut DMatrix<f64>, &mut DVector<f64>) {
        (&mut self.a, &mut self.b)
    }
}

/// Rows of `A x <= b`.
#[derive(Debug, Clone, Default)]
pub struct InequalityBlock {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl InequalityBlock {
    /// Zero `rows x nr_vars` system.
    pub fn resize(&mut self, rows: usize, nr_vars: usize) {
        self.a = DMatrix::zeros(rows, nr_vars);
        self.b = DVector::zeros(rows);
    }

    pub fn nr_ineq_lines(&self) -> usize {
        self.a.nrows()
    }

    pub const fn matrix(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub const fn vector(&self) -> &DVector<f64> {
        &self.b
    }

    /// Mutable `(A, b)` for refilling rows in place.
    pub fn parts_mut(&mut self) -> (&mut DMatrix<f64>, &mut DVector<f64>) {
        (&mut self.a, &mut self.b)
    }
}

/// `lower <= x[begin_var .. begin_var + len] <= upper`.
#[derive(Debug, Clone, Default)]
pub struct BoundBlock {
    begin: usize,
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl BoundBlock {
    /// Unbounded range of `len` variables starting at `begin`.
    pub fn resize(&mut self, begin: usize, len: usize) {
        self.begin = begin;
        self.lower = DVector::from_element(len, f64::NEG_INFINITY);
        self.upper = DVector::from_element(len, f64::INFINITY);
    }

    pub const fn begin_var(&self) -> usize {
        self.begin
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub const fn lower(&self) -> &DVector<f64> {
        &self.lower
    }

    pub const fn upper(&self) -> &DVector<f64> {
        &self.upper
    }

    /// Replaces both limits; lengths must match the resized range.
    pub fn set(&mut self, lower: DVector<f64>, upper: DVector<f64>) {
        debug_assert_eq!(lower.len(), self.lower.len());
        debug_assert_eq!(upper.len(), self.upper.len());
        self.lower = lower;
        self.upper = upper;
    }
}
