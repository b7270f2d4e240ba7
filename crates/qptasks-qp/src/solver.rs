//! Task and constraint aggregation into one QP per control cycle.
//!
//! A cycle is `nr_vars` (whenever the contact set changes), then `update`
//! with fresh kinematics. The solver owns every registered task and
//! constraint; typed handles give access to them between cycles.

use std::time::Duration;

use nalgebra::{DMatrix, DVector, Vector3};
use qptasks_rbd::{MultiBody, MultiBodyConfig};
use tracing::{debug, trace, warn};

use crate::backend::{ClarabelBackend, QpBackend, QpProblem};
use crate::config::SolverConfig;
use crate::constraint::{BoundBlock, Constraint, EqualityBlock, InequalityBlock};
use crate::contact::Contact;
use crate::error::{Capability, ConfigurationError, QpError};
use crate::layout::{SolverData, VariableLayout};
use crate::registry::{ConstraintId, Key, Registry, TaskId};
use crate::task::Task;

/// Result of a successful cycle, split along the variable layout.
#[derive(Debug, Clone, PartialEq)]
pub struct QpSolution {
    /// Full decision vector.
    pub x: DVector<f64>,
    pub alpha_d: DVector<f64>,
    pub lambda: DVector<f64>,
    pub torque: DVector<f64>,
    /// World-frame force per contact, per point.
    pub contact_forces: Vec<Vec<Vector3<f64>>>,
    pub iterations: u32,
    pub solve_time: Duration,
}

/// Whole-body QP controller.
pub struct QpSolver {
    config: SolverConfig,
    backend: Box<dyn QpBackend>,
    tasks: Registry<dyn Task>,
    constraints: Registry<dyn Constraint>,
    equality: Vec<Key>,
    inequality: Vec<Key>,
    bound: Vec<Key>,
    data: Option<SolverData>,
    revision: u64,
    solution: Option<QpSolution>,
}

impl QpSolver {
    /// Solver using the Clarabel backend.
    pub fn new(config: SolverConfig) -> Result<Self, QpError> {
        Self::with_backend(config, ClarabelBackend)
    }

    pub fn with_backend(config: SolverConfig, backend: impl QpBackend + 'static) -> Result<Self, QpError> {
        config.validate()?;
        Ok(Self {
            config,
            backend: Box::new(backend),
            tasks: Registry::default(),
            constraints: Registry::default(),
            equality: Vec::new(),
            inequality: Vec::new(),
            bound: Vec::new(),
            data: None,
            revision: 0,
            solution: None,
        })
    }

    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) -> Result<(), QpError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // -----------------------------------------------------------------------
    // Cycle
    // -----------------------------------------------------------------------

    /// Recompute the variable layout for `contacts` and resize every
    /// registered task and constraint.
    ///
    /// On error the solver is left without a layout.
    pub fn nr_vars(&mut self, mb: &MultiBody, contacts: &[Contact]) -> Result<VariableLayout, QpError> {
        self.data = None;
        self.solution = None;
        self.revision += 1;
        let data = SolverData::new(mb, contacts, self.revision)?;
        let layout = data.layout();
        debug!(
            alpha_d = layout.alpha_d,
            lambda = layout.lambda,
            torque = layout.torque,
            nr_vars = layout.nr_vars(),
            contacts = contacts.len(),
            revision = self.revision,
            "variable layout recomputed"
        );

        for entry in self.constraints.entries_mut() {
            entry.value.update_nr_vars(mb, &data)?;
            entry.revision = Some(data.revision());
        }
        for entry in self.tasks.entries_mut() {
            entry.value.update_nr_vars(mb, &data)?;
            entry.revision = Some(data.revision());
        }
        self.data = Some(data);
        Ok(layout)
    }

    pub fn layout(&self) -> Option<VariableLayout> {
        self.data.as_ref().map(SolverData::layout)
    }

    pub const fn data(&self) -> Option<&SolverData> {
        self.data.as_ref()
    }

    /// Refresh every task and constraint for `mbc`, assemble the QP and
    /// solve it.
    ///
    /// `mbc` must have up-to-date forward kinematics and velocity. On
    /// failure no solution is kept for this cycle.
    pub fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<&QpSolution, QpError> {
        self.solution = None;
        let Some(data) = self.data.as_ref() else {
            return Err(ConfigurationError::LayoutNotComputed.into());
        };

        for entry in self.constraints.entries_mut() {
            if entry.revision != Some(data.revision()) {
                entry.value.update_nr_vars(mb, data)?;
                entry.revision = Some(data.revision());
            }
            entry.value.update(mb, mbc, data)?;
        }
        for entry in self.tasks.entries_mut() {
            if entry.revision != Some(data.revision()) {
                entry.value.update_nr_vars(mb, data)?;
                entry.revision = Some(data.revision());
            }
            entry.value.update(mb, mbc, data)?;
        }

        let layout = data.layout();
        let mut problem = QpProblem::new(layout.nr_vars());
        self.add_objectives(&mut problem)?;
        let equality: Vec<&EqualityBlock> = self
            .equality
            .iter()
            .filter_map(|k| self.constraints.get(*k).and_then(|c| c.equality()))
            .collect();
        let inequality: Vec<&InequalityBlock> = self
            .inequality
            .iter()
            .filter_map(|k| self.constraints.get(*k).and_then(|c| c.inequality()))
            .collect();
        let bounds: Vec<&BoundBlock> = self
            .bound
            .iter()
            .filter_map(|k| self.constraints.get(*k).and_then(|c| c.bound()))
            .collect();
        (problem.a_eq, problem.b_eq) = stack(
            "equality",
            equality.iter().map(|b| (b.matrix(), b.vector())),
            layout.nr_vars(),
        )?;
        (problem.a_ineq, problem.b_ineq) = stack(
            "inequality",
            inequality.iter().map(|b| (b.matrix(), b.vector())),
            layout.nr_vars(),
        )?;
        for block in bounds {
            intersect_bounds(&mut problem, block)?;
        }
        trace!(
            nr_vars = problem.nr_vars(),
            eq_rows = problem.a_eq.nrows(),
            ineq_rows = problem.a_ineq.nrows(),
            finite_bounds = problem.nr_finite_bounds(),
            "assembled QP"
        );

        let sol = match self.backend.solve(&problem, &self.config) {
            Ok(sol) => sol,
            Err(failure) => {
                warn!(reason = %failure, backend = self.backend.name(), "QP solve failed");
                return Err(failure.into());
            }
        };
        if sol.x.len() != layout.nr_vars() {
            return Err(ConfigurationError::DimensionMismatch {
                what: "backend solution".into(),
                expected: layout.nr_vars(),
                got: sol.x.len(),
            }
            .into());
        }

        let x = sol.x;
        let contact_forces = data
            .contacts()
            .iter()
            .map(|c| {
                (0..c.points.len())
                    .map(|i| {
                        let k = c.point_lambda(i);
                        Vector3::new(x[k], x[k + 1], x[k + 2])
                    })
                    .collect()
            })
            .collect();
        let solution = QpSolution {
            alpha_d: x.rows(layout.alpha_d_begin(), layout.alpha_d).into_owned(),
            lambda: x.rows(layout.lambda_begin(), layout.lambda).into_owned(),
            torque: x.rows(layout.torque_begin(), layout.torque).into_owned(),
            contact_forces,
            iterations: sol.iterations,
            solve_time: sol.solve_time,
            x,
        };
        Ok(&*self.solution.insert(solution))
    }

    /// Solution of the last successful cycle.
    pub const fn solution(&self) -> Option<&QpSolution> {
        self.solution.as_ref()
    }

    fn add_objectives(&self, problem: &mut QpProblem) -> Result<(), QpError> {
        let n = problem.nr_vars();
        for task in self.tasks.values() {
            let (q, c, begin) = (task.q(), task.c(), task.begin());
            let m = c.len();
            if q.shape() != (m, m) || begin + m > n {
                return Err(ConfigurationError::DimensionMismatch {
                    what: format!("task {} objective", task.name()),
                    expected: n.saturating_sub(begin),
                    got: q.nrows().max(m),
                }
                .into());
            }
            let mut q_block = problem.q.view_mut((begin, begin), (m, m));
            q_block += q;
            let mut c_block = problem.c.rows_mut(begin, m);
            c_block += c;
        }
        for i in 0..n {
            problem.q[(i, i)] += self.config.regularization;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Register a task. It is sized lazily if a layout already exists.
    pub fn add_task<T: Task>(&mut self, task: T) -> TaskId<T> {
        TaskId::new(self.tasks.insert(Box::new(task)))
    }

    /// Unregister a task and hand it back.
    ///
    /// Stale handles, and handles whose slot holds another type, yield
    /// `None` and leave the solver untouched.
    pub fn remove_task<T: Task>(&mut self, id: TaskId<T>) -> Option<T> {
        if !self.tasks.get(id.key)?.as_any().is::<T>() {
            return None;
        }
        let boxed = self.tasks.remove(id.key)?;
        boxed.into_any().downcast::<T>().ok().map(|t| *t)
    }

    pub fn task<T: Task>(&self, id: TaskId<T>) -> Option<&T> {
        self.tasks.get(id.key)?.as_any().downcast_ref::<T>()
    }

    pub fn task_mut<T: Task>(&mut self, id: TaskId<T>) -> Option<&mut T> {
        self.tasks.get_mut(id.key)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn nr_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Unregister every task, leaving constraints untouched.
    pub fn reset_tasks(&mut self) -> Vec<Box<dyn Task>> {
        self.tasks.drain()
    }

    // -----------------------------------------------------------------------
    // Constraints
    // -----------------------------------------------------------------------

    /// Register a constraint in every capability set it supports.
    pub fn add_constraint<T: Constraint>(&mut self, constraint: T) -> ConstraintId<T> {
        let caps: Vec<Capability> = [Capability::Equality, Capability::Inequality, Capability::Bound]
            .into_iter()
            .filter(|cap| constraint.has(*cap))
            .collect();
        let key = self.constraints.insert(Box::new(constraint));
        for cap in caps {
            self.set_mut(cap).push(key);
        }
        ConstraintId::new(key)
    }

    /// Unregister a constraint from every set and hand it back.
    ///
    /// Like [`remove_task`](Self::remove_task), a handle that does not
    /// resolve to a live `T` is a no-op.
    pub fn remove_constraint<T: Constraint>(&mut self, id: ConstraintId<T>) -> Option<T> {
        if !self.constraints.get(id.key)?.as_any().is::<T>() {
            return None;
        }
        let boxed = self.constraints.remove(id.key)?;
        for set in [&mut self.equality, &mut self.inequality, &mut self.bound] {
            set.retain(|k| *k != id.key);
        }
        boxed.into_any().downcast::<T>().ok().map(|c| *c)
    }

    pub fn constraint<T: Constraint>(&self, id: ConstraintId<T>) -> Option<&T> {
        self.constraints.get(id.key)?.as_any().downcast_ref::<T>()
    }

    pub fn constraint_mut<T: Constraint>(&mut self, id: ConstraintId<T>) -> Option<&mut T> {
        self.constraints.get_mut(id.key)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn add_equality_constraint<T: Constraint>(&mut self, id: ConstraintId<T>) -> Result<(), QpError> {
        self.join_set(id.key, Capability::Equality)
    }

    /// Leave the equality set; a no-op for stale handles and non-members.
    pub fn remove_equality_constraint<T: Constraint>(&mut self, id: ConstraintId<T>) {
        self.equality.retain(|k| *k != id.key);
    }

    pub fn add_inequality_constraint<T: Constraint>(&mut self, id: ConstraintId<T>) -> Result<(), QpError> {
        self.join_set(id.key, Capability::Inequality)
    }

    /// Leave the inequality set; a no-op for stale handles and non-members.
    pub fn remove_inequality_constraint<T: Constraint>(&mut self, id: ConstraintId<T>) {
        self.inequality.retain(|k| *k != id.key);
    }

    pub fn add_bound_constraint<T: Constraint>(&mut self, id: ConstraintId<T>) -> Result<(), QpError> {
        self.join_set(id.key, Capability::Bound)
    }

    /// Leave the bound set; a no-op for stale handles and non-members.
    pub fn remove_bound_constraint<T: Constraint>(&mut self, id: ConstraintId<T>) {
        self.bound.retain(|k| *k != id.key);
    }

    /// Registered constraints, whatever their set membership.
    pub fn nr_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn nr_equality_constraints(&self) -> usize {
        self.equality.len()
    }

    pub fn nr_inequality_constraints(&self) -> usize {
        self.inequality.len()
    }

    pub fn nr_bound_constraints(&self) -> usize {
        self.bound.len()
    }

    fn join_set(&mut self, key: Key, capability: Capability) -> Result<(), QpError> {
        let Some(constraint) = self.constraints.get(key) else {
            return Ok(());
        };
        if !constraint.has(capability) {
            return Err(ConfigurationError::MissingCapability {
                name: constraint.name().into(),
                capability,
            }
            .into());
        }
        let set = self.set_mut(capability);
        if !set.contains(&key) {
            set.push(key);
        }
        Ok(())
    }

    fn set_mut(&mut self, capability: Capability) -> &mut Vec<Key> {
        match capability {
            Capability::Equality => &mut self.equality,
            Capability::Inequality => &mut self.inequality,
            Capability::Bound => &mut self.bound,
        }
    }
}

/// Stack row blocks that must all span `nr_vars` columns.
fn stack<'a>(
    kind: &str,
    blocks: impl Iterator<Item = (&'a DMatrix<f64>, &'a DVector<f64>)> + Clone,
    nr_vars: usize,
) -> Result<(DMatrix<f64>, DVector<f64>), QpError> {
    let mut rows = 0;
    for (a, b) in blocks.clone() {
        if a.ncols() != nr_vars || a.nrows() != b.len() {
            return Err(ConfigurationError::DimensionMismatch {
                what: format!("{kind} block columns"),
                expected: nr_vars,
                got: a.ncols(),
            }
            .into());
        }
        rows += a.nrows();
    }
    let mut a_all = DMatrix::zeros(rows, nr_vars);
    let mut b_all = DVector::zeros(rows);
    let mut row = 0;
    for (a, b) in blocks {
        a_all.view_mut((row, 0), (a.nrows(), nr_vars)).copy_from(a);
        b_all.rows_mut(row, b.len()).copy_from(b);
        row += a.nrows();
    }
    Ok((a_all, b_all))
}

/// Tighten `problem`'s bounds with `block`.
fn intersect_bounds(problem: &mut QpProblem, block: &BoundBlock) -> Result<(), QpError> {
    let n = problem.nr_vars();
    if block.begin_var() + block.len() > n {
        return Err(ConfigurationError::DimensionMismatch {
            what: "bound block range end".into(),
            expected: n,
            got: block.begin_var() + block.len(),
        }
        .into());
    }
    for i in 0..block.len() {
        let v = block.begin_var() + i;
        problem.lower[v] = problem.lower[v].max(block.lower()[i]);
        problem.upper[v] = problem.upper[v].min(block.upper()[i]);
    }
    Ok(())
}
