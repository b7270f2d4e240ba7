//! Equation of motion with contact forces and actuation torque.
//!
//! ```text
//! H alpha_d + C = Jcᵀ lambda + Sᵀ torque
//! ```
//!
//! is written as the equality `[H  -Jcᵀ  -Sᵀ] x = -C` (one row per dof),
//! and the torque block is bounded by [`TorqueBounds`].

use nalgebra::{DMatrix, DVector};
use qptasks_rbd::config::check_dofs;
use qptasks_rbd::jacobian::linear_rows;
use qptasks_rbd::{ForwardDynamics, Jacobian, MultiBody, MultiBodyConfig};

use crate::constraint::{BoundBlock, Constraint, EqualityBlock};
use crate::error::{ConfigurationError, QpError};
use crate::layout::{LayoutStamp, SolverData};

/// Per-joint torque limits, nested like `MultiBodyConfig::joint_torque`.
///
/// Only the entries of actuated dofs are used.
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueBounds {
    pub lower: Vec<Vec<f64>>,
    pub upper: Vec<Vec<f64>>,
}

impl TorqueBounds {
    /// Symmetric limits from the model's joint effort limits; joints without
    /// a limit are unbounded.
    pub fn from_model(mb: &MultiBody) -> Self {
        let (lower, upper) = mb
            .joints()
            .iter()
            .map(|j| {
                let e = j.effort_limit.unwrap_or(f64::INFINITY);
                (vec![-e; j.dof()], vec![e; j.dof()])
            })
            .unzip();
        Self { lower, upper }
    }

    /// No limits at all.
    pub fn unbounded(mb: &MultiBody) -> Self {
        Self {
            lower: mb.joints().iter().map(|j| vec![f64::NEG_INFINITY; j.dof()]).collect(),
            upper: mb.joints().iter().map(|j| vec![f64::INFINITY; j.dof()]).collect(),
        }
    }

    /// Limits of the actuated dofs, in torque-vector order.
    pub fn actuated(&self, mb: &MultiBody) -> Result<(DVector<f64>, DVector<f64>), QpError> {
        check_dofs(mb, "torque lower bound", &self.lower)?;
        check_dofs(mb, "torque upper bound", &self.upper)?;
        let lower = qptasks_rbd::config::flatten(&self.lower);
        let upper = qptasks_rbd::config::flatten(&self.upper);
        let pick = |v: &DVector<f64>| {
            DVector::from_iterator(mb.nr_actuated_dof(), mb.actuated_dofs().iter().map(|&d| v[d]))
        };
        Ok((pick(&lower), pick(&upper)))
    }
}

/// Dynamics consistency (equality) and actuation limits (bound).
pub struct MotionConstr {
    name: String,
    torque_bounds: TorqueBounds,
    dynamics: ForwardDynamics,
    contact_jacobians: Vec<(usize, Jacobian)>,
    eq: EqualityBlock,
    bound: BoundBlock,
    stamp: LayoutStamp,
}

impl MotionConstr {
    /// The bounds are checked against the model now and again on every resize.
    pub fn new(mb: &MultiBody, torque_bounds: TorqueBounds) -> Result<Self, QpError> {
        torque_bounds.actuated(mb)?;
        Ok(Self {
            name: "motion".into(),
            torque_bounds,
            dynamics: ForwardDynamics::new(mb),
            contact_jacobians: Vec::new(),
            eq: EqualityBlock::default(),
            bound: BoundBlock::default(),
            stamp: LayoutStamp::default(),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub const fn torque_bounds(&self) -> &TorqueBounds {
        &self.torque_bounds
    }

    /// Takes effect at the next update, which fails if the new bounds do
    /// not match the model.
    pub fn set_torque_bounds(&mut self, torque_bounds: TorqueBounds) {
        self.torque_bounds = torque_bounds;
    }

    /// Joint-space inertia from the last update.
    pub const fn h(&self) -> &DMatrix<f64> {
        self.dynamics.h()
    }

    /// Nonlinear effects from the last update.
    pub const fn c(&self) -> &DVector<f64> {
        self.dynamics.c()
    }
}

impl Constraint for MotionConstr {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_nr_vars(&mut self, mb: &MultiBody, data: &SolverData) -> Result<(), QpError> {
        let layout = data.layout();
        if layout.alpha_d != mb.nr_dof() || layout.torque != mb.nr_actuated_dof() {
            return Err(ConfigurationError::DimensionMismatch {
                what: format!("{} model dof", self.name),
                expected: layout.alpha_d,
                got: mb.nr_dof(),
            }
            .into());
        }
        self.eq.resize(layout.alpha_d, layout.nr_vars());
        self.bound.resize(layout.torque_begin(), layout.torque);
        let (lower, upper) = self.torque_bounds.actuated(mb)?;
        self.bound.set(lower, upper);

        self.contact_jacobians = data
            .contacts()
            .iter()
            .flat_map(|c| {
                c.points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (c.point_lambda(i), Jacobian::from_index(mb, c.body, *p)))
            })
            .collect();
        self.stamp.mark(data);
        Ok(())
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError> {
        self.stamp.check(&self.name, data)?;
        let layout = data.layout();
        let (lower, upper) = self.torque_bounds.actuated(mb)?;
        self.bound.set(lower, upper);
        self.dynamics.compute_hc(mb, mbc);

        let (a, b) = self.eq.parts_mut();
        a.fill(0.0);
        a.view_mut((0, 0), (layout.alpha_d, layout.alpha_d))
            .copy_from(self.dynamics.h());
        for (col, jac) in &self.contact_jacobians {
            let jc = linear_rows(&jac.jacobian(mb, mbc));
            a.view_mut((0, *col), (layout.alpha_d, 3))
                .copy_from(&(-jc.transpose()));
        }
        for (k, &dof) in mb.actuated_dofs().iter().enumerate() {
            a[(dof, layout.torque_begin() + k)] = -1.0;
        }
        b.copy_from(&(-self.dynamics.c()));
        Ok(())
    }

    fn equality(&self) -> Option<&EqualityBlock> {
        Some(&self.eq)
    }

    fn bound(&self) -> Option<&BoundBlock> {
        Some(&self.bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use approx::assert_relative_eq;
    use qptasks_rbd::RbdError;
    use qptasks_test_utils::{foot_normals, foot_points, humanoid, standing_config};

    fn left_foot(mb: &MultiBody) -> Contact {
        Contact::on_body(mb, "l_foot", foot_points(), foot_normals()).unwrap()
    }

    #[test]
    fn rows_follow_dof_and_bounds_follow_actuation() {
        let mb = humanoid();
        let data = SolverData::new(&mb, &[left_foot(&mb)], 1).unwrap();
        let mut motion = MotionConstr::new(&mb, TorqueBounds::from_model(&mb)).unwrap();
        motion.update_nr_vars(&mb, &data).unwrap();

        let eq = motion.equality().unwrap();
        assert_eq!(eq.nr_eq_lines(), 30);
        assert_eq!(eq.matrix().ncols(), 66);
        let bound = motion.bound().unwrap();
        assert_eq!(bound.len(), 24);
        assert_eq!(bound.begin_var(), 42);
        assert_relative_eq!(bound.upper()[0], 300.0);
        assert_relative_eq!(bound.lower()[0], -300.0);
    }

    #[test]
    fn row_count_does_not_depend_on_contacts() {
        let mb = humanoid();
        let mut motion = MotionConstr::new(&mb, TorqueBounds::unbounded(&mb)).unwrap();
        for (rev, contacts) in [(1, vec![]), (2, vec![left_foot(&mb)])] {
            let data = SolverData::new(&mb, &contacts, rev).unwrap();
            motion.update_nr_vars(&mb, &data).unwrap();
            assert_eq!(motion.equality().unwrap().nr_eq_lines(), 30);
            assert_eq!(motion.bound().unwrap().len(), 24);
        }
    }

    #[test]
    fn static_rows_hold_gravity() {
        let mb = humanoid();
        let mbc = standing_config(&mb);
        let data = SolverData::new(&mb, &[left_foot(&mb)], 1).unwrap();
        let mut motion = MotionConstr::new(&mb, TorqueBounds::from_model(&mb)).unwrap();
        motion.update_nr_vars(&mb, &data).unwrap();
        motion.update(&mb, &mbc, &data).unwrap();

        let eq = motion.equality().unwrap();
        // Base vertical-force row: -b is the total weight.
        assert_relative_eq!(-eq.vector()[5], mb.total_mass() * 9.81, epsilon = 1e-9);
        // Each foot force z component enters the base z row with -1.
        for i in 0..4 {
            assert_relative_eq!(eq.matrix()[(5, 30 + 3 * i + 2)], -1.0, epsilon = 1e-12);
        }
        // Actuated dof rows pick their own torque.
        assert_relative_eq!(eq.matrix()[(6, 42)], -1.0);
        assert_relative_eq!(eq.matrix()[(5, 42)], 0.0);
    }

    #[test]
    fn update_before_resize_is_rejected() {
        let mb = humanoid();
        let mbc = standing_config(&mb);
        let data = SolverData::new(&mb, &[], 1).unwrap();
        let mut motion = MotionConstr::new(&mb, TorqueBounds::unbounded(&mb)).unwrap();
        assert!(matches!(
            motion.update(&mb, &mbc, &data),
            Err(QpError::InvalidConfiguration(ConfigurationError::NotResized { .. }))
        ));
    }

    #[test]
    fn malformed_torque_bounds_rejected() {
        let mb = humanoid();
        let bounds = TorqueBounds {
            lower: vec![vec![]; 3],
            upper: vec![vec![]; 3],
        };
        assert!(matches!(
            MotionConstr::new(&mb, bounds),
            Err(QpError::Model(RbdError::JointCountMismatch { .. }))
        ));
    }
}
