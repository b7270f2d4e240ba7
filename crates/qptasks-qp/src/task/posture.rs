//! Whole-body joint configuration.
//!
//! Only single-dof joints are tracked. Free joints keep zero rows in the
//! Jacobian, so the floating base is left to the other tasks and to the
//! contact constraints.

use nalgebra::{DMatrix, DVector};
use qptasks_rbd::config::check_params;
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use super::{acceleration_objective, check_gain, check_jacobian, check_weight, HighLevelTask, Task};
use crate::error::QpError;
use crate::layout::SolverData;

/// Target joint configuration, usable on its own as a [`Task`] or wrapped
/// in a [`SetPointTask`](super::SetPointTask) as a [`HighLevelTask`].
pub struct PostureTask {
    name: String,
    target: Vec<Vec<f64>>,
    stiffness: f64,
    damping: f64,
    weight: f64,
    eval: DVector<f64>,
    speed: DVector<f64>,
    normal_acc: DVector<f64>,
    jac: DMatrix<f64>,
    jac_dot: DMatrix<f64>,
    q: DMatrix<f64>,
    c: DVector<f64>,
}

impl PostureTask {
    /// `target` is nested per joint, shaped like `MultiBodyConfig::q`.
    ///
    /// # Panics
    ///
    /// If `stiffness` or `weight` is negative or not finite.
    pub fn new(mb: &MultiBody, target: Vec<Vec<f64>>, stiffness: f64, weight: f64) -> Result<Self, QpError> {
        check_params(mb, "posture", &target)?;
        check_gain("stiffness", stiffness);
        check_weight(weight);
        let nv = mb.nr_dof();
        let mut jac = DMatrix::zeros(nv, nv);
        for (j, joint) in mb.joints().iter().enumerate() {
            if joint.dof() == 1 && joint.params() == 1 {
                jac[(mb.dof_offset(j), mb.dof_offset(j))] = 1.0;
            }
        }
        Ok(Self {
            name: "posture".into(),
            target,
            stiffness,
            damping: 2.0 * stiffness.sqrt(),
            weight,
            eval: DVector::zeros(nv),
            speed: DVector::zeros(nv),
            normal_acc: DVector::zeros(nv),
            jac,
            jac_dot: DMatrix::zeros(nv, nv),
            q: DMatrix::zeros(0, 0),
            c: DVector::zeros(0),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn posture(&self) -> &[Vec<f64>] {
        &self.target
    }

    pub fn set_posture(&mut self, mb: &MultiBody, target: Vec<Vec<f64>>) -> Result<(), QpError> {
        check_params(mb, "posture", &target)?;
        self.target = target;
        Ok(())
    }

    pub const fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Sets the stiffness and resets damping to `2·sqrt(stiffness)`.
    ///
    /// # Panics
    ///
    /// If `stiffness` is negative or not finite.
    pub fn set_stiffness(&mut self, stiffness: f64) {
        check_gain("stiffness", stiffness);
        self.stiffness = stiffness;
        self.damping = 2.0 * stiffness.sqrt();
    }

    pub const fn damping(&self) -> f64 {
        self.damping
    }

    /// # Panics
    ///
    /// If `damping` is negative or not finite.
    pub fn set_damping(&mut self, damping: f64) {
        check_gain("damping", damping);
        self.damping = damping;
    }
}

impl HighLevelTask for PostureTask {
    fn dim(&self) -> usize {
        self.jac.nrows()
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError> {
        check_params(mb, "configuration", &mbc.q)?;
        self.eval.fill(0.0);
        for (j, joint) in mb.joints().iter().enumerate() {
            if joint.dof() == 1 && joint.params() == 1 {
                self.eval[mb.dof_offset(j)] = self.target[j][0] - mbc.q[j][0];
            }
        }
        self.speed = &self.jac * mbc.alpha_vector();
        Ok(())
    }

    fn update_dot(&mut self, _mb: &MultiBody, _mbc: &MultiBodyConfig) -> Result<(), QpError> {
        Ok(())
    }

    fn eval(&self) -> &DVector<f64> {
        &self.eval
    }

    fn speed(&self) -> &DVector<f64> {
        &self.speed
    }

    fn normal_acc(&self) -> &DVector<f64> {
        &self.normal_acc
    }

    fn jac(&self) -> &DMatrix<f64> {
        &self.jac
    }

    fn jac_dot(&self) -> &DMatrix<f64> {
        &self.jac_dot
    }
}

impl Task for PostureTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn set_weight(&mut self, weight: f64) {
        check_weight(weight);
        self.weight = weight;
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError> {
        HighLevelTask::update(self, mb, mbc)?;
        check_jacobian(&self.name, &self.jac, data)?;
        let desired = &self.eval * self.stiffness - &self.speed * self.damping;
        let ones = DVector::from_element(self.jac.nrows(), 1.0);
        acceleration_objective(&self.jac, &ones, self.weight, &desired, &mut self.q, &mut self.c);
        Ok(())
    }

    fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    fn c(&self) -> &DVector<f64> {
        &self.c
    }
}
