//! Stiffness/damping feedback toward a high-level task's target.

use nalgebra::{DMatrix, DVector};
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use super::{acceleration_objective, check_gain, check_jacobian, check_weight, HighLevelTask, Task};
use crate::error::{ConfigurationError, QpError};
use crate::layout::SolverData;

/// Turns a [`HighLevelTask`] into a quadratic cost on `alpha_d`.
///
/// The desired task acceleration is
///
/// ```text
/// a = stiffness·e - damping·J·alpha - J_dot·alpha
/// ```
///
/// and the cost is `w/2 |J alpha_d - a|²` weighted per dimension, giving
/// `Q = w·JᵀWJ` and `C = -w·JᵀW·a`.
pub struct SetPointTask<T> {
    name: String,
    task: T,
    stiffness: f64,
    damping: f64,
    weight: f64,
    dim_weight: DVector<f64>,
    q: DMatrix<f64>,
    c: DVector<f64>,
}

impl<T: HighLevelTask> SetPointTask<T> {
    /// Critically damped set-point task (`damping = 2·sqrt(stiffness)`).
    ///
    /// # Panics
    ///
    /// If `stiffness` or `weight` is negative or not finite.
    pub fn new(task: T, stiffness: f64, weight: f64) -> Self {
        check_gain("stiffness", stiffness);
        check_weight(weight);
        let dim = task.dim();
        Self {
            name: "set_point".into(),
            task,
            stiffness,
            damping: 2.0 * stiffness.sqrt(),
            weight,
            dim_weight: DVector::from_element(dim, 1.0),
            q: DMatrix::zeros(0, 0),
            c: DVector::zeros(0),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub const fn task(&self) -> &T {
        &self.task
    }

    /// Mutable access for retargeting between cycles.
    pub const fn task_mut(&mut self) -> &mut T {
        &mut self.task
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

    pub const fn dim_weight(&self) -> &DVector<f64> {
        &self.dim_weight
    }

    pub fn set_dim_weight(&mut self, dim_weight: DVector<f64>) -> Result<(), QpError> {
        if dim_weight.len() != self.task.dim() {
            return Err(ConfigurationError::DimensionMismatch {
                what: format!("{} dim_weight", self.name),
                expected: self.task.dim(),
                got: dim_weight.len(),
            }
            .into());
        }
        self.dim_weight = dim_weight;
        Ok(())
    }

    /// Desired task acceleration for the current state.
    pub fn desired_acceleration(&self) -> DVector<f64> {
        self.task.eval() * self.stiffness - self.task.speed() * self.damping - self.task.normal_acc()
    }
}

impl<T: HighLevelTask + 'static> Task for SetPointTask<T> {
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
        self.task.update(mb, mbc)?;
        self.task.update_dot(mb, mbc)?;
        check_jacobian(&self.name, self.task.jac(), data)?;
        let desired = self.desired_acceleration();
        acceleration_objective(
            self.task.jac(),
            &self.dim_weight,
            self.weight,
            &desired,
            &mut self.q,
            &mut self.c,
        );
        Ok(())
    }

    fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    fn c(&self) -> &DVector<f64> {
        &self.c
    }
}
