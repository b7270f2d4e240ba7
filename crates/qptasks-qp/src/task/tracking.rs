//! Trajectory tracking with caller-supplied errors and feed-forward.

use nalgebra::{DMatrix, DVector};
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use super::{acceleration_objective, check_gain, check_jacobian, check_weight, HighLevelTask, Task};
use crate::error::{ConfigurationError, QpError};
use crate::layout::SolverData;

/// Drives a [`HighLevelTask`] along a reference trajectory.
///
/// The caller sets the position error, velocity error and reference
/// acceleration every cycle; the wrapped task only provides `J` and
/// `J_dot·alpha`. The desired task acceleration is
///
/// ```text
/// a = gain_pos·error_pos + gain_vel·error_vel + ref_accel - J_dot·alpha
/// ```
pub struct TrackingTask<T> {
    name: String,
    task: T,
    gain_pos: f64,
    gain_vel: f64,
    weight: f64,
    dim_weight: DVector<f64>,
    error_pos: DVector<f64>,
    error_vel: DVector<f64>,
    ref_accel: DVector<f64>,
    q: DMatrix<f64>,
    c: DVector<f64>,
}

impl<T: HighLevelTask> TrackingTask<T> {
    /// # Panics
    ///
    /// If a gain or the weight is negative or not finite.
    pub fn new(task: T, gain_pos: f64, gain_vel: f64, weight: f64) -> Self {
        check_gain("position gain", gain_pos);
        check_gain("velocity gain", gain_vel);
        check_weight(weight);
        let dim = task.dim();
        Self {
            name: "tracking".into(),
            task,
            gain_pos,
            gain_vel,
            weight,
            dim_weight: DVector::from_element(dim, 1.0),
            error_pos: DVector::zeros(dim),
            error_vel: DVector::zeros(dim),
            ref_accel: DVector::zeros(dim),
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

    pub const fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    /// # Panics
    ///
    /// If a gain is negative or not finite.
    pub fn set_gains(&mut self, gain_pos: f64, gain_vel: f64) {
        check_gain("position gain", gain_pos);
        check_gain("velocity gain", gain_vel);
        self.gain_pos = gain_pos;
        self.gain_vel = gain_vel;
    }

    pub const fn gains(&self) -> (f64, f64) {
        (self.gain_pos, self.gain_vel)
    }

    pub fn set_error_pos(&mut self, error: DVector<f64>) -> Result<(), QpError> {
        self.error_pos = self.checked("error_pos", error)?;
        Ok(())
    }

    pub fn set_error_vel(&mut self, error: DVector<f64>) -> Result<(), QpError> {
        self.error_vel = self.checked("error_vel", error)?;
        Ok(())
    }

    pub fn set_ref_accel(&mut self, accel: DVector<f64>) -> Result<(), QpError> {
        self.ref_accel = self.checked("ref_accel", accel)?;
        Ok(())
    }

    pub fn set_dim_weight(&mut self, dim_weight: DVector<f64>) -> Result<(), QpError> {
        self.dim_weight = self.checked("dim_weight", dim_weight)?;
        Ok(())
    }

    fn checked(&self, what: &str, v: DVector<f64>) -> Result<DVector<f64>, QpError> {
        if v.len() == self.task.dim() {
            Ok(v)
        } else {
            Err(ConfigurationError::DimensionMismatch {
                what: format!("{} {what}", self.name),
                expected: self.task.dim(),
                got: v.len(),
            }
            .into())
        }
    }
}

impl<T: HighLevelTask + 'static> Task for TrackingTask<T> {
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
        let desired = &self.error_pos * self.gain_pos + &self.error_vel * self.gain_vel + &self.ref_accel
            - self.task.normal_acc();
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
