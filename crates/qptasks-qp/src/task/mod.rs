//! Weighted objectives and the kinematic quantities they track.
//!
//! A [`Task`] contributes `½ xᵀQx + Cᵀx` to the aggregate objective over the
//! variable range starting at [`Task::begin`]. A [`HighLevelTask`] is a
//! kinematic quantity with an error, a Jacobian and its derivative; it turns
//! into a [`Task`] when wrapped by [`SetPointTask`], [`TrackingTask`] or
//! [`QuadraticTask`].

mod com;
mod contact;
mod lin_velocity;
mod lin_weight;
mod orientation;
mod position;
mod posture;
mod quadratic;
mod set_point;
mod tracking;

pub use com::CoMTask;
pub use contact::{ContactTask, GripperTorqueTask};
pub use lin_velocity::LinVelocityTask;
pub use lin_weight::LinWeightTask;
pub use orientation::OrientationTask;
pub use position::PositionTask;
pub use posture::PostureTask;
pub use quadratic::QuadraticTask;
pub use set_point::SetPointTask;
pub use tracking::TrackingTask;

use nalgebra::{DMatrix, DVector};
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use crate::error::{ConfigurationError, QpError};
use crate::layout::SolverData;
use crate::registry::AsAny;

/// A soft objective in the QP.
///
/// `q()` and `c()` already include the task weight.
pub trait Task: AsAny {
    fn name(&self) -> &str;

    fn weight(&self) -> f64;

    /// # Panics
    ///
    /// Implementations panic on a negative or non-finite weight.
    fn set_weight(&mut self, weight: f64);

    /// First variable of the block `Q` and `C` apply to.
    fn begin(&self) -> usize {
        0
    }

    fn update_nr_vars(&mut self, _mb: &MultiBody, _data: &SolverData) -> Result<(), QpError> {
        Ok(())
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError>;

    fn q(&self) -> &DMatrix<f64>;

    fn c(&self) -> &DVector<f64>;
}

/// A kinematic quantity driven toward a target.
///
/// [`update`](Self::update) refreshes the error, the speed and the Jacobian;
/// [`update_dot`](Self::update_dot) refreshes the Jacobian derivative and the
/// normal acceleration. Both read cached kinematics from the configuration.
pub trait HighLevelTask {
    /// Number of task-space rows.
    fn dim(&self) -> usize;

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError>;

    fn update_dot(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError>;

    /// Target minus current value.
    fn eval(&self) -> &DVector<f64>;

    /// Task-space velocity `J·alpha`.
    fn speed(&self) -> &DVector<f64>;

    /// `J_dot·alpha`.
    fn normal_acc(&self) -> &DVector<f64>;

    fn jac(&self) -> &DMatrix<f64>;

    fn jac_dot(&self) -> &DMatrix<f64>;
}

pub(crate) fn check_weight(weight: f64) {
    assert!(weight.is_finite() && weight >= 0.0, "task weight must be >= 0, got {weight}");
}

pub(crate) fn check_gain(what: &str, gain: f64) {
    assert!(gain.is_finite() && gain >= 0.0, "{what} must be >= 0, got {gain}");
}

/// `Q = w JᵀWJ` and `C = -w JᵀW a` for a desired task acceleration `a`,
/// with `W` the diagonal of `dim_weight`.
pub(crate) fn acceleration_objective(
    jac: &DMatrix<f64>,
    dim_weight: &DVector<f64>,
    weight: f64,
    desired: &DVector<f64>,
    q: &mut DMatrix<f64>,
    c: &mut DVector<f64>,
) {
    let wj = DMatrix::from_diagonal(dim_weight) * jac;
    *q = jac.transpose() * &wj * weight;
    *c = -(wj.transpose() * desired) * weight;
}

/// Checks a high-level task's Jacobian against the acceleration block.
pub(crate) fn check_jacobian(name: &str, jac: &DMatrix<f64>, data: &SolverData) -> Result<(), QpError> {
    let alpha_d = data.layout().alpha_d;
    if jac.ncols() == alpha_d {
        Ok(())
    } else {
        Err(ConfigurationError::DimensionMismatch {
            what: format!("{name} jacobian columns"),
            expected: alpha_d,
            got: jac.ncols(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn objective_is_weighted_least_squares() {
        let jac = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, 1.0, 0.0]);
        let dim_weight = DVector::from_vec(vec![1.0, 3.0]);
        let desired = DVector::from_vec(vec![0.5, -1.0]);
        let mut q = DMatrix::zeros(0, 0);
        let mut c = DVector::zeros(0);
        acceleration_objective(&jac, &dim_weight, 2.0, &desired, &mut q, &mut c);

        // Gradient of w |J x - a|²_W / 2 at x = 0 is -w JᵀW a.
        assert_relative_eq!(q[(0, 2)], 4.0);
        assert_relative_eq!(q[(1, 1)], 6.0);
        assert_relative_eq!(c[0], -1.0);
        assert_relative_eq!(c[1], 6.0);
        assert_relative_eq!(c[2], -2.0);
    }

    #[test]
    #[should_panic(expected = "task weight")]
    fn negative_weight_panics() {
        check_weight(-1.0);
    }
}
