use nalgebra::{DMatrix, DVector, Matrix3, Rotation3, UnitQuaternion, Vector3};
use qptasks_rbd::jacobian::angular_rows;
use qptasks_rbd::math::rotation_error;
use qptasks_rbd::{Jacobian, MultiBody, MultiBodyConfig};

use super::HighLevelTask;
use crate::error::QpError;

/// World orientation of a body.
///
/// The error is the rotation vector taking the current orientation onto the
/// target, expressed in the world frame.
pub struct OrientationTask {
    jac: Jacobian,
    target: UnitQuaternion<f64>,
    eval: DVector<f64>,
    speed: DVector<f64>,
    normal_acc: DVector<f64>,
    jac_mat: DMatrix<f64>,
    jac_dot: DMatrix<f64>,
}

impl OrientationTask {
    pub fn new(mb: &MultiBody, body_name: &str, target: UnitQuaternion<f64>) -> Result<Self, QpError> {
        Ok(Self {
            jac: Jacobian::new(mb, body_name, Vector3::zeros())?,
            target,
            eval: DVector::zeros(3),
            speed: DVector::zeros(3),
            normal_acc: DVector::zeros(3),
            jac_mat: DMatrix::zeros(3, mb.nr_dof()),
            jac_dot: DMatrix::zeros(3, mb.nr_dof()),
        })
    }

    pub const fn orientation(&self) -> &UnitQuaternion<f64> {
        &self.target
    }

    pub fn set_orientation(&mut self, target: UnitQuaternion<f64>) {
        self.target = target;
    }

    /// Set the target from a rotation matrix. The matrix is re-orthonormalised.
    pub fn set_orientation_matrix(&mut self, target: &Matrix3<f64>) {
        let rot = Rotation3::from_matrix(target);
        self.target = UnitQuaternion::from_rotation_matrix(&rot);
    }
}

impl HighLevelTask for OrientationTask {
    fn dim(&self) -> usize {
        3
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError> {
        let current = mbc.body_pos_w[self.jac.body()].rotation;
        self.eval = DVector::from_column_slice(rotation_error(&self.target, &current).as_slice());
        self.speed = DVector::from_column_slice(mbc.body_vel_w[self.jac.body()].angular.as_slice());
        self.jac_mat = angular_rows(&self.jac.jacobian(mb, mbc));
        Ok(())
    }

    fn update_dot(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError> {
        self.jac_dot = angular_rows(&self.jac.jacobian_dot(mb, mbc));
        self.normal_acc = &self.jac_dot * mbc.alpha_vector();
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
        &self.jac_mat
    }

    fn jac_dot(&self) -> &DMatrix<f64> {
        &self.jac_dot
    }
}
