use nalgebra::{DMatrix, DVector, Vector3};
use qptasks_rbd::jacobian::linear_rows;
use qptasks_rbd::{Jacobian, MultiBody, MultiBodyConfig};

use super::HighLevelTask;
use crate::error::QpError;

/// World position of a point on a body.
pub struct PositionTask {
    jac: Jacobian,
    target: Vector3<f64>,
    eval: DVector<f64>,
    speed: DVector<f64>,
    normal_acc: DVector<f64>,
    jac_mat: DMatrix<f64>,
    jac_dot: DMatrix<f64>,
}

impl PositionTask {
    /// Tracks the origin of `body_name`.
    pub fn new(mb: &MultiBody, body_name: &str, target: Vector3<f64>) -> Result<Self, QpError> {
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

    /// Track `point` (body frame) instead of the body origin.
    #[must_use]
    pub fn with_body_point(mut self, point: Vector3<f64>) -> Self {
        self.jac.set_point(point);
        self
    }

    pub const fn position(&self) -> &Vector3<f64> {
        &self.target
    }

    pub fn set_position(&mut self, target: Vector3<f64>) {
        self.target = target;
    }

    pub fn body_point(&self) -> &Vector3<f64> {
        self.jac.point()
    }
}

impl HighLevelTask for PositionTask {
    fn dim(&self) -> usize {
        3
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError> {
        self.eval = DVector::from_column_slice((self.target - self.jac.point_w(mbc)).as_slice());
        self.speed = DVector::from_column_slice(self.jac.velocity(mbc).linear.as_slice());
        self.jac_mat = linear_rows(&self.jac.jacobian(mb, mbc));
        Ok(())
    }

    fn update_dot(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError> {
        self.jac_dot = linear_rows(&self.jac.jacobian_dot(mb, mbc));
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
