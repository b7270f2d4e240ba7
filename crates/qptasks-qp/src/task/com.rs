use nalgebra::{DMatrix, DVector, Vector3};
use qptasks_rbd::{compute_com, compute_com_velocity, CoMJacobian, MultiBody, MultiBodyConfig};

use super::HighLevelTask;
use crate::error::QpError;

/// Whole-body center of mass.
pub struct CoMTask {
    com_jac: CoMJacobian,
    target: Vector3<f64>,
    eval: DVector<f64>,
    speed: DVector<f64>,
    normal_acc: DVector<f64>,
    jac: DMatrix<f64>,
    jac_dot: DMatrix<f64>,
}

impl CoMTask {
    pub fn new(mb: &MultiBody, target: Vector3<f64>) -> Self {
        Self {
            com_jac: CoMJacobian::new(mb),
            target,
            eval: DVector::zeros(3),
            speed: DVector::zeros(3),
            normal_acc: DVector::zeros(3),
            jac: DMatrix::zeros(3, mb.nr_dof()),
            jac_dot: DMatrix::zeros(3, mb.nr_dof()),
        }
    }

    pub const fn com(&self) -> &Vector3<f64> {
        &self.target
    }

    pub fn set_com(&mut self, target: Vector3<f64>) {
        self.target = target;
    }
}

impl HighLevelTask for CoMTask {
    fn dim(&self) -> usize {
        3
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError> {
        self.eval = DVector::from_column_slice((self.target - compute_com(mb, mbc)).as_slice());
        self.speed = DVector::from_column_slice(compute_com_velocity(mb, mbc).as_slice());
        self.jac = self.com_jac.jacobian(mb, mbc);
        Ok(())
    }

    fn update_dot(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError> {
        self.jac_dot = self.com_jac.jacobian_dot(mb, mbc);
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
        &self.jac
    }

    fn jac_dot(&self) -> &DMatrix<f64> {
        &self.jac_dot
    }
}
