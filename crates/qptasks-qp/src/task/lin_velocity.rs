use nalgebra::{DMatrix, DVector, Vector3};
use qptasks_rbd::jacobian::linear_rows;
use qptasks_rbd::{Jacobian, MultiBody, MultiBodyConfig};

use super::HighLevelTask;
use crate::error::QpError;

/// World linear velocity of a point on a body.
///
/// The error is already a velocity, so [`speed`](HighLevelTask::speed) is
/// zero and a [`SetPointTask`](super::SetPointTask) stiffness acts as a
/// velocity gain.
pub struct LinVelocityTask {
    jac: Jacobian,
    target: Vector3<f64>,
    eval: DVector<f64>,
    speed: DVector<f64>,
    normal_acc: DVector<f64>,
    jac_mat: DMatrix<f64>,
    jac_dot: DMatrix<f64>,
}

impl LinVelocityTask {
    pub fn new(mb: &MultiBody, body_name: &str, velocity: Vector3<f64>) -> Result<Self, QpError> {
        Ok(Self {
            jac: Jacobian::new(mb, body_name, Vector3::zeros())?,
            target: velocity,
            eval: DVector::zeros(3),
            speed: DVector::zeros(3),
            normal_acc: DVector::zeros(3),
            jac_mat: DMatrix::zeros(3, mb.nr_dof()),
            jac_dot: DMatrix::zeros(3, mb.nr_dof()),
        })
    }

    #[must_use]
    pub fn with_body_point(mut self, point: Vector3<f64>) -> Self {
        self.jac.set_point(point);
        self
    }

    pub const fn velocity(&self) -> &Vector3<f64> {
        &self.target
    }

    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.target = velocity;
    }

    pub fn body_point(&self) -> &Vector3<f64> {
        self.jac.point()
    }

    pub fn set_body_point(&mut self, point: Vector3<f64>) {
        self.jac.set_point(point);
    }
}

impl HighLevelTask for LinVelocityTask {
    fn dim(&self) -> usize {
        3
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Result<(), QpError> {
        let current = self.jac.velocity(mbc).linear;
        self.eval = DVector::from_column_slice((self.target - current).as_slice());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SolverData;
    use crate::task::{SetPointTask, Task};
    use approx::assert_relative_eq;
    use qptasks_test_utils::{planar_arm, refresh};

    fn swinging_arm() -> (MultiBody, MultiBodyConfig) {
        let mb = planar_arm();
        let mut mbc = MultiBodyConfig::new(&mb);
        mbc.alpha[1] = vec![1.0];
        refresh(&mb, &mut mbc);
        (mb, mbc)
    }

    #[test]
    fn error_is_velocity_difference() {
        let (mb, mbc) = swinging_arm();
        let mut task = LinVelocityTask::new(&mb, "tool", Vector3::new(0.0, 0.0, -0.5)).unwrap();
        task.update(&mb, &mbc).unwrap();
        task.update_dot(&mb, &mbc).unwrap();

        // Tool moves at -0.9 m/s along z.
        assert_relative_eq!(task.eval()[2], 0.4, epsilon = 1e-12);
        assert_relative_eq!(task.speed().norm(), 0.0);
        assert_relative_eq!(task.normal_acc()[0], -0.9, epsilon = 1e-12);
        assert_eq!(task.jac().shape(), (3, 3));
    }

    #[test]
    fn body_point_changes_tracked_velocity() {
        let (mb, mbc) = swinging_arm();
        let mut task = LinVelocityTask::new(&mb, "link3", Vector3::zeros()).unwrap();
        task.update(&mb, &mbc).unwrap();
        let origin = task.eval().clone();
        task.set_body_point(Vector3::new(0.2, 0.0, 0.0));
        task.update(&mb, &mbc).unwrap();
        assert!((task.eval() - origin).norm() > 0.1);
        assert_relative_eq!(*task.body_point(), Vector3::new(0.2, 0.0, 0.0));
    }

    #[test]
    fn set_point_uses_stiffness_as_velocity_gain() {
        let (mb, mbc) = swinging_arm();
        let data = SolverData::new(&mb, &[], 1).unwrap();
        let task = LinVelocityTask::new(&mb, "tool", Vector3::zeros()).unwrap();
        let mut sp = SetPointTask::new(task, 4.0, 1.0);
        sp.update(&mb, &mbc, &data).unwrap();
        // a = 4·(0 - v) - J_dot·alpha; the damping term vanishes.
        let expected = sp.task().eval() * 4.0 - sp.task().normal_acc();
        assert_relative_eq!(sp.desired_acceleration(), expected, epsilon = 1e-12);
    }
}
