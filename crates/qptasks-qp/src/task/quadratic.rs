use nalgebra::{DMatrix, DVector};
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use super::{check_jacobian, check_weight, HighLevelTask, Task};
use crate::error::QpError;
use crate::layout::SolverData;

/// Drives a [`HighLevelTask`]'s acceleration `J·alpha_d + J_dot·alpha` to zero.
///
/// No feedback on the task error: `Q = w·JᵀJ` and `C = w·Jᵀ·J_dot·alpha`.
pub struct QuadraticTask<T> {
    name: String,
    task: T,
    weight: f64,
    q: DMatrix<f64>,
    c: DVector<f64>,
}

impl<T: HighLevelTask> QuadraticTask<T> {
    /// # Panics
    ///
    /// If `weight` is negative or not finite.
    pub fn new(task: T, weight: f64) -> Self {
        check_weight(weight);
        Self {
            name: "quadratic".into(),
            task,
            weight,
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
}

impl<T: HighLevelTask + 'static> Task for QuadraticTask<T> {
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
        let jac = self.task.jac();
        check_jacobian(&self.name, jac, data)?;
        let jt = jac.transpose();
        self.q = &jt * jac * self.weight;
        self.c = jt * self.task.normal_acc() * self.weight;
        Ok(())
    }

    fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    fn c(&self) -> &DVector<f64> {
        &self.c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::PositionTask;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use qptasks_test_utils::{planar_arm, refresh};

    #[test]
    fn cost_is_acceleration_norm() {
        let mb = planar_arm();
        let mut mbc = MultiBodyConfig::new(&mb);
        mbc.q[2] = vec![0.4];
        mbc.alpha[1] = vec![1.0];
        refresh(&mb, &mut mbc);
        let data = SolverData::new(&mb, &[], 1).unwrap();
        let mut task = QuadraticTask::new(PositionTask::new(&mb, "tool", Vector3::zeros()).unwrap(), 2.0);
        task.update(&mb, &mbc, &data).unwrap();

        let jac = task.task().jac().clone();
        let na = task.task().normal_acc().clone();
        assert_relative_eq!(task.q(), &(jac.transpose() * &jac * 2.0), epsilon = 1e-12);
        assert_relative_eq!(task.c(), &(jac.transpose() * &na * 2.0), epsilon = 1e-12);

        // ½xᵀQx + Cᵀx equals w/2 |J x + na|² up to a constant.
        let x = DVector::from_vec(vec![0.3, -0.2, 0.5]);
        let cost = 0.5 * (&x.transpose() * task.q() * &x)[0] + task.c().dot(&x);
        let direct = (&jac * &x + &na).norm_squared() - na.norm_squared();
        assert_relative_eq!(cost, direct, epsilon = 1e-12);
    }

    #[test]
    fn target_does_not_enter_the_cost() {
        let mb = planar_arm();
        let mut mbc = MultiBodyConfig::new(&mb);
        refresh(&mb, &mut mbc);
        let data = SolverData::new(&mb, &[], 1).unwrap();
        let mut near = QuadraticTask::new(PositionTask::new(&mb, "tool", Vector3::zeros()).unwrap(), 1.0);
        let mut far = QuadraticTask::new(PositionTask::new(&mb, "tool", Vector3::new(5.0, 0.0, 0.0)).unwrap(), 1.0);
        near.update(&mb, &mbc, &data).unwrap();
        far.update(&mb, &mbc, &data).unwrap();
        assert_relative_eq!(near.c(), far.c());
        assert_relative_eq!(near.c().norm(), 0.0);
    }
}
