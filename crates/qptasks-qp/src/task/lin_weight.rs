use nalgebra::{DMatrix, DVector};
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use super::{check_weight, Task};
use crate::error::QpError;
use crate::layout::SolverData;

/// Fades a task in by raising its weight by `step` every cycle until it
/// reaches the objective weight.
pub struct LinWeightTask<T> {
    task: T,
    step: f64,
    objective: f64,
}

impl<T: Task> LinWeightTask<T> {
    /// Starts `task` at zero weight.
    ///
    /// # Panics
    ///
    /// If `step` is not positive or `objective` is negative or not finite.
    pub fn new(mut task: T, step: f64, objective: f64) -> Self {
        assert!(step.is_finite() && step > 0.0, "weight step must be > 0, got {step}");
        check_weight(objective);
        task.set_weight(0.0);
        Self { task, step, objective }
    }

    pub const fn task(&self) -> &T {
        &self.task
    }

    pub const fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    pub const fn objective_weight(&self) -> f64 {
        self.objective
    }

    /// Restarts the ramp from zero.
    pub fn reset(&mut self) {
        self.task.set_weight(0.0);
    }
}

impl<T: Task> Task for LinWeightTask<T> {
    fn name(&self) -> &str {
        self.task.name()
    }

    /// Current weight along the ramp.
    fn weight(&self) -> f64 {
        self.task.weight()
    }

    /// Sets the objective weight. A current weight above it is lowered at
    /// once.
    fn set_weight(&mut self, weight: f64) {
        check_weight(weight);
        self.objective = weight;
        if self.task.weight() > weight {
            self.task.set_weight(weight);
        }
    }

    fn begin(&self) -> usize {
        self.task.begin()
    }

    fn update_nr_vars(&mut self, mb: &MultiBody, data: &SolverData) -> Result<(), QpError> {
        self.task.update_nr_vars(mb, data)
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError> {
        let next = (self.task.weight() + self.step).min(self.objective);
        self.task.set_weight(next);
        self.task.update(mb, mbc, data)
    }

    fn q(&self) -> &DMatrix<f64> {
        self.task.q()
    }

    fn c(&self) -> &DVector<f64> {
        self.task.c()
    }
}
