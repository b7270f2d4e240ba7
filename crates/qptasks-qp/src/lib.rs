//! Task-based whole-body QP control.
//!
//! Soft objectives ([`Task`]s) and hard requirements ([`Constraint`]s) are
//! registered with a [`QpSolver`], which lays out the decision vector
//! `x = [alpha_d, lambda, torque]` for the current [`Contact`] set, refreshes
//! every registered object against the robot state, and solves the stacked
//! QP each control cycle.
//!
//! ```text
//! solver.nr_vars(&mb, &contacts)?;   // whenever contacts change
//! let sol = solver.update(&mb, &mbc)?;
//! ```

pub mod backend;
pub mod config;
pub mod constraint;
pub mod contact;
pub mod error;
pub mod layout;
pub mod registry;
pub mod solver;
pub mod task;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use backend::{BackendSolution, ClarabelBackend, QpBackend, QpProblem};
pub use config::SolverConfig;
pub use constraint::{
    BoundBlock, Constraint, ContactAccConstr, EqualityBlock, FrictionConeConstr, InequalityBlock, MotionConstr,
    TorqueBounds,
};
pub use contact::Contact;
pub use error::{Capability, ConfigError, ConfigurationError, QpError, SolveFailure};
pub use layout::{ContactData, LayoutStamp, SolverData, VariableLayout};
pub use registry::{ConstraintId, TaskId};
pub use solver::{QpSolution, QpSolver};
pub use task::{
    CoMTask, ContactTask, GripperTorqueTask, HighLevelTask, LinVelocityTask, LinWeightTask, OrientationTask,
    PositionTask, PostureTask, QuadraticTask, SetPointTask, Task, TrackingTask,
};
