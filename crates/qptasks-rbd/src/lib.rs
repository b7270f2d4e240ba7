//! Rigid-body model used by the QP controller.
//!
//! Topology lives in [`MultiBody`]; state and cached world kinematics live in
//! [`MultiBodyConfig`]. The free functions fill the cache in order:
//! [`forward_kinematics`], then [`forward_velocity`], after which point
//! [`Jacobian`]s, the [`CoMJacobian`] and [`ForwardDynamics`] can be evaluated.

pub mod body;
pub mod com;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod integration;
pub mod jacobian;
pub mod joint;
pub mod kinematics;
pub mod math;
pub mod multibody;
pub mod urdf;

pub use body::Body;
pub use com::{compute_com, compute_com_velocity, CoMJacobian};
pub use config::{MotionVec, MultiBodyConfig};
pub use dynamics::ForwardDynamics;
pub use error::RbdError;
pub use integration::euler_integration;
pub use jacobian::Jacobian;
pub use joint::{Joint, JointType};
pub use kinematics::{forward_kinematics, forward_velocity};
pub use multibody::{MultiBody, MultiBodyBuilder};
