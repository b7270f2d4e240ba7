//! Shared test fixtures for qptasks crates.
//!
//! Provides a 30-dof floating-base humanoid built in code, a fixed-base
//! planar arm loaded from URDF, and helpers to bring a configuration up to
//! date before evaluating tasks and constraints.

pub mod arm;
pub mod humanoid;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use arm::{planar_arm, PLANAR_ARM_URDF};
pub use humanoid::{foot_normals, foot_points, humanoid, standing_config, FOOT_BODIES, PELVIS_HEIGHT};

use qptasks_rbd::{forward_kinematics, forward_velocity, MultiBody, MultiBodyConfig};

/// Run forward kinematics and forward velocity.
pub fn refresh(mb: &MultiBody, mbc: &mut MultiBodyConfig) {
    forward_kinematics(mb, mbc);
    forward_velocity(mb, mbc);
}
