//! Orientation error shared by kinematics and tasks.

use nalgebra::{UnitQuaternion, Vector3};

/// Rotation vector (axis * angle) taking `current` onto `target`, in world frame.
///
/// Zero when the two orientations coincide.
pub fn rotation_error(target: &UnitQuaternion<f64>, current: &UnitQuaternion<f64>) -> Vector3<f64> {
    let delta = target * current.inverse();
    delta.scaled_axis()
}
