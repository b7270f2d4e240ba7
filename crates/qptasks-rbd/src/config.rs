//! Per-instant state of a [`MultiBody`]: joint vectors and the kinematic
//! quantities derived from them.

use nalgebra::{DVector, Isometry3, Vector3};

use crate::error::RbdError;
use crate::multibody::MultiBody;

/// Standard gravitational acceleration along world z.
pub const GRAVITY_Z: f64 = -9.81;

/// Spatial velocity of a body: angular velocity and linear velocity of the
/// body origin, both in world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionVec {
    pub angular: Vector3<f64>,
    pub linear: Vector3<f64>,
}

impl MotionVec {
    pub fn zero() -> Self {
        Self {
            angular: Vector3::zeros(),
            linear: Vector3::zeros(),
        }
    }

    /// Linear velocity of a world point rigidly attached to the body.
    pub fn velocity_at(&self, origin: &Vector3<f64>, point: &Vector3<f64>) -> Vector3<f64> {
        self.linear + self.angular.cross(&(point - origin))
    }
}

/// Joint-space state and cached world-frame kinematics.
///
/// Joint vectors are nested per joint: `q[i]` holds `mb.joint(i).params()`
/// values and `alpha[i]`, `alpha_d[i]`, `joint_torque[i]` hold
/// `mb.joint(i).dof()` values.
#[derive(Debug, Clone)]
pub struct MultiBodyConfig {
    pub q: Vec<Vec<f64>>,
    pub alpha: Vec<Vec<f64>>,
    pub alpha_d: Vec<Vec<f64>>,
    pub joint_torque: Vec<Vec<f64>>,
    pub gravity: Vector3<f64>,
    /// Body poses in world frame. Filled by [`forward_kinematics`](crate::forward_kinematics).
    pub body_pos_w: Vec<Isometry3<f64>>,
    /// Body velocities in world frame. Filled by [`forward_velocity`](crate::forward_velocity).
    pub body_vel_w: Vec<MotionVec>,
}

impl MultiBodyConfig {
    /// Neutral configuration at rest.
    pub fn new(mb: &MultiBody) -> Self {
        let q = mb.joints().iter().map(|j| j.zero_param()).collect();
        let zero_dof: Vec<Vec<f64>> = mb.joints().iter().map(|j| j.zero_dof()).collect();
        Self {
            q,
            alpha: zero_dof.clone(),
            alpha_d: zero_dof.clone(),
            joint_torque: zero_dof,
            gravity: Vector3::new(0.0, 0.0, GRAVITY_Z),
            body_pos_w: vec![Isometry3::identity(); mb.nr_bodies()],
            body_vel_w: vec![MotionVec::zero(); mb.nr_bodies()],
        }
    }

    /// Check every joint vector against the model layout.
    pub fn check(&self, mb: &MultiBody) -> Result<(), RbdError> {
        check_params(mb, "q", &self.q)?;
        check_dofs(mb, "alpha", &self.alpha)?;
        check_dofs(mb, "alpha_d", &self.alpha_d)?;
        check_dofs(mb, "joint_torque", &self.joint_torque)
    }

    /// Replace `q` after checking its shape.
    pub fn set_q(&mut self, mb: &MultiBody, q: Vec<Vec<f64>>) -> Result<(), RbdError> {
        check_params(mb, "q", &q)?;
        self.q = q;
        Ok(())
    }

    /// Replace `alpha` after checking its shape.
    pub fn set_alpha(&mut self, mb: &MultiBody, alpha: Vec<Vec<f64>>) -> Result<(), RbdError> {
        check_dofs(mb, "alpha", &alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    pub fn q_vector(&self) -> DVector<f64> {
        flatten(&self.q)
    }

    pub fn alpha_vector(&self) -> DVector<f64> {
        flatten(&self.alpha)
    }

    pub fn alpha_d_vector(&self) -> DVector<f64> {
        flatten(&self.alpha_d)
    }

    pub fn set_alpha_vector(&mut self, mb: &MultiBody, alpha: &DVector<f64>) -> Result<(), RbdError> {
        self.alpha = unflatten_dof(mb, "alpha", alpha)?;
        Ok(())
    }

    pub fn set_alpha_d_vector(&mut self, mb: &MultiBody, alpha_d: &DVector<f64>) -> Result<(), RbdError> {
        self.alpha_d = unflatten_dof(mb, "alpha_d", alpha_d)?;
        Ok(())
    }

    /// Distribute actuated torques (one per actuated dof) onto the joints.
    pub fn set_actuated_torque(&mut self, mb: &MultiBody, torque: &DVector<f64>) -> Result<(), RbdError> {
        if torque.len() != mb.nr_actuated_dof() {
            return Err(RbdError::VectorLengthMismatch {
                what: "torque",
                expected: mb.nr_actuated_dof(),
                got: torque.len(),
            });
        }
        let mut flat = DVector::zeros(mb.nr_dof());
        for (k, &dof) in mb.actuated_dofs().iter().enumerate() {
            flat[dof] = torque[k];
        }
        self.joint_torque = unflatten_dof(mb, "joint_torque", &flat)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Nested <-> flat helpers
// ---------------------------------------------------------------------------

/// Check a nested configuration vector against joint parameter counts.
pub fn check_params(mb: &MultiBody, what: &'static str, v: &[Vec<f64>]) -> Result<(), RbdError> {
    check_shape(mb, what, v, |i| mb.joint(i).params())
}

/// Check a nested velocity-like vector against joint dof counts.
pub fn check_dofs(mb: &MultiBody, what: &'static str, v: &[Vec<f64>]) -> Result<(), RbdError> {
    check_shape(mb, what, v, |i| mb.joint(i).dof())
}

fn check_shape(
    mb: &MultiBody,
    what: &'static str,
    v: &[Vec<f64>],
    size: impl Fn(usize) -> usize,
) -> Result<(), RbdError> {
    if v.len() != mb.nr_joints() {
        return Err(RbdError::JointCountMismatch {
            what,
            expected: mb.nr_joints(),
            got: v.len(),
        });
    }
    for (joint, values) in v.iter().enumerate() {
        let expected = size(joint);
        if values.len() != expected {
            return Err(RbdError::JointShapeMismatch {
                what,
                joint,
                expected,
                got: values.len(),
            });
        }
    }
    Ok(())
}

/// Concatenate a nested joint vector.
pub fn flatten(v: &[Vec<f64>]) -> DVector<f64> {
    DVector::from_iterator(v.iter().map(Vec::len).sum(), v.iter().flatten().copied())
}

/// Split a flat dof vector into per-joint pieces.
pub fn unflatten_dof(mb: &MultiBody, what: &'static str, v: &DVector<f64>) -> Result<Vec<Vec<f64>>, RbdError> {
    if v.len() != mb.nr_dof() {
        return Err(RbdError::VectorLengthMismatch {
            what,
            expected: mb.nr_dof(),
            got: v.len(),
        });
    }
    Ok((0..mb.nr_joints())
        .map(|i| {
            let start = mb.dof_offset(i);
            v.as_slice()[start..start + mb.joint(i).dof()].to_vec()
        })
        .collect())
}

/// Split a flat parameter vector into per-joint pieces.
pub fn unflatten_params(mb: &MultiBody, what: &'static str, v: &DVector<f64>) -> Result<Vec<Vec<f64>>, RbdError> {
    if v.len() != mb.nr_params() {
        return Err(RbdError::VectorLengthMismatch {
            what,
            expected: mb.nr_params(),
            got: v.len(),
        });
    }
    Ok((0..mb.nr_joints())
        .map(|i| {
            let start = mb.q_offset(i);
            v.as_slice()[start..start + mb.joint(i).params()].to_vec()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::joint::{Joint, JointType};
    use crate::multibody::MultiBodyBuilder;

    fn two_link() -> MultiBody {
        MultiBodyBuilder::new()
            .body(Body::massless("base"))
            .body(Body::massless("link"))
            .joint(
                "base",
                "link",
                Joint::new("hinge", JointType::Revolute(Vector3::z_axis())),
                Isometry3::identity(),
            )
            .build("base", Joint::new("root", JointType::Free))
            .unwrap()
    }

    #[test]
    fn new_config_matches_layout() {
        let mb = two_link();
        let mbc = MultiBodyConfig::new(&mb);
        assert!(mbc.check(&mb).is_ok());
        assert_eq!(mbc.q_vector().len(), 8);
        assert_eq!(mbc.alpha_vector().len(), 7);
        assert_eq!(mbc.q[0][0], 1.0);
    }

    #[test]
    fn set_q_rejects_wrong_shape() {
        let mb = two_link();
        let mut mbc = MultiBodyConfig::new(&mb);
        let err = mbc
            .set_q(&mb, vec![vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], vec![0.1, 0.2]])
            .unwrap_err();
        assert!(matches!(
            err,
            RbdError::JointShapeMismatch { joint: 1, expected: 1, got: 2, .. }
        ));
        let err = mbc.set_q(&mb, vec![vec![0.1]]).unwrap_err();
        assert!(matches!(err, RbdError::JointCountMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn flat_dof_roundtrip_keeps_joint_split() {
        let mb = two_link();
        let mut mbc = MultiBodyConfig::new(&mb);
        let v = DVector::from_fn(7, |i, _| i as f64);
        mbc.set_alpha_vector(&mb, &v).unwrap();
        assert_eq!(mbc.alpha[0].len(), 6);
        assert_eq!(mbc.alpha[1], vec![6.0]);
        assert_eq!(mbc.alpha_vector(), v);
    }

    #[test]
    fn actuated_torque_skips_free_base() {
        let mb = two_link();
        let mut mbc = MultiBodyConfig::new(&mb);
        mbc.set_actuated_torque(&mb, &DVector::from_element(1, 3.5)).unwrap();
        assert_eq!(mbc.joint_torque[0], vec![0.0; 6]);
        assert_eq!(mbc.joint_torque[1], vec![3.5]);
        assert!(mbc.set_actuated_torque(&mb, &DVector::zeros(2)).is_err());
    }

    #[test]
    fn velocity_at_offset_point() {
        let v = MotionVec {
            angular: Vector3::new(0.0, 0.0, 1.0),
            linear: Vector3::new(1.0, 0.0, 0.0),
        };
        let p = v.velocity_at(&Vector3::zeros(), &Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(p, Vector3::new(1.0, 1.0, 0.0));
    }
}
