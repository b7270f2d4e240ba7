//! Forward position and velocity kinematics.

use nalgebra::{Isometry3, Vector3};

use crate::config::{MotionVec, MultiBodyConfig};
use crate::joint::JointType;
use crate::multibody::MultiBody;

/// World-frame axis of joint `index`, evaluated from the current body pose.
///
/// `None` for fixed and free joints.
pub fn joint_axis_w(mb: &MultiBody, mbc: &MultiBodyConfig, index: usize) -> Option<Vector3<f64>> {
    match mb.joint(index).joint_type {
        JointType::Revolute(axis) | JointType::Prismatic(axis) => {
            Some(mbc.body_pos_w[index].rotation * axis.into_inner())
        }
        JointType::Fixed | JointType::Free => None,
    }
}

/// Fill `mbc.body_pos_w` from `mbc.q`.
pub fn forward_kinematics(mb: &MultiBody, mbc: &mut MultiBodyConfig) {
    if mbc.body_pos_w.len() != mb.nr_bodies() {
        mbc.body_pos_w = vec![Isometry3::identity(); mb.nr_bodies()];
    }
    for i in 0..mb.nr_bodies() {
        let parent = mb
            .parent(i)
            .map_or_else(Isometry3::identity, |p| mbc.body_pos_w[p]);
        mbc.body_pos_w[i] = parent * mb.transform(i) * mb.joint(i).motion(&mbc.q[i]);
    }
}

/// Fill `mbc.body_vel_w` from `mbc.alpha`. Requires [`forward_kinematics`].
pub fn forward_velocity(mb: &MultiBody, mbc: &mut MultiBodyConfig) {
    if mbc.body_vel_w.len() != mb.nr_bodies() {
        mbc.body_vel_w = vec![MotionVec::zero(); mb.nr_bodies()];
    }
    for i in 0..mb.nr_bodies() {
        let origin = mbc.body_pos_w[i].translation.vector;
        let (mut vel, parent_origin) = match mb.parent(i) {
            Some(p) => (mbc.body_vel_w[p], mbc.body_pos_w[p].translation.vector),
            None => (MotionVec::zero(), Vector3::zeros()),
        };
        vel.linear += vel.angular.cross(&(origin - parent_origin));

        let alpha = &mbc.alpha[i];
        match mb.joint(i).joint_type {
            JointType::Fixed => {}
            JointType::Revolute(_) => {
                if let Some(axis) = joint_axis_w(mb, mbc, i) {
                    vel.angular += axis * alpha[0];
                }
            }
            JointType::Prismatic(_) => {
                if let Some(axis) = joint_axis_w(mb, mbc, i) {
                    vel.linear += axis * alpha[0];
                }
            }
            JointType::Free => {
                vel.angular = Vector3::new(alpha[0], alpha[1], alpha[2]);
                vel.linear = Vector3::new(alpha[3], alpha[4], alpha[5]);
            }
        }
        mbc.body_vel_w[i] = vel;
    }
}
