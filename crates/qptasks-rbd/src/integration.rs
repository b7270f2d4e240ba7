//! Explicit time stepping of a [`MultiBodyConfig`].

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::config::MultiBodyConfig;
use crate::joint::JointType;
use crate::multibody::MultiBody;

/// Semi-implicit Euler step: `alpha += alpha_d * dt`, then `q` advances with
/// the new `alpha`.
///
/// Free joints integrate their quaternion with the world-frame angular
/// velocity and renormalize.
pub fn euler_integration(mb: &MultiBody, mbc: &mut MultiBodyConfig, dt: f64) {
    for i in 0..mb.nr_joints() {
        for (a, ad) in mbc.alpha[i].iter_mut().zip(&mbc.alpha_d[i]) {
            *a += ad * dt;
        }
        let alpha = &mbc.alpha[i];
        let q = &mut mbc.q[i];
        match mb.joint(i).joint_type {
            JointType::Fixed => {}
            JointType::Revolute(_) | JointType::Prismatic(_) => q[0] += alpha[0] * dt,
            JointType::Free => {
                let omega = Vector3::new(alpha[0], alpha[1], alpha[2]);
                let rot = UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]));
                let next = UnitQuaternion::from_scaled_axis(omega * dt) * rot;
                q[0] = next.w;
                q[1] = next.i;
                q[2] = next.j;
                q[3] = next.k;
                for k in 0..3 {
                    q[4 + k] += alpha[3 + k] * dt;
                }
            }
        }
    }
}
