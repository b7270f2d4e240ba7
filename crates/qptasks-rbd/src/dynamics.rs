//! Joint-space equations of motion `H(q) alpha_d + C(q, alpha) = tau`.
//!
//! Both terms are assembled body by body from center-of-mass Jacobians:
//!
//! ```text
//! H = sum_i  m_i Jc_iᵀ Jc_i + Jw_iᵀ I_i Jw_i
//! C = sum_i  m_i Jc_iᵀ (Jc_dot_i alpha - g) + Jw_iᵀ (I_i Jw_dot_i alpha + w_i x I_i w_i)
//! ```
//!
//! with `I_i` the world-frame rotational inertia about the body CoM.

use nalgebra::{DMatrix, DVector, Matrix3};

use crate::config::MultiBodyConfig;
use crate::jacobian::{angular_rows, linear_rows, Jacobian};
use crate::multibody::MultiBody;

/// Mass matrix and nonlinear effects for a fixed model.
#[derive(Debug, Clone)]
pub struct ForwardDynamics {
    jacobians: Vec<Jacobian>,
    h: DMatrix<f64>,
    c: DVector<f64>,
}

impl ForwardDynamics {
    pub fn new(mb: &MultiBody) -> Self {
        let jacobians = (0..mb.nr_bodies())
            .map(|i| Jacobian::from_index(mb, i, mb.body(i).com))
            .collect();
        Self {
            jacobians,
            h: DMatrix::zeros(mb.nr_dof(), mb.nr_dof()),
            c: DVector::zeros(mb.nr_dof()),
        }
    }

    /// Mass matrix, valid after [`compute_h`](Self::compute_h).
    pub const fn h(&self) -> &DMatrix<f64> {
        &self.h
    }

    /// Coriolis, centrifugal and gravity terms, valid after
    /// [`compute_c`](Self::compute_c).
    pub const fn c(&self) -> &DVector<f64> {
        &self.c
    }

    /// Requires forward kinematics.
    pub fn compute_h(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) {
        let n = mb.nr_dof();
        self.h = DMatrix::zeros(n, n);
        for (i, jac) in self.jacobians.iter().enumerate() {
            let body = mb.body(i);
            if body.mass <= 0.0 && body.inertia == Matrix3::zeros() {
                continue;
            }
            let full = jac.jacobian(mb, mbc);
            let jc = linear_rows(&full);
            let jw = angular_rows(&full);
            let inertia = to_dynamic(&world_inertia(mbc, i, &body.inertia));
            self.h += jc.transpose() * &jc * body.mass + jw.transpose() * inertia * &jw;
        }
    }

    /// Requires forward kinematics and forward velocity.
    pub fn compute_c(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) {
        let alpha = mbc.alpha_vector();
        self.c = DVector::zeros(mb.nr_dof());
        for (i, jac) in self.jacobians.iter().enumerate() {
            let body = mb.body(i);
            if body.mass <= 0.0 && body.inertia == Matrix3::zeros() {
                continue;
            }
            let full = jac.jacobian(mb, mbc);
            let full_dot = jac.jacobian_dot(mb, mbc);
            let acc = &full_dot * &alpha;
            let lin_acc = acc.fixed_rows::<3>(3).into_owned();
            let ang_acc = acc.fixed_rows::<3>(0).into_owned();
            let omega = mbc.body_vel_w[i].angular;
            let inertia = world_inertia(mbc, i, &body.inertia);

            let force = (lin_acc - mbc.gravity) * body.mass;
            let moment = inertia * ang_acc + omega.cross(&(inertia * omega));
            self.c += linear_rows(&full).transpose() * DVector::from_column_slice(force.as_slice())
                + angular_rows(&full).transpose() * DVector::from_column_slice(moment.as_slice());
        }
    }

    /// Both terms at once.
    pub fn compute_hc(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig) {
        self.compute_h(mb, mbc);
        self.compute_c(mb, mbc);
    }

    /// Generalized acceleration produced by the joint torques in `mbc`
    /// (`H^-1 (tau - C)`). `None` if `H` is singular.
    pub fn acceleration(&self, mbc: &MultiBodyConfig) -> Option<DVector<f64>> {
        let tau = crate::config::flatten(&mbc.joint_torque);
        self.h.clone().cholesky().map(|chol| chol.solve(&(tau - &self.c)))
    }
}

fn to_dynamic(m: &Matrix3<f64>) -> DMatrix<f64> {
    DMatrix::from_column_slice(3, 3, m.as_slice())
}

fn world_inertia(mbc: &MultiBodyConfig, body: usize, inertia: &Matrix3<f64>) -> Matrix3<f64> {
    let rot = mbc.body_pos_w[body].rotation.to_rotation_matrix();
    rot.matrix() * inertia * rot.matrix().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::joint::{Joint, JointType};
    use crate::kinematics::{forward_kinematics, forward_velocity};
    use crate::multibody::MultiBodyBuilder;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, UnitQuaternion, Vector3};

    /// Pendulum: 2 kg point-ish mass 0.5 m below a y-axis hinge.
    fn pendulum() -> MultiBody {
        MultiBodyBuilder::new()
            .body(Body::massless("base"))
            .body(Body::cuboid("bob", 2.0, Vector3::new(0.0, 0.0, -0.5), Vector3::repeat(0.01)))
            .joint(
                "base",
                "bob",
                Joint::new("hinge", JointType::Revolute(Vector3::y_axis())),
                Isometry3::identity(),
            )
            .build("base", Joint::new("root", JointType::Fixed))
            .unwrap()
    }

    fn floating_arm() -> MultiBody {
        MultiBodyBuilder::new()
            .body(Body::cuboid("torso", 10.0, Vector3::zeros(), Vector3::new(0.3, 0.2, 0.5)))
            .body(Body::cuboid("arm", 2.0, Vector3::new(0.0, 0.0, -0.2), Vector3::new(0.05, 0.05, 0.4)))
            .body(Body::cuboid("forearm", 1.0, Vector3::new(0.0, 0.0, -0.15), Vector3::new(0.04, 0.04, 0.3)))
            .joint(
                "torso",
                "arm",
                Joint::new("shoulder", JointType::Revolute(Vector3::x_axis())),
                Isometry3::translation(0.0, 0.2, 0.2),
            )
            .joint(
                "arm",
                "forearm",
                Joint::new("elbow", JointType::Revolute(Vector3::y_axis())),
                Isometry3::translation(0.0, 0.0, -0.4),
            )
            .build("torso", Joint::new("root", JointType::Free))
            .unwrap()
    }

    #[test]
    fn pendulum_inertia_and_gravity_torque() {
        let mb = pendulum();
        let mut mbc = MultiBodyConfig::new(&mb);
        mbc.q[1] = vec![0.3];
        forward_kinematics(&mb, &mut mbc);
        forward_velocity(&mb, &mut mbc);
        let mut fd = ForwardDynamics::new(&mb);
        fd.compute_hc(&mb, &mbc);

        let iyy = mb.body(1).inertia[(1, 1)];
        assert_relative_eq!(fd.h()[(0, 0)], 2.0 * 0.25 + iyy, epsilon = 1e-12);
        // Rotating about +y swings the bob toward -x; gravity pulls it back.
        assert_relative_eq!(fd.c()[0], 2.0 * 9.81 * 0.5 * 0.3_f64.sin(), epsilon = 1e-12);
    }

    #[test]
    fn mass_matrix_is_symmetric_positive_definite() {
        let mb = floating_arm();
        let mut mbc = MultiBodyConfig::new(&mb);
        let rot = UnitQuaternion::from_euler_angles(0.1, 0.4, -0.2);
        mbc.q[0] = vec![rot.w, rot.i, rot.j, rot.k, 0.0, 0.0, 1.0];
        mbc.q[1] = vec![0.5];
        mbc.q[2] = vec![-0.8];
        forward_kinematics(&mb, &mut mbc);
        let mut fd = ForwardDynamics::new(&mb);
        fd.compute_h(&mb, &mbc);
        assert_relative_eq!(fd.h().clone(), fd.h().transpose(), epsilon = 1e-12);
        assert!(fd.h().clone().cholesky().is_some());
    }

    #[test]
    fn static_free_base_carries_total_weight() {
        let mb = floating_arm();
        let mut mbc = MultiBodyConfig::new(&mb);
        forward_kinematics(&mb, &mut mbc);
        forward_velocity(&mb, &mut mbc);
        let mut fd = ForwardDynamics::new(&mb);
        fd.compute_c(&mb, &mbc);
        // Base z-force row equals m * g.
        assert_relative_eq!(fd.c()[5], 13.0 * 9.81, epsilon = 1e-10);
        assert_relative_eq!(fd.c()[3], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn free_fall_acceleration_is_gravity() {
        let mb = floating_arm();
        let mut mbc = MultiBodyConfig::new(&mb);
        mbc.q[1] = vec![0.2];
        forward_kinematics(&mb, &mut mbc);
        forward_velocity(&mb, &mut mbc);
        let mut fd = ForwardDynamics::new(&mb);
        fd.compute_hc(&mb, &mbc);
        let acc = fd.acceleration(&mbc).unwrap();
        // No torques, no contacts: every joint keeps its relative pose and the
        // whole body falls.
        assert_relative_eq!(acc[5], -9.81, epsilon = 1e-9);
        assert_relative_eq!(acc[6], 0.0, epsilon = 1e-9);
        assert_relative_eq!(acc[7], 0.0, epsilon = 1e-9);
    }
}
