//! Point Jacobians and their time derivative.
//!
//! A [`Jacobian`] maps the full velocity vector `alpha` to the world-frame
//! motion of a point fixed on one body. Rows 0..3 are angular, rows 3..6 are
//! linear. Columns span every dof of the model; joints off the body's path to
//! the root contribute zero columns.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::config::{MotionVec, MultiBodyConfig};
use crate::error::RbdError;
use crate::joint::JointType;
use crate::kinematics::joint_axis_w;
use crate::multibody::MultiBody;

/// Jacobian of a point rigidly attached to a body.
#[derive(Debug, Clone)]
pub struct Jacobian {
    body: usize,
    point: Vector3<f64>,
    path: Vec<usize>,
}

impl Jacobian {
    /// Jacobian of `point` (body frame) on the named body.
    pub fn new(mb: &MultiBody, body_name: &str, point: Vector3<f64>) -> Result<Self, RbdError> {
        let body = mb.body_index_by_name(body_name)?;
        Ok(Self::from_index(mb, body, point))
    }

    /// Jacobian of `point` (body frame) on body `body`.
    ///
    /// # Panics
    ///
    /// If `body` is out of range; use [`MultiBody::check_body_index`] first
    /// for untrusted indices.
    pub fn from_index(mb: &MultiBody, body: usize, point: Vector3<f64>) -> Self {
        Self {
            body,
            point,
            path: mb.path_to(body),
        }
    }

    pub const fn body(&self) -> usize {
        self.body
    }

    /// Point in the body frame.
    pub const fn point(&self) -> &Vector3<f64> {
        &self.point
    }

    /// Move the point on the same body.
    pub fn set_point(&mut self, point: Vector3<f64>) {
        self.point = point;
    }

    /// Current world position of the point. Requires forward kinematics.
    pub fn point_w(&self, mbc: &MultiBodyConfig) -> Vector3<f64> {
        (mbc.body_pos_w[self.body] * nalgebra::Point3::from(self.point)).coords
    }

    /// World velocity of the point. Requires forward velocity.
    pub fn velocity(&self, mbc: &MultiBodyConfig) -> MotionVec {
        let vel = mbc.body_vel_w[self.body];
        let origin = mbc.body_pos_w[self.body].translation.vector;
        MotionVec {
            angular: vel.angular,
            linear: vel.velocity_at(&origin, &self.point_w(mbc)),
        }
    }

    /// 6 x nr_dof Jacobian at the current configuration.
    pub fn jacobian(&self, mb: &MultiBody, mbc: &MultiBodyConfig) -> DMatrix<f64> {
        let p = self.point_w(mbc);
        let mut jac = DMatrix::zeros(6, mb.nr_dof());
        for &j in &self.path {
            let col = mb.dof_offset(j);
            let origin = mbc.body_pos_w[j].translation.vector;
            match mb.joint(j).joint_type {
                JointType::Fixed => {}
                JointType::Revolute(_) => {
                    if let Some(a) = joint_axis_w(mb, mbc, j) {
                        set_col(&mut jac, col, &a, &a.cross(&(p - origin)));
                    }
                }
                JointType::Prismatic(_) => {
                    if let Some(a) = joint_axis_w(mb, mbc, j) {
                        set_col(&mut jac, col, &Vector3::zeros(), &a);
                    }
                }
                JointType::Free => {
                    for k in 0..3 {
                        let e = Vector3::ith(k, 1.0);
                        set_col(&mut jac, col + k, &e, &e.cross(&(p - origin)));
                        set_col(&mut jac, col + 3 + k, &Vector3::zeros(), &e);
                    }
                }
            }
        }
        jac
    }

    /// Time derivative of [`jacobian`](Self::jacobian). Requires forward velocity.
    pub fn jacobian_dot(&self, mb: &MultiBody, mbc: &MultiBodyConfig) -> DMatrix<f64> {
        let p = self.point_w(mbc);
        let p_dot = self.velocity(mbc).linear;
        let mut jac_dot = DMatrix::zeros(6, mb.nr_dof());
        for &j in &self.path {
            let col = mb.dof_offset(j);
            let origin = mbc.body_pos_w[j].translation.vector;
            let origin_dot = mbc.body_vel_w[j].linear;
            let parent_omega = mb
                .parent(j)
                .map_or_else(Vector3::zeros, |par| mbc.body_vel_w[par].angular);
            match mb.joint(j).joint_type {
                JointType::Fixed => {}
                JointType::Revolute(_) => {
                    if let Some(a) = joint_axis_w(mb, mbc, j) {
                        let a_dot = parent_omega.cross(&a);
                        let lin = a_dot.cross(&(p - origin)) + a.cross(&(p_dot - origin_dot));
                        set_col(&mut jac_dot, col, &a_dot, &lin);
                    }
                }
                JointType::Prismatic(_) => {
                    if let Some(a) = joint_axis_w(mb, mbc, j) {
                        set_col(&mut jac_dot, col, &Vector3::zeros(), &parent_omega.cross(&a));
                    }
                }
                JointType::Free => {
                    for k in 0..3 {
                        let e = Vector3::ith(k, 1.0);
                        set_col(&mut jac_dot, col + k, &Vector3::zeros(), &e.cross(&(p_dot - origin_dot)));
                    }
                }
            }
        }
        jac_dot
    }

    /// `J_dot * alpha`: the point acceleration when `alpha_d` is zero.
    pub fn normal_acc(&self, mb: &MultiBody, mbc: &MultiBodyConfig) -> MotionVec {
        let acc = self.jacobian_dot(mb, mbc) * mbc.alpha_vector();
        MotionVec {
            angular: Vector3::new(acc[0], acc[1], acc[2]),
            linear: Vector3::new(acc[3], acc[4], acc[5]),
        }
    }
}

/// Rows 3..6 of a 6-row Jacobian.
pub fn linear_rows(jac: &DMatrix<f64>) -> DMatrix<f64> {
    jac.rows(3, 3).into_owned()
}

/// Rows 0..3 of a 6-row Jacobian.
pub fn angular_rows(jac: &DMatrix<f64>) -> DMatrix<f64> {
    jac.rows(0, 3).into_owned()
}

/// Multiply the top and bottom halves of a 6-row Jacobian by `alpha`.
pub fn motion_from(jac: &DMatrix<f64>, alpha: &DVector<f64>) -> MotionVec {
    let v = jac * alpha;
    MotionVec {
        angular: Vector3::new(v[0], v[1], v[2]),
        linear: Vector3::new(v[3], v[4], v[5]),
    }
}

fn set_col(jac: &mut DMatrix<f64>, col: usize, angular: &Vector3<f64>, linear: &Vector3<f64>) {
    jac.fixed_view_mut::<3, 1>(0, col).copy_from(angular);
    jac.fixed_view_mut::<3, 1>(3, col).copy_from(linear);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::joint::Joint;
    use crate::kinematics::{forward_kinematics, forward_velocity};
    use crate::multibody::MultiBodyBuilder;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, UnitQuaternion};

    /// Floating torso carrying a revolute-prismatic-revolute chain.
    fn mixed_tree() -> MultiBody {
        MultiBodyBuilder::new()
            .body(Body::massless("torso"))
            .body(Body::massless("a"))
            .body(Body::massless("b"))
            .body(Body::massless("c"))
            .joint(
                "torso",
                "a",
                Joint::new("ja", JointType::Revolute(Vector3::y_axis())),
                Isometry3::translation(0.1, 0.0, -0.3),
            )
            .joint(
                "a",
                "b",
                Joint::new("jb", JointType::Prismatic(Vector3::z_axis())),
                Isometry3::translation(0.0, 0.2, -0.4),
            )
            .joint(
                "b",
                "c",
                Joint::new("jc", JointType::Revolute(Vector3::x_axis())),
                Isometry3::translation(0.3, 0.0, 0.0),
            )
            .build("torso", Joint::new("root", JointType::Free))
            .unwrap()
    }

    fn state(mb: &MultiBody) -> MultiBodyConfig {
        let mut mbc = MultiBodyConfig::new(mb);
        let rot = UnitQuaternion::from_euler_angles(0.2, -0.1, 0.4);
        mbc.q[0] = vec![rot.w, rot.i, rot.j, rot.k, 0.3, -0.1, 0.9];
        mbc.q[1] = vec![0.4];
        mbc.q[2] = vec![0.15];
        mbc.q[3] = vec![-0.7];
        mbc.alpha[0] = vec![0.1, -0.3, 0.2, 0.5, 0.0, -0.4];
        mbc.alpha[1] = vec![1.2];
        mbc.alpha[2] = vec![-0.5];
        mbc.alpha[3] = vec![0.8];
        forward_kinematics(mb, &mut mbc);
        forward_velocity(mb, &mut mbc);
        mbc
    }

    #[test]
    fn jacobian_times_alpha_matches_point_velocity() {
        let mb = mixed_tree();
        let mbc = state(&mb);
        let jac = Jacobian::new(&mb, "c", Vector3::new(0.05, 0.1, -0.2)).unwrap();
        let from_jac = motion_from(&jac.jacobian(&mb, &mbc), &mbc.alpha_vector());
        let direct = jac.velocity(&mbc);
        assert_relative_eq!(from_jac.linear, direct.linear, epsilon = 1e-12);
        assert_relative_eq!(from_jac.angular, direct.angular, epsilon = 1e-12);
    }

    /// Advance the configuration along `alpha` and compare the Jacobian change.
    #[test]
    fn jacobian_dot_matches_finite_difference() {
        let mb = mixed_tree();
        let mbc = state(&mb);
        let jac = Jacobian::new(&mb, "c", Vector3::new(0.05, 0.1, -0.2)).unwrap();
        let dt = 1e-7;

        let mut next = mbc.clone();
        crate::integration::euler_integration(&mb, &mut next, dt);
        forward_kinematics(&mb, &mut next);
        forward_velocity(&mb, &mut next);

        let fd = (jac.jacobian(&mb, &next) - jac.jacobian(&mb, &mbc)) / dt;
        assert_relative_eq!(jac.jacobian_dot(&mb, &mbc), fd, epsilon = 1e-5);
    }

    #[test]
    fn off_path_columns_are_zero() {
        let mb = mixed_tree();
        let mbc = state(&mb);
        let jac = Jacobian::new(&mb, "a", Vector3::zeros()).unwrap().jacobian(&mb, &mbc);
        let jb = mb.dof_offset(mb.joint_index_by_name("jb").unwrap());
        let jc = mb.dof_offset(mb.joint_index_by_name("jc").unwrap());
        assert_relative_eq!(jac.column(jb).norm(), 0.0);
        assert_relative_eq!(jac.column(jc).norm(), 0.0);
    }

    #[test]
    fn free_base_translation_columns_are_identity() {
        let mb = mixed_tree();
        let mbc = state(&mb);
        let jac = Jacobian::new(&mb, "c", Vector3::zeros()).unwrap().jacobian(&mb, &mbc);
        let lin = linear_rows(&jac);
        assert_relative_eq!(
            lin.view((0, 3), (3, 3)).into_owned(),
            nalgebra::DMatrix::identity(3, 3)
        );
        assert_relative_eq!(angular_rows(&jac).view((0, 0), (3, 3)).into_owned(), DMatrix::identity(3, 3));
    }

    #[test]
    fn unknown_body_is_an_error() {
        let mb = mixed_tree();
        assert!(matches!(
            Jacobian::new(&mb, "hand", Vector3::zeros()),
            Err(RbdError::UnknownBody(_))
        ));
    }
}
