//! Center of mass position, velocity and Jacobian.

use nalgebra::{DMatrix, Vector3};

use crate::config::MultiBodyConfig;
use crate::jacobian::{linear_rows, Jacobian};
use crate::multibody::MultiBody;

/// World position of the whole-body center of mass.
///
/// Returns the origin for a massless model.
pub fn compute_com(mb: &MultiBody, mbc: &MultiBodyConfig) -> Vector3<f64> {
    let total = mb.total_mass();
    if total <= 0.0 {
        return Vector3::zeros();
    }
    mb.bodies()
        .iter()
        .zip(&mbc.body_pos_w)
        .map(|(b, x)| b.mass * (x * nalgebra::Point3::from(b.com)).coords)
        .sum::<Vector3<f64>>()
        / total
}

/// World velocity of the whole-body center of mass.
pub fn compute_com_velocity(mb: &MultiBody, mbc: &MultiBodyConfig) -> Vector3<f64> {
    let total = mb.total_mass();
    if total <= 0.0 {
        return Vector3::zeros();
    }
    (0..mb.nr_bodies())
        .map(|i| {
            let b = mb.body(i);
            let origin = mbc.body_pos_w[i].translation.vector;
            let c = (mbc.body_pos_w[i] * nalgebra::Point3::from(b.com)).coords;
            b.mass * mbc.body_vel_w[i].velocity_at(&origin, &c)
        })
        .sum::<Vector3<f64>>()
        / total
}

/// 3 x nr_dof Jacobian of the center of mass.
#[derive(Debug, Clone)]
pub struct CoMJacobian {
    bodies: Vec<(f64, Jacobian)>,
    total_mass: f64,
}

impl CoMJacobian {
    pub fn new(mb: &MultiBody) -> Self {
        let bodies = (0..mb.nr_bodies())
            .filter(|&i| mb.body(i).mass > 0.0)
            .map(|i| (mb.body(i).mass, Jacobian::from_index(mb, i, mb.body(i).com)))
            .collect();
        Self {
            bodies,
            total_mass: mb.total_mass(),
        }
    }

    pub fn jacobian(&self, mb: &MultiBody, mbc: &MultiBodyConfig) -> DMatrix<f64> {
        self.weighted_sum(mb, |jac| linear_rows(&jac.jacobian(mb, mbc)))
    }

    pub fn jacobian_dot(&self, mb: &MultiBody, mbc: &MultiBodyConfig) -> DMatrix<f64> {
        self.weighted_sum(mb, |jac| linear_rows(&jac.jacobian_dot(mb, mbc)))
    }

    /// `J_dot * alpha` of the center of mass.
    pub fn normal_acc(&self, mb: &MultiBody, mbc: &MultiBodyConfig) -> Vector3<f64> {
        let acc = self.jacobian_dot(mb, mbc) * mbc.alpha_vector();
        Vector3::new(acc[0], acc[1], acc[2])
    }

    fn weighted_sum(&self, mb: &MultiBody, f: impl Fn(&Jacobian) -> DMatrix<f64>) -> DMatrix<f64> {
        let mut sum = DMatrix::zeros(3, mb.nr_dof());
        if self.total_mass <= 0.0 {
            return sum;
        }
        for (mass, jac) in &self.bodies {
            sum += f(jac) * (*mass / self.total_mass);
        }
        sum
    }
}
