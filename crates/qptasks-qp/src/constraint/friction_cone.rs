//! Linearised friction pyramid on every contact force.
//!
//! For a point with world normal `n`, tangents `t1`, `t2` and friction
//! coefficient `mu`, the force `f` must satisfy
//!
//! ```text
//! -n·f <= 0
//!  (±t1 - mu n)·f <= 0
//!  (±t2 - mu n)·f <= 0
//! ```

use nalgebra::Vector3;
use qptasks_rbd::{MultiBody, MultiBodyConfig};

use crate::constraint::{Constraint, InequalityBlock};
use crate::error::QpError;
use crate::layout::{LayoutStamp, SolverData};

/// Rows contributed per contact point.
pub const ROWS_PER_POINT: usize = 5;

/// Unilateral contact and Coulomb friction, inequality only.
pub struct FrictionConeConstr {
    name: String,
    mu: f64,
    ineq: InequalityBlock,
    stamp: LayoutStamp,
}

impl FrictionConeConstr {
    /// # Panics
    ///
    /// If `mu` is negative or not finite.
    pub fn new(mu: f64) -> Self {
        assert!(mu.is_finite() && mu >= 0.0, "friction coefficient must be >= 0, got {mu}");
        Self {
            name: "friction_cone".into(),
            mu,
            ineq: InequalityBlock::default(),
            stamp: LayoutStamp::default(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub const fn mu(&self) -> f64 {
        self.mu
    }

    /// # Panics
    ///
    /// If `mu` is negative or not finite.
    pub fn set_mu(&mut self, mu: f64) {
        assert!(mu.is_finite() && mu >= 0.0, "friction coefficient must be >= 0, got {mu}");
        self.mu = mu;
    }
}

/// Two unit tangents completing `n` to an orthonormal frame.
pub fn tangent_basis(n: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if n.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    let t1 = n.cross(&helper).normalize();
    let t2 = n.cross(&t1);
    (t1, t2)
}

impl Constraint for FrictionConeConstr {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_nr_vars(&mut self, _mb: &MultiBody, data: &SolverData) -> Result<(), QpError> {
        self.ineq
            .resize(ROWS_PER_POINT * data.nr_points(), data.layout().nr_vars());
        self.stamp.mark(data);
        Ok(())
    }

    fn update(&mut self, _mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError> {
        self.stamp.check(&self.name, data)?;
        let mu = self.mu;
        let (a, b) = self.ineq.parts_mut();
        a.fill(0.0);
        b.fill(0.0);
        let mut row = 0;
        for contact in data.contacts() {
            let rot = mbc.body_pos_w[contact.body].rotation;
            for (i, normal) in contact.normals.iter().enumerate() {
                let n = (rot * normal).normalize();
                let (t1, t2) = tangent_basis(&n);
                let col = contact.point_lambda(i);
                let faces = [-n, t1 - mu * n, -t1 - mu * n, t2 - mu * n, -t2 - mu * n];
                for face in faces {
                    a.view_mut((row, col), (1, 3)).copy_from(&face.transpose());
                    row += 1;
                }
            }
        }
        Ok(())
    }

    fn inequality(&self) -> Option<&InequalityBlock> {
        Some(&self.ineq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use approx::assert_relative_eq;
    use nalgebra::DVector;
    use qptasks_test_utils::{foot_normals, foot_points, humanoid, standing_config};

    #[test]
    fn tangent_basis_is_orthonormal() {
        for n in [Vector3::z(), Vector3::x(), Vector3::new(1.0, 2.0, -0.5).normalize()] {
            let (t1, t2) = tangent_basis(&n);
            assert_relative_eq!(t1.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(t2.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(t1.dot(&n), 0.0, epsilon = 1e-12);
            assert_relative_eq!(t2.dot(&n), 0.0, epsilon = 1e-12);
            assert_relative_eq!(t1.dot(&t2), 0.0, epsilon = 1e-12);
        }
    }

    fn updated(mu: f64) -> (FrictionConeConstr, SolverData) {
        let mb = humanoid();
        let mbc = standing_config(&mb);
        let contact = Contact::on_body(&mb, "r_foot", foot_points(), foot_normals()).unwrap();
        let data = SolverData::new(&mb, &[contact], 1).unwrap();
        let mut cone = FrictionConeConstr::new(mu);
        cone.update_nr_vars(&mb, &data).unwrap();
        cone.update(&mb, &mbc, &data).unwrap();
        (cone, data)
    }

    #[test]
    fn five_rows_per_point() {
        let (cone, _) = updated(0.5);
        assert_eq!(cone.inequality().unwrap().nr_ineq_lines(), 20);
    }

    #[test]
    fn force_inside_cone_is_feasible() {
        let (cone, data) = updated(0.5);
        let ineq = cone.inequality().unwrap();
        let mut x = DVector::zeros(data.layout().nr_vars());
        for i in 0..4 {
            let col = data.contacts()[0].point_lambda(i);
            x[col] = 10.0;
            x[col + 2] = 100.0;
        }
        let slack = ineq.vector() - ineq.matrix() * &x;
        assert!(slack.iter().all(|s| *s >= 0.0));
    }

    #[test]
    fn pulling_or_sliding_force_is_infeasible() {
        let (cone, data) = updated(0.5);
        let ineq = cone.inequality().unwrap();
        let col = data.contacts()[0].point_lambda(0);

        let mut pull = DVector::zeros(data.layout().nr_vars());
        pull[col + 2] = -1.0;
        assert!((ineq.matrix() * &pull - ineq.vector()).max() > 0.0);

        let mut slide = DVector::zeros(data.layout().nr_vars());
        slide[col] = 60.0;
        slide[col + 2] = 100.0;
        assert!((ineq.matrix() * &slide - ineq.vector()).max() > 0.0);
    }

    #[test]
    #[should_panic(expected = "friction coefficient")]
    fn negative_mu_panics() {
        let _ = FrictionConeConstr::new(-0.1);
    }
}
