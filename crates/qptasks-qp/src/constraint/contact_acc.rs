//! Zero acceleration of every contact point: `J_p alpha_d = -J_dot_p alpha`.

use nalgebra::Vector3;
use qptasks_rbd::jacobian::linear_rows;
use qptasks_rbd::{Jacobian, MultiBody, MultiBodyConfig};

use crate::constraint::{Constraint, EqualityBlock};
use crate::error::QpError;
use crate::layout::{LayoutStamp, SolverData};

/// Three equality rows per active contact point.
pub struct ContactAccConstr {
    name: String,
    points: Vec<Jacobian>,
    eq: EqualityBlock,
    stamp: LayoutStamp,
}

impl Default for ContactAccConstr {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactAccConstr {
    pub fn new() -> Self {
        Self {
            name: "contact_acc".into(),
            points: Vec::new(),
            eq: EqualityBlock::default(),
            stamp: LayoutStamp::default(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Constraint for ContactAccConstr {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_nr_vars(&mut self, mb: &MultiBody, data: &SolverData) -> Result<(), QpError> {
        self.points = data
            .contacts()
            .iter()
            .flat_map(|c| c.points.iter().map(|p| Jacobian::from_index(mb, c.body, *p)))
            .collect();
        self.eq.resize(3 * self.points.len(), data.layout().nr_vars());
        self.stamp.mark(data);
        Ok(())
    }

    fn update(&mut self, mb: &MultiBody, mbc: &MultiBodyConfig, data: &SolverData) -> Result<(), QpError> {
        self.stamp.check(&self.name, data)?;
        let nr_dof = data.layout().alpha_d;
        let (a, b) = self.eq.parts_mut();
        for (i, jac) in self.points.iter().enumerate() {
            let row = 3 * i;
            a.view_mut((row, 0), (3, nr_dof))
                .copy_from(&linear_rows(&jac.jacobian(mb, mbc)));
            let acc: Vector3<f64> = jac.normal_acc(mb, mbc).linear;
            b.fixed_rows_mut::<3>(row).copy_from(&(-acc));
        }
        Ok(())
    }

    fn equality(&self) -> Option<&EqualityBlock> {
        Some(&self.eq)
    }
}
