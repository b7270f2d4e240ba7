//! Partition of the QP decision vector and the per-layout solver data
//! handed to tasks and constraints.

use nalgebra::Vector3;
use qptasks_rbd::MultiBody;

use crate::contact::Contact;
use crate::error::ConfigurationError;

/// Sizes of the three contiguous blocks of the decision vector
/// `x = [alpha_d, lambda, torque]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VariableLayout {
    /// Generalized accelerations (model dof count).
    pub alpha_d: usize,
    /// Contact force components (3 per contact point).
    pub lambda: usize,
    /// Actuation torques (actuated dof count).
    pub torque: usize,
}

impl VariableLayout {
    pub const fn nr_vars(&self) -> usize {
        self.alpha_d + self.lambda + self.torque
    }

    pub const fn alpha_d_begin(&self) -> usize {
        0
    }

    pub const fn lambda_begin(&self) -> usize {
        self.alpha_d
    }

    pub const fn torque_begin(&self) -> usize {
        self.alpha_d + self.lambda
    }
}

/// A validated contact with its force block offset.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactData {
    pub body: usize,
    pub points: Vec<Vector3<f64>>,
    pub normals: Vec<Vector3<f64>>,
    /// Index of the first force component of this contact in `x`.
    pub lambda_begin: usize,
}

impl ContactData {
    /// Index of the first force component of point `i`.
    pub const fn point_lambda(&self, i: usize) -> usize {
        self.lambda_begin + 3 * i
    }
}

/// Everything tasks and constraints need to size themselves: the layout,
/// the active contacts and a revision that changes on every recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverData {
    layout: VariableLayout,
    revision: u64,
    contacts: Vec<ContactData>,
}

impl SolverData {
    /// Validate `contacts` against `mb` and lay out the decision vector.
    pub fn new(mb: &MultiBody, contacts: &[Contact], revision: u64) -> Result<Self, ConfigurationError> {
        let mut lambda = 0;
        let mut data = Vec::with_capacity(contacts.len());
        for c in contacts {
            if c.body_id >= mb.nr_bodies() {
                return Err(ConfigurationError::UnknownContactBody {
                    body: c.body_id,
                    nr_bodies: mb.nr_bodies(),
                });
            }
            if c.points.len() != c.normals.len() {
                return Err(ConfigurationError::ContactShape {
                    body: c.body_id,
                    points: c.points.len(),
                    normals: c.normals.len(),
                });
            }
            if let Some(point) = c
                .normals
                .iter()
                .position(|n| !(n.iter().all(|v| v.is_finite()) && n.norm() > f64::EPSILON))
            {
                return Err(ConfigurationError::DegenerateNormal { body: c.body_id, point });
            }
            data.push(ContactData {
                body: c.body_id,
                points: c.points.clone(),
                normals: c.normals.clone(),
                lambda_begin: mb.nr_dof() + lambda,
            });
            lambda += 3 * c.nr_points();
        }
        Ok(Self {
            layout: VariableLayout {
                alpha_d: mb.nr_dof(),
                lambda,
                torque: mb.nr_actuated_dof(),
            },
            revision,
            contacts: data,
        })
    }

    pub const fn layout(&self) -> VariableLayout {
        self.layout
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contacts(&self) -> &[ContactData] {
        &self.contacts
    }

    pub fn nr_points(&self) -> usize {
        self.contacts.iter().map(|c| c.points.len()).sum()
    }
}

/// Records which layout revision a task or constraint was sized for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStamp(Option<u64>);

impl LayoutStamp {
    pub const fn mark(&mut self, data: &SolverData) {
        self.0 = Some(data.revision());
    }

    pub const fn revision(&self) -> Option<u64> {
        self.0
    }

    /// Error unless the last resize used `data`'s revision.
    pub fn check(&self, name: &str, data: &SolverData) -> Result<(), ConfigurationError> {
        match self.0 {
            None => Err(ConfigurationError::NotResized { name: name.into() }),
            Some(sized_for) if sized_for != data.revision() => Err(ConfigurationError::LayoutMismatch {
                name: name.into(),
                sized_for,
                current: data.revision(),
            }),
            Some(_) => Ok(()),
        }
    }
}
