//! Contact patches and their share of the decision vector.

use nalgebra::Vector3;
use qptasks_rbd::{MultiBody, RbdError};

/// A candidate contact patch on one body.
///
/// Points and normals are expressed in the body frame. One force variable
/// of three world-frame components is reserved per point.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub body_id: usize,
    pub points: Vec<Vector3<f64>>,
    pub normals: Vec<Vector3<f64>>,
}

impl Contact {
    pub const fn new(body_id: usize, points: Vec<Vector3<f64>>, normals: Vec<Vector3<f64>>) -> Self {
        Self {
            body_id,
            points,
            normals,
        }
    }

    /// Contact on the body called `body_name`.
    pub fn on_body(
        mb: &MultiBody,
        body_name: &str,
        points: Vec<Vector3<f64>>,
        normals: Vec<Vector3<f64>>,
    ) -> Result<Self, RbdError> {
        Ok(Self::new(mb.body_index_by_name(body_name)?, points, normals))
    }

    pub fn nr_points(&self) -> usize {
        self.points.len()
    }
}
