//! Rigid body inertial description.

use nalgebra::{Matrix3, Vector3};

/// A rigid body of the kinematic tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Body name (unique within a model).
    pub name: String,
    /// Mass in kilograms.
    pub mass: f64,
    /// Center of mass in the body frame.
    pub com: Vector3<f64>,
    /// Rotational inertia about the center of mass, body frame.
    pub inertia: Matrix3<f64>,
}

impl Body {
    /// Massless body (frames, sensor mounts).
    pub fn massless(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mass: 0.0,
            com: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// Body with the given mass, CoM and inertia.
    pub fn new(
        name: impl Into<String>,
        mass: f64,
        com: Vector3<f64>,
        inertia: Matrix3<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            mass,
            com,
            inertia,
        }
    }

    /// Solid box of the given size centred on `com`.
    pub fn cuboid(name: impl Into<String>, mass: f64, com: Vector3<f64>, size: Vector3<f64>) -> Self {
        let k = mass / 12.0;
        let (x2, y2, z2) = (size.x * size.x, size.y * size.y, size.z * size.z);
        let inertia = Matrix3::from_diagonal(&Vector3::new(k * (y2 + z2), k * (x2 + z2), k * (x2 + y2)));
        Self::new(name, mass, com, inertia)
    }
}
