//! Joint kinds and their configuration-space bookkeeping.

use nalgebra::{Isometry3, Quaternion, Translation3, Unit, UnitQuaternion, Vector3};

/// Kind of motion a joint allows between its parent and child body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointType {
    /// No relative motion.
    Fixed,
    /// Rotation about an axis expressed in the joint frame.
    Revolute(Unit<Vector3<f64>>),
    /// Translation along an axis expressed in the joint frame.
    Prismatic(Unit<Vector3<f64>>),
    /// Unconstrained 6-DOF motion, used for floating bases.
    ///
    /// Parameters are a unit quaternion `[w, x, y, z]` followed by the
    /// translation `[x, y, z]`. Velocities are the world-frame angular
    /// velocity followed by the world-frame linear velocity of the body origin.
    Free,
}

impl JointType {
    /// Number of configuration parameters.
    pub const fn params(&self) -> usize {
        match self {
            Self::Fixed => 0,
            Self::Revolute(_) | Self::Prismatic(_) => 1,
            Self::Free => 7,
        }
    }

    /// Number of velocity degrees of freedom.
    pub const fn dof(&self) -> usize {
        match self {
            Self::Fixed => 0,
            Self::Revolute(_) | Self::Prismatic(_) => 1,
            Self::Free => 6,
        }
    }

    /// Whether a motor can apply torque along this joint's dofs.
    pub const fn is_actuated(&self) -> bool {
        matches!(self, Self::Revolute(_) | Self::Prismatic(_))
    }
}

/// A joint connecting a body to its parent (or to the world).
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Joint name (unique within a model).
    pub name: String,
    /// Motion kind.
    pub joint_type: JointType,
    /// Maximum absolute effort (Nm or N). `None` means unbounded.
    pub effort_limit: Option<f64>,
}

impl Joint {
    /// Create a joint with no effort limit.
    pub fn new(name: impl Into<String>, joint_type: JointType) -> Self {
        Self {
            name: name.into(),
            joint_type,
            effort_limit: None,
        }
    }

    /// Set the effort limit.
    #[must_use]
    pub fn with_effort_limit(mut self, effort: f64) -> Self {
        self.effort_limit = Some(effort);
        self
    }

    pub const fn params(&self) -> usize {
        self.joint_type.params()
    }

    pub const fn dof(&self) -> usize {
        self.joint_type.dof()
    }

    /// Neutral configuration (identity quaternion for free joints).
    pub fn zero_param(&self) -> Vec<f64> {
        match self.joint_type {
            JointType::Fixed => Vec::new(),
            JointType::Revolute(_) | JointType::Prismatic(_) => vec![0.0],
            JointType::Free => vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
    }

    /// Zero velocity vector of the right size.
    pub fn zero_dof(&self) -> Vec<f64> {
        vec![0.0; self.dof()]
    }

    /// Transform produced by the joint motion at configuration `q`.
    ///
    /// `q` must hold `self.params()` values.
    pub fn motion(&self, q: &[f64]) -> Isometry3<f64> {
        match self.joint_type {
            JointType::Fixed => Isometry3::identity(),
            JointType::Revolute(axis) => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&axis, q[0]),
            ),
            JointType::Prismatic(axis) => Isometry3::from_parts(
                Translation3::from(axis.into_inner() * q[0]),
                UnitQuaternion::identity(),
            ),
            JointType::Free => Isometry3::from_parts(
                Translation3::new(q[4], q[5], q[6]),
                UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3])),
            ),
        }
    }
}
