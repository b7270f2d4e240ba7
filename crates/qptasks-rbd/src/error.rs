//! Error types for model construction, URDF loading and configuration checks.

use std::path::PathBuf;

/// Errors raised by the rigid-body model adapter.
#[derive(Debug, thiserror::Error)]
pub enum RbdError {
    /// Failed to read a URDF file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse URDF XML content.
    #[error("URDF parse error: {0}")]
    Parse(String),

    /// The URDF has no root link (no link that is never a child).
    #[error("no root link found")]
    NoRootLink,

    /// A URDF joint type the model cannot represent.
    #[error("unsupported joint type: {0}")]
    UnsupportedJointType(String),

    /// A body name that does not exist in the model.
    #[error("unknown body: {0}")]
    UnknownBody(String),

    /// A body index outside `0..nr_bodies`.
    #[error("body index {index} out of range (model has {nr_bodies} bodies)")]
    BodyIndexOutOfRange { index: usize, nr_bodies: usize },

    /// A joint name that does not exist in the model.
    #[error("unknown joint: {0}")]
    UnknownJoint(String),

    /// The body tree is malformed (duplicate names, cycles, several roots).
    #[error("invalid body tree: {0}")]
    InvalidTree(String),

    /// A nested joint vector does not match the model's joint layout.
    #[error("{what} has wrong shape for joint {joint}: expected {expected} values, got {got}")]
    JointShapeMismatch {
        what: &'static str,
        joint: usize,
        expected: usize,
        got: usize,
    },

    /// A nested joint vector has the wrong number of joints.
    #[error("{what} has {got} joints, model has {expected}")]
    JointCountMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A flat vector does not match the model's dof or param count.
    #[error("{what} has length {got}, expected {expected}")]
    VectorLengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}
