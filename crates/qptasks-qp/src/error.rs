use std::fmt;

use qptasks_rbd::RbdError;
use thiserror::Error;

/// Top-level error type for qptasks-qp.
#[derive(Debug, Error)]
pub enum QpError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error("QP solve failed: {0}")]
    SolveFailed(#[from] SolveFailure),

    #[error("Model error: {0}")]
    Model(#[from] RbdError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Constraint capability a constraint may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Equality,
    Inequality,
    Bound,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equality => "equality",
            Self::Inequality => "inequality",
            Self::Bound => "bound",
        })
    }
}

/// Problems with the registered contacts, tasks or constraints.
///
/// Surfaced immediately, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("contact references unknown body {body} (model has {nr_bodies} bodies)")]
    UnknownContactBody { body: usize, nr_bodies: usize },

    #[error("contact on body {body} has {points} points but {normals} normals")]
    ContactShape {
        body: usize,
        points: usize,
        normals: usize,
    },

    #[error("contact on body {body} has a zero or non-finite normal at point {point}")]
    DegenerateNormal { body: usize, point: usize },

    #[error("variable layout not computed: call nr_vars before update")]
    LayoutNotComputed,

    #[error("{name} was never sized for a variable layout")]
    NotResized { name: String },

    #[error("{name} was sized for layout revision {sized_for}, solver is at revision {current}")]
    LayoutMismatch {
        name: String,
        sized_for: u64,
        current: u64,
    },

    #[error("{what} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("constraint {name} has no {capability} capability")]
    MissingCapability {
        name: String,
        capability: Capability,
    },
}

/// Why the backend could not produce a solution for this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveFailure {
    #[error("problem is infeasible")]
    Infeasible,

    #[error("solver did not converge ({0})")]
    NotConverged(String),

    #[error("objective is not positive definite")]
    NotPositiveDefinite,

    #[error("backend setup failed: {0}")]
    Setup(String),
}

/// Solver configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
