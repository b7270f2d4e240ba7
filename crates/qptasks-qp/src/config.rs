use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_iter() -> u32 {
    200
}
const fn default_tolerance() -> f64 {
    1e-8
}
const fn default_regularization() -> f64 {
    1e-6
}

// ---------------------------------------------------------------------------
// SolverConfig
// ---------------------------------------------------------------------------

/// Numerical settings of the QP solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Interior-point iteration limit (default: 200).
    #[serde(default = "default_max_iter")]
    pub max_iter: u32,

    /// Absolute duality-gap tolerance (default: 1e-8).
    #[serde(default = "default_tolerance")]
    pub tol_gap_abs: f64,

    /// Relative duality-gap tolerance (default: 1e-8).
    #[serde(default = "default_tolerance")]
    pub tol_gap_rel: f64,

    /// Feasibility tolerance (default: 1e-8).
    #[serde(default = "default_tolerance")]
    pub tol_feas: f64,

    /// Diagonal added to the aggregate objective matrix (default: 1e-6).
    /// Keeps the problem strictly convex in variables no task weighs.
    #[serde(default = "default_regularization")]
    pub regularization: f64,

    /// Print backend iteration logs.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            tol_gap_abs: default_tolerance(),
            tol_gap_rel: default_tolerance(),
            tol_feas: default_tolerance(),
            regularization: default_regularization(),
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iter == 0 {
            return Err(invalid("max_iter", "must be > 0"));
        }
        for (field, value) in [
            ("tol_gap_abs", self.tol_gap_abs),
            ("tol_gap_rel", self.tol_gap_rel),
            ("tol_feas", self.tol_feas),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, &format!("{value} (must be finite and > 0)")));
            }
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(invalid(
                "regularization",
                &format!("{} (must be finite and >= 0)", self.regularization),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}
