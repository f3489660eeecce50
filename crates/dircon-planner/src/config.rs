//! Transcription configuration
//!
//! Per-mode options for the hybrid transcription and the serde description of
//! a complete mode sequence, loadable from TOML:
//!
//! ```toml
//! [[modes]]
//! num_knots = 8
//! min_timestep = 0.01
//! max_timestep = 0.2
//!
//! [modes.options]
//! relative_rows = [0]
//! start = "value_only"
//! force_cost = 1e-4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors, detected before any decision variable is allocated
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Mode sequence is empty")]
    EmptyModeSequence,
    #[error("Expected {expected} {what}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Mode {mode} has {num_knots} knots, at least 2 are required")]
    TooFewKnots { mode: usize, num_knots: usize },
    #[error("Mode {mode} has invalid timestep bounds [{min}, {max}]")]
    InvalidTimestepBounds { mode: usize, min: f64, max: f64 },
    #[error("Mode {mode} options cover {got} constraint rows, constraint set has {expected}")]
    OptionsMismatch {
        mode: usize,
        expected: usize,
        got: usize,
    },
    #[error("Constraint row {row} out of range ({num_constraints} rows)")]
    RowOutOfRange { row: usize, num_constraints: usize },
    #[error("Unsupported state layout: {num_positions} positions, {num_velocities} velocities")]
    UnsupportedStateLayout {
        num_positions: usize,
        num_velocities: usize,
    },
    #[error("Mode {mode} uses a dynamics model with different dimensions than mode 0")]
    ModelMismatch { mode: usize },
}

/// How strongly one constraint row is enforced at a knot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    /// Value, velocity and acceleration rows
    #[default]
    ValueAndVelocity,
    /// Value and acceleration rows, velocity free
    ValueOnly,
    /// Row not enforced at this knot
    Omitted,
}

impl Enforcement {
    pub fn enforces_value(self) -> bool {
        self != Self::Omitted
    }

    pub fn enforces_velocity(self) -> bool {
        self == Self::ValueAndVelocity
    }
}

/// Per-mode transcription options
///
/// Row-indexed vectors all have length `num_constraints`, matching the
/// mode's constraint set.
#[derive(Debug, Clone, PartialEq)]
pub struct DirconOptions {
    num_constraints: usize,
    relative: Vec<bool>,
    start: Vec<Enforcement>,
    interior: Vec<Enforcement>,
    end: Vec<Enforcement>,
    force_cost: f64,
}

impl DirconOptions {
    /// Options with every row absolute and fully enforced at every knot
    pub fn new(num_constraints: usize) -> Self {
        Self {
            num_constraints,
            relative: vec![false; num_constraints],
            start: vec![Enforcement::default(); num_constraints],
            interior: vec![Enforcement::default(); num_constraints],
            end: vec![Enforcement::default(); num_constraints],
            force_cost: 0.0,
        }
    }

    pub fn num_constraints(&self) -> usize {
        self.num_constraints
    }

    fn check_row(&self, row: usize) -> Result<(), ConfigurationError> {
        if row < self.num_constraints {
            Ok(())
        } else {
            Err(ConfigurationError::RowOutOfRange {
                row,
                num_constraints: self.num_constraints,
            })
        }
    }

    /// Mark a row as relative to the mode's free offset
    pub fn set_constraint_relative(&mut self, row: usize, relative: bool) -> Result<(), ConfigurationError> {
        self.check_row(row)?;
        self.relative[row] = relative;
        Ok(())
    }

    pub fn set_start_type(&mut self, row: usize, enforcement: Enforcement) -> Result<(), ConfigurationError> {
        self.check_row(row)?;
        self.start[row] = enforcement;
        Ok(())
    }

    pub fn set_interior_type(&mut self, row: usize, enforcement: Enforcement) -> Result<(), ConfigurationError> {
        self.check_row(row)?;
        self.interior[row] = enforcement;
        Ok(())
    }

    pub fn set_end_type(&mut self, row: usize, enforcement: Enforcement) -> Result<(), ConfigurationError> {
        self.check_row(row)?;
        self.end[row] = enforcement;
        Ok(())
    }

    pub fn set_all_start_type(&mut self, enforcement: Enforcement) {
        self.start.fill(enforcement);
    }

    pub fn set_all_interior_type(&mut self, enforcement: Enforcement) {
        self.interior.fill(enforcement);
    }

    pub fn set_all_end_type(&mut self, enforcement: Enforcement) {
        self.end.fill(enforcement);
    }

    /// Weight of the ‖λ‖² regularization at every knot (0 disables it)
    pub fn set_force_cost(&mut self, force_cost: f64) {
        self.force_cost = force_cost;
    }

    pub fn relative(&self) -> &[bool] {
        &self.relative
    }

    pub fn is_constraint_relative(&self, row: usize) -> bool {
        self.relative.get(row).copied().unwrap_or(false)
    }

    /// Number of relative rows, which is also the offset length
    pub fn num_relative(&self) -> usize {
        self.relative.iter().filter(|&&r| r).count()
    }

    pub fn start_type(&self) -> &[Enforcement] {
        &self.start
    }

    pub fn interior_type(&self) -> &[Enforcement] {
        &self.interior
    }

    pub fn end_type(&self) -> &[Enforcement] {
        &self.end
    }

    pub fn force_cost(&self) -> f64 {
        self.force_cost
    }
}

/// Serialized form of [`DirconOptions`], with one enforcement level per
/// knot class applied to every row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeOptionsConfig {
    /// Rows enforced relative to the mode offset
    pub relative_rows: Vec<usize>,
    pub start: Enforcement,
    pub interior: Enforcement,
    pub end: Enforcement,
    pub force_cost: f64,
}

impl ModeOptionsConfig {
    /// Expand into per-row options for a set with `num_constraints` rows
    pub fn to_options(&self, num_constraints: usize) -> Result<DirconOptions, ConfigurationError> {
        let mut options = DirconOptions::new(num_constraints);
        for &row in &self.relative_rows {
            options.set_constraint_relative(row, true)?;
        }
        options.set_all_start_type(self.start);
        options.set_all_interior_type(self.interior);
        options.set_all_end_type(self.end);
        options.set_force_cost(self.force_cost);
        Ok(options)
    }
}

/// One mode of the sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Knots in the mode, including both seam knots
    pub num_knots: usize,
    /// Lower timestep bound [s]
    pub min_timestep: f64,
    /// Upper timestep bound [s] (equal to the lower bound for a fixed step)
    pub max_timestep: f64,
    #[serde(default)]
    pub options: ModeOptionsConfig,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            num_knots: 10,
            min_timestep: 0.01,
            max_timestep: 0.3,
            options: ModeOptionsConfig::default(),
        }
    }
}

/// A complete mode sequence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub modes: Vec<ModeConfig>,
}

impl TranscriptionConfig {
    /// Parse from a TOML string and validate
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigurationError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check knot counts and timestep bounds of every mode
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.modes.is_empty() {
            return Err(ConfigurationError::EmptyModeSequence);
        }
        for (mode, config) in self.modes.iter().enumerate() {
            validate_knots(mode, config.num_knots)?;
            validate_timestep_bounds(mode, config.min_timestep, config.max_timestep)?;
        }
        Ok(())
    }

    pub fn num_knots(&self) -> Vec<usize> {
        self.modes.iter().map(|m| m.num_knots).collect()
    }

    pub fn min_timesteps(&self) -> Vec<f64> {
        self.modes.iter().map(|m| m.min_timestep).collect()
    }

    pub fn max_timesteps(&self) -> Vec<f64> {
        self.modes.iter().map(|m| m.max_timestep).collect()
    }
}

pub(crate) fn validate_knots(mode: usize, num_knots: usize) -> Result<(), ConfigurationError> {
    if num_knots < 2 {
        return Err(ConfigurationError::TooFewKnots { mode, num_knots });
    }
    Ok(())
}

/// Require 0 < min ≤ max with a finite lower bound
pub(crate) fn validate_timestep_bounds(mode: usize, min: f64, max: f64) -> Result<(), ConfigurationError> {
    // Written so NaN bounds also fail
    if !(min > 0.0 && min.is_finite() && max >= min) {
        return Err(ConfigurationError::InvalidTimestepBounds { mode, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_fully_enforced() {
        let options = DirconOptions::new(3);
        assert_eq!(options.num_relative(), 0);
        assert!(options.start_type().iter().all(|e| e.enforces_velocity()));
        assert_eq!(options.force_cost(), 0.0);
    }

    #[test]
    fn test_row_out_of_range() {
        let mut options = DirconOptions::new(2);
        assert!(matches!(
            options.set_constraint_relative(2, true),
            Err(ConfigurationError::RowOutOfRange { row: 2, num_constraints: 2 })
        ));
        options.set_constraint_relative(1, true).unwrap();
        assert_eq!(options.num_relative(), 1);
        assert!(options.is_constraint_relative(1));
    }

    #[test]
    fn test_parse_toml() {
        let config = TranscriptionConfig::from_toml_str(
            r#"
            [[modes]]
            num_knots = 6
            min_timestep = 0.02
            max_timestep = 0.02

            [modes.options]
            relative_rows = [0]
            start = "value_only"
            end = "omitted"
            force_cost = 0.001

            [[modes]]
            num_knots = 4
            min_timestep = 0.01
            max_timestep = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.num_knots(), vec![6, 4]);
        let stance = config.modes[0].options.to_options(2).unwrap();
        assert!(stance.is_constraint_relative(0));
        assert_eq!(stance.start_type()[1], Enforcement::ValueOnly);
        assert_eq!(stance.interior_type()[0], Enforcement::ValueAndVelocity);
        assert_eq!(stance.end_type()[0], Enforcement::Omitted);
        assert_eq!(config.modes[1].options, ModeOptionsConfig::default());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let inverted = TranscriptionConfig {
            modes: vec![ModeConfig {
                min_timestep: 0.5,
                max_timestep: 0.1,
                ..Default::default()
            }],
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigurationError::InvalidTimestepBounds { mode: 0, .. })
        ));

        let single_knot = TranscriptionConfig {
            modes: vec![ModeConfig {
                num_knots: 1,
                ..Default::default()
            }],
        };
        assert!(matches!(
            single_knot.validate(),
            Err(ConfigurationError::TooFewKnots { mode: 0, num_knots: 1 })
        ));

        assert!(matches!(
            TranscriptionConfig::default().validate(),
            Err(ConfigurationError::EmptyModeSequence)
        ));
    }

    #[test]
    fn test_nan_timestep_rejected() {
        assert!(validate_timestep_bounds(0, f64::NAN, 1.0).is_err());
        assert!(validate_timestep_bounds(0, 0.1, f64::NAN).is_err());
        assert!(validate_timestep_bounds(0, 0.1, f64::INFINITY).is_ok());
        assert!(validate_timestep_bounds(0, 0.0, 1.0).is_err());
    }
}
