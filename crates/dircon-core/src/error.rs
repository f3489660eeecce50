//! Evaluation errors
//!
//! Raised while evaluating dynamics or constraints. All of them indicate
//! incorrect wiring or an ill-posed operating point, never a transient
//! condition, so callers propagate them rather than retry.

use thiserror::Error;

/// Errors raised by dynamics and constraint evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Singular {size}x{size} system (no pivot in column {column})")]
    Singular { size: usize, column: usize },
    #[error("Body index {body} out of range (model has {num_bodies} bodies)")]
    InvalidBody { body: usize, num_bodies: usize },
}

impl EvaluationError {
    /// Check a vector length, producing `DimensionMismatch` on failure
    pub fn check_len(context: &'static str, expected: usize, got: usize) -> Result<(), Self> {
        if expected == got {
            Ok(())
        } else {
            Err(Self::DimensionMismatch {
                context,
                expected,
                got,
            })
        }
    }
}
