//! NLP solver interface
//!
//! The transcription only formulates the nonlinear program; the numerical
//! solve is delegated to an implementation of [`NlpSolver`]. A solver reads
//! variables, bounds, constraints, costs and the initial guess from the
//! [`MathematicalProgram`] and returns a [`SolverResult`].
//!
//! A solver that cannot run at all returns a [`SolverError`]. A solver that
//! ran reports a [`SolutionStatus`]; non-success statuses are recorded on the
//! program and surfaced to the caller, never retried.

use nalgebra::DVector;
use thiserror::Error;

use dircon_core::EvaluationError;

use crate::program::MathematicalProgram;

/// Solver errors
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),
    #[error("Solver returned {got} variables, program has {expected}")]
    InvalidSolutionDimension { expected: usize, got: usize },
    #[error("Solver failed: {0}")]
    SolveFailed(String),
    #[error("Evaluation failed during solve: {0}")]
    Evaluation(#[from] EvaluationError),
}

/// Outcome reported by a solver that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Locally optimal point found within tolerance
    Success,
    /// Iteration or time limit reached
    IterationLimit,
    /// Constraints could not be satisfied
    Infeasible,
    /// Cost unbounded below
    Unbounded,
    /// NaN/Inf or line-search failure
    NumericalFailure,
    Unknown,
}

impl SolutionStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Solution statistics from a solver
#[derive(Debug, Clone, Default)]
pub struct SolveStatistics {
    /// Major iterations
    pub iterations: usize,
    /// Wall time [ms]
    pub solve_time_ms: f64,
    /// Maximum constraint violation at the returned point
    pub constraint_violation: f64,
}

/// What a solver returns
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// Values of every decision variable
    pub x: DVector<f64>,
    pub status: SolutionStatus,
    /// Cost at `x`
    pub cost: f64,
    pub statistics: SolveStatistics,
}

/// External nonlinear program solver
pub trait NlpSolver {
    /// Human-readable solver name, used in logs
    fn name(&self) -> &str;

    /// Solve `program` starting from its initial guess
    fn solve(&self, program: &MathematicalProgram) -> Result<SolverResult, SolverError>;
}
