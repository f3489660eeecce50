//! DIRCON Planner
//!
//! Hybrid direct collocation (DIRCON) transcription of multi-mode
//! trajectory optimization problems with kinematic constraints.
//!
//! # Architecture
//!
//! A fixed mode sequence is transcribed into one nonlinear program:
//!
//! ```text
//! minimize    Σ_k g(x_k, u_k)·(h_{k−1} + h_k)/2 + Σ_i w_i·Σ_j ‖λ_ij‖²
//! subject to  ẋ_c(x_c, u_c, λ_c) + Jᵀ·γ_c = ẋ_c,interp   (Hermite-Simpson)
//!             c(q_k) − offset = 0, ċ = 0, c̈ = 0          (per enforcement)
//!             λ_n ≥ 0, |λ_t| ≤ μ·λ_n                     (contact forces)
//!             h_min ≤ h_k ≤ h_max, equal within a mode
//! ```
//!
//! Consecutive modes share their seam knot; the later mode sees it with a
//! free post-impact velocity.
//!
//! # Components
//!
//! - [`config`]: per-mode options, enforcement levels and TOML configuration
//! - [`program`]: decision variables, evaluators and the program container
//! - [`solver`]: external NLP solver interface
//! - [`collocation`]: Hermite-Simpson dynamics defect
//! - [`constraints`]: knot kinematic constraints and cost terms
//! - [`transcription`]: the multi-mode [`HybridDircon`] builder
//! - [`trajectory`]: trajectories reconstructed from a solution
//! - [`scenarios`]: ready-built acrobot and point-mass problems

pub mod config;
pub mod program;
pub mod solver;
pub mod collocation;
pub mod constraints;
pub mod transcription;
pub mod trajectory;
pub mod scenarios;

// Re-exports
pub use config::{ConfigurationError, DirconOptions, Enforcement, TranscriptionConfig};
pub use program::{DecisionVariables, Evaluator, GenericEvaluator, MathematicalProgram, ProgramError};
pub use solver::{NlpSolver, SolutionStatus, SolverError, SolverResult};
pub use trajectory::ReconstructedTrajectory;
pub use transcription::{HybridDircon, TranscriptionError};
