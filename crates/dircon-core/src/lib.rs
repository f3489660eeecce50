//! # DIRCON Core
//!
//! Constrained rigid-body dynamics for hybrid trajectory optimization
//!
//! This library provides everything the transcription needs to evaluate a
//! rigid-body system subject to kinematic constraints, generic over a numeric
//! [`math::Scalar`] so every evaluation can also carry exact derivatives.
//!
//! ## Modules
//!
//! - [`math`]: Scalar/dual numbers, dense LU, piecewise polynomials, integrators
//! - [`dynamics`]: Dynamics oracle trait and closed-form models (acrobot, point mass)
//! - [`kinematics`]: Kinematic constraints and per-mode constraint sets
//! - [`error`]: Evaluation errors

pub mod dynamics;
pub mod error;
pub mod kinematics;
pub mod math;

pub use error::EvaluationError;

/// Gravity constant [m/s²]
pub const GRAVITY: f64 = 9.81;
