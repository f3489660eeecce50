//! Mathematical utilities for hybrid direct collocation
//!
//! Implements the scalar abstraction with forward-mode dual numbers,
//! dense linear solves generic over that scalar, piecewise polynomial
//! trajectories, and numerical integrators.

pub mod scalar;
pub mod linalg;
pub mod polynomial;
pub mod integrator;

pub use scalar::*;
pub use linalg::*;
pub use polynomial::*;
pub use integrator::*;
