//! Kinematic constraints
//!
//! Individual position-level constraints ([`KinematicData`]) and the
//! per-mode set that stacks them and evaluates the constrained dynamics
//! ([`KinematicConstraintSet`]).

mod constraint;
mod set;

pub use constraint::*;
pub use set::*;
