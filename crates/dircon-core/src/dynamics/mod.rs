//! Rigid-body dynamics oracles
//!
//! The transcription consumes the manipulator equation
//!
//! ```text
//! M(q)·v̇ + bias(q, v) = B·u + Jᵀ(q)·λ
//! ```
//!
//! through the [`RigidBodyDynamics`] trait, together with point kinematics
//! (position, Jacobian, J̇·v) for building kinematic constraints. Every
//! numeric method is generic over [`Scalar`], so the same model serves plain
//! evaluation and exact derivative propagation.
//!
//! Two closed-form models are provided:
//! - [`Acrobot`]: planar two-link arm actuated at the elbow
//! - [`PlanarPointMass`]: fully actuated point mass in the x-z plane

pub mod acrobot;
pub mod point_mass;

pub use acrobot::*;
pub use point_mass::*;

use nalgebra::{DMatrix, DVector, Vector3};

use crate::math::Scalar;

/// Dynamics oracle for a rigid-body system.
///
/// Implementations are read-only and shared between every constraint that
/// references them.
pub trait RigidBodyDynamics: Send + Sync {
    /// Number of generalized positions (n_q)
    fn num_positions(&self) -> usize;

    /// Number of generalized velocities (n_v)
    fn num_velocities(&self) -> usize;

    /// Number of actuators (n_u)
    fn num_actuators(&self) -> usize;

    /// Number of bodies addressable by the point-kinematics methods
    fn num_bodies(&self) -> usize;

    /// Combined state dimension n_x = n_q + n_v
    fn num_states(&self) -> usize {
        self.num_positions() + self.num_velocities()
    }

    /// Mass matrix M(q), n_v × n_v
    fn mass_matrix<S: Scalar>(&self, q: &DVector<S>) -> DMatrix<S>;

    /// Bias forces C(q, v)·v − τ_g(q) (Coriolis, gravity, damping), length n_v
    fn bias_forces<S: Scalar>(&self, q: &DVector<S>, v: &DVector<S>) -> DVector<S>;

    /// Actuator selection matrix B, n_v × n_u
    fn actuator_map(&self) -> DMatrix<f64>;

    /// World position of `point` (body frame) on `body`
    fn point_position<S: Scalar>(&self, body: usize, point: &Vector3<f64>, q: &DVector<S>) -> Vector3<S>;

    /// Jacobian of [`Self::point_position`] with respect to v, 3 × n_v
    fn point_jacobian<S: Scalar>(&self, body: usize, point: &Vector3<f64>, q: &DVector<S>) -> DMatrix<S>;

    /// J̇(q, v)·v for the same point
    fn point_jacobian_dot_times_v<S: Scalar>(
        &self,
        body: usize,
        point: &Vector3<f64>,
        q: &DVector<S>,
        v: &DVector<S>,
    ) -> Vector3<S>;
}
