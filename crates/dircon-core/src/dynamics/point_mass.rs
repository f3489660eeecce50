//! Planar point mass
//!
//! A fully actuated point mass moving in the world x-z plane under gravity:
//!
//! ```text
//! m·ẍ = u_x + λ_x
//! m·z̈ = u_z − m·g + λ_z
//! ```
//!
//! q = (x, z). The single body's frame is translated by q and never rotates,
//! which makes the model convenient for contact and stance constraints whose
//! forces have a closed-form answer.

use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};

use super::RigidBodyDynamics;
use crate::math::Scalar;
use crate::GRAVITY;

/// Point mass parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointMassParams {
    /// Mass [kg]
    pub mass: f64,
    /// Gravity acceleration [m/s²]
    pub gravity: f64,
}

impl Default for PointMassParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            gravity: GRAVITY,
        }
    }
}

/// Planar point mass dynamics model
#[derive(Debug, Clone, Default)]
pub struct PlanarPointMass {
    pub params: PointMassParams,
}

impl PlanarPointMass {
    pub fn new(params: PointMassParams) -> Self {
        Self { params }
    }

    /// Weight of the mass [N]
    pub fn weight(&self) -> f64 {
        self.params.mass * self.params.gravity
    }
}

impl RigidBodyDynamics for PlanarPointMass {
    fn num_positions(&self) -> usize {
        2
    }

    fn num_velocities(&self) -> usize {
        2
    }

    fn num_actuators(&self) -> usize {
        2
    }

    fn num_bodies(&self) -> usize {
        1
    }

    fn mass_matrix<S: Scalar>(&self, _q: &DVector<S>) -> DMatrix<S> {
        DMatrix::from_diagonal_element(2, 2, S::from_f64(self.params.mass))
    }

    fn bias_forces<S: Scalar>(&self, _q: &DVector<S>, _v: &DVector<S>) -> DVector<S> {
        DVector::from_vec(vec![S::zero(), S::from_f64(self.weight())])
    }

    fn actuator_map(&self) -> DMatrix<f64> {
        DMatrix::identity(2, 2)
    }

    fn point_position<S: Scalar>(&self, _body: usize, point: &Vector3<f64>, q: &DVector<S>) -> Vector3<S> {
        Vector3::new(
            q[0] + S::from_f64(point.x),
            S::from_f64(point.y),
            q[1] + S::from_f64(point.z),
        )
    }

    fn point_jacobian<S: Scalar>(&self, _body: usize, _point: &Vector3<f64>, _q: &DVector<S>) -> DMatrix<S> {
        let mut jac = DMatrix::zeros(3, 2);
        jac[(0, 0)] = S::one();
        jac[(2, 1)] = S::one();
        jac
    }

    fn point_jacobian_dot_times_v<S: Scalar>(
        &self,
        _body: usize,
        _point: &Vector3<f64>,
        _q: &DVector<S>,
        _v: &DVector<S>,
    ) -> Vector3<S> {
        Vector3::zeros()
    }
}
