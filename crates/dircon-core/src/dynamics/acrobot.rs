//! Acrobot dynamics
//!
//! Planar two-link arm hanging from a passive shoulder and actuated at the
//! elbow. Angles are measured from the downward vertical:
//!
//! - q₁: shoulder angle (link 1 relative to -z)
//! - q₂: elbow angle (link 2 relative to link 1)
//!
//! so q = (0, 0) hangs straight down and q = (π, 0) is the inverted
//! equilibrium. With I₁, I₂ the link inertias about their joints:
//!
//! ```text
//! M = [ I₁ + I₂ + m₂l₁² + 2m₂l₁l_c2·c₂    I₂ + m₂l₁l_c2·c₂ ]
//!     [ I₂ + m₂l₁l_c2·c₂                  I₂               ]
//!
//! bias = C(q, v)·v − τ_g(q) + b ⊙ v
//! ```
//!
//! Body frames: body 0 is link 1 (origin at the shoulder), body 1 is link 2
//! (origin at the elbow). Each link extends along its local -z axis and
//! rotates about the world y axis.

use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};

use super::RigidBodyDynamics;
use crate::math::Scalar;
use crate::GRAVITY;

/// Acrobot physical parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcrobotParams {
    /// Link 1 mass [kg]
    pub m1: f64,
    /// Link 2 mass [kg]
    pub m2: f64,
    /// Link 1 length [m]
    pub l1: f64,
    /// Link 2 length [m]
    pub l2: f64,
    /// Shoulder to link 1 center of mass [m]
    pub lc1: f64,
    /// Elbow to link 2 center of mass [m]
    pub lc2: f64,
    /// Link 1 inertia about its center of mass [kg·m²]
    pub ic1: f64,
    /// Link 2 inertia about its center of mass [kg·m²]
    pub ic2: f64,
    /// Shoulder damping [N·m·s]
    pub b1: f64,
    /// Elbow damping [N·m·s]
    pub b2: f64,
    /// Gravity acceleration [m/s²]
    pub gravity: f64,
}

impl Default for AcrobotParams {
    fn default() -> Self {
        Self {
            m1: 1.0,
            m2: 1.0,
            l1: 1.0,
            l2: 2.0,
            lc1: 0.5,
            lc2: 1.0,
            ic1: 0.083,
            ic2: 0.33,
            b1: 0.1,
            b2: 0.1,
            gravity: GRAVITY,
        }
    }
}

/// Acrobot dynamics model
#[derive(Debug, Clone, Default)]
pub struct Acrobot {
    pub params: AcrobotParams,
}

impl Acrobot {
    pub fn new(params: AcrobotParams) -> Self {
        Self { params }
    }

    /// Position of the link 2 tip in the x-z plane
    pub fn tip_position(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, -self.params.l2)
    }

    /// Body-frame point rotated by the absolute link angle φ
    fn rotate<S: Scalar>(phi: S, point: &Vector3<f64>) -> Vector3<S> {
        let (s, c) = (phi.sin(), phi.cos());
        let px = S::from_f64(point.x);
        let pz = S::from_f64(point.z);
        Vector3::new(c * px - s * pz, S::from_f64(point.y), s * px + c * pz)
    }

    /// ∂/∂φ of [`Self::rotate`]
    fn rotate_dphi<S: Scalar>(phi: S, point: &Vector3<f64>) -> Vector3<S> {
        let (s, c) = (phi.sin(), phi.cos());
        let px = S::from_f64(point.x);
        let pz = S::from_f64(point.z);
        Vector3::new(-s * px - c * pz, S::zero(), c * px - s * pz)
    }

    /// Absolute angle of a body
    fn body_angle<S: Scalar>(body: usize, q: &DVector<S>) -> S {
        if body == 0 {
            q[0]
        } else {
            q[0] + q[1]
        }
    }
}

impl RigidBodyDynamics for Acrobot {
    fn num_positions(&self) -> usize {
        2
    }

    fn num_velocities(&self) -> usize {
        2
    }

    fn num_actuators(&self) -> usize {
        1
    }

    fn num_bodies(&self) -> usize {
        2
    }

    fn mass_matrix<S: Scalar>(&self, q: &DVector<S>) -> DMatrix<S> {
        let p = &self.params;
        let i1 = p.ic1 + p.m1 * p.lc1 * p.lc1;
        let i2 = p.ic2 + p.m2 * p.lc2 * p.lc2;
        let m2l1lc2 = S::from_f64(p.m2 * p.l1 * p.lc2);
        let c2 = q[1].cos();

        let m12 = S::from_f64(i2) + m2l1lc2 * c2;
        let m11 = S::from_f64(i1 + i2 + p.m2 * p.l1 * p.l1) + S::from_f64(2.0) * m2l1lc2 * c2;
        DMatrix::from_row_slice(2, 2, &[m11, m12, m12, S::from_f64(i2)])
    }

    fn bias_forces<S: Scalar>(&self, q: &DVector<S>, v: &DVector<S>) -> DVector<S> {
        let p = &self.params;
        let m2l1lc2 = S::from_f64(p.m2 * p.l1 * p.lc2);
        let g = S::from_f64(p.gravity);
        let s1 = q[0].sin();
        let s2 = q[1].sin();
        let s12 = (q[0] + q[1]).sin();
        let (v1, v2) = (v[0], v[1]);

        // Coriolis and centrifugal terms C(q, v)·v
        let coriolis1 = -S::from_f64(2.0) * m2l1lc2 * s2 * v2 * v1 - m2l1lc2 * s2 * v2 * v2;
        let coriolis2 = m2l1lc2 * s2 * v1 * v1;

        // Gravity torques τ_g(q)
        let tau_g1 = -g * S::from_f64(p.m1 * p.lc1) * s1
            - g * S::from_f64(p.m2) * (S::from_f64(p.l1) * s1 + S::from_f64(p.lc2) * s12);
        let tau_g2 = -g * S::from_f64(p.m2 * p.lc2) * s12;

        DVector::from_vec(vec![
            coriolis1 - tau_g1 + S::from_f64(p.b1) * v1,
            coriolis2 - tau_g2 + S::from_f64(p.b2) * v2,
        ])
    }

    fn actuator_map(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(2, 1, &[0.0, 1.0])
    }

    fn point_position<S: Scalar>(&self, body: usize, point: &Vector3<f64>, q: &DVector<S>) -> Vector3<S> {
        let local = Self::rotate(Self::body_angle(body, q), point);
        if body == 0 {
            local
        } else {
            let elbow = Self::rotate(q[0], &Vector3::new(0.0, 0.0, -self.params.l1));
            elbow + local
        }
    }

    fn point_jacobian<S: Scalar>(&self, body: usize, point: &Vector3<f64>, q: &DVector<S>) -> DMatrix<S> {
        let d_local = Self::rotate_dphi(Self::body_angle(body, q), point);
        let mut jac = DMatrix::zeros(3, 2);
        if body == 0 {
            jac.set_column(0, &d_local);
        } else {
            let d_elbow = Self::rotate_dphi(q[0], &Vector3::new(0.0, 0.0, -self.params.l1));
            jac.set_column(0, &(d_elbow + d_local));
            jac.set_column(1, &d_local);
        }
        jac
    }

    fn point_jacobian_dot_times_v<S: Scalar>(
        &self,
        body: usize,
        point: &Vector3<f64>,
        q: &DVector<S>,
        v: &DVector<S>,
    ) -> Vector3<S> {
        // For a planar rotation the second derivative of R(φ)p is -R(φ)p
        // restricted to the x-z plane, scaled by φ̇².
        let in_plane = |r: Vector3<S>| Vector3::new(r.x, S::zero(), r.z);
        let phi_dot = if body == 0 { v[0] } else { v[0] + v[1] };
        let local = in_plane(Self::rotate(Self::body_angle(body, q), point));
        let mut jdotv = -(local * (phi_dot * phi_dot));
        if body != 0 {
            let elbow = in_plane(Self::rotate(q[0], &Vector3::new(0.0, 0.0, -self.params.l1)));
            jdotv -= elbow * (v[0] * v[0]);
        }
        jdotv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{jacobian, Dual};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn dvec(values: &[f64]) -> DVector<f64> {
        DVector::from_row_slice(values)
    }

    #[test]
    fn test_hanging_is_equilibrium() {
        let acrobot = Acrobot::default();
        let bias = acrobot.bias_forces(&dvec(&[0.0, 0.0]), &dvec(&[0.0, 0.0]));
        assert_relative_eq!(bias[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(bias[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverted_is_equilibrium() {
        let acrobot = Acrobot::default();
        let bias = acrobot.bias_forces(&dvec(&[PI, 0.0]), &dvec(&[0.0, 0.0]));
        assert_relative_eq!(bias[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(bias[1], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_gravity_restores_toward_hanging() {
        let acrobot = Acrobot::default();
        // Positive shoulder angle: gravity torque is negative, so bias is positive
        let bias = acrobot.bias_forces(&dvec(&[0.2, 0.0]), &dvec(&[0.0, 0.0]));
        assert!(bias[0] > 0.0);
    }

    #[test]
    fn test_mass_matrix_symmetric_positive() {
        let acrobot = Acrobot::default();
        let m = acrobot.mass_matrix(&dvec(&[0.3, 1.1]));
        assert_relative_eq!(m[(0, 1)], m[(1, 0)]);
        assert!(m[(0, 0)] > 0.0);
        assert!(m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)] > 0.0);
    }

    #[test]
    fn test_tip_position_hanging() {
        let acrobot = Acrobot::default();
        let tip = acrobot.point_position(1, &acrobot.tip_position(), &dvec(&[0.0, 0.0]));
        assert_relative_eq!(tip.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(tip.z, -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_jacobian_matches_autodiff() {
        let acrobot = Acrobot::default();
        let point = Vector3::new(0.1, 0.0, -1.5);
        let q = dvec(&[0.4, -0.7]);

        let (_, expected) = jacobian(&q, |qd: &DVector<Dual>| -> Result<_, ()> {
            let p = acrobot.point_position(1, &point, qd);
            Ok(DVector::from_vec(vec![p.x, p.y, p.z]))
        })
        .unwrap();
        let jac = acrobot.point_jacobian(1, &point, &q);

        for i in 0..3 {
            for j in 0..2 {
                assert_relative_eq!(jac[(i, j)], expected[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_jacobian_dot_times_v_matches_autodiff() {
        // J̇v = d/dq (J(q) v) · v, with v held constant
        let acrobot = Acrobot::default();
        let point = Vector3::new(0.0, 0.0, -2.0);
        let q = dvec(&[0.4, -0.7]);
        let v = dvec(&[1.3, -0.4]);
        let v_dual = v.map(Dual::constant);

        let (_, d_jv) = jacobian(&q, |qd: &DVector<Dual>| -> Result<_, ()> {
            Ok(acrobot.point_jacobian(1, &point, qd) * &v_dual)
        })
        .unwrap();
        let expected = d_jv * &v;
        let jdotv = acrobot.point_jacobian_dot_times_v(1, &point, &q, &v);

        assert_relative_eq!(jdotv.x, expected[0], epsilon = 1e-10);
        assert_relative_eq!(jdotv.y, expected[1], epsilon = 1e-10);
        assert_relative_eq!(jdotv.z, expected[2], epsilon = 1e-10);
    }
}
