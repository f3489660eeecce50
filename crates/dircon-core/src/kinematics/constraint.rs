//! Individual kinematic constraints
//!
//! A kinematic constraint is an algebraic, position-level condition
//! c(q) = 0 enforced through an associated force λ entering the dynamics as
//! Jᵀλ. Each constraint provides its value, Jacobian and J̇·v via the
//! dynamics oracle:
//!
//! ```text
//! c(q),   ċ = J(q)·v,   c̈ = J(q)·v̇ + J̇(q, v)·v
//! ```
//!
//! Contact-like constraints can also expose auxiliary force constraints
//! (unilateral normal force, linearized friction cone) that the transcription
//! applies to the matching block of λ at every knot.

use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};

use crate::dynamics::RigidBodyDynamics;
use crate::error::EvaluationError;
use crate::math::Scalar;

/// Contact force model attached to a position constraint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactModel {
    /// World axis along the contact normal (0 = x, 1 = y, 2 = z)
    pub normal_axis: usize,
    /// Coulomb friction coefficient μ
    pub friction: f64,
}

/// A point on a body held fixed along a subset of world axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    /// Body index in the dynamics model
    pub body: usize,
    /// Point in the body frame [m]
    pub point: Vector3<f64>,
    /// Constrained world axes, in row order
    pub axes: Vec<usize>,
    /// Optional contact force model
    pub contact: Option<ContactModel>,
}

impl PositionData {
    pub fn new(body: usize, point: Vector3<f64>, axes: Vec<usize>) -> Self {
        Self {
            body,
            point,
            axes,
            contact: None,
        }
    }

    /// Point constrained in the x-z plane (rows: x, z)
    pub fn planar(body: usize, point: Vector3<f64>) -> Self {
        Self::new(body, point, vec![0, 2])
    }

    /// Attach a contact model with the given normal axis and friction
    pub fn with_contact(mut self, normal_axis: usize, friction: f64) -> Self {
        self.contact = Some(ContactModel {
            normal_axis,
            friction,
        });
        self
    }
}

/// A single generalized coordinate held fixed, c = q_i
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointData {
    /// Index into q (and v)
    pub index: usize,
}

/// Linear inequality `lower ≤ A·λ_sub ≤ upper` on one constraint's force block
#[derive(Debug, Clone, PartialEq)]
pub struct ForceConstraint {
    /// Description for debugging
    pub name: String,
    /// Coefficient matrix (rows × block length)
    pub a: DMatrix<f64>,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl ForceConstraint {
    /// Evaluate A·λ_sub
    pub fn evaluate(&self, force: &DVector<f64>) -> DVector<f64> {
        &self.a * force
    }

    /// Whether the force block satisfies the bounds within `tol`
    pub fn is_satisfied(&self, force: &DVector<f64>, tol: f64) -> bool {
        let y = self.evaluate(force);
        (0..y.len()).all(|i| y[i] >= self.lower[i] - tol && y[i] <= self.upper[i] + tol)
    }
}

/// One kinematic constraint of a mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KinematicData {
    Position(PositionData),
    Joint(JointData),
}

impl KinematicData {
    /// Number of constraint rows
    pub fn len(&self) -> usize {
        match self {
            Self::Position(data) => data.axes.len(),
            Self::Joint(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check body/axis/coordinate indices against a model
    pub fn validate<D: RigidBodyDynamics>(&self, dynamics: &D) -> Result<(), EvaluationError> {
        match self {
            Self::Position(data) => {
                if data.body >= dynamics.num_bodies() {
                    return Err(EvaluationError::InvalidBody {
                        body: data.body,
                        num_bodies: dynamics.num_bodies(),
                    });
                }
                if let Some(&axis) = data.axes.iter().find(|&&axis| axis > 2) {
                    return Err(EvaluationError::DimensionMismatch {
                        context: "position constraint axis",
                        expected: 3,
                        got: axis,
                    });
                }
                Ok(())
            }
            Self::Joint(data) => {
                let limit = dynamics.num_positions().min(dynamics.num_velocities());
                if data.index >= limit {
                    return Err(EvaluationError::DimensionMismatch {
                        context: "joint constraint index",
                        expected: limit,
                        got: data.index,
                    });
                }
                Ok(())
            }
        }
    }

    /// Constraint value c(q)
    pub fn value<S: Scalar, D: RigidBodyDynamics>(&self, dynamics: &D, q: &DVector<S>) -> DVector<S> {
        match self {
            Self::Position(data) => {
                let p = dynamics.point_position(data.body, &data.point, q);
                DVector::from_iterator(data.axes.len(), data.axes.iter().map(|&axis| p[axis]))
            }
            Self::Joint(data) => DVector::from_element(1, q[data.index]),
        }
    }

    /// Constraint Jacobian J(q), rows × n_v
    pub fn jacobian<S: Scalar, D: RigidBodyDynamics>(&self, dynamics: &D, q: &DVector<S>) -> DMatrix<S> {
        let nv = dynamics.num_velocities();
        match self {
            Self::Position(data) => {
                let jac = dynamics.point_jacobian(data.body, &data.point, q);
                DMatrix::from_fn(data.axes.len(), nv, |i, j| jac[(data.axes[i], j)])
            }
            Self::Joint(data) => {
                let mut jac = DMatrix::zeros(1, nv);
                jac[(0, data.index)] = S::one();
                jac
            }
        }
    }

    /// J̇(q, v)·v
    pub fn jacobian_dot_times_v<S: Scalar, D: RigidBodyDynamics>(
        &self,
        dynamics: &D,
        q: &DVector<S>,
        v: &DVector<S>,
    ) -> DVector<S> {
        match self {
            Self::Position(data) => {
                let jdotv = dynamics.point_jacobian_dot_times_v(data.body, &data.point, q, v);
                DVector::from_iterator(data.axes.len(), data.axes.iter().map(|&axis| jdotv[axis]))
            }
            Self::Joint(_) => DVector::zeros(1),
        }
    }

    /// Auxiliary constraints on this constraint's force block
    ///
    /// A contact yields a unilateral normal-force bound λ_n ≥ 0 and, for each
    /// constrained tangential axis t, the linearized friction cone
    /// μλ_n − λ_t ≥ 0 and μλ_n + λ_t ≥ 0. A contact whose normal axis is not
    /// among the constrained axes contributes nothing.
    pub fn force_constraints(&self) -> Vec<ForceConstraint> {
        let Self::Position(data) = self else {
            return Vec::new();
        };
        let Some(contact) = data.contact else {
            return Vec::new();
        };
        let Some(normal) = data.axes.iter().position(|&axis| axis == contact.normal_axis) else {
            return Vec::new();
        };
        let len = data.axes.len();

        let mut unilateral = DMatrix::zeros(1, len);
        unilateral[(0, normal)] = 1.0;
        let mut constraints = vec![ForceConstraint {
            name: "normal_force".to_string(),
            a: unilateral,
            lower: DVector::zeros(1),
            upper: DVector::from_element(1, f64::INFINITY),
        }];

        let tangents: Vec<usize> = (0..len).filter(|&row| row != normal).collect();
        if !tangents.is_empty() {
            let rows = 2 * tangents.len();
            let mut cone = DMatrix::zeros(rows, len);
            for (k, &t) in tangents.iter().enumerate() {
                cone[(2 * k, normal)] = contact.friction;
                cone[(2 * k, t)] = -1.0;
                cone[(2 * k + 1, normal)] = contact.friction;
                cone[(2 * k + 1, t)] = 1.0;
            }
            constraints.push(ForceConstraint {
                name: "friction_cone".to_string(),
                a: cone,
                lower: DVector::zeros(rows),
                upper: DVector::from_element(rows, f64::INFINITY),
            });
        }
        constraints
    }
}

impl From<PositionData> for KinematicData {
    fn from(data: PositionData) -> Self {
        Self::Position(data)
    }
}

impl From<JointData> for KinematicData {
    fn from(data: JointData) -> Self {
        Self::Joint(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{Acrobot, PlanarPointMass};
    use approx::assert_relative_eq;

    #[test]
    fn test_planar_position_rows() {
        let model = PlanarPointMass::default();
        let data = KinematicData::from(PositionData::planar(0, Vector3::zeros()));
        let q = DVector::from_vec(vec![0.3, -0.1]);

        let c = data.value(&model, &q);
        assert_eq!(c.len(), 2);
        assert_relative_eq!(c[0], 0.3);
        assert_relative_eq!(c[1], -0.1);

        let jac = data.jacobian(&model, &q);
        assert_eq!(jac.shape(), (2, 2));
        assert_relative_eq!(jac[(0, 0)], 1.0);
        assert_relative_eq!(jac[(1, 1)], 1.0);
    }

    #[test]
    fn test_joint_constraint() {
        let model = Acrobot::default();
        let data = KinematicData::from(JointData { index: 1 });
        let q = DVector::from_vec(vec![0.2, 0.7]);
        assert_relative_eq!(data.value(&model, &q)[0], 0.7);
        let jac = data.jacobian(&model, &q);
        assert_relative_eq!(jac[(0, 0)], 0.0);
        assert_relative_eq!(jac[(0, 1)], 1.0);
    }

    #[test]
    fn test_invalid_body_rejected() {
        let model = PlanarPointMass::default();
        let data = KinematicData::from(PositionData::planar(3, Vector3::zeros()));
        assert_eq!(
            data.validate(&model),
            Err(EvaluationError::InvalidBody { body: 3, num_bodies: 1 })
        );
    }

    #[test]
    fn test_friction_cone_rows() {
        let data = KinematicData::from(PositionData::planar(0, Vector3::zeros()).with_contact(2, 0.5));
        let constraints = data.force_constraints();
        assert_eq!(constraints.len(), 2);

        // λ = (λ_x, λ_z): inside the cone
        let inside = DVector::from_vec(vec![1.0, 4.0]);
        assert!(constraints.iter().all(|c| c.is_satisfied(&inside, 0.0)));

        // Tangential force beyond μ·λ_n
        let slipping = DVector::from_vec(vec![3.0, 4.0]);
        assert!(!constraints[1].is_satisfied(&slipping, 1e-9));

        // Pulling on the ground
        let pulling = DVector::from_vec(vec![0.0, -1.0]);
        assert!(!constraints[0].is_satisfied(&pulling, 1e-9));
    }

    #[test]
    fn test_no_force_constraints_without_contact() {
        let data = KinematicData::from(PositionData::planar(0, Vector3::zeros()));
        assert!(data.force_constraints().is_empty());
        assert!(KinematicData::from(JointData { index: 0 }).force_constraints().is_empty());
    }
}
