//! Kinematic constraint sets
//!
//! A [`KinematicConstraintSet`] stacks the individual constraints active in
//! one mode and, given a state, input and constraint force, returns the full
//! constrained evaluation in one pass:
//!
//! ```text
//! v̇ = M⁻¹(q)·(B·u − bias(q, v) + Jᵀ(q)·λ)
//! ẋ = [v; v̇]
//! c̈ = J·v̇ + J̇·v
//! ```
//!
//! Evaluation is a pure function of its arguments. The set holds no mutable
//! state, so one set can be shared by every constraint of a transcription.

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use super::constraint::{ForceConstraint, KinematicData};
use crate::dynamics::RigidBodyDynamics;
use crate::error::EvaluationError;
use crate::math::{lift_matrix, lu_solve, Scalar};

/// Result of evaluating a constraint set at (x, u, λ)
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicEvaluation<S: Scalar> {
    /// Stacked constraint values c(q)
    pub c: DVector<S>,
    /// ċ = J·v
    pub cdot: DVector<S>,
    /// c̈ = J·v̇ + J̇·v
    pub cddot: DVector<S>,
    /// Stacked Jacobian, n_c × n_v
    pub j: DMatrix<S>,
    /// Stacked J̇·v
    pub jdotv: DVector<S>,
    /// Generalized acceleration
    pub vdot: DVector<S>,
    /// State derivative [v; v̇]
    pub xdot: DVector<S>,
}

/// Auxiliary force constraint bound to a block of the set's λ vector
#[derive(Debug, Clone, PartialEq)]
pub struct ForceConstraintBinding {
    /// First row of the block within λ
    pub offset: usize,
    /// Block length
    pub length: usize,
    pub constraint: ForceConstraint,
}

/// The kinematic constraints active in one mode
pub struct KinematicConstraintSet<D: RigidBodyDynamics> {
    dynamics: Arc<D>,
    constraints: Vec<KinematicData>,
    num_constraints: usize,
}

impl<D: RigidBodyDynamics> Clone for KinematicConstraintSet<D> {
    fn clone(&self) -> Self {
        Self {
            dynamics: Arc::clone(&self.dynamics),
            constraints: self.constraints.clone(),
            num_constraints: self.num_constraints,
        }
    }
}

impl<D: RigidBodyDynamics> fmt::Debug for KinematicConstraintSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinematicConstraintSet")
            .field("constraints", &self.constraints)
            .field("num_constraints", &self.num_constraints)
            .finish()
    }
}

impl<D: RigidBodyDynamics> KinematicConstraintSet<D> {
    /// Create a set, validating every constraint against the model
    pub fn new(dynamics: Arc<D>, constraints: Vec<KinematicData>) -> Result<Self, EvaluationError> {
        for constraint in &constraints {
            constraint.validate(dynamics.as_ref())?;
        }
        let num_constraints = constraints.iter().map(KinematicData::len).sum();
        Ok(Self {
            dynamics,
            constraints,
            num_constraints,
        })
    }

    /// A set with no constraints (free dynamics, n_c = 0)
    pub fn unconstrained(dynamics: Arc<D>) -> Self {
        Self {
            dynamics,
            constraints: Vec::new(),
            num_constraints: 0,
        }
    }

    pub fn dynamics(&self) -> &Arc<D> {
        &self.dynamics
    }

    pub fn constraints(&self) -> &[KinematicData] {
        &self.constraints
    }

    /// Total constraint rows n_c
    pub fn num_constraints(&self) -> usize {
        self.num_constraints
    }

    pub fn num_positions(&self) -> usize {
        self.dynamics.num_positions()
    }

    pub fn num_velocities(&self) -> usize {
        self.dynamics.num_velocities()
    }

    pub fn num_states(&self) -> usize {
        self.dynamics.num_states()
    }

    pub fn num_actuators(&self) -> usize {
        self.dynamics.num_actuators()
    }

    /// Stacked c(q)
    pub fn value<S: Scalar>(&self, q: &DVector<S>) -> DVector<S> {
        let mut c = DVector::zeros(self.num_constraints);
        let mut row = 0;
        for constraint in &self.constraints {
            let block = constraint.value(self.dynamics.as_ref(), q);
            for i in 0..block.len() {
                c[row + i] = block[i];
            }
            row += block.len();
        }
        c
    }

    /// Stacked J(q), n_c × n_v
    pub fn jacobian<S: Scalar>(&self, q: &DVector<S>) -> DMatrix<S> {
        let nv = self.num_velocities();
        let mut jac = DMatrix::zeros(self.num_constraints, nv);
        let mut row = 0;
        for constraint in &self.constraints {
            let block = constraint.jacobian(self.dynamics.as_ref(), q);
            for i in 0..block.nrows() {
                for k in 0..nv {
                    jac[(row + i, k)] = block[(i, k)];
                }
            }
            row += block.nrows();
        }
        jac
    }

    /// Stacked J̇(q, v)·v
    pub fn jacobian_dot_times_v<S: Scalar>(&self, q: &DVector<S>, v: &DVector<S>) -> DVector<S> {
        let mut jdotv = DVector::zeros(self.num_constraints);
        let mut row = 0;
        for constraint in &self.constraints {
            let block = constraint.jacobian_dot_times_v(self.dynamics.as_ref(), q, v);
            for i in 0..block.len() {
                jdotv[row + i] = block[i];
            }
            row += block.len();
        }
        jdotv
    }

    /// Evaluate the constrained dynamics and constraint derivatives.
    ///
    /// `lambda` is the constraint force (length n_c), treated as given.
    pub fn evaluate<S: Scalar>(
        &self,
        x: &DVector<S>,
        u: &DVector<S>,
        lambda: &DVector<S>,
    ) -> Result<KinematicEvaluation<S>, EvaluationError> {
        let (q, v) = self.split_state(x)?;
        EvaluationError::check_len("input", self.num_actuators(), u.len())?;
        EvaluationError::check_len("constraint force", self.num_constraints, lambda.len())?;

        let model = self.dynamics.as_ref();
        let c = self.value(&q);
        let j = self.jacobian(&q);
        let jdotv = self.jacobian_dot_times_v(&q, &v);

        let mass = model.mass_matrix(&q);
        let b: DMatrix<S> = lift_matrix(&model.actuator_map());
        let generalized_force = &b * u - model.bias_forces(&q, &v) + j.transpose() * lambda;
        let vdot = lu_solve(&mass, &generalized_force)?;

        let cdot = &j * &v;
        let cddot = &j * &vdot + &jdotv;
        let xdot = stack(&v, &vdot);

        Ok(KinematicEvaluation {
            c,
            cdot,
            cddot,
            j,
            jdotv,
            vdot,
            xdot,
        })
    }

    /// Solve for the acceleration and constraint force that keep c̈ = 0.
    ///
    /// ```text
    /// ┌ M  −Jᵀ ┐ ┌ v̇ ┐   ┌ B·u − bias ┐
    /// └ J   0  ┘ └ λ ┘ = └   −J̇·v     ┘
    /// ```
    ///
    /// Returns `(v̇, λ)`. Fails with [`EvaluationError::Singular`] when the
    /// constraints are redundant.
    pub fn solve_dynamics<S: Scalar>(
        &self,
        x: &DVector<S>,
        u: &DVector<S>,
    ) -> Result<(DVector<S>, DVector<S>), EvaluationError> {
        let (q, v) = self.split_state(x)?;
        EvaluationError::check_len("input", self.num_actuators(), u.len())?;

        let model = self.dynamics.as_ref();
        let nv = self.num_velocities();
        let nc = self.num_constraints;
        let n = nv + nc;

        let mass = model.mass_matrix(&q);
        let j = self.jacobian(&q);
        let jdotv = self.jacobian_dot_times_v(&q, &v);
        let b: DMatrix<S> = lift_matrix(&model.actuator_map());
        let rhs_dyn = &b * u - model.bias_forces(&q, &v);

        let mut kkt = DMatrix::zeros(n, n);
        let mut rhs = DVector::zeros(n);
        for r in 0..nv {
            for k in 0..nv {
                kkt[(r, k)] = mass[(r, k)];
            }
            for i in 0..nc {
                kkt[(r, nv + i)] = -j[(i, r)];
            }
            rhs[r] = rhs_dyn[r];
        }
        for i in 0..nc {
            for k in 0..nv {
                kkt[(nv + i, k)] = j[(i, k)];
            }
            rhs[nv + i] = -jdotv[i];
        }

        let sol = lu_solve(&kkt, &rhs)?;
        let vdot = sol.rows(0, nv).into_owned();
        let lambda = sol.rows(nv, nc).into_owned();
        Ok((vdot, lambda))
    }

    /// Auxiliary force constraints with their λ blocks
    pub fn force_constraints(&self) -> Vec<ForceConstraintBinding> {
        let mut bindings = Vec::new();
        let mut offset = 0;
        for constraint in &self.constraints {
            let length = constraint.len();
            for force_constraint in constraint.force_constraints() {
                bindings.push(ForceConstraintBinding {
                    offset,
                    length,
                    constraint: force_constraint,
                });
            }
            offset += length;
        }
        bindings
    }

    fn split_state<S: Scalar>(&self, x: &DVector<S>) -> Result<(DVector<S>, DVector<S>), EvaluationError> {
        let nq = self.num_positions();
        let nv = self.num_velocities();
        EvaluationError::check_len("state", nq + nv, x.len())?;
        Ok((x.rows(0, nq).into_owned(), x.rows(nq, nv).into_owned()))
    }
}

fn stack<S: Scalar>(a: &DVector<S>, b: &DVector<S>) -> DVector<S> {
    DVector::from_iterator(a.len() + b.len(), a.iter().chain(b.iter()).copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{Acrobot, PlanarPointMass};
    use crate::kinematics::{JointData, PositionData};
    use crate::math::{discard_gradient, jacobian, lift, Dual};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn foot_set() -> KinematicConstraintSet<PlanarPointMass> {
        let model = Arc::new(PlanarPointMass::default());
        let foot = PositionData::planar(0, Vector3::zeros()).with_contact(2, 0.8);
        KinematicConstraintSet::new(model, vec![foot.into()]).unwrap()
    }

    #[test]
    fn test_standing_mass_supports_weight() {
        let set = foot_set();
        let x = DVector::from_vec(vec![0.0, 0.0, 0.0, 0.0]);
        let u = DVector::zeros(2);

        let (vdot, lambda) = set.solve_dynamics(&x, &u).unwrap();
        assert_relative_eq!(vdot[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(vdot[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(lambda[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(lambda[1], 9.81, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate_with_kkt_force_has_zero_cddot() {
        let set = foot_set();
        let x = DVector::from_vec(vec![0.2, 0.1, 0.0, 0.0]);
        let u = DVector::from_vec(vec![1.0, 3.0]);
        let (_, lambda) = set.solve_dynamics(&x, &u).unwrap();

        let eval = set.evaluate(&x, &u, &lambda).unwrap();
        assert_relative_eq!(eval.cddot.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(eval.c[0], 0.2);
        assert_relative_eq!(eval.c[1], 0.1);
        assert_eq!(eval.xdot.len(), 4);
    }

    #[test]
    fn test_free_fall_without_force() {
        let set = foot_set();
        let x = DVector::from_vec(vec![0.0, 1.0, 0.5, 0.0]);
        let u = DVector::zeros(2);
        let lambda = DVector::zeros(2);

        let eval = set.evaluate(&x, &u, &lambda).unwrap();
        assert_relative_eq!(eval.xdot[0], 0.5);
        assert_relative_eq!(eval.xdot[3], -9.81, epsilon = 1e-12);
        assert_relative_eq!(eval.cdot[0], 0.5);
        assert_relative_eq!(eval.cddot[1], -9.81, epsilon = 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let set = foot_set();
        let x = DVector::<f64>::zeros(3);
        let u = DVector::zeros(2);
        let lambda = DVector::zeros(2);
        assert!(matches!(
            set.evaluate(&x, &u, &lambda),
            Err(EvaluationError::DimensionMismatch { context: "state", .. })
        ));
    }

    #[test]
    fn test_redundant_constraints_are_singular() {
        let model = Arc::new(Acrobot::default());
        let constraints = vec![JointData { index: 0 }.into(), JointData { index: 0 }.into()];
        let set = KinematicConstraintSet::new(model, constraints).unwrap();
        let x = DVector::<f64>::zeros(4);
        let u = DVector::zeros(1);
        assert!(matches!(
            set.solve_dynamics(&x, &u),
            Err(EvaluationError::Singular { .. })
        ));
    }

    #[test]
    fn test_pinned_elbow_evaluate_derivatives() {
        let model = Arc::new(Acrobot::default());
        let set = KinematicConstraintSet::new(model, vec![JointData { index: 1 }.into()]).unwrap();

        // Stack (x, u, λ) into one argument and differentiate ẋ with duals
        let z = DVector::from_vec(vec![0.3, -0.2, 0.4, 0.1, 0.5, 0.2]);
        let f = |z: &DVector<Dual>| -> Result<DVector<Dual>, EvaluationError> {
            let x = z.rows(0, 4).into_owned();
            let u = z.rows(4, 1).into_owned();
            let lambda = z.rows(5, 1).into_owned();
            Ok(set.evaluate(&x, &u, &lambda)?.xdot)
        };
        let (value, jac) = jacobian(&z, &f).unwrap();

        let h = 1e-6;
        for k in 0..z.len() {
            let mut zp = z.clone();
            let mut zm = z.clone();
            zp[k] += h;
            zm[k] -= h;
            let fp = discard_gradient(&f(&lift(&zp)).unwrap());
            let fm = discard_gradient(&f(&lift(&zm)).unwrap());
            for i in 0..value.len() {
                assert_relative_eq!(jac[(i, k)], (fp[i] - fm[i]) / (2.0 * h), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_force_constraint_offsets() {
        let model = Arc::new(PlanarPointMass::default());
        let constraints = vec![
            PositionData::new(0, Vector3::zeros(), vec![0]).into(),
            PositionData::planar(0, Vector3::zeros()).with_contact(2, 0.5).into(),
        ];
        let set = KinematicConstraintSet::new(model, constraints).unwrap();
        assert_eq!(set.num_constraints(), 3);

        let bindings = set.force_constraints();
        assert_eq!(bindings.len(), 2);
        assert!(bindings.iter().all(|b| b.offset == 1 && b.length == 2));
    }
}
