//! Hermite-Simpson collocation of the constrained dynamics
//!
//! Couples two consecutive knots of a mode. With ẋ₀, ẋ₁ the constrained
//! state derivatives at the knots:
//!
//! ```text
//! x_c      = ½(x₀ + x₁) + h/8·(ẋ₀ − ẋ₁)
//! ẋ_c,int  = −3/(2h)·(x₀ − x₁) − ¼(ẋ₀ + ẋ₁)
//! u_c      = ½(u₀ + u₁)
//! ẋ_c,dyn  = f(x_c, u_c, λ_c) + [Jᵀ(q_c)·v_slack; 0]
//! residual = ẋ_c,dyn − ẋ_c,int = 0
//! ```
//!
//! The slack v_slack lets the midpoint position rate leave the constraint
//! manifold, since the cubic interpolant cannot follow it exactly.
//!
//! Input layout: `[h, x₀, x₁, u₀, u₁, λ₀, λ₁, λ_c, v_slack]`.

use std::sync::Arc;

use nalgebra::DVector;

use dircon_core::dynamics::RigidBodyDynamics;
use dircon_core::kinematics::KinematicConstraintSet;
use dircon_core::math::Scalar;
use dircon_core::EvaluationError;

use crate::program::GenericEvaluator;

/// Collocation defect between two knots (2·n_v rows)
pub struct DynamicsCollocationConstraint<D: RigidBodyDynamics> {
    constraints: Arc<KinematicConstraintSet<D>>,
    num_states: usize,
    num_inputs: usize,
    num_forces: usize,
}

impl<D: RigidBodyDynamics> DynamicsCollocationConstraint<D> {
    pub fn new(constraints: Arc<KinematicConstraintSet<D>>) -> Self {
        let num_states = constraints.num_states();
        let num_inputs = constraints.num_actuators();
        let num_forces = constraints.num_constraints();
        Self {
            constraints,
            num_states,
            num_inputs,
            num_forces,
        }
    }

    pub fn constraint_set(&self) -> &Arc<KinematicConstraintSet<D>> {
        &self.constraints
    }
}

impl<D: RigidBodyDynamics> GenericEvaluator for DynamicsCollocationConstraint<D> {
    fn input_size(&self) -> usize {
        1 + 2 * self.num_states + 2 * self.num_inputs + 4 * self.num_forces
    }

    fn output_size(&self) -> usize {
        self.num_states
    }

    fn eval_generic<S: Scalar>(&self, z: &DVector<S>) -> Result<DVector<S>, EvaluationError> {
        let (nx, nu, nc) = (self.num_states, self.num_inputs, self.num_forces);
        let nq = self.constraints.num_positions();

        let mut offset = 1;
        let mut take = |len: usize| {
            let block = z.rows(offset, len).into_owned();
            offset += len;
            block
        };
        let x0 = take(nx);
        let x1 = take(nx);
        let u0 = take(nu);
        let u1 = take(nu);
        let l0 = take(nc);
        let l1 = take(nc);
        let lc = take(nc);
        let vc = take(nc);
        let h = z[0];

        let xdot0 = self.constraints.evaluate(&x0, &u0, &l0)?.xdot;
        let xdot1 = self.constraints.evaluate(&x1, &u1, &l1)?.xdot;

        let half = S::from_f64(0.5);
        let xc = (&x0 + &x1) * half + (&xdot0 - &xdot1) * (h / S::from_f64(8.0));
        let xdotc_interp = (&x0 - &x1) * (S::from_f64(-1.5) / h) - (&xdot0 + &xdot1) * S::from_f64(0.25);
        let uc = (&u0 + &u1) * half;

        let midpoint = self.constraints.evaluate(&xc, &uc, &lc)?;
        let mut xdotc = midpoint.xdot;
        let slack_rate = midpoint.j.transpose() * &vc;
        for i in 0..nq {
            xdotc[i] += slack_rate[i];
        }

        Ok(xdotc - xdotc_interp)
    }
}
