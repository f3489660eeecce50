//! Canned problem scenarios
//!
//! Ready-built transcriptions for the two reference models:
//!
//! - [`AcrobotSwingUp`]: single unconstrained mode, swing from hanging to
//!   inverted with bounded elbow torque and a quadratic input cost
//! - [`PointMassHop`]: stance mode with a relative foot contact followed by
//!   a flight mode, joined through a post-impact velocity

use std::f64::consts::PI;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};

use dircon_core::dynamics::{Acrobot, AcrobotParams, PlanarPointMass, PointMassParams};
use dircon_core::kinematics::{KinematicConstraintSet, PositionData};
use dircon_core::math::PiecewisePolynomial;

use crate::config::{DirconOptions, Enforcement};
use crate::constraints::QuadraticCost;
use crate::transcription::{HybridDircon, TranscriptionError};

/// Acrobot swing-up problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcrobotSwingUp {
    pub params: AcrobotParams,
    pub num_knots: usize,
    pub min_timestep: f64,
    pub max_timestep: f64,
    /// Elbow torque limit [N·m]
    pub torque_limit: f64,
    /// Weight R of the running cost R·u²
    pub input_weight: f64,
    /// Fixed start state (q₁, q₂, v₁, v₂)
    pub initial_state: [f64; 4],
    /// Fixed goal state
    pub final_state: [f64; 4],
}

impl Default for AcrobotSwingUp {
    fn default() -> Self {
        Self {
            params: AcrobotParams::default(),
            num_knots: 10,
            min_timestep: 0.01,
            max_timestep: 3.0,
            torque_limit: 8.0,
            input_weight: 10.0,
            initial_state: [0.0; 4],
            final_state: [PI, 0.0, 0.0, 0.0],
        }
    }
}

impl AcrobotSwingUp {
    /// Build the transcription with boundary states, torque bounds, equal
    /// time intervals, the running cost and a straight-line initial guess
    pub fn build(&self) -> Result<HybridDircon<Acrobot>, TranscriptionError> {
        let model = Arc::new(Acrobot::new(self.params.clone()));
        let set = Arc::new(KinematicConstraintSet::unconstrained(model));

        let mut dircon = HybridDircon::new(
            vec![set],
            &[self.num_knots],
            &[self.min_timestep],
            &[self.max_timestep],
            vec![DirconOptions::new(0)],
        )?;

        let x0 = DVector::from_row_slice(&self.initial_state);
        let xg = DVector::from_row_slice(&self.final_state);
        dircon.add_state_equality(0, &x0)?;
        dircon.add_state_equality(dircon.num_knots() - 1, &xg)?;
        dircon.add_input_bounds(
            DVector::from_element(1, -self.torque_limit),
            DVector::from_element(1, self.torque_limit),
        )?;
        dircon.add_equal_time_intervals_constraints()?;
        dircon.add_running_cost(Arc::new(QuadraticCost::new(
            input_weight_matrix(4, 1, self.input_weight),
            DVector::zeros(5),
        )))?;

        let duration = 0.5 * (self.min_timestep + self.max_timestep) * (self.num_knots - 1) as f64;
        let x_guess = PiecewisePolynomial::first_order_hold(&[0.0, duration], &[x0, xg]);
        dircon.set_initial_trajectory(&PiecewisePolynomial::empty(), &x_guess)?;
        Ok(dircon)
    }
}

/// Stance-then-flight hop of a planar point mass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointMassHop {
    pub params: PointMassParams,
    pub stance_knots: usize,
    pub flight_knots: usize,
    pub min_timestep: f64,
    pub max_timestep: f64,
    /// Friction coefficient of the foot contact
    pub friction: f64,
    /// Enforcement at the first stance knot
    pub stance_start: Enforcement,
    /// Weight of the ‖λ‖² regularization
    pub force_cost: f64,
    /// Upper bound on each input component [N]
    pub max_input: f64,
}

impl Default for PointMassHop {
    fn default() -> Self {
        Self {
            params: PointMassParams::default(),
            stance_knots: 6,
            flight_knots: 5,
            min_timestep: 0.01,
            max_timestep: 0.1,
            friction: 0.8,
            stance_start: Enforcement::ValueOnly,
            force_cost: 1e-4,
            max_input: 50.0,
        }
    }
}

impl PointMassHop {
    /// Stance constraint set: foot at the body origin, planar rows (x, z)
    /// with the x row free to sit anywhere through the mode offset
    pub fn stance_set(&self) -> Result<Arc<KinematicConstraintSet<PlanarPointMass>>, TranscriptionError> {
        let model = Arc::new(PlanarPointMass::new(self.params.clone()));
        let foot = PositionData::planar(0, Vector3::zeros()).with_contact(2, self.friction);
        Ok(Arc::new(KinematicConstraintSet::new(model, vec![foot.into()])?))
    }

    pub fn build(&self) -> Result<HybridDircon<PlanarPointMass>, TranscriptionError> {
        let stance = self.stance_set()?;
        let flight = Arc::new(KinematicConstraintSet::unconstrained(Arc::clone(stance.dynamics())));

        let mut stance_options = DirconOptions::new(stance.num_constraints());
        stance_options.set_constraint_relative(0, true)?;
        stance_options.set_all_start_type(self.stance_start);
        // Lift-off: the foot may leave the ground at the last stance knot
        stance_options.set_end_type(1, Enforcement::ValueOnly)?;
        stance_options.set_force_cost(self.force_cost);

        let mut dircon = HybridDircon::new(
            vec![stance, flight],
            &[self.stance_knots, self.flight_knots],
            &[self.min_timestep; 2],
            &[self.max_timestep; 2],
            vec![stance_options, DirconOptions::new(0)],
        )?;
        dircon.add_input_bounds(
            DVector::from_element(2, -self.max_input),
            DVector::from_element(2, self.max_input),
        )?;
        Ok(dircon)
    }
}

/// Weight matrix penalizing only the input part of `[x, u]`
fn input_weight_matrix(num_states: usize, num_inputs: usize, weight: f64) -> DMatrix<f64> {
    let n = num_states + num_inputs;
    DMatrix::from_fn(n, n, |i, j| if i == j && i >= num_states { weight } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Evaluator;
    use approx::assert_relative_eq;

    #[test]
    fn test_acrobot_swing_up_builds() {
        let dircon = AcrobotSwingUp::default().build().unwrap();
        assert_eq!(dircon.num_knots(), 10);
        assert_eq!(dircon.prog().costs().len(), 10);
        // Start and goal states plus one torque bound per knot
        assert_eq!(dircon.prog().bounding_box_constraints().len(), 1 + 2 + 10);

        let guess = dircon.prog().initial_guess();
        let goal = dircon.prog().initial_guess_of(&dircon.final_state());
        assert_relative_eq!(goal[0], PI, epsilon = 1e-12);
        assert_eq!(guess.len(), dircon.prog().num_vars());
    }

    #[test]
    fn test_input_weight_matrix() {
        let cost = QuadraticCost::new(input_weight_matrix(4, 1, 10.0), DVector::zeros(5));
        let z = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 0.5]);
        assert_relative_eq!(cost.eval(&z).unwrap()[0], 2.5);
    }

    #[test]
    fn test_point_mass_hop_builds() {
        let dircon = PointMassHop::default().build().unwrap();
        assert_eq!(dircon.num_modes(), 2);
        assert_eq!(dircon.num_knots(), 10);
        assert_eq!(dircon.offset_vars(0).len(), 1);
        assert!(dircon.v_post_impact_vars_by_mode(1).is_some());
    }
}
