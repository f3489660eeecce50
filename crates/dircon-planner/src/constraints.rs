//! Knot constraints and cost terms
//!
//! - [`KinematicPointConstraint`]: a mode's kinematic constraints at one knot,
//!   with a per-row [`Enforcement`] level
//! - [`QuadraticCost`]: (z − z₀)ᵀ·W·(z − z₀), used for force regularization
//!   and running costs
//! - [`TrapezoidalRunningCost`]: one knot's share of ∫g(x, u)dt on the
//!   timestep variables

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use dircon_core::dynamics::RigidBodyDynamics;
use dircon_core::kinematics::KinematicConstraintSet;
use dircon_core::math::{lift, lift_matrix, Dual, Scalar};
use dircon_core::EvaluationError;

use crate::config::Enforcement;
use crate::program::{Evaluator, GenericEvaluator};

/// A mode's kinematic constraints at a single knot
///
/// Input layout: `[x, u, λ, offset]`. For row i the value residual is
/// `c_i(q) − offset[r(i)]` when the row is relative (r(i) counts relative
/// rows before i) and `c_i(q)` otherwise. Output layout:
///
/// ```text
/// [ values of enforced rows | ċ of ValueAndVelocity rows | c̈ of enforced rows ]
/// ```
pub struct KinematicPointConstraint<D: RigidBodyDynamics> {
    constraints: Arc<KinematicConstraintSet<D>>,
    /// Offset index for relative rows
    offset_index: Vec<Option<usize>>,
    value_rows: Vec<usize>,
    velocity_rows: Vec<usize>,
    num_relative: usize,
}

impl<D: RigidBodyDynamics> KinematicPointConstraint<D> {
    /// `relative` and `enforcement` have one entry per constraint row
    pub fn new(
        constraints: Arc<KinematicConstraintSet<D>>,
        relative: &[bool],
        enforcement: &[Enforcement],
    ) -> Result<Self, EvaluationError> {
        let nc = constraints.num_constraints();
        EvaluationError::check_len("relative flags", nc, relative.len())?;
        EvaluationError::check_len("enforcement levels", nc, enforcement.len())?;

        let mut num_relative = 0;
        let offset_index = relative
            .iter()
            .map(|&r| {
                r.then(|| {
                    num_relative += 1;
                    num_relative - 1
                })
            })
            .collect();
        let value_rows = (0..nc).filter(|&i| enforcement[i].enforces_value()).collect();
        let velocity_rows = (0..nc).filter(|&i| enforcement[i].enforces_velocity()).collect();

        Ok(Self {
            constraints,
            offset_index,
            value_rows,
            velocity_rows,
            num_relative,
        })
    }

    pub fn num_relative(&self) -> usize {
        self.num_relative
    }

    /// Whether no row is enforced at this knot
    pub fn is_empty(&self) -> bool {
        self.value_rows.is_empty()
    }
}

impl<D: RigidBodyDynamics> GenericEvaluator for KinematicPointConstraint<D> {
    fn input_size(&self) -> usize {
        self.constraints.num_states()
            + self.constraints.num_actuators()
            + self.constraints.num_constraints()
            + self.num_relative
    }

    fn output_size(&self) -> usize {
        2 * self.value_rows.len() + self.velocity_rows.len()
    }

    fn eval_generic<S: Scalar>(&self, z: &DVector<S>) -> Result<DVector<S>, EvaluationError> {
        let nx = self.constraints.num_states();
        let nu = self.constraints.num_actuators();
        let nc = self.constraints.num_constraints();

        let x = z.rows(0, nx).into_owned();
        let u = z.rows(nx, nu).into_owned();
        let lambda = z.rows(nx + nu, nc).into_owned();
        let offset = z.rows(nx + nu + nc, self.num_relative);

        let eval = self.constraints.evaluate(&x, &u, &lambda)?;

        let values = self.value_rows.iter().map(|&i| match self.offset_index[i] {
            Some(k) => eval.c[i] - offset[k],
            None => eval.c[i],
        });
        let velocities = self.velocity_rows.iter().map(|&i| eval.cdot[i]);
        let accelerations = self.value_rows.iter().map(|&i| eval.cddot[i]);

        Ok(DVector::from_iterator(
            self.output_size(),
            values.chain(velocities).chain(accelerations),
        ))
    }
}

/// (z − z₀)ᵀ·W·(z − z₀)
#[derive(Debug, Clone)]
pub struct QuadraticCost {
    weights: DMatrix<f64>,
    target: DVector<f64>,
}

impl QuadraticCost {
    pub fn new(weights: DMatrix<f64>, target: DVector<f64>) -> Self {
        Self { weights, target }
    }

    /// w·‖z‖²
    pub fn scaled_identity(size: usize, weight: f64) -> Self {
        Self::new(DMatrix::identity(size, size) * weight, DVector::zeros(size))
    }
}

impl GenericEvaluator for QuadraticCost {
    fn input_size(&self) -> usize {
        self.target.len()
    }

    fn output_size(&self) -> usize {
        1
    }

    fn eval_generic<S: Scalar>(&self, z: &DVector<S>) -> Result<DVector<S>, EvaluationError> {
        let err = z - lift::<S>(&self.target);
        let weighted = lift_matrix::<S>(&self.weights) * &err;
        Ok(DVector::from_element(1, err.dot(&weighted)))
    }
}

/// Trapezoidal quadrature weight of a running cost at one knot
///
/// Input layout: `[h_prev?, h_next?, x, u]`, where the interior knots see
/// both adjacent timesteps and the end knots one. Output:
/// `g(x, u)·(Σ h)/2`.
pub struct TrapezoidalRunningCost {
    cost: Arc<dyn Evaluator>,
    num_timesteps: usize,
}

impl TrapezoidalRunningCost {
    pub fn new(cost: Arc<dyn Evaluator>, num_timesteps: usize) -> Self {
        Self { cost, num_timesteps }
    }

    fn weight<S: Scalar>(&self, z: &DVector<S>) -> S {
        let mut total = S::zero();
        for k in 0..self.num_timesteps {
            total += z[k];
        }
        total * S::from_f64(0.5)
    }
}

impl Evaluator for TrapezoidalRunningCost {
    fn num_inputs(&self) -> usize {
        self.num_timesteps + self.cost.num_inputs()
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn eval(&self, z: &DVector<f64>) -> Result<DVector<f64>, EvaluationError> {
        EvaluationError::check_len("running cost input", self.num_inputs(), z.len())?;
        let g = self.cost.eval(&z.rows(self.num_timesteps, self.cost.num_inputs()).into_owned())?;
        Ok(g * self.weight(z))
    }

    fn eval_dual(&self, z: &DVector<Dual>) -> Result<DVector<Dual>, EvaluationError> {
        EvaluationError::check_len("running cost input", self.num_inputs(), z.len())?;
        let g = self.cost.eval_dual(&z.rows(self.num_timesteps, self.cost.num_inputs()).into_owned())?;
        Ok(g * self.weight(z))
    }
}
