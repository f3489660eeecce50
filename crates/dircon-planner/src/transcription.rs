//! Hybrid DIRCON transcription
//!
//! Transcribes a fixed sequence of modes into one nonlinear program. Each
//! mode i has N_i knots, its own [`KinematicConstraintSet`] and
//! [`DirconOptions`]. Consecutive modes share their seam knot:
//!
//! ```text
//! mode 0:  k = 0 ─ 1 ─ … ─ N₀−1
//! mode 1:                  N₀−1 ─ … ─ N₀+N₁−2
//!                           ↑ same time and q, velocity v_p[1]
//! ```
//!
//! so the program has N = Σ N_i − (M − 1) knots and N − 1 timestep
//! variables. Mode i > 0 sees its first knot as (q of the seam knot,
//! post-impact velocity v_p[i]); the previous mode sees the pre-impact state.
//!
//! Per mode the transcription allocates
//! - `lambda[i]`: n_c·N_i constraint forces at the knots
//! - `lambda_c[i]`, `v_c[i]`: n_c·(N_i−1) midpoint forces and velocity slacks
//! - `offset[i]`: one offset per relative constraint row
//! - `v_p[i]`: n_v post-impact velocities (i > 0)
//!
//! and binds a [`DynamicsCollocationConstraint`] to every interval, a
//! [`KinematicPointConstraint`] to every knot (start/interior/end variants)
//! and the constraint set's force constraints to every knot's λ.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use thiserror::Error;
use tracing::{debug, info, warn};

use dircon_core::dynamics::RigidBodyDynamics;
use dircon_core::kinematics::KinematicConstraintSet;
use dircon_core::math::PiecewisePolynomial;
use dircon_core::EvaluationError;

use crate::collocation::DynamicsCollocationConstraint;
use crate::config::{validate_knots, validate_timestep_bounds, ConfigurationError, DirconOptions, TranscriptionConfig};
use crate::constraints::{KinematicPointConstraint, QuadraticCost, TrapezoidalRunningCost};
use crate::program::{DecisionVariables, Evaluator, MathematicalProgram, ProgramError};
use crate::solver::{NlpSolver, SolutionStatus, SolverError};
use crate::trajectory::ReconstructedTrajectory;

/// Errors raised while building or querying a transcription
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Multi-mode direct collocation with kinematic constraints
pub struct HybridDircon<D: RigidBodyDynamics> {
    prog: MathematicalProgram,
    constraint_sets: Vec<Arc<KinematicConstraintSet<D>>>,
    options: Vec<DirconOptions>,
    mode_lengths: Vec<usize>,
    mode_start: Vec<usize>,
    num_knots: usize,
    num_positions: usize,
    num_states: usize,
    num_inputs: usize,
    h_vars: DecisionVariables,
    x_vars: DecisionVariables,
    u_vars: DecisionVariables,
    force_vars: Vec<DecisionVariables>,
    collocation_force_vars: Vec<DecisionVariables>,
    collocation_slack_vars: Vec<DecisionVariables>,
    offset_vars: Vec<DecisionVariables>,
    /// Entry i − 1 belongs to mode i
    v_post_impact_vars: Vec<DecisionVariables>,
}

impl<D: RigidBodyDynamics + 'static> HybridDircon<D> {
    /// Build the transcription.
    ///
    /// Every argument has one entry per mode. All inputs are validated
    /// before any variable is allocated.
    pub fn new(
        constraint_sets: Vec<Arc<KinematicConstraintSet<D>>>,
        num_knots: &[usize],
        min_timesteps: &[f64],
        max_timesteps: &[f64],
        options: Vec<DirconOptions>,
    ) -> Result<Self, TranscriptionError> {
        Self::validate(&constraint_sets, num_knots, min_timesteps, max_timesteps, &options)?;

        let num_modes = constraint_sets.len();
        let model = &constraint_sets[0];
        let num_positions = model.num_positions();
        let num_states = model.num_states();
        let num_inputs = model.num_actuators();

        let mut mode_start = Vec::with_capacity(num_modes);
        let mut start = 0;
        for &n in num_knots {
            mode_start.push(start);
            start += n - 1;
        }
        let total_knots = start + 1;

        let mut prog = MathematicalProgram::new();
        let h_vars = prog.new_variables(total_knots - 1, "h");
        let x_vars = prog.new_variables(total_knots * num_states, "x");
        let u_vars = prog.new_variables(total_knots * num_inputs, "u");

        let mut dircon = Self {
            prog,
            constraint_sets,
            options,
            mode_lengths: num_knots.to_vec(),
            mode_start,
            num_knots: total_knots,
            num_positions,
            num_states,
            num_inputs,
            h_vars,
            x_vars,
            u_vars,
            force_vars: Vec::with_capacity(num_modes),
            collocation_force_vars: Vec::with_capacity(num_modes),
            collocation_slack_vars: Vec::with_capacity(num_modes),
            offset_vars: Vec::with_capacity(num_modes),
            v_post_impact_vars: Vec::with_capacity(num_modes.saturating_sub(1)),
        };

        for mode in 0..num_modes {
            dircon.add_mode(mode, min_timesteps[mode], max_timesteps[mode])?;
        }

        info!(
            modes = num_modes,
            knots = dircon.num_knots,
            variables = dircon.prog.num_vars(),
            constraints = dircon.prog.generic_constraints().len(),
            linear_constraints = dircon.prog.linear_constraints().len(),
            "Built hybrid DIRCON transcription"
        );
        Ok(dircon)
    }

    /// Build from a [`TranscriptionConfig`], one constraint set per mode
    pub fn from_config(
        config: &TranscriptionConfig,
        constraint_sets: Vec<Arc<KinematicConstraintSet<D>>>,
    ) -> Result<Self, TranscriptionError> {
        config.validate()?;
        if constraint_sets.len() != config.modes.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "constraint sets",
                expected: config.modes.len(),
                got: constraint_sets.len(),
            }
            .into());
        }
        let options = config
            .modes
            .iter()
            .zip(&constraint_sets)
            .map(|(mode, set)| mode.options.to_options(set.num_constraints()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(
            constraint_sets,
            &config.num_knots(),
            &config.min_timesteps(),
            &config.max_timesteps(),
            options,
        )
    }

    fn validate(
        constraint_sets: &[Arc<KinematicConstraintSet<D>>],
        num_knots: &[usize],
        min_timesteps: &[f64],
        max_timesteps: &[f64],
        options: &[DirconOptions],
    ) -> Result<(), ConfigurationError> {
        let num_modes = constraint_sets.len();
        if num_modes == 0 {
            return Err(ConfigurationError::EmptyModeSequence);
        }
        for (what, got) in [
            ("knot counts", num_knots.len()),
            ("minimum timesteps", min_timesteps.len()),
            ("maximum timesteps", max_timesteps.len()),
            ("mode options", options.len()),
        ] {
            if got != num_modes {
                return Err(ConfigurationError::LengthMismatch {
                    what,
                    expected: num_modes,
                    got,
                });
            }
        }

        let first = &constraint_sets[0];
        if first.num_positions() != first.num_velocities() {
            return Err(ConfigurationError::UnsupportedStateLayout {
                num_positions: first.num_positions(),
                num_velocities: first.num_velocities(),
            });
        }

        for (mode, set) in constraint_sets.iter().enumerate() {
            if set.num_positions() != first.num_positions()
                || set.num_velocities() != first.num_velocities()
                || set.num_actuators() != first.num_actuators()
            {
                return Err(ConfigurationError::ModelMismatch { mode });
            }
            validate_knots(mode, num_knots[mode])?;
            validate_timestep_bounds(mode, min_timesteps[mode], max_timesteps[mode])?;
            if options[mode].num_constraints() != set.num_constraints() {
                return Err(ConfigurationError::OptionsMismatch {
                    mode,
                    expected: set.num_constraints(),
                    got: options[mode].num_constraints(),
                });
            }
        }
        Ok(())
    }

    fn add_mode(&mut self, mode: usize, min_timestep: f64, max_timestep: f64) -> Result<(), TranscriptionError> {
        let set = Arc::clone(&self.constraint_sets[mode]);
        let options = self.options[mode].clone();
        let n = self.mode_lengths[mode];
        let start = self.mode_start[mode];
        let nc = set.num_constraints();

        // Timestep bounds, equal within the mode
        let h = self.h_vars.segment(start, n - 1);
        self.prog.add_bounding_box_constraint(
            DVector::from_element(n - 1, min_timestep),
            DVector::from_element(n - 1, max_timestep),
            &h,
        )?;
        let guess = if max_timestep.is_finite() {
            0.5 * (min_timestep + max_timestep)
        } else {
            min_timestep
        };
        self.prog.set_initial_guess(&h, &DVector::from_element(n - 1, guess))?;
        if n > 2 {
            self.prog
                .add_linear_equality_constraint(successive_differences(n - 1), DVector::zeros(n - 2), &h)?;
        }

        self.force_vars
            .push(self.prog.new_variables(nc * n, &format!("lambda[{mode}]")));
        self.collocation_force_vars
            .push(self.prog.new_variables(nc * (n - 1), &format!("lambda_c[{mode}]")));
        self.collocation_slack_vars
            .push(self.prog.new_variables(nc * (n - 1), &format!("v_c[{mode}]")));
        self.offset_vars
            .push(self.prog.new_variables(options.num_relative(), &format!("offset[{mode}]")));
        if mode > 0 {
            let nv = self.num_states - self.num_positions;
            self.v_post_impact_vars
                .push(self.prog.new_variables(nv, &format!("v_p[{mode}]")));
        }

        let collocation: Arc<dyn Evaluator> = Arc::new(DynamicsCollocationConstraint::new(Arc::clone(&set)));
        for j in 0..n - 1 {
            let vars = DecisionVariables::concat(&[
                &self.timestep(start + j),
                &self.state_vars_by_mode(mode, j),
                &self.state_vars_by_mode(mode, j + 1),
                &self.input(start + j),
                &self.input(start + j + 1),
                &self.force(mode, j),
                &self.force(mode, j + 1),
                &self.collocation_force_vars[mode].segment(j * nc, nc),
                &self.collocation_slack_vars[mode].segment(j * nc, nc),
            ]);
            self.prog
                .add_equality_constraint(Arc::clone(&collocation), &vars, format!("collocation[{mode}][{j}]"))?;
        }

        let start_constraint = KinematicPointConstraint::new(Arc::clone(&set), options.relative(), options.start_type())?;
        let interior_constraint =
            KinematicPointConstraint::new(Arc::clone(&set), options.relative(), options.interior_type())?;
        let end_constraint = KinematicPointConstraint::new(Arc::clone(&set), options.relative(), options.end_type())?;

        if !start_constraint.is_empty() {
            let vars = self.kinematic_vars(mode, 0);
            self.prog
                .add_equality_constraint(Arc::new(start_constraint), &vars, format!("kinematic_start[{mode}]"))?;
        }
        if !interior_constraint.is_empty() {
            let interior: Arc<dyn Evaluator> = Arc::new(interior_constraint);
            for j in 1..n - 1 {
                let vars = self.kinematic_vars(mode, j);
                self.prog
                    .add_equality_constraint(Arc::clone(&interior), &vars, format!("kinematic[{mode}][{j}]"))?;
            }
        }
        if !end_constraint.is_empty() {
            let vars = self.kinematic_vars(mode, n - 1);
            self.prog
                .add_equality_constraint(Arc::new(end_constraint), &vars, format!("kinematic_end[{mode}]"))?;
        }

        for binding in set.force_constraints() {
            for j in 0..n {
                let vars = self.force(mode, j).segment(binding.offset, binding.length);
                self.prog.add_linear_constraint(
                    binding.constraint.a.clone(),
                    binding.constraint.lower.clone(),
                    binding.constraint.upper.clone(),
                    &vars,
                )?;
            }
        }

        if options.force_cost() > 0.0 && nc > 0 {
            let cost: Arc<dyn Evaluator> = Arc::new(QuadraticCost::scaled_identity(nc, options.force_cost()));
            for j in 0..n {
                let vars = self.force(mode, j);
                self.prog
                    .add_cost(Arc::clone(&cost), &vars, format!("force_cost[{mode}][{j}]"))?;
            }
        }

        debug!(
            mode,
            knots = n,
            first_knot = start,
            constraint_rows = nc,
            relative_rows = options.num_relative(),
            min_timestep,
            max_timestep,
            "Added mode"
        );
        Ok(())
    }

    /// `[x, u, λ, offset]` at knot `j` of `mode`
    fn kinematic_vars(&self, mode: usize, j: usize) -> DecisionVariables {
        DecisionVariables::concat(&[
            &self.state_vars_by_mode(mode, j),
            &self.input(self.mode_start[mode] + j),
            &self.force(mode, j),
            &self.offset_vars[mode],
        ])
    }
}

impl<D: RigidBodyDynamics> HybridDircon<D> {
    pub fn prog(&self) -> &MathematicalProgram {
        &self.prog
    }

    pub fn prog_mut(&mut self) -> &mut MathematicalProgram {
        &mut self.prog
    }

    pub fn num_modes(&self) -> usize {
        self.constraint_sets.len()
    }

    /// Total knot count N
    pub fn num_knots(&self) -> usize {
        self.num_knots
    }

    pub fn mode_length(&self, mode: usize) -> usize {
        self.mode_lengths[mode]
    }

    /// Global index of the first knot of `mode`
    pub fn mode_start(&self, mode: usize) -> usize {
        self.mode_start[mode]
    }

    pub fn constraint_set(&self, mode: usize) -> &Arc<KinematicConstraintSet<D>> {
        &self.constraint_sets[mode]
    }

    pub fn options(&self, mode: usize) -> &DirconOptions {
        &self.options[mode]
    }

    pub fn timesteps(&self) -> &DecisionVariables {
        &self.h_vars
    }

    /// Timestep of interval `k` (between knots k and k + 1)
    pub fn timestep(&self, k: usize) -> DecisionVariables {
        self.h_vars.segment(k, 1)
    }

    pub fn state_vars(&self) -> &DecisionVariables {
        &self.x_vars
    }

    pub fn input_vars(&self) -> &DecisionVariables {
        &self.u_vars
    }

    /// Global state block of knot `k` (pre-impact at a seam)
    ///
    /// Panics if `k >= num_knots()`, like slice indexing.
    pub fn state(&self, k: usize) -> DecisionVariables {
        self.x_vars.segment(k * self.num_states, self.num_states)
    }

    pub fn input(&self, k: usize) -> DecisionVariables {
        self.u_vars.segment(k * self.num_inputs, self.num_inputs)
    }

    pub fn initial_state(&self) -> DecisionVariables {
        self.state(0)
    }

    pub fn final_state(&self) -> DecisionVariables {
        self.state(self.num_knots - 1)
    }

    /// State of knot `j` as seen by `mode`
    ///
    /// The first knot of a mode after the first resolves to the seam
    /// knot's positions and the mode's post-impact velocity.
    pub fn state_vars_by_mode(&self, mode: usize, j: usize) -> DecisionVariables {
        let global = self.state(self.mode_start[mode] + j);
        if mode > 0 && j == 0 {
            DecisionVariables::concat(&[&global.segment(0, self.num_positions), &self.v_post_impact_vars[mode - 1]])
        } else {
            global
        }
    }

    pub fn force_vars(&self, mode: usize) -> &DecisionVariables {
        &self.force_vars[mode]
    }

    /// λ at knot `j` of `mode`
    pub fn force(&self, mode: usize, j: usize) -> DecisionVariables {
        let nc = self.constraint_sets[mode].num_constraints();
        self.force_vars[mode].segment(j * nc, nc)
    }

    pub fn collocation_force_vars(&self, mode: usize) -> &DecisionVariables {
        &self.collocation_force_vars[mode]
    }

    pub fn collocation_slack_vars(&self, mode: usize) -> &DecisionVariables {
        &self.collocation_slack_vars[mode]
    }

    pub fn offset_vars(&self, mode: usize) -> &DecisionVariables {
        &self.offset_vars[mode]
    }

    /// Post-impact velocity of `mode` (none for the first mode)
    pub fn v_post_impact_vars_by_mode(&self, mode: usize) -> Option<&DecisionVariables> {
        mode.checked_sub(1).and_then(|i| self.v_post_impact_vars.get(i))
    }

    fn check_mode(&self, mode: usize) -> Result<(), ProgramError> {
        if mode < self.num_modes() {
            Ok(())
        } else {
            Err(ProgramError::ModeOutOfRange {
                mode,
                num_modes: self.num_modes(),
            })
        }
    }

    fn check_knot(&self, knot: usize) -> Result<(), ProgramError> {
        if knot < self.num_knots {
            Ok(())
        } else {
            Err(ProgramError::KnotOutOfRange {
                knot,
                num_knots: self.num_knots,
            })
        }
    }

    /// Add ∫g(x, u)dt, integrated with the trapezoid rule on the timestep
    /// variables. `cost` takes `[x, u]` and returns one value.
    pub fn add_running_cost(&mut self, cost: Arc<dyn Evaluator>) -> Result<(), ProgramError> {
        check_shape("running cost inputs", self.num_states + self.num_inputs, cost.num_inputs())?;
        check_shape("running cost outputs", 1, cost.num_outputs())?;

        let last = self.num_knots - 1;
        for k in 0..self.num_knots {
            let timesteps = match k {
                0 => self.timestep(0),
                k if k == last => self.timestep(last - 1),
                k => DecisionVariables::concat(&[&self.timestep(k - 1), &self.timestep(k)]),
            };
            let vars = DecisionVariables::concat(&[&timesteps, &self.state(k), &self.input(k)]);
            let term = TrapezoidalRunningCost::new(Arc::clone(&cost), timesteps.len());
            self.prog.add_cost(Arc::new(term), &vars, format!("running_cost[{k}]"))?;
        }
        Ok(())
    }

    /// `lower ≤ A·[x_k; u_k] ≤ upper` at every knot
    pub fn add_constraint_to_all_knot_points(
        &mut self,
        a: DMatrix<f64>,
        lower: DVector<f64>,
        upper: DVector<f64>,
    ) -> Result<(), ProgramError> {
        for k in 0..self.num_knots {
            let vars = DecisionVariables::concat(&[&self.state(k), &self.input(k)]);
            self.prog
                .add_linear_constraint(a.clone(), lower.clone(), upper.clone(), &vars)?;
        }
        Ok(())
    }

    /// `lower ≤ u_k ≤ upper` at every knot
    pub fn add_input_bounds(&mut self, lower: DVector<f64>, upper: DVector<f64>) -> Result<(), ProgramError> {
        for k in 0..self.num_knots {
            let vars = self.input(k);
            self.prog
                .add_bounding_box_constraint(lower.clone(), upper.clone(), &vars)?;
        }
        Ok(())
    }

    /// Fix the global state of knot `k`
    pub fn add_state_equality(&mut self, k: usize, value: &DVector<f64>) -> Result<(), ProgramError> {
        self.check_knot(k)?;
        let vars = self.state(k);
        self.prog
            .add_bounding_box_constraint(value.clone(), value.clone(), &vars)
    }

    /// Equal timesteps across every interval of every mode
    pub fn add_equal_time_intervals_constraints(&mut self) -> Result<(), ProgramError> {
        let intervals = self.num_knots - 1;
        if intervals < 2 {
            return Ok(());
        }
        let h = self.h_vars.clone();
        self.prog
            .add_linear_equality_constraint(successive_differences(intervals), DVector::zeros(intervals - 1), &h)
    }

    /// Seed timesteps, states, inputs and post-impact velocities from
    /// trajectories. The state trajectory's span sets uniform timesteps; an
    /// empty input trajectory leaves the input guess untouched.
    pub fn set_initial_trajectory(
        &mut self,
        traj_init_u: &PiecewisePolynomial,
        traj_init_x: &PiecewisePolynomial,
    ) -> Result<(), ProgramError> {
        if traj_init_x.is_empty() {
            return Ok(());
        }
        check_shape("initial state trajectory rows", self.num_states, traj_init_x.rows())?;
        if !traj_init_u.is_empty() {
            check_shape("initial input trajectory rows", self.num_inputs, traj_init_u.rows())?;
        }

        let intervals = self.num_knots - 1;
        let start = traj_init_x.start_time();
        let h = (traj_init_x.end_time() - start) / intervals as f64;
        let h_vars = self.h_vars.clone();
        self.prog
            .set_initial_guess(&h_vars, &DVector::from_element(intervals, h))?;

        for k in 0..self.num_knots {
            let t = start + k as f64 * h;
            let state = self.state(k);
            self.prog.set_initial_guess(&state, &traj_init_x.value(t))?;
            if !traj_init_u.is_empty() {
                let input = self.input(k);
                self.prog.set_initial_guess(&input, &traj_init_u.value(t))?;
            }
        }

        let nv = self.num_states - self.num_positions;
        for mode in 1..self.num_modes() {
            let t = start + self.mode_start[mode] as f64 * h;
            let velocity = traj_init_x.value(t).rows(self.num_positions, nv).into_owned();
            let vars = self.v_post_impact_vars[mode - 1].clone();
            self.prog.set_initial_guess(&vars, &velocity)?;
        }
        Ok(())
    }

    /// Seed a mode's force variables.
    ///
    /// λ is sampled at the mode's knot times and λ_c, v_c at interval
    /// midpoints, using times implied by the current timestep guess. An
    /// empty trajectory seeds zeros.
    pub fn set_initial_force_trajectory(
        &mut self,
        mode: usize,
        traj_init_lambda: &PiecewisePolynomial,
        traj_init_lambda_c: &PiecewisePolynomial,
        traj_init_gamma_c: &PiecewisePolynomial,
    ) -> Result<(), ProgramError> {
        self.check_mode(mode)?;
        let nc = self.constraint_sets[mode].num_constraints();
        for traj in [traj_init_lambda, traj_init_lambda_c, traj_init_gamma_c] {
            if !traj.is_empty() {
                check_shape("initial force trajectory rows", nc, traj.rows())?;
            }
        }
        let sample = |traj: &PiecewisePolynomial, t: f64| {
            if traj.is_empty() {
                DVector::zeros(nc)
            } else {
                traj.value(t)
            }
        };

        let h_guess = self.prog.initial_guess_of(&self.h_vars);
        let times = knot_times(&h_guess);
        let start = self.mode_start[mode];
        for j in 0..self.mode_lengths[mode] {
            let t = times[start + j];
            let vars = self.force(mode, j);
            self.prog.set_initial_guess(&vars, &sample(traj_init_lambda, t))?;

            if j + 1 < self.mode_lengths[mode] {
                let midpoint = t + 0.5 * h_guess[start + j];
                let lc = self.collocation_force_vars[mode].segment(j * nc, nc);
                let vc = self.collocation_slack_vars[mode].segment(j * nc, nc);
                self.prog
                    .set_initial_guess(&lc, &sample(traj_init_lambda_c, midpoint))?;
                self.prog
                    .set_initial_guess(&vc, &sample(traj_init_gamma_c, midpoint))?;
            }
        }
        Ok(())
    }

    /// Solve the program with an external solver
    pub fn solve(&mut self, solver: &dyn NlpSolver) -> Result<SolutionStatus, SolverError> {
        info!(
            solver = solver.name(),
            variables = self.prog.num_vars(),
            "Solving hybrid DIRCON program"
        );
        self.prog.solve(solver)
    }

    /// Knot times of the stored solution, starting at 0
    pub fn sample_times(&self) -> Result<Vec<f64>, ProgramError> {
        let h = self.prog.get_solution(&self.h_vars)?;
        Ok(knot_times(&h))
    }

    fn solved_times(&self) -> Result<(Vec<f64>, SolutionStatus), ProgramError> {
        let status = self.prog.solution().ok_or(ProgramError::NoSolution)?.status;
        let h = self.prog.get_solution(&self.h_vars)?;
        if let Some((interval, &value)) = h.iter().enumerate().find(|(_, v)| v.is_nan() || **v <= 0.0) {
            return Err(ProgramError::DegenerateTimestep { interval, value });
        }
        if !status.is_success() {
            warn!(status = ?status, "Reconstructing trajectory from a non-authoritative solution");
        }
        Ok((knot_times(&h), status))
    }

    /// Solved state trajectory: per mode, cubic Hermite through the knot
    /// states with derivatives from the constrained dynamics. Right-continuous
    /// at seams (takes the post-impact state).
    pub fn reconstruct_state_trajectory(&self) -> Result<ReconstructedTrajectory, ProgramError> {
        let (times, status) = self.solved_times()?;
        let mut polynomial = PiecewisePolynomial::empty();

        for mode in 0..self.num_modes() {
            let set = &self.constraint_sets[mode];
            let start = self.mode_start[mode];
            let n = self.mode_lengths[mode];

            let mut states = Vec::with_capacity(n);
            let mut derivatives = Vec::with_capacity(n);
            for j in 0..n {
                let x = self.prog.get_solution(&self.state_vars_by_mode(mode, j))?;
                let u = self.prog.get_solution(&self.input(start + j))?;
                let lambda = self.prog.get_solution(&self.force(mode, j))?;
                derivatives.push(set.evaluate(&x, &u, &lambda)?.xdot);
                states.push(x);
            }
            let segment = PiecewisePolynomial::cubic_hermite(&times[start..start + n], &states, &derivatives);
            polynomial.concatenate(&segment);
        }
        Ok(ReconstructedTrajectory::new(polynomial, times, status))
    }

    /// Solved input trajectory: first-order hold through every knot
    pub fn reconstruct_input_trajectory(&self) -> Result<ReconstructedTrajectory, ProgramError> {
        let (times, status) = self.solved_times()?;
        let inputs = (0..self.num_knots)
            .map(|k| self.prog.get_solution(&self.input(k)))
            .collect::<Result<Vec<_>, _>>()?;
        let polynomial = PiecewisePolynomial::first_order_hold(&times, &inputs);
        Ok(ReconstructedTrajectory::new(polynomial, times, status))
    }

    /// Solved constraint forces of one mode: first-order hold through its knots
    pub fn reconstruct_force_trajectory(&self, mode: usize) -> Result<ReconstructedTrajectory, ProgramError> {
        self.check_mode(mode)?;
        let (times, status) = self.solved_times()?;
        let start = self.mode_start[mode];
        let n = self.mode_lengths[mode];
        let forces = (0..n)
            .map(|j| self.prog.get_solution(&self.force(mode, j)))
            .collect::<Result<Vec<_>, _>>()?;
        let mode_times = times[start..start + n].to_vec();
        let polynomial = PiecewisePolynomial::first_order_hold(&mode_times, &forces);
        Ok(ReconstructedTrajectory::new(polynomial, mode_times, status))
    }
}

/// Cumulative times from interval durations
fn knot_times(h: &DVector<f64>) -> Vec<f64> {
    let mut times = Vec::with_capacity(h.len() + 1);
    times.push(0.0);
    let mut t = 0.0;
    for &dt in h.iter() {
        t += dt;
        times.push(t);
    }
    times
}

/// (n−1)×n matrix with rows e_j − e_{j+1}
fn successive_differences(n: usize) -> DMatrix<f64> {
    let mut a = DMatrix::zeros(n.saturating_sub(1), n);
    for j in 0..n.saturating_sub(1) {
        a[(j, j)] = 1.0;
        a[(j, j + 1)] = -1.0;
    }
    a
}

fn check_shape(context: &'static str, expected: usize, got: usize) -> Result<(), ProgramError> {
    if expected == got {
        Ok(())
    } else {
        Err(ProgramError::DimensionMismatch {
            context,
            expected,
            got,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Enforcement;
    use approx::assert_relative_eq;
    use dircon_core::dynamics::PlanarPointMass;
    use dircon_core::kinematics::PositionData;
    use nalgebra::Vector3;

    fn stance_and_flight() -> HybridDircon<PlanarPointMass> {
        let model = Arc::new(PlanarPointMass::default());
        let foot = PositionData::planar(0, Vector3::zeros()).with_contact(2, 1.0);
        let stance = Arc::new(KinematicConstraintSet::new(Arc::clone(&model), vec![foot.into()]).unwrap());
        let flight = Arc::new(KinematicConstraintSet::unconstrained(model));

        let mut stance_options = DirconOptions::new(2);
        stance_options.set_constraint_relative(0, true).unwrap();
        stance_options.set_force_cost(1e-3);

        HybridDircon::new(
            vec![stance, flight],
            &[4, 3],
            &[0.05, 0.05],
            &[0.2, 0.2],
            vec![stance_options, DirconOptions::new(0)],
        )
        .unwrap()
    }

    #[test]
    fn test_knot_bookkeeping() {
        let dircon = stance_and_flight();
        assert_eq!(dircon.num_knots(), 6);
        assert_eq!(dircon.mode_start(1), 3);
        assert_eq!(dircon.timesteps().len(), 5);
        assert_eq!(dircon.force_vars(0).len(), 8);
        assert_eq!(dircon.collocation_force_vars(0).len(), 6);
        assert_eq!(dircon.collocation_slack_vars(0).len(), 6);
        assert_eq!(dircon.offset_vars(0).len(), 1);
        assert!(dircon.force_vars(1).is_empty());
        assert!(dircon.v_post_impact_vars_by_mode(0).is_none());
        assert_eq!(dircon.v_post_impact_vars_by_mode(1).map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_seam_state_resolution() {
        let dircon = stance_and_flight();
        let seam = dircon.state(3);
        let pre = dircon.state_vars_by_mode(0, 3);
        let post = dircon.state_vars_by_mode(1, 0);
        assert_eq!(pre, seam);
        assert_eq!(post.segment(0, 2), seam.segment(0, 2));
        assert_eq!(&post.segment(2, 2), dircon.v_post_impact_vars_by_mode(1).unwrap());
        assert_eq!(dircon.state_vars_by_mode(1, 1), dircon.state(4));
    }

    #[test]
    fn test_constraint_descriptions() {
        let dircon = stance_and_flight();
        let names: Vec<&str> = dircon
            .prog()
            .generic_constraints()
            .iter()
            .map(|b| b.description.as_str())
            .collect();
        assert!(names.contains(&"collocation[0][2]"));
        assert!(names.contains(&"collocation[1][1]"));
        assert!(names.contains(&"kinematic_start[0]"));
        assert!(names.contains(&"kinematic[0][2]"));
        assert!(names.contains(&"kinematic_end[0]"));
        // Flight mode has no constraint rows
        assert!(!names.iter().any(|n| n.starts_with("kinematic_start[1]")));
        assert_eq!(dircon.prog().costs().len(), 4);
    }

    #[test]
    fn test_validation_precedes_allocation() {
        let model = Arc::new(PlanarPointMass::default());
        let set = Arc::new(KinematicConstraintSet::unconstrained(model));

        let mismatched = HybridDircon::new(
            vec![Arc::clone(&set)],
            &[5, 5],
            &[0.1],
            &[0.2],
            vec![DirconOptions::new(0)],
        );
        assert!(matches!(
            mismatched,
            Err(TranscriptionError::Configuration(ConfigurationError::LengthMismatch { .. }))
        ));

        let bad_bounds = HybridDircon::new(vec![Arc::clone(&set)], &[5], &[0.3], &[0.2], vec![DirconOptions::new(0)]);
        assert!(matches!(
            bad_bounds,
            Err(TranscriptionError::Configuration(ConfigurationError::InvalidTimestepBounds { .. }))
        ));

        let wrong_options = HybridDircon::new(vec![set], &[5], &[0.1], &[0.2], vec![DirconOptions::new(2)]);
        assert!(matches!(
            wrong_options,
            Err(TranscriptionError::Configuration(ConfigurationError::OptionsMismatch { .. }))
        ));
    }

    #[test]
    fn test_omitted_end_skips_binding() {
        let model = Arc::new(PlanarPointMass::default());
        let foot = PositionData::planar(0, Vector3::zeros());
        let set = Arc::new(KinematicConstraintSet::new(model, vec![foot.into()]).unwrap());
        let mut options = DirconOptions::new(2);
        options.set_all_end_type(Enforcement::Omitted);

        let dircon = HybridDircon::new(vec![set], &[3], &[0.1], &[0.1], vec![options]).unwrap();
        let names: Vec<&str> = dircon
            .prog()
            .generic_constraints()
            .iter()
            .map(|b| b.description.as_str())
            .collect();
        assert!(names.contains(&"kinematic_start[0]"));
        assert!(!names.contains(&"kinematic_end[0]"));
    }

    #[test]
    fn test_knot_times() {
        let times = knot_times(&DVector::from_vec(vec![0.1, 0.2, 0.3]));
        assert_eq!(times.len(), 4);
        assert_relative_eq!(times[3], 0.6, epsilon = 1e-12);
        let a = successive_differences(3);
        assert_eq!(a.shape(), (2, 3));
        assert_relative_eq!(a[(1, 2)], -1.0);
    }
}
