//! Nonlinear program builder
//!
//! [`MathematicalProgram`] records decision variables, constraints, costs and
//! an initial guess, and evaluates them for a solver:
//!
//! ```text
//! minimize    Σ costᵢ(z[varsᵢ])
//! subject to  lower ≤ z[vars] ≤ upper                (bounding boxes)
//!             lower ≤ A·z[vars] ≤ upper              (linear)
//!             lower ≤ g(z[vars]) ≤ upper             (generic evaluators)
//! ```
//!
//! Generic constraints and costs are [`Evaluator`]s. Implementations of
//! [`GenericEvaluator`] write their function once over any [`Scalar`] and get
//! exact Jacobians through dual numbers for free.

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use thiserror::Error;
use tracing::{info, warn};

use dircon_core::math::{jacobian, Dual, Scalar};
use dircon_core::EvaluationError;

use crate::solver::{NlpSolver, SolutionStatus, SolverError, SolverResult};

/// Program construction and query errors
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("Variable index {index} out of range ({num_vars} variables)")]
    VariableOutOfRange { index: usize, num_vars: usize },
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Program has no solution")]
    NoSolution,
    #[error("Knot {knot} out of range ({num_knots} knots)")]
    KnotOutOfRange { knot: usize, num_knots: usize },
    #[error("Mode {mode} out of range ({num_modes} modes)")]
    ModeOutOfRange { mode: usize, num_modes: usize },
    #[error("Interval {interval} has non-positive duration {value}")]
    DegenerateTimestep { interval: usize, value: f64 },
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

fn check_dim(context: &'static str, expected: usize, got: usize) -> Result<(), ProgramError> {
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

/// An ordered selection of decision variables
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecisionVariables {
    indices: Vec<usize>,
}

impl DecisionVariables {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    fn range(start: usize, len: usize) -> Self {
        Self {
            indices: (start..start + len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Sub-selection `[start, start + len)`
    pub fn segment(&self, start: usize, len: usize) -> Self {
        Self {
            indices: self.indices[start..start + len].to_vec(),
        }
    }

    /// Concatenate selections in order
    pub fn concat(parts: &[&DecisionVariables]) -> Self {
        Self {
            indices: parts.iter().flat_map(|p| p.indices.iter().copied()).collect(),
        }
    }

    /// Gather the selected entries of `z`
    pub fn gather(&self, z: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.indices.iter().map(|&i| z[i]))
    }
}

/// A named block of variables created by [`MathematicalProgram::new_variables`]
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBlock {
    pub name: String,
    pub start: usize,
    pub len: usize,
}

/// Vector function usable as a constraint or cost (dyn-compatible)
pub trait Evaluator: Send + Sync {
    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    fn eval(&self, x: &DVector<f64>) -> Result<DVector<f64>, EvaluationError>;

    fn eval_dual(&self, x: &DVector<Dual>) -> Result<DVector<Dual>, EvaluationError>;

    /// Value and exact Jacobian at `x`
    fn eval_with_jacobian(&self, x: &DVector<f64>) -> Result<(DVector<f64>, DMatrix<f64>), EvaluationError> {
        jacobian(x, |z| self.eval_dual(z))
    }
}

/// Vector function written once for every [`Scalar`]
pub trait GenericEvaluator: Send + Sync {
    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    fn eval_generic<S: Scalar>(&self, x: &DVector<S>) -> Result<DVector<S>, EvaluationError>;
}

impl<T: GenericEvaluator> Evaluator for T {
    fn num_inputs(&self) -> usize {
        self.input_size()
    }

    fn num_outputs(&self) -> usize {
        self.output_size()
    }

    fn eval(&self, x: &DVector<f64>) -> Result<DVector<f64>, EvaluationError> {
        EvaluationError::check_len("evaluator input", self.input_size(), x.len())?;
        self.eval_generic(x)
    }

    fn eval_dual(&self, x: &DVector<Dual>) -> Result<DVector<Dual>, EvaluationError> {
        EvaluationError::check_len("evaluator input", self.input_size(), x.len())?;
        self.eval_generic(x)
    }
}

/// Bounds `lower ≤ z[vars] ≤ upper`
#[derive(Debug, Clone)]
pub struct BoundingBoxConstraint {
    pub vars: DecisionVariables,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

/// Linear constraint `lower ≤ A·z[vars] ≤ upper`
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub a: DMatrix<f64>,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
    pub vars: DecisionVariables,
}

/// Generic constraint `lower ≤ g(z[vars]) ≤ upper`
#[derive(Clone)]
pub struct ConstraintBinding {
    pub evaluator: Arc<dyn Evaluator>,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
    pub vars: DecisionVariables,
    pub description: String,
}

impl ConstraintBinding {
    /// g(z[vars])
    pub fn evaluate(&self, z: &DVector<f64>) -> Result<DVector<f64>, EvaluationError> {
        self.evaluator.eval(&self.vars.gather(z))
    }
}

impl fmt::Debug for ConstraintBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintBinding")
            .field("description", &self.description)
            .field("num_outputs", &self.evaluator.num_outputs())
            .field("vars", &self.vars)
            .finish()
    }
}

/// Scalar cost term g(z[vars])
#[derive(Clone)]
pub struct CostBinding {
    pub evaluator: Arc<dyn Evaluator>,
    pub vars: DecisionVariables,
    pub description: String,
}

impl fmt::Debug for CostBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostBinding")
            .field("description", &self.description)
            .field("vars", &self.vars)
            .finish()
    }
}

/// Per-constraint violation report
#[derive(Debug, Clone, Default)]
pub struct ConstraintEvaluation {
    /// Violation of every constraint (0 when satisfied)
    pub violations: Vec<f64>,
    /// Names for debugging
    pub names: Vec<String>,
    /// Maximum violation
    pub max_violation: f64,
}

impl ConstraintEvaluation {
    fn add(&mut self, name: &str, value: &DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) {
        let violation = (0..value.len())
            .map(|i| {
                if value[i].is_finite() {
                    (lower[i] - value[i]).max(value[i] - upper[i]).max(0.0)
                } else {
                    f64::INFINITY
                }
            })
            .fold(0.0, f64::max);
        self.names.push(name.to_string());
        self.violations.push(violation);
        self.max_violation = self.max_violation.max(violation);
    }

    pub fn all_satisfied(&self, tol: f64) -> bool {
        self.max_violation <= tol
    }
}

/// The solved point stored on the program
#[derive(Debug, Clone)]
pub struct ProgramSolution {
    pub x: DVector<f64>,
    pub status: SolutionStatus,
    pub cost: f64,
}

/// Nonlinear program under construction
#[derive(Debug, Clone)]
pub struct MathematicalProgram {
    num_vars: usize,
    blocks: Vec<VariableBlock>,
    bounding_boxes: Vec<BoundingBoxConstraint>,
    linear_constraints: Vec<LinearConstraint>,
    generic_constraints: Vec<ConstraintBinding>,
    costs: Vec<CostBinding>,
    initial_guess: DVector<f64>,
    solution: Option<ProgramSolution>,
}

impl Default for MathematicalProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl MathematicalProgram {
    pub fn new() -> Self {
        Self {
            num_vars: 0,
            blocks: Vec::new(),
            bounding_boxes: Vec::new(),
            linear_constraints: Vec::new(),
            generic_constraints: Vec::new(),
            costs: Vec::new(),
            initial_guess: DVector::zeros(0),
            solution: None,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Allocate `count` new variables under `name`, initial guess zero
    pub fn new_variables(&mut self, count: usize, name: &str) -> DecisionVariables {
        let start = self.num_vars;
        self.num_vars += count;
        self.blocks.push(VariableBlock {
            name: name.to_string(),
            start,
            len: count,
        });
        self.initial_guess = self.initial_guess.clone().resize_vertically(self.num_vars, 0.0);
        DecisionVariables::range(start, count)
    }

    pub fn variable_blocks(&self) -> &[VariableBlock] {
        &self.blocks
    }

    /// Variables of the block created with `name`
    pub fn variables_named(&self, name: &str) -> Option<DecisionVariables> {
        self.blocks
            .iter()
            .find(|b| b.name == name)
            .map(|b| DecisionVariables::range(b.start, b.len))
    }

    fn check_vars(&self, vars: &DecisionVariables) -> Result<(), ProgramError> {
        match vars.indices().iter().find(|&&i| i >= self.num_vars) {
            Some(&index) => Err(ProgramError::VariableOutOfRange {
                index,
                num_vars: self.num_vars,
            }),
            None => Ok(()),
        }
    }

    pub fn add_bounding_box_constraint(
        &mut self,
        lower: DVector<f64>,
        upper: DVector<f64>,
        vars: &DecisionVariables,
    ) -> Result<(), ProgramError> {
        self.check_vars(vars)?;
        check_dim("bounding box lower", vars.len(), lower.len())?;
        check_dim("bounding box upper", vars.len(), upper.len())?;
        self.bounding_boxes.push(BoundingBoxConstraint {
            vars: vars.clone(),
            lower,
            upper,
        });
        Ok(())
    }

    pub fn add_linear_constraint(
        &mut self,
        a: DMatrix<f64>,
        lower: DVector<f64>,
        upper: DVector<f64>,
        vars: &DecisionVariables,
    ) -> Result<(), ProgramError> {
        self.check_vars(vars)?;
        check_dim("linear constraint columns", vars.len(), a.ncols())?;
        check_dim("linear constraint lower", a.nrows(), lower.len())?;
        check_dim("linear constraint upper", a.nrows(), upper.len())?;
        self.linear_constraints.push(LinearConstraint {
            a,
            lower,
            upper,
            vars: vars.clone(),
        });
        Ok(())
    }

    /// `A·z[vars] = b`
    pub fn add_linear_equality_constraint(
        &mut self,
        a: DMatrix<f64>,
        b: DVector<f64>,
        vars: &DecisionVariables,
    ) -> Result<(), ProgramError> {
        self.add_linear_constraint(a, b.clone(), b, vars)
    }

    pub fn add_constraint(
        &mut self,
        evaluator: Arc<dyn Evaluator>,
        lower: DVector<f64>,
        upper: DVector<f64>,
        vars: &DecisionVariables,
        description: impl Into<String>,
    ) -> Result<(), ProgramError> {
        self.check_vars(vars)?;
        check_dim("constraint inputs", evaluator.num_inputs(), vars.len())?;
        check_dim("constraint lower", evaluator.num_outputs(), lower.len())?;
        check_dim("constraint upper", evaluator.num_outputs(), upper.len())?;
        self.generic_constraints.push(ConstraintBinding {
            evaluator,
            lower,
            upper,
            vars: vars.clone(),
            description: description.into(),
        });
        Ok(())
    }

    /// `g(z[vars]) = 0`
    pub fn add_equality_constraint(
        &mut self,
        evaluator: Arc<dyn Evaluator>,
        vars: &DecisionVariables,
        description: impl Into<String>,
    ) -> Result<(), ProgramError> {
        let zeros = DVector::zeros(evaluator.num_outputs());
        self.add_constraint(evaluator, zeros.clone(), zeros, vars, description)
    }

    pub fn add_cost(
        &mut self,
        evaluator: Arc<dyn Evaluator>,
        vars: &DecisionVariables,
        description: impl Into<String>,
    ) -> Result<(), ProgramError> {
        self.check_vars(vars)?;
        check_dim("cost inputs", evaluator.num_inputs(), vars.len())?;
        check_dim("cost outputs", 1, evaluator.num_outputs())?;
        self.costs.push(CostBinding {
            evaluator,
            vars: vars.clone(),
            description: description.into(),
        });
        Ok(())
    }

    pub fn bounding_box_constraints(&self) -> &[BoundingBoxConstraint] {
        &self.bounding_boxes
    }

    pub fn linear_constraints(&self) -> &[LinearConstraint] {
        &self.linear_constraints
    }

    pub fn generic_constraints(&self) -> &[ConstraintBinding] {
        &self.generic_constraints
    }

    pub fn costs(&self) -> &[CostBinding] {
        &self.costs
    }

    pub fn set_initial_guess(&mut self, vars: &DecisionVariables, values: &DVector<f64>) -> Result<(), ProgramError> {
        self.check_vars(vars)?;
        check_dim("initial guess", vars.len(), values.len())?;
        for (k, &i) in vars.indices().iter().enumerate() {
            self.initial_guess[i] = values[k];
        }
        Ok(())
    }

    pub fn initial_guess(&self) -> &DVector<f64> {
        &self.initial_guess
    }

    /// Initial guess of a variable selection
    pub fn initial_guess_of(&self, vars: &DecisionVariables) -> DVector<f64> {
        vars.gather(&self.initial_guess)
    }

    /// Total cost at `z`
    pub fn evaluate_cost(&self, z: &DVector<f64>) -> Result<f64, ProgramError> {
        check_dim("program point", self.num_vars, z.len())?;
        let mut total = 0.0;
        for cost in &self.costs {
            total += cost.evaluator.eval(&cost.vars.gather(z))?[0];
        }
        Ok(total)
    }

    /// Total cost and its gradient at `z`
    pub fn evaluate_cost_gradient(&self, z: &DVector<f64>) -> Result<(f64, DVector<f64>), ProgramError> {
        check_dim("program point", self.num_vars, z.len())?;
        let mut total = 0.0;
        let mut gradient = DVector::zeros(self.num_vars);
        for cost in &self.costs {
            let (value, jac) = cost.evaluator.eval_with_jacobian(&cost.vars.gather(z))?;
            total += value[0];
            for (k, &i) in cost.vars.indices().iter().enumerate() {
                gradient[i] += jac[(0, k)];
            }
        }
        Ok((total, gradient))
    }

    /// Violation of every constraint at `z`
    pub fn evaluate_constraints(&self, z: &DVector<f64>) -> Result<ConstraintEvaluation, ProgramError> {
        check_dim("program point", self.num_vars, z.len())?;
        let mut eval = ConstraintEvaluation::default();
        for (k, bb) in self.bounding_boxes.iter().enumerate() {
            eval.add(&format!("bounding_box[{k}]"), &bb.vars.gather(z), &bb.lower, &bb.upper);
        }
        for (k, lin) in self.linear_constraints.iter().enumerate() {
            let value = &lin.a * lin.vars.gather(z);
            eval.add(&format!("linear[{k}]"), &value, &lin.lower, &lin.upper);
        }
        for binding in &self.generic_constraints {
            let value = binding.evaluate(z)?;
            eval.add(&binding.description, &value, &binding.lower, &binding.upper);
        }
        Ok(eval)
    }

    /// Whether `z` satisfies every constraint within `tol`
    pub fn check_satisfied(&self, z: &DVector<f64>, tol: f64) -> Result<bool, ProgramError> {
        Ok(self.evaluate_constraints(z)?.all_satisfied(tol))
    }

    /// Run `solver` and store its result
    pub fn solve(&mut self, solver: &dyn NlpSolver) -> Result<SolutionStatus, SolverError> {
        let result = solver.solve(self)?;
        self.set_solution(result)
    }

    /// Store a solver result
    pub fn set_solution(&mut self, result: SolverResult) -> Result<SolutionStatus, SolverError> {
        if result.x.len() != self.num_vars {
            return Err(SolverError::InvalidSolutionDimension {
                expected: self.num_vars,
                got: result.x.len(),
            });
        }
        if result.status.is_success() {
            info!(status = ?result.status, cost = result.cost, iterations = result.statistics.iterations, "NLP solved");
        } else {
            warn!(status = ?result.status, cost = result.cost, "NLP solver did not report success");
        }
        let status = result.status;
        self.solution = Some(ProgramSolution {
            x: result.x,
            status,
            cost: result.cost,
        });
        Ok(status)
    }

    pub fn solution(&self) -> Option<&ProgramSolution> {
        self.solution.as_ref()
    }

    /// Solved values of a variable selection
    pub fn get_solution(&self, vars: &DecisionVariables) -> Result<DVector<f64>, ProgramError> {
        let solution = self.solution.as_ref().ok_or(ProgramError::NoSolution)?;
        self.check_vars(vars)?;
        Ok(vars.gather(&solution.x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// f(x, y) = (x·y, sin x)
    struct ProductSine;

    impl GenericEvaluator for ProductSine {
        fn input_size(&self) -> usize {
            2
        }

        fn output_size(&self) -> usize {
            2
        }

        fn eval_generic<S: Scalar>(&self, x: &DVector<S>) -> Result<DVector<S>, EvaluationError> {
            Ok(DVector::from_vec(vec![x[0] * x[1], x[0].sin()]))
        }
    }

    /// f(x) = Σ x²
    struct SumOfSquares(usize);

    impl GenericEvaluator for SumOfSquares {
        fn input_size(&self) -> usize {
            self.0
        }

        fn output_size(&self) -> usize {
            1
        }

        fn eval_generic<S: Scalar>(&self, x: &DVector<S>) -> Result<DVector<S>, EvaluationError> {
            let mut total = S::zero();
            for i in 0..x.len() {
                total += x[i] * x[i];
            }
            Ok(DVector::from_element(1, total))
        }
    }

    struct Prescribed(DVector<f64>);

    impl NlpSolver for Prescribed {
        fn name(&self) -> &str {
            "prescribed"
        }

        fn solve(&self, program: &MathematicalProgram) -> Result<SolverResult, SolverError> {
            Ok(SolverResult {
                x: self.0.clone(),
                status: SolutionStatus::Success,
                cost: program.evaluate_cost(&self.0).map_err(|e| SolverError::SolveFailed(e.to_string()))?,
                statistics: Default::default(),
            })
        }
    }

    #[test]
    fn test_new_variables_are_contiguous() {
        let mut prog = MathematicalProgram::new();
        let a = prog.new_variables(3, "a");
        let b = prog.new_variables(2, "b");
        assert_eq!(a.indices(), &[0, 1, 2]);
        assert_eq!(b.indices(), &[3, 4]);
        assert_eq!(prog.num_vars(), 5);
        assert_eq!(prog.initial_guess().len(), 5);
        assert_eq!(prog.variables_named("b"), Some(b.clone()));

        let joined = DecisionVariables::concat(&[&b, &a.segment(1, 1)]);
        assert_eq!(joined.indices(), &[3, 4, 1]);
    }

    #[test]
    fn test_evaluator_jacobian() {
        let x = DVector::from_vec(vec![0.5, 2.0]);
        let (value, jac) = ProductSine.eval_with_jacobian(&x).unwrap();
        assert_relative_eq!(value[0], 1.0);
        assert_relative_eq!(jac[(0, 0)], 2.0);
        assert_relative_eq!(jac[(0, 1)], 0.5);
        assert_relative_eq!(jac[(1, 0)], 0.5_f64.cos());
        assert_relative_eq!(jac[(1, 1)], 0.0);
    }

    #[test]
    fn test_wrong_shapes_rejected() {
        let mut prog = MathematicalProgram::new();
        let x = prog.new_variables(2, "x");
        let err = prog.add_bounding_box_constraint(DVector::zeros(1), DVector::zeros(2), &x);
        assert!(matches!(err, Err(ProgramError::DimensionMismatch { .. })));

        let stray = DecisionVariables::from_indices(vec![7]);
        let err = prog.add_cost(Arc::new(SumOfSquares(1)), &stray, "stray");
        assert!(matches!(err, Err(ProgramError::VariableOutOfRange { index: 7, .. })));

        let err = prog.add_cost(Arc::new(ProductSine), &x, "vector cost");
        assert!(matches!(err, Err(ProgramError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_constraint_violation_report() {
        let mut prog = MathematicalProgram::new();
        let x = prog.new_variables(2, "x");
        prog.add_bounding_box_constraint(DVector::from_vec(vec![0.0, 0.0]), DVector::from_vec(vec![1.0, 1.0]), &x)
            .unwrap();
        prog.add_linear_equality_constraint(
            DMatrix::from_row_slice(1, 2, &[1.0, -1.0]),
            DVector::zeros(1),
            &x,
        )
        .unwrap();
        prog.add_equality_constraint(Arc::new(ProductSine), &x, "product").unwrap();

        let origin = DVector::zeros(2);
        assert!(prog.check_satisfied(&origin, 1e-12).unwrap());

        let z = DVector::from_vec(vec![0.5, 1.5]);
        let eval = prog.evaluate_constraints(&z).unwrap();
        assert_eq!(eval.names, vec!["bounding_box[0]", "linear[0]", "product"]);
        assert_relative_eq!(eval.violations[0], 0.5);
        assert_relative_eq!(eval.violations[1], 1.0);
        assert_relative_eq!(eval.violations[2], 0.75);
        assert_relative_eq!(eval.max_violation, 1.0);
    }

    #[test]
    fn test_non_finite_value_is_violated() {
        let mut prog = MathematicalProgram::new();
        let x = prog.new_variables(2, "x");
        prog.add_bounding_box_constraint(
            DVector::from_element(2, f64::NEG_INFINITY),
            DVector::from_element(2, f64::INFINITY),
            &x,
        )
        .unwrap();

        let eval = prog.evaluate_constraints(&DVector::from_vec(vec![0.0, f64::NAN])).unwrap();
        assert!(eval.violations[0].is_infinite());
        assert!(!eval.all_satisfied(1e-9));

        let eval = prog.evaluate_constraints(&DVector::from_vec(vec![f64::INFINITY, 0.0])).unwrap();
        assert!(!eval.all_satisfied(1e-9));
        assert!(prog.check_satisfied(&DVector::from_vec(vec![3.0, -4.0]), 0.0).unwrap());
    }

    #[test]
    fn test_cost_gradient() {
        let mut prog = MathematicalProgram::new();
        let x = prog.new_variables(3, "x");
        prog.add_cost(Arc::new(SumOfSquares(2)), &x.segment(1, 2), "tail").unwrap();
        let z = DVector::from_vec(vec![5.0, 1.0, -2.0]);
        let (cost, grad) = prog.evaluate_cost_gradient(&z).unwrap();
        assert_relative_eq!(cost, 5.0);
        assert_relative_eq!(grad[0], 0.0);
        assert_relative_eq!(grad[1], 2.0);
        assert_relative_eq!(grad[2], -4.0);
    }

    #[test]
    fn test_solve_stores_solution() {
        let mut prog = MathematicalProgram::new();
        let x = prog.new_variables(2, "x");
        assert!(matches!(prog.get_solution(&x), Err(ProgramError::NoSolution)));
        prog.add_cost(Arc::new(SumOfSquares(2)), &x, "norm").unwrap();

        let status = prog.solve(&Prescribed(DVector::from_vec(vec![1.0, 2.0]))).unwrap();
        assert_eq!(status, SolutionStatus::Success);
        assert_relative_eq!(prog.solution().unwrap().cost, 5.0);
        assert_relative_eq!(prog.get_solution(&x).unwrap()[1], 2.0);

        let wrong = prog.solve(&Prescribed(DVector::zeros(3)));
        assert!(matches!(wrong, Err(SolverError::InvalidSolutionDimension { expected: 2, got: 3 })));
    }

    #[test]
    fn test_initial_guess() {
        let mut prog = MathematicalProgram::new();
        let x = prog.new_variables(2, "x");
        let y = prog.new_variables(1, "y");
        prog.set_initial_guess(&y, &DVector::from_element(1, 3.0)).unwrap();
        assert_relative_eq!(prog.initial_guess_of(&y)[0], 3.0);
        assert_relative_eq!(prog.initial_guess_of(&x).norm(), 0.0);
    }
}
