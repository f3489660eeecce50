//! Reconstructed trajectories
//!
//! Continuous-time trajectories rebuilt from a solved transcription, tagged
//! with the solve status they came from. Only a trajectory reconstructed
//! from a solution the solver certified as successful is authoritative.

use nalgebra::DVector;

use dircon_core::math::PiecewisePolynomial;

use crate::solver::SolutionStatus;

/// A trajectory rebuilt from a solution
#[derive(Debug, Clone)]
pub struct ReconstructedTrajectory {
    /// Interpolating polynomial
    pub polynomial: PiecewisePolynomial,
    /// Knot times the polynomial interpolates [s]
    pub knot_times: Vec<f64>,
    /// Status of the solve this came from
    pub status: SolutionStatus,
    /// Whether the solver certified the underlying solution
    pub is_authoritative: bool,
}

impl ReconstructedTrajectory {
    pub fn new(polynomial: PiecewisePolynomial, knot_times: Vec<f64>, status: SolutionStatus) -> Self {
        Self {
            polynomial,
            knot_times,
            status,
            is_authoritative: status.is_success(),
        }
    }

    /// Value at time `t`, clamped to the time span
    pub fn value(&self, t: f64) -> DVector<f64> {
        self.polynomial.value(t)
    }

    /// Time derivative at `t`
    pub fn derivative(&self, t: f64) -> DVector<f64> {
        self.polynomial.derivative(t)
    }

    pub fn start_time(&self) -> f64 {
        self.polynomial.start_time()
    }

    pub fn end_time(&self) -> f64 {
        self.polynomial.end_time()
    }

    /// Total duration [s]
    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// Sample at `n` evenly spaced times over the span (both ends included)
    pub fn sample_uniform(&self, n: usize) -> Vec<(f64, DVector<f64>)> {
        if n < 2 {
            return vec![(self.start_time(), self.value(self.start_time()))];
        }
        let dt = self.duration() / (n - 1) as f64;
        (0..n)
            .map(|k| {
                let t = self.start_time() + k as f64 * dt;
                (t, self.value(t))
            })
            .collect()
    }
}
