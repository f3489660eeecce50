//! Piecewise polynomial trajectories
//!
//! Each segment `k` covers `[t_k, t_{k+1}]` and stores vector coefficients in
//! local time τ = t − t_k:
//!
//! ```text
//! p_k(τ) = c₀ + c₁τ + c₂τ² + c₃τ³
//! ```
//!
//! Evaluation at a break point uses the segment that starts there (right
//! continuity), except at the final time, which belongs to the last segment.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// A vector-valued piecewise polynomial in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PiecewisePolynomial {
    /// Break times, one more than the number of segments
    breaks: Vec<f64>,
    /// Coefficients per segment, lowest order first
    coefficients: Vec<Vec<DVector<f64>>>,
    /// Output dimension
    rows: usize,
}

impl PiecewisePolynomial {
    /// A trajectory with no segments
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the trajectory has no segments
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Output dimension
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of segments
    pub fn num_segments(&self) -> usize {
        self.coefficients.len()
    }

    /// Break times
    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    pub fn start_time(&self) -> f64 {
        self.breaks.first().copied().unwrap_or(0.0)
    }

    pub fn end_time(&self) -> f64 {
        self.breaks.last().copied().unwrap_or(0.0)
    }

    /// Piecewise-constant trajectory holding `samples[k]` on `[t_k, t_{k+1})`
    pub fn zero_order_hold(times: &[f64], samples: &[DVector<f64>]) -> Self {
        Self::build(times, samples, |k, _dt| vec![samples[k].clone()])
    }

    /// Piecewise-linear interpolation of `samples`
    pub fn first_order_hold(times: &[f64], samples: &[DVector<f64>]) -> Self {
        Self::build(times, samples, |k, dt| {
            let slope = (&samples[k + 1] - &samples[k]) / dt;
            vec![samples[k].clone(), slope]
        })
    }

    /// Cubic Hermite interpolation matching `samples` and `derivatives` at
    /// every break
    pub fn cubic_hermite(
        times: &[f64],
        samples: &[DVector<f64>],
        derivatives: &[DVector<f64>],
    ) -> Self {
        assert_eq!(samples.len(), derivatives.len(), "one derivative per sample");
        Self::build(times, samples, |k, dt| {
            let p0 = &samples[k];
            let p1 = &samples[k + 1];
            let d0 = &derivatives[k];
            let d1 = &derivatives[k + 1];
            let delta = p1 - p0;
            let c2 = (&delta * 3.0 / (dt * dt)) - (d0 * 2.0 + d1) / dt;
            let c3 = (&delta * -2.0 / (dt * dt * dt)) + (d0 + d1) / (dt * dt);
            vec![p0.clone(), d0.clone(), c2, c3]
        })
    }

    fn build<F>(times: &[f64], samples: &[DVector<f64>], segment: F) -> Self
    where
        F: Fn(usize, f64) -> Vec<DVector<f64>>,
    {
        assert_eq!(times.len(), samples.len(), "one sample per break");
        if times.len() < 2 {
            return Self::empty();
        }
        let rows = samples[0].len();
        let coefficients = (0..times.len() - 1)
            .map(|k| {
                let dt = times[k + 1] - times[k];
                assert!(dt > 0.0, "break times must be strictly increasing");
                segment(k, dt)
            })
            .collect();

        Self {
            breaks: times.to_vec(),
            coefficients,
            rows,
        }
    }

    /// Append `other`, which must start where `self` ends.
    pub fn concatenate(&mut self, other: &PiecewisePolynomial) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        assert_eq!(self.rows, other.rows, "row count mismatch");
        assert!(
            (self.end_time() - other.start_time()).abs() < 1e-10,
            "trajectories must be contiguous in time"
        );
        self.breaks.extend_from_slice(&other.breaks[1..]);
        self.coefficients.extend(other.coefficients.iter().cloned());
    }

    /// Find the segment containing `t`, clamped to the trajectory
    fn segment_index(&self, t: f64) -> usize {
        let last = self.coefficients.len() - 1;
        if t <= self.start_time() {
            return 0;
        }
        if t >= self.end_time() {
            return last;
        }
        self.breaks
            .iter()
            .position(|&time| time > t)
            .unwrap_or(self.breaks.len() - 1)
            .saturating_sub(1)
            .min(last)
    }

    /// Value at time `t` (clamped to the time span)
    pub fn value(&self, t: f64) -> DVector<f64> {
        self.derivative_value(t, 0)
    }

    /// First derivative at time `t`
    pub fn derivative(&self, t: f64) -> DVector<f64> {
        self.derivative_value(t, 1)
    }

    /// `order`-th time derivative at time `t`
    pub fn derivative_value(&self, t: f64, order: usize) -> DVector<f64> {
        if self.is_empty() {
            return DVector::zeros(self.rows);
        }
        let k = self.segment_index(t);
        let tau = (t.clamp(self.start_time(), self.end_time()) - self.breaks[k])
            .max(0.0);

        let mut out = DVector::zeros(self.rows);
        for (power, c) in self.coefficients[k].iter().enumerate().skip(order) {
            // d^order/dτ^order τ^power = power!/(power-order)! τ^(power-order)
            let falling: f64 = ((power - order + 1)..=power).map(|p| p as f64).product();
            out += c * (falling * tau.powi((power - order) as i32));
        }
        out
    }
}
