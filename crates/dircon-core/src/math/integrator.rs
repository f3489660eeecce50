//! Numerical integration
//!
//! Fixed-step Runge-Kutta used to roll out reference trajectories of the
//! constrained dynamics, e.g. for seeding a transcription or checking the
//! collocation residual against a finely integrated solution.

use nalgebra::DVector;

/// RK4 step for dx/dt = f(t, x).
///
/// # Arguments
/// * `x` - Current state
/// * `t` - Current time
/// * `dt` - Time step
/// * `f` - Derivative function f(t, x) -> dx/dt
pub fn rk4<F>(x: &DVector<f64>, t: f64, dt: f64, f: F) -> DVector<f64>
where
    F: Fn(f64, &DVector<f64>) -> DVector<f64>,
{
    let k1 = f(t, x);
    let k2 = f(t + dt / 2.0, &(x + &k1 * (dt / 2.0)));
    let k3 = f(t + dt / 2.0, &(x + &k2 * (dt / 2.0)));
    let k4 = f(t + dt, &(x + &k3 * dt));

    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// Fallible RK4 step, for derivative functions that can reject their input.
pub fn try_rk4<F, E>(x: &DVector<f64>, t: f64, dt: f64, f: F) -> Result<DVector<f64>, E>
where
    F: Fn(f64, &DVector<f64>) -> Result<DVector<f64>, E>,
{
    let k1 = f(t, x)?;
    let k2 = f(t + dt / 2.0, &(x + &k1 * (dt / 2.0)))?;
    let k3 = f(t + dt / 2.0, &(x + &k2 * (dt / 2.0)))?;
    let k4 = f(t + dt, &(x + &k3 * dt))?;

    Ok(x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_rk4_exponential_decay() {
        // dx/dt = -x, x(0) = 1  ->  x(1) = e^-1
        let dt = 0.01;
        let mut x = DVector::from_vec(vec![1.0]);
        let mut t = 0.0;

        for _ in 0..100 {
            x = rk4(&x, t, dt, |_t, x| -x.clone());
            t += dt;
        }

        assert_relative_eq!(x[0], (-1.0_f64).exp(), epsilon = 1e-6);
    }

    #[test]
    fn test_rk4_harmonic_oscillator() {
        // x'' = -x with x(0) = 1, v(0) = 0: at t = π/2, x ≈ 0 and v ≈ -1
        let dt = 0.001;
        let mut x = DVector::from_vec(vec![1.0, 0.0]);
        let mut t = 0.0;

        let steps = (PI / 2.0 / dt) as usize;
        for _ in 0..steps {
            x = rk4(&x, t, dt, |_t, s| DVector::from_vec(vec![s[1], -s[0]]));
            t += dt;
        }

        assert_relative_eq!(x[0], 0.0, epsilon = 1e-3);
        assert_relative_eq!(x[1], -1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_try_rk4_propagates_error() {
        let x = DVector::from_vec(vec![1.0]);
        let result: Result<_, &str> = try_rk4(&x, 0.0, 0.1, |_t, _x| Err("bad state"));
        assert_eq!(result.unwrap_err(), "bad state");
    }
}
