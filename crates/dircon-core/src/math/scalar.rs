//! Numeric scalar abstraction and forward-mode dual numbers
//!
//! Every dynamics and constraint evaluation in this workspace is generic over
//! [`Scalar`], so a single implementation runs on plain `f64` and on [`Dual`]
//! numbers. A dual number carries one directional derivative:
//!
//! ```text
//! a + bε,   ε² = 0
//! f(a + bε) = f(a) + f'(a)·b ε
//! ```
//!
//! Seeding input `j` with `ε = 1` and reading the `ε` part of every output
//! yields column `j` of the exact Jacobian ([`jacobian`]).

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use nalgebra::{DMatrix, DVector};
use num_traits::{One, Zero};

/// Numeric type usable by the dynamics oracles and constraint evaluators.
pub trait Scalar:
    nalgebra::Scalar
    + Copy
    + Debug
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
{
    /// Lift a constant into the scalar type (zero derivative).
    fn from_f64(value: f64) -> Self;

    /// Real (value) part, with any derivative information discarded.
    fn re(&self) -> f64;

    fn sin(self) -> Self;

    fn cos(self) -> Self;

    fn sqrt(self) -> Self;
}

impl Scalar for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn re(&self) -> f64 {
        *self
    }

    fn sin(self) -> Self {
        f64::sin(self)
    }

    fn cos(self) -> Self {
        f64::cos(self)
    }

    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
}

/// Forward-mode dual number with a single derivative direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dual {
    /// Value part
    pub re: f64,
    /// Derivative part (coefficient of ε)
    pub eps: f64,
}

impl Dual {
    /// Create a dual number from value and derivative parts
    pub const fn new(re: f64, eps: f64) -> Self {
        Self { re, eps }
    }

    /// A constant (zero derivative)
    pub const fn constant(re: f64) -> Self {
        Self { re, eps: 0.0 }
    }

    /// An independent variable (unit derivative)
    pub const fn variable(re: f64) -> Self {
        Self { re, eps: 1.0 }
    }
}

impl Add for Dual {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.eps + rhs.eps)
    }
}

impl Sub for Dual {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.eps - rhs.eps)
    }
}

impl Mul for Dual {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(self.re * rhs.re, self.re * rhs.eps + self.eps * rhs.re)
    }
}

impl Div for Dual {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.re;
        Self::new(
            self.re * inv,
            (self.eps * rhs.re - self.re * rhs.eps) * inv * inv,
        )
    }
}

impl Neg for Dual {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.re, -self.eps)
    }
}

impl AddAssign for Dual {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Dual {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Dual {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl DivAssign for Dual {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Zero for Dual {
    fn zero() -> Self {
        Self::constant(0.0)
    }

    fn is_zero(&self) -> bool {
        self.re == 0.0 && self.eps == 0.0
    }
}

impl One for Dual {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl Scalar for Dual {
    fn from_f64(value: f64) -> Self {
        Self::constant(value)
    }

    fn re(&self) -> f64 {
        self.re
    }

    fn sin(self) -> Self {
        Self::new(self.re.sin(), self.eps * self.re.cos())
    }

    fn cos(self) -> Self {
        Self::new(self.re.cos(), -self.eps * self.re.sin())
    }

    fn sqrt(self) -> Self {
        let root = self.re.sqrt();
        Self::new(root, self.eps / (2.0 * root))
    }
}

/// Lift an `f64` vector to any scalar type.
pub fn lift<S: Scalar>(x: &DVector<f64>) -> DVector<S> {
    x.map(S::from_f64)
}

/// Lift an `f64` matrix to any scalar type.
pub fn lift_matrix<S: Scalar>(m: &DMatrix<f64>) -> DMatrix<S> {
    m.map(S::from_f64)
}

/// Drop derivative information.
pub fn discard_gradient<S: Scalar>(x: &DVector<S>) -> DVector<f64> {
    x.map(|v| v.re())
}

/// Value and exact Jacobian of `f` at `x`.
///
/// Evaluates `f` once per input direction with that direction seeded, so the
/// cost is `x.len()` evaluations (one evaluation when `x` is empty).
pub fn jacobian<F, E>(x: &DVector<f64>, f: F) -> Result<(DVector<f64>, DMatrix<f64>), E>
where
    F: Fn(&DVector<Dual>) -> Result<DVector<Dual>, E>,
{
    let n = x.len();
    if n == 0 {
        let y = f(&DVector::from_element(0, Dual::zero()))?;
        return Ok((y.map(|v| v.re), DMatrix::zeros(y.len(), 0)));
    }

    let mut value = DVector::zeros(0);
    let mut jac = DMatrix::zeros(0, n);
    for j in 0..n {
        let seeded = DVector::from_fn(n, |i, _| {
            if i == j {
                Dual::variable(x[i])
            } else {
                Dual::constant(x[i])
            }
        });
        let y = f(&seeded)?;
        if j == 0 {
            value = y.map(|v| v.re);
            jac = DMatrix::zeros(y.len(), n);
        }
        for i in 0..y.len() {
            jac[(i, j)] = y[i].eps;
        }
    }
    Ok((value, jac))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dual_product_rule() {
        let x = Dual::variable(3.0);
        let y = x * x * Dual::constant(2.0);
        assert_relative_eq!(y.re, 18.0);
        assert_relative_eq!(y.eps, 12.0);
    }

    #[test]
    fn test_dual_quotient_rule() {
        // d/dx (1 / x) = -1 / x²
        let x = Dual::variable(2.0);
        let y = Dual::one() / x;
        assert_relative_eq!(y.re, 0.5);
        assert_relative_eq!(y.eps, -0.25);
    }

    #[test]
    fn test_dual_trig() {
        let x = Dual::variable(0.3);
        let s = Scalar::sin(x);
        let c = Scalar::cos(x);
        assert_relative_eq!(s.eps, 0.3_f64.cos(), epsilon = 1e-14);
        assert_relative_eq!(c.eps, -0.3_f64.sin(), epsilon = 1e-14);
    }

    #[test]
    fn test_jacobian_matches_analytic() {
        // f(x, y) = [x·y, sin(x) + y²]
        let x = DVector::from_vec(vec![0.7, -1.2]);
        let (value, jac) = jacobian(&x, |v: &DVector<Dual>| -> Result<_, ()> {
            Ok(DVector::from_vec(vec![
                v[0] * v[1],
                Scalar::sin(v[0]) + v[1] * v[1],
            ]))
        })
        .unwrap();

        assert_relative_eq!(value[0], 0.7 * -1.2);
        assert_relative_eq!(jac[(0, 0)], -1.2);
        assert_relative_eq!(jac[(0, 1)], 0.7);
        assert_relative_eq!(jac[(1, 0)], 0.7_f64.cos(), epsilon = 1e-14);
        assert_relative_eq!(jac[(1, 1)], -2.4);
    }

    #[test]
    fn test_jacobian_of_constant_function() {
        let x = DVector::zeros(0);
        let (value, jac) = jacobian(&x, |_: &DVector<Dual>| -> Result<_, ()> {
            Ok(DVector::from_vec(vec![Dual::constant(4.0)]))
        })
        .unwrap();
        assert_eq!(value.len(), 1);
        assert_eq!(jac.shape(), (1, 0));
    }
}
