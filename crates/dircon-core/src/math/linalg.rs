//! Dense linear solves over any [`Scalar`]
//!
//! nalgebra's decompositions require `ComplexField`, which dual numbers do not
//! implement, so the constrained-dynamics systems are solved with a small
//! partial-pivoting LU written against [`Scalar`]. Pivots are chosen on the
//! real part; derivative parts follow through the arithmetic.

use nalgebra::{DMatrix, DVector};

use super::Scalar;
use crate::error::EvaluationError;

/// Pivot magnitude below which a system is reported singular.
const SINGULAR_PIVOT: f64 = 1e-12;

/// Factor A = P·L·U in place. L (unit lower) and U (upper) share `a`;
/// `piv[k]` is the row swapped with row `k` at step `k`.
pub fn lu_factor_in_place<S: Scalar>(
    a: &mut DMatrix<S>,
    piv: &mut [usize],
) -> Result<(), EvaluationError> {
    let n = a.nrows();
    for k in 0..n {
        let mut max_val = a[(k, k)].re().abs();
        let mut max_row = k;
        for i in (k + 1)..n {
            let v = a[(i, k)].re().abs();
            if v > max_val {
                max_val = v;
                max_row = i;
            }
        }
        if max_val < SINGULAR_PIVOT {
            return Err(EvaluationError::Singular { size: n, column: k });
        }
        piv[k] = max_row;

        if max_row != k {
            a.swap_rows(k, max_row);
        }

        let pivot = a[(k, k)];
        for i in (k + 1)..n {
            let factor = a[(i, k)] / pivot;
            a[(i, k)] = factor;
            for j in (k + 1)..n {
                let update = factor * a[(k, j)];
                a[(i, j)] -= update;
            }
        }
    }
    Ok(())
}

/// Solve P·L·U·x = b with factors from [`lu_factor_in_place`]; `x` holds `b`
/// on entry and the solution on return.
pub fn lu_solve_factored<S: Scalar>(a: &DMatrix<S>, piv: &[usize], x: &mut DVector<S>) {
    let n = a.nrows();

    for k in 0..n {
        if piv[k] != k {
            x.swap_rows(k, piv[k]);
        }
    }

    // Forward substitution (L·y = Pb)
    for i in 1..n {
        for k in 0..i {
            let update = a[(i, k)] * x[k];
            x[i] -= update;
        }
    }

    // Back substitution (U·x = y)
    for i in (0..n).rev() {
        for k in (i + 1)..n {
            let update = a[(i, k)] * x[k];
            x[i] -= update;
        }
        x[i] /= a[(i, i)];
    }
}

/// Solve the square system `a · x = b`.
pub fn lu_solve<S: Scalar>(a: &DMatrix<S>, b: &DVector<S>) -> Result<DVector<S>, EvaluationError> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(EvaluationError::DimensionMismatch {
            context: "lu_solve columns",
            expected: n,
            got: a.ncols(),
        });
    }
    if b.len() != n {
        return Err(EvaluationError::DimensionMismatch {
            context: "lu_solve right-hand side",
            expected: n,
            got: b.len(),
        });
    }

    let mut lu = a.clone();
    let mut piv = vec![0; n];
    lu_factor_in_place(&mut lu, &mut piv)?;
    let mut x = b.clone();
    lu_solve_factored(&lu, &piv, &mut x);
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Dual;
    use approx::assert_relative_eq;

    #[test]
    fn test_lu_solve_needs_pivoting() {
        // Zero in the (0,0) position forces a row swap
        let a = DMatrix::from_row_slice(3, 3, &[
            0.0, 2.0, 1.0,
            1.0, 1.0, 0.0,
            3.0, 0.0, 1.0,
        ]);
        let x_true = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        let b = &a * &x_true;

        let x = lu_solve(&a, &b).unwrap();
        for i in 0..3 {
            assert_relative_eq!(x[i], x_true[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_lu_solve_singular() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        assert!(matches!(
            lu_solve(&a, &b),
            Err(EvaluationError::Singular { .. })
        ));
    }

    #[test]
    fn test_lu_solve_propagates_derivatives() {
        // x(t) = A⁻¹ b(t) with b = [t, 1]; dx/dt = A⁻¹ [1, 0]
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 2.0, 3.0]);
        let a_dual = a.map(Dual::constant);
        let b = DVector::from_vec(vec![Dual::variable(2.0), Dual::constant(1.0)]);

        let x = lu_solve(&a_dual, &b).unwrap();
        let dx = lu_solve(&a, &DVector::from_vec(vec![1.0, 0.0])).unwrap();
        assert_relative_eq!(x[0].eps, dx[0], epsilon = 1e-12);
        assert_relative_eq!(x[1].eps, dx[1], epsilon = 1e-12);
    }
}
