//! Private Module

#![allow(non_snake_case)]

use super::{CgOptions, CgReport};
use crate::linop::MatVec;
use ndarray::prelude::*;
use ndarray::{Data, DataMut, Zip};
use ndarray_linalg::Scalar;
use num_traits::{Float, Zero};

/// Scratch vectors for [`cg_mut`], sized to the system
#[derive(Clone, Debug)]
pub struct CgWorkspace<S> {
    r: Array1<S>,
    p: Array1<S>,
    Ap: Array1<S>,
}

impl<S: Scalar> CgWorkspace<S> {
    pub fn new(n: usize) -> Self {
        CgWorkspace {
            r: Array1::zeros(n),
            p: Array1::zeros(n),
            Ap: Array1::zeros(n),
        }
    }

    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

/// $`\|v\|_2^2`$
#[inline]
pub(crate) fn sqr_norm<S, Sv>(v: &ArrayBase<Sv, Ix1>) -> S::Real
where
    S: Scalar,
    Sv: Data<Elem = S>,
{
    v.iter()
        .fold(S::Real::zero(), |acc, &vk| acc + Scalar::square(vk))
}

/// $`\mathrm{Re}\langle u, v \rangle`$
#[inline]
pub(crate) fn real_dot<S, Su, Sv>(u: &ArrayBase<Su, Ix1>, v: &ArrayBase<Sv, Ix1>) -> S::Real
where
    S: Scalar,
    Su: Data<Elem = S>,
    Sv: Data<Elem = S>,
{
    Zip::from(u)
        .and(v)
        .fold(S::Real::zero(), |acc, &uk, &vk| acc + (uk.conj() * vk).re())
}

/// Conjugate Gradient for Symmetric Positive Definite Systems
///
/// Solves $`Ax = b`$ in place, starting from the current content of `x`.
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// \alpha_i &= \frac{\|r_i\|_2^2}{\langle p_i, Ap_i \rangle} \\
/// x_{i+1} &= x_i + \alpha_i p_i \\
/// r_{i+1} &= r_i - \alpha_i Ap_i \\
/// p_{i+1} &= r_{i+1} + \frac{\|r_{i+1}\|_2^2}{\|r_i\|_2^2} p_i
/// \end{aligned}
/// ```
/// with $`r_0 = p_0 = b - Ax_0`$.
///
/// Parameters
/// ----------
/// - __A:__         symmetric (Hermitian) positive definite operator  
/// - __b:__         right hand side  
/// - __x:__         initial guess, overwritten with the solution  
/// - __ws:__        scratch vectors, same size as `b`  
/// - __opts:__      stopping rule  
///
/// Positive definiteness is not checked. If a direction with
/// $`\langle p, Ap \rangle \leq 0`$ shows up, the iteration stops
/// and the report says it did not converge.
///
/// # Panics
/// If `A`, `b`, `x` and `ws` do not all have the same size.
pub fn cg_mut<S, T, Sb, Sx>(
    A: &T,
    b: &ArrayBase<Sb, Ix1>,
    x: &mut ArrayBase<Sx, Ix1>,
    ws: &mut CgWorkspace<S>,
    opts: &CgOptions<S::Real>,
) -> CgReport<S::Real>
where
    S: Scalar,
    T: MatVec<Elem = S>,
    Sb: Data<Elem = S>,
    Sx: DataMut<Elem = S>,
{
    let n = b.len();
    assert_eq!(A.dims(), (n, n), "operator size does not match right hand side");
    assert_eq!(x.len(), n, "initial guess size does not match right hand side");
    assert_eq!(ws.len(), n, "workspace size does not match right hand side");
    let CgWorkspace { r, p, Ap } = ws;

    // r = b - Ax
    A.apply_to(&*x, Ap);
    Zip::from(&mut *r)
        .and(b)
        .and(&*Ap)
        .for_each(|rk, &bk, &Apk| *rk = bk - Apk);
    p.assign(&*r);

    let mut rs = sqr_norm(&*r);
    let tol = Float::max(opts.reltol * Float::sqrt(rs), opts.abstol);
    let maxiter = opts.maxiter.unwrap_or(10 * n);

    let mut iterations = 0;
    while iterations < maxiter && Float::sqrt(rs) > tol {
        A.apply_to(&*p, Ap);
        let pAp = real_dot(&*p, &*Ap);
        if pAp <= S::Real::zero() {
            tracing::warn!(iterations, "non-positive curvature, operator is not positive definite");
            break;
        }
        let alpha = rs / pAp;
        Zip::from(&mut *x)
            .and(&*p)
            .for_each(|xk, &pk| *xk = *xk + pk.mul_real(alpha));
        Zip::from(&mut *r)
            .and(&*Ap)
            .for_each(|rk, &Apk| *rk = *rk - Apk.mul_real(alpha));

        let rs_new = sqr_norm(&*r);
        let beta = rs_new / rs;
        Zip::from(&mut *p)
            .and(&*r)
            .for_each(|pk, &rk| *pk = rk + pk.mul_real(beta));
        rs = rs_new;
        iterations += 1;
    }

    let residual = Float::sqrt(rs);
    let converged = residual <= tol;
    if converged {
        tracing::debug!(iterations, residual = %residual, "conjugate gradient converged");
    } else {
        tracing::warn!(
            iterations,
            residual = %residual,
            tolerance = %tol,
            "conjugate gradient stopped before converging"
        );
    }
    CgReport {
        iterations,
        residual,
        converged,
    }
}

/// Conjugate Gradient, allocating version of [`cg_mut`] starting from zero.
pub fn cg<S, T, Sb>(
    A: &T,
    b: &ArrayBase<Sb, Ix1>,
    opts: &CgOptions<S::Real>,
) -> (Array1<S>, CgReport<S::Real>)
where
    S: Scalar,
    T: MatVec<Elem = S>,
    Sb: Data<Elem = S>,
{
    let mut x = Array1::zeros(b.len());
    let mut ws = CgWorkspace::new(b.len());
    let report = cg_mut(A, b, &mut x, &mut ws, opts);
    (x, report)
}
