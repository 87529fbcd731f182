//! Iterative solvers for symmetric positive definite systems
//!
//! Used by proximal maps that lack a closed form: the prox of a quadratic
//! $`\frac12 x^TQx + q^Tx`$ with step $`\gamma`$ is the solution of
//! ```math
//! (Q + \gamma^{-1} I)\, y = \gamma^{-1} x - q
//! ```
//! which is symmetric positive definite whenever $`Q \succeq 0`$.
//! Only matrix-vector products are needed, see [`MatVec`](crate::linop::MatVec).
//!
//! Results are only as accurate as the stopping tolerance, and
//! non-convergence is reported, not raised. Callers that need more than
//! that should inspect the [`CgReport`].

mod cg;
pub use cg::*;

use num_traits::Float;

/// Stopping rule for conjugate gradient
///
/// Iterations stop once $`\|r_i\|_2 \leq \max(\mathrm{reltol}\,\|r_0\|_2, \mathrm{abstol})`$
/// or after `maxiter` iterations (ten times the system size when `None`,
/// rounding keeps CG from finishing in `n` steps).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgOptions<R> {
    pub reltol: R,
    pub abstol: R,
    pub maxiter: Option<usize>,
}

impl<R: Float> Default for CgOptions<R> {
    /// `reltol` = $`\sqrt{\epsilon}`$, `abstol` = 0, `maxiter` = 10 × system size
    fn default() -> Self {
        CgOptions {
            reltol: Float::sqrt(R::epsilon()),
            abstol: R::zero(),
            maxiter: None,
        }
    }
}

impl<R: Float> CgOptions<R> {
    #[must_use]
    pub fn with_reltol(mut self, reltol: R) -> Self {
        self.reltol = reltol;
        self
    }

    #[must_use]
    pub fn with_abstol(mut self, abstol: R) -> Self {
        self.abstol = abstol;
        self
    }

    #[must_use]
    pub fn with_maxiter(mut self, maxiter: usize) -> Self {
        self.maxiter = Some(maxiter);
        self
    }
}

/// Outcome of one conjugate gradient solve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CgReport<R> {
    pub iterations: usize,
    /// Final residual norm $`\|b - Ax\|_2`$ (as tracked by the recursion)
    pub residual: R,
    pub converged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builder() {
        let opts = CgOptions::<f64>::default()
            .with_reltol(1e-10)
            .with_abstol(1e-12)
            .with_maxiter(7);
        assert_eq!(opts.reltol, 1e-10);
        assert_eq!(opts.abstol, 1e-12);
        assert_eq!(opts.maxiter, Some(7));

        let opts = CgOptions::<f32>::default();
        assert_eq!(opts.reltol, f32::EPSILON.sqrt());
        assert_eq!(opts.maxiter, None);
    }
}
