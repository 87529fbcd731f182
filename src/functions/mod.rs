//! Proximable Functions
//!
//! Building blocks for first order methods such as proximal gradient,
//! ADMM or primal-dual splitting. Each function $`f`$ can be evaluated
//! and has a proximal map
//! ```math
//! \mathrm{prox}_{\gamma f}(x) = \mathrm{arg}\!\min_u f(u) + \frac{1}{2\gamma}\|u - x\|_2^2
//! ```
//! computed in closed form when possible. Smooth functions also provide
//! their gradient through [`SmoothFunction`].
//!
//! All maps come in three flavours, following `LinearOperator`:
//! in place (`prox_mut`), into a separate buffer (`prox_into`) and
//! allocating (`prox`). They return the function value at the output
//! point: $`f(\mathrm{prox}_{\gamma f}(x))`$ for the prox,
//! $`f(x)`$ for the gradient.
//!
//! Step sizes are a positive scalar or one positive value per
//! coordinate, see [`Gamma`].

mod ind_box;
pub use ind_box::*;

mod quadratic_iterative;
pub use quadratic_iterative::*;

mod sqr_norm_l2;
pub use sqr_norm_l2::*;

use ndarray::prelude::*;
use ndarray::{Data, DataMut};
use ndarray_linalg::Scalar;
use num_traits::Float;

use crate::param::Gamma;

/// Structural properties consumed by solvers to pick algorithm variants
///
/// Properties that depend only on the type are associated constants;
/// the predicates default to them and may be refined per instance.
pub trait Properties {
    const CONVEX: bool = false;
    const SMOOTH: bool = false;
    const SEPARABLE: bool = false;
    const QUADRATIC: bool = false;
    const SET_INDICATOR: bool = false;
    /// False when the prox is computed by an iterative method
    const PROX_ACCURATE: bool = true;

    fn is_convex(&self) -> bool {
        Self::CONVEX
    }

    fn is_smooth(&self) -> bool {
        Self::SMOOTH
    }

    fn is_separable(&self) -> bool {
        Self::SEPARABLE
    }

    fn is_quadratic(&self) -> bool {
        Self::QUADRATIC
    }

    fn is_set_indicator(&self) -> bool {
        Self::SET_INDICATOR
    }

    fn is_prox_accurate(&self) -> bool {
        Self::PROX_ACCURATE
    }

    fn is_strongly_convex(&self) -> bool {
        false
    }

    /// Indicator of a cone
    fn is_cone(&self) -> bool {
        false
    }
}

/// A function with a computable proximal map
pub trait ProximableFunction {
    type Elem: Scalar<Real = Self::Real>;
    type Real: Float + 'static;

    /// $`f(x)`$
    fn eval<S>(&self, x: &ArrayBase<S, Ix1>) -> Self::Real
    where
        S: Data<Elem = Self::Elem>;

    /// Proximal map in place: `y` holds $`x`$ on entry and
    /// $`\mathrm{prox}_{\gamma f}(x)`$ on exit. Returns $`f`$ at the new `y`.
    fn prox_mut<'g, S, G>(&self, y: &mut ArrayBase<S, Ix1>, gamma: G) -> Self::Real
    where
        S: DataMut<Elem = Self::Elem>,
        G: Into<Gamma<'g, Self::Real>>;

    /// Proximal map of `x` written into `y`
    fn prox_into<'g, Sx, Sy, G>(
        &self,
        x: &ArrayBase<Sx, Ix1>,
        y: &mut ArrayBase<Sy, Ix1>,
        gamma: G,
    ) -> Self::Real
    where
        Sx: Data<Elem = Self::Elem>,
        Sy: DataMut<Elem = Self::Elem>,
        G: Into<Gamma<'g, Self::Real>>,
    {
        y.assign(x);
        self.prox_mut(y, gamma)
    }

    /// Proximal map of `x`, allocating the output
    fn prox<'g, S, G>(&self, x: &ArrayBase<S, Ix1>, gamma: G) -> (Array1<Self::Elem>, Self::Real)
    where
        S: Data<Elem = Self::Elem>,
        G: Into<Gamma<'g, Self::Real>>,
    {
        let mut y = x.to_owned();
        let fy = self.prox_mut(&mut y, gamma);
        (y, fy)
    }

    /// Reference implementation of the proximal map, written for clarity
    /// rather than speed. Used to cross check [`prox_mut`](Self::prox_mut).
    fn prox_naive<'g, S, G>(&self, x: &ArrayBase<S, Ix1>, gamma: G) -> (Array1<Self::Elem>, Self::Real)
    where
        S: Data<Elem = Self::Elem>,
        G: Into<Gamma<'g, Self::Real>>;
}

/// A differentiable function
pub trait SmoothFunction: ProximableFunction {
    /// Gradient in place: `y` holds $`x`$ on entry and $`\nabla f(x)`$
    /// on exit. Returns $`f(x)`$.
    fn gradient_mut<S>(&self, y: &mut ArrayBase<S, Ix1>) -> Self::Real
    where
        S: DataMut<Elem = Self::Elem>;

    /// Gradient at `x` written into `y`, returns $`f(x)`$
    fn gradient_into<Sx, Sy>(&self, x: &ArrayBase<Sx, Ix1>, y: &mut ArrayBase<Sy, Ix1>) -> Self::Real
    where
        Sx: Data<Elem = Self::Elem>,
        Sy: DataMut<Elem = Self::Elem>,
    {
        y.assign(x);
        self.gradient_mut(y)
    }

    /// Gradient at `x`, allocating the output
    fn gradient<S>(&self, x: &ArrayBase<S, Ix1>) -> (Array1<Self::Elem>, Self::Real)
    where
        S: Data<Elem = Self::Elem>,
    {
        let mut y = x.to_owned();
        let fx = self.gradient_mut(&mut y);
        (y, fx)
    }
}

#[inline]
fn half<R: Float>(v: R) -> R {
    v / (R::one() + R::one())
}
