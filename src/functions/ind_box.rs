use std::fmt;

use ndarray::prelude::*;
use ndarray::{Data, DataMut};
use ndarray_linalg::Scalar;
use num_traits::Float;

use super::{Properties, ProximableFunction};
use crate::error::{ProxError, Result};
use crate::param::{Gamma, Param};

/// Indicator of a box
///
/// ```math
/// f(x) = \begin{cases}
///     0 & \text{if } l_i \leq x_i \leq u_i \text{ for all } i \\
///     +\infty & \text{otherwise}
/// \end{cases}
/// ```
/// Bounds are scalars (broadcast) or arrays, and may be infinite for
/// one-sided boxes. The proximal map is the projection
/// $`y_i = \min(\max(x_i, l_i), u_i)`$, whatever the step size.
#[derive(Clone, Debug, PartialEq)]
pub struct IndBox<R> {
    lb: Param<R>,
    ub: Param<R>,
}

/// Indicator of an $`L_\infty`$ ball, built with [`IndBox::ball_linf`]
pub type IndBallLinf<R> = IndBox<R>;

impl<R: Float> IndBox<R> {
    /// Fails if a bound is NaN ([`ProxError::InvalidBound`]), if both bounds
    /// are arrays of different lengths ([`ProxError::ShapeMismatch`]), or if
    /// `lb > ub` for some coordinate ([`ProxError::EmptyBox`]).
    pub fn new(lb: impl Into<Param<R>>, ub: impl Into<Param<R>>) -> Result<Self> {
        let (lb, ub) = (lb.into(), ub.into());
        if let Some(index) = lb.position(Float::is_nan).or_else(|| ub.position(Float::is_nan)) {
            return Err(ProxError::InvalidBound { index });
        }
        if let (Some(nl), Some(nu)) = (lb.len(), ub.len()) {
            if nl != nu {
                return Err(ProxError::ShapeMismatch { lb: nl, ub: nu });
            }
        }
        let n = lb.len().or_else(|| ub.len()).unwrap_or(1);
        if let Some(index) = (0..n).find(|&k| lb.at(k) > ub.at(k)) {
            return Err(ProxError::EmptyBox { index });
        }
        Ok(IndBox { lb, ub })
    }

    /// Indicator of the $`L_\infty`$ ball of radius `r`,
    /// i.e. the box $`[-r, r]^n`$.
    ///
    /// Fails with [`ProxError::NonPositiveRadius`] unless `r > 0`.
    pub fn ball_linf(r: R) -> Result<Self> {
        if !(r > R::zero()) {
            return Err(ProxError::NonPositiveRadius);
        }
        IndBox::new(Param::Scalar(-r), Param::Scalar(r))
    }

    pub fn lb(&self) -> &Param<R> {
        &self.lb
    }

    pub fn ub(&self) -> &Param<R> {
        &self.ub
    }

    /// Number of coordinates fixed by array bounds, `None` if both are scalars
    pub fn dim(&self) -> Option<usize> {
        self.lb.len().or_else(|| self.ub.len())
    }

    #[inline]
    fn assert_len(&self, n: usize) {
        self.lb.assert_len(n, "lb");
        self.ub.assert_len(n, "ub");
    }
}

impl<R: Float> Default for IndBox<R> {
    /// The unit $`L_\infty`$ ball
    fn default() -> Self {
        IndBox {
            lb: Param::Scalar(-R::one()),
            ub: Param::Scalar(R::one()),
        }
    }
}

impl<R: Float> Properties for IndBox<R> {
    const CONVEX: bool = true;
    const SEPARABLE: bool = true;
    const SET_INDICATOR: bool = true;

    /// Every coordinate is unbounded on at least one side.
    fn is_cone(&self) -> bool {
        let n = self.dim().unwrap_or(1);
        (0..n).all(|k| self.lb.at(k) == R::neg_infinity() || self.ub.at(k) == R::infinity())
    }
}

impl<R> ProximableFunction for IndBox<R>
where
    R: Float + Scalar<Real = R>,
{
    type Elem = R;
    type Real = R;

    fn eval<S>(&self, x: &ArrayBase<S, Ix1>) -> R
    where
        S: Data<Elem = R>,
    {
        self.assert_len(x.len());
        for (k, &xk) in x.iter().enumerate() {
            if xk < self.lb.at(k) || xk > self.ub.at(k) {
                return R::infinity();
            }
        }
        R::zero()
    }

    /// The step size only has its length checked.
    fn prox_mut<'g, S, G>(&self, y: &mut ArrayBase<S, Ix1>, gamma: G) -> R
    where
        S: DataMut<Elem = R>,
        G: Into<Gamma<'g, R>>,
    {
        self.assert_len(y.len());
        gamma.into().assert_len(y.len());
        for (k, yk) in y.iter_mut().enumerate() {
            let (l, u) = (self.lb.at(k), self.ub.at(k));
            if *yk < l {
                *yk = l;
            } else if *yk > u {
                *yk = u;
            }
        }
        R::zero()
    }

    fn prox_naive<'g, S, G>(&self, x: &ArrayBase<S, Ix1>, gamma: G) -> (Array1<R>, R)
    where
        S: Data<Elem = R>,
        G: Into<Gamma<'g, R>>,
    {
        self.assert_len(x.len());
        gamma.into().assert_len(x.len());
        let y = Array1::from_shape_fn(x.len(), |k| {
            Float::min(self.ub.at(k), Float::max(self.lb.at(k), x[k]))
        });
        (y, R::zero())
    }
}

impl<R: Float + fmt::Display> fmt::Display for IndBox<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "indicator of a box: x ↦ 0 if lb ≤ x ≤ ub, +∞ otherwise, lb = {}, ub = {}",
            self.lb, self.ub
        )
    }
}
