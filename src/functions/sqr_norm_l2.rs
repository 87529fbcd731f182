use std::fmt;
use std::marker::PhantomData;

use ndarray::prelude::*;
use ndarray::{Data, DataMut, Zip};
use ndarray_linalg::Scalar;
use num_traits::{One, Zero};

use super::{half, Properties, ProximableFunction, SmoothFunction};
use crate::error::{ProxError, Result};
use crate::param::{Gamma, Param};
use crate::solve::sqr_norm;

/// Squared Euclidean norm, optionally weighted
///
/// ```math
/// f(x) = \frac{\lambda}{2}\|x\|_2^2
/// \quad \text{or} \quad
/// f(x) = \frac12 \sum_i \lambda_i |x_i|^2
/// ```
/// for $`\lambda \geq 0`$ (elementwise). Entries of $`x`$ may be real or
/// complex, $`|\cdot|`$ is the modulus. The proximal map is
/// ```math
/// \mathrm{prox}_{\gamma f}(x)_i = \frac{x_i}{1 + \gamma_i \lambda_i}
/// ```
/// where a scalar $`\lambda`$ or $`\gamma`$ is broadcast.
#[derive(Clone, Debug, PartialEq)]
pub struct SqrNormL2<A: Scalar> {
    lambda: Param<A::Real>,
    phantom: PhantomData<A>,
}

impl<A: Scalar> SqrNormL2<A> {
    /// Fails with [`ProxError::NegativeWeight`] if a weight is negative or NaN.
    pub fn new(lambda: impl Into<Param<A::Real>>) -> Result<Self> {
        let lambda = lambda.into();
        if let Some(index) = lambda.position(|l| !(l >= A::Real::zero())) {
            return Err(ProxError::NegativeWeight { index });
        }
        Ok(SqrNormL2 {
            lambda,
            phantom: PhantomData,
        })
    }

    pub fn lambda(&self) -> &Param<A::Real> {
        &self.lambda
    }
}

impl<A: Scalar> Default for SqrNormL2<A> {
    /// $`\lambda = 1`$
    fn default() -> Self {
        SqrNormL2 {
            lambda: Param::Scalar(A::Real::one()),
            phantom: PhantomData,
        }
    }
}

impl<A: Scalar> Properties for SqrNormL2<A> {
    const CONVEX: bool = true;
    const SMOOTH: bool = true;
    const SEPARABLE: bool = true;
    const QUADRATIC: bool = true;

    fn is_strongly_convex(&self) -> bool {
        self.lambda.all(|l| l > A::Real::zero())
    }
}

impl<A: Scalar> ProximableFunction for SqrNormL2<A> {
    type Elem = A;
    type Real = A::Real;

    fn eval<S>(&self, x: &ArrayBase<S, Ix1>) -> A::Real
    where
        S: Data<Elem = A>,
    {
        match &self.lambda {
            Param::Scalar(l) => half(*l * sqr_norm(x)),
            Param::Array(l) => {
                self.lambda.assert_len(x.len(), "lambda");
                let weighted = Zip::from(l)
                    .and(x)
                    .fold(A::Real::zero(), |acc, &lk, &xk| acc + lk * Scalar::square(xk));
                half(weighted)
            }
        }
    }

    fn prox_mut<'g, S, G>(&self, y: &mut ArrayBase<S, Ix1>, gamma: G) -> A::Real
    where
        S: DataMut<Elem = A>,
        G: Into<Gamma<'g, A::Real>>,
    {
        let gamma = gamma.into();
        self.lambda.assert_len(y.len(), "lambda");
        gamma.assert_len(y.len());

        let one = A::Real::one();
        let weighted = match (&self.lambda, gamma) {
            (Param::Scalar(l), Gamma::Scalar(g)) => {
                let scale = one + g * *l;
                let sqr = y.iter_mut().fold(A::Real::zero(), |acc, yk| {
                    *yk = yk.div_real(scale);
                    acc + Scalar::square(*yk)
                });
                *l * sqr
            }
            (lambda, gamma) => {
                y.iter_mut()
                    .enumerate()
                    .fold(A::Real::zero(), |acc, (k, yk)| {
                        let lk = lambda.at(k);
                        *yk = yk.div_real(one + gamma.at(k) * lk);
                        acc + lk * Scalar::square(*yk)
                    })
            }
        };
        half(weighted)
    }

    fn prox_naive<'g, S, G>(&self, x: &ArrayBase<S, Ix1>, gamma: G) -> (Array1<A>, A::Real)
    where
        S: Data<Elem = A>,
        G: Into<Gamma<'g, A::Real>>,
    {
        let gamma = gamma.into();
        self.lambda.assert_len(x.len(), "lambda");
        gamma.assert_len(x.len());
        let denom = Array1::from_shape_fn(x.len(), |k| {
            A::Real::one() + gamma.at(k) * self.lambda.at(k)
        });
        let y = Zip::from(x)
            .and(&denom)
            .map_collect(|&xk, &dk| xk.div_real(dk));
        let fy = self.eval(&y);
        (y, fy)
    }
}

impl<A: Scalar> SmoothFunction for SqrNormL2<A> {
    fn gradient_mut<S>(&self, y: &mut ArrayBase<S, Ix1>) -> A::Real
    where
        S: DataMut<Elem = A>,
    {
        self.lambda.assert_len(y.len(), "lambda");
        // f(x) accumulates while y is overwritten with the gradient
        let weighted = y
            .iter_mut()
            .enumerate()
            .fold(A::Real::zero(), |acc, (k, yk)| {
                let lk = self.lambda.at(k);
                let fk = lk * Scalar::square(*yk);
                *yk = yk.mul_real(lk);
                acc + fk
            });
        half(weighted)
    }
}

impl<A: Scalar> fmt::Display for SqrNormL2<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lambda {
            Param::Scalar(l) => write!(
                f,
                "weighted squared Euclidean norm: x ↦ (λ/2)‖x‖², λ = {}",
                l
            ),
            lambda => write!(
                f,
                "weighted squared Euclidean norm: x ↦ (1/2)Σᵢ λᵢ|xᵢ|², λ = {}",
                lambda
            ),
        }
    }
}
