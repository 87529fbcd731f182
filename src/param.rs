//! Scalar-or-array parameters and step sizes
//!
//! Function weights, box bounds and prox step sizes may each be a single
//! scalar broadcast over every coordinate, or one value per coordinate.
//! Both shapes are read through the same per-coordinate accessor, so a
//! formula is written once and covers every combination:
//! ```
//! # extern crate intel_mkl_src;
//! use ndarray::array;
//! use ndarray_prox::param::{Gamma, Param};
//!
//! let lambda = Param::from(2.0_f64);
//! let steps = array![1.0, 0.5];
//! let gamma = Gamma::from(&steps);
//! assert_eq!(lambda.at(1) * gamma.at(1), 1.0);
//! ```

use std::fmt;

use ndarray::prelude::*;

/// A function parameter: one value for all coordinates, or one per coordinate.
#[derive(Clone, Debug, PartialEq)]
pub enum Param<R> {
    /// Broadcast over every coordinate
    Scalar(R),
    /// One value per coordinate
    Array(Array1<R>),
}

impl<R: Copy> Param<R> {
    /// Value seen by coordinate `k`
    #[inline]
    pub fn at(&self, k: usize) -> R {
        match self {
            Param::Scalar(v) => *v,
            Param::Array(a) => a[k],
        }
    }

    /// Number of entries, `None` for a broadcast scalar
    pub fn len(&self) -> Option<usize> {
        match self {
            Param::Scalar(_) => None,
            Param::Array(a) => Some(a.len()),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Param::Scalar(_))
    }

    /// Index of the first entry satisfying `pred` (0 for a scalar)
    pub fn position(&self, mut pred: impl FnMut(R) -> bool) -> Option<usize> {
        match self {
            Param::Scalar(v) => {
                if pred(*v) {
                    Some(0)
                } else {
                    None
                }
            }
            Param::Array(a) => a.iter().position(|&v| pred(v)),
        }
    }

    /// True if every entry satisfies `pred`
    pub fn all(&self, mut pred: impl FnMut(R) -> bool) -> bool {
        self.position(|v| !pred(v)).is_none()
    }

    /// Panics if this is an array whose length is not `n`.
    #[inline]
    pub(crate) fn assert_len(&self, n: usize, name: &str) {
        if let Param::Array(a) = self {
            assert_eq!(a.len(), n, "{} has {} entries, input has {}", name, a.len(), n);
        }
    }
}

macro_rules! impl_param_from_float {
    ($($float:ty),*) => {
        $(
            impl From<$float> for Param<$float> {
                fn from(v: $float) -> Self {
                    Param::Scalar(v)
                }
            }

            impl<'a> From<$float> for Gamma<'a, $float> {
                fn from(v: $float) -> Self {
                    Gamma::Scalar(v)
                }
            }
        )*
    };
}
impl_param_from_float!(f32, f64);

impl<R> From<Array1<R>> for Param<R> {
    fn from(a: Array1<R>) -> Self {
        Param::Array(a)
    }
}

impl<R> From<Vec<R>> for Param<R> {
    fn from(v: Vec<R>) -> Self {
        Param::Array(Array1::from(v))
    }
}

impl<'a, R: Clone> From<ArrayView1<'a, R>> for Param<R> {
    fn from(a: ArrayView1<'a, R>) -> Self {
        Param::Array(a.to_owned())
    }
}

impl<R: fmt::Display> fmt::Display for Param<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Scalar(v) => write!(f, "{}", v),
            Param::Array(a) => write!(f, "array of {} values", a.len()),
        }
    }
}

/// Prox step size γ: one positive scalar or one positive value per coordinate.
///
/// Build it with `From`: `0.5.into()`, `(&steps).into()` or `steps.view().into()`.
#[derive(Clone, Copy, Debug)]
pub enum Gamma<'a, R> {
    /// Same step for every coordinate
    Scalar(R),
    /// One step per coordinate
    Array(ArrayView1<'a, R>),
}

impl<'a, R: Copy> Gamma<'a, R> {
    /// Step seen by coordinate `k`
    #[inline]
    pub fn at(&self, k: usize) -> R {
        match self {
            Gamma::Scalar(g) => *g,
            Gamma::Array(a) => a[k],
        }
    }

    pub fn as_scalar(&self) -> Option<R> {
        match self {
            Gamma::Scalar(g) => Some(*g),
            Gamma::Array(_) => None,
        }
    }

    /// Panics if this is an array whose length is not `n`.
    #[inline]
    pub(crate) fn assert_len(&self, n: usize) {
        if let Gamma::Array(a) = self {
            assert_eq!(a.len(), n, "step size has {} entries, input has {}", a.len(), n);
        }
    }
}

impl<'a, R> From<ArrayView1<'a, R>> for Gamma<'a, R> {
    fn from(a: ArrayView1<'a, R>) -> Self {
        Gamma::Array(a)
    }
}

impl<'a, R> From<&'a Array1<R>> for Gamma<'a, R> {
    fn from(a: &'a Array1<R>) -> Self {
        Gamma::Array(a.view())
    }
}
