//! The `ndarray-prox` crate provides proximable functions over `ndarray`
//! vectors, the building blocks of proximal optimization algorithms.
//!
//! It includes:
//! - squared (weighted) Euclidean norm, [`SqrNormL2`](functions::SqrNormL2)
//! - indicator of a box or $`L_\infty`$ ball, [`IndBox`](functions::IndBox)
//! - convex quadratic with a conjugate gradient prox,
//!   [`QuadraticIterative`](functions::QuadraticIterative)
//!
//! Every function can be evaluated, reports structural properties
//! (convexity, smoothness, ...) and computes its proximal map with a
//! scalar or per-coordinate step size. Maps work in place whenever
//! possible so that solvers can run without allocating.
//!
//! ```
//! # extern crate intel_mkl_src;
//! use ndarray::array;
//! use ndarray_prox::functions::{ProximableFunction, SqrNormL2};
//!
//! let f = SqrNormL2::<f64>::new(2.0).unwrap();
//! let (y, fy) = f.prox(&array![3.0, -4.0], 1.0);
//! assert_eq!(y, array![1.0, -4.0 / 3.0]);
//! assert_eq!(fy, f.eval(&y));
//! ```
//!
//! This crate is in the early development stage and is actively changing.

#![cfg_attr(all(rustc_nightly, test), feature(test))]
#[cfg(all(rustc_nightly, test))]
extern crate test;

#[cfg(test)]
extern crate intel_mkl_src;

pub mod error;
pub mod functions;
pub mod linop;
pub mod param;
pub mod solve;

pub use error::{ProxError, Result};
pub use functions::{Properties, ProximableFunction, SmoothFunction};
pub use param::{Gamma, Param};
