//! Construction errors
//!
//! Every function object validates its parameters once, when it is built.
//! After that, evaluation, gradients and proximal maps cannot fail; a
//! length mismatch between a parameter array and the input is a programming
//! error and panics the way `ndarray` does for mismatched shapes.

use thiserror::Error;

/// Errors raised while constructing a function object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxError {
    /// A weight of `SqrNormL2` is negative (or NaN).
    #[error("weight at index {index} must be nonnegative")]
    NegativeWeight {
        /// Index of the offending weight (0 for a scalar weight)
        index: usize,
    },

    /// A bound of `IndBox` is NaN.
    #[error("bound at index {index} is not a real number")]
    InvalidBound {
        /// Index of the offending bound (0 for a scalar bound)
        index: usize,
    },

    /// Lower bound exceeds the upper bound, the box is empty.
    #[error("lower bound exceeds upper bound at index {index}")]
    EmptyBox {
        /// First coordinate with `lb > ub`
        index: usize,
    },

    /// Both bounds are arrays but their lengths differ.
    #[error("bound lengths differ: lb has {lb} entries, ub has {ub}")]
    ShapeMismatch {
        /// Length of the lower bound
        lb: usize,
        /// Length of the upper bound
        ub: usize,
    },

    /// Radius of an L-infinity ball is not positive.
    #[error("radius must be positive")]
    NonPositiveRadius,

    /// Quadratic form matrix is not square.
    #[error("operator must be square, got {rows}x{cols}")]
    NotSquare {
        /// Number of rows
        rows: usize,
        /// Number of columns
        cols: usize,
    },

    /// Linear term does not match the operator size.
    #[error("linear term has length {found}, expected {expected}")]
    DimensionMismatch {
        /// Size of the operator
        expected: usize,
        /// Length of the linear term
        found: usize,
    },
}

/// Result alias for constructors in this crate.
pub type Result<T> = std::result::Result<T, ProxError>;
