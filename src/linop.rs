//! Abstract Linear Operators for quadratic forms
//! building upon ndarray_linalg::operator

use ndarray::linalg::general_mat_vec_mul;
use ndarray::prelude::*;
use ndarray::{Data, DataMut, DataOwned, Zip};
pub use ndarray_linalg::operator::LinearOperator;
use ndarray_linalg::Scalar;

use crate::param::Gamma;

/// A linear operator with a known size that can write its product
/// into a caller-provided buffer.
///
/// Implement this (together with `LinearOperator`) for implicit
/// operators, e.g. a stencil or a sparse matrix, to use them in
/// [`QuadraticIterative`](crate::functions::QuadraticIterative).
pub trait MatVec: LinearOperator {
    /// `(rows, cols)` of the operator
    fn dims(&self) -> (usize, usize);

    /// Compute `y = Ax`
    ///
    /// The default allocates through `apply`; override it when the
    /// operator can fill `y` directly.
    fn apply_to<S, T>(&self, x: &ArrayBase<S, Ix1>, y: &mut ArrayBase<T, Ix1>)
    where
        S: Data<Elem = Self::Elem>,
        T: DataMut<Elem = Self::Elem>,
    {
        y.assign(&self.apply(x));
    }
}

impl<A, Sa> MatVec for ArrayBase<Sa, Ix2>
where
    A: Scalar,
    Sa: Data<Elem = A>,
{
    fn dims(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    #[inline]
    fn apply_to<S, T>(&self, x: &ArrayBase<S, Ix1>, y: &mut ArrayBase<T, Ix1>)
    where
        S: Data<Elem = A>,
        T: DataMut<Elem = A>,
    {
        y.fill(A::zero());
        general_mat_vec_mul(A::one(), self, x, A::zero(), y);
    }
}

/// The operator $`Q + \Gamma^{-1}`$, with $`\Gamma = \gamma I`$ or $`\mathrm{diag}(\gamma)`$
///
/// This is the system matrix of the proximal map of a quadratic
/// with step size $`\gamma`$. It is symmetric positive definite
/// whenever $`Q`$ is symmetric positive semidefinite and $`\gamma > 0`$.
pub struct Shifted<'a, 'g, Q: LinearOperator> {
    op: &'a Q,
    gamma: Gamma<'g, <Q::Elem as Scalar>::Real>,
}

impl<'a, 'g, Q> Shifted<'a, 'g, Q>
where
    Q: MatVec,
{
    /// # Panics
    /// If `gamma` is an array whose length is not the size of `op`.
    pub fn new(op: &'a Q, gamma: Gamma<'g, <Q::Elem as Scalar>::Real>) -> Self {
        gamma.assert_len(op.dims().1);
        Shifted { op, gamma }
    }
}

impl<'a, 'g, Q> LinearOperator for Shifted<'a, 'g, Q>
where
    Q: MatVec,
{
    type Elem = Q::Elem;

    /// Apply operator out-place
    fn apply<S>(&self, a: &ArrayBase<S, Ix1>) -> Array1<S::Elem>
    where
        S: Data<Elem = Self::Elem>,
    {
        let mut b = Array1::zeros(a.len());
        self.apply_to(a, &mut b);
        b
    }

    /// Apply operator in-place
    fn apply_mut<S>(&self, a: &mut ArrayBase<S, Ix1>)
    where
        S: DataMut<Elem = Self::Elem>,
    {
        let b = self.apply(a);
        a.assign(&b);
    }

    /// Apply operator with move
    fn apply_into<S>(&self, mut a: ArrayBase<S, Ix1>) -> ArrayBase<S, Ix1>
    where
        S: DataOwned<Elem = Self::Elem> + DataMut,
    {
        self.apply_mut(&mut a);
        a
    }

    /// Apply operator to matrix out-place, column by column
    fn apply2<S>(&self, a: &ArrayBase<S, Ix2>) -> Array2<S::Elem>
    where
        S: Data<Elem = Self::Elem>,
    {
        let mut b = Array2::zeros(a.raw_dim());
        for (acol, mut bcol) in a.axis_iter(Axis(1)).zip(b.axis_iter_mut(Axis(1))) {
            self.apply_to(&acol, &mut bcol);
        }
        b
    }

    /// Apply operator to matrix in-place
    fn apply2_mut<S>(&self, a: &mut ArrayBase<S, Ix2>)
    where
        S: DataMut<Elem = Self::Elem>,
    {
        let b = self.apply2(a);
        a.assign(&b);
    }

    /// Apply operator to matrix with move
    fn apply2_into<S>(&self, mut a: ArrayBase<S, Ix2>) -> ArrayBase<S, Ix2>
    where
        S: DataOwned<Elem = Self::Elem> + DataMut,
    {
        self.apply2_mut(&mut a);
        a
    }
}

impl<'a, 'g, Q> MatVec for Shifted<'a, 'g, Q>
where
    Q: MatVec,
{
    fn dims(&self) -> (usize, usize) {
        self.op.dims()
    }

    #[inline]
    fn apply_to<S, T>(&self, x: &ArrayBase<S, Ix1>, y: &mut ArrayBase<T, Ix1>)
    where
        S: Data<Elem = Self::Elem>,
        T: DataMut<Elem = Self::Elem>,
    {
        self.op.apply_to(x, y);
        let gamma = self.gamma;
        Zip::indexed(y)
            .and(x)
            .for_each(|k, yk, &xk| *yk = *yk + xk.div_real(gamma.at(k)));
    }
}
