#![allow(non_snake_case)]

use std::cell::RefCell;
use std::fmt;

use ndarray::prelude::*;
use ndarray::{Data, DataMut, Zip};
use ndarray_linalg::Scalar;

use super::{half, Properties, ProximableFunction, SmoothFunction};
use crate::error::{ProxError, Result};
use crate::linop::{MatVec, Shifted};
use crate::param::Gamma;
use crate::solve::{cg, cg_mut, real_dot, CgOptions, CgReport, CgWorkspace};

/// Scratch memory of [`QuadraticIterative`]
///
/// Holds the product $`Qx`$ (or the right hand side of the prox system)
/// and the conjugate gradient vectors. Every evaluation overwrites it.
#[derive(Clone, Debug)]
pub struct QuadraticWorkspace<A> {
    temp: Array1<A>,
    cg: CgWorkspace<A>,
}

impl<A: Scalar> QuadraticWorkspace<A> {
    pub fn new(n: usize) -> Self {
        QuadraticWorkspace {
            temp: Array1::zeros(n),
            cg: CgWorkspace::new(n),
        }
    }
}

/// Quadratic function with an iterative proximal map
///
/// ```math
/// f(x) = \frac12 x^TQx + q^Tx
/// ```
/// for a symmetric (Hermitian) positive semidefinite $`Q`$, given as a
/// matrix or any operator implementing [`MatVec`]. The prox has no
/// closed form for a general operator; it solves
/// ```math
/// (Q + \Gamma^{-1})\, y = \Gamma^{-1}x - q
/// ```
/// with conjugate gradient, warm started at $`x`$. The result is only as
/// accurate as the solver tolerance, hence `PROX_ACCURATE = false`.
///
/// Positive semidefiniteness of $`Q`$ is assumed, not checked. An
/// indefinite $`Q`$ makes the solver stop early with a warning.
///
/// The workspace lives in a `RefCell`: a `QuadraticIterative` can be
/// shared by reference but not between threads. Use
/// [`workspace`](Self::workspace) and the `*_with` methods to manage
/// the scratch memory explicitly instead.
#[derive(Debug)]
pub struct QuadraticIterative<Op: MatVec> {
    Q: Op,
    q: Array1<Op::Elem>,
    opts: CgOptions<<Op::Elem as Scalar>::Real>,
    workspace: RefCell<QuadraticWorkspace<Op::Elem>>,
}

impl<Op: MatVec> QuadraticIterative<Op> {
    /// Fails with [`ProxError::NotSquare`] or [`ProxError::DimensionMismatch`]
    /// when `Q` and `q` do not fit.
    ///
    /// The prox uses [`CgOptions::default`]: relative tolerance $`\sqrt{\epsilon}`$
    /// and at most ten iterations per unknown. Badly conditioned
    /// $`Q + \Gamma^{-1}`$ may need more; see [`with_options`](Self::with_options).
    pub fn new(Q: Op, q: Array1<Op::Elem>) -> Result<Self> {
        Self::with_options(Q, q, CgOptions::default())
    }

    /// As [`new`](Self::new), with a custom stopping rule for the prox.
    pub fn with_options(
        Q: Op,
        q: Array1<Op::Elem>,
        opts: CgOptions<<Op::Elem as Scalar>::Real>,
    ) -> Result<Self> {
        let (rows, cols) = Q.dims();
        if rows != cols {
            return Err(ProxError::NotSquare { rows, cols });
        }
        if q.len() != rows {
            return Err(ProxError::DimensionMismatch {
                expected: rows,
                found: q.len(),
            });
        }
        Ok(QuadraticIterative {
            Q,
            q,
            opts,
            workspace: RefCell::new(QuadraticWorkspace::new(rows)),
        })
    }

    pub fn operator(&self) -> &Op {
        &self.Q
    }

    pub fn linear_term(&self) -> &Array1<Op::Elem> {
        &self.q
    }

    pub fn options(&self) -> &CgOptions<<Op::Elem as Scalar>::Real> {
        &self.opts
    }

    /// A fresh workspace for the `*_with` methods
    pub fn workspace(&self) -> QuadraticWorkspace<Op::Elem> {
        QuadraticWorkspace::new(self.q.len())
    }

    /// $`f(x)`$, using `ws` for $`Qx`$
    pub fn eval_with<S>(
        &self,
        ws: &mut QuadraticWorkspace<Op::Elem>,
        x: &ArrayBase<S, Ix1>,
    ) -> <Op::Elem as Scalar>::Real
    where
        S: Data<Elem = Op::Elem>,
    {
        self.Q.apply_to(x, &mut ws.temp);
        half(real_dot(x, &ws.temp)) + real_dot(&self.q, x)
    }

    /// Gradient $`Qx + q`$ in place, returns $`f(x)`$
    pub fn gradient_with<S>(
        &self,
        ws: &mut QuadraticWorkspace<Op::Elem>,
        y: &mut ArrayBase<S, Ix1>,
    ) -> <Op::Elem as Scalar>::Real
    where
        S: DataMut<Elem = Op::Elem>,
    {
        let x = &mut ws.temp;
        x.assign(&*y);
        self.Q.apply_to(&*x, y);
        // f(x) = (x'(Qx + q) + x'q) / 2
        *y += &self.q;
        half(real_dot(&*x, &*y) + real_dot(&*x, &self.q))
    }

    /// Proximal map in place, returns $`f(y)`$ and the solver report
    pub fn prox_with<'g, S, G>(
        &self,
        ws: &mut QuadraticWorkspace<Op::Elem>,
        y: &mut ArrayBase<S, Ix1>,
        gamma: G,
    ) -> (<Op::Elem as Scalar>::Real, CgReport<<Op::Elem as Scalar>::Real>)
    where
        S: DataMut<Elem = Op::Elem>,
        G: Into<Gamma<'g, <Op::Elem as Scalar>::Real>>,
    {
        let gamma = gamma.into();
        let system = Shifted::new(&self.Q, gamma);

        // right hand side x/gamma - q, x is still in y
        Zip::indexed(&mut ws.temp)
            .and(&*y)
            .and(&self.q)
            .for_each(|k, bk, &xk, &qk| *bk = xk.div_real(gamma.at(k)) - qk);
        let report = cg_mut(&system, &ws.temp, y, &mut ws.cg, &self.opts);

        let fy = self.eval_with(ws, &*y);
        (fy, report)
    }
}

impl<Op: MatVec> Properties for QuadraticIterative<Op> {
    const CONVEX: bool = true;
    const SMOOTH: bool = true;
    const QUADRATIC: bool = true;
    const PROX_ACCURATE: bool = false;
}

impl<Op: MatVec> ProximableFunction for QuadraticIterative<Op> {
    type Elem = Op::Elem;
    type Real = <Op::Elem as Scalar>::Real;

    fn eval<S>(&self, x: &ArrayBase<S, Ix1>) -> Self::Real
    where
        S: Data<Elem = Op::Elem>,
    {
        self.eval_with(&mut self.workspace.borrow_mut(), x)
    }

    fn prox_mut<'g, S, G>(&self, y: &mut ArrayBase<S, Ix1>, gamma: G) -> Self::Real
    where
        S: DataMut<Elem = Op::Elem>,
        G: Into<Gamma<'g, Self::Real>>,
    {
        self.prox_with(&mut self.workspace.borrow_mut(), y, gamma).0
    }

    /// Fresh vectors, zero initial guess and out-of-place products.
    fn prox_naive<'g, S, G>(&self, x: &ArrayBase<S, Ix1>, gamma: G) -> (Array1<Op::Elem>, Self::Real)
    where
        S: Data<Elem = Op::Elem>,
        G: Into<Gamma<'g, Self::Real>>,
    {
        let gamma = gamma.into();
        let b = Zip::indexed(x)
            .and(&self.q)
            .map_collect(|k, &xk, &qk| xk.div_real(gamma.at(k)) - qk);
        let (y, _report) = cg(&Shifted::new(&self.Q, gamma), &b, &self.opts);
        let Qy = self.Q.apply(&y);
        let fy = half(real_dot(&y, &Qy)) + real_dot(&self.q, &y);
        (y, fy)
    }
}

impl<Op: MatVec> SmoothFunction for QuadraticIterative<Op> {
    fn gradient_mut<S>(&self, y: &mut ArrayBase<S, Ix1>) -> Self::Real
    where
        S: DataMut<Elem = Op::Elem>,
    {
        self.gradient_with(&mut self.workspace.borrow_mut(), y)
    }
}

impl<Op: MatVec> fmt::Display for QuadraticIterative<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quadratic (iterative prox): x ↦ (1/2)xᵀQx + qᵀx, Q is {}x{}",
            self.q.len(),
            self.q.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linop::LinearOperator;
    use approx::assert_abs_diff_eq;
    use ndarray::DataOwned;
    use ndarray_rand::rand_distr::Normal;
    use ndarray_rand::RandomExt;

    fn rand_spd(n: usize) -> Array2<f64> {
        let B = Array::random((n, n), Normal::new(0., 1.).unwrap());
        B.t().dot(&B) + Array2::<f64>::eye(n) * 0.1
    }

    fn tight() -> CgOptions<f64> {
        CgOptions::default().with_reltol(1e-12).with_maxiter(1000)
    }

    /// Second difference operator, never stored as a matrix
    struct Laplacian1D {
        n: usize,
    }

    impl LinearOperator for Laplacian1D {
        type Elem = f64;

        fn apply<S>(&self, a: &ArrayBase<S, Ix1>) -> Array1<f64>
        where
            S: Data<Elem = f64>,
        {
            let mut b = Array1::zeros(self.n);
            self.apply_to(a, &mut b);
            b
        }

        fn apply_mut<S>(&self, a: &mut ArrayBase<S, Ix1>)
        where
            S: DataMut<Elem = f64>,
        {
            let b = self.apply(a);
            a.assign(&b);
        }

        fn apply_into<S>(&self, mut a: ArrayBase<S, Ix1>) -> ArrayBase<S, Ix1>
        where
            S: DataOwned<Elem = f64> + DataMut,
        {
            self.apply_mut(&mut a);
            a
        }
    }

    impl MatVec for Laplacian1D {
        fn dims(&self) -> (usize, usize) {
            (self.n, self.n)
        }

        fn apply_to<S, T>(&self, x: &ArrayBase<S, Ix1>, y: &mut ArrayBase<T, Ix1>)
        where
            S: Data<Elem = f64>,
            T: DataMut<Elem = f64>,
        {
            let n = self.n;
            for k in 0..n {
                let left = if k > 0 { x[k - 1] } else { 0. };
                let right = if k + 1 < n { x[k + 1] } else { 0. };
                y[k] = 2. * x[k] - left - right;
            }
        }
    }

    fn laplacian_dense(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                2.
            } else if i + 1 == j || j + 1 == i {
                -1.
            } else {
                0.
            }
        })
    }

    #[test]
    fn construction_checks_sizes() {
        let err = QuadraticIterative::new(Array2::<f64>::zeros((2, 3)), array![1., 2.]).unwrap_err();
        assert_eq!(err, ProxError::NotSquare { rows: 2, cols: 3 });

        let err = QuadraticIterative::new(Array2::<f64>::eye(3), array![1., 2.]).unwrap_err();
        assert_eq!(
            err,
            ProxError::DimensionMismatch {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn eval_and_gradient() {
        let f = QuadraticIterative::new(array![[2., 0.], [0., 4.]], array![1., -1.]).unwrap();
        let x = array![1., 2.];
        assert_abs_diff_eq!(f.eval(&x), 8., epsilon = 1e-12);

        let (g, fx) = f.gradient(&x);
        assert_abs_diff_eq!(g, array![3., 7.], epsilon = 1e-12);
        assert_abs_diff_eq!(fx, 8., epsilon = 1e-12);

        // in place
        let mut y = x.clone();
        let fy = f.gradient_mut(&mut y);
        assert_eq!(y, g);
        assert_eq!(fy, fx);
    }

    #[test]
    fn prox_diagonal_closed_form() {
        let d = array![1., 2., 3.];
        let q = array![1., 0., -1.];
        let f = QuadraticIterative::with_options(Array2::from_diag(&d), q.clone(), tight()).unwrap();
        let x = array![2., -1., 0.5];
        let gamma = 0.5;

        let (y, fy) = f.prox(&x, gamma);
        let expected = (&x / gamma - &q) / (&d + 1. / gamma);
        assert_abs_diff_eq!(y, expected, epsilon = 1e-10);
        assert_abs_diff_eq!(fy, f.eval(&expected), epsilon = 1e-10);
    }

    #[test]
    fn prox_stationarity() {
        let n = 20;
        let Q = rand_spd(n);
        let q = Array::random(n, Normal::new(0., 1.).unwrap());
        let x = Array::random(n, Normal::new(0., 1.).unwrap());
        let gamma = 0.3;
        let f = QuadraticIterative::with_options(Q.clone(), q.clone(), tight()).unwrap();

        let (y, fy) = f.prox(&x, gamma);
        let lhs = Q.dot(&y) + &y / gamma;
        let rhs = &x / gamma - &q;
        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-6);
        assert_abs_diff_eq!(fy, 0.5 * y.dot(&Q.dot(&y)) + q.dot(&y), epsilon = 1e-8);

        let (yn, fyn) = f.prox_naive(&x, gamma);
        assert_abs_diff_eq!(y, yn, epsilon = 1e-6);
        assert_abs_diff_eq!(fy, fyn, epsilon = 1e-6);
    }

    #[test]
    fn prox_array_step() {
        let n = 8;
        let Q = rand_spd(n);
        let q = Array::random(n, Normal::new(0., 1.).unwrap());
        let x = Array::random(n, Normal::new(0., 1.).unwrap());
        let gamma = Array::linspace(0.1, 2., n);
        let f = QuadraticIterative::with_options(Q.clone(), q.clone(), tight()).unwrap();

        let (y, _) = f.prox(&x, &gamma);
        let lhs = Q.dot(&y) + &y / &gamma;
        let rhs = &x / &gamma - &q;
        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-6);

        let (yn, _) = f.prox_naive(&x, &gamma);
        assert_abs_diff_eq!(y, yn, epsilon = 1e-6);
    }

    #[test]
    fn prox_in_place_matches_separate_buffer() {
        let Q = rand_spd(5);
        let q = Array::random(5, Normal::new(0., 1.).unwrap());
        let x = Array::random(5, Normal::new(0., 1.).unwrap());
        let f = QuadraticIterative::new(Q, q).unwrap();

        let mut y = Array1::zeros(5);
        let fy = f.prox_into(&x, &mut y, 1.5);
        let mut z = x.clone();
        let fz = f.prox_mut(&mut z, 1.5);
        assert_eq!(y, z);
        assert_eq!(fy, fz);
    }

    #[test]
    fn explicit_workspace() {
        let n = 6;
        let Q = rand_spd(n);
        let q = Array::random(n, Normal::new(0., 1.).unwrap());
        let x = Array::random(n, Normal::new(0., 1.).unwrap());
        let f = QuadraticIterative::with_options(Q, q, tight()).unwrap();

        let mut ws = f.workspace();
        let mut y = x.clone();
        let (fy, report) = f.prox_with(&mut ws, &mut y, 0.7);
        assert!(report.converged);
        assert!(report.iterations <= f.options().maxiter.unwrap());

        let (z, fz) = f.prox(&x, 0.7);
        assert_abs_diff_eq!(y, z, epsilon = 1e-12);
        assert_abs_diff_eq!(fy, fz, epsilon = 1e-12);
        assert_abs_diff_eq!(f.eval_with(&mut ws, &x), f.eval(&x), epsilon = 1e-12);
    }

    #[test]
    fn implicit_operator_matches_dense() {
        let n = 12;
        let q = Array::linspace(-1., 1., n);
        let x = Array::random(n, Normal::new(0., 1.).unwrap());
        let implicit = QuadraticIterative::with_options(Laplacian1D { n }, q.clone(), tight()).unwrap();
        let dense = QuadraticIterative::with_options(laplacian_dense(n), q, tight()).unwrap();

        assert_abs_diff_eq!(implicit.eval(&x), dense.eval(&x), epsilon = 1e-10);
        assert_abs_diff_eq!(implicit.gradient(&x).0, dense.gradient(&x).0, epsilon = 1e-10);
        assert_abs_diff_eq!(implicit.prox(&x, 2.).0, dense.prox(&x, 2.).0, epsilon = 1e-8);
    }

    #[test]
    fn default_options_converge_on_gram_matrix() {
        let n = 50;
        let B = Array::random((n, n), Normal::new(0., 1.).unwrap());
        let Q = B.t().dot(&B);
        let q = Array::random(n, Normal::new(0., 1.).unwrap());
        let x = Array::random(n, Normal::new(0., 1.).unwrap());
        let f = QuadraticIterative::new(Q.clone(), q.clone()).unwrap();

        let mut ws = f.workspace();
        let mut y = x.clone();
        let (_, report) = f.prox_with(&mut ws, &mut y, 1.);
        assert!(report.converged, "{:?}", report);

        // warm start at x, so the tolerance is relative to the initial residual
        let rhs = &x - &q;
        let initial = &rhs - &(Q.dot(&x) + &x);
        let residual = Q.dot(&y) + &y - &rhs;
        assert!(residual.dot(&residual).sqrt() <= 1e-6 * initial.dot(&initial).sqrt());
    }

    #[test]
    fn unconverged_prox_is_still_reported() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let Q = Array2::from_diag(&array![1., 10., 100., 1000.]);
        let opts = CgOptions::default().with_maxiter(1);
        let f = QuadraticIterative::with_options(Q, array![1., 1., 1., 1.], opts).unwrap();

        let mut ws = f.workspace();
        let mut y = array![1., -1., 1., -1.];
        let (fy, report): (f64, _) = f.prox_with(&mut ws, &mut y, 1.);
        assert!(!report.converged);
        assert_eq!(report.iterations, 1);
        assert!(fy.is_finite());
    }

    #[test]
    fn properties() {
        let f = QuadraticIterative::new(Array2::<f64>::eye(2), array![0., 0.]).unwrap();
        assert!(f.is_convex() && f.is_smooth() && f.is_quadratic());
        assert!(!f.is_prox_accurate());
        assert!(!f.is_separable() && !f.is_set_indicator());
        assert_eq!(
            format!("{}", f),
            "quadratic (iterative prox): x ↦ (1/2)xᵀQx + qᵀx, Q is 2x2"
        );
    }
}

#[cfg(all(rustc_nightly, test))]
mod benches {
    use super::*;
    use ndarray_rand::rand_distr::Normal;
    use ndarray_rand::RandomExt;
    use test::Bencher;

    fn problem(n: usize) -> (QuadraticIterative<Array2<f64>>, Array1<f64>) {
        let B = Array::random((n, n), Normal::new(0., 1.).unwrap());
        let Q = B.t().dot(&B) + Array2::<f64>::eye(n);
        let q = Array::random(n, Normal::new(0., 1.).unwrap());
        let x = Array::random(n, Normal::new(0., 1.).unwrap());
        (QuadraticIterative::new(Q, q).unwrap(), x)
    }

    #[bench]
    fn prox_reused_workspace(b: &mut Bencher) {
        let (f, x) = problem(100);
        let mut y = x.clone();
        b.iter(|| {
            y.assign(&x);
            f.prox_mut(&mut y, 0.5)
        });
    }

    #[bench]
    fn prox_naive_allocating(b: &mut Bencher) {
        let (f, x) = problem(100);
        b.iter(|| f.prox_naive(&x, 0.5));
    }
}
