//! Dense complex linear algebra shared by the noise and propagation code.
//!
//! The matrix exponential is computed by scaling and squaring with a
//! degree-13 Padé approximant (Higham 2005, "The Scaling and Squaring Method
//! for the Matrix Exponential Revisited"), which is the dominant cost of every
//! trajectory.

use nalgebra as na;
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use crate::error::{ Error, Result };

/// Padé(13, 13) coefficients `b_0, ..., b_13`.
const PADE_13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

/// Largest 1-norm for which Padé(13) is accurate to double precision without
/// scaling.
const THETA_13: f64 = 5.371_920_351_148_152;

/// Complex identity matrix.
pub fn eye(n: usize) -> nd::Array2<C64> {
    nd::Array2::from_diag_elem(n, C64::one())
}

/// Conjugate transpose.
pub fn dagger<S>(A: &nd::ArrayBase<S, nd::Ix2>) -> nd::Array2<C64>
where S: nd::Data<Elem = C64>
{
    A.t().mapv(|a| a.conj())
}

/// Elementwise complex conjugate.
pub fn conj<S>(A: &nd::ArrayBase<S, nd::Ix2>) -> nd::Array2<C64>
where S: nd::Data<Elem = C64>
{
    A.mapv(|a| a.conj())
}

/// Trace of a square matrix.
pub fn trace<S>(A: &nd::ArrayBase<S, nd::Ix2>) -> C64
where S: nd::Data<Elem = C64>
{
    A.diag().iter().sum()
}

/// Largest elementwise modulus of `A - B`.
pub fn max_abs_diff<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> f64
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.iter().zip(B.iter())
        .map(|(a, b)| (*a - *b).norm())
        .fold(0.0, f64::max)
}

/// `true` if every entry has finite real and imaginary parts.
pub fn all_finite<S>(A: &nd::ArrayBase<S, nd::Ix2>) -> bool
where S: nd::Data<Elem = C64>
{
    A.iter().all(|a| a.re.is_finite() && a.im.is_finite())
}

/// Maximum absolute column sum.
fn norm_1<S>(A: &nd::ArrayBase<S, nd::Ix2>) -> f64
where S: nd::Data<Elem = C64>
{
    A.columns().into_iter()
        .map(|col| col.iter().map(|a| a.norm()).sum::<f64>())
        .fold(0.0, f64::max)
}

fn to_nalgebra(A: &nd::Array2<C64>) -> na::DMatrix<C64> {
    let (n, m) = A.dim();
    na::DMatrix::from_fn(n, m, |i, j| A[[i, j]])
}

fn from_nalgebra(A: &na::DMatrix<C64>) -> nd::Array2<C64> {
    nd::Array2::from_shape_fn(A.shape(), |(i, j)| A[(i, j)])
}

/// Solve `A X = B` for `X` by LU decomposition with partial pivoting.
pub fn solve(A: &nd::Array2<C64>, B: &nd::Array2<C64>)
    -> Result<nd::Array2<C64>>
{
    to_nalgebra(A).lu()
        .solve(&to_nalgebra(B))
        .map(|X| from_nalgebra(&X))
        .ok_or(Error::Singular("linear solve"))
}

/// Compute the matrix exponential `exp(A)` of a square complex matrix.
///
/// Fails if `A` has non-finite entries or the Padé denominator is singular.
pub fn expm(A: &nd::Array2<C64>) -> Result<nd::Array2<C64>> {
    let n = A.nrows();
    if n != A.ncols() {
        return Err(Error::Singular("matrix exponential of non-square matrix"));
    }
    if !all_finite(A) {
        return Err(Error::NonFinite("matrix exponential argument"));
    }
    match n {
        0 => return Ok(nd::Array2::zeros((0, 0))),
        1 => return Ok(nd::Array2::from_elem((1, 1), A[[0, 0]].exp())),
        _ => { },
    }
    let norm = norm_1(A);
    let s: i32
        = if norm > THETA_13 {
            (norm / THETA_13).log2().ceil() as i32
        } else {
            0
        };
    let A_s: nd::Array2<C64> = A * C64::from(2.0_f64.powi(-s));
    let mut E = pade_13(&A_s)?;
    for _ in 0..s {
        E = E.dot(&E);
    }
    Ok(E)
}

// exp(A) ≈ (V - U)^-1 (V + U)
fn pade_13(A: &nd::Array2<C64>) -> Result<nd::Array2<C64>> {
    let b = |k: usize| C64::from(PADE_13[k]);
    let I = eye(A.nrows());
    let A2 = A.dot(A);
    let A4 = A2.dot(&A2);
    let A6 = A2.dot(&A4);
    let W1: nd::Array2<C64> = &A6 * b(13) + &A4 * b(11) + &A2 * b(9);
    let W2: nd::Array2<C64>
        = &A6 * b(7) + &A4 * b(5) + &A2 * b(3) + &I * b(1);
    let U: nd::Array2<C64> = A.dot(&(A6.dot(&W1) + W2));
    let Z1: nd::Array2<C64> = &A6 * b(12) + &A4 * b(10) + &A2 * b(8);
    let Z2: nd::Array2<C64>
        = &A6 * b(6) + &A4 * b(4) + &A2 * b(2) + &I * b(0);
    let V: nd::Array2<C64> = A6.dot(&Z1) + Z2;
    solve(&(&V - &U), &(&V + &U))
        .map_err(|_| Error::Singular("Padé denominator"))
}

/// Real symmetric eigendecomposition `A = V diag(w) Vᵀ`, returning `(w, V)`
/// with eigenvectors in the columns of `V`.
pub fn eigh_real(A: &nd::Array2<f64>) -> Result<(nd::Array1<f64>, nd::Array2<f64>)> {
    let (n, m) = A.dim();
    if n != m {
        return Err(Error::Eigen(format!("matrix is not square: {}x{}", n, m)));
    }
    if A.iter().any(|a| !a.is_finite()) {
        return Err(Error::Eigen("matrix has non-finite entries".into()));
    }
    let eig = na::SymmetricEigen::new(na::DMatrix::from_fn(n, n, |i, j| A[[i, j]]));
    let w: nd::Array1<f64> = eig.eigenvalues.iter().copied().collect();
    let V: nd::Array2<f64>
        = nd::Array2::from_shape_fn((n, n), |(i, j)| eig.eigenvectors[(i, j)]);
    Ok((w, V))
}

/// Return `true` if `A` is Hermitian to within `tol`.
pub fn is_hermitian<S>(A: &nd::ArrayBase<S, nd::Ix2>, tol: f64) -> bool
where S: nd::Data<Elem = C64>
{
    A.is_square()
        && A.indexed_iter()
            .all(|((i, j), a)| (*a - A[[j, i]].conj()).norm() <= tol)
}

/// Zero matrix of the given square dimension.
pub fn zeros(n: usize) -> nd::Array2<C64> { nd::Array2::from_elem((n, n), C64::zero()) }
