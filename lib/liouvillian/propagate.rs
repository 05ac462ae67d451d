//! Time-ordered products of interval propagators.

use ndarray::{ self as nd, linalg::kron };
use num_complex::Complex64 as C64;
use crate::{
    error::Result,
    linalg::{ conj, dagger, expm, eye },
};
use super::hamiltonian::HamiltonianSequence;

/// Superoperator `conj(U) ⊗ U` acting on column-stacked density matrices.
pub fn lift_unitary(U: &nd::Array2<C64>) -> nd::Array2<C64> {
    kron(&conj(U), U)
}

/// Vectorized dissipator of a single Lindblad operator `L` with decay rate
/// `rate`:
/// ```text
/// rate * [ conj(L) ⊗ L - (1/2) I ⊗ L†L - (1/2) (L†L)ᵀ ⊗ I ]
/// ```
pub fn lindblad_term(L: &nd::Array2<C64>, rate: f64) -> nd::Array2<C64> {
    let I = eye(L.nrows());
    let LdL = dagger(L).dot(L);
    let half = C64::from(0.5);
    (kron(&conj(L), L) - kron(&I, &LdL) * half - kron(&LdL.t(), &I) * half)
        * C64::from(rate)
}

/// Vectorized Hamiltonian generator `-i (I ⊗ H - Hᵀ ⊗ I) / ħ`.
pub fn hamiltonian_generator(H: nd::ArrayView2<C64>, hbar: f64)
    -> nd::Array2<C64>
{
    let I = eye(H.nrows());
    (kron(&I, &H) - kron(&H.t(), &I)) * C64::new(0.0, -1.0 / hbar)
}

/// Accumulate `U <- exp(-i H_k dt_k / ħ) U` over every interval.
pub fn unitary(seq: &HamiltonianSequence, hbar: f64, dim: usize)
    -> Result<nd::Array2<C64>>
{
    let mut U = eye(dim);
    let mi_hbar = C64::new(0.0, -1.0 / hbar);
    for (H, dt) in seq.intervals() {
        U = expm(&(&H * (mi_hbar * dt)))?.dot(&U);
    }
    Ok(U)
}

/// Accumulate `S <- exp[(G(H_k) + lindblad) dt_k] S` over every interval,
/// where `G` is [`hamiltonian_generator`].
pub fn superoperator(
    seq: &HamiltonianSequence,
    lindblad: &nd::Array2<C64>,
    hbar: f64,
    dim: usize,
) -> Result<nd::Array2<C64>>
{
    let mut S = eye(dim * dim);
    for (H, dt) in seq.intervals() {
        let G = hamiltonian_generator(H, hbar) + lindblad;
        S = expm(&(G * C64::from(dt)))?.dot(&S);
    }
    Ok(S)
}
