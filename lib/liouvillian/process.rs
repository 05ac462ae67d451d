//! Basis change between evolution superoperators and process matrices.
//!
//! Density matrices are vectorized by stacking columns, so that
//! `vec(A ρ B) = (Bᵀ ⊗ A) vec(ρ)`. With the normalized tensor-Pauli basis
//! `{B_i}` (see [`PauliBasis`]), the process matrix of a superoperator `S` is
//! ```text
//! χ_ij = Tr[(B_jᵀ ⊗ B_i) S]
//! ```
//! and the inverse is `S = Σ_ij χ_ij conj(P_j) ⊗ P_i` with `P_i = 2^n B_i`.

use ndarray::{ self as nd, linalg::kron };
use num_complex::Complex64 as C64;
use crate::{
    linalg::conj,
    pauli::PauliBasis,
};

/// Convert an evolution superoperator to a process matrix.
pub fn super_to_process(basis: &PauliBasis, S: &nd::Array2<C64>)
    -> nd::Array2<C64>
{
    let n = basis.len();
    let B: Vec<&nd::Array2<C64>> = basis.iter().collect();
    let St = S.t();
    nd::Array2::from_shape_fn((n, n), |(i, j)| {
        // Tr[A S] = Σ_ab A_ab S_ba
        (kron(&B[j].t(), B[i]) * &St).sum()
    })
}

/// Convert a process matrix to an evolution superoperator.
pub fn process_to_super(basis: &PauliBasis, chi: &nd::Array2<C64>)
    -> nd::Array2<C64>
{
    let d = basis.len();
    let scale = C64::from(2.0_f64.powi(basis.n_qubits() as i32));
    let P: Vec<nd::Array2<C64>>
        = basis.iter().map(|b| b * scale).collect();
    let Pc: Vec<nd::Array2<C64>> = P.iter().map(conj).collect();
    let mut S: nd::Array2<C64> = nd::Array2::zeros((d, d));
    for ((i, j), c) in chi.indexed_iter() {
        if *c != C64::from(0.0) {
            S.scaled_add(*c, &kron(&Pc[j], &P[i]));
        }
    }
    S
}
