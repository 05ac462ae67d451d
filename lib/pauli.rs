//! Pauli matrices and the tensor-Pauli operator basis used for process
//! matrices.

use itertools::Itertools;
use ndarray::{ self as nd, linalg::kron };
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use crate::linalg::eye;

/// Single-qubit Pauli operator labels, in basis order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

impl Pauli {
    /// All four labels in basis order `I, X, Y, Z`.
    pub const ALL: [Pauli; 4] = [Self::I, Self::X, Self::Y, Self::Z];

    /// Unnormalized 2x2 matrix.
    pub fn matrix(&self) -> nd::Array2<C64> {
        let o = C64::zero();
        let l = C64::one();
        let i = C64::i();
        match *self {
            Self::I => nd::array![[l, o], [o, l]],
            Self::X => nd::array![[o, l], [l, o]],
            Self::Y => nd::array![[o, -i], [i, o]],
            Self::Z => nd::array![[l, o], [o, -l]],
        }
    }
}

/// Unnormalized σx.
pub fn sigma_x() -> nd::Array2<C64> { Pauli::X.matrix() }

/// Unnormalized σy.
pub fn sigma_y() -> nd::Array2<C64> { Pauli::Y.matrix() }

/// Unnormalized σz.
pub fn sigma_z() -> nd::Array2<C64> { Pauli::Z.matrix() }

/// Lowering operator `|1><0|`, i.e. amplitude damping from the first basis
/// state to the second.
pub fn sigma_minus() -> nd::Array2<C64> {
    let mut s = nd::Array2::zeros((2, 2));
    s[[1, 0]] = C64::one();
    s
}

/// Kronecker product of a sequence of square matrices, with the first factor
/// acting on the most significant qubit.
pub fn kron_all<'a, I>(factors: I) -> nd::Array2<C64>
where I: IntoIterator<Item = &'a nd::Array2<C64>>
{
    factors.into_iter()
        .fold(eye(1), |acc, f| kron(&acc, f))
}

/// Embed a single-qubit operator acting on qubit `target` of an `n`-qubit
/// register, with identity on all others.
pub fn embed(op: &nd::Array2<C64>, target: usize, n: usize) -> nd::Array2<C64> {
    let id = eye(2);
    let factors: Vec<&nd::Array2<C64>>
        = (0..n).map(|k| if k == target { op } else { &id }).collect();
    kron_all(factors)
}

/// Fixed operator basis of `4^n` tensor products of Pauli matrices.
///
/// Element `k` is the product whose labels are the base-4 digits of `k`
/// (most significant digit on the first qubit), each factor scaled by 1/2,
/// so that `k = 0` is `I/2 ⊗ ... ⊗ I/2`.
#[derive(Clone, Debug)]
pub struct PauliBasis {
    n_qubits: usize,
    labels: Vec<Vec<Pauli>>,
    elements: Vec<nd::Array2<C64>>,
}

impl PauliBasis {
    /// Build the basis for `n_qubits` qubits.
    pub fn new(n_qubits: usize) -> Self {
        // multi_cartesian_product is empty for zero factors
        if n_qubits == 0 {
            return Self { n_qubits, labels: vec![vec![]], elements: vec![eye(1)] };
        }
        let labels: Vec<Vec<Pauli>>
            = (0..n_qubits)
            .map(|_| Pauli::ALL.into_iter())
            .multi_cartesian_product()
            .collect();
        let half = C64::from(0.5);
        let elements: Vec<nd::Array2<C64>>
            = labels.iter()
            .map(|label| {
                let factors: Vec<nd::Array2<C64>>
                    = label.iter().map(|p| p.matrix() * half).collect();
                kron_all(&factors)
            })
            .collect();
        Self { n_qubits, labels, elements }
    }

    /// Number of qubits.
    pub fn n_qubits(&self) -> usize { self.n_qubits }

    /// Number of basis elements, `4^n`.
    pub fn len(&self) -> usize { self.elements.len() }

    /// Always `false` for a constructed basis.
    pub fn is_empty(&self) -> bool { self.elements.is_empty() }

    /// Normalized basis element.
    pub fn get(&self, k: usize) -> Option<&nd::Array2<C64>> {
        self.elements.get(k)
    }

    /// Pauli labels of basis element `k`.
    pub fn label(&self, k: usize) -> Option<&[Pauli]> {
        self.labels.get(k).map(|l| l.as_slice())
    }

    /// Iterate over normalized basis elements.
    pub fn iter(&self) -> std::slice::Iter<'_, nd::Array2<C64>> {
        self.elements.iter()
    }

    /// Unnormalized basis element, `2^n` times [`Self::get`].
    pub fn unnormalized(&self, k: usize) -> Option<nd::Array2<C64>> {
        let scale = C64::from(2.0_f64.powi(self.n_qubits as i32));
        self.elements.get(k).map(|b| b * scale)
    }
}
