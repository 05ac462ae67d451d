//! Karhunen-Loève synthesis of Gaussian processes with a prescribed
//! correlation function.
//!
//! The correlation samples `C_k` define a symmetric Toeplitz matrix
//! `T_ij = C_|i-j|`. With `T = V diag(λ) Vᵀ`, a realization is `V z` where the
//! `z_k` are independent normal draws with standard deviation `sqrt(|λ_k|)`.

use ndarray as nd;
use rand::Rng;
use rand_distr::StandardNormal;
use crate::{ error::Result, linalg::eigh_real };

/// Symmetric Toeplitz matrix built from its first row.
pub fn toeplitz(first_row: &[f64]) -> nd::Array2<f64> {
    let n = first_row.len();
    nd::Array2::from_shape_fn((n, n), |(i, j)| first_row[i.abs_diff(j)])
}

/// Cached eigendecomposition of a correlation matrix.
#[derive(Clone, Debug)]
pub struct KlDecomposition {
    eigenvalues: nd::Array1<f64>,
    eigenvectors: nd::Array2<f64>,
    // sqrt(|λ_k|)
    scales: nd::Array1<f64>,
}

impl KlDecomposition {
    /// Decompose the Toeplitz correlation matrix generated by `correlation`.
    pub fn new(correlation: &[f64]) -> Result<Self> {
        let (eigenvalues, eigenvectors) = eigh_real(&toeplitz(correlation))?;
        let scales = eigenvalues.mapv(|l| l.abs().sqrt());
        Ok(Self { eigenvalues, eigenvectors, scales })
    }

    /// Number of samples per realization.
    pub fn len(&self) -> usize { self.eigenvalues.len() }

    /// `true` if the decomposition has no modes.
    pub fn is_empty(&self) -> bool { self.eigenvalues.is_empty() }

    /// Eigenvalues of the correlation matrix.
    pub fn eigenvalues(&self) -> &nd::Array1<f64> { &self.eigenvalues }

    /// Eigenvectors of the correlation matrix, in columns.
    pub fn eigenvectors(&self) -> &nd::Array2<f64> { &self.eigenvectors }

    /// Draw one realization.
    pub fn sample<R>(&self, rng: &mut R) -> nd::Array1<f64>
    where R: Rng + ?Sized
    {
        let z: nd::Array1<f64>
            = self.scales.iter()
            .map(|s| s * rng.sample::<f64, _>(StandardNormal))
            .collect();
        self.eigenvectors.dot(&z)
    }
}
