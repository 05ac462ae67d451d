//! Empirical covariance statistics for checking a noise model against its
//! target correlation function.

use ndarray as nd;
use rand::Rng;
use crate::error::{ Error, Result };
use super::NoiseProcess;

/// Mean of each superdiagonal of a square matrix: element `k` averages
/// `X[i, i + k]` over `i`.
pub fn linear_covariance(xcov: &nd::Array2<f64>) -> nd::Array1<f64> {
    let n = xcov.nrows();
    (0..n)
        .map(|k| {
            let d = xcov.slice(nd::s![.., k..]).diag().to_owned();
            d.mean().unwrap_or(0.0)
        })
        .collect()
}

fn check_runs(n_runs: usize) -> Result<()> {
    if n_runs == 0 {
        Err(Error::InvalidParameter { name: "n_runs", value: 0.0 })
    } else {
        Ok(())
    }
}

impl NoiseProcess {
    /// Average outer product `x xᵀ` of `n_runs` fresh realizations.
    pub fn cross_covariance<R>(&mut self, n_runs: usize, rng: &mut R)
        -> Result<nd::Array2<f64>>
    where R: Rng + ?Sized
    {
        check_runs(n_runs)?;
        let n = self.n_steps();
        let mut acc: nd::Array2<f64> = nd::Array2::zeros((n, n));
        for _ in 0..n_runs {
            let x = self.generate(rng)?.values().view().insert_axis(nd::Axis(1));
            acc += &x.dot(&x.t());
        }
        Ok(acc / n_runs as f64)
    }

    /// Lag-averaged covariance of `n_runs` fresh realizations: element `k`
    /// estimates `Cov(x_i, x_{i + k})`.
    pub fn average_linear_covariance<R>(&mut self, n_runs: usize, rng: &mut R)
        -> Result<nd::Array1<f64>>
    where R: Rng + ?Sized
    {
        check_runs(n_runs)?;
        let mut acc: nd::Array1<f64> = nd::Array1::zeros(self.n_steps());
        for _ in 0..n_runs {
            let x = self.generate(rng)?.values().view().insert_axis(nd::Axis(1));
            acc += &linear_covariance(&x.dot(&x.t()));
        }
        Ok(acc / n_runs as f64)
    }
}
