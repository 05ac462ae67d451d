//! Hamiltonian functions and the piecewise-constant sequences built from
//! them.

use std::{ fmt, sync::Arc };
use itertools::Itertools;
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use crate::{
    error::{ Error, Result },
    linalg::all_finite,
    noise::Realization,
};

/// `H(x_1, ..., x_m)`
pub type StaticFn
    = Arc<dyn Fn(&[f64]) -> nd::Array2<C64> + Send + Sync>;

/// `H(t, x_1, ..., x_m)`
pub type TimedFn
    = Arc<dyn Fn(f64, &[f64]) -> nd::Array2<C64> + Send + Sync>;

/// A user-supplied Hamiltonian, taking one scalar per input noise process.
///
/// Must be a pure function: it is called once per grid point per trajectory,
/// possibly from several threads at once.
#[derive(Clone)]
pub enum Hamiltonian {
    /// Depends only on the inputs.
    Static(StaticFn),
    /// Additionally depends explicitly on time.
    Timed(TimedFn),
}

impl fmt::Debug for Hamiltonian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => write!(f, "Static(...)"),
            Self::Timed(_) => write!(f, "Timed(...)"),
        }
    }
}

impl Hamiltonian {
    /// Create a new [`Self::Static`].
    pub fn new_static<F>(f: F) -> Self
    where F: Fn(&[f64]) -> nd::Array2<C64> + Send + Sync + 'static
    {
        Self::Static(Arc::new(f))
    }

    /// Create a new [`Self::Timed`].
    pub fn new_timed<F>(f: F) -> Self
    where F: Fn(f64, &[f64]) -> nd::Array2<C64> + Send + Sync + 'static
    {
        Self::Timed(Arc::new(f))
    }

    /// `true` for [`Self::Timed`].
    pub fn is_timed(&self) -> bool { matches!(self, Self::Timed(_)) }

    /// Evaluate at a given time.
    ///
    /// `time` is ignored by [`Self::Static`].
    pub fn eval(&self, time: f64, inputs: &[f64]) -> nd::Array2<C64> {
        match self {
            Self::Static(f) => (f.as_ref())(inputs),
            Self::Timed(f) => (f.as_ref())(time, inputs),
        }
    }
}

/// Piecewise-constant Hamiltonians for a single trajectory.
///
/// `H` holds one matrix per grid point with time on the last axis; the
/// matrix at `times[k]` acts over the interval `dts[k]`, so the final matrix
/// never enters a propagator.
#[derive(Clone, Debug)]
pub struct HamiltonianSequence {
    pub times: nd::Array1<f64>,
    pub dts: nd::Array1<f64>,
    pub H: nd::Array3<C64>,
}

impl HamiltonianSequence {
    /// Evaluate `hamiltonian` on the sorted, deduplicated union of the
    /// realizations' time grids, sampling every realization at every point.
    ///
    /// If `frozen_time` is `Some`, a [`Hamiltonian::Timed`] is evaluated at
    /// that fixed time instead of the grid time.
    ///
    /// Fails if a realization cannot be sampled at a grid point, or if any
    /// Hamiltonian is not `dim x dim` or has non-finite entries.
    pub fn build(
        hamiltonian: &Hamiltonian,
        realizations: &[Realization],
        dim: usize,
        frozen_time: Option<f64>,
    ) -> Result<Self>
    {
        let times: nd::Array1<f64>
            = realizations.iter()
            .flat_map(|r| r.times().iter().copied())
            .sorted_by(f64::total_cmp)
            .dedup()
            .collect();
        let dts: nd::Array1<f64> = array_diff(&times);
        let mut H: nd::Array3<C64> = nd::Array3::zeros((dim, dim, times.len()));
        let mut inputs: Vec<f64> = vec![0.0; realizations.len()];
        for (k, &t) in times.iter().enumerate() {
            for (x, r) in inputs.iter_mut().zip(realizations) {
                *x = r.sample_at(t)?;
            }
            let h = hamiltonian.eval(frozen_time.unwrap_or(t), &inputs);
            if h.dim() != (dim, dim) {
                return Err(Error::HamiltonianShape {
                    index: k,
                    got: [h.nrows(), h.ncols()],
                    expected: [dim, dim],
                });
            }
            if !all_finite(&h) {
                return Err(Error::NonFinite("Hamiltonian"));
            }
            H.slice_mut(s![.., .., k]).assign(&h);
        }
        Ok(Self { times, dts, H })
    }

    /// Number of intervals.
    pub fn len(&self) -> usize { self.dts.len() }

    /// `true` if the grid has fewer than two points.
    pub fn is_empty(&self) -> bool { self.dts.is_empty() }

    /// Iterate over `(H_k, dt_k)` pairs in time order.
    pub fn intervals(&self)
        -> impl Iterator<Item = (nd::ArrayView2<'_, C64>, f64)> + '_
    {
        self.H.axis_iter(nd::Axis(2)).zip(self.dts.iter().copied())
    }
}

fn array_diff(arr: &nd::Array1<f64>) -> nd::Array1<f64> {
    arr.iter().zip(arr.iter().skip(1))
        .map(|(ak, akp1)| *akp1 - *ak)
        .collect()
}
