//! Immutable outcome of a single noise draw.

use ndarray as nd;
use crate::error::{ Error, Result };

/// Relative slack allowed when testing whether a time lies on the horizon.
const HORIZON_EPS: f64 = 1e-12;

/// A piecewise-constant signal: `values[k]` holds on `[times[k], times[k + 1])`.
///
/// `times` normally has one more element than `values`. Produced by
/// [`NoiseProcess::generate`][super::NoiseProcess::generate]; never mutated
/// afterward, so realizations can be handed to other threads freely.
#[derive(Clone, Debug, PartialEq)]
pub struct Realization {
    times: nd::Array1<f64>,
    values: nd::Array1<f64>,
    sorted: bool,
}

impl Realization {
    /// Create a new `Realization`.
    pub fn new(times: nd::Array1<f64>, values: nd::Array1<f64>) -> Self {
        let sorted
            = times.iter().zip(times.iter().skip(1))
            .all(|(tk, tkp1)| tk <= tkp1);
        Self { times, values, sorted }
    }

    /// Grid points.
    pub fn times(&self) -> &nd::Array1<f64> { &self.times }

    /// Sample values.
    pub fn values(&self) -> &nd::Array1<f64> { &self.values }

    /// Consume `self`, returning the grid points and the values.
    pub fn into_parts(self) -> (nd::Array1<f64>, nd::Array1<f64>) {
        (self.times, self.values)
    }

    /// Value at a given index.
    pub fn get(&self, index: usize) -> Result<f64> {
        self.values.get(index).copied()
            .ok_or(Error::IndexOutOfRange { index, len: self.values.len() })
    }

    /// First and last grid points.
    pub fn horizon(&self) -> (f64, f64) {
        let start = self.times.first().copied().unwrap_or(0.0);
        let end = self.times.last().copied().unwrap_or(0.0);
        (start, end)
    }

    /// Value on the grid interval containing `time`, i.e. at the last grid
    /// point not after `time`.
    ///
    /// Times at or past the final grid point, but still on the horizon, are
    /// clamped to the last value. Times off the horizon are an error.
    pub fn sample_at(&self, time: f64) -> Result<f64> {
        let (start, end) = self.horizon();
        let slack = HORIZON_EPS * start.abs().max(end.abs()).max(1.0);
        if self.values.is_empty()
            || !time.is_finite()
            || time < start - slack
            || time > end + slack
        {
            return Err(Error::OutOfHorizon { time, start, end });
        }
        let k: usize
            = if self.sorted {
                self.times.as_slice()
                    .map(|t| t.partition_point(|&tk| tk <= time))
                    .unwrap_or_else(|| {
                        self.times.iter().take_while(|&&tk| tk <= time).count()
                    })
                    .saturating_sub(1)
            } else {
                self.times.iter().rposition(|&tk| tk <= time).unwrap_or(0)
            };
        Ok(self.values[k.min(self.values.len() - 1)])
    }
}
