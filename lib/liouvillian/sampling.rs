//! Trajectory averaging: sequential, parallel, and convergence-driven.
//!
//! Every trajectory is driven by its own [`StdRng`], seeded from the
//! engine's master generator before any work is dispatched, so a fixed
//! configuration seed reproduces the same estimate whether batches run on one
//! thread or many.

use std::{
    sync::{ Arc, atomic::{ AtomicBool, Ordering } },
    time::{ Duration, Instant },
};
use ndarray as nd;
use num_complex::Complex64 as C64;
use rand::{ Rng, SeedableRng, rngs::StdRng };
use rayon::prelude::*;
use tracing::{ info, warn };
use crate::{
    error::{ Error, Result },
    linalg::{ all_finite, max_abs_diff },
};
use super::Liouvillian;

/// Cooperative cancellation flag shared between a caller and a running
/// [`Liouvillian`].
///
/// Polled before each trajectory starts and between batches; a trajectory
/// already being integrated runs to completion.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create a new, un-cancelled handle.
    pub fn new() -> Self { Self::default() }

    /// Request cancellation.
    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

    /// Clear a previous cancellation request.
    pub fn reset(&self) { self.0.store(false, Ordering::SeqCst); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

/// Options for [`Liouvillian::run_until_converged`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConvergenceOptions {
    /// Largest entrywise change in the running average counted as
    /// converged.
    pub tolerance: f64,
    /// Run each batch's trajectories in parallel.
    pub use_parallel: bool,
    /// Number of successive batches that must each change the running
    /// average by less than `tolerance`.
    pub consecutive_below_tolerance: usize,
    /// Trajectories per batch.
    pub batch_size: usize,
    /// Maximum number of batches attempted, counting discarded ones.
    pub max_batches: usize,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            use_parallel: false,
            consecutive_below_tolerance: 1,
            batch_size: 100,
            max_batches: 10_000,
        }
    }
}

impl ConvergenceOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(
                Error::InvalidParameter { name: "tolerance", value: self.tolerance });
        }
        let counts = [
            ("consecutive_below_tolerance", self.consecutive_below_tolerance),
            ("batch_size", self.batch_size),
            ("max_batches", self.max_batches),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::InvalidParameter { name, value: 0.0 });
            }
        }
        Ok(())
    }
}

struct BatchGuard<'a> {
    cancel: &'a CancelHandle,
    deadline: Option<Duration>,
    started: Instant,
}

impl<'a> BatchGuard<'a> {
    fn new(cancel: &'a CancelHandle, deadline: Option<Duration>) -> Self {
        Self { cancel, deadline, started: Instant::now() }
    }

    fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if self.started.elapsed() > deadline {
                return Err(Error::DeadlineExceeded(deadline.as_secs_f64()));
            }
        }
        Ok(())
    }
}

// errors after which a batch is discarded and retried
fn is_numerical(err: &Error) -> bool {
    matches!(err, Error::NonFinite(_) | Error::Singular(_))
}

impl Liouvillian {
    fn prepare_inputs(&mut self) -> Result<()> {
        self.inputs.iter_mut().try_for_each(|input| input.prepare())
    }

    fn draw_seeds(&mut self, n: usize) -> Vec<u64> {
        (0..n).map(|_| self.rng.gen()).collect()
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!("Liouvillian `{}`: {}", self.name, Error::Cancelled);
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    // Mean superoperator over one trajectory per seed. Nothing is stored.
    fn batch_mean(&self, seeds: &[u64], parallel: bool) -> Result<nd::Array2<C64>> {
        let trajectory = self.trajectory();
        let guard = BatchGuard::new(&self.cancel, self.config.batch_deadline());
        let run = |seed: u64| -> Result<nd::Array2<C64>> {
            guard.check()?;
            trajectory.superoperator(&mut StdRng::seed_from_u64(seed))
        };
        let mut acc = self.zero_superoperator();
        if parallel {
            let samples: Vec<nd::Array2<C64>>
                = seeds.par_iter()
                .map(|seed| run(*seed))
                .collect::<Result<Vec<_>>>()?;
            samples.iter().for_each(|S| { acc += S; });
        } else {
            for seed in seeds.iter() {
                acc += &run(*seed)?;
            }
        }
        Ok(acc / C64::from(seeds.len() as f64))
    }

    /// Run a single trajectory. Equivalent to
    /// [`propagate`][Liouvillian::propagate].
    pub fn single_sample(&mut self) -> Result<nd::Array2<C64>> {
        self.check_cancelled()?;
        self.propagate()
    }

    /// Average the superoperators of `n` independent trajectories, run one
    /// after another, and store the result.
    pub fn average_samples(&mut self, n: usize) -> Result<nd::Array2<C64>> {
        if n == 0 {
            return Err(Error::InvalidParameter { name: "n", value: 0.0 });
        }
        self.check_cancelled()?;
        self.prepare_inputs()?;
        let seeds = self.draw_seeds(n);
        let S = self.batch_mean(&seeds, false)?;
        self.set_evolution_superoperator(S.clone())?;
        self.report(format_args!(
            "evolution superoperator after {} repetitions:\n{:.3}\n\
            process matrix after {} repetitions:\n{:.3}",
            n, self.superoperator, n, self.process,
        ));
        Ok(S)
    }

    /// Average `batches` groups of `per_batch` trajectories, each group run
    /// across the rayon thread pool, and store the result.
    ///
    /// Every trajectory in a group finishes before the group is averaged;
    /// cancellation is checked between groups and before each trajectory.
    pub fn parallel_average_samples(&mut self, batches: usize, per_batch: usize)
        -> Result<nd::Array2<C64>>
    {
        if batches == 0 {
            return Err(Error::InvalidParameter { name: "batches", value: 0.0 });
        }
        if per_batch == 0 {
            return Err(Error::InvalidParameter { name: "per_batch", value: 0.0 });
        }
        self.prepare_inputs()?;
        let mut acc = self.zero_superoperator();
        for _ in 0..batches {
            self.check_cancelled()?;
            let seeds = self.draw_seeds(per_batch);
            acc += &self.batch_mean(&seeds, true)?;
        }
        let S = acc / C64::from(batches as f64);
        self.set_evolution_superoperator(S.clone())?;
        self.report(format_args!(
            "evolution superoperator after {} x {} repetitions:\n{:.3}",
            batches, per_batch, self.superoperator,
        ));
        Ok(S)
    }

    /// Average batches of trajectories until the running average settles.
    ///
    /// After each batch, the running average over `k` accepted batches is
    /// updated as `(k * old + batch) / (k + 1)`, and the largest entrywise
    /// change is compared to `opts.tolerance`. Batches whose mean contains
    /// NaN or infinite entries, or whose propagation fails numerically, are
    /// discarded without counting toward the average.
    ///
    /// The running estimate is stored whenever the loop ends, including on
    /// failure. Fails with [`Error::NotConverged`] after `opts.max_batches`
    /// attempts, or with [`Error::Cancelled`] or [`Error::DeadlineExceeded`].
    pub fn run_until_converged(&mut self, opts: ConvergenceOptions)
        -> Result<nd::Array2<C64>>
    {
        opts.validate()?;
        self.prepare_inputs()?;
        let mut running: Option<nd::Array2<C64>> = None;
        let mut completed: usize = 0;
        let mut below: usize = 0;
        let mut attempts: usize = 0;
        let mut error = f64::INFINITY;
        while below < opts.consecutive_below_tolerance {
            if attempts >= opts.max_batches {
                self.store_estimate(running)?;
                let err = Error::NotConverged { batches: attempts, error };
                warn!("Liouvillian `{}`: {}", self.name, err);
                return Err(err);
            }
            if let Err(err) = self.check_cancelled() {
                self.store_estimate(running)?;
                return Err(err);
            }
            attempts += 1;
            let seeds = self.draw_seeds(opts.batch_size);
            let batch
                = match self.batch_mean(&seeds, opts.use_parallel) {
                    Ok(S) if all_finite(&S) => S,
                    Ok(_) => {
                        warn!(
                            "Liouvillian `{}`: discarding batch {} with \
                            non-finite entries",
                            self.name, attempts,
                        );
                        continue;
                    },
                    Err(err) if is_numerical(&err) => {
                        warn!(
                            "Liouvillian `{}`: discarding batch {}: {}",
                            self.name, attempts, err,
                        );
                        continue;
                    },
                    Err(err) => {
                        self.store_estimate(running)?;
                        return Err(err);
                    },
                };
            let new
                = match running.take() {
                    None => batch,
                    Some(old) => {
                        let k = C64::from(completed as f64);
                        let new = (&old * k + &batch) / (k + 1.0);
                        error = max_abs_diff(&new, &old);
                        if error < opts.tolerance { below += 1; } else { below = 0; }
                        new
                    },
                };
            running = Some(new);
            completed += 1;
            if self.config.is_verbose() {
                info!(
                    "Liouvillian `{}`: completed {} batches ({} trajectories); \
                    error {:e}",
                    self.name, completed, completed * opts.batch_size, error,
                );
            }
        }
        let S = running.ok_or(Error::NotConverged { batches: attempts, error })?;
        self.set_evolution_superoperator(S.clone())?;
        self.report(format_args!(
            "converged after {} batches with error {:e}:\n{:.3}",
            completed, error, self.superoperator,
        ));
        Ok(S)
    }

    fn store_estimate(&mut self, estimate: Option<nd::Array2<C64>>) -> Result<()> {
        match estimate {
            Some(S) => self.set_evolution_superoperator(S),
            None => Ok(()),
        }
    }
}
