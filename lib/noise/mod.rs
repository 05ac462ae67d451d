//! Scalar noisy inputs to a [`Liouvillian`][crate::liouvillian::Liouvillian].
//!
//! A [`NoiseProcess`] pairs a [`NoiseModel`] with an optional deterministic
//! control signal on a fixed horizon `[0, t_final]` divided into `n_steps`
//! intervals. Each call to [`NoiseProcess::generate`] draws a fresh
//! [`Realization`].
//!
//! ```ignore
//! let mut rabi = NoiseProcess::new(1.0, 100)?;
//! rabi.set_control(nd::Array1::from_elem(100, PI), None)?;
//! rabi.configure(NoiseModel::OrnsteinUhlenbeck { sigma: 0.1, decay: 10.0 })?;
//! rabi.set_multiplicative(1.0)?;
//! rabi.set_additive()?;
//! let r = rabi.generate(&mut rng)?;
//! ```

use std::fmt;
use ndarray as nd;
use rand::Rng;
use rand_distr::{ Distribution, Normal, StandardNormal };
use tracing::{ debug, warn };
use crate::error::{ Error, Result };

pub mod diagnostics;
pub mod kl;
pub mod model;
pub mod realization;

pub use kl::KlDecomposition;
pub use model::{ CorrelationFn, NoiseModel, pink_correlation };
pub use realization::Realization;

/// A single scalar input: a noise model, optionally combined with a control
/// signal.
#[derive(Clone, Debug)]
pub struct NoiseProcess {
    name: String,
    t_final: f64,
    n_steps: usize,
    model: NoiseModel,
    control: nd::Array1<f64>,
    control_defined: bool,
    times: nd::Array1<f64>,
    additive: bool,
    multiplicative: Option<f64>,
    kl: Option<KlDecomposition>,
    current: Option<Realization>,
}

impl NoiseProcess {
    /// Create a new zero field (white noise of zero power) on `[0, t_final]`
    /// with `n_steps` uniform intervals.
    pub fn new(t_final: f64, n_steps: usize) -> Result<Self> {
        if !t_final.is_finite() || t_final <= 0.0 {
            return Err(Error::InvalidParameter { name: "t_final", value: t_final });
        }
        if n_steps == 0 {
            return Err(Error::InvalidParameter { name: "n_steps", value: 0.0 });
        }
        Ok(Self {
            name: "unnamed".into(),
            t_final,
            n_steps,
            model: NoiseModel::default(),
            control: nd::Array1::zeros(n_steps),
            control_defined: false,
            times: nd::Array1::linspace(0.0, t_final, n_steps + 1),
            additive: false,
            multiplicative: None,
            kl: None,
            current: None,
        })
    }

    /// Create a new process with a user-defined correlation function.
    pub fn with_correlation<F>(t_final: f64, n_steps: usize, corr: F)
        -> Result<Self>
    where F: Fn(f64) -> f64 + Send + Sync + 'static
    {
        let mut process = Self::new(t_final, n_steps)?;
        process.configure(NoiseModel::defined(corr))?;
        Ok(process)
    }

    /// Set the name used in logs.
    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    /// Name used in logs.
    pub fn name(&self) -> &str { &self.name }

    /// Length of the horizon.
    pub fn t_final(&self) -> f64 { self.t_final }

    /// Number of samples per realization.
    pub fn n_steps(&self) -> usize { self.n_steps }

    /// Nominal step size, `t_final / n_steps`.
    pub fn dt(&self) -> f64 { self.t_final / self.n_steps as f64 }

    /// Unperturbed time grid (`n_steps + 1` points).
    pub fn times(&self) -> &nd::Array1<f64> { &self.times }

    /// Control signal (`n_steps` points); zero if none was set.
    pub fn control(&self) -> &nd::Array1<f64> { &self.control }

    /// Active noise model.
    pub fn model(&self) -> &NoiseModel { &self.model }

    /// `true` if the noise is added to the control signal.
    pub fn is_additive(&self) -> bool { self.additive }

    /// Exponent `p` if the noise multiplies `control^p`.
    pub fn multiplicative_power(&self) -> Option<f64> { self.multiplicative }

    /// `true` if the KL decomposition for the current model is cached.
    pub fn kl_calculated(&self) -> bool { self.kl.is_some() }

    /// Most recent realization, if any.
    pub fn current(&self) -> Option<&Realization> { self.current.as_ref() }

    fn reject<T>(&self, err: Error) -> Result<T> {
        warn!("noise process `{}`: {}", self.name, err);
        Err(err)
    }

    /// Select the active noise model, discarding any cached KL
    /// decomposition.
    ///
    /// Timing jitter is refused while the process is additive or
    /// multiplicative.
    pub fn configure(&mut self, model: NoiseModel) -> Result<()> {
        if let Err(err) = model.validate() {
            return self.reject(err);
        }
        if model.is_timing_jitter()
            && (self.additive || self.multiplicative.is_some())
        {
            return self.reject(Error::TimingJitterConflict);
        }
        debug!("noise process `{}`: using {} noise", self.name, model.kind());
        self.model = model;
        self.kl = None;
        Ok(())
    }

    /// Attach a deterministic control signal of length `n_steps`.
    ///
    /// If `times` is given, it must hold `n_steps + 1` finite points; it
    /// replaces the time grid, and its last point becomes `t_final`.
    pub fn set_control(
        &mut self,
        signal: nd::Array1<f64>,
        times: Option<nd::Array1<f64>>,
    ) -> Result<()>
    {
        if signal.len() != self.n_steps {
            return self.reject(
                Error::ControlLength { got: signal.len(), expected: self.n_steps });
        }
        if let Some(bad) = signal.iter().find(|x| !x.is_finite()) {
            return self.reject(
                Error::InvalidParameter { name: "control", value: *bad });
        }
        if let Some(t) = times {
            if t.len() != self.n_steps + 1 {
                return self.reject(
                    Error::ControlTimes { got: t.len(), expected: self.n_steps + 1 });
            }
            let first = t[0];
            let last = t[self.n_steps];
            if t.iter().any(|tk| !tk.is_finite()) || last <= first || last <= 0.0 {
                return self.reject(
                    Error::InvalidParameter { name: "times", value: last });
            }
            if last != self.t_final {
                // correlation samples depend on t_final
                self.kl = None;
            }
            self.t_final = last;
            self.times = t;
        }
        self.control = signal;
        self.control_defined = true;
        Ok(())
    }

    /// Add noise to the control signal.
    pub fn set_additive(&mut self) -> Result<()> {
        self.check_composable()?;
        self.additive = true;
        Ok(())
    }

    /// Multiply the noise by `control^power`.
    pub fn set_multiplicative(&mut self, power: f64) -> Result<()> {
        if !power.is_finite() {
            return self.reject(Error::InvalidParameter { name: "power", value: power });
        }
        self.check_composable()?;
        self.multiplicative = Some(power);
        Ok(())
    }

    fn check_composable(&self) -> Result<()> {
        if !self.control_defined {
            return self.reject(Error::NoControl(self.name.clone()));
        }
        if self.model.is_timing_jitter() {
            return self.reject(Error::TimingJitterConflict);
        }
        Ok(())
    }

    /// Turn off additive and multiplicative composition and timing jitter,
    /// and zero the control signal.
    pub fn clear_controls(&mut self) {
        self.additive = false;
        self.multiplicative = None;
        if self.model.is_timing_jitter() {
            self.model = NoiseModel::default();
        }
        self.control.fill(0.0);
    }

    /// Compute and cache the KL decomposition if the active model needs one
    /// and it is not already cached.
    pub fn prepare(&mut self) -> Result<()> {
        if self.kl.is_none() {
            if let Some(corr) = self.model.correlation_samples(self.t_final, self.n_steps) {
                self.kl = Some(KlDecomposition::new(&corr)?);
                debug!("KL transform calculated for `{}`", self.name);
            }
        }
        Ok(())
    }

    /// Draw a fresh realization and store it as the current one.
    pub fn generate<R>(&mut self, rng: &mut R) -> Result<&Realization>
    where R: Rng + ?Sized
    {
        self.prepare()?;
        let realization = self.sample(rng)?;
        Ok(&*self.current.insert(realization))
    }

    /// Draw a fresh realization without touching `self`.
    ///
    /// Models using a KL decomposition recompute it on every call unless
    /// [`Self::prepare`] has been called first.
    pub fn sample<R>(&self, rng: &mut R) -> Result<Realization>
    where R: Rng + ?Sized
    {
        if let NoiseModel::TimingJitter { variance } = self.model {
            let mut times = self.times.clone();
            let std = variance.sqrt();
            let n = times.len();
            let (t0, tn) = (times[0], times[n - 1]);
            // jittered points stay on the horizon
            times.slice_mut(nd::s![1..n - 1]).iter_mut()
                .for_each(|t| {
                    *t += std * rng.sample::<f64, _>(StandardNormal);
                    *t = t.clamp(t0, tn);
                });
            return Ok(Realization::new(times, self.control.clone()));
        }
        if self.model.is_null() {
            return Ok(Realization::new(self.times.clone(), self.control.clone()));
        }
        let mut x = self.raw_noise(rng)?;
        if let Some(p) = self.multiplicative {
            x = self.control.mapv(|c| c.powf(p)) * x;
        }
        if self.additive {
            x += &self.control;
        }
        Ok(Realization::new(self.times.clone(), x))
    }

    fn raw_noise<R>(&self, rng: &mut R) -> Result<nd::Array1<f64>>
    where R: Rng + ?Sized
    {
        let n = self.n_steps;
        let dt = self.dt();
        let normal = |std: f64| {
            Normal::new(0.0, std)
                .map_err(|_| Error::InvalidParameter { name: "sigma", value: std })
        };
        let x: nd::Array1<f64>
            = match &self.model {
                NoiseModel::White { power } => {
                    let dist = normal((power / dt).sqrt())?;
                    (0..n).map(|_| dist.sample(rng)).collect()
                },
                NoiseModel::Constant { sigma } => {
                    nd::Array1::from_elem(n, normal(*sigma)?.sample(rng))
                },
                NoiseModel::WhiteAndConstant { white_power, constant_sigma } => {
                    let white = normal((white_power / dt).sqrt())?;
                    let offset = normal(*constant_sigma)?.sample(rng);
                    (0..n).map(|_| white.sample(rng) + offset).collect()
                },
                NoiseModel::OrnsteinUhlenbeck { sigma, decay } => {
                    let r = (-decay * dt).exp();
                    let step = normal(sigma * (1.0 - r.powi(2)).sqrt())?;
                    let mut x = nd::Array1::zeros(n);
                    x[0] = normal(*sigma)?.sample(rng);
                    for k in 1..n {
                        x[k] = r * x[k - 1] + step.sample(rng);
                    }
                    x
                },
                NoiseModel::Pink { .. } | NoiseModel::Defined(_) => {
                    match &self.kl {
                        Some(kl) => kl.sample(rng),
                        None => {
                            let corr
                                = self.model
                                .correlation_samples(self.t_final, n)
                                .unwrap_or_default();
                            KlDecomposition::new(&corr)?.sample(rng)
                        },
                    }
                },
                NoiseModel::TimingJitter { .. } => nd::Array1::zeros(n),
            };
        Ok(x)
    }

    /// Value of the current realization at a given index.
    pub fn noise_at(&self, index: usize) -> Result<f64> {
        self.current.as_ref()
            .ok_or_else(|| Error::NotGenerated(self.name.clone()))?
            .get(index)
    }

    /// Value of the current realization on the grid interval containing
    /// `time`. See [`Realization::sample_at`].
    pub fn sample_at(&self, time: f64) -> Result<f64> {
        self.current.as_ref()
            .ok_or_else(|| Error::NotGenerated(self.name.clone()))?
            .sample_at(time)
    }
}

impl fmt::Display for NoiseProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = |a: &nd::Array1<f64>| -> Vec<f64> {
            a.iter().take(10).copied().collect()
        };
        writeln!(f, "Process Name: {}", self.name)?;
        writeln!(f, "First 10 Control Fields: {:?}", head(&self.control))?;
        writeln!(f, "Number of Steps: {}", self.n_steps)?;
        writeln!(f, "Final Time: {}", self.t_final)?;
        writeln!(f, "Noise Type: {}", self.model.kind())?;
        writeln!(f, "KL Calculated: {}", self.kl.is_some())?;
        writeln!(f, "Additive Noise: {}", self.additive)?;
        writeln!(f, "Multiplicative Noise: {:?}", self.multiplicative)?;
        writeln!(f, "Timing Jitter Noise: {}", self.model.is_timing_jitter())?;
        write!(f, "First 10 Times: {:?}", head(&self.times))
    }
}
