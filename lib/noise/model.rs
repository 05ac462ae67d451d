//! Noise model descriptions.

use std::{ f64::consts::PI, fmt, sync::Arc };
use crate::{
    error::{ Error, Result },
    special::{ cosine_integral, sinc },
};

/// Thread-safe correlation function `C(t)`.
pub type CorrelationFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// The statistics of a single scalar noise input.
#[derive(Clone)]
pub enum NoiseModel {
    /// White noise with flat power spectrum `S(ω) = power`, discretized with
    /// per-sample standard deviation `sqrt(power / dt)`.
    White {
        power: f64,
    },
    /// 1/f noise `S(ω) = amplitude / ω` with cutoffs `1 / (10 t_final)` and
    /// `10 n_steps / t_final`.
    Pink {
        amplitude: f64,
    },
    /// A single Gaussian offset held constant over the whole horizon.
    Constant {
        sigma: f64,
    },
    /// Stationary Ornstein-Uhlenbeck process with standard deviation `sigma`
    /// and correlation decay rate `decay`.
    OrnsteinUhlenbeck {
        sigma: f64,
        decay: f64,
    },
    /// Sum of independent white and constant noise.
    WhiteAndConstant {
        white_power: f64,
        constant_sigma: f64,
    },
    /// Gaussian process with a user-supplied correlation function.
    Defined(CorrelationFn),
    /// Gaussian jitter of the interior time grid points, with the given
    /// variance.
    TimingJitter {
        variance: f64,
    },
}

impl fmt::Debug for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White { power }
                => write!(f, "White {{ power: {:?} }}", power),
            Self::Pink { amplitude }
                => write!(f, "Pink {{ amplitude: {:?} }}", amplitude),
            Self::Constant { sigma }
                => write!(f, "Constant {{ sigma: {:?} }}", sigma),
            Self::OrnsteinUhlenbeck { sigma, decay }
                => write!(f,
                    "OrnsteinUhlenbeck {{ sigma: {:?}, decay: {:?} }}",
                    sigma, decay,
                ),
            Self::WhiteAndConstant { white_power, constant_sigma }
                => write!(f,
                    "WhiteAndConstant {{ \
                    white_power: {:?}, \
                    constant_sigma: {:?} \
                    }}",
                    white_power, constant_sigma,
                ),
            Self::Defined(_) => write!(f, "Defined(...)"),
            Self::TimingJitter { variance }
                => write!(f, "TimingJitter {{ variance: {:?} }}", variance),
        }
    }
}

impl Default for NoiseModel {
    fn default() -> Self { Self::White { power: 0.0 } }
}

fn check_nonneg(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}

impl NoiseModel {
    /// Create a new [`Self::Defined`] from a closure.
    pub fn defined<F>(f: F) -> Self
    where F: Fn(f64) -> f64 + Send + Sync + 'static
    {
        Self::Defined(Arc::new(f))
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::White { .. } => "white",
            Self::Pink { .. } => "pink",
            Self::Constant { .. } => "constant",
            Self::OrnsteinUhlenbeck { .. } => "ou",
            Self::WhiteAndConstant { .. } => "white_and_constant",
            Self::Defined(_) => "defined",
            Self::TimingJitter { .. } => "timing",
        }
    }

    /// Check that all model parameters are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::White { power } => check_nonneg("power", *power),
            Self::Pink { amplitude } => check_nonneg("amplitude", *amplitude),
            Self::Constant { sigma } => check_nonneg("sigma", *sigma),
            Self::OrnsteinUhlenbeck { sigma, decay } => {
                check_nonneg("sigma", *sigma)?;
                check_nonneg("decay", *decay)
            },
            Self::WhiteAndConstant { white_power, constant_sigma } => {
                check_nonneg("white_power", *white_power)?;
                check_nonneg("constant_sigma", *constant_sigma)
            },
            Self::Defined(_) => Ok(()),
            Self::TimingJitter { variance } => check_nonneg("variance", *variance),
        }
    }

    /// `true` if the model synthesizes its realizations from a KL
    /// decomposition.
    pub fn uses_kl(&self) -> bool {
        matches!(self, Self::Pink { .. } | Self::Defined(_))
    }

    /// `true` for [`Self::TimingJitter`].
    pub fn is_timing_jitter(&self) -> bool {
        matches!(self, Self::TimingJitter { .. })
    }

    /// `true` if every realization is identically zero (zero-power white
    /// noise).
    pub fn is_null(&self) -> bool {
        matches!(self, Self::White { power } if *power == 0.0)
    }

    /// Sample the correlation function at lags `k t_final / n_steps`,
    /// `k = 0, ..., n_steps - 1`, for models that go through a KL
    /// decomposition.
    ///
    /// For [`Self::Pink`] the singular zero-lag sample is replaced by the
    /// first nonzero-lag sample.
    pub fn correlation_samples(&self, t_final: f64, n_steps: usize)
        -> Option<Vec<f64>>
    {
        let dt = t_final / n_steps as f64;
        match self {
            Self::Defined(f) => {
                Some((0..n_steps).map(|k| (f.as_ref())(k as f64 * dt)).collect())
            },
            Self::Pink { amplitude } => {
                let corr = pink_correlation(*amplitude, t_final, n_steps);
                let mut c: Vec<f64>
                    = (0..n_steps).map(|k| corr(k as f64 * dt)).collect();
                if n_steps > 1 {
                    c[0] = c[1];
                } else {
                    // only the singular sample exists; use one step's lag
                    c[0] = corr(dt);
                }
                Some(c)
            },
            _ => None,
        }
    }
}

/// Closed-form correlation function of 1/f noise with spectrum
/// `amplitude / ω` integrated between `ω_min = 1 / (10 t_final)` and
/// `ω_max = 10 n_steps / t_final`:
/// ```text
/// C(t) = (A / π) [ sinc(ω_min t) + Ci(ω_max t) - Ci(ω_min t) ]
/// ```
pub fn pink_correlation(amplitude: f64, t_final: f64, n_steps: usize)
    -> impl Fn(f64) -> f64
{
    let w_min = 1.0 / (10.0 * t_final);
    let w_max = 10.0 * n_steps as f64 / t_final;
    move |t: f64| {
        amplitude / PI * (
            sinc(w_min * t)
            + cosine_integral(w_max * t)
            - cosine_integral(w_min * t)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validation() {
        assert!(NoiseModel::White { power: 1.0 }.validate().is_ok());
        assert!(NoiseModel::Constant { sigma: -1.0 }.validate().is_err());
        assert!(
            NoiseModel::OrnsteinUhlenbeck { sigma: 1.0, decay: f64::NAN }
            .validate().is_err()
        );
        assert!(NoiseModel::defined(|t| (-t).exp()).validate().is_ok());
    }

    #[test]
    fn defined_samples_on_step_grid() {
        let model = NoiseModel::defined(|t| 2.0 * t);
        let c = model.correlation_samples(1.0, 4).unwrap();
        assert_eq!(c, vec![0.0, 0.5, 1.0, 1.5]);
        assert!(NoiseModel::Constant { sigma: 1.0 }
            .correlation_samples(1.0, 4).is_none());
    }

    #[test]
    fn pink_regularized() {
        let model = NoiseModel::Pink { amplitude: 1.0 };
        let c = model.correlation_samples(1.0, 50).unwrap();
        assert!(c.iter().all(|ck| ck.is_finite()));
        assert_eq!(c[0], c[1]);
        // correlations decay with lag
        assert!(c[1] > c[10] && c[10] > c[49]);
    }

    #[test]
    fn flags() {
        assert!(NoiseModel::default().is_null());
        assert!(!NoiseModel::White { power: 1e-3 }.is_null());
        assert!(NoiseModel::Pink { amplitude: 1.0 }.uses_kl());
        assert!(NoiseModel::TimingJitter { variance: 1e-8 }.is_timing_jitter());
        assert_eq!(NoiseModel::default().kind(), "white");
    }
}
