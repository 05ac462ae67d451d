//! Construction options for a [`Liouvillian`][crate::liouvillian::Liouvillian].
//!
//! All fields have defaults, so a config can be built in code with struct
//! update syntax or read from a (possibly partial) TOML table:
//! ```text
//! verbose = true
//! hbar = "electron_volt_seconds"
//! n_qubits = 1
//! seed = 10546
//! ```

use std::{ path::Path, time::Duration };
use serde::{ Deserialize, Serialize };
use crate::error::{ Error, Result };

/// Reduced Planck constant in eV s.
pub const HBAR_EVS: f64 = 6.58211814e-16;

/// Reduced Planck constant in J s.
pub const HBAR_JS: f64 = 1.05457148e-34;

/// Unit convention for ħ, which divides the Hamiltonian in every propagator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hbar {
    /// ħ = 1; Hamiltonians are given in units of angular frequency.
    #[default]
    One,
    /// Hamiltonians in eV, times in seconds.
    ElectronVoltSeconds,
    /// Hamiltonians in J, times in seconds.
    JouleSeconds,
    /// Any other positive value.
    Custom(f64),
}

impl Hbar {
    /// Numerical value of ħ under this convention.
    pub fn value(&self) -> f64 {
        match *self {
            Self::One => 1.0,
            Self::ElectronVoltSeconds => HBAR_EVS,
            Self::JouleSeconds => HBAR_JS,
            Self::Custom(h) => h,
        }
    }
}

/// Options recognized by [`Liouvillian::new`][crate::liouvillian::Liouvillian::new].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiouvillianConfig {
    /// Log propagation summaries and final matrices at `info` level.
    pub verbose: bool,
    /// Additionally log per-step Hamiltonians and superoperators. Implies
    /// `verbose`.
    pub very_verbose: bool,
    /// ħ convention.
    pub hbar: Hbar,
    /// Number of qubits; inferred from the Hamiltonian when `None`.
    pub n_qubits: Option<usize>,
    /// Pass time as the leading argument to the Hamiltonian function.
    pub time_dependent: bool,
    /// Identifier used in logs and export file names; a random UUID when
    /// `None`.
    pub name: Option<String>,
    /// Seed for the master random number stream; drawn from entropy when
    /// `None`.
    pub seed: Option<u64>,
    /// Wall-clock limit, in seconds, for each batch of trajectories.
    pub batch_deadline_secs: Option<f64>,
}

impl LiouvillianConfig {
    /// Parse a config from a TOML string. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load<P>(path: P) -> Result<Self>
    where P: AsRef<Path>
    {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check that all numerical options are in range.
    pub fn validate(&self) -> Result<()> {
        let hbar = self.hbar.value();
        if !(hbar.is_finite() && hbar > 0.0) {
            return Err(Error::InvalidParameter { name: "hbar", value: hbar });
        }
        if let Some(n) = self.n_qubits {
            if n == 0 {
                return Err(
                    Error::InvalidParameter { name: "n_qubits", value: 0.0 });
            }
        }
        if let Some(secs) = self.batch_deadline_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(
                    Error::InvalidParameter {
                        name: "batch_deadline_secs",
                        value: secs,
                    }
                );
            }
        }
        Ok(())
    }

    /// `true` if either verbosity flag is set.
    pub fn is_verbose(&self) -> bool { self.verbose || self.very_verbose }

    pub(crate) fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline_secs.map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_from_empty_table() {
        let config = LiouvillianConfig::from_toml_str("").unwrap();
        assert_eq!(config, LiouvillianConfig::default());
        assert_eq!(config.hbar.value(), 1.0);
        assert!(!config.is_verbose());
    }

    #[test]
    fn partial_table() {
        let config = LiouvillianConfig::from_toml_str(
            "very_verbose = true\nhbar = \"electron_volt_seconds\"\nseed = 7\n"
        ).unwrap();
        assert!(config.is_verbose());
        assert_eq!(config.hbar.value(), HBAR_EVS);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.n_qubits, None);
    }

    #[test]
    fn custom_hbar() {
        let config
            = LiouvillianConfig::from_toml_str("hbar = { custom = 2.5 }\n")
            .unwrap();
        assert_eq!(config.hbar, Hbar::Custom(2.5));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            LiouvillianConfig::from_toml_str("n_qubits = 0\n"),
            Err(Error::InvalidParameter { name: "n_qubits", .. }),
        ));
        assert!(matches!(
            LiouvillianConfig::from_toml_str("hbar = { custom = -1.0 }\n"),
            Err(Error::InvalidParameter { name: "hbar", .. }),
        ));
        assert!(matches!(
            LiouvillianConfig::from_toml_str("verbose = 3\n"),
            Err(Error::Config(_)),
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.toml");
        std::fs::write(&path, "name = \"x_gate\"\ntime_dependent = true\n")
            .unwrap();
        let config = LiouvillianConfig::load(&path).unwrap();
        assert_eq!(config.name.as_deref(), Some("x_gate"));
        assert!(config.time_dependent);
    }
}
