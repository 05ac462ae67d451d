//! Crate-wide error type.
//!
//! Configuration errors (bad control lengths, misshapen Lindblad operators,
//! conflicting noise models) are reported through this type and leave the
//! receiver untouched.

use thiserror::Error;

/// Errors produced while configuring noise processes or propagating a
/// [`Liouvillian`][crate::liouvillian::Liouvillian].
#[derive(Debug, Error)]
pub enum Error {
    #[error("control signal has length {got}, must be length {expected}")]
    ControlLength { got: usize, expected: usize },

    #[error("control time grid has length {got}, must be length {expected}")]
    ControlTimes { got: usize, expected: usize },

    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("timing jitter cannot be combined with additive or multiplicative noise")]
    TimingJitterConflict,

    #[error("noise process `{0}` has no control signal defined")]
    NoControl(String),

    #[error("noise process `{0}` has not generated a realization yet")]
    NotGenerated(String),

    #[error("time {time} lies outside the defined horizon [{start}, {end}]")]
    OutOfHorizon { time: f64, start: f64, end: f64 },

    #[error("index {index} is out of range for a realization of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("a Liouvillian needs at least one input noise process")]
    NoInputs,

    #[error("Hamiltonian at grid index {index} has shape {got:?}, expected {expected:?}")]
    HamiltonianShape {
        index: usize,
        got: [usize; 2],
        expected: [usize; 2],
    },

    #[error("Hamiltonian dimension {0} is not a power of two")]
    NotPowerOfTwo(usize),

    #[error("Hamiltonian acts on {got} qubits, but {expected} were configured")]
    QubitMismatch { got: usize, expected: usize },

    #[error("{what} has shape {got:?}, expected {expected:?}")]
    MatrixShape {
        what: &'static str,
        got: [usize; 2],
        expected: [usize; 2],
    },

    #[error("Lindblad operator has shape {got:?}, expected {expected:?}; it will not be included")]
    LindbladShape { got: [usize; 2], expected: [usize; 2] },

    #[error("evolution is non-unitary when Lindblad terms are present")]
    NotUnitary,

    #[error("encountered a non-finite entry in {0}")]
    NonFinite(&'static str),

    #[error("no convergence after {batches} batches (last error {error:e})")]
    NotConverged { batches: usize, error: f64 },

    #[error("propagation was cancelled")]
    Cancelled,

    #[error("batch exceeded its deadline of {0} s")]
    DeadlineExceeded(f64),

    #[error("eigendecomposition failed: {0}")]
    Eigen(String),

    #[error("encountered a singular matrix in {0}")]
    Singular(&'static str),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
