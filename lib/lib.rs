#![allow(non_snake_case)]

//! Monte Carlo estimation of noisy quantum channels.
//!
//! Scalar control and noise inputs are described by
//! [`NoiseProcess`][noise::NoiseProcess]es and fed to a user-supplied
//! Hamiltonian by a [`Liouvillian`][liouvillian::Liouvillian], which averages
//! the evolution superoperators of many independent trajectories.

pub mod error;
pub mod config;
pub mod special;
pub mod linalg;
pub mod pauli;
pub mod noise;
pub mod pulse;
pub mod liouvillian;
pub mod export;

pub use error::{ Error, Result };
pub use config::{ Hbar, LiouvillianConfig };
pub use noise::{ NoiseModel, NoiseProcess, Realization };
pub use liouvillian::{ ConvergenceOptions, CancelHandle, Hamiltonian, Liouvillian };
