#![allow(non_snake_case)]

//! Process matrix of a single-qubit X gate driven by a trapezoidal pulse with
//! Ornstein-Uhlenbeck amplitude noise, white detuning noise, and T1/T2 decay.

use std::{ f64::consts::PI, path::PathBuf };
use anyhow::Context;
use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::info;
use tracing_subscriber::{ fmt, prelude::*, EnvFilter };
use liouville_mc::{
    ConvergenceOptions,
    Hamiltonian,
    Liouvillian,
    LiouvillianConfig,
    NoiseModel,
    NoiseProcess,
    pauli::{ sigma_x, sigma_z },
    pulse::max_field,
};

const C_MAX: f64 = 2.0 * PI; // rad / μs
const DELTA_C: f64 = 0.5; // rad / μs
const DELTA_T: f64 = 0.01; // μs
const T1: f64 = 100.0; // μs
const T2: f64 = 50.0; // μs

fn init_logging() {
    let filter
        = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let (control, times) = max_field(PI, C_MAX, DELTA_C, DELTA_T)
        .context("building the pulse")?;
    let n_steps = control.len();
    let t_final = times[n_steps];

    let mut rabi = NoiseProcess::new(t_final, n_steps)?;
    rabi.set_name("rabi");
    rabi.set_control(control, Some(times.clone()))?;
    rabi.configure(NoiseModel::OrnsteinUhlenbeck { sigma: 0.02, decay: 10.0 })?;
    rabi.set_multiplicative(1.0)?;
    rabi.set_additive()?;

    let mut detuning = NoiseProcess::new(t_final, n_steps)?;
    detuning.set_name("detuning");
    // share the pulse grid so the merged grid has no near-duplicate points
    detuning.set_control(nd::Array1::zeros(n_steps), Some(times))?;
    detuning.configure(NoiseModel::White { power: 1e-5 })?;

    let H = Hamiltonian::new_static(|x: &[f64]| {
        sigma_x() * C64::from(x[0] / 2.0) + sigma_z() * C64::from(x[1] / 2.0)
    });
    let config = LiouvillianConfig {
        name: Some("noisy_x".into()),
        seed: Some(10546),
        ..Default::default()
    };
    let mut gate = Liouvillian::new(H, vec![rabi, detuning], config)?;
    gate.set_t1(T1)?;
    gate.set_t2(T2)?;

    let opts = ConvergenceOptions {
        tolerance: 1e-4,
        use_parallel: true,
        consecutive_below_tolerance: 3,
        batch_size: 64,
        max_batches: 500,
    };
    gate.run_until_converged(opts).context("averaging trajectories")?;

    let chi: &nd::Array2<C64> = gate.process_matrix();
    info!("process matrix:\n{:.5}", chi);
    let outdir = PathBuf::from("output");
    std::fs::create_dir_all(&outdir)?;
    let path = gate.write_process_matrix(&outdir, opts.tolerance)?;
    println!("wrote {}", path.display());
    Ok(())
}
