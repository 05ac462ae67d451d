//! End-to-end scenarios: noise statistics, noiseless gates, dissipation, and
//! convergence of the trajectory average.

use std::f64::consts::PI;
use ndarray as nd;
use ndarray::linalg::kron;
use num_complex::Complex64 as C64;
use rand::{ SeedableRng, rngs::StdRng };
use liouville_mc::{
    ConvergenceOptions,
    Error,
    Hamiltonian,
    Hbar,
    Liouvillian,
    LiouvillianConfig,
    NoiseModel,
    NoiseProcess,
    linalg::{ eye, max_abs_diff, zeros },
    liouvillian::{ lift_unitary, process_to_super, super_to_process },
    pauli::{ PauliBasis, sigma_x, sigma_z },
};

fn seeded() -> LiouvillianConfig {
    LiouvillianConfig { seed: Some(10546), ..Default::default() }
}

fn constant_control(t_final: f64, n_steps: usize, value: f64) -> NoiseProcess {
    let mut p = NoiseProcess::new(t_final, n_steps).unwrap();
    p.set_control(nd::Array1::from_elem(n_steps, value), None).unwrap();
    p
}

fn x_drive() -> Hamiltonian {
    Hamiltonian::new_static(|x: &[f64]| sigma_x() * C64::from(x[0] / 2.0))
}

fn pi_pulse_gate(config: LiouvillianConfig) -> Liouvillian {
    Liouvillian::new(x_drive(), vec![constant_control(1.0, 1, PI)], config)
        .unwrap()
}

#[test]
fn pi_rotation_is_x_up_to_phase() {
    let mut gate = pi_pulse_gate(seeded());
    let U = gate.propagate_unitary().unwrap();
    let phase = U[[0, 1]];
    assert!((phase.norm() - 1.0).abs() < 1e-14);
    let expected = sigma_x() * phase;
    assert!(max_abs_diff(&U, &expected) < 1e-14);
}

#[test]
fn noiseless_x_gate_process_matrix() {
    let mut gate = pi_pulse_gate(seeded());
    gate.propagate().unwrap();
    let mut chi = zeros(4);
    chi[[1, 1]] = C64::from(1.0);
    assert!(max_abs_diff(gate.process_matrix(), &chi) < 1e-9);
}

#[test]
fn zero_hamiltonian_is_identity_on_any_grid() {
    let mut input = NoiseProcess::new(1.0, 4).unwrap();
    input.set_control(
        nd::array![0.3, -1.0, 2.0, 0.0],
        Some(nd::array![0.0, 0.1, 0.15, 0.7, 2.5]),
    ).unwrap();
    let h = Hamiltonian::new_static(|x: &[f64]| zeros(4) * C64::from(x[0]));
    let mut gate = Liouvillian::new(h, vec![input], seeded()).unwrap();
    let S = gate.propagate().unwrap();
    assert!(max_abs_diff(&S, &eye(16)) < 1e-15);
    let chi = gate.process_matrix();
    assert!((chi[[0, 0]] - C64::from(1.0)).norm() < 1e-15);
    assert!(chi.iter().skip(1).all(|c| c.norm() < 1e-15));
}

#[test]
fn identity_hamiltonian_gives_identity_process() {
    // H ∝ I only contributes a global phase
    let h = Hamiltonian::new_static(|x: &[f64]| eye(2) * C64::from(x[0]));
    let mut gate
        = Liouvillian::new(h, vec![constant_control(3.0, 30, 1.7)], seeded())
        .unwrap();
    gate.propagate().unwrap();
    let mut chi = zeros(4);
    chi[[0, 0]] = C64::from(1.0);
    assert!(max_abs_diff(gate.process_matrix(), &chi) < 1e-12);
}

#[test]
fn process_round_trip_two_qubits() {
    let basis = PauliBasis::new(2);
    let cnot = nd::array![
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
        [0.0, 0.0, 1.0, 0.0],
    ].mapv(C64::from);
    let S = lift_unitary(&cnot);
    let chi = super_to_process(&basis, &S);
    assert!(max_abs_diff(&process_to_super(&basis, &chi), &S) < 1e-12);
    // χ of a unitary channel is rank one with unit trace
    assert!((chi.diag().sum() - C64::from(1.0)).norm() < 1e-12);
    let chi2 = chi.dot(&chi);
    assert!(max_abs_diff(&chi2, &chi) < 1e-12);
}

#[test]
fn hbar_convention_rescales_rotation() {
    let config = LiouvillianConfig { hbar: Hbar::Custom(2.0), ..seeded() };
    let mut slow = Liouvillian::new(
        x_drive(), vec![constant_control(1.0, 1, 2.0 * PI)], config).unwrap();
    let mut fast = pi_pulse_gate(seeded());
    let a = slow.propagate_unitary().unwrap();
    let b = fast.propagate_unitary().unwrap();
    assert!(max_abs_diff(&a, &b) < 1e-13);
}

#[test]
fn white_noise_variance() {
    let power = 0.01;
    let n_steps = 1000;
    let mut p = NoiseProcess::new(1.0, n_steps).unwrap();
    p.configure(NoiseModel::White { power }).unwrap();
    let mut rng = StdRng::seed_from_u64(10546);
    let mut sum_sq = 0.0;
    let n_runs = 50;
    for _ in 0..n_runs {
        let r = p.generate(&mut rng).unwrap();
        sum_sq += r.values().mapv(|x| x * x).sum();
    }
    let var = sum_sq / (n_runs * n_steps) as f64;
    let expected = power / p.dt();
    assert!((var / expected - 1.0).abs() < 0.05, "{} vs {}", var, expected);
}

#[test]
fn ornstein_uhlenbeck_lag_one_correlation() {
    let (sigma, decay) = (1.0, 5.0);
    let n_steps = 200;
    let mut p = NoiseProcess::new(1.0, n_steps).unwrap();
    p.configure(NoiseModel::OrnsteinUhlenbeck { sigma, decay }).unwrap();
    let mut rng = StdRng::seed_from_u64(10546);
    let mut cov = 0.0;
    let mut var = 0.0;
    for _ in 0..200 {
        let x = p.generate(&mut rng).unwrap().values().clone();
        for k in 0..n_steps - 1 {
            cov += x[k] * x[k + 1];
            var += x[k] * x[k];
        }
    }
    let expected = (-decay * p.dt()).exp();
    assert!((cov / var - expected).abs() < 0.01, "{} vs {}", cov / var, expected);
}

#[test]
fn pink_noise_end_to_end() {
    let mut p = NoiseProcess::new(1.0, 64).unwrap();
    p.configure(NoiseModel::Pink { amplitude: 1e-2 }).unwrap();
    let mut rng = StdRng::seed_from_u64(10546);
    let r = p.generate(&mut rng).unwrap();
    assert_eq!(r.values().len(), 64);
    assert!(r.values().iter().all(|x| x.is_finite()));
    assert!(p.kl_calculated());
}

#[test]
fn wrong_lindblad_leaves_state_unchanged() {
    let mut gate = pi_pulse_gate(seeded());
    assert!(gate.lindblad_superoperator().is_none());
    let res = gate.add_lindblad(&eye(4), 0.5);
    assert!(matches!(res, Err(Error::LindbladShape { .. })));
    assert!(gate.lindblad_superoperator().is_none());
    // still unitary
    assert!(gate.propagate_unitary().is_ok());
}

#[test]
fn timing_jitter_is_exclusive() {
    let mut p = constant_control(1.0, 10, 1.0);
    p.configure(NoiseModel::TimingJitter { variance: 1e-6 }).unwrap();
    assert!(matches!(p.set_additive(), Err(Error::TimingJitterConflict)));
    let mut q = constant_control(1.0, 10, 1.0);
    q.set_multiplicative(0.5).unwrap();
    assert!(matches!(
        q.configure(NoiseModel::TimingJitter { variance: 1e-6 }),
        Err(Error::TimingJitterConflict),
    ));
}

#[test]
fn jittered_drive_still_propagates() {
    let mut drive = constant_control(1.0, 20, PI);
    drive.configure(NoiseModel::TimingJitter { variance: 1e-6 }).unwrap();
    let mut gate = Liouvillian::new(x_drive(), vec![drive], seeded()).unwrap();
    let S = gate.average_samples(8).unwrap();
    // constant drive over a fixed horizon: jitter only moves breakpoints
    assert!(max_abs_diff(&S, &lift_unitary(&sigma_x())) < 1e-10);
}

#[test]
fn coarse_jitter_runs_to_convergence() {
    // jitter std of half a step would push some points past the endpoints
    let mut drive = constant_control(1.0, 20, PI);
    drive.configure(NoiseModel::TimingJitter { variance: 0.025_f64.powi(2) })
        .unwrap();
    let mut detuning = NoiseProcess::new(1.0, 20).unwrap();
    detuning.configure(NoiseModel::White { power: 1e-4 }).unwrap();
    let h = Hamiltonian::new_static(|x: &[f64]| {
        sigma_x() * C64::from(x[0] / 2.0) + sigma_z() * C64::from(x[1] / 2.0)
    });
    let mut gate = Liouvillian::new(h, vec![drive, detuning], seeded()).unwrap();
    for _ in 0..200 {
        gate.propagate().unwrap();
    }
    let opts = ConvergenceOptions {
        tolerance: 1e-3,
        batch_size: 20,
        max_batches: 1000,
        ..Default::default()
    };
    assert!(gate.run_until_converged(opts).is_ok());
}

#[test]
fn sample_at_boundary_policy() {
    let mut p = constant_control(2.0, 4, 1.0);
    p.set_control(nd::array![1.0, 2.0, 3.0, 4.0], None).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    p.generate(&mut rng).unwrap();
    assert_eq!(p.sample_at(0.0).unwrap(), 1.0);
    assert_eq!(p.sample_at(1.99).unwrap(), 4.0);
    // final grid point clamps to the last value
    assert_eq!(p.sample_at(2.0).unwrap(), 4.0);
    assert!(matches!(p.sample_at(2.1), Err(Error::OutOfHorizon { .. })));
    assert!(matches!(p.sample_at(-1e-3), Err(Error::OutOfHorizon { .. })));
}

fn noisy_gate(sigma: f64) -> Liouvillian {
    let drive = constant_control(1.0, 10, PI);
    let mut detuning = NoiseProcess::new(1.0, 10).unwrap();
    detuning.configure(NoiseModel::Constant { sigma }).unwrap();
    let h = Hamiltonian::new_static(|x: &[f64]| {
        sigma_x() * C64::from(x[0] / 2.0) + sigma_z() * C64::from(x[1] / 2.0)
    });
    Liouvillian::new(h, vec![drive, detuning], seeded()).unwrap()
}

#[test]
fn convergence_matches_large_reference() {
    let opts = ConvergenceOptions {
        tolerance: 1e-3,
        use_parallel: true,
        consecutive_below_tolerance: 2,
        batch_size: 50,
        max_batches: 1000,
    };
    let mut gate = noisy_gate(0.05);
    let S = gate.run_until_converged(opts).unwrap();
    let mut reference = noisy_gate(0.05);
    let R = reference.parallel_average_samples(20, 1000).unwrap();
    let diff = max_abs_diff(&S, &R);
    // the stopping rule bounds the change between running averages, which
    // shrinks like 1/k, while the distance to the mean shrinks like
    // 1/sqrt(k); the estimate can sit several tolerances from the reference
    assert!(diff < 20.0 * opts.tolerance, "diff = {:e}", diff);
}

#[test]
fn dissipative_convergence_is_exact_without_noise() {
    let mut gate = noisy_gate(0.0);
    gate.set_t1(5.0).unwrap();
    gate.set_t2(10.0).unwrap();
    let opts = ConvergenceOptions {
        tolerance: 1e-9,
        batch_size: 3,
        ..Default::default()
    };
    let S = gate.run_until_converged(opts).unwrap();
    let reference = gate.average_samples(3).unwrap();
    assert!(max_abs_diff(&S, &reference) < 1e-9);
    // amplitude damping shrinks the channel away from unitary
    let chi = gate.process_matrix();
    assert!((chi.diag().sum() - C64::from(1.0)).norm() < 1e-12);
    assert!(chi[[1, 1]].re < 1.0 - 1e-3);
}

#[test]
fn two_qubit_identity_channel() {
    let h = Hamiltonian::new_static(|x: &[f64]| {
        kron(&sigma_z(), &eye(2)) * C64::from(0.0 * x[0])
    });
    let mut gate
        = Liouvillian::new(h, vec![constant_control(1.0, 5, 1.0)], seeded())
        .unwrap();
    assert_eq!(gate.n_qubits(), 2);
    gate.propagate().unwrap();
    let chi = gate.process_matrix();
    assert_eq!(chi.shape(), &[16, 16]);
    assert!((chi[[0, 0]] - C64::from(1.0)).norm() < 1e-14);
}
