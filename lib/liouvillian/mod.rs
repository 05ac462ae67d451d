//! Monte Carlo propagation of noisy, possibly dissipative, qubit dynamics.
//!
//! A [`Liouvillian`] owns a [`Hamiltonian`] and one [`NoiseProcess`] per
//! Hamiltonian argument. Each trajectory draws a fresh realization of every
//! input, evaluates the Hamiltonian on the merged time grid, and integrates
//! the resulting piecewise-constant generator into an evolution
//! superoperator. Averages over many trajectories estimate the noisy channel,
//! which is also available as a process matrix in the normalized
//! tensor-Pauli basis.
//!
//! All superoperators act on column-stacked density matrices; see
//! [`process`] for the basis-change conventions.

use std::{
    fmt,
    path::{ Path, PathBuf },
};
use ndarray as nd;
use num_complex::Complex64 as C64;
use rand::{ Rng, SeedableRng, rngs::StdRng };
use tracing::{ debug, info, warn };
use crate::{
    config::LiouvillianConfig,
    error::{ Error, Result },
    export,
    linalg::{ eye, zeros },
    noise::NoiseProcess,
    pauli::{ PauliBasis, embed, sigma_minus, sigma_z },
};

pub mod hamiltonian;
pub mod process;
pub mod propagate;
pub mod sampling;

pub use hamiltonian::{ Hamiltonian, HamiltonianSequence, StaticFn, TimedFn };
pub use process::{ process_to_super, super_to_process };
pub use propagate::{ lift_unitary, lindblad_term };
pub use sampling::{ CancelHandle, ConvergenceOptions };

/// Monte Carlo engine for the evolution superoperator of a noisy gate.
#[derive(Debug)]
pub struct Liouvillian {
    name: String,
    hamiltonian: Hamiltonian,
    inputs: Vec<NoiseProcess>,
    config: LiouvillianConfig,
    time_dependent: bool,
    hbar: f64,
    n_qubits: usize,
    dim: usize,
    t_start: f64,
    t_final: f64,
    n_steps: usize,
    basis: PauliBasis,
    lindblad: Option<nd::Array2<C64>>,
    superoperator: nd::Array2<C64>,
    process: nd::Array2<C64>,
    unitary: Option<nd::Array2<C64>>,
    hamiltonians: Option<HamiltonianSequence>,
    rng: StdRng,
    cancel: CancelHandle,
}

// Borrowed, read-only view of everything one trajectory needs. Shared across
// worker threads.
#[derive(Copy, Clone)]
pub(crate) struct Trajectory<'a> {
    hamiltonian: &'a Hamiltonian,
    inputs: &'a [NoiseProcess],
    lindblad: Option<&'a nd::Array2<C64>>,
    hbar: f64,
    dim: usize,
    frozen_time: Option<f64>,
}

impl<'a> Trajectory<'a> {
    fn sequence<R>(&self, rng: &mut R) -> Result<HamiltonianSequence>
    where R: Rng + ?Sized
    {
        let realizations
            = self.inputs.iter()
            .map(|p| p.sample(&mut *rng))
            .collect::<Result<Vec<_>>>()?;
        HamiltonianSequence::build(
            self.hamiltonian, &realizations, self.dim, self.frozen_time)
    }

    fn integrate(&self, seq: &HamiltonianSequence)
        -> Result<(nd::Array2<C64>, Option<nd::Array2<C64>>)>
    {
        match self.lindblad {
            Some(L) => {
                let S = propagate::superoperator(seq, L, self.hbar, self.dim)?;
                Ok((S, None))
            },
            None => {
                let U = propagate::unitary(seq, self.hbar, self.dim)?;
                Ok((lift_unitary(&U), Some(U)))
            },
        }
    }

    pub(crate) fn superoperator<R>(&self, rng: &mut R)
        -> Result<nd::Array2<C64>>
    where R: Rng + ?Sized
    {
        let seq = self.sequence(rng)?;
        self.integrate(&seq).map(|(S, _)| S)
    }
}

impl Liouvillian {
    /// Create a new `Liouvillian`.
    ///
    /// The qubit count is inferred from the Hamiltonian evaluated with every
    /// input equal to 1, unless `config.n_qubits` is set, in which case the
    /// two must agree. The horizon and step count are those of the first
    /// input.
    pub fn new(
        hamiltonian: Hamiltonian,
        inputs: Vec<NoiseProcess>,
        config: LiouvillianConfig,
    ) -> Result<Self>
    {
        config.validate()?;
        let first = inputs.first().ok_or(Error::NoInputs)?;
        let t_start = first.times()[0];
        let t_final = first.t_final();
        let n_steps = first.n_steps();

        let probe = hamiltonian.eval(t_start, &vec![1.0; inputs.len()]);
        let (nrows, ncols) = probe.dim();
        if nrows != ncols {
            return Err(Error::HamiltonianShape {
                index: 0,
                got: [nrows, ncols],
                expected: [nrows, nrows],
            });
        }
        if !nrows.is_power_of_two() {
            return Err(Error::NotPowerOfTwo(nrows));
        }
        let n_qubits = nrows.trailing_zeros() as usize;
        if let Some(n) = config.n_qubits {
            if n != n_qubits {
                return Err(Error::QubitMismatch { got: n_qubits, expected: n });
            }
        }
        let dim = nrows;

        let name
            = config.name.clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let rng
            = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
        let basis = PauliBasis::new(n_qubits);
        let superoperator = eye(dim * dim);
        let process = super_to_process(&basis, &superoperator);
        let time_dependent = config.time_dependent;
        let hbar = config.hbar.value();
        let liouvillian = Self {
            name,
            hamiltonian,
            inputs,
            config,
            time_dependent,
            hbar,
            n_qubits,
            dim,
            t_start,
            t_final,
            n_steps,
            basis,
            lindblad: None,
            superoperator,
            process,
            unitary: None,
            hamiltonians: None,
            rng,
            cancel: CancelHandle::new(),
        };
        liouvillian.report(format_args!(
            "Liouvillian `{}` defined on {} qubits; final time {}; {} time steps",
            liouvillian.name,
            liouvillian.n_qubits,
            liouvillian.t_final,
            liouvillian.n_steps,
        ));
        Ok(liouvillian)
    }

    fn report(&self, args: fmt::Arguments<'_>) {
        if self.config.is_verbose() {
            info!("{}", args);
        } else {
            debug!("{}", args);
        }
    }

    fn report_detail(&self, args: fmt::Arguments<'_>) {
        if self.config.very_verbose {
            info!("{}", args);
        }
    }

    /// Set the identifier used in logs and export file names.
    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }

    /// Identifier used in logs and export file names.
    pub fn name(&self) -> &str { &self.name }

    /// Pass the grid time to a [`Hamiltonian::Timed`]. When unset, timed
    /// Hamiltonians are evaluated at the start of the horizon throughout.
    pub fn set_time_dependent(&mut self, time_dependent: bool) -> &mut Self {
        self.time_dependent = time_dependent;
        self
    }

    /// `true` if the grid time is passed to the Hamiltonian.
    pub fn is_time_dependent(&self) -> bool { self.time_dependent }

    pub fn n_qubits(&self) -> usize { self.n_qubits }

    /// Hilbert space dimension, `2^n`.
    pub fn dim(&self) -> usize { self.dim }

    pub fn t_final(&self) -> f64 { self.t_final }

    pub fn n_steps(&self) -> usize { self.n_steps }

    pub fn dt(&self) -> f64 { self.t_final / self.n_steps as f64 }

    /// Numerical value of ħ in use.
    pub fn hbar(&self) -> f64 { self.hbar }

    pub fn config(&self) -> &LiouvillianConfig { &self.config }

    /// Operator basis for process matrices.
    pub fn basis(&self) -> &PauliBasis { &self.basis }

    /// Input noise processes, in Hamiltonian argument order.
    pub fn inputs(&self) -> &[NoiseProcess] { &self.inputs }

    /// Mutable access to a single input, e.g. to reconfigure its noise
    /// model between runs.
    pub fn input_mut(&mut self, index: usize) -> Option<&mut NoiseProcess> {
        self.inputs.get_mut(index)
    }

    /// Handle that cancels running and future sampling calls until reset.
    pub fn cancel_handle(&self) -> CancelHandle { self.cancel.clone() }

    /// Accumulated Lindblad superoperator, if any terms were added.
    pub fn lindblad_superoperator(&self) -> Option<&nd::Array2<C64>> {
        self.lindblad.as_ref()
    }

    /// Add a dissipator `rate * D[op]` to the Lindblad superoperator.
    ///
    /// Fails without modifying anything if `op` is not `2^n x 2^n` or `rate`
    /// is negative or non-finite.
    pub fn add_lindblad(&mut self, op: &nd::Array2<C64>, rate: f64) -> Result<()> {
        if op.dim() != (self.dim, self.dim) {
            let err = Error::LindbladShape {
                got: [op.nrows(), op.ncols()],
                expected: [self.dim, self.dim],
            };
            warn!("Liouvillian `{}`: {}", self.name, err);
            return Err(err);
        }
        if !(rate.is_finite() && rate >= 0.0) {
            let err = Error::InvalidParameter { name: "rate", value: rate };
            warn!("Liouvillian `{}`: {}", self.name, err);
            return Err(err);
        }
        let term = lindblad_term(op, rate);
        self.report_detail(format_args!("added Lindblad superoperator:\n{:.3}", term));
        match self.lindblad.as_mut() {
            Some(L) => { *L += &term; },
            None => { self.lindblad = Some(term); },
        }
        Ok(())
    }

    /// Add amplitude damping with time constant `t1` on every qubit.
    pub fn set_t1(&mut self, t1: f64) -> Result<()> {
        self.add_local_decay(&sigma_minus(), "t1", t1)
    }

    /// Add pure dephasing with time constant `t2` on every qubit.
    pub fn set_t2(&mut self, t2: f64) -> Result<()> {
        self.add_local_decay(&sigma_z(), "t2", t2)
    }

    fn add_local_decay(
        &mut self,
        op: &nd::Array2<C64>,
        name: &'static str,
        time: f64,
    ) -> Result<()>
    {
        if !(time.is_finite() && time > 0.0) {
            return Err(Error::InvalidParameter { name, value: time });
        }
        let ops: Vec<nd::Array2<C64>>
            = (0..self.n_qubits).map(|q| embed(op, q, self.n_qubits)).collect();
        ops.iter().try_for_each(|L| self.add_lindblad(L, 1.0 / time))
    }

    pub(crate) fn trajectory(&self) -> Trajectory<'_> {
        Trajectory {
            hamiltonian: &self.hamiltonian,
            inputs: &self.inputs,
            lindblad: self.lindblad.as_ref(),
            hbar: self.hbar,
            dim: self.dim,
            frozen_time: (!self.time_dependent).then_some(self.t_start),
        }
    }

    fn build_sequence(&mut self) -> Result<HamiltonianSequence> {
        let mut realizations = Vec::with_capacity(self.inputs.len());
        for input in self.inputs.iter_mut() {
            realizations.push(input.generate(&mut self.rng)?.clone());
        }
        let frozen_time = (!self.time_dependent).then_some(self.t_start);
        let seq = HamiltonianSequence::build(
            &self.hamiltonian, &realizations, self.dim, frozen_time)?;
        if let Some(last) = seq.H.shape().last().copied().filter(|n| *n > 0) {
            self.report_detail(format_args!(
                "first Hamiltonian:\n{:.3}\nfinal Hamiltonian:\n{:.3}",
                seq.H.index_axis(nd::Axis(2), 0),
                seq.H.index_axis(nd::Axis(2), last - 1),
            ));
        }
        Ok(seq)
    }

    /// Draw fresh realizations of every input and evaluate the Hamiltonian
    /// on their merged time grid.
    pub fn build_hamiltonians(&mut self) -> Result<&HamiltonianSequence> {
        let seq = self.build_sequence()?;
        Ok(&*self.hamiltonians.insert(seq))
    }

    /// Hamiltonians of the most recent trajectory.
    pub fn hamiltonians(&self) -> Option<&HamiltonianSequence> {
        self.hamiltonians.as_ref()
    }

    /// Run a single trajectory, store its superoperator (and process matrix),
    /// and return the superoperator.
    pub fn propagate(&mut self) -> Result<nd::Array2<C64>> {
        let seq = self.build_sequence()?;
        let (S, U) = self.trajectory().integrate(&seq)?;
        self.hamiltonians = Some(seq);
        if let Some(U) = U.as_ref() {
            self.report(format_args!("final unitary matrix:\n{:.3}", U));
        }
        self.unitary = U;
        self.set_evolution_superoperator(S.clone())?;
        self.report(format_args!(
            "evolution superoperator:\n{:.3}\nprocess matrix:\n{:.3}",
            self.superoperator, self.process,
        ));
        Ok(S)
    }

    /// Like [`Self::propagate`], but return the trajectory's unitary.
    ///
    /// Fails if any Lindblad terms have been added.
    pub fn propagate_unitary(&mut self) -> Result<nd::Array2<C64>> {
        if self.lindblad.is_some() {
            warn!("Liouvillian `{}`: {}", self.name, Error::NotUnitary);
            return Err(Error::NotUnitary);
        }
        self.propagate()?;
        self.unitary.clone().ok_or(Error::NotUnitary)
    }

    /// Unitary of the most recent [`Self::propagate`] call without Lindblad
    /// terms.
    pub fn unitary(&self) -> Option<&nd::Array2<C64>> { self.unitary.as_ref() }

    /// Convert a superoperator to a process matrix in this engine's basis.
    pub fn super_to_process(&self, S: &nd::Array2<C64>) -> nd::Array2<C64> {
        super_to_process(&self.basis, S)
    }

    /// Convert a process matrix to a superoperator in this engine's basis.
    pub fn process_to_super(&self, chi: &nd::Array2<C64>) -> nd::Array2<C64> {
        process_to_super(&self.basis, chi)
    }

    fn check_shape(&self, what: &'static str, A: &nd::Array2<C64>) -> Result<()> {
        let d = self.dim * self.dim;
        if A.dim() != (d, d) {
            return Err(Error::MatrixShape {
                what,
                got: [A.nrows(), A.ncols()],
                expected: [d, d],
            });
        }
        Ok(())
    }

    /// Store an evolution superoperator, recomputing the process matrix.
    pub fn set_evolution_superoperator(&mut self, S: nd::Array2<C64>) -> Result<()> {
        self.check_shape("evolution superoperator", &S)?;
        self.process = super_to_process(&self.basis, &S);
        self.superoperator = S;
        self.report_detail(format_args!(
            "stored superoperator:\n{:.3}\nstored process matrix:\n{:.3}",
            self.superoperator, self.process,
        ));
        Ok(())
    }

    /// Store a process matrix, recomputing the evolution superoperator.
    pub fn set_process_matrix(&mut self, chi: nd::Array2<C64>) -> Result<()> {
        self.check_shape("process matrix", &chi)?;
        self.superoperator = process_to_super(&self.basis, &chi);
        self.process = chi;
        Ok(())
    }

    /// Most recently stored evolution superoperator.
    pub fn evolution_superoperator(&self) -> &nd::Array2<C64> {
        &self.superoperator
    }

    /// Most recently stored process matrix.
    pub fn process_matrix(&self) -> &nd::Array2<C64> { &self.process }

    /// Write the stored process matrix to `<dir>/process_matrix_<name>.out`,
    /// rounded according to `tolerance`. Returns the path written.
    pub fn write_process_matrix<P>(&self, dir: P, tolerance: f64) -> Result<PathBuf>
    where P: AsRef<Path>
    {
        let path = dir.as_ref().join(format!("process_matrix_{}.out", self.name));
        let text = export::format_process_matrix(
            &self.name, self.t_final, &self.process, tolerance)?;
        std::fs::write(&path, text)?;
        self.report(format_args!("wrote process matrix to {}", path.display()));
        Ok(path)
    }

    pub(crate) fn zero_superoperator(&self) -> nd::Array2<C64> {
        zeros(self.dim * self.dim)
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;
    use crate::{
        linalg::test::assert_matrix_close,
        pauli::sigma_x,
    };
    use super::*;

    fn rabi(omega: f64) -> Hamiltonian {
        Hamiltonian::new_static(move |x: &[f64]| sigma_x() * C64::from(omega * x[0] / 2.0))
    }

    fn seeded() -> LiouvillianConfig {
        LiouvillianConfig { seed: Some(10546), ..Default::default() }
    }

    fn unit_input(n_steps: usize) -> NoiseProcess {
        let mut p = NoiseProcess::new(1.0, n_steps).unwrap();
        p.set_control(nd::Array1::ones(n_steps), None).unwrap();
        p
    }

    #[test]
    fn construction_infers_qubits() {
        let L = Liouvillian::new(rabi(PI), vec![unit_input(1)], seeded()).unwrap();
        assert_eq!(L.n_qubits(), 1);
        assert_eq!(L.dim(), 2);
        assert_eq!(L.basis().len(), 4);
        assert_eq!(L.evolution_superoperator(), &eye(4));
        // default name is a UUID
        assert_eq!(L.name().len(), 36);
    }

    #[test]
    fn construction_failures() {
        assert!(matches!(
            Liouvillian::new(rabi(PI), vec![], seeded()),
            Err(Error::NoInputs),
        ));
        let bad = Hamiltonian::new_static(|_: &[f64]| nd::Array2::zeros((3, 3)));
        assert!(matches!(
            Liouvillian::new(bad, vec![unit_input(1)], seeded()),
            Err(Error::NotPowerOfTwo(3)),
        ));
        let config = LiouvillianConfig { n_qubits: Some(2), ..seeded() };
        assert!(matches!(
            Liouvillian::new(rabi(PI), vec![unit_input(1)], config),
            Err(Error::QubitMismatch { got: 1, expected: 2 }),
        ));
    }

    #[test]
    fn pi_pulse_is_x() {
        let mut L
            = Liouvillian::new(rabi(PI), vec![unit_input(1)], seeded()).unwrap();
        let U = L.propagate_unitary().unwrap();
        assert_matrix_close(&U, &(sigma_x() * C64::new(0.0, -1.0)), 1e-14);
        let mut chi = nd::Array2::zeros((4, 4));
        chi[[1, 1]] = C64::from(1.0);
        assert_matrix_close(L.process_matrix(), &chi, 1e-9);
    }

    #[test]
    fn zero_hamiltonian_is_identity() {
        let zero = Hamiltonian::new_static(|_: &[f64]| zeros(2));
        let mut L
            = Liouvillian::new(zero, vec![unit_input(10)], seeded()).unwrap();
        let S = L.propagate().unwrap();
        assert_matrix_close(&S, &eye(4), 1e-15);
        assert_eq!(L.hamiltonians().unwrap().len(), 10);
    }

    #[test]
    fn lindblad_shape_rejected() {
        let mut L
            = Liouvillian::new(rabi(PI), vec![unit_input(1)], seeded()).unwrap();
        L.set_t1(2.0).unwrap();
        let before = L.lindblad_superoperator().unwrap().clone();
        let res = L.add_lindblad(&eye(4), 1.0);
        assert!(matches!(
            res,
            Err(Error::LindbladShape { got: [4, 4], expected: [2, 2] }),
        ));
        assert_eq!(L.lindblad_superoperator().unwrap(), &before);
        assert!(L.add_lindblad(&sigma_x(), -1.0).is_err());
        assert!(matches!(L.propagate_unitary(), Err(Error::NotUnitary)));
    }

    #[test]
    fn t1_t2_on_every_qubit() {
        let two = Hamiltonian::new_static(|_: &[f64]| zeros(4));
        let mut L
            = Liouvillian::new(two, vec![unit_input(1)], seeded()).unwrap();
        L.set_t1(1.0).unwrap();
        L.set_t2(4.0).unwrap();
        let mut expected = zeros(16);
        for q in 0..2 {
            expected += &lindblad_term(&embed(&sigma_minus(), q, 2), 1.0);
            expected += &lindblad_term(&embed(&sigma_z(), q, 2), 0.25);
        }
        assert_matrix_close(L.lindblad_superoperator().unwrap(), &expected, 1e-14);
        assert!(L.set_t1(0.0).is_err());
    }

    #[test]
    fn state_setters_stay_consistent() {
        let mut L
            = Liouvillian::new(rabi(PI), vec![unit_input(1)], seeded()).unwrap();
        let S = lift_unitary(&sigma_x());
        L.set_evolution_superoperator(S.clone()).unwrap();
        let chi = L.process_matrix().clone();
        L.set_process_matrix(eye(4) * C64::from(0.25)).unwrap();
        L.set_process_matrix(chi).unwrap();
        assert_matrix_close(L.evolution_superoperator(), &S, 1e-13);
        assert!(matches!(
            L.set_evolution_superoperator(eye(2)),
            Err(Error::MatrixShape { .. }),
        ));
    }

    #[test]
    fn timed_hamiltonian_frozen_unless_time_dependent() {
        // H(t) = π t σx / 2 integrates to a π/4 rotation, or zero when frozen
        // at t = 0
        let h = Hamiltonian::new_timed(|t, _: &[f64]| sigma_x() * C64::from(PI * t / 2.0));
        let mut L
            = Liouvillian::new(h, vec![unit_input(1)], seeded()).unwrap();
        let U = L.propagate_unitary().unwrap();
        assert_matrix_close(&U, &eye(2), 1e-15);
        L.set_time_dependent(true);
        assert!(L.is_time_dependent());
        // single step samples H at t = 0 only; refine the grid
        let mut fine
            = Liouvillian::new(
                Hamiltonian::new_timed(|t, _: &[f64]| sigma_x() * C64::from(PI * t / 2.0)),
                vec![unit_input(1000)],
                LiouvillianConfig { time_dependent: true, ..seeded() },
            ).unwrap();
        let U = fine.propagate_unitary().unwrap();
        // left Riemann sum of π t / 2 over [0, 1] with 1000 steps
        let theta: f64 = (0..1000).map(|k| PI * k as f64 / 1000.0 / 2.0 / 1000.0).sum();
        let expected = nd::array![
            [C64::new(theta.cos(), 0.0), C64::new(0.0, -theta.sin())],
            [C64::new(0.0, -theta.sin()), C64::new(theta.cos(), 0.0)],
        ];
        assert_matrix_close(&U, &expected, 1e-12);
    }

    #[test]
    fn write_process_matrix_to_dir() {
        let mut L
            = Liouvillian::new(rabi(PI), vec![unit_input(1)], seeded()).unwrap();
        L.set_name("x_gate");
        L.propagate().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = L.write_process_matrix(dir.path(), 1e-8).unwrap();
        assert!(path.ends_with("process_matrix_x_gate.out"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("x_gate\n\n1.0\n\n[\n\t[(0.0,0.0), "));
    }
}
