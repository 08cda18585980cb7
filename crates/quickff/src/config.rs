//! Configuration settings for a quickff run

use std::{fmt::Debug, path::Path};

use ics::{
    Siic,
    units::{ANGSTROM, DEG},
};
use serde::Deserialize;

use crate::Error;

#[cfg(test)]
mod tests;

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawAmplitudes {
    /// half width of bond scans in Å
    bond: Option<f64>,

    /// half width of bend scans in degrees
    bend: Option<f64>,

    /// half width of out-of-plane distance scans in Å
    opdist: Option<f64>,

    /// half width of dihedral scans in degrees
    dihed: Option<f64>,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    /// JSON file holding the ab initio reference: labels, geometry in Å,
    /// energy, gradient and Hessian in atomic units, and optionally force
    /// field atom types and bonds
    reference: String,

    /// File to store the perturbation trajectories in. If it already exists,
    /// the trajectories are read from it instead of being generated.
    fns_traj: Option<String>,

    /// Whether to leave dihedrals out of the perturbation trajectories.
    /// Defaults to true, in which case dihedral force constants come from the
    /// Hessian refinement alone.
    skip_dihedrals: Option<bool>,

    /// The number of points in each perturbation trajectory. Defaults to 11.
    steps: Option<usize>,

    /// The number of points in the trajectories generated for plotting.
    /// Defaults to 51.
    plot_steps: Option<usize>,

    /// Half widths of the perturbation trajectories for each kind of
    /// coordinate.
    amplitudes: Option<RawAmplitudes>,

    /// Convergence threshold in atomic units for the constrained relaxations.
    relax_tol: Option<f64>,

    /// Maximum number of Newton iterations per relaxation.
    relax_max_iter: Option<usize>,

    /// Relative singular value cutoff in the Hessian least-squares fit.
    rcond: Option<f64>,

    /// Whether to generate trajectories for different coordinates in
    /// parallel.
    parallel: Option<bool>,

    /// The size of the thread pool for parallel generation. 0 means one
    /// thread per CPU.
    threads: Option<usize>,
}

/// Half widths of the perturbation trajectories in bohr and radians
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Amplitudes {
    pub bond: f64,
    pub bend: f64,
    pub opdist: f64,
    pub dihed: f64,
}

impl Default for Amplitudes {
    fn default() -> Self {
        Self {
            bond: 0.05 * ANGSTROM,
            bend: 5.0 * DEG,
            opdist: 0.05 * ANGSTROM,
            dihed: 10.0 * DEG,
        }
    }
}

impl From<RawAmplitudes> for Amplitudes {
    fn from(ra: RawAmplitudes) -> Self {
        let def = Self::default();
        Self {
            bond: ra.bond.map_or(def.bond, |a| a * ANGSTROM),
            bend: ra.bend.map_or(def.bend, |a| a * DEG),
            opdist: ra.opdist.map_or(def.opdist, |a| a * ANGSTROM),
            dihed: ra.dihed.map_or(def.dihed, |a| a * DEG),
        }
    }
}

impl Amplitudes {
    /// the half width for the kind of coordinate `siic` is
    pub fn get(&self, siic: &Siic) -> f64 {
        match siic {
            Siic::Stretch(..) => self.bond,
            Siic::Bend(..) => self.bend,
            Siic::OopDist(..) => self.opdist,
            Siic::Torsion(..) => self.dihed,
        }
    }
}

/// Construct a full `Config` using [Config::load] on a TOML file or use
/// [Config::new] and the Builder pattern
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "RawConfig")]
pub struct Config {
    /// path to the reference data
    pub reference: String,

    /// optional trajectory store
    pub fns_traj: Option<String>,

    /// leave dihedrals out of stage one. this is the only place the policy is
    /// decided
    pub skip_dihedrals: bool,

    pub steps: usize,

    pub plot_steps: usize,

    pub amplitudes: Amplitudes,

    pub relax_tol: f64,

    pub relax_max_iter: usize,

    pub rcond: f64,

    pub parallel: bool,

    pub threads: usize,
}

impl From<RawConfig> for Config {
    fn from(rc: RawConfig) -> Self {
        let def = Self::new(rc.reference);
        Self {
            fns_traj: rc.fns_traj,
            skip_dihedrals: rc.skip_dihedrals.unwrap_or(def.skip_dihedrals),
            steps: rc.steps.unwrap_or(def.steps),
            plot_steps: rc.plot_steps.unwrap_or(def.plot_steps),
            amplitudes: rc.amplitudes.map(Amplitudes::from).unwrap_or_default(),
            relax_tol: rc.relax_tol.unwrap_or(def.relax_tol),
            relax_max_iter: rc.relax_max_iter.unwrap_or(def.relax_max_iter),
            rcond: rc.rcond.unwrap_or(def.rcond),
            parallel: rc.parallel.unwrap_or(def.parallel),
            threads: rc.threads.unwrap_or(def.threads),
            ..def
        }
    }
}

impl Config {
    /// Construct a [Config] with default values for `fns_traj` (`None`),
    /// `skip_dihedrals` (`true`), `steps` (11), `plot_steps` (51),
    /// `amplitudes` (0.05 Å, 5°, 0.05 Å, 10°), `relax_tol` (1e-7),
    /// `relax_max_iter` (100), `rcond` (1e-10), `parallel` (`false`), and
    /// `threads` (0)
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            fns_traj: None,
            skip_dihedrals: true,
            steps: 11,
            plot_steps: 51,
            amplitudes: Amplitudes::default(),
            relax_tol: 1e-7,
            relax_max_iter: 100,
            rcond: 1e-10,
            parallel: false,
            threads: 0,
        }
    }

    pub fn fns_traj(mut self, path: impl Into<String>) -> Self {
        self.fns_traj = Some(path.into());
        self
    }

    pub fn skip_dihedrals(mut self, b: bool) -> Self {
        self.skip_dihedrals = b;
        self
    }

    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn plot_steps(mut self, steps: usize) -> Self {
        self.plot_steps = steps;
        self
    }

    pub fn relax_tol(mut self, tol: f64) -> Self {
        self.relax_tol = tol;
        self
    }

    pub fn rcond(mut self, rcond: f64) -> Self {
        self.rcond = rcond;
        self
    }

    pub fn parallel(mut self, b: bool) -> Self {
        self.parallel = b;
        self
    }

    /// load a [Config] from the TOML file specified by `filename`. panics on
    /// failure to read the file and on failure to deserialize it.
    pub fn load<P>(filename: P) -> Self
    where
        P: AsRef<Path> + Debug,
    {
        let contents = std::fs::read_to_string(&filename).unwrap_or_else(|e| {
            panic!("failed to load config file '{filename:?}' with {e}")
        });
        toml::from_str(&contents).unwrap_or_else(|e| {
            panic!("failed to deserialize config file '{filename:?}' with {e}")
        })
    }

    /// check that the settings in `self` make any sense
    pub fn validate(&self) -> Result<(), Error> {
        if self.steps < 3 || self.plot_steps < 3 {
            return Err(Error::Config(format!(
                "at least 3 steps are needed for a harmonic fit, got steps = \
                 {} and plot_steps = {}",
                self.steps, self.plot_steps
            )));
        }
        let a = &self.amplitudes;
        if [a.bond, a.bend, a.opdist, a.dihed].iter().any(|&x| x <= 0.0) {
            return Err(Error::Config(String::from(
                "perturbation amplitudes must be positive",
            )));
        }
        if self.relax_tol <= 0.0 || self.relax_max_iter == 0 {
            return Err(Error::Config(String::from(
                "relax_tol and relax_max_iter must be positive",
            )));
        }
        if !(0.0..1.0).contains(&self.rcond) {
            return Err(Error::Config(format!(
                "rcond must be in [0, 1), got {}",
                self.rcond
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Config {
            reference,
            fns_traj,
            skip_dihedrals,
            steps,
            plot_steps,
            amplitudes,
            relax_tol,
            relax_max_iter,
            rcond,
            parallel,
            threads,
        } = self;
        write!(
            f,
            "
Configuration Options:
reference = {reference}
fns_traj = {}
skip_dihedrals = {skip_dihedrals}
steps = {steps}
plot_steps = {plot_steps}
amplitudes = {{ bond = {:.4} A, bend = {:.2} deg, opdist = {:.4} A, dihed = {:.2} deg }}
relax_tol = {relax_tol:e}
relax_max_iter = {relax_max_iter}
rcond = {rcond:e}
parallel = {parallel}
threads = {threads}
",
            fns_traj.as_deref().unwrap_or("none"),
            amplitudes.bond / ANGSTROM,
            amplitudes.bend / DEG,
            amplitudes.opdist / ANGSTROM,
            amplitudes.dihed / DEG,
        )
    }
}
