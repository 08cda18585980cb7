//! The two-stage pipeline: relaxed perturbation trajectories fit per
//! coordinate, then a global Hessian least-squares refinement.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::AtomicBool,
};

use ics::{Ic, System};
use pes::{Form, Lagrange, Potential, Relaxer};
use rayon::prelude::*;
use regex::Regex;

use crate::{
    Error,
    config::Config,
    cost::{HessianFcCost, Refinement},
    export,
    fftable::{DataArray, FFTable},
    model::Model,
    observer::Observer,
    perturbation::{PertTheory, estimate},
    trajectory::{self, Trajectories},
};

const RULE: &str = "~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~\
                    ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~";

const HEADER: &str = "
                              quickff
      harmonic force fields from ab initio reference data
";

const FOOTER: &str = "
                       normal termination of quickff
";

/// What [Program::plot_pt] did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlotSummary {
    /// coordinates whose trajectories came from the store
    pub read: Vec<String>,

    /// coordinates whose trajectories were generated in this run
    pub generated: Vec<String>,

    /// files written
    pub exported: Vec<PathBuf>,

    /// whether generation was cancelled
    pub interrupted: bool,
}

pub struct Program<'a, P, R = Lagrange> {
    pub system: System,
    pub model: Model,

    /// the ab initio model
    pub pot: P,

    pub config: Config,

    /// strategy for the constrained relaxations in stage one
    pub relaxer: R,

    cancel: &'a AtomicBool,
}

impl<'a, P: Potential> Program<'a, P> {
    /// a [Program] relaxing with [Lagrange] at the tolerance and iteration
    /// limit in `config`
    pub fn new(
        system: System,
        pot: P,
        config: Config,
        cancel: &'a AtomicBool,
    ) -> Self {
        let relaxer = Lagrange::new(config.relax_tol, config.relax_max_iter);
        Self::with_relaxer(system, pot, relaxer, config, cancel)
    }
}

impl<'a, P: Potential, R: Relaxer> Program<'a, P, R> {
    pub fn with_relaxer(
        system: System,
        pot: P,
        relaxer: R,
        config: Config,
        cancel: &'a AtomicBool,
    ) -> Self {
        let model = Model::new(&system);
        Self {
            system,
            model,
            pot,
            config,
            relaxer,
            cancel,
        }
    }

    pub(crate) fn pert_theory(&self) -> PertTheory<'_, P, R> {
        PertTheory::new(
            &self.system,
            &self.pot,
            &self.relaxer,
            self.config.amplitudes,
            self.cancel,
        )
    }

    /// the kinds in the model that go through stage one, in order
    fn stage_one(&self) -> Vec<(&String, &Vec<Ic>)> {
        self.model
            .kinds
            .iter()
            .filter(|(_, ics)| {
                !(self.config.skip_dihedrals
                    && ics.iter().any(|ic| ic.siic.is_torsion()))
            })
            .collect()
    }

    /// Generate a perturbation trajectory for every coordinate of every kind
    /// in stage one. An existing trajectory store is returned as is. Newly
    /// generated trajectories are written to the store once, after
    /// collection, even when the run is interrupted. In that case every
    /// completed trajectory is kept and [Error::Interrupted] is returned.
    pub fn generate_trajectories(
        &self,
        obs: &dyn Observer,
    ) -> Result<Trajectories, Error> {
        if let Some(path) = &self.config.fns_traj {
            if Path::new(path).exists() {
                log::info!("reading trajectories from {path}");
                return trajectory::load(path);
            }
        }
        let mut jobs = Vec::new();
        for (kind, ics) in self.stage_one() {
            for (i, ic) in ics.iter().enumerate() {
                jobs.push((kind.as_str(), i + 1, ics.len(), ic));
            }
        }
        let (trajectories, interrupted) =
            self.generate_all(&jobs, self.config.steps, obs)?;
        if let Some(path) = &self.config.fns_traj {
            trajectory::save(path, &trajectories)?;
        }
        if interrupted {
            return Err(Error::Interrupted);
        }
        Ok(trajectories)
    }

    /// run `jobs` serially or on the rayon pool, returning the completed
    /// trajectories and whether generation was interrupted
    fn generate_all(
        &self,
        jobs: &[(&str, usize, usize, &Ic)],
        steps: usize,
        obs: &dyn Observer,
    ) -> Result<(Trajectories, bool), Error> {
        let pt = self.pert_theory();
        let run = |&(kind, index, total, ic): &(&str, usize, usize, &Ic)| {
            obs.on_progress(kind, index, total);
            pt.generate(ic, steps).map(|t| (ic.name.clone(), t))
        };
        let results: Vec<_> = if self.config.parallel {
            jobs.par_iter().map(run).collect()
        } else {
            let mut ret = Vec::new();
            for job in jobs {
                let res = run(job);
                let stop = matches!(res, Err(Error::Interrupted));
                ret.push(res);
                if stop {
                    break;
                }
            }
            ret
        };
        let mut trajectories = Trajectories::new();
        let mut interrupted = false;
        for res in results {
            match res {
                Ok((name, t)) => {
                    trajectories.insert(name, t);
                }
                Err(Error::Interrupted) => interrupted = true,
                Err(e) => return Err(e),
            }
        }
        Ok((trajectories, interrupted))
    }

    /// Estimate the harmonic parameters of every coordinate in stage one from
    /// `trajectories` and collect them per kind. A kind with a coordinate
    /// that cannot be estimated is reported and removed from the model, so
    /// it stays out of the refinement too. The model is seeded with the
    /// result.
    pub fn estimate_from_pt<W: Write>(
        &mut self,
        trajectories: &Trajectories,
        w: &mut W,
        obs: &dyn Observer,
    ) -> Result<FFTable, Error> {
        let mut table = FFTable::new();
        let mut failed = Vec::new();
        let kinds = self.stage_one();
        let width = kinds.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        'kinds: for (kind, ics) in kinds {
            let mut ks = DataArray::new(ics[0].kunit());
            let mut q0s = DataArray::new(ics[0].qunit());
            for ic in ics {
                let res = match trajectories.get(&ic.name) {
                    Some(traj) => estimate(ic, traj),
                    None => Err(Error::InsufficientData {
                        ic: ic.name.clone(),
                        have: 0,
                    }),
                };
                match res {
                    Ok(est) => {
                        ks.push(est.k);
                        q0s.push(est.q0);
                    }
                    Err(e) => {
                        log::error!("skipping {kind}: {e}");
                        writeln!(w, "    {kind:<width$}   skipped: {e}")?;
                        failed.push(kind.clone());
                        continue 'kinds;
                    }
                }
            }
            obs.on_estimate(kind, &ks, &q0s);
            writeln!(w, "    {kind:<width$}   K = {ks}    q0 = {q0s}")?;
            table.add(kind.clone(), ks, q0s)?;
        }
        for kind in failed {
            self.model.remove(&kind);
        }
        self.model.update_fftable(&table);
        Ok(table)
    }

    /// Refine the force constants of every term in the model against the ab
    /// initio Hessian at the reference geometry and write them to the model
    /// and `table`. Kinds left out of stage one by configuration, such as
    /// dihedrals, are added to `table` here.
    pub fn refine_cost<W: Write>(
        &mut self,
        table: &mut FFTable,
        w: &mut W,
    ) -> Result<Refinement, Error> {
        let hessian = self.pot.hessian(&self.system.geom);
        let cost =
            HessianFcCost::new(&self.system.geom, &hessian, self.config.rcond);
        let refinement = cost.estimate(&self.model)?;
        self.model.update_fcs(&refinement.fcs);
        for kind in table.update_fcs(&refinement.fcs) {
            let (Some(term), Some(ics)) =
                (self.model.val.terms.get(&kind), self.model.kinds.get(&kind))
            else {
                continue;
            };
            let q0 = match term.form {
                Form::Harmonic { q0 } => q0,
                Form::Cosine { phi0, .. } => phi0,
            };
            table.add(
                kind.clone(),
                DataArray::with_values(ics[0].kunit(), vec![term.k; ics.len()]),
                DataArray::with_values(ics[0].qunit(), vec![q0; ics.len()]),
            )?;
        }
        write!(w, "{table}")?;
        writeln!(
            w,
            "\n    Hessian residual: {:.6e} -> {:.6e}{}",
            refinement.before,
            refinement.after,
            if refinement.rank_deficient {
                " (rank deficient, pseudo-inverse used)"
            } else {
                ""
            }
        )?;
        Ok(refinement)
    }

    /// Run the whole pipeline and return the final force-field table. If the
    /// refinement fails, the failure is reported and the stage-one table is
    /// returned.
    pub fn run<W: Write>(
        &mut self,
        w: &mut W,
        obs: &dyn Observer,
    ) -> Result<FFTable, Error> {
        self.preamble(w)?;
        writeln!(w, "\nDetermine dihedral potentials\n")?;
        for kind in self.model.determine_dihedral_potentials(&self.system) {
            writeln!(w, "    dropped {kind}")?;
        }
        for (kind, term) in &self.model.val.terms {
            if let Form::Cosine { m, phi0 } = term.form {
                let phi0 = phi0.to_degrees();
                writeln!(w, "    {kind}: m = {m}, phi0 = {phi0:.1} deg")?;
            }
        }
        writeln!(
            w,
            "\nDetermine the coordinates of the perturbation trajectories\n"
        )?;
        let trajectories = self.generate_trajectories(obs)?;
        writeln!(w, "    {} trajectories", trajectories.len())?;
        writeln!(w, "\nEstimating all pars for bonds, bends and opdists\n")?;
        let mut table = self.estimate_from_pt(&trajectories, w, obs)?;
        writeln!(w, "\nRefining force constants using a Hessian LSQ cost\n")?;
        let stage_one = table.clone();
        if let Err(e) = self.refine_cost(&mut table, w) {
            log::error!("refinement failed: {e}");
            writeln!(w, "    refinement failed: {e}")?;
            table = stage_one;
        }
        self.postamble(w)?;
        Ok(table)
    }

    /// Generate, or read from the store, the trajectories of every coordinate
    /// whose kind matches `pattern` with the plotting step count, persist the
    /// merged store, and export each trajectory into `dir`
    pub fn plot_pt<W: Write>(
        &self,
        pattern: &str,
        dir: &Path,
        w: &mut W,
        obs: &dyn Observer,
    ) -> Result<PlotSummary, Error> {
        let re = Regex::new(pattern).map_err(|e| Error::Config(e.to_string()))?;
        self.preamble(w)?;
        writeln!(
            w,
            "\nDetermine the coordinates of the perturbation trajectories\n"
        )?;
        let mut trajectories = match &self.config.fns_traj {
            Some(path) => trajectory::load_or_default(path)?,
            None => Trajectories::new(),
        };
        let selected: Vec<(&String, &Vec<Ic>)> = self
            .system
            .ics
            .iter()
            .filter(|(kind, _)| re.is_match(kind))
            .collect();
        let pt = self.pert_theory();
        let mut summary = PlotSummary::default();
        'kinds: for (kind, ics) in &selected {
            for (i, ic) in ics.iter().enumerate() {
                if trajectories.contains_key(&ic.name) {
                    writeln!(w, "    {kind} Read {:2}/{}", i + 1, ics.len())?;
                    summary.read.push(ic.name.clone());
                    continue;
                }
                obs.on_progress(kind, i + 1, ics.len());
                match pt.generate(ic, self.config.plot_steps) {
                    Ok(t) => {
                        writeln!(
                            w,
                            "    {kind} Generating {:2}/{}",
                            i + 1,
                            ics.len()
                        )?;
                        trajectories.insert(ic.name.clone(), t);
                        summary.generated.push(ic.name.clone());
                    }
                    Err(Error::Interrupted) => {
                        writeln!(
                            w,
                            "    {kind} Generating {:2}/{} INTERRUPTED",
                            i + 1,
                            ics.len()
                        )?;
                        summary.interrupted = true;
                        break 'kinds;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        if let Some(path) = &self.config.fns_traj {
            trajectory::save(path, &trajectories)?;
        }
        for (_, ics) in &selected {
            for ic in ics.iter() {
                let Some(traj) = trajectories.get(&ic.name) else {
                    continue;
                };
                let est = match estimate(ic, traj) {
                    Ok(est) => Some(est),
                    Err(e) => {
                        log::warn!("no fit for {}: {e}", ic.name);
                        None
                    }
                };
                summary.exported.extend(export::export(
                    dir,
                    &self.system.labels,
                    ic,
                    traj,
                    est.as_ref(),
                )?);
            }
        }
        self.postamble(w)?;
        Ok(summary)
    }

    fn preamble<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        writeln!(w, "{HEADER}")?;
        writeln!(w, "{}", sysinfo())?;
        writeln!(w, "{RULE}\n")?;
        writeln!(w, "System information:\n")?;
        self.system.print_atom_info(w)?;
        writeln!(w, "\nModel information:\n")?;
        self.model.print_info(w)?;
        Ok(())
    }

    fn postamble<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        writeln!(w, "\n{RULE}\n")?;
        writeln!(w, "Time:           {}", now())?;
        writeln!(w, "{FOOTER}")?;
        Ok(())
    }
}

fn now() -> String {
    jiff::Zoned::now().strftime("%Y-%m-%d %H:%M:%S").to_string()
}

fn sysinfo() -> String {
    let user = std::env::var("USER").unwrap_or_else(|_| String::from("unknown"));
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let args: Vec<String> = std::env::args().collect();
    format!(
        "User:           {user}
Machine info:   {}
Time:           {}
Current Dir:    {cwd}
Command line:   {}
",
        uname(),
        now(),
        args.join(" ")
    )
}

/// the fields of `uname(2)` joined by spaces
fn uname() -> String {
    let mut buf: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut buf) } != 0 {
        return String::from("unknown");
    }
    let field = |f: &[libc::c_char]| -> String {
        let bytes: Vec<u8> = f
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    };
    [
        field(&buf.sysname),
        field(&buf.nodename),
        field(&buf.release),
        field(&buf.version),
        field(&buf.machine),
    ]
    .join(" ")
}
