//! Relaxed geometry perturbation theory: scan one internal coordinate while
//! relaxing everything else, then fit the energy profile to a parabola.

use std::sync::atomic::{AtomicBool, Ordering};

use ics::{Ic, System};
use pes::{Potential, Relaxer};
use polyfit::Polyfit;

use crate::{
    Error,
    config::Amplitudes,
    trajectory::{Sample, Trajectory},
};

/// The harmonic parameters of one coordinate instance, in atomic units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimate {
    /// force constant, the curvature of the fitted parabola
    pub k: f64,

    /// absolute equilibrium value
    pub q0: f64,

    /// `q0` minus the reference value
    pub offset: f64,

    /// energy at the minimum of the fit
    pub e0: f64,

    /// sum of squared residuals of the fit
    pub residual: f64,
}

impl Estimate {
    /// the fitted energy at displacement `disp`
    pub fn energy(&self, disp: f64) -> f64 {
        let d = disp - self.offset;
        self.e0 + 0.5 * self.k * d * d
    }
}

pub struct PertTheory<'a, P, R> {
    pub system: &'a System,
    pub pot: &'a P,
    pub relaxer: &'a R,
    pub amplitudes: Amplitudes,

    /// checked before every sample
    pub cancel: &'a AtomicBool,
}

impl<'a, P, R> PertTheory<'a, P, R>
where
    P: Potential,
    R: Relaxer,
{
    pub fn new(
        system: &'a System,
        pot: &'a P,
        relaxer: &'a R,
        amplitudes: Amplitudes,
        cancel: &'a AtomicBool,
    ) -> Self {
        Self {
            system,
            pot,
            relaxer,
            amplitudes,
            cancel,
        }
    }

    /// `steps` evenly spaced displacements spanning ± the amplitude for `ic`
    pub fn displacements(&self, ic: &Ic, steps: usize) -> Vec<f64> {
        let a = self.amplitudes.get(&ic.siic);
        if steps < 2 {
            return vec![0.0; steps];
        }
        (0..steps)
            .map(|i| a * (2.0 * i as f64 / (steps - 1) as f64 - 1.0))
            .collect()
    }

    /// Generate the relaxed perturbation trajectory for `ic`. Samples whose
    /// relaxation fails are logged and left out. If the cancel flag is set
    /// before a sample, the partial trajectory is dropped and
    /// [Error::Interrupted] is returned.
    pub fn generate(&self, ic: &Ic, steps: usize) -> Result<Trajectory, Error> {
        let geom = &self.system.geom;
        let qref = ic.value(geom);
        let mut ret = Trajectory::new(&ic.name, qref);
        for disp in self.displacements(ic, steps) {
            if self.cancel.load(Ordering::Relaxed) {
                log::warn!("generation of {} interrupted", ic.name);
                return Err(Error::Interrupted);
            }
            let target = qref + disp;
            let start = match geom.displace(&ic.siic, target) {
                Ok(g) => g,
                Err(e) => {
                    log::warn!("skipping {} at {disp:.6}: {e}", ic.name);
                    continue;
                }
            };
            match self.relaxer.relax(self.pot, &start, &ic.siic, target) {
                Ok(relaxed) => {
                    log::debug!(
                        "{} disp = {disp:10.6} E = {:20.12} in {} iterations",
                        ic.name,
                        relaxed.energy,
                        relaxed.iterations
                    );
                    ret.samples.push(Sample {
                        disp,
                        q: target,
                        geom: relaxed.geom,
                        energy: relaxed.energy,
                        gradient: Some(relaxed.gradient.as_slice().to_vec()),
                    });
                }
                Err(e) => {
                    log::warn!("skipping {} at {disp:.6}: {e}", ic.name);
                }
            }
        }
        Ok(ret)
    }
}

/// Fit E(disp) = c₀ + c₁·disp + c₂·disp² to `traj` by least squares and
/// return the harmonic parameters for `ic`
pub fn estimate(ic: &Ic, traj: &Trajectory) -> Result<Estimate, Error> {
    if traj.len() < 3 {
        return Err(Error::InsufficientData {
            ic: ic.name.clone(),
            have: traj.len(),
        });
    }
    let fit = Polyfit::new(&traj.disps(), &traj.energies(), 2)
        .and_then(|p| p.run())
        .map_err(|e| Error::Fit(ic.name.clone(), e))?;
    log::debug!("{} stationary point: {} ({})", ic.name, fit.bias, fit.kind);
    let k = fit.derivative(2);
    if k < 0.0 {
        log::warn!(
            "negative force constant {k:.6e} for {}, the fit has a {}",
            ic.name,
            fit.kind
        );
    }
    let offset = fit.bias.disp;
    Ok(Estimate {
        k,
        q0: traj.qref + offset,
        offset,
        e0: fit.bias.energy,
        residual: fit.residual,
    })
}
