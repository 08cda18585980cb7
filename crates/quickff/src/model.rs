//! The force-field model whose parameters the pipeline determines.

use std::{collections::BTreeMap, f64::consts::PI, io::Write};

use ics::{Ic, Siic, System, geom::wrap_angle};
use pes::{Form, Term, Valence};

use crate::fftable::FFTable;

/// hybridization of a dihedral's central atom
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hybrid {
    Sp,
    Sp2,
    Sp3,
}

/// out-of-plane distance in bohr below which a three-coordinate centre counts
/// as planar
const PLANAR_TOL: f64 = 0.2;

/// bends within this many radians of π make a centre linear
const LINEAR_TOL: f64 = 5.0 * PI / 180.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// one valence term per kind
    pub val: Valence,

    /// the coordinate instances of each kind in `val`
    pub kinds: BTreeMap<String, Vec<Ic>>,
}

impl Model {
    /// a harmonic term for every bond, bend and out-of-plane kind in
    /// `system`, with the equilibrium value set to the mean reference value
    /// and a zero force constant. dihedral terms are added by
    /// [Model::determine_dihedral_potentials]
    pub fn new(system: &System) -> Self {
        let mut val = Valence::new();
        let mut kinds = BTreeMap::new();
        for (kind, ics) in &system.ics {
            if ics.iter().any(|ic| ic.siic.is_torsion()) {
                continue;
            }
            let q0 = ics.iter().map(|ic| ic.value(&system.geom)).sum::<f64>()
                / ics.len() as f64;
            let siics = ics.iter().map(|ic| ic.siic).collect();
            val.insert(kind, Term::new(Form::Harmonic { q0 }, 0.0, siics));
            kinds.insert(kind.clone(), ics.clone());
        }
        Self { val, kinds }
    }

    /// Add a cosine term for every dihedral kind in `system`. The
    /// multiplicity follows from the hybridization of the two central atoms:
    /// 3 for sp3-sp3, 2 for sp2-sp2 and 6 for sp2-sp3. The phase puts the
    /// reference dihedrals as close to minima as possible. Kinds with a
    /// linear or otherwise unsupported centre are dropped and returned.
    pub fn determine_dihedral_potentials(
        &mut self,
        system: &System,
    ) -> Vec<String> {
        let mut dropped = Vec::new();
        for (kind, ics) in &system.ics {
            let Some(Siic::Torsion(_, j, k, _)) = ics.first().map(|ic| ic.siic)
            else {
                continue;
            };
            let m = match (hybrid(system, j), hybrid(system, k)) {
                (Some(Hybrid::Sp3), Some(Hybrid::Sp3)) => 3,
                (Some(Hybrid::Sp2), Some(Hybrid::Sp2)) => 2,
                (Some(Hybrid::Sp2), Some(Hybrid::Sp3))
                | (Some(Hybrid::Sp3), Some(Hybrid::Sp2)) => 6,
                (a, b) => {
                    log::warn!(
                        "dropping {kind}: no dihedral potential for {a:?}-{b:?} \
			 centres"
                    );
                    dropped.push(kind.clone());
                    continue;
                }
            };
            let phis: Vec<f64> =
                ics.iter().map(|ic| ic.value(&system.geom)).collect();
            let phi0 = phase(&phis, m);
            log::info!("{kind}: multiplicity {m}, phase {phi0:.4}");
            let siics = ics.iter().map(|ic| ic.siic).collect();
            self.val
                .insert(kind, Term::new(Form::Cosine { m, phi0 }, 0.0, siics));
            self.kinds.insert(kind.clone(), ics.clone());
        }
        dropped
    }

    /// seed the model from stage one: the mean force constant and, for
    /// harmonic terms, the mean equilibrium value of each kind. A harmonic
    /// curvature k along a cosine term of multiplicity m corresponds to a
    /// barrier of 2k/m²
    pub fn update_fftable(&mut self, table: &FFTable) {
        for entry in table.iter() {
            let Some(term) = self.val.terms.get_mut(&entry.name) else {
                continue;
            };
            let k = entry.ks.mean();
            match &mut term.form {
                Form::Harmonic { q0 } => {
                    term.k = k;
                    *q0 = entry.q0s.mean();
                }
                Form::Cosine { m, .. } => {
                    term.k = 2.0 * k / (*m as f64).powi(2);
                }
            }
        }
    }

    /// drop the term and coordinates of `kind`
    pub fn remove(&mut self, kind: &str) {
        self.val.terms.remove(kind);
        self.kinds.remove(kind);
    }

    /// set the force constants of the kinds in `fcs`
    pub fn update_fcs(&mut self, fcs: &BTreeMap<String, f64>) {
        for (kind, &k) in fcs {
            if let Some(term) = self.val.terms.get_mut(kind) {
                term.k = k;
            }
        }
    }

    pub fn print_info<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let width = self.kinds.keys().map(String::len).max().unwrap_or(0);
        for (kind, term) in &self.val.terms {
            let n = term.ics.len();
            match term.form {
                Form::Harmonic { .. } => {
                    writeln!(w, "    {kind:<width$}  harmonic  ({n} instances)")?
                }
                Form::Cosine { m, phi0 } => writeln!(
                    w,
                    "    {kind:<width$}  cosine m = {m} phi0 = {:6.1} deg  \
		     ({n} instances)",
                    phi0.to_degrees()
                )?,
            }
        }
        Ok(())
    }
}

/// classify atom `i` from its coordination number and geometry
fn hybrid(system: &System, i: usize) -> Option<Hybrid> {
    let nb = &system.neighbors[i];
    let geom = &system.geom;
    match nb[..] {
        [a, b] => {
            if PI - geom.angle(a, i, b) < LINEAR_TOL {
                Some(Hybrid::Sp)
            } else {
                Some(Hybrid::Sp3)
            }
        }
        [a, b, c] => {
            let d = Siic::OopDist(a, b, c, i).value(geom);
            if d.abs() < PLANAR_TOL {
                Some(Hybrid::Sp2)
            } else {
                Some(Hybrid::Sp3)
            }
        }
        [_, _, _, _] => Some(Hybrid::Sp3),
        _ => None,
    }
}

/// choose φ0 from {0, π/m} so that the dihedrals `phis` lie closest to the
/// minima of 1 - cos(m(φ - φ0))
fn phase(phis: &[f64], m: u32) -> f64 {
    let m = m as f64;
    let cost = |phi0: f64| -> f64 {
        phis.iter()
            .map(|phi| 1.0 - (m * wrap_angle(phi - phi0)).cos())
            .sum()
    };
    let alt = PI / m;
    if cost(alt) < cost(0.0) { alt } else { 0.0 }
}
