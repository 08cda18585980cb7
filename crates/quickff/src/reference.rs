//! Ab initio reference data: the equilibrium structure and the energy and its
//! first and second derivatives there.

use std::path::Path;

use ics::{DMat, DVec, Geom, System};
use pes::Taylor;
use serde::Deserialize;

use crate::Error;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    /// element symbols
    pub labels: Vec<String>,

    /// force-field atom types, defaulting to the element symbols
    #[serde(default)]
    pub ffatypes: Option<Vec<String>>,

    /// Cartesian coordinates in Å
    pub geometry: Vec<[f64; 3]>,

    /// energy in hartree
    pub energy: f64,

    /// Cartesian gradient in hartree/bohr, length 3N
    pub gradient: Vec<f64>,

    /// Cartesian Hessian in hartree/bohr², 3N x 3N in row-major order
    pub hessian: Vec<f64>,

    /// bonded pairs, detected from covalent radii if absent
    #[serde(default)]
    pub bonds: Option<Vec<(usize, usize)>>,
}

impl Reference {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::Reference(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// build the [System] and its [Taylor] expansion. The Hessian is
    /// symmetrized
    pub fn build(self) -> Result<(System, Taylor), Error> {
        let n = 3 * self.geometry.len();
        if self.gradient.len() != n {
            return Err(Error::Reference(format!(
                "gradient has {} elements, expected {n}",
                self.gradient.len()
            )));
        }
        if self.hessian.len() != n * n {
            return Err(Error::Reference(format!(
                "hessian has {} elements, expected {}",
                self.hessian.len(),
                n * n
            )));
        }
        let geom = Geom::from_angstrom(&self.geometry);
        let hessian = DMat::from_row_slice(n, n, &self.hessian);
        let hessian = (&hessian + hessian.transpose()) * 0.5;
        let taylor = Taylor::new(
            &geom,
            self.energy,
            DVec::from(self.gradient),
            hessian,
        );
        let system = System::new(self.labels, self.ffatypes, geom, self.bonds)
            .map_err(|e| Error::Reference(e.to_string()))?;
        Ok((system, taylor))
    }
}
