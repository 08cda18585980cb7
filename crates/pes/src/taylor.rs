use serde::{Deserialize, Serialize};

use crate::{DMat, DVec, Geom, Potential};

/// Second-order Taylor expansion of an ab initio surface about a reference
/// geometry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Taylor {
    /// reference geometry as a flat vector in bohr
    pub x0: DVec,
    pub energy: f64,
    pub gradient: DVec,
    pub hessian: DMat,
}

impl Taylor {
    pub fn new(geom: &Geom, energy: f64, gradient: DVec, hessian: DMat) -> Self {
        Self {
            x0: geom.clone().into(),
            energy,
            gradient,
            hessian,
        }
    }

    fn dx(&self, geom: &Geom) -> DVec {
        let x: DVec = geom.clone().into();
        x - &self.x0
    }
}

impl Potential for Taylor {
    fn energy(&self, geom: &Geom) -> f64 {
        let dx = self.dx(geom);
        self.energy + self.gradient.dot(&dx) + 0.5 * dx.dot(&(&self.hessian * &dx))
    }

    fn gradient(&self, geom: &Geom) -> DVec {
        let dx = self.dx(geom);
        &self.gradient + &self.hessian * dx
    }

    fn hessian(&self, _geom: &Geom) -> DMat {
        self.hessian.clone()
    }
}
