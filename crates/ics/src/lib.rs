//! Internal coordinates of a molecular system: their values, Wilson B vectors
//! and second derivatives, and the catalog of coordinate instances grouped by
//! force-field kind.

use serde::{Deserialize, Serialize};
use std::{error::Error, fmt::Display};

pub mod geom;
pub mod system;
pub mod units;

#[cfg(test)]
mod tests;

pub use geom::Geom;
pub use system::System;
pub use units::Unit;

use nalgebra as na;

/// from <https://physics.nist.gov/cgi-bin/cuu/Value?bohrrada0>
pub const ANGBOHR: f64 = 0.529_177_210_9;

pub type Vec3 = na::Vector3<f64>;
pub type DMat = na::DMatrix<f64>;
pub type DVec = na::DVector<f64>;

/// A simple internal coordinate. Atom indices are zero-based
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Siic {
    /// bond stretch between two atoms
    Stretch(usize, usize),

    /// central atom is second like normal people would expect
    Bend(usize, usize, usize),

    /// signed distance of atom `l` from the plane through `i`, `j`, and `k`
    OopDist(usize, usize, usize, usize),

    /// angle between the planes formed by i, j, k and j, k, l
    Torsion(usize, usize, usize, usize),
}

impl Display for Siic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Siic::Stretch(i, j) => write!(f, "r({}-{})", i + 1, j + 1),
            Siic::Bend(i, j, k) => {
                write!(f, "∠({}-{}-{})", i + 1, j + 1, k + 1)
            }
            Siic::OopDist(i, j, k, l) => {
                write!(f, "d({}-{}-{}-{})", i + 1, j + 1, k + 1, l + 1)
            }
            Siic::Torsion(i, j, k, l) => {
                write!(f, "τ({}-{}-{}-{})", i + 1, j + 1, k + 1, l + 1)
            }
        }
    }
}

impl Siic {
    /// the value of the coordinate in bohr or radians
    pub fn value(&self, geom: &Geom) -> f64 {
        use Siic::*;
        match *self {
            Stretch(a, b) => geom.dist(a, b),
            Bend(a, b, c) => geom.angle(a, b, c),
            OopDist(a, b, c, d) => {
                let n = (geom[b] - geom[a]).cross(&(geom[c] - geom[a]));
                n.dot(&(geom[d] - geom[a])) / n.magnitude()
            }
            Torsion(a, b, c, d) => {
                let f = geom[a] - geom[b];
                let g = geom[b] - geom[c];
                let h = geom[d] - geom[c];
                let va = f.cross(&g);
                let vb = h.cross(&g);
                let y = vb.cross(&va).dot(&g) / g.magnitude();
                let x = va.dot(&vb);
                y.atan2(x)
            }
        }
    }

    /// the atoms involved in `self`, in definition order
    pub fn atoms(&self) -> Vec<usize> {
        match *self {
            Siic::Stretch(a, b) => vec![a, b],
            Siic::Bend(a, b, c) => vec![a, b, c],
            Siic::OopDist(a, b, c, d) | Siic::Torsion(a, b, c, d) => {
                vec![a, b, c, d]
            }
        }
    }

    /// the prefix used for kind names of this coordinate type
    pub fn prefix(&self) -> &'static str {
        match self {
            Siic::Stretch(..) => "bond",
            Siic::Bend(..) => "bend",
            Siic::OopDist(..) => "opdist",
            Siic::Torsion(..) => "dihed",
        }
    }

    /// unit for reporting force constants of this coordinate
    pub fn kunit(&self) -> Unit {
        match self {
            Siic::Stretch(..) | Siic::OopDist(..) => Unit::KjmolPerA2,
            Siic::Bend(..) => Unit::KjmolPerRad2,
            Siic::Torsion(..) => Unit::Kjmol,
        }
    }

    /// unit for reporting values of this coordinate
    pub fn qunit(&self) -> Unit {
        match self {
            Siic::Stretch(..) | Siic::OopDist(..) => Unit::Angstrom,
            Siic::Bend(..) | Siic::Torsion(..) => Unit::Deg,
        }
    }

    /// Returns `true` if the coordinate is a [`Torsion`].
    ///
    /// [`Torsion`]: Siic::Torsion
    #[must_use]
    pub fn is_torsion(&self) -> bool {
        matches!(self, Self::Torsion(..))
    }
}

/// One internal coordinate instance as enumerated by a [System]
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Ic {
    /// unique name, like `bond/C.H(0,1)`
    pub name: String,

    /// the force-field kind this instance belongs to, like `bond/C.H`
    pub kind: String,

    pub siic: Siic,
}

impl Ic {
    pub fn new(kind: impl Into<String>, siic: Siic) -> Self {
        let kind = kind.into();
        let atoms = siic
            .atoms()
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            name: format!("{kind}({atoms})"),
            kind,
            siic,
        }
    }

    pub fn value(&self, geom: &Geom) -> f64 {
        self.siic.value(geom)
    }

    pub fn kunit(&self) -> Unit {
        self.siic.kunit()
    }

    pub fn qunit(&self) -> Unit {
        self.siic.qunit()
    }
}

impl Display for Ic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, PartialEq)]
pub enum IcsError {
    /// iterative back transformation failed to reach the target value
    DispError(String),
    /// an atom index or bond refers past the end of the geometry
    BadIndex(usize),
    /// the number of labels, atom types, and positions disagree
    Shape(String),
}

impl Display for IcsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for IcsError {}
