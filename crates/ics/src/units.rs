//! Units for reporting. Everything is stored internally in atomic units
//! (bohr, radian, hartree); a [Unit] only describes how to present a value.

use serde::{Deserialize, Serialize};
use std::{f64::consts::PI, fmt::Display};

use crate::ANGBOHR;

/// hartree per kJ/mol
pub const KJMOL: f64 = 1.0 / 2625.499_639_4;

/// bohr per angstrom
pub const ANGSTROM: f64 = 1.0 / ANGBOHR;

/// radians per degree
pub const DEG: f64 = PI / 180.0;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Unit {
    Bohr,
    Angstrom,
    Rad,
    Deg,
    Hartree,
    Kjmol,
    KjmolPerA2,
    KjmolPerRad2,
}

impl Unit {
    /// the size of one of `self` in atomic units
    pub fn factor(&self) -> f64 {
        match self {
            Unit::Bohr | Unit::Rad | Unit::Hartree => 1.0,
            Unit::Angstrom => ANGSTROM,
            Unit::Deg => DEG,
            Unit::Kjmol => KJMOL,
            Unit::KjmolPerA2 => KJMOL / (ANGSTROM * ANGSTROM),
            Unit::KjmolPerRad2 => KJMOL,
        }
    }

    /// convert `x` from atomic units to `self`
    pub fn to_unit(&self, x: f64) -> f64 {
        x / self.factor()
    }

    /// convert `x` from `self` to atomic units
    pub fn from_unit(&self, x: f64) -> f64 {
        x * self.factor()
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Unit::Bohr => "bohr",
                Unit::Angstrom => "A",
                Unit::Rad => "rad",
                Unit::Deg => "deg",
                Unit::Hartree => "au",
                Unit::Kjmol => "kjmol",
                Unit::KjmolPerA2 => "kjmol/A**2",
                Unit::KjmolPerRad2 => "kjmol/rad**2",
            }
        )
    }
}
