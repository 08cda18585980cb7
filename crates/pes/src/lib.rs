//! Potential energy surfaces and geometry relaxation on them. A [Potential]
//! supplies energies and Cartesian derivatives, and a [Relaxer] minimizes one
//! while holding a single internal coordinate fixed.

use std::{error::Error, fmt::Display};

pub use ics::{DMat, DVec, Geom};

mod relax;
mod taylor;
mod valence;

pub use relax::{Lagrange, Relaxed, Relaxer};
pub use taylor::Taylor;
pub use valence::{Form, Term, Valence};

#[cfg(test)]
mod tests;

/// A potential energy surface in atomic units. Derivatives are with respect
/// to the Cartesian coordinates in bohr, ordered x₁ y₁ z₁ x₂ ...
pub trait Potential: Sync {
    fn energy(&self, geom: &Geom) -> f64;

    fn gradient(&self, geom: &Geom) -> DVec;

    fn hessian(&self, geom: &Geom) -> DMat;
}

#[derive(Debug, PartialEq)]
pub enum PesError {
    /// the relaxation did not reach the requested tolerance
    ConvergenceFailure(String),
    /// a linear solve failed
    Linalg(&'static str),
}

impl Display for PesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for PesError {}
