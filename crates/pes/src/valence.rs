use std::collections::BTreeMap;

use ics::{Siic, geom::wrap_angle};
use serde::{Deserialize, Serialize};

use crate::{DMat, DVec, Geom, Potential};

/// The functional form of a valence term, written for a unit force constant
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Form {
    /// ½(q - q0)²
    Harmonic { q0: f64 },

    /// ½(1 - cos(m(φ - φ0)))
    Cosine { m: u32, phi0: f64 },
}

impl Form {
    /// return the value and the first and second derivatives with respect to
    /// `q`. `periodic` wraps the harmonic displacement onto (-π, π]
    pub fn eval(&self, q: f64, periodic: bool) -> (f64, f64, f64) {
        match *self {
            Form::Harmonic { q0 } => {
                let mut d = q - q0;
                if periodic {
                    d = wrap_angle(d);
                }
                (0.5 * d * d, d, 1.0)
            }
            Form::Cosine { m, phi0 } => {
                let m = m as f64;
                let a = m * (q - phi0);
                (
                    0.5 * (1.0 - a.cos()),
                    0.5 * m * a.sin(),
                    0.5 * m * m * a.cos(),
                )
            }
        }
    }

    /// the equilibrium value, if the form has a single one
    pub fn q0(&self) -> Option<f64> {
        match self {
            Form::Harmonic { q0 } => Some(*q0),
            Form::Cosine { .. } => None,
        }
    }
}

/// One force-field kind: a shared form and force constant applied to every
/// coordinate of that kind
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub form: Form,
    pub k: f64,
    pub ics: Vec<Siic>,
}

impl Term {
    pub fn new(form: Form, k: f64, ics: Vec<Siic>) -> Self {
        Self { form, k, ics }
    }

    fn eval(&self, ic: &Siic, geom: &Geom) -> (f64, f64, f64) {
        self.form.eval(ic.value(geom), ic.is_torsion())
    }

    pub fn energy(&self, geom: &Geom) -> f64 {
        self.k * self.ics.iter().map(|ic| self.eval(ic, geom).0).sum::<f64>()
    }

    /// the Cartesian gradient of the term with `k` set to 1
    pub fn unit_gradient(&self, geom: &Geom) -> DVec {
        let mut ret = DVec::zeros(3 * geom.len());
        for ic in &self.ics {
            let (_, dv, _) = self.eval(ic, geom);
            ret += DVec::from(geom.s_vec(ic)) * dv;
        }
        ret
    }

    /// the Cartesian Hessian of the term with `k` set to 1. For each
    /// coordinate this is V''(q) b bᵀ + V'(q) ∂²q/∂x²
    pub fn unit_hessian(&self, geom: &Geom) -> DMat {
        let n = 3 * geom.len();
        let mut ret = DMat::zeros(n, n);
        for ic in &self.ics {
            let (_, dv, d2v) = self.eval(ic, geom);
            let b = DVec::from(geom.s_vec(ic));
            ret += &b * b.transpose() * d2v;
            if dv != 0.0 {
                ret += geom.s_vec2(ic) * dv;
            }
        }
        ret
    }
}

/// A valence force field: one [Term] per kind name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Valence {
    pub terms: BTreeMap<String, Term>,
}

impl Valence {
    pub fn new() -> Self {
        Self::default()
    }

    /// insert or replace the term for `kind`
    pub fn insert(&mut self, kind: impl Into<String>, term: Term) {
        self.terms.insert(kind.into(), term);
    }
}

impl Potential for Valence {
    fn energy(&self, geom: &Geom) -> f64 {
        self.terms.values().map(|t| t.energy(geom)).sum()
    }

    fn gradient(&self, geom: &Geom) -> DVec {
        let mut ret = DVec::zeros(3 * geom.len());
        for t in self.terms.values() {
            ret += t.unit_gradient(geom) * t.k;
        }
        ret
    }

    fn hessian(&self, geom: &Geom) -> DMat {
        let n = 3 * geom.len();
        let mut ret = DMat::zeros(n, n);
        for t in self.terms.values() {
            ret += t.unit_hessian(geom) * t.k;
        }
        ret
    }
}
