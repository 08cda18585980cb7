//! Least-squares refinement of the force constants against the ab initio
//! Hessian.

use std::collections::BTreeMap;

use ics::{DMat, DVec, Geom};

use crate::{Error, model::Model};

/// The outcome of [HessianFcCost::estimate]
#[derive(Clone, Debug, PartialEq)]
pub struct Refinement {
    /// refined force constant per kind
    pub fcs: BTreeMap<String, f64>,

    /// ‖H_ai - H_ff‖²_F with the force constants the model started with
    pub before: f64,

    /// the same residual with the refined force constants
    pub after: f64,

    /// whether any singular value of the normal equations fell below the
    /// cutoff
    pub rank_deficient: bool,

    pub singular_values: Vec<f64>,
}

/// The cost function ‖H_ai - Σ_K k_K H_K‖²_F, where H_K is the Cartesian
/// Hessian of all terms of kind K with a unit force constant, evaluated at the
/// reference geometry
pub struct HessianFcCost<'a> {
    geom: &'a Geom,
    hessian: &'a DMat,

    /// relative singular value cutoff
    rcond: f64,
}

impl<'a> HessianFcCost<'a> {
    pub fn new(geom: &'a Geom, hessian: &'a DMat, rcond: f64) -> Self {
        Self {
            geom,
            hessian,
            rcond,
        }
    }

    /// the unit Hessian of every term in `model`
    pub fn unit_hessians(&self, model: &Model) -> Vec<(String, DMat)> {
        model
            .val
            .terms
            .iter()
            .map(|(kind, term)| (kind.clone(), term.unit_hessian(self.geom)))
            .collect()
    }

    /// the residual for force constants `ks`, one per entry of `hks`
    pub fn residual(&self, hks: &[(String, DMat)], ks: &[f64]) -> f64 {
        let mut diff = self.hessian.clone();
        for ((_, h), k) in hks.iter().zip(ks) {
            diff -= h * *k;
        }
        diff.norm_squared()
    }

    /// Minimize the cost over one force constant per kind, starting from the
    /// force constants in `model`. The normal equations AᵀA k = Aᵀh are solved
    /// by SVD, discarding singular values below `rcond` times the largest. If
    /// that leaves a larger residual than the starting point, the starting
    /// force constants are kept.
    pub fn estimate(&self, model: &Model) -> Result<Refinement, Error> {
        let n = 3 * self.geom.len();
        if self.hessian.shape() != (n, n) {
            return Err(Error::Refine(format!(
                "expected a {n}x{n} Hessian, got {:?}",
                self.hessian.shape()
            )));
        }
        let hks = self.unit_hessians(model);
        if hks.is_empty() {
            return Err(Error::Refine(String::from("no terms to refine")));
        }
        let m = hks.len();
        let mut a = DMat::zeros(m, m);
        let mut y = DVec::zeros(m);
        for (i, (_, hi)) in hks.iter().enumerate() {
            y[i] = self.hessian.dot(hi);
            for (j, (_, hj)) in hks.iter().enumerate().skip(i) {
                let dot = hi.dot(hj);
                a[(i, j)] = dot;
                a[(j, i)] = dot;
            }
        }

        let svd = a.svd(true, true);
        let smax = svd.singular_values.max();
        if smax <= 0.0 {
            return Err(Error::Refine(String::from(
                "every unit Hessian vanishes",
            )));
        }
        let cutoff = self.rcond * smax;
        let rank_deficient = svd.singular_values.iter().any(|&s| s < cutoff);
        if rank_deficient {
            log::warn!(
                "Hessian least squares system is rank deficient, using the \
		 pseudo-inverse"
            );
        }
        let ks = svd
            .solve(&y, cutoff)
            .map_err(|e| Error::Refine(e.to_owned()))?;

        let seeds: Vec<f64> = model.val.terms.values().map(|t| t.k).collect();
        let before = self.residual(&hks, &seeds);
        let mut after = self.residual(&hks, ks.as_slice());
        let ks: Vec<f64> = if after > before {
            log::warn!(
                "refinement raised the residual from {before:.6e} to \
		 {after:.6e}, keeping the starting force constants"
            );
            after = before;
            seeds
        } else {
            ks.iter().copied().collect()
        };
        log::info!("Hessian residual {before:.6e} -> {after:.6e}");

        Ok(Refinement {
            fcs: hks.into_iter().map(|(kind, _)| kind).zip(ks).collect(),
            before,
            after,
            rank_deficient,
            singular_values: svd.singular_values.iter().copied().collect(),
        })
    }
}
