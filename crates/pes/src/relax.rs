use ics::{Siic, geom::wrap_angle};

use crate::{DMat, DVec, Geom, PesError, Potential};

/// The result of a constrained relaxation
#[derive(Clone, Debug, PartialEq)]
pub struct Relaxed {
    pub geom: Geom,
    pub energy: f64,
    pub gradient: DVec,
    pub iterations: usize,
}

/// A strategy for minimizing a [Potential] over every degree of freedom except
/// one internal coordinate
pub trait Relaxer: Sync {
    /// relax `geom` on `pot` with `ic` held at `target`. `geom` should already
    /// be close to satisfying the constraint
    fn relax(
        &self,
        pot: &dyn Potential,
        geom: &Geom,
        ic: &Siic,
        target: f64,
    ) -> Result<Relaxed, PesError>;
}

/// Newton's method on the Lagrangian L = E - λ(q - q*). Each step solves the
/// KKT system
///
/// ```text
/// ⎡ H - λ∂²q  -b ⎤ ⎡ dx ⎤   ⎡ -(g - λb) ⎤
/// ⎣    bᵀ      0 ⎦ ⎣ dλ ⎦ = ⎣ -(q - q*)  ⎦
/// ```
///
/// by SVD, which discards the translational and rotational null space of the
/// Hessian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lagrange {
    /// convergence threshold on the largest component of the Lagrangian
    /// gradient and on the constraint violation
    pub tol: f64,

    pub max_iter: usize,

    /// largest allowed Cartesian step norm in bohr
    pub trust: f64,

    /// singular values of the KKT matrix below `rcond` times the largest are
    /// treated as zero
    pub rcond: f64,
}

impl Default for Lagrange {
    fn default() -> Self {
        Self {
            tol: 1e-7,
            max_iter: 100,
            trust: 0.3,
            rcond: 1e-10,
        }
    }
}

impl Lagrange {
    pub fn new(tol: f64, max_iter: usize) -> Self {
        Self {
            tol,
            max_iter,
            ..Self::default()
        }
    }
}

impl Relaxer for Lagrange {
    fn relax(
        &self,
        pot: &dyn Potential,
        geom: &Geom,
        ic: &Siic,
        target: f64,
    ) -> Result<Relaxed, PesError> {
        let n = 3 * geom.len();
        let mut geom = geom.clone();
        let mut lambda = None;
        for iter in 0..self.max_iter {
            let g = pot.gradient(&geom);
            let b = DVec::from(geom.s_vec(ic));
            let mut c = ic.value(&geom) - target;
            if ic.is_torsion() {
                c = wrap_angle(c);
            }
            // least-squares multiplier on the first pass
            let lam = *lambda.get_or_insert_with(|| b.dot(&g) / b.dot(&b));
            let r = &g - &b * lam;
            let rmax = r.amax();
            log::trace!(
                "{ic} iter {iter}: |∇L| = {rmax:.3e}, |q - q*| = {:.3e}",
                c.abs()
            );
            if rmax < self.tol && c.abs() < self.tol {
                return Ok(Relaxed {
                    energy: pot.energy(&geom),
                    geom,
                    gradient: g,
                    iterations: iter,
                });
            }

            let mut w = pot.hessian(&geom);
            if lam != 0.0 {
                w -= geom.s_vec2(ic) * lam;
            }
            let mut kkt = DMat::zeros(n + 1, n + 1);
            kkt.view_mut((0, 0), (n, n)).copy_from(&w);
            for i in 0..n {
                kkt[(i, n)] = -b[i];
                kkt[(n, i)] = b[i];
            }
            let mut rhs = DVec::zeros(n + 1);
            rhs.rows_mut(0, n).copy_from(&(-r));
            rhs[n] = -c;

            let svd = kkt.svd(true, true);
            let eps = self.rcond * svd.singular_values.max();
            let mut step = svd.solve(&rhs, eps).map_err(PesError::Linalg)?;
            let norm = step.rows(0, n).norm();
            if norm > self.trust {
                step *= self.trust / norm;
            }

            let mut x: DVec = geom.into();
            x += step.rows(0, n);
            geom = Geom::from(&x);
            lambda = Some(lam + step[n]);
        }
        Err(PesError::ConvergenceFailure(format!(
            "relaxation with {ic} fixed at {target} did not converge in {} \
             iterations",
            self.max_iter
        )))
    }
}
