//! One-dimensional polynomial least-squares fitting of energy profiles.

use na::Cholesky;
use nalgebra as na;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;

#[cfg(test)]
mod tests;

/// threshold for considering a coefficient to be zero
const THR: f64 = 1e-14;

/// maximum number of Newton iterations in [Polyfit::newton]
const MAXIT: usize = 100;

pub type Dmat = na::DMatrix<f64>;
pub type Dvec = na::DVector<f64>;

/// The shift applied to the displacements and energies to move the origin to
/// the stationary point of a fit
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Bias {
    pub disp: f64,
    pub energy: f64,
}

impl Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:12.8}{:20.12}", self.disp, self.energy)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StatKind {
    Max,
    Min,
}

impl Display for StatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                StatKind::Max => "maximum",
                StatKind::Min => "minimum",
            }
        )
    }
}

#[derive(Debug, PartialEq)]
pub enum FitError {
    /// fewer points than unknowns
    InsufficientData { have: usize, need: usize },
    /// displacements and energies of different lengths
    Shape(usize, usize),
    /// the normal equations could not be solved
    Singular,
    /// the polynomial has no curvature at the current point
    Flat,
    /// Newton's method did not converge
    Newton,
}

impl Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FitError {}

/// A polynomial E(x) = Σ cₙxⁿ fit to a set of (x, E) samples
#[derive(Clone)]
pub struct Polyfit {
    pub disps: Dvec,
    pub energies: Dvec,
    /// the powers of x in the fitted function, i32 for compatibility with
    /// `f64::powi`
    pub exponents: Vec<i32>,
}

impl Debug for Polyfit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "disps:\n{:12.8}", self.disps)?;
        write!(f, "energies:\n{:20.12}", self.energies)?;
        write!(f, "exponents:\n{:?}", self.exponents)
    }
}

/// The result of [Polyfit::run]
#[derive(Debug, Clone, PartialEq)]
pub struct Fit {
    /// polynomial coefficients about the stationary point
    pub coeffs: Dvec,
    /// location and energy of the stationary point
    pub bias: Bias,
    /// sum of squared residuals of the refit
    pub residual: f64,
    pub kind: StatKind,
}

impl Fit {
    /// the `n`th derivative of the fitted function at the stationary point
    pub fn derivative(&self, n: usize) -> f64 {
        let fact: f64 = (1..=n).map(|i| i as f64).product();
        self.coeffs.get(n).copied().unwrap_or(0.0) * fact
    }
}

impl Polyfit {
    /// set up a fit of `energies` against `disps` by a polynomial of degree
    /// `degree`
    pub fn new(
        disps: &[f64],
        energies: &[f64],
        degree: usize,
    ) -> Result<Self, FitError> {
        if disps.len() != energies.len() {
            return Err(FitError::Shape(disps.len(), energies.len()));
        }
        if disps.len() < degree + 1 {
            return Err(FitError::InsufficientData {
                have: disps.len(),
                need: degree + 1,
            });
        }
        Ok(Self {
            disps: Dvec::from_column_slice(disps),
            energies: Dvec::from_column_slice(energies),
            exponents: (0..=degree as i32).collect(),
        })
    }

    /// determine the [ordinary least
    /// squares](https://en.wikipedia.org/wiki/Ordinary_least_squares) solution
    /// to the [polynomial
    /// regression](https://en.wikipedia.org/wiki/Polynomial_regression) problem
    /// described by `self.disps`, `self.energies`, and `self.exponents`, and
    /// return the solution vector along with the evaluated matrix describing
    /// the function. The latter is for checking the residuals
    pub fn fit(&self) -> Result<(Dvec, Dmat), FitError> {
        let ndisps = self.disps.len();
        let nunks = self.exponents.len();
        let mut x = Dmat::repeat(ndisps, nunks, 1.0);
        for i in 0..ndisps {
            let d = self.disps[i];
            for (k, &e) in self.exponents.iter().enumerate() {
                if e != 0 {
                    x[(i, k)] = d.powi(e);
                }
            }
        }
        let xt = x.transpose();
        let xtx = &xt * &x;
        solve_least_squares(xtx, xt, &self.energies, x)
    }

    /// compute the first derivative of the function described by `coeffs` at
    /// `x`
    fn grad(&self, x: f64, coeffs: &Dvec) -> f64 {
        let mut sum = 0.0;
        for (j, &e) in self.exponents.iter().enumerate() {
            let coj = coeffs[j] * e as f64;
            if coj.abs() < THR {
                continue;
            }
            sum += if e != 1 { coj * x.powi(e - 1) } else { coj };
        }
        sum
    }

    /// compute the second derivative of the function described by `coeffs` at
    /// `x`
    fn hess(&self, x: f64, coeffs: &Dvec) -> f64 {
        let mut sum = 0.0;
        for (j, &e) in self.exponents.iter().enumerate() {
            let f = e as f64;
            let coj = coeffs[j] * f * (f - 1.0);
            if coj.abs() < THR {
                continue;
            }
            sum += if e != 2 { coj * x.powi(e - 2) } else { coj };
        }
        sum
    }

    /// use [Newton's optimization
    /// method](https://en.wikipedia.org/wiki/Newton%27s_method_in_optimization)
    /// to find the stationary point of the polynomial described by `coeffs`
    /// closest to the origin. return the stationary point and its kind
    pub fn newton(&self, coeffs: &Dvec) -> Result<(f64, StatKind), FitError> {
        let mut x = 0.0;
        for _ in 0..MAXIT {
            let grad = self.grad(x, coeffs);
            let hess = self.hess(x, coeffs);
            if hess == 0.0 {
                return Err(FitError::Flat);
            }
            let delta = grad / hess;
            x -= delta;
            if delta.abs() <= 1e-14 * x.abs().max(1.0) {
                let kind = if self.hess(x, coeffs) < 0.0 {
                    StatKind::Max
                } else {
                    StatKind::Min
                };
                return Ok((x, kind));
            }
        }
        Err(FitError::Newton)
    }

    /// evaluate the function at the point `x`
    pub fn eval(&self, x: f64, coeffs: &Dvec) -> f64 {
        let mut sum = 0.0;
        for (k, &e) in self.exponents.iter().enumerate() {
            if e == 0 {
                sum += coeffs[k];
            } else {
                sum += coeffs[k] * x.powi(e);
            }
        }
        sum
    }

    pub fn bias(&self, bias: &Bias) -> Self {
        Self {
            disps: self.disps.add_scalar(-bias.disp),
            energies: self.energies.add_scalar(-bias.energy),
            ..self.clone()
        }
    }

    /// perform the initial fitting, find the stationary point, bias to the new
    /// stationary point, and refit
    pub fn run(&self) -> Result<Fit, FitError> {
        let (coeffs, _) = self.fit()?;
        // find stationary point
        let (x, kind) = self.newton(&coeffs)?;
        // determine energy at stationary point
        let e = self.eval(x, &coeffs);
        // bias the displacements and energies to the new stationary point
        let bias = Bias { disp: x, energy: e };
        let biased = self.bias(&bias);
        // perform the refitting
        let (coeffs, f) = biased.fit()?;
        let residual = biased.residuals(&coeffs, &f);
        Ok(Fit {
            coeffs,
            bias,
            residual,
            kind,
        })
    }

    /// evaluate the function and return the sum of squared residuals
    pub fn residuals(&self, coeffs: &Dvec, f: &Dmat) -> f64 {
        let prod = f * coeffs;
        let mut sum = 0.0;
        for (i, obsv) in self.energies.iter().enumerate() {
            let resi = prod[i] - obsv;
            sum += resi * resi;
        }
        sum
    }
}

/// Solve the [ordinary least
/// squares](https://en.wikipedia.org/wiki/Ordinary_least_squares) problem β =
/// (XᵀX)⁻¹Xᵀy for β. Return the solution vector and X itself. First try to
/// solve the equations using the Cholesky decomposition using forward and
/// backward substitution as described
/// [here](https://en.wikipedia.org/wiki/Numerical_methods_for_linear_least_squares#Inverting_the_matrix_of_the_normal_equations).
/// If the Cholesky decomposition fails, fall back on the LU decomposition and
/// inverting XᵀX directly.
fn solve_least_squares(
    xtx: Dmat,
    xt: Dmat,
    y: &Dvec,
    x: Dmat,
) -> Result<(Dvec, Dmat), FitError> {
    if let Some(chol) = Cholesky::new(xtx.clone()) {
        let l = chol.l();
        let z = l
            .solve_lower_triangular(&(xt * y))
            .ok_or(FitError::Singular)?;
        let r = l.transpose();
        let b = r.solve_upper_triangular(&z).ok_or(FitError::Singular)?;
        Ok((b, x))
    } else {
        let inv = na::LU::new(xtx).try_inverse().ok_or(FitError::Singular)?;
        let f = inv * xt * y;
        Ok((f, x))
    }
}
