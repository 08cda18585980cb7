use crate::{ANGBOHR, DMat, DVec, IcsError, Siic, Vec3};
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::PI,
    fmt::Display,
    ops::{Index, IndexMut},
};

/// convergence threshold on the coordinate value in [Geom::displace]
const TOLDISP: f64 = 1e-12;
const MAX_ITER: usize = 50;

/// step size in bohr for the finite-difference second derivatives
const HSTEP: f64 = 1e-4;

/// Cartesian geometry in bohr
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Geom(pub Vec<Vec3>);

/// map an angle difference onto (-π, π]
pub fn wrap_angle(d: f64) -> f64 {
    let w = (d + PI).rem_euclid(2.0 * PI) - PI;
    if w == -PI { PI } else { w }
}

impl Geom {
    /// build a geometry in bohr from positions given in angstroms
    pub fn from_angstrom(coords: &[[f64; 3]]) -> Self {
        let mut ret = Self(coords.iter().map(|c| Vec3::from(*c)).collect());
        ret.to_bohr();
        ret
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// convert the geometry from angstroms to bohr
    pub fn to_bohr(&mut self) {
        for a in self.0.iter_mut() {
            *a /= ANGBOHR;
        }
    }

    /// return a copy of the geometry in angstroms
    pub fn angstrom(&self) -> Vec<Vec3> {
        self.0.iter().map(|a| a * ANGBOHR).collect()
    }

    /// return the unit vector from atom i to atom j
    pub fn unit(&self, i: usize, j: usize) -> Vec3 {
        let diff = self[j] - self[i];
        diff / diff.magnitude()
    }

    /// distance between atoms i and j in bohr
    pub fn dist(&self, i: usize, j: usize) -> f64 {
        (self[j] - self[i]).magnitude()
    }

    /// angle in radians between atoms i, j, and k, where j is the central atom
    pub fn angle(&self, i: usize, j: usize, k: usize) -> f64 {
        let e_ji = Self::unit(self, j, i);
        let e_jk = Self::unit(self, j, k);
        e_ji.dot(&e_jk).clamp(-1.0, 1.0).acos()
    }

    /// the row of the Wilson B matrix for `ic`: the derivative of its value
    /// with respect to every Cartesian coordinate
    pub fn s_vec(&self, ic: &Siic) -> Vec<f64> {
        let mut tmp = vec![0.0; 3 * self.len()];
        let mut set = |atom: usize, v: Vec3| {
            for i in 0..3 {
                tmp[3 * atom + i] = v[i];
            }
        };
        match *ic {
            Siic::Stretch(a, b) => {
                let e_12 = self.unit(a, b);
                set(a, -e_12);
                set(b, e_12);
            }
            Siic::Bend(a, b, c) => {
                let e_21 = self.unit(b, a);
                let e_23 = self.unit(b, c);
                let t_12 = self.dist(b, a);
                let t_32 = self.dist(b, c);
                let w = e_21.dot(&e_23);
                let sp = (1.0 - w * w).sqrt();
                let c1 = 1.0 / (t_12 * sp);
                let c2 = 1.0 / (t_32 * sp);
                let va = (w * e_21 - e_23) * c1;
                let vc = (w * e_23 - e_21) * c2;
                set(a, va);
                set(c, vc);
                set(b, -va - vc);
            }
            Siic::OopDist(a, b, c, d) => {
                let va = self[b] - self[a];
                let vb = self[c] - self[a];
                let n = va.cross(&vb);
                let nn = n.magnitude();
                let u = n / nn;
                let w = self[d] - self[a];
                let dist = u.dot(&w);
                let p = (w - dist * u) / nn;
                let db = vb.cross(&p);
                let dc = p.cross(&va);
                set(b, db);
                set(c, dc);
                set(d, u);
                set(a, -db - dc - u);
            }
            Siic::Torsion(a, b, c, d) => {
                let f = self[a] - self[b];
                let g = self[b] - self[c];
                let h = self[d] - self[c];
                let va = f.cross(&g);
                let vb = h.cross(&g);
                let aa = va.norm_squared();
                let bb = vb.norm_squared();
                let gn = g.magnitude();
                let fg = f.dot(&g);
                let hg = h.dot(&g);
                let da = -gn / aa * va;
                let dd = gn / bb * vb;
                let dg = fg / (aa * gn) * va - hg / (bb * gn) * vb;
                set(a, da);
                set(b, -da + dg);
                set(c, -dg - dd);
                set(d, dd);
            }
        }
        tmp
    }

    /// the matrix of second derivatives of `ic` with respect to the Cartesian
    /// coordinates, from central differences of [Geom::s_vec]. only the rows
    /// belonging to atoms in `ic` can be nonzero
    pub fn s_vec2(&self, ic: &Siic) -> DMat {
        let n = 3 * self.len();
        let mut ret = DMat::zeros(n, n);
        for atom in ic.atoms() {
            for x in 0..3 {
                let row = 3 * atom + x;
                let mut fwd = self.clone();
                fwd.0[atom][x] += HSTEP;
                let mut bwd = self.clone();
                bwd.0[atom][x] -= HSTEP;
                let sf = fwd.s_vec(ic);
                let sb = bwd.s_vec(ic);
                for col in 0..n {
                    ret[(row, col)] = (sf[col] - sb[col]) / (2.0 * HSTEP);
                }
            }
        }
        (&ret + ret.transpose()) * 0.5
    }

    /// Return a copy of `self` with `ic` moved to `target` by iterative
    /// back transformation: repeatedly step along A = Bᵀ(BBᵀ)⁻¹ until the
    /// value matches.
    pub fn displace(&self, ic: &Siic, target: f64) -> Result<Geom, IcsError> {
        let mut cart: DVec = self.clone().into();
        let mut geom = self.clone();
        for _ in 0..MAX_ITER {
            let mut diff = target - ic.value(&geom);
            if ic.is_torsion() {
                diff = wrap_angle(diff);
            }
            if diff.abs() <= TOLDISP {
                return Ok(geom);
            }
            let b = DVec::from(geom.s_vec(ic));
            cart += &b * (diff / b.dot(&b));
            geom = Geom::from(&cart);
        }
        Err(IcsError::DispError(format!(
            "max iterations exceeded displacing {ic} to {target}"
        )))
    }
}

impl From<&DVec> for Geom {
    fn from(dvec: &DVec) -> Self {
        Self(
            dvec.as_slice()
                .chunks(3)
                .map(Vec3::from_row_slice)
                .collect(),
        )
    }
}

impl From<Geom> for DVec {
    fn from(val: Geom) -> Self {
        let mut geom = Vec::with_capacity(3 * val.len());
        for c in &val.0 {
            geom.extend(c.iter());
        }
        DVec::from(geom)
    }
}

impl Index<usize> for Geom {
    type Output = Vec3;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Geom {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl Display for Geom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for atom in &self.0 {
            writeln!(f, "{:20.10}{:20.10}{:20.10}", atom[0], atom[1], atom[2])?;
        }
        Ok(())
    }
}
