//! The molecular system and its catalog of internal coordinates.

use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
    sync::LazyLock,
};

use rustc_hash::FxHashSet;

use crate::{ANGBOHR, Geom, Ic, IcsError, Siic};

/// bonds are detected when the distance is below this factor times the sum of
/// the covalent radii
const BOND_TOL: f64 = 1.3;

/// bends at least this close to linear (in radians) have no well-defined
/// torsion through them
const LINEAR_EPS: f64 = 5.0 * std::f64::consts::PI / 180.0;

/// covalent radii in Å, from Cordero et al. Dalton Trans. 2008
static COVALENT_RADII: LazyLock<HashMap<&'static str, f64>> =
    LazyLock::new(|| {
        HashMap::from([
            ("H", 0.31),
            ("He", 0.28),
            ("Li", 1.28),
            ("Be", 0.96),
            ("B", 0.84),
            ("C", 0.76),
            ("N", 0.71),
            ("O", 0.66),
            ("F", 0.57),
            ("Ne", 0.58),
            ("Na", 1.66),
            ("Mg", 1.41),
            ("Al", 1.21),
            ("Si", 1.11),
            ("P", 1.07),
            ("S", 1.05),
            ("Cl", 1.02),
            ("Ar", 1.06),
        ])
    });

#[derive(Debug, Clone, PartialEq)]
pub struct System {
    /// element symbols
    pub labels: Vec<String>,

    /// force-field atom types used to build kind names. defaults to `labels`
    pub ffatypes: Vec<String>,

    /// reference geometry in bohr
    pub geom: Geom,

    /// pairs of bonded atoms with the lower index first
    pub bonds: Vec<(usize, usize)>,

    /// sorted neighbor lists derived from `bonds`
    pub neighbors: Vec<Vec<usize>>,

    /// internal coordinate instances grouped by kind name
    pub ics: BTreeMap<String, Vec<Ic>>,
}

impl System {
    /// build a system and enumerate its internal coordinates. bonds are
    /// detected from covalent radii if `bonds` is `None`
    pub fn new(
        labels: Vec<String>,
        ffatypes: Option<Vec<String>>,
        geom: Geom,
        bonds: Option<Vec<(usize, usize)>>,
    ) -> Result<Self, IcsError> {
        let n = labels.len();
        if geom.len() != n {
            return Err(IcsError::Shape(format!(
                "{n} labels but {} positions",
                geom.len()
            )));
        }
        let ffatypes = ffatypes.unwrap_or_else(|| labels.clone());
        if ffatypes.len() != n {
            return Err(IcsError::Shape(format!(
                "{n} labels but {} atom types",
                ffatypes.len()
            )));
        }
        let bonds = match bonds {
            Some(bonds) => bonds,
            None => Self::detect_bonds(&labels, &geom),
        };
        let mut seen = FxHashSet::default();
        let mut sorted = Vec::with_capacity(bonds.len());
        for (i, j) in bonds {
            if i >= n || j >= n {
                return Err(IcsError::BadIndex(i.max(j)));
            }
            let b = (i.min(j), i.max(j));
            if i != j && seen.insert(b) {
                sorted.push(b);
            }
        }
        sorted.sort();
        let mut neighbors = vec![Vec::new(); n];
        for &(i, j) in &sorted {
            neighbors[i].push(j);
            neighbors[j].push(i);
        }
        for nb in &mut neighbors {
            nb.sort();
        }
        let mut ret = Self {
            labels,
            ffatypes,
            geom,
            bonds: sorted,
            neighbors,
            ics: BTreeMap::new(),
        };
        ret.determine_ics();
        Ok(ret)
    }

    /// detect bonds from the covalent radii of the atoms. unknown elements
    /// never bond
    pub fn detect_bonds(labels: &[String], geom: &Geom) -> Vec<(usize, usize)> {
        let mut ret = Vec::new();
        for i in 0..labels.len() {
            let Some(ri) = COVALENT_RADII.get(labels[i].as_str()) else {
                log::warn!("no covalent radius for {}", labels[i]);
                continue;
            };
            for j in i + 1..labels.len() {
                let Some(rj) = COVALENT_RADII.get(labels[j].as_str()) else {
                    continue;
                };
                if geom.dist(i, j) * ANGBOHR < BOND_TOL * (ri + rj) {
                    ret.push((i, j));
                }
            }
        }
        ret
    }

    pub fn natoms(&self) -> usize {
        self.labels.len()
    }

    fn atype(&self, i: usize) -> &str {
        &self.ffatypes[i]
    }

    /// file `siic` under the kind named by its prefix and the atom types
    /// `atoms`, in that order
    fn push(&mut self, atoms: &[usize], siic: Siic) {
        let types: Vec<&str> = atoms.iter().map(|&a| self.atype(a)).collect();
        let kind = format!("{}/{}", siic.prefix(), types.join("."));
        self.ics
            .entry(kind.clone())
            .or_default()
            .push(Ic::new(kind, siic));
    }

    /// enumerate bonds, bends, out-of-plane distances, and dihedrals. kind
    /// names are built from the atom types in a canonical order so that
    /// equivalent coordinates share a kind
    fn determine_ics(&mut self) {
        for (i, j) in self.bonds.clone() {
            let (i, j) = if self.atype(i) <= self.atype(j) {
                (i, j)
            } else {
                (j, i)
            };
            self.push(&[i, j], Siic::Stretch(i, j));
        }

        for j in 0..self.natoms() {
            let nb = self.neighbors[j].clone();
            for (n, &i) in nb.iter().enumerate() {
                for &k in &nb[n + 1..] {
                    let (i, k) = if self.atype(i) <= self.atype(k) {
                        (i, k)
                    } else {
                        (k, i)
                    };
                    self.push(&[i, j, k], Siic::Bend(i, j, k));
                }
            }
        }

        for c in 0..self.natoms() {
            if let [a, b, d] = self.neighbors[c][..] {
                let mut nb = [a, b, d];
                nb.sort_by(|x, y| self.atype(*x).cmp(self.atype(*y)));
                self.push(
                    &[nb[0], nb[1], nb[2], c],
                    Siic::OopDist(nb[0], nb[1], nb[2], c),
                );
            }
        }

        for (j, k) in self.bonds.clone() {
            for &i in &self.neighbors[j].clone() {
                if i == k {
                    continue;
                }
                for &l in &self.neighbors[k].clone() {
                    if l == j || l == i {
                        continue;
                    }
                    if self.is_linear(i, j, k) || self.is_linear(j, k, l) {
                        log::debug!(
                            "skipping dihedral {i}-{j}-{k}-{l} through a \
			     linear bend"
                        );
                        continue;
                    }
                    let fwd = [i, j, k, l].map(|a| self.atype(a));
                    let rev = [l, k, j, i].map(|a| self.atype(a));
                    let atoms = if fwd <= rev { [i, j, k, l] } else { [l, k, j, i] };
                    let [a, b, c, d] = atoms;
                    self.push(&atoms, Siic::Torsion(a, b, c, d));
                }
            }
        }
    }

    fn is_linear(&self, i: usize, j: usize, k: usize) -> bool {
        let theta = self.geom.angle(i, j, k);
        theta < LINEAR_EPS || std::f64::consts::PI - theta < LINEAR_EPS
    }

    /// write a table of the atoms, their types, positions in Å, and
    /// neighbors to `w`
    pub fn print_atom_info<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(
            w,
            "{:>5} {:<4} {:<8}{:>12}{:>12}{:>12}   neighbors",
            "index", "elem", "ffatype", "x", "y", "z"
        )?;
        for (i, pos) in self.geom.angstrom().iter().enumerate() {
            let nb = self.neighbors[i]
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(",");
            writeln!(
                w,
                "{:>5} {:<4} {:<8}{:>12.6}{:>12.6}{:>12.6}   {}",
                i, self.labels[i], self.ffatypes[i], pos[0], pos[1], pos[2], nb
            )?;
        }
        Ok(())
    }
}
