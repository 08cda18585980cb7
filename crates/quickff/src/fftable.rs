use std::{collections::BTreeMap, fmt::Display};

use ics::Unit;

use crate::Error;

/// A list of values stored in atomic units together with the unit used to
/// present them
#[derive(Clone, Debug, PartialEq)]
pub struct DataArray {
    pub unit: Unit,
    pub values: Vec<f64>,
}

impl DataArray {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            values: Vec::new(),
        }
    }

    pub fn with_values(unit: Unit, values: Vec<f64>) -> Self {
        Self { unit, values }
    }

    pub fn push(&mut self, x: f64) {
        self.values.push(x);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.len() as f64
    }

    /// population standard deviation
    pub fn std(&self) -> f64 {
        let mean = self.mean();
        let var = self.values.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
            / self.len() as f64;
        var.sqrt()
    }
}

impl Display for DataArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:10.3} +- {:7.3} {}",
            self.unit.to_unit(self.mean()),
            self.unit.to_unit(self.std()),
            self.unit
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub name: String,
    pub ks: DataArray,
    pub q0s: DataArray,
}

/// Force constants and equilibrium values per kind, in the order the kinds
/// were added
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FFTable {
    entries: Vec<Entry>,
}

impl FFTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// append an entry for `name`. The name must be new and the arrays must
    /// be the same nonzero length
    pub fn add(
        &mut self,
        name: impl Into<String>,
        ks: DataArray,
        q0s: DataArray,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.contains(&name) {
            return Err(Error::Table(format!("{name} is already present")));
        }
        if ks.len() != q0s.len() || ks.is_empty() {
            return Err(Error::Table(format!(
                "{name}: {} force constants and {} equilibrium values",
                ks.len(),
                q0s.len()
            )));
        }
        self.entries.push(Entry { name, ks, q0s });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// replace every force constant of the kinds in `fcs` with the new value,
    /// leaving the equilibrium values alone. Kinds without an entry are
    /// returned
    pub fn update_fcs(&mut self, fcs: &BTreeMap<String, f64>) -> Vec<String> {
        let mut missing = Vec::new();
        for (name, &k) in fcs {
            match self.entries.iter_mut().find(|e| &e.name == name) {
                Some(entry) => entry.ks.values.fill(k),
                None => missing.push(name.clone()),
            }
        }
        missing
    }
}

impl Display for FFTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
        for Entry { name, ks, q0s } in &self.entries {
            writeln!(f, "    {name:<width$}   K = {ks}    q0 = {q0s}")?;
        }
        Ok(())
    }
}
