//! Perturbation trajectories and the versioned JSON store that caches them
//! between runs.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use ics::Geom;
use serde::{Deserialize, Serialize};

use crate::Error;

/// the current layout of [Store]
pub const STORE_VERSION: u32 = 1;

/// One relaxed point along a perturbation trajectory. Everything is in atomic
/// units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// displacement from the reference value
    pub disp: f64,

    /// absolute value of the perturbed coordinate
    pub q: f64,

    /// relaxed Cartesian geometry
    pub geom: Geom,

    pub energy: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<Vec<f64>>,
}

/// The relaxed samples along one internal coordinate, ordered by increasing
/// displacement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// name of the perturbed coordinate instance
    pub ic: String,

    /// value of the coordinate in the reference geometry
    pub qref: f64,

    pub samples: Vec<Sample>,
}

impl Trajectory {
    pub fn new(ic: impl Into<String>, qref: f64) -> Self {
        Self {
            ic: ic.into(),
            qref,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn disps(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.disp).collect()
    }

    pub fn energies(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.energy).collect()
    }
}

/// Trajectories keyed by coordinate name
pub type Trajectories = BTreeMap<String, Trajectory>;

#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct Store {
    version: u32,
    trajectories: Trajectories,
}

/// load the trajectory store at `path`. Any failure to read or interpret an
/// existing file is a [Error::CacheCorruption]
pub fn load(path: impl AsRef<Path>) -> Result<Trajectories, Error> {
    let path = path.as_ref();
    let corrupt = |e: &dyn std::fmt::Display| {
        Error::CacheCorruption(format!("{}: {e}", path.display()))
    };
    let f = File::open(path).map_err(|e| corrupt(&e))?;
    let store: Store =
        serde_json::from_reader(BufReader::new(f)).map_err(|e| corrupt(&e))?;
    if store.version != STORE_VERSION {
        return Err(corrupt(&format!(
            "unsupported store version {}, expected {STORE_VERSION}",
            store.version
        )));
    }
    Ok(store.trajectories)
}

/// like [load], but a missing file is an empty store
pub fn load_or_default(path: impl AsRef<Path>) -> Result<Trajectories, Error> {
    if path.as_ref().exists() {
        load(path)
    } else {
        Ok(Trajectories::new())
    }
}

/// write `trajectories` to `path`, replacing any existing store
pub fn save(
    path: impl AsRef<Path>,
    trajectories: &Trajectories,
) -> Result<(), Error> {
    #[derive(Serialize)]
    struct StoreRef<'a> {
        version: u32,
        trajectories: &'a Trajectories,
    }
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer(
        &mut w,
        &StoreRef {
            version: STORE_VERSION,
            trajectories,
        },
    )
    .map_err(std::io::Error::from)?;
    w.flush()?;
    Ok(())
}
