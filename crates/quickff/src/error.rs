use std::{error, fmt::Display};

use polyfit::FitError;

#[derive(Debug)]
pub enum Error {
    /// fewer samples than a harmonic fit needs survived generation
    InsufficientData { ic: String, have: usize },

    /// the harmonic fit of a complete trajectory failed
    Fit(String, FitError),

    /// the trajectory store exists but cannot be used
    CacheCorruption(String),

    /// generation was cancelled by the user
    Interrupted,

    /// the Hessian least-squares refinement failed
    Refine(String),

    /// an inconsistent force-field table operation
    Table(String),

    /// the reference data is inconsistent
    Reference(String),

    Config(String),

    Io(std::io::Error),
}

impl Error {
    /// Returns `true` if the error is [`Interrupted`].
    ///
    /// [`Interrupted`]: Error::Interrupted
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InsufficientData { ic, have } => write!(
                f,
                "only {have} samples for {ic}, at least 3 are required"
            ),
            Error::Io(e) => write!(f, "{e}"),
            e => write!(f, "{e:?}"),
        }
    }
}

impl error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
