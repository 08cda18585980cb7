//! Derive harmonic force fields from ab initio reference data by relaxed
//! geometry perturbation theory and a Hessian least-squares refinement.

pub mod config;
pub mod cost;
mod error;
pub mod export;
pub mod fftable;
pub mod model;
pub mod observer;
pub mod perturbation;
pub mod program;
pub mod reference;
pub mod trajectory;


pub use config::Config;
pub use error::Error;
pub use fftable::{DataArray, FFTable};
pub use observer::{LogObserver, Observer};
pub use program::Program;
pub use reference::Reference;

/// print the formatted message to stderr and exit with status 1
#[macro_export]
macro_rules! die {
    ($($t:tt)*) => {{
        eprintln!($($t)*);
        std::process::exit(1);
    }};
}

/// call `rayon::ThreadPoolBuilder` to set `num_threads` to `n`. Discards the
/// error returned by `build_global` if the thread pool has already been
/// initialized
pub fn max_threads(n: usize) {
    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build_global();
}
