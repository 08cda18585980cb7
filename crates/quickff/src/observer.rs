use crate::fftable::DataArray;

/// Receives progress notifications from [crate::Program]
pub trait Observer: Sync {
    /// called before the `index`th of the `total` coordinates of kind `kind`
    /// is generated. `index` starts at 1
    fn on_progress(&self, kind: &str, index: usize, total: usize);

    /// called once the harmonic estimates of every coordinate of `kind` are
    /// available
    fn on_estimate(&self, _kind: &str, _ks: &DataArray, _q0s: &DataArray) {}
}

/// Forward notifications to the [log] facade
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_progress(&self, kind: &str, index: usize, total: usize) {
        log::info!("{kind} generating {index:2}/{total}");
    }

    fn on_estimate(&self, kind: &str, ks: &DataArray, q0s: &DataArray) {
        log::info!("{kind} K = {ks} q0 = {q0s}");
    }
}
