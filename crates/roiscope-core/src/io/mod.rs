#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod npy;
pub mod npz;

use std::path::Path;

use crate::error::{Result, RoiscopeError};
use crate::frame::Frame;

/// Decodes one array file into a [`Frame`].
///
/// The catalog goes through this trait so hosts and tests can substitute
/// their own decoding.
pub trait ArrayLoader {
    fn load(&self, path: &Path) -> Result<Frame>;
}

/// Default loader dispatching on the file extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileLoader;

impl ArrayLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<Frame> {
        load_array(path)
    }
}

/// Load an array file, choosing the decoder from its extension.
pub fn load_array(path: &Path) -> Result<Frame> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => npy::read_npy(path),
        Some("npz") => npz::read_npz(path),
        Some("h5" | "hdf5") => load_hdf5(path),
        other => Err(RoiscopeError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

#[cfg(feature = "hdf5")]
fn load_hdf5(path: &Path) -> Result<Frame> {
    hdf5::read_hdf5(path)
}

#[cfg(not(feature = "hdf5"))]
fn load_hdf5(path: &Path) -> Result<Frame> {
    Err(RoiscopeError::UnsupportedFormat(format!(
        "{} (built without the `hdf5` feature)",
        path.display()
    )))
}
