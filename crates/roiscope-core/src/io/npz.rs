use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use crate::consts::NPZ_MAX_PREALLOC;
use crate::error::{Result, RoiscopeError};
use crate::frame::Frame;
use crate::io::npy::parse_npy;

/// Decode the first array stored in a `.npz` archive (archive order).
pub fn read_npz(path: &Path) -> Result<Frame> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !entry.is_file() || !entry.name().ends_with(".npy") {
            continue;
        }
        tracing::debug!("Reading {} from {}", entry.name(), path.display());
        let mut bytes = Vec::with_capacity(entry.size().min(NPZ_MAX_PREALLOC) as usize);
        entry.read_to_end(&mut bytes)?;
        return parse_npy(&bytes);
    }

    Err(RoiscopeError::DatasetNotFound(path.to_path_buf()))
}
