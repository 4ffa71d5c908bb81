use std::path::Path;

use ndarray::{ArrayD, IxDyn};

use crate::error::{Result, RoiscopeError};
use crate::frame::Frame;

/// Decode the first dataset (sorted key order) at the root of an HDF5 file.
pub fn read_hdf5(path: &Path) -> Result<Frame> {
    let file = hdf5::File::open(path)?;
    let mut names = file.member_names()?;
    names.sort();

    for name in names {
        // Groups fail to open as datasets; skip them.
        let Ok(dataset) = file.dataset(&name) else {
            continue;
        };
        let shape = dataset.shape();
        let values = dataset.read_raw::<f64>()?;
        let dtype = dataset.dtype()?;
        let descr = dtype
            .to_descriptor()
            .map(|d| d.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        tracing::debug!("Reading dataset {} from {}", name, path.display());
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| RoiscopeError::InvalidImage(e.to_string()))?;
        return Ok(Frame::new(data, descr, dtype.size()));
    }

    Err(RoiscopeError::DatasetNotFound(path.to_path_buf()))
}
