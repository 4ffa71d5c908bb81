use std::path::PathBuf;

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis, Ix2, IxDyn};
use serde::Serialize;

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R, RGB_CHANNEL_COUNT};
use crate::error::{Result, RoiscopeError};

/// A decoded array frame.
///
/// Shape `(height, width)` is a single-channel image, `(height, width, channels)`
/// a multi-channel one. The catalog accepts any rank; image-level operations
/// reject anything that is not 2-D or 3-D.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: ArrayD<f64>,
    /// dtype string of the source data (`"<u2"`, `"float32"`, ...).
    pub dtype: String,
    /// Bytes per element in the source data.
    pub item_size: usize,
}

impl Frame {
    pub fn new(data: ArrayD<f64>, dtype: impl Into<String>, item_size: usize) -> Self {
        Self {
            data,
            dtype: dtype.into(),
            item_size,
        }
    }

    /// Size of the source data in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len() * self.item_size
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// `(height, width)` of an image frame.
    pub fn dims(&self) -> Result<(usize, usize)> {
        image_dims(&self.data.view())
    }

    pub fn channel_count(&self) -> Result<usize> {
        channel_count(&self.data.view())
    }

    /// Collapse the channel axis into one scalar per pixel.
    pub fn reduced(&self) -> Result<Array2<f64>> {
        reduce_channels(&self.data.view())
    }

    /// One channel as a 2-D view.
    pub fn channel(&self, index: usize) -> Result<ArrayView2<'_, f64>> {
        channel_view(&self.data.view(), index)
    }
}

impl From<Array2<f64>> for Frame {
    fn from(data: Array2<f64>) -> Self {
        Frame::new(data.into_dyn(), "<f8", 8)
    }
}

impl From<ndarray::Array3<f64>> for Frame {
    fn from(data: ndarray::Array3<f64>) -> Self {
        Frame::new(data.into_dyn(), "<f8", 8)
    }
}

/// Metadata recorded for every item the catalog loads.
#[derive(Clone, Debug, Serialize)]
pub struct FrameMetadata {
    pub path: PathBuf,
    pub shape: Vec<usize>,
    pub dtype: String,
    /// Size of the decoded source data in bytes.
    pub byte_size: usize,
}

pub fn image_dims(data: &ArrayViewD<'_, f64>) -> Result<(usize, usize)> {
    match data.ndim() {
        2 | 3 => Ok((data.shape()[0], data.shape()[1])),
        n => Err(RoiscopeError::InvalidImage(format!(
            "expected a 2-D or 3-D array, got {n} dimensions"
        ))),
    }
}

pub fn channel_count(data: &ArrayViewD<'_, f64>) -> Result<usize> {
    image_dims(data)?;
    Ok(if data.ndim() == 2 { 1 } else { data.shape()[2] })
}

pub fn channel_view<'a>(data: &ArrayViewD<'a, f64>, index: usize) -> Result<ArrayView2<'a, f64>> {
    let channels = channel_count(data)?;
    if index >= channels {
        return Err(RoiscopeError::InvalidInput(format!(
            "channel {index} out of range (channels: {channels})"
        )));
    }
    let view = if data.ndim() == 2 {
        data.clone()
    } else {
        data.clone().index_axis_move(Axis(2), index)
    };
    view.into_dimensionality::<Ix2>()
        .map_err(|e| RoiscopeError::InvalidImage(e.to_string()))
}

/// Reduce one pixel's channel values to a scalar.
///
/// Three channels are treated as RGB (BT.601 luminance), any other count is
/// averaged, a single channel is returned as-is.
pub fn reduce_pixel(values: &[f64]) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => values[0],
        RGB_CHANNEL_COUNT => {
            LUMINANCE_R * values[0] + LUMINANCE_G * values[1] + LUMINANCE_B * values[2]
        }
        n => values.iter().sum::<f64>() / n as f64,
    }
}

/// Per-pixel channel reduction of a whole image, see [`reduce_pixel`].
pub fn reduce_channels(data: &ArrayViewD<'_, f64>) -> Result<Array2<f64>> {
    let channels = channel_count(data)?;
    if channels == 1 {
        return Ok(channel_view(data, 0)?.to_owned());
    }
    if channels == 0 {
        return Err(RoiscopeError::InvalidImage("image has zero channels".into()));
    }

    let (h, w) = image_dims(data)?;
    let mut out = Array2::<f64>::zeros((h, w));
    let mut values = vec![0.0; channels];
    for row in 0..h {
        for col in 0..w {
            for (c, v) in values.iter_mut().enumerate() {
                *v = data[IxDyn(&[row, col, c])];
            }
            out[[row, col]] = reduce_pixel(&values);
        }
    }
    Ok(out)
}
