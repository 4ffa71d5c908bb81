#![allow(dead_code)]

use std::cell::Cell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, ArrayD};
use roiscope_core::error::Result;
use roiscope_core::frame::Frame;
use roiscope_core::io::npy::write_npy;
use roiscope_core::io::{load_array, ArrayLoader};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 2-D image where pixel `(row, col)` holds `f(row, col)`.
pub fn image(height: usize, width: usize, f: impl Fn(usize, usize) -> f64) -> Array2<f64> {
    Array2::from_shape_fn((height, width), |(r, c)| f(r, c))
}

/// `(height, width, 3)` image with constant channel values.
pub fn rgb_image(height: usize, width: usize, rgb: [f64; 3]) -> Array3<f64> {
    Array3::from_shape_fn((height, width, 3), |(_, _, c)| rgb[c])
}

pub fn write_npy_item(dir: &Path, name: &str, data: &ArrayD<f64>) -> PathBuf {
    let path = dir.join(name);
    write_npy(&path, data).unwrap();
    path
}

/// Write `data` as the single `arr_0.npy` member of an `.npz` archive.
pub fn write_npz_item(dir: &Path, name: &str, data: &ArrayD<f64>) -> PathBuf {
    let scratch = tempfile::NamedTempFile::new().unwrap();
    write_npy(scratch.path(), data).unwrap();
    let bytes = std::fs::read(scratch.path()).unwrap();

    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("arr_0.npy", options).unwrap();
    zip.write_all(&bytes).unwrap();
    zip.finish().unwrap();
    path
}

/// Create an empty file; enough for directory scans.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap();
    path
}

/// Loader that counts how often it is asked to decode a file.
#[derive(Default)]
pub struct CountingLoader {
    pub calls: Cell<usize>,
}

impl ArrayLoader for CountingLoader {
    fn load(&self, path: &Path) -> Result<Frame> {
        self.calls.set(self.calls.get() + 1);
        load_array(path)
    }
}
