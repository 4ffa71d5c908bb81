use std::path::PathBuf;

use thiserror::Error;

use crate::expr::ExprError;

#[derive(Error, Debug)]
pub enum RoiscopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a readable directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("No array files found in {}", .0.display())]
    NoItems(PathBuf),

    #[error("Item {0} is not in the catalog")]
    ItemNotFound(u32),

    #[error("No file found for item {item} in {}", .directory.display())]
    FileNotFound { item: u32, directory: PathBuf },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid NPY data: {0}")]
    InvalidNpy(String),

    #[error("NPZ archive error: {0}")]
    Npz(#[from] zip::result::ZipError),

    #[error("No array stored in {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Expression error: {0}")]
    Expression(#[from] ExprError),

    #[error("Empty frame sequence")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, RoiscopeError>;
