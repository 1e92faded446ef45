//! `blockgrid_npz` stores [`blockgrid`] arrays and blocks in NumPy `.npz` archives.
//!
//! An `.npz` archive is a zip archive with one `.npy` file per named array, as written by `numpy.savez` and `numpy.savez_compressed`.
//! Arrays are [`NpyArray`]s, holding `i32`, `i64`, `f32` or `f64` elements.
//! A [`Block`](blockgrid::Block) with data named `name` is stored as the two arrays `<name>_location` (`i64`, shape `[B, N]`) and `<name>_data` (shape `[B, ...]`).
//!
//! ## Example
//! ```rust
//! use blockgrid::Block;
//! use blockgrid_npz::{NpyArray, NpzEntry, NpzOptions, read_block, read_npz, write_npz};
//!
//! let path = std::env::temp_dir().join("blockgrid_npz_example.npz");
//! let block = Block::new_with_data([0, 0], ndarray::ArrayD::<f32>::zeros(vec![4, 4]))?;
//! let scale = NpyArray::from(ndarray::arr1(&[0.5f64, 0.5]).into_dyn());
//! write_npz(
//!     &path,
//!     [("volume", NpzEntry::try_from(&block)?), ("scale", scale.into())],
//!     &NpzOptions::default(),
//! )?;
//!
//! let arrays = read_npz(&path)?;
//! assert_eq!(arrays.len(), 3);
//! assert_eq!(read_block::<f32>(&arrays, "volume")?, block);
//! # std::fs::remove_file(&path)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Licence
//! `blockgrid_npz` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod entry;
pub mod npy;
mod options;
mod reader;
mod writer;

use std::collections::BTreeMap;
use std::path::Path;

pub use entry::{DATA_SUFFIX, LOCATION_SUFFIX, NpzBlock, NpzEntry};
pub use npy::{NpyArray, NpyElement, NpyError};
pub use options::{NpzCompression, NpzOptions};
pub use reader::NpzReader;
pub use writer::NpzWriter;

use blockgrid::{Block, BlockError};
use entry::block_from_arrays;
use thiserror::Error;

/// An `.npz` archive error.
#[derive(Debug, Error)]
pub enum NpzError {
    /// An IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A zip archive error.
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// An archive entry is not a valid `.npy` file.
    #[error("invalid archive entry {name}: {source}")]
    InvalidEntry {
        /// The array name.
        name: String,
        /// The decoding error.
        source: NpyError,
    },
    /// An array has an unexpected element type.
    #[error("array {name} has data type {got}, expected {expected}")]
    DataTypeMismatch {
        /// The array name.
        name: String,
        /// The expected array-protocol type string.
        expected: &'static str,
        /// The array-protocol type string of the array.
        got: &'static str,
    },
    /// A block has no data to store.
    #[error("block has no data")]
    MissingData,
    /// The archive has no array with the requested name.
    #[error("archive has no array {_0}")]
    MissingEntry(String),
    /// An array has an unexpected shape.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    /// Arrays do not form a valid block.
    #[error(transparent)]
    Block(#[from] BlockError),
}

impl NpzError {
    pub(crate) fn data_type_mismatch(name: String, expected: &'static str, got: &NpyArray) -> Self {
        Self::DataTypeMismatch {
            name,
            expected,
            got: got.descr(),
        }
    }
}

/// Write the named `entries` to a new archive at `path`.
///
/// # Errors
/// Returns an [`NpzError`] if the file cannot be written or an array name occurs more than once.
pub fn write_npz<N: AsRef<str>>(
    path: impl AsRef<Path>,
    entries: impl IntoIterator<Item = (N, NpzEntry)>,
    options: &NpzOptions,
) -> Result<(), NpzError> {
    let mut writer = NpzWriter::create(path, options)?;
    for (name, entry) in entries {
        writer.add_entry(name.as_ref(), &entry)?;
    }
    writer.finish()?;
    Ok(())
}

/// Read every array of the archive at `path`.
///
/// Entries that are not `.npy` files are skipped.
///
/// # Errors
/// Returns an [`NpzError`] if the file cannot be read or an array cannot be decoded.
pub fn read_npz(path: impl AsRef<Path>) -> Result<BTreeMap<String, NpyArray>, NpzError> {
    NpzReader::open(path)?.read_all()
}

/// Rebuild the block `name` from the arrays `<name>_location` and `<name>_data` of `arrays`.
///
/// # Errors
/// Returns an [`NpzError`] if either array is missing, has an unexpected element type, or they do not form a valid block.
pub fn read_block<T: NpyElement>(
    arrays: &BTreeMap<String, NpyArray>,
    name: &str,
) -> Result<Block<T>, NpzError> {
    let array = |suffix: &str| {
        let name = format!("{name}{suffix}");
        arrays
            .get(&name)
            .cloned()
            .ok_or(NpzError::MissingEntry(name))
    };
    block_from_arrays(name, array(LOCATION_SUFFIX)?, array(DATA_SUFFIX)?)
}
