use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use blockgrid::Block;
use ndarray::ArrayViewD;
use zip::ZipWriter;

use crate::entry::{DATA_SUFFIX, LOCATION_SUFFIX};
use crate::{NpyArray, NpyElement, NpzEntry, NpzError, NpzOptions, npy};

/// A writer of `.npz` archives.
///
/// Each array is stored as the zip entry `<name>.npy`.
/// The archive is incomplete until [`NpzWriter::finish`] is called.
pub struct NpzWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: NpzOptions,
}

impl NpzWriter<File> {
    /// Create an archive at `path`, truncating any existing file.
    ///
    /// # Errors
    /// Returns [`NpzError::Io`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>, options: &NpzOptions) -> Result<Self, NpzError> {
        let path = path.as_ref();
        log::debug!("creating npz archive {}", path.display());
        Ok(Self::new(File::create(path)?, options))
    }
}

impl<W: Write + Seek> NpzWriter<W> {
    /// Create an archive writer on `writer`.
    #[must_use]
    pub fn new(writer: W, options: &NpzOptions) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: *options,
        }
    }

    /// Add the array `name`.
    ///
    /// # Errors
    /// Returns an [`NpzError`] if `name` is already in the archive or writing fails.
    pub fn add_array(&mut self, name: &str, array: &NpyArray) -> Result<(), NpzError> {
        self.start_entry(name)?;
        array.write(&mut self.zip)?;
        log::debug!("wrote {name} {} {:?}", array.descr(), array.shape());
        Ok(())
    }

    /// Add the array `name` from an array view.
    ///
    /// # Errors
    /// Returns an [`NpzError`] if `name` is already in the archive or writing fails.
    pub fn add_ndarray<T: NpyElement>(
        &mut self,
        name: &str,
        array: ArrayViewD<'_, T>,
    ) -> Result<(), NpzError> {
        self.start_entry(name)?;
        npy::write_npy(array.view(), &mut self.zip)?;
        log::debug!("wrote {name} {} {:?}", T::DESCR, array.shape());
        Ok(())
    }

    /// Add the block `name` as the arrays `<name>_location` and `<name>_data`.
    ///
    /// # Errors
    /// Returns [`NpzError::MissingData`] if `block` has no data, or an [`NpzError`] if writing fails.
    pub fn add_block<T: NpyElement>(
        &mut self,
        name: &str,
        block: &Block<T>,
    ) -> Result<(), NpzError> {
        let data = block.data().ok_or(NpzError::MissingData)?;
        self.add_ndarray(
            &format!("{name}{LOCATION_SUFFIX}"),
            block.location().view().into_dyn(),
        )?;
        self.add_ndarray(&format!("{name}{DATA_SUFFIX}"), data.view())
    }

    /// Add the entry `name`.
    ///
    /// # Errors
    /// Returns an [`NpzError`] if any resulting array name is already in the archive or writing fails.
    pub fn add_entry(&mut self, name: &str, entry: &NpzEntry) -> Result<(), NpzError> {
        match entry {
            NpzEntry::Array(array) => self.add_array(name, array),
            NpzEntry::Block(block) => {
                self.add_ndarray(
                    &format!("{name}{LOCATION_SUFFIX}"),
                    block.location().view().into_dyn(),
                )?;
                self.add_array(&format!("{name}{DATA_SUFFIX}"), block.data())
            }
        }
    }

    /// Write the archive directory and return the underlying writer.
    ///
    /// # Errors
    /// Returns [`NpzError::Zip`] if the archive cannot be finalised.
    pub fn finish(self) -> Result<W, NpzError> {
        Ok(self.zip.finish()?)
    }

    fn start_entry(&mut self, name: &str) -> Result<(), NpzError> {
        self.zip
            .start_file(format!("{name}.npy"), self.options.file_options())?;
        Ok(())
    }
}
