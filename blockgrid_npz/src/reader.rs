use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use blockgrid::Block;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::entry::{DATA_SUFFIX, LOCATION_SUFFIX, block_from_arrays};
use crate::{NpyArray, NpyElement, NpzError, npy};

/// The largest buffer reserved up front for an archive entry.
const MAX_PREALLOCATION: usize = 64 * 1024 * 1024;

/// Return the capacity to reserve for an entry that declares `size` uncompressed bytes.
fn preallocation(size: u64) -> usize {
    usize::try_from(size).map_or(MAX_PREALLOCATION, |size| size.min(MAX_PREALLOCATION))
}

/// A reader of `.npz` archives.
pub struct NpzReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl NpzReader<File> {
    /// Open the archive at `path`.
    ///
    /// # Errors
    /// Returns an [`NpzError`] if the file cannot be opened or is not a zip archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NpzError> {
        let path = path.as_ref();
        log::debug!("opening npz archive {}", path.display());
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> NpzReader<R> {
    /// Create an archive reader on `reader`.
    ///
    /// # Errors
    /// Returns [`NpzError::Zip`] if `reader` is not a zip archive.
    pub fn new(reader: R) -> Result<Self, NpzError> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }

    /// Return the sorted names of the arrays in the archive.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter_map(|file_name| file_name.strip_suffix(".npy"))
            .map(str::to_string)
            .collect();
        names.sort_unstable();
        names
    }

    /// Read the array `name`.
    ///
    /// # Errors
    /// Returns [`NpzError::MissingEntry`] if there is no array `name`, or an [`NpzError`] if it cannot be decoded.
    pub fn array(&mut self, name: &str) -> Result<NpyArray, NpzError> {
        let mut file = match self.archive.by_name(&format!("{name}.npy")) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Err(NpzError::MissingEntry(name.to_string())),
            Err(err) => return Err(err.into()),
        };
        let mut bytes = Vec::with_capacity(preallocation(file.size()));
        file.read_to_end(&mut bytes)?;
        let array = npy::read_npy(&bytes).map_err(|source| NpzError::InvalidEntry {
            name: name.to_string(),
            source,
        })?;
        log::debug!("read {name} {} {:?}", array.descr(), array.shape());
        Ok(array)
    }

    /// Read the block `name` from the arrays `<name>_location` and `<name>_data`.
    ///
    /// # Errors
    /// Returns an [`NpzError`] if either array is missing or cannot be decoded, has an unexpected element type, or they do not form a valid block.
    pub fn block<T: NpyElement>(&mut self, name: &str) -> Result<Block<T>, NpzError> {
        let location = self.array(&format!("{name}{LOCATION_SUFFIX}"))?;
        let data = self.array(&format!("{name}{DATA_SUFFIX}"))?;
        block_from_arrays(name, location, data)
    }

    /// Read every array in the archive.
    ///
    /// Entries that are not `.npy` files are skipped.
    ///
    /// # Errors
    /// Returns an [`NpzError`] if any array cannot be decoded.
    pub fn read_all(&mut self) -> Result<BTreeMap<String, NpyArray>, NpzError> {
        let file_names: Vec<String> = self.archive.file_names().map(str::to_string).collect();
        let mut arrays = BTreeMap::new();
        for file_name in file_names {
            if let Some(name) = file_name.strip_suffix(".npy") {
                arrays.insert(name.to_string(), self.array(name)?);
            } else {
                log::warn!("skipping archive entry {file_name}, it is not an npy file");
            }
        }
        Ok(arrays)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use ndarray::{ArrayD, IxDyn, array};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::{NpzOptions, NpzWriter};

    fn archive(arrays: &[(&str, NpyArray)]) -> Cursor<Vec<u8>> {
        let mut writer = NpzWriter::new(Cursor::new(Vec::new()), &NpzOptions::default());
        for (name, array) in arrays {
            writer.add_array(name, array).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn reader_names_and_arrays() {
        let a = NpyArray::from(array![[1i64, 2], [3, 4]].into_dyn());
        let b = NpyArray::from(ArrayD::<f32>::from_elem(IxDyn(&[]), 0.5));
        let mut reader = NpzReader::new(archive(&[("z", a.clone()), ("b", b.clone())])).unwrap();
        assert_eq!(reader.names(), vec!["b", "z"]);
        assert_eq!(reader.array("z").unwrap(), a);
        assert_eq!(reader.array("b").unwrap(), b);
        assert!(matches!(
            reader.array("c"),
            Err(NpzError::MissingEntry(name)) if name == "c"
        ));
    }

    #[test]
    fn reader_skips_non_npy() {
        testing_logger::setup();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"not an array").unwrap();
        zip.start_file("a.npy", SimpleFileOptions::default())
            .unwrap();
        npy::write_npy(array![1i32, 2, 3].into_dyn().view(), &mut zip).unwrap();
        let cursor = zip.finish().unwrap();

        let mut reader = NpzReader::new(cursor).unwrap();
        let arrays = reader.read_all().unwrap();
        assert_eq!(arrays.keys().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(arrays["a"], NpyArray::from(array![1i32, 2, 3].into_dyn()));
        testing_logger::validate(|captured_logs| {
            let warnings: Vec<_> = captured_logs
                .iter()
                .filter(|log| log.level == log::Level::Warn)
                .collect();
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].body.contains("readme.txt"));
        });
    }

    #[test]
    fn reader_invalid_entry() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("a.npy", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"\x93NUMPY\x01\x00").unwrap();
        let cursor = zip.finish().unwrap();

        let mut reader = NpzReader::new(cursor).unwrap();
        assert!(matches!(
            reader.array("a"),
            Err(NpzError::InvalidEntry { name, source: npy::NpyError::Truncated }) if name == "a"
        ));
    }

    #[test]
    fn preallocation_is_capped() {
        assert_eq!(preallocation(0), 0);
        assert_eq!(preallocation(1000), 1000);
        assert_eq!(preallocation(u64::MAX), MAX_PREALLOCATION);
    }

    #[test]
    fn reader_not_an_archive() {
        assert!(matches!(
            NpzReader::new(Cursor::new(b"not a zip archive".to_vec())),
            Err(NpzError::Zip(_))
        ));
    }
}
