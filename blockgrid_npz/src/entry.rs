use blockgrid::{Block, Index};
use ndarray::{Array2, Ix2};

use crate::{NpyArray, NpyElement, NpzError};

/// The suffix of the entry holding the locations of a block.
pub const LOCATION_SUFFIX: &str = "_location";

/// The suffix of the entry holding the data of a block.
pub const DATA_SUFFIX: &str = "_data";

/// A named item to write to an archive.
#[derive(Clone, Debug, PartialEq)]
pub enum NpzEntry {
    /// An array, written as a single entry.
    Array(NpyArray),
    /// A block with data, written as the entries `<name>_location` and `<name>_data`.
    Block(NpzBlock),
}

impl From<NpyArray> for NpzEntry {
    fn from(array: NpyArray) -> Self {
        Self::Array(array)
    }
}

impl<T: NpyElement> TryFrom<Block<T>> for NpzEntry {
    type Error = NpzError;

    fn try_from(block: Block<T>) -> Result<Self, Self::Error> {
        Ok(Self::Block(NpzBlock::try_from(block)?))
    }
}

impl<T: NpyElement> TryFrom<&Block<T>> for NpzEntry {
    type Error = NpzError;

    fn try_from(block: &Block<T>) -> Result<Self, Self::Error> {
        Ok(Self::Block(NpzBlock::try_from(block)?))
    }
}

/// The locations and data of a [`Block`] with data.
#[derive(Clone, Debug, PartialEq)]
pub struct NpzBlock {
    location: Array2<Index>,
    data: NpyArray,
}

impl NpzBlock {
    /// Return the block locations, shape `[B, N]`.
    #[must_use]
    pub fn location(&self) -> &Array2<Index> {
        &self.location
    }

    /// Return the block data, shape `[B, ...]`.
    #[must_use]
    pub fn data(&self) -> &NpyArray {
        &self.data
    }
}

impl<T: NpyElement> TryFrom<Block<T>> for NpzBlock {
    type Error = NpzError;

    fn try_from(block: Block<T>) -> Result<Self, Self::Error> {
        match block.into_parts() {
            (location, Some(data)) => Ok(Self {
                location,
                data: T::into_npy(data),
            }),
            (_, None) => Err(NpzError::MissingData),
        }
    }
}

impl<T: NpyElement> TryFrom<&Block<T>> for NpzBlock {
    type Error = NpzError;

    fn try_from(block: &Block<T>) -> Result<Self, Self::Error> {
        let data = block.data().ok_or(NpzError::MissingData)?;
        Ok(Self {
            location: block.location().clone(),
            data: T::into_npy(data.clone()),
        })
    }
}

/// Rebuild the block `name` from its location and data arrays.
pub(crate) fn block_from_arrays<T: NpyElement>(
    name: &str,
    location: NpyArray,
    data: NpyArray,
) -> Result<Block<T>, NpzError> {
    let location = i64::from_npy(location)
        .map_err(|location| {
            NpzError::data_type_mismatch(format!("{name}{LOCATION_SUFFIX}"), i64::DESCR, &location)
        })?
        .into_dimensionality::<Ix2>()?;
    let data = T::from_npy(data).map_err(|data| {
        NpzError::data_type_mismatch(format!("{name}{DATA_SUFFIX}"), T::DESCR, &data)
    })?;
    Ok(Block::new_with_data(location, data)?)
}
