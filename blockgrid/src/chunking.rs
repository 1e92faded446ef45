//! Decomposition of blocks into regular chunks.
//!
//! A block whose (unbatched) shape is an integer multiple of a chunk shape is tiled by `m_d = shape[d] / chunk_shape[d]` chunks along each spatial dimension `d`.
//! Two functions describe the tiling:
//!  - [`location`] returns where each chunk is on the lattice, shape `[B, m_1, ..., m_N, N]`, and
//!  - [`content`] returns the block data for each chunk, shape `[B, m_1, ..., m_N, c_1, ..., c_N]`.
//!
//! The chunk index axes `1..=N` have identical extents and ordering in both results.
//! To get a flat batch of chunks, merge the batch and chunk index axes with [`flatten_chunk_axes`], or use [`chunk_block`] to do all of this at once.
//!
//! [`content`] is composed of three independently usable layout steps: [`split_axes`], [`regroup_axes`] and [`collapse_axes`].
//! [`assemble`] is its inverse.

mod content;
mod location;

pub use content::{assemble, collapse_axes, content, regroup_axes, split_axes};
pub use location::{location, meshgrid, unsqueeze_to};

use ndarray::{ArrayD, ArrayViewD, Ix2};
use thiserror::Error;

use crate::{Block, BlockError, IncompatibleDimensionalityError, Index, VolumeShape};

/// A chunking error.
#[derive(Clone, Debug, Error)]
pub enum ChunkError {
    /// The chunk shape does not have one extent per spatial dimension.
    #[error("chunk shape is incompatible with the volume: {_0}")]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// The chunk shape has a zero extent.
    #[error("chunk shape {_0:?} has a zero extent")]
    ZeroExtent(VolumeShape),
    /// The volume shape is not an integer multiple of the chunk shape.
    #[error("spatial dimension size mismatch: shape {shape:?} not integer multiple of chunk shape {chunk_shape:?}")]
    NotIntegerMultiple {
        /// The volume shape.
        shape: VolumeShape,
        /// The chunk shape.
        chunk_shape: VolumeShape,
    },
    /// An array has an unexpected shape for a layout step.
    #[error("array shape {got:?} is incompatible with expected shape {expected:?}")]
    IncompatibleShape {
        /// The array shape.
        got: Vec<usize>,
        /// The expected array shape.
        expected: Vec<usize>,
    },
    /// A chunk offset does not fit in a lattice coordinate.
    #[error("chunk offset {_0} exceeds the lattice coordinate range")]
    OffsetOverflow(usize),
    /// A chunk location does not fit in a lattice coordinate.
    #[error("chunk offset {offset} combined with block location {origin} exceeds the lattice coordinate range")]
    LocationOverflow {
        /// The chunk offset.
        offset: Index,
        /// The block location.
        origin: Index,
    },
    /// The block holds no data.
    #[error("block has no data")]
    MissingData,
    /// The chunked block could not be created.
    #[error(transparent)]
    Block(#[from] BlockError),
    /// An array could not be reshaped.
    #[error(transparent)]
    Layout(#[from] ndarray::ShapeError),
}

/// Return the number of chunks along each dimension of a volume.
///
/// Each `m_d` is the number of chunk origins `0, c_d, 2 c_d, ...` below `shape[d]`, so a partial chunk at the end of a dimension is counted.
///
/// # Errors
/// Returns a [`ChunkError`] if the dimensionality of `shape` and `chunk_shape` differ or `chunk_shape` has a zero extent.
pub fn grid_shape(shape: &[usize], chunk_shape: &[usize]) -> Result<VolumeShape, ChunkError> {
    if shape.len() != chunk_shape.len() {
        return Err(IncompatibleDimensionalityError::new(chunk_shape.len(), shape.len()).into());
    }
    if chunk_shape.contains(&0) {
        return Err(ChunkError::ZeroExtent(chunk_shape.to_vec()));
    }
    Ok(std::iter::zip(shape, chunk_shape)
        .map(|(s, c)| s.div_ceil(*c))
        .collect())
}

/// Return the number of chunks along each dimension of a volume that is exactly tiled by `chunk_shape`.
///
/// # Errors
/// Returns [`ChunkError::NotIntegerMultiple`] if any extent of `shape` is not a multiple of the corresponding extent of `chunk_shape`, or any error of [`grid_shape`].
pub fn integer_multiple(
    shape: &[usize],
    chunk_shape: &[usize],
) -> Result<VolumeShape, ChunkError> {
    let grid_shape = grid_shape(shape, chunk_shape)?;
    if std::iter::zip(shape, chunk_shape).any(|(s, c)| s % c != 0) {
        return Err(ChunkError::NotIntegerMultiple {
            shape: shape.to_vec(),
            chunk_shape: chunk_shape.to_vec(),
        });
    }
    Ok(grid_shape)
}

/// Merge the batch axis and the following `vdim` chunk index axes of `array` into one axis.
///
/// A [`location`] result `[B, m_1, ..., m_N, N]` becomes `[B * m_1 * ... * m_N, N]`, and a [`content`] result becomes `[B * m_1 * ... * m_N, c_1, ..., c_N]`.
///
/// # Errors
/// Returns [`ChunkError::IncompatibleDimensionality`] if `array` has `vdim` or fewer axes.
pub fn flatten_chunk_axes<T: Clone>(
    array: ArrayViewD<'_, T>,
    vdim: usize,
) -> Result<ArrayD<T>, ChunkError> {
    if array.ndim() <= vdim {
        return Err(IncompatibleDimensionalityError::new(array.ndim(), vdim + 1).into());
    }
    let (leading, trailing) = array.shape().split_at(vdim + 1);
    let flat_shape: Vec<usize> = std::iter::once(leading.iter().product())
        .chain(trailing.iter().copied())
        .collect();
    Ok(array
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order(flat_shape)?)
}

/// Return a block with one batch member per chunk of `envelope`.
///
/// The locations are those of [`location`] and the data is that of [`content`], both flattened with [`flatten_chunk_axes`].
/// Batch member `b * m_1 * ... * m_N + i` is chunk `i` (in row-major order of chunk indices) of batch member `b` of `envelope`.
///
/// # Errors
/// Returns a [`ChunkError`] under the same conditions as [`content`].
pub fn chunk_block<T: Clone>(
    envelope: &Block<T>,
    chunk_shape: &[usize],
) -> Result<Block<T>, ChunkError> {
    let vdim = envelope.vdim();
    let data = flatten_chunk_axes(content(envelope, chunk_shape)?.view(), vdim)?;
    let location = flatten_chunk_axes(location(envelope, chunk_shape)?.view(), vdim)?
        .into_dimensionality::<Ix2>()?;
    log::debug!(
        "chunked block of size {:?} into {} chunks of shape {chunk_shape:?}",
        envelope.size(),
        location.nrows()
    );
    Ok(Block::new_with_data(location, data)?)
}
