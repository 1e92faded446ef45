use itertools::interleave;
use ndarray::{ArrayD, ArrayViewD};

use super::{ChunkError, integer_multiple};
use crate::{Block, IncompatibleDimensionalityError};

/// Split each spatial axis of batched `data` into a chunk index axis and a within-chunk axis.
///
/// `data` has shape `[B, o_1, ..., o_N]` and must be in standard (row-major) layout.
/// The result has shape `[B, m_1, c_1, ..., m_N, c_N]` where `c_d = chunk_shape[d]` and `m_d = o_d / c_d`.
/// Position `p` along axis `d` becomes `(p / c_d, p % c_d)`.
///
/// No data is moved.
///
/// # Errors
/// Returns a [`ChunkError`] if `data` does not have `chunk_shape.len() + 1` axes, its spatial shape is not an integer multiple of `chunk_shape`, or it is not in standard layout.
pub fn split_axes<'a, T>(
    data: ArrayViewD<'a, T>,
    chunk_shape: &[usize],
) -> Result<ArrayViewD<'a, T>, ChunkError> {
    let vdim = chunk_shape.len();
    if data.ndim() != vdim + 1 {
        return Err(IncompatibleDimensionalityError::new(data.ndim(), vdim + 1).into());
    }
    let grid_shape = integer_multiple(&data.shape()[1..], chunk_shape)?;
    // [B, m_1, c_1, ..., m_N, c_N]
    let split_shape: Vec<usize> = std::iter::once(data.shape()[0])
        .chain(interleave(grid_shape, chunk_shape.iter().copied()))
        .collect();
    Ok(data.into_shape_with_order(split_shape)?)
}

/// Move the chunk index axes of `split` before the within-chunk axes.
///
/// `split` has shape `[B, m_1, c_1, ..., m_N, c_N]`, as returned by [`split_axes`].
/// The result has shape `[B, m_1, ..., m_N, c_1, ..., c_N]`.
/// The batch axis stays first and the relative order of the chunk index axes and of the within-chunk axes is preserved.
///
/// This only permutes strides, the result is generally not in standard layout.
///
/// # Errors
/// Returns [`ChunkError::IncompatibleDimensionality`] if `split` does not have `2 * vdim + 1` axes.
pub fn regroup_axes<T>(
    split: ArrayViewD<'_, T>,
    vdim: usize,
) -> Result<ArrayViewD<'_, T>, ChunkError> {
    if split.ndim() != 2 * vdim + 1 {
        return Err(IncompatibleDimensionalityError::new(split.ndim(), 2 * vdim + 1).into());
    }
    let order: Vec<usize> = std::iter::once(0)
        .chain((1..2 * vdim).step_by(2))
        .chain((2..=2 * vdim).step_by(2))
        .collect();
    Ok(split.permuted_axes(order))
}

/// Return `regrouped` as an owned array of shape `[B, m_1, ..., m_N, c_1, ..., c_N]` in standard layout.
///
/// `regrouped` is the output of [`regroup_axes`], which already has this logical shape.
/// The shape is checked against `grid_shape` and `chunk_shape`.
///
/// # Errors
/// Returns [`ChunkError::IncompatibleShape`] if the shape of `regrouped` is not the expected shape.
pub fn collapse_axes<T: Clone>(
    regrouped: ArrayViewD<'_, T>,
    grid_shape: &[usize],
    chunk_shape: &[usize],
) -> Result<ArrayD<T>, ChunkError> {
    let nbatches = regrouped.shape().first().copied().unwrap_or_default();
    let expected: Vec<usize> = std::iter::once(nbatches)
        .chain(grid_shape.iter().copied())
        .chain(chunk_shape.iter().copied())
        .collect();
    if regrouped.shape() != expected.as_slice() {
        return Err(ChunkError::IncompatibleShape {
            got: regrouped.shape().to_vec(),
            expected,
        });
    }
    Ok(regrouped.as_standard_layout().into_owned())
}

/// Return the data of `envelope` reorganised into chunks of shape `chunk_shape`.
///
/// The result has shape `[B, m_1, ..., m_N, c_1, ..., c_N]` where `B` is the number of batches, `m_d = shape[d] / chunk_shape[d]` is the number of chunks along dimension `d` and `c_d = chunk_shape[d]`.
/// Axes `1..=N` index chunks and correspond one-to-one with those of [`location`](super::location) given the same arguments.
/// The trailing `N` axes index elements within a chunk.
///
/// This is the composition of [`split_axes`], [`regroup_axes`] and [`collapse_axes`]. [`assemble`] is its inverse.
///
/// `envelope` must be a [`Block`]; a raw array is not accepted:
/// ```compile_fail
/// let data = ndarray::ArrayD::<f32>::zeros(ndarray::IxDyn(&[1, 6, 3, 8]));
/// blockgrid::chunking::content(&data, &[2, 3, 4]);
/// ```
///
/// # Errors
/// Returns a [`ChunkError`] if:
///  - `chunk_shape` does not have one non-zero extent per spatial dimension,
///  - the shape of `envelope` is not an integer multiple of `chunk_shape`, or
///  - `envelope` has no data.
pub fn content<T: Clone>(
    envelope: &Block<T>,
    chunk_shape: &[usize],
) -> Result<ArrayD<T>, ChunkError> {
    let grid_shape = integer_multiple(envelope.shape(), chunk_shape)?;
    let data = envelope.data().ok_or(ChunkError::MissingData)?;
    let data = data.as_standard_layout();
    let split = split_axes(data.view(), chunk_shape)?;
    let regrouped = regroup_axes(split, chunk_shape.len())?;
    collapse_axes(regrouped, &grid_shape, chunk_shape)
}

/// Reassemble batched volume data from its chunks, the inverse of [`content`].
///
/// `chunks` has shape `[B, m_1, ..., m_N, c_1, ..., c_N]` and the result has shape `[B, m_1 * c_1, ..., m_N * c_N]`.
///
/// # Errors
/// Returns [`ChunkError::IncompatibleDimensionality`] if `chunks` does not have `2 * vdim + 1` axes.
pub fn assemble<T: Clone>(chunks: ArrayViewD<'_, T>, vdim: usize) -> Result<ArrayD<T>, ChunkError> {
    if chunks.ndim() != 2 * vdim + 1 {
        return Err(IncompatibleDimensionalityError::new(chunks.ndim(), 2 * vdim + 1).into());
    }
    let shape = chunks.shape();
    let volume_shape: Vec<usize> = std::iter::once(shape[0])
        .chain((1..=vdim).map(|dim| shape[dim] * shape[dim + vdim]))
        .collect();
    let order: Vec<usize> = std::iter::once(0)
        .chain(interleave(1..=vdim, vdim + 1..=2 * vdim))
        .collect();
    let split = chunks.permuted_axes(order);
    Ok(split
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order(volume_shape)?)
}
