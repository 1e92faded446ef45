use ndarray::{Array1, ArrayD, ArrayViewD, Axis, IxDyn, Zip};

use super::{ChunkError, grid_shape};
use crate::{Block, IncompatibleDimensionalityError, Index};

/// Insert axes of length one at axis `position` of `array` until it has `rank` axes.
///
/// With `position` equal to the current number of axes, the new axes are appended.
/// This aligns arrays of differing rank for broadcasting.
///
/// # Errors
/// Returns [`IncompatibleDimensionalityError`] if `array` already has more than `rank` axes or `position` exceeds the number of axes.
pub fn unsqueeze_to<A>(
    array: ArrayViewD<'_, A>,
    position: usize,
    rank: usize,
) -> Result<ArrayViewD<'_, A>, IncompatibleDimensionalityError> {
    if array.ndim() > rank || position > array.ndim() {
        return Err(IncompatibleDimensionalityError::new(array.ndim(), rank));
    }
    let mut array = array;
    while array.ndim() < rank {
        array = array.insert_axis(Axis(position));
    }
    Ok(array)
}

/// Return the chunk offsets of a volume of shape `shape` along each dimension, broadcast over the chunk grid.
///
/// Element `d` of the result has the shape of the chunk grid `[m_1, ..., m_N]` and holds `i_d * chunk_shape[d]` at chunk index `(i_1, ..., i_N)`.
/// This is the `ij` indexed meshgrid of the per-dimension offsets `0, c_d, 2 c_d, ...` below `shape[d]`.
///
/// # Errors
/// Returns a [`ChunkError`] if the dimensionality of `shape` and `chunk_shape` differ, or `chunk_shape` has a zero extent.
pub fn meshgrid(
    shape: &[usize],
    chunk_shape: &[usize],
) -> Result<Vec<ArrayD<Index>>, ChunkError> {
    let grid_shape = grid_shape(shape, chunk_shape)?;
    let vdim = grid_shape.len();
    let mut grids = Vec::with_capacity(vdim);
    for (dim, (&chunks, &extent)) in std::iter::zip(&grid_shape, chunk_shape).enumerate() {
        let offsets = (0..chunks)
            .map(|i| {
                let offset = i * extent;
                Index::try_from(offset).map_err(|_| ChunkError::OffsetOverflow(offset))
            })
            .collect::<Result<Array1<Index>, _>>()?
            .into_dyn();
        // [m_d] -> [1, ..., m_d, ..., 1]
        let offsets = unsqueeze_to(offsets.view(), 0, dim + 1)?;
        let offsets = unsqueeze_to(offsets, dim + 1, vdim)?;
        let grid = offsets
            .broadcast(IxDyn(&grid_shape))
            .ok_or_else(|| ChunkError::IncompatibleShape {
                got: offsets.shape().to_vec(),
                expected: grid_shape.clone(),
            })?
            .to_owned();
        grids.push(grid);
    }
    Ok(grids)
}

/// Return the locations of the chunks of shape `chunk_shape` in `envelope`.
///
/// The result is an integer array with shape `[B, m_1, ..., m_N, N]` where `B` is the number of batches, `m_d` is the number of chunks along dimension `d` (see [`grid_shape`](super::grid_shape)) and `N` is the number of spatial dimensions.
/// Axes `1..=N` correspond one-to-one with those of [`content`](super::content) given the same arguments.
///
/// Element `[b, i_1, ..., i_N, d]` is the product of the chunk offset `i_d * chunk_shape[d]` with the location of batch member `b` along dimension `d`.
///
/// `envelope` must be a [`Block`]; a raw array is not accepted:
/// ```compile_fail
/// let data = ndarray::ArrayD::<f32>::zeros(ndarray::IxDyn(&[6, 3, 8]));
/// blockgrid::chunking::location(&data, &[2, 3, 4]);
/// ```
///
/// # Errors
/// Returns a [`ChunkError`] if `chunk_shape` does not have one non-zero extent per spatial dimension of `envelope`, or [`ChunkError::LocationOverflow`] if a chunk location exceeds the [`Index`] range.
pub fn location<T>(
    envelope: &Block<T>,
    chunk_shape: &[usize],
) -> Result<ArrayD<Index>, ChunkError> {
    let vdim = envelope.vdim();
    let grid_shape = grid_shape(envelope.shape(), chunk_shape)?;
    let mut locations_shape = Vec::with_capacity(vdim + 2);
    locations_shape.push(envelope.nbatches());
    locations_shape.extend_from_slice(&grid_shape);
    locations_shape.push(vdim);
    let mut locations = ArrayD::<Index>::zeros(locations_shape);

    let mut overflow = None;
    for (dim, grid) in meshgrid(envelope.shape(), chunk_shape)?.iter().enumerate() {
        // [m_1, ..., m_N] -> [1, m_1, ..., m_N]
        let grid = unsqueeze_to(grid.view(), 0, vdim + 1)?;
        // [B] -> [B, 1, ..., 1]
        let offsets = envelope.location().column(dim).into_dyn();
        let offsets = unsqueeze_to(offsets, 1, vdim + 1)?;
        Zip::from(locations.index_axis_mut(Axis(vdim + 1), dim))
            .and_broadcast(&grid)
            .and_broadcast(&offsets)
            .for_each(|location, &chunk_offset, &origin| {
                if let Some(product) = chunk_offset.checked_mul(origin) {
                    *location = product;
                } else {
                    overflow.get_or_insert((chunk_offset, origin));
                }
            });
        if let Some((offset, origin)) = overflow {
            return Err(ChunkError::LocationOverflow { offset, origin });
        }
    }
    Ok(locations)
}
