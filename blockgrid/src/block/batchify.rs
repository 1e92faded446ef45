use ndarray::{ArrayD, Axis};

use super::{Block, BlockError, IntoLocation};

/// Return a [`Block`] from `location` and `data` which is assured to be batched.
///
/// An unbatched `location` (a single N-vector) requires `data` with exactly N axes, and both are promoted to a batch of one.
/// A batched `location` requires `data` with N+1 axes and a leading axis matching the number of locations.
///
/// Applying `batchify` to the location and data of an already batched block returns an equal block.
///
/// # Errors
/// Returns a [`BlockError`] naming the mismatch if `location` and `data` are inconsistent.
pub fn batchify<T>(location: impl IntoLocation, data: ArrayD<T>) -> Result<Block<T>, BlockError> {
    let location = location.into_location();
    match location.ndim() {
        1 => {
            let vdim = location.len();
            if data.ndim() != vdim {
                return Err(BlockError::DataRank(data.shape().to_vec(), vdim));
            }
            Block::new_with_data(location.insert_axis(Axis(0)), data.insert_axis(Axis(0)))
        }
        2 => {
            let (nbatches, vdim) = (location.shape()[0], location.shape()[1]);
            let data_batches = data.shape().first().copied().unwrap_or_default();
            if data.ndim() == 0 || data_batches != nbatches {
                return Err(BlockError::BatchMismatch {
                    got: data_batches,
                    expected: nbatches,
                });
            }
            if data.ndim() != vdim + 1 {
                return Err(BlockError::DataRank(data.shape().to_vec(), vdim));
            }
            Block::new_with_data(location, data)
        }
        _ => Err(BlockError::LocationRank(location.shape().to_vec())),
    }
}
