//! Blocks.
//!
//! A [`Block`] is a batch of rectangular N-dimensional volumes at locations on a discrete integer lattice.
//! Every volume in the batch shares a common (unbatched) shape.
//!
//! A block is always in one of two states, see [`BlockState`]:
//!  - [`BlockState::ShapeOnly`]: the block describes geometry only, or
//!  - [`BlockState::ShapeWithData`]: the block carries a value for every element, and its shape is derived from the data.
//!
//! [`Block::set_shape`] moves a block into the first state (dropping any data) and [`Block::set_data`] moves it into the second.
//! There are no other transitions, so the shape and the data can never disagree.
//!
//! Locations and shapes are accepted in any form implementing [`IntoLocation`] and [`IntoVolumeShape`] respectively.

mod batchify;
mod coerce;

pub use batchify::batchify;
pub use coerce::{IntoLocation, IntoVolumeShape};

use ndarray::{Array2, ArrayD, ArrayViewMutD, Axis, Ix2};
use thiserror::Error;

use crate::{IncompatibleDimensionalityError, Index, VolumeShape};

/// A [`Block`] error.
#[derive(Clone, Debug, Error)]
pub enum BlockError {
    /// The volume locations are neither a single N-vector nor a batch of N-vectors.
    #[error("unsupported shape for volume locations: {_0:?}")]
    LocationRank(Vec<usize>),
    /// The volume shape is not a single N-vector.
    #[error("volume shape must not be batched: got an array with shape {_0:?}")]
    ShapeRank(Vec<usize>),
    /// The volume shape does not have one extent per spatial dimension.
    #[error("volume shape has wrong dimensions: {_0}")]
    ShapeDimensionality(#[from] IncompatibleDimensionalityError),
    /// The data rank is neither the spatial dimensionality nor one more than it.
    #[error("illegal data shape {_0:?} for {_1}-dimensional volumes")]
    DataRank(Vec<usize>, usize),
    /// The data batch count differs from the number of volume locations.
    #[error("batch mismatch: got {got} want {expected}")]
    BatchMismatch {
        /// The number of batches in the data.
        got: usize,
        /// The number of volume locations.
        expected: usize,
    },
    /// Neither a shape nor data was supplied.
    #[error("a block requires either a volume shape or data")]
    MissingShape,
}

/// The state of a [`Block`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockState<T> {
    /// Only the volume shape is known.
    ShapeOnly(VolumeShape),
    /// Batched data of shape `[nbatches, shape...]`. The volume shape is the trailing axes of the data.
    ShapeWithData(ArrayD<T>),
}

/// A batch of rectangular volumes at locations on a discrete integer lattice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block<T> {
    location: Array2<Index>,
    state: BlockState<T>,
}

impl<T> Block<T> {
    /// Create a new block.
    ///
    /// `shape` is only considered if `data` is [`None`].
    /// A `None` shape needs a type, e.g. `None::<VolumeShape>`.
    ///
    /// # Errors
    /// Returns a [`BlockError`] if:
    ///  - `location` is not a single or batched N-vector,
    ///  - both `shape` and `data` are [`None`], or
    ///  - `shape` or `data` is incompatible with `location`.
    pub fn new(
        location: impl IntoLocation,
        shape: Option<impl IntoVolumeShape>,
        data: Option<ArrayD<T>>,
    ) -> Result<Self, BlockError> {
        match (shape, data) {
            (_, Some(data)) => Self::new_with_data(location, data),
            (Some(shape), None) => Self::new_with_shape(location, shape),
            (None, None) => Err(BlockError::MissingShape),
        }
    }

    /// Create a new block without data.
    ///
    /// An unbatched `location` (a single N-vector) is stored as a batch of one.
    ///
    /// # Errors
    /// Returns a [`BlockError`] if `location` is not a single or batched N-vector, or `shape` is not an N-vector.
    pub fn new_with_shape(
        location: impl IntoLocation,
        shape: impl IntoVolumeShape,
    ) -> Result<Self, BlockError> {
        let location = batched_location(location.into_location())?;
        let mut block = Self {
            location,
            state: BlockState::ShapeOnly(VolumeShape::new()),
        };
        block.set_shape(shape)?;
        Ok(block)
    }

    /// Create a new block holding `data`.
    ///
    /// The volume shape is derived from the trailing axes of `data`.
    /// If `data` has one axis per spatial dimension, it is stored as a batch of one.
    ///
    /// # Errors
    /// Returns a [`BlockError`] if `location` is not a single or batched N-vector, or `data` is incompatible with `location`.
    pub fn new_with_data(location: impl IntoLocation, data: ArrayD<T>) -> Result<Self, BlockError> {
        let location = batched_location(location.into_location())?;
        let mut block = Self {
            location,
            state: BlockState::ShapeOnly(VolumeShape::new()),
        };
        block.set_data(data)?;
        Ok(block)
    }

    /// Return the volume locations, one row per batch.
    #[must_use]
    pub fn location(&self) -> &Array2<Index> {
        &self.location
    }

    /// Return the number of spatial dimensions, excluding the batch dimension.
    #[must_use]
    pub fn vdim(&self) -> usize {
        self.location.ncols()
    }

    /// Return the number of batches.
    #[must_use]
    pub fn nbatches(&self) -> usize {
        self.location.nrows()
    }

    /// Return the common (unbatched) shape of the volumes.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match &self.state {
            BlockState::ShapeOnly(shape) => shape,
            BlockState::ShapeWithData(data) => &data.shape()[1..],
        }
    }

    /// Return the shape of the block as a whole, `[nbatches, shape...]`.
    ///
    /// This is the shape of the data, and is defined even if the block has no data.
    #[must_use]
    pub fn size(&self) -> Vec<usize> {
        std::iter::once(self.nbatches())
            .chain(self.shape().iter().copied())
            .collect()
    }

    /// Return the state of the block.
    #[must_use]
    pub fn state(&self) -> &BlockState<T> {
        &self.state
    }

    /// Returns true if the block holds data.
    #[must_use]
    pub fn has_data(&self) -> bool {
        matches!(self.state, BlockState::ShapeWithData(_))
    }

    /// Return the batched data, if any.
    #[must_use]
    pub fn data(&self) -> Option<&ArrayD<T>> {
        match &self.state {
            BlockState::ShapeOnly(_) => None,
            BlockState::ShapeWithData(data) => Some(data),
        }
    }

    /// Return a mutable view of the batched data, if any.
    ///
    /// The view permits changing values but not the shape.
    #[must_use]
    pub fn data_mut(&mut self) -> Option<ArrayViewMutD<'_, T>> {
        match &mut self.state {
            BlockState::ShapeOnly(_) => None,
            BlockState::ShapeWithData(data) => Some(data.view_mut()),
        }
    }

    /// Remove and return the data, if any, keeping the volume shape.
    pub fn take_data(&mut self) -> Option<ArrayD<T>> {
        let shape = self.shape().to_vec();
        match std::mem::replace(&mut self.state, BlockState::ShapeOnly(shape)) {
            BlockState::ShapeOnly(_) => None,
            BlockState::ShapeWithData(data) => Some(data),
        }
    }

    /// Decompose the block into its locations and data.
    #[must_use]
    pub fn into_parts(self) -> (Array2<Index>, Option<ArrayD<T>>) {
        match self.state {
            BlockState::ShapeOnly(_) => (self.location, None),
            BlockState::ShapeWithData(data) => (self.location, Some(data)),
        }
    }

    /// Set the spatial shape of the volumes. This drops any data.
    ///
    /// # Errors
    /// Returns a [`BlockError`] if `shape` is not a single N-vector.
    /// The block is unchanged on error.
    pub fn set_shape(&mut self, shape: impl IntoVolumeShape) -> Result<(), BlockError> {
        let shape = self.validate_shape(shape.into_volume_shape())?;
        if self.has_data() {
            log::debug!(
                "dropping block data of shape {:?} on setting volume shape {shape:?}",
                self.size()
            );
        }
        self.state = BlockState::ShapeOnly(shape);
        Ok(())
    }

    /// Set the data of the block. The volume shape is derived from the trailing axes of `data`.
    ///
    /// If `data` has one axis per spatial dimension, it is treated as a batch of one.
    ///
    /// `data` must be an array; a plain sequence of values is not accepted:
    /// ```compile_fail
    /// let mut block = blockgrid::Block::<f32>::new_with_shape([0, 0], [2, 2]).unwrap();
    /// block.set_data(vec![0.0f32; 4]);
    /// ```
    ///
    /// # Errors
    /// Returns a [`BlockError`] if the rank of `data` is incompatible or its leading axis is not the number of batches.
    /// The block is unchanged on error.
    pub fn set_data(&mut self, data: ArrayD<T>) -> Result<(), BlockError> {
        let vdim = self.vdim();
        let data = if data.ndim() == vdim {
            data.insert_axis(Axis(0))
        } else {
            data
        };
        if data.ndim() != vdim + 1 {
            return Err(BlockError::DataRank(data.shape().to_vec(), vdim));
        }
        let nbatches = self.nbatches();
        if data.shape()[0] != nbatches {
            return Err(BlockError::BatchMismatch {
                got: data.shape()[0],
                expected: nbatches,
            });
        }
        self.validate_shape(data.shape()[1..].into_volume_shape())?;
        self.state = BlockState::ShapeWithData(data);
        Ok(())
    }

    fn validate_shape(&self, shape: ArrayD<usize>) -> Result<VolumeShape, BlockError> {
        if shape.ndim() != 1 {
            return Err(BlockError::ShapeRank(shape.shape().to_vec()));
        }
        let vdim = self.vdim();
        if shape.len() != vdim {
            return Err(IncompatibleDimensionalityError::new(shape.len(), vdim).into());
        }
        Ok(shape.iter().copied().collect())
    }
}

/// Promote an unbatched location to a batch of one.
fn batched_location(location: ArrayD<Index>) -> Result<Array2<Index>, BlockError> {
    let location = if location.ndim() == 1 {
        location.insert_axis(Axis(0))
    } else {
        location
    };
    let shape = location.shape().to_vec();
    location
        .into_dimensionality::<Ix2>()
        .map_err(|_| BlockError::LocationRank(shape))
}
