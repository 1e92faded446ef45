//! `blockgrid` is a Rust library for batched N-dimensional volumes on an integer lattice and their decomposition into regular chunks.
//!
//! A [`Block`] is a batch of rectangular volumes that share a common shape, each anchored at an integer lattice location, optionally holding a value for every element.
//! The [`chunking`] module subdivides a block into chunks of a fixed shape and produces two positionally aligned outputs:
//!  - [`chunking::location`]: the lattice location of every chunk, with shape `[B, m_1, ..., m_N, N]`, and
//!  - [`chunking::content`]: the block data reorganised chunk by chunk, with shape `[B, m_1, ..., m_N, c_1, ..., c_N]`.
//!
//! Here `B` is the number of batches, `N` is the number of spatial dimensions, `c_d` is the chunk extent and `m_d` is the number of chunks along dimension `d`.
//! A single chunk index tuple selects corresponding slices from both outputs.
//!
//! The dimensionality of a block is only known at runtime, so arrays are [`ndarray::ArrayD`] throughout.
//!
//! ## Example
//! ```rust
//! use blockgrid::{Block, chunking};
//!
//! let data = ndarray::ArrayD::from_shape_fn(vec![6, 3, 8], |idx| idx[0] * 24 + idx[1] * 8 + idx[2]);
//! let envelope = Block::new_with_data([10, 20, 30], data)?;
//! assert_eq!(envelope.size(), vec![1, 6, 3, 8]);
//!
//! let locations = chunking::location(&envelope, &[2, 3, 4])?;
//! let contents = chunking::content(&envelope, &[2, 3, 4])?;
//! assert_eq!(locations.shape(), &[1, 3, 1, 2, 3]);
//! assert_eq!(contents.shape(), &[1, 3, 1, 2, 2, 3, 4]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Licence
//! `blockgrid` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

pub mod block;
pub mod chunking;

pub use block::{Block, BlockError, BlockState, IntoLocation, IntoVolumeShape, batchify};

/// A coordinate on the integer lattice.
pub type Index = i64;

/// The spatial shape of a volume or chunk, one extent per dimension.
pub type VolumeShape = Vec<usize>;

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, thiserror::Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }

    /// The dimensionality that was supplied.
    #[must_use]
    pub const fn got(&self) -> usize {
        self.0
    }

    /// The dimensionality that was expected.
    #[must_use]
    pub const fn expected(&self) -> usize {
        self.1
    }
}
