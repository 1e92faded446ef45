//! Conversions of locations and shapes into their array representation.
//!
//! These are the forms checked by [`Block`](crate::Block) for rank and extent.
//! Slices and fixed size arrays are unbatched, and [`ndarray`] arrays keep their rank.

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayViewD};

use crate::Index;

/// Conversion into volume locations: a single N-vector or a batch of N-vectors.
pub trait IntoLocation {
    /// Convert into a dynamic rank location array.
    fn into_location(self) -> ArrayD<Index>;
}

impl IntoLocation for ArrayD<Index> {
    fn into_location(self) -> ArrayD<Index> {
        self
    }
}

impl IntoLocation for ArrayViewD<'_, Index> {
    fn into_location(self) -> ArrayD<Index> {
        self.to_owned()
    }
}

impl IntoLocation for Array1<Index> {
    fn into_location(self) -> ArrayD<Index> {
        self.into_dyn()
    }
}

impl IntoLocation for ArrayView1<'_, Index> {
    fn into_location(self) -> ArrayD<Index> {
        self.to_owned().into_dyn()
    }
}

impl IntoLocation for Array2<Index> {
    fn into_location(self) -> ArrayD<Index> {
        self.into_dyn()
    }
}

impl IntoLocation for &[Index] {
    fn into_location(self) -> ArrayD<Index> {
        Array1::from(self.to_vec()).into_dyn()
    }
}

impl IntoLocation for Vec<Index> {
    fn into_location(self) -> ArrayD<Index> {
        Array1::from(self).into_dyn()
    }
}

impl<const N: usize> IntoLocation for [Index; N] {
    fn into_location(self) -> ArrayD<Index> {
        Array1::from(self.to_vec()).into_dyn()
    }
}

impl<const N: usize> IntoLocation for Vec<[Index; N]> {
    fn into_location(self) -> ArrayD<Index> {
        Array2::from(self).into_dyn()
    }
}

/// Conversion into a volume shape.
pub trait IntoVolumeShape {
    /// Convert into a dynamic rank shape array.
    fn into_volume_shape(self) -> ArrayD<usize>;
}

impl IntoVolumeShape for ArrayD<usize> {
    fn into_volume_shape(self) -> ArrayD<usize> {
        self
    }
}

impl IntoVolumeShape for Array1<usize> {
    fn into_volume_shape(self) -> ArrayD<usize> {
        self.into_dyn()
    }
}

impl IntoVolumeShape for &[usize] {
    fn into_volume_shape(self) -> ArrayD<usize> {
        Array1::from(self.to_vec()).into_dyn()
    }
}

impl IntoVolumeShape for Vec<usize> {
    fn into_volume_shape(self) -> ArrayD<usize> {
        Array1::from(self).into_dyn()
    }
}

impl<const N: usize> IntoVolumeShape for [usize; N] {
    fn into_volume_shape(self) -> ArrayD<usize> {
        Array1::from(self.to_vec()).into_dyn()
    }
}

impl<const N: usize> IntoVolumeShape for &[usize; N] {
    fn into_volume_shape(self) -> ArrayD<usize> {
        Array1::from(self.to_vec()).into_dyn()
    }
}
