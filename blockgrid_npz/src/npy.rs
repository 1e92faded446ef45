//! The NumPy `.npy` array format.
//!
//! An `.npy` file is a magic string, a format version, a little-endian header length and a header holding a Python dict literal with the keys `descr`, `fortran_order` and `shape`.
//! The header is padded with spaces and terminated by a newline so that the data starts at a multiple of 64 bytes.
//! The data follows as raw elements.
//!
//! Arrays are written in format version 1.0 (2.0 if the header does not fit), little-endian and in C order.
//! Format versions 1.0 to 3.0 and both C and Fortran order are read.

use std::io::Write;

use derive_more::From;
use ndarray::{ArrayD, ArrayViewD, IxDyn, ShapeBuilder};
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// An `.npy` decoding error.
#[derive(Debug, Error)]
pub enum NpyError {
    /// The data does not start with the `.npy` magic string.
    #[error("missing npy magic string")]
    BadMagic,
    /// The format version is not supported.
    #[error("unsupported npy format version {_0}.{_1}")]
    UnsupportedVersion(u8, u8),
    /// The data ends inside the header.
    #[error("npy header is truncated")]
    Truncated,
    /// The header is not a valid header dict.
    #[error("malformed npy header: {_0}")]
    Malformed(String),
    /// The array data type is not supported.
    #[error("unsupported npy data type {_0:?}")]
    UnsupportedDataType(String),
    /// The data length does not match the header.
    #[error("npy data has {got} bytes, expected {expected}")]
    DataLength {
        /// The data length.
        got: usize,
        /// The data length implied by the header.
        expected: usize,
    },
    /// The array could not be created from the data.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// The header of an `.npy` file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpyHeader {
    /// The array-protocol type string, e.g. `<f8`.
    pub descr: String,
    /// Whether the data is in Fortran (column-major) order.
    pub fortran_order: bool,
    /// The array shape.
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Create a header for a C order array with elements `T`.
    #[must_use]
    pub fn new<T: NpyElement>(shape: &[usize]) -> Self {
        Self {
            descr: T::DESCR.to_string(),
            fortran_order: false,
            shape: shape.to_vec(),
        }
    }

    fn dict(&self) -> String {
        let shape = match self.shape.as_slice() {
            [extent] => format!("({extent},)"),
            shape => format!(
                "({})",
                shape
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let fortran_order = if self.fortran_order { "True" } else { "False" };
        format!(
            "{{'descr': '{}', 'fortran_order': {fortran_order}, 'shape': {shape}, }}",
            self.descr
        )
    }

    /// Return the encoded header including the magic string and version, padded to a multiple of 64 bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let dict = self.dict();
        // version 1.0 has a 2 byte header length, version 2.0 has 4
        let unpadded_v1 = MAGIC.len() + 4 + dict.len() + 1;
        let header_len_v1 = unpadded_v1.next_multiple_of(ALIGNMENT) - MAGIC.len() - 4;
        let mut bytes = Vec::with_capacity(unpadded_v1.next_multiple_of(ALIGNMENT));
        bytes.extend_from_slice(MAGIC);
        let header_len = if let Ok(header_len) = u16::try_from(header_len_v1) {
            bytes.extend_from_slice(&[1, 0]);
            bytes.extend_from_slice(&header_len.to_le_bytes());
            header_len_v1
        } else {
            let header_len = (MAGIC.len() + 6 + dict.len() + 1).next_multiple_of(ALIGNMENT)
                - MAGIC.len()
                - 6;
            bytes.extend_from_slice(&[2, 0]);
            #[allow(clippy::cast_possible_truncation)]
            bytes.extend_from_slice(&(header_len as u32).to_le_bytes());
            header_len
        };
        bytes.extend_from_slice(dict.as_bytes());
        bytes.resize(bytes.len() + header_len - dict.len() - 1, b' ');
        bytes.push(b'\n');
        bytes
    }

    /// Parse the header at the start of `bytes`.
    ///
    /// Returns the header and the offset of the array data.
    ///
    /// # Errors
    /// Returns an [`NpyError`] if `bytes` does not start with a valid `.npy` header.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), NpyError> {
        if !bytes.starts_with(MAGIC) {
            return Err(NpyError::BadMagic);
        }
        let (major, minor) = match bytes.get(MAGIC.len()..MAGIC.len() + 2) {
            Some(&[major, minor]) => (major, minor),
            _ => return Err(NpyError::Truncated),
        };
        let (header_len, start) = match major {
            1 => {
                let len = read_array::<2>(bytes, MAGIC.len() + 2)?;
                (usize::from(u16::from_le_bytes(len)), MAGIC.len() + 4)
            }
            2 | 3 => {
                let len = read_array::<4>(bytes, MAGIC.len() + 2)?;
                let len = usize::try_from(u32::from_le_bytes(len))
                    .map_err(|_| NpyError::Truncated)?;
                (len, MAGIC.len() + 6)
            }
            _ => return Err(NpyError::UnsupportedVersion(major, minor)),
        };
        let end = start + header_len;
        let header = bytes.get(start..end).ok_or(NpyError::Truncated)?;
        let header = std::str::from_utf8(header)
            .map_err(|_| NpyError::Malformed("header is not valid text".to_string()))?;
        let header = Self {
            descr: parse_descr(header)?,
            fortran_order: parse_fortran_order(header)?,
            shape: parse_shape(header)?,
        };
        Ok((header, end))
    }
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], NpyError> {
    let mut array = [0; N];
    array.copy_from_slice(bytes.get(offset..offset + N).ok_or(NpyError::Truncated)?);
    Ok(array)
}

/// Return the text following `'key':` in a header dict.
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let position = [format!("'{key}'"), format!("\"{key}\"")]
        .iter()
        .find_map(|quoted| header.find(quoted.as_str()).map(|p| p + quoted.len()))
        .ok_or_else(|| NpyError::Malformed(format!("missing key {key}")))?;
    header[position..]
        .trim_start()
        .strip_prefix(':')
        .map(str::trim_start)
        .ok_or_else(|| NpyError::Malformed(format!("missing value for key {key}")))
}

fn parse_descr(header: &str) -> Result<String, NpyError> {
    let value = dict_value(header, "descr")?;
    let mut chars = value.chars();
    let quote = chars
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| NpyError::Malformed("descr is not a string".to_string()))?;
    let descr: String = chars.take_while(|c| *c != quote).collect();
    Ok(descr)
}

fn parse_fortran_order(header: &str) -> Result<bool, NpyError> {
    let value = dict_value(header, "fortran_order")?;
    if value.starts_with("True") {
        Ok(true)
    } else if value.starts_with("False") {
        Ok(false)
    } else {
        Err(NpyError::Malformed("fortran_order is not a bool".to_string()))
    }
}

fn parse_shape(header: &str) -> Result<Vec<usize>, NpyError> {
    let value = dict_value(header, "shape")?;
    let malformed = || NpyError::Malformed("shape is not a tuple of integers".to_string());
    let tuple = value
        .strip_prefix('(')
        .and_then(|value| value.split_once(')'))
        .map(|(tuple, _)| tuple)
        .ok_or_else(malformed)?;
    tuple
        .split(',')
        .map(str::trim)
        .filter(|extent| !extent.is_empty())
        .map(|extent| {
            extent
                .trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| malformed())
        })
        .collect()
}

/// An element type that can be stored in an `.npy` file.
pub trait NpyElement: Copy + Send + Sync + 'static {
    /// The little-endian array-protocol type string.
    const DESCR: &'static str;

    /// Append the little-endian bytes of `self` to `bytes`.
    fn extend_le_bytes(self, bytes: &mut Vec<u8>);

    /// Read an element from exactly `size_of::<Self>()` little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Wrap an array of this element type.
    fn into_npy(array: ArrayD<Self>) -> NpyArray;

    /// Unwrap an array of this element type, or return it unchanged if it has another element type.
    ///
    /// # Errors
    /// Returns `array` if its element type is not `Self`.
    fn from_npy(array: NpyArray) -> Result<ArrayD<Self>, NpyArray>;
}

macro_rules! impl_npy_element {
    ($type:ty, $variant:ident, $descr:literal) => {
        impl NpyElement for $type {
            const DESCR: &'static str = $descr;

            fn extend_le_bytes(self, bytes: &mut Vec<u8>) {
                bytes.extend_from_slice(&self.to_le_bytes());
            }

            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut array = [0; size_of::<$type>()];
                array.copy_from_slice(bytes);
                <$type>::from_le_bytes(array)
            }

            fn into_npy(array: ArrayD<Self>) -> NpyArray {
                NpyArray::$variant(array)
            }

            fn from_npy(array: NpyArray) -> Result<ArrayD<Self>, NpyArray> {
                match array {
                    NpyArray::$variant(array) => Ok(array),
                    array => Err(array),
                }
            }
        }
    };
}

impl_npy_element!(i32, I32, "<i4");
impl_npy_element!(i64, I64, "<i8");
impl_npy_element!(f32, F32, "<f4");
impl_npy_element!(f64, F64, "<f8");

/// An array with one of the supported `.npy` element types.
#[derive(Clone, Debug, PartialEq, From)]
pub enum NpyArray {
    /// 32-bit signed integers.
    I32(ArrayD<i32>),
    /// 64-bit signed integers.
    I64(ArrayD<i64>),
    /// 32-bit floats.
    F32(ArrayD<f32>),
    /// 64-bit floats.
    F64(ArrayD<f64>),
}

impl NpyArray {
    /// Return the array-protocol type string of the elements.
    #[must_use]
    pub fn descr(&self) -> &'static str {
        match self {
            Self::I32(_) => i32::DESCR,
            Self::I64(_) => i64::DESCR,
            Self::F32(_) => f32::DESCR,
            Self::F64(_) => f64::DESCR,
        }
    }

    /// Return the array shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::I32(array) => array.shape(),
            Self::I64(array) => array.shape(),
            Self::F32(array) => array.shape(),
            Self::F64(array) => array.shape(),
        }
    }

    /// Write the array in `.npy` format.
    ///
    /// # Errors
    /// Returns an [`std::io::Error`] if writing fails.
    pub fn write(&self, writer: &mut impl Write) -> std::io::Result<()> {
        match self {
            Self::I32(array) => write_npy(array.view(), writer),
            Self::I64(array) => write_npy(array.view(), writer),
            Self::F32(array) => write_npy(array.view(), writer),
            Self::F64(array) => write_npy(array.view(), writer),
        }
    }
}

/// Write `array` in `.npy` format.
///
/// # Errors
/// Returns an [`std::io::Error`] if writing fails.
pub fn write_npy<T: NpyElement>(
    array: ArrayViewD<'_, T>,
    writer: &mut impl Write,
) -> std::io::Result<()> {
    writer.write_all(&NpyHeader::new::<T>(array.shape()).to_bytes())?;
    let mut bytes = Vec::with_capacity(array.len() * size_of::<T>());
    for element in array.iter() {
        element.extend_le_bytes(&mut bytes);
    }
    writer.write_all(&bytes)
}

fn decode<T: NpyElement>(header: &NpyHeader, data: &[u8]) -> Result<ArrayD<T>, NpyError> {
    let expected = header
        .shape
        .iter()
        .try_fold(size_of::<T>(), |len, &extent| len.checked_mul(extent))
        .ok_or_else(|| {
            NpyError::Malformed(format!(
                "shape {:?} exceeds the addressable data length",
                header.shape
            ))
        })?;
    if data.len() != expected {
        return Err(NpyError::DataLength {
            got: data.len(),
            expected,
        });
    }
    let elements: Vec<T> = data
        .chunks_exact(size_of::<T>())
        .map(T::from_le_slice)
        .collect();
    let shape = IxDyn(&header.shape);
    if header.fortran_order {
        Ok(ArrayD::from_shape_vec(shape.f(), elements)?)
    } else {
        Ok(ArrayD::from_shape_vec(shape, elements)?)
    }
}

/// Read an array in `.npy` format.
///
/// # Errors
/// Returns an [`NpyError`] if `bytes` is not a valid `.npy` file or has an unsupported data type.
pub fn read_npy(bytes: &[u8]) -> Result<NpyArray, NpyError> {
    let (header, offset) = NpyHeader::parse(bytes)?;
    let data = &bytes[offset..];
    Ok(match header.descr.as_str() {
        "<i4" => decode::<i32>(&header, data)?.into(),
        "<i8" => decode::<i64>(&header, data)?.into(),
        "<f4" => decode::<f32>(&header, data)?.into(),
        "<f8" => decode::<f64>(&header, data)?.into(),
        descr => return Err(NpyError::UnsupportedDataType(descr.to_string())),
    })
}
