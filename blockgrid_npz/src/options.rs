//! Options for writing archives.

/// The compression method of the entries of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NpzCompression {
    /// Entries are stored uncompressed, as `numpy.savez` does.
    Stored,
    /// Entries are deflated, as `numpy.savez_compressed` does.
    #[default]
    Deflated,
}

impl From<NpzCompression> for zip::CompressionMethod {
    fn from(compression: NpzCompression) -> Self {
        match compression {
            NpzCompression::Stored => Self::Stored,
            NpzCompression::Deflated => Self::Deflated,
        }
    }
}

/// Options for writing archives.
///
/// The default values are:
/// - `compression`: [`NpzCompression::Deflated`]
/// - `compression_level`: `None` (the default level of the compression method)
#[derive(Debug, Clone, Copy, Default)]
pub struct NpzOptions {
    compression: NpzCompression,
    compression_level: Option<i64>,
}

impl NpzOptions {
    /// Return the compression method.
    #[must_use]
    pub fn compression(&self) -> NpzCompression {
        self.compression
    }

    /// Set the compression method.
    pub fn set_compression(&mut self, compression: NpzCompression) -> &mut Self {
        self.compression = compression;
        self
    }

    /// Set the compression method.
    #[must_use]
    pub fn with_compression(mut self, compression: NpzCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Return the compression level.
    ///
    /// Valid levels depend on the compression method, `0` to `9` for [`NpzCompression::Deflated`].
    /// The level is ignored for [`NpzCompression::Stored`].
    #[must_use]
    pub fn compression_level(&self) -> Option<i64> {
        self.compression_level
    }

    /// Set the compression level.
    pub fn set_compression_level(&mut self, compression_level: Option<i64>) -> &mut Self {
        self.compression_level = compression_level;
        self
    }

    /// Set the compression level.
    #[must_use]
    pub fn with_compression_level(mut self, compression_level: Option<i64>) -> Self {
        self.compression_level = compression_level;
        self
    }

    pub(crate) fn file_options(&self) -> zip::write::SimpleFileOptions {
        let compression_level = match self.compression {
            NpzCompression::Stored => None,
            NpzCompression::Deflated => self.compression_level,
        };
        zip::write::SimpleFileOptions::default()
            .compression_method(self.compression.into())
            .compression_level(compression_level)
    }
}
