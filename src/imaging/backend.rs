//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the media store
//! needs: sniff, identify, resize, and read_exif.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use a recording mock so upload logic can be exercised without
//! decoding pixels.

use super::params::ResizeParams;
use crate::codec::MetaMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Raster formats that go through dimension validation and resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
        }
    }
}

/// EXIF "computed" fields; `None` when the file carries nothing readable.
pub type ExifMap = MetaMap;

/// Trait for image processing backends.
pub trait ImageBackend {
    /// Detect the raster format from file contents, ignoring the file name.
    fn sniff(&self, path: &Path) -> Option<ImageKind>;

    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Resize and re-encode in the source's own format.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Best-effort read of EXIF computed fields.
    fn read_exif(&self, path: &Path) -> Option<ExifMap>;
}
