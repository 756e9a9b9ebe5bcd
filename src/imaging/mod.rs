//! Image validation and normalization for uploads.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff** | `image::guess_format` |
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3, re-encoded in the source format |
//! | **EXIF** | custom parser (JPEG SOFn + APP1 TIFF IFD) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension rules and fit math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: validate and transform, combining calculations + backend

pub mod backend;
mod calculations;
pub(crate) mod exif_parser;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ExifMap, ImageBackend, ImageKind};
pub use calculations::{calculate_fit_dimensions, satisfies_rules};
pub use operations::{TransformConfig, transform_image, validate_image};
pub use params::{DimensionRules, Quality, ResizeParams, ResizeTarget};
pub use rust_backend::RustBackend;
