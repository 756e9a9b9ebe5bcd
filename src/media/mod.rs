//! Uploaded media: storage, validation, and metadata sidecars.
//!
//! - **Upload**: descriptors, the spool check, rejection values
//! - **Types**: the persisted sidecar and the fetched record
//! - **Store**: [`MediaStore`], the upload pipeline plus fetch/move/copy/delete/has

mod store;
mod types;
pub mod upload;

pub use store::{MediaStore, SPOOL_DIR, UPLOADS_DIR};
pub use types::{FetchResult, MediaMeta, MediaRecord};
pub use upload::{Rejection, TransferStatus, UploadOutcome, UploadSpool, UploadedFile};

use crate::codec::CodecError;
use crate::imaging::BackendError;
use std::path::PathBuf;
use thiserror::Error;

/// Deployment-level failures. Invalid uploads are [`Rejection`]s instead.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("upload directory is not writable: {0}")]
    NotWritable(PathBuf),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("image processing failed: {0}")]
    Imaging(#[from] BackendError),
}
