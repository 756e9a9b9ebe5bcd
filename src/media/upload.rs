//! Upload descriptors, the upload channel, and rejection reasons.
//!
//! An upload arrives as a descriptor in the usual multipart shape (`name`,
//! `type`, `tmp_name`, `error`, `size`). Before anything else, the store asks
//! the [`UploadSpool`] whether `tmp_name` really is a file the upload channel
//! produced. A descriptor pointing at `/etc/passwd` fails that check no
//! matter what its other fields claim.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Files staged by this process; keeps spool names apart within one tick.
static STAGED: AtomicU64 = AtomicU64::new(0);

/// Transfer status reported by the upload channel.
///
/// Codes follow the multipart upload convention; 5 is unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransferStatus {
    Ok,
    IniSize,
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
}

impl TransferStatus {
    pub fn code(self) -> u8 {
        match self {
            TransferStatus::Ok => 0,
            TransferStatus::IniSize => 1,
            TransferStatus::FormSize => 2,
            TransferStatus::Partial => 3,
            TransferStatus::NoFile => 4,
            TransferStatus::NoTmpDir => 6,
            TransferStatus::CantWrite => 7,
            TransferStatus::Extension => 8,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => TransferStatus::Ok,
            1 => TransferStatus::IniSize,
            2 => TransferStatus::FormSize,
            3 => TransferStatus::Partial,
            4 => TransferStatus::NoFile,
            6 => TransferStatus::NoTmpDir,
            7 => TransferStatus::CantWrite,
            8 => TransferStatus::Extension,
            _ => return None,
        })
    }
}

impl TryFrom<u8> for TransferStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown upload status code {code}"))
    }
}

impl From<TransferStatus> for u8 {
    fn from(status: TransferStatus) -> u8 {
        status.code()
    }
}

/// One uploaded file as described by the upload channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Client-supplied file name.
    pub name: String,
    /// Client-supplied MIME type. Informational only; never trusted.
    #[serde(rename = "type", default)]
    pub mime_type: String,
    /// Where the channel spooled the bytes.
    pub tmp_name: PathBuf,
    #[serde(rename = "error")]
    pub status: TransferStatus,
    /// Declared size in bytes.
    pub size: u64,
}

impl UploadedFile {
    /// A successful transfer of `size` bytes spooled at `tmp_name`.
    pub fn new(name: impl Into<String>, tmp_name: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: String::new(),
            tmp_name: tmp_name.into(),
            status: TransferStatus::Ok,
            size,
        }
    }
}

/// Why an upload was turned away. Rejections are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// The channel reported a failed transfer.
    Transfer { status: TransferStatus },
    /// `tmp_name` is not a file the upload channel produced.
    NotFromUploadChannel,
    /// The target folder is not a valid media id.
    InvalidFolder { folder: String },
    /// The client file name has no usable final component.
    InvalidName { name: String },
    /// The extension is not in the accept-list.
    ExtensionNotAccepted { extension: String },
    /// The declared size exceeds the configured maximum.
    TooLarge { size: u64, max: u64 },
    /// An image failed the dimension rules or its size was unreadable.
    ImageDimensions,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Transfer { status } => {
                write!(f, "upload failed (status {})", status.code())
            }
            Rejection::NotFromUploadChannel => write!(f, "file was not uploaded"),
            Rejection::InvalidFolder { folder } => write!(f, "invalid folder '{folder}'"),
            Rejection::InvalidName { name } => write!(f, "invalid file name '{name}'"),
            Rejection::ExtensionNotAccepted { extension } => {
                write!(f, "file type '{extension}' is not allowed")
            }
            Rejection::TooLarge { size, max } => {
                write!(f, "file is {size} bytes, the maximum is {max}")
            }
            Rejection::ImageDimensions => write!(f, "image dimensions are not allowed"),
        }
    }
}

/// Outcome of an upload that did not hit a deployment error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored at this absolute content path.
    Stored(PathBuf),
    Rejected(Rejection),
}

impl UploadOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, UploadOutcome::Stored(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            UploadOutcome::Stored(path) => Some(path),
            UploadOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            UploadOutcome::Stored(_) => None,
            UploadOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}

/// The directory the upload channel spools incoming files into.
///
/// Only regular files directly inside this directory count as uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSpool {
    dir: PathBuf,
}

impl UploadSpool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `path` is a regular file the channel spooled.
    pub fn contains(&self, path: &Path) -> bool {
        let (Ok(dir), Ok(file)) = (self.dir.canonicalize(), path.canonicalize()) else {
            return false;
        };
        file.is_file() && file.parent() == Some(dir.as_path())
    }

    /// Copy a local file into the spool, returning the spooled path.
    ///
    /// This is how local tooling hands a file to the upload pipeline.
    pub fn stage(&self, source: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = STAGED.fetch_add(1, Ordering::Relaxed);
        let spooled = self
            .dir
            .join(format!("upload-{}-{nanos}-{seq}", std::process::id()));
        std::fs::copy(source, &spooled)?;
        Ok(spooled)
    }
}
