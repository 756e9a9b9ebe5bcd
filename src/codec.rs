//! Sidecar metadata codec.
//!
//! Sidecars are TOML documents: human-editable, typed, and able to carry a
//! nested table such as the EXIF map. The codec is generic over any serde
//! type so media sidecars and entry content files share one code path.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Free-form key/value map stored inside a document (EXIF, extra fields).
pub type MetaMap = BTreeMap<String, toml::Value>;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode metadata: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("Failed to decode metadata: {0}")]
    Decode(#[from] toml::de::Error),
}

/// Encode a value as a TOML document.
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    Ok(toml::to_string(value)?)
}

/// Decode a TOML document.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    Ok(toml::from_str(text)?)
}

/// Read and decode the document at `path`.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CodecError> {
    let text = std::fs::read_to_string(path).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&text)
}

/// Encode `value` and write it to `path`, replacing any previous document.
pub fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), CodecError> {
    let text = encode(value)?;
    std::fs::write(path, text).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })
}
