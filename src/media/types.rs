//! Media record types.

use crate::codec::MetaMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted sidecar contents for one media object.
///
/// Known keys are typed; anything else a user adds to the sidecar by hand
/// is kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMeta {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size of the stored file in bytes.
    pub filesize: u64,
    /// Upload time, epoch seconds.
    pub uploaded_on: i64,
    #[serde(default)]
    pub exif: MetaMap,
    #[serde(flatten)]
    pub extra: MetaMap,
}

/// A sidecar plus the fields derived from where the object lives.
///
/// The derived fields are computed on every fetch and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRecord {
    #[serde(flatten)]
    pub meta: MediaMeta,
    /// Content file name, e.g. `cover.jpg`.
    pub filename: String,
    /// File name up to the first dot, e.g. `cover`.
    pub basename: String,
    /// Everything after the first dot of the id, e.g. `jpg`.
    pub extension: String,
    /// Directory holding the content file.
    pub dirname: String,
    /// Path relative to the site root, e.g. `project/uploads/blog/cover.jpg`.
    pub url: String,
    /// `url` prefixed with the base URL or the request origin.
    pub full_url: String,
}

/// Result of [`MediaStore::fetch`](super::MediaStore::fetch).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchResult {
    /// The id named a file. `None` when its sidecar does not exist.
    Single(Option<MediaRecord>),
    /// The id named a folder; records keyed by content file name.
    Collection(BTreeMap<String, MediaRecord>),
}
