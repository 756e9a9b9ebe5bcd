//! Logical id → physical path mapping.
//!
//! Every stored object has a content path and a sidecar path. The sidecar
//! tree mirrors the content tree under a `.meta` directory at the storage
//! root, so the two stay in lock-step through moves and copies:
//!
//! ```text
//! uploads/blog/cover.jpg            location("blog/cover.jpg")
//! uploads/.meta/blog/cover.jpg.toml meta_location("blog/cover.jpg")
//! ```
//!
//! Entries are directories holding a fixed content file, so their locator
//! appends that file name:
//!
//! ```text
//! entries/blog/post-1/entry.toml    location("blog/post-1")
//! ```
//!
//! Nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Directory inserted at the storage root for the sidecar subtree.
pub const META_DIR: &str = ".meta";

/// Extension appended to a content file name to form its sidecar name.
pub const META_EXTENSION: &str = "toml";

/// Maps ids under one storage root to content and sidecar paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    root: PathBuf,
    content_file: Option<String>,
}

impl Locator {
    /// Locator where an id names the content file itself (media).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            content_file: None,
        }
    }

    /// Locator where an id names a directory holding `content_file` (entries).
    pub fn with_content_file(root: impl Into<PathBuf>, content_file: &str) -> Self {
        Self {
            root: root.into(),
            content_file: Some(content_file.to_string()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root of the mirrored sidecar subtree.
    pub fn meta_root(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    /// Path of the content file for `id`.
    pub fn location(&self, id: &str) -> PathBuf {
        let dir = self.dir_location(id);
        match &self.content_file {
            Some(file) => dir.join(file),
            None => dir,
        }
    }

    /// Path of the sidecar for `id`.
    pub fn meta_location(&self, id: &str) -> PathBuf {
        let relative = relative_content_path(id, self.content_file.as_deref());
        let mut name = relative.into_os_string();
        name.push(".");
        name.push(META_EXTENSION);
        self.meta_root().join(name)
    }

    /// Content path of `id` treated as a directory.
    pub fn dir_location(&self, id: &str) -> PathBuf {
        self.root.join(normalize_id(id))
    }

    /// Sidecar directory mirroring `dir_location(id)`.
    pub fn dir_meta_location(&self, id: &str) -> PathBuf {
        self.meta_root().join(normalize_id(id))
    }
}

fn relative_content_path(id: &str, content_file: Option<&str>) -> PathBuf {
    let id = PathBuf::from(normalize_id(id));
    match content_file {
        Some(file) => id.join(file),
        None => id,
    }
}

/// Strip leading and trailing separators so `/blog/` and `blog` are one id.
pub fn normalize_id(id: &str) -> &str {
    id.trim_matches('/')
}

/// Whether `id` stays inside its storage root and outside the sidecar tree.
///
/// Rejects empty ids, absolute paths, `..` segments, and ids whose first
/// segment is the `.meta` directory.
pub fn is_valid_id(id: &str) -> bool {
    let id = normalize_id(id);
    if id.is_empty() {
        return false;
    }
    let path = Path::new(id);
    let mut components = path.components();
    if let Some(Component::Normal(first)) = components.clone().next()
        && first == META_DIR
    {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
