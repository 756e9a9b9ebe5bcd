//! The media store: upload pipeline, fetch, and file management.
//!
//! Every media object is a content file under the uploads root plus a TOML
//! sidecar at the mirrored path under `.meta/`. The store keeps the two in
//! step: an object "exists" only when both do.

use super::upload::{Rejection, TransferStatus, UploadOutcome, UploadSpool, UploadedFile};
use super::{FetchResult, MediaError, MediaMeta, MediaRecord};
use crate::codec::{self, MetaMap};
use crate::config::{MediaConfig, Settings};
use crate::imaging::{
    DimensionRules, ImageBackend, ImageKind, Quality, ResizeTarget, RustBackend, TransformConfig,
    transform_image, validate_image,
};
use crate::locator::{Locator, META_EXTENSION, is_valid_id, normalize_id};
use crate::naming::{extension_lowercase, safe_file_name, split_first_dot, split_last_dot};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Uploads root, relative to the project root.
pub const UPLOADS_DIR: &str = "uploads";
/// Upload channel spool, relative to the project root.
pub const SPOOL_DIR: &str = "tmp/uploads";

pub struct MediaStore<B: ImageBackend = RustBackend> {
    locator: Locator,
    spool: UploadSpool,
    config: MediaConfig,
    base_url: Option<String>,
    backend: B,
}

impl MediaStore<RustBackend> {
    /// Store rooted at `<project>/uploads`, spooling into `<project>/tmp/uploads`.
    pub fn open(project_root: &Path, settings: &Settings) -> Self {
        Self::with_backend(
            Locator::new(project_root.join(UPLOADS_DIR)),
            UploadSpool::new(project_root.join(SPOOL_DIR)),
            settings,
            RustBackend::new(),
        )
    }
}

impl<B: ImageBackend> MediaStore<B> {
    pub fn with_backend(locator: Locator, spool: UploadSpool, settings: &Settings, backend: B) -> Self {
        Self {
            locator,
            spool,
            config: settings.media.clone(),
            base_url: settings.base_url().map(str::to_string),
            backend,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn spool(&self) -> &UploadSpool {
        &self.spool
    }

    fn dimension_rules(&self) -> DimensionRules {
        let (max_width, max_height) = self.config.max_image_bounds();
        DimensionRules {
            max_width,
            max_height,
            exact: self.config.exact,
        }
    }

    fn transform_config(&self) -> TransformConfig {
        let (width, height) = self.config.image_target();
        TransformConfig {
            target: ResizeTarget::new(width, height),
            quality: Quality::new(self.config.image_quality),
        }
    }

    /// Validate an uploaded file and store it under `folder`.
    ///
    /// Every check runs before anything touches the uploads tree, so a
    /// rejected upload leaves no trace. `folder` may be empty for the
    /// uploads root.
    pub fn upload(&self, file: &UploadedFile, folder: &str) -> Result<UploadOutcome, MediaError> {
        if let Some(rejection) = self.check(file, folder) {
            tracing::info!(name = %file.name, %rejection, "upload rejected");
            return Ok(UploadOutcome::Rejected(rejection));
        }

        let kind = self.backend.sniff(&file.tmp_name);
        if kind.is_some() && !validate_image(&self.backend, &file.tmp_name, &self.dimension_rules()) {
            tracing::info!(name = %file.name, "upload rejected: image dimensions");
            return Ok(UploadOutcome::Rejected(Rejection::ImageDimensions));
        }

        let Some(client_name) = Path::new(&file.name).file_name().and_then(|n| n.to_str()) else {
            return Ok(UploadOutcome::Rejected(Rejection::InvalidName {
                name: file.name.clone(),
            }));
        };
        let filename = if self.config.safe_names {
            safe_file_name(client_name)
        } else {
            client_name.to_string()
        };

        let folder = normalize_id(folder);
        let content_dir = self.locator.dir_location(folder);
        let meta_dir = self.locator.dir_meta_location(folder);
        for dir in [&content_dir, &meta_dir] {
            create_dirs(dir).map_err(|source| MediaError::Io {
                path: dir.clone(),
                source,
            })?;
            if !is_writable(dir) {
                return Err(MediaError::NotWritable(dir.clone()));
            }
        }

        let dest = content_dir.join(&filename);
        move_upload(&file.tmp_name, &dest).map_err(|source| MediaError::Io {
            path: dest.clone(),
            source,
        })?;
        let id = if folder.is_empty() {
            filename.clone()
        } else {
            format!("{folder}/{filename}")
        };
        // The content file never outlives a failed sidecar.
        if let Err(e) = self.settle(&dest, kind, &id, &filename) {
            let _ = fs::remove_file(&dest);
            return Err(e);
        }

        let stored = dest.canonicalize().unwrap_or(dest);
        tracing::info!(id = %id, path = %stored.display(), "stored upload");
        Ok(UploadOutcome::Stored(stored))
    }

    /// Finish a file already moved to `dest`: mode, image pass, sidecar.
    fn settle(
        &self,
        dest: &Path,
        kind: Option<ImageKind>,
        id: &str,
        filename: &str,
    ) -> Result<(), MediaError> {
        set_file_mode(dest).map_err(|source| MediaError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        let exif = match kind {
            Some(kind) => self.normalize_image(dest, kind)?,
            None => MetaMap::new(),
        };
        let filesize = fs::metadata(dest)
            .map_err(|source| MediaError::Io {
                path: dest.to_path_buf(),
                source,
            })?
            .len();
        let mime_type = match kind {
            Some(kind) => kind.mime_type().to_string(),
            None => mime_guess::from_path(dest)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        let meta = MediaMeta {
            title: split_last_dot(filename).0.to_string(),
            description: String::new(),
            mime_type,
            filesize,
            uploaded_on: chrono::Utc::now().timestamp(),
            exif,
            extra: MetaMap::new(),
        };
        codec::write_document(&self.locator.meta_location(id), &meta)?;
        Ok(())
    }

    /// Checks that need nothing but the descriptor and the spool.
    fn check(&self, file: &UploadedFile, folder: &str) -> Option<Rejection> {
        match file.status {
            TransferStatus::Ok => {}
            TransferStatus::IniSize | TransferStatus::FormSize => {
                return Some(Rejection::TooLarge {
                    size: file.size,
                    max: self.config.max_file_size,
                });
            }
            status => return Some(Rejection::Transfer { status }),
        }
        if !self.spool.contains(&file.tmp_name) {
            return Some(Rejection::NotFromUploadChannel);
        }
        if !normalize_id(folder).is_empty() && !is_valid_id(folder) {
            return Some(Rejection::InvalidFolder {
                folder: folder.to_string(),
            });
        }
        let extension = extension_lowercase(&file.name);
        if extension.is_empty() || !self.config.accept_file_types.to_lowercase().contains(&extension) {
            return Some(Rejection::ExtensionNotAccepted { extension });
        }
        if file.size > self.config.max_file_size {
            return Some(Rejection::TooLarge {
                size: file.size,
                max: self.config.max_file_size,
            });
        }
        None
    }

    /// Resize a stored image in place and read back its EXIF fields.
    fn normalize_image(&self, path: &Path, kind: ImageKind) -> Result<MetaMap, MediaError> {
        if let Some(dims) = transform_image(&self.backend, path, &self.transform_config())? {
            tracing::debug!(path = %path.display(), ?kind, width = dims.width, height = dims.height, "resized");
        }
        Ok(self.backend.read_exif(path).unwrap_or_else(|| {
            tracing::debug!(path = %path.display(), "no readable EXIF");
            MetaMap::new()
        }))
    }

    /// Fetch a single record, or every record in a folder.
    ///
    /// An id naming an existing directory under the uploads root is a
    /// folder; the empty id is the uploads root itself. `origin` is used for
    /// `full_url` when no base URL is configured.
    pub fn fetch(&self, id: &str, origin: &str) -> Result<FetchResult, MediaError> {
        let id = normalize_id(id);
        if !id.is_empty() && !is_valid_id(id) {
            return Ok(FetchResult::Single(None));
        }
        if self.locator.dir_location(id).is_dir() {
            self.fetch_collection(id, origin).map(FetchResult::Collection)
        } else {
            self.fetch_single(id, origin).map(FetchResult::Single)
        }
    }

    /// Read one record. `Ok(None)` when its sidecar is missing.
    pub fn fetch_single(&self, id: &str, origin: &str) -> Result<Option<MediaRecord>, MediaError> {
        let id = normalize_id(id);
        if !is_valid_id(id) {
            return Ok(None);
        }
        let meta_path = self.locator.meta_location(id);
        if !meta_path.is_file() {
            return Ok(None);
        }
        let meta: MediaMeta = codec::read_document(&meta_path)?;

        let content = self.locator.location(id);
        let filename = file_name_of(&content);
        let basename = split_first_dot(&filename).0.to_string();
        let extension = split_first_dot(id).1.unwrap_or_default().to_string();
        let dirname = content
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Ok(Some(self.record(meta, id, filename, basename, extension, dirname, origin)))
    }

    /// Read every sidecar directly inside `folder`, keyed by content file name.
    ///
    /// Sidecars that fail to decode are logged and skipped.
    pub fn fetch_collection(
        &self,
        folder: &str,
        origin: &str,
    ) -> Result<BTreeMap<String, MediaRecord>, MediaError> {
        let folder = normalize_id(folder);
        let meta_dir = self.locator.dir_meta_location(folder);
        let mut records = BTreeMap::new();
        if !meta_dir.is_dir() {
            return Ok(records);
        }
        let dirname = self.locator.dir_location(folder).display().to_string();
        let suffix = format!(".{META_EXTENSION}");

        for entry in WalkDir::new(&meta_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| MediaError::Io {
                path: meta_dir.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(filename) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(&suffix))
            else {
                continue;
            };
            let meta: MediaMeta = match codec::read_document(entry.path()) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable sidecar");
                    continue;
                }
            };
            let (basename, extension) = split_first_dot(filename);
            let id = if folder.is_empty() {
                filename.to_string()
            } else {
                format!("{folder}/{filename}")
            };
            let record = self.record(
                meta,
                &id,
                filename.to_string(),
                basename.to_string(),
                extension.unwrap_or_default().to_string(),
                dirname.clone(),
                origin,
            );
            records.insert(filename.to_string(), record);
        }
        Ok(records)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        meta: MediaMeta,
        id: &str,
        filename: String,
        basename: String,
        extension: String,
        dirname: String,
        origin: &str,
    ) -> MediaRecord {
        let prefix = self.config.url_prefix.trim_matches('/');
        let url = if prefix.is_empty() {
            id.to_string()
        } else {
            format!("{prefix}/{id}")
        };
        let base = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| origin.trim_end_matches('/'));
        MediaRecord {
            meta,
            filename,
            basename,
            extension,
            dirname,
            full_url: format!("{base}/{url}"),
            url,
        }
    }

    /// Rename an object, content and sidecar together.
    ///
    /// Refuses to overwrite an existing target. If the sidecar rename fails
    /// the content rename is undone.
    pub fn move_file(&self, id: &str, new_id: &str) -> bool {
        let Some([from, from_meta, to, to_meta]) = self.transfer_paths(id, new_id) else {
            return false;
        };
        if let Err(e) = fs::rename(&from, &to) {
            tracing::warn!(%id, %new_id, error = %e, "move failed");
            return false;
        }
        if let Err(e) = fs::rename(&from_meta, &to_meta) {
            tracing::warn!(%id, %new_id, error = %e, "sidecar move failed, rolling back");
            if let Err(e) = fs::rename(&to, &from) {
                tracing::warn!(%id, error = %e, "rollback failed");
            }
            return false;
        }
        tracing::info!(%id, %new_id, "moved");
        true
    }

    /// Duplicate an object under a new id.
    pub fn copy_file(&self, id: &str, new_id: &str) -> bool {
        let Some([from, from_meta, to, to_meta]) = self.transfer_paths(id, new_id) else {
            return false;
        };
        if let Err(e) = fs::copy(&from, &to) {
            tracing::warn!(%id, %new_id, error = %e, "copy failed");
            return false;
        }
        if let Err(e) = fs::copy(&from_meta, &to_meta) {
            tracing::warn!(%id, %new_id, error = %e, "sidecar copy failed");
            let _ = fs::remove_file(&to);
            return false;
        }
        tracing::info!(%id, %new_id, "copied");
        true
    }

    /// Source and target paths for move and copy, with target parents
    /// created. `None` when either id is invalid, the source is missing, or
    /// the target already exists.
    fn transfer_paths(&self, id: &str, new_id: &str) -> Option<[PathBuf; 4]> {
        if !is_valid_id(id) || !is_valid_id(new_id) {
            tracing::warn!(%id, %new_id, "invalid media id");
            return None;
        }
        if !self.has(id) {
            tracing::warn!(%id, "no such media object");
            return None;
        }
        let to = self.locator.location(new_id);
        let to_meta = self.locator.meta_location(new_id);
        if to.exists() || to_meta.exists() {
            tracing::warn!(%new_id, "target already exists");
            return None;
        }
        for path in [&to, &to_meta] {
            if let Some(parent) = path.parent()
                && let Err(e) = create_dirs(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "cannot create directory");
                return None;
            }
        }
        Some([
            self.locator.location(id),
            self.locator.meta_location(id),
            to,
            to_meta,
        ])
    }

    /// Remove the content file, then its sidecar.
    pub fn delete(&self, id: &str) -> bool {
        if !is_valid_id(id) {
            return false;
        }
        let content = self.locator.location(id);
        if let Err(e) = fs::remove_file(&content) {
            tracing::warn!(%id, error = %e, "delete failed");
            return false;
        }
        if let Err(e) = fs::remove_file(self.locator.meta_location(id)) {
            tracing::warn!(%id, error = %e, "sidecar delete failed");
            return false;
        }
        tracing::info!(%id, "deleted");
        true
    }

    /// Whether both the content file and its sidecar exist.
    pub fn has(&self, id: &str) -> bool {
        is_valid_id(id)
            && self.locator.location(id).is_file()
            && self.locator.meta_location(id).is_file()
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn create_dirs(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}

fn is_writable(dir: &Path) -> bool {
    fs::metadata(dir).is_ok_and(|m| m.is_dir() && !m.permissions().readonly())
}

/// Rename out of the spool, copying when the spool is on another device.
fn move_upload(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

fn set_file_mode(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
