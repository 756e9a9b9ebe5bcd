//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff | `image::guess_format` on the file header |
//! | Identify | `ImageReader::with_guessed_format` + `into_dimensions` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode JPEG | `JpegEncoder::new_with_quality` |
//! | Encode PNG / GIF | `DynamicImage::write_to` |
//! | EXIF | custom [`exif_parser`](super::exif_parser) |
//!
//! Uploads arrive as temp files without extensions, so every read guesses
//! the format from content rather than the path.

use super::backend::{BackendError, Dimensions, ExifMap, ImageBackend, ImageKind};
use super::params::ResizeParams;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};

/// Bytes read from the head of a file for format sniffing.
const SNIFF_LEN: usize = 64;

/// Backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_of(format: ImageFormat) -> Option<ImageKind> {
    match format {
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::Gif => Some(ImageKind::Gif),
        _ => None,
    }
}

fn format_of(kind: ImageKind) -> ImageFormat {
    match kind {
        ImageKind::Jpeg => ImageFormat::Jpeg,
        ImageKind::Png => ImageFormat::Png,
        ImageKind::Gif => ImageFormat::Gif,
    }
}

fn sniff_file(path: &Path) -> Option<ImageKind> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    std::fs::File::open(path)
        .ok()?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .ok()?;
    image::guess_format(&head).ok().and_then(kind_of)
}

/// Load and decode an image from disk, guessing the format from content.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode `img` as `kind` into `path`.
///
/// Writes to a sibling temp file first so a failed encode never truncates
/// an existing file at `path`.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    kind: ImageKind,
    quality: u32,
) -> Result<(), BackendError> {
    let staging = staging_path(path);
    let result = write_image(img, &staging, kind, quality);
    if let Err(e) = result {
        let _ = std::fs::remove_file(&staging);
        return Err(e);
    }
    std::fs::rename(&staging, path).map_err(BackendError::Io)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_image(
    img: &DynamicImage,
    path: &Path,
    kind: ImageKind,
    quality: u32,
) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let mut writer = BufWriter::new(file);
    let encoded = match kind {
        ImageKind::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality as u8);
            rgb.write_with_encoder(encoder)
        }
        ImageKind::Png | ImageKind::Gif => img.write_to(&mut writer, format_of(kind)),
    };
    encoded.map_err(|e| BackendError::ProcessingFailed(format!("Encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn sniff(&self, path: &Path) -> Option<ImageKind> {
        sniff_file(path)
    }

    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let kind = sniff_file(&params.source).ok_or_else(|| {
            BackendError::ProcessingFailed(format!(
                "Unsupported image format: {}",
                params.source.display()
            ))
        })?;
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        save_image(&resized, &params.output, kind, params.quality.value())
    }

    fn read_exif(&self, path: &Path) -> Option<ExifMap> {
        super::exif_parser::read_computed(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{write_test_jpeg, write_test_png};

    #[test]
    fn sniff_ignores_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("upload-tmp-1234");
        write_test_png(&path, 10, 10);

        let backend = RustBackend::new();
        assert_eq!(backend.sniff(&path), Some(ImageKind::Png));
    }

    #[test]
    fn sniff_text_file_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.png");
        std::fs::write(&path, "definitely not a png").unwrap();

        assert_eq!(RustBackend::new().sniff(&path), None);
    }

    #[test]
    fn identify_synthetic_jpeg_without_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("php1a2b3c");
        write_test_jpeg(&path, 200, 150);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn resize_png_in_place() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("wide.png");
        write_test_png(&path, 100, 50);

        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source: path.clone(),
                output: path.clone(),
                width: 200,
                height: 100,
                quality: Quality::new(70),
            })
            .unwrap();

        let dims = backend.identify(&path).unwrap();
        assert_eq!((dims.width, dims.height), (200, 100));
        assert_eq!(backend.sniff(&path), Some(ImageKind::Png));
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn resize_jpeg_keeps_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        write_test_jpeg(&source, 400, 300);
        let output = tmp.path().join("photo-small.jpg");

        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 200,
                height: 150,
                quality: Quality::new(80),
            })
            .unwrap();

        assert_eq!(backend.sniff(&output), Some(ImageKind::Jpeg));
        let dims = backend.identify(&output).unwrap();
        assert_eq!((dims.width, dims.height), (200, 150));
    }

    #[test]
    fn resize_non_image_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("readme.txt");
        std::fs::write(&path, "hello").unwrap();

        let result = RustBackend::new().resize(&ResizeParams {
            source: path.clone(),
            output: path,
            width: 10,
            height: 10,
            quality: Quality::default(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn read_exif_from_encoded_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        write_test_jpeg(&path, 64, 32);

        let exif = RustBackend::new().read_exif(&path).unwrap();
        assert_eq!(exif["Width"].as_integer(), Some(64));
        assert_eq!(exif["Height"].as_integer(), Some(32));
    }

    #[test]
    fn read_exif_from_png_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("image.png");
        write_test_png(&path, 8, 8);
        assert!(RustBackend::new().read_exif(&path).is_none());
    }
}
