//! Shared test utilities for the quire test suite.
//!
//! Fixture image writers for tests that need real, decodable files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! write_test_jpeg(&dir.join("photo.jpg"), 800, 600);
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::Path;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a small valid JPEG with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid PNG with the given dimensions.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{ImageBackend, ImageKind, RustBackend};
    use tempfile::TempDir;

    #[test]
    fn fixtures_are_decodable() {
        let tmp = TempDir::new().unwrap();
        let png = tmp.path().join("a.png");
        let jpeg = tmp.path().join("b.jpg");
        write_test_png(&png, 12, 7);
        write_test_jpeg(&jpeg, 5, 9);

        let backend = RustBackend::new();
        assert_eq!(backend.sniff(&png), Some(ImageKind::Png));
        assert_eq!(backend.sniff(&jpeg), Some(ImageKind::Jpeg));
        let dims = backend.identify(&jpeg).unwrap();
        assert_eq!((dims.width, dims.height), (5, 9));
    }
}
