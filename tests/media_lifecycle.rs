//! End-to-end media scenarios with real images on a real filesystem.
//!
//! Each test builds a throwaway project, pushes files through the upload
//! spool, and checks what lands under `uploads/` and `uploads/.meta/`.

use image::{ImageEncoder, RgbImage};
use quire::config::Settings;
use quire::imaging::{ImageBackend, RustBackend};
use quire::media::{
    FetchResult, MediaStore, Rejection, SPOOL_DIR, UploadOutcome, UploadSpool, UploadedFile,
};
use std::path::Path;
use tempfile::TempDir;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    })
}

fn write_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let file = std::fs::File::create(path).unwrap();
    image::codecs::jpeg::JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(
            gradient(width, height).as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
}

struct Project {
    tmp: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn store(&self, settings: &Settings) -> MediaStore {
        MediaStore::open(self.root(), settings)
    }

    fn upload_with(&self, name: &str, write: impl FnOnce(&Path)) -> UploadedFile {
        let local = self.root().join(format!("local-{name}"));
        write(&local);
        let tmp_name = UploadSpool::new(self.root().join(SPOOL_DIR))
            .stage(&local)
            .unwrap();
        let size = std::fs::metadata(&tmp_name).unwrap().len();
        UploadedFile::new(name, tmp_name, size)
    }

    fn png(&self, name: &str, width: u32, height: u32) -> UploadedFile {
        self.upload_with(name, |p| write_png(p, width, height))
    }

    fn jpeg(&self, name: &str, width: u32, height: u32) -> UploadedFile {
        self.upload_with(name, |p| write_jpeg(p, width, height))
    }

    fn text(&self, name: &str, contents: &str) -> UploadedFile {
        self.upload_with(name, |p| std::fs::write(p, contents).unwrap())
    }
}

/// Settings that validate against 200x200 and never resize.
fn bounded(exact: bool) -> Settings {
    let mut settings = Settings::default();
    settings.media.max_image_width = 200;
    settings.media.max_image_height = 200;
    settings.media.exact = exact;
    settings.media.image_width = 0;
    settings.media.image_height = 0;
    settings
}

fn dimensions(path: &Path) -> (u32, u32) {
    let dims = RustBackend::new().identify(path).unwrap();
    (dims.width, dims.height)
}

#[test]
fn small_png_within_bounds_is_stored_unchanged() {
    let project = Project::new();
    let store = project.store(&bounded(false));

    let outcome = store.upload(&project.png("Small Logo.png", 100, 50), "brand").unwrap();
    let path = outcome.path().expect("upload should be stored");
    assert!(path.is_absolute());
    assert!(path.ends_with("uploads/brand/small-logo.png"));
    assert_eq!(dimensions(path), (100, 50));

    assert!(store.has("brand/small-logo.png"));
    let record = store
        .fetch_single("brand/small-logo.png", "http://localhost")
        .unwrap()
        .unwrap();
    assert_eq!(record.meta.title, "small-logo");
    assert_eq!(record.meta.mime_type, "image/png");
    assert_eq!(record.meta.filesize, std::fs::metadata(path).unwrap().len());
}

#[test]
fn small_png_fails_exact_bounds() {
    let project = Project::new();
    let store = project.store(&bounded(true));

    let upload = project.png("logo.png", 100, 50);
    let outcome = store.upload(&upload, "brand").unwrap();
    assert_eq!(outcome, UploadOutcome::Rejected(Rejection::ImageDimensions));
    assert!(!project.root().join("uploads").exists());
    assert!(!store.has("brand/logo.png"));
}

#[test]
fn exact_bounds_accept_exact_size() {
    let project = Project::new();
    let store = project.store(&bounded(true));
    let outcome = store.upload(&project.png("square.png", 200, 200), "").unwrap();
    assert!(outcome.is_stored());
}

#[test]
fn width_only_target_upsizes() {
    let project = Project::new();
    let mut settings = Settings::default();
    settings.media.image_width = 200;

    let store = project.store(&settings);
    let outcome = store.upload(&project.png("wide.png", 100, 50), "").unwrap();
    assert_eq!(dimensions(outcome.path().unwrap()), (200, 100));
}

#[test]
fn width_only_target_downsizes_jpeg_and_records_exif() {
    let project = Project::new();
    let mut settings = Settings::default();
    settings.media.image_width = 200;

    let store = project.store(&settings);
    let outcome = store.upload(&project.jpeg("photo.jpg", 800, 600), "trips").unwrap();
    let path = outcome.path().unwrap();
    assert_eq!(dimensions(path), (200, 150));

    let record = store.fetch_single("trips/photo.jpg", "http://h").unwrap().unwrap();
    assert_eq!(record.meta.mime_type, "image/jpeg");
    assert_eq!(record.meta.exif["Width"].as_integer(), Some(200));
    assert_eq!(record.meta.exif["Height"].as_integer(), Some(150));
    assert_eq!(record.meta.exif["IsColor"].as_integer(), Some(1));
}

#[test]
fn both_targets_fit_within_box() {
    let project = Project::new();
    let mut settings = Settings::default();
    settings.media.image_width = 100;
    settings.media.image_height = 100;

    let store = project.store(&settings);
    let outcome = store.upload(&project.png("tall.png", 40, 80), "").unwrap();
    assert_eq!(dimensions(outcome.path().unwrap()), (50, 100));
}

#[test]
fn rejected_extension_writes_nothing() {
    let project = Project::new();
    let store = project.store(&Settings::default());

    let upload = project.text("payload.exe", "MZ");
    let outcome = store.upload(&upload, "bin").unwrap();
    assert!(matches!(
        outcome,
        UploadOutcome::Rejected(Rejection::ExtensionNotAccepted { .. })
    ));
    assert!(!project.root().join("uploads").exists());
}

#[test]
fn image_bytes_under_text_name_are_still_validated() {
    let project = Project::new();
    let store = project.store(&bounded(true));
    let upload = project.upload_with("notes.txt", |p| write_png(p, 10, 10));
    assert_eq!(
        store.upload(&upload, "").unwrap(),
        UploadOutcome::Rejected(Rejection::ImageDimensions)
    );
}

#[test]
fn size_limit_is_inclusive() {
    let project = Project::new();
    let mut settings = Settings::default();
    settings.media.max_file_size = 10;
    let store = project.store(&settings);

    let at_limit = store.upload(&project.text("ten.txt", "0123456789"), "").unwrap();
    assert!(at_limit.is_stored());

    let over = store.upload(&project.text("eleven.txt", "0123456789A"), "").unwrap();
    assert_eq!(
        over,
        UploadOutcome::Rejected(Rejection::TooLarge { size: 11, max: 10 })
    );
}

#[test]
fn has_is_true_only_when_both_files_exist() {
    let project = Project::new();
    let store = project.store(&Settings::default());
    store.upload(&project.text("a.txt", "a"), "docs").unwrap();
    assert!(store.has("docs/a.txt"));

    let content = store.locator().location("docs/a.txt");
    let saved = std::fs::read(&content).unwrap();
    std::fs::remove_file(&content).unwrap();
    assert!(!store.has("docs/a.txt"));

    std::fs::write(&content, saved).unwrap();
    assert!(store.has("docs/a.txt"));
    std::fs::remove_file(store.locator().meta_location("docs/a.txt")).unwrap();
    assert!(!store.has("docs/a.txt"));
}

#[test]
fn move_and_copy_keep_pairs_together() {
    let project = Project::new();
    let store = project.store(&Settings::default());
    store.upload(&project.text("a.txt", "a"), "docs").unwrap();
    store.upload(&project.text("b.txt", "b"), "docs").unwrap();

    assert!(store.copy_file("docs/a.txt", "backup/a.txt"));
    assert!(store.has("docs/a.txt"));
    assert!(store.has("backup/a.txt"));

    // Collision on either file refuses the whole operation.
    assert!(!store.move_file("docs/a.txt", "docs/b.txt"));
    assert!(!store.copy_file("docs/a.txt", "backup/a.txt"));
    assert_eq!(
        std::fs::read_to_string(store.locator().location("docs/b.txt")).unwrap(),
        "b"
    );

    assert!(store.move_file("docs/a.txt", "archive/a.txt"));
    assert!(!store.has("docs/a.txt"));
    assert!(store.has("archive/a.txt"));

    assert!(store.delete("archive/a.txt"));
    assert!(!store.has("archive/a.txt"));
}

#[test]
fn folder_fetch_returns_collection() {
    let project = Project::new();
    let mut settings = Settings::default();
    settings.url = "https://example.com".into();
    let store = project.store(&settings);
    store.upload(&project.text("one.txt", "1"), "docs").unwrap();
    store.upload(&project.text("two.md", "2"), "docs").unwrap();

    let FetchResult::Collection(records) = store.fetch("docs", "http://ignored").unwrap() else {
        panic!("folder should fetch as a collection");
    };
    assert_eq!(records.len(), 2);
    let two = &records["two.md"];
    assert_eq!(two.extension, "md");
    assert_eq!(two.full_url, "https://example.com/project/uploads/docs/two.md");
}

#[test]
fn missing_sidecar_fetches_as_none() {
    let project = Project::new();
    let store = project.store(&Settings::default());
    assert_eq!(
        store.fetch("docs/none.txt", "http://h").unwrap(),
        FetchResult::Single(None)
    );
}
