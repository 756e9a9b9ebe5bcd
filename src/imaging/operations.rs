//! High-level image operations used by the media store.
//!
//! These functions combine calculations with backend execution.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_fit_dimensions, satisfies_rules};
use super::params::{DimensionRules, Quality, ResizeParams, ResizeTarget};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Check an image file against the dimension rules.
///
/// Unreadable dimensions fail validation rather than erroring.
pub fn validate_image(backend: &impl ImageBackend, path: &Path, rules: &DimensionRules) -> bool {
    match backend.identify(path) {
        Ok(dims) => satisfies_rules((dims.width, dims.height), rules),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "image dimensions unreadable");
            false
        }
    }
}

/// Configuration for the post-upload resize.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformConfig {
    pub target: ResizeTarget,
    pub quality: Quality,
}

/// Plan the resize for an image of the given size without executing it.
pub fn plan_transform(path: &Path, original: Dimensions, config: &TransformConfig) -> Option<ResizeParams> {
    let (width, height) =
        calculate_fit_dimensions((original.width, original.height), config.target)?;
    Some(ResizeParams {
        source: path.to_path_buf(),
        output: path.to_path_buf(),
        width,
        height,
        quality: config.quality,
    })
}

/// Resize an image in place according to `config`.
///
/// Returns the new dimensions, or `None` when no target is configured and
/// the file was left untouched.
pub fn transform_image(
    backend: &impl ImageBackend,
    path: &Path,
    config: &TransformConfig,
) -> Result<Option<Dimensions>> {
    if config.target.is_empty() {
        return Ok(None);
    }
    let original = backend.identify(path)?;
    let Some(params) = plan_transform(path, original, config) else {
        return Ok(None);
    };
    backend.resize(&params)?;
    Ok(Some(Dimensions {
        width: params.width,
        height: params.height,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::ImageKind;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    fn transform(width: Option<u32>, height: Option<u32>) -> TransformConfig {
        TransformConfig {
            target: ResizeTarget::new(width, height),
            quality: Quality::new(70),
        }
    }

    #[test]
    fn validate_within_bounds() {
        let backend = MockBackend::image(ImageKind::Png, 100, 50);
        let rules = DimensionRules {
            max_width: Some(200),
            max_height: Some(200),
            exact: false,
        };
        assert!(validate_image(&backend, Path::new("/tmp/x"), &rules));
    }

    #[test]
    fn validate_exact_mismatch() {
        let backend = MockBackend::image(ImageKind::Png, 100, 50);
        let rules = DimensionRules {
            max_width: Some(200),
            max_height: Some(200),
            exact: true,
        };
        assert!(!validate_image(&backend, Path::new("/tmp/x"), &rules));
    }

    #[test]
    fn validate_unreadable_fails() {
        let backend = MockBackend::new();
        assert!(!validate_image(
            &backend,
            Path::new("/tmp/x"),
            &DimensionRules::default()
        ));
    }

    #[test]
    fn transform_width_only_upsizes() {
        let backend = MockBackend::image(ImageKind::Png, 100, 50);
        let dims = transform_image(&backend, Path::new("/up/a.png"), &transform(Some(200), None))
            .unwrap()
            .unwrap();
        assert_eq!((dims.width, dims.height), (200, 100));

        let ops = backend.get_operations();
        assert_eq!(
            ops.last(),
            Some(&RecordedOp::Resize {
                source: "/up/a.png".into(),
                output: "/up/a.png".into(),
                width: 200,
                height: 100,
                quality: 70,
            })
        );
    }

    #[test]
    fn transform_width_only_downsizes() {
        let backend = MockBackend::image(ImageKind::Jpeg, 800, 600);
        let dims = transform_image(&backend, Path::new("/up/a.jpg"), &transform(Some(200), None))
            .unwrap()
            .unwrap();
        assert_eq!((dims.width, dims.height), (200, 150));
    }

    #[test]
    fn transform_without_target_touches_nothing() {
        let backend = MockBackend::image(ImageKind::Png, 100, 50);
        let result = transform_image(&backend, Path::new("/up/a.png"), &transform(None, None)).unwrap();
        assert!(result.is_none());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn transform_identify_failure_propagates() {
        let backend = MockBackend::new();
        let result = transform_image(&backend, Path::new("/up/a.png"), &transform(Some(10), None));
        assert!(result.is_err());
    }

    #[test]
    fn plan_uses_both_targets() {
        let params = plan_transform(
            Path::new("/up/tall.png"),
            Dimensions {
                width: 1000,
                height: 2000,
            },
            &transform(Some(500), Some(500)),
        )
        .unwrap();
        assert_eq!((params.width, params.height), (250, 500));
    }
}
