//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{DimensionRules, ResizeTarget};

/// Largest output a resize may plan, in pixels.
pub const MAX_OUTPUT_PIXELS: u64 = 50_000_000;

/// Whether `(width, height)` satisfies the dimension rules.
///
/// An unconfigured maximum takes the image's own dimension, so it never
/// rejects. In exact mode both axes must equal their maximum; otherwise both
/// must be at most their maximum. Zero-sized images never pass.
pub fn satisfies_rules(dims: (u32, u32), rules: &DimensionRules) -> bool {
    let (width, height) = dims;
    if width == 0 || height == 0 {
        return false;
    }
    let max_width = rules.max_width.unwrap_or(width);
    let max_height = rules.max_height.unwrap_or(height);

    if rules.exact {
        width == max_width && height == max_height
    } else {
        width <= max_width && height <= max_height
    }
}

/// Calculate the output size of an aspect-preserving resize.
///
/// Enlargement is allowed. With both targets set the image is scaled until
/// the first target is reached (fit within the box). With one target the
/// image is scaled by that axis alone. Returns `None` when no target is set
/// or the source is empty.
///
/// Plans larger than [`MAX_OUTPUT_PIXELS`] are scaled back, keeping the
/// aspect ratio, until they fit the budget.
///
/// # Examples
/// ```
/// # use quire::imaging::{ResizeTarget, calculate_fit_dimensions};
/// // Width-only target enlarges a narrow image
/// assert_eq!(
///     calculate_fit_dimensions((100, 50), ResizeTarget::new(Some(200), None)),
///     Some((200, 100))
/// );
/// ```
pub fn calculate_fit_dimensions(original: (u32, u32), target: ResizeTarget) -> Option<(u32, u32)> {
    let (orig_w, orig_h) = original;
    if orig_w == 0 || orig_h == 0 {
        return None;
    }

    let scale = match (target.width, target.height) {
        (Some(w), Some(h)) => (w as f64 / orig_w as f64).min(h as f64 / orig_h as f64),
        (Some(w), None) => w as f64 / orig_w as f64,
        (None, Some(h)) => h as f64 / orig_h as f64,
        (None, None) => return None,
    };
    let source_pixels = orig_w as f64 * orig_h as f64;
    let budget = (MAX_OUTPUT_PIXELS as f64 / source_pixels).sqrt();
    if scale > budget {
        let floor = |v: u32| ((v as f64 * budget).floor() as u32).max(1);
        return Some((floor(orig_w), floor(orig_h)));
    }

    Some((scaled(orig_w, scale), scaled(orig_h, scale)))
}

fn scaled(value: u32, scale: f64) -> u32 {
    ((value as f64 * scale).round() as u32).max(1)
}
