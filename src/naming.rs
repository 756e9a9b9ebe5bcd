//! File name helpers shared by the media and entry stores.
//!
//! Media file names are split two different ways, and both are needed:
//!
//! - **Last dot**: the extension checked against the
//!   accept-list and the title written to a new sidecar.
//!   `archive.tar.gz` → stem `archive.tar`, extension `gz`.
//! - **First dot**: the `basename` and `extension` fields derived on fetch.
//!   `archive.tar.gz` → basename `archive`, extension `tar.gz`.

/// Stem and extension split at the last dot.
///
/// A leading dot (`.htaccess`) is part of the stem, not an extension separator.
pub fn split_last_dot(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

/// Basename and extension split at the first dot.
pub fn split_first_dot(name: &str) -> (&str, Option<&str>) {
    match name.find('.') {
        Some(pos) => (&name[..pos], Some(&name[pos + 1..])),
        None => (name, None),
    }
}

/// Lower-cased extension (after the last dot), or empty.
pub fn extension_lowercase(name: &str) -> String {
    split_last_dot(name)
        .1
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Turn a file stem into a URL- and filesystem-safe slug.
///
/// - Lower-cases ASCII letters
/// - Replaces anything that is not `[a-z0-9]` with a dash
/// - Collapses consecutive dashes into one
/// - Strips leading and trailing dashes
pub fn slugify(stem: &str) -> String {
    let mut slug = String::with_capacity(stem.len());
    let mut prev_dash = true;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Rewrite a file name to `<slug>.<ext>`, keeping the original extension.
///
/// Falls back to the original name when the stem has no slug-able characters.
pub fn safe_file_name(name: &str) -> String {
    let (stem, ext) = split_last_dot(name);
    let slug = slugify(stem);
    if slug.is_empty() {
        return name.to_string();
    }
    match ext {
        Some(ext) => format!("{slug}.{ext}"),
        None => slug,
    }
}
