//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which decides whether
//! and how far to resize) and the [`backend`](super::backend) (which does the
//! pixel work), so tests can swap in a recording backend.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for a resize that re-encodes in the source's own format.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Requested resize targets. `None` leaves that axis unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeTarget {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeTarget {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

/// Dimension limits an uploaded image must satisfy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimensionRules {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Require an exact match instead of fitting within the maxima.
    pub exact: bool,
}
