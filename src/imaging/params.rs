//! What to cut, separate from how.
//!
//! [`operations`](super::operations) fills these in from the `[news]`
//! settings and a backend carries them out.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// JPEG quality, always within 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

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
        Self(80)
    }
}

/// How the source is fitted into `size`. Set by `news.thumbnail_fit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fit {
    /// Center-crop to a square, then scale to `size` x `size`.
    #[default]
    Square,
    /// Scale so the longer side is at most `size`, keeping the aspect ratio.
    LongestSide,
}

/// Unsharp mask applied after scaling down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    /// Blur radius of the mask.
    pub sigma: f32,
    /// Brightness difference below which pixels are left alone.
    pub threshold: i32,
}

impl Sharpening {
    /// Enough to undo the softening of a small downscale.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// One thumbnail to write.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub size: u32,
    pub fit: Fit,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}
