//! Thumbnail planning: turns `[news]` settings into backend calls.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{Fit, Quality, Sharpening, ThumbnailParams};
use super::rust_backend::decodes_extension;
use crate::config::NewsConfig;
use std::path::Path;

/// How listing thumbnails are cut.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub size: u32,
    pub fit: Fit,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

impl ThumbnailConfig {
    /// Listing thumbnails as configured under `[news]`.
    pub fn for_listing(config: &NewsConfig) -> Self {
        Self {
            size: config.thumbnail_size,
            fit: config.thumbnail_fit,
            quality: Quality::new(config.thumbnail_quality),
            ..Self::default()
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: 160,
            fit: Fit::Square,
            quality: Quality::default(),
            sharpening: Some(Sharpening::light()),
        }
    }
}

/// Whether `path` looks like an image the backend can read.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(decodes_extension)
}

/// Write a thumbnail of `source` to `output`, creating its folder.
///
/// Returns the size of the source image.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &ThumbnailConfig,
) -> Result<Dimensions, BackendError> {
    if !is_supported(source) {
        return Err(BackendError::Unsupported(source.to_path_buf()));
    }
    let dims = backend.identify(source)?;
    if let Some(dir) = output.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let params = ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        size: config.size,
        fit: config.fit,
        quality: config.quality,
        sharpening: config.sharpening,
    };
    backend.thumbnail(&params)?;
    Ok(dims)
}
