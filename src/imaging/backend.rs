//! The seam between thumbnail planning and pixel work.
//!
//! Everything outside `imaging` only sees [`ImageBackend`]. Production uses
//! [`RustBackend`](super::rust_backend::RustBackend); tests use the
//! call-recording `MockBackend` below and never decode anything.

use super::params::ThumbnailParams;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a supported image: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("cannot decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("cannot write thumbnail {}: {reason}", .path.display())]
    Encode { path: PathBuf, reason: String },
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

pub trait ImageBackend {
    /// Read the pixel size without decoding the whole image.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Write a JPEG thumbnail of `params.source` to `params.output`.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}
