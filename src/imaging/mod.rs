//! Image processing for news listing thumbnails, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Square thumbnail** | `crop_imm` (center square) + Lanczos3 resize |
//! | **Longest-side fit** | Lanczos3 resize, never upscaled |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder` |
//!
//! `operations` decides what to cut from the `[news]` settings, `params`
//! carries the request, and the backend does the pixel work. Dimension
//! maths live apart in `calculations` so they test without images.

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use operations::{ThumbnailConfig, create_thumbnail, is_supported};
pub use params::{Fit, Quality, Sharpening, ThumbnailParams};
pub use rust_backend::RustBackend;
