//! Thumbnails with the `image` crate, no external tools.
//!
//! ```text
//! decode (jpeg/png/gif) → crop or fit → Lanczos3 resize → unsharpen → JPEG
//! ```
//!
//! JPEG has no alpha channel, so every thumbnail is flattened to RGB before
//! encoding.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{center_square, fit_longest_side};
use super::params::{Fit, ThumbnailParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Formats a news image may come in.
const LISTING_FORMATS: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Gif];

/// Whether a file extension names a format this backend decodes.
pub fn decodes_extension(ext: &str) -> bool {
    ImageFormat::from_extension(ext)
        .is_some_and(|f| LISTING_FORMATS.contains(&f) && f.reading_enabled())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

fn decode(path: &Path) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    reader.decode().map_err(|e| BackendError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn fit(img: DynamicImage, fit: Fit, size: u32) -> DynamicImage {
    let source = (img.width(), img.height());
    match fit {
        Fit::Square => {
            let (x, y, side) = center_square(source);
            img.crop_imm(x, y, side, side)
                .resize_exact(size, size, FilterType::Lanczos3)
        }
        Fit::LongestSide => match fit_longest_side(source, size) {
            target if target == source => img,
            (w, h) => img.resize_exact(w, h, FilterType::Lanczos3),
        },
    }
}

fn encode_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> Result<(), BackendError> {
    let out = BufWriter::new(File::create(path)?);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(out, quality))
        .map_err(|e| BackendError::Encode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| BackendError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Dimensions { width, height })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let mut thumb = fit(decode(&params.source)?, params.fit, params.size);
        if let Some(s) = params.sharpening {
            thumb = DynamicImage::from(imageops::unsharpen(&thumb, s.sigma, s.threshold));
        }
        // Quality is clamped to 1..=100 on construction.
        encode_jpeg(&thumb, &params.output, params.quality.value() as u8)
    }
}
