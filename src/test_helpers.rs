//! Shared test utilities for the quire test suite.
//!
//! Builds throwaway site folders and reads them back, so stage tests can
//! work on real files without a fixtures directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = site_with(&[
//!     ("page_sources/index.txt", "   Home\n\nWelcome."),
//!     ("page_sources/news/20240301-fair.txt", "   Fair\n\nStalls and music."),
//! ]);
//! let layout = SiteLayout::new(tmp.path());
//! assert!(read(tmp.path(), "page_sources/index.txt").starts_with("   Home"));
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Fixture setup
// =========================================================================

/// A temp site with `page_sources/` and `public_html/` plus the given files.
pub fn site_with(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("page_sources")).unwrap();
    fs::create_dir_all(tmp.path().join("public_html")).unwrap();
    for (rel, content) in files {
        write(tmp.path(), rel, content);
    }
    tmp
}

/// Write a site-relative file, creating its folders.
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Read a site-relative file.
pub fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
}

/// Write a small solid-color JPEG at a site-relative path.
pub fn write_jpeg(root: &Path, rel: &str, width: u32, height: u32) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]));
    img.save(&path).unwrap();
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert that `haystack` contains every needle, in order.
#[track_caller]
pub fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        match haystack[from..].find(needle) {
            Some(i) => from += i + needle.len(),
            None => panic!("{needle:?} not found in order in:\n{haystack}"),
        }
    }
}
