//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Largest centered square inside an image.
///
/// Returns `(x, y, side)`: the crop origin and edge length.
pub fn center_square(source: (u32, u32)) -> (u32, u32, u32) {
    let (w, h) = source;
    let side = w.min(h);
    ((w - side) / 2, (h - side) / 2, side)
}

/// Dimensions that fit `source` inside a `max` x `max` box.
///
/// The aspect ratio is kept and images already small enough are left at
/// their original size.
///
/// # Examples
/// ```
/// # use quire::imaging::calculations::fit_longest_side;
/// assert_eq!(fit_longest_side((1600, 1200), 400), (400, 300));
/// assert_eq!(fit_longest_side((100, 50), 400), (100, 50));
/// ```
pub fn fit_longest_side(source: (u32, u32), max: u32) -> (u32, u32) {
    let (w, h) = source;
    let longest = w.max(h);
    if longest <= max || longest == 0 {
        return (w, h);
    }
    let scale = max as f64 / longest as f64;
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    if w >= h { (max, scaled(h)) } else { (scaled(w), max) }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // center_square
    // =========================================================================

    #[test]
    fn square_from_landscape() {
        assert_eq!(center_square((800, 600)), (100, 0, 600));
    }

    #[test]
    fn square_from_portrait() {
        assert_eq!(center_square((600, 900)), (0, 150, 600));
    }

    #[test]
    fn square_from_square() {
        assert_eq!(center_square((500, 500)), (0, 0, 500));
    }

    #[test]
    fn square_from_odd_difference_rounds_down() {
        assert_eq!(center_square((101, 100)), (0, 0, 100));
    }

    // =========================================================================
    // fit_longest_side
    // =========================================================================

    #[test]
    fn fit_landscape() {
        assert_eq!(fit_longest_side((1600, 1200), 400), (400, 300));
    }

    #[test]
    fn fit_portrait() {
        assert_eq!(fit_longest_side((1200, 1600), 400), (300, 400));
    }

    #[test]
    fn fit_never_upscales() {
        assert_eq!(fit_longest_side((120, 80), 400), (120, 80));
    }

    #[test]
    fn fit_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_longest_side((10000, 10), 100), (100, 1));
    }
}
