//! Pure calculation functions for preview dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate preview dimensions for a fixed target width.
///
/// The width always equals `target_width` (small sources are upscaled); the
/// height keeps the source aspect ratio and never drops below 1px.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target_width` - Configured preview width in pixels
///
/// # Examples
/// ```
/// # use folio::imaging::calculate_preview_dimensions;
/// // 600x408 source at 80px → 80x54
/// assert_eq!(calculate_preview_dimensions((600, 408), 80), (80, 54));
/// ```
pub fn calculate_preview_dimensions(source: (u32, u32), target_width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return (target_width, 1);
    }
    let h = (src_h as f64 * target_width as f64 / src_w as f64).round() as u32;
    (target_width, h.max(1))
}
