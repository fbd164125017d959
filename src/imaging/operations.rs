//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they take
//! configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_preview_dimensions;
use super::params::{PreviewParams, Quality};
use crate::naming;
use crate::types::Image;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Configuration for preview generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewConfig {
    pub width: u32,
    pub quality: Quality,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 80,
            quality: Quality::default(),
        }
    }
}

/// Plan a preview encode without executing it.
pub fn plan_preview(
    source: &Path,
    original_dims: (u32, u32),
    config: &PreviewConfig,
) -> PreviewParams {
    let (width, height) = calculate_preview_dimensions(original_dims, config.width);
    PreviewParams {
        source: source.to_path_buf(),
        width,
        height,
        quality: config.quality,
    }
}

/// Turn a local image file into an [`Image`] with a fresh ID.
///
/// Decodes dimensions, renders the preview into memory and assigns a new
/// collision-resistant ID. Any decode failure is returned to the caller.
pub fn process_image(
    backend: &impl ImageBackend,
    source: &Path,
    config: &PreviewConfig,
) -> Result<Image> {
    let dims = backend.identify(source)?;
    let params = plan_preview(source, (dims.width, dims.height), config);
    let preview = backend.preview(&params)?;

    let image = Image {
        id: naming::new_image_id(),
        width: dims.width,
        height: dims.height,
        color: preview.color,
        preview: preview.bytes,
        source: source.to_path_buf(),
    };
    tracing::debug!(
        source = %source.display(),
        id = %image.id,
        width = image.width,
        height = image.height,
        "Processed image"
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    #[test]
    fn plan_preview_calculates_height() {
        let params = plan_preview(Path::new("/a.jpg"), (600, 408), &PreviewConfig::default());
        assert_eq!((params.width, params.height), (80, 54));
        assert_eq!(params.quality, Quality::default());
    }

    #[test]
    fn process_image_identifies_then_previews() {
        let backend = MockBackend::new().with_image("/blog/a.jpg", 1000, 500);
        let config = PreviewConfig {
            width: 100,
            quality: Quality::new(60),
        };

        let image = process_image(&backend, Path::new("/blog/a.jpg"), &config).unwrap();
        assert_eq!((image.width, image.height), (1000, 500));
        assert!(image.id.ends_with(".jpg"));
        assert_eq!(image.color, "808080");
        assert!(!image.preview.is_empty());
        assert_eq!(image.source, Path::new("/blog/a.jpg"));

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Identify("/blog/a.jpg".into()),
                RecordedOp::Preview {
                    source: "/blog/a.jpg".into(),
                    width: 100,
                    height: 50,
                    quality: 60,
                },
            ]
        );
    }

    #[test]
    fn process_image_stops_on_decode_failure() {
        let backend = MockBackend::new();
        let source = Path::new("/blog/missing.jpg");
        let result = process_image(&backend, source, &PreviewConfig::default());
        assert!(result.is_err());
        assert_eq!(backend.get_operations().len(), 1);
    }

    #[test]
    fn each_call_gets_a_new_id() {
        let backend = MockBackend::new().with_image("/a.jpg", 10, 10);
        let a = process_image(&backend, Path::new("/a.jpg"), &PreviewConfig::default()).unwrap();
        let b = process_image(&backend, Path::new("/a.jpg"), &PreviewConfig::default()).unwrap();
        assert_ne!(a.id, b.id);
    }
}
