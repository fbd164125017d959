//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the asset pipeline
//! needs: identify (decode the header, report dimensions) and preview
//! (decode, downscale, encode to memory, pick a prominent colour).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Nothing here touches the network.

use super::params::PreviewParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format in {0} (only JPEG is accepted)")]
    UnsupportedFormat(String),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// An encoded preview held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub bytes: Vec<u8>,
    /// Prominent colour of the preview as `rrggbb`.
    pub color: String,
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Get image dimensions. Fails on anything that is not a decodable JPEG.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode, resize and encode a preview in memory.
    fn preview(&self, params: &PreviewParams) -> Result<Preview, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub dimensions: HashMap<PathBuf, Dimensions>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Preview {
            source: String,
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every identify call succeeds with the given dimensions for `path`.
        /// Unknown paths fail with a decode error.
        pub fn with_image(mut self, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
            self.dimensions
                .insert(path.into(), Dimensions { width, height });
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn identify_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Identify(_)))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            self.dimensions
                .get(path)
                .copied()
                .ok_or_else(|| BackendError::Decode {
                    path: path.display().to_string(),
                    reason: "no mock image".to_string(),
                })
        }

        fn preview(&self, params: &PreviewParams) -> Result<Preview, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Preview {
                source: params.source.to_string_lossy().to_string(),
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            Ok(Preview {
                bytes: vec![0xff, 0xd8, 0xff, 0xd9],
                color: "808080".to_string(),
            })
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::new().with_image("/test/image.jpg", 800, 600);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_unknown_path_fails() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.identify(Path::new("/missing.jpg")),
            Err(BackendError::Decode { .. })
        ));
    }

    #[test]
    fn mock_records_preview() {
        let backend = MockBackend::new();

        backend
            .preview(&PreviewParams {
                source: "/source.jpg".into(),
                width: 80,
                height: 54,
                quality: super::super::params::Quality::new(70),
            })
            .unwrap();

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Preview {
                width: 80,
                height: 54,
                quality: 70,
                ..
            }
        ));
    }
}
