//! Shared test utilities for the folio test suite.
//!
//! Provides synthetic JPEG fixtures, a page-directory builder and stub
//! collaborators for the render step.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let dir = write_sample_page(tmp.path(), "blog-test");
//! let page = parse_page(&dir, &RustBackend::new(), &settings).unwrap();
//! ```

use crate::render::{RenderError, Renderer};
use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Fixture setup
// =========================================================================

/// The reference document: title, description, one image used twice, one in
/// a sub-directory, one hot link and three tags.
pub const SAMPLE_MARKDOWN: &str = "# Hello, world

## A test blog

Some words ![first](sample_a.jpg) and more.

![second](img/sample_b.jpg)

Again: ![first again](sample_a.jpg \"same file\")

![remote](https://example.com/remote.jpg)

[tags]: hello, world, more-tags
";

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create `<root>/<name>/content.md` holding `markdown`. Returns the page directory.
pub fn write_page_dir(root: &Path, name: &str, markdown: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("content.md"), markdown).unwrap();
    dir
}

/// [`SAMPLE_MARKDOWN`] plus real JPEGs for both local references.
pub fn write_sample_page(root: &Path, name: &str) -> PathBuf {
    let dir = write_page_dir(root, name, SAMPLE_MARKDOWN);
    create_test_jpeg(&dir.join("sample_a.jpg"), 600, 408);
    create_test_jpeg(&dir.join("img/sample_b.jpg"), 320, 240);
    dir
}

// =========================================================================
// Stub collaborators
// =========================================================================

/// Renderer that wraps the Markdown in a marker instead of converting it.
pub struct EchoRenderer;

impl Renderer for EchoRenderer {
    fn render(&self, markdown: &[u8]) -> Result<Vec<u8>, RenderError> {
        let mut out = b"<rendered>".to_vec();
        out.extend_from_slice(markdown);
        Ok(out)
    }
}

/// Renderer that always fails, as a remote renderer returning non-200 would.
pub struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn render(&self, _markdown: &[u8]) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Rejected("503 Service Unavailable".into()))
    }
}
