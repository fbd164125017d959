//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Format sniffing | `image::guess_format` on the first bytes of the file |
//! | Identify | `ImageReader::into_dimensions` (header only, no full decode) |
//! | Decode | `image` crate JPEG decoder |
//! | Resize | `DynamicImage::resize_exact` with `Nearest` (fast, deterministic) |
//! | Encode | `image::codecs::jpeg::JpegEncoder` into a `Vec<u8>` |
//! | Prominent colour | [`color::prominent_color`](super::color::prominent_color) on the preview |

use super::backend::{BackendError, Dimensions, ImageBackend, Preview};
use super::color::prominent_color;
use super::params::PreviewParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Open `path` and confirm its content is JPEG, whatever the extension says.
///
/// The magic bytes decide; `ImageReader::open` alone would trust a `.jpg`
/// extension on a file that is not an image at all.
fn open_jpeg(path: &Path) -> Result<ImageReader<BufReader<File>>, BackendError> {
    let mut header = Vec::with_capacity(16);
    File::open(path)?.take(16).read_to_end(&mut header)?;
    if !matches!(image::guess_format(&header), Ok(ImageFormat::Jpeg)) {
        return Err(BackendError::UnsupportedFormat(path.display().to_string()));
    }

    let mut reader = ImageReader::open(path)?;
    reader.set_format(ImageFormat::Jpeg);
    Ok(reader)
}

fn decode_error(path: &Path, err: image::ImageError) -> BackendError {
    BackendError::Decode {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = open_jpeg(path)?
            .into_dimensions()
            .map_err(|e| decode_error(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn preview(&self, params: &PreviewParams) -> Result<Preview, BackendError> {
        let img = open_jpeg(&params.source)?
            .decode()
            .map_err(|e| decode_error(&params.source, e))?;

        let rgb = img
            .resize_exact(params.width, params.height, FilterType::Nearest)
            .to_rgb8();
        let color = prominent_color(&rgb).unwrap_or_default();

        let mut bytes = Vec::new();
        let quality = u8::try_from(params.quality.value()).unwrap_or(100);
        let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;

        Ok(Preview { bytes, color })
    }
}
