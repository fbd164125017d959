//! Asset pipeline: local image → [`Image`](crate::types::Image) descriptor.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Preview** | `resize_exact` (Nearest) + JPEG encode to memory |
//! | **Prominent colour** | 4-bit-per-channel histogram over the preview |
//! | **ID** | UUIDv4 + `.jpg` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`process_image`], combining calculations + backend
//!
//! No network I/O happens here; uploading is the coordinator's job.

pub mod backend;
mod calculations;
mod color;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, Preview};
pub use calculations::calculate_preview_dimensions;
pub use operations::{PreviewConfig, process_image};
pub use params::{PreviewParams, Quality};
pub use rust_backend::RustBackend;
