//! Identifier and key conventions.
//!
//! ## Page IDs
//!
//! A page's ID is the base name of its source directory, so re-parsing the
//! same directory always yields the same ID and a save becomes an update:
//! - `content/hello-world/` → `hello-world`
//! - `content/2024-trip/` → `2024-trip`
//!
//! ## Image IDs and object keys
//!
//! Image IDs are random (UUIDv4, simple form) with a fixed `.jpg` extension.
//! Each image is stored twice in object storage:
//! - `<image-id>` — full resolution
//! - `preview_<image-id>` — downscaled preview

use std::path::Path;
use uuid::Uuid;

/// Extension appended to every generated image ID.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Object-key prefix of preview images.
pub const PREVIEW_PREFIX: &str = "preview_";

/// Derive the page slug from its source directory.
///
/// The slug is the directory's base name as written. Returns `None` when the
/// path has no final component (`/`, `..`) or the name is not UTF-8.
pub fn slug_for_dir(dir: &Path) -> Option<String> {
    let name = dir.file_name()?.to_str()?;
    is_valid_slug(name).then(|| name.to_string())
}

/// Any single path component: non-empty, not `.` or `..`, no `/` or NUL.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug != "." && slug != ".." && !slug.contains(['/', '\0'])
}

/// Generate a fresh image ID. Collision-resistant across threads and processes.
pub fn new_image_id() -> String {
    format!("{}.{}", Uuid::new_v4().simple(), IMAGE_EXTENSION)
}

/// Object key of an image's preview.
pub fn preview_key(image_id: &str) -> String {
    format!("{PREVIEW_PREFIX}{image_id}")
}

/// Public URL of an object under the CDN base.
pub fn object_url(cdn_base_url: &str, key: &str) -> String {
    format!("{}/{}", cdn_base_url.trim_end_matches('/'), key)
}

/// True when an image reference points at an already-hosted resource:
/// it starts with a URL scheme (`https:`, `data:`) or is protocol-relative (`//`).
pub fn is_remote_reference(reference: &str) -> bool {
    if reference.starts_with("//") {
        return true;
    }
    let Some(colon) = reference.find(':') else {
        return false;
    };
    let scheme = &reference[..colon];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
