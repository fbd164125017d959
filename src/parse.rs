//! Page directory parsing.
//!
//! Turns one source directory into a validated [`Page`]. Parsing has no side
//! effects beyond reading files: nothing is stored or uploaded here.
//!
//! ## Directory Structure
//!
//! ```text
//! content/
//! └── blog-test/                 # Page ID = directory name
//!     ├── content.md             # The document (first *.md by name)
//!     ├── sample_a.jpg           # Referenced images (JPEG)
//!     └── img/sample_b.jpg
//! ```
//!
//! ## Document Conventions
//!
//! ```markdown
//! # Hello, world                 <- title (required)
//!
//! ## A test blog                 <- description (required)
//!
//! Some text ![a](sample_a.jpg)   <- local image, processed + rewritten to the CDN
//! ![b](https://x.org/b.jpg)      <- hot-linked image, left alone
//!
//! [tags]: hello, world, more-tags   <- tags (at least one line required)
//! ```
//!
//! The title and description lines are removed from the working Markdown
//! (each with one following blank line). Every local image reference is
//! processed once, however many times it appears, and the target of every
//! image reference to it is rewritten to the image's CDN URL in a single pass,
//! so rewritten URLs are never matched again.

use crate::imaging::{BackendError, ImageBackend, PreviewConfig, process_image};
use crate::naming;
use crate::types::{ImageMap, Page};
use rayon::prelude::*;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").unwrap());
static DESC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^## (.+)$").unwrap());
static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"!\[[^\]]*\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#).unwrap());
static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[tags\]:[ \t]*(.*)$").unwrap());

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No markdown document in {0}")]
    NoMarkdown(PathBuf),
    #[error("Cannot derive a page ID from {0}")]
    InvalidSlug(PathBuf),
    #[error("{0}: markdown missing top level header (title)")]
    MissingTitle(PathBuf),
    #[error("{0}: markdown missing second level header (description)")]
    MissingDescription(PathBuf),
    #[error("{0}: markdown missing tags")]
    MissingTags(PathBuf),
    #[error("Image {reference} in {page}: {source}")]
    Image {
        page: String,
        reference: String,
        #[source]
        source: BackendError,
    },
}

/// Settings the parser needs to build final asset URLs and previews.
#[derive(Debug, Clone)]
pub struct ParseSettings {
    /// Base URL images are served from; references are rewritten to `<base>/<image-id>`.
    pub cdn_base_url: String,
    pub preview: PreviewConfig,
}

/// Parse a page directory into a [`Page`].
///
/// The returned page has `markdown` set and no `rendered` body, `published`
/// or `modified` stamps; those come from [`Publisher::save`](crate::publish::Publisher::save).
pub fn parse_page(
    dir: &Path,
    backend: &impl ImageBackend,
    settings: &ParseSettings,
) -> Result<Page, ParseError> {
    let id = naming::slug_for_dir(dir).ok_or_else(|| ParseError::InvalidSlug(dir.to_path_buf()))?;
    let md_path = find_markdown(dir)?;
    let mut buf = fs::read_to_string(&md_path)?;

    let title = take_heading(&TITLE, &mut buf)
        .ok_or_else(|| ParseError::MissingTitle(md_path.clone()))?;
    let desc = take_heading(&DESC, &mut buf)
        .ok_or_else(|| ParseError::MissingDescription(md_path.clone()))?;

    let images = process_references(&id, dir, &mut buf, backend, settings)?;

    let tags = parse_tags(&buf);
    if tags.is_empty() {
        return Err(ParseError::MissingTags(md_path));
    }

    tracing::info!(
        page = %id,
        title = %title,
        tags = tags.len(),
        images = images.len(),
        "Parsed page"
    );

    Ok(Page {
        id,
        title,
        desc,
        tags,
        images,
        markdown: buf,
        ..Page::default()
    })
}

/// Pick the page's Markdown document: lexicographically first `*.md`.
fn find_markdown(dir: &Path) -> Result<PathBuf, ParseError> {
    let mut md_files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
        })
        .collect();

    md_files.sort();

    if md_files.len() > 1 {
        tracing::warn!(
            dir = %dir.display(),
            candidates = md_files.len(),
            chosen = %md_files[0].display(),
            "Multiple markdown files, using the first"
        );
    }
    md_files
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::NoMarkdown(dir.to_path_buf()))
}

/// Extract the first heading matching `re` and cut its line (plus line break
/// and one directly following blank line) out of `buf`.
fn take_heading(re: &Regex, buf: &mut String) -> Option<String> {
    let caps = re.captures(buf)?;
    let line = caps.get(0)?;
    let text = caps.get(1)?.as_str().trim().to_string();
    if text.is_empty() {
        return None;
    }

    let start = line.start();
    let mut end = skip_line_break(buf, line.end());
    if end > line.end() {
        end = skip_line_break(buf, end);
    }
    buf.replace_range(start..end, "");
    Some(text)
}

/// Index just past a `\n` or `\r\n` at `at`, or `at` itself if there is none.
fn skip_line_break(buf: &str, at: usize) -> usize {
    let rest = &buf[at..];
    if rest.starts_with("\r\n") {
        at + 2
    } else if rest.starts_with('\n') {
        at + 1
    } else {
        at
    }
}

/// Local image references in first-seen order, duplicates and hot links removed.
fn local_references(buf: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for caps in IMAGE_REF.captures_iter(buf) {
        let reference = &caps[1];
        if naming::is_remote_reference(reference) || refs.iter().any(|r| r == reference) {
            continue;
        }
        refs.push(reference.to_string());
    }
    refs
}

/// Process every local image once and rewrite its references to the CDN URL.
///
/// Decoding runs on the rayon pool; each image owns its buffers, so nothing is
/// shared between workers.
fn process_references(
    page_id: &str,
    dir: &Path,
    buf: &mut String,
    backend: &impl ImageBackend,
    settings: &ParseSettings,
) -> Result<ImageMap, ParseError> {
    let refs = local_references(buf);

    let processed = refs
        .par_iter()
        .map(|reference| {
            process_image(backend, &dir.join(reference), &settings.preview).map_err(|source| {
                ParseError::Image {
                    page: page_id.to_string(),
                    reference: reference.clone(),
                    source,
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut images = ImageMap::new();
    for (reference, image) in refs.into_iter().zip(processed) {
        images.insert(reference, image);
    }
    *buf = rewrite_references(buf, &images, &settings.cdn_base_url);
    Ok(images)
}

/// Replace the target of each image reference found in `images` with its CDN
/// URL. Alt text, titles and hot links are kept as written.
fn rewrite_references(buf: &str, images: &ImageMap, cdn_base_url: &str) -> String {
    IMAGE_REF
        .replace_all(buf, |caps: &Captures| {
            let whole = &caps[0];
            let Some(target) = caps.get(1) else {
                return whole.to_string();
            };
            let Some(image) = images.get(target.as_str()) else {
                return whole.to_string();
            };
            let offset = caps.get(0).map_or(0, |m| m.start());
            let (start, end) = (target.start() - offset, target.end() - offset);
            format!(
                "{}{}{}",
                &whole[..start],
                naming::object_url(cdn_base_url, &image.id),
                &whole[end..]
            )
        })
        .into_owned()
}

/// Collect tags from every `[tags]:` line: comma separated, trimmed,
/// lower-cased, empties and repeats dropped.
fn parse_tags(buf: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for caps in TAGS.captures_iter(buf) {
        for tag in caps[1].split(',') {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}
