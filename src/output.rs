//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! The primary display for a page is its title and ID; stamps, tags and images
//! follow as indented context lines. Lists number their entries so the output
//! reads as an inventory.
//!
//! # Output Format
//!
//! ## Publish
//!
//! ```text
//! Created blog-test (2 images)
//!     Published: 2024-05-01T10:00:00Z
//! ```
//!
//! ## Show
//!
//! ```text
//! Hello, world (blog-test)
//!     Description: A test blog
//!     Published: 2024-05-01T10:00:00Z
//!     Tags: hello, world, more-tags
//!     Images:
//!         sample_a.jpg → 3f2a….jpg (600x408, #7f6a52)
//! ```
//!
//! ## Lists (search, tagged, recent)
//!
//! ```text
//! 001 Hello, world (blog-test)
//!     Published: 2024-05-01T10:00:00Z
//! ```
//!
//! ## Tags
//!
//! ```text
//! hello (1 page)
//! rust (3 pages)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure — no I/O, no side effects.

use crate::publish::SaveOutcome;
use crate::types::Page;
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// `Published:` and, when set, `Modified:` lines.
fn stamp_lines(page: &Page, depth: usize) -> Vec<String> {
    let mut lines = vec![format!("{}Published: {}", indent(depth), page.published)];
    if !page.modified.is_empty() {
        lines.push(format!("{}Modified: {}", indent(depth), page.modified));
    }
    lines
}

// ============================================================================
// Publish / delete
// ============================================================================

pub fn format_save(page: &Page, outcome: &SaveOutcome) -> Vec<String> {
    let verb = match outcome {
        SaveOutcome::Created => "Created",
        SaveOutcome::Modified { .. } => "Updated",
    };
    let mut lines = vec![format!(
        "{verb} {} ({})",
        page.id,
        plural(page.images.len(), "image", "images")
    )];
    lines.extend(stamp_lines(page, 1));
    if let SaveOutcome::Modified { replaced } = outcome
        && !replaced.is_empty()
    {
        lines.push(format!("{}Superseded: {}", indent(1), replaced.join(", ")));
    }
    lines
}

/// A page directory that could not be published.
pub fn format_failure(dir: &Path, error: &dyn std::error::Error) -> Vec<String> {
    let mut lines = vec![format!("Failed {}", dir.display())];
    lines.push(format!("{}Error: {error}", indent(1)));
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(format!("{}Caused by: {cause}", indent(2)));
        source = cause.source();
    }
    lines
}

pub fn format_delete(page: &Page) -> Vec<String> {
    vec![format!(
        "Deleted {} ({} removed)",
        page.id,
        plural(page.images.len() * 2, "object", "objects")
    )]
}

// ============================================================================
// Queries
// ============================================================================

/// Full detail of one page.
pub fn format_page(page: &Page) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", page.title, page.id)];
    lines.push(format!("{}Description: {}", indent(1), page.desc));
    lines.extend(stamp_lines(page, 1));
    lines.push(format!("{}Tags: {}", indent(1), page.tags.join(", ")));
    if !page.images.is_empty() {
        lines.push(format!("{}Images:", indent(1)));
        for (reference, image) in page.images.iter() {
            let color = if image.color.is_empty() {
                String::new()
            } else {
                format!(", #{}", image.color)
            };
            lines.push(format!(
                "{}{reference} → {} ({}x{}{color})",
                indent(2),
                image.id,
                image.width,
                image.height
            ));
        }
    }
    lines
}

/// Numbered page list, or `No pages` when empty.
pub fn format_page_list(pages: &[Page]) -> Vec<String> {
    if pages.is_empty() {
        return vec!["No pages".to_string()];
    }
    let mut lines = Vec::new();
    for (i, page) in pages.iter().enumerate() {
        lines.push(format!("{} {} ({})", format_index(i + 1), page.title, page.id));
        lines.extend(stamp_lines(page, 1));
    }
    lines
}

pub fn format_tags(tags: &BTreeMap<String, usize>) -> Vec<String> {
    if tags.is_empty() {
        return vec!["No tags".to_string()];
    }
    tags.iter()
        .map(|(tag, count)| format!("{tag} ({})", plural(*count, "page", "pages")))
        .collect()
}

// ============================================================================
// Print wrappers
// ============================================================================

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

pub fn print_save(page: &Page, outcome: &SaveOutcome) {
    print_lines(&format_save(page, outcome));
}

pub fn print_failure(dir: &Path, error: &dyn std::error::Error) {
    print_lines(&format_failure(dir, error));
}

pub fn print_delete(page: &Page) {
    print_lines(&format_delete(page));
}

pub fn print_page(page: &Page) {
    print_lines(&format_page(page));
}

pub fn print_page_list(pages: &[Page]) {
    print_lines(&format_page_list(pages));
}

pub fn print_tags(tags: &BTreeMap<String, usize>) {
    print_lines(&format_tags(tags));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Image;

    fn sample_page() -> Page {
        let mut page = Page {
            id: "blog-test".into(),
            published: "2024-05-01T10:00:00Z".into(),
            title: "Hello, world".into(),
            desc: "A test blog".into(),
            tags: vec!["hello".into(), "world".into()],
            ..Page::default()
        };
        page.images.insert(
            "sample_a.jpg",
            Image {
                id: "abc.jpg".into(),
                width: 600,
                height: 408,
                color: "7f6a52".into(),
                ..Image::default()
            },
        );
        page
    }

    #[test]
    fn save_created_line() {
        let lines = format_save(&sample_page(), &SaveOutcome::Created);
        assert_eq!(lines[0], "Created blog-test (1 image)");
        assert_eq!(lines[1], "    Published: 2024-05-01T10:00:00Z");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn save_modified_shows_both_stamps() {
        let mut page = sample_page();
        page.modified = "2024-05-02T08:00:00Z".into();
        let lines = format_save(&page, &SaveOutcome::Modified { replaced: vec![] });
        assert_eq!(lines[0], "Updated blog-test (1 image)");
        assert_eq!(lines[2], "    Modified: 2024-05-02T08:00:00Z");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn save_modified_lists_superseded_images() {
        let mut page = sample_page();
        page.modified = "2024-05-02T08:00:00Z".into();
        let outcome = SaveOutcome::Modified {
            replaced: vec!["old1.jpg".into(), "old2.jpg".into()],
        };
        let lines = format_save(&page, &outcome);
        assert_eq!(lines[3], "    Superseded: old1.jpg, old2.jpg");
    }

    #[test]
    fn delete_counts_objects() {
        let lines = format_delete(&sample_page());
        assert_eq!(lines, vec!["Deleted blog-test (2 objects removed)"]);
    }

    #[test]
    fn page_detail() {
        let lines = format_page(&sample_page());
        assert_eq!(lines[0], "Hello, world (blog-test)");
        assert_eq!(lines[1], "    Description: A test blog");
        assert!(lines.contains(&"    Tags: hello, world".to_string()));
        assert!(lines.contains(&"        sample_a.jpg → abc.jpg (600x408, #7f6a52)".to_string()));
    }

    #[test]
    fn page_detail_without_images_has_no_images_header() {
        let mut page = sample_page();
        page.images = Default::default();
        let lines = format_page(&page);
        assert!(!lines.iter().any(|l| l.contains("Images:")));
    }

    #[test]
    fn page_list_numbers_entries() {
        let mut second = sample_page();
        second.id = "other".into();
        second.title = "Other".into();
        let lines = format_page_list(&[sample_page(), second]);
        assert_eq!(lines[0], "001 Hello, world (blog-test)");
        assert_eq!(lines[2], "002 Other (other)");
    }

    #[test]
    fn empty_page_list() {
        assert_eq!(format_page_list(&[]), vec!["No pages"]);
    }

    #[test]
    fn tags_with_counts() {
        let tags = BTreeMap::from([("hello".to_string(), 1), ("rust".to_string(), 3)]);
        assert_eq!(format_tags(&tags), vec!["hello (1 page)", "rust (3 pages)"]);
        assert_eq!(format_tags(&BTreeMap::new()), vec!["No tags"]);
    }

    #[test]
    fn failure_lists_causes() {
        let inner = std::io::Error::other("disk full");
        let err = crate::objects::ObjectError::Io {
            key: "a.jpg".into(),
            source: inner,
        };
        let lines = format_failure(Path::new("content/p"), &err);
        assert_eq!(lines[0], "Failed content/p");
        assert!(lines[1].starts_with("    Error: IO error on object a.jpg"));
        assert_eq!(lines[2], "        Caused by: disk full");
    }
}
