//! # Folio
//!
//! Persistence and indexing core of a single-author blog. A page is a
//! directory holding one Markdown document and the JPEGs it references; Folio
//! turns it into a page record, keeps five coupled indexes over it in an
//! embedded database, and pushes its images to object storage.
//!
//! # Architecture: Parse → Render → Commit → Upload
//!
//! ```text
//! content/blog-test/  ──parse──►  Page  ──render──►  HTML body
//!                                                        │
//!        objects/<id>, objects/preview_<id>  ◄──upload── commit (one write txn)
//! ```
//!
//! Deletion runs the other way: the index entries go in one transaction, then
//! the objects are removed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`parse`] | Page directory → [`types::Page`]: title, description, tags, image rewriting |
//! | [`imaging`] | JPEG decode, preview generation, prominent colour |
//! | [`store`] | redb index store: `pages`, `html`, `tags`, `search`, `by-date` |
//! | [`publish`] | Coordinator: render, commit, upload; delete in reverse |
//! | [`render`] | Markdown renderer trait + local CommonMark renderer |
//! | [`objects`] | Object storage trait + filesystem and in-memory stores |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`types`] | `Page`, `Image` and the ordered image map |
//! | [`naming`] | Page slugs, image IDs, object keys and CDN URLs |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Transaction per Operation
//!
//! Every store operation runs in exactly one redb transaction. An update is a
//! delete of the stored record followed by a put, inside the same write
//! transaction, so no reader ever sees the old and new index entries side by
//! side. redb allows one writer at a time alongside any number of snapshot
//! readers, which matches a single author publishing from one machine.
//!
//! ## The Commit Is the Durability Boundary
//!
//! Object storage has no transactions, so uploads run after the commit. A
//! failed upload leaves the page live with missing assets and is reported as a
//! post-commit error the caller can retry; the commit is never rolled back.
//!
//! ## Multimap Secondary Indexes
//!
//! Tags, search keys and publish dates map to *sets* of page IDs. Two pages
//! with the same title or the same publish second never overwrite each other,
//! and a tag group disappears with its last member.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod objects;
pub mod output;
pub mod parse;
pub mod publish;
pub mod render;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
