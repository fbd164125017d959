//! Publishing coordinator.
//!
//! Sequences the parser, the renderer, the index store and the object store.
//! A [`Publisher`] is the one context object holding every handle; it is built
//! at startup and passed around instead of living in globals.
//!
//! ## Save
//!
//! ```text
//! render(markdown) ──► write txn { delete(id)? ; put(page) } ──► upload images
//!   fails: nothing       fails: nothing committed               fails: page is
//!   touched                                                     live, assets not
//! ```
//!
//! `delete` reporting `NotFound` inside the transaction means the save is a
//! creation (`published` = now). A successful delete means a modification: the
//! stored `published` is kept and `modified` = now.
//!
//! ## Delete
//!
//! ```text
//! header lookup ──► write txn { delete(id) } ──► remove objects
//! ```
//!
//! Index removal comes first, so an interrupted delete leaves orphaned objects
//! rather than index entries pointing at missing images.
//!
//! Network calls (render, uploads, removals) run one after another with no
//! retries. Errors after the commit are flagged by
//! [`PublishError::is_post_commit`] so callers can retry just the asset step.

use crate::imaging::{ImageBackend, RustBackend};
use crate::naming;
use crate::objects::{ObjectError, ObjectMeta, ObjectStore};
use crate::parse::{ParseError, ParseSettings, parse_page};
use crate::render::{RenderError, Renderer};
use crate::store::{IndexStore, IndexWriter, StoreError};
use crate::types::Page;
use chrono::{SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
    #[error("Index store error: {0}")]
    Store(StoreError),
    #[error("Post not found: {0}")]
    NotFound(String),
    #[error("Page {page} is published but uploading {key} failed: {source}")]
    Upload {
        page: String,
        key: String,
        #[source]
        source: ObjectError,
    },
    #[error("Page {page} is unpublished but removing {key} failed: {source}")]
    AssetRemoval {
        page: String,
        key: String,
        #[source]
        source: ObjectError,
    },
    #[error("Page {page} is published but reading {} failed: {source}", .path.display())]
    Io {
        page: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<StoreError> for PublishError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => PublishError::NotFound(id),
            other => PublishError::Store(other),
        }
    }
}

impl PublishError {
    /// True when the index store already reflects the operation and only the
    /// object store step failed.
    pub fn is_post_commit(&self) -> bool {
        matches!(
            self,
            PublishError::Upload { .. }
                | PublishError::AssetRemoval { .. }
                | PublishError::Io { .. }
        )
    }
}

/// Whether a save created the page or replaced a stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    /// `replaced` holds the image IDs of the superseded record. Their objects
    /// stay in storage; removing them is up to the caller.
    Modified { replaced: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub parse: ParseSettings,
    /// `max-age` of uploaded objects, in seconds.
    pub cache_max_age: u64,
}

/// The publishing context: index store plus the three external collaborators.
pub struct Publisher<R, O, B = RustBackend> {
    store: IndexStore,
    renderer: R,
    objects: O,
    backend: B,
    settings: PublishSettings,
}

impl<R: Renderer, O: ObjectStore> Publisher<R, O, RustBackend> {
    pub fn new(store: IndexStore, renderer: R, objects: O, settings: PublishSettings) -> Self {
        Self::with_backend(store, renderer, objects, RustBackend::new(), settings)
    }
}

impl<R: Renderer, O: ObjectStore, B: ImageBackend> Publisher<R, O, B> {
    pub fn with_backend(
        store: IndexStore,
        renderer: R,
        objects: O,
        backend: B,
        settings: PublishSettings,
    ) -> Self {
        Self {
            store,
            renderer,
            objects,
            backend,
            settings,
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Parse a page directory with this publisher's image backend and settings.
    pub fn parse(&self, dir: &Path) -> Result<Page, PublishError> {
        Ok(parse_page(dir, &self.backend, &self.settings.parse)?)
    }

    /// Parse and save a page directory in one go.
    pub fn publish(&self, dir: &Path) -> Result<(Page, SaveOutcome), PublishError> {
        let mut page = self.parse(dir)?;
        let outcome = self.save(&mut page)?;
        Ok((page, outcome))
    }

    /// Render, commit and upload a parsed page.
    ///
    /// On success `page` carries the rendered body and the committed
    /// `published`/`modified` stamps. A failure before the commit leaves both
    /// the store and `page` stamps untouched.
    pub fn save(&self, page: &mut Page) -> Result<SaveOutcome, PublishError> {
        let rendered = self.renderer.render(page.markdown.as_bytes())?;
        page.rendered = Some(rendered);

        let previous = (page.published.clone(), page.modified.clone());
        let now = timestamp();
        let outcome = match self.store.write(|w| stage(w, page, &now)) {
            Ok(outcome) => outcome,
            Err(err) => {
                (page.published, page.modified) = previous;
                return Err(err.into());
            }
        };

        tracing::info!(
            page = %page.id,
            outcome = ?outcome,
            published = %page.published,
            modified = %page.modified,
            "Committed page"
        );

        self.upload_images(page)?;
        Ok(outcome)
    }

    /// Remove a page from every index, then its images from object storage.
    ///
    /// Returns the record that was removed.
    pub fn delete(&self, id: &str) -> Result<Page, PublishError> {
        self.store.get_page_header(id)?;
        let page = self.store.delete_page(id)?;
        tracing::info!(page = %id, images = page.images.len(), "Deleted page from index");

        for image in page.images.values() {
            for key in [image.id.clone(), naming::preview_key(&image.id)] {
                self.objects
                    .delete(&key)
                    .map_err(|source| PublishError::AssetRemoval {
                        page: page.id.clone(),
                        key: key.clone(),
                        source,
                    })?;
                tracing::debug!(page = %id, key = %key, "Removed object");
            }
        }
        Ok(page)
    }

    /// Upload full-resolution and preview bytes of every image, in order.
    fn upload_images(&self, page: &Page) -> Result<(), PublishError> {
        let meta = ObjectMeta::public_image(self.settings.cache_max_age);

        for image in page.images.values() {
            let full = fs::read(&image.source).map_err(|source| PublishError::Io {
                page: page.id.clone(),
                path: image.source.clone(),
                source,
            })?;

            let uploads = [
                (image.id.clone(), full.as_slice()),
                (naming::preview_key(&image.id), image.preview.as_slice()),
            ];
            for (key, bytes) in uploads {
                self.objects
                    .put(&key, bytes, &meta)
                    .map_err(|source| PublishError::Upload {
                        page: page.id.clone(),
                        key: key.clone(),
                        source,
                    })?;
                tracing::debug!(
                    page = %page.id,
                    key = %key,
                    bytes = bytes.len(),
                    "Uploaded object"
                );
            }
        }
        Ok(())
    }
}

/// Replace any stored version of `page` and stamp it, inside one transaction.
fn stage(w: &mut IndexWriter<'_>, page: &mut Page, now: &str) -> Result<SaveOutcome, StoreError> {
    let outcome = match w.delete_page(&page.id) {
        Ok(stored) => {
            page.published = stored.published;
            page.modified = now.to_string();
            SaveOutcome::Modified {
                replaced: stored.images.values().map(|image| image.id.clone()).collect(),
            }
        }
        Err(StoreError::NotFound(_)) => {
            page.published = now.to_string();
            page.modified.clear();
            SaveOutcome::Created
        }
        Err(err) => return Err(err),
    };
    w.put_page(page)?;
    Ok(outcome)
}

/// Current UTC time as RFC 3339 with second precision.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::PreviewConfig;
    use crate::objects::MemoryObjectStore;
    use crate::test_helpers::{EchoRenderer, FailingRenderer, write_page_dir, write_sample_page};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn settings() -> PublishSettings {
        PublishSettings {
            parse: ParseSettings {
                cdn_base_url: "https://cdn.test/blog-media".into(),
                preview: PreviewConfig::default(),
            },
            cache_max_age: 0,
        }
    }

    fn publisher_with<R: Renderer, O: ObjectStore>(
        tmp: &TempDir,
        renderer: R,
        objects: O,
    ) -> Publisher<R, O> {
        let store = IndexStore::open(tmp.path().join("blog.redb")).unwrap();
        Publisher::new(store, renderer, objects, settings())
    }

    fn publisher(tmp: &TempDir) -> Publisher<EchoRenderer, MemoryObjectStore> {
        publisher_with(tmp, EchoRenderer, MemoryObjectStore::new())
    }

    /// Object store whose `put` starts failing after `ok_puts` successes.
    struct FlakyStore {
        inner: MemoryObjectStore,
        ok_puts: usize,
        puts: AtomicUsize,
    }

    impl ObjectStore for FlakyStore {
        fn put(&self, key: &str, bytes: &[u8], meta: &ObjectMeta) -> Result<(), ObjectError> {
            if self.puts.fetch_add(1, Ordering::SeqCst) >= self.ok_puts {
                return Err(ObjectError::Io {
                    key: key.to_string(),
                    source: std::io::Error::other("connection reset"),
                });
            }
            self.inner.put(key, bytes, meta)
        }

        fn delete(&self, key: &str) -> Result<(), ObjectError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn first_save_creates() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);
        let dir = write_sample_page(tmp.path(), "blog-test");

        let (page, outcome) = publisher.publish(&dir).unwrap();

        assert_eq!(outcome, SaveOutcome::Created);
        assert!(page.is_published());
        assert!(page.modified.is_empty());

        let stored = publisher.store().get_page("blog-test").unwrap();
        assert_eq!(stored.published, page.published);
        assert!(stored.modified.is_empty());
        let body = publisher.store().get_page_body("blog-test").unwrap();
        assert!(body.starts_with(b"<rendered>"));
    }

    #[test]
    fn second_save_modifies_and_keeps_published() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);
        let dir = write_sample_page(tmp.path(), "blog-test");

        let (first, _) = publisher.publish(&dir).unwrap();
        let (second, outcome) = publisher.publish(&dir).unwrap();

        let first_ids: Vec<String> = first.images.values().map(|i| i.id.clone()).collect();
        assert_eq!(outcome, SaveOutcome::Modified { replaced: first_ids.clone() });
        assert_eq!(first_ids.len(), 2);
        for id in &first_ids {
            assert!(publisher.objects().contains(id));
            assert!(second.images.values().all(|i| &i.id != id));
        }
        assert_eq!(second.published, first.published);
        assert!(!second.modified.is_empty());

        let stored = publisher.store().get_page("blog-test").unwrap();
        assert_eq!(stored.published, first.published);
        assert_eq!(stored.modified, second.modified);
        assert_eq!(publisher.store().page_ids().unwrap(), vec!["blog-test"]);
        assert_eq!(publisher.store().all_tags().unwrap()["hello"], 1);
    }

    #[test]
    fn update_drops_stale_index_entries() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);
        let dir = write_page_dir(tmp.path(), "p", "# Old title\n\n## D\n\n[tags]: old, kept\n");
        publisher.publish(&dir).unwrap();

        fs::write(dir.join("content.md"), "# New title\n\n## D\n\n[tags]: kept, new\n").unwrap();
        publisher.publish(&dir).unwrap();

        let store = publisher.store();
        let tags = store.all_tags().unwrap();
        assert_eq!(tags.keys().collect::<Vec<_>>(), vec!["kept", "new"]);
        assert!(store.search_pages(&["old title"]).unwrap().is_empty());
        assert_eq!(store.search_pages(&["new title"]).unwrap().len(), 1);
        assert_eq!(store.recent_pages(10).unwrap().len(), 1);
    }

    #[test]
    fn save_uploads_full_and_preview_objects() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);
        let dir = write_sample_page(tmp.path(), "blog-test");

        let (page, _) = publisher.publish(&dir).unwrap();

        let objects = publisher.objects();
        assert_eq!(objects.len(), 4);
        for image in page.images.values() {
            let full = objects.get(&image.id).unwrap();
            assert_eq!(full.bytes, fs::read(&image.source).unwrap());
            assert_eq!(full.meta, ObjectMeta::public_image(0));

            let preview = objects.get(&naming::preview_key(&image.id)).unwrap();
            assert_eq!(preview.bytes, image.preview);
            assert_eq!(preview.meta.content_type, "image/jpeg");
        }
    }

    #[test]
    fn render_failure_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher_with(&tmp, FailingRenderer, MemoryObjectStore::new());
        let dir = write_sample_page(tmp.path(), "blog-test");

        let err = publisher.publish(&dir).unwrap_err();

        assert!(matches!(err, PublishError::Render(_)));
        assert!(!err.is_post_commit());
        assert!(publisher.store().page_ids().unwrap().is_empty());
        assert!(publisher.objects().is_empty());
    }

    #[test]
    fn upload_failure_keeps_page_committed() {
        let tmp = TempDir::new().unwrap();
        let flaky = FlakyStore {
            inner: MemoryObjectStore::new(),
            ok_puts: 1,
            puts: AtomicUsize::new(0),
        };
        let publisher = publisher_with(&tmp, EchoRenderer, flaky);
        let dir = write_sample_page(tmp.path(), "blog-test");

        let err = publisher.publish(&dir).unwrap_err();

        match &err {
            PublishError::Upload { page, key, .. } => {
                assert_eq!(page, "blog-test");
                assert!(key.starts_with("preview_"));
            }
            other => panic!("expected upload error, got {other:?}"),
        }
        assert!(err.is_post_commit());
        assert!(publisher.store().get_page("blog-test").is_ok());
        assert_eq!(publisher.objects().inner.len(), 1);
    }

    #[test]
    fn parse_failure_is_reported_before_anything_else() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);
        let dir = write_page_dir(tmp.path(), "p", "## no title\n\n[tags]: a\n");

        let err = publisher.publish(&dir).unwrap_err();
        assert!(matches!(err, PublishError::Parse(ParseError::MissingTitle(_))));
        assert!(publisher.store().page_ids().unwrap().is_empty());
    }

    #[test]
    fn stale_stamps_on_a_new_page_are_replaced() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);
        let dir = write_page_dir(tmp.path(), "p", "# T\n\n## D\n\n[tags]: a\n");
        let mut page = publisher.parse(&dir).unwrap();
        page.published = "1999-01-01T00:00:00Z".into();
        page.modified = "1999-01-02T00:00:00Z".into();

        assert_eq!(publisher.save(&mut page).unwrap(), SaveOutcome::Created);
        assert_ne!(page.published, "1999-01-01T00:00:00Z");
        assert!(page.modified.is_empty());
    }

    #[test]
    fn delete_removes_index_entries_and_objects() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);
        let dir = write_sample_page(tmp.path(), "blog-test");
        publisher.publish(&dir).unwrap();

        let removed = publisher.delete("blog-test").unwrap();

        assert_eq!(removed.id, "blog-test");
        let store = publisher.store();
        assert!(store.get_page("blog-test").unwrap_err().is_not_found());
        assert!(store.search_pages(&["hello"]).unwrap().is_empty());
        assert!(store.all_tags().unwrap().is_empty());
        assert!(store.pages_by_tag("hello").unwrap().is_empty());
        assert!(publisher.objects().is_empty());
    }

    #[test]
    fn delete_missing_page_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);

        let err = publisher.delete("nope").unwrap_err();
        assert!(matches!(err, PublishError::NotFound(ref id) if id == "nope"));
        assert!(!err.is_post_commit());
    }

    #[test]
    fn delete_reports_missing_objects_after_index_removal() {
        let tmp = TempDir::new().unwrap();
        let publisher = publisher(&tmp);
        let dir = write_sample_page(tmp.path(), "blog-test");
        let (page, _) = publisher.publish(&dir).unwrap();
        let first = page.images.values().next().unwrap();
        publisher.objects().delete(&first.id).unwrap();

        let err = publisher.delete("blog-test").unwrap_err();

        assert!(matches!(err, PublishError::AssetRemoval { ref key, .. } if *key == first.id));
        assert!(err.is_post_commit());
        assert!(publisher.store().get_page("blog-test").unwrap_err().is_not_found());
    }

    #[test]
    fn timestamps_are_rfc3339_seconds_utc() {
        let ts = timestamp();
        assert_eq!(ts.len(), "2024-01-01T00:00:00Z".len());
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
