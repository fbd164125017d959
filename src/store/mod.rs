//! Transactional multi-index page store on redb.
//!
//! One `.redb` file holds five coupled index regions (see [`tables`]). Every
//! operation runs in exactly one transaction:
//!
//! - [`IndexStore::read`] — snapshot read; any number run concurrently and
//!   none ever observes a half-applied write.
//! - [`IndexStore::write`] — the single writer. redb serializes write
//!   transactions across the whole database, so page writes are mutually
//!   exclusive store-wide. All changes made in the closure commit together or
//!   not at all.
//!
//! The convenience methods below each wrap one transaction. Composite updates
//! (the coordinator's delete-then-put) call [`IndexStore::write`] directly and
//! use the [`IndexWriter`] operations inside a single closure.

mod error;
pub mod tables;

pub use error::{Result, StoreError};
pub use tables::{IndexReader, IndexWriter};

use crate::types::Page;
use redb::Database;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Handle to the embedded index database.
pub struct IndexStore {
    db: Database,
    path: PathBuf,
}

impl IndexStore {
    /// Create or open the store at `path`, creating parent directories and
    /// any missing index tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path)?;

        let write_txn = db.begin_write()?;
        tables::create_tables(&write_txn)?;
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened index store");
        Ok(Self { db, path })
    }

    /// Get the file path of this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against one read snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&IndexReader) -> Result<T>) -> Result<T> {
        let txn = self.db.begin_read()?;
        let reader = IndexReader::open(&txn)?;
        f(&reader)
    }

    /// Run `f` inside the write transaction and commit if it returns `Ok`.
    ///
    /// Returning `Err` from `f` drops the transaction, which aborts it.
    pub fn write<T>(&self, f: impl FnOnce(&mut IndexWriter<'_>) -> Result<T>) -> Result<T> {
        let txn = self.db.begin_write()?;
        let value = {
            let mut writer = IndexWriter::open(&txn)?;
            f(&mut writer)?
        };
        txn.commit()?;
        Ok(value)
    }

    /// Index a page that is not stored yet.
    pub fn put_page(&self, page: &Page) -> Result<()> {
        self.write(|w| w.put_page(page))
    }

    /// Remove a page from every index, returning its last stored record.
    pub fn delete_page(&self, id: &str) -> Result<Page> {
        self.write(|w| w.delete_page(id))
    }

    pub fn get_page(&self, id: &str) -> Result<Page> {
        self.read(|r| r.page(id))
    }

    /// Raw JSON record, for callers that pass it straight through.
    pub fn get_page_header(&self, id: &str) -> Result<Vec<u8>> {
        self.read(|r| r.page_header(id))
    }

    pub fn get_page_body(&self, id: &str) -> Result<Vec<u8>> {
        self.read(|r| r.body(id))
    }

    pub fn search_pages(&self, keywords: &[impl AsRef<str>]) -> Result<Vec<Page>> {
        self.read(|r| r.search(keywords))
    }

    pub fn all_tags(&self) -> Result<BTreeMap<String, usize>> {
        self.read(|r| r.all_tags())
    }

    pub fn pages_by_tag(&self, tag: &str) -> Result<Vec<Page>> {
        self.read(|r| r.pages_by_tag(tag))
    }

    pub fn recent_pages(&self, limit: usize) -> Result<Vec<Page>> {
        self.read(|r| r.recent(limit))
    }

    pub fn page_ids(&self) -> Result<Vec<String>> {
        self.read(|r| r.page_ids())
    }
}
