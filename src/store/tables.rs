//! The five index regions and their transactional views.
//!
//! | Table | Kind | Key → Value |
//! |---|---|---|
//! | `pages` | table | page ID → JSON page record |
//! | `html` | table | page ID → rendered body |
//! | `tags` | multimap | tag → {page ID} (one tag group per key) |
//! | `search` | multimap | lower-cased title / description → {page ID} |
//! | `by-date` | multimap | RFC 3339 `published` → {page ID} |
//!
//! The secondary indexes are multimaps so two pages sharing a title or a
//! publish second never overwrite each other. A tag group is the value set
//! under its key: removing the last member removes the key, so an empty group
//! cannot exist.
//!
//! [`IndexWriter`] applies one page's full index delta inside a write
//! transaction; [`IndexReader`] answers queries from one read snapshot.

use super::error::{Result, StoreError};
use crate::types::Page;
use redb::{
    MultimapTable, MultimapTableDefinition, ReadOnlyMultimapTable, ReadOnlyTable, ReadTransaction,
    ReadableMultimapTable, ReadableTable, Table, TableDefinition, WriteTransaction,
};
use std::collections::{BTreeMap, HashSet};

pub(crate) const PAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("pages");
pub(crate) const HTML: TableDefinition<&str, &[u8]> = TableDefinition::new("html");
pub(crate) const TAGS: MultimapTableDefinition<&str, &str> = MultimapTableDefinition::new("tags");
pub(crate) const SEARCH: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("search");
pub(crate) const BY_DATE: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("by-date");

/// Create every table so read transactions never see a missing one.
pub(crate) fn create_tables(txn: &WriteTransaction) -> Result<()> {
    txn.open_table(PAGES)?;
    txn.open_table(HTML)?;
    txn.open_multimap_table(TAGS)?;
    txn.open_multimap_table(SEARCH)?;
    txn.open_multimap_table(BY_DATE)?;
    Ok(())
}

fn decode_page(raw: &[u8]) -> Result<Page> {
    Ok(serde_json::from_slice(raw)?)
}

// =========================================================================
// Write side
// =========================================================================

/// All index tables opened inside one write transaction.
///
/// Nothing written through a writer is visible to readers until the
/// surrounding [`IndexStore::write`](super::IndexStore::write) commits; an
/// error returned from the closure aborts every change made here.
pub struct IndexWriter<'txn> {
    pages: Table<'txn, &'static str, &'static [u8]>,
    html: Table<'txn, &'static str, &'static [u8]>,
    tags: MultimapTable<'txn, &'static str, &'static str>,
    search: MultimapTable<'txn, &'static str, &'static str>,
    by_date: MultimapTable<'txn, &'static str, &'static str>,
}

impl<'txn> IndexWriter<'txn> {
    pub(crate) fn open(txn: &'txn WriteTransaction) -> Result<Self> {
        Ok(Self {
            pages: txn.open_table(PAGES)?,
            html: txn.open_table(HTML)?,
            tags: txn.open_multimap_table(TAGS)?,
            search: txn.open_multimap_table(SEARCH)?,
            by_date: txn.open_multimap_table(BY_DATE)?,
        })
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.pages.get(id)?.is_some())
    }

    /// Stored record for `id`, as seen by this transaction.
    pub fn get_page(&self, id: &str) -> Result<Page> {
        let raw = match self.pages.get(id)? {
            Some(guard) => guard.value().to_vec(),
            None => return Err(StoreError::NotFound(id.to_string())),
        };
        decode_page(&raw)
    }

    /// Write the record, the body, one tag-group membership per tag, the two
    /// search keys and the date entry.
    ///
    /// The page must carry a rendered body and a `published` stamp, and must
    /// not already be stored: an update is a [`delete_page`](Self::delete_page)
    /// followed by a put.
    pub fn put_page(&mut self, page: &Page) -> Result<()> {
        let body = page
            .rendered
            .as_deref()
            .ok_or_else(|| StoreError::MissingBody(page.id.clone()))?;
        if !page.is_published() {
            return Err(StoreError::Unpublished(page.id.clone()));
        }
        if self.contains(&page.id)? {
            return Err(StoreError::AlreadyExists(page.id.clone()));
        }

        let id = page.id.as_str();
        let record = serde_json::to_vec(page)?;
        self.pages.insert(id, record.as_slice())?;
        self.html.insert(id, body)?;
        for tag in &page.tags {
            self.tags.insert(tag.as_str(), id)?;
        }
        for key in page.search_keys() {
            self.search.insert(key.as_str(), id)?;
        }
        self.by_date.insert(page.date_key(), id)?;

        tracing::debug!(page = %id, tags = page.tags.len(), "Indexed page");
        Ok(())
    }

    /// Remove every index entry of `id` and return the record that was stored.
    ///
    /// The stored record, not any caller-side copy, decides which tag, search
    /// and date entries go, so an edited page never leaves stale entries behind.
    /// Fails with [`StoreError::NotFound`] when no record exists; the check is
    /// explicit because removing an absent key is not an error in redb.
    pub fn delete_page(&mut self, id: &str) -> Result<Page> {
        let page = self.get_page(id)?;

        self.pages.remove(id)?;
        self.html.remove(id)?;
        for tag in &page.tags {
            // Removing the last member drops the key, i.e. the whole tag group.
            self.tags.remove(tag.as_str(), id)?;
        }
        for key in page.search_keys() {
            self.search.remove(key.as_str(), id)?;
        }
        self.by_date.remove(page.date_key(), id)?;

        tracing::debug!(page = %id, "Removed page from indexes");
        Ok(page)
    }
}

// =========================================================================
// Read side
// =========================================================================

/// All index tables opened from one read snapshot.
pub struct IndexReader {
    pages: ReadOnlyTable<&'static str, &'static [u8]>,
    html: ReadOnlyTable<&'static str, &'static [u8]>,
    tags: ReadOnlyMultimapTable<&'static str, &'static str>,
    search: ReadOnlyMultimapTable<&'static str, &'static str>,
    by_date: ReadOnlyMultimapTable<&'static str, &'static str>,
}

impl IndexReader {
    pub(crate) fn open(txn: &ReadTransaction) -> Result<Self> {
        Ok(Self {
            pages: txn.open_table(PAGES)?,
            html: txn.open_table(HTML)?,
            tags: txn.open_multimap_table(TAGS)?,
            search: txn.open_multimap_table(SEARCH)?,
            by_date: txn.open_multimap_table(BY_DATE)?,
        })
    }

    /// Raw JSON record of a page.
    pub fn page_header(&self, id: &str) -> Result<Vec<u8>> {
        match self.pages.get(id)? {
            Some(guard) => Ok(guard.value().to_vec()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    pub fn page(&self, id: &str) -> Result<Page> {
        decode_page(&self.page_header(id)?)
    }

    /// Rendered body of a page.
    pub fn body(&self, id: &str) -> Result<Vec<u8>> {
        match self.html.get(id)? {
            Some(guard) => Ok(guard.value().to_vec()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Resolve an ID found in a secondary index. A miss here means the
    /// indexes disagree with the primary table.
    fn resolve(&self, index: &'static str, id: &str) -> Result<Page> {
        self.page(id).map_err(|e| match e {
            StoreError::NotFound(id) => StoreError::DanglingIndex { index, id },
            other => other,
        })
    }

    /// Pages whose lower-cased title or description contains any keyword.
    ///
    /// Every keyword is a case-insensitive substring scan over the whole
    /// search index; IDs are deduplicated and returned in index order.
    pub fn search(&self, keywords: &[impl AsRef<str>]) -> Result<Vec<Page>> {
        let queries: Vec<String> = keywords.iter().map(|k| k.as_ref().to_lowercase()).collect();
        let mut seen = HashSet::new();
        let mut ids = Vec::new();

        for query in &queries {
            for entry in self.search.iter()? {
                let (key, values) = entry?;
                if !key.value().contains(query.as_str()) {
                    continue;
                }
                for value in values {
                    let id = value?.value().to_string();
                    if seen.insert(id.clone()) {
                        ids.push(id);
                    }
                }
            }
        }

        ids.iter().map(|id| self.resolve("search", id)).collect()
    }

    /// Tag → number of pages in its group.
    pub fn all_tags(&self) -> Result<BTreeMap<String, usize>> {
        let mut tags = BTreeMap::new();
        for entry in self.tags.iter()? {
            let (tag, members) = entry?;
            let mut count = 0;
            for member in members {
                member?;
                count += 1;
            }
            if count > 0 {
                tags.insert(tag.value().to_string(), count);
            }
        }
        Ok(tags)
    }

    /// Pages in the group of `tag` (lower-cased first). No group, no pages.
    pub fn pages_by_tag(&self, tag: &str) -> Result<Vec<Page>> {
        let tag = tag.to_lowercase();
        let mut ids = Vec::new();
        for member in self.tags.get(tag.as_str())? {
            ids.push(member?.value().to_string());
        }
        ids.iter().map(|id| self.resolve("tags", id)).collect()
    }

    /// Up to `limit` pages, newest `published` first.
    pub fn recent(&self, limit: usize) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        for entry in self.by_date.iter()?.rev() {
            let (_, values) = entry?;
            for value in values {
                if pages.len() == limit {
                    return Ok(pages);
                }
                pages.push(self.resolve("by-date", value?.value())?);
            }
        }
        Ok(pages)
    }

    /// IDs of every stored page, in key order.
    pub fn page_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in self.pages.iter()? {
            let (id, _) = entry?;
            ids.push(id.value().to_string());
        }
        Ok(ids)
    }
}
