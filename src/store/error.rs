//! Error types for index store operations

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database creation error: {0}")]
    DatabaseCreation(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("post not found: {0}")]
    NotFound(String),

    #[error("Page {0} is already stored; delete it before putting it again")]
    AlreadyExists(String),

    #[error("Page {0} has no rendered body")]
    MissingBody(String),

    #[error("Page {0} has no published timestamp")]
    Unpublished(String),

    #[error("Index {index} refers to missing page {id}")]
    DanglingIndex { index: &'static str, id: String },
}

impl StoreError {
    /// True for the page-absent signal, as opposed to a storage failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
