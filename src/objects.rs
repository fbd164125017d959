//! Object storage collaborator.
//!
//! Images leave the machine through the [`ObjectStore`] capability:
//! `put(key, bytes, meta)` and `delete(key)`, nothing more. Keys are flat
//! (`<image-id>`, `preview_<image-id>`); there are no transactions, so the
//! coordinator orders calls around the index commit instead.
//!
//! Two implementations ship with the crate:
//! - [`FsObjectStore`] — a directory served by any static file host. Each
//!   object gets a `<key>.meta.json` sidecar with content type, cache control,
//!   access and SHA-256, which the host (or a sync job) can map onto headers.
//! - [`MemoryObjectStore`] — process-local, used by tests and dry runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Content type of every uploaded image and preview.
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

const META_SUFFIX: &str = ".meta.json";

#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("IO error on object {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Who may read an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    PublicRead,
    Private,
}

/// Headers and access attached to an object on upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub content_type: String,
    pub cache_control: String,
    pub access: Access,
}

impl ObjectMeta {
    /// Publicly readable JPEG cached for `max_age` seconds.
    pub fn public_image(max_age: u64) -> Self {
        Self {
            content_type: IMAGE_CONTENT_TYPE.to_string(),
            cache_control: format!("public, max-age={max_age}"),
            access: Access::PublicRead,
        }
    }
}

/// Remote blob storage as seen by the coordinator.
pub trait ObjectStore: Sync {
    fn put(&self, key: &str, bytes: &[u8], meta: &ObjectMeta) -> Result<(), ObjectError>;

    /// Remove an object. Missing objects are reported as [`ObjectError::NotFound`].
    fn delete(&self, key: &str) -> Result<(), ObjectError>;
}

/// Keys must be a single path segment so they can never escape the store root.
fn validate_key(key: &str) -> Result<(), ObjectError> {
    let ok = !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
        && !key.ends_with(META_SUFFIX);
    if ok {
        Ok(())
    } else {
        Err(ObjectError::InvalidKey(key.to_string()))
    }
}

// =========================================================================
// Filesystem store
// =========================================================================

/// Sidecar written next to every object by [`FsObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMeta {
    #[serde(flatten)]
    pub meta: ObjectMeta,
    pub size: u64,
    pub sha256: String,
}

/// Object store backed by a local directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Use `root` as the bucket, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{META_SUFFIX}"))
    }

    /// Read back the sidecar of an object.
    pub fn stat(&self, key: &str) -> Result<StoredMeta, ObjectError> {
        validate_key(key)?;
        let raw = fs::read(self.meta_path(key)).map_err(|e| io_error(key, e))?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

fn io_error(key: &str, err: io::Error) -> ObjectError {
    if err.kind() == io::ErrorKind::NotFound {
        ObjectError::NotFound(key.to_string())
    } else {
        ObjectError::Io {
            key: key.to_string(),
            source: err,
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, bytes: &[u8], meta: &ObjectMeta) -> Result<(), ObjectError> {
        validate_key(key)?;
        let stored = StoredMeta {
            meta: meta.clone(),
            size: bytes.len() as u64,
            sha256: format!("{:x}", Sha256::digest(bytes)),
        };
        fs::write(self.object_path(key), bytes).map_err(|e| io_error(key, e))?;
        let json = serde_json::to_vec_pretty(&stored)?;
        fs::write(self.meta_path(key), json).map_err(|e| io_error(key, e))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), ObjectError> {
        validate_key(key)?;
        fs::remove_file(self.object_path(key)).map_err(|e| io_error(key, e))?;
        match fs::remove_file(self.meta_path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(io_error(key, e)),
            _ => Ok(()),
        }
    }
}

// =========================================================================
// In-memory store
// =========================================================================

/// An object held by [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub bytes: Vec<u8>,
    pub meta: ObjectMeta,
}

/// Object store living in process memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, MemoryObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<MemoryObject> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// All keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned map is still a consistent map; writers never panic mid-update.
    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MemoryObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, key: &str, bytes: &[u8], meta: &ObjectMeta) -> Result<(), ObjectError> {
        validate_key(key)?;
        self.lock().insert(
            key.to_string(),
            MemoryObject {
                bytes: bytes.to_vec(),
                meta: meta.clone(),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), ObjectError> {
        validate_key(key)?;
        self.lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ObjectError::NotFound(key.to_string()))
    }
}
