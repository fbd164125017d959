//! Entities shared by the parser, the index store and the coordinator.
//!
//! A [`Page`] is built purely by [`parse`](crate::parse) and only becomes
//! durable once the [`Publisher`](crate::publish::Publisher) commits it. The
//! serialized form written to the primary index is
//! `{id, published, modified, title, desc, tags[], images{}}`; the working
//! Markdown, the rendered body and every image's preview bytes are runtime-only
//! and never part of that record.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// A single published content unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Slug taken from the source directory name. Primary key, never changes.
    pub id: String,
    /// RFC 3339 commit time of the first save.
    #[serde(default)]
    pub published: String,
    /// RFC 3339 commit time of the latest update; empty until the page is re-saved.
    #[serde(default)]
    pub modified: String,
    /// First `# heading` of the document.
    pub title: String,
    /// First `## heading` of the document.
    pub desc: String,
    /// Lower-cased tags from the `[tags]:` directive, in document order.
    pub tags: Vec<String>,
    /// Local images keyed by the reference string used in the document.
    #[serde(default)]
    pub images: ImageMap,
    /// Markdown left after stripping title/description and rewriting image URLs.
    #[serde(skip)]
    pub markdown: String,
    /// Output of the remote render step.
    #[serde(skip)]
    pub rendered: Option<Vec<u8>>,
}

impl Page {
    /// True once the page has a `published` stamp, i.e. it came from the store
    /// or went through a successful save.
    pub fn is_published(&self) -> bool {
        !self.published.is_empty()
    }

    /// Sort key of the date index.
    pub fn date_key(&self) -> &str {
        &self.published
    }

    /// Search keys: the lower-cased title and description.
    pub fn search_keys(&self) -> [String; 2] {
        [self.title.to_lowercase(), self.desc.to_lowercase()]
    }
}

/// A derived image asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Generated filename-safe identifier, always ending in `.jpg`.
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Prominent colour as `rrggbb`, used as a placeholder while loading.
    #[serde(default)]
    pub color: String,
    /// Encoded preview. Consumed by the upload step, never persisted.
    #[serde(skip)]
    pub preview: Vec<u8>,
    /// Local file the image was decoded from. Not persisted.
    #[serde(skip)]
    pub source: PathBuf,
}

/// Reference string → [`Image`], iterating in first-seen order.
///
/// Serialized as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMap {
    entries: Vec<(String, Image)>,
}

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.get(reference).is_some()
    }

    pub fn get(&self, reference: &str) -> Option<&Image> {
        self.entries
            .iter()
            .find(|(r, _)| r == reference)
            .map(|(_, img)| img)
    }

    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, reference: impl Into<String>, image: Image) {
        let reference = reference.into();
        match self.entries.iter_mut().find(|(r, _)| *r == reference) {
            Some((_, existing)) => *existing = image,
            None => self.entries.push((reference, image)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Image)> {
        self.entries.iter().map(|(r, img)| (r.as_str(), img))
    }

    pub fn values(&self) -> impl Iterator<Item = &Image> {
        self.entries.iter().map(|(_, img)| img)
    }
}

impl Serialize for ImageMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (reference, image) in &self.entries {
            map.serialize_entry(reference, image)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ImageMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ImageMapVisitor;

        impl<'de> Visitor<'de> for ImageMapVisitor {
            type Value = ImageMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of image references to images")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<ImageMap, E> {
                Ok(ImageMap::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ImageMap, A::Error> {
                let mut map = ImageMap::new();
                while let Some((reference, image)) = access.next_entry::<String, Image>()? {
                    map.insert(reference, image);
                }
                Ok(map)
            }
        }

        // `null` is accepted for records written without any images
        deserializer.deserialize_any(ImageMapVisitor)
    }
}
