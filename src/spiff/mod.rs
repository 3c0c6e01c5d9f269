//! SPIFF-style playlist documents
//!
//! A document is `{playlist: {title, creator, image, location, date, entry: []}, type}`.
//! Each entry is either concrete (locations, identifiers, sizes) or a bare
//! `ref` to be expanded by the resolver.

mod patch;
mod xspf;

pub use patch::apply_patch;
pub use xspf::encode_xspf;

use serde::{Deserialize, Serialize};

/// Media type of a playlist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistType {
    #[default]
    Music,
    Video,
    Podcast,
    Stream,
}

/// One playlist entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unresolved reference, e.g. `/music/artists/12/popular`
    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub creator: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub album: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub size: Vec<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date: String,
}

impl Entry {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        !self.reference.is_empty()
    }

    /// First identifier, used for de-duplication
    pub fn first_identifier(&self) -> Option<&str> {
        self.identifier
            .first()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Entries without identifiers or with an unknown size are live streams
    pub fn is_stream(&self) -> bool {
        self.identifier.is_empty() || self.size.iter().any(|s| *s == -1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub creator: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(rename = "entry", default)]
    pub entries: Vec<Entry>,
}

/// A complete playlist document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spiff {
    #[serde(default)]
    pub playlist: Playlist,
    #[serde(rename = "type", default)]
    pub kind: PlaylistType,
}

impl Spiff {
    pub fn new(kind: PlaylistType, title: impl Into<String>) -> Self {
        Self {
            playlist: Playlist {
                title: title.into(),
                ..Default::default()
            },
            kind,
        }
    }

    /// Document holding a single unresolved reference
    pub fn from_ref(title: impl Into<String>, reference: impl Into<String>) -> Self {
        let mut spiff = Self::new(PlaylistType::Music, title);
        spiff.playlist.entries.push(Entry::reference(reference));
        spiff
    }

    pub fn parse(data: &[u8]) -> crate::error::Result<Self> {
        serde_json::from_slice(data).map_err(|_| crate::error::Error::InvalidContent)
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn len(&self) -> usize {
        self.playlist.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlist.entries.is_empty()
    }

    pub fn has_references(&self) -> bool {
        self.playlist.entries.iter().any(Entry::is_reference)
    }

    /// Drop later entries whose first identifier was already seen.
    ///
    /// Entries without an identifier are always kept; order is preserved.
    pub fn dedup(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.playlist.entries.retain(|e| match e.first_identifier() {
            Some(id) => seen.insert(id.to_string()),
            None => true,
        });
    }

    /// Retype the document as a stream when any entry looks like one
    pub fn infer_type(&mut self) {
        if self.playlist.entries.iter().any(Entry::is_stream) {
            self.kind = PlaylistType::Stream;
        }
    }

    /// True when both documents hold the same entries in the same order
    pub fn same_entries(&self, other: &Spiff) -> bool {
        self.playlist.entries == other.playlist.entries
    }
}
