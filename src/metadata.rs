//! Normalized metadata records.
//!
//! Every backend payload is reduced to the same shape: a file or folder
//! record carrying the provider name, the display name, the [`VirtualPath`]
//! it was resolved against, and the raw backend payload kept opaquely for
//! fields the normalization does not cover. Folder children are populated
//! only when a caller explicitly fetched them; nothing here recurses.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::path::VirtualPath;

/// A backend-reported content checksum. Absent entirely when the backend
/// does not expose one; never a zeroed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: &'static str,
    pub hex: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub provider: &'static str,
    pub name: String,
    pub path: VirtualPath,
    pub raw: Value,
    pub size: Option<u64>,
    /// Modification time as reported by the backend.
    pub modified: Option<String>,
    pub created: Option<String>,
    pub content_type: Option<String>,
    /// Backend revision/version identifier for this state of the file.
    pub revision: Option<String>,
    pub checksum: Option<Checksum>,
}

impl FileRecord {
    /// Path string for gateway responses: no trailing slash for files.
    pub fn path_str(&self) -> String {
        self.path.full_path()
    }

    /// Modification time normalized to UTC, when the backend's string parses.
    pub fn modified_utc(&self) -> Option<DateTime<Utc>> {
        self.modified
            .as_deref()
            .and_then(|m| DateTime::parse_from_rfc3339(m).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderRecord {
    pub provider: &'static str,
    pub name: String,
    pub path: VirtualPath,
    pub raw: Value,
    /// Immediate children, present only when explicitly fetched.
    pub children: Option<Vec<MetadataRecord>>,
    /// Soft-delete marker for backends that tombstone entries (RushFiles).
    pub deleted: bool,
}

impl FolderRecord {
    /// Path string for gateway responses: folders end with a slash.
    pub fn path_str(&self) -> String {
        self.path.full_path()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataRecord {
    File(FileRecord),
    Folder(FolderRecord),
}

impl MetadataRecord {
    pub fn provider(&self) -> &'static str {
        match self {
            MetadataRecord::File(f) => f.provider,
            MetadataRecord::Folder(f) => f.provider,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MetadataRecord::File(f) => &f.name,
            MetadataRecord::Folder(f) => &f.name,
        }
    }

    pub fn path(&self) -> &VirtualPath {
        match self {
            MetadataRecord::File(f) => &f.path,
            MetadataRecord::Folder(f) => &f.path,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, MetadataRecord::Folder(_))
    }

    pub fn path_str(&self) -> String {
        self.path().full_path()
    }
}

/// One entry of a file's revision history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRecord {
    /// Backend revision id, or a synthesized sentinel-suffixed id when the
    /// backend withholds history at the caller's permission level.
    pub version: String,
    pub modified: Option<String>,
}

/// What a metadata fetch yields: a single record for a file, the list of
/// immediate children for a folder.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataListing {
    Single(MetadataRecord),
    Children(Vec<MetadataRecord>),
}
