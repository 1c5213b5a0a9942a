//! Backend providers for a storage-abstraction gateway.
//!
//! Three cloud storage backends with radically different notions of
//! identity - Google Drive's label graph, Fedora's URL hierarchy,
//! RushFiles' internal-name tree - adapted to one path/metadata/CRUD
//! contract so a front-end service can treat them uniformly.
//!
//! The load-bearing pieces:
//!
//! * [`path::VirtualPath`] - hierarchical paths carrying one backend
//!   identifier per segment, assigned lazily by resolution.
//! * [`resolve`] - the per-segment resolution state machine, written once
//!   against a per-backend child-lookup primitive.
//! * [`metadata`] - normalized records wrapping raw backend payloads.
//! * [`providers`] - the [`providers::StorageProvider`] contract and the
//!   three backends. Mutations re-derive their result paths from backend
//!   responses; backends are free to rename on conflict.
//!
//! Credentials and root identifiers are injected via [`config`]; HTTP goes
//! through the [`transport`] seam so providers can be exercised against a
//! test double.

pub mod config;
pub mod errors;
pub mod metadata;
pub mod path;
pub mod providers;
pub mod resolve;
pub mod streams;
pub mod transport;

pub use config::{ProviderConfig, ProviderKind};
pub use errors::ProviderError;
pub use metadata::{
    Checksum, FileRecord, FolderRecord, MetadataListing, MetadataRecord, RevisionRecord,
};
pub use path::{PathPart, VirtualPath};
pub use providers::{
    FedoraProvider, GoogleDriveProvider, ProviderFactory, RushFilesProvider, StorageProvider,
};
pub use streams::ByteStream;
pub use transport::{HttpTransport, Transport};
