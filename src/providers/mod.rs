//! Storage provider contract.
//!
//! Every backend implements the same operation set, so the surrounding
//! gateway can treat all storage uniformly:
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │               StorageProvider trait               │
//! │ validate_path, metadata, upload, intra_move, ...  │
//! └───────────────────────────────────────────────────┘
//!                          │
//!          ┌───────────────┼────────────────┐
//!          ▼               ▼                ▼
//!   ┌─────────────┐  ┌───────────┐  ┌─────────────┐
//!   │ GoogleDrive │  │  Fedora   │  │  RushFiles  │
//!   │ label graph │  │ hierarchy │  │  name tree  │
//!   └─────────────┘  └───────────┘  └─────────────┘
//! ```
//!
//! Capability is queried, never assumed: the gateway consults
//! `can_intra_move`/`can_intra_copy`/`can_duplicate_names` before invoking
//! the corresponding mutation, and the mutations re-check before touching
//! the network.

pub mod fedora;
pub mod google_drive;
pub mod rushfiles;

pub use fedora::FedoraProvider;
pub use google_drive::GoogleDriveProvider;
pub use rushfiles::RushFilesProvider;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{
    FedoraConfig, GoogleDriveConfig, ProviderConfig, ProviderKind, RushFilesConfig,
};
use crate::errors::ProviderError;
use crate::metadata::{FileRecord, FolderRecord, MetadataListing, MetadataRecord, RevisionRecord};
use crate::path::VirtualPath;
use crate::streams::ByteStream;
use crate::transport::Transport;

/// Suffix appended to forged revision ids for files whose history the
/// backend withholds at the caller's permission level. A revision ending
/// with it means "ignore the revision, serve the current version".
pub const REVISION_SENTINEL: &str = "-ignoreVersion";

/// Unified storage provider contract.
///
/// All state an operation needs travels in its [`VirtualPath`] and record
/// arguments; providers keep no cross-call mutable state, so one instance
/// can serve concurrent independent requests.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Stable backend name, constant per provider.
    fn name(&self) -> &'static str;

    /// Backend identity: name plus root identifier. Two provider instances
    /// address the same storage iff their fingerprints match.
    fn fingerprint(&self) -> String;

    /// Resolve a path whose entity must already exist.
    async fn validate_v1_path(&self, path: &str) -> Result<VirtualPath, ProviderError>;

    /// Resolve a path whose final entity may not exist yet (upload or
    /// create target).
    async fn validate_path(&self, path: &str) -> Result<VirtualPath, ProviderError>;

    /// Whether the backend allows several children of one folder to share
    /// a display name.
    fn can_duplicate_names(&self) -> bool;

    fn can_intra_move(&self, other: &dyn StorageProvider, _path: Option<&VirtualPath>) -> bool {
        self.fingerprint() == other.fingerprint()
    }

    fn can_intra_copy(&self, other: &dyn StorageProvider, _path: Option<&VirtualPath>) -> bool {
        self.fingerprint() == other.fingerprint()
    }

    /// Metadata for a file, or the immediate children of a folder.
    async fn metadata(
        &self,
        path: &VirtualPath,
        revision: Option<&str>,
    ) -> Result<MetadataListing, ProviderError>;

    async fn revisions(&self, path: &VirtualPath) -> Result<Vec<RevisionRecord>, ProviderError>;

    async fn create_folder(
        &self,
        path: &VirtualPath,
        folder_precheck: bool,
    ) -> Result<FolderRecord, ProviderError>;

    /// Delete the entity at `path`. Deleting the root requires
    /// `confirm_delete == 1` and removes only the root's contents.
    async fn delete(&self, path: &VirtualPath, confirm_delete: i32) -> Result<(), ProviderError>;

    async fn download(
        &self,
        path: &VirtualPath,
        revision: Option<&str>,
        range: Option<(u64, u64)>,
    ) -> Result<ByteStream, ProviderError>;

    /// Upload `stream` to `path`. Returns the new record and whether the
    /// destination was created (vs overwritten).
    async fn upload(
        &self,
        stream: ByteStream,
        path: &VirtualPath,
    ) -> Result<(FileRecord, bool), ProviderError>;

    async fn intra_move(
        &self,
        dest_provider: &dyn StorageProvider,
        src_path: &VirtualPath,
        dest_path: &VirtualPath,
    ) -> Result<(MetadataRecord, bool), ProviderError>;

    async fn intra_copy(
        &self,
        dest_provider: &dyn StorageProvider,
        src_path: &VirtualPath,
        dest_path: &VirtualPath,
    ) -> Result<(MetadataRecord, bool), ProviderError>;
}

/// Folder mutations demand a folder path.
pub(crate) fn require_folder(path: &VirtualPath) -> Result<(), ProviderError> {
    if path.is_folder() {
        Ok(())
    } else {
        Err(ProviderError::CreateFolder {
            message: "Path must be a directory".to_string(),
            code: 400,
        })
    }
}

/// Conflict precheck shared by every `create_folder`: an already-resolved
/// identifier means something lives at the target.
pub(crate) fn precheck_folder_conflict(
    path: &VirtualPath,
    folder_precheck: bool,
) -> Result<(), ProviderError> {
    if folder_precheck && path.identifier().is_some() {
        return Err(ProviderError::FolderNamingConflict(path.name()));
    }
    Ok(())
}

pub(crate) fn require_identifier(path: &VirtualPath) -> Result<&str, ProviderError> {
    path.identifier()
        .ok_or_else(|| ProviderError::NotFound(path.full_path()))
}

/// Root deletion gate. `Ok(true)` means "delete the root's contents".
pub(crate) fn guard_root_delete(
    path: &VirtualPath,
    confirm_delete: i32,
) -> Result<bool, ProviderError> {
    if !path.is_root() {
        return Ok(false);
    }
    if confirm_delete == 1 {
        Ok(true)
    } else {
        Err(ProviderError::Delete {
            message: "confirm_delete=1 is required for deleting root provider folder".to_string(),
            code: 400,
        })
    }
}

pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(
        config: &ProviderConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Box<dyn StorageProvider>, ProviderError> {
        match config.kind {
            ProviderKind::GoogleDriveInstitutions => Ok(Box::new(GoogleDriveProvider::new(
                GoogleDriveConfig::from_provider_config(config)?,
                transport,
            ))),
            ProviderKind::Fedora => Ok(Box::new(FedoraProvider::new(
                FedoraConfig::from_provider_config(config)?,
                transport,
            ))),
            ProviderKind::RushFiles => Ok(Box::new(RushFilesProvider::new(
                RushFilesConfig::from_provider_config(config)?,
                transport,
            ))),
        }
    }

    pub fn supported_kinds() -> Vec<ProviderKind> {
        vec![
            ProviderKind::GoogleDriveInstitutions,
            ProviderKind::Fedora,
            ProviderKind::RushFiles,
        ]
    }
}
