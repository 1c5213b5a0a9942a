//! Typed errors shared by every storage provider.
//!
//! Each backend call site declares the exact status codes it expects; any
//! other status is converted on the spot into the operation's variant below,
//! carrying the backend code. Raw backend statuses never cross the provider
//! boundary, and the surrounding gateway maps these errors one-to-one onto
//! HTTP responses via [`ProviderError::code`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid path '{0}'")]
    InvalidPath(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not retrieve file or directory '{0}'")]
    NotFound(String),

    #[error("Metadata request failed ({code}): {message}")]
    Metadata { message: String, code: u16 },

    #[error("Cannot create folder \"{0}\", because a file or folder already exists with that name")]
    FolderNamingConflict(String),

    #[error("Folder creation failed ({code}): {message}")]
    CreateFolder { message: String, code: u16 },

    #[error("Delete failed ({code}): {message}")]
    Delete { message: String, code: u16 },

    #[error("Download failed ({code}): {message}")]
    Download { message: String, code: u16 },

    #[error("Upload failed ({code}): {message}")]
    Upload { message: String, code: u16 },

    #[error("Intra-provider move failed ({code}): {message}")]
    IntraMove { message: String, code: u16 },

    #[error("Intra-provider copy failed ({code}): {message}")]
    IntraCopy { message: String, code: u16 },

    #[error("Revision listing failed ({code}): {message}")]
    Revisions { message: String, code: u16 },

    #[error("Uploaded data does not match the checksum reported by the backend")]
    UploadChecksumMismatch,

    #[error("Transport failure: {0}")]
    Transport(String),
}

impl ProviderError {
    /// HTTP-style status the surrounding gateway answers with for this error.
    pub fn code(&self) -> u16 {
        match self {
            ProviderError::InvalidPath(_) | ProviderError::InvalidConfig(_) => 400,
            ProviderError::NotFound(_) => 404,
            ProviderError::FolderNamingConflict(_) => 409,
            ProviderError::UploadChecksumMismatch => 500,
            ProviderError::Transport(_) => 502,
            ProviderError::Metadata { code, .. }
            | ProviderError::CreateFolder { code, .. }
            | ProviderError::Delete { code, .. }
            | ProviderError::Download { code, .. }
            | ProviderError::Upload { code, .. }
            | ProviderError::IntraMove { code, .. }
            | ProviderError::IntraCopy { code, .. }
            | ProviderError::Revisions { code, .. } => *code,
        }
    }
}
