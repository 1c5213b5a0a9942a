//! Provider configuration.
//!
//! Credentials, root identifiers and base URLs are injected explicitly at
//! construction time; providers never read ambient state. A generic
//! [`ProviderConfig`] travels over the wire from the gateway, and each
//! backend narrows it into its own validated config struct.

use std::collections::HashMap;
use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Drive for institutions (Drive API v3, label graph).
    GoogleDriveInstitutions,
    /// Fedora 4 repository (true hierarchy over HTTP).
    Fedora,
    /// RushFiles share (internal-name tree, journal-event mutations).
    RushFiles,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::GoogleDriveInstitutions => write!(f, "Google Drive (institutions)"),
            ProviderKind::Fedora => write!(f, "Fedora"),
            ProviderKind::RushFiles => write!(f, "RushFiles"),
        }
    }
}

/// Generic provider configuration as the gateway hands it over.
/// Backend-specific knobs live in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Bearer token or password, depending on the backend.
    pub token: Option<String>,
    /// Account name, for backends with basic auth.
    pub username: Option<String>,
    /// Backend root: Drive folder id, Fedora repository URL, RushFiles
    /// share id.
    pub root: Option<String>,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

#[derive(Debug, Clone)]
pub struct GoogleDriveConfig {
    pub token: SecretString,
    /// Folder the gateway mounted as `/`.
    pub root_folder_id: String,
    pub base_url: String,
    pub upload_base_url: String,
}

impl GoogleDriveConfig {
    pub fn from_provider_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let token = config.token.clone().ok_or_else(|| {
            ProviderError::InvalidConfig("Access token required for Google Drive".to_string())
        })?;
        let root_folder_id = config.root.clone().ok_or_else(|| {
            ProviderError::InvalidConfig("Root folder id required for Google Drive".to_string())
        })?;
        let base_url = config
            .extra
            .get("base_url")
            .cloned()
            .unwrap_or_else(|| DRIVE_API_BASE.to_string());
        let upload_base_url = config
            .extra
            .get("upload_base_url")
            .cloned()
            .unwrap_or_else(|| DRIVE_UPLOAD_BASE.to_string());

        Ok(Self {
            token: SecretString::from(token),
            root_folder_id,
            base_url,
            upload_base_url,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FedoraConfig {
    /// URL of the Fedora repository the gateway mounted as `/`.
    pub repo_url: String,
    pub user: String,
    pub password: SecretString,
}

impl FedoraConfig {
    pub fn from_provider_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let repo_url = config.root.clone().ok_or_else(|| {
            ProviderError::InvalidConfig("Repository URL required for Fedora".to_string())
        })?;
        let parsed = url::Url::parse(&repo_url).map_err(|e| {
            ProviderError::InvalidConfig(format!("Invalid Fedora repository URL: {e}"))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ProviderError::InvalidConfig(
                "Fedora repository URL must be http or https".to_string(),
            ));
        }
        let user = config.username.clone().ok_or_else(|| {
            ProviderError::InvalidConfig("Username required for Fedora".to_string())
        })?;
        let password = config.token.clone().ok_or_else(|| {
            ProviderError::InvalidConfig("Password required for Fedora".to_string())
        })?;

        Ok(Self {
            repo_url: repo_url.trim_end_matches('/').to_string(),
            user,
            password: SecretString::from(password),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RushFilesConfig {
    pub token: SecretString,
    pub share_id: String,
    /// Share domain; API hosts are derived from it
    /// (`clientgateway.{domain}`, `filecache01.{domain}`).
    pub share_domain: String,
}

impl RushFilesConfig {
    pub fn from_provider_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let token = config.token.clone().ok_or_else(|| {
            ProviderError::InvalidConfig("Access token required for RushFiles".to_string())
        })?;
        let share_id = config.root.clone().ok_or_else(|| {
            ProviderError::InvalidConfig("Share id required for RushFiles".to_string())
        })?;
        let share_domain = config
            .extra
            .get("domain")
            .cloned()
            .unwrap_or_else(|| "rushfiles.com".to_string());
        if share_domain.contains('/') {
            return Err(ProviderError::InvalidConfig(
                "Invalid RushFiles share domain".to_string(),
            ));
        }

        Ok(Self {
            token: SecretString::from(token),
            share_id,
            share_domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(kind: ProviderKind) -> ProviderConfig {
        ProviderConfig {
            kind,
            token: Some("naps".into()),
            username: Some("cat".into()),
            root: Some("d0c475011bd24b6dae8a6f890f6b4a93".into()),
            extra: HashMap::new(),
        }
    }

    #[test]
    fn test_google_drive_defaults() {
        let config =
            GoogleDriveConfig::from_provider_config(&base_config(ProviderKind::GoogleDriveInstitutions))
                .unwrap();
        assert_eq!(config.base_url, DRIVE_API_BASE);
        assert_eq!(config.upload_base_url, DRIVE_UPLOAD_BASE);
    }

    #[test]
    fn test_google_drive_requires_token() {
        let mut config = base_config(ProviderKind::GoogleDriveInstitutions);
        config.token = None;
        assert!(matches!(
            GoogleDriveConfig::from_provider_config(&config),
            Err(ProviderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_fedora_requires_scheme_and_trims_slash() {
        let mut config = base_config(ProviderKind::Fedora);
        config.root = Some("https://repo.test/rest/".into());
        let fedora = FedoraConfig::from_provider_config(&config).unwrap();
        assert_eq!(fedora.repo_url, "https://repo.test/rest");

        config.root = Some("repo.test/rest".into());
        assert!(matches!(
            FedoraConfig::from_provider_config(&config),
            Err(ProviderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rushfiles_domain_default_and_validation() {
        let mut config = base_config(ProviderKind::RushFiles);
        let rushfiles = RushFilesConfig::from_provider_config(&config).unwrap();
        assert_eq!(rushfiles.share_domain, "rushfiles.com");

        config
            .extra
            .insert("domain".into(), "rushfiles.tsukaeru.team".into());
        let rushfiles = RushFilesConfig::from_provider_config(&config).unwrap();
        assert_eq!(rushfiles.share_domain, "rushfiles.tsukaeru.team");

        config.extra.insert("domain".into(), "evil/path".into());
        assert!(matches!(
            RushFilesConfig::from_provider_config(&config),
            Err(ProviderError::InvalidConfig(_))
        ));
    }
}
