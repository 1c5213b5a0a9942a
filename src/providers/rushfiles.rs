//! RushFiles storage provider.
//!
//! A share is a tree of virtual files addressed by opaque internal names.
//! Reads go through the client gateway host, mutations are journal events
//! against the file cache host; both hosts derive from the share domain.
//!
//! Deletion is soft: an entry keeps a `Deleted` marker, and the live entry
//! must already carry it before the hard delete is allowed. On name
//! conflicts the backend does not fail a move or copy - it renames the
//! result to `name(duplicated <timestamp>)`, so result paths are always
//! rebuilt from the response, never from the requested destination.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::RushFilesConfig;
use crate::errors::ProviderError;
use crate::metadata::{FileRecord, FolderRecord, MetadataListing, MetadataRecord, RevisionRecord};
use crate::path::VirtualPath;
use crate::providers::{
    guard_root_delete, precheck_folder_conflict, require_folder, require_identifier,
    StorageProvider, REVISION_SENTINEL,
};
use crate::resolve::{resolve, Entity, Mode, ResolvedSegment, SegmentLookup};
use crate::streams::ByteStream;
use crate::transport::{send_expect, Request, Transport};

pub const PROVIDER_NAME: &str = "rushfiles";

/// Fixed transmit id stamped on every journal event we send.
const TRANSMIT_ID: &str = "1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A";
/// Device name the share journal attributes our events to.
const DEVICE_ID: &str = "aqueduct";

/// Client journal event types used by the file cache API.
const EVENT_CREATE: u32 = 0;
const EVENT_DELETE: u32 = 1;
const EVENT_UPDATE: u32 = 2;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RfVirtualFile {
    internal_name: String,
    #[serde(default)]
    public_name: String,
    #[serde(default)]
    upload_name: Option<String>,
    #[serde(default)]
    is_file: bool,
    #[serde(default)]
    deleted: bool,
    /// Size in bytes; the journal calls it the end-of-file offset.
    #[serde(default)]
    end_of_file: Option<u64>,
    #[serde(default)]
    creation_time: Option<String>,
    #[serde(default)]
    last_write_time: Option<String>,
    /// Journal tick, monotonic per entry; doubles as the revision id.
    #[serde(default)]
    tick: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JournalEnvelope {
    client_journal_event: JournalEvent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JournalEvent {
    rf_virtual_file: Value,
}

pub struct RushFilesProvider {
    config: RushFilesConfig,
    transport: Arc<dyn Transport>,
}

impl RushFilesProvider {
    pub fn new(config: RushFilesConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    fn request(&self, method: Method, url: String) -> Request {
        Request::new(method, url).header(
            "Authorization",
            format!("Bearer {}", self.config.token.expose_secret()),
        )
    }

    /// Read-side URL: `https://clientgateway.{domain}/api/shares/...`.
    fn clientgateway_url(&self, segments: &[&str]) -> String {
        let mut url = format!(
            "https://clientgateway.{}/api/shares",
            self.config.share_domain
        );
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    /// Mutation-side URL: `https://filecache01.{domain}/api/shares/...`.
    fn filecache_url(&self, segments: &[&str]) -> String {
        let mut url = format!("https://filecache01.{}/api/shares", self.config.share_domain);
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn parse_virtual_file(&self, raw: &Value) -> Result<RfVirtualFile, ProviderError> {
        serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::Transport(format!("malformed backend payload: {e}")))
    }

    /// Unwrap a file cache response: `Data.ClientJournalEvent.RfVirtualFile`.
    fn journal_virtual_file(&self, body: &crate::transport::Response) -> Result<Value, ProviderError> {
        let envelope: DataEnvelope<JournalEnvelope> = body.json()?;
        Ok(envelope.data.client_journal_event.rf_virtual_file)
    }

    fn file_record(&self, vf: &RfVirtualFile, raw: Value, path: VirtualPath) -> FileRecord {
        FileRecord {
            provider: PROVIDER_NAME,
            name: vf.public_name.clone(),
            path,
            raw,
            size: vf.end_of_file,
            modified: vf.last_write_time.clone(),
            created: vf.creation_time.clone(),
            // The share journal does not track content types or checksums.
            content_type: None,
            revision: vf.tick.map(|t| t.to_string()),
            checksum: None,
        }
    }

    fn record_from_raw(
        &self,
        raw: Value,
        parent: &VirtualPath,
    ) -> Result<MetadataRecord, ProviderError> {
        let vf = self.parse_virtual_file(&raw)?;
        let folder = !vf.is_file;
        let child_path = parent.child(&vf.public_name, Some(vf.internal_name.clone()), folder);
        Ok(if folder {
            MetadataRecord::Folder(FolderRecord {
                provider: PROVIDER_NAME,
                name: vf.public_name.clone(),
                path: child_path,
                raw,
                children: None,
                deleted: vf.deleted,
            })
        } else {
            MetadataRecord::File(self.file_record(&vf, raw, child_path))
        })
    }

    /// `GET virtualfiles/{id}`: one entry, file or folder alike.
    async fn lookup_entry(
        &self,
        internal_name: &str,
        path_str: &str,
    ) -> Result<(RfVirtualFile, Value), ProviderError> {
        let url = self.clientgateway_url(&[&self.config.share_id, "virtualfiles", internal_name]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200, 404],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await?;
        if response.status == 404 {
            return Err(ProviderError::NotFound(path_str.to_string()));
        }
        let envelope: DataEnvelope<Value> = response.json()?;
        let vf = self.parse_virtual_file(&envelope.data)?;
        Ok((vf, envelope.data))
    }

    async fn folder_children(
        &self,
        path: &VirtualPath,
    ) -> Result<Vec<MetadataRecord>, ProviderError> {
        let folder_id = require_identifier(path)?;
        let url = self.clientgateway_url(&[
            &self.config.share_id,
            "virtualfiles",
            folder_id,
            "children",
        ]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200, 404],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await?;
        if response.status == 404 {
            return Err(ProviderError::NotFound(path.full_path()));
        }
        let envelope: DataEnvelope<Vec<Value>> = response.json()?;
        envelope
            .data
            .into_iter()
            .map(|raw| self.record_from_raw(raw, path))
            .collect()
    }

    /// Hard delete: a delete journal event against the file cache.
    async fn delete_entry(&self, internal_name: &str, path_str: &str) -> Result<(), ProviderError> {
        let url = self.filecache_url(&[&self.config.share_id, "files", internal_name]);
        let body = json!({
            "TransmitId": TRANSMIT_ID,
            "ClientJournalEventType": EVENT_DELETE,
            "DeviceId": DEVICE_ID,
        });
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::DELETE, url).json(&body),
            &[200, 404],
            |code, message| ProviderError::Delete { message, code },
        )
        .await?;
        if response.status == 404 {
            return Err(ProviderError::NotFound(path_str.to_string()));
        }
        Ok(())
    }

    /// Rebuild the result path of a move/copy from the response entry: the
    /// backend renames on conflict (`name(duplicated <timestamp>)`).
    fn rederive_path(
        &self,
        dest_path: &VirtualPath,
        vf: &RfVirtualFile,
    ) -> Result<VirtualPath, ProviderError> {
        let parent = dest_path.parent().ok_or_else(|| ProviderError::IntraMove {
            message: "Destination has no parent folder".to_string(),
            code: 400,
        })?;
        Ok(parent.child(
            &vf.public_name,
            Some(vf.internal_name.clone()),
            dest_path.is_folder(),
        ))
    }

    async fn journal_result(
        &self,
        response: &crate::transport::Response,
        dest_path: &VirtualPath,
    ) -> Result<MetadataRecord, ProviderError> {
        let raw = self.journal_virtual_file(response)?;
        let vf = self.parse_virtual_file(&raw)?;
        let final_path = self.rederive_path(dest_path, &vf)?;
        if final_path.full_path() != dest_path.full_path() {
            debug!(
                "backend renamed {} to {}",
                dest_path.full_path(),
                final_path.full_path()
            );
        }
        Ok(if dest_path.is_folder() {
            let children = self.folder_children(&final_path).await?;
            MetadataRecord::Folder(FolderRecord {
                provider: PROVIDER_NAME,
                name: vf.public_name.clone(),
                path: final_path,
                raw,
                children: Some(children),
                deleted: vf.deleted,
            })
        } else {
            MetadataRecord::File(self.file_record(&vf, raw, final_path))
        })
    }
}

#[async_trait]
impl SegmentLookup for RushFilesProvider {
    async fn lookup_child(
        &self,
        ancestors: &[ResolvedSegment],
        name: &str,
        _folder_hint: Option<bool>,
    ) -> Result<Option<Entity>, ProviderError> {
        let parent_id = ancestors
            .last()
            .and_then(|a| a.id.clone())
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;

        let url = self.clientgateway_url(&[
            &self.config.share_id,
            "virtualfiles",
            &parent_id,
            "children",
        ]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200, 404],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await?;
        if response.status == 404 {
            return Err(ProviderError::NotFound(name.to_string()));
        }

        let envelope: DataEnvelope<Vec<Value>> = response.json()?;
        for raw in envelope.data {
            let vf = self.parse_virtual_file(&raw)?;
            // First match wins; the share should not hold duplicates.
            if vf.public_name == name {
                return Ok(Some(Entity {
                    id: Some(vf.internal_name),
                    folder: !vf.is_file,
                }));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl StorageProvider for RushFilesProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn fingerprint(&self) -> String {
        format!("{}::{}", PROVIDER_NAME, self.config.share_id)
    }

    async fn validate_v1_path(&self, path: &str) -> Result<VirtualPath, ProviderError> {
        resolve(self, &self.config.share_id, path, Mode::Existing).await
    }

    async fn validate_path(&self, path: &str) -> Result<VirtualPath, ProviderError> {
        resolve(self, &self.config.share_id, path, Mode::MaybeMissing).await
    }

    fn can_duplicate_names(&self) -> bool {
        false
    }

    async fn metadata(
        &self,
        path: &VirtualPath,
        _revision: Option<&str>,
    ) -> Result<MetadataListing, ProviderError> {
        let id = path.identifier().ok_or_else(|| ProviderError::Metadata {
            message: format!("{} not found", path.full_path()),
            code: 404,
        })?;
        if path.is_folder() {
            Ok(MetadataListing::Children(self.folder_children(path).await?))
        } else {
            let (vf, raw) = self.lookup_entry(id, &path.full_path()).await?;
            Ok(MetadataListing::Single(MetadataRecord::File(
                self.file_record(&vf, raw, path.clone()),
            )))
        }
    }

    async fn revisions(&self, path: &VirtualPath) -> Result<Vec<RevisionRecord>, ProviderError> {
        let id = require_identifier(path)?;
        let url =
            self.clientgateway_url(&[&self.config.share_id, "virtualfiles", id, "history"]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200, 403, 404],
            |code, message| ProviderError::Revisions { message, code },
        )
        .await?;
        if response.status == 404 {
            return Err(ProviderError::NotFound(path.full_path()));
        }

        if response.status == 200 {
            let envelope: DataEnvelope<Vec<Value>> = response.json()?;
            let mut revisions = Vec::new();
            for entry in &envelope.data {
                // History entries nest the journaled file state.
                let raw = entry.get("RfVirtualFile").unwrap_or(entry);
                let vf = self.parse_virtual_file(raw)?;
                if let Some(tick) = vf.tick {
                    revisions.push(RevisionRecord {
                        version: tick.to_string(),
                        modified: vf.last_write_time.clone(),
                    });
                }
            }
            if !revisions.is_empty() {
                revisions.reverse();
                return Ok(revisions);
            }
        }

        // History withheld or empty: forge one recognizable revision.
        let (vf, _) = self.lookup_entry(id, &path.full_path()).await?;
        let stamp = vf.last_write_time.clone().unwrap_or_default();
        Ok(vec![RevisionRecord {
            version: format!("{stamp}{REVISION_SENTINEL}"),
            modified: vf.last_write_time,
        }])
    }

    async fn create_folder(
        &self,
        path: &VirtualPath,
        folder_precheck: bool,
    ) -> Result<FolderRecord, ProviderError> {
        require_folder(path)?;
        precheck_folder_conflict(path, folder_precheck)?;

        let parent = path.parent().ok_or_else(|| ProviderError::CreateFolder {
            message: "Cannot create the root folder".to_string(),
            code: 400,
        })?;
        let parent_id = require_identifier(&parent)?.to_string();

        let url = self.filecache_url(&[&self.config.share_id, "files"]);
        let body = json!({
            "TransmitId": TRANSMIT_ID,
            "ClientJournalEventType": EVENT_CREATE,
            "DeviceId": DEVICE_ID,
            "RfVirtualFile": {
                "ShareId": self.config.share_id,
                "ParrentId": parent_id,
                "PublicName": path.name(),
                "IsFile": false,
            },
        });
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::POST, url).json(&body),
            &[200, 201],
            |code, message| ProviderError::CreateFolder { message, code },
        )
        .await?;

        let raw = self.journal_virtual_file(&response)?;
        let vf = self.parse_virtual_file(&raw)?;
        info!("created folder {}", path.full_path());
        Ok(FolderRecord {
            provider: PROVIDER_NAME,
            name: vf.public_name.clone(),
            path: path.with_identifier(vf.internal_name.clone()),
            raw,
            children: None,
            deleted: vf.deleted,
        })
    }

    async fn delete(&self, path: &VirtualPath, confirm_delete: i32) -> Result<(), ProviderError> {
        let id = require_identifier(path)?.to_string();
        if guard_root_delete(path, confirm_delete)? {
            // Children only; the share root itself stays.
            for child in self.folder_children(path).await? {
                if let Some(child_id) = child.path().identifier() {
                    self.delete_entry(child_id, &child.path_str()).await?;
                }
            }
            return Ok(());
        }

        // The live entry must already carry its Deleted marker; otherwise
        // the hard delete is off limits for this caller.
        let (vf, _) = self.lookup_entry(&id, &path.full_path()).await?;
        if !vf.deleted {
            return Err(ProviderError::Delete {
                message: "Delete permission required".to_string(),
                code: 403,
            });
        }

        self.delete_entry(&id, &path.full_path()).await?;
        info!("deleted {}", path.full_path());
        Ok(())
    }

    async fn download(
        &self,
        path: &VirtualPath,
        _revision: Option<&str>,
        range: Option<(u64, u64)>,
    ) -> Result<ByteStream, ProviderError> {
        let id = require_identifier(path)?;
        let (vf, _) = self.lookup_entry(id, &path.full_path()).await?;
        let upload_name = vf.upload_name.ok_or_else(|| ProviderError::Download {
            message: "Entry has no stored content".to_string(),
            code: 404,
        })?;

        let url = self.filecache_url(&[&self.config.share_id, "files", &upload_name]);
        let mut request = self.request(Method::GET, url);
        if let Some((start, end)) = range {
            request = request.header("Range", format!("bytes={start}-{end}"));
        }
        let response = send_expect(
            self.transport.as_ref(),
            request,
            &[200, 206],
            |code, message| ProviderError::Download { message, code },
        )
        .await?;
        Ok(ByteStream::from_bytes(response.body))
    }

    async fn upload(
        &self,
        mut stream: ByteStream,
        path: &VirtualPath,
    ) -> Result<(FileRecord, bool), ProviderError> {
        if path.is_folder() {
            return Err(ProviderError::Upload {
                message: "Upload target must be a file path".to_string(),
                code: 400,
            });
        }
        let parent = path.parent().ok_or_else(|| ProviderError::Upload {
            message: "Upload target has no parent folder".to_string(),
            code: 400,
        })?;
        let parent_id = require_identifier(&parent)?.to_string();
        let created = path.identifier().is_none();
        let size = stream.size().unwrap_or(0);

        // Step one: announce the file to the journal; the response assigns
        // the cache name the bytes go to.
        let url = self.filecache_url(&[&self.config.share_id, "files"]);
        let body = json!({
            "TransmitId": TRANSMIT_ID,
            "ClientJournalEventType": if created { EVENT_CREATE } else { EVENT_UPDATE },
            "DeviceId": DEVICE_ID,
            "RfVirtualFile": {
                "ShareId": self.config.share_id,
                "ParrentId": parent_id,
                "PublicName": path.name(),
                "IsFile": true,
                "EndOfFile": size,
            },
        });
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::POST, url).json(&body),
            &[200, 201],
            |code, message| ProviderError::Upload { message, code },
        )
        .await?;
        let raw = self.journal_virtual_file(&response)?;
        let vf = self.parse_virtual_file(&raw)?;
        let upload_name = vf
            .upload_name
            .clone()
            .ok_or_else(|| ProviderError::Upload {
                message: "Backend assigned no upload name".to_string(),
                code: 500,
            })?;

        // Step two: ship the bytes to the file cache.
        let data = stream
            .read_to_end()
            .await
            .map_err(|e| ProviderError::Upload {
                message: e.to_string(),
                code: 500,
            })?;
        let upload_url =
            self.filecache_url(&[&self.config.share_id, "files", &upload_name, "data"]);
        send_expect(
            self.transport.as_ref(),
            self.request(Method::PUT, upload_url)
                .header("Content-Length", size.to_string())
                .body(data),
            &[200, 201],
            |code, message| ProviderError::Upload { message, code },
        )
        .await?;

        let result_path = path.with_identifier(vf.internal_name.clone());
        info!("uploaded {} ({} bytes)", path.full_path(), size);
        Ok((self.file_record(&vf, raw, result_path), created))
    }

    async fn intra_move(
        &self,
        dest_provider: &dyn StorageProvider,
        src_path: &VirtualPath,
        dest_path: &VirtualPath,
    ) -> Result<(MetadataRecord, bool), ProviderError> {
        if !self.can_intra_move(dest_provider, Some(src_path)) {
            return Err(ProviderError::IntraMove {
                message: "Source and destination providers do not match".to_string(),
                code: 400,
            });
        }

        let created = dest_path.identifier().is_none();
        let src_id = require_identifier(src_path)?;
        let parent = dest_path.parent().ok_or_else(|| ProviderError::IntraMove {
            message: "Destination has no parent folder".to_string(),
            code: 400,
        })?;
        let parent_id = require_identifier(&parent)?.to_string();

        let url = self.filecache_url(&[&self.config.share_id, "files", src_id]);
        let body = json!({
            "TransmitId": TRANSMIT_ID,
            "ClientJournalEventType": EVENT_UPDATE,
            "DeviceId": DEVICE_ID,
            "RfVirtualFile": {
                "InternalName": src_id,
                "ShareId": self.config.share_id,
                "ParrentId": parent_id,
                "PublicName": dest_path.name(),
            },
        });
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::PUT, url).json(&body),
            &[200, 201],
            |code, message| ProviderError::IntraMove { message, code },
        )
        .await?;

        let record = self.journal_result(&response, dest_path).await?;
        Ok((record, created))
    }

    async fn intra_copy(
        &self,
        dest_provider: &dyn StorageProvider,
        src_path: &VirtualPath,
        dest_path: &VirtualPath,
    ) -> Result<(MetadataRecord, bool), ProviderError> {
        if !self.can_intra_copy(dest_provider, Some(src_path)) {
            return Err(ProviderError::IntraCopy {
                message: "Source and destination providers do not match".to_string(),
                code: 400,
            });
        }

        let created = dest_path.identifier().is_none();
        let src_id = require_identifier(src_path)?;
        let parent = dest_path.parent().ok_or_else(|| ProviderError::IntraCopy {
            message: "Destination has no parent folder".to_string(),
            code: 400,
        })?;
        let parent_id = require_identifier(&parent)?.to_string();

        let url = self.filecache_url(&[&self.config.share_id, "files", src_id, "clone"]);
        let body = json!({
            "TransmitId": TRANSMIT_ID,
            "ClientJournalEventType": EVENT_CREATE,
            "DeviceId": DEVICE_ID,
            "RfVirtualFile": {
                "ShareId": self.config.share_id,
                "ParrentId": parent_id,
                "PublicName": dest_path.name(),
            },
        });
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::POST, url).json(&body),
            &[200, 201],
            |code, message| ProviderError::IntraCopy { message, code },
        )
        .await?;

        let record = self.journal_result(&response, dest_path).await?;
        Ok((record, created))
    }
}
