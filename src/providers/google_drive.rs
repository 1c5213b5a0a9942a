//! Google Drive (institutions) storage provider.
//!
//! Drive API v3. Drive is not really a filesystem: folders are labels, so a
//! file can hang off several parents at once and display names are not
//! unique within a folder. Paths are resolved by name queries scoped to a
//! parent id, one segment at a time.
//!
//! Revisions are awkward. Google-Docs files use small integer versions,
//! regular files use opaque ids, and neither is visible to callers with
//! view or comment permission only. For those files a revision id is forged
//! from the modification time plus a fixed suffix; a later request carrying
//! such an id is served the current version instead, and a non-forged
//! revision for a read-only file is a plain 404.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::GoogleDriveConfig;
use crate::errors::ProviderError;
use crate::metadata::{
    Checksum, FileRecord, FolderRecord, MetadataListing, MetadataRecord, RevisionRecord,
};
use crate::path::VirtualPath;
use crate::providers::{
    guard_root_delete, precheck_folder_conflict, require_folder, require_identifier,
    StorageProvider, REVISION_SENTINEL,
};
use crate::resolve::{resolve, Entity, Mode, ResolvedSegment, SegmentLookup};
use crate::streams::{ByteStream, Md5Writer};
use crate::transport::{send_expect, Request, Transport};

pub const PROVIDER_NAME: &str = "googledriveinstitutions";

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const FILE_FIELDS: &str = "id,name,version,size,modifiedTime,createdTime,mimeType,md5Checksum,\
                           originalFilename,exportLinks,ownedByMe,capabilities(canEdit)";
const REVISION_FIELDS: &str = "id,mimeType,modifiedTime,md5Checksum,size,exportLinks";

/// Escape a value for embedding in a Drive query string. Only backslashes
/// and single quotes need escaping.
fn clean_query(query: &str) -> String {
    query.replace('\\', r"\\").replace('\'', r"\'")
}

/// Google-Docs extensions are not stored in display names; lookups for them
/// are translated to mime-type filters with the extension stripped.
fn docs_mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        ".gdoc" => Some("application/vnd.google-apps.document"),
        ".gsheet" => Some("application/vnd.google-apps.spreadsheet"),
        ".gslides" => Some("application/vnd.google-apps.presentation"),
        ".gdraw" => Some("application/vnd.google-apps.drawing"),
        _ => None,
    }
}

fn split_docs_extension(name: &str, want_folder: bool) -> (&str, Option<&'static str>) {
    if want_folder {
        return (name, None);
    }
    if let Some(dot) = name.rfind('.') {
        if let Some(mime) = docs_mime_for_extension(&name[dot..]) {
            return (&name[..dot], Some(mime));
        }
    }
    (name, None)
}

fn is_docs_file(mime: &str) -> bool {
    mime.starts_with("application/vnd.google-apps") && mime != FOLDER_MIME_TYPE
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    /// Drive reports sizes as decimal strings.
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    modified_time: Option<String>,
    #[serde(default)]
    created_time: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    md5_checksum: Option<String>,
    #[serde(default)]
    export_links: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItemList {
    #[serde(default)]
    files: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveRevisionList {
    #[serde(default)]
    revisions: Option<Vec<DriveRevision>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveRevision {
    id: String,
    #[serde(default)]
    modified_time: Option<String>,
}

/// Exported Google-Docs formats, most specific first.
fn export_link(item: &DriveItem) -> Option<String> {
    let links = item.export_links.as_ref()?;
    const PREFERRED: [&str; 4] = [
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "application/pdf",
    ];
    for mime in PREFERRED {
        if let Some(link) = links.get(mime) {
            return Some(link.clone());
        }
    }
    links.values().next().cloned()
}

pub struct GoogleDriveProvider {
    config: GoogleDriveConfig,
    transport: Arc<dyn Transport>,
}

impl GoogleDriveProvider {
    pub fn new(config: GoogleDriveConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    fn build_url(&self, base: &str, segments: &[&str], query: &[(&str, &str)]) -> String {
        let mut url = base.trim_end_matches('/').to_string();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        if !query.is_empty() {
            url.push('?');
            let pairs: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url.push_str(&pairs.join("&"));
        }
        url
    }

    fn api_url(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        self.build_url(&self.config.base_url, segments, query)
    }

    fn upload_url(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        self.build_url(&self.config.upload_base_url, segments, query)
    }

    fn request(&self, method: Method, url: String) -> Request {
        Request::new(method, url).header(
            "Authorization",
            format!("Bearer {}", self.config.token.expose_secret()),
        )
    }

    fn file_record(&self, item: DriveItem, raw: Value, path: VirtualPath) -> FileRecord {
        FileRecord {
            provider: PROVIDER_NAME,
            name: item.name.clone(),
            path,
            raw,
            size: item.size.as_deref().and_then(|s| s.parse().ok()),
            modified: item.modified_time.clone(),
            created: item.created_time.clone(),
            content_type: (!item.mime_type.is_empty()).then(|| item.mime_type.clone()),
            revision: item.version.clone(),
            checksum: item.md5_checksum.map(|hex| Checksum {
                algorithm: "md5",
                hex,
            }),
        }
    }

    fn parse_item(&self, raw: &Value) -> Result<DriveItem, ProviderError> {
        serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::Transport(format!("malformed backend payload: {e}")))
    }

    fn record_from_raw(
        &self,
        raw: Value,
        parent: &VirtualPath,
    ) -> Result<MetadataRecord, ProviderError> {
        let item = self.parse_item(&raw)?;
        let folder = item.mime_type == FOLDER_MIME_TYPE;
        let child_path = parent.child(&item.name, Some(item.id.clone()), folder);
        Ok(if folder {
            MetadataRecord::Folder(FolderRecord {
                provider: PROVIDER_NAME,
                name: item.name.clone(),
                path: child_path,
                raw,
                children: None,
                deleted: false,
            })
        } else {
            MetadataRecord::File(self.file_record(item, raw, child_path))
        })
    }

    /// Immediate children of a folder, all pages drained in order.
    async fn folder_children(
        &self,
        path: &VirtualPath,
    ) -> Result<Vec<MetadataRecord>, ProviderError> {
        let folder_id = require_identifier(path)?;
        let query = format!(
            "'{}' in parents and trashed = false \
             and mimeType != 'application/vnd.google-apps.form' \
             and mimeType != 'application/vnd.google-apps.map'",
            folder_id
        );

        let mut children = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let url = match &page_token {
                Some(token) => self.api_url(
                    &["files"],
                    &[
                        ("q", query.as_str()),
                        ("pageSize", "1000"),
                        ("pageToken", token),
                        ("fields", "nextPageToken,files"),
                    ],
                ),
                None => self.api_url(
                    &["files"],
                    &[
                        ("q", query.as_str()),
                        ("pageSize", "1000"),
                        ("fields", "nextPageToken,files"),
                    ],
                ),
            };
            let response = send_expect(
                self.transport.as_ref(),
                self.request(Method::GET, url),
                &[200],
                |code, message| ProviderError::Metadata { message, code },
            )
            .await?;
            let list: DriveItemList = response.json()?;
            for raw in list.files {
                children.push(self.record_from_raw(raw, path)?);
            }
            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(children)
    }

    /// Docs files version differently: the latest entry of the revision
    /// list is the version, when the caller may see it at all.
    async fn docs_version(&self, file_id: &str) -> Result<Option<String>, ProviderError> {
        let url = self.api_url(&["files", file_id, "revisions"], &[]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200],
            |code, message| ProviderError::Revisions { message, code },
        )
        .await?;
        let list: DriveRevisionList = response.json()?;
        Ok(list
            .revisions
            .and_then(|revs| revs.last().map(|r| r.id.clone())))
    }

    async fn file_metadata(
        &self,
        path: &VirtualPath,
        revision: Option<&str>,
    ) -> Result<FileRecord, ProviderError> {
        let file_id = require_identifier(path)?;

        let valid_revision = revision.is_some_and(|r| !r.ends_with(REVISION_SENTINEL));
        let url = match revision {
            Some(rev) if valid_revision => self.api_url(
                &["files", file_id, "revisions", rev],
                &[("fields", REVISION_FIELDS)],
            ),
            _ => self.api_url(&["files", file_id], &[("fields", FILE_FIELDS)]),
        };

        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200, 403, 404],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await?;
        if response.status != 200 {
            return Err(ProviderError::NotFound(path.full_path()));
        }

        let raw = response.json_value()?;
        let mut item = self.parse_item(&raw)?;
        if item.name.is_empty() {
            // Revision payloads carry no name.
            item.name = path.name();
        }

        if valid_revision {
            let mut record = self.file_record(item, raw, path.clone());
            record.revision = revision.map(str::to_string);
            return Ok(record);
        }

        if is_docs_file(&item.mime_type) {
            let can_access_revisions = raw
                .get("ownedByMe")
                .and_then(Value::as_bool)
                .unwrap_or(false)
                || raw
                    .get("capabilities")
                    .and_then(|c| c.get("canEdit"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
            let version = if can_access_revisions {
                self.docs_version(&item.id).await?
            } else {
                None
            };
            item.version = version.or_else(|| {
                item.modified_time
                    .as_ref()
                    .map(|m| format!("{m}{REVISION_SENTINEL}"))
            });
        }

        Ok(self.file_record(item, raw, path.clone()))
    }

    async fn delete_folder_contents(&self, folder_id: &str) -> Result<(), ProviderError> {
        let query = format!("'{}' in parents", folder_id);
        let url = self.api_url(&["files"], &[("q", &query), ("fields", "files(id)")]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await?;
        let list: DriveItemList = response.json()?;
        for raw in list.files {
            let item = self.parse_item(&raw)?;
            let url = self.api_url(&["files", &item.id], &[]);
            send_expect(
                self.transport.as_ref(),
                self.request(Method::DELETE, url),
                &[200, 204],
                |code, message| ProviderError::Delete { message, code },
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SegmentLookup for GoogleDriveProvider {
    async fn lookup_child(
        &self,
        ancestors: &[ResolvedSegment],
        name: &str,
        folder_hint: Option<bool>,
    ) -> Result<Option<Entity>, ProviderError> {
        let parent_id = ancestors
            .last()
            .and_then(|a| a.id.clone())
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;

        let want_folder = folder_hint.unwrap_or(true);
        let (stem, docs_mime) = split_docs_extension(name, want_folder);
        let query = match docs_mime {
            Some(mime) => format!(
                "name = '{}' and trashed = false and mimeType = '{}' and '{}' in parents",
                clean_query(stem),
                mime,
                parent_id
            ),
            None => format!(
                "name = '{}' and trashed = false \
                 and mimeType != 'application/vnd.google-apps.form' \
                 and mimeType != 'application/vnd.google-apps.map' \
                 and mimeType != 'application/vnd.google-apps.document' \
                 and mimeType != 'application/vnd.google-apps.drawing' \
                 and mimeType != 'application/vnd.google-apps.presentation' \
                 and mimeType != 'application/vnd.google-apps.spreadsheet' \
                 and mimeType {} '{}' and '{}' in parents",
                clean_query(name),
                if want_folder { "=" } else { "!=" },
                FOLDER_MIME_TYPE,
                parent_id
            ),
        };

        let url = self.api_url(
            &["files"],
            &[("q", &query), ("fields", "files(id,name,mimeType)")],
        );
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await?;
        let list: DriveItemList = response.json()?;
        // First match wins; Drive can hold duplicate names.
        let Some(raw) = list.files.into_iter().next() else {
            return Ok(None);
        };
        let item = self.parse_item(&raw)?;
        Ok(Some(Entity {
            id: Some(item.id),
            folder: item.mime_type == FOLDER_MIME_TYPE,
        }))
    }
}

#[async_trait]
impl StorageProvider for GoogleDriveProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn fingerprint(&self) -> String {
        format!("{}::{}", PROVIDER_NAME, self.config.root_folder_id)
    }

    async fn validate_v1_path(&self, path: &str) -> Result<VirtualPath, ProviderError> {
        resolve(self, &self.config.root_folder_id, path, Mode::Existing).await
    }

    async fn validate_path(&self, path: &str) -> Result<VirtualPath, ProviderError> {
        resolve(self, &self.config.root_folder_id, path, Mode::MaybeMissing).await
    }

    fn can_duplicate_names(&self) -> bool {
        true
    }

    fn can_intra_copy(&self, other: &dyn StorageProvider, path: Option<&VirtualPath>) -> bool {
        // Drive has no server-side copy for folders.
        self.fingerprint() == other.fingerprint() && path.is_some_and(|p| p.is_file())
    }

    async fn metadata(
        &self,
        path: &VirtualPath,
        revision: Option<&str>,
    ) -> Result<MetadataListing, ProviderError> {
        if path.identifier().is_none() {
            return Err(ProviderError::Metadata {
                message: format!("{} not found", path.full_path()),
                code: 404,
            });
        }
        if path.is_folder() {
            Ok(MetadataListing::Children(self.folder_children(path).await?))
        } else {
            Ok(MetadataListing::Single(MetadataRecord::File(
                self.file_metadata(path, revision).await?,
            )))
        }
    }

    async fn revisions(&self, path: &VirtualPath) -> Result<Vec<RevisionRecord>, ProviderError> {
        let file_id = require_identifier(path)?;
        let url = self.api_url(&["files", file_id, "revisions"], &[]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url),
            &[200, 403],
            |code, message| ProviderError::Revisions { message, code },
        )
        .await?;

        if response.status == 200 {
            let list: DriveRevisionList = response.json()?;
            if let Some(revisions) = list.revisions {
                if !revisions.is_empty() {
                    return Ok(revisions
                        .into_iter()
                        .rev()
                        .map(|r| RevisionRecord {
                            version: r.id,
                            modified: r.modified_time,
                        })
                        .collect());
                }
            }
        }

        // History withheld for this caller: forge one recognizable revision
        // from the current metadata.
        debug!("revision history unavailable for {}", path.full_path());
        let current = self.file_metadata(path, None).await?;
        let modified = current.modified.clone().unwrap_or_default();
        Ok(vec![RevisionRecord {
            version: format!("{modified}{REVISION_SENTINEL}"),
            modified: current.modified,
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

        let body = json!({
            "name": path.name(),
            "parents": [{"id": parent_id}],
            "mimeType": FOLDER_MIME_TYPE,
        });
        let url = self.api_url(&["files"], &[]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::POST, url).json(&body),
            &[200],
            |code, message| ProviderError::CreateFolder { message, code },
        )
        .await?;

        let raw = response.json_value()?;
        let item = self.parse_item(&raw)?;
        info!("created folder {}", path.full_path());
        Ok(FolderRecord {
            provider: PROVIDER_NAME,
            name: item.name.clone(),
            path: path.with_identifier(item.id),
            raw,
            children: None,
            deleted: false,
        })
    }

    async fn delete(&self, path: &VirtualPath, confirm_delete: i32) -> Result<(), ProviderError> {
        let file_id = require_identifier(path)?.to_string();
        if guard_root_delete(path, confirm_delete)? {
            return self.delete_folder_contents(&file_id).await;
        }

        let url = self.api_url(&["files", &file_id], &[]);
        send_expect(
            self.transport.as_ref(),
            self.request(Method::DELETE, url),
            &[200, 204],
            |code, message| ProviderError::Delete { message, code },
        )
        .await?;
        info!("deleted {}", path.full_path());
        Ok(())
    }

    async fn download(
        &self,
        path: &VirtualPath,
        revision: Option<&str>,
        range: Option<(u64, u64)>,
    ) -> Result<ByteStream, ProviderError> {
        let record = self.file_metadata(path, revision).await?;
        let file_id = require_identifier(path)?;

        let url = if record.size.is_some() {
            self.api_url(&["files", file_id], &[("alt", "media")])
        } else {
            // Docs have no native bytes; stream the export instead.
            let item = self.parse_item(&record.raw)?;
            export_link(&item).ok_or_else(|| ProviderError::Download {
                message: "No export available for this file type".to_string(),
                code: 400,
            })?
        };

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

        stream.add_writer("md5", Box::new(Md5Writer::new()));
        let created = path.identifier().is_none();
        let size = stream.size().unwrap_or(0);

        // Step one: open a resumable session.
        let session_url = match path.identifier() {
            Some(id) => self.upload_url(&["files", id], &[("uploadType", "resumable")]),
            None => self.upload_url(&["files"], &[("uploadType", "resumable")]),
        };
        let method = if created { Method::POST } else { Method::PUT };
        let body = json!({
            "parents": [{"id": parent_id}],
            "name": path.name(),
        });
        let response = send_expect(
            self.transport.as_ref(),
            self.request(method, session_url)
                .header("X-Upload-Content-Length", size.to_string())
                .json(&body),
            &[200],
            |code, message| ProviderError::Upload { message, code },
        )
        .await?;
        let location = response
            .header("location")
            .ok_or_else(|| ProviderError::Upload {
                message: "Resumable session response carried no Location".to_string(),
                code: 500,
            })?
            .to_string();

        // Step two: send the bytes through the checksum writer.
        let data = stream
            .read_to_end()
            .await
            .map_err(|e| ProviderError::Upload {
                message: e.to_string(),
                code: 500,
            })?;
        let response = send_expect(
            self.transport.as_ref(),
            Request::new(Method::PUT, location)
                .header("Content-Length", size.to_string())
                .body(data),
            &[200, 201],
            |code, message| ProviderError::Upload { message, code },
        )
        .await?;

        let raw = response.json_value()?;
        let item = self.parse_item(&raw)?;
        if let Some(remote_md5) = &item.md5_checksum {
            if stream.writer_hexdigest("md5").as_deref() != Some(remote_md5.as_str()) {
                return Err(ProviderError::UploadChecksumMismatch);
            }
        }

        let result_path = path.with_identifier(item.id.clone());
        info!("uploaded {} ({} bytes)", path.full_path(), size);
        Ok((self.file_record(item, raw, result_path), created))
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
        if !created {
            // Destructive overwrite: clear the old destination first.
            dest_provider.delete(dest_path, 0).await?;
        }

        let src_id = require_identifier(src_path)?;
        let parent = dest_path.parent().ok_or_else(|| ProviderError::IntraMove {
            message: "Destination has no parent folder".to_string(),
            code: 400,
        })?;
        let parent_id = require_identifier(&parent)?.to_string();

        let body = json!({
            "parents": [{"id": parent_id}],
            "name": dest_path.name(),
        });
        let url = self.api_url(&["files", src_id], &[]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::PATCH, url).json(&body),
            &[200],
            |code, message| ProviderError::IntraMove { message, code },
        )
        .await?;

        let raw = response.json_value()?;
        let item = self.parse_item(&raw)?;
        // The response names the result; never assume the requested
        // destination name survived.
        let final_path = parent.child(&item.name, Some(item.id.clone()), dest_path.is_folder());

        if dest_path.is_folder() {
            let children = self.folder_children(&final_path).await?;
            Ok((
                MetadataRecord::Folder(FolderRecord {
                    provider: PROVIDER_NAME,
                    name: item.name.clone(),
                    path: final_path,
                    raw,
                    children: Some(children),
                    deleted: false,
                }),
                created,
            ))
        } else {
            Ok((
                MetadataRecord::File(self.file_record(item, raw, final_path)),
                created,
            ))
        }
    }

    async fn intra_copy(
        &self,
        dest_provider: &dyn StorageProvider,
        src_path: &VirtualPath,
        dest_path: &VirtualPath,
    ) -> Result<(MetadataRecord, bool), ProviderError> {
        if !self.can_intra_copy(dest_provider, Some(src_path)) {
            return Err(ProviderError::IntraCopy {
                message: "Intra-copy not supported for this source".to_string(),
                code: 400,
            });
        }

        let created = dest_path.identifier().is_none();
        if !created {
            dest_provider.delete(dest_path, 0).await?;
        }

        let src_id = require_identifier(src_path)?;
        let parent = dest_path.parent().ok_or_else(|| ProviderError::IntraCopy {
            message: "Destination has no parent folder".to_string(),
            code: 400,
        })?;
        let parent_id = require_identifier(&parent)?.to_string();

        let body = json!({
            "parents": [{"id": parent_id}],
            "name": dest_path.name(),
        });
        let url = self.api_url(&["files", src_id, "copy"], &[("fields", FILE_FIELDS)]);
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::POST, url).json(&body),
            &[200],
            |code, message| ProviderError::IntraCopy { message, code },
        )
        .await?;

        let raw = response.json_value()?;
        let item = self.parse_item(&raw)?;
        let final_path = parent.child(&item.name, Some(item.id.clone()), false);
        Ok((
            MetadataRecord::File(self.file_record(item, raw, final_path)),
            created,
        ))
    }
}
