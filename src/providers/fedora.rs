//! Fedora repository storage provider.
//!
//! Fedora 4 exposes a real hierarchy over HTTP: every resource has a URL,
//! containers hold children, and a binary keeps its description on a
//! sibling `/fcr:metadata` resource. Paths therefore resolve by direct URL
//! construction plus a HEAD probe per segment; the probe's `Link` header
//! tells container from binary. Identifiers here are the resource URLs
//! themselves.
//!
//! Deletion leaves a tombstone behind that must be removed separately, or
//! the name can never be reused. Written against Fedora 4.5.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::FedoraConfig;
use crate::errors::ProviderError;
use crate::metadata::{
    Checksum, FileRecord, FolderRecord, MetadataListing, MetadataRecord, RevisionRecord,
};
use crate::path::VirtualPath;
use crate::providers::{
    guard_root_delete, precheck_folder_conflict, require_folder, StorageProvider,
    REVISION_SENTINEL,
};
use crate::resolve::{resolve, Entity, Mode, ResolvedSegment, SegmentLookup};
use crate::streams::{ByteStream, Sha1Writer};
use crate::transport::{send_expect, Request, Transport};

pub const PROVIDER_NAME: &str = "fedora";

const LDP_CONTAINER: &str = "http://www.w3.org/ns/ldp#Container";
const LDP_CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
const FEDORA_CREATED: &str = "http://fedora.info/definitions/v4/repository#created";
const FEDORA_LAST_MODIFIED: &str = "http://fedora.info/definitions/v4/repository#lastModified";
const PREMIS_SIZE: &str = "http://www.loc.gov/premis/rdf/v1#hasSize";
const PREMIS_DIGEST: &str = "http://www.loc.gov/premis/rdf/v1#hasMessageDigest";
const EBUCORE_MIME: &str = "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#hasMimeType";
/// Tells Fedora to embed child resource triples in a container response.
const EMBED_PREFER: &str = "return=representation; \
     include=\"http://fedora.info/definitions/v4/repository#EmbedResources\"";

/// Content types Fedora interprets as RDF. Uploading with one of these
/// would create a container instead of a binary.
const RDF_MIME_TYPES: [&str; 7] = [
    "text/turtle",
    "text/rdf+n3",
    "text/n3",
    "application/n3",
    "application/rdf+xml",
    "application/n-triples",
    "application/ld+json",
];

mod fedora_methods {
    use reqwest::Method;

    pub fn move_method() -> Method {
        Method::from_bytes(b"MOVE").unwrap()
    }

    pub fn copy() -> Method {
        Method::from_bytes(b"COPY").unwrap()
    }
}

// JSON-LD helpers. Fedora's expanded JSON-LD is an array of nodes keyed by
// "@id"; property values are arrays of {"@value": ...} or {"@id": ...}.

fn jsonld_node<'a>(raw: &'a Value, id: &str) -> Option<&'a Value> {
    raw.as_array()?
        .iter()
        .find(|node| node.get("@id").and_then(Value::as_str) == Some(id))
}

fn jsonld_string(node: &Value, predicate: &str) -> Option<String> {
    let value = node.get(predicate)?.as_array()?.first()?.get("@value")?;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn jsonld_ids(node: &Value, predicate: &str) -> Vec<String> {
    node.get(predicate)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("@id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn node_is_container(node: &Value) -> bool {
    node.get("@type")
        .and_then(Value::as_array)
        .map(|types| types.iter().any(|t| t.as_str() == Some(LDP_CONTAINER)))
        .unwrap_or(false)
}

/// Digest triples look like `urn:sha1:<hex>`.
fn digest_from_node(node: &Value) -> Option<Checksum> {
    let urn = jsonld_ids(node, PREMIS_DIGEST).into_iter().next()?;
    let hex = urn.strip_prefix("urn:sha1:")?.to_string();
    Some(Checksum {
        algorithm: "sha1",
        hex,
    })
}

pub struct FedoraProvider {
    config: FedoraConfig,
    transport: Arc<dyn Transport>,
}

impl FedoraProvider {
    pub fn new(config: FedoraConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    fn auth_header(&self) -> String {
        let token = BASE64.encode(format!(
            "{}:{}",
            self.config.user,
            self.config.password.expose_secret()
        ));
        format!("Basic {token}")
    }

    fn request(&self, method: Method, url: String) -> Request {
        Request::new(method, url).header("Authorization", self.auth_header())
    }

    /// Repository URL for a path, from its raw (already encoded) segments.
    fn build_repo_url(&self, path: &VirtualPath) -> String {
        let mut url = self.config.repo_url.clone();
        for part in &path.parts()[1..] {
            url.push('/');
            url.push_str(part.raw());
        }
        url
    }

    /// Map a repository URL (e.g. from a `Location` header) back onto a
    /// path, assigning each segment its own URL as identifier.
    fn repo_url_to_path(&self, url: &str, folder: bool) -> Result<VirtualPath, ProviderError> {
        let rest = url.strip_prefix(&self.config.repo_url).ok_or_else(|| {
            ProviderError::Transport(format!(
                "backend returned a location outside the repository: {url}"
            ))
        })?;
        let rest = rest.trim_matches('/');
        if rest.is_empty() {
            return Ok(VirtualPath::root(self.config.repo_url.clone()));
        }

        let mut ids = vec![Some(self.config.repo_url.clone())];
        let mut prefix = self.config.repo_url.clone();
        for segment in rest.split('/') {
            prefix.push('/');
            prefix.push_str(segment);
            ids.push(Some(prefix.clone()));
        }

        let mut path_str = format!("/{rest}");
        if folder && !path_str.ends_with('/') {
            path_str.push('/');
        }
        VirtualPath::parse_with_ids(&path_str, ids, Some(folder))
    }

    /// HEAD probe: does the resource exist, and is it a container?
    async fn probe(&self, url: &str) -> Result<Option<bool>, ProviderError> {
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::HEAD, url.to_string()),
            &[200, 404],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await?;
        if response.status == 404 {
            return Ok(None);
        }
        let is_container = response
            .header("link")
            .map(|links| links.contains(LDP_CONTAINER))
            .unwrap_or(false);
        Ok(Some(is_container))
    }

    fn file_record(&self, raw: &Value, fedora_id: &str, path: VirtualPath) -> FileRecord {
        let node = jsonld_node(raw, fedora_id)
            .or_else(|| jsonld_node(raw, &format!("{fedora_id}/fcr:metadata")));
        FileRecord {
            provider: PROVIDER_NAME,
            name: path.name(),
            path,
            raw: raw.clone(),
            size: node
                .and_then(|n| jsonld_string(n, PREMIS_SIZE))
                .and_then(|s| s.parse().ok()),
            modified: node.and_then(|n| jsonld_string(n, FEDORA_LAST_MODIFIED)),
            created: node.and_then(|n| jsonld_string(n, FEDORA_CREATED)),
            content_type: node.and_then(|n| jsonld_string(n, EBUCORE_MIME)),
            revision: None,
            checksum: node.and_then(digest_from_node),
        }
    }

    /// Children of a container, read from the embedded triples of its own
    /// JSON-LD document; no further requests.
    fn list_children(&self, raw: &Value, fedora_id: &str, path: &VirtualPath) -> Vec<MetadataRecord> {
        let Some(node) = jsonld_node(raw, fedora_id) else {
            return Vec::new();
        };
        let mut children = Vec::new();
        for child_url in jsonld_ids(node, LDP_CONTAINS) {
            let raw_name = child_url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default();
            let name = match urlencoding::decode(raw_name) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => raw_name.to_string(),
            };
            let child_node = jsonld_node(raw, &child_url)
                .or_else(|| jsonld_node(raw, &format!("{child_url}/fcr:metadata")));
            let folder = child_node.map(node_is_container).unwrap_or(false);
            let child_path = path.child(&name, Some(child_url.clone()), folder);
            if folder {
                children.push(MetadataRecord::Folder(FolderRecord {
                    provider: PROVIDER_NAME,
                    name,
                    path: child_path,
                    raw: child_node.cloned().unwrap_or(Value::Null),
                    children: None,
                    deleted: false,
                }));
            } else {
                // The embedded document describes the child too; keep it as
                // the record's raw payload.
                children.push(MetadataRecord::File(self.file_record(
                    raw,
                    &child_url,
                    child_path,
                )));
            }
        }
        children
    }

    /// Fetch metadata for a resource. Binaries are described at
    /// `{url}/fcr:metadata`; containers describe themselves.
    async fn lookup_metadata(&self, path: &VirtualPath) -> Result<MetadataRecord, ProviderError> {
        let fedora_id = self.build_repo_url(path);
        let is_container = self
            .probe(&fedora_id)
            .await?
            .ok_or_else(|| ProviderError::NotFound(path.full_path()))?;

        let url = if is_container {
            fedora_id.clone()
        } else {
            format!("{fedora_id}/fcr:metadata")
        };
        let response = send_expect(
            self.transport.as_ref(),
            self.request(Method::GET, url)
                .header("Accept", "application/ld+json")
                .header("Prefer", EMBED_PREFER),
            &[200, 404],
            |code, message| ProviderError::Metadata { message, code },
        )
        .await?;
        if response.status == 404 {
            return Err(ProviderError::NotFound(path.full_path()));
        }
        let raw = response.json_value()?;

        if is_container {
            let resolved = path.with_identifier(fedora_id.clone());
            let children = self.list_children(&raw, &fedora_id, &resolved);
            Ok(MetadataRecord::Folder(FolderRecord {
                provider: PROVIDER_NAME,
                name: resolved.name(),
                path: resolved,
                raw,
                children: Some(children),
                deleted: false,
            }))
        } else {
            let resolved = path.with_identifier(fedora_id.clone());
            Ok(MetadataRecord::File(self.file_record(
                &raw, &fedora_id, resolved,
            )))
        }
    }

    /// DELETE the resource, then its tombstone, so the name can be reused.
    async fn delete_resource(&self, url: &str) -> Result<(), ProviderError> {
        send_expect(
            self.transport.as_ref(),
            self.request(Method::DELETE, url.to_string()),
            &[204],
            |code, message| ProviderError::Delete { message, code },
        )
        .await?;
        send_expect(
            self.transport.as_ref(),
            self.request(Method::DELETE, format!("{url}/fcr:tombstone")),
            &[204],
            |code, message| ProviderError::Delete { message, code },
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SegmentLookup for FedoraProvider {
    async fn lookup_child(
        &self,
        ancestors: &[ResolvedSegment],
        name: &str,
        _folder_hint: Option<bool>,
    ) -> Result<Option<Entity>, ProviderError> {
        // Direct addressing: the child URL is fully determined by the names.
        let mut url = self.config.repo_url.clone();
        for ancestor in &ancestors[1..] {
            url.push('/');
            url.push_str(&urlencoding::encode(&ancestor.name));
        }
        url.push('/');
        url.push_str(&urlencoding::encode(name));

        Ok(self.probe(&url).await?.map(|is_container| Entity {
            id: Some(url),
            folder: is_container,
        }))
    }
}

#[async_trait]
impl StorageProvider for FedoraProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn fingerprint(&self) -> String {
        format!("{}::{}", PROVIDER_NAME, self.config.repo_url)
    }

    async fn validate_v1_path(&self, path: &str) -> Result<VirtualPath, ProviderError> {
        resolve(self, &self.config.repo_url, path, Mode::Existing).await
    }

    async fn validate_path(&self, path: &str) -> Result<VirtualPath, ProviderError> {
        resolve(self, &self.config.repo_url, path, Mode::MaybeMissing).await
    }

    fn can_duplicate_names(&self) -> bool {
        false
    }

    async fn metadata(
        &self,
        path: &VirtualPath,
        _revision: Option<&str>,
    ) -> Result<MetadataListing, ProviderError> {
        match self.lookup_metadata(path).await? {
            MetadataRecord::Folder(folder) => {
                Ok(MetadataListing::Children(folder.children.unwrap_or_default()))
            }
            file => Ok(MetadataListing::Single(file)),
        }
    }

    async fn revisions(&self, path: &VirtualPath) -> Result<Vec<RevisionRecord>, ProviderError> {
        // Version history is not exposed at this access level; forge one
        // recognizable revision from the current state.
        let record = self.lookup_metadata(path).await?;
        let modified = match &record {
            MetadataRecord::File(f) => f.modified.clone(),
            MetadataRecord::Folder(_) => None,
        };
        let stamp = modified.clone().unwrap_or_default();
        Ok(vec![RevisionRecord {
            version: format!("{stamp}{REVISION_SENTINEL}"),
            modified,
        }])
    }

    async fn create_folder(
        &self,
        path: &VirtualPath,
        folder_precheck: bool,
    ) -> Result<FolderRecord, ProviderError> {
        require_folder(path)?;
        precheck_folder_conflict(path, folder_precheck)?;

        let url = self.build_repo_url(path);
        send_expect(
            self.transport.as_ref(),
            self.request(Method::PUT, url.clone()),
            &[201],
            |code, message| ProviderError::CreateFolder { message, code },
        )
        .await?;

        info!("created container {url}");
        match self.lookup_metadata(path).await? {
            MetadataRecord::Folder(folder) => Ok(folder),
            MetadataRecord::File(_) => Err(ProviderError::CreateFolder {
                message: "Backend created a binary where a container was expected".to_string(),
                code: 500,
            }),
        }
    }

    async fn delete(&self, path: &VirtualPath, confirm_delete: i32) -> Result<(), ProviderError> {
        if guard_root_delete(path, confirm_delete)? {
            // Children only; the repository root itself stays.
            let listing = self.metadata(path, None).await?;
            if let MetadataListing::Children(children) = listing {
                for child in children {
                    if let Some(url) = child.path().identifier() {
                        self.delete_resource(url).await?;
                    }
                }
            }
            return Ok(());
        }

        let url = self.build_repo_url(path);
        self.delete_resource(&url).await?;
        info!("deleted {url}");
        Ok(())
    }

    async fn download(
        &self,
        path: &VirtualPath,
        _revision: Option<&str>,
        range: Option<(u64, u64)>,
    ) -> Result<ByteStream, ProviderError> {
        let url = self.build_repo_url(path);
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

        let created = path.identifier().is_none();
        let url = self.build_repo_url(path);

        // A Content-Type is mandatory: without one, or with an RDF type,
        // Fedora would create a container instead of a binary.
        let guessed = mime_guess::from_path(path.name())
            .first_raw()
            .unwrap_or("application/octet-stream");
        let mime = if RDF_MIME_TYPES.contains(&guessed) {
            "application/octet-stream"
        } else {
            guessed
        };

        stream.add_writer("sha1", Box::new(Sha1Writer::new()));
        let size = stream.size().unwrap_or(0);
        let data = stream
            .read_to_end()
            .await
            .map_err(|e| ProviderError::Upload {
                message: e.to_string(),
                code: 500,
            })?;

        send_expect(
            self.transport.as_ref(),
            self.request(Method::PUT, url.clone())
                .header("Content-Type", mime)
                .header("Content-Length", size.to_string())
                .body(data),
            &[201, 204],
            |code, message| ProviderError::Upload { message, code },
        )
        .await?;

        let resolved = path.with_identifier(url.clone());
        let record = match self.lookup_metadata(&resolved).await? {
            MetadataRecord::File(file) => file,
            MetadataRecord::Folder(_) => {
                return Err(ProviderError::Upload {
                    message: "Backend created a container where a binary was expected".to_string(),
                    code: 500,
                })
            }
        };
        if let Some(checksum) = &record.checksum {
            if checksum.algorithm == "sha1"
                && stream.writer_hexdigest("sha1").as_deref() != Some(checksum.hex.as_str())
            {
                return Err(ProviderError::UploadChecksumMismatch);
            }
        }
        info!("uploaded {url} ({size} bytes)");
        Ok((record, created))
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
        let src_url = self.build_repo_url(src_path);
        let dest_url = self.build_repo_url(dest_path);

        let response = send_expect(
            self.transport.as_ref(),
            self.request(fedora_methods::move_method(), src_url.clone())
                .header("Destination", dest_url.clone()),
            &[201],
            |code, message| ProviderError::IntraMove { message, code },
        )
        .await?;

        // The move leaves a tombstone at the source; clear it so the old
        // name can be reused.
        send_expect(
            self.transport.as_ref(),
            self.request(Method::DELETE, format!("{src_url}/fcr:tombstone")),
            &[204],
            |code, message| ProviderError::Delete { message, code },
        )
        .await?;

        let location = response
            .header("location")
            .map(str::to_string)
            .unwrap_or(dest_url);
        debug!("moved {src_url} -> {location}");
        let final_path = self.repo_url_to_path(&location, dest_path.is_folder())?;
        let record = self.lookup_metadata(&final_path).await?;
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
        let src_url = self.build_repo_url(src_path);
        let dest_url = self.build_repo_url(dest_path);

        let response = send_expect(
            self.transport.as_ref(),
            self.request(fedora_methods::copy(), src_url)
                .header("Destination", dest_url.clone()),
            &[201],
            |code, message| ProviderError::IntraCopy { message, code },
        )
        .await?;

        let location = response
            .header("location")
            .map(str::to_string)
            .unwrap_or(dest_url);
        let final_path = self.repo_url_to_path(&location, dest_path.is_folder())?;
        let record = self.lookup_metadata(&final_path).await?;
        Ok((record, created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;
    use serde_json::json;

    const REPO: &str = "https://repo.test/rest";

    fn provider(transport: Arc<MockTransport>) -> FedoraProvider {
        FedoraProvider::new(
            FedoraConfig {
                repo_url: REPO.to_string(),
                user: "cat".to_string(),
                password: "naps".to_string().into(),
            },
            transport,
        )
    }

    fn container_link() -> Vec<(String, String)> {
        vec![(
            "Link".to_string(),
            format!("<{LDP_CONTAINER}>;rel=\"type\""),
        )]
    }

    fn container_doc(id: &str, children: &[(&str, bool)]) -> Value {
        let mut nodes = vec![json!({
            "@id": id,
            "@type": ["http://www.w3.org/ns/ldp#Container"],
            FEDORA_CREATED: [{"@value": "2021-01-01T00:00:00Z"}],
            FEDORA_LAST_MODIFIED: [{"@value": "2021-06-01T00:00:00Z"}],
            LDP_CONTAINS: children.iter()
                .map(|(url, _)| json!({"@id": url}))
                .collect::<Vec<_>>(),
        })];
        for (url, is_container) in children {
            if *is_container {
                nodes.push(json!({
                    "@id": url,
                    "@type": ["http://www.w3.org/ns/ldp#Container"],
                }));
            } else {
                nodes.push(json!({
                    "@id": url,
                    "@type": ["http://www.w3.org/ns/ldp#NonRDFSource"],
                    PREMIS_SIZE: [{"@value": "11"}],
                    EBUCORE_MIME: [{"@value": "text/plain"}],
                }));
            }
        }
        json!(nodes)
    }

    fn binary_doc(id: &str) -> Value {
        json!([{
            "@id": id,
            "@type": ["http://www.w3.org/ns/ldp#NonRDFSource"],
            FEDORA_CREATED: [{"@value": "2021-01-01T00:00:00Z"}],
            FEDORA_LAST_MODIFIED: [{"@value": "2021-06-01T00:00:00Z"}],
            PREMIS_SIZE: [{"@value": "11"}],
            PREMIS_DIGEST: [{"@id": "urn:sha1:2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"}],
            EBUCORE_MIME: [{"@value": "text/plain"}],
        }])
    }

    #[tokio::test]
    async fn test_validate_v1_path_probes_each_segment() {
        let transport = Arc::new(MockTransport::new());
        let p = provider(transport.clone());

        transport.stub_raw("HEAD", &format!("{REPO}/docs"), 200, Vec::new(), container_link());
        transport.stub_status("HEAD", &format!("{REPO}/docs/notes.txt"), 200);

        let path = p.validate_v1_path("/docs/notes.txt").await.unwrap();
        assert_eq!(path.parts()[1].identifier(), Some(format!("{REPO}/docs").as_str()));
        assert_eq!(path.identifier(), Some(format!("{REPO}/docs/notes.txt").as_str()));
        assert_eq!(
            transport.calls(),
            vec![
                format!("HEAD {REPO}/docs"),
                format!("HEAD {REPO}/docs/notes.txt"),
            ]
        );
    }

    #[tokio::test]
    async fn test_validate_v1_path_kind_mismatch_is_not_found() {
        let transport = Arc::new(MockTransport::new());
        let p = provider(transport.clone());

        // `/docs` is a container, but the caller asked for a file.
        transport.stub_raw("HEAD", &format!("{REPO}/docs"), 200, Vec::new(), container_link());
        let err = p.validate_v1_path("/docs").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));

        let ok = p.validate_v1_path("/docs/").await.unwrap();
        assert!(ok.is_folder());
    }

    #[tokio::test]
    async fn test_metadata_lists_embedded_children() {
        let transport = Arc::new(MockTransport::new());
        let p = provider(transport.clone());

        let url = format!("{REPO}/docs");
        transport.stub_raw("HEAD", &url, 200, Vec::new(), container_link());
        transport.stub_json(
            "GET",
            &url,
            200,
            container_doc(
                &url,
                &[
                    (&format!("{REPO}/docs/sub"), true),
                    (&format!("{REPO}/docs/notes.txt"), false),
                ],
            ),
        );

        let path = VirtualPath::parse_with_ids(
            "/docs/",
            vec![Some(REPO.to_string()), Some(url.clone())],
            None,
        )
        .unwrap();
        let listing = p.metadata(&path, None).await.unwrap();
        let MetadataListing::Children(children) = listing else {
            panic!("folder metadata must list children");
        };
        assert_eq!(children.len(), 2);
        assert!(children[0].is_folder());
        assert_eq!(children[0].path_str(), "/docs/sub/");
        assert_eq!(children[1].name(), "notes.txt");
        match &children[1] {
            MetadataRecord::File(f) => assert_eq!(f.size, Some(11)),
            _ => panic!("notes.txt is a file"),
        }
    }

    #[tokio::test]
    async fn test_file_metadata_reads_fcr_metadata_and_digest() {
        let transport = Arc::new(MockTransport::new());
        let p = provider(transport.clone());

        let url = format!("{REPO}/notes.txt");
        transport.stub_status("HEAD", &url, 200);
        transport.stub_json("GET", &format!("{url}/fcr:metadata"), 200, binary_doc(&url));

        let path = VirtualPath::parse_with_ids(
            "/notes.txt",
            vec![Some(REPO.to_string()), Some(url.clone())],
            None,
        )
        .unwrap();
        let listing = p.metadata(&path, None).await.unwrap();
        let MetadataListing::Single(MetadataRecord::File(file)) = listing else {
            panic!("file metadata is a single record");
        };
        assert_eq!(file.size, Some(11));
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert_eq!(
            file.checksum.as_ref().map(|c| c.hex.as_str()),
            Some("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed")
        );
    }

    #[tokio::test]
    async fn test_delete_clears_the_tombstone_too() {
        let transport = Arc::new(MockTransport::new());
        let p = provider(transport.clone());

        let url = format!("{REPO}/junk");
        transport.stub_status("DELETE", &url, 204);
        transport.stub_status("DELETE", &format!("{url}/fcr:tombstone"), 204);

        let path = VirtualPath::parse_with_ids(
            "/junk",
            vec![Some(REPO.to_string()), Some(url.clone())],
            None,
        )
        .unwrap();
        p.delete(&path, 0).await.unwrap();
        assert_eq!(
            transport.calls(),
            vec![
                format!("DELETE {url}"),
                format!("DELETE {url}/fcr:tombstone"),
            ]
        );
    }

    #[tokio::test]
    async fn test_intra_move_rederives_path_from_location_header() {
        let transport = Arc::new(MockTransport::new());
        let p = provider(transport.clone());

        let src_url = format!("{REPO}/old.txt");
        // The backend may settle on a different final URL.
        let actual_url = format!("{REPO}/sub/new-1.txt");

        transport.stub_raw(
            "MOVE",
            &src_url,
            201,
            Vec::new(),
            vec![("Location".to_string(), actual_url.clone())],
        );
        transport.stub_status("DELETE", &format!("{src_url}/fcr:tombstone"), 204);
        transport.stub_status("HEAD", &actual_url, 200);
        transport.stub_json(
            "GET",
            &format!("{actual_url}/fcr:metadata"),
            200,
            binary_doc(&actual_url),
        );

        let src = VirtualPath::parse_with_ids(
            "/old.txt",
            vec![Some(REPO.to_string()), Some(src_url.clone())],
            None,
        )
        .unwrap();
        let dest = VirtualPath::parse("/sub/new.txt", None).unwrap();

        let (record, created) = p.intra_move(&p, &src, &dest).await.unwrap();
        assert!(created);
        assert_eq!(record.path_str(), "/sub/new-1.txt");
        assert_eq!(record.path().identifier(), Some(actual_url.as_str()));

        // Move first, tombstone second.
        let calls = transport.calls();
        assert_eq!(calls[0], format!("MOVE {src_url}"));
        assert_eq!(calls[1], format!("DELETE {src_url}/fcr:tombstone"));
    }

    #[tokio::test]
    async fn test_repo_url_to_path_assigns_segment_urls() {
        let p = provider(Arc::new(MockTransport::new()));
        let path = p
            .repo_url_to_path(&format!("{REPO}/a/b.txt"), false)
            .unwrap();
        assert_eq!(path.full_path(), "/a/b.txt");
        assert_eq!(path.root_identifier(), Some(REPO));
        assert_eq!(path.parts()[1].identifier(), Some(format!("{REPO}/a").as_str()));
        assert_eq!(path.identifier(), Some(format!("{REPO}/a/b.txt").as_str()));

        assert!(p.repo_url_to_path("https://elsewhere/x", false).is_err());
    }

    #[tokio::test]
    async fn test_create_folder_returns_container_metadata() {
        let transport = Arc::new(MockTransport::new());
        let p = provider(transport.clone());

        let url = format!("{REPO}/fresh");
        transport.stub_status("PUT", &url, 201);
        transport.stub_raw("HEAD", &url, 200, Vec::new(), container_link());
        transport.stub_json("GET", &url, 200, container_doc(&url, &[]));

        let path = VirtualPath::parse_with_ids("/fresh/", vec![Some(REPO.to_string())], None).unwrap();
        let folder = p.create_folder(&path, true).await.unwrap();
        assert_eq!(folder.name, "fresh");
        assert_eq!(folder.path.identifier(), Some(url.as_str()));
    }
}
