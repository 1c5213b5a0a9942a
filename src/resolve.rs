//! Generic per-segment path resolution.
//!
//! Every backend resolves a textual path the same way: start from the root
//! identifier and look up one segment at a time, each lookup scoped by the
//! previous segment's resolution. The walk is inherently sequential and is
//! never parallelized; an out-of-order identifier would resolve against the
//! wrong parent. Backends differ only in how one child lookup is answered -
//! a name query for a label graph, a children scan for an internal-name
//! tree, a HEAD probe for a true hierarchy.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::path::VirtualPath;

/// An ancestor already resolved during the walk. `name` is the decoded
/// display name (empty for the root), `id` the backend identifier.
#[derive(Debug, Clone)]
pub struct ResolvedSegment {
    pub name: String,
    pub id: Option<String>,
}

/// What a backend knows about one child entry.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: Option<String>,
    pub folder: bool,
}

/// Whether the final path segment must already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The entity must exist and carry an identifier (`validate_v1_path`).
    Existing,
    /// The final segment may not exist yet, e.g. the target of an upload or
    /// folder creation (`validate_path`).
    MaybeMissing,
}

/// The single primitive a backend supplies to the resolver.
#[async_trait]
pub trait SegmentLookup: Send + Sync {
    /// Find `name` among the children of the last resolved ancestor.
    ///
    /// `folder_hint` carries what the caller's path syntax implies about
    /// this segment: `Some(true)` for intermediates and trailing-slash
    /// finals, `Some(false)` for a final file segment. Backends may use it
    /// to narrow their query; the resolver still verifies the answer.
    /// Duplicate names resolve to the first match.
    async fn lookup_child(
        &self,
        ancestors: &[ResolvedSegment],
        name: &str,
        folder_hint: Option<bool>,
    ) -> Result<Option<Entity>, ProviderError>;
}

/// Walk `path` from `root_id`, returning a [`VirtualPath`] that carries
/// every identifier collected along the way.
pub async fn resolve<B: SegmentLookup>(
    backend: &B,
    root_id: &str,
    path: &str,
    mode: Mode,
) -> Result<VirtualPath, ProviderError> {
    if path == "/" {
        return Ok(VirtualPath::root(root_id));
    }

    // Malformed input is the caller's error, not a resolution failure.
    let parsed = VirtualPath::parse(path, None)?;
    let is_folder = parsed.is_folder();
    let names: Vec<String> = parsed.parts()[1..].iter().map(|p| p.name()).collect();

    let mut ancestors = vec![ResolvedSegment {
        name: String::new(),
        id: Some(root_id.to_string()),
    }];
    let mut ids: Vec<Option<String>> = vec![Some(root_id.to_string())];

    let last = names.len() - 1;
    for (i, name) in names.iter().enumerate() {
        let hint = if i == last { Some(is_folder) } else { Some(true) };
        let found = backend
            .lookup_child(&ancestors, name, hint)
            .await
            .map_err(|e| match e {
                // Resolution failures carry the original path string.
                ProviderError::NotFound(_) => ProviderError::NotFound(path.to_string()),
                other => other,
            })?;

        match found {
            Some(entity) => {
                if i == last && entity.folder != is_folder {
                    // The entity exists but its kind disagrees with the
                    // trailing-slash convention; never resolve silently.
                    return Err(ProviderError::NotFound(path.to_string()));
                }
                if i != last && !entity.folder {
                    return Err(ProviderError::NotFound(path.to_string()));
                }
                ancestors.push(ResolvedSegment {
                    name: name.clone(),
                    id: entity.id.clone(),
                });
                ids.push(entity.id);
            }
            None => {
                if i == last && mode == Mode::MaybeMissing {
                    ids.push(None);
                    break;
                }
                return Err(ProviderError::NotFound(path.to_string()));
            }
        }
    }

    VirtualPath::parse_with_ids(path, ids, Some(is_folder))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// In-memory tree: (parent name, child name) -> entity.
    struct TreeLookup {
        entries: Vec<(&'static str, &'static str, Entity)>,
        lookups: Mutex<usize>,
    }

    impl TreeLookup {
        fn new(entries: Vec<(&'static str, &'static str, Entity)>) -> Self {
            Self {
                entries,
                lookups: Mutex::new(0),
            }
        }

        fn lookup_count(&self) -> usize {
            *self.lookups.lock().unwrap()
        }
    }

    #[async_trait]
    impl SegmentLookup for TreeLookup {
        async fn lookup_child(
            &self,
            ancestors: &[ResolvedSegment],
            name: &str,
            _folder_hint: Option<bool>,
        ) -> Result<Option<Entity>, ProviderError> {
            *self.lookups.lock().unwrap() += 1;
            let parent = ancestors.last().map(|a| a.name.as_str()).unwrap_or("");
            Ok(self
                .entries
                .iter()
                .find(|(p, n, _)| *p == parent && *n == name)
                .map(|(_, _, e)| e.clone()))
        }
    }

    fn entity(id: &str, folder: bool) -> Entity {
        Entity {
            id: Some(id.to_string()),
            folder,
        }
    }

    #[tokio::test]
    async fn test_root_resolves_without_lookups() {
        let tree = TreeLookup::new(vec![]);
        let path = resolve(&tree, "root-id", "/", Mode::Existing).await.unwrap();
        assert!(path.is_root());
        assert_eq!(path.identifier(), Some("root-id"));
        assert_eq!(tree.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_walk_collects_every_identifier() {
        let tree = TreeLookup::new(vec![
            ("", "a", entity("id-a", true)),
            ("a", "b.txt", entity("id-b", false)),
        ]);
        let path = resolve(&tree, "root-id", "/a/b.txt", Mode::Existing)
            .await
            .unwrap();
        assert_eq!(path.root_identifier(), Some("root-id"));
        assert_eq!(path.parts()[1].identifier(), Some("id-a"));
        assert_eq!(path.identifier(), Some("id-b"));
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn test_missing_intermediate_is_not_found() {
        let tree = TreeLookup::new(vec![("gone", "b.txt", entity("id-b", false))]);
        let err = resolve(&tree, "root-id", "/gone/b.txt", Mode::MaybeMissing)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(p) if p == "/gone/b.txt"));
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_not_found() {
        let tree = TreeLookup::new(vec![("", "x", entity("id-x", true))]);
        // `x` exists but is a folder; asking for the file `/x` must not
        // silently resolve.
        let err = resolve(&tree, "root-id", "/x", Mode::Existing)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));

        let ok = resolve(&tree, "root-id", "/x/", Mode::Existing).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_file_in_the_middle_is_not_found() {
        let tree = TreeLookup::new(vec![("", "x", entity("id-x", false))]);
        let err = resolve(&tree, "root-id", "/x/y", Mode::Existing)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_maybe_missing_leaves_final_identifier_unset() {
        let tree = TreeLookup::new(vec![("", "a", entity("id-a", true))]);
        let path = resolve(&tree, "root-id", "/a/new.txt", Mode::MaybeMissing)
            .await
            .unwrap();
        assert_eq!(path.parts()[1].identifier(), Some("id-a"));
        assert_eq!(path.identifier(), None);

        let err = resolve(&tree, "root-id", "/a/new.txt", Mode::Existing)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_path_is_invalid_not_missing() {
        let tree = TreeLookup::new(vec![]);
        let err = resolve(&tree, "root-id", "/a//b", Mode::Existing)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidPath(_)));
        assert_eq!(tree.lookup_count(), 0);
    }
}
