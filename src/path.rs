//! Backend-agnostic hierarchical paths.
//!
//! A [`VirtualPath`] is an ordered list of [`PathPart`]s, one per path
//! segment, each carrying the segment's percent-encoded name and, once
//! resolved, the backend's opaque identifier for that segment. Part 0 is
//! always the root: an empty name, folder flag set, identifier equal to the
//! backend's configured root/share id. Identifiers are optional because
//! resolution assigns them lazily; a path that points at a not-yet-created
//! entity simply has `None` on its final part.
//!
//! Paths are value types: mutations never update a path in place, they build
//! a new one (see [`VirtualPath::child`] and [`VirtualPath::with_identifier`]),
//! so a stale identifier can never leak through a rename or move.

use std::fmt;

use crate::errors::ProviderError;

/// One path segment: encoded name, optional backend identifier, folder flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPart {
    raw: String,
    id: Option<String>,
    folder: bool,
}

impl PathPart {
    /// Build a part from a display name, encoding it for the wire.
    pub fn new(name: &str, id: Option<String>, folder: bool) -> Self {
        Self {
            raw: urlencoding::encode(name).into_owned(),
            id,
            folder,
        }
    }

    fn from_raw(raw: String, id: Option<String>, folder: bool) -> Self {
        Self { raw, id, folder }
    }

    /// Percent-encoded segment name, exactly as it appears on the wire.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded display name.
    pub fn name(&self) -> String {
        match urlencoding::decode(&self.raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => self.raw.clone(),
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_folder(&self) -> bool {
        self.folder
    }
}

/// Hierarchical path with one optional backend identifier per segment.
///
/// Two paths are equal iff their full encoded form and their entire
/// identifier sequence match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    parts: Vec<PathPart>,
}

impl VirtualPath {
    /// The root path `/`, always a folder, carrying the backend's root id.
    pub fn root(root_id: impl Into<String>) -> Self {
        Self {
            parts: vec![PathPart::from_raw(String::new(), Some(root_id.into()), true)],
        }
    }

    /// Parse a path string with no identifiers attached.
    pub fn parse(path: &str, folder_hint: Option<bool>) -> Result<Self, ProviderError> {
        Self::parse_with_ids(path, Vec::new(), folder_hint)
    }

    /// Parse a path string, attaching `ids` to the parts from the root
    /// outwards; parts beyond the end of `ids` stay unresolved.
    ///
    /// The string must start with `/`; segments are taken as already
    /// percent-encoded. The final segment's folder flag comes from the
    /// trailing slash unless `folder_hint` overrides it (used when the
    /// caller already knows the target's kind from prior metadata).
    pub fn parse_with_ids(
        path: &str,
        ids: Vec<Option<String>>,
        folder_hint: Option<bool>,
    ) -> Result<Self, ProviderError> {
        if !path.starts_with('/') {
            return Err(ProviderError::InvalidPath(path.to_string()));
        }

        let mut ids = ids.into_iter();
        let mut parts = vec![PathPart::from_raw(String::new(), ids.next().flatten(), true)];

        if path != "/" {
            let folder = folder_hint.unwrap_or_else(|| path.ends_with('/'));
            let trimmed = path.trim_matches('/');
            let segments: Vec<&str> = trimmed.split('/').collect();
            let last = segments.len() - 1;
            for (i, segment) in segments.iter().enumerate() {
                if segment.is_empty() {
                    return Err(ProviderError::InvalidPath(path.to_string()));
                }
                let part_folder = i != last || folder;
                parts.push(PathPart::from_raw(
                    (*segment).to_string(),
                    ids.next().flatten(),
                    part_folder,
                ));
            }
        }

        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[PathPart] {
        &self.parts
    }

    fn last(&self) -> &PathPart {
        self.parts.last().expect("a path always has a root part")
    }

    pub fn is_root(&self) -> bool {
        self.parts.len() == 1
    }

    pub fn is_folder(&self) -> bool {
        self.last().folder
    }

    pub fn is_file(&self) -> bool {
        !self.is_folder()
    }

    /// Decoded name of the final segment; empty for the root.
    pub fn name(&self) -> String {
        self.last().name()
    }

    /// Identifier of the final segment, if resolution assigned one.
    pub fn identifier(&self) -> Option<&str> {
        self.last().identifier()
    }

    /// Identifier of the root part.
    pub fn root_identifier(&self) -> Option<&str> {
        self.parts[0].identifier()
    }

    pub fn parent(&self) -> Option<VirtualPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
        })
    }

    /// A path one segment longer. Ancestor parts are copied verbatim; the
    /// identifier is attached only to the new final segment.
    pub fn child(&self, name: &str, id: Option<String>, folder: bool) -> VirtualPath {
        let mut parts = self.parts.clone();
        parts.push(PathPart::new(name, id, folder));
        Self { parts }
    }

    /// The same path with a freshly learned identifier on its final segment.
    pub fn with_identifier(&self, id: impl Into<String>) -> VirtualPath {
        let mut parts = self.parts.clone();
        if let Some(part) = parts.last_mut() {
            part.id = Some(id.into());
        }
        Self { parts }
    }

    /// Decoded path string: leading `/`, trailing `/` iff folder.
    pub fn full_path(&self) -> String {
        if self.is_root() {
            return "/".to_string();
        }
        let mut out = String::new();
        for part in &self.parts[1..] {
            out.push('/');
            out.push_str(&part.name());
        }
        if self.is_folder() {
            out.push('/');
        }
        out
    }

    /// Encoded path string, segments exactly as they travel on the wire.
    pub fn encoded_path(&self) -> String {
        if self.is_root() {
            return "/".to_string();
        }
        let mut out = String::new();
        for part in &self.parts[1..] {
            out.push('/');
            out.push_str(part.raw());
        }
        if self.is_folder() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let root = VirtualPath::root("share-1");
        assert!(root.is_root());
        assert!(root.is_folder());
        assert_eq!(root.identifier(), Some("share-1"));
        assert_eq!(root.full_path(), "/");
        assert_eq!(root.to_string(), "/");
    }

    #[test]
    fn test_parse_file_and_folder() {
        let file = VirtualPath::parse("/docs/report.txt", None).unwrap();
        assert!(file.is_file());
        assert_eq!(file.name(), "report.txt");
        assert_eq!(file.parts().len(), 3);
        assert!(file.parts()[1].is_folder());

        let folder = VirtualPath::parse("/docs/archive/", None).unwrap();
        assert!(folder.is_folder());
        assert_eq!(folder.full_path(), "/docs/archive/");
    }

    #[test]
    fn test_folder_hint_overrides_trailing_slash() {
        let path = VirtualPath::parse("/docs/archive", Some(true)).unwrap();
        assert!(path.is_folder());
        assert_eq!(path.full_path(), "/docs/archive/");
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(matches!(
            VirtualPath::parse("relative/path", None),
            Err(ProviderError::InvalidPath(_))
        ));
        assert!(matches!(
            VirtualPath::parse("/a//b", None),
            Err(ProviderError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_ids_align_from_root() {
        let path = VirtualPath::parse_with_ids(
            "/a/b",
            vec![Some("root".into()), Some("id-a".into())],
            None,
        )
        .unwrap();
        assert_eq!(path.root_identifier(), Some("root"));
        assert_eq!(path.parts()[1].identifier(), Some("id-a"));
        assert_eq!(path.identifier(), None);
    }

    #[test]
    fn test_child_keeps_ancestor_identifiers() {
        let root = VirtualPath::root("root");
        let child = root.child("pictures", Some("id-1".into()), true);
        let grandchild = child.child("cat.png", Some("id-2".into()), false);
        assert_eq!(grandchild.root_identifier(), Some("root"));
        assert_eq!(grandchild.parts()[1].identifier(), Some("id-1"));
        assert_eq!(grandchild.identifier(), Some("id-2"));
        // the parent is untouched
        assert_eq!(child.identifier(), Some("id-1"));
    }

    #[test]
    fn test_child_encodes_names() {
        let root = VirtualPath::root("root");
        let child = root.child("with space", None, false);
        assert_eq!(child.parts()[1].raw(), "with%20space");
        assert_eq!(child.name(), "with space");
        assert_eq!(child.full_path(), "/with space");
        assert_eq!(child.encoded_path(), "/with%20space");
    }

    #[test]
    fn test_round_trip() {
        for p in ["/a/b/c", "/a/b/", "/file.txt"] {
            assert_eq!(VirtualPath::parse(p, None).unwrap().full_path(), p);
        }
    }

    #[test]
    fn test_equality_includes_identifiers() {
        let a = VirtualPath::parse_with_ids("/x", vec![Some("r".into()), Some("1".into())], None)
            .unwrap();
        let b = VirtualPath::parse_with_ids("/x", vec![Some("r".into()), Some("1".into())], None)
            .unwrap();
        let c = VirtualPath::parse_with_ids("/x", vec![Some("r".into()), Some("2".into())], None)
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_with_identifier_builds_a_new_path() {
        let path = VirtualPath::parse("/x", None).unwrap();
        let resolved = path.with_identifier("fresh");
        assert_eq!(path.identifier(), None);
        assert_eq!(resolved.identifier(), Some("fresh"));
        assert_ne!(path, resolved);
    }

    #[test]
    fn test_parent() {
        let path = VirtualPath::parse("/a/b/c", None).unwrap();
        let parent = path.parent().unwrap();
        assert_eq!(parent.full_path(), "/a/b/");
        assert!(VirtualPath::root("r").parent().is_none());
    }
}
