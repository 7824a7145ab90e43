//! Directory listings.
//!
//! A directory blob is a [`NodeType`] header followed by the JSON encoding
//! of a [`DirectoryNode`]. Entries are kept sorted by name so identical
//! trees always produce identical blobs.

use std::path::{Component, Path};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strata_store::BlobStore;
use strata_types::ObjectId;

use crate::error::{NodeError, NodeResult};
use crate::node::{BlobRef, ChildRef};
use crate::schema::NodeType;

/// Current directory listing format version.
pub const DIRECTORY_VERSION: u64 = 1;

/// Permission flags stored with a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFlags {
    /// Normal file (0o644).
    #[default]
    Regular,
    /// Executable file (0o755).
    Executable,
}

impl FileFlags {
    /// Unix permission bits to apply on extraction.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o644,
            Self::Executable => 0o755,
        }
    }

    pub fn from_mode_bits(bits: u32) -> Self {
        if bits & 0o111 != 0 {
            Self::Executable
        } else {
            Self::Regular
        }
    }
}

impl std::fmt::Display for FileFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04o}", self.mode_bits())
    }
}

/// A file in a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub flags: FileFlags,
    pub length: u64,
    /// BLAKE3 of the whole file.
    pub digest: ObjectId,
    /// Root of the file's chunk tree.
    pub data: ChildRef,
}

/// A subdirectory in a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    /// Total bytes of all files beneath this directory.
    pub length: u64,
    pub node: BlobRef,
}

/// Directory listing: files and subdirectories, each sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirectoryEntry>,
}

impl DirectoryNode {
    /// Create a listing. Entries are sorted by name.
    pub fn new(mut files: Vec<FileEntry>, mut directories: Vec<DirectoryEntry>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        directories.sort_by(|a, b| a.name.cmp(&b.name));
        Self { files, directories }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a file by name.
    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Look up a subdirectory by name.
    pub fn directory(&self, name: &str) -> Option<&DirectoryEntry> {
        self.directories.iter().find(|d| d.name == name)
    }

    /// Total bytes of all files beneath this directory.
    pub fn length(&self) -> u64 {
        self.files.iter().map(|f| f.length).sum::<u64>()
            + self.directories.iter().map(|d| d.length).sum::<u64>()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    pub fn encode(&self) -> NodeResult<Bytes> {
        let mut buf = Vec::new();
        NodeType::new(NodeType::DIRECTORY_GUID, DIRECTORY_VERSION).encode(&mut buf);
        serde_json::to_writer(&mut buf, self)
            .map_err(|e| NodeError::Serialization(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    pub fn decode(data: &[u8]) -> NodeResult<Self> {
        let (node_type, offset) = NodeType::decode(data)?;
        if node_type.guid != NodeType::DIRECTORY_GUID {
            return Err(NodeError::UnknownNodeType(node_type.guid));
        }
        if node_type.version != DIRECTORY_VERSION {
            return Err(NodeError::UnsupportedSchemaVersion {
                guid: node_type.guid,
                version: node_type.version,
            });
        }
        let node: Self = serde_json::from_slice(&data[offset..])
            .map_err(|e| NodeError::Serialization(e.to_string()))?;
        let names = node.files.iter().map(|f| f.name.as_str());
        for name in names.chain(node.directories.iter().map(|d| d.name.as_str())) {
            check_entry_name(name)?;
        }
        Ok(node)
    }

    /// Encode and persist this listing.
    pub async fn write<S>(&self, store: &S) -> NodeResult<BlobRef>
    where
        S: BlobStore + ?Sized,
    {
        let encoded = self.encode()?;
        let hash = ObjectId::from_bytes(&encoded);
        let locator = store.put(encoded).await?;
        Ok(BlobRef::new(hash, locator))
    }

    /// Fetch and decode a listing.
    pub async fn read<S>(store: &S, blob: &BlobRef) -> NodeResult<Self>
    where
        S: BlobStore + ?Sized,
    {
        let data = store.read(&blob.locator).await?;
        Self::decode(&data)
    }
}

/// Fail unless `name` is exactly one normal path component.
///
/// Names are joined onto an output directory on extraction, so anything
/// that could climb out of it or replace it is rejected.
pub fn check_entry_name(name: &str) -> NodeResult<()> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    );
    if single && !name.contains(['/', '\\', '\0']) {
        Ok(())
    } else {
        Err(NodeError::InvalidEntryName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{InteriorNode, NodeKind};
    use crate::schema::SchemaVersion;
    use strata_store::InMemoryBlobStore;

    fn file(name: &str, length: u64) -> FileEntry {
        let id = ObjectId::from_bytes(name.as_bytes());
        FileEntry {
            name: name.to_string(),
            flags: FileFlags::Regular,
            length,
            digest: id,
            data: ChildRef::leaf(BlobRef::new(id, id), length, 0),
        }
    }

    #[test]
    fn entries_are_sorted() {
        let dir = DirectoryNode::new(vec![file("z", 1), file("a", 2), file("m", 3)], vec![]);
        let names: Vec<&str> = dir.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "m", "z"]);
        assert_eq!(dir.file("m").unwrap().length, 3);
        assert!(dir.file("q").is_none());
    }

    #[test]
    fn length_includes_subdirectories() {
        let sub = DirectoryEntry {
            name: "sub".into(),
            length: 100,
            node: BlobRef::new(ObjectId::null(), ObjectId::null()),
        };
        let dir = DirectoryNode::new(vec![file("a", 5), file("b", 7)], vec![sub]);
        assert_eq!(dir.length(), 112);
        assert!(dir.directory("sub").is_some());
    }

    #[test]
    fn encode_decode_roundtrip() {
        let dir = DirectoryNode::new(vec![file("a.txt", 10)], vec![]);
        let encoded = dir.encode().unwrap();
        assert_eq!(DirectoryNode::decode(&encoded).unwrap(), dir);
    }

    #[test]
    fn same_listing_same_bytes() {
        let a = DirectoryNode::new(vec![file("x", 1), file("y", 2)], vec![]);
        let b = DirectoryNode::new(vec![file("y", 2), file("x", 1)], vec![]);
        assert_eq!(a.encode().unwrap(), b.encode().unwrap());
    }

    #[test]
    fn interior_blob_is_not_a_directory() {
        let interior = InteriorNode::default().encode(SchemaVersion::LATEST).unwrap();
        let err = DirectoryNode::decode(&interior).unwrap_err();
        assert!(matches!(err, NodeError::UnknownNodeType(g) if g == NodeType::INTERIOR_GUID));
    }

    #[test]
    fn flags_from_mode() {
        assert_eq!(FileFlags::from_mode_bits(0o100755), FileFlags::Executable);
        assert_eq!(FileFlags::from_mode_bits(0o100644), FileFlags::Regular);
        assert_eq!(FileFlags::Executable.to_string(), "0755");
    }

    #[tokio::test]
    async fn store_roundtrip() {
        let store = InMemoryBlobStore::new();
        let dir = DirectoryNode::new(vec![file("f", 4)], vec![]);
        let blob = dir.write(&store).await.unwrap();
        let back = DirectoryNode::read(&store, &blob).await.unwrap();
        assert_eq!(back, dir);
        assert_eq!(back.files[0].data.kind, NodeKind::Leaf);
    }

    #[test]
    fn entry_names_must_be_single_components() {
        for good in ["a.txt", "with space", ".hidden", "..dots"] {
            assert!(check_entry_name(good).is_ok(), "{good}");
        }
        for bad in ["", ".", "..", "../escaped.txt", "/abs", "a/b", "a\\b", "trailing/", "nul\0"] {
            assert!(
                matches!(check_entry_name(bad), Err(NodeError::InvalidEntryName { .. })),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn decode_rejects_escaping_names() {
        let mut dir = DirectoryNode::new(vec![file("ok", 1)], vec![]);
        dir.files[0].name = "../escaped.txt".into();
        let encoded = dir.encode().unwrap();
        let err = DirectoryNode::decode(&encoded).unwrap_err();
        assert!(matches!(err, NodeError::InvalidEntryName { name } if name == "../escaped.txt"));

        let sub = DirectoryEntry {
            name: "/etc".into(),
            length: 0,
            node: BlobRef::new(ObjectId::null(), ObjectId::null()),
        };
        let encoded = DirectoryNode::new(vec![], vec![sub]).encode().unwrap();
        assert!(DirectoryNode::decode(&encoded).is_err());
    }
}
