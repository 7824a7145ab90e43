use std::collections::HashMap;
use std::path::{Path, PathBuf};

use strata_node::{BlobRef, DirectoryEntry, DirectoryNode, FileEntry, FileFlags};
use strata_store::BlobStore;
use strata_types::ObjectId;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::chunker::Chunker;
use crate::error::{ChunkError, ChunkResult};
use crate::options::ChunkingOptions;

/// Summary of an imported directory tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    pub root: BlobRef,
    pub files: u64,
    pub directories: u64,
    pub bytes: u64,
}

#[derive(Default)]
struct Pending {
    files: Vec<FileEntry>,
    directories: Vec<DirectoryEntry>,
}

/// Chunks every file under a directory and writes a tree of listings.
pub struct DirectoryImporter<'a, S: BlobStore + ?Sized> {
    chunker: Chunker<'a, S>,
}

impl<'a, S: BlobStore + ?Sized> DirectoryImporter<'a, S> {
    pub fn new(store: &'a S, options: ChunkingOptions) -> ChunkResult<Self> {
        Ok(Self {
            chunker: Chunker::new(store, options)?,
        })
    }

    /// Import `root`. Symlinks and special files are skipped.
    pub async fn import(&self, root: impl AsRef<Path>) -> ChunkResult<ImportSummary> {
        let root = root.as_ref().to_path_buf();
        let walk_root = root.clone();
        let entries = tokio::task::spawn_blocking(move || {
            WalkDir::new(walk_root)
                .contents_first(true)
                .sort_by_file_name()
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| ChunkError::TaskFailed(e.to_string()))?
        .map_err(std::io::Error::from)?;

        let mut pending: HashMap<PathBuf, Pending> = HashMap::new();
        let mut summary = ImportSummary {
            root: BlobRef::new(ObjectId::null(), ObjectId::null()),
            files: 0,
            directories: 0,
            bytes: 0,
        };

        for entry in entries {
            let path = entry.path();
            let file_type = entry.file_type();
            let name = entry.file_name().to_string_lossy().into_owned();

            if file_type.is_file() {
                let metadata = entry.metadata().map_err(std::io::Error::from)?;
                let (chunked, length) = self.chunker.chunk_file_counted(path).await?;
                debug!(path = %path.display(), length, digest = %chunked.digest, "imported file");
                summary.files += 1;
                summary.bytes += length;
                pending.entry(parent_of(path)).or_default().files.push(FileEntry {
                    name,
                    flags: flags_of(&metadata),
                    length,
                    digest: chunked.digest,
                    data: chunked.root,
                });
            } else if file_type.is_dir() {
                let contents = pending.remove(path).unwrap_or_default();
                let listing = DirectoryNode::new(contents.files, contents.directories);
                let node = listing.write(self.chunker.store()).await?;
                summary.directories += 1;
                if entry.depth() == 0 {
                    summary.root = node;
                    break;
                }
                pending.entry(parent_of(path)).or_default().directories.push(DirectoryEntry {
                    name,
                    length: listing.length(),
                    node,
                });
            } else {
                warn!(path = %path.display(), "skipping non-regular file");
            }
        }

        if summary.directories == 0 {
            return Err(ChunkError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }
        info!(
            root = %summary.root.hash,
            files = summary.files,
            directories = summary.directories,
            bytes = summary.bytes,
            "imported directory tree"
        );
        Ok(summary)
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(unix)]
fn flags_of(metadata: &std::fs::Metadata) -> FileFlags {
    use std::os::unix::fs::PermissionsExt;
    FileFlags::from_mode_bits(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn flags_of(_metadata: &std::fs::Metadata) -> FileFlags {
    FileFlags::Regular
}
