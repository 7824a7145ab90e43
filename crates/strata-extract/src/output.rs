//! Output files and the work items that fill them.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use strata_crypto::StreamHasher;
use strata_node::{ChildRef, FileEntry, FileFlags};
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{ExtractError, ExtractResult};

const VERIFY_BLOCK: usize = 1024 * 1024;

/// Where a file is in its life.
///
/// `remaining` counts queued chunks not yet written, plus one while the
/// file's leaves are still being enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileStage {
    /// No chunk written yet.
    Pending { remaining: usize },
    /// Some chunks written.
    Writing { remaining: usize },
    /// Every chunk written and the file closed out.
    Finalized,
}

/// A file being assembled from chunks.
///
/// Writers fill it at explicit offsets in any order. The only shared
/// mutable state is the count of outstanding chunks; whoever takes it to
/// zero finalizes the file.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    flags: FileFlags,
    length: u64,
    digest: strata_types::ObjectId,
    remaining: AtomicUsize,
    written: AtomicUsize,
    handle: OnceCell<Arc<File>>,
}

impl OutputFile {
    /// A file whose chunks are about to be queued.
    pub fn new(path: PathBuf, entry: &FileEntry) -> Self {
        Self {
            path,
            flags: entry.flags,
            length: entry.length,
            digest: entry.digest,
            remaining: AtomicUsize::new(1),
            written: AtomicUsize::new(0),
            handle: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn stage(&self) -> FileStage {
        match self.remaining.load(Ordering::Acquire) {
            0 => FileStage::Finalized,
            n if self.written.load(Ordering::Acquire) == 0 => FileStage::Pending { remaining: n },
            n => FileStage::Writing { remaining: n },
        }
    }

    /// Count one more chunk as queued. Call before sending it.
    pub fn add_chunk(&self) {
        self.remaining.fetch_add(1, Ordering::AcqRel);
    }

    /// Count one chunk as written. Returns `true` if the file is now done.
    pub fn complete_chunk(&self) -> bool {
        self.written.fetch_add(1, Ordering::AcqRel);
        self.release()
    }

    /// Mark enumeration finished. Returns `true` if the file is now done.
    pub fn seal(&self) -> bool {
        self.release()
    }

    fn release(&self) -> bool {
        self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }

    async fn handle(&self) -> ExtractResult<Arc<File>> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let length = self.length;
                let opened = tokio::task::spawn_blocking(move || -> std::io::Result<Arc<File>> {
                    let file = std::fs::OpenOptions::new()
                        .write(true)
                        .create(true)
                        .truncate(true)
                        .open(&path)?;
                    file.set_len(length)?;
                    Ok(Arc::new(file))
                })
                .await;
                match opened {
                    Ok(result) => result.map_err(|source| self.write_error(source)),
                    Err(e) => Err(ExtractError::TaskFailed(e.to_string())),
                }
            })
            .await?;
        Ok(handle.clone())
    }

    /// Write `data` at `offset`, opening the file on first use.
    pub async fn write_at(&self, offset: u64, data: Bytes) -> ExtractResult<()> {
        let file = self.handle().await?;
        tokio::task::spawn_blocking(move || write_all_at(&file, &data, offset))
            .await
            .map_err(|e| ExtractError::TaskFailed(e.to_string()))?
            .map_err(|source| self.write_error(source))
    }

    /// Create a zero-length file.
    pub async fn create_empty(&self) -> ExtractResult<()> {
        tokio::fs::File::create(&self.path)
            .await
            .map_err(|source| self.write_error(source))?;
        Ok(())
    }

    /// Apply permissions and optionally check the whole-file digest.
    pub async fn finalize(&self, verify: bool, verbose: bool) -> ExtractResult<()> {
        apply_flags(&self.path, self.flags)
            .await
            .map_err(|source| self.write_error(source))?;

        if verify {
            let actual = hash_file(&self.path)
                .await
                .map_err(|source| self.write_error(source))?;
            if actual != self.digest {
                return Err(ExtractError::OutputMismatch {
                    path: self.path.clone(),
                    expected: self.digest,
                    actual,
                });
            }
        }

        if verbose {
            info!(path = %self.path.display(), length = self.length, "wrote file");
        } else {
            debug!(path = %self.path.display(), length = self.length, "wrote file");
        }
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> ExtractError {
        ExtractError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

/// One chunk to fetch and place.
#[derive(Clone, Debug)]
pub struct ChunkReadRequest {
    pub file: Arc<OutputFile>,
    pub offset: u64,
    pub leaf: ChildRef,
}

/// A fetched chunk on its way to disk.
#[derive(Clone, Debug)]
pub struct ChunkWriteRequest {
    pub file: Arc<OutputFile>,
    pub offset: u64,
    pub data: Bytes,
}

#[cfg(unix)]
fn write_all_at(file: &File, data: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(data, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut data: &[u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !data.is_empty() {
        let n = file.seek_write(data, offset)?;
        if n == 0 {
            return Err(std::io::ErrorKind::WriteZero.into());
        }
        data = &data[n..];
        offset += n as u64;
    }
    Ok(())
}

#[cfg(unix)]
async fn apply_flags(path: &Path, flags: FileFlags) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(flags.mode_bits())).await
}

#[cfg(not(unix))]
async fn apply_flags(_path: &Path, _flags: FileFlags) -> std::io::Result<()> {
    Ok(())
}

async fn hash_file(path: &Path) -> std::io::Result<strata_types::ObjectId> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = StreamHasher::new();
    let mut buf = vec![0u8; VERIFY_BLOCK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.digest())
}
