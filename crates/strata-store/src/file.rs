//! File-based blob storage backend.
//!
//! Stores one file per blob with a fan-out directory layout:
//! `{root}/{hex[0..2]}/{hex}`.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use strata_crypto::ContentHasher;
use strata_types::ObjectId;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// File-based blob store.
///
/// Writes go to a temporary file in the destination directory and are then
/// renamed into place, so a crash never leaves a half-written blob under its
/// final name. Reads re-hash the data and reject blobs that no longer match
/// their locator.
#[derive(Clone, Debug)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, locator: &ObjectId) -> PathBuf {
        let hex = locator.to_hex();
        self.root.join(&hex[0..2]).join(hex)
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, locator: &ObjectId) -> StoreResult<Option<Bytes>> {
        let path = self.blob_path(locator);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !ContentHasher::BLOB.verify(&data, locator) {
            warn!(%locator, path = %path.display(), "blob content does not match locator");
            return Err(StoreError::CorruptBlob {
                locator: *locator,
                computed: ContentHasher::BLOB.hash(&data),
            });
        }
        Ok(Some(Bytes::from(data)))
    }

    async fn put(&self, data: Bytes) -> StoreResult<ObjectId> {
        let locator = ContentHasher::BLOB.hash(&data);
        let path = self.blob_path(&locator);
        if tokio::fs::try_exists(&path).await? {
            return Ok(locator);
        }

        let size = data.len();
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let dir = target
                .parent()
                .ok_or_else(|| std::io::Error::other("blob path has no parent"))?;
            std::fs::create_dir_all(dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            tmp.write_all(&data)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))??;

        debug!(%locator, path = %path.display(), size, "stored blob");
        Ok(locator)
    }

    async fn exists(&self, locator: &ObjectId) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.blob_path(locator)).await?)
    }
}
