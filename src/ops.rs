//! Mutating operations.
//!
//! Every mutation invalidates the touched key (and so its ancestors) after
//! the remote call succeeds, before anything re-renders. Batch operations
//! stop issuing calls once their cancellation token fires; whatever already
//! reached the store stays there.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{BrowseError, Result};
use crate::listing::ListingService;

/// Mutations against one store, keeping the listing cache coherent
#[derive(Clone)]
pub struct ObjectOps {
    service: Arc<ListingService>,
}

impl ObjectOps {
    pub fn new(service: Arc<ListingService>) -> Self {
        ObjectOps { service }
    }

    fn invalidate(&self, bucket: &str, key: &str) {
        self.service.cache().invalidate(bucket, Some(key));
    }

    /// Create or overwrite an object
    pub async fn write(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.service
            .backend()
            .put_object(bucket, key, body)
            .await
            .map_err(|e| BrowseError::from_remote(e, bucket, key))?;
        self.invalidate(bucket, key);
        log::info!("wrote s3://{bucket}/{key}");
        Ok(())
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.service
            .backend()
            .delete_object(bucket, key)
            .await
            .map_err(|e| BrowseError::from_remote(e, bucket, key))?;
        self.invalidate(bucket, key);
        log::info!("deleted s3://{bucket}/{key}");
        Ok(())
    }

    /// Create a folder by writing an empty `prefix/` marker object
    pub async fn create_folder(&self, bucket: &str, prefix: &str) -> Result<String> {
        let trimmed = prefix.trim_matches('/');
        if trimmed.is_empty() {
            return Err(BrowseError::InvalidPath(format!("s3://{bucket}/{prefix}")));
        }
        let marker = format!("{trimmed}/");
        self.write(bucket, &marker, Bytes::new()).await?;
        Ok(marker)
    }

    /// Rename an object within a bucket (copy, then delete the source).
    ///
    /// Folder renames are refused: there is no agreed answer for partial
    /// failure halfway through a tree.
    pub async fn rename(&self, bucket: &str, from: &str, to: &str) -> Result<()> {
        if from.ends_with('/') || to.ends_with('/') {
            return Err(BrowseError::Unsupported(
                "renaming folders is not supported".to_string(),
            ));
        }
        if from == to {
            return Ok(());
        }

        let backend = self.service.backend();
        backend
            .copy_object(bucket, from, to)
            .await
            .map_err(|e| BrowseError::from_remote(e, bucket, from))?;
        self.invalidate(bucket, to);

        backend
            .delete_object(bucket, from)
            .await
            .map_err(|e| BrowseError::from_remote(e, bucket, from))?;
        self.invalidate(bucket, from);

        log::info!("renamed s3://{bucket}/{from} to {to}");
        Ok(())
    }

    /// Delete several objects, reporting `(done, total)` after each one.
    ///
    /// Returns the number deleted, or [`BrowseError::Cancelled`] if the
    /// token fired first.
    pub async fn delete_many<F>(
        &self,
        bucket: &str,
        keys: &[String],
        cancel: &CancellationToken,
        mut progress: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, usize) + Send,
    {
        let total = keys.len();
        for (done, key) in keys.iter().enumerate() {
            if cancel.is_cancelled() {
                log::info!("delete cancelled after {done} of {total} objects");
                return Err(BrowseError::Cancelled {
                    completed: done,
                    total,
                });
            }
            self.delete(bucket, key).await?;
            progress(done + 1, total);
        }
        Ok(total)
    }

    /// Upload local files to `(bucket, key)` pairs, stopping on cancellation
    pub async fn upload_many<F>(
        &self,
        bucket: &str,
        files: &[(PathBuf, String)],
        cancel: &CancellationToken,
        mut progress: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, usize) + Send,
    {
        let total = files.len();
        for (done, (path, key)) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                log::info!("upload cancelled after {done} of {total} files");
                return Err(BrowseError::Cancelled {
                    completed: done,
                    total,
                });
            }
            let body = tokio::fs::read(path).await?;
            self.write(bucket, key, Bytes::from(body)).await?;
            progress(done + 1, total);
        }
        Ok(total)
    }

    /// Download one object to a local file.
    ///
    /// Cancellation abandons the transfer; nothing is written locally.
    pub async fn download(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(BrowseError::Cancelled { completed: 0, total: 1 });
            }
            res = self.service.backend().get_object(bucket, key) => {
                res.map_err(|e| BrowseError::from_remote(e, bucket, key))?
            }
        };
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}
