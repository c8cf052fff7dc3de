//! Path-addressed view of the store: `/bucket/dir/file`.
//!
//! Directory reads go through the same listing cache as the tree and show
//! only direct children. Folder marker objects (`dir/`) back empty
//! directories but are never listed themselves.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::node::{DisplayNode, materialize};
use super::path::{VirtualPath, parent_prefix};
use crate::error::{BrowseError, RemoteErrorKind, Result};
use crate::listing::ListingService;
use crate::ops::ObjectOps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileStat {
    pub kind: FileKind,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileStat {
    fn directory() -> Self {
        FileStat {
            kind: FileKind::Directory,
            size: 0,
            last_modified: None,
        }
    }
}

/// Keep only the nodes that sit directly under `prefix`
pub fn direct_children(prefix: &str, nodes: &[DisplayNode]) -> Vec<DirEntry> {
    nodes
        .iter()
        .filter_map(|node| match node {
            DisplayNode::Folder { prefix: p, .. } => {
                let rest = p.strip_prefix(prefix)?.trim_end_matches('/');
                (!rest.is_empty() && !rest.contains('/')).then(|| DirEntry {
                    name: rest.to_string(),
                    kind: FileKind::Directory,
                    size: 0,
                    last_modified: None,
                })
            }
            DisplayNode::Object {
                key,
                size,
                last_modified,
                ..
            } => {
                let rest = key.strip_prefix(prefix)?;
                (!rest.is_empty() && !rest.contains('/')).then(|| DirEntry {
                    name: rest.to_string(),
                    kind: FileKind::File,
                    size: *size,
                    last_modified: *last_modified,
                })
            }
            DisplayNode::Bucket { bucket } => Some(DirEntry {
                name: bucket.clone(),
                kind: FileKind::Directory,
                size: 0,
                last_modified: None,
            }),
            DisplayNode::LoadMore { .. } => None,
        })
        .collect()
}

/// Filesystem consumer of the listing layer
pub struct VirtualFs {
    service: Arc<ListingService>,
    ops: ObjectOps,
}

impl VirtualFs {
    pub fn new(service: Arc<ListingService>) -> Self {
        let ops = ObjectOps::new(Arc::clone(&service));
        VirtualFs { service, ops }
    }

    pub fn ops(&self) -> &ObjectOps {
        &self.ops
    }

    fn bucket_of(path: &VirtualPath) -> Result<&str> {
        path.bucket()
            .ok_or_else(|| BrowseError::InvalidPath(path.to_string()))
    }

    fn file_key(path: &VirtualPath) -> Result<(&str, String)> {
        let bucket = Self::bucket_of(path)?;
        let key = path.key();
        if key.is_empty() {
            return Err(BrowseError::IsADirectory(path.to_string()));
        }
        Ok((bucket, key))
    }

    /// Direct children of a directory, every page loaded
    pub async fn read_directory(&self, path: &VirtualPath) -> Result<Vec<DirEntry>> {
        let Some(bucket) = path.bucket() else {
            let nodes: Vec<DisplayNode> = self
                .service
                .list_buckets()
                .await?
                .into_iter()
                .map(|b| DisplayNode::Bucket { bucket: b.name })
                .collect();
            return Ok(direct_children("", &nodes));
        };

        let prefix = path.dir_prefix();
        let scope = Some(prefix.as_str()).filter(|p| !p.is_empty());
        let entry = self.service.list_complete(bucket, scope).await?;

        if scope.is_some() && entry.objects.is_empty() && entry.prefixes.is_empty() {
            return Err(BrowseError::NotFound {
                bucket: bucket.to_string(),
                prefix,
            });
        }

        Ok(direct_children(&prefix, &materialize(bucket, scope, &entry)))
    }

    /// Classify a path, answering from the parent listing when it is cached
    pub async fn stat(&self, path: &VirtualPath) -> Result<FileStat> {
        let Some(bucket) = path.bucket() else {
            return Ok(FileStat::directory());
        };
        let key = path.key();
        if key.is_empty() {
            self.service.list(bucket, None).await?;
            return Ok(FileStat::directory());
        }

        let parent = Some(parent_prefix(&key)).filter(|p| !p.is_empty());
        if let Some(entry) = self.service.cache().get(bucket, parent) {
            if let Some(obj) = entry.objects.iter().find(|o| o.key == key) {
                return Ok(FileStat {
                    kind: FileKind::File,
                    size: obj.size,
                    last_modified: obj.last_modified,
                });
            }
            let dir = format!("{key}/");
            if entry.prefixes.iter().any(|p| p.prefix == dir) {
                return Ok(FileStat::directory());
            }
        }

        match self.service.backend().head_object(bucket, &key).await {
            Ok(meta) => Ok(FileStat {
                kind: FileKind::File,
                size: meta.size,
                last_modified: meta.last_modified,
            }),
            Err(err) if err.kind == RemoteErrorKind::NotFound => {
                let dir = path.dir_prefix();
                let entry = self.service.list(bucket, Some(&dir)).await?;
                if entry.objects.is_empty() && entry.prefixes.is_empty() {
                    Err(BrowseError::NotFound {
                        bucket: bucket.to_string(),
                        prefix: key,
                    })
                } else {
                    Ok(FileStat::directory())
                }
            }
            Err(err) => Err(BrowseError::from_remote(err, bucket, &key)),
        }
    }

    pub async fn read_file(&self, path: &VirtualPath) -> Result<Bytes> {
        let (bucket, key) = Self::file_key(path)?;
        self.service
            .backend()
            .get_object(bucket, &key)
            .await
            .map_err(|e| BrowseError::from_remote(e, bucket, &key))
    }

    pub async fn write_file(&self, path: &VirtualPath, content: Bytes) -> Result<()> {
        let (bucket, key) = Self::file_key(path)?;
        self.ops.write(bucket, &key, content).await
    }

    pub async fn create_directory(&self, path: &VirtualPath) -> Result<()> {
        let bucket = Self::bucket_of(path)?;
        self.ops.create_folder(bucket, &path.key()).await?;
        Ok(())
    }

    /// Delete a file, or an empty directory's marker object
    pub async fn delete(&self, path: &VirtualPath) -> Result<()> {
        let (bucket, key) = Self::file_key(path)?;
        match self.stat(path).await?.kind {
            FileKind::File => self.ops.delete(bucket, &key).await,
            FileKind::Directory => {
                let marker = path.dir_prefix();
                let entry = self.service.list(bucket, Some(&marker)).await?;
                let only_marker = entry.prefixes.is_empty()
                    && !entry.is_truncated
                    && entry.objects.iter().all(|o| o.key == marker);
                if !only_marker {
                    return Err(BrowseError::Unsupported(format!(
                        "{path} is not empty; recursive delete is not supported"
                    )));
                }
                self.ops.delete(bucket, &marker).await
            }
        }
    }

    /// Rename a file within its bucket
    pub async fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<()> {
        let (from_bucket, from_key) = Self::file_key(from)?;
        let (to_bucket, to_key) = Self::file_key(to)?;
        if from_bucket != to_bucket {
            return Err(BrowseError::Unsupported(
                "moving objects between buckets is not supported".to_string(),
            ));
        }
        if self.stat(from).await?.kind == FileKind::Directory {
            return Err(BrowseError::Unsupported(
                "renaming folders is not supported".to_string(),
            ));
        }
        self.ops.rename(from_bucket, &from_key, &to_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(prefix: &str) -> DisplayNode {
        DisplayNode::Folder {
            bucket: "bkt".to_string(),
            prefix: prefix.to_string(),
        }
    }

    fn object(key: &str) -> DisplayNode {
        DisplayNode::Object {
            bucket: "bkt".to_string(),
            key: key.to_string(),
            size: 7,
            last_modified: None,
        }
    }

    #[test]
    fn test_direct_children_filter() {
        let nodes = vec![
            folder("a/b/"),
            folder("a/b/c/"),
            folder("other/"),
            object("a/"),
            object("a/x.txt"),
            object("a/b/deep.txt"),
            DisplayNode::LoadMore {
                bucket: "bkt".to_string(),
                prefix: Some("a/".to_string()),
                continuation_token: "tok".to_string(),
            },
        ];

        let entries = direct_children("a/", &nodes);
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "b".to_string(),
                    kind: FileKind::Directory,
                    size: 0,
                    last_modified: None,
                },
                DirEntry {
                    name: "x.txt".to_string(),
                    kind: FileKind::File,
                    size: 7,
                    last_modified: None,
                },
            ]
        );
    }

    #[test]
    fn test_direct_children_at_bucket_root() {
        let nodes = vec![folder("a/"), object("top.txt")];
        let names: Vec<_> = direct_children("", &nodes)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "top.txt"]);
    }
}
