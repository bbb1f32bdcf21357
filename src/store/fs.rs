//! Directory-backed area store.
//!
//! Each area is one pretty-printed JSON document named `<id>.json` inside
//! the store directory. Writes go through a temporary file in the same
//! directory which is then renamed over the old document.

use super::{AreaRepository, StoreError};
use crate::models::AreaNode;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

/// Area store over a directory of JSON documents.
#[derive(Debug, Clone)]
pub struct FsAreaStore {
    root: PathBuf,
}

impl FsAreaStore {
    /// Open an existing store directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "store directory does not exist",
                ),
                path: root,
            });
        }
        Ok(Self { root })
    }

    /// Directory holding the documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(StoreError::Backend {
                reason: format!("invalid area id {:?}", id),
            });
        }
        Ok(self.root.join(format!("{}.json", id)))
    }

    /// Iterates over every document path, sorted by file name.
    fn documents(&self) -> impl Iterator<Item = Result<PathBuf, StoreError>> + Send {
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let path = entry.into_path();
                    let is_json = path.is_file()
                        && path.extension().and_then(|e| e.to_str()) == Some("json");
                    is_json.then_some(Ok(path))
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    Some(Err(StoreError::Io {
                        path,
                        source: e.into(),
                    }))
                }
            })
    }
}

async fn read_document(path: &Path) -> Result<AreaNode, StoreError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(path, &bytes)
}

fn decode(path: &Path, bytes: &[u8]) -> Result<AreaNode, StoreError> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl AreaRepository for FsAreaStore {
    fn stream_by_depth(&self, depth: usize) -> BoxStream<'_, Result<AreaNode, StoreError>> {
        stream::iter(self.documents())
            .filter_map(move |path| async move {
                let node = match path {
                    Ok(path) => read_document(&path).await,
                    Err(e) => Err(e),
                };
                match node {
                    Ok(node) if node.depth() == depth => Some(Ok(node)),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed()
    }

    async fn fetch_children(&self, node: &AreaNode) -> Result<Vec<AreaNode>, StoreError> {
        let mut children = Vec::with_capacity(node.children.len());
        for id in &node.children {
            children.push(self.get(id).await?);
        }
        Ok(children)
    }

    async fn get(&self, id: &str) -> Result<AreaNode, StoreError> {
        let path = self.document_path(id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        decode(&path, &bytes)
    }

    async fn save(&self, node: &AreaNode) -> Result<(), StoreError> {
        let path = self.document_path(&node.id)?;
        let bytes = serde_json::to_vec_pretty(node).map_err(|source| StoreError::Encode {
            id: node.id.clone(),
            source,
        })?;

        let dir = self.root.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &bytes))
            .await
            .map_err(|e| StoreError::Backend {
                reason: format!("write task failed: {}", e),
            })?
            .map_err(|source| StoreError::Io { path, source })?;

        debug!("Wrote area document {}", node.id);
        Ok(())
    }

    async fn max_depth(&self) -> Result<usize, StoreError> {
        let mut max = 0;
        for path in self.documents() {
            let node = read_document(&path?).await?;
            max = max.max(node.depth());
        }
        Ok(max)
    }
}
