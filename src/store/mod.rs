//! Area repository abstraction.
//!
//! The rollup engine talks to storage only through [`AreaRepository`].
//! Two implementations ship with the crate: an in-memory store and a
//! directory of JSON documents.

pub mod fs;
pub mod memory;

pub use fs::FsAreaStore;
pub use memory::MemoryAreaStore;

use crate::models::AreaNode;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode area document {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode area {id}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("area not found: {id}")]
    NotFound { id: String },

    #[error("store backend error: {reason}")]
    Backend { reason: String },
}

/// Storage operations the rollup needs.
#[async_trait]
pub trait AreaRepository: Send + Sync {
    /// Lazily yields every area whose `path_tokens` has length `depth`.
    ///
    /// Implementations must not load the whole result set up front.
    fn stream_by_depth(&self, depth: usize) -> BoxStream<'_, Result<AreaNode, StoreError>>;

    /// Resolves the child ids of `node` into full areas, in child order.
    async fn fetch_children(&self, node: &AreaNode) -> Result<Vec<AreaNode>, StoreError>;

    /// Loads one area by id.
    async fn get(&self, id: &str) -> Result<AreaNode, StoreError>;

    /// Persists every mutable field of `node`.
    async fn save(&self, node: &AreaNode) -> Result<(), StoreError>;

    /// Deepest `path_tokens` length present, or 0 for an empty store.
    async fn max_depth(&self) -> Result<usize, StoreError>;
}
