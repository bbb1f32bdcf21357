//! In-memory area store.
//!
//! Keeps areas in an ordered map. Besides embedding, it is the store the
//! test-suite runs against, so it can inject failures and it records how
//! many operations were in flight at once.

use super::{AreaRepository, StoreError};
use crate::models::AreaNode;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Inner {
    areas: BTreeMap<String, AreaNode>,
    fail_save: HashSet<String>,
    fail_fetch: HashSet<String>,
    save_log: Vec<String>,
}

/// Area store backed by a map.
#[derive(Default)]
pub struct MemoryAreaStore {
    inner: Mutex<Inner>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight counter when an operation ends.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryAreaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `areas`.
    pub fn from_areas(areas: impl IntoIterator<Item = AreaNode>) -> Self {
        let store = Self::new();
        for area in areas {
            store.insert(area);
        }
        store
    }

    /// Insert or replace an area.
    pub fn insert(&self, area: AreaNode) {
        self.lock().areas.insert(area.id.clone(), area);
    }

    /// Snapshot of one area.
    pub fn area(&self, id: &str) -> Option<AreaNode> {
        self.lock().areas.get(id).cloned()
    }

    /// Snapshot of every area, ordered by id.
    pub fn areas(&self) -> Vec<AreaNode> {
        self.lock().areas.values().cloned().collect()
    }

    /// Make every later `save` of `id` fail.
    pub fn fail_save_on(&self, id: impl Into<String>) {
        self.lock().fail_save.insert(id.into());
    }

    /// Make every later `fetch_children` of `id` fail.
    pub fn fail_fetch_on(&self, id: impl Into<String>) {
        self.lock().fail_fetch.insert(id.into());
    }

    /// Ids of successfully saved areas, in write order.
    pub fn save_log(&self) -> Vec<String> {
        self.lock().save_log.clone()
    }

    /// Highest number of store operations observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks an operation as started and yields once so concurrent
    /// callers get a chance to overlap.
    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        tokio::task::yield_now().await;
        guard
    }
}

#[async_trait]
impl AreaRepository for MemoryAreaStore {
    fn stream_by_depth(&self, depth: usize) -> BoxStream<'_, Result<AreaNode, StoreError>> {
        let ids: Vec<String> = self
            .lock()
            .areas
            .values()
            .filter(|a| a.depth() == depth)
            .map(|a| a.id.clone())
            .collect();

        stream::iter(ids)
            .then(move |id| async move { self.get(&id).await })
            .boxed()
    }

    async fn fetch_children(&self, node: &AreaNode) -> Result<Vec<AreaNode>, StoreError> {
        let _op = self.enter().await;
        let inner = self.lock();
        if inner.fail_fetch.contains(&node.id) {
            return Err(StoreError::Backend {
                reason: format!("injected fetch failure for {}", node.id),
            });
        }
        node.children
            .iter()
            .map(|id| {
                inner
                    .areas
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound { id: id.clone() })
            })
            .collect()
    }

    async fn get(&self, id: &str) -> Result<AreaNode, StoreError> {
        self.lock()
            .areas
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn save(&self, node: &AreaNode) -> Result<(), StoreError> {
        let _op = self.enter().await;
        let mut inner = self.lock();
        if inner.fail_save.contains(&node.id) {
            return Err(StoreError::Backend {
                reason: format!("injected save failure for {}", node.id),
            });
        }
        inner.areas.insert(node.id.clone(), node.clone());
        inner.save_log.push(node.id.clone());
        Ok(())
    }

    async fn max_depth(&self) -> Result<usize, StoreError> {
        Ok(self
            .lock()
            .areas
            .values()
            .map(AreaNode::depth)
            .max()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn area(id: &str, path: &[&str]) -> AreaNode {
        AreaNode::new(id, id, path.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_stream_by_depth() {
        let store = MemoryAreaStore::from_areas([
            area("usa", &["usa"]),
            area("ca", &["usa", "ca"]),
            area("nv", &["usa", "nv"]),
        ]);

        let depth2: Vec<AreaNode> = store.stream_by_depth(2).try_collect().await.unwrap();
        let ids: Vec<_> = depth2.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["ca", "nv"]);
        assert_eq!(store.max_depth().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fetch_children_in_child_order() {
        let mut usa = area("usa", &["usa"]);
        usa.children = vec!["nv".into(), "ca".into()];
        let store = MemoryAreaStore::from_areas([
            usa.clone(),
            area("ca", &["usa", "ca"]),
            area("nv", &["usa", "nv"]),
        ]);

        let children = store.fetch_children(&usa).await.unwrap();
        let ids: Vec<_> = children.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["nv", "ca"]);
    }

    #[tokio::test]
    async fn test_missing_child_is_not_found() {
        let mut usa = area("usa", &["usa"]);
        usa.children = vec!["ghost".into()];
        let store = MemoryAreaStore::from_areas([usa.clone()]);

        let err = store.fetch_children(&usa).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id } if id == "ghost"));
    }

    #[tokio::test]
    async fn test_injected_save_failure() {
        let store = MemoryAreaStore::from_areas([area("ca", &["usa", "ca"])]);
        store.fail_save_on("ca");

        let mut ca = store.area("ca").unwrap();
        ca.total_climbs = 7;
        assert!(store.save(&ca).await.is_err());
        assert_eq!(store.area("ca").unwrap().total_climbs, 0);
        assert!(store.save_log().is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_area() {
        let store = MemoryAreaStore::from_areas([area("ca", &["usa", "ca"])]);
        let mut ca = store.area("ca").unwrap();
        ca.total_climbs = 7;
        store.save(&ca).await.unwrap();

        assert_eq!(store.area("ca").unwrap().total_climbs, 7);
        assert_eq!(store.save_log(), vec!["ca".to_string()]);
        assert_eq!(store.peak_in_flight(), 1);
    }
}
