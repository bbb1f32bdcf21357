//! Post-order traversal with a shared concurrency bound.

use super::reducer::leaf_reducer;
use super::Rollup;
use crate::error::{Result, RollupError, StoreOp};
use crate::models::{AreaNode, RollupResult};
use crate::store::AreaRepository;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Counting semaphore capping in-flight store operations for a whole run.
///
/// It bounds store calls (`fetch_children`, `save`), not visitor frames:
/// a frame waiting on its children holds no permit, so any number of
/// frames may be suspended at once and a tree deeper than the capacity
/// still completes. Clones share the same permits.
#[derive(Debug, Clone)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Limiter {
    /// A limiter admitting `capacity` holders at once (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| RollupError::LimiterClosed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl<R: AreaRepository + ?Sized> Rollup<'_, R> {
    /// Recomputes the subtree under `node` and returns its statistics.
    ///
    /// Leaves are read as-is. Interior areas load their children, visit
    /// them concurrently, and are written once every child has finished.
    /// A frame holds a limiter slot only around its own store calls, never
    /// while waiting for its children, so depth cannot exhaust the slots.
    /// The first failing child drops its pending siblings.
    pub fn visit(&self, node: AreaNode) -> BoxFuture<'_, Result<RollupResult>> {
        async move {
            self.count_visit(node.is_leaf());
            if node.is_leaf() {
                return Ok(leaf_reducer(&node));
            }

            let children = {
                let _permit = self.limiter.acquire().await?;
                self.repo
                    .fetch_children(&node)
                    .await
                    .map_err(|e| RollupError::store(&node.id, StoreOp::FetchChildren, e))?
            };

            let results = try_join_all(children.into_iter().map(|child| self.visit(child))).await?;

            let mut node = node;
            self.reduce_node(&results, &mut node).await
        }
        .boxed()
    }
}
