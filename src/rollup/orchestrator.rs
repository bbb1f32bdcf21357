//! Whole-tree runs.
//!
//! The default run is two-phase: every depth-2 subtree is recomputed by a
//! post-order visit, then each depth-1 area is combined from its already
//! refreshed children. Only one subtree is resident at a time during the
//! first phase, and one level of summaries during the second.
//!
//! The level-order run reaches the same end state by reducing each depth,
//! deepest first, from the stored results of the level below.

use super::reducer::leaf_reducer;
use super::{Rollup, Strategy};
use crate::error::{Result, RollupError, StoreOp};
use crate::models::{AreaNode, PhaseStats, RollupResult, RunStats};
use crate::store::AreaRepository;
use futures::{StreamExt, TryStreamExt};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Depth of countries.
pub const TOP_LEVEL_DEPTH: usize = 1;

/// Depth of country subdivisions, the roots of the first phase.
pub const SUBTREE_ROOT_DEPTH: usize = 2;

impl<R: AreaRepository + ?Sized> Rollup<'_, R> {
    /// Runs a full rollup with `strategy`.
    pub async fn run(&self, strategy: Strategy) -> Result<RunStats> {
        match strategy {
            Strategy::TwoPhase => self.run_two_phase().await,
            Strategy::LevelOrder => self.run_level_order().await,
        }
    }

    /// Recomputes all depth-2 subtrees, then every depth-1 area.
    ///
    /// The second phase never starts if the first one fails.
    pub async fn run_two_phase(&self) -> Result<RunStats> {
        let subtrees = self
            .timed("subtrees", self.recompute_subtrees(SUBTREE_ROOT_DEPTH))
            .await?;
        let top_level = self
            .timed("top-level", self.combine_level(TOP_LEVEL_DEPTH))
            .await?;

        Ok(RunStats::from_phases(
            Strategy::TwoPhase.to_string(),
            vec![subtrees, top_level],
        ))
    }

    /// Reduces one depth at a time from the deepest level up.
    ///
    /// Areas within a level run concurrently up to the limiter capacity.
    pub async fn run_level_order(&self) -> Result<RunStats> {
        let max_depth = self
            .repo
            .max_depth()
            .await
            .map_err(|source| RollupError::Scan { depth: 0, source })?;

        let mut phases = Vec::with_capacity(max_depth);
        for depth in (TOP_LEVEL_DEPTH..=max_depth).rev() {
            let level = self
                .repo
                .stream_by_depth(depth)
                .map_err(move |source| RollupError::Scan { depth, source })
                .try_for_each_concurrent(self.limiter.capacity(), |area| async move {
                    if area.is_leaf() {
                        self.count_visit(true);
                        return Ok(());
                    }
                    self.combine(area).await.map(|_| ())
                });
            phases.push(self.timed(&format!("depth {}", depth), level).await?);
        }

        Ok(RunStats::from_phases(Strategy::LevelOrder.to_string(), phases))
    }

    /// Refreshes one area and then each of its ancestors, nearest first.
    ///
    /// A non-leaf area is recomputed from its own subtree first.
    pub async fn refresh_lineage(&self, area_id: &str) -> Result<RunStats> {
        let work = async {
            let area = self
                .repo
                .get(area_id)
                .await
                .map_err(|e| RollupError::store(area_id, StoreOp::Get, e))?;
            let ancestors: Vec<String> = area.ancestors().map(str::to_string).collect();

            if area.is_leaf() {
                self.count_visit(true);
            } else {
                self.visit(area).await?;
            }

            for id in ancestors {
                let ancestor = self
                    .repo
                    .get(&id)
                    .await
                    .map_err(|e| RollupError::store(&id, StoreOp::Get, e))?;
                self.combine(ancestor).await?;
            }
            Ok(())
        };

        let phase = self.timed("lineage", work).await?;
        Ok(RunStats::from_phases("lineage", vec![phase]))
    }

    /// Rolls `area` up from the stored statistics of its direct children.
    ///
    /// The children are trusted as already aggregated; nothing below them
    /// is read.
    pub async fn combine(&self, mut area: AreaNode) -> Result<RollupResult> {
        self.count_visit(false);
        let children = {
            let _permit = self.limiter.acquire().await?;
            self.repo
                .fetch_children(&area)
                .await
                .map_err(|e| RollupError::store(&area.id, StoreOp::FetchChildren, e))?
        };
        let results: Vec<RollupResult> = children.iter().map(leaf_reducer).collect();
        self.reduce_node(&results, &mut area).await
    }

    async fn recompute_subtrees(&self, depth: usize) -> Result<()> {
        let mut roots = self.repo.stream_by_depth(depth);
        while let Some(root) = roots.next().await {
            let root = root.map_err(|source| RollupError::Scan { depth, source })?;
            debug!("Recomputing subtree {}", root.id);
            self.visit(root).await?;
        }
        Ok(())
    }

    async fn combine_level(&self, depth: usize) -> Result<()> {
        let mut areas = self.repo.stream_by_depth(depth);
        while let Some(area) = areas.next().await {
            let area = area.map_err(|source| RollupError::Scan { depth, source })?;
            if area.is_leaf() {
                self.count_visit(true);
                continue;
            }
            self.combine(area).await?;
        }
        Ok(())
    }

    async fn timed<F>(&self, name: &str, work: F) -> Result<PhaseStats>
    where
        F: Future<Output = Result<()>>,
    {
        let before = self.counters();
        let started = Instant::now();
        info!("Starting phase: {}", name);
        self.progress.set_message(name.to_string());

        if let Err(e) = work.await {
            warn!("Phase {} aborted after {:.1}s", name, started.elapsed().as_secs_f64());
            return Err(e);
        }

        let after = self.counters();
        let stats = PhaseStats {
            name: name.to_string(),
            areas_visited: after.visited - before.visited,
            leaves_read: after.leaves - before.leaves,
            areas_written: after.written - before.written,
            duration_seconds: started.elapsed().as_secs_f64(),
        };
        info!(
            "Finished phase {}: {} areas written in {:.1}s",
            name, stats.areas_written, stats.duration_seconds
        );
        Ok(stats)
    }
}
