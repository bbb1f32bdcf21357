//! Bottom-up statistics rollup over the area tree.
//!
//! A [`Rollup`] borrows an [`AreaRepository`] and recomputes the climb
//! totals, bounding boxes, centroids, densities and aggregates of every
//! interior area from its descendants.

pub mod aggregate;
pub mod orchestrator;
pub mod reducer;
pub mod visitor;

pub use aggregate::{merge_aggregates, validate_aggregate};
pub use reducer::{apply_to_parent, fold_results, leaf_reducer};
pub use visitor::Limiter;

use crate::geo::DensityModel;
use crate::store::AreaRepository;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default cap on concurrently in-flight store operations.
pub const DEFAULT_CONCURRENCY: usize = 1000;

/// How the tree is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Recompute every depth-2 subtree, then combine them into depth-1 areas.
    #[default]
    TwoPhase,
    /// Reduce one depth level at a time, deepest first.
    LevelOrder,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::TwoPhase => write!(f, "two-phase"),
            Strategy::LevelOrder => write!(f, "level-order"),
        }
    }
}

/// Tunables of a run.
#[derive(Debug, Clone)]
pub struct RollupOptions {
    /// Maximum store operations in flight at once.
    pub concurrency: usize,
    pub density: DensityModel,
    /// Abort on a malformed child aggregate instead of logging it.
    pub strict_aggregates: bool,
}

impl Default for RollupOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            density: DensityModel::default(),
            strict_aggregates: true,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    visited: AtomicU64,
    leaves: AtomicU64,
    written: AtomicU64,
}

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub visited: u64,
    pub leaves: u64,
    pub written: u64,
}

/// The rollup engine.
pub struct Rollup<'a, R: AreaRepository + ?Sized> {
    repo: &'a R,
    limiter: Limiter,
    options: RollupOptions,
    counters: Counters,
    progress: ProgressBar,
}

impl<'a, R: AreaRepository + ?Sized> Rollup<'a, R> {
    /// Create an engine with its own limiter sized from `options`.
    pub fn new(repo: &'a R, options: RollupOptions) -> Self {
        let limiter = Limiter::new(options.concurrency);
        Self {
            repo,
            limiter,
            options,
            counters: Counters::default(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Share an existing limiter instead of the one built from the options.
    pub fn with_limiter(mut self, limiter: Limiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Report written areas on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &RollupOptions {
        &self.options
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Current counter values.
    pub fn counters(&self) -> CounterSnapshot {
        CounterSnapshot {
            visited: self.counters.visited.load(Ordering::Relaxed),
            leaves: self.counters.leaves.load(Ordering::Relaxed),
            written: self.counters.written.load(Ordering::Relaxed),
        }
    }

    fn count_visit(&self, leaf: bool) {
        self.counters.visited.fetch_add(1, Ordering::Relaxed);
        if leaf {
            self.counters.leaves.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn count_write(&self) {
        self.counters.written.fetch_add(1, Ordering::Relaxed);
        self.progress.inc(1);
    }
}
