//! crag-rollup - bottom-up statistics for climbing-area trees
//!
//! Every interior area of the hierarchy (country, region, ..., crag)
//! carries the union of its descendants' statistics: climb total,
//! bounding box, centroid, density and grade/discipline breakdowns. This
//! crate recomputes those statistics from the crags upward against any
//! [`store::AreaRepository`], with a single bound on concurrent store
//! operations for the whole run.
//!
//! ```no_run
//! use crag_rollup::rollup::{Rollup, RollupOptions, Strategy};
//! use crag_rollup::store::FsAreaStore;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = FsAreaStore::open("areas")?;
//! let rollup = Rollup::new(&store, RollupOptions::default());
//! let stats = rollup.run(Strategy::TwoPhase).await?;
//! println!("{} areas updated", stats.areas_written);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod geo;
pub mod models;
pub mod report;
pub mod rollup;
pub mod store;

pub use error::{RollupError, StoreOp};
pub use models::{Aggregate, AreaNode, BBox, Point, RollupResult, RunStats};
pub use rollup::{Rollup, RollupOptions, Strategy};
pub use store::{AreaRepository, StoreError};
