//! Leaf and node reducers.

use super::aggregate::{merge_aggregates, validate_aggregate};
use super::{Rollup, RollupOptions};
use crate::error::{Result, RollupError, StoreOp};
use crate::geo::{centroid_of, union_bboxes};
use crate::models::{Aggregate, AreaNode, BBox, Point, RollupResult};
use crate::store::AreaRepository;
use tracing::{debug, warn};

/// Reads the statistics already stored on `node`.
///
/// Used for crags and for areas whose subtree is known to be up to date.
pub fn leaf_reducer(node: &AreaNode) -> RollupResult {
    RollupResult {
        density: node.density,
        total_climbs: node.total_climbs,
        bbox: node.metadata.bbox,
        lnglat: node.metadata.lnglat,
        aggregate: node.aggregate.clone().unwrap_or_else(Aggregate::zero),
    }
}

/// Combines child results into the result of their parent.
///
/// Children are folded left to right. An empty slice gives
/// [`RollupResult::empty`]. Sentinel locations do not take part in the
/// centroid.
pub fn fold_results(
    results: &[RollupResult],
    parent_id: &str,
    options: &RollupOptions,
) -> Result<RollupResult> {
    let mut total_climbs: u64 = 0;
    let mut aggregate = Aggregate::zero();

    for child in results {
        if let Err(reason) = validate_aggregate(&child.aggregate) {
            if options.strict_aggregates {
                return Err(RollupError::MalformedAggregate {
                    area_id: parent_id.to_string(),
                    reason,
                });
            }
            warn!("Merging malformed aggregate into {}: {}", parent_id, reason);
        }

        total_climbs = total_climbs
            .checked_add(child.total_climbs)
            .ok_or_else(|| RollupError::CountOverflow {
                area_id: parent_id.to_string(),
            })?;
        aggregate = merge_aggregates(&aggregate, &child.aggregate).ok_or_else(|| {
            RollupError::CountOverflow {
                area_id: parent_id.to_string(),
            }
        })?;
    }

    let boxes: Vec<BBox> = results.iter().map(|r| r.bbox).collect();
    let bbox = union_bboxes(&boxes);

    let points: Vec<Point> = results
        .iter()
        .map(|r| r.lnglat)
        .filter(|p| !p.is_sentinel())
        .collect();

    Ok(RollupResult {
        density: options.density.density(&bbox, total_climbs),
        total_climbs,
        bbox,
        lnglat: centroid_of(&points),
        aggregate,
    })
}

/// Writes `result` onto `parent`.
///
/// The location is only filled in while it is still the sentinel, so a
/// curated location survives later runs.
pub fn apply_to_parent(parent: &mut AreaNode, result: &RollupResult) {
    if parent.metadata.lnglat.is_sentinel() {
        parent.metadata.lnglat = result.lnglat;
    }
    parent.total_climbs = result.total_climbs;
    parent.metadata.bbox = result.bbox;
    parent.density = result.density;
    parent.aggregate = Some(result.aggregate.clone());
}

impl<R: AreaRepository + ?Sized> Rollup<'_, R> {
    /// Folds `results` into `parent` and persists it.
    ///
    /// The returned location is the recomputed centroid even when the
    /// stored one was kept.
    pub async fn reduce_node(
        &self,
        results: &[RollupResult],
        parent: &mut AreaNode,
    ) -> Result<RollupResult> {
        let result = fold_results(results, &parent.id, &self.options)?;
        apply_to_parent(parent, &result);

        {
            let _permit = self.limiter.acquire().await?;
            self.repo
                .save(parent)
                .await
                .map_err(|e| RollupError::store(&parent.id, StoreOp::Save, e))?;
        }

        self.count_write();
        debug!(
            "Updated {} ({} climbs from {} children)",
            parent.id,
            result.total_climbs,
            results.len()
        );
        Ok(result)
    }
}
