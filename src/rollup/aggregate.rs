//! Merging and checking of climb aggregates.

use crate::models::{Aggregate, DisciplineStats, GradeBands, GradeCount};
use std::collections::{BTreeMap, HashSet};

/// Bucket-wise sum of two aggregates.
///
/// Keys present on only one side are carried through. The grade list of
/// the result is sorted by label with one entry per label, so the merge
/// is commutative and associative and [`Aggregate::zero`] is its identity
/// on canonical inputs. Returns `None` if any count overflows.
pub fn merge_aggregates(a: &Aggregate, b: &Aggregate) -> Option<Aggregate> {
    let mut by_grade: BTreeMap<&str, u64> = BTreeMap::new();
    for entry in a.by_grade.iter().chain(&b.by_grade) {
        let slot = by_grade.entry(entry.label.as_str()).or_insert(0);
        *slot = slot.checked_add(entry.count)?;
    }

    let mut by_discipline = a.by_discipline.clone();
    for (name, stats) in &b.by_discipline {
        let merged = match by_discipline.get(name) {
            Some(existing) => merge_discipline(existing, stats)?,
            None => *stats,
        };
        by_discipline.insert(name.clone(), merged);
    }

    Some(Aggregate {
        by_grade: by_grade
            .into_iter()
            .map(|(label, count)| GradeCount::new(label, count))
            .collect(),
        by_discipline,
        by_grade_band: merge_bands(&a.by_grade_band, &b.by_grade_band)?,
    })
}

fn merge_discipline(a: &DisciplineStats, b: &DisciplineStats) -> Option<DisciplineStats> {
    Some(DisciplineStats {
        total: a.total.checked_add(b.total)?,
        bands: merge_bands(&a.bands, &b.bands)?,
    })
}

fn merge_bands(a: &GradeBands, b: &GradeBands) -> Option<GradeBands> {
    Some(GradeBands {
        unknown: a.unknown.checked_add(b.unknown)?,
        beginner: a.beginner.checked_add(b.beginner)?,
        intermediate: a.intermediate.checked_add(b.intermediate)?,
        advanced: a.advanced.checked_add(b.advanced)?,
        expert: a.expert.checked_add(b.expert)?,
    })
}

/// Checks that an aggregate can be merged safely.
///
/// Rejects repeated grade labels and disciplines whose band counts do not
/// add up to their total.
pub fn validate_aggregate(agg: &Aggregate) -> Result<(), String> {
    let mut seen = HashSet::new();
    for entry in &agg.by_grade {
        if !seen.insert(entry.label.as_str()) {
            return Err(format!("grade label {:?} appears more than once", entry.label));
        }
    }

    for (name, stats) in &agg.by_discipline {
        match stats.bands.total() {
            None => {
                return Err(format!("discipline {:?} has band counts that overflow", name));
            }
            Some(band_total) if band_total != stats.total => {
                return Err(format!(
                    "discipline {:?} has total {} but its bands sum to {}",
                    name, stats.total, band_total
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}
