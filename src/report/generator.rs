//! Markdown and JSON run reports.

use crate::models::{AreaSummary, PhaseStats, ReportMetadata, RunReport, RunStats};
use crate::store::{AreaRepository, StoreError};
use futures::TryStreamExt;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str("# Area Rollup Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.stats));
    output.push_str(&generate_phases_section(&report.stats.phases));
    output.push_str(&generate_top_areas_section(&report.top_areas));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Store:** `{}`\n", metadata.store));
    section.push_str(&format!("- **Strategy:** {}\n", metadata.strategy));
    section.push_str(&format!("- **Concurrency:** {}\n", metadata.concurrency));
    if let Some(ref id) = metadata.lineage_of {
        section.push_str(&format!("- **Lineage Of:** `{}`\n", id));
    }
    section.push_str(&format!(
        "- **Started:** {}\n",
        metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Finished:** {}\n",
        metadata.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(stats: &RunStats) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Areas Visited | Leaves Read | Areas Written | Duration |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {:.1}s |\n\n",
        stats.areas_visited, stats.leaves_read, stats.areas_written, stats.duration_seconds
    ));

    section
}

/// Generate the per-phase table.
fn generate_phases_section(phases: &[PhaseStats]) -> String {
    if phases.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Phases\n\n");
    section.push_str("| Phase | Visited | Leaves | Written | Duration |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
    for phase in phases {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.1}s |\n",
            phase.name,
            phase.areas_visited,
            phase.leaves_read,
            phase.areas_written,
            phase.duration_seconds
        ));
    }
    section.push('\n');

    section
}

/// Generate the top-level area table.
fn generate_top_areas_section(areas: &[AreaSummary]) -> String {
    if areas.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Top-Level Areas\n\n");
    section.push_str("| Area | Climbs | Density (/km²) | Center |\n");
    section.push_str("|:---|:---:|:---:|:---|\n");
    for area in areas {
        let name = if area.name.is_empty() {
            &area.id
        } else {
            &area.name
        };
        let center = if area.lnglat.is_sentinel() {
            "-".to_string()
        } else {
            format!("{:.4}, {:.4}", area.lnglat.lng, area.lnglat.lat)
        };
        section.push_str(&format!(
            "| {} | {} | {:.3} | {} |\n",
            name, area.total_climbs, area.density, center
        ));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Summaries of the depth-1 areas, most climbs first.
pub async fn top_level_summaries<R>(repo: &R, limit: usize) -> Result<Vec<AreaSummary>, StoreError>
where
    R: AreaRepository + ?Sized,
{
    let mut summaries: Vec<AreaSummary> = repo
        .stream_by_depth(1)
        .map_ok(|area| AreaSummary::from(&area))
        .try_collect()
        .await?;

    summaries.sort_by(|a, b| {
        b.total_climbs
            .cmp(&a.total_climbs)
            .then_with(|| a.id.cmp(&b.id))
    });
    summaries.truncate(limit);

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaNode, Point};
    use crate::store::MemoryAreaStore;
    use chrono::Utc;

    fn create_test_report() -> RunReport {
        let phases = vec![
            PhaseStats {
                name: "subtrees".to_string(),
                areas_visited: 40,
                leaves_read: 30,
                areas_written: 10,
                duration_seconds: 2.0,
            },
            PhaseStats {
                name: "top-level".to_string(),
                areas_visited: 1,
                leaves_read: 0,
                areas_written: 1,
                duration_seconds: 0.1,
            },
        ];

        RunReport {
            metadata: ReportMetadata {
                store: "areas".to_string(),
                strategy: "two-phase".to_string(),
                concurrency: 1000,
                started_at: Utc::now(),
                finished_at: Utc::now(),
                lineage_of: None,
            },
            stats: RunStats::from_phases("two-phase", phases),
            top_areas: vec![AreaSummary {
                id: "usa".to_string(),
                name: "USA".to_string(),
                total_climbs: 1234,
                density: 0.5,
                bbox: [-125.0, 24.0, -66.0, 49.0],
                lnglat: Point::new(-98.5, 39.8),
            }],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Area Rollup Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("| subtrees | 40 | 30 | 10 | 2.0s |"));
        assert!(markdown.contains("| USA | 1234 |"));
        assert!(!markdown.contains("Lineage Of"));
    }

    #[test]
    fn test_metadata_section_lineage() {
        let mut report = create_test_report();
        report.metadata.lineage_of = Some("crag_1".to_string());
        let section = generate_metadata_section(&report.metadata);
        assert!(section.contains("`crag_1`"));
    }

    #[test]
    fn test_top_areas_hides_sentinel_center() {
        let mut report = create_test_report();
        report.top_areas[0].lnglat = Point::SENTINEL;
        let section = generate_top_areas_section(&report.top_areas);
        assert!(section.contains("| - |"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"phases\""));
        assert!(json.contains("\"areas_written\": 11"));
        assert!(!json.contains("lineage_of"));
    }

    #[tokio::test]
    async fn test_top_level_summaries_sorted() {
        let mut usa = AreaNode::new("usa", "USA", vec!["usa".into()]);
        usa.total_climbs = 10;
        let mut can = AreaNode::new("can", "Canada", vec!["can".into()]);
        can.total_climbs = 30;
        let mex = AreaNode::new("mex", "Mexico", vec!["mex".into()]);
        let state = AreaNode::new("ca", "California", vec!["usa".into(), "ca".into()]);
        let store = MemoryAreaStore::from_areas([usa, can, mex, state]);

        let top = top_level_summaries(&store, 2).await.unwrap();
        let ids: Vec<_> = top.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["can", "usa"]);
    }
}
