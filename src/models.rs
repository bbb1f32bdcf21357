//! Data models for the area tree.
//!
//! This module contains the persisted Area Node schema and the transient
//! rollup result that flows upward through a traversal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Axis-aligned box `[min_lng, min_lat, max_lng, max_lat]`.
pub type BBox = [f64; 4];

/// The whole-earth box, used when nothing narrower is known.
pub const WORLD_BBOX: BBox = [-180.0, -90.0, 180.0, 90.0];

/// A longitude/latitude pair.
///
/// Serialized as a GeoJSON `Point` so stored documents stay readable by
/// geo tooling. `(0, 0)` is the "not yet set" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "GeoJsonPoint", into = "GeoJsonPoint")]
pub struct Point {
    pub lng: f64,
    pub lat: f64,
}

impl Point {
    /// The unset location.
    pub const SENTINEL: Point = Point { lng: 0.0, lat: 0.0 };

    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Returns true if this point is still the `(0, 0)` placeholder.
    pub fn is_sentinel(&self) -> bool {
        self.lng == 0.0 && self.lat == 0.0
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lng, self.lat)
    }
}

#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

impl From<GeoJsonPoint> for Point {
    fn from(p: GeoJsonPoint) -> Self {
        Point::new(p.coordinates[0], p.coordinates[1])
    }
}

impl From<Point> for GeoJsonPoint {
    fn from(p: Point) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [p.lng, p.lat],
        }
    }
}

/// Count of climbs carrying one exact grade label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCount {
    pub label: String,
    pub count: u64,
}

impl GradeCount {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Difficulty band buckets. Every climb lands in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GradeBands {
    #[serde(default)]
    pub unknown: u64,
    #[serde(default)]
    pub beginner: u64,
    #[serde(default)]
    pub intermediate: u64,
    #[serde(default)]
    pub advanced: u64,
    #[serde(default)]
    pub expert: u64,
}

impl GradeBands {
    /// Sum over all five buckets, or `None` if it does not fit in a `u64`.
    pub fn total(&self) -> Option<u64> {
        self.unknown
            .checked_add(self.beginner)?
            .checked_add(self.intermediate)?
            .checked_add(self.advanced)?
            .checked_add(self.expert)
    }
}

/// Per-discipline totals (sport, trad, bouldering, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisciplineStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub bands: GradeBands,
}

/// The three parallel breakdowns kept on every area.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    /// Counts by exact grade label.
    #[serde(default)]
    pub by_grade: Vec<GradeCount>,
    /// Counts keyed by discipline name.
    #[serde(default)]
    pub by_discipline: BTreeMap<String, DisciplineStats>,
    /// Counts by difficulty band.
    #[serde(default)]
    pub by_grade_band: GradeBands,
}

impl Aggregate {
    /// The all-zero aggregate; identity for [`crate::rollup::merge_aggregates`].
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Location and shape data of an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaMetadata {
    /// True for crags, which own climbs directly and have no children.
    #[serde(default)]
    pub leaf: bool,
    #[serde(default = "default_bbox")]
    pub bbox: BBox,
    #[serde(default)]
    pub lnglat: Point,
}

impl Default for AreaMetadata {
    fn default() -> Self {
        Self {
            leaf: false,
            bbox: WORLD_BBOX,
            lnglat: Point::SENTINEL,
        }
    }
}

fn default_bbox() -> BBox {
    WORLD_BBOX
}

/// One node of the area hierarchy (country, region, ..., crag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaNode {
    pub id: String,
    #[serde(default)]
    pub area_name: String,
    /// Ancestor ids from the top down, ending with this node's own id.
    #[serde(default)]
    pub path_tokens: Vec<String>,
    /// Child area ids, in display order.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub metadata: AreaMetadata,
    #[serde(default)]
    pub total_climbs: u64,
    #[serde(default)]
    pub density: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
}

impl AreaNode {
    /// Creates an interior area with no statistics yet.
    pub fn new(id: impl Into<String>, name: impl Into<String>, path_tokens: Vec<String>) -> Self {
        Self {
            id: id.into(),
            area_name: name.into(),
            path_tokens,
            children: Vec::new(),
            metadata: AreaMetadata::default(),
            total_climbs: 0,
            density: 0.0,
            aggregate: None,
        }
    }

    /// Depth in the tree: 1 for countries, 2 for their subdivisions.
    pub fn depth(&self) -> usize {
        self.path_tokens.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.metadata.leaf
    }

    /// Ancestor ids from the nearest parent up to the top-level area.
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        let len = self.path_tokens.len().saturating_sub(1);
        self.path_tokens[..len].iter().rev().map(String::as_str)
    }
}

/// Statistics of a reduced subtree.
///
/// Never stored on its own; it is folded into the parent and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupResult {
    pub density: f64,
    pub total_climbs: u64,
    pub bbox: BBox,
    pub lnglat: Point,
    pub aggregate: Aggregate,
}

impl RollupResult {
    /// What an area with no children reduces to.
    pub fn empty() -> Self {
        Self {
            density: 0.0,
            total_climbs: 0,
            bbox: WORLD_BBOX,
            lnglat: Point::SENTINEL,
            aggregate: Aggregate::zero(),
        }
    }
}

/// Counters for one phase of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    /// Phase label, e.g. `subtrees` or `depth 3`.
    pub name: String,
    pub areas_visited: u64,
    pub leaves_read: u64,
    pub areas_written: u64,
    pub duration_seconds: f64,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub strategy: String,
    pub phases: Vec<PhaseStats>,
    pub areas_visited: u64,
    pub leaves_read: u64,
    pub areas_written: u64,
    pub duration_seconds: f64,
}

impl RunStats {
    /// Totals the given phases.
    pub fn from_phases(strategy: impl Into<String>, phases: Vec<PhaseStats>) -> Self {
        let mut stats = Self {
            strategy: strategy.into(),
            ..Self::default()
        };
        for phase in &phases {
            stats.areas_visited += phase.areas_visited;
            stats.leaves_read += phase.leaves_read;
            stats.areas_written += phase.areas_written;
            stats.duration_seconds += phase.duration_seconds;
        }
        stats.phases = phases;
        stats
    }
}

/// Metadata about a rollup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the areas were read from.
    pub store: String,
    pub strategy: String,
    pub concurrency: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when only one area and its ancestors were refreshed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage_of: Option<String>,
}

/// Everything written out after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    pub stats: RunStats,
    /// Top-level areas after the run, largest first.
    pub top_areas: Vec<AreaSummary>,
}

/// Short description of one area for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSummary {
    pub id: String,
    pub name: String,
    pub total_climbs: u64,
    pub density: f64,
    pub bbox: BBox,
    pub lnglat: Point,
}

impl From<&AreaNode> for AreaSummary {
    fn from(area: &AreaNode) -> Self {
        Self {
            id: area.id.clone(),
            name: area.area_name.clone(),
            total_climbs: area.total_climbs,
            density: area.density,
            bbox: area.metadata.bbox,
            lnglat: area.metadata.lnglat,
        }
    }
}
