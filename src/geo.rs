//! Geometry helpers for rolling up area locations.
//!
//! All functions are pure. Boxes are `[min_lng, min_lat, max_lng, max_lat]`
//! in degrees; points are longitude/latitude.

use crate::models::{BBox, Point, WORLD_BBOX};
use geo::{BoundingRect, Centroid, ChamberlainDuquetteArea, Coord, MultiPoint, Rect};
use serde::{Deserialize, Serialize};

/// Radius used for box areas, in meters (WGS84 equatorial).
///
/// This is the radius `ChamberlainDuquetteArea` works with.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

fn to_rect(bbox: &BBox) -> Rect {
    Rect::new(
        Coord { x: bbox[0], y: bbox[1] },
        Coord { x: bbox[2], y: bbox[3] },
    )
}

fn from_rect(rect: Rect) -> BBox {
    [rect.min().x, rect.min().y, rect.max().x, rect.max().y]
}

/// Smallest box containing every input box.
///
/// An empty input yields [`WORLD_BBOX`].
pub fn union_bboxes(boxes: &[BBox]) -> BBox {
    let corners: MultiPoint = boxes
        .iter()
        .flat_map(|b| [geo::Point::new(b[0], b[1]), geo::Point::new(b[2], b[3])])
        .collect();
    corners.bounding_rect().map(from_rect).unwrap_or(WORLD_BBOX)
}

/// Union of two boxes.
pub fn union_pair(a: &BBox, b: &BBox) -> BBox {
    union_bboxes(&[*a, *b])
}

/// Returns true if `outer` encloses `inner`.
pub fn bbox_contains(outer: &BBox, inner: &BBox) -> bool {
    let (outer, inner) = (to_rect(outer), to_rect(inner));
    outer.min().x <= inner.min().x
        && outer.min().y <= inner.min().y
        && outer.max().x >= inner.max().x
        && outer.max().y >= inner.max().y
}

/// Surface area of a lng/lat box on a sphere, in square kilometers.
pub fn bbox_area_km2(bbox: &BBox) -> f64 {
    to_rect(bbox).to_polygon().chamberlain_duquette_unsigned_area() / 1_000_000.0
}

/// How climb counts are turned into a density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityModel {
    /// Boxes smaller than this are treated as this size.
    pub min_area_km2: f64,
}

impl Default for DensityModel {
    fn default() -> Self {
        Self { min_area_km2: 5.0 }
    }
}

impl DensityModel {
    /// Climbs per square kilometer of `bbox`.
    ///
    /// A zero-area box (a single point, or a line) has density 0.
    pub fn density(&self, bbox: &BBox, count: u64) -> f64 {
        let area = bbox_area_km2(bbox);
        if area <= 0.0 || !area.is_finite() {
            return 0.0;
        }
        count as f64 / area.max(self.min_area_km2)
    }
}

/// Density with the default model.
pub fn density(bbox: &BBox, count: u64) -> f64 {
    DensityModel::default().density(bbox, count)
}

/// Mean position of `points`, or the sentinel for an empty slice.
///
/// Callers drop sentinel points before calling.
pub fn centroid_of(points: &[Point]) -> Point {
    let points: MultiPoint = points
        .iter()
        .map(|p| geo::Point::new(p.lng, p.lat))
        .collect();
    points
        .centroid()
        .map(|c| Point::new(c.x(), c.y()))
        .unwrap_or(Point::SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_union_bboxes() {
        let boxes = [
            [0.0, 0.0, 1.0, 1.0],
            [2.0, 2.0, 3.0, 3.0],
            [-1.0, -1.0, 0.0, 0.0],
        ];
        assert_eq!(union_bboxes(&boxes), [-1.0, -1.0, 3.0, 3.0]);
    }

    #[test]
    fn test_union_bboxes_order_independent() {
        let a = [0.0, 0.0, 1.0, 1.0];
        let b = [2.0, -5.0, 3.0, 3.0];
        let c = [-1.0, -1.0, 0.5, 9.0];
        let expected = union_bboxes(&[a, b, c]);
        assert_eq!(union_bboxes(&[c, a, b]), expected);
        assert_eq!(union_bboxes(&[b, c, a]), expected);
        assert_eq!(union_pair(&union_pair(&a, &b), &c), union_pair(&a, &union_pair(&b, &c)));
    }

    #[test]
    fn test_union_bboxes_empty_is_world() {
        assert_eq!(union_bboxes(&[]), WORLD_BBOX);
    }

    #[test]
    fn test_bbox_contains() {
        let outer = [-1.0, -1.0, 3.0, 3.0];
        assert!(bbox_contains(&outer, &[0.0, 0.0, 1.0, 1.0]));
        assert!(bbox_contains(&outer, &outer));
        assert!(!bbox_contains(&outer, &[0.0, 0.0, 4.0, 1.0]));
    }

    #[test]
    fn test_world_area() {
        // 4 * pi * R^2
        let expected = 4.0 * std::f64::consts::PI * EARTH_RADIUS_M.powi(2) / 1_000_000.0;
        assert!((bbox_area_km2(&WORLD_BBOX) - expected).abs() / expected < EPS);
    }

    #[test]
    fn test_box_area_matches_closed_form() {
        let bbox: [f64; 4] = [-119.64, 37.72, -119.53, 37.75];
        let d_lng = (bbox[2] - bbox[0]).to_radians();
        let d_sin = bbox[3].to_radians().sin() - bbox[1].to_radians().sin();
        let expected = EARTH_RADIUS_M.powi(2) * d_lng * d_sin / 1_000_000.0;
        assert!((bbox_area_km2(&bbox) - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn test_density_degenerate_box_is_zero() {
        assert_eq!(density(&[1.0, 1.0, 1.0, 1.0], 10), 0.0);
        assert_eq!(density(&[1.0, 1.0, 2.0, 1.0], 10), 0.0);
    }

    #[test]
    fn test_density_monotonic_in_count() {
        let bbox = [0.0, 0.0, 1.0, 1.0];
        assert_eq!(density(&bbox, 0), 0.0);
        assert!(density(&bbox, 10) < density(&bbox, 20));
    }

    #[test]
    fn test_density_non_increasing_in_area() {
        let small = [0.0, 0.0, 1.0, 1.0];
        let large = [0.0, 0.0, 2.0, 2.0];
        assert!(density(&large, 100) < density(&small, 100));
    }

    #[test]
    fn test_density_small_box_clamped() {
        // roughly 0.01 km^2, well under the floor
        let tiny = [0.0, 0.0, 0.001, 0.001];
        let model = DensityModel { min_area_km2: 5.0 };
        assert!((model.density(&tiny, 10) - 2.0).abs() < EPS);

        let unclamped = DensityModel { min_area_km2: 0.0 };
        assert!(unclamped.density(&tiny, 10) > 2.0);
    }

    #[test]
    fn test_centroid_of() {
        let c = centroid_of(&[Point::new(0.5, 0.5), Point::new(-0.5, -0.5)]);
        assert!(c.lng.abs() < EPS && c.lat.abs() < EPS);

        let c = centroid_of(&[Point::new(1.0, 2.0), Point::new(3.0, 4.0), Point::new(5.0, 0.0)]);
        assert!((c.lng - 3.0).abs() < EPS);
        assert!((c.lat - 2.0).abs() < EPS);
    }

    #[test]
    fn test_centroid_of_empty_is_sentinel() {
        assert!(centroid_of(&[]).is_sentinel());
    }
}
