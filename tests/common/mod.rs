//! Shared area-tree fixtures.

#![allow(dead_code)]

use crag_rollup::models::{
    Aggregate, AreaNode, BBox, DisciplineStats, GradeBands, GradeCount, Point,
};

pub fn path(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Interior area with the given children.
pub fn area(path_ids: &[&str], children: &[&str]) -> AreaNode {
    let id = path_ids.last().copied().unwrap_or_default();
    let mut node = AreaNode::new(id, id.to_uppercase(), path(path_ids));
    node.children = path(children);
    node
}

/// Crag whose climbs are split between an easy trad band and a hard
/// sport band.
pub fn crag(path_ids: &[&str], easy: u64, hard: u64, bbox: BBox, lnglat: Point) -> AreaNode {
    let mut node = area(path_ids, &[]);
    node.metadata.leaf = true;
    node.metadata.bbox = bbox;
    node.metadata.lnglat = lnglat;
    node.total_climbs = easy + hard;

    let mut aggregate = Aggregate::zero();
    if easy > 0 {
        aggregate.by_grade.push(GradeCount::new("5.6", easy));
        aggregate.by_discipline.insert(
            "trad".to_string(),
            DisciplineStats {
                total: easy,
                bands: GradeBands {
                    beginner: easy,
                    ..GradeBands::default()
                },
            },
        );
    }
    if hard > 0 {
        aggregate.by_grade.push(GradeCount::new("5.12a", hard));
        aggregate.by_discipline.insert(
            "sport".to_string(),
            DisciplineStats {
                total: hard,
                bands: GradeBands {
                    advanced: hard,
                    ..GradeBands::default()
                },
            },
        );
    }
    aggregate.by_grade_band = GradeBands {
        beginner: easy,
        advanced: hard,
        ..GradeBands::default()
    };
    node.aggregate = Some(aggregate);
    node
}

/// Two countries:
///
/// ```text
/// usa ── ca ── yosemite ── {half_dome, el_cap}
///     │     └─ joshua (crag)
///     └─ nv ── red_rock (crag)
/// can ── bc ── squamish (crag)
/// ```
pub fn sample_tree() -> Vec<AreaNode> {
    vec![
        area(&["usa"], &["ca", "nv"]),
        area(&["usa", "ca"], &["yosemite", "joshua"]),
        area(&["usa", "ca", "yosemite"], &["half_dome", "el_cap"]),
        crag(
            &["usa", "ca", "yosemite", "half_dome"],
            2,
            3,
            [-119.54, 37.74, -119.53, 37.75],
            Point::new(-119.533, 37.746),
        ),
        crag(
            &["usa", "ca", "yosemite", "el_cap"],
            0,
            4,
            [-119.64, 37.72, -119.63, 37.74],
            Point::new(-119.637, 37.734),
        ),
        crag(
            &["usa", "ca", "joshua"],
            6,
            1,
            [-116.18, 33.98, -116.14, 34.03],
            Point::SENTINEL,
        ),
        area(&["usa", "nv"], &["red_rock"]),
        crag(
            &["usa", "nv", "red_rock"],
            1,
            8,
            [-115.50, 36.10, -115.40, 36.20],
            Point::new(-115.45, 36.15),
        ),
        area(&["can"], &["bc"]),
        area(&["can", "bc"], &["squamish"]),
        crag(
            &["can", "bc", "squamish"],
            3,
            3,
            [-123.16, 49.67, -123.13, 49.70],
            Point::new(-123.15, 49.68),
        ),
    ]
}

/// One depth-2 area with `width` regions of `crags` crags each.
pub fn wide_tree(width: usize, crags: usize) -> Vec<AreaNode> {
    let region_ids: Vec<String> = (0..width).map(|r| format!("r{}", r)).collect();
    let region_refs: Vec<&str> = region_ids.iter().map(String::as_str).collect();

    let mut areas = vec![
        area(&["top"], &["wide"]),
        area(&["top", "wide"], &region_refs),
    ];
    for region in &region_ids {
        let crag_ids: Vec<String> = (0..crags).map(|c| format!("{}_c{}", region, c)).collect();
        let crag_refs: Vec<&str> = crag_ids.iter().map(String::as_str).collect();
        areas.push(area(&["top", "wide", region.as_str()], &crag_refs));
        for (i, id) in crag_ids.iter().enumerate() {
            let x = i as f64;
            areas.push(crag(
                &["top", "wide", region.as_str(), id.as_str()],
                1,
                1,
                [x, x, x + 0.5, x + 0.5],
                Point::new(x + 0.25, x + 0.25),
            ));
        }
    }
    areas
}

/// A single chain `top -> d2 -> ... -> d{depth}` ending in one crag.
pub fn deep_chain(depth: usize) -> Vec<AreaNode> {
    let ids: Vec<String> = std::iter::once("top".to_string())
        .chain((2..=depth).map(|d| format!("d{}", d)))
        .collect();

    let mut areas = Vec::new();
    for i in 0..ids.len() {
        let prefix: Vec<&str> = ids[..=i].iter().map(String::as_str).collect();
        if i + 1 == ids.len() {
            areas.push(crag(&prefix, 1, 1, [1.0, 1.0, 2.0, 2.0], Point::new(1.5, 1.5)));
        } else {
            areas.push(area(&prefix, &[ids[i + 1].as_str()]));
        }
    }
    areas
}
