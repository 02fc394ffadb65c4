//! Neighborhood attribute enrichment.
//!
//! Counts tree and transit points falling inside each neighborhood polygon
//! and writes `tree_count` / `transit_count` back onto the table. Points are
//! bucketed through an R-tree so each polygon only pays an exact
//! point-in-polygon test for its bounding-box candidates.

use geo::{BoundingRect, Contains};
use geo_types::{Point, Polygon};
use log::{debug, warn};
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};

use kerb_core::types::{NeighborhoodRecord, TransitRecord, TreeRecord};

use crate::validate::SpatialRecord;

/// R-tree over point rows, carrying the dense row index as payload.
pub(crate) type PointIndex = RTree<GeomWithData<[f64; 2], usize>>;

pub(crate) fn build_point_index<'a>(points: impl Iterator<Item = &'a Point<f64>>) -> PointIndex {
    RTree::bulk_load(
        points
            .enumerate()
            .map(|(row, p)| GeomWithData::new([p.x(), p.y()], row))
            .collect(),
    )
}

/// Row indices whose points fall inside the polygon's bounding box expanded
/// by `margin`, sorted so downstream iteration stays deterministic.
pub(crate) fn candidate_rows(index: &PointIndex, polygon: &Polygon<f64>, margin: f64) -> Vec<usize> {
    let Some(rect) = polygon.bounding_rect() else {
        return Vec::new();
    };
    let envelope = AABB::from_corners(
        [rect.min().x - margin, rect.min().y - margin],
        [rect.max().x + margin, rect.max().y + margin],
    );
    let mut rows: Vec<usize> = index
        .locate_in_envelope_intersecting(&envelope)
        .map(|entry| entry.data)
        .collect();
    rows.sort_unstable();
    rows
}

fn count_inside(index: &PointIndex, polygon: &Polygon<f64>) -> u32 {
    let Some(rect) = polygon.bounding_rect() else {
        return 0;
    };
    let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
    index
        .locate_in_envelope_intersecting(&envelope)
        .filter(|entry| polygon.contains(&Point::new(entry.geom()[0], entry.geom()[1])))
        .count() as u32
}

/// Writes `tree_count` and `transit_count` onto every neighborhood row.
///
/// Rows with an invalid polygon are skipped with a warning and keep zero
/// counts. Containment uses interior semantics, so a point sitting exactly on
/// the boundary is not counted.
pub fn enrich_neighborhoods(
    neighborhoods: &mut [NeighborhoodRecord],
    trees: &[TreeRecord],
    transit: &[TransitRecord],
) {
    let tree_index = build_point_index(trees.iter().map(|t| &t.geometry));
    let transit_index = build_point_index(transit.iter().map(|t| &t.geometry));

    for (i, record) in neighborhoods.iter_mut().enumerate() {
        record.tree_count = 0;
        record.transit_count = 0;
        if !record.has_valid_geometry() {
            warn!(
                "neighborhood {i} ('{}') has invalid geometry; counts stay 0",
                record.lie_name
            );
            continue;
        }
        record.tree_count = count_inside(&tree_index, &record.geometry);
        record.transit_count = count_inside(&transit_index, &record.geometry);
        debug!(
            "'{}': tree_count={}, transit_count={}",
            record.lie_name, record.tree_count, record.transit_count
        );
    }
}
