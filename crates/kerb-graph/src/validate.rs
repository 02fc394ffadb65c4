//! Geometry validation and layer-contract filtering.
//!
//! Each layer is filtered to rows with topologically valid geometry and
//! reindexed to a dense 0-based range; invalid rows are dropped silently and
//! the surviving count is logged. Layer contracts (tree subtype, transit
//! class, derived road length) are applied here too, so every stage
//! downstream can rely on clean tables.

use geo::{Euclidean, Length, Validation};
use geo_types::{LineString, Point, Polygon};
use log::{info, warn};
use std::collections::HashSet;

use kerb_core::errors::{KerbError, Result};
use kerb_core::types::{
    BuildingRecord, CityLayers, NeighborhoodRecord, RoadRecord, TransitRecord, TreeRecord,
    ZoningRecord,
};

/// A layer record whose geometry can be checked for validity.
pub trait SpatialRecord {
    fn has_valid_geometry(&self) -> bool;
}

fn finite_coords(ring: &LineString<f64>) -> bool {
    ring.coords().all(|c| c.x.is_finite() && c.y.is_finite())
}

pub(crate) fn polygon_is_valid(polygon: &Polygon<f64>) -> bool {
    finite_coords(polygon.exterior())
        && polygon.interiors().iter().all(finite_coords)
        && polygon.is_valid()
}

fn line_is_valid(line: &LineString<f64>) -> bool {
    finite_coords(line) && line.is_valid()
}

fn point_is_valid(point: &Point<f64>) -> bool {
    point.x().is_finite() && point.y().is_finite()
}

impl SpatialRecord for NeighborhoodRecord {
    fn has_valid_geometry(&self) -> bool {
        polygon_is_valid(&self.geometry)
    }
}

impl SpatialRecord for BuildingRecord {
    fn has_valid_geometry(&self) -> bool {
        polygon_is_valid(&self.geometry)
    }
}

impl SpatialRecord for RoadRecord {
    fn has_valid_geometry(&self) -> bool {
        line_is_valid(&self.geometry)
    }
}

impl SpatialRecord for TreeRecord {
    fn has_valid_geometry(&self) -> bool {
        point_is_valid(&self.geometry)
    }
}

impl SpatialRecord for TransitRecord {
    fn has_valid_geometry(&self) -> bool {
        point_is_valid(&self.geometry)
    }
}

impl SpatialRecord for ZoningRecord {
    fn has_valid_geometry(&self) -> bool {
        polygon_is_valid(&self.geometry)
    }
}

/// Drops rows with invalid geometry and returns the survivors, densely
/// reindexed by construction. The input is consumed; nothing is mutated.
pub fn retain_valid<T: SpatialRecord>(records: Vec<T>, layer: &str) -> Vec<T> {
    let before = records.len();
    let kept: Vec<T> = records
        .into_iter()
        .filter(|r| r.has_valid_geometry())
        .collect();
    info!("layer '{layer}': {}/{before} rows with valid geometry", kept.len());
    kept
}

fn check_unique_names(neighborhoods: &[NeighborhoodRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    for record in neighborhoods {
        if !seen.insert(record.lie_name.as_str()) {
            return Err(KerbError::schema(
                "neighborhoods",
                format!("duplicate lie_name '{}'", record.lie_name),
            ));
        }
    }
    Ok(())
}

/// Validates every layer of a city and applies the input-contract filters.
///
/// Roads get their `length_m` column recomputed from the planar geometry;
/// trees are narrowed to `subtype == "tree"`, transit stops to the accepted
/// classes. Duplicate neighborhood names are a structural error because
/// `lie_name` keys subgraphs and cache entries.
pub fn validate_city(city: CityLayers) -> Result<CityLayers> {
    let neighborhoods = retain_valid(city.neighborhoods, "neighborhoods");
    check_unique_names(&neighborhoods)?;

    let buildings = retain_valid(city.buildings, "buildings");

    let mut roads = retain_valid(city.roads, "roads");
    for road in &mut roads {
        road.length_m = Euclidean.length(&road.geometry);
    }

    let tree_rows = city.trees.len();
    let trees: Vec<TreeRecord> = city
        .trees
        .into_iter()
        .filter(|t| t.subtype == "tree")
        .collect();
    if trees.len() < tree_rows {
        warn!("layer 'trees': dropped {} rows with subtype != 'tree'", tree_rows - trees.len());
    }
    let trees = retain_valid(trees, "trees");

    let transit_rows = city.transit.len();
    let transit: Vec<TransitRecord> = city
        .transit
        .into_iter()
        .filter(TransitRecord::is_accepted_class)
        .collect();
    if transit.len() < transit_rows {
        warn!(
            "layer 'transit': dropped {} rows outside accepted classes",
            transit_rows - transit.len()
        );
    }
    let transit = retain_valid(transit, "transit");

    let zoning = retain_valid(city.zoning, "zoning");

    Ok(CityLayers {
        neighborhoods,
        buildings,
        roads,
        trees,
        transit,
        zoning,
    })
}
