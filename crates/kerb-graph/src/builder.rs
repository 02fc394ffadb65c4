//! Per-neighborhood subgraph construction.
//!
//! For each neighborhood the builder consults the cache, and on a miss selects
//! every spatially relevant feature inside the neighborhood's planar buffer,
//! materializes typed nodes (neighborhood node first, index 0), optionally
//! wires hub edges, and persists the result before returning it.
//!
//! Buffer membership is evaluated through Euclidean distance to the
//! unbuffered polygon instead of materializing a dilated geometry:
//! `distance < r` is exactly "strictly within the r-buffer" and
//! `distance <= r` is exactly "intersects the r-buffer". Building containment
//! checks every exterior vertex; that is exact while the buffered region is
//! convex, and for concave boundaries the 1-Lipschitz distance bounds the
//! error by half the longest footprint edge, orders of magnitude under the
//! default 200 m buffer.

use geo::{Distance, Euclidean};
use geo_types::{LineString, Point, Polygon};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use kerb_core::errors::{KerbError, Result};
use kerb_core::node::{GraphNode, RoadEnd, Subgraph};
use kerb_core::types::CityLayers;

use crate::cache::CacheStore;
use crate::enrich::{build_point_index, candidate_rows, PointIndex};

/// Default planar buffer distance around a neighborhood, in meters.
pub const DEFAULT_BUFFER_M: f64 = 200.0;

/// Spatial-selection settings for the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Buffer distance around each neighborhood polygon, meters
    pub buffer_m: f64,
    /// Connect the neighborhood node to every feature node. When false the
    /// edge table stays empty and the downstream convolution degenerates to a
    /// per-node linear transform.
    pub hub_edges: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            buffer_m: DEFAULT_BUFFER_M,
            hub_edges: true,
        }
    }
}

fn point_within_buffer(point: &Point<f64>, polygon: &Polygon<f64>, r: f64) -> bool {
    Euclidean.distance(point, polygon) < r
}

fn building_within_buffer(footprint: &Polygon<f64>, polygon: &Polygon<f64>, r: f64) -> bool {
    footprint
        .exterior()
        .points()
        .all(|vertex| Euclidean.distance(&vertex, polygon) < r)
}

fn road_intersects_buffer(line: &LineString<f64>, polygon: &Polygon<f64>, r: f64) -> bool {
    Euclidean.distance(line, polygon) <= r
}

/// Builds one attributed subgraph per neighborhood, cache-first.
pub struct SubgraphBuilder<'a> {
    layers: &'a CityLayers,
    config: BuilderConfig,
    cache: CacheStore,
    tree_index: PointIndex,
    transit_index: PointIndex,
}

impl<'a> SubgraphBuilder<'a> {
    /// Indexes the point layers once; polygon and line layers are scanned per
    /// neighborhood.
    pub fn new(layers: &'a CityLayers, config: BuilderConfig, cache: CacheStore) -> Self {
        let tree_index = build_point_index(layers.trees.iter().map(|t| &t.geometry));
        let transit_index = build_point_index(layers.transit.iter().map(|t| &t.geometry));
        Self {
            layers,
            config,
            cache,
            tree_index,
            transit_index,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Returns the subgraph for the neighborhood at `index`, idempotently.
    ///
    /// A readable cache entry short-circuits construction entirely. A failed
    /// cache write is reported and absorbed; the in-memory subgraph is still
    /// returned.
    pub fn build(&self, index: usize) -> Result<Subgraph> {
        Ok(self.build_with_source(index)?.0)
    }

    /// Like [`build`](Self::build), but also reports whether the cache served
    /// the entry.
    ///
    /// The flag is `true` only when a stored entry was actually loaded. A file
    /// that exists but fails to parse, carries a stale schema version, or names
    /// a different neighborhood is rebuilt and reported as `false`.
    pub fn build_with_source(&self, index: usize) -> Result<(Subgraph, bool)> {
        let record = self.layers.neighborhoods.get(index).ok_or_else(|| {
            KerbError::graph(format!(
                "neighborhood index {index} out of range ({} rows)",
                self.layers.neighborhoods.len()
            ))
        })?;

        if let Some(cached) = self.cache.load(&record.lie_name) {
            return Ok((cached, true));
        }

        let subgraph = self.construct(index);
        if let Err(e) = self.cache.store(&subgraph) {
            warn!(
                "cache write failed for '{}': {e}; keeping in-memory result",
                record.lie_name
            );
        }
        Ok((subgraph, false))
    }

    fn construct(&self, index: usize) -> Subgraph {
        let record = &self.layers.neighborhoods[index];
        let polygon = &record.geometry;
        let r = self.config.buffer_m;

        let mut nodes = vec![GraphNode::neighborhood(record)];

        for (row, building) in self.layers.buildings.iter().enumerate() {
            if building_within_buffer(&building.geometry, polygon, r) {
                nodes.push(GraphNode::building(row, building));
            }
        }

        for (row, road) in self.layers.roads.iter().enumerate() {
            if road.geometry.0.len() < 2 {
                warn!("road {row} has fewer than two vertices; skipped");
                continue;
            }
            if road_intersects_buffer(&road.geometry, polygon, r) {
                nodes.push(GraphNode::road(row, road, RoadEnd::Start));
                nodes.push(GraphNode::road(row, road, RoadEnd::End));
            }
        }

        for row in candidate_rows(&self.tree_index, polygon, r) {
            if point_within_buffer(&self.layers.trees[row].geometry, polygon, r) {
                nodes.push(GraphNode::tree(row));
            }
        }

        for row in candidate_rows(&self.transit_index, polygon, r) {
            let stop = &self.layers.transit[row];
            if point_within_buffer(&stop.geometry, polygon, r) {
                nodes.push(GraphNode::transit(row, stop));
            }
        }

        let edges = if self.config.hub_edges {
            (1..nodes.len()).map(|i| [0, i]).collect()
        } else {
            Vec::new()
        };

        debug!(
            "built subgraph for '{}': {} nodes ({} buildings, {} road endpoints, {} trees, {} transit), {} edges",
            record.lie_name,
            nodes.len(),
            nodes.iter().filter(|n| n.attrs.type_name() == "building").count(),
            nodes.iter().filter(|n| n.attrs.type_name() == "road").count(),
            nodes.iter().filter(|n| n.attrs.type_name() == "tree").count(),
            nodes.iter().filter(|n| n.attrs.type_name() == "transit").count(),
            edges.len()
        );

        Subgraph::new(record.lie_name.clone(), nodes, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerb_core::synthetic::{demo_city, footprint, square};
    use kerb_core::types::{BuildingRecord, NeighborhoodRecord, RoadRecord};
    use tempfile::TempDir;

    fn builder_for<'a>(
        layers: &'a CityLayers,
        dir: &TempDir,
        config: BuilderConfig,
    ) -> SubgraphBuilder<'a> {
        SubgraphBuilder::new(layers, config, CacheStore::new(dir.path()))
    }

    #[test]
    fn test_neighborhood_node_first() {
        let city = demo_city();
        let dir = TempDir::new().unwrap();
        let builder = builder_for(&city, &dir, BuilderConfig::default());

        for index in 0..city.neighborhoods.len() {
            let sg = builder.build(index).unwrap();
            assert!(sg.nodes[0].is_neighborhood(), "index 0 must be the neighborhood node");
            assert_eq!(sg.count_type("neighborhood"), 1);
        }
    }

    #[test]
    fn test_demo_city_selection_counts() {
        let city = demo_city();
        let dir = TempDir::new().unwrap();
        let builder = builder_for(&city, &dir, BuilderConfig::default());

        let expected = [
            // (buildings, road endpoints, trees, transit)
            (4, 4, 3, 1),
            (3, 2, 2, 1),
            (1, 2, 2, 2),
        ];
        for (index, (buildings, roads, trees, transit)) in expected.iter().enumerate() {
            let sg = builder.build(index).unwrap();
            assert_eq!(sg.count_type("building"), *buildings, "buildings of {index}");
            assert_eq!(sg.count_type("road"), *roads, "road endpoints of {index}");
            assert_eq!(sg.count_type("tree"), *trees, "trees of {index}");
            assert_eq!(sg.count_type("transit"), *transit, "transit of {index}");
        }
    }

    #[test]
    fn test_far_building_never_selected() {
        let city = demo_city();
        let dir = TempDir::new().unwrap();
        let builder = builder_for(&city, &dir, BuilderConfig::default());

        // Row 4 sits between the buffers; row 9 touches one exactly.
        for index in 0..city.neighborhoods.len() {
            let sg = builder.build(index).unwrap();
            for node in sg.nodes.iter().filter(|n| n.attrs.type_name() == "building") {
                assert_ne!(node.source_row, Some(4), "building 4 leaked into subgraph {index}");
                assert_ne!(node.source_row, Some(9), "boundary-touching building included");
            }
        }
    }

    #[test]
    fn test_boundary_crossing_road_included() {
        let city = demo_city();
        let dir = TempDir::new().unwrap();
        let builder = builder_for(&city, &dir, BuilderConfig::default());

        let sg = builder.build(0).unwrap();
        let road_rows: Vec<usize> = sg
            .nodes
            .iter()
            .filter(|n| n.attrs.type_name() == "road")
            .filter_map(|n| n.source_row)
            .collect();
        assert!(road_rows.contains(&1), "road crossing the buffer boundary must be included");
        assert!(!road_rows.contains(&4), "remote road must be excluded");
    }

    #[test]
    fn test_within_vs_intersects_semantics() {
        let mut city = CityLayers::new();
        city.neighborhoods = vec![NeighborhoodRecord::new("n", square(0.0, 0.0, 100.0))];
        // Nearest vertex at distance 150 < 200, farthest at 190: contained.
        city.buildings.push(BuildingRecord::new(footprint(270.0, 50.0, 20.0), "mixed", 1600.0));
        // Nearest vertex at 200 exactly: excluded under within semantics.
        city.buildings.push(BuildingRecord::new(footprint(320.0, 50.0, 20.0), "mixed", 1600.0));
        // Same standoff for a road: included under intersects semantics.
        city.roads
            .push(RoadRecord::new(LineString::from(vec![(300.0, 0.0), (300.0, 100.0)]), "primary"));

        let dir = TempDir::new().unwrap();
        let builder = builder_for(&city, &dir, BuilderConfig::default());
        let sg = builder.build(0).unwrap();

        assert_eq!(sg.count_type("building"), 1);
        assert_eq!(sg.count_type("road"), 2);
    }

    #[test]
    fn test_hub_edges_span_all_nodes() {
        let city = demo_city();
        let dir = TempDir::new().unwrap();
        let builder = builder_for(&city, &dir, BuilderConfig::default());

        let sg = builder.build(0).unwrap();
        assert_eq!(sg.edge_count(), sg.node_count() - 1);
        assert!(sg.edges.iter().all(|[a, _]| *a == 0));
        let mut targets: Vec<usize> = sg.edges.iter().map(|[_, b]| *b).collect();
        targets.sort_unstable();
        assert_eq!(targets, (1..sg.node_count()).collect::<Vec<_>>());
    }

    #[test]
    fn test_edgeless_mode() {
        let city = demo_city();
        let dir = TempDir::new().unwrap();
        let config = BuilderConfig {
            hub_edges: false,
            ..BuilderConfig::default()
        };
        let builder = builder_for(&city, &dir, config);
        let sg = builder.build(1).unwrap();
        assert_eq!(sg.edge_count(), 0);
        assert!(sg.node_count() > 1);
    }

    #[test]
    fn test_out_of_range_index() {
        let city = demo_city();
        let dir = TempDir::new().unwrap();
        let builder = builder_for(&city, &dir, BuilderConfig::default());
        let err = builder.build(99).unwrap_err();
        assert!(matches!(err, KerbError::Graph(_)));
    }

    #[test]
    fn test_build_reports_cache_source() {
        let city = demo_city();
        let dir = TempDir::new().unwrap();
        let builder = builder_for(&city, &dir, BuilderConfig::default());

        let (first, from_cache) = builder.build_with_source(0).unwrap();
        assert!(!from_cache, "cold build must report a miss");

        let (second, from_cache) = builder.build_with_source(0).unwrap();
        assert!(from_cache, "warm build must report a cache serve");
        assert_eq!(first, second);
    }
}
