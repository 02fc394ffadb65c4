//! Graph node and subgraph types.
//!
//! A subgraph's node table is heterogeneous: one neighborhood node followed by
//! building/road/tree/transit nodes selected by the spatial buffer. Nodes are
//! a tagged sum type, so the compiler enforces which attributes each variant
//! carries; the display identity string is derived for cache inspection and is
//! never parsed back.

use serde::{Deserialize, Serialize};

use crate::types::{BuildingRecord, NeighborhoodRecord, RoadRecord, TransitRecord};

/// Which terminal vertex of a road centerline a road node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadEnd {
    Start,
    End,
}

impl RoadEnd {
    fn prefix(self) -> &'static str {
        match self {
            RoadEnd::Start => "road_start",
            RoadEnd::End => "road_end",
        }
    }
}

/// Variant-specific node attributes.
///
/// The discriminant serializes as a `type` field, so cache entries read as
/// `{"type": "building", "building_type": ..., "area_m2": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeAttrs {
    Neighborhood {
        lie_name: String,
        population: f64,
        residential_pct: f64,
        commercial_pct: f64,
        education_pct: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ndvi_mean: Option<f64>,
        tree_count: u32,
        transit_count: u32,
    },
    Building {
        building_type: String,
        area_m2: f64,
    },
    Road {
        class: String,
        length_m: f64,
        endpoint: RoadEnd,
    },
    Tree,
    Transit {
        class: String,
    },
}

impl NodeAttrs {
    /// The type tag as it appears in serialized form.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeAttrs::Neighborhood { .. } => "neighborhood",
            NodeAttrs::Building { .. } => "building",
            NodeAttrs::Road { .. } => "road",
            NodeAttrs::Tree => "tree",
            NodeAttrs::Transit { .. } => "transit",
        }
    }
}

/// One row of a subgraph's node table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Display identity, unique within the subgraph
    pub vertex: String,
    /// Dense row index into the originating layer; `None` for the
    /// neighborhood node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_row: Option<usize>,
    /// Variant payload
    #[serde(flatten)]
    pub attrs: NodeAttrs,
}

impl GraphNode {
    /// Builds the neighborhood node from its city-table record. The vertex
    /// identity is the `lie_name` itself.
    pub fn neighborhood(record: &NeighborhoodRecord) -> Self {
        Self {
            vertex: record.lie_name.clone(),
            source_row: None,
            attrs: NodeAttrs::Neighborhood {
                lie_name: record.lie_name.clone(),
                population: record.population,
                residential_pct: record.residential_pct,
                commercial_pct: record.commercial_pct,
                education_pct: record.education_pct,
                ndvi_mean: record.ndvi_mean,
                tree_count: record.tree_count,
                transit_count: record.transit_count,
            },
        }
    }

    pub fn building(row: usize, record: &BuildingRecord) -> Self {
        Self {
            vertex: format!("building_{row}"),
            source_row: Some(row),
            attrs: NodeAttrs::Building {
                building_type: record.building_type.clone(),
                area_m2: record.area_m2,
            },
        }
    }

    /// Builds one of the two endpoint nodes for a road row. Class and length
    /// ride on the payload, so nothing ever needs to be recovered from the
    /// vertex string.
    pub fn road(row: usize, record: &RoadRecord, endpoint: RoadEnd) -> Self {
        Self {
            vertex: format!("{}_{row}", endpoint.prefix()),
            source_row: Some(row),
            attrs: NodeAttrs::Road {
                class: record.class.clone(),
                length_m: record.length_m,
                endpoint,
            },
        }
    }

    pub fn tree(row: usize) -> Self {
        Self {
            vertex: format!("tree_{row}"),
            source_row: Some(row),
            attrs: NodeAttrs::Tree,
        }
    }

    pub fn transit(row: usize, record: &TransitRecord) -> Self {
        Self {
            vertex: format!("transit_{row}"),
            source_row: Some(row),
            attrs: NodeAttrs::Transit {
                class: record.class.clone(),
            },
        }
    }

    pub fn is_neighborhood(&self) -> bool {
        matches!(self.attrs, NodeAttrs::Neighborhood { .. })
    }
}

/// The attributed graph owned by one neighborhood.
///
/// Node index 0 is the neighborhood node whenever one exists. The two score
/// columns start out absent and are attached by the rule-based scorer and the
/// GNN respectively; they are recomputed every run and never persisted with
/// the cached node/edge tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Subgraph {
    /// Owning neighborhood identity
    pub lie_name: String,
    /// Ordered node table
    pub nodes: Vec<GraphNode>,
    /// Undirected edges as node-index pairs; may be empty
    pub edges: Vec<[usize; 2]>,
    /// Per-node rule-based walkability column, attached by the scorer
    pub walkability_rule: Option<Vec<f64>>,
    /// Per-node GNN prediction column, attached after inference
    pub walkability_gnn: Option<Vec<f64>>,
}

impl Subgraph {
    /// Creates a subgraph from freshly built node and edge tables.
    pub fn new(lie_name: impl Into<String>, nodes: Vec<GraphNode>, edges: Vec<[usize; 2]>) -> Self {
        Self {
            lie_name: lie_name.into(),
            nodes,
            edges,
            walkability_rule: None,
            walkability_gnn: None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The neighborhood node, if the table has one at index 0.
    pub fn neighborhood(&self) -> Option<&GraphNode> {
        self.nodes.first().filter(|n| n.is_neighborhood())
    }

    /// Counts nodes carrying the given type tag.
    pub fn count_type(&self, type_name: &str) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.attrs.type_name() == type_name)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NeighborhoodRecord, RoadRecord, TransitRecord};
    use geo_types::{LineString, Point, Polygon};

    fn square() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        )
    }

    #[test]
    fn test_node_identities() {
        let record = NeighborhoodRecord::new("Harborview", square());
        let hub = GraphNode::neighborhood(&record);
        assert_eq!(hub.vertex, "Harborview");
        assert!(hub.source_row.is_none());
        assert!(hub.is_neighborhood());

        let road = RoadRecord::new(LineString::from(vec![(0.0, 0.0), (5.0, 0.0)]), "residential");
        let start = GraphNode::road(7, &road, RoadEnd::Start);
        let end = GraphNode::road(7, &road, RoadEnd::End);
        assert_eq!(start.vertex, "road_start_7");
        assert_eq!(end.vertex, "road_end_7");
        assert_eq!(start.source_row, Some(7));
        match &start.attrs {
            NodeAttrs::Road { class, endpoint, .. } => {
                assert_eq!(class, "residential");
                assert_eq!(*endpoint, RoadEnd::Start);
            }
            other => panic!("expected road attrs, got {other:?}"),
        }
    }

    #[test]
    fn test_node_serialization_tag() {
        let stop = TransitRecord::new(Point::new(1.0, 2.0), "bus_stop");
        let node = GraphNode::transit(3, &stop);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "transit");
        assert_eq!(json["vertex"], "transit_3");
        assert_eq!(json["class"], "bus_stop");

        let back: GraphNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_road_payload_field_names() {
        let road = RoadRecord::new(LineString::from(vec![(0.0, 0.0), (3.0, 0.0)]), "primary");
        let node = GraphNode::road(1, &road, RoadEnd::Start);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "road");
        assert_eq!(json["endpoint"], "start");
        assert_eq!(json["class"], "primary");

        let back: GraphNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_subgraph_accessors() {
        let record = NeighborhoodRecord::new("Northgate", square());
        let nodes = vec![GraphNode::neighborhood(&record), GraphNode::tree(0), GraphNode::tree(1)];
        let sg = Subgraph::new("Northgate", nodes, vec![[0, 1], [0, 2]]);

        assert_eq!(sg.node_count(), 3);
        assert_eq!(sg.edge_count(), 2);
        assert_eq!(sg.count_type("tree"), 2);
        assert!(sg.neighborhood().is_some());
        assert!(sg.walkability_rule.is_none());
    }

    #[test]
    fn test_subgraph_without_neighborhood_node() {
        let sg = Subgraph::new("empty", vec![GraphNode::tree(0)], vec![]);
        assert!(sg.neighborhood().is_none());
    }
}
