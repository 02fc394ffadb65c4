//! # kerb-core
//!
//! Core types and errors for the kerb walkability pipeline.
//!
//! This crate defines the vocabulary shared by every kerb component:
//! - **Types**: geospatial layer records and the `CityLayers` bundle
//! - **Nodes**: the heterogeneous graph-node sum type and `Subgraph`
//! - **Errors**: unified error handling with `KerbError`
//! - **Synthetic**: deterministic city generators for demos and tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  kerb-core  │  ← layer records, nodes, errors
//! └─────────────┘
//!        ▲
//!   ┌────┴─────┐
//! ┌─▼────────┐ ┌─▼──────┐
//! │kerb-graph│ │kerb-gnn│
//! └──────────┘ └────────┘
//!        ▲         ▲
//!   ┌────┴─────────┘
//! ┌─▼───────────┐
//! │kerb-pipeline│
//! └─────────────┘
//! ```

pub mod errors;
pub mod node;
pub mod synthetic;
pub mod types;

// Re-export commonly used items
pub use errors::{KerbError, Result};
pub use node::{GraphNode, NodeAttrs, RoadEnd, Subgraph};
pub use types::{
    BuildingRecord, CityLayers, NeighborhoodRecord, RoadRecord, TransitRecord, TreeRecord,
    ZoningRecord, TRANSIT_CLASSES,
};
