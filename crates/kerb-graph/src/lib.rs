//! # kerb-graph
//!
//! Spatial core of the kerb walkability pipeline: geometry validation,
//! neighborhood attribute enrichment, cached per-neighborhood subgraph
//! construction, and rule-based walkability scoring.
//!
//! The stages compose in order: [`validate::validate_city`] →
//! [`enrich::enrich_neighborhoods`] → [`builder::SubgraphBuilder`] →
//! [`scoring::WalkabilityScorer`].

pub mod builder;
pub mod cache;
pub mod enrich;
pub mod scoring;
pub mod validate;

// Re-export commonly used items
pub use builder::{BuilderConfig, SubgraphBuilder, DEFAULT_BUFFER_M};
pub use cache::{CacheEntry, CacheStore, CACHE_SCHEMA_VERSION};
pub use enrich::enrich_neighborhoods;
pub use scoring::{classify, ScoreWeights, WalkabilityBreakdown, WalkabilityScorer};
pub use validate::{retain_valid, validate_city, SpatialRecord};
