//! # kerb-pipeline
//!
//! Orchestration and configuration for the kerb walkability pipeline.
//!
//! This crate wires the stages from `kerb-graph` and `kerb-gnn` into one
//! run over a [`kerb_core::CityLayers`] bundle and carries the `kerb`
//! command-line binary.

pub mod config;
pub mod orchestrator;

// Re-export commonly used items
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use orchestrator::{
    write_scores_json, write_summary_json, LayerCounts, Pipeline, PipelineOutcome, RunSummary,
    StageTimings,
};
