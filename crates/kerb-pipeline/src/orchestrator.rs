//! Pipeline orchestrator - runs the stages in order and aggregates a summary.
//!
//! Stage order is fixed: validation, enrichment, cached subgraph
//! construction, rule scoring, GNN refinement. A neighborhood that fails
//! subgraph construction or refinement is reported and dropped from the
//! affected stage; the run itself only fails when a whole stage produces
//! nothing usable.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use kerb_core::errors::{KerbError, Result};
use kerb_core::types::{CityLayers, NeighborhoodRecord};
use kerb_core::Subgraph;
use kerb_gnn::{Gcn, GnnTrainer, GraphTensors, TrainingStats};
use kerb_graph::{
    enrich_neighborhoods, validate_city, BuilderConfig, CacheStore, SubgraphBuilder,
    WalkabilityScorer,
};

use crate::config::PipelineConfig;

/// Per-layer row counts, taken before and after validation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LayerCounts {
    pub neighborhoods: usize,
    pub buildings: usize,
    pub roads: usize,
    pub trees: usize,
    pub transit: usize,
    pub zoning: usize,
}

impl LayerCounts {
    pub fn from_layers(layers: &CityLayers) -> Self {
        Self {
            neighborhoods: layers.neighborhoods.len(),
            buildings: layers.buildings.len(),
            roads: layers.roads.len(),
            trees: layers.trees.len(),
            transit: layers.transit.len(),
            zoning: layers.zoning.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.neighborhoods + self.buildings + self.roads + self.trees + self.transit + self.zoning
    }
}

/// Wall-clock stage durations in milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub validate_ms: u64,
    pub enrich_ms: u64,
    pub subgraphs_ms: u64,
    pub scoring_ms: u64,
    pub gnn_ms: u64,
    pub total_ms: u64,
}

/// Aggregated result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Row counts as received
    pub rows_in: LayerCounts,
    /// Row counts after validation
    pub rows_kept: LayerCounts,
    /// Subgraphs successfully built
    pub subgraphs_built: usize,
    /// Subgraphs served from the cache
    pub cache_hits: usize,
    /// Subgraphs constructed from scratch
    pub cache_misses: usize,
    /// Neighborhoods whose subgraph construction failed
    pub failed_neighborhoods: Vec<String>,
    /// Mean rule-based walkability over scored neighborhoods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_walkability_rule: Option<f64>,
    /// Mean refined walkability over refined neighborhoods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_walkability_gnn: Option<f64>,
    /// Training statistics, absent when refinement was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gnn: Option<TrainingStats>,
    /// Stage durations
    pub timings: StageTimings,
}

/// Everything a pipeline run produces.
pub struct PipelineOutcome {
    /// City table with enrichment counts and both walkability columns
    pub neighborhoods: Vec<NeighborhoodRecord>,
    /// Per-neighborhood subgraphs with score columns attached
    pub subgraphs: Vec<Subgraph>,
    /// Run summary
    pub summary: RunSummary,
    /// Trained model, absent when refinement was skipped or impossible
    pub model: Option<Gcn>,
}

/// Drives a full walkability run over one city.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every stage over the given layers.
    pub fn run(&self, layers: CityLayers) -> Result<PipelineOutcome> {
        let total_start = Instant::now();
        let rows_in = LayerCounts::from_layers(&layers);
        info!(
            "starting walkability run: {} rows across six layers",
            rows_in.total()
        );

        let stage = Instant::now();
        let mut layers = validate_city(layers)?;
        let rows_kept = LayerCounts::from_layers(&layers);
        let validate_ms = stage.elapsed().as_millis() as u64;

        let stage = Instant::now();
        enrich_neighborhoods(&mut layers.neighborhoods, &layers.trees, &layers.transit);
        let enrich_ms = stage.elapsed().as_millis() as u64;

        let cache = CacheStore::new(&self.config.cache_dir);
        if self.config.refresh_cache {
            let removed = cache.clear()?;
            info!(
                "cleared {removed} cached subgraphs from {}",
                self.config.cache_dir.display()
            );
        }

        let stage = Instant::now();
        let builder_config = BuilderConfig {
            buffer_m: self.config.buffer_m,
            hub_edges: self.config.hub_edges,
        };
        let (mut subgraphs, cache_hits, failed_neighborhoods) = {
            let builder = SubgraphBuilder::new(&layers, builder_config, cache);
            let mut subgraphs = Vec::with_capacity(layers.neighborhoods.len());
            let mut failed = Vec::new();
            let mut cache_hits = 0usize;
            for (index, record) in layers.neighborhoods.iter().enumerate() {
                match builder.build_with_source(index) {
                    Ok((subgraph, from_cache)) => {
                        if from_cache {
                            cache_hits += 1;
                        }
                        subgraphs.push(subgraph);
                    }
                    Err(e) => {
                        warn!("subgraph construction failed for '{}': {e}", record.lie_name);
                        failed.push(record.lie_name.clone());
                    }
                }
            }
            (subgraphs, cache_hits, failed)
        };
        let subgraphs_ms = stage.elapsed().as_millis() as u64;

        if subgraphs.is_empty() && !layers.neighborhoods.is_empty() {
            return Err(KerbError::graph(
                "every neighborhood failed subgraph construction",
            ));
        }

        let stage = Instant::now();
        let name_to_row: HashMap<String, usize> = layers
            .neighborhoods
            .iter()
            .enumerate()
            .map(|(row, n)| (n.lie_name.clone(), row))
            .collect();
        let scorer = WalkabilityScorer::new(self.config.weights.clone());
        for subgraph in &mut subgraphs {
            if let Some(score) = scorer.apply(subgraph) {
                if let Some(&row) = name_to_row.get(&subgraph.lie_name) {
                    layers.neighborhoods[row].walkability_rule = Some(score);
                }
            }
        }
        let scoring_ms = stage.elapsed().as_millis() as u64;

        let mut gnn_stats = None;
        let mut model = None;
        let mut gnn_ms = 0;
        if self.config.skip_gnn {
            info!("skipping GNN refinement (skip_gnn set)");
        } else if subgraphs.is_empty() {
            info!("skipping GNN refinement (nothing to train on)");
        } else {
            let stage = Instant::now();
            let (stats, trained) =
                self.refine(&mut subgraphs, &mut layers.neighborhoods, &name_to_row)?;
            gnn_stats = Some(stats);
            model = Some(trained);
            gnn_ms = stage.elapsed().as_millis() as u64;
        }

        let mean_walkability_rule =
            mean_of(layers.neighborhoods.iter().filter_map(|n| n.walkability_rule));
        let mean_walkability_gnn =
            mean_of(layers.neighborhoods.iter().filter_map(|n| n.walkability_gnn));
        let total_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "run complete in {:.2}s: {} subgraphs ({} cached), {} failed",
            total_start.elapsed().as_secs_f64(),
            subgraphs.len(),
            cache_hits,
            failed_neighborhoods.len()
        );

        let summary = RunSummary {
            rows_in,
            rows_kept,
            subgraphs_built: subgraphs.len(),
            cache_hits,
            cache_misses: subgraphs.len() - cache_hits,
            failed_neighborhoods,
            mean_walkability_rule,
            mean_walkability_gnn,
            gnn: gnn_stats,
            timings: StageTimings {
                validate_ms,
                enrich_ms,
                subgraphs_ms,
                scoring_ms,
                gnn_ms,
                total_ms,
            },
        };

        Ok(PipelineOutcome {
            neighborhoods: layers.neighborhoods,
            subgraphs,
            summary,
            model,
        })
    }

    /// Trains the GCN on the rule labels and attaches `walkability_gnn`.
    ///
    /// A subgraph that cannot be adapted is excluded with a warning. Fails
    /// only when nothing was adaptable or training itself fails.
    fn refine(
        &self,
        subgraphs: &mut [Subgraph],
        neighborhoods: &mut [NeighborhoodRecord],
        name_to_row: &HashMap<String, usize>,
    ) -> Result<(TrainingStats, Gcn)> {
        let mut indices = Vec::with_capacity(subgraphs.len());
        let mut graphs = Vec::with_capacity(subgraphs.len());
        for (index, subgraph) in subgraphs.iter().enumerate() {
            match GraphTensors::from_subgraph(subgraph) {
                Ok(tensors) => {
                    indices.push(index);
                    graphs.push(tensors);
                }
                Err(e) => warn!("excluding '{}' from refinement: {e}", subgraph.lie_name),
            }
        }
        if graphs.is_empty() {
            return Err(KerbError::model(
                "no subgraph could be adapted for refinement",
            ));
        }

        let mut trainer = GnnTrainer::new(self.config.gnn.clone())?;
        let stats = trainer.train(&graphs)?;

        for (&index, graph) in indices.iter().zip(graphs.iter()) {
            match trainer.predict(graph) {
                Ok(out) => {
                    let column: Vec<f64> = out.iter().map(|v| *v as f64).collect();
                    if graph.mask.first().copied().unwrap_or(false) {
                        if let Some(&row) = name_to_row.get(&graph.lie_name) {
                            neighborhoods[row].walkability_gnn = Some(column[0]);
                        }
                    }
                    subgraphs[index].walkability_gnn = Some(column);
                }
                Err(e) => warn!("prediction failed for '{}': {e}", graph.lie_name),
            }
        }

        Ok((stats, trainer.into_model()))
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Writes the scored city table as pretty JSON.
pub fn write_scores_json(path: &Path, neighborhoods: &[NeighborhoodRecord]) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(neighborhoods)?;
    fs::write(path, json)?;
    info!("wrote {} scored neighborhoods to {}", neighborhoods.len(), path.display());
    Ok(())
}

/// Writes the run summary as pretty JSON.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)?;
    info!("wrote run summary to {}", path.display());
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerb_core::synthetic::demo_city;
    use tempfile::TempDir;

    fn test_config(cache: &TempDir) -> PipelineConfig {
        PipelineConfig::builder()
            .cache_dir(cache.path())
            .skip_gnn(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_layer_counts() {
        let city = demo_city();
        let counts = LayerCounts::from_layers(&city);
        assert_eq!(counts.neighborhoods, 3);
        assert_eq!(counts.total(), city.total_rows());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            buffer_m: -1.0,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn test_run_without_refinement() {
        let cache = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&cache)).unwrap();
        let outcome = pipeline.run(demo_city()).unwrap();

        assert_eq!(outcome.subgraphs.len(), 3);
        assert_eq!(outcome.summary.subgraphs_built, 3);
        assert_eq!(outcome.summary.cache_hits, 0);
        assert_eq!(outcome.summary.cache_misses, 3);
        assert!(outcome.summary.failed_neighborhoods.is_empty());
        assert!(outcome.summary.gnn.is_none());
        assert!(outcome.model.is_none());
        for record in &outcome.neighborhoods {
            assert!(record.walkability_rule.is_some());
            assert!(record.walkability_gnn.is_none());
        }
    }

    #[test]
    fn test_second_run_is_served_from_cache() {
        let cache = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&cache)).unwrap();
        pipeline.run(demo_city()).unwrap();
        let second = pipeline.run(demo_city()).unwrap();

        assert_eq!(second.summary.cache_hits, 3);
        assert_eq!(second.summary.cache_misses, 0);
    }

    #[test]
    fn test_unreadable_entry_counts_as_miss() {
        let cache = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&cache)).unwrap();
        pipeline.run(demo_city()).unwrap();

        // An entry that exists on disk but cannot be parsed is rebuilt, and
        // the summary must report the rebuild as a miss.
        let path = CacheStore::new(cache.path()).entry_path("Midtown");
        std::fs::write(&path, "{not json").unwrap();

        let second = pipeline.run(demo_city()).unwrap();
        assert_eq!(second.summary.cache_hits, 2);
        assert_eq!(second.summary.cache_misses, 1);
    }

    #[test]
    fn test_refresh_cache_rebuilds() {
        let cache = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&cache)).unwrap();
        pipeline.run(demo_city()).unwrap();

        let mut config = test_config(&cache);
        config.refresh_cache = true;
        let refreshed = Pipeline::new(config).unwrap().run(demo_city()).unwrap();
        assert_eq!(refreshed.summary.cache_hits, 0);
        assert_eq!(refreshed.summary.cache_misses, 3);
    }

    #[test]
    fn test_empty_city_is_an_empty_run() {
        let cache = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&cache)).unwrap();
        let outcome = pipeline.run(CityLayers::default()).unwrap();
        assert!(outcome.neighborhoods.is_empty());
        assert!(outcome.subgraphs.is_empty());
        assert!(outcome.summary.mean_walkability_rule.is_none());
    }

    #[test]
    fn test_mean_of() {
        assert_eq!(mean_of(std::iter::empty::<f64>()), None);
        assert_eq!(mean_of([1.0, 2.0, 3.0].into_iter()), Some(2.0));
    }

    #[test]
    fn test_output_writers() {
        let dir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(&cache)).unwrap();
        let outcome = pipeline.run(demo_city()).unwrap();

        let scores_path = dir.path().join("out/scores.json");
        let summary_path = dir.path().join("out/summary.json");
        write_scores_json(&scores_path, &outcome.neighborhoods).unwrap();
        write_summary_json(&summary_path, &outcome.summary).unwrap();

        let scores: Vec<NeighborhoodRecord> =
            serde_json::from_str(&std::fs::read_to_string(&scores_path).unwrap()).unwrap();
        assert_eq!(scores.len(), 3);
        let summary: RunSummary =
            serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(summary.subgraphs_built, 3);
    }
}
