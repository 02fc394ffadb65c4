//! Fixed-epoch training loop over per-neighborhood graphs.
//!
//! One full gradient step per subgraph per epoch, no mini-batching, no
//! shuffling, no validation split. A subgraph that fails its step is skipped
//! for the rest of the run so one malformed neighborhood cannot abort
//! training for the city.

use log::{debug, info, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use kerb_core::errors::{KerbError, Result};

use crate::model::{normalized_adjacency, Gcn};
use crate::tensor::{GraphTensors, NUM_FEATURES};

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Hidden layer width
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
    /// Fixed number of epochs
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Fixed SGD learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Weight-initialization seed
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Epoch interval for info-level loss logging
    #[serde(default = "default_log_every")]
    pub log_every: usize,
}

fn default_hidden_dim() -> usize {
    16
}

fn default_epochs() -> usize {
    200
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_seed() -> u64 {
    42
}

fn default_log_every() -> usize {
    20
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            hidden_dim: default_hidden_dim(),
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            seed: default_seed(),
            log_every: default_log_every(),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_dim == 0 {
            return Err(KerbError::config("hidden_dim must be at least 1"));
        }
        if self.epochs == 0 {
            return Err(KerbError::config("epochs must be at least 1"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(KerbError::config(format!(
                "learning_rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Summary of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Epochs executed
    pub epochs_run: usize,
    /// Mean masked MSE of the first epoch
    pub initial_loss: f64,
    /// Mean masked MSE of the last epoch
    pub final_loss: f64,
    /// Best epoch-mean loss observed
    pub best_loss: f64,
    /// Subgraphs still training at the end
    pub trained_subgraphs: usize,
    /// Subgraphs dropped after a failed step
    pub skipped_subgraphs: usize,
}

/// Drives [`Gcn`] training and inference over adapted subgraphs.
pub struct GnnTrainer {
    config: TrainConfig,
    model: Gcn,
}

impl GnnTrainer {
    pub fn new(config: TrainConfig) -> Result<Self> {
        config.validate()?;
        let model = Gcn::new(NUM_FEATURES, config.hidden_dim, config.seed);
        Ok(Self { config, model })
    }

    /// Wraps an existing model (e.g. a loaded checkpoint) for inference or
    /// further training.
    pub fn with_model(config: TrainConfig, model: Gcn) -> Result<Self> {
        config.validate()?;
        if model.in_dim() != NUM_FEATURES {
            return Err(KerbError::model(format!(
                "model expects {} features, adapter produces {NUM_FEATURES}",
                model.in_dim()
            )));
        }
        Ok(Self { config, model })
    }

    pub fn model(&self) -> &Gcn {
        &self.model
    }

    pub fn into_model(self) -> Gcn {
        self.model
    }

    /// Runs the fixed-epoch loop over every subgraph.
    ///
    /// Per-subgraph failures are logged and the subgraph is excluded from
    /// later epochs; the run only fails if nothing is left to train on.
    pub fn train(&mut self, graphs: &[GraphTensors]) -> Result<TrainingStats> {
        if graphs.is_empty() {
            return Err(KerbError::model("no subgraphs to train on"));
        }
        let adjacencies: Vec<_> = graphs
            .iter()
            .map(|g| normalized_adjacency(g.num_nodes(), &g.edge_index))
            .collect();
        let lr = self.config.learning_rate as f32;
        let mut active = vec![true; graphs.len()];
        let mut initial_loss = f64::NAN;
        let mut final_loss = f64::NAN;
        let mut best_loss = f64::INFINITY;

        info!(
            "training GCN ({} -> {} -> 1) on {} subgraphs for {} epochs (lr {})",
            NUM_FEATURES,
            self.config.hidden_dim,
            graphs.len(),
            self.config.epochs,
            self.config.learning_rate
        );

        for epoch in 0..self.config.epochs {
            let mut epoch_loss = 0.0f64;
            let mut steps = 0usize;
            for (i, graph) in graphs.iter().enumerate() {
                if !active[i] {
                    continue;
                }
                match self.model.train_step(&graph.x, &adjacencies[i], &graph.y, &graph.mask, lr) {
                    Ok(loss) => {
                        epoch_loss += loss as f64;
                        steps += 1;
                    }
                    Err(e) => {
                        warn!("training failed for '{}': {e}; skipping it from now on", graph.lie_name);
                        active[i] = false;
                    }
                }
            }
            if steps == 0 {
                return Err(KerbError::model("every subgraph failed during training"));
            }
            let mean_loss = epoch_loss / steps as f64;
            if epoch == 0 {
                initial_loss = mean_loss;
            }
            final_loss = mean_loss;
            best_loss = best_loss.min(mean_loss);
            if (epoch + 1) % self.config.log_every.max(1) == 0 || epoch + 1 == self.config.epochs {
                info!("epoch {}/{}: mse {mean_loss:.6}", epoch + 1, self.config.epochs);
            } else {
                debug!("epoch {}/{}: mse {mean_loss:.6}", epoch + 1, self.config.epochs);
            }
        }

        let trained = active.iter().filter(|a| **a).count();
        Ok(TrainingStats {
            epochs_run: self.config.epochs,
            initial_loss,
            final_loss,
            best_loss,
            trained_subgraphs: trained,
            skipped_subgraphs: graphs.len() - trained,
        })
    }

    /// Per-node predictions for one subgraph, gradient-free.
    pub fn predict(&self, graph: &GraphTensors) -> Result<Array1<f32>> {
        let adj = normalized_adjacency(graph.num_nodes(), &graph.edge_index);
        let out = self.model.predict(&graph.x, &adj)?;
        if !out.iter().all(|v| v.is_finite()) {
            return Err(KerbError::model(format!(
                "non-finite prediction for '{}'",
                graph.lie_name
            )));
        }
        Ok(out)
    }
}
