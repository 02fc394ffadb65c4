//! Graph neural refinement of rule-based walkability scores.
//!
//! Converts attributed neighborhood subgraphs into dense tensors, trains a
//! small two-layer graph convolutional network against the rule scorer's
//! labels, and produces refined per-node predictions. Everything here stays
//! on the CPU with hand-derived gradients; the graphs are small enough that
//! dense adjacency matrices are the simplest thing that works.

pub mod model;
pub mod tensor;
pub mod trainer;

pub use model::{normalized_adjacency, Gcn};
pub use tensor::{GraphTensors, FEATURE_NAMES, NUM_FEATURES};
pub use trainer::{GnnTrainer, TrainConfig, TrainingStats};
