//! Subgraph-to-tensor conversion.
//!
//! Turns one subgraph's node table into the dense inputs the model consumes:
//! an N x 6 feature matrix over the fixed feature columns, the edge index,
//! the per-node rule-score label vector, and a loss mask selecting the rows
//! whose labels are ground truth (neighborhood rows; every other row's label
//! is just the column default).

use ndarray::{Array1, Array2};

use kerb_core::errors::{KerbError, Result};
use kerb_core::node::{NodeAttrs, Subgraph};

/// Fixed model feature columns, in matrix order. These are exactly the
/// inputs of the rule-based score, so the regression target is a
/// deterministic function of the features.
pub const FEATURE_NAMES: [&str; 6] = [
    "residential_pct",
    "commercial_pct",
    "education_pct",
    "ndvi_mean",
    "tree_count",
    "transit_count",
];

/// Model input width.
pub const NUM_FEATURES: usize = FEATURE_NAMES.len();

// Feature scaling. Percentages map to [0, 1] and the two counts are divided
// by the scorer saturation caps, which keeps every feature near unit range
// (fixed-learning-rate SGD needs that) and keeps the label a piecewise-linear
// function of the scaled features.
const PCT_SCALE: f32 = 100.0;
const TREE_SCALE: f32 = 100.0;
const TRANSIT_SCALE: f32 = 20.0;

/// Dense tensors for one subgraph.
#[derive(Debug, Clone)]
pub struct GraphTensors {
    /// Owning neighborhood identity, carried for logging and propagation
    pub lie_name: String,
    /// Node features, one row per node, [`NUM_FEATURES`] columns
    pub x: Array2<f32>,
    /// Undirected edges as node-index pairs (logical shape 2 x E)
    pub edge_index: Vec<[usize; 2]>,
    /// Per-node label: the `walkability_rule` column
    pub y: Array1<f32>,
    /// True for rows whose label is ground truth (neighborhood rows)
    pub mask: Vec<bool>,
}

impl GraphTensors {
    /// Converts a rule-scored subgraph into model tensors.
    ///
    /// Structural anomalies are surfaced as [`KerbError::Tensor`]: an empty
    /// node table, a missing or short `walkability_rule` column, or an edge
    /// endpoint outside the node range. Feature values a variant does not
    /// carry are filled with 0.
    pub fn from_subgraph(subgraph: &Subgraph) -> Result<Self> {
        let n = subgraph.node_count();
        if n == 0 {
            return Err(KerbError::tensor(format!(
                "subgraph '{}' has an empty node table",
                subgraph.lie_name
            )));
        }
        let labels = subgraph.walkability_rule.as_ref().ok_or_else(|| {
            KerbError::tensor(format!(
                "subgraph '{}' is missing the walkability_rule column",
                subgraph.lie_name
            ))
        })?;
        if labels.len() != n {
            return Err(KerbError::tensor(format!(
                "subgraph '{}': label column has {} rows, node table has {n}",
                subgraph.lie_name,
                labels.len()
            )));
        }
        for edge in &subgraph.edges {
            if edge[0] >= n || edge[1] >= n {
                return Err(KerbError::tensor(format!(
                    "subgraph '{}': edge [{}, {}] out of range for {n} nodes",
                    subgraph.lie_name, edge[0], edge[1]
                )));
            }
        }

        let mut x = Array2::zeros((n, NUM_FEATURES));
        let mut mask = vec![false; n];
        for (i, node) in subgraph.nodes.iter().enumerate() {
            if let NodeAttrs::Neighborhood {
                residential_pct,
                commercial_pct,
                education_pct,
                ndvi_mean,
                tree_count,
                transit_count,
                ..
            } = &node.attrs
            {
                x[[i, 0]] = *residential_pct as f32 / PCT_SCALE;
                x[[i, 1]] = *commercial_pct as f32 / PCT_SCALE;
                x[[i, 2]] = *education_pct as f32 / PCT_SCALE;
                x[[i, 3]] = ndvi_mean.unwrap_or(0.0) as f32;
                x[[i, 4]] = *tree_count as f32 / TREE_SCALE;
                x[[i, 5]] = *transit_count as f32 / TRANSIT_SCALE;
                mask[i] = true;
            }
        }

        let y = Array1::from_iter(labels.iter().map(|v| *v as f32));
        Ok(Self {
            lie_name: subgraph.lie_name.clone(),
            x,
            edge_index: subgraph.edges.clone(),
            y,
            mask,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.x.nrows()
    }

    /// Rows contributing to the loss.
    pub fn labeled_rows(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }
}
