//! Two-layer graph-convolution regressor.
//!
//! Each layer propagates node features through the symmetric-normalized
//! adjacency with self-loops, `Â = D^{-1/2}(A + I)D^{-1/2}`, followed by a
//! linear transform; ReLU sits between the layers and the output head is one
//! channel wide. With an empty edge table `Â = I` and the model degenerates
//! to a per-node MLP, which is exactly the edgeless-pipeline behavior.
//!
//! Gradients are derived by hand and applied with plain fixed-rate SGD; the
//! loss is mean squared error over the masked (ground-truth) rows only.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use kerb_core::errors::{KerbError, Result};

/// Dense symmetric-normalized adjacency with self-loops.
///
/// Edges are treated as undirected and duplicates collapse. Subgraphs are
/// small (a neighborhood and its buffer features), so the dense form is fine.
pub fn normalized_adjacency(n: usize, edges: &[[usize; 2]]) -> Array2<f32> {
    let mut adj = Array2::<f32>::eye(n);
    for edge in edges {
        adj[[edge[0], edge[1]]] = 1.0;
        adj[[edge[1], edge[0]]] = 1.0;
    }
    let inv_sqrt: Vec<f32> = (0..n)
        .map(|i| {
            let degree = adj.row(i).sum();
            if degree > 0.0 {
                1.0 / degree.sqrt()
            } else {
                0.0
            }
        })
        .collect();
    for i in 0..n {
        for j in 0..n {
            adj[[i, j]] *= inv_sqrt[i] * inv_sqrt[j];
        }
    }
    adj
}

fn glorot(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f32> {
    let limit = (6.0 / (rows + cols) as f32).sqrt();
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-limit..limit))
}

/// The two-layer GCN. Weight shapes: `w1: in x hidden`, `w2: hidden x 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gcn {
    w1: Array2<f32>,
    b1: Array1<f32>,
    w2: Array2<f32>,
    b2: Array1<f32>,
}

impl Gcn {
    /// Glorot-uniform initialization from a seeded generator.
    pub fn new(in_dim: usize, hidden_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            w1: glorot(&mut rng, in_dim, hidden_dim),
            b1: Array1::zeros(hidden_dim),
            w2: glorot(&mut rng, hidden_dim, 1),
            b2: Array1::zeros(1),
        }
    }

    pub fn in_dim(&self) -> usize {
        self.w1.nrows()
    }

    pub fn hidden_dim(&self) -> usize {
        self.w1.ncols()
    }

    fn check_shapes(&self, x: &Array2<f32>, adj: &Array2<f32>) -> Result<()> {
        let n = x.nrows();
        if x.ncols() != self.in_dim() {
            return Err(KerbError::model(format!(
                "feature width {} does not match model input {}",
                x.ncols(),
                self.in_dim()
            )));
        }
        if adj.nrows() != n || adj.ncols() != n {
            return Err(KerbError::model(format!(
                "adjacency is {}x{}, expected {n}x{n}",
                adj.nrows(),
                adj.ncols()
            )));
        }
        Ok(())
    }

    /// Forward pass; returns the per-node prediction.
    pub fn predict(&self, x: &Array2<f32>, adj: &Array2<f32>) -> Result<Array1<f32>> {
        self.check_shapes(x, adj)?;
        let z1 = adj.dot(x).dot(&self.w1) + &self.b1;
        let h = z1.mapv(|v| v.max(0.0));
        let z2 = adj.dot(&h).dot(&self.w2) + &self.b2;
        Ok(z2.column(0).to_owned())
    }

    /// One full gradient step on a single subgraph.
    ///
    /// Returns the pre-update masked MSE. Rows with `mask[i] == false` carry
    /// column-default labels and contribute neither loss nor gradient. An
    /// all-false mask or a non-finite loss is a model error.
    pub fn train_step(
        &mut self,
        x: &Array2<f32>,
        adj: &Array2<f32>,
        y: &Array1<f32>,
        mask: &[bool],
        learning_rate: f32,
    ) -> Result<f32> {
        self.check_shapes(x, adj)?;
        let n = x.nrows();
        if y.len() != n || mask.len() != n {
            return Err(KerbError::model(format!(
                "labels ({}) and mask ({}) must both have {n} rows",
                y.len(),
                mask.len()
            )));
        }
        let labeled = mask.iter().filter(|m| **m).count();
        if labeled == 0 {
            return Err(KerbError::model("no labeled rows to train on"));
        }

        // Forward, keeping intermediates for the backward pass.
        let ax = adj.dot(x);
        let z1 = ax.dot(&self.w1) + &self.b1;
        let h = z1.mapv(|v| v.max(0.0));
        let ah = adj.dot(&h);
        let z2 = ah.dot(&self.w2) + &self.b2;

        let m = labeled as f32;
        let mut loss = 0.0f32;
        let mut dz2 = Array2::<f32>::zeros((n, 1));
        for i in 0..n {
            if mask[i] {
                let diff = z2[[i, 0]] - y[i];
                loss += diff * diff / m;
                dz2[[i, 0]] = 2.0 * diff / m;
            }
        }
        if !loss.is_finite() {
            return Err(KerbError::model(format!("non-finite training loss: {loss}")));
        }

        // Backward. Â is symmetric, so Âᵀ·v = Â·v throughout.
        let dw2 = ah.t().dot(&dz2);
        let db2 = dz2.sum_axis(Axis(0));
        let dh = adj.dot(&dz2).dot(&self.w2.t());
        let relu_grad = z1.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let dz1 = &dh * &relu_grad;
        let dw1 = ax.t().dot(&dz1);
        let db1 = dz1.sum_axis(Axis(0));

        self.w1 -= &(dw1 * learning_rate);
        self.b1 -= &(db1 * learning_rate);
        self.w2 -= &(dw2 * learning_rate);
        self.b2 -= &(db2 * learning_rate);
        Ok(loss)
    }

    /// Writes the weights as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a checkpoint and verifies its dimensions are consistent.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let model: Gcn = serde_json::from_str(&text)?;
        model.validate_dims()?;
        Ok(model)
    }

    fn validate_dims(&self) -> Result<()> {
        if self.w1.ncols() != self.b1.len()
            || self.w2.nrows() != self.w1.ncols()
            || self.w2.ncols() != 1
            || self.b2.len() != 1
        {
            return Err(KerbError::model("checkpoint dimensions are inconsistent"));
        }
        Ok(())
    }
}
