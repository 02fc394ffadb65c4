//! Rule-based walkability scoring.
//!
//! A pure, total weighted sum over a neighborhood's attributes: land-use mix,
//! vegetation (NDVI), tree density, and transit density, clamped into
//! `[0, 1]`. Applied to a subgraph it attaches the per-node
//! `walkability_rule` column, where only the neighborhood row carries a
//! computed value.

use log::warn;
use serde::{Deserialize, Serialize};

use kerb_core::node::{NodeAttrs, Subgraph};

/// Tree count at which the tree sub-score saturates.
pub const TREE_CAP: f64 = 100.0;
/// Transit-stop count at which the transit sub-score saturates.
pub const TRANSIT_CAP: f64 = 20.0;
/// Maps NDVI from [-1, 1] into [-0.5, 0.5] before weighting.
const NDVI_SCALE: f64 = 0.5;

/// Weights of the walkability sub-scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Residential land-use weight inside the land-use term
    #[serde(default = "default_residential")]
    pub residential: f64,
    /// Commercial land-use weight inside the land-use term
    #[serde(default = "default_commercial")]
    pub commercial: f64,
    /// Education land-use weight inside the land-use term
    #[serde(default = "default_education")]
    pub education: f64,
    /// Weight of the (scaled) NDVI term
    #[serde(default = "default_ndvi")]
    pub ndvi: f64,
    /// Weight of the capped tree-density term
    #[serde(default = "default_tree")]
    pub tree: f64,
    /// Weight of the capped transit-density term
    #[serde(default = "default_transit")]
    pub transit: f64,
}

fn default_residential() -> f64 {
    0.4
}

fn default_commercial() -> f64 {
    0.3
}

fn default_education() -> f64 {
    0.2
}

fn default_ndvi() -> f64 {
    0.4
}

fn default_tree() -> f64 {
    0.2
}

fn default_transit() -> f64 {
    0.2
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            residential: 0.4,
            commercial: 0.3,
            education: 0.2,
            ndvi: 0.4,
            tree: 0.2,
            transit: 0.2,
        }
    }
}

/// Sub-scores and the clamped total for one neighborhood.
///
/// Components are reported unclamped, so a negative NDVI stays visible even
/// though the total is clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WalkabilityBreakdown {
    pub land_use_score: f64,
    pub ndvi_score: f64,
    pub tree_score: f64,
    pub transit_score: f64,
    pub walkability: f64,
}

/// Descriptive walkability band for reporting.
pub fn classify(walkability: f64) -> &'static str {
    if walkability >= 0.75 {
        "walkers_paradise"
    } else if walkability >= 0.5 {
        "very_walkable"
    } else if walkability >= 0.25 {
        "somewhat_walkable"
    } else {
        "car_dependent"
    }
}

/// Computes walkability scores from neighborhood attributes.
#[derive(Debug, Clone, Default)]
pub struct WalkabilityScorer {
    weights: ScoreWeights,
}

impl WalkabilityScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// The closed-form score. Percentages are expected in `[0, 100]`, NDVI in
    /// `[-1, 1]`; a missing NDVI contributes nothing.
    pub fn score(
        &self,
        residential_pct: f64,
        commercial_pct: f64,
        education_pct: f64,
        ndvi_mean: Option<f64>,
        tree_count: u32,
        transit_count: u32,
    ) -> WalkabilityBreakdown {
        let w = &self.weights;
        let land_use_score = (w.residential * residential_pct
            + w.commercial * commercial_pct
            + w.education * education_pct)
            / 100.0;
        let ndvi_score = ndvi_mean.unwrap_or(0.0) * NDVI_SCALE;
        let tree_score = (tree_count as f64 / TREE_CAP).min(1.0) * w.tree;
        let transit_score = (transit_count as f64 / TRANSIT_CAP).min(1.0) * w.transit;

        let total = land_use_score + w.ndvi * ndvi_score + tree_score + transit_score;
        WalkabilityBreakdown {
            land_use_score,
            ndvi_score,
            tree_score,
            transit_score,
            walkability: total.clamp(0.0, 1.0),
        }
    }

    /// Attaches the `walkability_rule` column to a subgraph.
    ///
    /// The column defaults to 0.0 for every node; the neighborhood row (index
    /// 0) receives the computed score, which is also returned so the caller
    /// can propagate it to the city table. A subgraph without a neighborhood
    /// node keeps the all-default column.
    pub fn apply(&self, subgraph: &mut Subgraph) -> Option<f64> {
        let mut column = vec![0.0; subgraph.node_count()];
        let score = match subgraph.nodes.first().map(|n| &n.attrs) {
            Some(NodeAttrs::Neighborhood {
                residential_pct,
                commercial_pct,
                education_pct,
                ndvi_mean,
                tree_count,
                transit_count,
                ..
            }) => {
                let breakdown = self.score(
                    *residential_pct,
                    *commercial_pct,
                    *education_pct,
                    *ndvi_mean,
                    *tree_count,
                    *transit_count,
                );
                column[0] = breakdown.walkability;
                Some(breakdown.walkability)
            }
            _ => {
                warn!(
                    "subgraph '{}' has no neighborhood node; walkability_rule left at default",
                    subgraph.lie_name
                );
                None
            }
        };
        subgraph.walkability_rule = Some(column);
        score
    }
}
