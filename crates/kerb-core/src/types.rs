//! Layer record types for the kerb pipeline.
//!
//! Every geospatial input layer is an ordered `Vec` of one of these records.
//! Geometries are `geo-types` values in a single planar projected CRS with
//! meter units; loading and reprojection happen upstream of this crate.

use geo_types::{LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

/// One neighborhood polygon with its aggregate attributes.
///
/// `lie_name` is the business identity: unique across the table, and the sole
/// key addressing the neighborhood's subgraph and cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodRecord {
    /// Unique neighborhood name
    pub lie_name: String,
    /// Boundary polygon (planar CRS, meters)
    pub geometry: Polygon<f64>,
    /// Resident population
    #[serde(default)]
    pub population: f64,
    /// Residential land-use share, percent in [0, 100]
    #[serde(default)]
    pub residential_pct: f64,
    /// Commercial land-use share, percent in [0, 100]
    #[serde(default)]
    pub commercial_pct: f64,
    /// Education land-use share, percent in [0, 100]
    #[serde(default)]
    pub education_pct: f64,
    /// Mean NDVI over the polygon, in [-1, 1]; `None` when unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndvi_mean: Option<f64>,
    /// Trees inside the polygon; written by the attribute enricher
    #[serde(default)]
    pub tree_count: u32,
    /// Transit stops inside the polygon; written by the attribute enricher
    #[serde(default)]
    pub transit_count: u32,
    /// Rule-based walkability score; written by the scorer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walkability_rule: Option<f64>,
    /// GNN-refined walkability score; written after inference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walkability_gnn: Option<f64>,
}

impl NeighborhoodRecord {
    /// Creates a neighborhood with zeroed attributes.
    pub fn new(lie_name: impl Into<String>, geometry: Polygon<f64>) -> Self {
        Self {
            lie_name: lie_name.into(),
            geometry,
            population: 0.0,
            residential_pct: 0.0,
            commercial_pct: 0.0,
            education_pct: 0.0,
            ndvi_mean: None,
            tree_count: 0,
            transit_count: 0,
            walkability_rule: None,
            walkability_gnn: None,
        }
    }

    /// Sets the population.
    pub fn with_population(mut self, population: f64) -> Self {
        self.population = population;
        self
    }

    /// Sets the three land-use percentages.
    pub fn with_land_use(mut self, residential: f64, commercial: f64, education: f64) -> Self {
        self.residential_pct = residential;
        self.commercial_pct = commercial;
        self.education_pct = education;
        self
    }

    /// Sets the mean NDVI.
    pub fn with_ndvi(mut self, ndvi_mean: f64) -> Self {
        self.ndvi_mean = Some(ndvi_mean);
        self
    }
}

/// One building footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// Footprint polygon
    pub geometry: Polygon<f64>,
    /// Building classification (e.g. "residential", "commercial")
    pub building_type: String,
    /// Footprint area in square meters
    #[serde(default)]
    pub area_m2: f64,
}

impl BuildingRecord {
    pub fn new(geometry: Polygon<f64>, building_type: impl Into<String>, area_m2: f64) -> Self {
        Self {
            geometry,
            building_type: building_type.into(),
            area_m2,
        }
    }
}

/// One road centerline.
///
/// `length_m` is a derived column: the validator recomputes it from the planar
/// geometry for every surviving row, so upstream values are never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadRecord {
    /// Centerline geometry
    pub geometry: LineString<f64>,
    /// Road classification (e.g. "residential", "primary")
    pub class: String,
    /// Planar length in meters; recomputed at validation
    #[serde(default)]
    pub length_m: f64,
}

impl RoadRecord {
    pub fn new(geometry: LineString<f64>, class: impl Into<String>) -> Self {
        Self {
            geometry,
            class: class.into(),
            length_m: 0.0,
        }
    }
}

/// One tree point. Rows whose `subtype` is not `"tree"` are dropped at
/// validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeRecord {
    pub geometry: Point<f64>,
    #[serde(default = "default_tree_subtype")]
    pub subtype: String,
}

fn default_tree_subtype() -> String {
    "tree".to_string()
}

impl TreeRecord {
    pub fn new(geometry: Point<f64>) -> Self {
        Self {
            geometry,
            subtype: default_tree_subtype(),
        }
    }

    /// Overrides the subtype (used to exercise the validation filter).
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = subtype.into();
        self
    }
}

/// Transit classes accepted by the validator.
pub const TRANSIT_CLASSES: [&str; 2] = ["stop_position", "bus_stop"];

/// One transit stop point. Rows whose `class` is not in [`TRANSIT_CLASSES`]
/// are dropped at validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitRecord {
    pub geometry: Point<f64>,
    pub class: String,
}

impl TransitRecord {
    pub fn new(geometry: Point<f64>, class: impl Into<String>) -> Self {
        Self {
            geometry,
            class: class.into(),
        }
    }

    /// True when the class is one of the accepted transit classes.
    pub fn is_accepted_class(&self) -> bool {
        TRANSIT_CLASSES.contains(&self.class.as_str())
    }
}

/// One zoning/masterplan polygon. Validated and carried through for the
/// external visualization step; never consulted by scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoningRecord {
    pub geometry: Polygon<f64>,
    pub zone: String,
}

impl ZoningRecord {
    pub fn new(geometry: Polygon<f64>, zone: impl Into<String>) -> Self {
        Self {
            geometry,
            zone: zone.into(),
        }
    }
}

/// All input layers for one city, the unit each pipeline stage consumes by
/// value and returns transformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CityLayers {
    #[serde(default)]
    pub neighborhoods: Vec<NeighborhoodRecord>,
    #[serde(default)]
    pub buildings: Vec<BuildingRecord>,
    #[serde(default)]
    pub roads: Vec<RoadRecord>,
    #[serde(default)]
    pub trees: Vec<TreeRecord>,
    #[serde(default)]
    pub transit: Vec<TransitRecord>,
    #[serde(default)]
    pub zoning: Vec<ZoningRecord>,
}

impl CityLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows across all layers.
    pub fn total_rows(&self) -> usize {
        self.neighborhoods.len()
            + self.buildings.len()
            + self.roads.len()
            + self.trees.len()
            + self.transit.len()
            + self.zoning.len()
    }
}
