//! Deterministic synthetic cities for demos, tests, and benches.
//!
//! [`demo_city`] is a small hand-placed layout whose spatial memberships are
//! computable by eye; [`grid_city`] produces arbitrarily large seeded cities
//! for benchmarks and the demo mode.

use geo_types::{LineString, Point, Polygon};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{
    BuildingRecord, CityLayers, NeighborhoodRecord, RoadRecord, TransitRecord, TreeRecord,
    ZoningRecord,
};

/// Axis-aligned square polygon spanning `[x0, x0+side] x [y0, y0+side]`.
pub fn square(x0: f64, y0: f64, side: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (x0, y0),
            (x0 + side, y0),
            (x0 + side, y0 + side),
            (x0, y0 + side),
            (x0, y0),
        ]),
        vec![],
    )
}

/// Square building footprint centered on `(cx, cy)` with the given half-width.
pub fn footprint(cx: f64, cy: f64, half: f64) -> Polygon<f64> {
    square(cx - half, cy - half, 2.0 * half)
}

/// Three 1000 m neighborhoods spaced 1000 m apart along the x axis, with ten
/// buildings, five roads, eight trees, and four transit stops placed so that
/// every containment and buffer decision (at the default 200 m buffer) is
/// unambiguous:
///
/// - one building sits between neighborhoods beyond every buffer,
/// - one building's nearest vertex lies exactly on a buffer boundary,
/// - one road crosses a buffer boundary without being contained,
/// - one tree and one transit stop fall inside a buffer but outside the
///   polygon itself, so enrichment counts and subgraph membership differ.
pub fn demo_city() -> CityLayers {
    let mut city = CityLayers::new();

    city.neighborhoods = vec![
        NeighborhoodRecord::new("Northgate", square(0.0, 0.0, 1000.0))
            .with_population(5400.0)
            .with_land_use(62.0, 18.0, 8.0)
            .with_ndvi(0.31),
        NeighborhoodRecord::new("Midtown", square(2000.0, 0.0, 1000.0))
            .with_population(8100.0)
            .with_land_use(35.0, 44.0, 10.0)
            .with_ndvi(0.12),
        NeighborhoodRecord::new("Harborview", square(4000.0, 0.0, 1000.0))
            .with_population(2300.0)
            .with_land_use(78.0, 6.0, 4.0),
    ];

    let building_types = [
        "residential",
        "commercial",
        "residential",
        "mixed",
        "residential",
        "commercial",
        "residential",
        "commercial",
        "residential",
        "commercial",
    ];
    let building_centers = [
        (100.0, 100.0),
        (500.0, 500.0),
        (950.0, 950.0),
        (1150.0, 500.0),
        (1500.0, 500.0),
        (2500.0, 500.0),
        (2100.0, 100.0),
        (2950.0, 800.0),
        (4500.0, 500.0),
        (5210.0, 500.0),
    ];
    city.buildings = building_centers
        .iter()
        .zip(building_types)
        .map(|(&(cx, cy), kind)| BuildingRecord::new(footprint(cx, cy, 10.0), kind, 400.0))
        .collect();

    city.roads = vec![
        RoadRecord::new(LineString::from(vec![(100.0, 100.0), (900.0, 900.0)]), "residential"),
        RoadRecord::new(LineString::from(vec![(1100.0, 200.0), (1400.0, 200.0)]), "primary"),
        RoadRecord::new(LineString::from(vec![(2200.0, 300.0), (2800.0, 700.0)]), "secondary"),
        RoadRecord::new(LineString::from(vec![(4100.0, 100.0), (4900.0, 100.0)]), "residential"),
        RoadRecord::new(LineString::from(vec![(1500.0, 2000.0), (1600.0, 2000.0)]), "service"),
    ];

    city.trees = [
        (200.0, 200.0),
        (800.0, 300.0),
        (1100.0, 500.0),
        (2500.0, 100.0),
        (2750.0, 900.0),
        (4200.0, 800.0),
        (4800.0, 200.0),
        (3500.0, 500.0),
    ]
    .iter()
    .map(|&(x, y)| TreeRecord::new(Point::new(x, y)))
    .collect();

    city.transit = vec![
        TransitRecord::new(Point::new(500.0, 300.0), "bus_stop"),
        TransitRecord::new(Point::new(2600.0, 600.0), "stop_position"),
        TransitRecord::new(Point::new(4600.0, 700.0), "bus_stop"),
        TransitRecord::new(Point::new(4950.0, 1150.0), "stop_position"),
    ];

    city.zoning = vec![
        ZoningRecord::new(square(0.0, 0.0, 1000.0), "residential"),
        ZoningRecord::new(square(2000.0, 0.0, 1000.0), "mixed"),
        ZoningRecord::new(square(4000.0, 0.0, 1000.0), "residential"),
    ];

    debug!(
        "demo city assembled: {} rows across {} neighborhoods",
        city.total_rows(),
        city.neighborhoods.len()
    );
    city
}

/// Seeded `cols x rows` grid of 1000 m neighborhoods on a 1200 m pitch, each
/// cell populated with a handful of buildings, roads, trees, and stops.
pub fn grid_city(cols: usize, rows: usize, seed: u64) -> CityLayers {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut city = CityLayers::new();
    let pitch = 1200.0;
    let side = 1000.0;

    for row in 0..rows {
        for col in 0..cols {
            let x0 = col as f64 * pitch;
            let y0 = row as f64 * pitch;
            let cell = square(x0, y0, side);

            let residential = rng.gen_range(20.0..75.0);
            let commercial = rng.gen_range(0.0..(95.0 - residential));
            let education = rng.gen_range(0.0..(100.0 - residential - commercial));
            let mut record = NeighborhoodRecord::new(format!("cell_{col}_{row}"), cell.clone())
                .with_population(rng.gen_range(500.0..12_000.0))
                .with_land_use(residential, commercial, education);
            if rng.gen_bool(0.9) {
                record = record.with_ndvi(rng.gen_range(-0.1..0.6));
            }
            city.neighborhoods.push(record);
            city.zoning.push(ZoningRecord::new(
                cell,
                if residential > 50.0 { "residential" } else { "mixed" },
            ));

            for _ in 0..rng.gen_range(3..8) {
                let half = rng.gen_range(5.0..15.0);
                let cx = rng.gen_range(x0 + half..x0 + side - half);
                let cy = rng.gen_range(y0 + half..y0 + side - half);
                let kind = ["residential", "commercial", "mixed"][rng.gen_range(0..3)];
                city.buildings
                    .push(BuildingRecord::new(footprint(cx, cy, half), kind, (2.0 * half).powi(2)));
            }

            for _ in 0..2 {
                let ax = rng.gen_range(x0..x0 + side);
                let ay = rng.gen_range(y0..y0 + side);
                let bx = rng.gen_range(x0..x0 + side);
                let by = rng.gen_range(y0..y0 + side);
                let class = ["residential", "secondary", "primary"][rng.gen_range(0..3)];
                city.roads
                    .push(RoadRecord::new(LineString::from(vec![(ax, ay), (bx, by)]), class));
            }

            for _ in 0..rng.gen_range(0..12) {
                city.trees.push(TreeRecord::new(Point::new(
                    rng.gen_range(x0..x0 + side),
                    rng.gen_range(y0..y0 + side),
                )));
            }

            for _ in 0..rng.gen_range(0..3) {
                let class = if rng.gen_bool(0.5) { "bus_stop" } else { "stop_position" };
                city.transit.push(TransitRecord::new(
                    Point::new(rng.gen_range(x0..x0 + side), rng.gen_range(y0..y0 + side)),
                    class,
                ));
            }
        }
    }

    debug!(
        "grid city {cols}x{rows} (seed {seed}): {} rows across {} neighborhoods",
        city.total_rows(),
        city.neighborhoods.len()
    );
    city
}
