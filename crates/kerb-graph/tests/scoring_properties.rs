//! Property-based tests for the rule-based walkability score:
//! - the clamped total stays inside [0, 1] for the whole input domain
//! - tree density is monotone below its cap and flat above it
//! - the land-use term scales linearly with its percentages

use proptest::prelude::*;

use kerb_graph::scoring::WalkabilityScorer;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_walkability_bounded(
        residential in 0.0..=100.0f64,
        commercial in 0.0..=100.0f64,
        education in 0.0..=100.0f64,
        ndvi in -1.0..=1.0f64,
        trees in 0u32..1000,
        stops in 0u32..200,
    ) {
        let b = WalkabilityScorer::default()
            .score(residential, commercial, education, Some(ndvi), trees, stops);
        prop_assert!(b.walkability >= 0.0);
        prop_assert!(b.walkability <= 1.0);
    }

    #[test]
    fn prop_tree_count_monotone_below_cap(
        residential in 0.0..=100.0f64,
        ndvi in -1.0..=1.0f64,
        trees in 0u32..100,
        stops in 0u32..200,
    ) {
        let scorer = WalkabilityScorer::default();
        let lower = scorer
            .score(residential, 0.0, 0.0, Some(ndvi), trees, stops)
            .walkability;
        let higher = scorer
            .score(residential, 0.0, 0.0, Some(ndvi), trees + 1, stops)
            .walkability;
        prop_assert!(higher >= lower);
    }

    #[test]
    fn prop_tree_count_flat_beyond_cap(
        trees in 100u32..50_000,
        stops in 0u32..200,
    ) {
        let scorer = WalkabilityScorer::default();
        let at_cap = scorer.score(20.0, 10.0, 5.0, None, 100, stops).walkability;
        let beyond = scorer.score(20.0, 10.0, 5.0, None, trees, stops).walkability;
        prop_assert_eq!(at_cap, beyond);
    }

    #[test]
    fn prop_transit_count_flat_beyond_cap(
        stops in 20u32..10_000,
    ) {
        let scorer = WalkabilityScorer::default();
        let at_cap = scorer.score(20.0, 10.0, 5.0, None, 10, 20).walkability;
        let beyond = scorer.score(20.0, 10.0, 5.0, None, 10, stops).walkability;
        prop_assert_eq!(at_cap, beyond);
    }

    #[test]
    fn prop_land_use_term_linear(
        residential in 0.0..=50.0f64,
    ) {
        let scorer = WalkabilityScorer::default();
        let single = scorer.score(residential, 0.0, 0.0, None, 0, 0).land_use_score;
        let doubled = scorer.score(2.0 * residential, 0.0, 0.0, None, 0, 0).land_use_score;
        prop_assert!((doubled - 2.0 * single).abs() < 1e-9);
    }
}
