//! End-to-end GNN tests on the synthetic demo city: subgraphs in, trained
//! model and refined predictions out.

use tempfile::TempDir;

use kerb_core::synthetic::demo_city;
use kerb_core::Subgraph;
use kerb_gnn::{Gcn, GnnTrainer, GraphTensors, TrainConfig, NUM_FEATURES};
use kerb_graph::{
    enrich_neighborhoods, validate_city, BuilderConfig, CacheStore, SubgraphBuilder,
    WalkabilityScorer,
};

fn scored_demo_subgraphs(cache_dir: &TempDir) -> Vec<Subgraph> {
    let mut layers = validate_city(demo_city()).unwrap();
    let trees = layers.trees.clone();
    let transit = layers.transit.clone();
    enrich_neighborhoods(&mut layers.neighborhoods, &trees, &transit);

    let cache = CacheStore::new(cache_dir.path());
    let builder = SubgraphBuilder::new(&layers, BuilderConfig::default(), cache);
    let scorer = WalkabilityScorer::default();

    (0..layers.neighborhoods.len())
        .map(|i| {
            let mut subgraph = builder.build(i).unwrap();
            scorer.apply(&mut subgraph).unwrap();
            subgraph
        })
        .collect()
}

#[test]
fn training_on_demo_city_fits_rule_labels() {
    let dir = TempDir::new().unwrap();
    let subgraphs = scored_demo_subgraphs(&dir);
    assert_eq!(subgraphs.len(), 3);

    let graphs: Vec<GraphTensors> = subgraphs
        .iter()
        .map(|s| GraphTensors::from_subgraph(s).unwrap())
        .collect();

    let mut trainer = GnnTrainer::new(TrainConfig::default()).unwrap();
    let stats = trainer.train(&graphs).unwrap();

    assert_eq!(stats.epochs_run, 200);
    assert_eq!(stats.trained_subgraphs, 3);
    assert_eq!(stats.skipped_subgraphs, 0);
    assert!(stats.final_loss.is_finite());
    assert!(
        stats.final_loss < 0.05,
        "expected the model to fit three rule labels, final mse {}",
        stats.final_loss
    );
    assert!(stats.final_loss <= stats.initial_loss);
}

#[test]
fn predictions_land_near_rule_scores() {
    let dir = TempDir::new().unwrap();
    let subgraphs = scored_demo_subgraphs(&dir);
    let graphs: Vec<GraphTensors> = subgraphs
        .iter()
        .map(|s| GraphTensors::from_subgraph(s).unwrap())
        .collect();

    let mut trainer = GnnTrainer::new(TrainConfig::default()).unwrap();
    trainer.train(&graphs).unwrap();

    for graph in &graphs {
        let out = trainer.predict(graph).unwrap();
        assert_eq!(out.len(), graph.num_nodes());
        assert!(out.iter().all(|v| v.is_finite()));
        // The neighborhood row is the supervised one.
        let rule = graph.y[0];
        assert!(
            (out[0] - rule).abs() < 0.15,
            "'{}': refined {} vs rule {rule}",
            graph.lie_name,
            out[0]
        );
    }
}

#[test]
fn checkpoint_round_trips_through_disk() {
    let dir = TempDir::new().unwrap();
    let subgraphs = scored_demo_subgraphs(&dir);
    let graphs: Vec<GraphTensors> = subgraphs
        .iter()
        .map(|s| GraphTensors::from_subgraph(s).unwrap())
        .collect();

    let mut trainer = GnnTrainer::new(TrainConfig::default()).unwrap();
    trainer.train(&graphs).unwrap();
    let before = trainer.predict(&graphs[0]).unwrap();

    let model_path = dir.path().join("gcn.json");
    trainer.model().save(&model_path).unwrap();
    let restored = Gcn::load(&model_path).unwrap();
    assert_eq!(restored.in_dim(), NUM_FEATURES);

    let reloaded = GnnTrainer::with_model(TrainConfig::default(), restored).unwrap();
    let after = reloaded.predict(&graphs[0]).unwrap();
    for (a, b) in before.iter().zip(after.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}
