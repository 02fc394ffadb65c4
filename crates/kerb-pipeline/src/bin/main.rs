use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use kerb_core::synthetic::demo_city;
use kerb_core::types::CityLayers;
use kerb_graph::classify;
use kerb_pipeline::{
    write_scores_json, write_summary_json, Pipeline, PipelineConfig, PipelineOutcome,
};

#[derive(Parser)]
#[command(name = "kerb")]
#[command(about = "Neighborhood walkability scoring over heterogeneous city layers", long_about = None)]
struct Cli {
    /// Input city layers JSON
    #[arg(short, long, required_unless_present = "demo")]
    input: Option<PathBuf>,

    /// Run on the bundled synthetic demo city instead of an input file
    #[arg(long, conflicts_with = "input")]
    demo: bool,

    /// Output path for the scored neighborhood table
    #[arg(short, long, default_value = "walkability.json")]
    output: PathBuf,

    /// Run-summary JSON path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Config TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Selection buffer radius around each neighborhood, map units
    #[arg(long)]
    buffer_m: Option<f64>,

    /// Subgraph cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Clear the subgraph cache before running
    #[arg(long, default_value_t = false)]
    refresh_cache: bool,

    /// Leave subgraph edge tables empty
    #[arg(long, default_value_t = false)]
    no_hub_edges: bool,

    /// GNN training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// GCN hidden layer width
    #[arg(long)]
    hidden_dim: Option<usize>,

    /// SGD learning rate
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Weight-initialization seed
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after rule scoring, skipping GNN refinement
    #[arg(long, default_value_t = false)]
    skip_gnn: bool,

    /// Trained-model checkpoint path
    #[arg(long, value_name = "FILE")]
    model_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = if let Some(cfg) = &cli.config {
        PipelineConfig::from_file(cfg)?
    } else {
        PipelineConfig::default()
    };
    apply_overrides(&mut config, &cli);

    let layers = load_layers(&cli)?;
    let pipeline = Pipeline::new(config)?;
    let outcome = match pipeline.run(layers) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("pipeline run failed: {e}");
            return Err(e.into());
        }
    };

    write_scores_json(&cli.output, &outcome.neighborhoods)?;
    if let Some(path) = &cli.summary {
        write_summary_json(path, &outcome.summary)?;
    }
    if let Some(path) = &cli.model_out {
        match &outcome.model {
            Some(model) => {
                model.save(path)?;
                log::info!("wrote model checkpoint to {}", path.display());
            }
            None => log::warn!("no trained model to save; skipping {}", path.display()),
        }
    }

    print_report(&outcome);
    Ok(())
}

fn load_layers(cli: &Cli) -> anyhow::Result<CityLayers> {
    if cli.demo {
        log::info!("using the bundled synthetic demo city");
        return Ok(demo_city());
    }
    let path = cli
        .input
        .as_ref()
        .context("either --input or --demo is required")?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let layers: CityLayers = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse city layers from {}", path.display()))?;
    Ok(layers)
}

fn apply_overrides(config: &mut PipelineConfig, cli: &Cli) {
    if let Some(buffer_m) = cli.buffer_m {
        config.buffer_m = buffer_m;
    }
    if let Some(ref dir) = cli.cache_dir {
        config.cache_dir = dir.clone();
    }
    if cli.refresh_cache {
        config.refresh_cache = true;
    }
    if cli.no_hub_edges {
        config.hub_edges = false;
    }
    if let Some(epochs) = cli.epochs {
        config.gnn.epochs = epochs;
    }
    if let Some(hidden_dim) = cli.hidden_dim {
        config.gnn.hidden_dim = hidden_dim;
    }
    if let Some(learning_rate) = cli.learning_rate {
        config.gnn.learning_rate = learning_rate;
    }
    if let Some(seed) = cli.seed {
        config.gnn.seed = seed;
    }
    if cli.skip_gnn {
        config.skip_gnn = true;
    }
}

fn print_report(outcome: &PipelineOutcome) {
    println!("Scored {} neighborhoods:", outcome.neighborhoods.len());
    for record in &outcome.neighborhoods {
        let rule = record.walkability_rule.unwrap_or(0.0);
        match record.walkability_gnn {
            Some(gnn) => println!(
                "  {:<24} rule {:.3}  gnn {:.3}  ({})",
                record.lie_name,
                rule,
                gnn,
                classify(rule)
            ),
            None => println!(
                "  {:<24} rule {:.3}  ({})",
                record.lie_name,
                rule,
                classify(rule)
            ),
        }
    }
    if let Some(mean) = outcome.summary.mean_walkability_rule {
        println!("Mean rule walkability: {mean:.3}");
    }
    if let Some(stats) = &outcome.summary.gnn {
        println!(
            "GNN refinement: final mse {:.6} after {} epochs ({} subgraphs)",
            stats.final_loss, stats.epochs_run, stats.trained_subgraphs
        );
    }
}
