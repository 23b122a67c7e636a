//! greygoose CLI: tune, train and evaluate the CO2 emissions regressor.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gg_engine::{GreyGooseEngine, PipelineConfig};
use gg_optimizer::CentroidMode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "greygoose")]
#[command(about = "Greylag Goose hyperparameter search for an MLP CO2 regressor")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PathArgs {
    /// JSON pipeline config; unset fields take defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dataset CSV (overrides GREYGOOSE_DATA_PATH)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Directory for best_params.json and metrics.json (overrides GREYGOOSE_RESULTS_DIR)
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,
}

#[derive(Args, Default)]
struct SearchArgs {
    /// Number of geese
    #[arg(short, long)]
    population: Option<usize>,

    /// Number of generations
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Step scale of the movement rule
    #[arg(long)]
    scale: Option<f64>,

    /// Recompute the centroid before every goose instead of once per generation
    #[arg(long)]
    live_centroid: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search hyperparameters and write best_params.json
    Optimize(SearchArgs),

    /// Train the final model from best_params.json
    Train,

    /// Train the final model and write metrics.json
    Evaluate,

    /// Optimize, train and evaluate in one go
    Run(SearchArgs),
}

fn build_config(paths: &PathArgs, search: &SearchArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &paths.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    }
    .with_env_overrides();

    if let Some(data) = &paths.data {
        config.data_path = data.clone();
    }
    if let Some(dir) = &paths.results_dir {
        config.results_dir = dir.clone();
    }

    let optimizer = &mut config.optimizer;
    if let Some(n) = search.population {
        optimizer.population_size = n;
    }
    if let Some(n) = search.iterations {
        optimizer.max_iterations = n;
    }
    if let Some(scale) = search.scale {
        optimizer.scale = scale;
    }
    if search.live_centroid {
        optimizer.centroid_mode = CentroidMode::Live;
    }
    if let Some(seed) = search.seed {
        optimizer.seed = Some(seed);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let no_search = SearchArgs::default();
    let search = match &cli.command {
        Commands::Optimize(args) | Commands::Run(args) => args,
        Commands::Train | Commands::Evaluate => &no_search,
    };

    let config = build_config(&cli.paths, search)?;
    let mut engine = GreyGooseEngine::new(config).context("invalid configuration")?;

    match cli.command {
        Commands::Optimize(_) => {
            let outcome = engine.optimize().await?;
            println!("{}", serde_json::to_string_pretty(&outcome.best_params)?);
        }
        Commands::Train => {
            let model = engine.train().await?;
            info!(
                source = ?model.source,
                "Model trained and ready for evaluation"
            );
        }
        Commands::Evaluate => {
            let metrics = engine.evaluate().await?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        Commands::Run(_) => {
            let report = engine.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
