//! Model training binary.
//!
//! Builds a labeled dataset from stored game history, fits the ensemble,
//! evaluates it on a chronological holdout, and registers the version.
//!
//!# Usage
//! ```sh
//! cargo run --bin train -- --start-season 2021 --end-season 2023 --activate
//! ```

use anyhow::Result;
use clap::Parser;
use gridcast::application::ml::FitParams;
use gridcast::application::training::Trainer;
use gridcast::config::Config;
use gridcast::infrastructure::persistence::{Database, SqliteHistoryStore, SqliteModelRegistry};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// First season of the training range (inclusive)
    #[arg(long)]
    start_season: u16,

    /// Last season of the training range (inclusive)
    #[arg(long)]
    end_season: u16,

    /// Activate the new version as soon as it is registered
    #[arg(long)]
    activate: bool,

    /// Number of trees per random forest (overrides FOREST_TREES)
    #[arg(long)]
    trees: Option<usize>,

    /// Maximum tree depth (overrides FOREST_MAX_DEPTH)
    #[arg(long)]
    max_depth: Option<u16>,

    /// Minimum samples to split a node (overrides FOREST_MIN_SPLIT)
    #[arg(long)]
    min_split: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let database = Database::new(&config.database_url).await?;
    let store = Arc::new(SqliteHistoryStore::new(database.pool.clone()));
    let registry = Arc::new(SqliteModelRegistry::new(database.pool.clone()));

    let mut params = FitParams::from_config(&config);
    if let Some(trees) = args.trees {
        params.trees = trees;
    }
    if let Some(max_depth) = args.max_depth {
        params.max_depth = max_depth;
    }
    if let Some(min_split) = args.min_split {
        params.min_split = min_split;
    }

    let trainer = Trainer::new(store, registry, &config).with_params(params);
    let report = trainer
        .run(args.start_season, args.end_season, args.activate)
        .await?;

    println!("Trained model version {}", report.version.version);
    println!("  Seasons:         {}", report.version.seasons);
    println!(
        "  Examples:        {} ({} games skipped, {} held out for evaluation)",
        report.examples, report.skipped, report.evaluated
    );
    println!(
        "  Winner accuracy: {:.1}%",
        report.version.metrics.winner_accuracy * 100.0
    );
    println!(
        "  Spread MAE:      {:.2} points",
        report.version.metrics.spread_mae
    );
    println!(
        "  Total MAE:       {:.2} points",
        report.version.metrics.total_mae
    );
    println!("  Active:          {}", report.version.is_active);

    Ok(())
}
