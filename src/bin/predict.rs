//! Prediction binary.
//!
//! Serves predictions for single games or whole week slates from the
//! active model version, printing the JSON the service produces.
//!
//! # Usage
//! ```sh
//! cargo run --bin predict -- game 2023_10_KC_BUF
//! cargo run --bin predict -- week 2023 10
//! cargo run --bin predict -- model-info
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use gridcast::application::prediction::PredictionService;
use gridcast::config::Config;
use gridcast::infrastructure::persistence::{Database, SqliteHistoryStore, SqliteModelRegistry};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict a single game by id
    Game {
        /// Game id, e.g. 2023_10_KC_BUF
        game_id: String,
    },
    /// Predict every game of a week
    Week {
        /// Season year
        season: u16,
        /// Week number
        week: u8,
    },
    /// Show the active model version
    ModelInfo,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let database = Database::new(&config.database_url).await?;
    let store = Arc::new(SqliteHistoryStore::new(database.pool.clone()));
    let registry = Arc::new(SqliteModelRegistry::new(database.pool.clone()));
    let service = PredictionService::new(store, registry, &config);

    match cli.command {
        Commands::Game { game_id } => {
            let outcome = service.predict_game(&game_id).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Week { season, week } => {
            let outcomes = service.predict_week(season, week).await?;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
        Commands::ModelInfo => match service.model_info().await? {
            Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
            None => println!("No active model version. Run the train binary first."),
        },
    }

    Ok(())
}
