//! Database seeding binary.
//!
//! Fills the game history store either from CSV exports or with the
//! built-in demo league.
//!
//! # Usage
//! ```sh
//! cargo run --bin seed -- --demo --start-season 2021 --end-season 2023
//! cargo run --bin seed -- --teams data/teams.csv --games data/games.csv --stats data/stats.csv
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use gridcast::config::Config;
use gridcast::domain::types::{Game, Team, TeamGameStat, TeamId};
use gridcast::infrastructure::persistence::{Database, SqliteHistoryStore};
use gridcast::infrastructure::sample_data;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generate the built-in demo league instead of reading CSVs
    #[arg(long)]
    demo: bool,

    /// First demo season (inclusive)
    #[arg(long, default_value_t = 2021)]
    start_season: u16,

    /// Last demo season (inclusive)
    #[arg(long, default_value_t = 2023)]
    end_season: u16,

    /// Seed for the demo league generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Path to teams CSV (id, abbreviation, name)
    #[arg(long)]
    teams: Option<PathBuf>,

    /// Path to games CSV
    #[arg(long)]
    games: Option<PathBuf>,

    /// Path to team game stats CSV
    #[arg(long)]
    stats: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TeamRecord {
    id: i64,
    abbreviation: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GameRecord {
    id: String,
    season: u16,
    week: u8,
    date: NaiveDate,
    home_team_id: i64,
    away_team_id: i64,
    home_score: Option<i32>,
    away_score: Option<i32>,
    temperature: Option<i32>,
    wind: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct StatRecord {
    game_id: String,
    team_id: i64,
    pass_attempts: u32,
    pass_completions: u32,
    pass_yards: i32,
    pass_touchdowns: u32,
    rush_attempts: u32,
    rush_yards: i32,
    rush_touchdowns: u32,
    interceptions_thrown: u32,
    fumbles_lost: u32,
    def_sacks: u32,
    def_interceptions: u32,
    def_fumbles_forced: u32,
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
    if !args.demo && args.teams.is_none() && args.games.is_none() && args.stats.is_none() {
        anyhow::bail!("Nothing to seed: pass --demo or at least one CSV path");
    }

    let config = Config::from_env()?;
    let database = Database::new(&config.database_url).await?;
    let store = SqliteHistoryStore::new(database.pool.clone());

    if args.demo {
        seed_demo(&store, &args).await?;
    }
    if let Some(path) = &args.teams {
        seed_teams(&store, path).await?;
    }
    if let Some(path) = &args.games {
        seed_games(&store, path).await?;
    }
    if let Some(path) = &args.stats {
        seed_stats(&store, path).await?;
    }

    Ok(())
}

async fn seed_demo(store: &SqliteHistoryStore, args: &Args) -> Result<()> {
    if args.start_season > args.end_season {
        anyhow::bail!(
            "Invalid demo range: {} > {}",
            args.start_season,
            args.end_season
        );
    }
    let league = sample_data::generate(args.start_season, args.end_season, args.seed);
    for team in &league.teams {
        store.upsert_team(team).await?;
    }
    for game in &league.games {
        store.upsert_game(game).await?;
    }
    for stat in &league.stats {
        store.upsert_stat(stat).await?;
    }
    println!(
        "Seeded demo league: {} teams, {} games, {} stat lines (seasons {}-{})",
        league.teams.len(),
        league.games.len(),
        league.stats.len(),
        args.start_season,
        args.end_season
    );
    Ok(())
}

fn csv_reader(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(csv::Reader::from_reader(BufReader::new(file)))
}

async fn seed_teams(store: &SqliteHistoryStore, path: &Path) -> Result<()> {
    let mut reader = csv_reader(path)?;
    let mut count = 0usize;
    for result in reader.deserialize() {
        let record: TeamRecord = result.context("Failed to parse team record")?;
        store
            .upsert_team(&Team {
                id: TeamId(record.id),
                abbreviation: record.abbreviation,
                name: record.name,
            })
            .await?;
        count += 1;
    }
    println!("Seeded {} teams from {}", count, path.display());
    Ok(())
}

async fn seed_games(store: &SqliteHistoryStore, path: &Path) -> Result<()> {
    let mut reader = csv_reader(path)?;
    let mut count = 0usize;
    for result in reader.deserialize() {
        let record: GameRecord = result.context("Failed to parse game record")?;
        store
            .upsert_game(&Game {
                id: record.id,
                season: record.season,
                week: record.week,
                date: record.date,
                home_team: TeamId(record.home_team_id),
                away_team: TeamId(record.away_team_id),
                home_score: record.home_score,
                away_score: record.away_score,
                temperature: record.temperature,
                wind: record.wind,
            })
            .await?;
        count += 1;
    }
    println!("Seeded {} games from {}", count, path.display());
    Ok(())
}

async fn seed_stats(store: &SqliteHistoryStore, path: &Path) -> Result<()> {
    let mut reader = csv_reader(path)?;
    let mut count = 0usize;
    for result in reader.deserialize() {
        let record: StatRecord = result.context("Failed to parse stat record")?;
        store
            .upsert_stat(&TeamGameStat {
                game_id: record.game_id,
                team_id: TeamId(record.team_id),
                pass_attempts: record.pass_attempts,
                pass_completions: record.pass_completions,
                pass_yards: record.pass_yards,
                pass_touchdowns: record.pass_touchdowns,
                rush_attempts: record.rush_attempts,
                rush_yards: record.rush_yards,
                rush_touchdowns: record.rush_touchdowns,
                interceptions_thrown: record.interceptions_thrown,
                fumbles_lost: record.fumbles_lost,
                def_sacks: record.def_sacks,
                def_interceptions: record.def_interceptions,
                def_fumbles_forced: record.def_fumbles_forced,
            })
            .await?;
        count += 1;
    }
    println!("Seeded {} stat lines from {}", count, path.display());
    Ok(())
}
