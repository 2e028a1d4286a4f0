use anyhow::{Context, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Database wrapper owning the connection pool.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal); // Better for concurrency

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY,
                abbreviation TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create teams table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                season INTEGER NOT NULL,
                week INTEGER NOT NULL,
                date DATE NOT NULL,
                home_team_id INTEGER NOT NULL REFERENCES teams(id),
                away_team_id INTEGER NOT NULL REFERENCES teams(id),
                home_score INTEGER,
                away_score INTEGER,
                temperature INTEGER,
                wind INTEGER
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create games table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_games_season_week
            ON games (season, week);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create games season index")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_games_date
            ON games (date);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create games date index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS team_game_stats (
                game_id TEXT NOT NULL REFERENCES games(id),
                team_id INTEGER NOT NULL REFERENCES teams(id),
                pass_attempts INTEGER NOT NULL DEFAULT 0,
                pass_completions INTEGER NOT NULL DEFAULT 0,
                pass_yards INTEGER NOT NULL DEFAULT 0,
                pass_touchdowns INTEGER NOT NULL DEFAULT 0,
                rush_attempts INTEGER NOT NULL DEFAULT 0,
                rush_yards INTEGER NOT NULL DEFAULT 0,
                rush_touchdowns INTEGER NOT NULL DEFAULT 0,
                interceptions_thrown INTEGER NOT NULL DEFAULT 0,
                fumbles_lost INTEGER NOT NULL DEFAULT 0,
                def_sacks INTEGER NOT NULL DEFAULT 0,
                def_interceptions INTEGER NOT NULL DEFAULT 0,
                def_fumbles_forced INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (game_id, team_id)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create team_game_stats table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_team_game_stats_team
            ON team_game_stats (team_id);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create stats team index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS model_versions (
                version TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                start_season INTEGER NOT NULL,
                end_season INTEGER NOT NULL,
                training_samples INTEGER NOT NULL,
                winner_accuracy REAL NOT NULL,
                spread_mae REAL NOT NULL,
                total_mae REAL NOT NULL,
                winner_path TEXT NOT NULL,
                spread_path TEXT NOT NULL,
                total_path TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create model_versions table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_model_versions_active
            ON model_versions (is_active);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create model version index")?;

        info!("Database schema initialized.");
        Ok(())
    }
}
