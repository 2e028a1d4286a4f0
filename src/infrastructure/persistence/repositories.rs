use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::domain::model_version::{
    ArtifactPaths, EvaluationMetrics, ModelVersion, SeasonRange,
};
use crate::domain::repositories::{HistoryStore, ModelRegistry};
use crate::domain::types::{Game, Team, TeamGameLog, TeamGameStat, TeamId};

pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_team(&self, team: &Team) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO teams (id, abbreviation, name)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                abbreviation = excluded.abbreviation,
                name = excluded.name
            "#,
        )
        .bind(team.id.0)
        .bind(&team.abbreviation)
        .bind(&team.name)
        .execute(&self.pool)
        .await
        .context("Failed to upsert team")?;
        Ok(())
    }

    pub async fn upsert_game(&self, game: &Game) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO games (id, season, week, date, home_team_id, away_team_id,
                               home_score, away_score, temperature, wind)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                season = excluded.season,
                week = excluded.week,
                date = excluded.date,
                home_team_id = excluded.home_team_id,
                away_team_id = excluded.away_team_id,
                home_score = excluded.home_score,
                away_score = excluded.away_score,
                temperature = excluded.temperature,
                wind = excluded.wind
            "#,
        )
        .bind(&game.id)
        .bind(game.season as i64)
        .bind(game.week as i64)
        .bind(game.date)
        .bind(game.home_team.0)
        .bind(game.away_team.0)
        .bind(game.home_score)
        .bind(game.away_score)
        .bind(game.temperature)
        .bind(game.wind)
        .execute(&self.pool)
        .await
        .context("Failed to upsert game")?;
        Ok(())
    }

    pub async fn upsert_stat(&self, stat: &TeamGameStat) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO team_game_stats
                (game_id, team_id, pass_attempts, pass_completions, pass_yards,
                 pass_touchdowns, rush_attempts, rush_yards, rush_touchdowns,
                 interceptions_thrown, fumbles_lost, def_sacks, def_interceptions,
                 def_fumbles_forced)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stat.game_id)
        .bind(stat.team_id.0)
        .bind(stat.pass_attempts as i64)
        .bind(stat.pass_completions as i64)
        .bind(stat.pass_yards)
        .bind(stat.pass_touchdowns as i64)
        .bind(stat.rush_attempts as i64)
        .bind(stat.rush_yards)
        .bind(stat.rush_touchdowns as i64)
        .bind(stat.interceptions_thrown as i64)
        .bind(stat.fumbles_lost as i64)
        .bind(stat.def_sacks as i64)
        .bind(stat.def_interceptions as i64)
        .bind(stat.def_fumbles_forced as i64)
        .execute(&self.pool)
        .await
        .context("Failed to upsert team game stat")?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn find_team(&self, id: TeamId) -> Result<Option<Team>> {
        let row = sqlx::query("SELECT id, abbreviation, name FROM teams WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(team_from_row).transpose()
    }

    async fn find_game(&self, id: &str) -> Result<Option<Game>> {
        let row = sqlx::query("SELECT * FROM games WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(game_from_row).transpose()
    }

    async fn games_for_week(&self, season: u16, week: u8) -> Result<Vec<Game>> {
        let rows = sqlx::query(
            "SELECT * FROM games WHERE season = ? AND week = ? ORDER BY date ASC, id ASC",
        )
        .bind(season as i64)
        .bind(week as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(game_from_row).collect()
    }

    async fn completed_games_between(
        &self,
        start_season: u16,
        end_season: u16,
    ) -> Result<Vec<Game>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM games
            WHERE season >= ? AND season <= ?
              AND home_score IS NOT NULL AND away_score IS NOT NULL
            ORDER BY date ASC, id ASC
            "#,
        )
        .bind(start_season as i64)
        .bind(end_season as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(game_from_row).collect()
    }

    async fn team_log_before(
        &self,
        team: TeamId,
        cutoff: NaiveDate,
        limit: usize,
    ) -> Result<Vec<TeamGameLog>> {
        let rows = sqlx::query(
            r#"
            SELECT
                g.id AS game_id, g.date AS date, g.home_team_id AS home_team_id,
                g.home_score AS home_score, g.away_score AS away_score,
                own.team_id AS own_team_id,
                own.pass_attempts AS own_pass_attempts,
                own.pass_completions AS own_pass_completions,
                own.pass_yards AS own_pass_yards,
                own.pass_touchdowns AS own_pass_touchdowns,
                own.rush_attempts AS own_rush_attempts,
                own.rush_yards AS own_rush_yards,
                own.rush_touchdowns AS own_rush_touchdowns,
                own.interceptions_thrown AS own_interceptions_thrown,
                own.fumbles_lost AS own_fumbles_lost,
                own.def_sacks AS own_def_sacks,
                own.def_interceptions AS own_def_interceptions,
                own.def_fumbles_forced AS own_def_fumbles_forced,
                opp.team_id AS opp_team_id,
                opp.pass_attempts AS opp_pass_attempts,
                opp.pass_completions AS opp_pass_completions,
                opp.pass_yards AS opp_pass_yards,
                opp.pass_touchdowns AS opp_pass_touchdowns,
                opp.rush_attempts AS opp_rush_attempts,
                opp.rush_yards AS opp_rush_yards,
                opp.rush_touchdowns AS opp_rush_touchdowns,
                opp.interceptions_thrown AS opp_interceptions_thrown,
                opp.fumbles_lost AS opp_fumbles_lost,
                opp.def_sacks AS opp_def_sacks,
                opp.def_interceptions AS opp_def_interceptions,
                opp.def_fumbles_forced AS opp_def_fumbles_forced
            FROM games g
            JOIN team_game_stats own ON own.game_id = g.id AND own.team_id = ?
            JOIN team_game_stats opp ON opp.game_id = g.id AND opp.team_id <> ?
            WHERE (g.home_team_id = ? OR g.away_team_id = ?)
              AND g.date < ?
              AND g.home_score IS NOT NULL AND g.away_score IS NOT NULL
            ORDER BY g.date DESC, g.id DESC
            LIMIT ?
            "#,
        )
        .bind(team.0)
        .bind(team.0)
        .bind(team.0)
        .bind(team.0)
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut log = Vec::with_capacity(rows.len());
        for row in &rows {
            let game_id: String = row.try_get("game_id")?;
            let home_team_id: i64 = row.try_get("home_team_id")?;
            let home_score: i32 = row.try_get("home_score")?;
            let away_score: i32 = row.try_get("away_score")?;
            let was_home = home_team_id == team.0;
            log.push(TeamGameLog {
                date: row.try_get("date")?,
                was_home,
                points_for: if was_home { home_score } else { away_score },
                points_against: if was_home { away_score } else { home_score },
                own: stat_from_row(row, "own_", &game_id)?,
                opponent: stat_from_row(row, "opp_", &game_id)?,
                game_id,
            });
        }
        Ok(log)
    }

    async fn head_to_head_before(
        &self,
        team: TeamId,
        opponent: TeamId,
        cutoff: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Game>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM games
            WHERE ((home_team_id = ? AND away_team_id = ?)
                OR (home_team_id = ? AND away_team_id = ?))
              AND date < ?
              AND home_score IS NOT NULL AND away_score IS NOT NULL
            ORDER BY date DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(team.0)
        .bind(opponent.0)
        .bind(opponent.0)
        .bind(team.0)
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(game_from_row).collect()
    }
}

fn team_from_row(row: &SqliteRow) -> Result<Team> {
    Ok(Team {
        id: TeamId(row.try_get("id")?),
        abbreviation: row.try_get("abbreviation")?,
        name: row.try_get("name")?,
    })
}

fn game_from_row(row: &SqliteRow) -> Result<Game> {
    Ok(Game {
        id: row.try_get("id")?,
        season: row.try_get::<i64, _>("season")? as u16,
        week: row.try_get::<i64, _>("week")? as u8,
        date: row.try_get("date")?,
        home_team: TeamId(row.try_get("home_team_id")?),
        away_team: TeamId(row.try_get("away_team_id")?),
        home_score: row.try_get("home_score")?,
        away_score: row.try_get("away_score")?,
        temperature: row.try_get("temperature")?,
        wind: row.try_get("wind")?,
    })
}

fn stat_from_row(row: &SqliteRow, prefix: &str, game_id: &str) -> Result<TeamGameStat> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(TeamGameStat {
        game_id: game_id.to_string(),
        team_id: TeamId(row.try_get(col("team_id").as_str())?),
        pass_attempts: row.try_get::<i64, _>(col("pass_attempts").as_str())? as u32,
        pass_completions: row.try_get::<i64, _>(col("pass_completions").as_str())? as u32,
        pass_yards: row.try_get(col("pass_yards").as_str())?,
        pass_touchdowns: row.try_get::<i64, _>(col("pass_touchdowns").as_str())? as u32,
        rush_attempts: row.try_get::<i64, _>(col("rush_attempts").as_str())? as u32,
        rush_yards: row.try_get(col("rush_yards").as_str())?,
        rush_touchdowns: row.try_get::<i64, _>(col("rush_touchdowns").as_str())? as u32,
        interceptions_thrown: row.try_get::<i64, _>(col("interceptions_thrown").as_str())?
            as u32,
        fumbles_lost: row.try_get::<i64, _>(col("fumbles_lost").as_str())? as u32,
        def_sacks: row.try_get::<i64, _>(col("def_sacks").as_str())? as u32,
        def_interceptions: row.try_get::<i64, _>(col("def_interceptions").as_str())? as u32,
        def_fumbles_forced: row.try_get::<i64, _>(col("def_fumbles_forced").as_str())? as u32,
    })
}

pub struct SqliteModelRegistry {
    pool: SqlitePool,
}

impl SqliteModelRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModelRegistry for SqliteModelRegistry {
    async fn insert(&self, version: &ModelVersion, activate: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if activate {
            sqlx::query("UPDATE model_versions SET is_active = 0 WHERE is_active = 1")
                .execute(&mut *tx)
                .await
                .context("Failed to deactivate previous versions")?;
        }
        sqlx::query(
            r#"
            INSERT INTO model_versions
                (version, created_at, start_season, end_season, training_samples,
                 winner_accuracy, spread_mae, total_mae,
                 winner_path, spread_path, total_path, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&version.version)
        .bind(version.created_at)
        .bind(version.seasons.start_season as i64)
        .bind(version.seasons.end_season as i64)
        .bind(version.training_samples as i64)
        .bind(version.metrics.winner_accuracy)
        .bind(version.metrics.spread_mae)
        .bind(version.metrics.total_mae)
        .bind(&version.artifacts.winner)
        .bind(&version.artifacts.spread)
        .bind(&version.artifacts.total)
        .bind(activate)
        .execute(&mut *tx)
        .await
        .context("Failed to insert model version")?;
        tx.commit().await.context("Failed to commit model version")?;

        info!("Registered model version {}", version.version);
        Ok(())
    }

    async fn activate(&self, version: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE model_versions SET is_active = 1 WHERE version = ?")
            .bind(version)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls back; nothing was deactivated.
            anyhow::bail!("Unknown model version: {version}");
        }
        sqlx::query("UPDATE model_versions SET is_active = 0 WHERE version <> ?")
            .bind(version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await.context("Failed to commit activation")?;

        info!("Activated model version {}", version);
        Ok(())
    }

    async fn find_active(&self) -> Result<Option<ModelVersion>> {
        let row = sqlx::query(
            "SELECT * FROM model_versions WHERE is_active = 1 ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(version_from_row).transpose()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ModelVersion>> {
        let rows = sqlx::query("SELECT * FROM model_versions ORDER BY created_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(version_from_row).collect()
    }
}

fn version_from_row(row: &SqliteRow) -> Result<ModelVersion> {
    Ok(ModelVersion {
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        seasons: SeasonRange::new(
            row.try_get::<i64, _>("start_season")? as u16,
            row.try_get::<i64, _>("end_season")? as u16,
        ),
        training_samples: row.try_get::<i64, _>("training_samples")? as usize,
        metrics: EvaluationMetrics {
            winner_accuracy: row.try_get("winner_accuracy")?,
            spread_mae: row.try_get("spread_mae")?,
            total_mae: row.try_get("total_mae")?,
        },
        artifacts: ArtifactPaths {
            winner: row.try_get("winner_path")?,
            spread: row.try_get("spread_path")?,
            total: row.try_get("total_path")?,
        },
        is_active: row.try_get("is_active")?,
    })
}
