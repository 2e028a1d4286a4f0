//! In-memory implementations of the domain store traits.
//!
//! Thread-safe via `tokio::sync::RwLock`. Data lives only as long as the
//! process, which is enough for tests and demo seeding.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::model_version::ModelVersion;
use crate::domain::repositories::{HistoryStore, ModelRegistry};
use crate::domain::types::{Game, Team, TeamGameLog, TeamGameStat, TeamId};

pub struct InMemoryHistoryStore {
    teams: RwLock<HashMap<i64, Team>>,
    games: RwLock<HashMap<String, Game>>,
    stats: RwLock<HashMap<(String, i64), TeamGameStat>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            teams: RwLock::new(HashMap::new()),
            games: RwLock::new(HashMap::new()),
            stats: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert_team(&self, team: Team) {
        self.teams.write().await.insert(team.id.0, team);
    }

    pub async fn insert_game(&self, game: Game) {
        self.games.write().await.insert(game.id.clone(), game);
    }

    pub async fn insert_stat(&self, stat: TeamGameStat) {
        self.stats
            .write()
            .await
            .insert((stat.game_id.clone(), stat.team_id.0), stat);
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_ascending(games: &mut [Game]) {
    games.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
}

fn sort_descending(games: &mut [Game]) {
    games.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn find_team(&self, id: TeamId) -> Result<Option<Team>> {
        Ok(self.teams.read().await.get(&id.0).cloned())
    }

    async fn find_game(&self, id: &str) -> Result<Option<Game>> {
        Ok(self.games.read().await.get(id).cloned())
    }

    async fn games_for_week(&self, season: u16, week: u8) -> Result<Vec<Game>> {
        let games = self.games.read().await;
        let mut matched: Vec<Game> = games
            .values()
            .filter(|g| g.season == season && g.week == week)
            .cloned()
            .collect();
        sort_ascending(&mut matched);
        Ok(matched)
    }

    async fn completed_games_between(
        &self,
        start_season: u16,
        end_season: u16,
    ) -> Result<Vec<Game>> {
        let games = self.games.read().await;
        let mut matched: Vec<Game> = games
            .values()
            .filter(|g| g.season >= start_season && g.season <= end_season && g.is_completed())
            .cloned()
            .collect();
        sort_ascending(&mut matched);
        Ok(matched)
    }

    async fn team_log_before(
        &self,
        team: TeamId,
        cutoff: NaiveDate,
        limit: usize,
    ) -> Result<Vec<TeamGameLog>> {
        let games = self.games.read().await;
        let stats = self.stats.read().await;

        let mut played: Vec<Game> = games
            .values()
            .filter(|g| g.involves(team) && g.date < cutoff && g.is_completed())
            .cloned()
            .collect();
        sort_descending(&mut played);

        let mut log = Vec::new();
        for game in played {
            if log.len() == limit {
                break;
            }
            let opponent = if game.home_team == team {
                game.away_team
            } else {
                game.home_team
            };
            // A game without both stat lines cannot contribute to the log.
            let (Some(own), Some(opp)) = (
                stats.get(&(game.id.clone(), team.0)),
                stats.get(&(game.id.clone(), opponent.0)),
            ) else {
                continue;
            };
            let (Some(points_for), Some(points_against)) =
                (game.score_for(team), game.score_against(team))
            else {
                continue;
            };
            log.push(TeamGameLog {
                game_id: game.id.clone(),
                date: game.date,
                was_home: game.home_team == team,
                points_for,
                points_against,
                own: own.clone(),
                opponent: opp.clone(),
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
        let games = self.games.read().await;
        let mut matched: Vec<Game> = games
            .values()
            .filter(|g| {
                g.involves(team) && g.involves(opponent) && g.date < cutoff && g.is_completed()
            })
            .cloned()
            .collect();
        sort_descending(&mut matched);
        matched.truncate(limit);
        Ok(matched)
    }
}

pub struct InMemoryModelRegistry {
    versions: RwLock<Vec<ModelVersion>>,
}

impl InMemoryModelRegistry {
    pub fn new() -> Self {
        Self {
            versions: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelRegistry for InMemoryModelRegistry {
    async fn insert(&self, version: &ModelVersion, activate: bool) -> Result<()> {
        let mut versions = self.versions.write().await;
        if versions.iter().any(|v| v.version == version.version) {
            anyhow::bail!("Model version already registered: {}", version.version);
        }
        if activate {
            for existing in versions.iter_mut() {
                existing.is_active = false;
            }
        }
        let mut stored = version.clone();
        stored.is_active = activate;
        versions.push(stored);
        Ok(())
    }

    async fn activate(&self, version: &str) -> Result<()> {
        let mut versions = self.versions.write().await;
        if !versions.iter().any(|v| v.version == version) {
            anyhow::bail!("Unknown model version: {version}");
        }
        for existing in versions.iter_mut() {
            existing.is_active = existing.version == version;
        }
        Ok(())
    }

    async fn find_active(&self) -> Result<Option<ModelVersion>> {
        let versions = self.versions.read().await;
        Ok(versions.iter().find(|v| v.is_active).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ModelVersion>> {
        let versions = self.versions.read().await;
        let mut ordered: Vec<ModelVersion> = versions.clone();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        ordered.truncate(limit);
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model_version::{ArtifactPaths, EvaluationMetrics, SeasonRange};
    use chrono::{TimeZone, Utc};

    fn team(id: i64, abbr: &str) -> Team {
        Team {
            id: TeamId(id),
            abbreviation: abbr.to_string(),
            name: format!("Team {abbr}"),
        }
    }

    fn completed_game(id: &str, date: NaiveDate, home: i64, away: i64) -> Game {
        Game {
            id: id.to_string(),
            season: 2023,
            week: 1,
            date,
            home_team: TeamId(home),
            away_team: TeamId(away),
            home_score: Some(24),
            away_score: Some(17),
            temperature: Some(60),
            wind: Some(5),
        }
    }

    fn stat(game_id: &str, team_id: i64) -> TeamGameStat {
        TeamGameStat {
            game_id: game_id.to_string(),
            team_id: TeamId(team_id),
            pass_attempts: 30,
            pass_completions: 20,
            pass_yards: 250,
            pass_touchdowns: 2,
            rush_attempts: 25,
            rush_yards: 110,
            rush_touchdowns: 1,
            interceptions_thrown: 1,
            fumbles_lost: 0,
            def_sacks: 3,
            def_interceptions: 1,
            def_fumbles_forced: 0,
        }
    }

    fn version(id: &str, at_secs: i64) -> ModelVersion {
        ModelVersion {
            version: id.to_string(),
            created_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
            seasons: SeasonRange::new(2022, 2023),
            training_samples: 100,
            metrics: EvaluationMetrics {
                winner_accuracy: 0.6,
                spread_mae: 9.0,
                total_mae: 10.0,
            },
            artifacts: ArtifactPaths {
                winner: format!("models/winner_{id}.json"),
                spread: format!("models/spread_{id}.json"),
                total: format!("models/total_{id}.json"),
            },
            is_active: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_team_log_is_most_recent_first_and_respects_cutoff() {
        let store = InMemoryHistoryStore::new();
        store.insert_team(team(1, "BUF")).await;
        store.insert_team(team(2, "KC")).await;

        for (id, day) in [("g1", 3), ("g2", 10), ("g3", 17)] {
            let game = completed_game(id, date(2023, 9, day), 1, 2);
            store.insert_game(game).await;
            store.insert_stat(stat(id, 1)).await;
            store.insert_stat(stat(id, 2)).await;
        }

        let log = store
            .team_log_before(TeamId(1), date(2023, 9, 17), 10)
            .await
            .unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].game_id, "g2");
        assert_eq!(log[1].game_id, "g1");
    }

    #[tokio::test]
    async fn test_team_log_skips_games_missing_stat_lines() {
        let store = InMemoryHistoryStore::new();
        store.insert_game(completed_game("g1", date(2023, 9, 3), 1, 2)).await;
        store.insert_stat(stat("g1", 1)).await;
        // No stat line for team 2.

        let log = store
            .team_log_before(TeamId(1), date(2023, 10, 1), 10)
            .await
            .unwrap();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_head_to_head_matches_either_venue() {
        let store = InMemoryHistoryStore::new();
        store.insert_game(completed_game("g1", date(2023, 9, 3), 1, 2)).await;
        store.insert_game(completed_game("g2", date(2023, 9, 10), 2, 1)).await;
        store.insert_game(completed_game("g3", date(2023, 9, 12), 1, 3)).await;

        let meetings = store
            .head_to_head_before(TeamId(1), TeamId(2), date(2023, 10, 1), 10)
            .await
            .unwrap();
        assert_eq!(meetings.len(), 2);
        assert_eq!(meetings[0].id, "g2");
    }

    #[tokio::test]
    async fn test_registry_insert_with_activate_swaps_the_active_flag() {
        let registry = InMemoryModelRegistry::new();
        registry.insert(&version("v1", 100), true).await.unwrap();
        registry.insert(&version("v2", 200), true).await.unwrap();

        let active = registry.find_active().await.unwrap().unwrap();
        assert_eq!(active.version, "v2");

        registry.activate("v1").await.unwrap();
        let active = registry.find_active().await.unwrap().unwrap();
        assert_eq!(active.version, "v1");
    }

    #[tokio::test]
    async fn test_registry_rejects_duplicate_and_unknown_versions() {
        let registry = InMemoryModelRegistry::new();
        registry.insert(&version("v1", 100), false).await.unwrap();

        assert!(registry.insert(&version("v1", 150), false).await.is_err());
        assert!(registry.activate("missing").await.is_err());

        // Neither failure changed what is active.
        assert!(registry.find_active().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_lists_newest_versions_first() {
        let registry = InMemoryModelRegistry::new();
        for (id, at) in [("v1", 100), ("v2", 300), ("v3", 200)] {
            registry.insert(&version(id, at), false).await.unwrap();
        }

        let recent = registry.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].version, "v2");
        assert_eq!(recent[1].version, "v3");
    }
}
