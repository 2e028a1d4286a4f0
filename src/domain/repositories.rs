//! Repository traits between the prediction pipeline and storage.
//!
//! `HistoryStore` is the read-only boundary over league history. Every
//! query that feeds feature extraction takes a cutoff date and returns
//! only games completed strictly before it, which is what keeps training
//! and serving leakage-free. `ModelRegistry` owns trained-model metadata
//! and the single-active-version invariant.
//!
//! Implementations are expected to honor the documented orderings; the
//! dataset builder and the extractor rely on them instead of re-sorting.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::model_version::ModelVersion;
use crate::domain::types::{Game, Team, TeamGameLog, TeamId};

/// Read access to teams, games, and per-game stat lines.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn find_team(&self, id: TeamId) -> Result<Option<Team>>;

    async fn find_game(&self, id: &str) -> Result<Option<Game>>;

    /// All games of one week, ordered by date then id.
    async fn games_for_week(&self, season: u16, week: u8) -> Result<Vec<Game>>;

    /// Completed games across an inclusive season range, chronological
    /// (date then id ascending).
    async fn completed_games_between(
        &self,
        start_season: u16,
        end_season: u16,
    ) -> Result<Vec<Game>>;

    /// Up to `limit` completed games of `team` dated strictly before
    /// `cutoff`, most recent first, each paired with both stat lines.
    /// Games missing either stat line are not returned.
    async fn team_log_before(
        &self,
        team: TeamId,
        cutoff: NaiveDate,
        limit: usize,
    ) -> Result<Vec<TeamGameLog>>;

    /// Up to `limit` completed meetings between the two teams, either
    /// venue, dated strictly before `cutoff`, most recent first.
    async fn head_to_head_before(
        &self,
        team: TeamId,
        opponent: TeamId,
        cutoff: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Game>>;
}

/// Persistence for trained model versions.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Insert a new version. With `activate` set the insert and the
    /// deactivation of every other version land atomically.
    async fn insert(&self, version: &ModelVersion, activate: bool) -> Result<()>;

    /// Make `version` the single active one. Fails on unknown versions
    /// and changes nothing in that case.
    async fn activate(&self, version: &str) -> Result<()>;

    async fn find_active(&self) -> Result<Option<ModelVersion>>;

    /// Most recently created versions, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ModelVersion>>;
}
