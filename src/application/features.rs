//! Leakage-free feature extraction.
//!
//! Every aggregate is computed from games dated strictly before the cutoff,
//! which the store queries enforce. Training and serving both go through
//! [`FeatureExtractor::extract`], so the two can never disagree on the
//! schema.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::errors::PredictionError;
use crate::domain::features::{GameFeatureVector, MIN_PRIOR_GAMES, TEAM_FEATURE_COUNT};
use crate::domain::repositories::HistoryStore;
use crate::domain::types::{Game, Team, TeamGameLog, TeamId, Winner};

/// Head-to-head meetings considered for the trend block.
pub const HEAD_TO_HEAD_WINDOW: usize = 5;

/// Rest days are capped so season openers and long layoffs share a scale.
pub const REST_DAYS_CAP: i64 = 30;

/// Stand-ins for venues without weather readings.
pub const DEFAULT_TEMPERATURE: f64 = 68.0;
pub const DEFAULT_WIND: f64 = 0.0;

pub struct FeatureExtractor {
    store: Arc<dyn HistoryStore>,
    lookback: usize,
}

impl FeatureExtractor {
    /// `lookback` is the rolling window length, in completed games per team.
    pub fn new(store: Arc<dyn HistoryStore>, lookback: usize) -> Self {
        Self { store, lookback }
    }

    /// Builds the model input for `game` from history strictly before
    /// `cutoff`. Fails with `InsufficientHistory` when either side has
    /// fewer than [`MIN_PRIOR_GAMES`] completed games.
    pub async fn extract(
        &self,
        game: &Game,
        cutoff: NaiveDate,
    ) -> Result<GameFeatureVector, PredictionError> {
        let home = self.team(game.home_team).await?;
        let away = self.team(game.away_team).await?;

        let home_log = self
            .store
            .team_log_before(game.home_team, cutoff, self.lookback)
            .await?;
        if home_log.len() < MIN_PRIOR_GAMES {
            return Err(PredictionError::insufficient_history(
                home.abbreviation,
                home_log.len(),
            ));
        }
        let away_log = self
            .store
            .team_log_before(game.away_team, cutoff, self.lookback)
            .await?;
        if away_log.len() < MIN_PRIOR_GAMES {
            return Err(PredictionError::insufficient_history(
                away.abbreviation,
                away_log.len(),
            ));
        }

        let meetings = self
            .store
            .head_to_head_before(
                game.home_team,
                game.away_team,
                cutoff,
                HEAD_TO_HEAD_WINDOW,
            )
            .await?;

        debug!(
            game_id = %game.id,
            %cutoff,
            home = %home.abbreviation,
            away = %away.abbreviation,
            meetings = meetings.len(),
            "extracted game features"
        );

        let home_block = team_block(
            &home_log,
            Situation {
                is_home: true,
                cutoff,
                temperature: game.temperature,
                wind: game.wind,
            },
            head_to_head_win_pct(game.home_team, &meetings),
        );
        let away_block = team_block(
            &away_log,
            Situation {
                is_home: false,
                cutoff,
                temperature: game.temperature,
                wind: game.wind,
            },
            head_to_head_win_pct(game.away_team, &meetings),
        );
        Ok(GameFeatureVector::from_team_blocks(home_block, away_block))
    }

    async fn team(&self, id: TeamId) -> Result<Team, PredictionError> {
        self.store
            .find_team(id)
            .await?
            .ok_or_else(|| PredictionError::TeamNotFound(id.to_string()))
    }
}

/// Venue context shared by both blocks of one game.
struct Situation {
    is_home: bool,
    cutoff: NaiveDate,
    temperature: Option<i32>,
    wind: Option<i32>,
}

/// One team's feature block. The array literal order must match
/// `TEAM_FEATURE_NAMES`.
fn team_block(
    log: &[TeamGameLog],
    situation: Situation,
    h2h_win_pct: f64,
) -> [f64; TEAM_FEATURE_COUNT] {
    [
        mean(log, |g| g.own.pass_yards as f64),
        mean(log, |g| g.own.pass_touchdowns as f64),
        mean(log, |g| g.own.completion_percentage()),
        mean(log, |g| g.own.rush_yards as f64),
        mean(log, |g| g.own.rush_touchdowns as f64),
        mean(log, |g| g.own.total_yards() as f64),
        mean(log, |g| g.points_for as f64),
        mean(log, |g| g.own.turnovers() as f64),
        mean(log, |g| g.opponent.pass_yards as f64),
        mean(log, |g| g.opponent.rush_yards as f64),
        mean(log, |g| g.opponent.total_yards() as f64),
        mean(log, |g| g.points_against as f64),
        mean(log, |g| g.own.def_sacks as f64),
        mean(log, |g| g.own.def_interceptions as f64),
        mean(log, |g| g.own.turnovers_forced() as f64),
        if situation.is_home { 1.0 } else { 0.0 },
        rest_days(log, situation.cutoff),
        situation
            .temperature
            .map(f64::from)
            .unwrap_or(DEFAULT_TEMPERATURE),
        situation.wind.map(f64::from).unwrap_or(DEFAULT_WIND),
        win_pct(log),
        streak(log),
        h2h_win_pct,
    ]
}

fn mean(log: &[TeamGameLog], value: impl Fn(&TeamGameLog) -> f64) -> f64 {
    if log.is_empty() {
        return 0.0;
    }
    log.iter().map(value).sum::<f64>() / log.len() as f64
}

/// Days since the most recent completed game, clamped to `REST_DAYS_CAP`.
fn rest_days(log: &[TeamGameLog], cutoff: NaiveDate) -> f64 {
    match log.first() {
        Some(last) => cutoff
            .signed_duration_since(last.date)
            .num_days()
            .clamp(0, REST_DAYS_CAP) as f64,
        None => REST_DAYS_CAP as f64,
    }
}

fn win_pct(log: &[TeamGameLog]) -> f64 {
    if log.is_empty() {
        return 0.0;
    }
    log.iter().filter(|g| g.won()).count() as f64 / log.len() as f64
}

/// Signed run of results from the most recent game backwards. A tie ends
/// the run, and a tie in the most recent game yields zero.
fn streak(log: &[TeamGameLog]) -> f64 {
    let Some(latest) = log.first() else {
        return 0.0;
    };
    if latest.points_for == latest.points_against {
        return 0.0;
    }
    let winning = latest.won();
    let run = log
        .iter()
        .take_while(|g| g.points_for != g.points_against && g.won() == winning)
        .count();
    if winning { run as f64 } else { -(run as f64) }
}

/// Share of prior meetings won by `team`, ties counting half. An empty
/// meeting history is neutral.
fn head_to_head_win_pct(team: TeamId, meetings: &[Game]) -> f64 {
    let mut wins = 0.0;
    let mut counted = 0.0;
    for meeting in meetings {
        let Some(winner) = meeting.winner() else {
            continue;
        };
        counted += 1.0;
        wins += match winner {
            Winner::Tie => 0.5,
            Winner::Home if meeting.home_team == team => 1.0,
            Winner::Away if meeting.away_team == team => 1.0,
            _ => 0.0,
        };
    }
    if counted == 0.0 { 0.5 } else { wins / counted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::TEAM_FEATURE_NAMES;
    use crate::domain::types::TeamGameStat;

    fn idx(name: &str) -> usize {
        TEAM_FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .expect("feature name")
    }

    fn stat(team: i64, pass_yards: i32, rush_yards: i32, sacks: u32) -> TeamGameStat {
        TeamGameStat {
            game_id: "g".into(),
            team_id: TeamId(team),
            pass_attempts: 30,
            pass_completions: 21,
            pass_yards,
            pass_touchdowns: 2,
            rush_attempts: 25,
            rush_yards,
            rush_touchdowns: 1,
            interceptions_thrown: 1,
            fumbles_lost: 0,
            def_sacks: sacks,
            def_interceptions: 1,
            def_fumbles_forced: 1,
        }
    }

    fn log_entry(day: u32, points_for: i32, points_against: i32) -> TeamGameLog {
        TeamGameLog {
            game_id: format!("2025_{day:02}_A_B"),
            date: NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            was_home: day % 2 == 0,
            points_for,
            points_against,
            own: stat(1, 240, 110, 3),
            opponent: stat(2, 200, 90, 2),
        }
    }

    fn situation(is_home: bool) -> Situation {
        Situation {
            is_home,
            cutoff: NaiveDate::from_ymd_opt(2025, 10, 26).unwrap(),
            temperature: Some(50),
            wind: Some(10),
        }
    }

    #[test]
    fn test_block_aggregates_follow_schema_order() {
        // Most recent first: W 27-20 on the 19th, L 13-24, W 30-10.
        let log = vec![
            log_entry(19, 27, 20),
            log_entry(12, 13, 24),
            log_entry(5, 30, 10),
        ];
        let block = team_block(&log, situation(true), 0.75);

        assert_eq!(block[idx("pass_yards")], 240.0);
        assert_eq!(block[idx("completion_pct")], 70.0);
        assert_eq!(block[idx("total_yards")], 350.0);
        assert_eq!(block[idx("points_scored")], (27.0 + 13.0 + 30.0) / 3.0);
        assert_eq!(block[idx("points_allowed")], (20.0 + 24.0 + 10.0) / 3.0);
        assert_eq!(block[idx("pass_yards_allowed")], 200.0);
        assert_eq!(block[idx("sacks")], 3.0);
        assert_eq!(block[idx("turnovers_forced")], 2.0);
        assert_eq!(block[idx("is_home")], 1.0);
        assert_eq!(block[idx("rest_days")], 7.0);
        assert_eq!(block[idx("temperature")], 50.0);
        assert_eq!(block[idx("wind")], 10.0);
        assert_eq!(block[idx("recent_win_pct")], 2.0 / 3.0);
        assert_eq!(block[idx("current_streak")], 1.0);
        assert_eq!(block[idx("h2h_win_pct")], 0.75);
    }

    #[test]
    fn test_missing_weather_takes_indoor_defaults() {
        let log = vec![log_entry(19, 20, 17)];
        let mut away = situation(false);
        away.temperature = None;
        away.wind = None;
        let block = team_block(&log, away, 0.5);
        assert_eq!(block[idx("is_home")], 0.0);
        assert_eq!(block[idx("temperature")], DEFAULT_TEMPERATURE);
        assert_eq!(block[idx("wind")], DEFAULT_WIND);
    }

    #[test]
    fn test_rest_days_cap_long_layoffs() {
        let log = vec![log_entry(1, 20, 17)];
        let cutoff = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert_eq!(rest_days(&log, cutoff), REST_DAYS_CAP as f64);
    }

    #[test]
    fn test_streak_is_signed_and_tie_bounded() {
        let wins = vec![log_entry(19, 27, 20), log_entry(12, 24, 13), log_entry(5, 30, 10)];
        assert_eq!(streak(&wins), 3.0);

        let losses = vec![log_entry(19, 13, 20), log_entry(12, 10, 24), log_entry(5, 30, 10)];
        assert_eq!(streak(&losses), -2.0);

        let tie_latest = vec![log_entry(19, 20, 20), log_entry(12, 24, 13)];
        assert_eq!(streak(&tie_latest), 0.0);

        let tie_breaks_run = vec![
            log_entry(19, 27, 20),
            log_entry(12, 20, 20),
            log_entry(5, 30, 10),
        ];
        assert_eq!(streak(&tie_breaks_run), 1.0);
    }

    #[test]
    fn test_head_to_head_is_orientation_aware() {
        let mut meeting = Game {
            id: "2024_05_B_A".into(),
            season: 2024,
            week: 5,
            date: NaiveDate::from_ymd_opt(2024, 10, 6).unwrap(),
            home_team: TeamId(1),
            away_team: TeamId(2),
            home_score: Some(28),
            away_score: Some(14),
            temperature: None,
            wind: None,
        };
        assert_eq!(head_to_head_win_pct(TeamId(1), std::slice::from_ref(&meeting)), 1.0);
        assert_eq!(head_to_head_win_pct(TeamId(2), std::slice::from_ref(&meeting)), 0.0);

        meeting.home_score = Some(14);
        meeting.away_score = Some(14);
        assert_eq!(head_to_head_win_pct(TeamId(1), std::slice::from_ref(&meeting)), 0.5);

        assert_eq!(head_to_head_win_pct(TeamId(1), &[]), 0.5);
    }
}
