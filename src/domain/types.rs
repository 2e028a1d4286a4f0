use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable league-wide team identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub abbreviation: String,
    pub name: String,
}

/// Which side of a completed game won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Home,
    Away,
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Home => write!(f, "home"),
            Winner::Away => write!(f, "away"),
            Winner::Tie => write!(f, "tie"),
        }
    }
}

/// A scheduled or completed game. Scores are `None` until the game finishes;
/// weather readings are `None` for covered venues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub season: u16,
    pub week: u8,
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub temperature: Option<i32>,
    pub wind: Option<i32>,
}

impl Game {
    /// Canonical game identifier, e.g. `2025_07_KC_BUF`.
    pub fn format_id(season: u16, week: u8, away_abbr: &str, home_abbr: &str) -> String {
        format!("{season}_{week:02}_{away_abbr}_{home_abbr}")
    }

    pub fn is_completed(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn winner(&self) -> Option<Winner> {
        let (home, away) = (self.home_score?, self.away_score?);
        Some(match home.cmp(&away) {
            std::cmp::Ordering::Greater => Winner::Home,
            std::cmp::Ordering::Less => Winner::Away,
            std::cmp::Ordering::Equal => Winner::Tie,
        })
    }

    /// Points scored by `team` in this game, if it played and the game finished.
    pub fn score_for(&self, team: TeamId) -> Option<i32> {
        if team == self.home_team {
            self.home_score
        } else if team == self.away_team {
            self.away_score
        } else {
            None
        }
    }

    pub fn score_against(&self, team: TeamId) -> Option<i32> {
        if team == self.home_team {
            self.away_score
        } else if team == self.away_team {
            self.home_score
        } else {
            None
        }
    }
}

/// One team's box-score line for a single game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamGameStat {
    pub game_id: String,
    pub team_id: TeamId,
    pub pass_attempts: u32,
    pub pass_completions: u32,
    pub pass_yards: i32,
    pub pass_touchdowns: u32,
    pub rush_attempts: u32,
    pub rush_yards: i32,
    pub rush_touchdowns: u32,
    pub interceptions_thrown: u32,
    pub fumbles_lost: u32,
    pub def_sacks: u32,
    pub def_interceptions: u32,
    pub def_fumbles_forced: u32,
}

impl TeamGameStat {
    pub fn completion_percentage(&self) -> f64 {
        if self.pass_attempts == 0 {
            return 0.0;
        }
        self.pass_completions as f64 / self.pass_attempts as f64 * 100.0
    }

    pub fn total_yards(&self) -> i32 {
        self.pass_yards + self.rush_yards
    }

    /// Giveaways by this team's offense.
    pub fn turnovers(&self) -> u32 {
        self.interceptions_thrown + self.fumbles_lost
    }

    /// Takeaways by this team's defense.
    pub fn turnovers_forced(&self) -> u32 {
        self.def_interceptions + self.def_fumbles_forced
    }
}

/// A completed game from one team's perspective, paired with both stat lines.
/// `own` is the perspective team's line, `opponent` the other side's.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamGameLog {
    pub game_id: String,
    pub date: NaiveDate,
    pub was_home: bool,
    pub points_for: i32,
    pub points_against: i32,
    pub own: TeamGameStat,
    pub opponent: TeamGameStat,
}

impl TeamGameLog {
    pub fn won(&self) -> bool {
        self.points_for > self.points_against
    }

    pub fn lost(&self) -> bool {
        self.points_for < self.points_against
    }
}
