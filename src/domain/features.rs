//! Feature schema shared by training and serving.
//!
//! The extractor emits one fixed-length vector per game: the home team's
//! block followed by the away team's block, in the order of
//! [`TEAM_FEATURE_NAMES`]. Changing the order or length invalidates every
//! persisted model artifact, so both are compile-time constants.

use std::fmt;

/// Rolling-window features computed per team.
pub const TEAM_FEATURE_COUNT: usize = 22;

/// Total model input width: one block per side.
pub const FEATURE_COUNT: usize = TEAM_FEATURE_COUNT * 2;

/// Completed games a team must have before the cutoff to be predictable.
pub const MIN_PRIOR_GAMES: usize = 3;

/// Per-team feature names, unprefixed, in vector order.
pub const TEAM_FEATURE_NAMES: [&str; TEAM_FEATURE_COUNT] = [
    // Offense, rolling means
    "pass_yards",
    "pass_touchdowns",
    "completion_pct",
    "rush_yards",
    "rush_touchdowns",
    "total_yards",
    "points_scored",
    "turnovers",
    // Defense, rolling means
    "pass_yards_allowed",
    "rush_yards_allowed",
    "total_yards_allowed",
    "points_allowed",
    "sacks",
    "interceptions",
    "turnovers_forced",
    // Situation
    "is_home",
    "rest_days",
    "temperature",
    "wind",
    // Trend
    "recent_win_pct",
    "current_streak",
    "h2h_win_pct",
];

/// All 44 input names, `home_`-prefixed block then `away_`-prefixed block.
pub fn feature_names() -> Vec<String> {
    let mut names = Vec::with_capacity(FEATURE_COUNT);
    for prefix in ["home", "away"] {
        for name in TEAM_FEATURE_NAMES {
            names.push(format!("{prefix}_{name}"));
        }
    }
    names
}

/// Model input for one game, laid out per the schema above.
#[derive(Debug, Clone, PartialEq)]
pub struct GameFeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl GameFeatureVector {
    pub fn from_team_blocks(
        home: [f64; TEAM_FEATURE_COUNT],
        away: [f64; TEAM_FEATURE_COUNT],
    ) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        values[..TEAM_FEATURE_COUNT].copy_from_slice(&home);
        values[TEAM_FEATURE_COUNT..].copy_from_slice(&away);
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }
}

impl fmt::Display for GameFeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameFeatureVector({} features)", FEATURE_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_cover_both_blocks_in_order() {
        let names = feature_names();
        assert_eq!(names.len(), FEATURE_COUNT);
        assert_eq!(names[0], "home_pass_yards");
        assert!(names[..TEAM_FEATURE_COUNT].iter().all(|n| n.starts_with("home_")));
        assert!(names[TEAM_FEATURE_COUNT..].iter().all(|n| n.starts_with("away_")));
        assert_eq!(names[FEATURE_COUNT - 1], "away_h2h_win_pct");
    }

    #[test]
    fn test_blocks_land_in_declared_positions() {
        let home = [1.0; TEAM_FEATURE_COUNT];
        let away = [2.0; TEAM_FEATURE_COUNT];
        let vector = GameFeatureVector::from_team_blocks(home, away);
        let slice = vector.as_slice();
        assert_eq!(slice.len(), FEATURE_COUNT);
        assert!(slice[..TEAM_FEATURE_COUNT].iter().all(|v| *v == 1.0));
        assert!(slice[TEAM_FEATURE_COUNT..].iter().all(|v| *v == 2.0));
    }
}
