//! Deterministic demo league generator.
//!
//! Produces a small eight-team league with round-robin schedules, scores
//! driven by per-team strength ratings plus seeded noise, and box-score
//! lines derived from the scores. The final two weeks of the last season
//! stay unplayed so the prediction service has something to forecast.

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::types::{Game, Team, TeamGameStat, TeamId};

pub const WEEKS_PER_SEASON: u8 = 14;
pub const UNPLAYED_FINAL_WEEKS: u8 = 2;

const HOME_EDGE: f64 = 2.5;
const ROUNDS: u8 = 7;

// (abbreviation, name, strength in expected points per game, roofed venue)
const TEAMS: [(&str, &str, f64, bool); 8] = [
    ("BUF", "Buffalo Bills", 27.0, false),
    ("KC", "Kansas City Chiefs", 28.5, false),
    ("SF", "San Francisco 49ers", 26.5, false),
    ("DAL", "Dallas Cowboys", 24.5, true),
    ("PHI", "Philadelphia Eagles", 25.5, false),
    ("MIA", "Miami Dolphins", 23.5, false),
    ("DET", "Detroit Lions", 24.0, true),
    ("GB", "Green Bay Packers", 22.0, false),
];

#[derive(Debug, Clone)]
pub struct SampleLeague {
    pub teams: Vec<Team>,
    pub games: Vec<Game>,
    pub stats: Vec<TeamGameStat>,
}

pub fn generate(start_season: u16, end_season: u16, seed: u64) -> SampleLeague {
    let mut rng = StdRng::seed_from_u64(seed);

    let teams: Vec<Team> = TEAMS
        .iter()
        .enumerate()
        .map(|(i, (abbr, name, _, _))| Team {
            id: TeamId(i as i64 + 1),
            abbreviation: abbr.to_string(),
            name: name.to_string(),
        })
        .collect();

    let mut games = Vec::new();
    let mut stats = Vec::new();
    for season in start_season..=end_season {
        let last_season = season == end_season;
        for week in 1..=WEEKS_PER_SEASON {
            let unplayed = last_season && week > WEEKS_PER_SEASON - UNPLAYED_FINAL_WEEKS;
            for (slot, (home_idx, away_idx)) in week_pairings(week).into_iter().enumerate() {
                let (game, pair) =
                    build_game(season, week, slot, home_idx, away_idx, unplayed, &mut rng);
                games.push(game);
                if let Some((home_stat, away_stat)) = pair {
                    stats.push(home_stat);
                    stats.push(away_stat);
                }
            }
        }
    }

    SampleLeague {
        teams,
        games,
        stats,
    }
}

// Circle method: team 0 stays fixed while the rest rotate, giving every
// pairing once per seven rounds. The second half of the season replays the
// rounds with venues flipped.
fn week_pairings(week: u8) -> Vec<(usize, usize)> {
    let round = ((week - 1) % ROUNDS) as usize;
    let second_cycle = week > ROUNDS;
    let n = TEAMS.len();

    let mut order = vec![0usize; n];
    for (i, slot) in order.iter_mut().enumerate().skip(1) {
        *slot = (i - 1 + round) % (n - 1) + 1;
    }

    let mut pairings = Vec::with_capacity(n / 2);
    for k in 0..n / 2 {
        let (a, b) = (order[k], order[n - 1 - k]);
        let home_first = (round + k) % 2 == 0;
        let (home, away) = if home_first == second_cycle {
            (b, a)
        } else {
            (a, b)
        };
        pairings.push((home, away));
    }
    pairings
}

fn build_game(
    season: u16,
    week: u8,
    slot: usize,
    home_idx: usize,
    away_idx: usize,
    unplayed: bool,
    rng: &mut StdRng,
) -> (Game, Option<(TeamGameStat, TeamGameStat)>) {
    let (home_abbr, _, home_strength, roofed) = TEAMS[home_idx];
    let (away_abbr, _, away_strength, _) = TEAMS[away_idx];

    let id = Game::format_id(season, week, away_abbr, home_abbr);
    let date = kickoff_date(season, week, slot);
    let (temperature, wind) = if roofed {
        (None, None)
    } else {
        (
            Some(rng.random_range(25..=85)),
            Some(rng.random_range(0..=25)),
        )
    };

    let mut game = Game {
        id: id.clone(),
        season,
        week,
        date,
        home_team: TeamId(home_idx as i64 + 1),
        away_team: TeamId(away_idx as i64 + 1),
        home_score: None,
        away_score: None,
        temperature,
        wind,
    };
    if unplayed {
        return (game, None);
    }

    let margin = home_strength - away_strength + HOME_EDGE + rng.random_range(-12.0..12.0);
    let total = home_strength + away_strength + rng.random_range(-10.0..10.0);
    let home_score = (((total + margin) / 2.0).round() as i32).max(0);
    let away_score = (((total - margin) / 2.0).round() as i32).max(0);
    game.home_score = Some(home_score);
    game.away_score = Some(away_score);

    let home_giveaways = giveaways(home_score, rng);
    let away_giveaways = giveaways(away_score, rng);
    let home_stat = stat_line(
        &id,
        game.home_team,
        home_score,
        home_giveaways,
        away_giveaways,
        rng,
    );
    let away_stat = stat_line(
        &id,
        game.away_team,
        away_score,
        away_giveaways,
        home_giveaways,
        rng,
    );
    (game, Some((home_stat, away_stat)))
}

fn kickoff_date(season: u16, week: u8, slot: usize) -> NaiveDate {
    // Sundays early in the week's window, one Monday game per slate.
    let opener = NaiveDate::from_ymd_opt(season as i32, 9, 7).unwrap_or_default();
    let offset = (week as u64 - 1) * 7 + if slot == 3 { 1 } else { 0 };
    opener.checked_add_days(Days::new(offset)).unwrap_or(opener)
}

// (interceptions thrown, fumbles lost)
fn giveaways(points: i32, rng: &mut StdRng) -> (u32, u32) {
    let interceptions = if points < 17 {
        rng.random_range(0..=2)
    } else {
        rng.random_range(0..=1)
    };
    (interceptions, rng.random_range(0..=1))
}

fn stat_line(
    game_id: &str,
    team_id: TeamId,
    points: i32,
    own_giveaways: (u32, u32),
    opponent_giveaways: (u32, u32),
    rng: &mut StdRng,
) -> TeamGameStat {
    let touchdowns = (points / 7) as u32;
    let pass_touchdowns = if touchdowns == 0 {
        0
    } else {
        rng.random_range(touchdowns / 2..=touchdowns)
    };
    let pass_attempts = rng.random_range(26..=40);
    let completion_rate = rng.random_range(0.55..0.72);
    TeamGameStat {
        game_id: game_id.to_string(),
        team_id,
        pass_attempts,
        pass_completions: (pass_attempts as f64 * completion_rate).round() as u32,
        pass_yards: 150 + points * 4 + rng.random_range(-30..=30),
        pass_touchdowns,
        rush_attempts: rng.random_range(20..=32),
        rush_yards: (70 + points * 2 + rng.random_range(-20..=20)).max(25),
        rush_touchdowns: touchdowns - pass_touchdowns,
        interceptions_thrown: own_giveaways.0,
        fumbles_lost: own_giveaways.1,
        def_sacks: rng.random_range(0..=5),
        def_interceptions: opponent_giveaways.0,
        def_fumbles_forced: opponent_giveaways.1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_team_plays_once_per_week() {
        for week in 1..=WEEKS_PER_SEASON {
            let pairings = week_pairings(week);
            assert_eq!(pairings.len(), 4);
            let mut seen = HashSet::new();
            for (home, away) in pairings {
                assert!(seen.insert(home));
                assert!(seen.insert(away));
            }
            assert_eq!(seen.len(), TEAMS.len());
        }
    }

    #[test]
    fn test_second_cycle_flips_venues() {
        let first = week_pairings(1);
        let replay = week_pairings(1 + ROUNDS);
        for (home, away) in first {
            assert!(replay.contains(&(away, home)));
        }
    }

    #[test]
    fn test_generation_is_deterministic_for_a_seed() {
        let a = generate(2022, 2023, 7);
        let b = generate(2022, 2023, 7);
        assert_eq!(a.games, b.games);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn test_final_weeks_of_last_season_are_unplayed() {
        let league = generate(2022, 2023, 7);
        for game in &league.games {
            let in_tail = game.season == 2023 && game.week > WEEKS_PER_SEASON - UNPLAYED_FINAL_WEEKS;
            assert_eq!(game.is_completed(), !in_tail, "game {}", game.id);
        }
        // Unplayed games carry no box scores.
        let scored: HashSet<&str> = league
            .games
            .iter()
            .filter(|g| g.is_completed())
            .map(|g| g.id.as_str())
            .collect();
        assert!(league.stats.iter().all(|s| scored.contains(s.game_id.as_str())));
    }

    #[test]
    fn test_stat_lines_reconcile_across_opponents() {
        let league = generate(2022, 2022, 3);
        for game in league.games.iter().filter(|g| g.is_completed()) {
            let home = league
                .stats
                .iter()
                .find(|s| s.game_id == game.id && s.team_id == game.home_team)
                .unwrap();
            let away = league
                .stats
                .iter()
                .find(|s| s.game_id == game.id && s.team_id == game.away_team)
                .unwrap();
            assert_eq!(home.def_interceptions, away.interceptions_thrown);
            assert_eq!(away.def_fumbles_forced, home.fumbles_lost);
            assert!(home.pass_completions <= home.pass_attempts);
        }
    }
}
