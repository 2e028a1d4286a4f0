//! Turns completed games into labeled training examples.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::application::features::FeatureExtractor;
use crate::domain::errors::{PredictionError, TrainingError};
use crate::domain::features::GameFeatureVector;
use crate::domain::model_version::SeasonRange;
use crate::domain::repositories::HistoryStore;

/// One completed game with features extracted as of its own date and the
/// three regression targets.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub game_id: String,
    pub date: NaiveDate,
    pub features: GameFeatureVector,
    /// 1.0 when the home side won, 0.0 on a loss or tie.
    pub home_win: f64,
    /// `home_score - away_score`.
    pub spread: f64,
    /// `home_score + away_score`.
    pub total: f64,
}

/// Chronologically ordered examples for one season range.
#[derive(Debug)]
pub struct TrainingDataset {
    pub seasons: SeasonRange,
    pub examples: Vec<TrainingExample>,
    /// Games dropped because a side lacked the minimum prior history.
    pub skipped: usize,
}

pub struct DatasetBuilder {
    store: Arc<dyn HistoryStore>,
    extractor: FeatureExtractor,
}

impl DatasetBuilder {
    pub fn new(store: Arc<dyn HistoryStore>, lookback: usize) -> Self {
        let extractor = FeatureExtractor::new(store.clone(), lookback);
        Self { store, extractor }
    }

    /// Builds the dataset for the inclusive season range. Every example's
    /// features are computed with `cutoff = game.date`, so early-season
    /// games only see prior seasons. Fails fast on an inverted range and
    /// on a range that produces no usable examples.
    pub async fn build(
        &self,
        start_season: u16,
        end_season: u16,
    ) -> Result<TrainingDataset, TrainingError> {
        if start_season > end_season {
            return Err(TrainingError::InvalidRange {
                start: start_season,
                end: end_season,
            });
        }

        let games = self
            .store
            .completed_games_between(start_season, end_season)
            .await?;

        let mut examples = Vec::with_capacity(games.len());
        let mut skipped = 0usize;
        for game in games {
            let (Some(home_score), Some(away_score)) = (game.home_score, game.away_score)
            else {
                continue;
            };
            match self.extractor.extract(&game, game.date).await {
                Ok(features) => examples.push(TrainingExample {
                    game_id: game.id,
                    date: game.date,
                    features,
                    home_win: if home_score > away_score { 1.0 } else { 0.0 },
                    spread: f64::from(home_score - away_score),
                    total: f64::from(home_score + away_score),
                }),
                Err(PredictionError::InsufficientHistory {
                    team, completed, ..
                }) => {
                    skipped += 1;
                    debug!(
                        game_id = %game.id,
                        %team,
                        completed,
                        "skipping game without enough prior history"
                    );
                }
                Err(source) => {
                    return Err(TrainingError::Extraction {
                        game_id: game.id,
                        source,
                    });
                }
            }
        }

        if examples.is_empty() {
            return Err(TrainingError::EmptyDataset {
                start: start_season,
                end: end_season,
                skipped,
            });
        }

        Ok(TrainingDataset {
            seasons: SeasonRange::new(start_season, end_season),
            examples,
            skipped,
        })
    }
}

/// Splits without shuffling; the trailing `holdout` share is the
/// evaluation slice. Small inputs may get an empty evaluation slice.
pub fn chronological_split(
    examples: &[TrainingExample],
    holdout: f64,
) -> (&[TrainingExample], &[TrainingExample]) {
    let tail = (examples.len() as f64 * holdout).floor() as usize;
    examples.split_at(examples.len() - tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::TEAM_FEATURE_COUNT;

    fn example(index: usize) -> TrainingExample {
        TrainingExample {
            game_id: format!("2024_{:02}_A_B", index + 1),
            date: NaiveDate::from_ymd_opt(2024, 9, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(index as u64 * 7))
                .unwrap(),
            features: GameFeatureVector::from_team_blocks(
                [index as f64; TEAM_FEATURE_COUNT],
                [0.0; TEAM_FEATURE_COUNT],
            ),
            home_win: 1.0,
            spread: 3.0,
            total: 45.0,
        }
    }

    #[test]
    fn test_split_reserves_the_chronological_tail() {
        let examples: Vec<_> = (0..10).map(example).collect();
        let (train, eval) = chronological_split(&examples, 0.2);
        assert_eq!(train.len(), 8);
        assert_eq!(eval.len(), 2);
        assert_eq!(eval[0].game_id, "2024_09_A_B");
        assert_eq!(eval[1].game_id, "2024_10_A_B");
        assert!(train.last().unwrap().date < eval.first().unwrap().date);
    }

    #[test]
    fn test_split_of_tiny_input_keeps_everything_for_training() {
        let examples: Vec<_> = (0..3).map(example).collect();
        let (train, eval) = chronological_split(&examples, 0.2);
        assert_eq!(train.len(), 3);
        assert!(eval.is_empty());
    }
}
