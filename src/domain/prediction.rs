use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::PredictionError;
use crate::domain::types::Winner;

/// Probability margins from a coin flip that bound the confidence tiers.
pub const LOW_CONFIDENCE_MARGIN: f64 = 0.10;
pub const MEDIUM_CONFIDENCE_MARGIN: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Tier from the winner probability's distance to 0.5.
    pub fn from_probability(probability: f64) -> Self {
        let margin = (probability - 0.5).abs();
        if margin < LOW_CONFIDENCE_MARGIN {
            Confidence::Low
        } else if margin < MEDIUM_CONFIDENCE_MARGIN {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// Predicted side. Unlike [`Winner`] a forecast never calls a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Home => write!(f, "home"),
            Side::Away => write!(f, "away"),
        }
    }
}

/// Raw sub-model outputs for one game, before assembly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleOutput {
    pub home_win_probability: f64,
    pub spread: f64,
    pub total: f64,
}

/// Assembled forecast for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePrediction {
    pub home_win_probability: f64,
    pub predicted_winner: Side,
    pub predicted_spread: f64,
    pub predicted_total: f64,
    pub predicted_home_score: f64,
    pub predicted_away_score: f64,
    pub confidence: Confidence,
}

impl GamePrediction {
    /// Assembles the presentation fields from raw sub-model outputs.
    ///
    /// The score pair is the exact decomposition of spread and total, so
    /// `home - away` and `home + away` reproduce the regressor outputs. The
    /// winner follows the spread sign, a zero spread calling home.
    pub fn from_ensemble(output: EnsembleOutput) -> Self {
        let home_score = (output.total + output.spread) / 2.0;
        let away_score = (output.total - output.spread) / 2.0;
        let predicted_winner = if output.spread >= 0.0 {
            Side::Home
        } else {
            Side::Away
        };
        Self {
            home_win_probability: output.home_win_probability,
            predicted_winner,
            predicted_spread: output.spread,
            predicted_total: output.total,
            predicted_home_score: home_score,
            predicted_away_score: away_score,
            confidence: Confidence::from_probability(output.home_win_probability),
        }
    }
}

/// Ground truth attached to forecasts for already-finished games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualOutcome {
    pub home_score: i32,
    pub away_score: i32,
    pub winner: Winner,
}

impl ActualOutcome {
    pub fn from_scores(home_score: i32, away_score: i32) -> Self {
        let winner = match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => Winner::Home,
            std::cmp::Ordering::Less => Winner::Away,
            std::cmp::Ordering::Equal => Winner::Tie,
        };
        Self {
            home_score,
            away_score,
            winner,
        }
    }
}

/// Wire-shaped forecast for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub game_id: String,
    pub prediction: GamePrediction,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<ActualOutcome>,
}

/// Per-game result inside a batch: either a forecast or a structured error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Ready(PredictionResult),
    Unavailable { error: String },
}

impl PredictionOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PredictionOutcome::Ready(_))
    }

    pub fn as_result(&self) -> Option<&PredictionResult> {
        match self {
            PredictionOutcome::Ready(result) => Some(result),
            PredictionOutcome::Unavailable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PredictionOutcome::Ready(_) => None,
            PredictionOutcome::Unavailable { error } => Some(error),
        }
    }
}

impl From<PredictionError> for PredictionOutcome {
    fn from(err: PredictionError) -> Self {
        PredictionOutcome::Unavailable {
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_decomposes_scores_exactly() {
        let prediction = GamePrediction::from_ensemble(EnsembleOutput {
            home_win_probability: 0.62,
            spread: 3.5,
            total: 51.5,
        });
        assert_eq!(prediction.predicted_home_score, 27.5);
        assert_eq!(prediction.predicted_away_score, 24.0);
        assert_eq!(prediction.predicted_winner, Side::Home);
        assert_eq!(prediction.confidence, Confidence::Medium);
        let recomposed_spread =
            prediction.predicted_home_score - prediction.predicted_away_score;
        let recomposed_total =
            prediction.predicted_home_score + prediction.predicted_away_score;
        assert_eq!(recomposed_spread, prediction.predicted_spread);
        assert_eq!(recomposed_total, prediction.predicted_total);
    }

    #[test]
    fn test_zero_spread_calls_home() {
        let prediction = GamePrediction::from_ensemble(EnsembleOutput {
            home_win_probability: 0.31,
            spread: 0.0,
            total: 44.0,
        });
        assert_eq!(prediction.predicted_winner, Side::Home);
        // The probability leans away while the spread calls home; both are
        // reported as-is rather than reconciled.
        assert_eq!(prediction.home_win_probability, 0.31);
    }

    #[test]
    fn test_negative_spread_calls_away() {
        let prediction = GamePrediction::from_ensemble(EnsembleOutput {
            home_win_probability: 0.40,
            spread: -6.5,
            total: 41.0,
        });
        assert_eq!(prediction.predicted_winner, Side::Away);
        assert_eq!(prediction.predicted_home_score, 17.25);
        assert_eq!(prediction.predicted_away_score, 23.75);
    }

    #[test]
    fn test_confidence_tiers_at_margin_boundaries() {
        assert_eq!(Confidence::from_probability(0.5), Confidence::Low);
        assert_eq!(Confidence::from_probability(0.599), Confidence::Low);
        assert_eq!(Confidence::from_probability(0.60), Confidence::Medium);
        assert_eq!(Confidence::from_probability(0.40), Confidence::Medium);
        assert_eq!(Confidence::from_probability(0.70), Confidence::High);
        assert_eq!(Confidence::from_probability(0.30), Confidence::High);
        assert_eq!(Confidence::from_probability(0.0), Confidence::High);
    }

    #[test]
    fn test_actual_outcome_derives_winner() {
        assert_eq!(ActualOutcome::from_scores(27, 24).winner, Winner::Home);
        assert_eq!(ActualOutcome::from_scores(13, 20).winner, Winner::Away);
        assert_eq!(ActualOutcome::from_scores(21, 21).winner, Winner::Tie);
    }

    #[test]
    fn test_wire_shape_omits_actual_until_present() {
        let result = PredictionResult {
            game_id: "2025_07_KC_BUF".into(),
            prediction: GamePrediction::from_ensemble(EnsembleOutput {
                home_win_probability: 0.62,
                spread: 3.5,
                total: 51.5,
            }),
            model_version: "v20251103_141242".into(),
            actual: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("actual").is_none());
        assert_eq!(json["prediction"]["predicted_winner"], "home");
        assert_eq!(json["prediction"]["confidence"], "medium");

        let with_actual = PredictionResult {
            actual: Some(ActualOutcome::from_scores(27, 24)),
            ..result
        };
        let json = serde_json::to_value(&with_actual).unwrap();
        assert_eq!(json["actual"]["winner"], "home");
        assert_eq!(json["actual"]["home_score"], 27);
    }

    #[test]
    fn test_batch_outcome_serializes_errors_as_error_objects() {
        let outcome =
            PredictionOutcome::from(PredictionError::GameNotFound("2025_99_XX_YY".into()));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "Game not found: 2025_99_XX_YY"})
        );
        assert!(!outcome.is_ready());
    }
}
