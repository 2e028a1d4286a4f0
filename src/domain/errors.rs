use thiserror::Error;

use crate::domain::features::MIN_PRIOR_GAMES;

/// Errors surfaced while serving a single prediction.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Team not found: {0}")]
    TeamNotFound(String),

    #[error(
        "Insufficient history for {team}: {completed} completed games before cutoff, need {required}"
    )]
    InsufficientHistory {
        team: String,
        completed: usize,
        required: usize,
    },

    #[error("No active model version; train and activate one first")]
    NoActiveModel,

    #[error("Failed to load model artifacts for version {version}: {reason}")]
    ModelLoad { version: String, reason: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PredictionError {
    pub fn insufficient_history(team: impl Into<String>, completed: usize) -> Self {
        Self::InsufficientHistory {
            team: team.into(),
            completed,
            required: MIN_PRIOR_GAMES,
        }
    }
}

/// Errors surfaced while building a dataset or fitting a model.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Invalid season range: {start} > {end}")]
    InvalidRange { start: u16, end: u16 },

    #[error(
        "No usable training examples for seasons {start}-{end} ({skipped} games skipped for insufficient history)"
    )]
    EmptyDataset {
        start: u16,
        end: u16,
        skipped: usize,
    },

    #[error("Feature extraction failed for game {game_id}: {source}")]
    Extraction {
        game_id: String,
        #[source]
        source: PredictionError,
    },

    #[error("Model fit failed: {reason}")]
    Fit { reason: String },

    #[error("Failed to write model artifact: {0}")]
    Artifact(#[from] std::io::Error),

    #[error("Failed to encode model artifact: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_history_names_team_and_counts() {
        let err = PredictionError::insufficient_history("BUF", 2);
        let msg = err.to_string();
        assert!(msg.contains("Insufficient history"));
        assert!(msg.contains("BUF"));
        assert!(msg.contains('2'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_empty_dataset_reports_skip_count() {
        let err = TrainingError::EmptyDataset {
            start: 2022,
            end: 2023,
            skipped: 12,
        };
        assert!(err.to_string().contains("12 games skipped"));
    }
}
