//! One training run end to end: dataset, fit, evaluate, persist, register.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::application::ml::ensemble::{FitParams, GameEnsemble};
use crate::application::training::dataset::{
    DatasetBuilder, TrainingExample, chronological_split,
};
use crate::config::Config;
use crate::domain::errors::TrainingError;
use crate::domain::features::GameFeatureVector;
use crate::domain::model_version::{EvaluationMetrics, ModelVersion};
use crate::domain::repositories::{HistoryStore, ModelRegistry};

/// Share of the chronological tail held out for evaluation.
pub const EVAL_HOLDOUT: f64 = 0.2;

pub struct Trainer {
    registry: Arc<dyn ModelRegistry>,
    builder: DatasetBuilder,
    model_dir: PathBuf,
    params: FitParams,
}

#[derive(Debug)]
pub struct TrainingReport {
    pub version: ModelVersion,
    pub examples: usize,
    pub skipped: usize,
    pub evaluated: usize,
}

impl Trainer {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        registry: Arc<dyn ModelRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            registry,
            builder: DatasetBuilder::new(store, config.lookback_games),
            model_dir: config.model_dir.clone(),
            params: FitParams::from_config(config),
        }
    }

    pub fn with_params(mut self, params: FitParams) -> Self {
        self.params = params;
        self
    }

    /// Trains over the inclusive season range and registers the version.
    /// With `activate`, the new version atomically becomes the only active
    /// one. A run that fails at any step registers nothing.
    pub async fn run(
        &self,
        start_season: u16,
        end_season: u16,
        activate: bool,
    ) -> Result<TrainingReport, TrainingError> {
        let dataset = self.builder.build(start_season, end_season).await?;
        info!(
            examples = dataset.examples.len(),
            skipped = dataset.skipped,
            seasons = %dataset.seasons,
            "built training dataset"
        );

        let (train, eval) = chronological_split(&dataset.examples, EVAL_HOLDOUT);
        let ensemble = GameEnsemble::fit(train, &self.params)?;

        // Tiny datasets get in-sample metrics rather than none.
        let eval_slice = if eval.is_empty() { train } else { eval };
        let metrics = evaluate(&ensemble, eval_slice)?;

        let created_at = Utc::now();
        let version_id = ModelVersion::version_id(created_at);
        let artifacts = ensemble.save(&self.model_dir, &version_id)?;

        let version = ModelVersion {
            version: version_id,
            created_at,
            seasons: dataset.seasons,
            training_samples: dataset.examples.len(),
            metrics,
            artifacts,
            is_active: activate,
        };

        if let Err(err) = self.registry.insert(&version, activate).await {
            // A failed insert must leave neither a registry row nor the
            // artifact files written for it.
            for path in [
                &version.artifacts.winner,
                &version.artifacts.spread,
                &version.artifacts.total,
            ] {
                if let Err(remove_err) = std::fs::remove_file(path) {
                    warn!(%path, error = %remove_err, "failed to remove orphaned artifact");
                }
            }
            return Err(TrainingError::Store(err));
        }

        info!(
            version = %version.version,
            winner_accuracy = metrics.winner_accuracy,
            spread_mae = metrics.spread_mae,
            total_mae = metrics.total_mae,
            activate,
            "registered model version"
        );

        Ok(TrainingReport {
            version,
            examples: dataset.examples.len(),
            skipped: dataset.skipped,
            evaluated: eval_slice.len(),
        })
    }
}

fn evaluate(
    ensemble: &GameEnsemble,
    examples: &[TrainingExample],
) -> anyhow::Result<EvaluationMetrics> {
    let inputs: Vec<GameFeatureVector> =
        examples.iter().map(|e| e.features.clone()).collect();
    let outputs = ensemble.predict_many(&inputs)?;

    let count = examples.len() as f64;
    let mut correct = 0.0;
    let mut spread_error = 0.0;
    let mut total_error = 0.0;
    for (example, output) in examples.iter().zip(&outputs) {
        let called_home = output.home_win_probability >= 0.5;
        if called_home == (example.home_win == 1.0) {
            correct += 1.0;
        }
        spread_error += (output.spread - example.spread).abs();
        total_error += (output.total - example.total).abs();
    }

    Ok(EvaluationMetrics {
        winner_accuracy: correct / count,
        spread_mae: spread_error / count,
        total_mae: total_error / count,
    })
}
