//! The prediction service.
//!
//! One explicitly constructed service owns the cache and the resident
//! model; callers share it behind an `Arc` instead of reaching for a
//! process global. The active version is resolved from the registry on
//! every request, and artifacts load lazily, at most once per version,
//! however many requests race the first load.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::application::features::FeatureExtractor;
use crate::application::ml::ensemble::GameEnsemble;
use crate::application::prediction::cache::{ForecastCache, ForecastKey};
use crate::config::Config;
use crate::domain::errors::PredictionError;
use crate::domain::model_version::{ModelInfo, ModelVersion};
use crate::domain::prediction::{
    ActualOutcome, GamePrediction, PredictionOutcome, PredictionResult,
};
use crate::domain::repositories::{HistoryStore, ModelRegistry};
use crate::domain::types::Game;

struct ResidentEnsemble {
    version: String,
    ensemble: GameEnsemble,
}

pub struct PredictionService {
    store: Arc<dyn HistoryStore>,
    registry: Arc<dyn ModelRegistry>,
    extractor: FeatureExtractor,
    cache: ForecastCache,
    resident: RwLock<Option<Arc<ResidentEnsemble>>>,
    load_gate: AsyncMutex<()>,
}

impl PredictionService {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        registry: Arc<dyn ModelRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            extractor: FeatureExtractor::new(store.clone(), config.lookback_games),
            store,
            registry,
            cache: ForecastCache::new(config.cache_ttl()),
            resident: RwLock::new(None),
            load_gate: AsyncMutex::new(()),
        }
    }

    /// Forecast for one game. Failures come back as structured outcomes
    /// rather than errors, so batch callers can aggregate them directly.
    pub async fn predict_game(&self, game_id: &str) -> PredictionOutcome {
        match self.forecast(game_id).await {
            Ok(result) => PredictionOutcome::Ready(result),
            Err(err) => {
                debug!(game_id, error = %err, "prediction unavailable");
                PredictionOutcome::from(err)
            }
        }
    }

    /// Forecasts every game of a week concurrently. Per-game failures
    /// never sink the batch; the map holds one entry per scheduled game.
    /// Failing to list the week at all is the only whole-call error.
    pub async fn predict_week(
        &self,
        season: u16,
        week: u8,
    ) -> Result<BTreeMap<String, PredictionOutcome>, PredictionError> {
        let games = self.store.games_for_week(season, week).await?;
        info!(season, week, games = games.len(), "predicting week");

        let outcomes = join_all(games.iter().map(|game| async move {
            (game.id.clone(), self.predict_game(&game.id).await)
        }))
        .await;
        Ok(outcomes.into_iter().collect())
    }

    /// Summary of the active model, `None` when nothing is active.
    pub async fn model_info(&self) -> Result<Option<ModelInfo>, PredictionError> {
        Ok(self.registry.find_active().await?.map(ModelInfo::from))
    }

    /// Releases the resident model and every cached prediction.
    pub fn shutdown(&self) {
        match self.resident.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        self.cache.clear();
        info!("prediction service shut down");
    }

    async fn forecast(&self, game_id: &str) -> Result<PredictionResult, PredictionError> {
        let game = self
            .store
            .find_game(game_id)
            .await?
            .ok_or_else(|| PredictionError::GameNotFound(game_id.to_string()))?;
        let active = self
            .registry
            .find_active()
            .await?
            .ok_or(PredictionError::NoActiveModel)?;

        let cache_key = ForecastKey {
            game_id: game.id.clone(),
            version: active.version.clone(),
        };
        self.cache
            .get_or_compute(cache_key, move || self.compute(game, active))
            .await
    }

    async fn compute(
        &self,
        game: Game,
        active: ModelVersion,
    ) -> Result<PredictionResult, PredictionError> {
        let resident = self.resident(&active).await?;

        let features = self.extractor.extract(&game, game.date).await?;
        let output = resident.ensemble.predict(&features)?;
        let prediction = GamePrediction::from_ensemble(output);

        let actual = match (game.home_score, game.away_score) {
            (Some(home), Some(away)) => Some(ActualOutcome::from_scores(home, away)),
            _ => None,
        };

        Ok(PredictionResult {
            game_id: game.id,
            prediction,
            model_version: active.version,
            actual,
        })
    }

    /// The loaded ensemble for the active version. Concurrent first
    /// requests serialize on the load gate and load the artifacts once;
    /// a version change evicts superseded cache entries.
    async fn resident(
        &self,
        active: &ModelVersion,
    ) -> Result<Arc<ResidentEnsemble>, PredictionError> {
        if let Some(resident) = self.resident_for(&active.version) {
            return Ok(resident);
        }

        let _gate = self.load_gate.lock().await;
        if let Some(resident) = self.resident_for(&active.version) {
            return Ok(resident);
        }

        info!(version = %active.version, "loading model artifacts");
        let ensemble = GameEnsemble::load(&active.artifacts).map_err(|err| {
            warn!(version = %active.version, error = %err, "model load failed");
            PredictionError::ModelLoad {
                version: active.version.clone(),
                reason: err.to_string(),
            }
        })?;
        let resident = Arc::new(ResidentEnsemble {
            version: active.version.clone(),
            ensemble,
        });

        match self.resident.write() {
            Ok(mut guard) => *guard = Some(resident.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(resident.clone()),
        }
        self.cache.retain_version(&active.version);
        Ok(resident)
    }

    fn resident_for(&self, version: &str) -> Option<Arc<ResidentEnsemble>> {
        let guard = match self.resident.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().filter(|r| r.version == version).cloned()
    }
}
