//! The three-model game ensemble.
//!
//! One fitted ensemble holds a winner forest, a spread forest, and a total
//! ridge regression, each bundled with the scaler it was fitted behind.
//! Artifacts serialize with serde_json one file per sub-model, named
//! `winner_<version>.json`, `spread_<version>.json`, `total_<version>.json`.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{RidgeRegression, RidgeRegressionParameters};
use tracing::info;

use crate::application::ml::scaler::FeatureScaler;
use crate::application::training::dataset::TrainingExample;
use crate::config::Config;
use crate::domain::errors::TrainingError;
use crate::domain::features::GameFeatureVector;
use crate::domain::model_version::ArtifactPaths;
use crate::domain::prediction::EnsembleOutput;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Ridge = RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Hyperparameters for one training run.
#[derive(Debug, Clone)]
pub struct FitParams {
    pub trees: usize,
    pub max_depth: u16,
    pub min_split: usize,
    pub ridge_alpha: f64,
}

impl FitParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            trees: config.forest_trees,
            max_depth: config.forest_max_depth,
            min_split: config.forest_min_split,
            ridge_alpha: config.ridge_alpha,
        }
    }
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 10,
            min_split: 5,
            ridge_alpha: 1.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ForestArtifact {
    scaler: FeatureScaler,
    model: Forest,
}

#[derive(Debug, Serialize, Deserialize)]
struct RidgeArtifact {
    scaler: FeatureScaler,
    model: Ridge,
}

#[derive(Debug)]
pub struct GameEnsemble {
    winner: ForestArtifact,
    spread: ForestArtifact,
    total: RidgeArtifact,
}

impl GameEnsemble {
    /// Fits all three sub-models on the same scaled matrix. The winner
    /// forest regresses the 0/1 home-win indicator; averaging its trees
    /// gives the probability estimate.
    pub fn fit(examples: &[TrainingExample], params: &FitParams) -> Result<Self, TrainingError> {
        if examples.is_empty() {
            return Err(TrainingError::Fit {
                reason: "cannot fit on zero examples".to_string(),
            });
        }

        let raw: Vec<Vec<f64>> = examples.iter().map(|e| e.features.to_vec()).collect();
        let scaler = FeatureScaler::fit(&raw);
        let matrix = matrix_from(&scaler.transform(&raw))
            .map_err(|reason| TrainingError::Fit { reason })?;

        let home_wins: Vec<f64> = examples.iter().map(|e| e.home_win).collect();
        let spreads: Vec<f64> = examples.iter().map(|e| e.spread).collect();
        let totals: Vec<f64> = examples.iter().map(|e| e.total).collect();

        let forest_params = || {
            RandomForestRegressorParameters::default()
                .with_n_trees(params.trees)
                .with_max_depth(params.max_depth)
                .with_min_samples_split(params.min_split)
        };

        info!(
            examples = examples.len(),
            trees = params.trees,
            max_depth = params.max_depth,
            "fitting game ensemble"
        );

        let winner = RandomForestRegressor::fit(&matrix, &home_wins, forest_params())
            .map_err(|e| TrainingError::Fit {
                reason: format!("winner forest: {}", e),
            })?;
        let spread = RandomForestRegressor::fit(&matrix, &spreads, forest_params())
            .map_err(|e| TrainingError::Fit {
                reason: format!("spread forest: {}", e),
            })?;
        let total = RidgeRegression::fit(
            &matrix,
            &totals,
            RidgeRegressionParameters::default().with_alpha(params.ridge_alpha),
        )
        .map_err(|e| TrainingError::Fit {
            reason: format!("total ridge: {}", e),
        })?;

        Ok(Self {
            winner: ForestArtifact {
                scaler: scaler.clone(),
                model: winner,
            },
            spread: ForestArtifact {
                scaler: scaler.clone(),
                model: spread,
            },
            total: RidgeArtifact {
                scaler,
                model: total,
            },
        })
    }

    pub fn predict(&self, features: &GameFeatureVector) -> Result<EnsembleOutput> {
        let outputs = self.predict_many(std::slice::from_ref(features))?;
        outputs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("ensemble returned no prediction"))
    }

    /// Batch inference; rows come back in input order.
    pub fn predict_many(&self, inputs: &[GameFeatureVector]) -> Result<Vec<EnsembleOutput>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<Vec<f64>> = inputs.iter().map(|v| v.to_vec()).collect();

        let probabilities = forest_outputs(&self.winner, &raw).context("winner forest")?;
        let spreads = forest_outputs(&self.spread, &raw).context("spread forest")?;
        let totals = ridge_outputs(&self.total, &raw).context("total ridge")?;

        Ok(probabilities
            .into_iter()
            .zip(spreads)
            .zip(totals)
            .map(|((probability, spread), total)| EnsembleOutput {
                home_win_probability: probability.clamp(0.0, 1.0),
                spread,
                total,
            })
            .collect())
    }

    /// Writes the three artifact files for `version` under `dir`.
    pub fn save(&self, dir: &Path, version: &str) -> Result<ArtifactPaths, TrainingError> {
        fs::create_dir_all(dir)?;
        let paths = ArtifactPaths {
            winner: artifact_path(dir, "winner", version),
            spread: artifact_path(dir, "spread", version),
            total: artifact_path(dir, "total", version),
        };
        write_artifact(&paths.winner, &self.winner)?;
        write_artifact(&paths.spread, &self.spread)?;
        write_artifact(&paths.total, &self.total)?;
        info!(version, dir = %dir.display(), "saved model artifacts");
        Ok(paths)
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        Ok(Self {
            winner: read_artifact(&paths.winner).context("winner artifact")?,
            spread: read_artifact(&paths.spread).context("spread artifact")?,
            total: read_artifact(&paths.total).context("total artifact")?,
        })
    }
}

fn matrix_from(rows: &Vec<Vec<f64>>) -> Result<DenseMatrix<f64>, String> {
    DenseMatrix::from_2d_vec(rows).map_err(|e| format!("matrix build failed: {}", e))
}

fn forest_outputs(artifact: &ForestArtifact, raw: &[Vec<f64>]) -> Result<Vec<f64>> {
    let matrix = matrix_from(&artifact.scaler.transform(raw)).map_err(|e| anyhow!(e))?;
    artifact
        .model
        .predict(&matrix)
        .map_err(|e| anyhow!("prediction failed: {}", e))
}

fn ridge_outputs(artifact: &RidgeArtifact, raw: &[Vec<f64>]) -> Result<Vec<f64>> {
    let matrix = matrix_from(&artifact.scaler.transform(raw)).map_err(|e| anyhow!(e))?;
    artifact
        .model
        .predict(&matrix)
        .map_err(|e| anyhow!("prediction failed: {}", e))
}

fn artifact_path(dir: &Path, family: &str, version: &str) -> String {
    dir.join(format!("{family}_{version}.json"))
        .to_string_lossy()
        .into_owned()
}

fn write_artifact<T: Serialize>(path: &str, artifact: &T) -> Result<(), TrainingError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), artifact)?;
    Ok(())
}

fn read_artifact<T: DeserializeOwned>(path: &str) -> Result<T> {
    let file = File::open(path).with_context(|| format!("open {path}"))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("decode {path}"))
}
