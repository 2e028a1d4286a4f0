use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive span of seasons a model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRange {
    pub start_season: u16,
    pub end_season: u16,
}

impl SeasonRange {
    pub fn new(start_season: u16, end_season: u16) -> Self {
        Self {
            start_season,
            end_season,
        }
    }
}

impl fmt::Display for SeasonRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_season, self.end_season)
    }
}

/// Held-out evaluation metrics recorded at training time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub winner_accuracy: f64,
    pub spread_mae: f64,
    pub total_mae: f64,
}

/// Filesystem locations of the three serialized sub-models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub winner: String,
    pub spread: String,
    pub total: String,
}

/// One registered training run. At most one version is active at a time;
/// the registry enforces that on insert and activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub seasons: SeasonRange,
    pub training_samples: usize,
    pub metrics: EvaluationMetrics,
    pub artifacts: ArtifactPaths,
    pub is_active: bool,
}

impl ModelVersion {
    /// Timestamp-derived identifier, e.g. `v20251103_141242`.
    pub fn version_id(created_at: DateTime<Utc>) -> String {
        format!("v{}", created_at.format("%Y%m%d_%H%M%S"))
    }
}

/// Summary of the active model, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub training_range: SeasonRange,
    pub training_samples: usize,
    pub metrics: EvaluationMetrics,
}

impl From<ModelVersion> for ModelInfo {
    fn from(version: ModelVersion) -> Self {
        Self {
            version: version.version,
            created_at: version.created_at,
            training_range: version.seasons,
            training_samples: version.training_samples,
            metrics: version.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_version_id_matches_timestamp_layout() {
        let at = Utc.with_ymd_and_hms(2025, 11, 3, 14, 12, 42).unwrap();
        assert_eq!(ModelVersion::version_id(at), "v20251103_141242");
    }

    #[test]
    fn test_info_carries_registry_fields() {
        let at = Utc.with_ymd_and_hms(2025, 11, 3, 14, 12, 42).unwrap();
        let version = ModelVersion {
            version: ModelVersion::version_id(at),
            created_at: at,
            seasons: SeasonRange::new(2022, 2024),
            training_samples: 612,
            metrics: EvaluationMetrics {
                winner_accuracy: 0.64,
                spread_mae: 9.8,
                total_mae: 11.2,
            },
            artifacts: ArtifactPaths {
                winner: "models/winner_v20251103_141242.json".into(),
                spread: "models/spread_v20251103_141242.json".into(),
                total: "models/total_v20251103_141242.json".into(),
            },
            is_active: true,
        };
        let info = ModelInfo::from(version);
        assert_eq!(info.version, "v20251103_141242");
        assert_eq!(info.training_range.to_string(), "2022-2024");
        assert_eq!(info.training_samples, 612);
    }
}
