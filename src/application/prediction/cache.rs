//! TTL cache for served predictions.
//!
//! Entries are keyed by game and model version, so a version change makes
//! every older entry unreachable without any flush ordering. Concurrent
//! misses on one key collapse into a single computation; failures are
//! never cached.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;
use tracing::error;

use crate::domain::errors::PredictionError;
use crate::domain::prediction::PredictionResult;

/// A cached prediction is only reusable for the exact model version that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForecastKey {
    pub game_id: String,
    pub version: String,
}

struct CacheEntry {
    result: PredictionResult,
    inserted_at: Instant,
}

pub struct ForecastCache {
    ttl: Duration,
    entries: RwLock<HashMap<ForecastKey, CacheEntry>>,
    in_flight: Mutex<HashMap<ForecastKey, Arc<AsyncMutex<()>>>>,
}

impl ForecastCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh entry for `key`, if any. Expired entries read as absent.
    pub fn get(&self, key: &ForecastKey) -> Option<PredictionResult> {
        let guard = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.result.clone())
    }

    pub fn insert(&self, key: ForecastKey, result: PredictionResult) {
        let entry = CacheEntry {
            result,
            inserted_at: Instant::now(),
        };
        match self.entries.write() {
            Ok(mut guard) => {
                guard.insert(key, entry);
            }
            Err(poisoned) => {
                error!("ForecastCache: lock poisoned during insert, recovering");
                poisoned.into_inner().insert(key, entry);
            }
        }
    }

    /// Drops every entry produced by a version other than `version`.
    pub fn retain_version(&self, version: &str) {
        let mut guard = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.retain(|key, _| key.version == version);
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value if fresh, otherwise runs `compute` under a per-key
    /// gate. Waiters re-check the cache after the leader finishes, so one
    /// burst of identical requests costs one computation.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: ForecastKey,
        compute: F,
    ) -> Result<PredictionResult, PredictionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PredictionResult, PredictionError>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let gate = self.gate(&key);
        let guard = gate.lock().await;
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let outcome = compute().await;
        if let Ok(result) = &outcome {
            self.insert(key.clone(), result.clone());
        }
        drop(guard);
        self.release(&key);
        outcome
    }

    fn gate(&self, key: &ForecastKey) -> Arc<AsyncMutex<()>> {
        let mut guard = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.entry(key.clone()).or_default().clone()
    }

    fn release(&self, key: &ForecastKey) {
        let mut guard = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.remove(key);
    }
}
