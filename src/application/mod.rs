// Leakage-free feature extraction
pub mod features;

// Ensemble fit and inference
pub mod ml;

// Dataset assembly and training runs
pub mod training;

// Serving: cache, model residency, batch prediction
pub mod prediction;
