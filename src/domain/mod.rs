// League entities and game records
pub mod types;

// Feature schema for the model inputs
pub mod features;

// Prediction results and confidence tiers
pub mod prediction;

// Trained model metadata
pub mod model_version;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
