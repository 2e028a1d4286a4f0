pub mod ensemble;
pub mod scaler;

pub use ensemble::{FitParams, GameEnsemble};
pub use scaler::FeatureScaler;
