pub mod cache;
pub mod service;

pub use cache::{ForecastCache, ForecastKey};
pub use service::PredictionService;
