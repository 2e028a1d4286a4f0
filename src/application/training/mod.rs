pub mod dataset;
pub mod run;

pub use dataset::{DatasetBuilder, TrainingDataset, TrainingExample};
pub use run::{Trainer, TrainingReport};
