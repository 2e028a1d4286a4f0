pub mod memory;
pub mod persistence;
pub mod sample_data;

pub use memory::{InMemoryHistoryStore, InMemoryModelRegistry};
pub use persistence::Database;
