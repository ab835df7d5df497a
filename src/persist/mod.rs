pub mod kv;
pub mod model_store;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use model_store::{load_pair, save_pair, ModelArtifact, ModelFiles, ModelSource, ModelStore, WeightEntry};
