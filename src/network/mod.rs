pub mod metadata;
pub mod network;
pub mod spec;

pub use metadata::ModelMetadata;
pub use network::ClassifierHead;
pub use spec::{HeadSpec, LayerSpec};
