pub mod export;
pub mod store;

pub use export::DatasetExport;
pub use store::ExampleStore;
