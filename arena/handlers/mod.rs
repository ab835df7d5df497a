pub mod model;
pub mod predict;
pub mod samples;
pub mod session;
pub mod train;
pub mod train_sse;
