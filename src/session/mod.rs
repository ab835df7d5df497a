pub mod session;
pub mod status;

pub use session::{GestureSession, DATASET_FILE};
pub use status::{GestureCount, SampleReport, SessionSnapshot, Status};
