pub mod loop_fn;
pub mod predictor;
pub mod smoother;
pub mod throttle;

pub use loop_fn::{InferenceLoop, LoopState, TickOutcome};
pub use predictor::{classify, predict_embedding, Prediction};
pub use smoother::PredictionSmoother;
pub use throttle::Throttle;
