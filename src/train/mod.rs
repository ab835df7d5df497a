pub mod early_stop;
pub mod epoch_stats;
pub mod loop_fn;
pub mod train_config;
pub mod trainer;

pub use early_stop::EarlyStopping;
pub use epoch_stats::{EpochStats, TrainEvent, TrainingStats};
pub use loop_fn::{train_loop, TrainOutcome};
pub use train_config::{batch_size_for, TrainConfig};
pub use trainer::{ClassifierTrainer, TrainingJob, TrainingReport};
