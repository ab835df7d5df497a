use thiserror::Error;

pub type Result<T> = std::result::Result<T, GestureError>;

/// Coarse classification used at operation boundaries to decide whether the
/// session status moves to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something the current state does not allow.
    /// Nothing was mutated.
    Precondition,
    /// Camera, extractor, detector or storage failed.
    ExternalResource,
    /// Malformed tensors or numerical failure during fit/predict.
    Computation,
}

#[derive(Debug, Error)]
pub enum GestureError {
    #[error("need at least {required} samples before training, have {actual}")]
    InsufficientSamples { required: usize, actual: usize },
    #[error("no classifier has been trained or loaded")]
    ModelMissing,
    #[error("no encoded dataset yet; train once first")]
    DatasetNotEncoded,
    #[error("a training run is already in progress")]
    TrainingInProgress,

    #[error("camera unavailable: {0}")]
    Camera(String),
    #[error("feature extractor failed: {0}")]
    Extractor(String),
    #[error("hand detector failed: {0}")]
    HandDetector(String),
    #[error("model store failed: {0}")]
    ModelStore(String),
    #[error("could not load a model from any source ({})", attempts.join("; "))]
    ModelUnavailable { attempts: Vec<String> },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("embedding has {got} values, expected {expected}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("label {label} is out of range for {num_classes} classes")]
    LabelOutOfRange { label: usize, num_classes: usize },
    #[error("training failed: {0}")]
    TrainingFailed(String),
    #[error("prediction failed: {0}")]
    PredictionFailed(String),
}

impl GestureError {
    pub fn kind(&self) -> ErrorKind {
        use GestureError::*;
        match self {
            InsufficientSamples { .. } | ModelMissing | DatasetNotEncoded | TrainingInProgress => {
                ErrorKind::Precondition
            }
            Camera(_) | Extractor(_) | HandDetector(_) | ModelStore(_) | ModelUnavailable { .. }
            | Io(_) | Json(_) | Image(_) => ErrorKind::ExternalResource,
            ShapeMismatch { .. } | LabelOutOfRange { .. } | TrainingFailed(_) | PredictionFailed(_) => {
                ErrorKind::Computation
            }
        }
    }
}
