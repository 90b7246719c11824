//! Error types for Posecoach

use thiserror::Error;

/// Errors that can occur while processing frames, references or configuration
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid landmark set: {0}")]
    InvalidLandmarks(String),

    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("Unknown yoga pose: {0}")]
    UnknownPose(String),

    #[error("Pose classifier not available")]
    ClassifierUnavailable,

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Reference format error: {0}")]
    ReferenceFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid session state: {0}")]
    SessionState(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, PipelineError>;
