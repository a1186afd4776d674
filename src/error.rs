//! Error types shared across the crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures at the camera boundary
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open capture device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("device {0} doesn't support video capture")]
    NotCapture(String),

    #[error("failed to configure capture device: {0}")]
    Configure(String),

    #[error("no suitable capture device found")]
    NoDevice,

    #[error("frame read failed: {0}")]
    Read(String),

    #[error("frame decode failed: {0}")]
    Decode(String),
}

/// Failures inside a detection or text-recognition backend. These never
/// cross the provider boundary; providers turn them into degraded results.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to write dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize dump: {0}")]
    Json(#[from] serde_json::Error),
}
