//! # Error Types
//!
//! Error definitions shared by all pipeline stages.

use thiserror::Error;

/// Errors produced by the dubbing pipeline core.
#[derive(Debug, Error)]
pub enum DublineError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WAV encoding error
    #[error("WAV encoding error: {0}")]
    WavEncoding(#[from] hound::Error),

    /// WAV decoding error
    #[error("WAV decoding error: {0}")]
    WavDecoding(hound::Error),

    /// Audio decoding or processing error
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Sample rate conversion error
    #[error("Resampling error: {0}")]
    Resampling(String),

    /// The input container or sample format is not supported
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The source video duration could not be determined
    #[error("Unknown video duration: {0}")]
    UnknownDuration(String),

    /// Any other error
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, DublineError>;
