//! Error types for the threat analysis pipeline

use thiserror::Error;

/// Result type alias for the analysis pipeline
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur during video analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Frame payload could not be decoded. Recoverable: the frame is skipped
    /// and processing continues.
    #[error("Frame decode failed: {0}")]
    FrameDecode(String),

    /// Detector failure. Fatal for the current unit of work (one frame in
    /// streaming mode, the whole video in batch mode).
    #[error("Detector failed: {0}")]
    Detector(String),

    /// Associator failure. Fatal for the current unit of work.
    #[error("Association failed: {0}")]
    Associator(String),

    #[error("Report invariant violated: {0}")]
    Report(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Streaming session closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn frame_decode<S: Into<String>>(msg: S) -> Self {
        Self::FrameDecode(msg.into())
    }

    pub fn detector<S: Into<String>>(msg: S) -> Self {
        Self::Detector(msg.into())
    }

    pub fn associator<S: Into<String>>(msg: S) -> Self {
        Self::Associator(msg.into())
    }

    pub fn report<S: Into<String>>(msg: S) -> Self {
        Self::Report(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Whether processing may continue with the next frame after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FrameDecode(_))
    }
}
