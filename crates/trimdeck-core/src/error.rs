//! Error types for Trimdeck.

use thiserror::Error;

/// Main error type for Trimdeck operations.
///
/// Every failure is local to the editing session: load and export return
/// these as values and the host renders them as status text.
#[derive(Error, Debug)]
pub enum TrimdeckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported or corrupt media. No session is created.
    #[error("Decode failed: {0}")]
    DecodeFailure(String),

    /// The external encoder could not be started.
    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// A trim range broke `0 <= in < out <= duration`.
    #[error("Invalid trim state: in={in_point:.3}s out={out_point:.3}s duration={duration:.3}s")]
    InvalidTrimState {
        in_point: f64,
        out_point: f64,
        duration: f64,
    },

    /// The external encoder failed while processing. Session state is untouched.
    #[error("Export failed: {0}")]
    ExportFailure(String),

    /// Nothing to export (every track is muted).
    #[error("Export disabled: {0}")]
    ExportDisabled(String),

    #[error("No media loaded")]
    NoMedia,

    #[error("Audio graph error: {0}")]
    AudioGraph(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TrimdeckError {
    /// Short status line for the host UI.
    pub fn status_text(&self) -> String {
        match self {
            Self::ExportFailure(reason) => format!("Export failed: {reason}"),
            Self::DecodeFailure(_) => "Audio decode failed".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for Trimdeck operations.
pub type Result<T> = std::result::Result<T, TrimdeckError>;
