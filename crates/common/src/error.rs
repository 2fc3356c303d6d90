//! Error types shared across panelfeed crates.

use std::path::PathBuf;

/// Top-level error type for panelfeed operations.
#[derive(Debug, thiserror::Error)]
pub enum PanelfeedError {
    /// No transport connection exists when streaming was requested.
    #[error("Transport unavailable: {message}")]
    TransportUnavailable { message: String },

    /// A chunk write failed mid-stream. Terminal for the session.
    #[error("Transport write failed: {message}")]
    TransportWrite { message: String },

    #[error("No source loaded")]
    NoSourceLoaded,

    /// The source is already leased by another driver.
    #[error("Source is busy: another stream or export holds it")]
    SourceBusy,

    #[error("Seek to {position_secs:.3}s failed: {message}")]
    Seek { position_secs: f64, message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Transform error: {message}")]
    Transform { message: String },

    #[error("Stream error: {message}")]
    Stream { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PanelfeedError.
pub type PanelfeedResult<T> = Result<T, PanelfeedError>;

impl PanelfeedError {
    pub fn transport_unavailable(msg: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            message: msg.into(),
        }
    }

    pub fn transport_write(msg: impl Into<String>) -> Self {
        Self::TransportWrite {
            message: msg.into(),
        }
    }

    pub fn seek(position_secs: f64, msg: impl Into<String>) -> Self {
        Self::Seek {
            position_secs,
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform {
            message: msg.into(),
        }
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Short status line suitable for showing to a user.
    pub fn status_message(&self) -> String {
        match self {
            Self::TransportUnavailable { .. } => format!("Please connect to the panel first ({self})"),
            Self::NoSourceLoaded => "Please select a video file".to_string(),
            Self::TransportWrite { message } => format!("Streaming error: {message}"),
            Self::Export { message } => format!("Error converting video: {message}"),
            _ => self.to_string(),
        }
    }
}
