//! Error taxonomy for the capture pipeline.
//!
//! Every pipeline stage returns one of these. The capture service is the only
//! place that turns them into chat text; the full error goes to the log.

use std::path::PathBuf;

/// Errors raised while turning a message into a note.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("message has no usable text or media")]
    EmptyContent,
    #[error("attachment fetch failed: {0}")]
    Fetch(String),
    #[error("could not write {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    Validation(String),
}

impl CaptureError {
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaptureError::Persist {
            path: path.into(),
            source,
        }
    }

    /// Short, non-technical text shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::EmptyContent => {
                "⚠️ Nothing to save: send some text or a photo."
            }
            CaptureError::Fetch(_) => {
                "⚠️ Could not download the attachment. The capture was cancelled, please try again."
            }
            CaptureError::Persist { .. } => {
                "⚠️ Could not save the note. The capture was cancelled."
            }
            CaptureError::Validation(_) => {
                "⚠️ That input was not understood. The capture was cancelled."
            }
        }
    }
}

/// Errors raised by a chat transport.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
}

/// Errors raised while loading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set; add it to the environment or a .env file")]
    Missing(&'static str),
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}
