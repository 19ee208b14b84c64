//! Error types for diagram rendering.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("diagram rendering is not available (kroki feature disabled)")]
    Disabled,

    #[cfg(feature = "kroki")]
    #[error("Kroki request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Kroki server returned {status}: {message}")]
    ServerError { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, DiagramError>;
