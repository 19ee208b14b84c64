//! Error type for frontmatter and Markdown parsing failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkdownError {
    #[error("frontmatter is not valid YAML: {0}")]
    Frontmatter(#[from] serde_yaml::Error),

    #[error("{0}")]
    Structure(String),
}

pub type Result<T> = std::result::Result<T, MarkdownError>;

impl MarkdownError {
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure(message.into())
    }
}
