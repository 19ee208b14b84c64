//! Error taxonomy for the conversion pipeline.
//!
//! Each variant corresponds to one of the kinds named in the error handling
//! design: `Image` is recovered locally by the emitter (a warning plus a
//! placeholder run) and never escapes a successful conversion; the rest are
//! fatal and propagate to the caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// Missing/corrupt template, missing required entries, malformed
    /// header or section XML.
    #[error("template error: {0}")]
    Template(String),

    /// Outline-level gap, or a dirty Normal character property.
    #[error("style error: {0}")]
    Style(String),

    /// Image I/O or decode failure. Recovered locally by the emitter; kept
    /// in this enum so call sites that surface an image failure can still
    /// use `?` before downgrading it to a warning.
    #[error("image error: {0}")]
    Image(String),

    /// Input/template size exceeded, or an image path is absolute / escapes
    /// its base directory.
    #[error("security error: {0}")]
    Security(String),

    /// Unexpected AST shape or a broken invariant mid-emit.
    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    pub fn style(msg: impl Into<String>) -> Self {
        Self::Style(msg.into())
    }

    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    pub fn security(msg: impl Into<String>) -> Self {
        Self::Security(msg.into())
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }
}
