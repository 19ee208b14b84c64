//! Mermaid diagram rasterization, for embedding fenced ```mermaid``` code
//! blocks as images in a converted document.
//!
//! Rendering happens through [Kroki](https://kroki.io), the only diagram
//! service this crate knows how to talk to. There is no native renderer:
//! the source system always falls back to plain text on failure rather than
//! attempting a local render, so that is the only fallback implemented here.
//! Build without the `kroki` feature to drop the network-capable dependency
//! entirely; [`render_mermaid_png`] then always returns
//! [`DiagramError::Disabled`].

pub mod error;
pub mod kroki;

pub use error::{DiagramError, Result};
pub use kroki::render_mermaid_png;
