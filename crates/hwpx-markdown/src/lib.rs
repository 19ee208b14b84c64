//! # hwpx-markdown
//!
//! Markdown and YAML-frontmatter parsing into the shared [`hwpx_ast::Document`]
//! tree consumed by `hwpx-convert`.
//!
//! A conversion starts here: [`frontmatter::extract`] splits an optional
//! leading `---`-delimited YAML block off the input and parses it into a
//! [`hwpx_ast::DocumentMeta`]; [`builder::parse_blocks`] then parses the
//! remaining Markdown body (CommonMark plus GFM tables, strikethrough, and
//! footnotes, via `pulldown-cmark`) into the block/inline tree; and
//! [`builder::into_document`] joins the two, falling back to the first
//! top-level heading for the title when frontmatter supplied none.
//!
//! ```
//! let input = "---\ntitle: Hello\n---\n\n# Hello\n\nworld\n";
//! let (meta, body) = hwpx_markdown::frontmatter::extract(input).unwrap();
//! let blocks = hwpx_markdown::builder::parse_blocks(body);
//! let doc = hwpx_markdown::builder::into_document(meta, blocks);
//! assert_eq!(doc.metadata.title.as_deref(), Some("Hello"));
//! ```

pub mod builder;
pub mod error;
pub mod frontmatter;

pub use error::{MarkdownError, Result};
