//! Document AST shared between the Markdown front end and the HWPX emitter.
//!
//! The variant set is closed and fixed by design: the emitter dispatches on
//! it with a single `match` rather than a trait object, and unrecognized
//! variants are skipped rather than treated as an error.

pub mod block;
pub mod document;
pub mod inline;

pub use block::{Alignment, Block, ColumnSpec, ColumnWidth, TableCell, TableRow};
pub use document::{Document, DocumentMeta};
pub use inline::{ImageAttrs, Inline};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
