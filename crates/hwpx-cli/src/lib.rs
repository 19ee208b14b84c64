//! hwpx-cli - Command-line interface library
//!
//! This library provides the CLI functionality for `hwpx-cli`:
//! - Parses a Markdown file (with optional YAML frontmatter) into the
//!   shared intermediate document tree.
//! - Converts it to HWPX against a reference template, defaulting to a
//!   packaged blank template when none is given.
//! - Also supports `.json` (the parsed AST) and `.html` (a plain,
//!   template-free render) output, for inspecting a conversion without an
//!   HWPX-capable viewer.
//!
//! # Library Usage
//!
//! ```ignore
//! use hwpx_cli::{run_cli, convert_command};
//!
//! // Run the full CLI
//! run_cli();
//!
//! // Or drive a conversion programmatically
//! convert_command(&input, &output, reference_doc.as_deref())?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! hwpx-cli document.md -o document.hwpx -r template.hwpx
//! hwpx-cli document.md -o document.json
//! hwpx-cli document.md -o document.html
//! ```

pub mod app;
pub mod blank_template;
pub mod html;

pub use app::{convert_command, run_cli};
