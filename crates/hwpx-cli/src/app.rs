//! CLI application logic
//!
//! Contains the command-line interface implementation: argument parsing
//! and the single conversion command it dispatches to.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use hwpx_convert::{ConversionConfig, Template};

use crate::blank_template::blank_hwpx_bytes;

#[derive(Parser)]
#[command(name = "hwpx-cli")]
#[command(author, version, about = "Convert Markdown into HWPX using a reference template", long_about = None)]
struct Cli {
    /// Input Markdown file (.md or .markdown)
    input: PathBuf,

    /// Output file; extension selects the format (.hwpx, .json, .html)
    #[arg(short, long)]
    output: PathBuf,

    /// Reference HWPX template (defaults to a packaged blank template)
    #[arg(short = 'r', long = "reference-doc")]
    reference_doc: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Error-only logging
    #[arg(short, long)]
    quiet: bool,
}

/// Runs the CLI application: parses arguments, installs the logger, and
/// dispatches to [`convert_command`].
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);
    convert_command(&cli.input, &cli.output, cli.reference_doc.as_deref())
}

fn init_logger(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(level).format_timestamp(None).init();
}

/// Reads `input`, parses it to the shared intermediate document tree, and
/// writes the result to `output` in whatever format its extension selects
/// (§11.1): `.hwpx` runs the full template-driven pipeline, `.json`
/// pretty-prints the parsed AST, `.html`/`.htm` renders a plain HTML
/// document. `reference_doc` names the HWPX template to use for `.hwpx`
/// output; when absent, a packaged blank template is used.
pub fn convert_command(input: &Path, output: &Path, reference_doc: Option<&Path>) -> Result<()> {
    if !matches!(
        input.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("md") | Some("markdown")
    ) {
        bail!("input file must end in .md or .markdown: {}", input.display());
    }
    if !input.exists() {
        bail!("input file not found: {}", input.display());
    }
    let input_len = fs::metadata(input)
        .with_context(|| format!("reading metadata for {}", input.display()))?
        .len();
    if input_len > hwpx_convert::constants::MAX_INPUT_FILE_SIZE {
        bail!(
            "input file exceeds the {} MiB limit: {}",
            hwpx_convert::constants::MAX_INPUT_FILE_SIZE / (1024 * 1024),
            input.display()
        );
    }

    log::info!("reading {}", input.display());
    let source = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;

    let (meta, body) = hwpx_markdown::frontmatter::extract(&source).context("parsing YAML frontmatter")?;
    let blocks = hwpx_markdown::builder::parse_blocks(body);
    let doc = hwpx_markdown::builder::into_document(meta, blocks);

    let base_dir = input.parent().filter(|p| !p.as_os_str().is_empty());

    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "hwpx" => write_hwpx(&doc, output, reference_doc, base_dir)?,
        "json" => write_json(&doc, output)?,
        "html" | "htm" => write_html(&doc, output)?,
        other => bail!("unsupported output extension: .{other} (expected .hwpx, .json, or .html)"),
    }

    log::info!("wrote {}", output.display());
    Ok(())
}

fn write_hwpx(doc: &hwpx_ast::Document, output: &Path, reference_doc: Option<&Path>, base_dir: Option<&Path>) -> Result<()> {
    let template = match reference_doc {
        Some(path) => {
            log::debug!("using reference template {}", path.display());
            let template_len = fs::metadata(path)
                .with_context(|| format!("reading metadata for {}", path.display()))?
                .len();
            if template_len > hwpx_convert::constants::MAX_TEMPLATE_FILE_SIZE {
                bail!(
                    "reference template exceeds the {} MiB limit: {}",
                    hwpx_convert::constants::MAX_TEMPLATE_FILE_SIZE / (1024 * 1024),
                    path.display()
                );
            }
            let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Template::open(file).with_context(|| format!("reading template {}", path.display()))?
        }
        None => {
            log::debug!("no reference template given, using the packaged blank template");
            Template::open(std::io::Cursor::new(blank_hwpx_bytes())).context("building the packaged blank template")?
        }
    };

    let out_file = fs::File::create(output).with_context(|| format!("creating {}", output.display()))?;
    hwpx_convert::convert_to_hwpx(doc, &template, base_dir, &ConversionConfig::default(), out_file)
        .with_context(|| format!("converting {} to HWPX", output.display()))?;
    Ok(())
}

fn write_json(doc: &hwpx_ast::Document, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(doc).context("serializing the document to JSON")?;
    fs::write(output, json).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn write_html(doc: &hwpx_ast::Document, output: &Path) -> Result<()> {
    let html = crate::html::render(doc);
    fs::write(output, html).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}
