//! Integration tests for `hwpx-cli`
//!
//! These drive the full `convert_command` path end to end: write a
//! Markdown fixture to a temp directory, convert it, and inspect the
//! produced file.

use std::io::Read;

use hwpx_cli::convert_command;
use tempfile::tempdir;

#[test]
fn converts_markdown_to_hwpx_using_the_packaged_blank_template() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    std::fs::write(
        &input,
        "---\ntitle: Quarterly Report\n---\n\n# Quarterly Report\n\nRevenue was **up** this quarter.\n",
    )
    .unwrap();
    let output = dir.path().join("doc.hwpx");

    convert_command(&input, &output, None).expect("conversion should succeed");

    let file = std::fs::File::open(&output).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut section0 = String::new();
    archive
        .by_name("Contents/section0.xml")
        .unwrap()
        .read_to_string(&mut section0)
        .unwrap();
    assert!(section0.contains("Quarterly Report"));
    assert!(section0.contains("Revenue was"));

    let mut manifest = String::new();
    archive
        .by_name("Contents/content.hpf")
        .unwrap()
        .read_to_string(&mut manifest)
        .unwrap();
    assert!(manifest.contains("Quarterly Report"));
}

#[test]
fn converts_markdown_with_a_custom_reference_template() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    std::fs::write(&input, "# Hello\n\nworld\n").unwrap();
    let output = dir.path().join("doc.hwpx");
    let template_path = dir.path().join("template.hwpx");
    std::fs::write(&template_path, hwpx_cli::blank_template::blank_hwpx_bytes()).unwrap();

    convert_command(&input, &output, Some(&template_path)).expect("conversion should succeed");
    assert!(output.exists());
}

#[test]
fn writes_json_output_with_the_parsed_ast() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    std::fs::write(&input, "# Title\n\nSome *emphasis* text.\n").unwrap();
    let output = dir.path().join("doc.json");

    convert_command(&input, &output, None).unwrap();

    let json = std::fs::read_to_string(&output).unwrap();
    let doc: hwpx_ast::Document = serde_json::from_str(&json).unwrap();
    assert_eq!(doc.metadata.title.as_deref(), Some("Title"));
}

#[test]
fn writes_html_output_without_touching_any_template() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    std::fs::write(&input, "# Title\n\nHello **world**\n").unwrap();
    let output = dir.path().join("doc.html");

    convert_command(&input, &output, None).unwrap();

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("<h1>Title</h1>"));
    assert!(html.contains("<strong>world</strong>"));
}

#[test]
fn rejects_non_markdown_input_extensions() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.txt");
    std::fs::write(&input, "not markdown\n").unwrap();
    let output = dir.path().join("doc.hwpx");

    let err = convert_command(&input, &output, None).unwrap_err();
    assert!(err.to_string().contains(".md"));
}

#[test]
fn rejects_unsupported_output_extensions() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    std::fs::write(&input, "# Title\n").unwrap();
    let output = dir.path().join("doc.pdf");

    let err = convert_command(&input, &output, None).unwrap_err();
    assert!(err.to_string().contains("unsupported output extension"));
}

#[test]
fn rejects_a_missing_input_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("missing.md");
    let output = dir.path().join("doc.hwpx");

    assert!(convert_command(&input, &output, None).is_err());
}
