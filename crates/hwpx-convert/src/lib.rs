//! # hwpx-convert
//!
//! Markdown-to-HWPX conversion: template introspection, style derivation,
//! block emission and the HWPX container writer.
//!
//! A conversion has three phases, each its own module:
//!
//! 1. [`style_registry`] parses the reference template's `header.xml` into a
//!    [`StyleRegistry`] that can derive new `charPr`/`paraPr`/`numbering`
//!    entries on demand, content-addressed so repeated requests for the same
//!    formatting/alignment/nesting combination are only materialized once.
//! 2. [`template`] scans the template's `section0.xml` for the `{{...}}`
//!    placeholder vocabulary, recording the styling each placeholder carries
//!    in a [`TemplateIntrospector`].
//! 3. [`emitter`] walks the [`hwpx_ast::Document`] and produces the body XML,
//!    consulting the registry and introspector as it goes.
//!
//! [`container`] then reads the reference template ZIP, swaps in the new
//! body/header/images/manifest, and writes the output HWPX.
//!
//! ```no_run
//! use std::fs::File;
//! use hwpx_convert::{convert_to_hwpx, Template};
//! use hwpx_ast::Document;
//!
//! # fn run() -> hwpx_convert::Result<()> {
//! let template = Template::open(File::open("blank.hwpx")?)?;
//! let doc = Document::new();
//! let output = File::create("out.hwpx")?;
//! convert_to_hwpx(&doc, &template, None, &Default::default(), output)?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod container;
pub mod counter;
pub mod emitter;
pub mod error;
pub mod image;
pub mod style_registry;
pub mod template;
pub mod xmltree;

use std::io::{Seek, Write};
use std::path::Path;

pub use constants::ConversionConfig;
pub use container::Template;
pub use emitter::Emitter;
pub use error::{ConvertError, Result};
pub use image::EmbeddedImage;
pub use style_registry::StyleRegistry;
pub use template::TemplateIntrospector;

/// Runs a complete conversion: derives the style registry and template
/// introspection from `template`, walks `doc` through the [`Emitter`], and
/// writes the resulting HWPX to `writer`.
///
/// `base_dir` anchors relative image paths in the document (typically the
/// directory the source Markdown file lives in); `None` means image paths
/// are resolved relative to the process's current directory.
pub fn convert_to_hwpx<W: Write + Seek>(
    doc: &hwpx_ast::Document,
    template: &Template,
    base_dir: Option<&Path>,
    config: &ConversionConfig,
    writer: W,
) -> Result<()> {
    let mut registry = StyleRegistry::new(&template.header_xml()?)?;
    let introspector = TemplateIntrospector::new(&template.section0_xml()?, &registry)?;

    let (body_xml, images) = {
        let mut emitter = Emitter::new(&mut registry, &introspector, config, base_dir);
        let body = emitter.emit_document(doc)?;
        (body, emitter.into_images())
    };

    registry.finalize_item_counts();
    let header_xml = registry.into_header_xml();
    let title = doc.metadata.title.as_deref();
    container::write(writer, template, &body_xml, &header_xml, &images, title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwpx_ast::{Block, Document, Inline};
    use std::io::Cursor;

    fn minimal_template_bytes() -> Vec<u8> {
        use zip::write::ZipWriter;
        use zip::CompressionMethod;

        let header = r#"<hh:head xmlns:hh="http://www.hancom.co.kr/hwpml/2011/head" xmlns:hc="http://www.hancom.co.kr/hwpml/2011/core">
            <hh:charProperties itemCnt="1"><hh:charPr id="0"/></hh:charProperties>
            <hh:paraProperties itemCnt="1"><hh:paraPr id="1"><hc:margin><hc:left value="0"/></hc:margin></hh:paraPr></hh:paraProperties>
            <hh:styles><hh:style id="0" paraPrIDRef="1" charPrIDRef="0"/></hh:styles>
            <hh:borderFills itemCnt="0"/>
        </hh:head>"#;
        let section = r#"<?xml version="1.0"?><hs:sec xmlns:hs="urn:sec" xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph">
            <hp:p paraPrIDRef="1" styleIDRef="0"><hp:run charPrIDRef="0"><hp:t>{{BODY}}</hp:t></hp:run></hp:p>
        </hs:sec>"#;
        let manifest = r#"<opf:package><opf:metadata><opf:title>Old</opf:title></opf:metadata><opf:manifest></opf:manifest></opf:package>"#;

        let mut buf = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("Contents/header.xml", options).unwrap();
        zip.write_all(header.as_bytes()).unwrap();
        zip.start_file("Contents/section0.xml", options).unwrap();
        zip.write_all(section.as_bytes()).unwrap();
        zip.start_file("Contents/content.hpf", options).unwrap();
        zip.write_all(manifest.as_bytes()).unwrap();
        zip.finish().unwrap();
        buf.into_inner()
    }

    #[test]
    fn converts_a_minimal_document_end_to_end() {
        let bytes = minimal_template_bytes();
        let template = Template::open(Cursor::new(bytes)).unwrap();
        let mut doc = Document::with_title("Hello");
        doc.push(Block::Paragraph {
            inlines: vec![Inline::Str("hi there".into())],
        });

        let mut out = Cursor::new(Vec::new());
        convert_to_hwpx(&doc, &template, None, &ConversionConfig::default(), &mut out).unwrap();

        out.set_position(0);
        let mut archive = zip::ZipArchive::new(out).unwrap();
        let mut section0 = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("Contents/section0.xml").unwrap(), &mut section0).unwrap();
        assert!(section0.contains("hi there"));
    }
}
