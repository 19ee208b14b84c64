//! The Container Writer: reads a reference HWPX (a ZIP of XML parts) and
//! produces the output HWPX by swapping in the converted `section0.xml`,
//! the mutated `header.xml`, embedded images under `BinData/`, and an
//! updated `content.hpf` manifest. Every other part of the template is
//! copied through unchanged.

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::error::{ConvertError, Result};
use crate::image::EmbeddedImage;

const SECTION0_PATH: &str = "Contents/section0.xml";
const HEADER_PATH: &str = "Contents/header.xml";
const MANIFEST_PATH: &str = "Contents/content.hpf";

/// The reference template, held as a flat map of archive member name to
/// raw bytes so the writer can copy unrelated parts through untouched.
pub struct Template {
    files: HashMap<String, Vec<u8>>,
}

impl Template {
    pub fn open<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(ConvertError::from)?;
        let mut files = HashMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(ConvertError::from)?;
            if entry.name().ends_with('/') {
                continue;
            }
            let name = entry.name().to_string();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }
        if !files.contains_key(SECTION0_PATH) || !files.contains_key(HEADER_PATH) {
            return Err(ConvertError::template(format!(
                "template is missing required entries: {SECTION0_PATH}, {HEADER_PATH}"
            )));
        }
        Ok(Self { files })
    }

    pub fn header_xml(&self) -> Result<String> {
        self.text(HEADER_PATH)
    }

    pub fn section0_xml(&self) -> Result<String> {
        self.text(SECTION0_PATH)
    }

    fn text(&self, path: &str) -> Result<String> {
        let bytes = self
            .files
            .get(path)
            .ok_or_else(|| ConvertError::template(format!("missing template entry: {path}")))?;
        String::from_utf8(bytes.clone())
            .map_err(|e| ConvertError::template(format!("{path} is not valid UTF-8: {e}")))
    }
}

/// Writes the final HWPX ZIP: the converted body inserted into the
/// template's `section0.xml` wrapper, the mutated header, newly embedded
/// images, and a manifest naming them.
pub fn write<W: Write + Seek>(
    writer: W,
    template: &Template,
    body_xml: &str,
    new_header_xml: &str,
    images: &[EmbeddedImage],
    title: Option<&str>,
) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let options = zip::write::SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut names: Vec<&String> = template.files.keys().collect();
    names.sort();

    for name in names {
        let contents = &template.files[name];
        match name.as_str() {
            SECTION0_PATH => {
                let rewritten = rewrite_section0(&String::from_utf8_lossy(contents), body_xml)?;
                zip.start_file(name, options)?;
                zip.write_all(rewritten.as_bytes())?;
            }
            HEADER_PATH => {
                zip.start_file(name, options)?;
                zip.write_all(new_header_xml.as_bytes())?;
            }
            MANIFEST_PATH => {
                let rewritten = rewrite_manifest(&String::from_utf8_lossy(contents), images, title);
                zip.start_file(name, options)?;
                zip.write_all(rewritten.as_bytes())?;
            }
            _ => {
                zip.start_file(name, options)?;
                zip.write_all(contents)?;
            }
        }
    }

    for image in images {
        let entry = format!("BinData/{}.{}", image.binary_item_id, image.extension);
        zip.start_file(&entry, options)?;
        zip.write_all(&image.bytes)?;
    }

    zip.finish()?;
    Ok(())
}

/// Splices the converted body between the template's `<hs:sec ...>` open
/// tag (ensuring the `hc`/`hp` namespace declarations it relies on are
/// present) and its closing tag, discarding whatever paragraphs the
/// template itself held.
fn rewrite_section0(original: &str, body_xml: &str) -> Result<String> {
    let sec_start = original
        .find("<hs:sec")
        .ok_or_else(|| ConvertError::template("section0.xml has no <hs:sec> root"))?;
    let tag_close = original[sec_start..]
        .find('>')
        .map(|i| sec_start + i)
        .ok_or_else(|| ConvertError::template("section0.xml has a malformed <hs:sec> tag"))?;
    let mut prefix = original[..=tag_close].to_string();

    if !prefix.contains("xmlns:hc=") {
        prefix.insert_str(
            prefix.len() - 1,
            " xmlns:hc=\"http://www.hancom.co.kr/hwpml/2011/core\"",
        );
    }
    if !prefix.contains("xmlns:hp=") {
        prefix.insert_str(
            prefix.len() - 1,
            " xmlns:hp=\"http://www.hancom.co.kr/hwpml/2011/paragraph\"",
        );
    }

    let suffix = match original.rfind("</hs:sec>") {
        Some(idx) => &original[idx..],
        None => "</hs:sec>",
    };

    Ok(format!("{prefix}\n{body_xml}\n{suffix}"))
}

fn rewrite_manifest(original: &str, images: &[EmbeddedImage], title: Option<&str>) -> String {
    let mut hpf = original.to_string();

    if let Some(title) = title {
        if let (Some(start), Some(end)) = (hpf.find("<opf:title>"), hpf.find("</opf:title>")) {
            let tag_end = start + "<opf:title>".len();
            hpf.replace_range(tag_end..end, &crate::xmltree::escape_text(title));
        }
    }

    if !images.is_empty() {
        let items: Vec<String> = images
            .iter()
            .map(|img| {
                let mime = mime_for_extension(&img.extension);
                format!(
                    r#"<opf:item id="{}" href="BinData/{}.{}" media-type="{}" isEmbeded="1"/>"#,
                    img.binary_item_id, img.binary_item_id, img.extension, mime
                )
            })
            .collect();
        if let Some(pos) = hpf.find("</opf:manifest>") {
            hpf.insert_str(pos, &format!("{}\n", items.join("\n")));
        }
    }

    hpf
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_template_zip() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(HEADER_PATH, options).unwrap();
        zip.write_all(b"<hh:head/>").unwrap();
        zip.start_file(SECTION0_PATH, options).unwrap();
        zip.write_all(br#"<?xml version="1.0"?><hs:sec xmlns:hs="urn:sec"><hp:p/></hs:sec>"#)
            .unwrap();
        zip.start_file(MANIFEST_PATH, options).unwrap();
        zip.write_all(
            br#"<opf:package><opf:metadata><opf:title>Old</opf:title></opf:metadata><opf:manifest></opf:manifest></opf:package>"#,
        )
        .unwrap();
        zip.finish().unwrap();
        buf.into_inner()
    }

    #[test]
    fn round_trips_a_template_with_new_body() {
        let bytes = minimal_template_zip();
        let template = Template::open(Cursor::new(bytes)).unwrap();
        assert!(template.header_xml().unwrap().contains("hh:head"));

        let mut out = Cursor::new(Vec::new());
        write(
            &mut out,
            &template,
            "<hp:p>hello</hp:p>",
            "<hh:head/>",
            &[],
            Some("New Title"),
        )
        .unwrap();

        out.set_position(0);
        let mut archive = ZipArchive::new(out).unwrap();
        let mut section0 = String::new();
        archive
            .by_name(SECTION0_PATH)
            .unwrap()
            .read_to_string(&mut section0)
            .unwrap();
        assert!(section0.contains("hello"));
        assert!(section0.contains("</hs:sec>"));

        let mut manifest = String::new();
        archive
            .by_name(MANIFEST_PATH)
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        assert!(manifest.contains("New Title"));
    }
}
