//! Builds the bytes of the packaged `blank.hwpx` reference template used
//! when a conversion targets `.hwpx` output and no `-r/--reference-doc` is
//! given.
//!
//! There is no binary asset checked into the repository; the template is
//! assembled in memory the same way `hwpx-convert`'s own test fixtures
//! build minimal templates (a handful of XML parts zipped up with the
//! `zip` crate). It carries a clean Normal style and a plain-mode `{{H1}}`
//! through `{{H9}}` and `{{BODY}}` placeholder for every paragraph kind the
//! Block Emitter can fall back on; lists and tables are left undecorated,
//! which the emitter already handles by auto-numbering and plain borders.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const HEADER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<hh:head xmlns:hh="http://www.hancom.co.kr/hwpml/2011/head" xmlns:hc="http://www.hancom.co.kr/hwpml/2011/core" version="1.31" secCnt="1">
  <hh:forbiddenWordList/>
  <hh:charProperties itemCnt="1">
    <hh:charPr id="0" height="1000" textColor="#000000" shadeColor="none" useFontSpace="0" useKerning="0" symMark="NONE" borderFillIDRef="1">
      <hh:fontRef hangul="1" latin="1" hanja="1" japanese="1" other="1" symbol="1" user="1"/>
      <hh:ratio hangul="100" latin="100" hanja="100" japanese="100" other="100" symbol="100" user="100"/>
      <hh:spacing hangul="0" latin="0" hanja="0" japanese="0" other="0" symbol="0" user="0"/>
      <hh:relSz hangul="100" latin="100" hanja="100" japanese="100" other="100" symbol="100" user="100"/>
      <hh:offset hangul="0" latin="0" hanja="0" japanese="0" other="0" symbol="0" user="0"/>
    </hh:charPr>
  </hh:charProperties>
  <hh:paraProperties itemCnt="1">
    <hh:paraPr id="1" tabPrIDRef="0" condense="0" fontLineHeight="0" snapToGrid="1" suppressLineNumbers="0" checked="0">
      <hh:align horizontal="JUSTIFY" vertical="BASELINE"/>
      <hh:heading type="NONE" idRef="0" level="0"/>
      <hh:margin>
        <hc:intent value="0"/>
        <hc:left value="0"/>
        <hc:right value="0"/>
        <hc:prev value="0"/>
        <hc:next value="0"/>
      </hh:margin>
      <hh:lineSpacing type="PERCENT" value="160" unit="HWPUNIT"/>
      <hh:border borderFillIDRef="1" offsetLeft="0" offsetRight="0" offsetTop="0" offsetBottom="0" connect="0" ignoreMargin="0"/>
    </hh:paraPr>
  </hh:paraProperties>
  <hh:styles itemCnt="1">
    <hh:style id="0" type="PARA" name="Normal" engName="Normal" paraPrIDRef="1" charPrIDRef="0" nextStyleIDRef="0" langID="1042" lockForm="0"/>
  </hh:styles>
  <hh:numberings itemCnt="0"/>
  <hh:borderFills itemCnt="1">
    <hh:borderFill id="1" threeD="0" shadow="0" centerLine="NONE" breakCellSeparateLine="0">
      <hh:slash type="NONE" Crooked="0" isCounter="0"/>
      <hh:backSlash type="NONE" Crooked="0" isCounter="0"/>
      <hh:leftBorder type="NONE" width="0.1 mm" color="#000000"/>
      <hh:rightBorder type="NONE" width="0.1 mm" color="#000000"/>
      <hh:topBorder type="NONE" width="0.1 mm" color="#000000"/>
      <hh:bottomBorder type="NONE" width="0.1 mm" color="#000000"/>
      <hh:diagonal type="NONE" width="0.1 mm" color="#000000"/>
    </hh:borderFill>
  </hh:borderFills>
</hh:head>
"#;

const MANIFEST_HPF: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<opf:package xmlns:opf="http://www.idpf.org/2007/opf/" version="2.0" unique-identifier="blank">
  <opf:metadata>
    <opf:title>Untitled</opf:title>
  </opf:metadata>
  <opf:manifest>
    <opf:item id="header" href="Contents/header.xml" media-type="application/xml"/>
    <opf:item id="section0" href="Contents/section0.xml" media-type="application/xml"/>
  </opf:manifest>
</opf:package>
"#;

const VERSION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<hv:HCFVersion xmlns:hv="http://www.hancom.co.kr/hwpml/2011/version" tagVersion="1.0" targetApplication="WORDPROCESSOR" major="5" minor="1" micro="1" buildNumber="0" os="1" xmlVersion="1.4" application="Hancom Office Hangul" appVersion="11, 0, 0, 1"/>
"#;

const CONTENT_TYPES_RDF: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<odf:document-container xmlns:odf="urn:oasis:names:tc:opendocument:xmlns:container" odf:rootfile="Contents/content.hpf" odf:version="1.31"/>
"#;

/// One `{{H<n>}}` plain-mode heading paragraph per outline level 1..=9,
/// plus a closing `{{BODY}}` paragraph for ordinary text.
fn section0_body() -> String {
    let mut body = String::new();
    for level in 1..=9 {
        body.push_str(&format!(
            r#"<hp:p id="{id}" paraPrIDRef="1" styleIDRef="0" pageBreak="0" columnBreak="0" merged="0">
  <hp:run charPrIDRef="0"><hp:t>{{{{H{level}}}}}</hp:t></hp:run>
  <hp:linesegarray>
    <hp:lineseg textpos="0" vertpos="0" vertsize="1000" textheight="1000" baseline="850" spacing="600" horzpos="0" horzsize="42520" flags="393216"/>
  </hp:linesegarray>
</hp:p>
"#,
            id = level
        ));
    }
    body.push_str(
        r#"<hp:p id="10" paraPrIDRef="1" styleIDRef="0" pageBreak="0" columnBreak="0" merged="0">
  <hp:run charPrIDRef="0"><hp:t>{{BODY}}</hp:t></hp:run>
  <hp:linesegarray>
    <hp:lineseg textpos="0" vertpos="0" vertsize="1000" textheight="1000" baseline="850" spacing="600" horzpos="0" horzsize="42520" flags="393216"/>
  </hp:linesegarray>
</hp:p>
"#,
    );
    body
}

fn section0_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<hs:sec xmlns:hs="http://www.hancom.co.kr/hwpml/2011/section" xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph" xmlns:hc="http://www.hancom.co.kr/hwpml/2011/core">
  <hp:p id="0" paraPrIDRef="1" styleIDRef="0" pageBreak="0" columnBreak="0" merged="0">
    <hp:run charPrIDRef="0">
      <hp:secPr id="" textDirection="HORIZONTAL" spaceColumns="0" tabStop="8000" tabStopVal="4000" tabStopUnit="HWPUNIT" outlineShapeIDRef="1" memoShapeIDRef="0" textVerticalWidthHead="0" masterPageCnt="0">
        <hp:grid lineGrid="0" charGrid="0" lineWordUnit="0" lineX="0" lineY="0" charWordUnit="0" charX="0" charY="0" wonggojiFormat="0"/>
        <hp:startNum pageStartsOn="BOTH" page="0" pic="0" tbl="0" equation="0"/>
        <hp:pagePr landscape="WIDELY" width="59528" height="84188" gutterType="LEFT_ONLY">
          <hp:margin header="4252" footer="4252" gutter="0" left="8504" right="8504" top="5668" bottom="4252"/>
        </hp:pagePr>
      </hp:secPr>
      <hp:ctrl>
        <hp:colPr id="" type="NEWSPAPER" layout="LEFT" colCount="1" sameSz="1" sameGap="0"/>
      </hp:ctrl>
      <hp:t></hp:t>
    </hp:run>
    <hp:linesegarray>
      <hp:lineseg textpos="0" vertpos="0" vertsize="1000" textheight="1000" baseline="850" spacing="600" horzpos="0" horzsize="42520" flags="393216"/>
    </hp:linesegarray>
  </hp:p>
{body}</hs:sec>
"#,
        body = section0_body()
    )
}

/// Zips up [`HEADER_XML`] and the generated `section0.xml` into a
/// self-contained, valid-enough HWPX: the parts `hwpx_convert::Template`
/// actually reads (`Contents/header.xml`, `Contents/section0.xml`), plus
/// the manifest and the couple of fixed parts a real HWPX always carries
/// (version info, mimetype declaration) that `Template::open` copies
/// through untouched.
pub fn blank_hwpx_bytes() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buf);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let section0 = section0_xml();
    let parts: [(&str, &str); 5] = [
        ("mimetype", "application/hwp+zip"),
        ("META-INF/container.rdf", CONTENT_TYPES_RDF),
        ("Contents/content.hpf", MANIFEST_HPF),
        ("Contents/header.xml", HEADER_XML),
        ("version.xml", VERSION_XML),
    ];
    for (name, contents) in parts {
        zip.start_file(name, options).expect("in-memory zip write");
        zip.write_all(contents.as_bytes()).expect("in-memory zip write");
    }
    zip.start_file("Contents/section0.xml", options).expect("in-memory zip write");
    zip.write_all(section0.as_bytes()).expect("in-memory zip write");

    zip.finish().expect("in-memory zip finish");
    buf.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwpx_convert::Template;
    use std::io::Cursor as StdCursor;

    #[test]
    fn blank_template_opens_and_passes_style_validation() {
        let bytes = blank_hwpx_bytes();
        let template = Template::open(StdCursor::new(bytes)).expect("template should parse");
        let header_xml = template.header_xml().unwrap();
        hwpx_convert::StyleRegistry::new(&header_xml).expect("Normal style must validate clean");
    }

    #[test]
    fn blank_template_converts_a_minimal_document() {
        let bytes = blank_hwpx_bytes();
        let template = Template::open(StdCursor::new(bytes)).unwrap();
        let mut doc = hwpx_ast::Document::with_title("Hello");
        doc.push(hwpx_ast::Block::Header {
            level: 1,
            inlines: vec![hwpx_ast::Inline::Str("Title".into())],
        });
        doc.push(hwpx_ast::Block::Paragraph {
            inlines: vec![hwpx_ast::Inline::Str("body text".into())],
        });

        let mut out = StdCursor::new(Vec::new());
        hwpx_convert::convert_to_hwpx(&doc, &template, None, &Default::default(), &mut out).unwrap();

        out.set_position(0);
        let mut archive = zip::ZipArchive::new(out).unwrap();
        let mut section0 = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("Contents/section0.xml").unwrap(), &mut section0).unwrap();
        assert!(section0.contains("body text"));
        assert!(section0.contains("Title"));
    }
}
