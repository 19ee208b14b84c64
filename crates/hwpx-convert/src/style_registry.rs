//! The Style Registry: derives new `charPr`/`paraPr` header entries from a
//! document's Normal style, content-addressed so the same combination of
//! active formats, alignment, or nesting level is only ever materialized
//! once.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::{ConvertError, Result};
use crate::xmltree::Element;

/// One active inline format. Ordered so a set of them has a single
/// canonical cache key regardless of the order marks were opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CharFormat {
    Bold,
    Italic,
    Underline,
    Strikeout,
    ColorBlue,
    Superscript,
    Subscript,
}

pub type FormatSet = BTreeSet<CharFormat>;

const NS_HEAD: &str = "http://www.hancom.co.kr/hwpml/2011/head";

/// Horizontal paragraph alignment, matching `hwpx_ast::Alignment`'s three
/// explicit variants (`Default` needs no derived `paraPr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

impl HAlign {
    fn as_str(self) -> &'static str {
        match self {
            HAlign::Left => "LEFT",
            HAlign::Center => "CENTER",
            HAlign::Right => "RIGHT",
        }
    }
}

const ORDERED_NUM_XML: &str = r#"<hh:numbering id="{id}" start="1">
  <hh:paraHead start="1" level="1" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">^1.</hh:paraHead>
  <hh:paraHead start="1" level="2" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="LATIN_CAPITAL" charPrIDRef="4294967295" checkable="0">^2.</hh:paraHead>
  <hh:paraHead start="1" level="3" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="ROMAN_SMALL" charPrIDRef="4294967295" checkable="0">^3.</hh:paraHead>
  <hh:paraHead start="1" level="4" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">^4.</hh:paraHead>
  <hh:paraHead start="1" level="5" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="LATIN_CAPITAL" charPrIDRef="4294967295" checkable="0">^5.</hh:paraHead>
  <hh:paraHead start="1" level="6" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="ROMAN_SMALL" charPrIDRef="4294967295" checkable="0">^6.</hh:paraHead>
  <hh:paraHead start="1" level="7" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">^7.</hh:paraHead>
</hh:numbering>"#;

const BULLET_NUM_XML: &str = r#"<hh:numbering id="{id}" start="1">
  <hh:paraHead start="1" level="1" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">ㅇ</hh:paraHead>
  <hh:paraHead start="1" level="2" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">-</hh:paraHead>
  <hh:paraHead start="1" level="3" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">∙</hh:paraHead>
  <hh:paraHead start="1" level="4" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">●</hh:paraHead>
  <hh:paraHead start="1" level="5" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">○</hh:paraHead>
  <hh:paraHead start="1" level="6" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">■</hh:paraHead>
  <hh:paraHead start="1" level="7" align="LEFT" useInstWidth="1" autoIndent="0" widthAdjust="0" textOffsetType="PERCENT" textOffset="50" numFormat="DIGIT" charPrIDRef="4294967295" checkable="0">●</hh:paraHead>
</hh:numbering>"#;

const TABLE_BORDER_FILL_XML: &str = r#"<hh:borderFill id="{id}" threeD="0" shadow="0" centerLine="NONE" breakCellSeparateLine="0">
    <hh:slash type="NONE" Crooked="0" isCounter="0"/>
    <hh:backSlash type="NONE" Crooked="0" isCounter="0"/>
    <hh:leftBorder type="SOLID" width="0.12 mm" color="#000000"/>
    <hh:rightBorder type="SOLID" width="0.12 mm" color="#000000"/>
    <hh:topBorder type="SOLID" width="0.12 mm" color="#000000"/>
    <hh:bottomBorder type="SOLID" width="0.12 mm" color="#000000"/>
    <hh:diagonal type="SOLID" width="0.1 mm" color="#000000"/>
    <hc:fillBrush>
      <hc:winBrush faceColor="none" hatchColor="#000000" alpha="0"/>
    </hc:fillBrush>
</hh:borderFill>"#;

pub enum ListKind {
    Bullet,
    Ordered,
}

/// Owns the header document and every cache needed to derive new
/// `charPr`/`paraPr`/`numbering`/`borderFill` entries from it as the Block
/// Emitter walks the AST.
pub struct StyleRegistry {
    pub header: Element,
    pub normal_style_id: String,
    pub normal_para_pr_id: String,
    /// Outline level (0-based) -> (style_id, para_pr_id, char_pr_id).
    pub outline_styles: BTreeMap<i64, (String, String, String)>,
    pub table_border_fill_id: String,

    max_char_pr_id: i64,
    max_para_pr_id: i64,
    max_numbering_id: i64,

    char_pr_cache: BTreeMap<(String, FormatSet), String>,
    aligned_para_pr_cache: BTreeMap<HAlign, String>,
    blockquote_para_pr_cache: BTreeMap<usize, String>,
}

impl StyleRegistry {
    /// Parses `header.xml`, ensures the numbering-definitions and
    /// table-border-fill containers it may be missing, and validates the
    /// two invariants the whole conversion depends on: outline levels form
    /// a contiguous run starting at 0, and the Normal style's character
    /// properties carry no stray formatting.
    pub fn new(header_xml: &str) -> Result<Self> {
        let mut header = crate::xmltree::parse(header_xml)?;

        ensure_numberings_container(&mut header);
        let table_border_fill_id = ensure_table_border_fill(&mut header);

        let mut max_char_pr_id = 0;
        let mut max_para_pr_id = 0;
        let mut max_numbering_id = 0;
        for el in header.descendants() {
            match el.local_name() {
                "charPr" => max_char_pr_id = max_char_pr_id.max(attr_i64(el, "id")),
                "paraPr" => max_para_pr_id = max_para_pr_id.max(attr_i64(el, "id")),
                "numbering" => max_numbering_id = max_numbering_id.max(attr_i64(el, "id")),
                _ => {}
            }
        }

        let (normal_style_id, normal_para_pr_id) = find_normal_style(&header);
        let outline_styles = map_outline_levels(&header);
        validate_outline_contiguity(&outline_styles)?;
        validate_normal_style_clean(&header, &normal_style_id)?;

        Ok(Self {
            header,
            normal_style_id,
            normal_para_pr_id,
            outline_styles,
            table_border_fill_id,
            max_char_pr_id,
            max_para_pr_id,
            max_numbering_id,
            char_pr_cache: BTreeMap::new(),
            aligned_para_pr_cache: BTreeMap::new(),
            blockquote_para_pr_cache: BTreeMap::new(),
        })
    }

    /// Returns the `charPr` id to use for `active_formats` layered on top
    /// of `base_id`, deriving and caching a new one the first time a given
    /// `(base, formats)` pair is requested. An empty format set is a no-op.
    pub fn derive_char_pr(&mut self, base_id: &str, active_formats: &FormatSet) -> String {
        if active_formats.is_empty() {
            return base_id.to_string();
        }
        let key = (base_id.to_string(), active_formats.clone());
        if let Some(id) = self.char_pr_cache.get(&key) {
            return id.clone();
        }

        let base_node = find_by_id(&self.header, "charPr", base_id)
            .or_else(|| find_by_id(&self.header, "charPr", "0"))
            .cloned();
        let Some(mut new_node) = base_node else {
            return base_id.to_string();
        };

        self.max_char_pr_id += 1;
        let new_id = self.max_char_pr_id.to_string();
        new_node.set_attr("id", new_id.clone());

        if active_formats.contains(&CharFormat::Bold) && new_node.child("bold").is_none() {
            new_node.push_child(Element::new("hh:bold"));
        }
        if active_formats.contains(&CharFormat::Italic) && new_node.child("italic").is_none() {
            new_node.push_child(Element::new("hh:italic"));
        }
        if active_formats.contains(&CharFormat::Underline) {
            let underline = new_node.ensure_child("underline");
            underline.set_attr("type", "BOTTOM");
            underline.set_attr("shape", "SOLID");
            underline.set_attr("color", "#000000");
        }
        if active_formats.contains(&CharFormat::Strikeout) {
            let strikeout = new_node.ensure_child("strikeout");
            strikeout.set_attr("shape", "SOLID");
            strikeout.set_attr("color", "#000000");
        }
        if active_formats.contains(&CharFormat::ColorBlue) {
            new_node.ensure_child("textColor").set_attr("value", "#0000FF");
            if let Some(underline) = new_node.child_mut("underline") {
                underline.set_attr("color", "#0000FF");
            }
        }
        if active_formats.contains(&CharFormat::Superscript) {
            new_node.retain_children(|n| !matches!(n, crate::xmltree::Node::Element(e) if e.local_name() == "subscript"));
            if new_node.child("supscript").is_none() {
                new_node.push_child(Element::new("hh:supscript"));
            }
        } else if active_formats.contains(&CharFormat::Subscript) {
            new_node.retain_children(|n| !matches!(n, crate::xmltree::Node::Element(e) if e.local_name() == "supscript"));
            if new_node.child("subscript").is_none() {
                new_node.push_child(Element::new("hh:subscript"));
            }
        }

        if let Some(char_props) = self.header.child_mut("charProperties") {
            char_props.push_child(new_node);
        }
        self.char_pr_cache.insert(key, new_id.clone());
        new_id
    }

    /// Derives (or returns the cached) `paraPr` id for Normal aligned
    /// `align`.
    pub fn derive_aligned_para_pr(&mut self, align: HAlign) -> Option<String> {
        if let Some(id) = self.aligned_para_pr_cache.get(&align) {
            return Some(id.clone());
        }
        let base = find_by_id(&self.header, "paraPr", &self.normal_para_pr_id)?.clone();
        let mut new_node = base;
        self.max_para_pr_id += 1;
        let new_id = self.max_para_pr_id.to_string();
        new_node.set_attr("id", new_id.clone());
        new_node.ensure_child("align").set_attr("horizontal", align.as_str());

        self.header.child_mut("paraProperties")?.push_child(new_node);
        self.aligned_para_pr_cache.insert(align, new_id.clone());
        Some(new_id)
    }

    /// Derives (or returns the cached) `paraPr` id for a block quote at
    /// nesting `level` (0-based), adding `BLOCKQUOTE_LEFT_INDENT +
    /// level * BLOCKQUOTE_INDENT_PER_LEVEL` to the Normal left margin.
    pub fn derive_blockquote_para_pr(&mut self, level: usize) -> String {
        if let Some(id) = self.blockquote_para_pr_cache.get(&level) {
            return id.clone();
        }
        let base_id = self.normal_para_pr_id.clone();
        let Some(mut new_node) = find_by_id(&self.header, "paraPr", &base_id).cloned() else {
            return base_id;
        };
        self.max_para_pr_id += 1;
        let new_id = self.max_para_pr_id.to_string();
        new_node.set_attr("id", new_id.clone());

        let indent = crate::constants::BLOCKQUOTE_LEFT_INDENT
            + level as i64 * crate::constants::BLOCKQUOTE_INDENT_PER_LEVEL;
        new_node.for_each_descendant_mut(&mut |el| {
            if el.local_name() == "left" {
                let original: i64 = el.attr("value").and_then(|v| v.parse().ok()).unwrap_or(0);
                el.set_attr("value", (original + indent).to_string());
            }
        });

        if let Some(para_props) = self.header.child_mut("paraProperties") {
            para_props.push_child(new_node);
        }
        self.blockquote_para_pr_cache.insert(level, new_id.clone());
        new_id
    }

    /// Derives a new `paraPr` carrying a `NUMBER`-type heading reference
    /// to `numbering_id` at `level`, with the list indent/hanging-indent
    /// geometry for that nesting level. Not cached: a distinct `paraPr` is
    /// needed per (numbering, level) pair and callers already memoize that
    /// pairing themselves via [`Self::create_numbering`].
    pub fn derive_list_para_pr(&mut self, numbering_id: &str, level: usize) -> String {
        let base_id = self.normal_para_pr_id.clone();
        let Some(mut new_node) = find_by_id(&self.header, "paraPr", &base_id).cloned() else {
            return base_id;
        };
        self.max_para_pr_id += 1;
        let new_id = self.max_para_pr_id.to_string();
        new_node.set_attr("id", new_id.clone());

        let heading = new_node.ensure_child("heading");
        heading.set_attr("type", "NUMBER");
        heading.set_attr("idRef", numbering_id);
        heading.set_attr("level", level.to_string());

        // The per-level left margin is overwritten outright rather than
        // added to the inherited value, mirroring the reference behavior
        // where an identical preceding pass is immediately superseded.
        let hanging = crate::constants::LIST_HANGING_INDENT;
        let left_value = (level as i64 + 1) * hanging;

        new_node.for_each_descendant_mut(&mut |el| match el.local_name() {
            "intent" => el.set_attr("value", (-hanging).to_string()),
            "left" => el.set_attr("value", left_value.to_string()),
            _ => {}
        });

        if let Some(para_props) = self.header.child_mut("paraProperties") {
            para_props.push_child(new_node);
        }
        new_id
    }

    /// Appends a new `hh:numbering` definition (bullet or ordered) to the
    /// header and returns its id.
    pub fn create_numbering(&mut self, kind: ListKind, start: u32) -> String {
        self.max_numbering_id += 1;
        let new_id = self.max_numbering_id.to_string();
        let template = match kind {
            ListKind::Ordered => ORDERED_NUM_XML,
            ListKind::Bullet => BULLET_NUM_XML,
        };
        let xml = template.replace("{id}", &new_id);
        if let Ok(mut node) = crate::xmltree::parse(&format!(
            r#"<root xmlns:hh="{NS_HEAD}">{xml}</root>"#
        )) {
            if let Some(mut numbering) = node.children.drain(..).find_map(|n| match n {
                crate::xmltree::Node::Element(e) if e.local_name() == "numbering" => Some(e),
                _ => None,
            }) {
                numbering.set_attr("start", start.to_string());
                if let Some(container) = self.header.child_mut("numberings") {
                    container.push_child(numbering);
                }
            }
        }
        new_id
    }

    /// Whether `para_pr_id` already carries a `numPr` reference, and if so,
    /// which one — used to decide whether a template-defined list
    /// placeholder should drive numbering mode or prefix mode.
    pub fn para_pr_num_pr(&self, para_pr_id: &str) -> Option<String> {
        let para_pr = find_by_id(&self.header, "paraPr", para_pr_id)?;
        para_pr.child("numPr")?.attr("numPrIDRef").map(|s| s.to_string())
    }

    /// Looks up a `charPr`'s id for a `style` element, if any.
    pub fn style_char_pr_id(&self, style_id: &str) -> Option<String> {
        find_by_id(&self.header, "style", style_id)
            .and_then(|s| s.attr("charPrIDRef"))
            .map(|s| s.to_string())
    }

    /// Rewrites the four `itemCnt` attributes that must track how many
    /// entries their container actually holds. Called once, after all
    /// mutation is finished.
    pub fn finalize_item_counts(&mut self) {
        for (container, child) in [
            ("charProperties", "charPr"),
            ("paraProperties", "paraPr"),
            ("numberings", "numbering"),
            ("borderFills", "borderFill"),
        ] {
            if let Some(el) = self.header.child_mut(container) {
                let count = el.children_named(child).count();
                el.set_attr("itemCnt", count.to_string());
            }
        }
    }

    pub fn into_header_xml(self) -> String {
        crate::xmltree::serialize(&self.header)
    }
}

fn attr_i64(el: &Element, name: &str) -> i64 {
    el.attr(name).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn find_by_id<'a>(root: &'a Element, local_name: &str, id: &str) -> Option<&'a Element> {
    root.descendants()
        .into_iter()
        .find(|e| e.local_name() == local_name && e.attr("id") == Some(id))
}

fn find_normal_style(header: &Element) -> (String, String) {
    let style = find_by_id(header, "style", "0").or_else(|| {
        header.descendants().into_iter().find(|e| e.local_name() == "style")
    });
    match style {
        Some(s) => (
            s.attr("id").unwrap_or("0").to_string(),
            s.attr("paraPrIDRef").unwrap_or("1").to_string(),
        ),
        None => ("0".to_string(), "1".to_string()),
    }
}

/// Maps each `OUTLINE`-type heading level found among `paraPr` entries to
/// (style_id, para_pr_id, char_pr_id), taking the first `paraPr` seen at a
/// given level and the first `style` that references it.
fn map_outline_levels(header: &Element) -> BTreeMap<i64, (String, String, String)> {
    let mut level_to_para_pr: BTreeMap<i64, String> = BTreeMap::new();
    for para_pr in header.descendants() {
        if para_pr.local_name() != "paraPr" {
            continue;
        }
        let Some(p_id) = para_pr.attr("id") else { continue };
        for heading in para_pr.descendants() {
            if heading.local_name() == "heading" && heading.attr("type") == Some("OUTLINE") {
                if let Some(level) = heading.attr("level").and_then(|v| v.parse::<i64>().ok()) {
                    level_to_para_pr.entry(level).or_insert_with(|| p_id.to_string());
                }
                break;
            }
        }
    }

    let mut para_pr_to_style: BTreeMap<String, (String, String)> = BTreeMap::new();
    for style in header.descendants() {
        if style.local_name() != "style" {
            continue;
        }
        if let (Some(s_id), Some(p_ref)) = (style.attr("id"), style.attr("paraPrIDRef")) {
            para_pr_to_style
                .entry(p_ref.to_string())
                .or_insert_with(|| (s_id.to_string(), style.attr("charPrIDRef").unwrap_or("0").to_string()));
        }
    }

    let mut out = BTreeMap::new();
    for (level, p_id) in level_to_para_pr {
        if let Some((style_id, char_pr_id)) = para_pr_to_style.get(&p_id) {
            out.insert(level, (style_id.clone(), p_id, char_pr_id.clone()));
        }
    }
    out
}

fn validate_outline_contiguity(levels: &BTreeMap<i64, (String, String, String)>) -> Result<()> {
    if levels.is_empty() {
        return Ok(());
    }
    let keys: Vec<i64> = levels.keys().copied().collect();
    if keys[0] != 0 {
        return Err(ConvertError::style(format!(
            "outline levels must start from 0, found start: {}",
            keys[0]
        )));
    }
    for (i, level) in keys.iter().enumerate() {
        if *level != i as i64 {
            return Err(ConvertError::style(format!(
                "outline levels are missing/gapped: expected {i}, found {level}"
            )));
        }
    }
    Ok(())
}

fn validate_normal_style_clean(header: &Element, normal_style_id: &str) -> Result<()> {
    let normal_char_pr_id = find_by_id(header, "style", normal_style_id)
        .and_then(|s| s.attr("charPrIDRef"))
        .unwrap_or("0")
        .to_string();
    let Some(char_pr) = find_by_id(header, "charPr", &normal_char_pr_id) else {
        return Ok(());
    };
    let mut dirty = Vec::new();
    for tag in ["bold", "italic", "underline", "supscript", "subscript"] {
        if let Some(node) = char_pr.child(tag) {
            if tag == "underline" && node.attr("type") == Some("NONE") {
                continue;
            }
            dirty.push(tag);
        }
    }
    if !dirty.is_empty() {
        return Err(ConvertError::style(format!(
            "Normal style (charPrID={normal_char_pr_id}) must be clean; found forbidden properties: {dirty:?}"
        )));
    }
    Ok(())
}

fn ensure_numberings_container(header: &mut Element) {
    header.ensure_child("numberings");
}

fn ensure_table_border_fill(header: &mut Element) -> String {
    let max_id = header
        .child("borderFills")
        .map(|bf| bf.children_named("borderFill").filter_map(|e| e.attr("id")).filter_map(|v| v.parse::<i64>().ok()).max().unwrap_or(0))
        .unwrap_or(0);
    let new_id = (max_id + 1).to_string();
    let xml = TABLE_BORDER_FILL_XML.replace("{id}", &new_id);
    if let Ok(wrapper) = crate::xmltree::parse(&format!(
        r#"<root xmlns:hh="{NS_HEAD}" xmlns:hc="http://www.hancom.co.kr/hwpml/2011/core">{xml}</root>"#
    )) {
        if let Some(node) = wrapper.children.into_iter().find_map(|n| match n {
            crate::xmltree::Node::Element(e) if e.local_name() == "borderFill" => Some(e),
            _ => None,
        }) {
            header.ensure_child("borderFills").push_child(node);
        }
    }
    new_id
}
