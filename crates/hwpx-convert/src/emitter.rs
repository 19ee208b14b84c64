//! The Block Emitter: walks a [`hwpx_ast::Document`] and produces the HWPX
//! body XML (a sequence of `<hp:p>` paragraphs), deriving any new
//! `charPr`/`paraPr`/`numbering` entries it needs through the
//! [`crate::style_registry::StyleRegistry`] along the way.
//!
//! Dispatch is a single `match` per level (block, inline); AST variants with
//! no corresponding HWPX construct are simply not matched and contribute
//! nothing, per the AST's closed-variant-set contract.

use std::path::{Path, PathBuf};

use hwpx_ast::{Alignment, Block, ColumnSpec, ColumnWidth, Document, ImageAttrs, Inline, TableCell, TableRow};

use crate::constants::{
    CELL_MARGIN_DEFAULT, ConversionConfig, MAX_IMAGE_COUNT, MAX_NESTING_DEPTH, TABLE_OUT_MARGIN_BOTTOM, TABLE_WIDTH,
};
use crate::counter;
use crate::error::{ConvertError, Result};
use crate::image::{build_pic_run, extension_for_path, read_image_file, resolve_size, EmbeddedImage};
use crate::style_registry::{CharFormat, FormatSet, HAlign, ListKind, StyleRegistry};
use crate::template::{header_pattern, ListMode, ListType, ListStyle, PlaceholderMode, PlaceholderStyle, TemplateIntrospector};
use crate::xmltree::Element;

/// Drives one document's conversion: owns the id counter and the
/// header-occurrence counters that track auto-numbering state across the
/// whole walk.
pub struct Emitter<'a> {
    registry: &'a mut StyleRegistry,
    template: &'a TemplateIntrospector,
    config: &'a ConversionConfig,
    base_dir: Option<PathBuf>,
    images: Vec<EmbeddedImage>,
    header_counters: std::collections::BTreeMap<u8, u32>,
    has_emitted_block: bool,
    last_field_id: String,
    next_id_seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKindLocal {
    Bullet,
    Ordered,
}

impl<'a> Emitter<'a> {
    pub fn new(
        registry: &'a mut StyleRegistry,
        template: &'a TemplateIntrospector,
        config: &'a ConversionConfig,
        base_dir: Option<&Path>,
    ) -> Self {
        Self {
            registry,
            template,
            config,
            base_dir: base_dir.map(|p| p.to_path_buf()),
            images: Vec::new(),
            header_counters: std::collections::BTreeMap::new(),
            has_emitted_block: false,
            last_field_id: "0".to_string(),
            next_id_seed: 0,
        }
    }

    pub fn into_images(self) -> Vec<EmbeddedImage> {
        self.images
    }

    fn next_id(&mut self) -> String {
        self.next_id_seed += 1;
        self.next_id_seed.to_string()
    }

    /// Converts the whole document body and splices the template's page
    /// setup fragment (if any) into the first run, so HWPX's page geometry
    /// (which lives on a run, not the section) survives the conversion.
    pub fn emit_document(&mut self, doc: &Document) -> Result<String> {
        let elems = self.emit_blocks(&doc.blocks)?;
        let mut body: String = elems.iter().map(crate::xmltree::serialize).collect::<Vec<_>>().join("\n");

        if let Some(page_setup) = &self.template.page_setup_xml {
            if let Some(pos) = find_first_run_tag_end(&body) {
                body.insert_str(pos, page_setup);
            } else {
                log::warn!("no hp:run found to inject page setup into");
            }
        }

        Ok(body)
    }

    fn emit_blocks(&mut self, blocks: &[Block]) -> Result<Vec<Element>> {
        let mut out = Vec::new();
        for block in blocks {
            let elems = self.emit_block(block)?;
            if !elems.is_empty() {
                out.extend(elems);
                self.has_emitted_block = true;
            }
        }
        Ok(out)
    }

    fn emit_block(&mut self, block: &Block) -> Result<Vec<Element>> {
        match block {
            Block::Header { level, inlines } => Ok(vec![self.emit_header(*level, inlines)?]),
            Block::Paragraph { inlines } => Ok(vec![self.emit_text_block(inlines, "BODY")]),
            Block::Plain { inlines } => Ok(vec![self.emit_text_block(inlines, "BODY")]),
            Block::BulletList { items } => self.emit_bullet_list(items, 0),
            Block::OrderedList { start, items } => self.emit_ordered_list(*start, items, 0),
            Block::CodeBlock { classes, text } => Ok(vec![self.emit_code_block(classes, text)]),
            Block::Table {
                colspecs,
                head_rows,
                body_rows,
                foot_rows,
            } => Ok(self.emit_table(colspecs, head_rows, body_rows, foot_rows)?.into_iter().collect()),
            Block::BlockQuote { blocks } => self.emit_blockquote(blocks, 0),
            Block::HorizontalRule => Ok(self.emit_horizontal_rule()),
        }
    }

    // --- Headers ---

    fn emit_header(&mut self, level: u8, inlines: &[Inline]) -> Result<Element> {
        let (column_break, rest);
        if let Some(Inline::LineBreak) = inlines.first() {
            column_break = true;
            rest = &inlines[1..];
        } else {
            column_break = false;
            rest = inlines;
        }

        let page_break = level == 1 && self.has_emitted_block && self.config.page_break_before_h1;

        let deeper: Vec<u8> = self.header_counters.keys().copied().filter(|l| *l > level).collect();
        for l in deeper {
            self.header_counters.remove(&l);
        }

        let placeholder_name = format!("H{level}");
        if let Some(props) = self.template.placeholders.get(&placeholder_name).cloned() {
            let counter = {
                let c = self.header_counters.entry(level).or_insert(0);
                *c += 1;
                *c
            };
            return match props.mode {
                PlaceholderMode::Table => self.emit_header_in_table(rest, &props, column_break, counter, page_break),
                _ => Ok(self.emit_header_styled(rest, &props, column_break, counter, page_break)),
            };
        }

        let hwpx_level = level as i64 - 1;
        let (style_id, para_pr_id, char_pr_id) = self
            .registry
            .outline_styles
            .get(&hwpx_level)
            .cloned()
            .ok_or_else(|| {
                ConvertError::conversion(format!(
                    "header level {level} (outline level {hwpx_level}) has no matching style in the template header"
                ))
            })?;

        let mut para = create_para(&style_id, &para_pr_id, column_break, page_break);
        self.emit_inlines(rest, &mut para, &char_pr_id, &FormatSet::new());
        Ok(para)
    }

    fn emit_header_styled(
        &mut self,
        inlines: &[Inline],
        props: &PlaceholderStyle,
        column_break: bool,
        counter: u32,
        page_break: bool,
    ) -> Element {
        let mut para = create_para(&props.style_id, &props.para_pr_id, column_break, page_break);
        if let Some(prefix) = &props.prefix {
            let formatted = counter::format_counter(prefix, counter);
            let prefix_cid = props.prefix_char_pr_id.as_deref().unwrap_or(&props.char_pr_id);
            para.push_child(create_text_run(&formatted, prefix_cid));
        }
        self.emit_inlines(inlines, &mut para, &props.char_pr_id, &FormatSet::new());
        para
    }

    /// Copies the template's table structure for a header embedded in a
    /// table cell, advances its numbering-text cell (if any), and
    /// substitutes the header placeholder text, wrapping the whole table in
    /// a paragraph/run so page-setup injection still works when this is
    /// the first block in the document.
    fn emit_header_in_table(
        &mut self,
        inlines: &[Inline],
        props: &PlaceholderStyle,
        column_break: bool,
        counter: u32,
        page_break: bool,
    ) -> Result<Element> {
        let mut table_elem = props
            .table
            .clone()
            .ok_or_else(|| ConvertError::conversion("table-mode header placeholder carries no table"))?;
        table_elem.strip_descendants(&["secPr", "linesegarray", "ctrl"]);
        table_elem.retain_children(|n| !matches!(n, crate::xmltree::Node::Element(e) if e.local_name() == "label"));

        if let Some(numbering_text) = &props.numbering_text {
            let formatted = counter::format_counter(numbering_text, counter);
            let mut done = false;
            table_elem.for_each_descendant_mut(&mut |el| {
                if done || el.local_name() != "t" {
                    return;
                }
                let text = el.direct_text();
                if text.trim() == numbering_text.as_str() {
                    let replaced = text.replacen(numbering_text.as_str(), &formatted, 1);
                    el.children = vec![crate::xmltree::Node::Text(replaced)];
                    done = true;
                }
            });
        }

        let header_text = Inline::plain_text(inlines);
        let mut done = false;
        substitute_table_header_placeholder(
            &mut table_elem,
            &props.char_pr_id,
            &props.para_pr_id,
            &props.style_id,
            &header_text,
            &mut done,
        );

        let mut wrapper_para = create_para(&self.registry.normal_style_id, &self.registry.normal_para_pr_id, column_break, page_break);
        let mut wrapper_run = create_run("0");
        wrapper_run.push_child(table_elem);
        wrapper_run.push_child(Element::new("hp:t"));
        wrapper_para.push_child(wrapper_run);
        Ok(wrapper_para)
    }

    fn emit_text_block(&mut self, inlines: &[Inline], placeholder_name: &str) -> Element {
        let (char_pr_id, para_pr_id) = match self.template.placeholders.get(placeholder_name) {
            Some(props) => (props.char_pr_id.clone(), props.para_pr_id.clone()),
            None => {
                let char_pr_id = self
                    .registry
                    .style_char_pr_id(&self.registry.normal_style_id.clone())
                    .unwrap_or_else(|| "0".to_string());
                (char_pr_id, self.registry.normal_para_pr_id.clone())
            }
        };
        let mut para = create_para(&self.registry.normal_style_id, &para_pr_id, false, false);
        self.emit_inlines(inlines, &mut para, &char_pr_id, &FormatSet::new());
        para
    }

    // --- Lists ---

    fn emit_bullet_list(&mut self, items: &[Vec<Block>], level: usize) -> Result<Vec<Element>> {
        let level = clamp_nesting(level, "Bullet list");
        if let Some(style) = self.template.list_styles.get(&(ListType::Bullet, level + 1)).cloned() {
            return match style.mode {
                ListMode::Numbering => self.emit_template_numbering_list(items, level, &style),
                ListMode::Prefix => self.emit_prefix_list(items, ListKindLocal::Bullet, level, 1, &style),
            };
        }

        let num_id = self.registry.create_numbering(ListKind::Bullet, 1);
        self.emit_auto_numbered_list(items, level, &num_id)
    }

    fn emit_ordered_list(&mut self, start: u32, items: &[Vec<Block>], level: usize) -> Result<Vec<Element>> {
        let level = clamp_nesting(level, "Ordered list");
        if let Some(style) = self.template.list_styles.get(&(ListType::Ordered, level + 1)).cloned() {
            return match style.mode {
                ListMode::Numbering => self.emit_template_numbering_list(items, level, &style),
                ListMode::Prefix => self.emit_prefix_list(items, ListKindLocal::Ordered, level, start, &style),
            };
        }

        let num_id = self.registry.create_numbering(ListKind::Ordered, start);
        self.emit_auto_numbered_list(items, level, &num_id)
    }

    fn emit_auto_numbered_list(&mut self, items: &[Vec<Block>], level: usize, num_id: &str) -> Result<Vec<Element>> {
        let mut elements = Vec::new();
        for item_blocks in items {
            for block in item_blocks {
                match block {
                    Block::Paragraph { inlines } | Block::Plain { inlines } => {
                        let list_para_pr = self.registry.derive_list_para_pr(num_id, level);
                        let mut para = create_para(&self.registry.normal_style_id, &list_para_pr, false, false);
                        self.emit_inlines(inlines, &mut para, "0", &FormatSet::new());
                        elements.push(para);
                    }
                    Block::BulletList { items: inner } => elements.extend(self.emit_bullet_list(inner, level + 1)?),
                    Block::OrderedList { start, items: inner } => {
                        elements.extend(self.emit_ordered_list(*start, inner, level + 1)?)
                    }
                    other => elements.extend(self.emit_block(other)?),
                }
            }
        }
        Ok(elements)
    }

    fn emit_prefix_list(
        &mut self,
        items: &[Vec<Block>],
        kind: ListKindLocal,
        level: usize,
        start_num: u32,
        style: &ListStyle,
    ) -> Result<Vec<Element>> {
        let mut elements = Vec::new();
        let mut item_counter = start_num;
        for item_blocks in items {
            for block in item_blocks {
                match block {
                    Block::Paragraph { inlines } | Block::Plain { inlines } => {
                        let mut para = create_para(&self.registry.normal_style_id, &style.para_pr_id, false, false);
                        if let Some(prefix) = &style.prefix {
                            let formatted = match kind {
                                ListKindLocal::Bullet => prefix.clone(),
                                ListKindLocal::Ordered => counter::format_counter(prefix, item_counter),
                            };
                            if !formatted.is_empty() {
                                para.push_child(create_text_run(&formatted, &style.char_pr_id));
                            }
                        }
                        self.emit_inlines(inlines, &mut para, &style.char_pr_id, &FormatSet::new());
                        elements.push(para);
                        item_counter += 1;
                    }
                    Block::BulletList { items: inner } => elements.extend(self.emit_bullet_list(inner, level + 1)?),
                    Block::OrderedList { start, items: inner } => {
                        elements.extend(self.emit_ordered_list(*start, inner, level + 1)?)
                    }
                    other => elements.extend(self.emit_block(other)?),
                }
            }
        }
        Ok(elements)
    }

    /// The template's `paraPr` already references a `numPr`, so list items
    /// only need that `paraPr`; the numbering glyph/advance comes from the
    /// template's own `hh:numbering` definition.
    fn emit_template_numbering_list(&mut self, items: &[Vec<Block>], level: usize, style: &ListStyle) -> Result<Vec<Element>> {
        let mut elements = Vec::new();
        for item_blocks in items {
            for block in item_blocks {
                match block {
                    Block::Paragraph { inlines } | Block::Plain { inlines } => {
                        let mut para = create_para(&self.registry.normal_style_id, &style.para_pr_id, false, false);
                        self.emit_inlines(inlines, &mut para, &style.char_pr_id, &FormatSet::new());
                        elements.push(para);
                    }
                    Block::BulletList { items: inner } => elements.extend(self.emit_bullet_list(inner, level + 1)?),
                    Block::OrderedList { start, items: inner } => {
                        elements.extend(self.emit_ordered_list(*start, inner, level + 1)?)
                    }
                    other => elements.extend(self.emit_block(other)?),
                }
            }
        }
        Ok(elements)
    }

    // --- Block quotes & rules ---

    fn emit_blockquote(&mut self, blocks: &[Block], level: usize) -> Result<Vec<Element>> {
        let level = clamp_nesting(level, "Block quote");
        let mut out = Vec::new();
        for block in blocks {
            match block {
                Block::BlockQuote { blocks: inner } => out.extend(self.emit_blockquote(inner, level + 1)?),
                Block::Paragraph { inlines } | Block::Plain { inlines } => {
                    let para_pr = self.registry.derive_blockquote_para_pr(level);
                    let mut para = create_para(&self.registry.normal_style_id, &para_pr, false, false);
                    let char_pr_id = self
                        .registry
                        .style_char_pr_id(&self.registry.normal_style_id.clone())
                        .unwrap_or_else(|| "0".to_string());
                    self.emit_inlines(inlines, &mut para, &char_pr_id, &FormatSet::new());
                    out.push(para);
                }
                other => out.extend(self.emit_block(other)?),
            }
        }
        Ok(out)
    }

    fn emit_horizontal_rule(&mut self) -> Vec<Element> {
        (0..2)
            .map(|_| {
                let mut para = create_para(&self.registry.normal_style_id, &self.registry.normal_para_pr_id, false, false);
                para.push_child(create_text_run(" ", "0"));
                para
            })
            .collect()
    }

    // --- Code blocks ---

    fn emit_code_block(&mut self, classes: &[String], text: &str) -> Element {
        if classes.iter().any(|c| c == "mermaid") {
            match hwpx_diagrams::render_mermaid_png(text) {
                Ok(bytes) => {
                    let para_pr_id = self
                        .registry
                        .derive_aligned_para_pr(HAlign::Center)
                        .unwrap_or_else(|| self.registry.normal_para_pr_id.clone());
                    let mut para = create_para(&self.registry.normal_style_id, &para_pr_id, false, false);
                    let run = self.embed_image_bytes(bytes, "png", None, None, None, "0");
                    para.push_child(run);
                    return para;
                }
                Err(e) => {
                    log::error!("failed to render Mermaid diagram: {e}");
                }
            }
        }

        let mut para = create_para(&self.registry.normal_style_id, &self.registry.normal_para_pr_id, false, false);
        para.push_child(create_text_run(text, "0"));
        para
    }

    // --- Tables ---

    fn emit_table(
        &mut self,
        colspecs: &[ColumnSpec],
        head_rows: &[TableRow],
        body_rows: &[TableRow],
        foot_rows: &[TableRow],
    ) -> Result<Option<Element>> {
        let header_row_count = head_rows.len();
        let body_row_count = body_rows.len() + foot_rows.len();
        let all_rows: Vec<&TableRow> = head_rows.iter().chain(body_rows.iter()).chain(foot_rows.iter()).collect();
        if all_rows.is_empty() {
            return Ok(None);
        }

        let row_cnt = all_rows.len();
        let col_cnt = colspecs.len().max(1);
        let total_width = self.template.table_width.unwrap_or(TABLE_WIDTH);

        let has_proportional = colspecs.iter().any(|s| matches!(s.width, ColumnWidth::Proportional(_)));
        let col_widths: Vec<i64> = if has_proportional {
            colspecs
                .iter()
                .map(|s| match s.width {
                    ColumnWidth::Proportional(p) => (p * total_width as f64) as i64,
                    ColumnWidth::Default => total_width / col_cnt as i64,
                })
                .collect()
        } else {
            vec![total_width / col_cnt as i64; col_cnt]
        };

        let tbl_id = self.next_id();
        let mut para = create_para(&self.registry.normal_style_id, &self.registry.normal_para_pr_id, false, false);
        let mut run = create_run("0");

        let mut tbl = Element::new("hp:tbl");
        for (k, v) in [
            ("id", tbl_id.as_str()),
            ("zOrder", "0"),
            ("numberingType", "TABLE"),
            ("textWrap", "TOP_AND_BOTTOM"),
            ("textFlow", "BOTH_SIDES"),
            ("lock", "0"),
            ("dropcapstyle", "None"),
            ("pageBreak", "CELL"),
            ("repeatHeader", "1"),
            ("rowCnt", &row_cnt.to_string()),
            ("colCnt", &col_cnt.to_string()),
            ("cellSpacing", "0"),
            ("borderFillIDRef", self.registry.table_border_fill_id.as_str()),
            ("noAdjust", "0"),
        ] {
            tbl.set_attr(k, v);
        }

        let mut sz = Element::new("hp:sz");
        sz.set_attr("width", total_width.to_string());
        sz.set_attr("widthRelTo", "ABSOLUTE");
        sz.set_attr("height", (row_cnt as i64 * 1000).to_string());
        sz.set_attr("heightRelTo", "ABSOLUTE");
        sz.set_attr("protect", "0");
        tbl.push_child(sz);

        let mut pos = Element::new("hp:pos");
        for (k, v) in [
            ("treatAsChar", "0"),
            ("affectLSpacing", "0"),
            ("flowWithText", "1"),
            ("allowOverlap", "0"),
            ("holdAnchorAndSO", "0"),
            ("vertRelTo", "PARA"),
            ("horzRelTo", "COLUMN"),
            ("vertAlign", "TOP"),
            ("horzAlign", "LEFT"),
            ("vertOffset", "0"),
            ("horzOffset", "0"),
        ] {
            pos.set_attr(k, v);
        }
        tbl.push_child(pos);

        let mut out_margin = Element::new("hp:outMargin");
        out_margin.set_attr("left", "0");
        out_margin.set_attr("right", "0");
        out_margin.set_attr("top", "0");
        out_margin.set_attr("bottom", TABLE_OUT_MARGIN_BOTTOM.to_string());
        tbl.push_child(out_margin);

        let default_margin = CELL_MARGIN_DEFAULT;
        let mut in_margin = Element::new("hp:inMargin");
        in_margin.set_attr("left", default_margin.left.to_string());
        in_margin.set_attr("right", default_margin.right.to_string());
        in_margin.set_attr("top", default_margin.top.to_string());
        in_margin.set_attr("bottom", default_margin.bottom.to_string());
        tbl.push_child(in_margin);

        let mut occupied: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
        for (row_idx, row) in all_rows.iter().enumerate() {
            let mut tr = Element::new("hp:tr");
            let mut col_addr = 0usize;
            for cell in &row.cells {
                while occupied.contains(&(row_idx, col_addr)) {
                    col_addr += 1;
                }
                let actual_col = col_addr;
                let row_span = (cell.row_span.max(1)) as usize;
                let col_span = (cell.col_span.max(1)) as usize;
                for r in 0..row_span {
                    for c in 0..col_span {
                        occupied.insert((row_idx + r, actual_col + c));
                    }
                }

                let cell_width: i64 = (0..col_span)
                    .map(|i| col_widths.get(actual_col + i).copied().unwrap_or(total_width / col_cnt as i64))
                    .sum();

                let sublist_id = self.next_id();
                let row_type = row_type(row_idx, header_row_count, body_row_count);
                let col_type = col_type(actual_col, col_cnt);
                let cell_key = format!("{row_type}_{col_type}");
                let cell_style = self.template.cell_styles.get(&cell_key);

                let border_fill_id = cell_style
                    .and_then(|s| s.border_fill_id.clone())
                    .unwrap_or_else(|| self.registry.table_border_fill_id.clone());
                let cell_margin = cell_style.map(|s| s.cell_margin).unwrap_or(default_margin);

                let mut tc = Element::new("hp:tc");
                tc.set_attr("name", "");
                tc.set_attr("header", if row_type == "HEADER" { "1" } else { "0" });
                tc.set_attr("hasMargin", "0");
                tc.set_attr("protect", "0");
                tc.set_attr("editable", "0");
                tc.set_attr("dirty", "0");
                tc.set_attr("borderFillIDRef", border_fill_id);

                let mut sublist = Element::new("hp:subList");
                for (k, v) in [
                    ("id", sublist_id.as_str()),
                    ("textDirection", "HORIZONTAL"),
                    ("lineWrap", "BREAK"),
                    ("vertAlign", "TOP"),
                    ("linkListIDRef", "0"),
                    ("linkListNextIDRef", "0"),
                    ("textWidth", "0"),
                    ("textHeight", "0"),
                    ("hasTextRef", "0"),
                    ("hasNumRef", "0"),
                ] {
                    sublist.set_attr(k, v);
                }

                let hwpx_align = pandoc_align_to_hwpx(cell.align);
                let cell_elems = self.emit_blocks(&cell.blocks)?;
                for mut el in cell_elems {
                    if let Some(align) = hwpx_align {
                        if el.local_name() == "p" {
                            if let Some(aligned_id) = self.registry.derive_aligned_para_pr(align) {
                                el.set_attr("paraPrIDRef", aligned_id);
                            }
                        }
                    }
                    sublist.push_child(el);
                }
                tc.push_child(sublist);

                let mut cell_addr = Element::new("hp:cellAddr");
                cell_addr.set_attr("colAddr", actual_col.to_string());
                cell_addr.set_attr("rowAddr", row_idx.to_string());
                tc.push_child(cell_addr);

                let mut cell_span = Element::new("hp:cellSpan");
                cell_span.set_attr("colSpan", col_span.to_string());
                cell_span.set_attr("rowSpan", row_span.to_string());
                tc.push_child(cell_span);

                let mut cell_sz = Element::new("hp:cellSz");
                cell_sz.set_attr("width", cell_width.to_string());
                cell_sz.set_attr("height", "1000");
                tc.push_child(cell_sz);

                let mut cm = Element::new("hp:cellMargin");
                cm.set_attr("left", cell_margin.left.to_string());
                cm.set_attr("right", cell_margin.right.to_string());
                cm.set_attr("top", cell_margin.top.to_string());
                cm.set_attr("bottom", cell_margin.bottom.to_string());
                tc.push_child(cm);

                tr.push_child(tc);
                col_addr += col_span;
            }
            tbl.push_child(tr);
        }

        run.push_child(tbl);
        para.push_child(run);
        Ok(Some(para))
    }

    // --- Inline processing ---

    fn emit_inlines(&mut self, inlines: &[Inline], parent: &mut Element, base_char_pr_id: &str, active: &FormatSet) {
        for item in inlines {
            match item {
                Inline::Str(s) => {
                    let cid = self.registry.derive_char_pr(base_char_pr_id, active);
                    parent.push_child(create_text_run(s, &cid));
                }
                Inline::Space | Inline::SoftBreak => {
                    let cid = self.registry.derive_char_pr(base_char_pr_id, active);
                    parent.push_child(create_text_run(" ", &cid));
                }
                Inline::LineBreak => {
                    let cid = self.registry.derive_char_pr(base_char_pr_id, active);
                    parent.push_child(create_linebreak_run(&cid));
                }
                Inline::Strong(inner) => self.emit_with_format(inner, parent, base_char_pr_id, active, CharFormat::Bold),
                Inline::Emph(inner) => self.emit_with_format(inner, parent, base_char_pr_id, active, CharFormat::Italic),
                Inline::Underline(inner) => self.emit_with_format(inner, parent, base_char_pr_id, active, CharFormat::Underline),
                Inline::Strikeout(inner) => self.emit_with_format(inner, parent, base_char_pr_id, active, CharFormat::Strikeout),
                Inline::Superscript(inner) => {
                    self.emit_with_format(inner, parent, base_char_pr_id, active, CharFormat::Superscript)
                }
                Inline::Subscript(inner) => self.emit_with_format(inner, parent, base_char_pr_id, active, CharFormat::Subscript),
                Inline::Code(s) => {
                    let cid = self.registry.derive_char_pr(base_char_pr_id, active);
                    parent.push_child(create_text_run(s, &cid));
                }
                Inline::Link { url, inlines: text, .. } => {
                    parent.push_child(self.create_field_begin(url));
                    let mut format = active.clone();
                    format.insert(CharFormat::Underline);
                    format.insert(CharFormat::ColorBlue);
                    self.emit_inlines(text, parent, base_char_pr_id, &format);
                    parent.push_child(self.create_field_end());
                }
                Inline::Image { url, attrs, .. } => {
                    let cid = self.registry.derive_char_pr(base_char_pr_id, active);
                    let run = self.emit_image(url, attrs, &cid);
                    parent.push_child(run);
                }
                Inline::Note(blocks) => match self.emit_footnote(blocks) {
                    Ok(run) => parent.push_child(run),
                    Err(e) => log::warn!("failed to emit footnote: {e}"),
                },
            }
        }
    }

    fn emit_with_format(
        &mut self,
        inner: &[Inline],
        parent: &mut Element,
        base_char_pr_id: &str,
        active: &FormatSet,
        format: CharFormat,
    ) {
        let mut next = active.clone();
        next.insert(format);
        self.emit_inlines(inner, parent, base_char_pr_id, &next);
    }

    fn create_field_begin(&mut self, url: &str) -> Element {
        let fid = self.next_id();
        self.last_field_id = fid.clone();
        let command_url = url.replace(':', "\\:").replace('?', "\\?");
        let command_str = format!("{command_url};1;5;-1;");

        let mut run = create_run("0");
        let mut ctrl = Element::new("hp:ctrl");
        let mut field_begin = Element::new("hp:fieldBegin");
        for (k, v) in [
            ("id", fid.as_str()),
            ("type", "HYPERLINK"),
            ("name", ""),
            ("editable", "0"),
            ("dirty", "1"),
            ("zorder", "-1"),
            ("fieldid", fid.as_str()),
            ("metaTag", ""),
        ] {
            field_begin.set_attr(k, v);
        }

        let mut params = Element::new("hp:parameters");
        params.set_attr("cnt", "6");
        params.set_attr("name", "");
        for (name, value) in [
            ("Prop", "0"),
            ("Command", command_str.as_str()),
            ("Path", url),
            ("Category", "HWPHYPERLINK_TYPE_URL"),
            ("TargetType", "HWPHYPERLINK_TARGET_HYPERLINK"),
            ("DocOpenType", "HWPHYPERLINK_JUMP_DONTCARE"),
        ] {
            let tag = if name == "Prop" { "hp:integerParam" } else { "hp:stringParam" };
            let mut param = Element::new(tag);
            param.set_attr("name", name);
            param.push_text(value);
            params.push_child(param);
        }

        field_begin.push_child(params);
        ctrl.push_child(field_begin);
        run.push_child(ctrl);
        run
    }

    fn create_field_end(&mut self) -> Element {
        let fid = self.last_field_id.clone();
        let mut run = create_run("0");
        let mut ctrl = Element::new("hp:ctrl");
        let mut field_end = Element::new("hp:fieldEnd");
        field_end.set_attr("beginIDRef", &fid);
        field_end.set_attr("fieldid", &fid);
        ctrl.push_child(field_end);
        run.push_child(ctrl);
        run
    }

    fn emit_footnote(&mut self, blocks: &[Block]) -> Result<Element> {
        let inst_id = self.next_id();
        let mut run = create_run("0");
        let mut ctrl = Element::new("hp:ctrl");
        let mut footnote = Element::new("hp:footNote");
        footnote.set_attr("number", "0");
        footnote.set_attr("instId", &inst_id);

        let mut auto_num = Element::new("hp:autoNum");
        auto_num.set_attr("num", "0");
        auto_num.set_attr("numType", "FOOTNOTE");
        footnote.push_child(auto_num);

        let mut sublist = Element::new("hp:subList");
        for (k, v) in [
            ("id", inst_id.as_str()),
            ("textDirection", "HORIZONTAL"),
            ("lineWrap", "BREAK"),
            ("vertAlign", "TOP"),
            ("linkListIDRef", "0"),
            ("linkListNextIDRef", "0"),
            ("textWidth", "0"),
            ("textHeight", "0"),
            ("hasTextRef", "0"),
            ("hasNumRef", "0"),
        ] {
            sublist.set_attr(k, v);
        }

        for elem in self.emit_blocks(blocks)? {
            sublist.push_child(elem);
        }

        footnote.push_child(sublist);
        ctrl.push_child(footnote);
        run.push_child(ctrl);
        Ok(run)
    }

    // --- Images ---

    fn emit_image(&mut self, url: &str, attrs: &ImageAttrs, char_pr_id: &str) -> Element {
        if let Err(e) = crate::image::validate_image_path(url, self.base_dir.as_deref()) {
            log::warn!("skipping image with invalid path: {e}");
            return create_text_run(&format!("[Image: {url}]"), char_pr_id);
        }
        if self.images.len() >= MAX_IMAGE_COUNT {
            log::warn!("image count limit reached ({MAX_IMAGE_COUNT}). skipping image: {url}");
            return create_text_run(&format!("[Image limit exceeded: {url}]"), char_pr_id);
        }

        let full_path = match &self.base_dir {
            Some(dir) => dir.join(url),
            None => PathBuf::from(url),
        };
        let (bytes, pixel_dims) = match read_image_file(&full_path) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("failed to read image {url}: {e}");
                return create_text_run(&format!("[Image: {url}]"), char_pr_id);
            }
        };
        let ext = extension_for_path(url);
        self.embed_image_bytes(bytes, &ext, pixel_dims, attrs.width.as_deref(), attrs.height.as_deref(), char_pr_id)
    }

    /// Shared by inline images (bytes read from disk) and rendered Mermaid
    /// diagrams (bytes already in memory, no source path to validate).
    fn embed_image_bytes(
        &mut self,
        bytes: Vec<u8>,
        extension: &str,
        pixel_dims: Option<(u32, u32)>,
        width_attr: Option<&str>,
        height_attr: Option<&str>,
        char_pr_id: &str,
    ) -> Element {
        if self.images.len() >= MAX_IMAGE_COUNT {
            log::warn!("image count limit reached ({MAX_IMAGE_COUNT}). skipping embedded image");
            return create_text_run("[Image limit exceeded]", char_pr_id);
        }
        let size = resolve_size(width_attr, height_attr, pixel_dims);
        let binary_item_id = format!("img_{}", self.next_id());
        let pic_id = self.next_id();
        let inst_id = self.next_id();
        self.images.push(EmbeddedImage {
            binary_item_id: binary_item_id.clone(),
            extension: extension.to_string(),
            bytes,
        });
        build_pic_run(char_pr_id, &pic_id, &inst_id, &binary_item_id, size)
    }
}

fn clamp_nesting(level: usize, what: &str) -> usize {
    if level >= MAX_NESTING_DEPTH {
        log::warn!("{what} nesting depth limit reached ({MAX_NESTING_DEPTH}). Flattening.");
        MAX_NESTING_DEPTH - 1
    } else {
        level
    }
}

fn row_type(row_idx: usize, header_row_count: usize, total_body_rows: usize) -> &'static str {
    if row_idx < header_row_count {
        return "HEADER";
    }
    let body_idx = row_idx - header_row_count;
    if total_body_rows <= 1 {
        return "TOP";
    }
    if body_idx == 0 {
        "TOP"
    } else if body_idx == total_body_rows - 1 {
        "BOTTOM"
    } else {
        "MIDDLE"
    }
}

fn col_type(col_idx: usize, total_cols: usize) -> &'static str {
    if total_cols <= 1 {
        return "LEFT";
    }
    if col_idx == 0 {
        "LEFT"
    } else if col_idx == total_cols - 1 {
        "RIGHT"
    } else {
        "CENTER"
    }
}

fn pandoc_align_to_hwpx(align: Alignment) -> Option<HAlign> {
    match align {
        Alignment::Left => Some(HAlign::Left),
        Alignment::Center => Some(HAlign::Center),
        Alignment::Right => Some(HAlign::Right),
        Alignment::Default => None,
    }
}

fn create_para(style_id: &str, para_pr_id: &str, column_break: bool, page_break: bool) -> Element {
    let mut p = Element::new("hp:p");
    p.set_attr("paraPrIDRef", para_pr_id);
    p.set_attr("styleIDRef", style_id);
    p.set_attr("pageBreak", if page_break { "1" } else { "0" });
    p.set_attr("columnBreak", if column_break { "1" } else { "0" });
    p.set_attr("merged", "0");
    p
}

fn create_run(char_pr_id: &str) -> Element {
    let mut r = Element::new("hp:run");
    r.set_attr("charPrIDRef", char_pr_id);
    r
}

fn create_text_run(text: &str, char_pr_id: &str) -> Element {
    let mut run = create_run(char_pr_id);
    let mut t = Element::new("hp:t");
    t.push_text(text);
    run.push_child(t);
    run
}

fn create_linebreak_run(char_pr_id: &str) -> Element {
    let mut run = create_run(char_pr_id);
    let mut t = Element::new("hp:t");
    t.push_child(Element::new("hp:lineBreak"));
    run.push_child(t);
    run
}

/// Walks a copied template table looking for the `{{H<n>}}` placeholder
/// text and, on the first match, rewrites its paragraph/run/text attributes
/// to the header's resolved styles and content.
fn substitute_table_header_placeholder(
    elem: &mut Element,
    char_pr_id: &str,
    para_pr_id: &str,
    style_id: &str,
    header_text: &str,
    done: &mut bool,
) {
    if *done {
        return;
    }
    if elem.local_name() == "p" {
        let mut matched = false;
        for child in &mut elem.children {
            if let crate::xmltree::Node::Element(run) = child {
                if run.local_name() != "run" {
                    continue;
                }
                for t_child in &mut run.children {
                    if let crate::xmltree::Node::Element(t) = t_child {
                        if t.local_name() != "t" {
                            continue;
                        }
                        let text = t.direct_text();
                        if header_pattern().is_match(&text) {
                            let replaced = header_pattern().replace(&text, header_text).to_string();
                            t.children = vec![crate::xmltree::Node::Text(replaced)];
                            run.set_attr("charPrIDRef", char_pr_id);
                            matched = true;
                        }
                    }
                }
            }
        }
        if matched {
            elem.set_attr("paraPrIDRef", para_pr_id);
            elem.set_attr("styleIDRef", style_id);
            *done = true;
            return;
        }
    }
    for child in &mut elem.children {
        if *done {
            return;
        }
        if let crate::xmltree::Node::Element(e) = child {
            substitute_table_header_placeholder(e, char_pr_id, para_pr_id, style_id, header_text, done);
        }
    }
}

/// Finds the byte offset just past the first `<hp:run ...>` opening tag's
/// closing `>`, mirroring a single-capture-group regex search over the
/// first run in document order.
fn find_first_run_tag_end(body: &str) -> Option<usize> {
    let start = body.find("<hp:run")?;
    let rel_end = body[start..].find('>')?;
    Some(start + rel_end + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwpx_ast::Document;

    const MINIMAL_HEADER: &str = r#"<hh:head xmlns:hh="http://www.hancom.co.kr/hwpml/2011/head" xmlns:hc="http://www.hancom.co.kr/hwpml/2011/core">
        <hh:charProperties itemCnt="1"><hh:charPr id="0"/></hh:charProperties>
        <hh:paraProperties itemCnt="1"><hh:paraPr id="1"><hc:margin><hc:left value="0"/></hc:margin></hh:paraPr></hh:paraProperties>
        <hh:styles><hh:style id="0" paraPrIDRef="1" charPrIDRef="0"/></hh:styles>
        <hh:borderFills itemCnt="0"/>
    </hh:head>"#;

    const MINIMAL_SECTION: &str = r#"<hs:sec xmlns:hs="s" xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph">
        <hp:p paraPrIDRef="1" styleIDRef="0"><hp:run charPrIDRef="0"><hp:t>{{BODY}}</hp:t></hp:run></hp:p>
    </hs:sec>"#;

    fn build_emitter() -> (StyleRegistry, TemplateIntrospector, ConversionConfig) {
        let registry = StyleRegistry::new(MINIMAL_HEADER).unwrap();
        let introspector = TemplateIntrospector::new(MINIMAL_SECTION, &registry).unwrap();
        (registry, introspector, ConversionConfig::default())
    }

    #[test]
    fn emits_a_simple_paragraph() {
        let (mut registry, introspector, config) = build_emitter();
        let mut emitter = Emitter::new(&mut registry, &introspector, &config, None);
        let mut doc = Document::new();
        doc.push(Block::Paragraph {
            inlines: vec![Inline::Str("hello".into())],
        });
        let xml = emitter.emit_document(&doc).unwrap();
        assert!(xml.contains("hello"));
        assert!(xml.contains("<hp:p"));
    }

    #[test]
    fn bold_text_derives_a_new_char_pr_once() {
        let (mut registry, introspector, config) = build_emitter();
        let mut emitter = Emitter::new(&mut registry, &introspector, &config, None);
        let mut doc = Document::new();
        doc.push(Block::Paragraph {
            inlines: vec![
                Inline::Strong(vec![Inline::Str("a".into())]),
                Inline::Strong(vec![Inline::Str("b".into())]),
            ],
        });
        let xml = emitter.emit_document(&doc).unwrap();
        // Both bold runs share one derived charPr id (content-addressed cache).
        let occurrences = xml.matches("charPrIDRef=\"1\"").count();
        assert_eq!(occurrences, 2);
    }

    #[test]
    fn h1_after_a_prior_block_gets_a_page_break() {
        let (mut registry, introspector, config) = build_emitter();
        let mut emitter = Emitter::new(&mut registry, &introspector, &config, None);
        let mut doc = Document::new();
        doc.push(Block::Paragraph {
            inlines: vec![Inline::Str("intro".into())],
        });
        doc.push(Block::Header {
            level: 1,
            inlines: vec![Inline::Str("Title".into())],
        });
        let xml = emitter.emit_document(&doc).unwrap();
        assert!(xml.contains("pageBreak=\"1\""));
    }

    #[test]
    fn ordered_list_without_template_style_falls_back_to_auto_numbering() {
        let (mut registry, introspector, config) = build_emitter();
        let mut emitter = Emitter::new(&mut registry, &introspector, &config, None);
        let mut doc = Document::new();
        doc.push(Block::OrderedList {
            start: 1,
            items: vec![
                vec![Block::Paragraph {
                    inlines: vec![Inline::Str("first".into())],
                }],
                vec![Block::Paragraph {
                    inlines: vec![Inline::Str("second".into())],
                }],
            ],
        });
        let xml = emitter.emit_document(&doc).unwrap();
        assert!(xml.contains("heading"));
        assert!(xml.contains("first"));
        assert!(xml.contains("second"));
    }

    #[test]
    fn oversized_table_column_count_produces_expected_cell_count() {
        let (mut registry, introspector, config) = build_emitter();
        let mut emitter = Emitter::new(&mut registry, &introspector, &config, None);
        let row = TableRow {
            cells: vec![TableCell::new(vec![]), TableCell::new(vec![])],
        };
        let result = emitter
            .emit_table(
                &[
                    ColumnSpec {
                        align: Alignment::Default,
                        width: ColumnWidth::Default,
                    },
                    ColumnSpec {
                        align: Alignment::Default,
                        width: ColumnWidth::Default,
                    },
                ],
                &[row],
                &[],
                &[],
            )
            .unwrap()
            .unwrap();
        let xml = crate::xmltree::serialize(&result);
        assert_eq!(xml.matches("<hp:tc").count(), 2);
    }

    #[test]
    fn aligned_table_cell_emits_a_derived_para_pr() {
        let (mut registry, introspector, config) = build_emitter();
        let mut emitter = Emitter::new(&mut registry, &introspector, &config, None);
        let mut right_cell = TableCell::new(vec![Block::Paragraph {
            inlines: vec![Inline::Str("r".into())],
        }]);
        right_cell.align = Alignment::Right;
        let row = TableRow {
            cells: vec![TableCell::new(vec![]), right_cell],
        };
        let result = emitter
            .emit_table(
                &[
                    ColumnSpec {
                        align: Alignment::Default,
                        width: ColumnWidth::Default,
                    },
                    ColumnSpec {
                        align: Alignment::Default,
                        width: ColumnWidth::Default,
                    },
                ],
                &[row],
                &[],
                &[],
            )
            .unwrap()
            .unwrap();
        let xml = crate::xmltree::serialize(&result);
        assert!(xml.contains(r#"horizontal="RIGHT""#));
        // The Normal paragraph property is id "1"; a right-aligned cell must
        // reference a distinct, freshly derived paraPr.
        assert!(xml.contains(r#"paraPrIDRef="2""#));
    }

    #[test]
    fn link_wraps_field_begin_and_field_end_with_escaped_command() {
        let (mut registry, introspector, config) = build_emitter();
        let mut emitter = Emitter::new(&mut registry, &introspector, &config, None);
        let mut doc = Document::new();
        doc.push(Block::Paragraph {
            inlines: vec![Inline::Link {
                url: "https://example.com/a?b=1".into(),
                title: None,
                inlines: vec![Inline::Str("link".into())],
            }],
        });
        let xml = emitter.emit_document(&doc).unwrap();
        assert!(xml.contains("fieldBegin"));
        assert!(xml.contains("fieldEnd"));
        assert!(xml.contains("https\\:"));
        assert!(xml.contains("\\?"));
    }
}
