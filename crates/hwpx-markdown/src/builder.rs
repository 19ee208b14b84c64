//! Converts a stream of [`pulldown_cmark`] events into an [`hwpx_ast::Document`].
//!
//! Block containers nest (lists hold items, items hold blocks, block quotes
//! hold blocks, table cells hold blocks), so the walk keeps a stack of open
//! frames and routes each completed block or inline into whichever frame is
//! on top. Footnotes get special handling: pulldown-cmark models them the
//! way HTML does, as an out-of-line reference pointing at a definition
//! collected elsewhere, while the document tree wants the footnote's content
//! inlined at the point of use (`Inline::Note`). We buffer the event stream,
//! pre-build each definition's blocks, and splice them in at every
//! `FootnoteReference` we hit during the main walk.

use std::collections::{HashMap, VecDeque};

use hwpx_ast::{Alignment, Block, ColumnSpec, ColumnWidth, Document, ImageAttrs, Inline, TableCell, TableRow};
use pulldown_cmark::{
    Alignment as MdAlignment, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};
use regex::Regex;
use std::sync::OnceLock;

fn image_attrs_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\{([^}]*)\}").expect("static image attribute pattern"))
}

/// Standard Markdown only has heading levels 1-6; HWPX's outline supports up
/// to 9. A `#######`..`#########` line is swapped for a placeholder
/// paragraph before parsing and restored to a `Header` afterward, so the
/// rest of the pipeline never needs to know the trick happened.
fn extended_header_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{7,9})\s+(.+?)\s*#*\s*$").expect("static extended header pattern"))
}

const EXTENDED_HEADER_MARKER: &str = "\u{2063}hwpx-ext-header-";

fn table_separator_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\|[\s:]*-").expect("static table separator pattern"))
}

fn table_separator_cell_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^:?-+:?$").expect("static table separator cell pattern"))
}

/// Swaps each `#######`-`#########` line for a blank-line-wrapped
/// placeholder token, recording the (level, raw inline text) it stands for.
/// Wrapping in blank lines ensures the placeholder lands as its own
/// paragraph rather than merging into an adjacent one.
fn preprocess_extended_headers(markdown: &str) -> (String, HashMap<String, (u8, String)>) {
    let mut out_lines = Vec::new();
    let mut placeholders = HashMap::new();
    let mut counter = 0usize;
    for line in markdown.lines() {
        if let Some(caps) = extended_header_pattern().captures(line) {
            let level = caps[1].len() as u8;
            let content = caps[2].to_string();
            let token = format!("{EXTENDED_HEADER_MARKER}{counter}");
            counter += 1;
            placeholders.insert(token.clone(), (level, content));
            out_lines.push(String::new());
            out_lines.push(token);
            out_lines.push(String::new());
        } else {
            out_lines.push(line.to_string());
        }
    }
    (out_lines.join("\n"), placeholders)
}

/// Scans raw Markdown for GFM table separator rows (`|:---|-----|--:|`) in
/// document order and records each column's dash count, so the Block
/// Emitter can derive proportional widths from them later. A separator row
/// whose cells don't all match the `:?-+:?` grammar is not a table
/// separator and is skipped.
fn extract_table_dash_counts(markdown: &str) -> VecDeque<Vec<u32>> {
    let mut out = VecDeque::new();
    for line in markdown.lines() {
        let stripped = line.trim();
        if !table_separator_pattern().is_match(stripped) {
            continue;
        }
        let Some(inner) = stripped.strip_prefix('|').and_then(|s| s.strip_suffix('|')) else {
            continue;
        };
        let cells: Vec<&str> = inner.split('|').map(str::trim).collect();
        if cells.is_empty() || !cells.iter().all(|c| c.is_empty() || table_separator_cell_pattern().is_match(c)) {
            continue;
        }
        out.push_back(cells.iter().map(|c| c.matches('-').count() as u32).collect());
    }
    out
}

/// Parses `markdown` (with frontmatter already stripped) into the document's
/// block sequence. Metadata is filled in by the caller from the frontmatter.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut table_widths = extract_table_dash_counts(markdown);
    let (preprocessed, extended_headers) = preprocess_extended_headers(markdown);

    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
    let events: Vec<Event> = Parser::new_ext(&preprocessed, options).collect();
    let footnotes = collect_footnote_definitions(&events);
    let mut blocks = build_blocks(&events, &footnotes, &mut table_widths);
    if !extended_headers.is_empty() {
        restore_extended_headers(&mut blocks, &extended_headers);
    }
    blocks
}

/// Parses a short run of inline Markdown (an extended header's raw text)
/// into inlines, reusing the same event-walking machinery as a one-off
/// single-paragraph document.
fn parse_inline_markdown(text: &str) -> Vec<Inline> {
    let events: Vec<Event> = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH).collect();
    let blocks = build_blocks(&events, &HashMap::new(), &mut VecDeque::new());
    match blocks.into_iter().next() {
        Some(Block::Paragraph { inlines }) | Some(Block::Plain { inlines }) => inlines,
        _ => vec![Inline::Str(text.to_string())],
    }
}

/// Recursively replaces every placeholder paragraph with the `Header` block
/// it stands for, wherever it landed in the tree (list items, block quotes,
/// table cells included).
fn restore_extended_headers(blocks: &mut Vec<Block>, placeholders: &HashMap<String, (u8, String)>) {
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph { inlines } | Block::Plain { inlines } => {
                if let [Inline::Str(s)] = inlines.as_slice() {
                    if let Some((level, content)) = placeholders.get(s.trim()) {
                        let replacement = Block::Header {
                            level: *level,
                            inlines: parse_inline_markdown(content),
                        };
                        *block = replacement;
                    }
                }
            }
            Block::BlockQuote { blocks: inner } => restore_extended_headers(inner, placeholders),
            Block::BulletList { items } | Block::OrderedList { items, .. } => {
                for item in items.iter_mut() {
                    restore_extended_headers(item, placeholders);
                }
            }
            Block::Table { head_rows, body_rows, foot_rows, .. } => {
                for row in head_rows.iter_mut().chain(body_rows.iter_mut()).chain(foot_rows.iter_mut()) {
                    for cell in row.cells.iter_mut() {
                        restore_extended_headers(&mut cell.blocks, placeholders);
                    }
                }
            }
            Block::Header { .. } | Block::CodeBlock { .. } | Block::HorizontalRule => {}
        }
    }
}

/// First pass: pulls each `FootnoteDefinition`'s body out of the event
/// stream and builds its blocks independently, keyed by label. Footnotes
/// referencing other footnotes are not resolved in this pass (an edge case
/// the original Markdown footnote syntax does not sensibly support anyway).
fn collect_footnote_definitions(events: &[Event]) -> HashMap<String, Vec<Block>> {
    let mut defs = HashMap::new();
    let mut i = 0;
    while i < events.len() {
        if let Event::Start(Tag::FootnoteDefinition(label)) = &events[i] {
            let label = label.to_string();
            let start = i + 1;
            let mut depth = 1usize;
            let mut end = start;
            while end < events.len() && depth > 0 {
                match &events[end] {
                    Event::Start(Tag::FootnoteDefinition(_)) => depth += 1,
                    Event::End(TagEnd::FootnoteDefinition) => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    end += 1;
                }
            }
            let body_blocks = build_blocks(&events[start..end], &HashMap::new(), &mut VecDeque::new());
            defs.insert(label, body_blocks);
            i = end + 1;
        } else {
            i += 1;
        }
    }
    defs
}

/// A single open block-level container frame.
enum Open {
    Root(Vec<Block>),
    Paragraph(Vec<Inline>),
    Heading { level: u8, inlines: Vec<Inline> },
    BlockQuote(Vec<Block>),
    List { ordered: Option<u32>, items: Vec<Vec<Block>> },
    Item(Vec<Block>),
    CodeBlock { classes: Vec<String>, text: String },
    Table { colspecs: Vec<ColumnSpec>, head_rows: Vec<TableRow>, body_rows: Vec<TableRow>, in_head: bool },
    TableRow(Vec<TableCell>),
    TableCell { blocks: Vec<Block> },
    FootnoteDefinition(Vec<Block>),
}

/// A single open inline-level container frame, living inside whatever block
/// frame is presently accepting inlines.
enum OpenInline {
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, title: String, inlines: Vec<Inline> },
    Image { url: String, title: String },
}

struct Builder<'a, 'b> {
    footnotes: &'a HashMap<String, Vec<Block>>,
    blocks: Vec<Open>,
    inlines: Vec<OpenInline>,
    /// Set right after closing an `Image`, so the very next `Text` event can
    /// be scanned for a trailing `{width=... height=...}` attribute block.
    pending_image: Option<(String, String)>,
    /// Per-table dash counts from the raw separator row, consumed in
    /// document order as each `Table` tag opens.
    table_widths: &'b mut VecDeque<Vec<u32>>,
}

fn build_blocks(
    events: &[Event],
    footnotes: &HashMap<String, Vec<Block>>,
    table_widths: &mut VecDeque<Vec<u32>>,
) -> Vec<Block> {
    let mut builder = Builder {
        footnotes,
        blocks: vec![Open::Root(Vec::new())],
        inlines: Vec::new(),
        pending_image: None,
        table_widths,
    };
    for event in events {
        builder.handle(event);
    }
    match builder.blocks.pop() {
        Some(Open::Root(blocks)) => blocks,
        _ => Vec::new(),
    }
}

impl<'a, 'b> Builder<'a, 'b> {
    fn handle(&mut self, event: &Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag_end) => self.end_tag(*tag_end),
            Event::Text(text) => self.text(text),
            Event::Code(text) => self.push_inline(Inline::Code(text.to_string())),
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::LineBreak),
            Event::Rule => self.push_block(Block::HorizontalRule),
            Event::FootnoteReference(label) => {
                let blocks = self.footnotes.get(label.as_ref()).cloned().unwrap_or_default();
                self.push_inline(Inline::Note(blocks));
            }
            Event::Html(_) | Event::InlineHtml(_) | Event::TaskListMarker(_) => {}
        }
    }

    fn text(&mut self, text: &CowStr) {
        if let Some((url, title)) = self.pending_image.take() {
            if let Some(caps) = image_attrs_pattern().captures(text) {
                let attrs = parse_image_attrs(&caps[1]);
                let consumed = caps.get(0).unwrap().end();
                self.push_inline(Inline::Image { url, title, attrs });
                let remainder = &text[consumed..];
                if !remainder.is_empty() {
                    self.push_inline(Inline::Str(remainder.to_string()));
                }
                return;
            }
            self.push_inline(Inline::Image {
                url,
                title,
                attrs: ImageAttrs::default(),
            });
        }

        if let Some(Open::CodeBlock { text: buf, .. }) = self.blocks.last_mut() {
            buf.push_str(text);
            return;
        }
        self.push_inline(Inline::Str(text.to_string()));
    }

    fn start_tag(&mut self, tag: &Tag) {
        match tag {
            Tag::Paragraph => self.blocks.push(Open::Paragraph(Vec::new())),
            Tag::Heading { level, .. } => self.blocks.push(Open::Heading {
                level: heading_level(*level),
                inlines: Vec::new(),
            }),
            Tag::BlockQuote(_) => self.blocks.push(Open::BlockQuote(Vec::new())),
            Tag::CodeBlock(kind) => {
                let classes = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>(),
                    CodeBlockKind::Indented => Vec::new(),
                };
                self.blocks.push(Open::CodeBlock { classes, text: String::new() });
            }
            Tag::List(start) => self.blocks.push(Open::List {
                ordered: start.map(|n| n as u32),
                items: Vec::new(),
            }),
            Tag::Item => self.blocks.push(Open::Item(Vec::new())),
            Tag::FootnoteDefinition(_) => self.blocks.push(Open::FootnoteDefinition(Vec::new())),
            Tag::Table(aligns) => {
                let dash_counts = self.table_widths.pop_front();
                let total: u32 = dash_counts.as_ref().map(|c| c.iter().sum()).unwrap_or(0);
                let colspecs = aligns
                    .iter()
                    .enumerate()
                    .map(|(i, a)| {
                        let width = match (&dash_counts, total) {
                            (Some(counts), t) if t > 0 => counts
                                .get(i)
                                .filter(|&&n| n > 0)
                                .map(|&n| ColumnWidth::Proportional(n as f64 / t as f64))
                                .unwrap_or(ColumnWidth::Default),
                            _ => ColumnWidth::Default,
                        };
                        ColumnSpec { align: table_align(*a), width }
                    })
                    .collect();
                self.blocks.push(Open::Table {
                    colspecs,
                    head_rows: Vec::new(),
                    body_rows: Vec::new(),
                    in_head: false,
                });
            }
            Tag::TableHead => {
                if let Some(Open::Table { in_head, .. }) = self.blocks.last_mut() {
                    *in_head = true;
                }
                self.blocks.push(Open::TableRow(Vec::new()));
            }
            Tag::TableRow => self.blocks.push(Open::TableRow(Vec::new())),
            Tag::TableCell => self.blocks.push(Open::TableCell { blocks: Vec::new() }),
            Tag::Emphasis => self.inlines.push(OpenInline::Emphasis(Vec::new())),
            Tag::Strong => self.inlines.push(OpenInline::Strong(Vec::new())),
            Tag::Strikethrough => self.inlines.push(OpenInline::Strikethrough(Vec::new())),
            Tag::Link { dest_url, title, .. } => self.inlines.push(OpenInline::Link {
                url: dest_url.to_string(),
                title: title.to_string(),
                inlines: Vec::new(),
            }),
            Tag::Image { dest_url, title, .. } => self.inlines.push(OpenInline::Image {
                url: dest_url.to_string(),
                title: title.to_string(),
            }),
            Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
        }
    }

    fn end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph => {
                if let Some(Open::Paragraph(inlines)) = self.blocks.pop() {
                    self.push_block(Block::Paragraph { inlines });
                }
            }
            TagEnd::Heading(_) => {
                if let Some(Open::Heading { level, inlines }) = self.blocks.pop() {
                    self.push_block(Block::Header { level, inlines });
                }
            }
            TagEnd::BlockQuote(_) => {
                if let Some(Open::BlockQuote(blocks)) = self.blocks.pop() {
                    self.push_block(Block::BlockQuote { blocks });
                }
            }
            TagEnd::CodeBlock => {
                if let Some(Open::CodeBlock { classes, text }) = self.blocks.pop() {
                    self.push_block(Block::CodeBlock { classes, text });
                }
            }
            TagEnd::List(ordered) => {
                if let Some(Open::List { ordered: start, items }) = self.blocks.pop() {
                    let block = if ordered {
                        Block::OrderedList { start: start.unwrap_or(1), items }
                    } else {
                        Block::BulletList { items }
                    };
                    self.push_block(block);
                }
            }
            TagEnd::Item => {
                if let Some(Open::Item(blocks)) = self.blocks.pop() {
                    if let Some(Open::List { items, .. }) = self.blocks.last_mut() {
                        items.push(blocks);
                    }
                }
            }
            TagEnd::FootnoteDefinition => {
                if let Some(Open::FootnoteDefinition(blocks)) = self.blocks.pop() {
                    // Only reached when a definition is walked as part of
                    // the main document pass rather than pre-extracted; the
                    // blocks have nowhere sensible to land, so they're
                    // dropped silently (the pre-pass already captured them
                    // for reference-site splicing).
                    let _ = blocks;
                }
            }
            TagEnd::Table => {
                if let Some(Open::Table { colspecs, head_rows, body_rows, .. }) = self.blocks.pop() {
                    self.push_block(Block::Table {
                        colspecs,
                        head_rows,
                        body_rows,
                        foot_rows: Vec::new(),
                    });
                }
            }
            TagEnd::TableHead => {
                if let Some(Open::TableRow(cells)) = self.blocks.pop() {
                    if let Some(Open::Table { head_rows, in_head, .. }) = self.blocks.last_mut() {
                        head_rows.push(TableRow { cells });
                        *in_head = false;
                    }
                }
            }
            TagEnd::TableRow => {
                if let Some(Open::TableRow(cells)) = self.blocks.pop() {
                    if let Some(Open::Table { body_rows, .. }) = self.blocks.last_mut() {
                        body_rows.push(TableRow { cells });
                    }
                }
            }
            TagEnd::TableCell => {
                if let Some(Open::TableCell { blocks, .. }) = self.blocks.pop() {
                    let col_index = match self.blocks.last() {
                        Some(Open::TableRow(cells)) => cells.len(),
                        _ => 0,
                    };
                    let align = match self.blocks.len().checked_sub(2).and_then(|i| self.blocks.get(i)) {
                        Some(Open::Table { colspecs, .. }) => {
                            colspecs.get(col_index).map(|c| c.align).unwrap_or(Alignment::Default)
                        }
                        _ => Alignment::Default,
                    };
                    if let Some(Open::TableRow(cells)) = self.blocks.last_mut() {
                        let mut cell = TableCell::new(blocks);
                        cell.align = align;
                        cells.push(cell);
                    }
                }
            }
            TagEnd::Emphasis => {
                if let Some(OpenInline::Emphasis(inlines)) = self.inlines.pop() {
                    self.push_inline(Inline::Emph(inlines));
                }
            }
            TagEnd::Strong => {
                if let Some(OpenInline::Strong(inlines)) = self.inlines.pop() {
                    self.push_inline(Inline::Strong(inlines));
                }
            }
            TagEnd::Strikethrough => {
                if let Some(OpenInline::Strikethrough(inlines)) = self.inlines.pop() {
                    self.push_inline(Inline::Strikeout(inlines));
                }
            }
            TagEnd::Link => {
                if let Some(OpenInline::Link { url, title, inlines }) = self.inlines.pop() {
                    self.push_inline(Inline::Link { url, title, inlines });
                }
            }
            TagEnd::Image => {
                if let Some(OpenInline::Image { url, title }) = self.inlines.pop() {
                    self.pending_image = Some((url, title));
                }
            }
            TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.blocks.last_mut() {
            Some(Open::Root(blocks)) => blocks.push(block),
            Some(Open::BlockQuote(blocks)) => blocks.push(block),
            Some(Open::Item(blocks)) => blocks.push(block),
            Some(Open::TableCell { blocks, .. }) => blocks.push(block),
            Some(Open::FootnoteDefinition(blocks)) => blocks.push(block),
            _ => {}
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if let Some(open) = self.inlines.last_mut() {
            let target = match open {
                OpenInline::Strong(inlines)
                | OpenInline::Emphasis(inlines)
                | OpenInline::Strikethrough(inlines)
                | OpenInline::Link { inlines, .. } => inlines,
                OpenInline::Image { .. } => {
                    // Image alt text is consumed into the Image node itself
                    // by the original renderer; we don't carry it on
                    // `ImageAttrs`, so inline content inside `![...]` is
                    // dropped once the image tag closes.
                    return;
                }
            };
            target.push(inline);
            return;
        }
        match self.blocks.last_mut() {
            Some(Open::Paragraph(inlines)) => inlines.push(inline),
            Some(Open::Heading { inlines, .. }) => inlines.push(inline),
            _ => {}
        }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn table_align(align: MdAlignment) -> Alignment {
    match align {
        MdAlignment::Left => Alignment::Left,
        MdAlignment::Center => Alignment::Center,
        MdAlignment::Right => Alignment::Right,
        MdAlignment::None => Alignment::Default,
    }
}

fn parse_image_attrs(raw: &str) -> ImageAttrs {
    let mut attrs = ImageAttrs::default();
    for pair in raw.split_whitespace() {
        let Some((key, value)) = pair.split_once('=') else { continue };
        let value = value.trim_matches(|c| c == '"' || c == '\'');
        match key {
            "width" => attrs.width = Some(value.to_string()),
            "height" => attrs.height = Some(value.to_string()),
            _ => {}
        }
    }
    attrs
}

/// Builds the title/author fallback metadata for a document that had no
/// frontmatter title: the plain text of the first `Header{level: 1}`.
pub fn fallback_title(blocks: &[Block]) -> Option<String> {
    blocks.iter().find_map(|block| match block {
        Block::Header { level: 1, inlines } => Some(Inline::plain_text(inlines)),
        _ => None,
    })
}

pub fn into_document(mut meta: hwpx_ast::DocumentMeta, blocks: Vec<Block>) -> Document {
    if meta.title.is_none() {
        meta.title = fallback_title(&blocks);
    }
    Document { metadata: meta, blocks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_header_level_seven_is_restored() {
        let blocks = parse_blocks("####### Deeply Nested\n\nbody\n");
        match &blocks[0] {
            Block::Header { level, inlines } => {
                assert_eq!(*level, 7);
                assert_eq!(Inline::plain_text(inlines), "Deeply Nested");
            }
            other => panic!("expected header, got {other:?}"),
        }
    }

    #[test]
    fn extended_header_level_nine_preserves_inline_emphasis() {
        let blocks = parse_blocks("######### *Emph* Title\n");
        match &blocks[0] {
            Block::Header { level, inlines } => {
                assert_eq!(*level, 9);
                assert!(inlines.iter().any(|i| matches!(i, Inline::Emph(_))));
            }
            other => panic!("expected header, got {other:?}"),
        }
    }

    #[test]
    fn ten_hashes_is_not_an_extended_header() {
        let blocks = parse_blocks("########## not a header\n");
        assert!(matches!(blocks[0], Block::Paragraph { .. }));
    }

    #[test]
    fn table_separator_dash_counts_become_proportional_widths() {
        let blocks = parse_blocks("| A | B | C |\n|:---|:-----|:--|\n| 1 | 2 | 3 |\n");
        match &blocks[0] {
            Block::Table { colspecs, .. } => {
                let widths: Vec<f64> = colspecs
                    .iter()
                    .map(|c| match c.width {
                        ColumnWidth::Proportional(p) => p,
                        ColumnWidth::Default => panic!("expected a proportional width"),
                    })
                    .collect();
                assert!((widths[0] - 0.3).abs() < 1e-9);
                assert!((widths[1] - 0.5).abs() < 1e-9);
                assert!((widths[2] - 0.2).abs() < 1e-9);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn paragraph_with_bold_and_emphasis() {
        let blocks = parse_blocks("Hello **bold** and *em*.\n");
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::Paragraph { inlines } => {
                assert!(inlines.iter().any(|i| matches!(i, Inline::Strong(_))));
                assert!(inlines.iter().any(|i| matches!(i, Inline::Emph(_))));
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn nested_bullet_list() {
        let blocks = parse_blocks("- one\n- two\n  - nested\n");
        match &blocks[0] {
            Block::BulletList { items } => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[1][1], Block::BulletList { .. }));
            }
            other => panic!("expected bullet list, got {other:?}"),
        }
    }

    #[test]
    fn ordered_list_start_number_is_preserved() {
        let blocks = parse_blocks("3. three\n4. four\n");
        match &blocks[0] {
            Block::OrderedList { start, items } => {
                assert_eq!(*start, 3);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected ordered list, got {other:?}"),
        }
    }

    #[test]
    fn fenced_code_block_records_info_string_as_classes() {
        let blocks = parse_blocks("```mermaid\ngraph TD;\nA-->B;\n```\n");
        match &blocks[0] {
            Block::CodeBlock { classes, text } => {
                assert_eq!(classes, &vec!["mermaid".to_string()]);
                assert!(text.contains("A-->B"));
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn image_with_trailing_attribute_block_sets_width_and_height() {
        let blocks = parse_blocks("![a diagram](pic.png){width=300px height=200px}\n");
        let Block::Paragraph { inlines } = &blocks[0] else { panic!("expected paragraph") };
        let Inline::Image { url, attrs, .. } = &inlines[0] else { panic!("expected image") };
        assert_eq!(url, "pic.png");
        assert_eq!(attrs.width.as_deref(), Some("300px"));
        assert_eq!(attrs.height.as_deref(), Some("200px"));
    }

    #[test]
    fn image_without_attribute_block_has_no_size_hints() {
        let blocks = parse_blocks("![a diagram](pic.png)\n");
        let Block::Paragraph { inlines } = &blocks[0] else { panic!("expected paragraph") };
        let Inline::Image { attrs, .. } = &inlines[0] else { panic!("expected image") };
        assert_eq!(attrs.width, None);
        assert_eq!(attrs.height, None);
    }

    #[test]
    fn footnote_reference_is_inlined_as_a_note() {
        let blocks = parse_blocks("Body text.[^1]\n\n[^1]: A footnote.\n");
        let Block::Paragraph { inlines } = &blocks[0] else { panic!("expected paragraph") };
        let note = inlines.iter().find_map(|i| match i {
            Inline::Note(blocks) => Some(blocks),
            _ => None,
        });
        let note = note.expect("expected a Note inline");
        assert_eq!(note.len(), 1);
        match &note[0] {
            Block::Paragraph { inlines } => assert_eq!(Inline::plain_text(inlines), "A footnote."),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn table_with_alignment_and_header_row() {
        let md = "| A | B |\n|:--|--:|\n| 1 | 2 |\n";
        let blocks = parse_blocks(md);
        match &blocks[0] {
            Block::Table { colspecs, head_rows, body_rows, .. } => {
                assert_eq!(colspecs[0].align, Alignment::Left);
                assert_eq!(colspecs[1].align, Alignment::Right);
                assert_eq!(head_rows.len(), 1);
                assert_eq!(body_rows.len(), 1);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn table_cells_carry_their_column_alignment() {
        let md = "| A | B | C |\n|:--|:-:|--:|\n| 1 | 2 | 3 |\n";
        let blocks = parse_blocks(md);
        match &blocks[0] {
            Block::Table { head_rows, body_rows, .. } => {
                assert_eq!(head_rows[0].cells[0].align, Alignment::Left);
                assert_eq!(head_rows[0].cells[1].align, Alignment::Center);
                assert_eq!(head_rows[0].cells[2].align, Alignment::Right);
                assert_eq!(body_rows[0].cells[0].align, Alignment::Left);
                assert_eq!(body_rows[0].cells[1].align, Alignment::Center);
                assert_eq!(body_rows[0].cells[2].align, Alignment::Right);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn blockquote_nests_blocks() {
        let blocks = parse_blocks("> quoted text\n> more\n");
        match &blocks[0] {
            Block::BlockQuote { blocks } => assert_eq!(blocks.len(), 1),
            other => panic!("expected block quote, got {other:?}"),
        }
    }

    #[test]
    fn missing_frontmatter_title_falls_back_to_first_h1() {
        let blocks = parse_blocks("# My Title\n\nbody\n");
        let doc = into_document(hwpx_ast::DocumentMeta::default(), blocks);
        assert_eq!(doc.metadata.title.as_deref(), Some("My Title"));
    }
}
