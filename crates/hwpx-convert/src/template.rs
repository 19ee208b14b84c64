//! The Template Introspector: scans a reference template's `section0.xml`
//! for the `{{...}}` placeholder vocabulary and records the styling each
//! placeholder carries, so the Block Emitter can reuse it instead of
//! inventing styles of its own.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::constants::CellMargin;
use crate::error::Result;
use crate::style_registry::StyleRegistry;
use crate::xmltree::Element;

fn cell_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{CELL_(\w+)\}\}").unwrap())
}

fn list_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{LIST_(BULLET|ORDERED)_(\d+)\}\}").unwrap())
}

pub(crate) fn header_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(H[1-9])\}\}").unwrap())
}

fn generic_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderMode {
    Plain,
    Prefix,
    Table,
}

#[derive(Debug, Clone)]
pub struct PlaceholderStyle {
    pub char_pr_id: String,
    pub para_pr_id: String,
    pub style_id: String,
    pub prefix: Option<String>,
    pub prefix_char_pr_id: Option<String>,
    pub table: Option<Element>,
    pub mode: PlaceholderMode,
    pub numbering_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CellStyle {
    pub border_fill_id: Option<String>,
    pub para_pr_id: String,
    pub style_id: String,
    pub char_pr_id: String,
    pub cell_margin: CellMargin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ListType {
    Bullet,
    Ordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Numbering,
    Prefix,
}

#[derive(Debug, Clone)]
pub struct ListStyle {
    pub char_pr_id: String,
    pub para_pr_id: String,
    pub mode: ListMode,
    pub prefix: Option<String>,
    pub num_pr_id: Option<String>,
}

pub struct TemplateIntrospector {
    pub placeholders: BTreeMap<String, PlaceholderStyle>,
    pub cell_styles: BTreeMap<String, CellStyle>,
    pub list_styles: BTreeMap<(ListType, usize), ListStyle>,
    pub table_width: Option<i64>,
    pub page_setup_xml: Option<String>,
}

impl TemplateIntrospector {
    pub fn new(section0_xml: &str, registry: &StyleRegistry) -> Result<Self> {
        let section_root = crate::xmltree::parse(section0_xml)?;
        let page_setup_xml = extract_page_setup(&section_root);

        let mut placeholders = BTreeMap::new();
        let mut cell_styles = BTreeMap::new();
        let mut table_width = None;
        find_table_placeholders(&section_root, &mut placeholders, &mut cell_styles, &mut table_width);

        let mut list_styles = BTreeMap::new();
        find_paragraph_placeholders(&section_root, registry, &mut placeholders, &mut list_styles);

        Ok(Self {
            placeholders,
            cell_styles,
            list_styles,
            table_width,
            page_setup_xml,
        })
    }
}

/// Pulls the `<hp:secPr>`/`<hp:ctrl>` page-setup elements out of the
/// template's first run, so the Block Emitter can splice them back into
/// the very first run of the converted document (HWPX page geometry lives
/// on the first run of a section, not on the section element itself).
fn extract_page_setup(section_root: &Element) -> Option<String> {
    let first_para = section_root.descendants().into_iter().find(|e| e.local_name() == "p")?;
    let first_run = first_para.child("run")?;
    let mut out = String::new();
    for child in &first_run.children {
        if let crate::xmltree::Node::Element(e) = child {
            if e.local_name() == "secPr" || e.local_name() == "ctrl" {
                out.push_str(&crate::xmltree::serialize(e));
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn extract_style_ids(para: &Element, run: &Element) -> (String, String, String) {
    (
        run.attr("charPrIDRef").unwrap_or("0").to_string(),
        para.attr("paraPrIDRef").unwrap_or("0").to_string(),
        para.attr("styleIDRef").unwrap_or("0").to_string(),
    )
}

fn extract_cell_margin(tc: &Element) -> CellMargin {
    let default = crate::constants::CELL_MARGIN_DEFAULT;
    let Some(margin) = tc.descendants().into_iter().find(|e| e.local_name() == "cellMargin") else {
        return default;
    };
    CellMargin {
        left: margin.attr("left").and_then(|v| v.parse().ok()).unwrap_or(default.left),
        right: margin.attr("right").and_then(|v| v.parse().ok()).unwrap_or(default.right),
        top: margin.attr("top").and_then(|v| v.parse().ok()).unwrap_or(default.top),
        bottom: margin.attr("bottom").and_then(|v| v.parse().ok()).unwrap_or(default.bottom),
    }
}

fn find_table_numbering_text(tbl: &Element, placeholder_text: &str) -> Option<String> {
    for t in tbl.descendants() {
        if t.local_name() != "t" {
            continue;
        }
        let text = t.direct_text();
        let trimmed = text.trim();
        if trimmed.is_empty() || text == placeholder_text {
            continue;
        }
        if header_pattern().is_match(&text) || cell_pattern().is_match(&text) || generic_pattern().is_match(&text) {
            continue;
        }
        return Some(trimmed.to_string());
    }
    None
}

fn find_table_placeholders(
    section_root: &Element,
    placeholders: &mut BTreeMap<String, PlaceholderStyle>,
    cell_styles: &mut BTreeMap<String, CellStyle>,
    table_width: &mut Option<i64>,
) {
    for tbl in section_root.descendants() {
        if tbl.local_name() != "tbl" {
            continue;
        }
        let mut has_cell_placeholder = false;

        for tc in tbl.descendants() {
            if tc.local_name() != "tc" {
                continue;
            }
            for para in tc.descendants() {
                if para.local_name() != "p" {
                    continue;
                }
                for run in para.children_named("run") {
                    for t in run.children_named("t") {
                        let text = t.direct_text();
                        if text.is_empty() {
                            continue;
                        }

                        if let Some(m) = cell_pattern().captures(&text) {
                            let cell_key = m[1].to_uppercase();
                            let (char_pr_id, para_pr_id, style_id) = extract_style_ids(para, run);
                            cell_styles.insert(
                                cell_key,
                                CellStyle {
                                    border_fill_id: tc.attr("borderFillIDRef").map(|s| s.to_string()),
                                    para_pr_id,
                                    style_id,
                                    char_pr_id,
                                    cell_margin: extract_cell_margin(tc),
                                },
                            );
                            has_cell_placeholder = true;
                            continue;
                        }

                        if let Some(m) = header_pattern().captures(&text) {
                            let header_name = m[1].to_uppercase();
                            let prefix = text[..m.get(0).unwrap().start()].to_string();
                            let (char_pr_id, para_pr_id, style_id) = extract_style_ids(para, run);
                            let numbering_text = find_table_numbering_text(tbl, &text);
                            placeholders.insert(
                                header_name,
                                PlaceholderStyle {
                                    char_pr_id,
                                    para_pr_id,
                                    style_id,
                                    prefix: if prefix.is_empty() { None } else { Some(prefix) },
                                    prefix_char_pr_id: None,
                                    table: Some(tbl.clone()),
                                    mode: PlaceholderMode::Table,
                                    numbering_text,
                                },
                            );
                        }
                    }
                }
            }
        }

        if has_cell_placeholder {
            if let Some(sz) = tbl.child("sz") {
                if let Some(width) = sz.attr("width").and_then(|v| v.parse().ok()) {
                    *table_width = Some(width);
                }
            }
        }
    }
}

/// Walks preceding sibling `<hp:run>` elements in `para` collecting their
/// text as a prefix, for the case where a placeholder's prefix (e.g. `"□
/// "`) sits in its own run rather than sharing a run with `{{H3}}`.
fn collect_preceding_runs_prefix(para: &Element, current_run: &Element) -> (Option<String>, Option<String>) {
    let mut prefix = String::new();
    let mut char_pr_id = None;
    for run in para.children_named("run") {
        if std::ptr::eq(run, current_run) {
            break;
        }
        for t in run.children_named("t") {
            let text = t.direct_text();
            if !text.is_empty() {
                prefix.push_str(&text);
                if char_pr_id.is_none() {
                    char_pr_id = Some(run.attr("charPrIDRef").unwrap_or("0").to_string());
                }
            }
        }
    }
    (if prefix.is_empty() { None } else { Some(prefix) }, char_pr_id)
}

fn extract_prefix(para: &Element, run: &Element, text: &str, match_start: usize) -> (Option<String>, Option<String>) {
    let inline_prefix = &text[..match_start];
    if !inline_prefix.is_empty() {
        return (Some(inline_prefix.to_string()), None);
    }
    collect_preceding_runs_prefix(para, run)
}

fn find_paragraph_placeholders(
    section_root: &Element,
    registry: &StyleRegistry,
    placeholders: &mut BTreeMap<String, PlaceholderStyle>,
    list_styles: &mut BTreeMap<(ListType, usize), ListStyle>,
) {
    for para in section_root.descendants() {
        if para.local_name() != "p" {
            continue;
        }
        for run in para.children_named("run") {
            for t in run.children_named("t") {
                let text = t.direct_text();
                if text.is_empty() {
                    continue;
                }

                if let Some(m) = list_pattern().captures(&text) {
                    let list_type = if &m[1] == "BULLET" { ListType::Bullet } else { ListType::Ordered };
                    let level: usize = m[2].parse().unwrap_or(1);
                    let (prefix, _) = extract_prefix(para, run, &text, m.get(0).unwrap().start());
                    let (char_pr_id, para_pr_id, _) = extract_style_ids(para, run);
                    let num_pr_id = registry.para_pr_num_pr(&para_pr_id);
                    let has_numbering = num_pr_id.is_some();
                    list_styles.insert(
                        (list_type, level),
                        ListStyle {
                            char_pr_id,
                            para_pr_id,
                            mode: if has_numbering { ListMode::Numbering } else { ListMode::Prefix },
                            prefix: if has_numbering { None } else { prefix },
                            num_pr_id,
                        },
                    );
                    continue;
                }

                if text.starts_with("{{CELL_") {
                    continue;
                }

                if let Some(m) = header_pattern().captures(&text) {
                    let header_name = m[1].to_uppercase();
                    if !placeholders.contains_key(&header_name) {
                        let (prefix, prefix_char_pr_id) = extract_prefix(para, run, &text, m.get(0).unwrap().start());
                        let (char_pr_id, para_pr_id, style_id) = extract_style_ids(para, run);
                        let mode = if prefix.is_some() { PlaceholderMode::Prefix } else { PlaceholderMode::Plain };
                        placeholders.insert(
                            header_name,
                            PlaceholderStyle {
                                char_pr_id,
                                para_pr_id,
                                style_id,
                                prefix,
                                prefix_char_pr_id,
                                table: None,
                                mode,
                                numbering_text: None,
                            },
                        );
                    }
                    continue;
                }

                if let Some(m) = generic_pattern().captures(&text) {
                    let name = m[1].to_uppercase();
                    if name.starts_with('H') && name[1..].chars().all(|c| c.is_ascii_digit()) && name.len() > 1 {
                        continue;
                    }
                    if name.starts_with("LIST_") {
                        continue;
                    }
                    let (prefix, prefix_char_pr_id) = extract_prefix(para, run, &text, m.get(0).unwrap().start());
                    let (char_pr_id, para_pr_id, style_id) = extract_style_ids(para, run);
                    let mode = if prefix.is_some() { PlaceholderMode::Prefix } else { PlaceholderMode::Plain };
                    placeholders.insert(
                        name,
                        PlaceholderStyle {
                            char_pr_id,
                            para_pr_id,
                            style_id,
                            prefix,
                            prefix_char_pr_id,
                            table: None,
                            mode,
                            numbering_text: None,
                        },
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_HEADER: &str = r#"<hh:head xmlns:hh="http://www.hancom.co.kr/hwpml/2011/head" xmlns:hc="http://www.hancom.co.kr/hwpml/2011/core">
        <hh:charProperties itemCnt="1"><hh:charPr id="0"/></hh:charProperties>
        <hh:paraProperties itemCnt="1"><hh:paraPr id="1"/></hh:paraProperties>
        <hh:styles><hh:style id="0" paraPrIDRef="1" charPrIDRef="0"/></hh:styles>
        <hh:borderFills itemCnt="0"/>
    </hh:head>"#;

    #[test]
    fn finds_a_body_placeholder() {
        let section = r#"<hs:sec xmlns:hs="s" xmlns:hp="p">
            <hp:p paraPrIDRef="1" styleIDRef="0"><hp:run charPrIDRef="0"><hp:t>{{BODY}}</hp:t></hp:run></hp:p>
        </hs:sec>"#;
        let registry = StyleRegistry::new(MINIMAL_HEADER).unwrap();
        let introspector = TemplateIntrospector::new(section, &registry).unwrap();
        let body = introspector.placeholders.get("BODY").unwrap();
        assert_eq!(body.mode, PlaceholderMode::Plain);
    }

    #[test]
    fn finds_a_list_placeholder_prefix_mode() {
        let section = r#"<hs:sec xmlns:hs="s" xmlns:hp="p">
            <hp:p paraPrIDRef="1" styleIDRef="0"><hp:run charPrIDRef="0"><hp:t>{{LIST_ORDERED_1}}</hp:t></hp:run></hp:p>
        </hs:sec>"#;
        let registry = StyleRegistry::new(MINIMAL_HEADER).unwrap();
        let introspector = TemplateIntrospector::new(section, &registry).unwrap();
        let style = introspector.list_styles.get(&(ListType::Ordered, 1)).unwrap();
        assert_eq!(style.mode, ListMode::Prefix);
    }
}
