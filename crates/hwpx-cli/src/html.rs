//! A plain, template-free HTML renderer for the intermediate AST, used by
//! the CLI's `.html`/`.htm` output mode to let a user spot-check a
//! conversion without an HWPX-capable viewer. It shares no template/style
//! logic with `hwpx-convert`; it only walks the same `hwpx_ast::Document`
//! the Markdown front end already produces.

use hwpx_ast::{Alignment, Block, Document, Inline};

/// Renders `doc` as a standalone HTML document.
pub fn render(doc: &Document) -> String {
    let title = doc.metadata.title.as_deref().unwrap_or("Untitled");
    let mut body = String::new();
    for block in &doc.blocks {
        render_block(block, &mut body);
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
        title = escape(title),
    )
}

fn render_block(block: &Block, out: &mut String) {
    match block {
        Block::Header { level, inlines } => {
            out.push_str(&format!("<h{level}>"));
            render_inlines(inlines, out);
            out.push_str(&format!("</h{level}>\n"));
        }
        Block::Paragraph { inlines } | Block::Plain { inlines } => {
            out.push_str("<p>");
            render_inlines(inlines, out);
            out.push_str("</p>\n");
        }
        Block::BulletList { items } => render_list("ul", items, out),
        Block::OrderedList { start, items } => {
            if *start != 1 {
                out.push_str(&format!("<ol start=\"{start}\">\n"));
            } else {
                out.push_str("<ol>\n");
            }
            render_list_items(items, out);
            out.push_str("</ol>\n");
        }
        Block::BlockQuote { blocks } => {
            out.push_str("<blockquote>\n");
            for b in blocks {
                render_block(b, out);
            }
            out.push_str("</blockquote>\n");
        }
        Block::CodeBlock { classes, text } => {
            let class_attr = if classes.is_empty() {
                String::new()
            } else {
                format!(" class=\"{}\"", classes.join(" "))
            };
            out.push_str(&format!("<pre><code{class_attr}>{}</code></pre>\n", escape(text)));
        }
        Block::Table {
            colspecs,
            head_rows,
            body_rows,
            foot_rows,
        } => render_table(colspecs, head_rows, body_rows, foot_rows, out),
        Block::HorizontalRule => out.push_str("<hr>\n"),
    }
}

fn render_list(tag: &str, items: &[Vec<Block>], out: &mut String) {
    out.push_str(&format!("<{tag}>\n"));
    render_list_items(items, out);
    out.push_str(&format!("</{tag}>\n"));
}

fn render_list_items(items: &[Vec<Block>], out: &mut String) {
    for item in items {
        out.push_str("<li>");
        for block in item {
            render_block(block, out);
        }
        out.push_str("</li>\n");
    }
}

fn render_table(
    colspecs: &[hwpx_ast::ColumnSpec],
    head_rows: &[hwpx_ast::TableRow],
    body_rows: &[hwpx_ast::TableRow],
    foot_rows: &[hwpx_ast::TableRow],
    out: &mut String,
) {
    out.push_str("<table>\n");
    if !head_rows.is_empty() {
        out.push_str("<thead>\n");
        for row in head_rows {
            render_row(row, colspecs, "th", out);
        }
        out.push_str("</thead>\n");
    }
    out.push_str("<tbody>\n");
    for row in body_rows {
        render_row(row, colspecs, "td", out);
    }
    out.push_str("</tbody>\n");
    if !foot_rows.is_empty() {
        out.push_str("<tfoot>\n");
        for row in foot_rows {
            render_row(row, colspecs, "td", out);
        }
        out.push_str("</tfoot>\n");
    }
    out.push_str("</table>\n");
}

fn render_row(row: &hwpx_ast::TableRow, colspecs: &[hwpx_ast::ColumnSpec], cell_tag: &str, out: &mut String) {
    out.push_str("<tr>");
    for (i, cell) in row.cells.iter().enumerate() {
        let align = match cell.align {
            Alignment::Default => colspecs.get(i).map(|s| s.align).unwrap_or(Alignment::Default),
            other => other,
        };
        let style = match align {
            Alignment::Left => " style=\"text-align:left\"",
            Alignment::Center => " style=\"text-align:center\"",
            Alignment::Right => " style=\"text-align:right\"",
            Alignment::Default => "",
        };
        let mut attrs = String::new();
        if cell.row_span > 1 {
            attrs.push_str(&format!(" rowspan=\"{}\"", cell.row_span));
        }
        if cell.col_span > 1 {
            attrs.push_str(&format!(" colspan=\"{}\"", cell.col_span));
        }
        out.push_str(&format!("<{cell_tag}{style}{attrs}>"));
        for block in &cell.blocks {
            render_block(block, out);
        }
        out.push_str(&format!("</{cell_tag}>"));
    }
    out.push_str("</tr>\n");
}

fn render_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        render_inline(inline, out);
    }
}

fn render_inline(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Str(s) => out.push_str(&escape(s)),
        Inline::Space => out.push(' '),
        Inline::SoftBreak => out.push('\n'),
        Inline::LineBreak => out.push_str("<br>\n"),
        Inline::Strong(inner) => wrap("strong", inner, out),
        Inline::Emph(inner) => wrap("em", inner, out),
        Inline::Underline(inner) => wrap("u", inner, out),
        Inline::Strikeout(inner) => wrap("s", inner, out),
        Inline::Superscript(inner) => wrap("sup", inner, out),
        Inline::Subscript(inner) => wrap("sub", inner, out),
        Inline::Code(text) => out.push_str(&format!("<code>{}</code>", escape(text))),
        Inline::Link { url, title, inlines } => {
            let title_attr = title.as_deref().map(|t| format!(" title=\"{}\"", escape(t))).unwrap_or_default();
            out.push_str(&format!("<a href=\"{}\"{title_attr}>", escape(url)));
            render_inlines(inlines, out);
            out.push_str("</a>");
        }
        Inline::Image { url, title, attrs } => {
            let title_attr = title.as_deref().map(|t| format!(" title=\"{}\"", escape(t))).unwrap_or_default();
            let width_attr = attrs.width.as_deref().map(|w| format!(" width=\"{}\"", escape(w))).unwrap_or_default();
            let height_attr = attrs.height.as_deref().map(|h| format!(" height=\"{}\"", escape(h))).unwrap_or_default();
            out.push_str(&format!(
                "<img src=\"{}\"{title_attr}{width_attr}{height_attr}>",
                escape(url)
            ));
        }
        Inline::Note(blocks) => {
            out.push_str("<sup>[note]</sup><aside class=\"footnote\">");
            for block in blocks {
                render_block(block, out);
            }
            out.push_str("</aside>");
        }
    }
}

fn wrap(tag: &str, inner: &[Inline], out: &mut String) {
    out.push_str(&format!("<{tag}>"));
    render_inlines(inner, out);
    out.push_str(&format!("</{tag}>"));
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwpx_ast::Document;

    #[test]
    fn renders_heading_and_paragraph() {
        let mut doc = Document::with_title("Test");
        doc.push(Block::Header {
            level: 1,
            inlines: vec![Inline::Str("Hi".into())],
        });
        doc.push(Block::Paragraph {
            inlines: vec![Inline::Str("body".into())],
        });
        let html = render(&doc);
        assert!(html.contains("<h1>Hi</h1>"));
        assert!(html.contains("<p>body</p>"));
        assert!(html.contains("<title>Test</title>"));
    }

    #[test]
    fn escapes_special_characters() {
        let mut doc = Document::new();
        doc.push(Block::Paragraph {
            inlines: vec![Inline::Str("<script>&\"".into())],
        });
        let html = render(&doc);
        assert!(html.contains("&lt;script&gt;&amp;&quot;"));
    }

    #[test]
    fn renders_nested_lists_and_links() {
        let mut doc = Document::new();
        doc.push(Block::BulletList {
            items: vec![vec![Block::Plain {
                inlines: vec![Inline::Link {
                    url: "https://example.com".into(),
                    title: None,
                    inlines: vec![Inline::Str("ex".into())],
                }],
            }]],
        });
        let html = render(&doc);
        assert!(html.contains("<ul>\n<li>"));
        assert!(html.contains("<a href=\"https://example.com\">ex</a>"));
    }
}
