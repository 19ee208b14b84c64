//! Inline-level content produced by the Markdown front end.
//!
//! Formatting marks (`Strong`, `Emph`, `Underline`, `Strikeout`, `Superscript`,
//! `Subscript`) wrap the inline sequence they apply to, rather than
//! decorating a single leaf, mirroring how the upstream Markdown parser
//! nests marks.

use serde::{Deserialize, Serialize};

use crate::block::Block;

/// Inline-level content element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inline {
    /// Literal text run.
    Str(String),
    /// An inter-word space.
    Space,
    /// A soft line break inside a paragraph (rendered as a space).
    SoftBreak,
    /// An explicit line break (two trailing spaces / `\` in Markdown).
    LineBreak,
    /// Bold emphasis.
    Strong(Vec<Inline>),
    /// Italic emphasis.
    Emph(Vec<Inline>),
    /// Underline.
    Underline(Vec<Inline>),
    /// Strikethrough.
    Strikeout(Vec<Inline>),
    /// Superscript.
    Superscript(Vec<Inline>),
    /// Subscript.
    Subscript(Vec<Inline>),
    /// Inline code span.
    Code(String),
    /// A hyperlink.
    Link {
        url: String,
        title: Option<String>,
        inlines: Vec<Inline>,
    },
    /// An inline image.
    Image {
        url: String,
        title: Option<String>,
        attrs: ImageAttrs,
    },
    /// A footnote/endnote, carrying its own block content.
    Note(Vec<Block>),
}

/// Explicit sizing hints carried on an image, as authored (e.g. `"300px"`,
/// `"2in"`, `"50%"`). Unit parsing and resolution happens in the emitter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub width: Option<String>,
    pub height: Option<String>,
}

impl Inline {
    /// Flattens an inline sequence into plain text, descending through
    /// formatting marks and link text. Images, notes, and breaks contribute
    /// nothing (line breaks become a newline). Used for header plain-text
    /// extraction and title derivation.
    pub fn plain_text(inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            push_plain_text(inline, &mut out);
        }
        out
    }
}

fn push_plain_text(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Str(s) => out.push_str(s),
        Inline::Space | Inline::SoftBreak => out.push(' '),
        Inline::LineBreak => out.push('\n'),
        Inline::Strong(inner)
        | Inline::Emph(inner)
        | Inline::Underline(inner)
        | Inline::Strikeout(inner)
        | Inline::Superscript(inner)
        | Inline::Subscript(inner) => {
            for i in inner {
                push_plain_text(i, out);
            }
        }
        Inline::Code(s) => out.push_str(s),
        Inline::Link { inlines, .. } => {
            for i in inlines {
                push_plain_text(i, out);
            }
        }
        Inline::Image { .. } | Inline::Note(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_descends_through_marks() {
        let inlines = vec![
            Inline::Strong(vec![Inline::Str("bold".into())]),
            Inline::Space,
            Inline::Emph(vec![Inline::Str("italic".into())]),
        ];
        assert_eq!(Inline::plain_text(&inlines), "bold italic");
    }

    #[test]
    fn plain_text_skips_images() {
        let inlines = vec![
            Inline::Str("see ".into()),
            Inline::Image {
                url: "x.png".into(),
                title: None,
                attrs: ImageAttrs::default(),
            },
        ];
        assert_eq!(Inline::plain_text(&inlines), "see ");
    }
}
