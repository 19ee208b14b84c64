//! YAML frontmatter extraction.
//!
//! A document may open with a `---`-delimited YAML block. Recognized keys
//! (`title`, `author`, `authors`) populate the typed fields of
//! [`hwpx_ast::DocumentMeta`]; every other key is retained verbatim as a
//! free-form string attribute.

use hwpx_ast::DocumentMeta;
use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;

use crate::error::Result;

fn frontmatter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)\A-{3,}\s*\n(.*?)\n-{3,}[ \t]*\n?").expect("static frontmatter pattern")
    })
}

/// Splits `input` into `(metadata, remaining_markdown)`. If `input` carries
/// no leading frontmatter block, `metadata` is empty and `remaining` is
/// `input` unchanged.
pub fn extract(input: &str) -> Result<(DocumentMeta, &str)> {
    let Some(captures) = frontmatter_pattern().captures(input) else {
        return Ok((DocumentMeta::default(), input));
    };
    let whole = captures.get(0).expect("group 0 always matches");
    let yaml = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let rest = &input[whole.end()..];

    if yaml.trim().is_empty() {
        return Ok((DocumentMeta::default(), rest));
    }

    let value: Value = serde_yaml::from_str(yaml)?;
    Ok((meta_from_yaml(value), rest))
}

fn meta_from_yaml(value: Value) -> DocumentMeta {
    let mut meta = DocumentMeta::default();
    let Value::Mapping(map) = value else {
        return meta;
    };

    for (key, val) in map {
        let Value::String(key) = key else { continue };
        match key.as_str() {
            "title" => meta.title = scalar_string(&val),
            "author" => {
                if let Some(name) = scalar_string(&val) {
                    meta.add_author(name);
                }
            }
            "authors" => {
                if let Value::Sequence(names) = &val {
                    for name in names {
                        if let Some(name) = scalar_string(name) {
                            meta.add_author(name);
                        }
                    }
                } else if let Some(name) = scalar_string(&val) {
                    meta.add_author(name);
                }
            }
            other => {
                if let Some(s) = scalar_string(&val) {
                    meta.set_attribute(other, s);
                }
            }
        }
    }
    meta
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_frontmatter_passes_input_through() {
        let (meta, rest) = extract("# Hello\n").unwrap();
        assert_eq!(meta.title, None);
        assert_eq!(rest, "# Hello\n");
    }

    #[test]
    fn title_author_and_custom_attribute_are_parsed() {
        let input = "---\ntitle: My Report\nauthor: Ada Lovelace\nlang: en\n---\n# Body\n";
        let (meta, rest) = extract(input).unwrap();
        assert_eq!(meta.title.as_deref(), Some("My Report"));
        assert_eq!(meta.authors, vec!["Ada Lovelace".to_string()]);
        assert_eq!(meta.get_attribute("lang"), Some("en"));
        assert_eq!(rest, "# Body\n");
    }

    #[test]
    fn authors_list_is_collected_in_order() {
        let input = "---\nauthors:\n  - Ada\n  - Grace\n---\nbody\n";
        let (meta, _rest) = extract(input).unwrap();
        assert_eq!(meta.authors, vec!["Ada".to_string(), "Grace".to_string()]);
    }

    #[test]
    fn malformed_yaml_is_reported_as_an_error() {
        let input = "---\ntitle: [unterminated\n---\nbody\n";
        assert!(extract(input).is_err());
    }
}
