//! A small mutable XML tree, used in place of per-type `serde` structs for
//! the header/section XML.
//!
//! The header and section documents are mutated in place by the Style
//! Registry and the Block Emitter (new `charPr`/`paraPr` nodes appended,
//! `itemCnt` attributes rewritten, placeholder text substituted), which is
//! awkward to express as a fixed `#[derive(Deserialize)]` schema. A generic
//! element tree, addressed by tag name and attribute lookups, is the more
//! honest fit; callers navigate it with the small set of helpers below
//! rather than a generalized query language, since the shapes we need to
//! find are few and known in advance (see [`crate::template`]).
//!
//! Parent pointers are deliberately not modeled (see DESIGN.md); the one
//! site that needs to strip a subset of a parent's children
//! ([`Element::retain_children`]) walks top-down instead.

use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{ConvertError, Result};

/// A node in the XML tree: either an element or a text run.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element: a qualified tag name, its attributes in document order,
/// and its children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The element's local name, ignoring any `prefix:` namespace.
    pub fn local_name(&self) -> &str {
        self.tag.rsplit(':').next().unwrap_or(&self.tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name || k.rsplit(':').next() == Some(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.attrs.iter_mut().find(|(k, _)| k == name) {
            entry.1 = value;
        } else {
            self.attrs.push((name.to_string(), value));
        }
    }

    /// First direct child element matching `local`, if any.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.children.iter().find_map(|n| match n {
            Node::Element(e) if e.local_name() == local => Some(e),
            _ => None,
        })
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.local_name() == local => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter_map(move |n| match n {
            Node::Element(e) if e.local_name() == local => Some(e),
            _ => None,
        })
    }

    /// Ensures a direct child element named `local` exists, creating it
    /// (appended) if absent, and returns a mutable reference to it.
    pub fn ensure_child(&mut self, local: &str) -> &mut Element {
        if self.child(local).is_none() {
            self.children.push(Node::Element(Element::new(local)));
        }
        self.child_mut(local).expect("just inserted")
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Concatenated text of all direct `Node::Text` children (not
    /// descending into child elements).
    pub fn direct_text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    /// Depth-first iterator over this element and all element descendants.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = vec![self];
        for child in &self.children {
            if let Node::Element(e) = child {
                out.extend(e.descendants());
            }
        }
        out
    }

    /// Depth-first walk over this element and all descendants, giving the
    /// visitor mutable access to each one in turn.
    pub fn for_each_descendant_mut<F: FnMut(&mut Element)>(&mut self, visit: &mut F) {
        visit(self);
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.for_each_descendant_mut(visit);
            }
        }
    }

    /// Retains only the children for which `keep` returns true, descending
    /// recursively is the caller's responsibility; this only filters this
    /// element's direct children.
    pub fn retain_children<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Node) -> bool,
    {
        self.children.retain(|n| keep(n));
    }

    /// Removes all direct-descendant elements whose local name is in
    /// `names`, recursively through the whole subtree.
    pub fn strip_descendants(&mut self, names: &[&str]) {
        self.children.retain(|n| match n {
            Node::Element(e) => !names.contains(&e.local_name()),
            Node::Text(_) => true,
        });
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.strip_descendants(names);
            }
        }
    }
}

/// Parses an XML document, returning its root element. Processing
/// instructions and the XML declaration are discarded; the root element and
/// its subtree are preserved verbatim (attribute order, namespace
/// prefixes).
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ConvertError::Template(format!("malformed XML: {e}")))?;
        match event {
            Event::Start(ref start) => {
                stack.push(element_from_start(start)?);
            }
            Event::Empty(ref start) => {
                let el = element_from_start(start)?;
                push_finished(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| ConvertError::Template("unbalanced XML".into()))?;
                push_finished(&mut stack, &mut root, el);
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| ConvertError::Template(format!("malformed XML text: {e}")))?
                    .into_owned();
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::Text(text));
                }
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| ConvertError::Template("XML document has no root element".into()))
}

fn push_finished(stack: &mut Vec<Element>, root: &mut Option<Element>, el: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
    } else {
        *root = Some(el);
    }
}

fn element_from_start(start: &BytesStart) -> Result<Element> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ConvertError::Template(format!("bad attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = unescape(&String::from_utf8_lossy(&attr.value))
            .map_err(|e| ConvertError::Template(format!("bad attribute value: {e}")))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        tag,
        attrs,
        children: Vec::new(),
    })
}

/// Serializes an element (and its subtree) back to an XML string, without a
/// leading XML declaration (callers that need one prepend it themselves).
pub fn serialize(el: &Element) -> String {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, el).expect("writing to an in-memory buffer cannot fail");
    String::from_utf8(writer.into_inner()).expect("quick-xml emits valid UTF-8")
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, el: &Element) -> std::io::Result<()> {
    if el.children.is_empty() {
        let mut start = BytesStart::new(el.tag.clone());
        for (k, v) in &el.attrs {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    let mut start = BytesStart::new(el.tag.clone());
    for (k, v) in &el.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => {
                writer.write_event(Event::Text(BytesText::from_escaped(escape(t))))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(el.tag.clone())))?;
    Ok(())
}

/// Escapes a string for inclusion as XML text (not an attribute value).
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_simple_tree() {
        let xml = r#"<root a="1"><child b="2">text</child></root>"#;
        let tree = parse(xml).unwrap();
        assert_eq!(tree.tag, "root");
        assert_eq!(tree.attr("a"), Some("1"));
        let child = tree.child("child").unwrap();
        assert_eq!(child.attr("b"), Some("2"));
        assert_eq!(child.direct_text(), "text");
    }

    #[test]
    fn strip_descendants_removes_nested_matches() {
        let xml = r#"<root><a><secPr/></a><b><ctrl><secPr/></ctrl></b></root>"#;
        let mut tree = parse(xml).unwrap();
        tree.strip_descendants(&["secPr", "ctrl"]);
        assert!(tree.child("a").unwrap().child("secPr").is_none());
        assert!(tree.child("b").unwrap().child("ctrl").is_none());
    }

    #[test]
    fn ensure_child_is_idempotent() {
        let mut el = Element::new("root");
        el.ensure_child("numberings").set_attr("itemCnt", "0");
        el.ensure_child("numberings").set_attr("itemCnt", "1");
        assert_eq!(el.children_named("numberings").count(), 1);
        assert_eq!(el.child("numberings").unwrap().attr("itemCnt"), Some("1"));
    }
}
