//! Arena-backed XHTML document tree

use anyhow::{bail, Context, Result};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::selector::{self, SelectorList};
use crate::tree::BookTree;

/// Handle to a node in a [`Document`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An attribute as written in the source, value still escaped
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Written as `<name/>` when it has no children
    pub self_closing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    /// Character data in escaped form
    Text(String),
    /// Markup emitted verbatim: comments, doctype, CDATA, replaced content
    Markup(String),
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The main document structure
#[derive(Clone, Debug)]
pub struct Document {
    pub path: Option<PathBuf>,
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root node
    pub fn new() -> Self {
        Self {
            path: None,
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Load a document from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let mut doc = Self::parse(&content)
            .with_context(|| format!("Failed to parse document: {}", path.display()))?;
        doc.path = Some(path.to_path_buf());

        Ok(doc)
    }

    /// Parse well-formed XHTML text
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut doc = Self::new();
        let mut stack = vec![doc.root()];

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .with_context(|| format!("Malformed XHTML near byte {position}"))?;
            let parent = *stack.last().unwrap_or(&doc.root());

            match event {
                Event::Start(e) => {
                    let element = element_from(&e, false)?;
                    let id = doc.push_node(NodeKind::Element(element));
                    doc.append_child(parent, id);
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let element = element_from(&e, true)?;
                    let id = doc.push_node(NodeKind::Element(element));
                    doc.append_child(parent, id);
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Event::Text(e) => doc.push_text(parent, &String::from_utf8_lossy(&e)),
                Event::GeneralRef(e) => {
                    doc.push_text(parent, &format!("&{};", String::from_utf8_lossy(&e)))
                }
                Event::CData(e) => doc.push_markup(
                    parent,
                    format!("<![CDATA[{}]]>", String::from_utf8_lossy(&e)),
                ),
                Event::Comment(e) => {
                    doc.push_markup(parent, format!("<!--{}-->", String::from_utf8_lossy(&e)))
                }
                Event::Decl(e) => {
                    doc.push_markup(parent, format!("<?{}?>", String::from_utf8_lossy(&e)))
                }
                Event::PI(e) => {
                    doc.push_markup(parent, format!("<?{}?>", String::from_utf8_lossy(&e)))
                }
                Event::DocType(e) => doc.push_markup(
                    parent,
                    format!("<!DOCTYPE {}>", String::from_utf8_lossy(&e).trim_start()),
                ),
                Event::Eof => break,
            }
        }

        if let Some(&open) = stack.get(1..).and_then(|open| open.last()) {
            bail!(
                "Unclosed element <{}> at end of document",
                doc.tag_name(open).unwrap_or_default()
            );
        }

        Ok(doc)
    }

    /// Write the serialized document to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_xml())
            .with_context(|| format!("Failed to write file: {}", path.display()))
    }

    /// Serialize the whole document
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_node(self.root(), &mut out);
        out
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Elements below `id` in document order, excluding `id` itself
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut pending: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = pending.pop() {
            if self.element(next).is_some() {
                result.push(next);
                pending.extend(self.children(next).iter().rev().copied());
            }
        }
        result
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Append text, merging with a preceding text sibling
    fn push_text(&mut self, parent: NodeId, text: &str) {
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return;
            }
        }
        let id = self.push_node(NodeKind::Text(text.to_string()));
        self.append_child(parent, id);
    }

    fn push_markup(&mut self, parent: NodeId, markup: String) {
        let id = self.push_node(NodeKind::Markup(markup));
        self.append_child(parent, id);
    }

    fn detach_children(&mut self, id: NodeId) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
    }

    /// Copy a subtree; the copy starts detached
    fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.push_node(self.nodes[id.0].kind.clone());
        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Document => self.write_children(id, out),
            NodeKind::Text(text) | NodeKind::Markup(text) => out.push_str(text),
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for attr in &element.attributes {
                    let quote = if attr.value.contains('"') { '\'' } else { '"' };
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push('=');
                    out.push(quote);
                    out.push_str(&attr.value);
                    out.push(quote);
                }
                if element.self_closing && self.children(id).is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    self.write_children(id, out);
                    out.push_str("</");
                    out.push_str(&element.name);
                    out.push('>');
                }
            }
        }
    }

    fn write_children(&self, id: NodeId, out: &mut String) {
        for &child in self.children(id) {
            self.write_node(child, out);
        }
    }
}

fn element_from(start: &BytesStart<'_>, self_closing: bool) -> Result<ElementData> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.with_context(|| format!("Malformed attribute on <{name}>"))?;
        attributes.push(Attribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value: String::from_utf8_lossy(&attr.value).into_owned(),
        });
    }
    Ok(ElementData {
        name,
        attributes,
        self_closing,
    })
}

/// Borrowed element view used for selector matching
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
    data: &'a ElementData,
}

impl<'a> ElementRef<'a> {
    pub fn new(doc: &'a Document, id: NodeId) -> Option<Self> {
        doc.element(id).map(|data| Self { doc, id, data })
    }
}

impl selector::Element for ElementRef<'_> {
    fn local_name(&self) -> &str {
        let name = self.data.name.as_str();
        name.rsplit_once(':').map_or(name, |(_, local)| local)
    }

    fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        raw_attribute(self.data, name).map(unescape_lossy)
    }

    fn parent_element(&self) -> Option<Self> {
        self.doc
            .parent(self.id)
            .and_then(|parent| ElementRef::new(self.doc, parent))
    }
}

fn raw_attribute<'a>(element: &'a ElementData, name: &str) -> Option<&'a str> {
    element
        .attributes
        .iter()
        .find(|attr| attr.name == name)
        .map(|attr| attr.value.as_str())
}

/// Resolve character references, keeping the raw text when it has unknown entities
fn unescape_lossy(raw: &str) -> Cow<'_, str> {
    unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

impl BookTree for Document {
    type Node = NodeId;

    fn select(&self, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendant_elements(self.root())
            .into_iter()
            .filter(|&id| ElementRef::new(self, id).is_some_and(|el| selectors.matches(&el)))
            .collect()
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendant_elements(self.root()).into_iter().find(|&node| {
            self.element(node)
                .and_then(|el| raw_attribute(el, "id"))
                .is_some_and(|value| unescape_lossy(value) == id)
        })
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.name.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<Cow<'_, str>> {
        self.element(node)
            .and_then(|el| raw_attribute(el, name))
            .map(unescape_lossy)
    }

    fn create_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> NodeId {
        let attributes = attributes
            .iter()
            .map(|(key, value)| Attribute {
                name: key.to_string(),
                value: escape(*value).into_owned(),
            })
            .collect();
        self.push_node(NodeKind::Element(ElementData {
            name: name.to_string(),
            attributes,
            self_closing: false,
        }))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old_parent) = self.nodes[child.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|&c| c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn copy_children(&mut self, from: NodeId, to: NodeId) {
        let children = self.nodes[from.0].children.clone();
        for child in children {
            let copy = self.deep_clone(child);
            self.append_child(to, copy);
        }
    }

    fn inner_markup(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_children(node, &mut out);
        out
    }

    fn set_inner_markup(&mut self, node: NodeId, markup: String) {
        self.detach_children(node);
        let content = self.push_node(NodeKind::Markup(markup));
        self.append_child(node, content);
    }
}
