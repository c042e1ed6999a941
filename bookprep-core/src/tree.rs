//! Capability interface the TOC builder and line wrapper work against

use std::borrow::Cow;

use crate::selector::SelectorList;

/// The narrow slice of document access the passes need.
///
/// Node handles are cheap copies; they stay valid for the lifetime of the
/// tree even after the node is detached.
pub trait BookTree {
    type Node: Copy + Eq + std::fmt::Debug;

    /// All elements matching the selector list, in document order
    fn select(&self, selectors: &SelectorList) -> Vec<Self::Node>;

    /// First element in document order carrying the given `id`
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Tag name of an element, `None` for non-element nodes
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    /// Attribute value with character references resolved
    fn attribute(&self, node: Self::Node, name: &str) -> Option<Cow<'_, str>>;

    /// Create a detached element; attribute values are plain text
    fn create_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Self::Node;

    fn append_child(&mut self, parent: Self::Node, child: Self::Node);

    /// Append a deep copy of every child of `from` to `to`
    fn copy_children(&mut self, from: Self::Node, to: Self::Node);

    /// Serialized markup of the node's children
    fn inner_markup(&self, node: Self::Node) -> String;

    /// Replace all children of the node with opaque markup
    fn set_inner_markup(&mut self, node: Self::Node, markup: String);
}
