//! # Markup Tree
//!
//! An arena of element and text nodes built from [`tokenizer::tokenize`].
//! Nodes are addressed by [`NodeId`]; the parent link is a plain index used
//! for inheritance and anchor lookups. The arena owns every node and is
//! dropped as a whole at the end of a conversion.
//!
//! Building never fails. Unmatched end tags close the nearest open element
//! with the same name, or are dropped when nothing matches.

pub mod tokenizer;

use log::debug;
use tokenizer::{collapse_whitespace, tokenize, Attributes, Token};

/// Elements that never receive children.
pub const VOID_ELEMENTS: &[&str] = &[
    "br", "hr", "img", "meta", "input", "link", "source", "area", "base", "col", "embed", "param",
    "track", "wbr",
];

/// Index of a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The synthetic document node is always first.
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attrs: Attributes,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(Element),
    /// Whitespace-collapsed, trimmed, never empty.
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Parse markup into a tree rooted at a synthetic document node.
    pub fn parse(html: &str) -> Self {
        let mut tree = Tree {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        };
        let mut stack = vec![NodeId::ROOT];

        for token in tokenize(html) {
            let parent = *stack.last().unwrap_or(&NodeId::ROOT);
            match token {
                Token::Text(raw) => {
                    let text = collapse_whitespace(&raw);
                    if !text.is_empty() {
                        tree.append(parent, NodeData::Text(text));
                    }
                }
                Token::StartTag {
                    name,
                    attrs,
                    self_closing,
                } => {
                    let is_void = self_closing || VOID_ELEMENTS.contains(&name.as_str());
                    let id = tree.append(parent, NodeData::Element(Element { tag: name, attrs }));
                    if !is_void {
                        stack.push(id);
                    }
                }
                Token::EndTag { name } => {
                    let open = stack
                        .iter()
                        .rposition(|&id| tree.tag(id) == Some(name.as_str()));
                    match open {
                        Some(depth) if depth > 0 => stack.truncate(depth),
                        _ => debug!("dropping unmatched </{}>", name),
                    }
                }
            }
        }

        tree
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of arena slots, including detached nodes.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// First element with `tag` in document order.
    pub fn find_first(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&id| self.tag(id) == Some(tag))
    }

    /// The element layout starts from: the first `body`, else the first
    /// top-level element.
    pub fn layout_root(&self) -> Option<NodeId> {
        self.find_first("body").or_else(|| {
            self.children(self.root())
                .iter()
                .copied()
                .find(|&id| self.element(id).is_some())
        })
    }

    /// All text below `id`, one space between runs.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Detach every `<style>` element and return their text, in document
    /// order, joined by newlines.
    pub fn take_stylesheets(&mut self) -> String {
        let styles: Vec<NodeId> = self
            .descendants(self.root())
            .into_iter()
            .filter(|&id| self.tag(id) == Some("style"))
            .collect();

        let mut blocks = Vec::new();
        for id in styles {
            let text = self.text_content(id);
            if !text.is_empty() {
                blocks.push(text);
            }
            if let Some(parent) = self.nodes[id.0].parent.take() {
                self.nodes[parent.0].children.retain(|&c| c != id);
            }
        }
        blocks.join("\n")
    }

    /// `content` of the first `<meta name="pdf:{key}">`, searched across the
    /// whole document.
    pub fn pdf_meta(&self, key: &str) -> Option<&str> {
        let wanted = format!("pdf:{}", key);
        self.descendants(self.root()).into_iter().find_map(|id| {
            let el = self.element(id)?;
            if el.tag != "meta" {
                return None;
            }
            let name = el.attr("name")?;
            if name.eq_ignore_ascii_case(&wanted) {
                el.attr("content")
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(tree: &Tree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|&c| match &tree.node(c).data {
                NodeData::Element(el) => el.tag.clone(),
                NodeData::Text(t) => format!("#{}", t),
                NodeData::Document => "doc".to_string(),
            })
            .collect()
    }

    #[test]
    fn builds_nested_tree() {
        let tree = Tree::parse("<div><p>Hi <b>there</b></p></div>");
        let div = tree.children(tree.root())[0];
        assert_eq!(tree.tag(div), Some("div"));
        let p = tree.children(div)[0];
        assert_eq!(tags(&tree, p), vec!["#Hi", "b"]);
        assert_eq!(tree.parent(p), Some(div));
    }

    #[test]
    fn void_elements_take_no_children() {
        let tree = Tree::parse("<div><img src=a.png>text<br>more</div>");
        let div = tree.children(tree.root())[0];
        assert_eq!(tags(&tree, div), vec!["img", "#text", "br", "#more"]);
    }

    #[test]
    fn unmatched_close_is_dropped() {
        let tree = Tree::parse("<div><p>a</span>b</p></div>");
        let div = tree.children(tree.root())[0];
        let p = tree.children(div)[0];
        assert_eq!(tags(&tree, p), vec!["#a", "#b"]);
    }

    #[test]
    fn close_pops_to_matching_ancestor() {
        let tree = Tree::parse("<div><p><b>x</div><span>y</span>");
        assert_eq!(tags(&tree, tree.root()), vec!["div", "span"]);
    }

    #[test]
    fn whitespace_is_collapsed_and_empty_text_dropped() {
        let tree = Tree::parse("<p>\n   a \n\n b   </p>\n\n");
        let p = tree.children(tree.root())[0];
        assert_eq!(tags(&tree, p), vec!["#a b"]);
        assert_eq!(tree.children(tree.root()).len(), 1);
    }

    #[test]
    fn stylesheets_are_extracted_and_removed() {
        let mut tree = Tree::parse(
            "<html><head><style>p{color:red}</style></head><body><style>.a{}</style><p>x</p></body></html>",
        );
        let css = tree.take_stylesheets();
        assert_eq!(css, "p{color:red}\n.a{}");
        let body = tree.find_first("body").unwrap();
        assert_eq!(tags(&tree, body), vec!["p"]);
        assert!(tree.find_first("style").is_none());
    }

    #[test]
    fn layout_root_prefers_body() {
        let tree = Tree::parse("<html><body><p>x</p></body></html>");
        assert_eq!(tree.tag(tree.layout_root().unwrap()), Some("body"));
        let bare = Tree::parse("text<section>x</section>");
        assert_eq!(bare.tag(bare.layout_root().unwrap()), Some("section"));
    }

    #[test]
    fn meta_lookup_searches_whole_document() {
        let tree = Tree::parse(
            r#"<html><head><meta name="pdf:page" content="A4"></head><body></body></html>"#,
        );
        assert_eq!(tree.pdf_meta("page"), Some("A4"));
        assert_eq!(tree.pdf_meta("width"), None);
    }

    #[test]
    fn class_helpers() {
        let tree = Tree::parse(r#"<p class=" big  red " id=x></p>"#);
        let p = tree.element(tree.children(tree.root())[0]).unwrap();
        assert!(p.has_class("big"));
        assert!(p.has_class("red"));
        assert!(!p.has_class("bi"));
        assert_eq!(p.id(), Some("x"));
    }
}
