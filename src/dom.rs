//! Minimal DOM text tree
//!
//! Only what the language branch needs survives: element names, their
//! attributes and text runs in document order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DomNode {
    Element {
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<DomNode>,
    },
    Text {
        text: String,
    },
}

impl DomNode {
    pub fn element(tag: &str) -> Self {
        DomNode::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        DomNode::Text { text: text.to_string() }
    }

    /// Builder helper: set an attribute (no-op on text nodes)
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let DomNode::Element { attrs, .. } = &mut self {
            attrs.insert(name.to_ascii_lowercase(), value.to_string());
        }
        self
    }

    /// Builder helper: append a child (no-op on text nodes)
    pub fn child(mut self, node: DomNode) -> Self {
        if let DomNode::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            DomNode::Element { tag, .. } => Some(tag),
            DomNode::Text { .. } => None,
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        match self {
            DomNode::Element { attrs, .. } => attrs.get(name).map(|s| s.as_str()),
            DomNode::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[DomNode] {
        match self {
            DomNode::Element { children, .. } => children,
            DomNode::Text { .. } => &[],
        }
    }

    /// Parse an HTML document into a tree rooted at `<html>`.
    #[cfg(feature = "snapshot")]
    pub fn from_html(html: &str) -> Self {
        let document = scraper::Html::parse_document(html);
        convert_element(document.root_element())
    }
}

#[cfg(feature = "snapshot")]
fn convert_element(element: scraper::ElementRef<'_>) -> DomNode {
    let value = element.value();
    let attrs = value
        .attrs()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();
    let mut children = Vec::new();
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => children.push(DomNode::text(&**text)),
            scraper::Node::Element(_) => {
                if let Some(el) = scraper::ElementRef::wrap(child) {
                    children.push(convert_element(el));
                }
            }
            _ => {}
        }
    }
    DomNode::Element {
        tag: value.name().to_ascii_lowercase(),
        attrs,
        children,
    }
}
