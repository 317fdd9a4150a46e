// src/models/rich_text.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use validator::ValidationError;

/// Maximum number of text characters in a comment.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Maximum nesting of document nodes.
pub const MAX_NESTING: usize = 64;

/// A node of a rich-text document in the editor's JSON shape:
/// `{ "type": "doc", "content": [ { "type": "paragraph", ... } ] }`.
///
/// Node kinds this service does not know about are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<RichTextNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Value>,
}

/// The parts of a node the service acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Doc,
    Text(&'a str),
    Image { src: Option<&'a str> },
    Other(&'a str),
}

impl RichTextNode {
    pub fn kind(&self) -> NodeKind<'_> {
        match self.kind.as_str() {
            "doc" => NodeKind::Doc,
            "text" => NodeKind::Text(self.text.as_deref().unwrap_or("")),
            "image" => NodeKind::Image {
                src: self
                    .attrs
                    .as_ref()
                    .and_then(|attrs| attrs.get("src"))
                    .and_then(Value::as_str),
            },
            other => NodeKind::Other(other),
        }
    }

    /// Depth-first, document-order walk yielding each node with its nesting level.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(self, 0)],
        }
    }

    /// Sources of every embedded image, in document order, without duplicates.
    pub fn image_sources(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.walk()
            .filter_map(|(node, _)| match node.kind() {
                NodeKind::Image { src: Some(src) } => Some(src),
                _ => None,
            })
            .filter(|src| seen.insert(*src))
            .map(str::to_string)
            .collect()
    }

    /// Number of characters across all text nodes.
    pub fn text_len(&self) -> usize {
        self.walk()
            .map(|(node, _)| match node.kind() {
                NodeKind::Text(text) => text.chars().count(),
                _ => 0,
            })
            .sum()
    }
}

/// Iterator returned by [`RichTextNode::walk`].
pub struct Walk<'a> {
    stack: Vec<(&'a RichTextNode, usize)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (&'a RichTextNode, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, level) = self.stack.pop()?;
        self.stack
            .extend(node.content.iter().rev().map(|child| (child, level + 1)));
        Some((node, level))
    }
}

/// Validator hook for comment bodies.
pub fn validate_document(doc: &RichTextNode) -> Result<(), ValidationError> {
    if doc.kind() != NodeKind::Doc {
        return Err(ValidationError::new("not_a_document")
            .with_message("Content must be a rich-text document".into()));
    }

    let mut text_chars = 0usize;
    let mut images = 0usize;

    for (node, level) in doc.walk() {
        if level > MAX_NESTING {
            return Err(ValidationError::new("too_deep")
                .with_message("Content is nested too deeply".into()));
        }
        match node.kind() {
            NodeKind::Text(text) => text_chars += text.trim().chars().count(),
            NodeKind::Image { src } => {
                let src = src.ok_or_else(|| {
                    ValidationError::new("invalid_image")
                        .with_message("Image without a source".into())
                })?;
                if !is_acceptable_image_src(src) {
                    return Err(ValidationError::new("invalid_image")
                        .with_message(format!("Invalid image source: {}", src).into()));
                }
                images += 1;
            }
            _ => {}
        }
    }

    if text_chars == 0 && images == 0 {
        return Err(ValidationError::new("empty").with_message("Comment must not be empty".into()));
    }
    if doc.text_len() > MAX_TEXT_CHARS {
        return Err(ValidationError::new("too_long")
            .with_message(format!("Comment must be at most {} characters", MAX_TEXT_CHARS).into()));
    }

    Ok(())
}

/// Absolute http(s) URLs and site-relative paths are accepted.
fn is_acceptable_image_src(src: &str) -> bool {
    if src.len() > 500 {
        return false;
    }
    if src.starts_with('/') {
        return !src.starts_with("//");
    }
    match Url::parse(src) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
