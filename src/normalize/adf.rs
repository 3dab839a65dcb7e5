//! Plain-text rendering of Atlassian Document Format trees.

use serde_json::Value;

/// Node kinds with dedicated handling; everything else falls through to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Text,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    CodeBlock,
    Blockquote,
    HardBreak,
    Mention,
    Emoji,
    Card,
    Media,
    Other,
}

impl NodeKind {
    fn of(node: &Value) -> Self {
        match node.get("type").and_then(Value::as_str).unwrap_or_default() {
            "text" => NodeKind::Text,
            "paragraph" => NodeKind::Paragraph,
            "heading" => NodeKind::Heading,
            "bulletList" => NodeKind::BulletList,
            "orderedList" => NodeKind::OrderedList,
            "listItem" => NodeKind::ListItem,
            "codeBlock" => NodeKind::CodeBlock,
            "blockquote" => NodeKind::Blockquote,
            "hardBreak" => NodeKind::HardBreak,
            "mention" => NodeKind::Mention,
            "emoji" => NodeKind::Emoji,
            "inlineCard" | "blockCard" => NodeKind::Card,
            "mediaGroup" | "mediaSingle" => NodeKind::Media,
            _ => NodeKind::Other,
        }
    }
}

/// Converts a rich-text value to plain text.
///
/// Strings pass through unchanged, null becomes empty, a `doc` tree is
/// walked depth-first, and any other JSON value is returned as JSON text.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("doc") => {
            let mut out = String::new();
            walk_children(value, &mut out);
            out
        }
        other => other.to_string(),
    }
}

fn children(node: &Value) -> &[Value] {
    node.get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn attr<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    node.get("attrs").and_then(|attrs| attrs.get(name))
}

fn attr_str<'a>(node: &'a Value, name: &str) -> Option<&'a str> {
    attr(node, name).and_then(Value::as_str)
}

fn walk_children(node: &Value, out: &mut String) {
    for child in children(node) {
        walk(child, out);
    }
}

fn inner_text(node: &Value) -> String {
    let mut text = String::new();
    walk_children(node, &mut text);
    text
}

fn walk(node: &Value, out: &mut String) {
    match NodeKind::of(node) {
        NodeKind::Text => {
            out.push_str(node.get("text").and_then(Value::as_str).unwrap_or_default());
        }
        NodeKind::Paragraph => {
            walk_children(node, out);
            out.push('\n');
        }
        NodeKind::Heading => {
            let level = attr(node, "level").and_then(Value::as_u64).unwrap_or(1) as usize;
            out.push('\n');
            out.push_str(&"#".repeat(level));
            out.push(' ');
            walk_children(node, out);
            out.push('\n');
        }
        NodeKind::BulletList => {
            for item in children(node) {
                out.push_str("* ");
                out.push_str(inner_text(item).trim());
                out.push('\n');
            }
        }
        NodeKind::OrderedList => {
            for (index, item) in children(node).iter().enumerate() {
                out.push_str(&format!("{}. {}\n", index + 1, inner_text(item).trim()));
            }
        }
        NodeKind::ListItem => walk_children(node, out),
        NodeKind::CodeBlock => {
            out.push_str("\n```\n");
            walk_children(node, out);
            out.push_str("\n```\n");
        }
        NodeKind::Blockquote => {
            out.push_str("> ");
            walk_children(node, out);
        }
        NodeKind::HardBreak => out.push('\n'),
        NodeKind::Mention => {
            let name = attr_str(node, "text").unwrap_or("user");
            out.push('@');
            out.push_str(name.strip_prefix('@').unwrap_or(name));
        }
        NodeKind::Emoji => out.push_str(attr_str(node, "text").unwrap_or_default()),
        NodeKind::Card => {
            out.push('[');
            out.push_str(attr_str(node, "url").unwrap_or_default());
            out.push(']');
        }
        NodeKind::Media => out.push_str("[Media]"),
        NodeKind::Other => walk_children(node, out),
    }
}
