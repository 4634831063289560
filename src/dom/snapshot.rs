use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dom::tree::{Document, NodeId};
use crate::error::NavError;

/// Extracted page, as produced by the browser-side DOM dump.
///
/// ```json
/// { "url": "https://chatgpt.com/c/1", "title": "Chat",
///   "root": { "tag": "html", "children": [
///     { "tag": "body", "children": [
///       { "tag": "div", "attrs": { "data-message-author-role": "user" },
///         "children": [ { "text": "hello" } ] } ] } ] } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub root: SnapshotNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Element {
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<SnapshotNode>,
    },
    Text {
        text: String,
    },
}

impl PageSnapshot {
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        serde_json::from_str(json).map_err(|e| NavError::JsonParse {
            context: "page snapshot".into(),
            source: e,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NavError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| NavError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Build a live document from the snapshot.
    ///
    /// A text node at the root position is wrapped in an `<html>` element.
    pub fn into_document(self) -> Document {
        match self.root {
            SnapshotNode::Element {
                tag,
                attrs,
                children,
            } => {
                let doc = Document::with_root(self.url, self.title, &tag, attrs);
                let root = doc.root();
                for child in children {
                    append_snapshot(&doc, root, child);
                }
                doc
            }
            text @ SnapshotNode::Text { .. } => {
                let doc = Document::with_root(self.url, self.title, "html", BTreeMap::new());
                let root = doc.root();
                append_snapshot(&doc, root, text);
                doc
            }
        }
    }
}

fn append_snapshot(doc: &Document, parent: NodeId, node: SnapshotNode) {
    match node {
        SnapshotNode::Text { text } => {
            let id = doc.create_text(&text);
            doc.append_child(parent, id);
        }
        SnapshotNode::Element {
            tag,
            attrs,
            children,
        } => {
            let id = doc.create_element(&tag);
            for (name, value) in &attrs {
                doc.set_attribute(id, name, value);
            }
            doc.append_child(parent, id);
            for child in children {
                append_snapshot(doc, id, child);
            }
        }
    }
}
