use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use url::Url;

use crate::dom::selector::Selector;
use crate::dom::text::collect_inner_text;

// ============================================================================
// Node arena
// ============================================================================

/// Handle to a node in a [`Document`].
///
/// Handles are never reused: a removed node keeps its handle but is no longer
/// connected to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

// ============================================================================
// Mutation records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        name: String,
    },
    CharacterData,
}

/// One change to the connected tree, delivered to every live observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

/// Which record kinds an observer receives. Observation always covers the
/// whole document subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
}

impl ObserveOptions {
    pub fn all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
        }
    }

    fn accepts(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::Attributes { .. } => self.attributes,
            MutationKind::CharacterData => self.character_data,
        }
    }
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self::all()
    }
}

/// Receiving half of a document subscription.
pub struct MutationObserver {
    rx: mpsc::UnboundedReceiver<MutationRecord>,
}

impl MutationObserver {
    /// Wait for the next record, then drain everything queued behind it.
    ///
    /// Returns `None` once the document has been dropped.
    pub async fn next_batch(&mut self) -> Option<Vec<MutationRecord>> {
        let first = self.rx.recv().await?;
        let mut batch = vec![first];
        batch.extend(self.take_records());
        Some(batch)
    }

    /// Drain queued records without waiting.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.rx.try_recv() {
            records.push(record);
        }
        records
    }
}

struct Observer {
    options: ObserveOptions,
    tx: mpsc::UnboundedSender<MutationRecord>,
}

// ============================================================================
// Viewport
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Smooth,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBlock {
    Start,
    #[default]
    Center,
    End,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

/// The last scroll request made against the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub target: Option<NodeId>,
    pub options: Option<ScrollOptions>,
    pub scroll_count: u64,
}

// ============================================================================
// Document
// ============================================================================

pub(crate) struct DocumentInner {
    url: String,
    title: String,
    nodes: Vec<Node>,
    root: NodeId,
    observers: Vec<Observer>,
    viewport: Viewport,
}

impl DocumentInner {
    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub(crate) fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Pre-order (document order) walk of the subtree below `scope`,
    /// excluding `scope` itself.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.node(scope) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.node(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.parent = None;
        }
        Some(parent)
    }

    fn notify(&mut self, record: MutationRecord) {
        if !self.is_connected(record.target) {
            return;
        }
        self.observers.retain(|o| !o.tx.is_closed());
        for observer in &self.observers {
            if observer.options.accepts(&record.kind) {
                let _ = observer.tx.send(record.clone());
            }
        }
    }

    fn attrs_mut(&mut self, id: NodeId) -> Option<&mut BTreeMap<String, String>> {
        match &mut self.nodes.get_mut(id.0)?.data {
            NodeData::Element { attrs, .. } => Some(attrs),
            NodeData::Text(_) => None,
        }
    }
}

/// Shared, mutable stand-in for the host page's rendering tree.
///
/// Cloning the handle shares the same tree. Every mutation made through the
/// handle is reported to the observers registered with [`Document::observe`].
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<DocumentInner>>,
}

impl Document {
    /// An empty page: `<html><body></body></html>`.
    pub fn new(url: impl Into<String>) -> Self {
        let doc = Self::with_root(url, "", "html", BTreeMap::new());
        let body = doc.create_element("body");
        doc.append_child(doc.root(), body);
        doc
    }

    pub(crate) fn with_root(
        url: impl Into<String>,
        title: impl Into<String>,
        tag: &str,
        attrs: BTreeMap<String, String>,
    ) -> Self {
        let root = Node {
            data: NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(DocumentInner {
                url: url.into(),
                title: title.into(),
                nodes: vec![root],
                root: NodeId(0),
                observers: Vec::new(),
                viewport: Viewport::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DocumentInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    pub fn title(&self) -> String {
        self.lock().title.clone()
    }

    /// Hostname part of the page URL, lowercased and without port.
    pub fn host(&self) -> String {
        host_of(&self.lock().url)
    }

    pub fn root(&self) -> NodeId {
        self.lock().root
    }

    /// First `<body>` element, if the page has one.
    pub fn body(&self) -> Option<NodeId> {
        let inner = self.lock();
        inner
            .descendants(inner.root)
            .into_iter()
            .find(|id| inner.tag(*id) == Some("body"))
    }

    // ---- Structure ----

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.lock().push_node(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
        })
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.lock().push_node(NodeData::Text(text.to_string()))
    }

    /// Append `child` to `parent`, moving it if it is already attached.
    ///
    /// Returns `false` (and changes nothing) when `parent` is a text node or
    /// when the append would create a cycle.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> bool {
        let mut inner = self.lock();
        if inner.tag(parent).is_none()
            || inner.node(child).is_none()
            || inner.is_ancestor_or_self(child, parent)
        {
            return false;
        }

        if let Some(old_parent) = inner.detach(child) {
            inner.notify(MutationRecord {
                target: old_parent,
                kind: MutationKind::ChildList {
                    added: vec![],
                    removed: vec![child],
                },
            });
        }

        if let Some(node) = inner.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = inner.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
        inner.notify(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList {
                added: vec![child],
                removed: vec![],
            },
        });
        true
    }

    /// Detach `node` from its parent. The root cannot be removed.
    pub fn remove(&self, node: NodeId) -> bool {
        let mut inner = self.lock();
        match inner.detach(node) {
            Some(parent) => {
                inner.notify(MutationRecord {
                    target: parent,
                    kind: MutationKind::ChildList {
                        added: vec![],
                        removed: vec![node],
                    },
                });
                true
            }
            None => false,
        }
    }

    /// Replace the content of a text node.
    pub fn set_text(&self, node: NodeId, text: &str) -> bool {
        let mut inner = self.lock();
        let updated = match inner.nodes.get_mut(node.0).map(|n| &mut n.data) {
            Some(NodeData::Text(existing)) => {
                *existing = text.to_string();
                true
            }
            _ => false,
        };
        if updated {
            inner.notify(MutationRecord {
                target: node,
                kind: MutationKind::CharacterData,
            });
        }
        updated
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.lock().parent(node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.lock()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.lock().tag(node).map(str::to_string)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.lock().is_connected(node)
    }

    // ---- Attributes ----

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.lock().attr(node, name).map(str::to_string)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> bool {
        let mut inner = self.lock();
        let updated = match inner.attrs_mut(node) {
            Some(attrs) => {
                attrs.insert(name.to_string(), value.to_string());
                true
            }
            None => false,
        };
        if updated {
            inner.notify(MutationRecord {
                target: node,
                kind: MutationKind::Attributes {
                    name: name.to_string(),
                },
            });
        }
        updated
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner
            .attrs_mut(node)
            .and_then(|attrs| attrs.remove(name))
            .is_some();
        if removed {
            inner.notify(MutationRecord {
                target: node,
                kind: MutationKind::Attributes {
                    name: name.to_string(),
                },
            });
        }
        removed
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.lock()
            .attr(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&self, node: NodeId, class: &str) -> bool {
        if self.tag(node).is_none() || self.has_class(node, class) {
            return false;
        }
        let mut classes: Vec<String> = self
            .attribute(node, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        classes.push(class.to_string());
        self.set_attribute(node, "class", &classes.join(" "))
    }

    pub fn remove_class(&self, node: NodeId, class: &str) -> bool {
        if !self.has_class(node, class) {
            return false;
        }
        let remaining: Vec<String> = self
            .attribute(node, "class")
            .map(|c| {
                c.split_whitespace()
                    .filter(|t| *t != class)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        self.set_attribute(node, "class", &remaining.join(" "))
    }

    // ---- Queries ----

    /// Connected elements matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &Selector) -> Vec<NodeId> {
        let inner = self.lock();
        let mut out = Vec::new();
        if selector.matches(&inner, inner.root) {
            out.push(inner.root);
        }
        out.extend(
            inner
                .descendants(inner.root)
                .into_iter()
                .filter(|id| selector.matches(&inner, *id)),
        );
        out
    }

    /// Elements below `scope` (exclusive) matching `selector`.
    pub fn query_selector_all_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let inner = self.lock();
        inner
            .descendants(scope)
            .into_iter()
            .filter(|id| selector.matches(&inner, *id))
            .collect()
    }

    pub fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }

    /// First connected element whose attribute `name` equals `value` exactly.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<NodeId> {
        let inner = self.lock();
        std::iter::once(inner.root)
            .chain(inner.descendants(inner.root))
            .find(|id| inner.attr(*id, name) == Some(value))
    }

    /// Rendered-text approximation of `node`, see [`collect_inner_text`].
    pub fn inner_text(&self, node: NodeId) -> String {
        let inner = self.lock();
        let mut out = String::new();
        collect_inner_text(&inner, node, &mut out);
        out
    }

    // ---- Viewport ----

    /// Record a scroll request. Detached nodes cannot be scrolled to.
    pub fn scroll_into_view(&self, node: NodeId, options: ScrollOptions) -> bool {
        let mut inner = self.lock();
        if !inner.is_connected(node) {
            return false;
        }
        inner.viewport.target = Some(node);
        inner.viewport.options = Some(options);
        inner.viewport.scroll_count += 1;
        true
    }

    pub fn viewport(&self) -> Viewport {
        self.lock().viewport.clone()
    }

    // ---- Observation ----

    /// Subscribe to mutations anywhere in the document.
    pub fn observe(&self, options: ObserveOptions) -> MutationObserver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().observers.push(Observer { options, tx });
        MutationObserver { rx }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Document")
            .field("url", &inner.url)
            .field("nodes", &inner.nodes.len())
            .finish()
    }
}

/// Extract the lowercase hostname from a URL string.
///
/// Parsing follows the WHATWG URL rules, so `\` ends the authority of an
/// http(s) URL and IPv6 hosts keep their brackets. Input that does not parse
/// as an absolute URL has no host and yields an empty string.
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .map(|host| host.trim_end_matches('.').to_string())
        .unwrap_or_default()
}
