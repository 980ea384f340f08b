//! In-process host - node tree, attribute store, listeners, mutation observers.
//!
//! `MemoryHost` gives a component everything a browser-like platform would:
//! an element/text node tree, an attribute store on the root element that
//! reports every mutation, an event listener table with cancelable dispatch,
//! and mutation observers whose records are delivered at the next microtask
//! checkpoint.
//!
//! # Example
//!
//! ```ignore
//! use spark_elements::host::memory::{MemoryHost, MemoryNode};
//!
//! let host = Rc::new(MemoryHost::new("x-select"));
//! let element = definition.create(host.clone());
//! element.connected();
//!
//! let option = MemoryNode::element("option");
//! option.set_text_content("first");
//! host.root_node().append_child(&option);
//! scheduler::run_microtasks();
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::host::{AttributeStore, Host};
use crate::scheduler;
use crate::state::events::{ComponentEvent, EventDispatch, EventListener};
use crate::types::{
    AttributeChange, AttributeObserver, Cleanup, ContainerRole, ListenerId, MutationCallback,
    MutationRecord, ObserveOptions,
};

/// Class given to the rendered-output container.
pub const CONTENT_CONTAINER_CLASS: &str = "spark-content";

/// Class given to the children mirror container.
pub const MIRROR_CONTAINER_CLASS: &str = "spark-children";

// =============================================================================
// NODES
// =============================================================================

enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    role: Option<ContainerRole>,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<MemoryNode>,
    observers: Vec<Rc<ObserverEntry>>,
}

/// Shared handle to a node. Clones point at the same node.
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<NodeData>>);

impl MemoryNode {
    fn from_kind(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            role: None,
            parent: Weak::new(),
            children: Vec::new(),
            observers: Vec::new(),
        })))
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::from_kind(NodeKind::Element {
            tag: tag.into(),
            attributes: Vec::new(),
        })
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::from_kind(NodeKind::Text(content.into()))
    }

    pub fn ptr_eq(&self, other: &MemoryNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Text(_))
    }

    /// Tag name, `None` for text nodes.
    pub fn tag(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn role(&self) -> Option<ContainerRole> {
        self.0.borrow().role
    }

    pub fn parent(&self) -> Option<MemoryNode> {
        self.0.borrow().parent.upgrade().map(MemoryNode)
    }

    pub fn children(&self) -> Vec<MemoryNode> {
        self.0.borrow().children.clone()
    }

    // -------------------------------------------------------------------------
    // Attributes (no notifications - see MemoryHost for the observed store)
    // -------------------------------------------------------------------------

    pub fn get_attribute(&self, key: &str) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Write an attribute, returning the previous value.
    pub fn set_attribute(&self, key: &str, value: &str) -> Option<String> {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Element { attributes, .. } => {
                if let Some(entry) = attributes.iter_mut().find(|(k, _)| k == key) {
                    Some(std::mem::replace(&mut entry.1, value.to_string()))
                } else {
                    attributes.push((key.to_string(), value.to_string()));
                    None
                }
            }
            NodeKind::Text(_) => None,
        }
    }

    /// Remove an attribute, returning the previous value.
    pub fn remove_attribute(&self, key: &str) -> Option<String> {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Element { attributes, .. } => {
                let index = attributes.iter().position(|(k, _)| k == key)?;
                Some(attributes.remove(index).1)
            }
            NodeKind::Text(_) => None,
        }
    }

    // -------------------------------------------------------------------------
    // Tree mutation
    // -------------------------------------------------------------------------

    /// Whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: &MemoryNode) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Append `child`, detaching it from its previous parent first.
    ///
    /// Appending a node under itself or one of its descendants is rejected
    /// and leaves the tree unchanged.
    pub fn append_child(&self, child: &MemoryNode) {
        if child.contains(self) {
            tracing::warn!("hierarchy request rejected: node would become its own ancestor");
            return;
        }
        child.remove();
        self.0.borrow_mut().children.push(child.clone());
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        record_mutation(self, vec![child.clone()], Vec::new());
    }

    /// Detach from the parent.
    pub fn remove(&self) {
        let parent = self.0.borrow().parent.upgrade();
        let Some(parent) = parent.map(MemoryNode) else { return };

        parent.0.borrow_mut().children.retain(|c| !c.ptr_eq(self));
        self.0.borrow_mut().parent = Weak::new();
        record_mutation(&parent, Vec::new(), vec![self.clone()]);
    }

    pub fn clear_children(&self) {
        let removed = self.detach_children();
        if !removed.is_empty() {
            record_mutation(self, Vec::new(), removed);
        }
    }

    /// Replace the content with a single text node (or nothing if empty).
    ///
    /// On a text node this only changes its data, which is not a child-list
    /// mutation.
    pub fn set_text_content(&self, content: &str) {
        if let NodeKind::Text(data) = &mut self.0.borrow_mut().kind {
            *data = content.to_string();
            return;
        }

        let removed = self.detach_children();
        let mut added = Vec::new();
        if !content.is_empty() {
            let text = MemoryNode::text(content);
            self.0.borrow_mut().children.push(text.clone());
            text.0.borrow_mut().parent = Rc::downgrade(&self.0);
            added.push(text);
        }
        if !added.is_empty() || !removed.is_empty() {
            record_mutation(self, added, removed);
        }
    }

    fn detach_children(&self) -> Vec<MemoryNode> {
        let removed = std::mem::take(&mut self.0.borrow_mut().children);
        for child in &removed {
            child.0.borrow_mut().parent = Weak::new();
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Reading
    // -------------------------------------------------------------------------

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Element { .. } => data.children.iter().map(|c| c.text_content()).collect(),
        }
    }

    /// Detached copy of this node and its subtree.
    pub fn deep_clone(&self) -> MemoryNode {
        let data = self.0.borrow();
        let kind = match &data.kind {
            NodeKind::Element { tag, attributes } => NodeKind::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
            },
            NodeKind::Text(text) => NodeKind::Text(text.clone()),
        };
        let copy = MemoryNode::from_kind(kind);
        for child in &data.children {
            let child_copy = child.deep_clone();
            child_copy.0.borrow_mut().parent = Rc::downgrade(&copy.0);
            copy.0.borrow_mut().children.push(child_copy);
        }
        copy
    }

    /// Serialize as HTML-like markup.
    pub fn to_html(&self) -> String {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text(text) => escape(text, false),
            NodeKind::Element { tag, attributes } => {
                let mut out = format!("<{tag}");
                for (key, value) in attributes {
                    out.push_str(&format!(" {key}=\"{}\"", escape(value, true)));
                }
                out.push('>');
                for child in &data.children {
                    out.push_str(&child.to_html());
                }
                out.push_str(&format!("</{tag}>"));
                out
            }
        }
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    /// Observe child-list mutations of this node (and its subtree with
    /// `SUBTREE`). Returns the disconnect function.
    pub fn observe(
        &self,
        options: ObserveOptions,
        callback: MutationCallback<MemoryNode>,
    ) -> Cleanup {
        let entry = Rc::new(ObserverEntry {
            options,
            callback,
            pending: RefCell::new(Vec::new()),
            scheduled: Cell::new(false),
            active: Cell::new(true),
        });
        self.0.borrow_mut().observers.push(entry.clone());

        let node = Rc::downgrade(&self.0);
        Box::new(move || {
            entry.active.set(false);
            entry.pending.borrow_mut().clear();
            if let Some(node) = node.upgrade() {
                node.borrow_mut()
                    .observers
                    .retain(|o| !Rc::ptr_eq(o, &entry));
            }
        })
    }
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_html())
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

// =============================================================================
// MUTATION OBSERVERS
// =============================================================================

struct ObserverEntry {
    options: ObserveOptions,
    callback: MutationCallback<MemoryNode>,
    pending: RefCell<Vec<MutationRecord<MemoryNode>>>,
    scheduled: Cell<bool>,
    active: Cell<bool>,
}

impl ObserverEntry {
    fn enqueue(self: &Rc<Self>, record: MutationRecord<MemoryNode>) {
        if !self.active.get() {
            return;
        }
        self.pending.borrow_mut().push(record);

        // One delivery per checkpoint, carrying every record queued before it.
        if !self.scheduled.replace(true) {
            let entry = self.clone();
            scheduler::queue_microtask(move || entry.deliver());
        }
    }

    fn deliver(&self) {
        self.scheduled.set(false);
        let records = std::mem::take(&mut *self.pending.borrow_mut());
        if self.active.get() && !records.is_empty() {
            (self.callback)(&records);
        }
    }
}

/// Report a child-list mutation of `target` to observers on it and its
/// ancestors. Containers stop propagation: their subtrees are the
/// component's own output.
fn record_mutation(target: &MemoryNode, added: Vec<MemoryNode>, removed: Vec<MemoryNode>) {
    let mut current = Some(target.clone());
    let mut direct = true;

    while let Some(node) = current {
        let (role, observers, parent) = {
            let data = node.0.borrow();
            (data.role, data.observers.clone(), data.parent.upgrade())
        };
        if role.is_some() {
            break;
        }

        for observer in observers {
            let wants = observer.options.contains(ObserveOptions::CHILD_LIST)
                && (direct || observer.options.contains(ObserveOptions::SUBTREE));
            if wants {
                observer.enqueue(MutationRecord {
                    target: target.clone(),
                    added: added.clone(),
                    removed: removed.clone(),
                });
            }
        }

        direct = false;
        current = parent.map(MemoryNode);
    }
}

// =============================================================================
// HOST
// =============================================================================

/// In-process host for one component instance.
pub struct MemoryHost {
    root: MemoryNode,
    observed: RefCell<Option<(Vec<String>, AttributeObserver)>>,
    listeners: RefCell<HashMap<String, Vec<(ListenerId, EventListener)>>>,
    next_listener: Cell<usize>,
    inline_handlers: RefCell<HashMap<String, EventListener>>,
    dispatched: RefCell<Vec<String>>,
}

impl MemoryHost {
    /// Create a host whose root element has the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            root: MemoryNode::element(tag),
            observed: RefCell::new(None),
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
            inline_handlers: RefCell::new(HashMap::new()),
            dispatched: RefCell::new(Vec::new()),
        }
    }

    pub fn root_node(&self) -> &MemoryNode {
        &self.root
    }

    /// Markup of the whole instance.
    pub fn to_html(&self) -> String {
        self.root.to_html()
    }

    /// Make `source` resolvable as an inline `on<event>` handler.
    pub fn register_inline_handler(&self, source: impl Into<String>, listener: EventListener) {
        self.inline_handlers
            .borrow_mut()
            .insert(source.into(), listener);
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .borrow()
            .get(event_type)
            .map_or(0, |list| list.len())
    }

    /// Types of all events dispatched so far, in order.
    pub fn dispatched_events(&self) -> Vec<String> {
        self.dispatched.borrow().clone()
    }

    fn notify(&self, key: &str, previous: Option<String>, value: Option<String>) {
        let observer = self
            .observed
            .borrow()
            .as_ref()
            .filter(|(keys, _)| keys.iter().any(|k| k == key))
            .map(|(_, observer)| observer.clone());

        if let Some(observer) = observer {
            observer(&AttributeChange::new(key, previous, value));
        }
    }
}

impl AttributeStore for MemoryHost {
    fn get_attribute(&self, key: &str) -> Option<String> {
        self.root.get_attribute(key)
    }

    fn set_attribute(&self, key: &str, value: &str) {
        let previous = self.root.set_attribute(key, value);
        self.notify(key, previous, Some(value.to_string()));
    }

    fn remove_attribute(&self, key: &str) {
        if let Some(previous) = self.root.remove_attribute(key) {
            self.notify(key, Some(previous), None);
        }
    }

    fn observe_attributes(&self, keys: &[String], observer: AttributeObserver) {
        *self.observed.borrow_mut() = Some((keys.to_vec(), observer));
    }
}

impl EventDispatch for MemoryHost {
    fn dispatch_event(&self, event: &ComponentEvent) -> bool {
        self.dispatched
            .borrow_mut()
            .push(event.event_type().to_string());

        // Snapshot so listeners may add or remove listeners.
        let listeners: Vec<EventListener> = self
            .listeners
            .borrow()
            .get(event.event_type())
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(event);
        }
        !event.is_default_prevented()
    }
}

impl Host for MemoryHost {
    type Node = MemoryNode;

    fn root(&self) -> MemoryNode {
        self.root.clone()
    }

    fn child_nodes(&self) -> Vec<MemoryNode> {
        self.root.children()
    }

    fn create_container(&self, role: ContainerRole) -> MemoryNode {
        let node = MemoryNode::element("div");
        let class = match role {
            ContainerRole::Content => CONTENT_CONTAINER_CLASS,
            ContainerRole::Mirror => MIRROR_CONTAINER_CLASS,
        };
        node.set_attribute("class", class);
        node.0.borrow_mut().role = Some(role);
        node
    }

    fn is_container(&self, node: &MemoryNode, role: ContainerRole) -> bool {
        node.role() == Some(role)
    }

    fn append_child(&self, parent: &MemoryNode, child: &MemoryNode) {
        parent.append_child(child);
    }

    fn remove_node(&self, node: &MemoryNode) {
        node.remove();
    }

    fn clear_children(&self, parent: &MemoryNode) {
        parent.clear_children();
    }

    fn deep_clone(&self, node: &MemoryNode) -> MemoryNode {
        node.deep_clone()
    }

    fn observe_children(
        &self,
        options: ObserveOptions,
        callback: MutationCallback<MemoryNode>,
    ) -> Cleanup {
        self.root.observe(options, callback)
    }

    fn add_event_listener(&self, event_type: &str, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(event_type.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    fn remove_event_listener(&self, event_type: &str, id: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(list) = listeners.get_mut(event_type) {
            list.retain(|(listener_id, _)| *listener_id != id);
            if list.is_empty() {
                listeners.remove(event_type);
            }
        }
    }

    fn compile_inline_handler(&self, source: &str) -> Option<EventListener> {
        self.inline_handlers.borrow().get(source).cloned()
    }
}

// =============================================================================
// TESTS
// =============================================================================
