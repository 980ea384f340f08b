//! Host Adapter - the platform capabilities a component instance consumes.
//!
//! The core never talks to a concrete platform. Everything it needs is behind
//! [`Host`]:
//!
//! - a string-keyed attribute store that reports every mutation, whoever
//!   performed it ([`AttributeStore`])
//! - the instance's child list, containers and deep copies
//! - structural mutation observation
//! - cancelable, synchronous event dispatch ([`EventDispatch`])
//! - the microtask checkpoint used by change batching
//!
//! [`memory::MemoryHost`] implements all of it in-process.

pub mod memory;

use crate::scheduler;
use crate::state::events::{EventDispatch, EventListener};
use crate::types::{
    AttributeObserver, Cleanup, ContainerRole, ListenerId, Microtask, MutationCallback,
    ObserveOptions,
};

/// String-keyed attribute store owned by one host object.
pub trait AttributeStore {
    fn get_attribute(&self, key: &str) -> Option<String>;

    fn set_attribute(&self, key: &str, value: &str);

    fn remove_attribute(&self, key: &str);

    /// Install the observer for `keys`.
    ///
    /// The host must call it synchronously after every mutation of one of
    /// these keys, including mutations made through this trait.
    fn observe_attributes(&self, keys: &[String], observer: AttributeObserver);
}

/// Everything a component instance needs from its platform.
pub trait Host: AttributeStore + EventDispatch + 'static {
    /// Handle to a node in the host tree. Clones refer to the same node.
    type Node: Clone + 'static;

    /// The node that represents the component instance itself.
    fn root(&self) -> Self::Node;

    /// Direct children of the instance, in document order.
    fn child_nodes(&self) -> Vec<Self::Node>;

    /// Create a detached container playing `role`.
    fn create_container(&self, role: ContainerRole) -> Self::Node;

    fn is_container(&self, node: &Self::Node, role: ContainerRole) -> bool;

    /// Append `child` to `parent`, moving it if already attached elsewhere.
    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Detach `node` from its parent. No-op if detached.
    fn remove_node(&self, node: &Self::Node);

    fn clear_children(&self, parent: &Self::Node);

    /// Detached copy of `node` and all of its descendants.
    fn deep_clone(&self, node: &Self::Node) -> Self::Node;

    /// Start observing the instance's child lists.
    ///
    /// Mutations inside containers created by [`Host::create_container`] are
    /// not reported. Returns the disconnect function.
    fn observe_children(
        &self,
        options: ObserveOptions,
        callback: MutationCallback<Self::Node>,
    ) -> Cleanup;

    fn add_event_listener(&self, event_type: &str, listener: EventListener) -> ListenerId;

    fn remove_event_listener(&self, event_type: &str, id: ListenerId);

    /// Turn a declarative inline handler (the value of an `on<event>`
    /// attribute) into a listener. Hosts without a script engine return `None`.
    fn compile_inline_handler(&self, _source: &str) -> Option<EventListener> {
        None
    }

    /// Queue `task` for the next microtask checkpoint.
    fn queue_microtask(&self, task: Microtask) {
        scheduler::queue_microtask(task);
    }
}
