//! Lifecycle Controller - mount/unmount transitions for one instance.
//!
//! # States
//!
//! ```text
//! Constructed -> Mounted -> Unmounted -> Mounted -> ...
//! ```
//!
//! ## mount()
//! 1. Attach the content container (the instance's rendered output)
//! 2. Copy qualifying children into the mirror container, if mirroring
//! 3. Run the connect callback and keep its teardown (or run it at once if
//!    the callback unmounted the instance)
//! 4. Start structural observation of the child list
//!
//! ## Structural mutation
//! Re-run the mirror copy (clear, then deep-copy each qualifying child in
//! document order), then call every children-change callback with the live,
//! filtered child list.
//!
//! ## unmount()
//! Stop observation, detach the content container, run the cleanup list once
//! in registration order, clear it. Bindings and context are untouched.
//!
//! Mount state is a `spark_signals::Signal`, so effects can track it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{Signal, signal};

use crate::host::Host;
use crate::types::{
    ChildrenCallback, Cleanup, ContainerRole, LifecycleState, MutationRecord, ObserveOptions,
};

// =============================================================================
// Controller
// =============================================================================

struct LifecycleInner<H: Host> {
    host: Rc<H>,
    name: String,
    state: Signal<LifecycleState>,
    cleanups: RefCell<Vec<Cleanup>>,
    children_callbacks: RefCell<Vec<(usize, ChildrenCallback<H::Node>)>>,
    next_callback_id: Cell<usize>,
    content: H::Node,
    mirror: Option<H::Node>,
    observer: RefCell<Option<Cleanup>>,
    mounts: Cell<usize>,
}

/// Owns the mount state, the cleanup list and structural observation.
pub struct LifecycleController<H: Host> {
    inner: Rc<LifecycleInner<H>>,
}

impl<H: Host> Clone for LifecycleController<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: Host> LifecycleController<H> {
    /// Create the controller and its containers. Nothing is attached yet.
    pub fn new(host: Rc<H>, name: impl Into<String>, mirror_children: bool) -> Self {
        let content = host.create_container(ContainerRole::Content);
        let mirror = mirror_children.then(|| host.create_container(ContainerRole::Mirror));

        Self {
            inner: Rc::new(LifecycleInner {
                host,
                name: name.into(),
                state: signal(LifecycleState::Constructed),
                cleanups: RefCell::new(Vec::new()),
                children_callbacks: RefCell::new(Vec::new()),
                next_callback_id: Cell::new(0),
                content,
                mirror,
                observer: RefCell::new(None),
                mounts: Cell::new(0),
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    /// Reactive mount state.
    pub fn state_signal(&self) -> Signal<LifecycleState> {
        self.inner.state.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.state().is_mounted()
    }

    /// Number of mount transitions so far.
    pub fn mount_count(&self) -> usize {
        self.inner.mounts.get()
    }

    /// Transition to `Mounted`, running `connect` exactly once.
    ///
    /// Returns `false` (and does nothing) if already mounted.
    pub fn mount(&self, connect: impl FnOnce() -> Option<Cleanup>) -> bool {
        let inner = &self.inner;
        if self.is_mounted() {
            tracing::trace!(component = %inner.name, "mount ignored, already mounted");
            return false;
        }

        inner.state.set(LifecycleState::Mounted);
        inner.mounts.set(inner.mounts.get() + 1);

        inner.host.append_child(&inner.host.root(), &inner.content);
        self.sync_mirror();

        let teardown = connect();

        // The connect callback may have unmounted us again. That cleanup pass
        // has already run, so the teardown runs here.
        if self.is_mounted() {
            if let Some(teardown) = teardown {
                inner.cleanups.borrow_mut().push(teardown);
            }

            let controller = Rc::downgrade(&self.inner);
            let disconnect = inner.host.observe_children(
                ObserveOptions::CHILD_LIST | ObserveOptions::SUBTREE,
                Rc::new(move |records: &[MutationRecord<H::Node>]| {
                    if let Some(inner) = controller.upgrade() {
                        LifecycleController { inner }.handle_mutations(records.len());
                    }
                }),
            );
            *inner.observer.borrow_mut() = Some(disconnect);
        } else if let Some(teardown) = teardown {
            teardown();
        }

        tracing::debug!(component = %inner.name, mounts = inner.mounts.get(), "mounted");
        true
    }

    /// Transition to `Unmounted`, running every cleanup once.
    ///
    /// Returns `false` (and does nothing) if not mounted. A panicking cleanup
    /// aborts the remaining cleanups of this pass.
    pub fn unmount(&self) -> bool {
        let inner = &self.inner;
        if !self.is_mounted() {
            return false;
        }

        inner.state.set(LifecycleState::Unmounted);

        let disconnect = inner.observer.borrow_mut().take();
        if let Some(disconnect) = disconnect {
            disconnect();
        }

        inner.host.remove_node(&inner.content);

        let cleanups = std::mem::take(&mut *inner.cleanups.borrow_mut());
        let count = cleanups.len();
        for cleanup in cleanups {
            cleanup();
        }

        tracing::debug!(component = %inner.name, cleanups = count, "unmounted");
        true
    }

    /// Register a cleanup for the next unmount.
    pub fn defer_cleanup(&self, cleanup: Cleanup) {
        self.inner.cleanups.borrow_mut().push(cleanup);
    }

    pub fn pending_cleanups(&self) -> usize {
        self.inner.cleanups.borrow().len()
    }

    /// Call `callback` with the filtered child list after every structural
    /// mutation. Removed again on the next unmount.
    pub fn on_children_change(&self, callback: impl Fn(&[H::Node]) + 'static) {
        let id = self.inner.next_callback_id.get();
        self.inner.next_callback_id.set(id + 1);
        self.inner
            .children_callbacks
            .borrow_mut()
            .push((id, Rc::new(callback)));

        let controller = Rc::downgrade(&self.inner);
        self.defer_cleanup(Box::new(move || {
            if let Some(inner) = controller.upgrade() {
                inner
                    .children_callbacks
                    .borrow_mut()
                    .retain(|(callback_id, _)| *callback_id != id);
            }
        }));
    }

    /// Direct children in document order, without the rendered output.
    pub fn children(&self) -> Vec<H::Node> {
        let host = &self.inner.host;
        host.child_nodes()
            .into_iter()
            .filter(|node| {
                !host.is_container(node, ContainerRole::Content)
                    && !host.is_container(node, ContainerRole::Mirror)
            })
            .collect()
    }

    pub fn content_container(&self) -> &H::Node {
        &self.inner.content
    }

    /// Mirror container, when children mirroring is enabled.
    pub fn mirror_container(&self) -> Option<&H::Node> {
        self.inner.mirror.as_ref()
    }

    /// Replace the mirror's content with deep copies of the current children.
    pub fn sync_mirror(&self) {
        let Some(mirror) = &self.inner.mirror else { return };
        let host = &self.inner.host;

        host.clear_children(mirror);
        for child in self.children() {
            let copy = host.deep_clone(&child);
            host.append_child(mirror, &copy);
        }
    }

    fn handle_mutations(&self, records: usize) {
        if !self.is_mounted() {
            return;
        }
        self.sync_mirror();

        let children = self.children();
        let callbacks: Vec<ChildrenCallback<H::Node>> = self
            .inner
            .children_callbacks
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        tracing::trace!(
            component = %self.inner.name,
            records,
            children = children.len(),
            "children changed"
        );

        for callback in callbacks {
            callback(&children);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
