//! Instance APIs handed to the methods factory and the connect callback.
//!
//! [`MethodsApi`] is available for the whole life of an instance.
//! [`ConnectApi`] adds the mount-scoped registrations (batched change
//! subscriptions, children-change callbacks, cleanups) and is only handed out
//! while connecting.

use std::cell::{Ref, RefCell, RefMut};
use std::ops::Deref;
use std::rc::Rc;

use super::definition::DefinitionShape;
use crate::engine::{Attribute, AttributeCodec, AttributeRegistry};
use crate::error::ComponentError;
use crate::host::Host;
use crate::pipeline::LifecycleController;
use crate::state::{ChangeBatch, ChangeSource, ComponentEvent, Emission, Schedule, dispatch, emit};
use crate::types::{LifecycleState, Microtask};

// =============================================================================
// MethodsApi
// =============================================================================

/// Per-instance capabilities.
pub struct MethodsApi<H: Host, Ctx> {
    host: Rc<H>,
    registry: AttributeRegistry,
    context: Rc<RefCell<Ctx>>,
    shape: Rc<DefinitionShape>,
    lifecycle: LifecycleController<H>,
}

impl<H: Host, Ctx> Clone for MethodsApi<H, Ctx> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            registry: self.registry.clone(),
            context: self.context.clone(),
            shape: self.shape.clone(),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

impl<H: Host, Ctx> MethodsApi<H, Ctx> {
    pub(crate) fn new(
        host: Rc<H>,
        registry: AttributeRegistry,
        context: Rc<RefCell<Ctx>>,
        shape: Rc<DefinitionShape>,
        lifecycle: LifecycleController<H>,
    ) -> Self {
        Self {
            host,
            registry,
            context,
            shape,
            lifecycle,
        }
    }

    /// Typed binding for a declared attribute.
    ///
    /// The codec is recovered from the declaration, so `C` must match the
    /// declared type.
    pub fn attribute<C: AttributeCodec>(&self, key: &str) -> Result<Attribute<C>, ComponentError> {
        let spec = self
            .shape
            .attribute_spec(key)
            .ok_or_else(|| ComponentError::UnknownAttribute(key.to_string()))?;
        let codec = C::from_spec(spec).ok_or_else(|| ComponentError::AttributeTypeMismatch {
            key: key.to_string(),
            declared: spec.kind(),
            requested: C::kind(),
        })?;
        self.registry.binding(key, codec)
    }

    pub fn context(&self) -> Ref<'_, Ctx> {
        self.context.borrow()
    }

    pub fn context_mut(&self) -> RefMut<'_, Ctx> {
        self.context.borrow_mut()
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    pub fn name(&self) -> &str {
        self.shape.name()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Live child list, without the content and mirror containers.
    pub fn children(&self) -> Vec<H::Node> {
        self.lifecycle.children()
    }

    /// Emit a cancelable event with no payload.
    pub fn emit_event(&self, name: &str) -> Emission {
        emit(&*self.host, name, None)
    }

    /// Emit a cancelable event carrying `detail`.
    pub fn emit_event_with<T: 'static>(&self, name: &str, detail: T) -> Emission {
        emit(&*self.host, name, Some(Rc::new(detail)))
    }

    /// Dispatch a pre-built event unchanged.
    pub fn dispatch(&self, event: &ComponentEvent) -> Emission {
        dispatch(&*self.host, event)
    }

    /// Replace the rendered output with `node`.
    pub fn render(&self, node: &H::Node) {
        let content = self.lifecycle.content_container();
        self.host.clear_children(content);
        self.host.append_child(content, node);
    }

    pub fn content_container(&self) -> H::Node {
        self.lifecycle.content_container().clone()
    }

    pub(crate) fn lifecycle(&self) -> &LifecycleController<H> {
        &self.lifecycle
    }
}

// =============================================================================
// ConnectApi
// =============================================================================

/// [`MethodsApi`] plus mount-scoped registrations and the instance methods.
pub struct ConnectApi<H: Host, Ctx, M> {
    api: MethodsApi<H, Ctx>,
    methods: Rc<M>,
}

impl<H: Host, Ctx, M> Deref for ConnectApi<H, Ctx, M> {
    type Target = MethodsApi<H, Ctx>;

    fn deref(&self) -> &Self::Target {
        &self.api
    }
}

impl<H: Host, Ctx, M> ConnectApi<H, Ctx, M> {
    pub(crate) fn new(api: MethodsApi<H, Ctx>, methods: Rc<M>) -> Self {
        Self { api, methods }
    }

    pub fn methods(&self) -> &M {
        &self.methods
    }

    /// Run `callback` once per checkpoint in which any of `sources` changed.
    ///
    /// The subscription ends on the next unmount; a batch armed before that
    /// never fires.
    pub fn on_change(
        &self,
        sources: &[&dyn ChangeSource],
        callback: impl Fn() + 'static,
    ) -> ChangeBatch {
        let host = self.api.host.clone();
        let schedule: Schedule = Rc::new(move |task: Microtask| host.queue_microtask(task));

        let batch = ChangeBatch::new(schedule, callback);
        for cleanup in batch.watch_all(sources) {
            self.api.lifecycle.defer_cleanup(cleanup);
        }
        batch
    }

    /// Call `callback` with the filtered child list after every structural
    /// mutation, until the next unmount.
    pub fn on_children_change(&self, callback: impl Fn(&[H::Node]) + 'static) {
        self.api.lifecycle.on_children_change(callback);
    }

    /// Run `cleanup` on the next unmount.
    pub fn defer_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        self.api.lifecycle.defer_cleanup(Box::new(cleanup));
    }

    /// Mirror container, when the type mirrors its children.
    pub fn mirror_container(&self) -> Option<H::Node> {
        self.api.lifecycle.mirror_container().cloned()
    }
}
