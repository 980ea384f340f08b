//! Element - one live instance of a component type.
//!
//! Construction:
//! 1. Create the attribute registry and route the host's notifications for
//!    the observed keys into it
//! 2. Create the lifecycle controller (and its containers)
//! 3. Run the context factory, then the methods factory, exactly once
//! 4. Resolve declarative `on<event>` attributes already present
//!
//! The host then forwards its mount signals through [`Element::connected`]
//! and [`Element::disconnected`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use spark_signals::Signal;

use super::api::{ConnectApi, MethodsApi};
use super::definition::ComponentDefinition;
use crate::engine::{Attribute, AttributeCodec, AttributeRegistry};
use crate::error::ComponentError;
use crate::host::{AttributeStore, Host};
use crate::pipeline::LifecycleController;
use crate::state::{Emission, EventListener, handler_slot_name};
use crate::types::{AttributeChange, LifecycleState, ListenerId};

// =============================================================================
// Property values
// =============================================================================

/// A value assigned to a declarative handler slot.
#[derive(Clone)]
pub enum PropertyValue {
    Handler(EventListener),
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Handler(_) => "function",
            PropertyValue::Null => "null",
            PropertyValue::Text(_) => "string",
            PropertyValue::Number(_) => "number",
            PropertyValue::Bool(_) => "boolean",
        }
    }
}

impl std::fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Handler(_) => f.write_str("Handler(..)"),
            PropertyValue::Null => f.write_str("Null"),
            PropertyValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            PropertyValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            PropertyValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
        }
    }
}

// =============================================================================
// Element
// =============================================================================

struct InstalledHandler {
    event: String,
    listener: EventListener,
    id: ListenerId,
}

struct ElementInner<H: Host, Ctx, M> {
    definition: ComponentDefinition<H, Ctx, M>,
    api: MethodsApi<H, Ctx>,
    methods: Rc<M>,
    handlers: RefCell<HashMap<String, InstalledHandler>>,
}

/// Handle to one component instance. Clones share the instance.
pub struct Element<H: Host, Ctx, M> {
    inner: Rc<ElementInner<H, Ctx, M>>,
}

impl<H: Host, Ctx, M> Clone for Element<H, Ctx, M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: Host, Ctx: 'static, M: 'static> Element<H, Ctx, M> {
    pub(crate) fn new(definition: ComponentDefinition<H, Ctx, M>, host: Rc<H>) -> Self {
        let store: Rc<dyn AttributeStore> = host.clone();
        let registry = AttributeRegistry::new(store);
        registry.observe_store(&definition.observed_attributes());

        let lifecycle = LifecycleController::new(
            host.clone(),
            definition.name(),
            definition.options().mirror_children,
        );

        let context = Rc::new(RefCell::new((definition.context_factory())()));
        let api = MethodsApi::new(
            host,
            registry,
            context,
            definition.shape().clone(),
            lifecycle,
        );
        let methods = Rc::new((definition.methods_factory())(&api));

        let element = Self {
            inner: Rc::new(ElementInner {
                definition,
                api,
                methods,
                handlers: RefCell::new(HashMap::new()),
            }),
        };
        element.watch_inline_handlers();

        tracing::debug!(component = element.inner.definition.name(), "instance constructed");
        element
    }

    /// Resolve `on<event>` attributes now and on every later change.
    fn watch_inline_handlers(&self) {
        let weak: Weak<ElementInner<H, Ctx, M>> = Rc::downgrade(&self.inner);
        let registry = self.inner.api.registry();

        for event in self.inner.definition.events() {
            let slot = handler_slot_name(event);
            if let Some(source) = registry.read(&slot) {
                self.apply_inline_handler(&slot, Some(&source));
            }

            let weak = weak.clone();
            // Lives as long as the registry, i.e. the instance.
            let _subscription = registry.on_change(&slot, move |change: &AttributeChange| {
                if let Some(inner) = weak.upgrade() {
                    Element { inner }.apply_inline_handler(&change.name, change.value.as_deref());
                }
            });
        }
    }

    fn apply_inline_handler(&self, slot: &str, source: Option<&str>) {
        let listener = source.and_then(|source| self.host().compile_inline_handler(source));
        if source.is_some() && listener.is_none() {
            tracing::debug!(slot, "inline handler not compiled by host");
        }
        if let Some(event) = self.inner.definition.shape().event_for_slot(slot) {
            let event = event.to_string();
            self.install_handler(slot, &event, listener);
        }
    }

    fn install_handler(&self, slot: &str, event: &str, listener: Option<EventListener>) {
        let host = self.host();
        let previous = self.inner.handlers.borrow_mut().remove(slot);
        if let Some(previous) = previous {
            host.remove_event_listener(&previous.event, previous.id);
        }

        if let Some(listener) = listener {
            let id = host.add_event_listener(event, listener.clone());
            self.inner.handlers.borrow_mut().insert(
                slot.to_string(),
                InstalledHandler {
                    event: event.to_string(),
                    listener,
                    id,
                },
            );
        }
    }

    // -------------------------------------------------------------------------
    // Host mount signals
    // -------------------------------------------------------------------------

    /// The host attached this instance. Returns `false` if already mounted.
    pub fn connected(&self) -> bool {
        let api = self.inner.api.clone();
        let methods = self.inner.methods.clone();
        let connect = self.inner.definition.connect_callback().clone();

        self.inner.api.lifecycle().mount(move || {
            let connect_api = ConnectApi::new(api, methods);
            connect(&connect_api)
        })
    }

    /// The host detached this instance. Returns `false` if not mounted.
    pub fn disconnected(&self) -> bool {
        self.inner.api.lifecycle().unmount()
    }

    // -------------------------------------------------------------------------
    // Declarative handler slots
    // -------------------------------------------------------------------------

    /// Assign a declarative handler slot (`on<event>`).
    ///
    /// A handler replaces the previous one, `Null` clears it, anything else
    /// is rejected.
    pub fn set_event_handler(&self, slot: &str, value: PropertyValue) -> Result<(), ComponentError> {
        let Some(event) = self.inner.definition.shape().event_for_slot(slot) else {
            return Err(ComponentError::UnknownHandlerSlot(slot.to_string()));
        };
        let event = event.to_string();

        match value {
            PropertyValue::Handler(listener) => self.install_handler(slot, &event, Some(listener)),
            PropertyValue::Null => self.install_handler(slot, &event, None),
            other => {
                let found = other.type_name();
                tracing::warn!(
                    component = self.inner.definition.name(),
                    slot,
                    found,
                    "non-function assigned to handler slot"
                );
                return Err(ComponentError::InvalidHandlerAssignment {
                    slot: slot.to_string(),
                    found,
                });
            }
        }
        Ok(())
    }

    /// Handler currently installed in `slot`.
    pub fn event_handler(&self, slot: &str) -> Option<EventListener> {
        self.inner
            .handlers
            .borrow()
            .get(slot)
            .map(|installed| installed.listener.clone())
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn attribute<C: AttributeCodec>(&self, key: &str) -> Result<Attribute<C>, ComponentError> {
        self.inner.api.attribute(key)
    }

    pub fn context(&self) -> std::cell::Ref<'_, Ctx> {
        self.inner.api.context()
    }

    pub fn methods(&self) -> &M {
        &self.inner.methods
    }

    pub fn api(&self) -> &MethodsApi<H, Ctx> {
        &self.inner.api
    }

    pub fn host(&self) -> &Rc<H> {
        self.inner.api.host()
    }

    pub fn definition(&self) -> &ComponentDefinition<H, Ctx, M> {
        &self.inner.definition
    }

    pub fn emit_event(&self, name: &str) -> Emission {
        self.inner.api.emit_event(name)
    }

    pub fn children(&self) -> Vec<H::Node> {
        self.inner.api.children()
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.api.lifecycle().state()
    }

    pub fn state_signal(&self) -> Signal<LifecycleState> {
        self.inner.api.lifecycle().state_signal()
    }

    pub fn is_mounted(&self) -> bool {
        self.state().is_mounted()
    }

    pub fn mount_count(&self) -> usize {
        self.inner.api.lifecycle().mount_count()
    }

    pub fn content_container(&self) -> H::Node {
        self.inner.api.content_container()
    }
}

// =============================================================================
// Tests
// =============================================================================
