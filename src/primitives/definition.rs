//! Component Definition - the immutable description of a component type.
//!
//! A definition captures, once and for all instances:
//! - the tag name
//! - the ordered attribute declarations
//! - the declared event names (lower-cased at capture)
//! - options such as children mirroring
//! - the context factory, methods factory and connect callback
//!
//! # Example
//!
//! ```ignore
//! let counter = ComponentConfig::new("x-counter", || Cell::new(0))
//!     .attribute("step", AttributeSpec::Number)
//!     .event("Change")
//!     .methods(|api| {
//!         let api = api.clone();
//!         move || api.emit_event("change")
//!     })
//!     .connect(|api| {
//!         api.render(&MemoryNode::text("0"));
//!         None
//!     })
//!     .define()?;
//!
//! let element = counter.create(host);
//! element.connected();
//! ```

use std::fmt;
use std::rc::Rc;

use super::api::{ConnectApi, MethodsApi};
use super::element::Element;
use crate::engine::{AttributeSpec, define};
use crate::error::ComponentError;
use crate::host::Host;
use crate::state::{handler_slot_name, normalize_event_name};
use crate::types::Cleanup;

// =============================================================================
// Options
// =============================================================================

/// Per-type options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComponentOptions {
    /// Keep a deep copy of the qualifying children in a mirror container.
    pub mirror_children: bool,
}

// =============================================================================
// Callback Types
// =============================================================================

/// Creates the per-instance context. Runs once per instance.
pub type ContextFactory<Ctx> = Rc<dyn Fn() -> Ctx>;

/// Creates the per-instance public methods. Runs once per instance.
pub type MethodsFactory<H, Ctx, M> = Rc<dyn Fn(&MethodsApi<H, Ctx>) -> M>;

/// Runs on every mount. The returned cleanup runs on the next unmount.
pub type ConnectCallback<H, Ctx, M> = Rc<dyn Fn(&ConnectApi<H, Ctx, M>) -> Option<Cleanup>>;

// =============================================================================
// Shape
// =============================================================================

/// The non-generic part of a definition.
#[derive(Clone, Debug)]
pub struct DefinitionShape {
    name: String,
    attributes: Vec<(String, AttributeSpec)>,
    events: Vec<String>,
    options: ComponentOptions,
}

impl DefinitionShape {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[(String, AttributeSpec)] {
        &self.attributes
    }

    /// Declared event names, lower-cased.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn options(&self) -> ComponentOptions {
        self.options
    }

    /// Attribute keys in declaration order, followed by one `on<event>` key
    /// per declared event.
    pub fn observed_attributes(&self) -> Vec<String> {
        self.attributes
            .iter()
            .map(|(key, _)| key.clone())
            .chain(self.events.iter().map(|event| handler_slot_name(event)))
            .collect()
    }

    pub fn attribute_spec(&self, key: &str) -> Option<&AttributeSpec> {
        self.attributes
            .iter()
            .find(|(declared, _)| declared == key)
            .map(|(_, spec)| spec)
    }

    pub fn has_event(&self, name: &str) -> bool {
        let name = normalize_event_name(name);
        self.events.iter().any(|event| *event == name)
    }

    /// Event served by a declarative handler slot, if any.
    pub fn event_for_slot(&self, slot: &str) -> Option<&str> {
        self.events
            .iter()
            .find(|event| handler_slot_name(event) == slot)
            .map(String::as_str)
    }
}

// =============================================================================
// Config (builder)
// =============================================================================

/// Everything needed to build a [`ComponentDefinition`].
pub struct ComponentConfig<H: Host, Ctx, M> {
    pub name: String,
    pub attributes: Vec<(String, AttributeSpec)>,
    pub events: Vec<String>,
    pub options: ComponentOptions,
    pub context: ContextFactory<Ctx>,
    pub methods: MethodsFactory<H, Ctx, M>,
    pub connect: ConnectCallback<H, Ctx, M>,
}

impl<H: Host, Ctx: 'static> ComponentConfig<H, Ctx, ()> {
    /// Config with no attributes, no events, no methods and no connect work.
    pub fn new(name: impl Into<String>, context: impl Fn() -> Ctx + 'static) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            events: Vec::new(),
            options: ComponentOptions::default(),
            context: Rc::new(context),
            methods: Rc::new(|_: &MethodsApi<H, Ctx>| ()),
            connect: Rc::new(|_: &ConnectApi<H, Ctx, ()>| -> Option<Cleanup> { None }),
        }
    }
}

impl<H: Host, Ctx: 'static, M: 'static> ComponentConfig<H, Ctx, M> {
    pub fn attribute(mut self, key: impl Into<String>, spec: impl Into<AttributeSpec>) -> Self {
        self.attributes.push((key.into(), spec.into()));
        self
    }

    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.events.push(name.into());
        self
    }

    pub fn mirror_children(mut self, mirror: bool) -> Self {
        self.options.mirror_children = mirror;
        self
    }

    /// Set the methods factory.
    ///
    /// The connect callback depends on the methods type, so it is reset;
    /// call [`connect`](Self::connect) afterwards.
    pub fn methods<N: 'static>(
        self,
        factory: impl Fn(&MethodsApi<H, Ctx>) -> N + 'static,
    ) -> ComponentConfig<H, Ctx, N> {
        ComponentConfig {
            name: self.name,
            attributes: self.attributes,
            events: self.events,
            options: self.options,
            context: self.context,
            methods: Rc::new(factory),
            connect: Rc::new(|_: &ConnectApi<H, Ctx, N>| -> Option<Cleanup> { None }),
        }
    }

    pub fn connect(
        mut self,
        callback: impl Fn(&ConnectApi<H, Ctx, M>) -> Option<Cleanup> + 'static,
    ) -> Self {
        self.connect = Rc::new(callback);
        self
    }

    /// Capture and register in one step.
    pub fn define(self) -> Result<ComponentDefinition<H, Ctx, M>, ComponentError> {
        ComponentDefinition::new(self).register()
    }
}

// =============================================================================
// Definition
// =============================================================================

/// Immutable, shared description of a component type.
pub struct ComponentDefinition<H: Host, Ctx, M> {
    shape: Rc<DefinitionShape>,
    context: ContextFactory<Ctx>,
    methods: MethodsFactory<H, Ctx, M>,
    connect: ConnectCallback<H, Ctx, M>,
}

impl<H: Host, Ctx, M> Clone for ComponentDefinition<H, Ctx, M> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            context: self.context.clone(),
            methods: self.methods.clone(),
            connect: self.connect.clone(),
        }
    }
}

impl<H: Host, Ctx, M> fmt::Debug for ComponentDefinition<H, Ctx, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl<H: Host, Ctx: 'static, M: 'static> ComponentDefinition<H, Ctx, M> {
    pub fn new(config: ComponentConfig<H, Ctx, M>) -> Self {
        let events = config
            .events
            .iter()
            .map(|event| normalize_event_name(event))
            .collect();

        Self {
            shape: Rc::new(DefinitionShape {
                name: config.name,
                attributes: config.attributes,
                events,
                options: config.options,
            }),
            context: config.context,
            methods: config.methods,
            connect: config.connect,
        }
    }

    /// Register the name with the component type registry.
    pub fn register(self) -> Result<Self, ComponentError> {
        define(self.name(), self.observed_attributes())?;
        Ok(self)
    }

    /// Construct a new instance on `host`.
    pub fn create(&self, host: Rc<H>) -> Element<H, Ctx, M> {
        Element::new(self.clone(), host)
    }

    pub fn name(&self) -> &str {
        self.shape.name()
    }

    pub fn attributes(&self) -> &[(String, AttributeSpec)] {
        self.shape.attributes()
    }

    pub fn events(&self) -> &[String] {
        self.shape.events()
    }

    pub fn options(&self) -> ComponentOptions {
        self.shape.options()
    }

    pub fn observed_attributes(&self) -> Vec<String> {
        self.shape.observed_attributes()
    }

    pub fn attribute_spec(&self, key: &str) -> Option<&AttributeSpec> {
        self.shape.attribute_spec(key)
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.shape.has_event(name)
    }

    pub fn shape(&self) -> &Rc<DefinitionShape> {
        &self.shape
    }

    pub(crate) fn context_factory(&self) -> &ContextFactory<Ctx> {
        &self.context
    }

    pub(crate) fn methods_factory(&self) -> &MethodsFactory<H, Ctx, M> {
        &self.methods
    }

    pub(crate) fn connect_callback(&self) -> &ConnectCallback<H, Ctx, M> {
        &self.connect
    }
}

// =============================================================================
// Tests
// =============================================================================
