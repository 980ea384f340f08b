//! Component Primitives - defining component types and creating instances.
//!
//! - [`definition`] - the immutable per-type description and its builder
//! - [`api`] - capabilities handed to the methods factory and connect callback
//! - [`element`] - one live instance
//!
//! # Architecture
//!
//! ```text
//! ComponentConfig --define()--> ComponentDefinition --create(host)--> Element
//!                                                                      |
//!                 context factory, methods factory (once) <------------+
//!                 connect callback (every mount)        <---- connected()
//! ```

pub mod api;
pub mod definition;
pub mod element;

pub use api::{ConnectApi, MethodsApi};
pub use definition::{
    ComponentConfig, ComponentDefinition, ComponentOptions, ConnectCallback, ContextFactory,
    DefinitionShape, MethodsFactory,
};
pub use element::{Element, PropertyValue};
