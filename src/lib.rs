//! # spark-elements
//!
//! Reactive custom-element toolkit for Rust.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for the
//! reactive lifecycle state.
//!
//! ## Architecture
//!
//! A component type is declared once (tag name, typed attributes, events,
//! factories) and instantiated on a host object. Each instance owns:
//!
//! - an attribute registry: one memoized, typed binding per declared key,
//!   invalidated by every mutation of the host attribute store
//! - a lifecycle controller: mount/unmount transitions, cleanups, structural
//!   observation of children, optional children mirroring
//! - batched change subscriptions that coalesce synchronous writes into one
//!   callback per microtask checkpoint
//! - cancelable event emission with commit/cancel continuations
//!
//! ```text
//! host attribute store ──> AttributeRegistry ──> Attribute<C> ──> ChangeBatch ──> callback
//! host mount signals   ──> LifecycleController ──> connect / cleanups
//! host child list      ──> mutation records ──> mirror copy ──> children callbacks
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core types (LifecycleState, AttributeChange, MutationRecord, etc.)
//! - [`host`] - Host adapter traits and the in-memory host
//! - [`scheduler`] - Microtask checkpoint
//! - [`engine`] - Codecs, attribute bindings, registry, type definitions
//! - [`state`] - Change batching and event emission
//! - [`pipeline`] - Lifecycle controller
//! - [`primitives`] - Component definitions and instances
//! - [`error`] - Error type

pub mod engine;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod primitives;
pub mod scheduler;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::ComponentError;

pub use engine::{
    Attribute, AttributeCodec, AttributeListener, AttributeRegistry, AttributeSpec, Custom,
    CustomSpec, Flag, Number, NumberList, Text, TextList, define, defined_names, format_number,
    is_defined, observed_attributes, parse_number, reset_definitions,
};

pub use host::memory::{MemoryHost, MemoryNode};
pub use host::{AttributeStore, Host};

pub use pipeline::LifecycleController;

pub use primitives::{
    ComponentConfig, ComponentDefinition, ComponentOptions, ConnectApi, Element, MethodsApi,
    PropertyValue,
};

pub use scheduler::{pending_microtasks, queue_microtask, reset_scheduler, run_microtasks};

pub use state::{
    ChangeBatch, ChangeSource, ComponentEvent, EmitOutcome, Emission, EventDispatch,
    EventListener, dispatch, emit, handler_slot_name, normalize_event_name,
};
