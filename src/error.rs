//! Typed errors for component definition, attribute access and handler slots.
//!
//! Decode degradation is deliberately absent: a malformed stored string decodes
//! to a degraded value (e.g. `NaN`) instead of failing.

use thiserror::Error;

/// Errors surfaced by the component toolkit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComponentError {
    /// A component type with this name was already defined.
    #[error("component `{0}` is already defined")]
    AlreadyDefined(String),

    /// A non-function value was assigned to a declarative event handler slot.
    #[error("handler slot `{slot}` expects a function, got {found}")]
    InvalidHandlerAssignment { slot: String, found: &'static str },

    /// The handler slot does not belong to any declared event.
    #[error("unknown event handler slot `{0}`")]
    UnknownHandlerSlot(String),

    /// The attribute key was not declared on the component type.
    #[error("attribute `{0}` is not declared")]
    UnknownAttribute(String),

    /// The attribute exists but was requested with a different codec.
    #[error("attribute `{key}` is declared as {declared}, requested as {requested}")]
    AttributeTypeMismatch {
        key: String,
        declared: &'static str,
        requested: &'static str,
    },
}
