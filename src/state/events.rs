//! Event Emission - Cancelable dispatch with a commit/cancel continuation.
//!
//! Components emit events through the host's cancelable dispatch. Dispatch
//! resolves synchronously, so the returned [`Emission`] already knows whether
//! a listener cancelled it:
//!
//! ```ignore
//! api.emit_event_with("select", index)
//!     .on_commit(|| selected.set(index))
//!     .on_cancel(|| tracing::debug!("selection vetoed"));
//! ```
//!
//! Names given as strings are lower-cased so that host event-type matching is
//! case-insensitive at the API boundary. A pre-built [`ComponentEvent`] is
//! dispatched as-is. Listener panics propagate to the caller unmodified.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// TYPES
// =============================================================================

/// Listener for component events. Call `prevent_default` to cancel.
pub type EventListener = Rc<dyn Fn(&ComponentEvent)>;

/// Event dispatched by a component to host listeners.
pub struct ComponentEvent {
    event_type: String,
    detail: Option<Rc<dyn Any>>,
    cancelable: bool,
    default_prevented: Cell<bool>,
}

impl ComponentEvent {
    /// Create a cancelable event without payload. The type is used as given.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: None,
            cancelable: true,
            default_prevented: Cell::new(false),
        }
    }

    /// Attach a payload.
    pub fn with_detail<T: 'static>(mut self, detail: T) -> Self {
        self.detail = Some(Rc::new(detail));
        self
    }

    /// Attach an already shared payload.
    pub fn with_shared_detail(mut self, detail: Rc<dyn Any>) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Payload, if present and of type `T`.
    pub fn detail<T: 'static>(&self) -> Option<&T> {
        self.detail.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn has_detail(&self) -> bool {
        self.detail.is_some()
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// Cancel the event. No effect on non-cancelable events.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

impl fmt::Debug for ComponentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentEvent")
            .field("event_type", &self.event_type)
            .field("has_detail", &self.detail.is_some())
            .field("cancelable", &self.cancelable)
            .field("default_prevented", &self.default_prevented.get())
            .finish()
    }
}

/// Capability to dispatch events synchronously.
pub trait EventDispatch {
    /// Deliver `event` to listeners. Returns `false` if a listener cancelled it.
    fn dispatch_event(&self, event: &ComponentEvent) -> bool;
}

// =============================================================================
// EMISSION CONTINUATION
// =============================================================================

/// Outcome of a dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitOutcome {
    Committed,
    Cancelled,
}

/// Continuation returned by emission.
///
/// Only the branch matching the outcome runs, immediately, once per
/// registration and in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Emission {
    outcome: EmitOutcome,
}

impl Emission {
    pub fn new(outcome: EmitOutcome) -> Self {
        Self { outcome }
    }

    /// Run `f` if no listener cancelled the event.
    pub fn on_commit(self, f: impl FnOnce()) -> Self {
        if self.outcome == EmitOutcome::Committed {
            f();
        }
        self
    }

    /// Run `f` if a listener cancelled the event.
    pub fn on_cancel(self, f: impl FnOnce()) -> Self {
        if self.outcome == EmitOutcome::Cancelled {
            f();
        }
        self
    }

    pub fn outcome(&self) -> EmitOutcome {
        self.outcome
    }

    pub fn is_committed(&self) -> bool {
        self.outcome == EmitOutcome::Committed
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == EmitOutcome::Cancelled
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Lower-case an event name for dispatch.
pub fn normalize_event_name(name: &str) -> String {
    name.to_lowercase()
}

/// Name of the declarative handler slot for an event: `on<lowercased-name>`.
pub fn handler_slot_name(event: &str) -> String {
    format!("on{}", normalize_event_name(event))
}

/// Dispatch a pre-built event as-is.
pub fn dispatch<D: EventDispatch + ?Sized>(dispatcher: &D, event: &ComponentEvent) -> Emission {
    let outcome = if dispatcher.dispatch_event(event) {
        EmitOutcome::Committed
    } else {
        EmitOutcome::Cancelled
    };
    tracing::debug!(event = event.event_type(), ?outcome, "event dispatched");
    Emission::new(outcome)
}

/// Build a cancelable event from a name (lower-cased) and optional payload,
/// then dispatch it.
pub fn emit<D: EventDispatch + ?Sized>(
    dispatcher: &D,
    name: &str,
    detail: Option<Rc<dyn Any>>,
) -> Emission {
    let mut event = ComponentEvent::new(normalize_event_name(name));
    if let Some(detail) = detail {
        event = event.with_shared_detail(detail);
    }
    dispatch(dispatcher, &event)
}

// =============================================================================
// TESTS
// =============================================================================
