//! State Module - runtime notification systems
//!
//! - **Batch** - coalesced multi-source change subscriptions
//! - **Events** - cancelable emission with commit/cancel continuations

pub mod batch;
pub mod events;

pub use batch::{ChangeBatch, ChangeSource, Schedule};
pub use events::{
    ComponentEvent, EmitOutcome, Emission, EventDispatch, EventListener, dispatch, emit,
    handler_slot_name, normalize_event_name,
};
