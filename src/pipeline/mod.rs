//! Instance Pipeline
//!
//! Connects a component instance to its host across mount transitions.
//!
//! ```text
//! host connected    -> LifecycleController::mount   -> connect callback
//! child mutation    -> mirror copy -> children-change callbacks
//! host disconnected -> LifecycleController::unmount -> cleanups
//! ```

pub mod lifecycle;

pub use lifecycle::LifecycleController;
