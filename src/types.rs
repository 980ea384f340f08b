//! Core types shared by the host adapter, the engine and the lifecycle.

use std::rc::Rc;

use bitflags::bitflags;

// =============================================================================
// Callbacks
// =============================================================================

/// Cleanup function registered with a lifecycle or returned by a subscription.
///
/// Runs at most once.
pub type Cleanup = Box<dyn FnOnce()>;

/// Unit of deferred work queued for the next microtask checkpoint.
pub type Microtask = Box<dyn FnOnce()>;

/// Observer the host calls on every mutation of an observed attribute key.
pub type AttributeObserver = Rc<dyn Fn(&AttributeChange)>;

/// Callback receiving a batch of structural mutation records.
pub type MutationCallback<N> = Rc<dyn Fn(&[MutationRecord<N>])>;

/// Callback receiving the filtered, live child list of a component.
pub type ChildrenCallback<N> = Rc<dyn Fn(&[N])>;

// =============================================================================
// Lifecycle
// =============================================================================

/// Mount state of a component instance.
///
/// `Constructed -> Mounted -> Unmounted -> Mounted -> ...`. There is no
/// terminal state besides dropping the instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    #[default]
    Constructed,
    Mounted,
    Unmounted,
}

impl LifecycleState {
    pub fn is_mounted(self) -> bool {
        self == Self::Mounted
    }
}

// =============================================================================
// Attribute store notifications
// =============================================================================

/// A single mutation of the host attribute store.
///
/// `None` means the key was absent before (`previous`) or removed (`value`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeChange {
    pub name: String,
    pub previous: Option<String>,
    pub value: Option<String>,
}

impl AttributeChange {
    pub fn new(name: impl Into<String>, previous: Option<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            previous,
            value,
        }
    }

    /// True when the key was removed from the store.
    pub fn is_removal(&self) -> bool {
        self.value.is_none()
    }
}

// =============================================================================
// Structural observation
// =============================================================================

bitflags! {
    /// What a structural observer is notified about.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ObserveOptions: u8 {
        /// Insertions and removals in the observed node's own child list.
        const CHILD_LIST = 1 << 0;
        /// Extend observation to every descendant's child list.
        const SUBTREE = 1 << 1;
    }
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self::CHILD_LIST | Self::SUBTREE
    }
}

/// Describes one child-list mutation.
#[derive(Clone, Debug)]
pub struct MutationRecord<N> {
    /// Node whose child list changed.
    pub target: N,
    pub added: Vec<N>,
    pub removed: Vec<N>,
}

/// Which internal container a node plays for a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerRole {
    /// Holds the component's own rendered output.
    Content,
    /// Holds copies of the component's direct children.
    Mirror,
}

/// Handle to a host event listener, used for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub usize);
