//! Attribute Registry - one per instance, owns the store handle.
//!
//! Responsibilities:
//! - create bindings lazily, one per key, cached for the instance lifetime
//! - route every store mutation (from any actor) to the key's listeners
//! - invalidate the key's memo before any listener runs
//!
//! Memo invalidation uses a per-key generation counter: writes and store
//! notifications bump it, bindings compare it against their cached entry.
//! The registry never polls the store.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::binding::{Attribute, BindingInner};
use super::codec::AttributeCodec;
use crate::error::ComponentError;
use crate::host::AttributeStore;
use crate::types::{AttributeChange, Cleanup};

/// Per-key listener on store mutations.
pub type AttributeListener = Rc<dyn Fn(&AttributeChange)>;

// =============================================================================
// Registry State
// =============================================================================

pub(crate) struct RegistryInner {
    store: Rc<dyn AttributeStore>,
    /// Key -> `Rc<BindingInner<C>>`, erased for storage.
    bindings: RefCell<HashMap<String, Rc<dyn Any>>>,
    /// Key -> codec kind of the cached binding.
    kinds: RefCell<HashMap<String, &'static str>>,
    generations: RefCell<HashMap<String, u64>>,
    listeners: RefCell<HashMap<String, Vec<(usize, AttributeListener)>>>,
    next_id: Cell<usize>,
}

impl RegistryInner {
    pub(crate) fn generation(&self, key: &str) -> u64 {
        self.generations.borrow().get(key).copied().unwrap_or(0)
    }

    fn invalidate(&self, key: &str) {
        *self
            .generations
            .borrow_mut()
            .entry(key.to_string())
            .or_insert(0) += 1;
    }

    pub(crate) fn read(&self, key: &str) -> Option<String> {
        self.store.get_attribute(key)
    }

    pub(crate) fn write(&self, key: &str, value: &str) {
        self.invalidate(key);
        self.store.set_attribute(key, value);
    }

    pub(crate) fn remove(&self, key: &str) {
        self.invalidate(key);
        self.store.remove_attribute(key);
    }

    pub(crate) fn subscribe(self: &Rc<Self>, key: &str, listener: AttributeListener) -> Cleanup {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push((id, listener));

        let registry = Rc::downgrade(self);
        let key = key.to_string();
        Box::new(move || {
            let Some(registry) = registry.upgrade() else { return };
            let mut listeners = registry.listeners.borrow_mut();
            if let Some(list) = listeners.get_mut(&key) {
                list.retain(|(listener_id, _)| *listener_id != id);
                if list.is_empty() {
                    listeners.remove(&key);
                }
            }
        })
    }

    fn attribute_changed(&self, change: &AttributeChange) {
        // Fresh values first, then listeners.
        self.invalidate(&change.name);

        // Snapshot so listeners may subscribe or unsubscribe.
        let listeners: Vec<AttributeListener> = self
            .listeners
            .borrow()
            .get(&change.name)
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        tracing::trace!(
            attribute = %change.name,
            listeners = listeners.len(),
            "attribute changed"
        );

        for listener in listeners {
            listener(change);
        }
    }
}

// =============================================================================
// Public Handle
// =============================================================================

/// Owns the store handle and the bindings of one instance.
#[derive(Clone)]
pub struct AttributeRegistry {
    inner: Rc<RegistryInner>,
}

impl AttributeRegistry {
    pub fn new(store: Rc<dyn AttributeStore>) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                store,
                bindings: RefCell::new(HashMap::new()),
                kinds: RefCell::new(HashMap::new()),
                generations: RefCell::new(HashMap::new()),
                listeners: RefCell::new(HashMap::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Route the store's notifications for `keys` into this registry.
    pub fn observe_store(&self, keys: &[String]) {
        let registry = Rc::downgrade(&self.inner);
        self.inner.store.observe_attributes(
            keys,
            Rc::new(move |change: &AttributeChange| {
                if let Some(registry) = registry.upgrade() {
                    registry.attribute_changed(change);
                }
            }),
        );
    }

    /// Get or lazily create the binding for `key`.
    ///
    /// Fails if the key already has a binding of a different codec type.
    pub fn binding<C: AttributeCodec>(
        &self,
        key: &str,
        codec: C,
    ) -> Result<Attribute<C>, ComponentError> {
        let existing = self.inner.bindings.borrow().get(key).cloned();
        if let Some(existing) = existing {
            return existing
                .downcast::<BindingInner<C>>()
                .map(Attribute::from_inner)
                .map_err(|_| ComponentError::AttributeTypeMismatch {
                    key: key.to_string(),
                    declared: self
                        .inner
                        .kinds
                        .borrow()
                        .get(key)
                        .copied()
                        .unwrap_or("unknown"),
                    requested: C::kind(),
                });
        }

        let kind = C::kind();
        let attribute = Attribute::new(key, codec, Rc::downgrade(&self.inner));
        let erased: Rc<dyn Any> = attribute.inner().clone();
        self.inner
            .bindings
            .borrow_mut()
            .insert(key.to_string(), erased);
        self.inner.kinds.borrow_mut().insert(key.to_string(), kind);

        tracing::trace!(attribute = key, kind, "binding created");
        Ok(attribute)
    }

    pub fn has_binding(&self, key: &str) -> bool {
        self.inner.bindings.borrow().contains_key(key)
    }

    pub fn binding_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    /// Entry point for store notifications (`attributeChangedCallback`).
    pub fn attribute_changed(&self, change: &AttributeChange) {
        self.inner.attribute_changed(change);
    }

    /// Listen to raw mutations of `key`. Returns the unsubscribe function.
    pub fn on_change(&self, key: &str, listener: impl Fn(&AttributeChange) + 'static) -> Cleanup {
        self.inner.subscribe(key, Rc::new(listener))
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(key)
            .map_or(0, |list| list.len())
    }

    /// Raw stored string.
    pub fn read(&self, key: &str) -> Option<String> {
        self.inner.read(key)
    }

    /// Invalidation generation of `key`.
    pub fn generation(&self, key: &str) -> u64 {
        self.inner.generation(key)
    }
}

// =============================================================================
// Tests
// =============================================================================
