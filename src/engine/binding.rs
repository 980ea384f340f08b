//! Attribute Binding - typed, memoized view over one attribute slot.
//!
//! A binding decodes the stored string on first read and caches the result
//! together with the registry's invalidation generation for the key. Any store
//! mutation bumps the generation before listeners run, so a listener that
//! re-reads the binding always sees the fresh value.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::codec::AttributeCodec;
use super::registry::RegistryInner;
use crate::state::batch::ChangeSource;
use crate::types::{AttributeChange, Cleanup};

struct MemoEntry<V> {
    generation: u64,
    value: Option<V>,
}

pub(crate) struct BindingInner<C: AttributeCodec> {
    key: String,
    codec: C,
    memo: RefCell<Option<MemoEntry<C::Value>>>,
    registry: Weak<RegistryInner>,
}

/// Typed handle to one attribute of one instance.
///
/// Clones share the same binding. There is exactly one binding per key per
/// instance, and it lives as long as the instance (not the mount).
pub struct Attribute<C: AttributeCodec> {
    inner: Rc<BindingInner<C>>,
}

impl<C: AttributeCodec> Clone for Attribute<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: AttributeCodec> fmt::Debug for Attribute<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("key", &self.inner.key)
            .field("kind", &C::kind())
            .finish()
    }
}

impl<C: AttributeCodec> Attribute<C> {
    pub(crate) fn new(key: &str, codec: C, registry: Weak<RegistryInner>) -> Self {
        Self {
            inner: Rc::new(BindingInner {
                key: key.to_string(),
                codec,
                memo: RefCell::new(None),
                registry,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<BindingInner<C>>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<BindingInner<C>> {
        &self.inner
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn codec(&self) -> &C {
        &self.inner.codec
    }

    /// Whether both handles refer to the same binding.
    pub fn same_binding(&self, other: &Attribute<C>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current decoded value.
    ///
    /// Absent keys decode to `None`, except flags which decode to `false`.
    pub fn get(&self) -> Option<C::Value> {
        let Some(registry) = self.inner.registry.upgrade() else {
            return self.inner.codec.decode(None);
        };

        let generation = registry.generation(&self.inner.key);
        if let Some(entry) = self.inner.memo.borrow().as_ref() {
            if entry.generation == generation {
                return entry.value.clone();
            }
        }

        let raw = registry.read(&self.inner.key);
        let value = self.inner.codec.decode(raw.as_deref());
        *self.inner.memo.borrow_mut() = Some(MemoEntry {
            generation,
            value: value.clone(),
        });
        value
    }

    /// Encode and store `value`. An encoding of `None` or `""` unsets the key.
    pub fn set(&self, value: C::Value) {
        match self.inner.codec.encode(&self.inner.key, &value) {
            Some(encoded) if !encoded.is_empty() => {
                if let Some(registry) = self.inner.registry.upgrade() {
                    registry.write(&self.inner.key, &encoded);
                }
            }
            _ => self.unset(),
        }
    }

    /// Remove the key from the store.
    pub fn unset(&self) {
        if let Some(registry) = self.inner.registry.upgrade() {
            registry.remove(&self.inner.key);
        }
    }

    /// Whether the key is currently present in the store.
    pub fn is_present(&self) -> bool {
        self.inner
            .registry
            .upgrade()
            .is_some_and(|registry| registry.read(&self.inner.key).is_some())
    }

    /// Call `listener` with the fresh value after every mutation of this key.
    ///
    /// Returns the unsubscribe function.
    pub fn on_change(&self, listener: impl Fn(Option<C::Value>) + 'static) -> Cleanup {
        let Some(registry) = self.inner.registry.upgrade() else {
            return Box::new(|| {});
        };
        let binding = self.clone();
        registry.subscribe(
            &self.inner.key,
            Rc::new(move |_change: &AttributeChange| listener(binding.get())),
        )
    }
}

impl<C: AttributeCodec> ChangeSource for Attribute<C> {
    fn subscribe_change(&self, listener: Rc<dyn Fn()>) -> Cleanup {
        let Some(registry) = self.inner.registry.upgrade() else {
            return Box::new(|| {});
        };
        registry.subscribe(
            &self.inner.key,
            Rc::new(move |_change: &AttributeChange| listener()),
        )
    }

    fn source_key(&self) -> &str {
        &self.inner.key
    }
}
