//! Component Type Registry - names of defined component types.
//!
//! Plays the role of the host's custom element registry: a name can be
//! defined once, together with the attribute keys the host must observe for
//! it. Defining the same name twice is a configuration error.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::ComponentError;

thread_local! {
    /// Defined name -> observed attribute keys.
    static DEFINITIONS: RefCell<HashMap<String, Vec<String>>> = RefCell::new(HashMap::new());
}

/// Define a component type name with its observed keys.
pub fn define(name: &str, observed_attributes: Vec<String>) -> Result<(), ComponentError> {
    DEFINITIONS.with(|definitions| {
        let mut definitions = definitions.borrow_mut();
        if definitions.contains_key(name) {
            tracing::warn!(component = name, "duplicate component definition");
            return Err(ComponentError::AlreadyDefined(name.to_string()));
        }
        tracing::debug!(
            component = name,
            observed = ?observed_attributes,
            "component defined"
        );
        definitions.insert(name.to_string(), observed_attributes);
        Ok(())
    })
}

pub fn is_defined(name: &str) -> bool {
    DEFINITIONS.with(|definitions| definitions.borrow().contains_key(name))
}

/// Observed keys of a defined type.
pub fn observed_attributes(name: &str) -> Option<Vec<String>> {
    DEFINITIONS.with(|definitions| definitions.borrow().get(name).cloned())
}

/// All defined names, sorted.
pub fn defined_names() -> Vec<String> {
    let mut names: Vec<String> =
        DEFINITIONS.with(|definitions| definitions.borrow().keys().cloned().collect());
    names.sort();
    names
}

/// Forget every definition (for testing).
pub fn reset_definitions() {
    DEFINITIONS.with(|definitions| definitions.borrow_mut().clear());
}
