//! Attribute Engine - typed bindings over the host attribute store.
//!
//! The engine manages:
//! - Codecs: decode/encode rules per attribute type
//! - Bindings: one memoized, typed view per attribute key
//! - Registry: per-instance binding cache and mutation routing
//! - Definitions: the set of defined component type names
//!
//! # Data flow
//!
//! ```text
//! store mutation (any actor) -> registry: bump generation -> per-key listeners
//!                                                          -> binding.get() re-decodes
//! ```

mod binding;
pub mod codec;
pub mod definitions;
mod registry;

pub use binding::Attribute;
pub use codec::{
    AttributeCodec, AttributeSpec, Custom, CustomSpec, Flag, Number, NumberList, Text, TextList,
    format_number, parse_number,
};
pub use definitions::{define, defined_names, is_defined, observed_attributes, reset_definitions};
pub use registry::{AttributeListener, AttributeRegistry};
