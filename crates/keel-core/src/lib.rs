//! Keel Core - kind descriptors, codec and patch algebra for Keel
//!
//! This crate holds everything that does not need a cluster:
//! - `ResourceKind` / `KindInfo`: per-kind descriptors (API location, scope, merge keys)
//! - `codec`: YAML/JSON decoding and document conversion
//! - `Input`: the accepted input shapes and their resolution
//! - `identity`: namespace selection and identity stripping
//! - `merge`: strategic merge, JSON merge and JSON patch computation

pub mod codec;
pub mod error;
pub mod identity;
pub mod input;
pub mod kind;
pub mod merge;

pub use codec::{Document, yaml_to_json};
pub use error::{CoreError, Result};
pub use identity::{effective_namespace, resource_name, scoped_namespace, strip_identity};
pub use input::Input;
pub use kind::{AnyObject, BUILTIN_KINDS, KindInfo, MergeKey, ResourceKind, find_builtin};
