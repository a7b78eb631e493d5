//! Exotic object kinds.
//!
//! Each kind overrides a subset of [`InternalMethods`](crate::object::InternalMethods)
//! and calls back into the ordinary algorithms for everything else. Host
//! bindings with their own exotic behavior plug into the same trait.

pub mod arguments;
pub mod array;
pub mod bound_function;
pub mod immutable_prototype;
pub mod module_namespace;
pub mod proxy;
pub mod typed_array;
