//! Object model for an ECMAScript engine
//!
//! Objects keep named properties in shape-described slot storage, integer
//! keys in a packed-or-sparse indexed store, and class private state in a
//! separate element list. Every observable operation goes through the
//! internal methods of [`object::InternalMethods`]; arrays, arguments,
//! typed arrays, module namespaces and proxies override the subset they
//! change.
//!
//! # Example
//!
//! ```
//! use jsobject::{JsValue, PropertyKey, Realm, ShouldThrowExceptions};
//!
//! let mut realm = Realm::new();
//! let obj = realm.create_plain_object();
//! let key = PropertyKey::from("answer");
//! obj.set(&mut realm, &key, JsValue::Number(42.0), ShouldThrowExceptions::Yes)
//!     .unwrap();
//! assert_eq!(obj.get(&mut realm, &key).unwrap(), JsValue::Number(42.0));
//! ```

pub mod config;
pub mod error;
pub mod exotic;
pub mod gc;
pub mod object;
pub mod realm;
pub mod string_dict;
pub mod value;

pub use config::RealmConfig;
pub use error::{JsError, JsResult};
pub use gc::{Gc, GcStats, Guard, WeakGc};
pub use object::{
    IntegrityLevel, InternalMethods, JsObject, ObjectKind, PreferredType, PropertyAttributes,
    PropertyDescriptor, PropertyKind, ShouldThrowExceptions,
};
pub use realm::Realm;
pub use value::{CheapClone, JsObjectRef, JsString, JsSymbol, JsValue, PropertyKey};
