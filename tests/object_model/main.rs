//! Integration tests for the object model, organized by area
//!
//! These tests exercise objects through the public internal-method API.
//!
//! ## Aggressive Test Defaults
//!
//! Tests use aggressive defaults to catch bugs early:
//! - `GC_THRESHOLD=1` - GC on every allocation to catch GC bugs
//!
//! Override via environment variables:
//!
//! ```bash
//! cargo test                           # Default: aggressive settings
//! GC_THRESHOLD=100 cargo test          # Less aggressive GC for faster runs
//! ```

mod config;
mod define;
mod gc;
mod keys;
mod private;
mod prototype;
mod shapes;

use jsobject::{JsObjectRef, JsValue, PropertyAttributes, PropertyDescriptor, PropertyKey, Realm};

/// Create a new realm with aggressive defaults for testing:
/// - GC_THRESHOLD=1 (GC on every allocation) to catch GC bugs
pub fn create_test_realm() -> Realm {
    // RUST_LOG=debug cargo test  # Shape and GC tracing
    let _ = env_logger::builder().is_test(true).try_init();

    let mut realm = Realm::new();

    // GC_THRESHOLD=100 cargo test  # Faster runs
    // GC_THRESHOLD=0 cargo test    # Disable automatic GC
    let gc_threshold = std::env::var("GC_THRESHOLD")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1);
    realm.set_gc_threshold(gc_threshold);

    realm
}

/// Complete data descriptor
pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> PropertyDescriptor {
    PropertyDescriptor::data(
        value,
        PropertyAttributes::new(writable, enumerable, configurable),
    )
}

/// Getter-only accessor whose getter is a native function
pub fn getter(
    realm: &mut Realm,
    get: impl Fn(&mut Realm, JsValue, &[JsValue]) -> jsobject::JsResult<JsValue> + 'static,
) -> PropertyDescriptor {
    let f = realm.create_native_function("get", 0, get).unwrap();
    PropertyDescriptor::accessor(Some(f), None, PropertyAttributes::new(false, true, true))
}

/// Own keys rendered as strings, symbols as their description
pub fn key_strings(realm: &mut Realm, obj: &JsObjectRef) -> Vec<String> {
    obj.own_property_keys(realm)
        .unwrap()
        .iter()
        .map(PropertyKey::to_string)
        .collect()
}
