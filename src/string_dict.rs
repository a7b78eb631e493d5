//! Property-name interning.
//!
//! Built-in installation and descriptor conversion create the same handful of
//! names over and over ("length", "value", "get", trap names, ...). The realm
//! keeps one `NameTable` so those keys share a single `Rc<str>`.

use rustc_hash::FxHashMap;

use crate::value::{CheapClone, JsString, PropertyKey};

/// Interned property names.
pub struct NameTable {
    /// Box<str> key avoids double indirection through Rc
    names: FxHashMap<Box<str>, JsString>,
}

impl NameTable {
    pub fn new() -> Self {
        Self {
            names: FxHashMap::default(),
        }
    }

    /// A table pre-populated with the names the object model itself uses.
    pub fn with_well_known_names() -> Self {
        let mut table = Self::new();
        for name in WELL_KNOWN_NAMES {
            table.intern(name);
        }
        table
    }

    /// Get an existing string or insert a new one.
    pub fn intern(&mut self, s: &str) -> JsString {
        if let Some(existing) = self.names.get(s) {
            return existing.cheap_clone();
        }
        let js_str = JsString::from(s);
        self.names.insert(s.into(), js_str.cheap_clone());
        js_str
    }

    /// Intern `s` and convert it to a property key. Canonical array indices
    /// become `PropertyKey::Index` and are not stored.
    pub fn key(&mut self, s: &str) -> PropertyKey {
        match PropertyKey::from(s) {
            PropertyKey::String(_) => PropertyKey::String(self.intern(s)),
            other => other,
        }
    }

    pub fn get(&self, s: &str) -> Option<JsString> {
        self.names.get(s).map(CheapClone::cheap_clone)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

const WELL_KNOWN_NAMES: &[&str] = &[
    "length",
    "prototype",
    "constructor",
    "name",
    "callee",
    // Descriptor fields
    "value",
    "writable",
    "enumerable",
    "configurable",
    "get",
    "set",
    // OrdinaryToPrimitive
    "toString",
    "valueOf",
    // Proxy traps
    "getPrototypeOf",
    "setPrototypeOf",
    "isExtensible",
    "preventExtensions",
    "getOwnPropertyDescriptor",
    "defineProperty",
    "has",
    "deleteProperty",
    "ownKeys",
    "apply",
    "construct",
];
