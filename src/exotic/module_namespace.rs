//! Module namespace exotic objects.
//!
//! A namespace exposes a module's exports as live, read-only properties in
//! code-unit order. Bindings are read from the module environment on every
//! access; a binding that has not been initialized yet throws a
//! ReferenceError.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{JsError, JsResult};
use crate::gc::Tracer;
use crate::object::cache::{CacheablePropertyMetadata, PropertyLookupPhase};
use crate::object::ordinary::{
    ordinary_define_own_property, ordinary_delete, ordinary_get, ordinary_get_own_property,
    ordinary_has_property, ordinary_own_property_keys,
};
use crate::object::{InternalMethods, JsObject, ObjectKind, PropertyAttributes, PropertyDescriptor};
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsString, JsValue, PropertyKey};

/// Export bindings of one module. `None` marks a binding in its temporal
/// dead zone.
pub type ModuleEnvironment = Rc<RefCell<FxHashMap<JsString, Option<JsValue>>>>;

pub struct ModuleNamespaceData {
    /// Sorted by code units
    exports: Vec<JsString>,
    environment: ModuleEnvironment,
}

impl ModuleNamespaceData {
    pub fn exports(&self) -> &[JsString] {
        &self.exports
    }

    fn export_name(&self, key: &PropertyKey) -> Option<JsString> {
        let name = match key {
            PropertyKey::String(s) => s.clone(),
            PropertyKey::Index(i) => JsString::from(i.to_string()),
            PropertyKey::Symbol(_) => return None,
        };
        self.exports
            .binary_search_by(|probe| compare_code_units(probe.as_str(), name.as_str()))
            .ok()
            .map(|_| name)
    }

    fn binding_value(&self, name: &JsString) -> JsResult<JsValue> {
        match self.environment.borrow().get(name) {
            Some(Some(value)) => Ok(value.clone()),
            _ => Err(JsError::reference_error(name.as_str())),
        }
    }

    pub(crate) fn trace(&self, tracer: &mut Tracer<'_, JsObject>) {
        let environment = &self.environment;
        tracer.visit_shared(Rc::as_ptr(environment) as usize, |t| {
            for value in environment.borrow().values().flatten() {
                if let JsValue::Object(obj) = value {
                    t.visit(obj);
                }
            }
        });
    }
}

/// Order strings by UTF-16 code units, as export lists are sorted
fn compare_code_units(a: &str, b: &str) -> std::cmp::Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

pub struct ModuleNamespaceMethods;

enum Lookup {
    Symbol,
    Missing,
    Export(JsString),
}

fn lookup(obj: &JsObjectRef, key: &PropertyKey) -> Lookup {
    if key.is_symbol() {
        return Lookup::Symbol;
    }
    match &obj.borrow().kind {
        ObjectKind::ModuleNamespace(data) => match data.export_name(key) {
            Some(name) => Lookup::Export(name),
            None => Lookup::Missing,
        },
        _ => Lookup::Missing,
    }
}

fn read_export(obj: &JsObjectRef, name: &JsString) -> JsResult<JsValue> {
    match &obj.borrow().kind {
        ObjectKind::ModuleNamespace(data) => data.binding_value(name),
        _ => Ok(JsValue::Undefined),
    }
}

impl InternalMethods for ModuleNamespaceMethods {
    fn internal_set_prototype_of(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        proto: Option<JsObjectRef>,
    ) -> JsResult<bool> {
        obj.set_immutable_prototype(realm, proto)
    }

    fn internal_is_extensible(&self, _realm: &mut Realm, _obj: &JsObjectRef) -> JsResult<bool> {
        Ok(false)
    }

    fn internal_prevent_extensions(&self, _realm: &mut Realm, _obj: &JsObjectRef) -> JsResult<bool> {
        Ok(true)
    }

    fn internal_get_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        match lookup(obj, key) {
            Lookup::Symbol => ordinary_get_own_property(realm, obj, key),
            Lookup::Missing => Ok(None),
            Lookup::Export(name) => {
                let value = read_export(obj, &name)?;
                Ok(Some(PropertyDescriptor::data(
                    value,
                    PropertyAttributes::new(true, true, false),
                )))
            }
        }
    }

    fn internal_define_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        precomputed: Option<Option<PropertyDescriptor>>,
    ) -> JsResult<bool> {
        if key.is_symbol() {
            return ordinary_define_own_property(realm, obj, key, desc, precomputed);
        }
        let Some(current) = self.internal_get_own_property(realm, obj, key)? else {
            return Ok(false);
        };
        if desc.configurable == Some(true)
            || desc.enumerable == Some(false)
            || desc.is_accessor_descriptor()
            || desc.writable == Some(false)
        {
            return Ok(false);
        }
        match &desc.value {
            Some(value) => Ok(value.same_value(&current.value.unwrap_or_default())),
            None => Ok(true),
        }
    }

    fn internal_has_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        match lookup(obj, key) {
            Lookup::Symbol => ordinary_has_property(realm, obj, key),
            Lookup::Missing => Ok(false),
            Lookup::Export(_) => Ok(true),
        }
    }

    fn internal_get(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        receiver: &JsValue,
        metadata: Option<&mut CacheablePropertyMetadata>,
        phase: PropertyLookupPhase,
    ) -> JsResult<JsValue> {
        match lookup(obj, key) {
            Lookup::Symbol => ordinary_get(realm, obj, key, receiver, metadata, phase),
            Lookup::Missing => {
                CacheablePropertyMetadata::clear(metadata);
                Ok(JsValue::Undefined)
            }
            Lookup::Export(name) => {
                CacheablePropertyMetadata::clear(metadata);
                read_export(obj, &name)
            }
        }
    }

    fn internal_set(
        &self,
        _realm: &mut Realm,
        _obj: &JsObjectRef,
        _key: &PropertyKey,
        _value: JsValue,
        _receiver: &JsValue,
        metadata: Option<&mut CacheablePropertyMetadata>,
        _phase: PropertyLookupPhase,
    ) -> JsResult<bool> {
        CacheablePropertyMetadata::clear(metadata);
        Ok(false)
    }

    fn internal_delete(&self, realm: &mut Realm, obj: &JsObjectRef, key: &PropertyKey) -> JsResult<bool> {
        match lookup(obj, key) {
            Lookup::Symbol => ordinary_delete(realm, obj, key),
            Lookup::Missing => Ok(true),
            Lookup::Export(_) => Ok(false),
        }
    }

    fn internal_own_property_keys(
        &self,
        _realm: &mut Realm,
        obj: &JsObjectRef,
    ) -> JsResult<Vec<PropertyKey>> {
        let mut keys: Vec<PropertyKey> = match &obj.borrow().kind {
            ObjectKind::ModuleNamespace(data) => {
                data.exports.iter().cloned().map(PropertyKey::from).collect()
            }
            _ => Vec::new(),
        };
        keys.extend(
            ordinary_own_property_keys(obj)
                .into_iter()
                .filter(PropertyKey::is_symbol),
        );
        Ok(keys)
    }

    fn has_ordinary_get_own_property(&self) -> bool {
        false
    }
}

impl Realm {
    /// ModuleNamespaceCreate. `exports` may be in any order and contain
    /// duplicates.
    pub fn create_module_namespace(
        &mut self,
        exports: Vec<JsString>,
        environment: ModuleEnvironment,
    ) -> JsResult<JsObjectRef> {
        let mut exports = exports;
        exports.sort_by(|a, b| compare_code_units(a.as_str(), b.as_str()));
        exports.dedup();
        let kind = ObjectKind::ModuleNamespace(ModuleNamespaceData {
            exports,
            environment,
        });
        let namespace = self.create_object_of_kind(None, kind);
        let tag = PropertyKey::Symbol(self.well_known_symbols().to_string_tag.clone());
        namespace.define_direct_property(self, &tag, JsValue::from("Module"), PropertyAttributes::NONE)?;
        namespace.borrow_mut().extensible = false;
        Ok(namespace)
    }
}
