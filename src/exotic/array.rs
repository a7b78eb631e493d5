//! Array exotic objects.
//!
//! Elements live in the object's indexed store and `length` is the store's
//! array-like size. `length` never occupies a shape slot; it is answered by
//! the overrides below.

use crate::error::{JsError, JsResult};
use crate::object::cache::{CacheablePropertyMetadata, PropertyLookupPhase};
use crate::object::operations::to_number;
use crate::object::ordinary::{
    is_compatible_property_descriptor, ordinary_define_own_property, ordinary_delete, ordinary_get,
    ordinary_has_property, ordinary_own_property_keys,
};
use crate::object::{InternalMethods, ObjectKind, PropertyAttributes, PropertyDescriptor};
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsValue, PropertyKey};

#[derive(Debug, Clone)]
pub struct ArrayData {
    pub length_writable: bool,
}

impl ArrayData {
    pub fn new() -> Self {
        Self {
            length_writable: true,
        }
    }
}

impl Default for ArrayData {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ArrayMethods;

fn is_length(key: &PropertyKey) -> bool {
    key.eq_str("length")
}

fn length_writable(obj: &JsObjectRef) -> bool {
    match &obj.borrow().kind {
        ObjectKind::Array(data) => data.length_writable,
        _ => true,
    }
}

fn set_length_writable(obj: &JsObjectRef, writable: bool) {
    if let ObjectKind::Array(data) = &mut obj.borrow_mut().kind {
        data.length_writable = writable;
    }
}

fn length_descriptor(obj: &JsObjectRef) -> PropertyDescriptor {
    let length = obj.borrow().indexed.array_like_size();
    PropertyDescriptor::data(
        JsValue::Number(length as f64),
        PropertyAttributes::new(length_writable(obj), false, false),
    )
}

impl InternalMethods for ArrayMethods {
    fn internal_get_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        if is_length(key) {
            return Ok(Some(length_descriptor(obj)));
        }
        crate::object::ordinary::ordinary_get_own_property(realm, obj, key)
    }

    fn internal_define_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        precomputed: Option<Option<PropertyDescriptor>>,
    ) -> JsResult<bool> {
        if is_length(key) {
            return array_set_length(realm, obj, desc);
        }
        if let PropertyKey::Index(index) = key {
            let length = obj.borrow().indexed.array_like_size();
            if *index >= length && !length_writable(obj) {
                return Ok(false);
            }
        }
        ordinary_define_own_property(realm, obj, key, desc, precomputed)
    }

    fn internal_has_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        if is_length(key) {
            return Ok(true);
        }
        ordinary_has_property(realm, obj, key)
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
        if is_length(key) {
            CacheablePropertyMetadata::clear(metadata);
            return Ok(JsValue::Number(obj.borrow().indexed.array_like_size() as f64));
        }
        ordinary_get(realm, obj, key, receiver, metadata, phase)
    }

    fn internal_delete(&self, realm: &mut Realm, obj: &JsObjectRef, key: &PropertyKey) -> JsResult<bool> {
        if is_length(key) {
            return Ok(false);
        }
        ordinary_delete(realm, obj, key)
    }

    fn internal_own_property_keys(
        &self,
        _realm: &mut Realm,
        obj: &JsObjectRef,
    ) -> JsResult<Vec<PropertyKey>> {
        let mut keys = ordinary_own_property_keys(obj);
        // "length" was the first string key the array got
        let first_named = keys
            .iter()
            .position(|k| !matches!(k, PropertyKey::Index(_)))
            .unwrap_or(keys.len());
        keys.insert(first_named, PropertyKey::from("length"));
        Ok(keys)
    }

    fn has_ordinary_get_own_property(&self) -> bool {
        false
    }
}

/// ArraySetLength
fn array_set_length(realm: &mut Realm, obj: &JsObjectRef, desc: &PropertyDescriptor) -> JsResult<bool> {
    let current = length_descriptor(obj);

    let Some(value) = &desc.value else {
        if !is_compatible_property_descriptor(realm, false, desc, Some(&current))? {
            return Ok(false);
        }
        if desc.writable == Some(false) {
            set_length_writable(obj, false);
        }
        return Ok(true);
    };

    // ToNumber may run user code, so it happens before anything is read
    // for the update.
    let number_len = to_number(realm, value)?;
    let new_len = to_uint32(number_len);
    if new_len as f64 != number_len {
        return Err(JsError::range_error("Invalid array length"));
    }

    let mut new_len_desc = desc.clone();
    new_len_desc.value = Some(JsValue::Number(new_len as f64));
    let current = length_descriptor(obj);
    if !is_compatible_property_descriptor(realm, false, &new_len_desc, Some(&current))? {
        return Ok(false);
    }

    let old_len = obj.borrow().indexed.array_like_size();
    if new_len >= old_len {
        obj.borrow_mut().indexed.set_array_like_size(new_len);
        if desc.writable == Some(false) {
            set_length_writable(obj, false);
        }
        return Ok(true);
    }

    if !length_writable(obj) {
        return Ok(false);
    }
    let succeeded = obj.borrow_mut().indexed.set_array_like_size(new_len);
    if desc.writable == Some(false) {
        set_length_writable(obj, false);
    }
    Ok(succeeded)
}

/// ToUint32 on an already converted number
pub(crate) fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let int = n.trunc();
    int.rem_euclid(4294967296.0) as u32
}

impl Realm {
    /// ArrayCreate: an empty array with the given `length` and prototype
    /// (Array.prototype when `None`).
    pub fn array_create(&mut self, length: u64, prototype: Option<JsObjectRef>) -> JsResult<JsObjectRef> {
        let length = u32::try_from(length).map_err(|_| JsError::range_error("Invalid array length"))?;
        let prototype = prototype.unwrap_or_else(|| self.array_prototype());
        let array = self.create_object_of_kind(Some(prototype), ObjectKind::Array(ArrayData::new()));
        array.borrow_mut().indexed.set_array_like_size(length);
        Ok(array)
    }
}
