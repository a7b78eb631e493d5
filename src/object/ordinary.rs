//! Ordinary internal-method algorithms.
//!
//! These are the defaults of [`InternalMethods`]. Exotic kinds call back into
//! them for the keys they do not treat specially.

use std::rc::Rc;

use super::cache::{CacheablePropertyMetadata, PropertyLookupPhase};
use super::property_attributes::PropertyAttributes;
use super::property_descriptor::PropertyDescriptor;
use super::{InternalMethods, PropertyValue};
use crate::error::JsResult;
use crate::gc::Gc;
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsValue, PropertyKey};

/// Internal methods of ordinary objects, bound functions and native functions
pub struct OrdinaryMethods;

impl InternalMethods for OrdinaryMethods {}

/// OrdinaryGetPrototypeOf
pub fn ordinary_get_prototype_of(obj: &JsObjectRef) -> Option<JsObjectRef> {
    obj.prototype()
}

/// OrdinarySetPrototypeOf
pub fn ordinary_set_prototype_of(obj: &JsObjectRef, proto: Option<JsObjectRef>) -> bool {
    let current = obj.prototype();
    if same_object(current.as_ref(), proto.as_ref()) {
        return true;
    }
    if !obj.borrow().extensible {
        return false;
    }

    // Refuse cycles. Objects whose [[GetPrototypeOf]] is not ordinary end
    // the walk.
    let mut p = proto.clone();
    while let Some(candidate) = p {
        if Gc::ptr_eq(&candidate, obj) {
            return false;
        }
        if !candidate.methods().has_ordinary_get_prototype_of() {
            break;
        }
        p = candidate.prototype();
    }

    if let Some(proto) = &proto {
        proto.convert_to_prototype_if_needed();
    }
    let shape = obj.borrow().shape.with_prototype(proto);
    obj.borrow_mut().set_shape(shape);
    true
}

pub(crate) fn same_object(a: Option<&JsObjectRef>, b: Option<&JsObjectRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Gc::ptr_eq(a, b),
        _ => false,
    }
}

/// OrdinaryGetOwnProperty. Deferred built-ins are materialized here.
pub fn ordinary_get_own_property(
    realm: &mut Realm,
    obj: &JsObjectRef,
    key: &PropertyKey,
) -> JsResult<Option<PropertyDescriptor>> {
    let stored = obj.borrow().storage_get(key);
    let Some(stored) = stored else {
        return Ok(None);
    };
    if let PropertyValue::Intrinsic(init) = stored.value {
        let value = init(realm);
        obj.borrow_mut().finish_intrinsic(key, value.clone());
        return Ok(Some(PropertyDescriptor::data(value, stored.attributes)));
    }
    Ok(Some(PropertyDescriptor::from_stored(&stored)))
}

/// OrdinaryDefineOwnProperty. `precomputed` is the current descriptor when
/// the caller already fetched it.
pub fn ordinary_define_own_property(
    realm: &mut Realm,
    obj: &JsObjectRef,
    key: &PropertyKey,
    desc: &PropertyDescriptor,
    precomputed: Option<Option<PropertyDescriptor>>,
) -> JsResult<bool> {
    let current = match precomputed {
        Some(current) => current,
        None => obj.internal_get_own_property(realm, key)?,
    };
    let extensible = obj.internal_is_extensible(realm)?;
    validate_and_apply_property_descriptor(realm, Some((obj, key)), extensible, desc, current.as_ref())
}

/// IsCompatiblePropertyDescriptor
pub fn is_compatible_property_descriptor(
    realm: &mut Realm,
    extensible: bool,
    desc: &PropertyDescriptor,
    current: Option<&PropertyDescriptor>,
) -> JsResult<bool> {
    validate_and_apply_property_descriptor(realm, None, extensible, desc, current)
}

/// ValidateAndApplyPropertyDescriptor.
///
/// Every check runs before the first mutation, so a `false` result leaves
/// the object untouched. Without a target only the validation runs.
pub fn validate_and_apply_property_descriptor(
    realm: &mut Realm,
    target: Option<(&JsObjectRef, &PropertyKey)>,
    extensible: bool,
    desc: &PropertyDescriptor,
    current: Option<&PropertyDescriptor>,
) -> JsResult<bool> {
    let Some(current) = current else {
        if !extensible {
            return Ok(false);
        }
        if let Some((obj, key)) = target {
            let mut new_desc = desc.clone();
            new_desc.complete();
            store(realm, obj, key, &new_desc)?;
        }
        return Ok(true);
    };

    if desc.is_empty() {
        return Ok(true);
    }

    if current.configurable == Some(false) {
        if desc.configurable == Some(true) {
            return Ok(false);
        }
        if desc.enumerable.is_some() && desc.enumerable != current.enumerable {
            return Ok(false);
        }
        if !desc.is_generic_descriptor()
            && desc.is_accessor_descriptor() != current.is_accessor_descriptor()
        {
            return Ok(false);
        }
        if current.is_accessor_descriptor() {
            if desc.get.is_some() && desc.get != current.get {
                return Ok(false);
            }
            if desc.set.is_some() && desc.set != current.set {
                return Ok(false);
            }
        } else if current.writable == Some(false) {
            if desc.writable == Some(true) {
                return Ok(false);
            }
            if let Some(value) = &desc.value {
                let current_value = current.value.clone().unwrap_or_default();
                if !value.same_value(&current_value) {
                    return Ok(false);
                }
            }
        }
    }

    let Some((obj, key)) = target else {
        return Ok(true);
    };

    let merged = if current.is_data_descriptor() && desc.is_accessor_descriptor() {
        PropertyDescriptor {
            get: Some(desc.get.clone().flatten()),
            set: Some(desc.set.clone().flatten()),
            enumerable: desc.enumerable.or(current.enumerable),
            configurable: desc.configurable.or(current.configurable),
            ..PropertyDescriptor::default()
        }
    } else if current.is_accessor_descriptor() && desc.is_data_descriptor() {
        PropertyDescriptor {
            value: Some(desc.value.clone().unwrap_or_default()),
            writable: Some(desc.writable.unwrap_or(false)),
            enumerable: desc.enumerable.or(current.enumerable),
            configurable: desc.configurable.or(current.configurable),
            ..PropertyDescriptor::default()
        }
    } else {
        let mut merged = current.clone();
        if desc.value.is_some() {
            merged.value = desc.value.clone();
        }
        if desc.get.is_some() {
            merged.get = desc.get.clone();
        }
        if desc.set.is_some() {
            merged.set = desc.set.clone();
        }
        merged.writable = desc.writable.or(merged.writable);
        merged.enumerable = desc.enumerable.or(merged.enumerable);
        merged.configurable = desc.configurable.or(merged.configurable);
        merged
    };

    // Identical redefinition: keep the shape (and any shared layout) as is
    if merged != *current {
        store(realm, obj, key, &merged)?;
    }
    Ok(true)
}

fn store(
    realm: &mut Realm,
    obj: &JsObjectRef,
    key: &PropertyKey,
    desc: &PropertyDescriptor,
) -> JsResult<()> {
    let max_shared = realm.config().max_shared_shape_properties;
    obj.borrow_mut().storage_set(key, desc.to_stored(), max_shared)
}

/// OrdinaryHasProperty
pub fn ordinary_has_property(realm: &mut Realm, obj: &JsObjectRef, key: &PropertyKey) -> JsResult<bool> {
    if obj.methods().has_ordinary_get_own_property() {
        if obj.borrow().storage_has(key) {
            return Ok(true);
        }
    } else if obj.internal_get_own_property(realm, key)?.is_some() {
        return Ok(true);
    }
    match obj.internal_get_prototype_of(realm)? {
        Some(parent) => realm.nested(|realm| parent.internal_has_property(realm, key)),
        None => Ok(false),
    }
}

/// OrdinaryGet. `receiver` is the `this` of any getter found on the way.
pub fn ordinary_get(
    realm: &mut Realm,
    obj: &JsObjectRef,
    key: &PropertyKey,
    receiver: &JsValue,
    mut metadata: Option<&mut CacheablePropertyMetadata>,
    phase: PropertyLookupPhase,
) -> JsResult<JsValue> {
    // Slots are only cacheable for lookups made through the object itself
    if phase == PropertyLookupPhase::OwnProperty
        && !receiver.as_object().is_some_and(|r| Gc::ptr_eq(r, obj))
    {
        CacheablePropertyMetadata::clear(metadata.take());
    }
    if obj.methods().has_ordinary_get_own_property() {
        let found = {
            let o = obj.borrow();
            match key {
                PropertyKey::Index(index) => o.indexed.get(*index).map(|e| (None, e.value)),
                _ => o.shape.lookup(key).and_then(|meta| {
                    o.storage
                        .get(meta.offset as usize)
                        .map(|v| (Some((meta.offset, Rc::clone(&o.shape))), v.clone()))
                }),
            }
        };
        if let Some((slot, value)) = found {
            return match value {
                PropertyValue::Data(v) => {
                    match slot {
                        Some((offset, shape)) => {
                            CacheablePropertyMetadata::record(metadata, phase, offset, &shape, obj)
                        }
                        None => CacheablePropertyMetadata::clear(metadata),
                    }
                    Ok(v)
                }
                PropertyValue::Accessor(accessor) => {
                    CacheablePropertyMetadata::clear(metadata);
                    call_getter(realm, accessor.getter, receiver)
                }
                PropertyValue::Intrinsic(init) => {
                    CacheablePropertyMetadata::clear(metadata);
                    let v = init(realm);
                    obj.borrow_mut().finish_intrinsic(key, v.clone());
                    Ok(v)
                }
            };
        }
    } else if let Some(desc) = obj.internal_get_own_property(realm, key)? {
        CacheablePropertyMetadata::clear(metadata);
        if desc.is_accessor_descriptor() {
            return call_getter(realm, desc.get.flatten(), receiver);
        }
        return Ok(desc.value.unwrap_or_default());
    }

    match obj.internal_get_prototype_of(realm)? {
        Some(parent) => realm.nested(|realm| {
            parent.internal_get(
                realm,
                key,
                receiver,
                metadata.as_deref_mut(),
                PropertyLookupPhase::PrototypeChain,
            )
        }),
        None => {
            CacheablePropertyMetadata::clear(metadata);
            Ok(JsValue::Undefined)
        }
    }
}

pub(crate) fn call_getter(
    realm: &mut Realm,
    getter: Option<JsObjectRef>,
    receiver: &JsValue,
) -> JsResult<JsValue> {
    match getter {
        Some(getter) => realm.call(&JsValue::Object(getter), receiver.clone(), &[]),
        None => Ok(JsValue::Undefined),
    }
}

/// OrdinarySet
#[allow(clippy::too_many_arguments)]
pub fn ordinary_set(
    realm: &mut Realm,
    obj: &JsObjectRef,
    key: &PropertyKey,
    value: JsValue,
    receiver: &JsValue,
    metadata: Option<&mut CacheablePropertyMetadata>,
    phase: PropertyLookupPhase,
) -> JsResult<bool> {
    // Writable own data slot, assigned through the object itself
    let receiver_is_obj = receiver.as_object().is_some_and(|r| Gc::ptr_eq(r, obj));
    if receiver_is_obj
        && !matches!(key, PropertyKey::Index(_))
        && obj.methods().has_ordinary_get_own_property()
    {
        let hit = {
            let o = obj.borrow();
            o.shape
                .lookup(key)
                .filter(|meta| meta.attributes.is_writable())
                .filter(|meta| {
                    matches!(
                        o.storage.get(meta.offset as usize),
                        Some(PropertyValue::Data(_))
                    )
                })
                .map(|meta| (meta.offset, Rc::clone(&o.shape)))
        };
        if let Some((offset, shape)) = hit {
            obj.borrow_mut().put_direct(offset, value)?;
            CacheablePropertyMetadata::record(metadata, phase, offset, &shape, obj);
            return Ok(true);
        }
    }

    CacheablePropertyMetadata::clear(metadata);
    let own_desc = obj.internal_get_own_property(realm, key)?;
    ordinary_set_with_own_descriptor(realm, obj, key, value, receiver, own_desc)
}

/// OrdinarySetWithOwnDescriptor
pub fn ordinary_set_with_own_descriptor(
    realm: &mut Realm,
    obj: &JsObjectRef,
    key: &PropertyKey,
    value: JsValue,
    receiver: &JsValue,
    own_desc: Option<PropertyDescriptor>,
) -> JsResult<bool> {
    let own_desc = match own_desc {
        Some(desc) => desc,
        None => match obj.internal_get_prototype_of(realm)? {
            Some(parent) => {
                return realm.nested(|realm| {
                    parent.internal_set(
                        realm,
                        key,
                        value,
                        receiver,
                        None,
                        PropertyLookupPhase::PrototypeChain,
                    )
                });
            }
            None => PropertyDescriptor::data(JsValue::Undefined, PropertyAttributes::DEFAULT),
        },
    };

    if own_desc.is_data_descriptor() {
        if own_desc.writable == Some(false) {
            return Ok(false);
        }
        let JsValue::Object(receiver_obj) = receiver else {
            return Ok(false);
        };
        return match receiver_obj.internal_get_own_property(realm, key)? {
            Some(existing) => {
                if existing.is_accessor_descriptor() || existing.writable == Some(false) {
                    return Ok(false);
                }
                receiver_obj.internal_define_own_property(
                    realm,
                    key,
                    &PropertyDescriptor::value_only(value),
                    Some(Some(existing)),
                )
            }
            None => receiver_obj.create_data_property(realm, key, value),
        };
    }

    match own_desc.set.flatten() {
        Some(setter) => {
            realm.call(&JsValue::Object(setter), receiver.clone(), &[value])?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// OrdinaryDelete
pub fn ordinary_delete(realm: &mut Realm, obj: &JsObjectRef, key: &PropertyKey) -> JsResult<bool> {
    let Some(desc) = obj.internal_get_own_property(realm, key)? else {
        return Ok(true);
    };
    if desc.configurable == Some(true) {
        obj.borrow_mut().storage_delete(key);
        return Ok(true);
    }
    Ok(false)
}

/// OrdinaryOwnPropertyKeys: indices ascending, then strings in insertion
/// order, then symbols in insertion order.
pub fn ordinary_own_property_keys(obj: &JsObjectRef) -> Vec<PropertyKey> {
    let o = obj.borrow();
    let named = o.shape.keys();
    let mut keys: Vec<PropertyKey> = o
        .indexed
        .indices()
        .into_iter()
        .map(PropertyKey::Index)
        .collect();
    keys.reserve(named.len());
    keys.extend(named.iter().filter(|k| !k.is_symbol()).cloned());
    keys.extend(named.into_iter().filter(PropertyKey::is_symbol));
    keys
}
