//! Composite object operations built on the internal-method contract.
//!
//! Nothing here looks at storage directly except the `define_direct_*`
//! installers, which bypass validation the way built-in setup needs, and
//! `get_without_side_effects`.

use rustc_hash::FxHashSet;

use super::cache::PropertyLookupPhase;
use super::ordinary::same_object;
use super::property_attributes::PropertyAttributes;
use super::property_descriptor::PropertyDescriptor;
use super::{Accessor, JsObject, NativeFn, ObjectKind, PropertyValue, ValueAndAttributes};
use crate::error::{JsError, JsResult};
use crate::gc::Gc;
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsValue, PropertyKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityLevel {
    Sealed,
    Frozen,
}

/// What `enumerable_own_property_names` produces per property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Key,
    Value,
    KeyAndValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShouldThrowExceptions {
    No,
    Yes,
}

/// Conversion hint for `to_primitive`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    String,
    Number,
}

impl Gc<JsObject> {
    /// Get(O, P)
    pub fn get(&self, realm: &mut Realm, key: &PropertyKey) -> JsResult<JsValue> {
        let receiver = JsValue::Object(self.clone());
        self.internal_get(realm, key, &receiver, None, PropertyLookupPhase::OwnProperty)
    }

    /// Set(O, P, V, Throw). Returns whether the assignment happened.
    pub fn set(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        value: JsValue,
        throw: ShouldThrowExceptions,
    ) -> JsResult<bool> {
        let receiver = JsValue::Object(self.clone());
        let success =
            self.internal_set(realm, key, value, &receiver, None, PropertyLookupPhase::OwnProperty)?;
        if !success && throw == ShouldThrowExceptions::Yes {
            return Err(JsError::type_error(format!(
                "Cannot assign to read only property '{}' of object",
                key
            )));
        }
        Ok(success)
    }

    /// CreateDataProperty
    pub fn create_data_property(&self, realm: &mut Realm, key: &PropertyKey, value: JsValue) -> JsResult<bool> {
        let desc = PropertyDescriptor::data(value, PropertyAttributes::DEFAULT);
        self.internal_define_own_property(realm, key, &desc, None)
    }

    /// CreateMethodProperty: writable, configurable, not enumerable
    pub fn create_method_property(&self, realm: &mut Realm, key: &PropertyKey, value: JsValue) -> JsResult<bool> {
        let desc = PropertyDescriptor::data(value, PropertyAttributes::HIDDEN);
        self.internal_define_own_property(realm, key, &desc, None)
    }

    /// CreateDataPropertyOrThrow
    pub fn create_data_property_or_throw(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        value: JsValue,
    ) -> JsResult<()> {
        if !self.create_data_property(realm, key, value)? {
            return Err(JsError::type_error(format!("Cannot define property {}", key)));
        }
        Ok(())
    }

    /// CreateNonEnumerableDataPropertyOrThrow
    pub fn create_non_enumerable_data_property_or_throw(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        value: JsValue,
    ) -> JsResult<()> {
        let desc = PropertyDescriptor::data(value, PropertyAttributes::HIDDEN);
        self.define_property_or_throw(realm, key, &desc)
    }

    /// DefinePropertyOrThrow
    pub fn define_property_or_throw(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
    ) -> JsResult<()> {
        if !self.internal_define_own_property(realm, key, desc, None)? {
            return Err(JsError::type_error(format!("Cannot redefine property: {}", key)));
        }
        Ok(())
    }

    /// DeletePropertyOrThrow
    pub fn delete_property_or_throw(&self, realm: &mut Realm, key: &PropertyKey) -> JsResult<()> {
        if !self.internal_delete(realm, key)? {
            return Err(JsError::type_error(format!(
                "Cannot delete property '{}' of [object {}]",
                key,
                self.borrow().class_name()
            )));
        }
        Ok(())
    }

    /// HasProperty
    pub fn has_property(&self, realm: &mut Realm, key: &PropertyKey) -> JsResult<bool> {
        self.internal_has_property(realm, key)
    }

    /// HasOwnProperty
    pub fn has_own_property(&self, realm: &mut Realm, key: &PropertyKey) -> JsResult<bool> {
        Ok(self.internal_get_own_property(realm, key)?.is_some())
    }

    pub fn own_property_keys(&self, realm: &mut Realm) -> JsResult<Vec<PropertyKey>> {
        self.internal_own_property_keys(realm)
    }

    /// GetMethod: `None` for undefined or null, TypeError for other
    /// non-callables.
    pub fn get_method(&self, realm: &mut Realm, key: &PropertyKey) -> JsResult<Option<JsValue>> {
        let func = self.get(realm, key)?;
        if func.is_null_or_undefined() {
            return Ok(None);
        }
        if !func.is_callable() {
            return Err(JsError::type_error(format!("{} is not a function", key)));
        }
        Ok(Some(func))
    }

    /// SetIntegrityLevel. A refused redefinition stops the walk and
    /// reports false.
    pub fn set_integrity_level(&self, realm: &mut Realm, level: IntegrityLevel) -> JsResult<bool> {
        if !self.internal_prevent_extensions(realm)? {
            return Ok(false);
        }
        let keys = self.internal_own_property_keys(realm)?;
        for key in keys {
            let desc = match level {
                IntegrityLevel::Sealed => PropertyDescriptor {
                    configurable: Some(false),
                    ..PropertyDescriptor::default()
                },
                IntegrityLevel::Frozen => {
                    let Some(current) = self.internal_get_own_property(realm, &key)? else {
                        continue;
                    };
                    if current.is_accessor_descriptor() {
                        PropertyDescriptor {
                            configurable: Some(false),
                            ..PropertyDescriptor::default()
                        }
                    } else {
                        PropertyDescriptor {
                            configurable: Some(false),
                            writable: Some(false),
                            ..PropertyDescriptor::default()
                        }
                    }
                }
            };
            if !self.internal_define_own_property(realm, &key, &desc, None)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// TestIntegrityLevel
    pub fn test_integrity_level(&self, realm: &mut Realm, level: IntegrityLevel) -> JsResult<bool> {
        if self.internal_is_extensible(realm)? {
            return Ok(false);
        }
        let keys = self.internal_own_property_keys(realm)?;
        for key in keys {
            if let Some(desc) = self.internal_get_own_property(realm, &key)? {
                if desc.configurable == Some(true) {
                    return Ok(false);
                }
                if level == IntegrityLevel::Frozen
                    && desc.is_data_descriptor()
                    && desc.writable == Some(true)
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// EnumerableOwnProperties (symbols are skipped)
    pub fn enumerable_own_property_names(
        &self,
        realm: &mut Realm,
        kind: PropertyKind,
    ) -> JsResult<Vec<JsValue>> {
        let keys = self.internal_own_property_keys(realm)?;
        let mut properties = Vec::with_capacity(keys.len());
        for key in keys {
            if key.is_symbol() {
                continue;
            }
            let Some(desc) = self.internal_get_own_property(realm, &key)? else {
                continue;
            };
            if desc.enumerable != Some(true) {
                continue;
            }
            match kind {
                PropertyKind::Key => properties.push(key.to_value()),
                PropertyKind::Value => properties.push(self.get(realm, &key)?),
                PropertyKind::KeyAndValue => {
                    let value = self.get(realm, &key)?;
                    let entry = realm.create_array(vec![key.to_value(), value]);
                    properties.push(JsValue::Object(entry));
                }
            }
        }
        Ok(properties)
    }

    /// CopyDataProperties: copy `source`'s own enumerable properties onto
    /// this object, skipping `excluded_keys` and any value in
    /// `excluded_values`. Primitive sources contribute nothing.
    pub fn copy_data_properties(
        &self,
        realm: &mut Realm,
        source: &JsValue,
        excluded_keys: &[PropertyKey],
        excluded_values: &[JsValue],
    ) -> JsResult<()> {
        let JsValue::Object(from) = source else {
            return Ok(());
        };
        let keys = from.internal_own_property_keys(realm)?;
        for key in keys {
            if excluded_keys.contains(&key) {
                continue;
            }
            let Some(desc) = from.internal_get_own_property(realm, &key)? else {
                continue;
            };
            if desc.enumerable != Some(true) {
                continue;
            }
            let value = from.get(realm, &key)?;
            if excluded_values.iter().any(|v| v.same_value(&value)) {
                continue;
            }
            self.create_data_property_or_throw(realm, &key, value)?;
        }
        Ok(())
    }

    /// A fresh object with `prototype` holding copies of this object's own
    /// enumerable properties.
    pub fn snapshot_own_properties(
        &self,
        realm: &mut Realm,
        prototype: Option<JsObjectRef>,
        excluded_keys: &[PropertyKey],
        excluded_values: &[JsValue],
    ) -> JsResult<JsObjectRef> {
        let snapshot = realm.create_object(prototype);
        snapshot.copy_data_properties(
            realm,
            &JsValue::Object(self.clone()),
            excluded_keys,
            excluded_values,
        )?;
        Ok(snapshot)
    }

    /// ObjectDefineProperties: read every descriptor first, then define.
    pub fn define_properties(&self, realm: &mut Realm, properties: &JsValue) -> JsResult<()> {
        let props = match properties {
            JsValue::Object(props) => props.clone(),
            JsValue::Undefined | JsValue::Null => {
                return Err(JsError::type_error("Cannot convert undefined or null to object"));
            }
            _ => return Ok(()),
        };
        let keys = props.internal_own_property_keys(realm)?;
        let mut descriptors = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(prop_desc) = props.internal_get_own_property(realm, &key)? else {
                continue;
            };
            if prop_desc.enumerable != Some(true) {
                continue;
            }
            let desc_obj = props.get(realm, &key)?;
            let desc = PropertyDescriptor::from_value(realm, &desc_obj)?;
            descriptors.push((key, desc));
        }
        for (key, desc) in descriptors {
            self.define_property_or_throw(realm, &key, &desc)?;
        }
        Ok(())
    }

    /// EnumerateObjectProperties (`for-in`): string keys of this object and
    /// its prototypes, each name at most once, shadowed names skipped.
    /// An `Err` from the callback (for example a `Break` completion) stops
    /// the walk and is returned.
    pub fn enumerate_object_properties(
        &self,
        realm: &mut Realm,
        mut callback: impl FnMut(&mut Realm, JsValue) -> JsResult<()>,
    ) -> JsResult<()> {
        let mut visited: FxHashSet<PropertyKey> = FxHashSet::default();
        let mut target = Some(self.clone());
        let mut depth = 0;
        while let Some(obj) = target {
            depth += 1;
            if depth > realm.config().max_recursion_depth {
                return Err(JsError::recursion_limit(depth));
            }
            let keys = obj.internal_own_property_keys(realm)?;
            for key in keys {
                if key.is_symbol() || visited.contains(&key) {
                    continue;
                }
                let Some(desc) = obj.internal_get_own_property(realm, &key)? else {
                    continue;
                };
                visited.insert(key.clone());
                if desc.enumerable != Some(true) {
                    continue;
                }
                callback(realm, key.to_value())?;
            }
            target = obj.internal_get_prototype_of(realm)?;
        }
        Ok(())
    }

    /// OrdinaryToPrimitive
    pub fn ordinary_to_primitive(&self, realm: &mut Realm, hint: PreferredType) -> JsResult<JsValue> {
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Number | PreferredType::Default => ["valueOf", "toString"],
        };
        for name in order {
            let key = realm.key(name);
            let method = self.get(realm, &key)?;
            if method.is_callable() {
                let result = realm.call(&method, JsValue::Object(self.clone()), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(JsError::type_error("Cannot convert object to primitive value"))
    }

    /// Look a data property up along the prototype chain without running
    /// any code. Accessors, deferred built-ins and exotic objects give `None`.
    pub fn get_without_side_effects(&self, key: &PropertyKey) -> Option<JsValue> {
        let mut current = Some(self.clone());
        while let Some(obj) = current {
            let o = obj.try_borrow()?;
            if let ObjectKind::Array(_) = &o.kind
                && key.eq_str("length")
            {
                return Some(JsValue::Number(o.indexed.array_like_size() as f64));
            }
            let plain = matches!(
                o.kind,
                ObjectKind::Ordinary
                    | ObjectKind::Array(_)
                    | ObjectKind::BoundFunction(_)
                    | ObjectKind::NativeFunction(_)
                    | ObjectKind::ImmutablePrototype
            );
            if !plain {
                return None;
            }
            if let Some(entry) = o.storage_get(key) {
                return match entry.value {
                    PropertyValue::Data(v) => Some(v),
                    PropertyValue::Accessor(_) | PropertyValue::Intrinsic(_) => None,
                };
            }
            current = o.prototype();
        }
        None
    }

    /// SetImmutablePrototype
    pub fn set_immutable_prototype(
        &self,
        realm: &mut Realm,
        proto: Option<JsObjectRef>,
    ) -> JsResult<bool> {
        let current = self.internal_get_prototype_of(realm)?;
        Ok(same_object(current.as_ref(), proto.as_ref()))
    }

    /// Give an object that is about to serve as a prototype a shape of its
    /// own, outside the transition trees of ordinary instances.
    pub fn convert_to_prototype_if_needed(&self) {
        let forked = {
            let o = self.borrow();
            if o.shape.is_prototype_shape() {
                return;
            }
            o.shape.fork_for_prototype()
        };
        self.borrow_mut().set_shape(forked);
    }

    /// Install a data property without validation (built-in setup).
    pub fn define_direct_property(
        &self,
        realm: &Realm,
        key: &PropertyKey,
        value: JsValue,
        attributes: PropertyAttributes,
    ) -> JsResult<()> {
        let max_shared = realm.config().max_shared_shape_properties;
        self.borrow_mut()
            .storage_set(key, ValueAndAttributes::data(value, attributes), max_shared)
    }

    /// Install an accessor property without validation.
    pub fn define_direct_accessor(
        &self,
        realm: &Realm,
        key: &PropertyKey,
        getter: Option<JsObjectRef>,
        setter: Option<JsObjectRef>,
        attributes: PropertyAttributes,
    ) -> JsResult<()> {
        let max_shared = realm.config().max_shared_shape_properties;
        let entry = ValueAndAttributes {
            value: PropertyValue::Accessor(Accessor { getter, setter }),
            attributes,
        };
        self.borrow_mut().storage_set(key, entry, max_shared)
    }

    /// Install a property whose value is computed on first access.
    pub fn define_intrinsic_accessor(
        &self,
        realm: &Realm,
        key: &PropertyKey,
        attributes: PropertyAttributes,
        init: super::IntrinsicAccessor,
    ) -> JsResult<()> {
        let max_shared = realm.config().max_shared_shape_properties;
        let entry = ValueAndAttributes {
            value: PropertyValue::Intrinsic(init),
            attributes,
        };
        self.borrow_mut().storage_set(key, entry, max_shared)
    }

    /// Create a native function named after `key` and install it.
    pub fn define_native_function(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        length: u32,
        func: impl Fn(&mut Realm, JsValue, &[JsValue]) -> JsResult<JsValue> + 'static,
        attributes: PropertyAttributes,
    ) -> JsResult<JsObjectRef> {
        let name = function_name(key, None);
        let function = realm.create_native_function(&name, length, func)?;
        self.define_direct_property(realm, key, JsValue::Object(function.clone()), attributes)?;
        Ok(function)
    }

    /// Create native getter/setter functions and install them as an accessor.
    pub fn define_native_accessor(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        getter: Option<NativeFn>,
        setter: Option<NativeFn>,
        attributes: PropertyAttributes,
    ) -> JsResult<()> {
        let getter = match getter {
            Some(func) => {
                let name = function_name(key, Some("get"));
                Some(realm.create_native_function(&name, 0, move |r, this, args| func(r, this, args))?)
            }
            None => None,
        };
        let setter = match setter {
            Some(func) => {
                let name = function_name(key, Some("set"));
                Some(realm.create_native_function(&name, 1, move |r, this, args| func(r, this, args))?)
            }
            None => None,
        };
        self.define_direct_accessor(realm, key, getter, setter, attributes)
    }

    /// Replace all indexed elements with a packed run of `values`.
    pub fn set_indexed_property_elements(&self, values: Vec<JsValue>) {
        self.borrow_mut().indexed.set_elements(values);
    }
}

/// SetFunctionName: symbols become `[description]`, with an optional prefix
fn function_name(key: &PropertyKey, prefix: Option<&str>) -> String {
    let base = match key {
        PropertyKey::Symbol(sym) => match &sym.description {
            Some(desc) => format!("[{}]", desc),
            None => String::new(),
        },
        other => other.to_string(),
    };
    match prefix {
        Some(prefix) => format!("{} {}", prefix, base),
        None => base,
    }
}

/// ToPrimitive
pub fn to_primitive(realm: &mut Realm, value: &JsValue, hint: PreferredType) -> JsResult<JsValue> {
    let JsValue::Object(obj) = value else {
        return Ok(value.clone());
    };
    let to_prim_key = PropertyKey::Symbol(realm.well_known_symbols().to_primitive.clone());
    if let Some(exotic) = obj.get_method(realm, &to_prim_key)? {
        let hint_name = match hint {
            PreferredType::Default => "default",
            PreferredType::String => "string",
            PreferredType::Number => "number",
        };
        let result = realm.call(&exotic, value.clone(), &[JsValue::from(hint_name)])?;
        if result.is_object() {
            return Err(JsError::type_error("Cannot convert object to primitive value"));
        }
        return Ok(result);
    }
    let hint = match hint {
        PreferredType::Default => PreferredType::Number,
        other => other,
    };
    obj.ordinary_to_primitive(realm, hint)
}

/// ToPropertyKey
pub fn to_property_key(realm: &mut Realm, value: &JsValue) -> JsResult<PropertyKey> {
    let primitive = to_primitive(realm, value, PreferredType::String)?;
    Ok(PropertyKey::from_value(&primitive))
}

/// ToNumber
pub fn to_number(realm: &mut Realm, value: &JsValue) -> JsResult<f64> {
    match value {
        JsValue::Symbol(_) => Err(JsError::type_error("Cannot convert a Symbol value to a number")),
        JsValue::Object(_) => {
            let primitive = to_primitive(realm, value, PreferredType::Number)?;
            to_number(realm, &primitive)
        }
        other => Ok(other.to_number()),
    }
}
