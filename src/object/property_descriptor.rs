//! Property descriptors: the currency of every define and query.

use super::property_attributes::PropertyAttributes;
use super::{Accessor, PropertyValue, ValueAndAttributes};
use crate::error::{JsError, JsResult};
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsValue};

/// A possibly partial property descriptor.
///
/// Every field is independently present or absent. For `get` and `set` the
/// outer `Option` is presence, the inner one is the function or `undefined`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub get: Option<Option<JsObjectRef>>,
    pub set: Option<Option<JsObjectRef>>,
    pub writable: Option<bool>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// A complete data descriptor
    pub fn data(value: JsValue, attributes: PropertyAttributes) -> Self {
        Self {
            value: Some(value),
            writable: Some(attributes.is_writable()),
            enumerable: Some(attributes.is_enumerable()),
            configurable: Some(attributes.is_configurable()),
            ..Self::default()
        }
    }

    /// A complete accessor descriptor (the writable flag is ignored)
    pub fn accessor(
        getter: Option<JsObjectRef>,
        setter: Option<JsObjectRef>,
        attributes: PropertyAttributes,
    ) -> Self {
        Self {
            get: Some(getter),
            set: Some(setter),
            enumerable: Some(attributes.is_enumerable()),
            configurable: Some(attributes.is_configurable()),
            ..Self::default()
        }
    }

    /// Only a value: what [[Set]] redefines an existing property with
    pub fn value_only(value: JsValue) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// Descriptor for a stored property. Deferred built-ins must have been
    /// materialized by the caller.
    pub fn from_stored(stored: &ValueAndAttributes) -> Self {
        match &stored.value {
            PropertyValue::Data(v) => Self::data(v.clone(), stored.attributes),
            PropertyValue::Accessor(a) => {
                Self::accessor(a.getter.clone(), a.setter.clone(), stored.attributes)
            }
            PropertyValue::Intrinsic(_) => Self::data(JsValue::Undefined, stored.attributes),
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    /// True when no field is present
    pub fn is_empty(&self) -> bool {
        self.is_generic_descriptor() && self.enumerable.is_none() && self.configurable.is_none()
    }

    /// Mixing data and accessor fields is not a valid descriptor.
    pub fn validate(&self) -> JsResult<()> {
        if self.is_data_descriptor() && self.is_accessor_descriptor() {
            return Err(JsError::type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(())
    }

    /// CompletePropertyDescriptor: fill absent fields with their defaults.
    pub fn complete(&mut self) {
        if self.is_generic_descriptor() || self.is_data_descriptor() {
            self.value.get_or_insert(JsValue::Undefined);
            self.writable.get_or_insert(false);
        } else {
            self.get.get_or_insert(None);
            self.set.get_or_insert(None);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
    }

    /// Attributes from the present flags; absent flags count as false.
    pub fn attributes(&self) -> PropertyAttributes {
        PropertyAttributes::new(
            self.writable.unwrap_or(false),
            self.enumerable.unwrap_or(false),
            self.configurable.unwrap_or(false),
        )
    }

    /// What a storage slot should hold for this (complete) descriptor
    pub(crate) fn to_stored(&self) -> ValueAndAttributes {
        let value = if self.is_accessor_descriptor() {
            PropertyValue::Accessor(Accessor {
                getter: self.get.clone().flatten(),
                setter: self.set.clone().flatten(),
            })
        } else {
            PropertyValue::Data(self.value.clone().unwrap_or_default())
        };
        ValueAndAttributes {
            value,
            attributes: self.attributes(),
        }
    }

    /// FromPropertyDescriptor: a plain object with one property per present field.
    pub fn to_object(&self, realm: &mut Realm) -> JsResult<JsObjectRef> {
        let proto = realm.object_prototype();
        let obj = realm.create_object(Some(proto));
        if let Some(value) = &self.value {
            let key = realm.key("value");
            obj.create_data_property_or_throw(realm, &key, value.clone())?;
        }
        if let Some(writable) = self.writable {
            let key = realm.key("writable");
            obj.create_data_property_or_throw(realm, &key, JsValue::Boolean(writable))?;
        }
        if let Some(getter) = &self.get {
            let key = realm.key("get");
            obj.create_data_property_or_throw(realm, &key, function_or_undefined(getter))?;
        }
        if let Some(setter) = &self.set {
            let key = realm.key("set");
            obj.create_data_property_or_throw(realm, &key, function_or_undefined(setter))?;
        }
        if let Some(enumerable) = self.enumerable {
            let key = realm.key("enumerable");
            obj.create_data_property_or_throw(realm, &key, JsValue::Boolean(enumerable))?;
        }
        if let Some(configurable) = self.configurable {
            let key = realm.key("configurable");
            obj.create_data_property_or_throw(realm, &key, JsValue::Boolean(configurable))?;
        }
        Ok(obj)
    }

    /// ToPropertyDescriptor. Runs getters and proxy traps on `value`.
    pub fn from_value(realm: &mut Realm, value: &JsValue) -> JsResult<Self> {
        let JsValue::Object(obj) = value else {
            return Err(JsError::type_error(format!(
                "Property description must be an object: {}",
                value.to_js_string()
            )));
        };

        let mut desc = PropertyDescriptor::default();

        let key = realm.key("enumerable");
        if obj.has_property(realm, &key)? {
            desc.enumerable = Some(obj.get(realm, &key)?.to_boolean());
        }
        let key = realm.key("configurable");
        if obj.has_property(realm, &key)? {
            desc.configurable = Some(obj.get(realm, &key)?.to_boolean());
        }
        let key = realm.key("value");
        if obj.has_property(realm, &key)? {
            desc.value = Some(obj.get(realm, &key)?);
        }
        let key = realm.key("writable");
        if obj.has_property(realm, &key)? {
            desc.writable = Some(obj.get(realm, &key)?.to_boolean());
        }
        let key = realm.key("get");
        if obj.has_property(realm, &key)? {
            desc.get = Some(accessor_function(obj.get(realm, &key)?, "Getter")?);
        }
        let key = realm.key("set");
        if obj.has_property(realm, &key)? {
            desc.set = Some(accessor_function(obj.get(realm, &key)?, "Setter")?);
        }

        desc.validate()?;
        Ok(desc)
    }
}

fn accessor_function(value: JsValue, what: &str) -> JsResult<Option<JsObjectRef>> {
    match value {
        JsValue::Undefined => Ok(None),
        JsValue::Object(f) if f.borrow().is_callable() => Ok(Some(f)),
        other => Err(JsError::type_error(format!(
            "{} must be a function: {}",
            what,
            other.to_js_string()
        ))),
    }
}

fn function_or_undefined(f: &Option<JsObjectRef>) -> JsValue {
    f.clone().map_or(JsValue::Undefined, JsValue::Object)
}
