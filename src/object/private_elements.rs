//! Class private elements (`#x`) stored per instance.
//!
//! Private names are unique tokens issued by the realm, one per declaration
//! site. Two classes that both declare `#x` get different names, so lookups
//! compare ids and never descriptions.

use std::fmt;

use super::{Accessor, PropertyValue};
use crate::error::{JsError, JsResult};
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsString, JsValue, PropertyKey};

#[derive(Clone)]
pub struct PrivateName {
    id: u64,
    pub description: JsString,
}

impl PrivateName {
    pub(crate) fn new(id: u64, description: JsString) -> Self {
        Self { id, description }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for PrivateName {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PrivateName {}

impl std::hash::Hash for PrivateName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PrivateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.description, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateElementKind {
    Field,
    Method,
    Accessor,
}

#[derive(Debug, Clone)]
pub struct PrivateElement {
    pub key: PrivateName,
    pub kind: PrivateElementKind,
    /// `Data` for fields and methods, `Accessor` for accessors
    pub value: PropertyValue,
}

impl PrivateElement {
    pub fn method(key: PrivateName, function: JsObjectRef) -> Self {
        Self {
            key,
            kind: PrivateElementKind::Method,
            value: PropertyValue::Data(JsValue::Object(function)),
        }
    }

    pub fn accessor(key: PrivateName, getter: Option<JsObjectRef>, setter: Option<JsObjectRef>) -> Self {
        Self {
            key,
            kind: PrivateElementKind::Accessor,
            value: PropertyValue::Accessor(Accessor { getter, setter }),
        }
    }
}

/// Name of a class field: public key or private name
#[derive(Debug, Clone)]
pub enum ClassElementName {
    Public(PropertyKey),
    Private(PrivateName),
}

/// One field declaration of a class body
#[derive(Debug, Clone)]
pub struct ClassFieldDefinition {
    pub name: ClassElementName,
    /// Called with the instance as `this`; absent means `undefined`
    pub initializer: Option<JsObjectRef>,
}

impl crate::gc::Gc<super::JsObject> {
    /// PrivateElementFind
    pub fn private_element_find(&self, name: &PrivateName) -> Option<PrivateElement> {
        self.borrow()
            .private_elements
            .as_ref()?
            .iter()
            .find(|e| e.key == *name)
            .cloned()
    }

    /// PrivateFieldAdd
    pub fn private_field_add(&self, name: PrivateName, value: JsValue) -> JsResult<()> {
        self.add_private_element(PrivateElement {
            key: name,
            kind: PrivateElementKind::Field,
            value: PropertyValue::Data(value),
        })
    }

    /// PrivateMethodOrAccessorAdd
    pub fn private_method_or_accessor_add(&self, element: PrivateElement) -> JsResult<()> {
        if element.kind == PrivateElementKind::Field {
            return Err(JsError::internal_error(
                "private_method_or_accessor_add called with a field",
            ));
        }
        self.add_private_element(element)
    }

    fn add_private_element(&self, element: PrivateElement) -> JsResult<()> {
        let mut obj = self.borrow_mut();
        let elements = obj.private_elements.get_or_insert_with(Default::default);
        if elements.iter().any(|e| e.key == element.key) {
            return Err(JsError::type_error(format!(
                "Cannot initialize #{} twice on the same object",
                element.key.description
            )));
        }
        elements.push(element);
        Ok(())
    }

    /// PrivateGet
    pub fn private_get(&self, realm: &mut Realm, name: &PrivateName) -> JsResult<JsValue> {
        let element = self.private_element_find(name).ok_or_else(|| missing(name))?;
        match element.value {
            PropertyValue::Data(value) => Ok(value),
            PropertyValue::Accessor(Accessor {
                getter: Some(getter),
                ..
            }) => realm.call(&JsValue::Object(getter), JsValue::Object(self.clone()), &[]),
            PropertyValue::Accessor(_) => Err(JsError::type_error(format!(
                "'#{}' was defined without a getter",
                name.description
            ))),
            PropertyValue::Intrinsic(_) => Err(JsError::internal_error("intrinsic private element")),
        }
    }

    /// PrivateSet
    pub fn private_set(&self, realm: &mut Realm, name: &PrivateName, value: JsValue) -> JsResult<()> {
        let element = self.private_element_find(name).ok_or_else(|| missing(name))?;
        match element.kind {
            PrivateElementKind::Field => {
                let mut obj = self.borrow_mut();
                let slot = obj
                    .private_elements
                    .as_mut()
                    .and_then(|elements| elements.iter_mut().find(|e| e.key == *name))
                    .ok_or_else(|| missing(name))?;
                slot.value = PropertyValue::Data(value);
                Ok(())
            }
            PrivateElementKind::Method => Err(JsError::type_error(format!(
                "Private method #{} is not writable",
                name.description
            ))),
            PrivateElementKind::Accessor => match element.value {
                PropertyValue::Accessor(Accessor {
                    setter: Some(setter),
                    ..
                }) => {
                    realm.call(&JsValue::Object(setter), JsValue::Object(self.clone()), &[value])?;
                    Ok(())
                }
                _ => Err(JsError::type_error(format!(
                    "'#{}' was defined without a setter",
                    name.description
                ))),
            },
        }
    }

    /// DefineField: run the initializer with this object as `this` and
    /// install the result.
    pub fn define_field(&self, realm: &mut Realm, field: &ClassFieldDefinition) -> JsResult<()> {
        let value = match &field.initializer {
            Some(init) => realm.call(
                &JsValue::Object(init.clone()),
                JsValue::Object(self.clone()),
                &[],
            )?,
            None => JsValue::Undefined,
        };
        match &field.name {
            ClassElementName::Private(name) => self.private_field_add(name.clone(), value),
            ClassElementName::Public(key) => self.create_data_property_or_throw(realm, key, value),
        }
    }

    /// InitializeInstanceElements: private methods and accessors first, then
    /// fields in declaration order.
    pub fn initialize_instance_elements(
        &self,
        realm: &mut Realm,
        private_methods: &[PrivateElement],
        fields: &[ClassFieldDefinition],
    ) -> JsResult<()> {
        for method in private_methods {
            self.private_method_or_accessor_add(method.clone())?;
        }
        for field in fields {
            self.define_field(realm, field)?;
        }
        Ok(())
    }

    /// Number of private elements (diagnostics and tests)
    pub fn private_element_count(&self) -> usize {
        self.borrow().private_elements.as_ref().map_or(0, |e| e.len())
    }
}

fn missing(name: &PrivateName) -> JsError {
    JsError::type_error(format!(
        "Cannot read private member #{} from an object whose class did not declare it",
        name.description
    ))
}
