//! The object model: storage, shapes and internal-method dispatch.
//!
//! A [`JsObject`] keeps named properties in a flat `storage` vector laid out
//! by its [`Shape`], integer keys in [`IndexedProperties`], and class private
//! state in a lazily allocated element list. Every object is reached through a
//! [`JsObjectRef`] handle; the internal methods live on that handle and
//! dispatch through the [`InternalMethods`] implementation of the object's
//! [`ObjectKind`].
//!
//! None of the internal methods hold a `RefCell` borrow across a call that can
//! run user code, and slot offsets are looked up again after such a call.

pub mod cache;
pub mod indexed_properties;
pub mod operations;
pub mod ordinary;
pub mod private_elements;
pub mod property_attributes;
pub mod property_descriptor;
pub mod shape;

use std::fmt;
use std::rc::Rc;

use crate::error::{JsError, JsResult};
use crate::exotic::arguments::{ArgumentsData, ArgumentsMethods};
use crate::exotic::array::{ArrayData, ArrayMethods};
use crate::exotic::bound_function::BoundFunctionData;
use crate::exotic::immutable_prototype::ImmutablePrototypeMethods;
use crate::exotic::module_namespace::{ModuleNamespaceData, ModuleNamespaceMethods};
use crate::exotic::proxy::{ProxyData, ProxyMethods};
use crate::exotic::typed_array::{TypedArrayData, TypedArrayMethods};
use crate::gc::{Gc, Reset, Traceable, Tracer};
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsValue, PropertyKey};

pub use cache::{CacheablePropertyMetadata, PropertyLookupPhase};
pub use indexed_properties::IndexedProperties;
pub use operations::{IntegrityLevel, PreferredType, PropertyKind, ShouldThrowExceptions};
pub use ordinary::OrdinaryMethods;
pub use private_elements::{
    ClassElementName, ClassFieldDefinition, PrivateElement, PrivateElementKind, PrivateName,
};
pub use property_attributes::PropertyAttributes;
pub use property_descriptor::PropertyDescriptor;
pub use shape::{PropertyMetadata, Shape, ShapeKind};

/// Host closure behind a native function object: `(realm, this, args)`
pub type NativeFn = Rc<dyn Fn(&mut Realm, JsValue, &[JsValue]) -> JsResult<JsValue>>;

/// Deferred initializer of a built-in property, run on first access
pub type IntrinsicAccessor = fn(&mut Realm) -> JsValue;

#[derive(Debug, Clone, Default)]
pub struct Accessor {
    pub getter: Option<JsObjectRef>,
    pub setter: Option<JsObjectRef>,
}

/// What one storage slot holds
#[derive(Clone)]
pub enum PropertyValue {
    Data(JsValue),
    Accessor(Accessor),
    Intrinsic(IntrinsicAccessor),
}

impl PropertyValue {
    pub fn is_accessor(&self) -> bool {
        matches!(self, PropertyValue::Accessor(_))
    }

    pub fn as_data(&self) -> Option<&JsValue> {
        match self {
            PropertyValue::Data(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn for_each_object(&self, f: &mut impl FnMut(&JsObjectRef)) {
        match self {
            PropertyValue::Data(JsValue::Object(obj)) => f(obj),
            PropertyValue::Accessor(accessor) => {
                if let Some(getter) = &accessor.getter {
                    f(getter);
                }
                if let Some(setter) = &accessor.setter {
                    f(setter);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Data(v) => write!(f, "Data({:?})", v),
            PropertyValue::Accessor(a) => f
                .debug_struct("Accessor")
                .field("getter", &a.getter.as_ref().map(|g| g.id()))
                .field("setter", &a.setter.as_ref().map(|s| s.id()))
                .finish(),
            PropertyValue::Intrinsic(_) => write!(f, "Intrinsic"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValueAndAttributes {
    pub value: PropertyValue,
    pub attributes: PropertyAttributes,
}

impl ValueAndAttributes {
    pub fn data(value: JsValue, attributes: PropertyAttributes) -> Self {
        Self {
            value: PropertyValue::Data(value),
            attributes,
        }
    }
}

/// A function implemented by the host
#[derive(Clone)]
pub struct NativeFunctionData {
    pub func: NativeFn,
}

/// Closed set of object kinds. The kind selects the internal-method table.
pub enum ObjectKind {
    Ordinary,
    Array(ArrayData),
    Arguments(ArgumentsData),
    Proxy(ProxyData),
    TypedArray(TypedArrayData),
    BoundFunction(BoundFunctionData),
    NativeFunction(NativeFunctionData),
    ModuleNamespace(ModuleNamespaceData),
    ImmutablePrototype,
}

static ORDINARY: OrdinaryMethods = OrdinaryMethods;
static ARRAY: ArrayMethods = ArrayMethods;
static ARGUMENTS: ArgumentsMethods = ArgumentsMethods;
static PROXY: ProxyMethods = ProxyMethods;
static TYPED_ARRAY: TypedArrayMethods = TypedArrayMethods;
static MODULE_NAMESPACE: ModuleNamespaceMethods = ModuleNamespaceMethods;
static IMMUTABLE_PROTOTYPE: ImmutablePrototypeMethods = ImmutablePrototypeMethods;

impl ObjectKind {
    /// Internal-method table for this kind. Bound and native functions use
    /// the ordinary algorithms.
    pub fn methods(&self) -> &'static dyn InternalMethods {
        match self {
            ObjectKind::Ordinary | ObjectKind::BoundFunction(_) | ObjectKind::NativeFunction(_) => {
                &ORDINARY
            }
            ObjectKind::Array(_) => &ARRAY,
            ObjectKind::Arguments(_) => &ARGUMENTS,
            ObjectKind::Proxy(_) => &PROXY,
            ObjectKind::TypedArray(_) => &TYPED_ARRAY,
            ObjectKind::ModuleNamespace(_) => &MODULE_NAMESPACE,
            ObjectKind::ImmutablePrototype => &IMMUTABLE_PROTOTYPE,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ObjectKind::Ordinary | ObjectKind::ImmutablePrototype => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Arguments(_) => "Arguments",
            ObjectKind::Proxy(_) => "Proxy",
            ObjectKind::TypedArray(data) => data.element.name(),
            ObjectKind::BoundFunction(_) | ObjectKind::NativeFunction(_) => "Function",
            ObjectKind::ModuleNamespace(_) => "Module",
        }
    }

    fn trace(&self, tracer: &mut Tracer<'_, JsObject>) {
        match self {
            ObjectKind::Proxy(data) => {
                if let Some(target) = &data.target {
                    tracer.visit(target);
                }
                if let Some(handler) = &data.handler {
                    tracer.visit(handler);
                }
            }
            ObjectKind::BoundFunction(data) => {
                tracer.visit(&data.target);
                if let JsValue::Object(this) = &data.bound_this {
                    tracer.visit(this);
                }
                for arg in &data.bound_args {
                    if let JsValue::Object(obj) = arg {
                        tracer.visit(obj);
                    }
                }
            }
            ObjectKind::Arguments(data) => data.trace(tracer),
            ObjectKind::ModuleNamespace(data) => data.trace(tracer),
            ObjectKind::Ordinary
            | ObjectKind::Array(_)
            | ObjectKind::TypedArray(_)
            | ObjectKind::NativeFunction(_)
            | ObjectKind::ImmutablePrototype => {}
        }
    }
}

pub struct JsObject {
    pub(crate) shape: Rc<Shape>,
    /// One slot per shape entry, indexed by `PropertyMetadata::offset`
    pub(crate) storage: Vec<PropertyValue>,
    pub(crate) indexed: IndexedProperties,
    /// Most objects never get private elements; keep the field one word wide
    #[allow(clippy::box_collection)]
    pub(crate) private_elements: Option<Box<Vec<PrivateElement>>>,
    pub(crate) extensible: bool,
    pub(crate) has_parameter_map: bool,
    pub(crate) has_magical_length: bool,
    pub(crate) is_typed_array: bool,
    pub(crate) may_interfere_with_indexed_property_access: bool,
    pub(crate) has_intrinsic_accessors: bool,
    pub kind: ObjectKind,
}

impl JsObject {
    pub fn new(shape: Rc<Shape>, kind: ObjectKind) -> Self {
        let has_parameter_map = matches!(kind, ObjectKind::Arguments(_));
        let has_magical_length = matches!(kind, ObjectKind::Array(_));
        let is_typed_array = matches!(kind, ObjectKind::TypedArray(_));
        let may_interfere_with_indexed_property_access = matches!(
            kind,
            ObjectKind::Arguments(_)
                | ObjectKind::Proxy(_)
                | ObjectKind::TypedArray(_)
                | ObjectKind::ModuleNamespace(_)
        );
        let storage = vec![PropertyValue::Data(JsValue::Undefined); shape.property_count()];
        Self {
            shape,
            storage,
            indexed: IndexedProperties::new(),
            private_elements: None,
            extensible: true,
            has_parameter_map,
            has_magical_length,
            is_typed_array,
            may_interfere_with_indexed_property_access,
            has_intrinsic_accessors: false,
            kind,
        }
    }

    pub fn shape(&self) -> &Rc<Shape> {
        &self.shape
    }

    pub fn prototype(&self) -> Option<JsObjectRef> {
        self.shape.prototype()
    }

    pub fn indexed(&self) -> &IndexedProperties {
        &self.indexed
    }

    pub fn is_callable(&self) -> bool {
        match &self.kind {
            ObjectKind::NativeFunction(_) | ObjectKind::BoundFunction(_) => true,
            ObjectKind::Proxy(data) => data.is_callable,
            _ => false,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn has_parameter_map(&self) -> bool {
        self.has_parameter_map
    }

    pub fn has_magical_length(&self) -> bool {
        self.has_magical_length
    }

    pub fn is_typed_array(&self) -> bool {
        self.is_typed_array
    }

    pub fn may_interfere_with_indexed_property_access(&self) -> bool {
        self.may_interfere_with_indexed_property_access
    }

    pub fn has_intrinsic_accessors(&self) -> bool {
        self.has_intrinsic_accessors
    }

    /// Raw stored entry for `key`. Deferred built-ins are returned as-is.
    pub fn storage_get(&self, key: &PropertyKey) -> Option<ValueAndAttributes> {
        if let PropertyKey::Index(index) = key {
            return self.indexed.get(*index);
        }
        let meta = self.shape.lookup(key)?;
        let value = self.storage.get(meta.offset as usize)?.clone();
        Some(ValueAndAttributes {
            value,
            attributes: meta.attributes,
        })
    }

    pub fn storage_has(&self, key: &PropertyKey) -> bool {
        match key {
            PropertyKey::Index(index) => self.indexed.has(*index),
            _ => self.shape.lookup(key).is_some(),
        }
    }

    /// Store `entry` under `key`, adding the key or changing its attributes
    /// as needed. A shared shape grows by transition until it holds
    /// `max_shared_properties` keys; attribute changes and larger objects
    /// use a dictionary shape.
    pub fn storage_set(
        &mut self,
        key: &PropertyKey,
        entry: ValueAndAttributes,
        max_shared_properties: usize,
    ) -> JsResult<()> {
        let is_intrinsic = matches!(entry.value, PropertyValue::Intrinsic(_));
        if let PropertyKey::Index(index) = key {
            self.indexed.put(*index, entry.value, entry.attributes);
        } else if let Some(meta) = self.shape.lookup(key) {
            if meta.attributes != entry.attributes {
                if !self.shape.is_dictionary() {
                    self.shape = self.shape.fork_to_dictionary();
                }
                self.shape.dictionary_reconfigure(key, entry.attributes);
            }
            let slot = self
                .storage
                .get_mut(meta.offset as usize)
                .ok_or_else(|| JsError::internal_error("shape slot out of range"))?;
            *slot = entry.value;
        } else {
            if self.shape.is_dictionary() {
                self.shape.dictionary_add(key.clone(), entry.attributes);
            } else if self.shape.property_count() >= max_shared_properties {
                self.shape = self.shape.fork_to_dictionary();
                self.shape.dictionary_add(key.clone(), entry.attributes);
            } else {
                self.shape = self.shape.add_transition(key.clone(), entry.attributes);
            }
            self.storage.push(entry.value);
        }
        if is_intrinsic {
            self.has_intrinsic_accessors = true;
            self.shape.set_has_intrinsic_accessors();
        }
        Ok(())
    }

    /// Remove `key` regardless of its attributes. Named keys move the object
    /// to a dictionary shape.
    pub fn storage_delete(&mut self, key: &PropertyKey) -> bool {
        if let PropertyKey::Index(index) = key {
            return self.indexed.remove(*index);
        }
        if self.shape.lookup(key).is_none() {
            return false;
        }
        if !self.shape.is_dictionary() {
            self.shape = self.shape.fork_to_dictionary();
        }
        match self.shape.dictionary_remove(key) {
            Some(meta) if (meta.offset as usize) < self.storage.len() => {
                self.storage.remove(meta.offset as usize);
                true
            }
            _ => false,
        }
    }

    /// Value in a named slot, for callers holding cached metadata
    pub fn get_direct(&self, offset: u32) -> Option<&PropertyValue> {
        self.storage.get(offset as usize)
    }

    /// Overwrite a named slot, for callers holding cached metadata
    pub fn put_direct(&mut self, offset: u32, value: JsValue) -> JsResult<()> {
        let slot = self
            .storage
            .get_mut(offset as usize)
            .ok_or_else(|| JsError::internal_error("direct write outside storage"))?;
        *slot = PropertyValue::Data(value);
        Ok(())
    }

    /// Replace a deferred built-in with its value if the slot still holds it.
    pub(crate) fn finish_intrinsic(&mut self, key: &PropertyKey, value: JsValue) {
        if let PropertyKey::Index(index) = key {
            if let Some(entry) = self.indexed.get(*index)
                && matches!(entry.value, PropertyValue::Intrinsic(_))
            {
                self.indexed
                    .put(*index, PropertyValue::Data(value), entry.attributes);
            }
            return;
        }
        if let Some(meta) = self.shape.lookup(key)
            && let Some(slot) = self.storage.get_mut(meta.offset as usize)
            && matches!(slot, PropertyValue::Intrinsic(_))
        {
            *slot = PropertyValue::Data(value);
        }
    }

    pub(crate) fn set_shape(&mut self, shape: Rc<Shape>) {
        self.shape = shape;
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObject")
            .field("kind", &self.class_name())
            .field("shape", &self.shape)
            .field("indexed", &self.indexed.len())
            .field("extensible", &self.extensible)
            .finish()
    }
}

impl Traceable for JsObject {
    fn trace(&self, tracer: &mut Tracer<'_, Self>) {
        // Shapes are shared; each prototype edge in the chain is reported once
        let mut shape = Some(&self.shape);
        while let Some(current) = shape {
            let first_visit = tracer.visit_shared(Rc::as_ptr(current) as usize, |t| {
                if let Some(proto) = current.prototype() {
                    t.visit(&proto);
                }
            });
            // Ancestors of a reported shape were reported with it
            if !first_visit {
                break;
            }
            shape = current.parent();
        }
        for value in &self.storage {
            value.for_each_object(&mut |obj| tracer.visit(obj));
        }
        self.indexed.for_each_object(|obj| tracer.visit(obj));
        if let Some(elements) = &self.private_elements {
            for element in elements.iter() {
                element.value.for_each_object(&mut |obj| tracer.visit(obj));
            }
        }
        self.kind.trace(tracer);
    }
}

impl Reset for JsObject {
    fn reset(&mut self) {
        self.private_elements = None;
        self.indexed.clear();
        self.storage.clear();
        self.kind = ObjectKind::Ordinary;
        // Never touch the old shape: it may be shared, and its prototype may
        // already be reclaimed
        self.shape = Shape::new_detached();
    }
}

thread_local! {
    /// Placeholder shape for objects being torn down
    static RELEASED_SHAPE: Rc<Shape> = Shape::new_detached();
}

impl Drop for JsObject {
    fn drop(&mut self) {
        let placeholder = RELEASED_SHAPE
            .try_with(Rc::clone)
            .unwrap_or_else(|_| Shape::new_detached());
        let parts = (
            std::mem::replace(&mut self.shape, placeholder),
            std::mem::take(&mut self.storage),
            std::mem::take(&mut self.indexed),
            self.private_elements.take(),
            std::mem::replace(&mut self.kind, ObjectKind::Ordinary),
        );
        crate::gc::release_flat(Box::new(parts));
    }
}

/// The internal-method contract every object kind implements.
///
/// Each default is the ordinary algorithm. Exotic kinds override the subset
/// they change and inherit the rest.
pub trait InternalMethods {
    fn internal_get_prototype_of(
        &self,
        _realm: &mut Realm,
        obj: &JsObjectRef,
    ) -> JsResult<Option<JsObjectRef>> {
        Ok(ordinary::ordinary_get_prototype_of(obj))
    }

    fn internal_set_prototype_of(
        &self,
        _realm: &mut Realm,
        obj: &JsObjectRef,
        proto: Option<JsObjectRef>,
    ) -> JsResult<bool> {
        Ok(ordinary::ordinary_set_prototype_of(obj, proto))
    }

    fn internal_is_extensible(&self, _realm: &mut Realm, obj: &JsObjectRef) -> JsResult<bool> {
        Ok(obj.borrow().extensible)
    }

    fn internal_prevent_extensions(&self, _realm: &mut Realm, obj: &JsObjectRef) -> JsResult<bool> {
        obj.borrow_mut().extensible = false;
        Ok(true)
    }

    fn internal_get_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        ordinary::ordinary_get_own_property(realm, obj, key)
    }

    fn internal_define_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        precomputed: Option<Option<PropertyDescriptor>>,
    ) -> JsResult<bool> {
        ordinary::ordinary_define_own_property(realm, obj, key, desc, precomputed)
    }

    fn internal_has_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        ordinary::ordinary_has_property(realm, obj, key)
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
        ordinary::ordinary_get(realm, obj, key, receiver, metadata, phase)
    }

    #[allow(clippy::too_many_arguments)]
    fn internal_set(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
        metadata: Option<&mut CacheablePropertyMetadata>,
        phase: PropertyLookupPhase,
    ) -> JsResult<bool> {
        ordinary::ordinary_set(realm, obj, key, value, receiver, metadata, phase)
    }

    fn internal_delete(&self, realm: &mut Realm, obj: &JsObjectRef, key: &PropertyKey) -> JsResult<bool> {
        ordinary::ordinary_delete(realm, obj, key)
    }

    fn internal_own_property_keys(
        &self,
        _realm: &mut Realm,
        obj: &JsObjectRef,
    ) -> JsResult<Vec<PropertyKey>> {
        Ok(ordinary::ordinary_own_property_keys(obj))
    }

    /// False when [[GetPrototypeOf]] may run user code (proxies). The cycle
    /// check in [[SetPrototypeOf]] stops walking at such objects.
    fn has_ordinary_get_prototype_of(&self) -> bool {
        true
    }

    /// False when some named keys are answered without a shape slot. Named
    /// [[Get]]/[[Set]] then take the descriptor path and are never cached.
    fn has_ordinary_get_own_property(&self) -> bool {
        true
    }
}

impl Gc<JsObject> {
    /// The internal-method table of this object's kind
    pub fn methods(&self) -> &'static dyn InternalMethods {
        self.borrow().kind.methods()
    }

    /// Kind name without panicking when the object is mutably borrowed
    pub fn try_borrow_kind_name(&self) -> Option<&'static str> {
        self.try_borrow().map(|obj| obj.class_name())
    }

    /// Prototype recorded in the shape (no exotic behavior)
    pub fn prototype(&self) -> Option<JsObjectRef> {
        self.borrow().prototype()
    }

    pub fn shape(&self) -> Rc<Shape> {
        Rc::clone(&self.borrow().shape)
    }

    pub fn internal_get_prototype_of(&self, realm: &mut Realm) -> JsResult<Option<JsObjectRef>> {
        self.methods().internal_get_prototype_of(realm, self)
    }

    pub fn internal_set_prototype_of(
        &self,
        realm: &mut Realm,
        proto: Option<JsObjectRef>,
    ) -> JsResult<bool> {
        self.methods().internal_set_prototype_of(realm, self, proto)
    }

    pub fn internal_is_extensible(&self, realm: &mut Realm) -> JsResult<bool> {
        self.methods().internal_is_extensible(realm, self)
    }

    pub fn internal_prevent_extensions(&self, realm: &mut Realm) -> JsResult<bool> {
        self.methods().internal_prevent_extensions(realm, self)
    }

    pub fn internal_get_own_property(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        self.methods().internal_get_own_property(realm, self, key)
    }

    pub fn internal_define_own_property(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        precomputed: Option<Option<PropertyDescriptor>>,
    ) -> JsResult<bool> {
        self.methods()
            .internal_define_own_property(realm, self, key, desc, precomputed)
    }

    pub fn internal_has_property(&self, realm: &mut Realm, key: &PropertyKey) -> JsResult<bool> {
        self.methods().internal_has_property(realm, self, key)
    }

    pub fn internal_get(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        receiver: &JsValue,
        metadata: Option<&mut CacheablePropertyMetadata>,
        phase: PropertyLookupPhase,
    ) -> JsResult<JsValue> {
        self.methods()
            .internal_get(realm, self, key, receiver, metadata, phase)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn internal_set(
        &self,
        realm: &mut Realm,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
        metadata: Option<&mut CacheablePropertyMetadata>,
        phase: PropertyLookupPhase,
    ) -> JsResult<bool> {
        self.methods()
            .internal_set(realm, self, key, value, receiver, metadata, phase)
    }

    pub fn internal_delete(&self, realm: &mut Realm, key: &PropertyKey) -> JsResult<bool> {
        self.methods().internal_delete(realm, self, key)
    }

    pub fn internal_own_property_keys(&self, realm: &mut Realm) -> JsResult<Vec<PropertyKey>> {
        self.methods().internal_own_property_keys(realm, self)
    }
}
