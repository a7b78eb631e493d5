//! Arguments objects.
//!
//! A mapped arguments object aliases its leading indices to the formal
//! parameters of the function that created it: writing `arguments[0]`
//! changes the first parameter and the other way around. The parameter
//! values live in [`ParameterCells`], shared with whoever runs the function
//! body. An index stops being mapped once it is deleted, turned into an
//! accessor, or made non-writable.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::JsResult;
use crate::gc::Tracer;
use crate::object::cache::{CacheablePropertyMetadata, PropertyLookupPhase};
use crate::object::ordinary::{
    ordinary_define_own_property, ordinary_delete, ordinary_get, ordinary_get_own_property,
    ordinary_set,
};
use crate::object::{InternalMethods, JsObject, ObjectKind, PropertyAttributes, PropertyDescriptor};
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsString, JsValue, PropertyKey};

/// Formal parameter values of one function activation, by position
pub type ParameterCells = Rc<RefCell<Vec<JsValue>>>;

pub struct ArgumentsData {
    cells: ParameterCells,
    /// `mapped[i]`: index `i` still aliases `cells[i]`
    mapped: Vec<bool>,
}

impl ArgumentsData {
    pub fn is_mapped(&self, index: u32) -> bool {
        self.mapped.get(index as usize).copied().unwrap_or(false)
    }

    fn unmap(&mut self, index: u32) {
        if let Some(flag) = self.mapped.get_mut(index as usize) {
            *flag = false;
        }
    }

    fn read(&self, index: u32) -> JsValue {
        self.cells
            .borrow()
            .get(index as usize)
            .cloned()
            .unwrap_or_default()
    }

    fn write(&self, index: u32, value: JsValue) {
        if let Some(cell) = self.cells.borrow_mut().get_mut(index as usize) {
            *cell = value;
        }
    }

    pub(crate) fn trace(&self, tracer: &mut Tracer<'_, JsObject>) {
        // The cells are shared with the activation; report them once
        let cells = &self.cells;
        tracer.visit_shared(Rc::as_ptr(cells) as *const () as usize, |t| {
            for value in cells.borrow().iter() {
                if let JsValue::Object(obj) = value {
                    t.visit(obj);
                }
            }
        });
    }
}

pub struct ArgumentsMethods;

/// Mapped index of `key`, if it is still mapped on `obj`
fn mapped_index(obj: &JsObjectRef, key: &PropertyKey) -> Option<u32> {
    let PropertyKey::Index(index) = key else {
        return None;
    };
    match &obj.borrow().kind {
        ObjectKind::Arguments(data) if data.is_mapped(*index) => Some(*index),
        _ => None,
    }
}

fn with_data<T>(obj: &JsObjectRef, f: impl FnOnce(&mut ArgumentsData) -> T) -> Option<T> {
    match &mut obj.borrow_mut().kind {
        ObjectKind::Arguments(data) => Some(f(data)),
        _ => None,
    }
}

impl InternalMethods for ArgumentsMethods {
    fn internal_get_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        let Some(mut desc) = ordinary_get_own_property(realm, obj, key)? else {
            return Ok(None);
        };
        if let Some(index) = mapped_index(obj, key) {
            desc.value = with_data(obj, |data| data.read(index));
        }
        Ok(Some(desc))
    }

    fn internal_define_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        _precomputed: Option<Option<PropertyDescriptor>>,
    ) -> JsResult<bool> {
        let mapped = mapped_index(obj, key);
        let mut new_arg_desc = desc.clone();
        if let Some(index) = mapped
            && desc.is_data_descriptor()
            && desc.value.is_none()
            && desc.writable == Some(false)
        {
            new_arg_desc.value = with_data(obj, |data| data.read(index));
        }
        if !ordinary_define_own_property(realm, obj, key, &new_arg_desc, None)? {
            return Ok(false);
        }
        if let Some(index) = mapped {
            if desc.is_accessor_descriptor() {
                with_data(obj, |data| data.unmap(index));
            } else {
                if let Some(value) = &desc.value {
                    with_data(obj, |data| data.write(index, value.clone()));
                }
                if desc.writable == Some(false) {
                    with_data(obj, |data| data.unmap(index));
                }
            }
        }
        Ok(true)
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
        if let Some(index) = mapped_index(obj, key) {
            CacheablePropertyMetadata::clear(metadata);
            return Ok(with_data(obj, |data| data.read(index)).unwrap_or_default());
        }
        ordinary_get(realm, obj, key, receiver, metadata, phase)
    }

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
        let receiver_is_obj = receiver
            .as_object()
            .is_some_and(|r| crate::gc::Gc::ptr_eq(r, obj));
        if receiver_is_obj && let Some(index) = mapped_index(obj, key) {
            with_data(obj, |data| data.write(index, value.clone()));
        }
        ordinary_set(realm, obj, key, value, receiver, metadata, phase)
    }

    fn internal_delete(&self, realm: &mut Realm, obj: &JsObjectRef, key: &PropertyKey) -> JsResult<bool> {
        let mapped = mapped_index(obj, key);
        let result = ordinary_delete(realm, obj, key)?;
        if result && let Some(index) = mapped {
            with_data(obj, |data| data.unmap(index));
        }
        Ok(result)
    }

    fn has_ordinary_get_own_property(&self) -> bool {
        false
    }
}

impl Realm {
    /// CreateMappedArgumentsObject. `parameter_names` are the formals of
    /// `callee` in order; `cells` holds their current values.
    pub fn create_mapped_arguments(
        &mut self,
        callee: &JsObjectRef,
        parameter_names: &[JsString],
        cells: ParameterCells,
        args: &[JsValue],
    ) -> JsResult<JsObjectRef> {
        // The last of several same-named formals wins the binding
        let mut mapped = vec![false; args.len().min(parameter_names.len())];
        let mut seen: Vec<&JsString> = Vec::new();
        for (index, name) in parameter_names.iter().enumerate().rev() {
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);
            if let Some(flag) = mapped.get_mut(index) {
                *flag = true;
            }
        }

        let proto = self.object_prototype();
        let kind = ObjectKind::Arguments(ArgumentsData { cells, mapped });
        let obj = self.create_object_of_kind(Some(proto), kind);
        self.install_arguments_properties(&obj, args)?;
        let callee_key = self.key("callee");
        obj.define_direct_property(
            self,
            &callee_key,
            JsValue::Object(callee.clone()),
            PropertyAttributes::HIDDEN,
        )?;
        Ok(obj)
    }

    /// CreateUnmappedArgumentsObject (strict functions). Reading or writing
    /// `callee` throws.
    pub fn create_unmapped_arguments(&mut self, args: &[JsValue]) -> JsResult<JsObjectRef> {
        let obj = self.create_plain_object();
        self.install_arguments_properties(&obj, args)?;
        let thrower = self.create_native_function("", 0, |_, _, _| {
            Err(crate::error::JsError::type_error(
                "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode functions",
            ))
        })?;
        let callee_key = self.key("callee");
        obj.define_direct_accessor(
            self,
            &callee_key,
            Some(thrower.clone()),
            Some(thrower),
            PropertyAttributes::NONE,
        )?;
        Ok(obj)
    }

    fn install_arguments_properties(&mut self, obj: &JsObjectRef, args: &[JsValue]) -> JsResult<()> {
        obj.set_indexed_property_elements(args.to_vec());
        let length_key = self.key("length");
        obj.define_direct_property(
            self,
            &length_key,
            JsValue::Number(args.len() as f64),
            PropertyAttributes::HIDDEN,
        )?;
        let iterator = PropertyKey::Symbol(self.well_known_symbols().iterator.clone());
        let values = self.create_native_function("values", 0, |_, this, _| Ok(this))?;
        obj.define_direct_property(self, &iterator, JsValue::Object(values), PropertyAttributes::HIDDEN)
    }
}
