//! Typed arrays: integer-indexed exotic objects over a byte buffer.
//!
//! Every canonical numeric key is answered from the buffer and never falls
//! through to ordinary properties; invalid indices simply do not exist.
//! Elements are stored little-endian.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{JsError, JsResult};
use crate::object::cache::{CacheablePropertyMetadata, PropertyLookupPhase};
use crate::object::operations::to_number;
use crate::object::ordinary::{
    ordinary_define_own_property, ordinary_delete, ordinary_get, ordinary_get_own_property,
    ordinary_has_property, ordinary_own_property_keys, ordinary_set,
};
use crate::object::{InternalMethods, ObjectKind, PropertyAttributes, PropertyDescriptor};
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsValue, PropertyKey};

/// Shared backing store (an ArrayBuffer's data block)
pub type ByteBuffer = Rc<RefCell<Vec<u8>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedArrayElement {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl TypedArrayElement {
    pub fn size(self) -> usize {
        match self {
            TypedArrayElement::Int8 | TypedArrayElement::Uint8 | TypedArrayElement::Uint8Clamped => 1,
            TypedArrayElement::Int16 | TypedArrayElement::Uint16 => 2,
            TypedArrayElement::Int32 | TypedArrayElement::Uint32 | TypedArrayElement::Float32 => 4,
            TypedArrayElement::Float64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypedArrayElement::Int8 => "Int8Array",
            TypedArrayElement::Uint8 => "Uint8Array",
            TypedArrayElement::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayElement::Int16 => "Int16Array",
            TypedArrayElement::Uint16 => "Uint16Array",
            TypedArrayElement::Int32 => "Int32Array",
            TypedArrayElement::Uint32 => "Uint32Array",
            TypedArrayElement::Float32 => "Float32Array",
            TypedArrayElement::Float64 => "Float64Array",
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<f64> {
        Some(match self {
            TypedArrayElement::Int8 => i8::from_le_bytes(bytes.try_into().ok()?) as f64,
            TypedArrayElement::Uint8 | TypedArrayElement::Uint8Clamped => {
                u8::from_le_bytes(bytes.try_into().ok()?) as f64
            }
            TypedArrayElement::Int16 => i16::from_le_bytes(bytes.try_into().ok()?) as f64,
            TypedArrayElement::Uint16 => u16::from_le_bytes(bytes.try_into().ok()?) as f64,
            TypedArrayElement::Int32 => i32::from_le_bytes(bytes.try_into().ok()?) as f64,
            TypedArrayElement::Uint32 => u32::from_le_bytes(bytes.try_into().ok()?) as f64,
            TypedArrayElement::Float32 => f32::from_le_bytes(bytes.try_into().ok()?) as f64,
            TypedArrayElement::Float64 => f64::from_le_bytes(bytes.try_into().ok()?),
        })
    }

    fn encode(self, n: f64) -> Vec<u8> {
        match self {
            TypedArrayElement::Int8 => (modulo_int(n, 8) as u8 as i8).to_le_bytes().to_vec(),
            TypedArrayElement::Uint8 => (modulo_int(n, 8) as u8).to_le_bytes().to_vec(),
            TypedArrayElement::Uint8Clamped => vec![clamp_uint8(n)],
            TypedArrayElement::Int16 => (modulo_int(n, 16) as u16 as i16).to_le_bytes().to_vec(),
            TypedArrayElement::Uint16 => (modulo_int(n, 16) as u16).to_le_bytes().to_vec(),
            TypedArrayElement::Int32 => (modulo_int(n, 32) as u32 as i32).to_le_bytes().to_vec(),
            TypedArrayElement::Uint32 => (modulo_int(n, 32) as u32).to_le_bytes().to_vec(),
            TypedArrayElement::Float32 => (n as f32).to_le_bytes().to_vec(),
            TypedArrayElement::Float64 => n.to_le_bytes().to_vec(),
        }
    }
}

/// Truncate `n` and reduce it modulo 2^bits (ToInt8/ToUint16/... before the cast)
fn modulo_int(n: f64, bits: u32) -> u64 {
    if !n.is_finite() {
        return 0;
    }
    let modulus = 2f64.powi(bits as i32);
    n.trunc().rem_euclid(modulus) as u64
}

/// ToUint8Clamp: round half to even into 0..=255
fn clamp_uint8(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    let floor = n.floor();
    let diff = n - floor;
    let rounded = if diff > 0.5 || (diff == 0.5 && floor % 2.0 != 0.0) {
        floor + 1.0
    } else {
        floor
    };
    rounded as u8
}

pub struct TypedArrayData {
    pub buffer: ByteBuffer,
    pub element: TypedArrayElement,
    pub byte_offset: usize,
    /// Length in elements
    pub length: usize,
}

impl TypedArrayData {
    /// IsValidIntegerIndex
    pub fn is_valid_integer_index(&self, index: f64) -> bool {
        if index.fract() != 0.0 || (index == 0.0 && index.is_sign_negative()) {
            return false;
        }
        index >= 0.0 && index < self.length as f64
    }

    /// TypedArrayGetElement: `None` for an invalid index
    pub fn get_element(&self, index: f64) -> Option<f64> {
        if !self.is_valid_integer_index(index) {
            return None;
        }
        let size = self.element.size();
        let start = self.byte_offset + (index as usize) * size;
        let buffer = self.buffer.borrow();
        let bytes = buffer.get(start..start + size)?;
        self.element.decode(bytes)
    }

    /// Store an already converted number; invalid indices are ignored
    pub fn set_element(&self, index: f64, n: f64) {
        if !self.is_valid_integer_index(index) {
            return;
        }
        let size = self.element.size();
        let start = self.byte_offset + (index as usize) * size;
        let encoded = self.element.encode(n);
        let mut buffer = self.buffer.borrow_mut();
        if let Some(slot) = buffer.get_mut(start..start + size) {
            slot.copy_from_slice(&encoded);
        }
    }
}

pub struct TypedArrayMethods;

fn numeric_index(key: &PropertyKey) -> Option<f64> {
    key.canonical_numeric_index()
}

fn get_element(obj: &JsObjectRef, index: f64) -> Option<f64> {
    match &obj.borrow().kind {
        ObjectKind::TypedArray(data) => data.get_element(index),
        _ => None,
    }
}

fn is_valid_integer_index(obj: &JsObjectRef, index: f64) -> bool {
    match &obj.borrow().kind {
        ObjectKind::TypedArray(data) => data.is_valid_integer_index(index),
        _ => false,
    }
}

/// TypedArraySetElement: the value is converted before the index is checked
fn set_element(realm: &mut Realm, obj: &JsObjectRef, index: f64, value: &JsValue) -> JsResult<()> {
    let n = to_number(realm, value)?;
    if let ObjectKind::TypedArray(data) = &obj.borrow().kind {
        data.set_element(index, n);
    }
    Ok(())
}

impl InternalMethods for TypedArrayMethods {
    fn internal_get_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        if let Some(index) = numeric_index(key) {
            return Ok(get_element(obj, index)
                .map(|n| PropertyDescriptor::data(JsValue::Number(n), PropertyAttributes::DEFAULT)));
        }
        ordinary_get_own_property(realm, obj, key)
    }

    fn internal_has_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        if let Some(index) = numeric_index(key) {
            return Ok(is_valid_integer_index(obj, index));
        }
        ordinary_has_property(realm, obj, key)
    }

    fn internal_define_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        precomputed: Option<Option<PropertyDescriptor>>,
    ) -> JsResult<bool> {
        let Some(index) = numeric_index(key) else {
            return ordinary_define_own_property(realm, obj, key, desc, precomputed);
        };
        if !is_valid_integer_index(obj, index)
            || desc.configurable == Some(false)
            || desc.enumerable == Some(false)
            || desc.is_accessor_descriptor()
            || desc.writable == Some(false)
        {
            return Ok(false);
        }
        if let Some(value) = &desc.value {
            set_element(realm, obj, index, value)?;
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
        if let Some(index) = numeric_index(key) {
            CacheablePropertyMetadata::clear(metadata);
            return Ok(get_element(obj, index).map_or(JsValue::Undefined, JsValue::Number));
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
        mut metadata: Option<&mut CacheablePropertyMetadata>,
        phase: PropertyLookupPhase,
    ) -> JsResult<bool> {
        if let Some(index) = numeric_index(key) {
            CacheablePropertyMetadata::clear(metadata.as_deref_mut());
            let receiver_is_obj = receiver
                .as_object()
                .is_some_and(|r| crate::gc::Gc::ptr_eq(r, obj));
            if receiver_is_obj {
                set_element(realm, obj, index, &value)?;
                return Ok(true);
            }
            if !is_valid_integer_index(obj, index) {
                return Ok(true);
            }
        }
        ordinary_set(realm, obj, key, value, receiver, metadata, phase)
    }

    fn internal_delete(&self, realm: &mut Realm, obj: &JsObjectRef, key: &PropertyKey) -> JsResult<bool> {
        if let Some(index) = numeric_index(key) {
            return Ok(!is_valid_integer_index(obj, index));
        }
        ordinary_delete(realm, obj, key)
    }

    fn internal_own_property_keys(
        &self,
        _realm: &mut Realm,
        obj: &JsObjectRef,
    ) -> JsResult<Vec<PropertyKey>> {
        let length = match &obj.borrow().kind {
            ObjectKind::TypedArray(data) => data.length,
            _ => 0,
        };
        let mut keys: Vec<PropertyKey> = (0..length)
            .map(|i| PropertyKey::from(u32::try_from(i).unwrap_or(u32::MAX)))
            .collect();
        keys.extend(ordinary_own_property_keys(obj));
        Ok(keys)
    }

    fn has_ordinary_get_own_property(&self) -> bool {
        false
    }
}

impl Realm {
    /// A typed array of `length` zeroed elements over a fresh buffer
    pub fn create_typed_array(&mut self, element: TypedArrayElement, length: usize) -> JsResult<JsObjectRef> {
        let byte_length = length
            .checked_mul(element.size())
            .ok_or_else(|| JsError::range_error("Invalid typed array length"))?;
        let buffer: ByteBuffer = Rc::new(RefCell::new(vec![0; byte_length]));
        self.create_typed_array_on_buffer(buffer, element, 0, Some(length))
    }

    /// A typed array viewing `buffer` from `byte_offset`. Without a length
    /// the view runs to the end of the buffer.
    pub fn create_typed_array_on_buffer(
        &mut self,
        buffer: ByteBuffer,
        element: TypedArrayElement,
        byte_offset: usize,
        length: Option<usize>,
    ) -> JsResult<JsObjectRef> {
        let size = element.size();
        if byte_offset % size != 0 {
            return Err(JsError::range_error(format!(
                "start offset of {} should be a multiple of {}",
                element.name(),
                size
            )));
        }
        let buffer_len = buffer.borrow().len();
        let length = match length {
            Some(length) => {
                let end = length
                    .checked_mul(size)
                    .and_then(|bytes| bytes.checked_add(byte_offset));
                if end.is_none_or(|end| end > buffer_len) {
                    return Err(JsError::range_error(format!(
                        "Invalid typed array length: {}",
                        length
                    )));
                }
                length
            }
            None => {
                if byte_offset > buffer_len || (buffer_len - byte_offset) % size != 0 {
                    return Err(JsError::range_error(format!(
                        "byte length of {} should be a multiple of {}",
                        element.name(),
                        size
                    )));
                }
                (buffer_len - byte_offset) / size
            }
        };
        let proto = self.object_prototype();
        let kind = ObjectKind::TypedArray(TypedArrayData {
            buffer,
            element,
            byte_offset,
            length,
        });
        Ok(self.create_object_of_kind(Some(proto), kind))
    }
}
