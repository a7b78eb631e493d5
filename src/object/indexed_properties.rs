//! Integer-keyed property storage.
//!
//! Elements start out packed in a `Vec` (contiguous from index 0, default
//! attributes, plain data). The first write that breaks that layout moves the
//! store to an ordered map for good.

use std::collections::BTreeMap;

use super::property_attributes::PropertyAttributes;
use super::{PropertyValue, ValueAndAttributes};
use crate::value::{JsObjectRef, JsValue};

#[derive(Debug, Clone)]
enum Storage {
    Simple(Vec<JsValue>),
    Generic(BTreeMap<u32, ValueAndAttributes>),
}

/// Indexed elements plus the tracked array-like size (the `length` of arrays).
#[derive(Debug, Clone)]
pub struct IndexedProperties {
    storage: Storage,
    array_like_size: u32,
}

impl Default for IndexedProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexedProperties {
    pub fn new() -> Self {
        Self {
            storage: Storage::Simple(Vec::new()),
            array_like_size: 0,
        }
    }

    /// Packed store holding `values` at 0..len
    pub fn from_values(values: Vec<JsValue>) -> Self {
        let array_like_size = u32::try_from(values.len()).unwrap_or(u32::MAX);
        Self {
            storage: Storage::Simple(values),
            array_like_size,
        }
    }

    pub fn is_simple_storage(&self) -> bool {
        matches!(self.storage, Storage::Simple(_))
    }

    /// Number of elements actually present
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Simple(packed) => packed.len(),
            Storage::Generic(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn array_like_size(&self) -> u32 {
        self.array_like_size
    }

    pub fn has(&self, index: u32) -> bool {
        match &self.storage {
            Storage::Simple(packed) => (index as usize) < packed.len(),
            Storage::Generic(map) => map.contains_key(&index),
        }
    }

    pub fn get(&self, index: u32) -> Option<ValueAndAttributes> {
        match &self.storage {
            Storage::Simple(packed) => packed.get(index as usize).map(|v| ValueAndAttributes {
                value: PropertyValue::Data(v.clone()),
                attributes: PropertyAttributes::DEFAULT,
            }),
            Storage::Generic(map) => map.get(&index).cloned(),
        }
    }

    /// Attributes without cloning the value
    pub fn attributes(&self, index: u32) -> Option<PropertyAttributes> {
        match &self.storage {
            Storage::Simple(packed) => {
                ((index as usize) < packed.len()).then_some(PropertyAttributes::DEFAULT)
            }
            Storage::Generic(map) => map.get(&index).map(|e| e.attributes),
        }
    }

    /// Insert or overwrite an element. Grows the array-like size to cover it.
    pub fn put(&mut self, index: u32, value: PropertyValue, attributes: PropertyAttributes) {
        if let Storage::Simple(packed) = &mut self.storage {
            let fits_packed = attributes == PropertyAttributes::DEFAULT
                && matches!(value, PropertyValue::Data(_))
                && (index as usize) <= packed.len();
            if fits_packed && let PropertyValue::Data(v) = value {
                match packed.get_mut(index as usize) {
                    Some(slot) => *slot = v,
                    None => packed.push(v),
                }
                self.grow_to_cover(index);
                return;
            }
            self.switch_to_generic();
        }
        if let Storage::Generic(map) = &mut self.storage {
            map.insert(index, ValueAndAttributes { value, attributes });
        }
        self.grow_to_cover(index);
    }

    /// Overwrite the value of an existing element, keeping its attributes.
    pub fn put_value(&mut self, index: u32, value: JsValue) -> bool {
        match &mut self.storage {
            Storage::Simple(packed) => match packed.get_mut(index as usize) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            Storage::Generic(map) => match map.get_mut(&index) {
                Some(entry) => {
                    entry.value = PropertyValue::Data(value);
                    true
                }
                None => false,
            },
        }
    }

    /// Remove an element. The array-like size is unchanged.
    pub fn remove(&mut self, index: u32) -> bool {
        if let Storage::Simple(packed) = &mut self.storage {
            let idx = index as usize;
            if idx >= packed.len() {
                return false;
            }
            if idx + 1 == packed.len() {
                packed.pop();
                return true;
            }
            // A hole in the middle
            self.switch_to_generic();
        }
        match &mut self.storage {
            Storage::Generic(map) => map.remove(&index).is_some(),
            Storage::Simple(_) => false,
        }
    }

    /// Present indices, ascending
    pub fn indices(&self) -> Vec<u32> {
        match &self.storage {
            Storage::Simple(packed) => (0..packed.len() as u32).collect(),
            Storage::Generic(map) => map.keys().copied().collect(),
        }
    }

    /// Set the tracked size. Shrinking deletes elements from the top down
    /// and stops just above the highest non-configurable one; in that case
    /// the size ends there and false is returned.
    pub fn set_array_like_size(&mut self, new_size: u32) -> bool {
        if new_size >= self.array_like_size {
            self.array_like_size = new_size;
            return true;
        }
        match &mut self.storage {
            Storage::Simple(packed) => {
                packed.truncate(new_size as usize);
                self.array_like_size = new_size;
                true
            }
            Storage::Generic(map) => {
                let doomed: Vec<u32> = map.range(new_size..).map(|(k, _)| *k).rev().collect();
                for index in doomed {
                    let configurable = map
                        .get(&index)
                        .is_none_or(|e| e.attributes.is_configurable());
                    if !configurable {
                        self.array_like_size = index + 1;
                        return false;
                    }
                    map.remove(&index);
                }
                self.array_like_size = new_size;
                true
            }
        }
    }

    /// Replace every element with a packed run of `values`.
    pub fn set_elements(&mut self, values: Vec<JsValue>) {
        *self = Self::from_values(values);
    }

    /// Report every object referenced by an element.
    pub fn for_each_object(&self, mut f: impl FnMut(&JsObjectRef)) {
        match &self.storage {
            Storage::Simple(packed) => {
                for value in packed {
                    if let JsValue::Object(obj) = value {
                        f(obj);
                    }
                }
            }
            Storage::Generic(map) => {
                for entry in map.values() {
                    entry.value.for_each_object(&mut f);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.storage = Storage::Simple(Vec::new());
        self.array_like_size = 0;
    }

    fn grow_to_cover(&mut self, index: u32) {
        if index >= self.array_like_size {
            self.array_like_size = index.saturating_add(1);
        }
    }

    fn switch_to_generic(&mut self) {
        if let Storage::Simple(packed) = &mut self.storage {
            log::debug!("indexed: switching {} elements to sparse storage", packed.len());
            let map = std::mem::take(packed)
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    (
                        i as u32,
                        ValueAndAttributes {
                            value: PropertyValue::Data(v),
                            attributes: PropertyAttributes::DEFAULT,
                        },
                    )
                })
                .collect();
            self.storage = Storage::Generic(map);
        }
    }
}
