//! Hidden classes (shapes) for named-property layout.
//!
//! A shape maps each named property key to a storage slot and its attributes,
//! and carries the object's prototype. Every shape holds its full cumulative
//! table, so lookup is one hash probe and never walks ancestors.
//!
//! Shared shapes are published to a transition tree and never change after
//! that (apart from the intrinsic-accessor flag). Objects that add the same
//! keys with the same attributes in the same order end up on the same `Rc`.
//! Dictionary shapes are private to one object and are edited in place; an
//! object enters dictionary mode on delete, on attribute change and when its
//! shared shape would grow past the configured limit.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use super::property_attributes::PropertyAttributes;
use crate::gc::WeakRegistry;
use crate::object::JsObject;
use crate::value::{JsObjectRef, PropertyKey};

/// Where a named property lives and how it behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyMetadata {
    pub offset: u32,
    pub attributes: PropertyAttributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Published in a transition tree, immutable
    Shared,
    /// Owned by exactly one object, edited in place
    Dictionary,
}

type PropertyTable = IndexMap<PropertyKey, PropertyMetadata, FxBuildHasher>;

pub struct Shape {
    kind: ShapeKind,
    /// Only dictionary shapes ever take a mutable borrow
    table: RefCell<PropertyTable>,
    prototype: RefCell<Option<JsObjectRef>>,
    /// Child shapes keyed by the (key, attributes) that was added
    transitions: RefCell<FxHashMap<(PropertyKey, PropertyAttributes), Weak<Shape>>>,
    /// Same table, different prototype
    prototype_transitions: RefCell<WeakRegistry<JsObject, Weak<Shape>>>,
    null_prototype_transition: RefCell<Weak<Shape>>,
    /// Shape this one was transitioned from. Keeps a family's tree rooted
    /// while any descendant is in use.
    parent: Option<Rc<Shape>>,
    /// Set once some object on this shape holds a deferred built-in value
    has_intrinsic_accessors: Cell<bool>,
    /// Private copy made for an object that serves as a prototype
    is_prototype_shape: bool,
}

impl Shape {
    fn build(
        kind: ShapeKind,
        table: PropertyTable,
        prototype: Option<JsObjectRef>,
        is_prototype_shape: bool,
        parent: Option<Rc<Shape>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            kind,
            table: RefCell::new(table),
            prototype: RefCell::new(prototype),
            transitions: RefCell::new(FxHashMap::default()),
            prototype_transitions: RefCell::new(WeakRegistry::new()),
            null_prototype_transition: RefCell::new(Weak::new()),
            parent,
            has_intrinsic_accessors: Cell::new(false),
            is_prototype_shape,
        })
    }

    /// A new empty shared shape: the root of one object family.
    pub fn new_root(prototype: Option<JsObjectRef>) -> Rc<Self> {
        Self::build(ShapeKind::Shared, PropertyTable::default(), prototype, false, None)
    }

    /// An empty shape with no prototype that belongs to no family. Reclaimed
    /// objects are parked on one.
    pub fn new_detached() -> Rc<Self> {
        Self::build(ShapeKind::Dictionary, PropertyTable::default(), None, false, None)
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn is_dictionary(&self) -> bool {
        self.kind == ShapeKind::Dictionary
    }

    pub fn is_prototype_shape(&self) -> bool {
        self.is_prototype_shape
    }

    #[inline]
    pub fn lookup(&self, key: &PropertyKey) -> Option<PropertyMetadata> {
        self.table.borrow().get(key).copied()
    }

    /// Number of storage slots an object with this shape needs
    pub fn property_count(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn prototype(&self) -> Option<JsObjectRef> {
        self.prototype.borrow().clone()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.table.borrow().keys().cloned().collect()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> Vec<(PropertyKey, PropertyMetadata)> {
        self.table
            .borrow()
            .iter()
            .map(|(k, m)| (k.clone(), *m))
            .collect()
    }

    pub fn parent(&self) -> Option<&Rc<Shape>> {
        self.parent.as_ref()
    }

    pub fn has_intrinsic_accessors(&self) -> bool {
        self.has_intrinsic_accessors.get()
    }

    pub fn set_has_intrinsic_accessors(&self) {
        self.has_intrinsic_accessors.set(true);
    }

    /// Child shape with `key` appended. Reuses a live child created by an
    /// earlier identical transition.
    ///
    /// On a dictionary shape the key is added in place and the same shape is
    /// returned.
    pub fn add_transition(self: &Rc<Self>, key: PropertyKey, attributes: PropertyAttributes) -> Rc<Shape> {
        if self.is_dictionary() {
            self.dictionary_add(key, attributes);
            return Rc::clone(self);
        }

        let cache_key = (key, attributes);
        if let Some(existing) = self
            .transitions
            .borrow()
            .get(&cache_key)
            .and_then(Weak::upgrade)
        {
            log::trace!("shape: reusing transition for {}", cache_key.0);
            return existing;
        }

        let mut table = self.table.borrow().clone();
        let offset = table.len() as u32;
        table.insert(cache_key.0.clone(), PropertyMetadata { offset, attributes });
        let child = Self::build(
            ShapeKind::Shared,
            table,
            self.prototype(),
            false,
            Some(Rc::clone(self)),
        );
        log::trace!(
            "shape: new transition for {} (slot {})",
            cache_key.0,
            offset
        );
        self.transitions
            .borrow_mut()
            .insert(cache_key, Rc::downgrade(&child));
        child
    }

    /// A private copy of this shape's table and prototype
    pub fn fork_to_dictionary(&self) -> Rc<Shape> {
        log::debug!(
            "shape: forking {} properties to dictionary mode",
            self.property_count()
        );
        let shape = Self::build(
            ShapeKind::Dictionary,
            self.table.borrow().clone(),
            self.prototype(),
            self.is_prototype_shape,
            None,
        );
        if self.has_intrinsic_accessors() {
            shape.set_has_intrinsic_accessors();
        }
        shape
    }

    /// A shared shape outside every transition tree, for an object about to
    /// become some other object's prototype. Transitions taken from it stay
    /// out of the trees ordinary instances use.
    pub fn fork_for_prototype(&self) -> Rc<Shape> {
        let shape = Self::build(
            self.kind,
            self.table.borrow().clone(),
            self.prototype(),
            true,
            None,
        );
        if self.has_intrinsic_accessors() {
            shape.set_has_intrinsic_accessors();
        }
        shape
    }

    /// Shape with the same table and a different prototype. Dictionary
    /// shapes are updated in place.
    pub fn with_prototype(self: &Rc<Self>, prototype: Option<JsObjectRef>) -> Rc<Shape> {
        if self.is_dictionary() {
            *self.prototype.borrow_mut() = prototype;
            return Rc::clone(self);
        }

        let cached = match &prototype {
            Some(proto) => self
                .prototype_transitions
                .borrow()
                .get(proto)
                .and_then(Weak::upgrade),
            None => self.null_prototype_transition.borrow().upgrade(),
        };
        if let Some(shape) = cached {
            return shape;
        }

        log::debug!("shape: prototype transition");
        let shape = Self::build(
            ShapeKind::Shared,
            self.table.borrow().clone(),
            prototype.clone(),
            self.is_prototype_shape,
            None,
        );
        match &prototype {
            Some(proto) => {
                let mut registry = self.prototype_transitions.borrow_mut();
                registry.prune();
                registry.insert(proto, Rc::downgrade(&shape));
            }
            None => *self.null_prototype_transition.borrow_mut() = Rc::downgrade(&shape),
        }
        shape
    }

    /// Append a key to a dictionary shape. Returns the new slot.
    pub fn dictionary_add(&self, key: PropertyKey, attributes: PropertyAttributes) -> u32 {
        debug_assert!(self.is_dictionary());
        let mut table = self.table.borrow_mut();
        let offset = table.len() as u32;
        table.insert(key, PropertyMetadata { offset, attributes });
        offset
    }

    /// Remove a key from a dictionary shape. Slots above the removed one move
    /// down by one, so the owner must remove the same slot from its storage.
    pub fn dictionary_remove(&self, key: &PropertyKey) -> Option<PropertyMetadata> {
        debug_assert!(self.is_dictionary());
        let mut table = self.table.borrow_mut();
        let removed = table.shift_remove(key)?;
        for meta in table.values_mut() {
            if meta.offset > removed.offset {
                meta.offset -= 1;
            }
        }
        Some(removed)
    }

    /// Change the attributes of an existing key of a dictionary shape.
    pub fn dictionary_reconfigure(&self, key: &PropertyKey, attributes: PropertyAttributes) -> bool {
        debug_assert!(self.is_dictionary());
        match self.table.borrow_mut().get_mut(key) {
            Some(meta) => {
                meta.attributes = attributes;
                true
            }
            None => false,
        }
    }

    /// Live children in the transition cache (diagnostics)
    pub fn live_transition_count(&self) -> usize {
        self.transitions
            .borrow()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("kind", &self.kind)
            .field("property_count", &self.property_count())
            .field("prototype", &self.prototype.borrow().as_ref().map(|p| p.id()))
            .finish()
    }
}
