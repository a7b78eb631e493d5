//! Inline-cache feed for property lookups.
//!
//! [[Get]] and [[Set]] optionally report where they found a property so the
//! interpreter can skip the lookup next time it sees the same shape.

use std::rc::Rc;

use super::shape::Shape;
use crate::value::JsObjectRef;

/// Which leg of a lookup an internal method is serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyLookupPhase {
    /// Looking at the receiver itself
    OwnProperty,
    /// Walking the receiver's prototypes
    PrototypeChain,
}

/// Where a property resolved, if the result may be reused.
#[derive(Debug, Clone, Default)]
pub enum CacheablePropertyMetadata {
    /// Accessors, indexed keys, dictionary shapes, deferred built-ins and
    /// exotic lookups
    #[default]
    NotCacheable,
    /// A data property in the receiver's own storage
    OwnProperty { offset: u32, shape: Rc<Shape> },
    /// A data property in storage of `prototype`, which had `shape`
    InPrototypeChain {
        offset: u32,
        shape: Rc<Shape>,
        prototype: JsObjectRef,
    },
}

impl CacheablePropertyMetadata {
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, CacheablePropertyMetadata::NotCacheable)
    }

    /// Record a hit in `holder`'s storage, whose shape is `shape`.
    pub(crate) fn record(
        slot: Option<&mut Self>,
        phase: PropertyLookupPhase,
        offset: u32,
        shape: &Rc<Shape>,
        holder: &JsObjectRef,
    ) {
        let Some(slot) = slot else {
            return;
        };
        if shape.is_dictionary() || shape.has_intrinsic_accessors() {
            *slot = CacheablePropertyMetadata::NotCacheable;
            return;
        }
        *slot = match phase {
            PropertyLookupPhase::OwnProperty => CacheablePropertyMetadata::OwnProperty {
                offset,
                shape: Rc::clone(shape),
            },
            PropertyLookupPhase::PrototypeChain => CacheablePropertyMetadata::InPrototypeChain {
                offset,
                shape: Rc::clone(shape),
                prototype: holder.clone(),
            },
        };
    }

    pub(crate) fn clear(slot: Option<&mut Self>) {
        if let Some(slot) = slot {
            *slot = CacheablePropertyMetadata::NotCacheable;
        }
    }
}
