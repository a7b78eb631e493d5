//! Bound function objects.
//!
//! Property access on a bound function is ordinary; only calling differs,
//! and that is handled by [`Realm::call`](crate::realm::Realm::call).

use crate::value::{JsObjectRef, JsValue};

pub struct BoundFunctionData {
    /// [[BoundTargetFunction]]
    pub target: JsObjectRef,
    /// [[BoundThis]]
    pub bound_this: JsValue,
    /// [[BoundArguments]], prepended to every call's arguments
    pub bound_args: Vec<JsValue>,
}

impl BoundFunctionData {
    /// The innermost function a chain of bound functions forwards to
    pub fn innermost_target(&self) -> JsObjectRef {
        let mut target = self.target.clone();
        loop {
            let next = match &target.borrow().kind {
                crate::object::ObjectKind::BoundFunction(data) => data.target.clone(),
                _ => break,
            };
            target = next;
        }
        target
    }
}
