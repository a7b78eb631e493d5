//! Immutable prototype exotic objects (Object.prototype is one).

use crate::error::JsResult;
use crate::object::InternalMethods;
use crate::realm::Realm;
use crate::value::JsObjectRef;

pub struct ImmutablePrototypeMethods;

impl InternalMethods for ImmutablePrototypeMethods {
    fn internal_set_prototype_of(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        proto: Option<JsObjectRef>,
    ) -> JsResult<bool> {
        obj.set_immutable_prototype(realm, proto)
    }
}
