//! Proxy exotic objects.
//!
//! Every internal method looks up the matching trap on the handler. Without
//! a trap the operation is forwarded to the target; with one, the trap's
//! answer is checked against the target so a proxy can never report
//! something the target's non-configurable properties or non-extensibility
//! rule out.

use std::cell::Cell;

use rustc_hash::FxHashSet;

use crate::error::{JsError, JsResult};
use crate::gc::WeakGc;
use crate::object::cache::{CacheablePropertyMetadata, PropertyLookupPhase};
use crate::object::operations::to_number;
use crate::object::ordinary::{is_compatible_property_descriptor, same_object};
use crate::object::{InternalMethods, JsObject, ObjectKind, PropertyDescriptor};
use crate::realm::Realm;
use crate::value::{JsObjectRef, JsValue, PropertyKey};

pub struct ProxyData {
    /// [[ProxyTarget]], `None` once revoked
    pub target: Option<JsObjectRef>,
    /// [[ProxyHandler]], `None` once revoked
    pub handler: Option<JsObjectRef>,
    /// Whether the target was callable at creation
    pub is_callable: bool,
}

impl ProxyData {
    pub fn is_revoked(&self) -> bool {
        self.handler.is_none()
    }
}

fn revoked(trap: &str) -> JsError {
    JsError::type_error(format!(
        "Cannot perform '{}' on a proxy that has been revoked",
        trap
    ))
}

fn invariant(trap: &str, detail: &str) -> JsError {
    JsError::type_error(format!("'{}' on proxy: {}", trap, detail))
}

/// Target and handler, or a TypeError naming `trap` if revoked
fn proxy_parts(obj: &JsObjectRef, trap: &str) -> JsResult<(JsObjectRef, JsObjectRef)> {
    match &obj.borrow().kind {
        ObjectKind::Proxy(ProxyData {
            target: Some(target),
            handler: Some(handler),
            ..
        }) => Ok((target.clone(), handler.clone())),
        _ => Err(revoked(trap)),
    }
}

fn get_trap(realm: &mut Realm, handler: &JsObjectRef, name: &str) -> JsResult<Option<JsValue>> {
    let key = realm.key(name);
    handler.get_method(realm, &key)
}

fn call_trap(
    realm: &mut Realm,
    trap: &JsValue,
    handler: &JsObjectRef,
    args: &[JsValue],
) -> JsResult<JsValue> {
    realm.call(trap, JsValue::Object(handler.clone()), args)
}

pub struct ProxyMethods;

impl InternalMethods for ProxyMethods {
    fn internal_get_prototype_of(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
    ) -> JsResult<Option<JsObjectRef>> {
        let (target, handler) = proxy_parts(obj, "getPrototypeOf")?;
        let Some(trap) = get_trap(realm, &handler, "getPrototypeOf")? else {
            return realm.nested(|realm| target.internal_get_prototype_of(realm));
        };
        let result = call_trap(realm, &trap, &handler, &[JsValue::Object(target.clone())])?;
        let proto = match result {
            JsValue::Object(o) => Some(o),
            JsValue::Null => None,
            _ => {
                return Err(invariant(
                    "getPrototypeOf",
                    "trap returned neither object nor null",
                ));
            }
        };
        if target.internal_is_extensible(realm)? {
            return Ok(proto);
        }
        let target_proto = target.internal_get_prototype_of(realm)?;
        if !same_object(proto.as_ref(), target_proto.as_ref()) {
            return Err(invariant(
                "getPrototypeOf",
                "proxy target is non-extensible but the trap did not return its actual prototype",
            ));
        }
        Ok(proto)
    }

    fn internal_set_prototype_of(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        proto: Option<JsObjectRef>,
    ) -> JsResult<bool> {
        let (target, handler) = proxy_parts(obj, "setPrototypeOf")?;
        let Some(trap) = get_trap(realm, &handler, "setPrototypeOf")? else {
            return realm.nested(|realm| target.internal_set_prototype_of(realm, proto));
        };
        let args = [JsValue::Object(target.clone()), JsValue::from(proto.clone())];
        if !call_trap(realm, &trap, &handler, &args)?.to_boolean() {
            return Ok(false);
        }
        if target.internal_is_extensible(realm)? {
            return Ok(true);
        }
        let target_proto = target.internal_get_prototype_of(realm)?;
        if !same_object(proto.as_ref(), target_proto.as_ref()) {
            return Err(invariant(
                "setPrototypeOf",
                "trap returned truish for setting a new prototype on the non-extensible proxy target",
            ));
        }
        Ok(true)
    }

    fn internal_is_extensible(&self, realm: &mut Realm, obj: &JsObjectRef) -> JsResult<bool> {
        let (target, handler) = proxy_parts(obj, "isExtensible")?;
        let Some(trap) = get_trap(realm, &handler, "isExtensible")? else {
            return realm.nested(|realm| target.internal_is_extensible(realm));
        };
        let result = call_trap(realm, &trap, &handler, &[JsValue::Object(target.clone())])?
            .to_boolean();
        if result != target.internal_is_extensible(realm)? {
            return Err(invariant(
                "isExtensible",
                "trap result does not reflect extensibility of proxy target",
            ));
        }
        Ok(result)
    }

    fn internal_prevent_extensions(&self, realm: &mut Realm, obj: &JsObjectRef) -> JsResult<bool> {
        let (target, handler) = proxy_parts(obj, "preventExtensions")?;
        let Some(trap) = get_trap(realm, &handler, "preventExtensions")? else {
            return realm.nested(|realm| target.internal_prevent_extensions(realm));
        };
        let result = call_trap(realm, &trap, &handler, &[JsValue::Object(target.clone())])?
            .to_boolean();
        if result && target.internal_is_extensible(realm)? {
            return Err(invariant(
                "preventExtensions",
                "trap returned truish but the proxy target is extensible",
            ));
        }
        Ok(result)
    }

    fn internal_get_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        const TRAP: &str = "getOwnPropertyDescriptor";
        let (target, handler) = proxy_parts(obj, TRAP)?;
        let Some(trap) = get_trap(realm, &handler, TRAP)? else {
            return realm.nested(|realm| target.internal_get_own_property(realm, key));
        };
        let args = [JsValue::Object(target.clone()), key.to_value()];
        let result = call_trap(realm, &trap, &handler, &args)?;
        if !result.is_object() && !result.is_undefined() {
            return Err(invariant(
                TRAP,
                &format!("trap returned neither object nor undefined for property '{}'", key),
            ));
        }

        let target_desc = target.internal_get_own_property(realm, key)?;
        if result.is_undefined() {
            let Some(target_desc) = target_desc else {
                return Ok(None);
            };
            if target_desc.configurable == Some(false) {
                return Err(invariant(
                    TRAP,
                    &format!(
                        "trap returned undefined for property '{}' which is non-configurable in the proxy target",
                        key
                    ),
                ));
            }
            if !target.internal_is_extensible(realm)? {
                return Err(invariant(
                    TRAP,
                    &format!(
                        "trap returned undefined for property '{}' which exists in the non-extensible proxy target",
                        key
                    ),
                ));
            }
            return Ok(None);
        }

        let extensible_target = target.internal_is_extensible(realm)?;
        let mut result_desc = PropertyDescriptor::from_value(realm, &result)?;
        result_desc.complete();
        if !is_compatible_property_descriptor(
            realm,
            extensible_target,
            &result_desc,
            target_desc.as_ref(),
        )? {
            return Err(invariant(
                TRAP,
                &format!(
                    "trap returned descriptor for property '{}' that is incompatible with the existing property in the proxy target",
                    key
                ),
            ));
        }
        if result_desc.configurable == Some(false) {
            let target_configurable = target_desc.as_ref().and_then(|d| d.configurable);
            if target_configurable != Some(false) {
                return Err(invariant(
                    TRAP,
                    &format!(
                        "trap reported non-configurability for property '{}' which is either non-existent or configurable in the proxy target",
                        key
                    ),
                ));
            }
            let target_writable = target_desc.as_ref().and_then(|d| d.writable);
            if result_desc.writable == Some(false) && target_writable == Some(true) {
                return Err(invariant(
                    TRAP,
                    &format!(
                        "trap reported non-configurable and writable for property '{}' which is non-configurable, non-writable in the proxy target",
                        key
                    ),
                ));
            }
        }
        Ok(Some(result_desc))
    }

    fn internal_define_own_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        _precomputed: Option<Option<PropertyDescriptor>>,
    ) -> JsResult<bool> {
        let (target, handler) = proxy_parts(obj, "defineProperty")?;
        let Some(trap) = get_trap(realm, &handler, "defineProperty")? else {
            return realm.nested(|realm| target.internal_define_own_property(realm, key, desc, None));
        };
        let desc_obj = desc.to_object(realm)?;
        let args = [
            JsValue::Object(target.clone()),
            key.to_value(),
            JsValue::Object(desc_obj),
        ];
        if !call_trap(realm, &trap, &handler, &args)?.to_boolean() {
            return Ok(false);
        }

        let target_desc = target.internal_get_own_property(realm, key)?;
        let extensible_target = target.internal_is_extensible(realm)?;
        let setting_config_false = desc.configurable == Some(false);
        match target_desc {
            None => {
                if !extensible_target {
                    return Err(invariant(
                        "defineProperty",
                        &format!(
                            "trap returned truish for adding property '{}' to the non-extensible proxy target",
                            key
                        ),
                    ));
                }
                if setting_config_false {
                    return Err(invariant(
                        "defineProperty",
                        &format!(
                            "trap returned truish for defining non-configurable property '{}' which is non-existent in the proxy target",
                            key
                        ),
                    ));
                }
            }
            Some(target_desc) => {
                if !is_compatible_property_descriptor(realm, extensible_target, desc, Some(&target_desc))? {
                    return Err(invariant(
                        "defineProperty",
                        &format!(
                            "trap returned truish for adding property '{}' that is incompatible with the existing property in the proxy target",
                            key
                        ),
                    ));
                }
                if setting_config_false && target_desc.configurable == Some(true) {
                    return Err(invariant(
                        "defineProperty",
                        &format!(
                            "trap returned truish for defining non-configurable property '{}' which is configurable in the proxy target",
                            key
                        ),
                    ));
                }
                if target_desc.is_data_descriptor()
                    && target_desc.configurable == Some(false)
                    && target_desc.writable == Some(true)
                    && desc.writable == Some(false)
                {
                    return Err(invariant(
                        "defineProperty",
                        &format!(
                            "trap returned truish for defining non-configurable property '{}' which cannot be non-writable, unless there exists a corresponding non-configurable, non-writable own property of the target object",
                            key
                        ),
                    ));
                }
            }
        }
        Ok(true)
    }

    fn internal_has_property(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
    ) -> JsResult<bool> {
        let (target, handler) = proxy_parts(obj, "has")?;
        let Some(trap) = get_trap(realm, &handler, "has")? else {
            return realm.nested(|realm| target.internal_has_property(realm, key));
        };
        let args = [JsValue::Object(target.clone()), key.to_value()];
        let result = call_trap(realm, &trap, &handler, &args)?.to_boolean();
        if !result && let Some(target_desc) = target.internal_get_own_property(realm, key)? {
            if target_desc.configurable == Some(false) {
                return Err(invariant(
                    "has",
                    &format!(
                        "trap returned falsish for property '{}' which exists in the proxy target as non-configurable",
                        key
                    ),
                ));
            }
            if !target.internal_is_extensible(realm)? {
                return Err(invariant(
                    "has",
                    &format!(
                        "trap returned falsish for property '{}' but the proxy target is not extensible",
                        key
                    ),
                ));
            }
        }
        Ok(result)
    }

    fn internal_get(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        receiver: &JsValue,
        metadata: Option<&mut CacheablePropertyMetadata>,
        _phase: PropertyLookupPhase,
    ) -> JsResult<JsValue> {
        CacheablePropertyMetadata::clear(metadata);
        let (target, handler) = proxy_parts(obj, "get")?;
        let Some(trap) = get_trap(realm, &handler, "get")? else {
            return realm.nested(|realm| {
                target.internal_get(realm, key, receiver, None, PropertyLookupPhase::OwnProperty)
            });
        };
        let args = [JsValue::Object(target.clone()), key.to_value(), receiver.clone()];
        let value = call_trap(realm, &trap, &handler, &args)?;

        if let Some(target_desc) = target.internal_get_own_property(realm, key)?
            && target_desc.configurable == Some(false)
        {
            if target_desc.is_data_descriptor()
                && target_desc.writable == Some(false)
                && !value.same_value(target_desc.value.as_ref().unwrap_or(&JsValue::Undefined))
            {
                return Err(invariant(
                    "get",
                    &format!(
                        "property '{}' is a read-only and non-configurable data property on the proxy target but the proxy did not return its actual value",
                        key
                    ),
                ));
            }
            if target_desc.is_accessor_descriptor()
                && target_desc.get.clone().flatten().is_none()
                && !value.is_undefined()
            {
                return Err(invariant(
                    "get",
                    &format!(
                        "property '{}' is a non-configurable accessor property on the proxy target and does not have a getter function, but the trap did not return 'undefined'",
                        key
                    ),
                ));
            }
        }
        Ok(value)
    }

    fn internal_set(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
        metadata: Option<&mut CacheablePropertyMetadata>,
        _phase: PropertyLookupPhase,
    ) -> JsResult<bool> {
        CacheablePropertyMetadata::clear(metadata);
        let (target, handler) = proxy_parts(obj, "set")?;
        let Some(trap) = get_trap(realm, &handler, "set")? else {
            return realm.nested(|realm| {
                target.internal_set(realm, key, value, receiver, None, PropertyLookupPhase::OwnProperty)
            });
        };
        let args = [
            JsValue::Object(target.clone()),
            key.to_value(),
            value.clone(),
            receiver.clone(),
        ];
        if !call_trap(realm, &trap, &handler, &args)?.to_boolean() {
            return Ok(false);
        }

        if let Some(target_desc) = target.internal_get_own_property(realm, key)?
            && target_desc.configurable == Some(false)
        {
            if target_desc.is_data_descriptor()
                && target_desc.writable == Some(false)
                && !value.same_value(target_desc.value.as_ref().unwrap_or(&JsValue::Undefined))
            {
                return Err(invariant(
                    "set",
                    &format!(
                        "trap returned truish for property '{}' which exists in the proxy target as a non-configurable and non-writable data property with a different value",
                        key
                    ),
                ));
            }
            if target_desc.is_accessor_descriptor() && target_desc.set.clone().flatten().is_none() {
                return Err(invariant(
                    "set",
                    &format!(
                        "trap returned truish for property '{}' which exists in the proxy target as a non-configurable and non-writable accessor property without a setter",
                        key
                    ),
                ));
            }
        }
        Ok(true)
    }

    fn internal_delete(&self, realm: &mut Realm, obj: &JsObjectRef, key: &PropertyKey) -> JsResult<bool> {
        let (target, handler) = proxy_parts(obj, "deleteProperty")?;
        let Some(trap) = get_trap(realm, &handler, "deleteProperty")? else {
            return realm.nested(|realm| target.internal_delete(realm, key));
        };
        let args = [JsValue::Object(target.clone()), key.to_value()];
        if !call_trap(realm, &trap, &handler, &args)?.to_boolean() {
            return Ok(false);
        }
        let Some(target_desc) = target.internal_get_own_property(realm, key)? else {
            return Ok(true);
        };
        if target_desc.configurable == Some(false) {
            return Err(invariant(
                "deleteProperty",
                &format!(
                    "trap returned truish for property '{}' which is non-configurable in the proxy target",
                    key
                ),
            ));
        }
        if !target.internal_is_extensible(realm)? {
            return Err(invariant(
                "deleteProperty",
                &format!(
                    "trap returned truish for property '{}' but the proxy target is non-extensible",
                    key
                ),
            ));
        }
        Ok(true)
    }

    fn internal_own_property_keys(
        &self,
        realm: &mut Realm,
        obj: &JsObjectRef,
    ) -> JsResult<Vec<PropertyKey>> {
        let (target, handler) = proxy_parts(obj, "ownKeys")?;
        let Some(trap) = get_trap(realm, &handler, "ownKeys")? else {
            return realm.nested(|realm| target.internal_own_property_keys(realm));
        };
        let result = call_trap(realm, &trap, &handler, &[JsValue::Object(target.clone())])?;
        let trap_result = property_key_list(realm, &result)?;

        let extensible_target = target.internal_is_extensible(realm)?;
        let target_keys = target.internal_own_property_keys(realm)?;
        let mut configurable_keys = Vec::new();
        let mut nonconfigurable_keys = Vec::new();
        for key in target_keys {
            match target.internal_get_own_property(realm, &key)? {
                Some(desc) if desc.configurable == Some(false) => nonconfigurable_keys.push(key),
                _ => configurable_keys.push(key),
            }
        }
        if extensible_target && nonconfigurable_keys.is_empty() {
            return Ok(trap_result);
        }

        let mut unchecked: FxHashSet<&PropertyKey> = trap_result.iter().collect();
        for key in &nonconfigurable_keys {
            if !unchecked.remove(key) {
                return Err(invariant(
                    "ownKeys",
                    &format!("trap result did not include '{}'", key),
                ));
            }
        }
        if extensible_target {
            return Ok(trap_result);
        }
        for key in &configurable_keys {
            if !unchecked.remove(key) {
                return Err(invariant(
                    "ownKeys",
                    &format!("trap result did not include '{}'", key),
                ));
            }
        }
        if !unchecked.is_empty() {
            return Err(invariant(
                "ownKeys",
                "trap returned extra keys but proxy target is non-extensible",
            ));
        }
        Ok(trap_result)
    }

    fn has_ordinary_get_prototype_of(&self) -> bool {
        false
    }

    fn has_ordinary_get_own_property(&self) -> bool {
        false
    }
}

/// CreateListFromArrayLike restricted to strings and symbols, rejecting
/// duplicates.
fn property_key_list(realm: &mut Realm, value: &JsValue) -> JsResult<Vec<PropertyKey>> {
    let JsValue::Object(list) = value else {
        return Err(JsError::type_error("CreateListFromArrayLike called on non-object"));
    };
    let length_key = realm.key("length");
    let length_value = list.get(realm, &length_key)?;
    let length = to_length(to_number(realm, &length_value)?);

    let mut keys = Vec::new();
    let mut seen = FxHashSet::default();
    for index in 0..length {
        let element = list.get(realm, &PropertyKey::from_value(&JsValue::Number(index as f64)))?;
        if !matches!(element, JsValue::String(_) | JsValue::Symbol(_)) {
            return Err(JsError::type_error(format!(
                "{} is not a valid property name",
                element.to_js_string()
            )));
        }
        let key = PropertyKey::from_value(&element);
        if !seen.insert(key.clone()) {
            return Err(invariant(
                "ownKeys",
                &format!("trap returned duplicate entries ('{}')", key),
            ));
        }
        keys.push(key);
    }
    Ok(keys)
}

/// ToLength on an already converted number
fn to_length(n: f64) -> u64 {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    n.trunc().min(MAX_SAFE_INTEGER) as u64
}

/// [[Call]] of a callable proxy
pub(crate) fn proxy_call(
    realm: &mut Realm,
    obj: &JsObjectRef,
    this: JsValue,
    args: &[JsValue],
) -> JsResult<JsValue> {
    let (target, handler) = proxy_parts(obj, "apply")?;
    let Some(trap) = get_trap(realm, &handler, "apply")? else {
        return realm.call(&JsValue::Object(target), this, args);
    };
    let args_array = realm.create_array(args.to_vec());
    let trap_args = [JsValue::Object(target), this, JsValue::Object(args_array)];
    call_trap(realm, &trap, &handler, &trap_args)
}

impl Realm {
    /// ProxyCreate
    pub fn create_proxy(&mut self, target: &JsValue, handler: &JsValue) -> JsResult<JsObjectRef> {
        let (JsValue::Object(target), JsValue::Object(handler)) = (target, handler) else {
            return Err(JsError::type_error(
                "Cannot create proxy with a non-object as target or handler",
            ));
        };
        let is_callable = target.borrow().is_callable();
        let kind = ObjectKind::Proxy(ProxyData {
            target: Some(target.clone()),
            handler: Some(handler.clone()),
            is_callable,
        });
        Ok(self.create_object_of_kind(None, kind))
    }

    /// Proxy.revocable: the proxy and a function that revokes it. Calling
    /// the function again does nothing.
    pub fn create_revocable_proxy(
        &mut self,
        target: &JsValue,
        handler: &JsValue,
    ) -> JsResult<(JsObjectRef, JsObjectRef)> {
        let proxy = self.create_proxy(target, handler)?;
        let slot: Cell<Option<WeakGc<JsObject>>> = Cell::new(Some(proxy.downgrade()));
        let revoke = self.create_native_function("", 0, move |_realm, _this, _args| {
            if let Some(proxy) = slot.take().and_then(|weak| weak.upgrade()) {
                revoke_proxy(&proxy);
            }
            Ok(JsValue::Undefined)
        })?;
        Ok((proxy, revoke))
    }
}

/// Drop the target and handler. Every later operation on the proxy throws.
pub fn revoke_proxy(proxy: &JsObjectRef) {
    if let ObjectKind::Proxy(data) = &mut proxy.borrow_mut().kind {
        log::debug!("proxy: revoking #{}", proxy.id());
        data.target = None;
        data.handler = None;
    }
}
