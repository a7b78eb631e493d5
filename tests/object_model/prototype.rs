//! Prototype chains: lookup, receivers, cycles and inline-cache metadata

use super::create_test_realm;
use jsobject::object::{CacheablePropertyMetadata, PropertyLookupPhase};
use jsobject::{
    Gc, JsError, JsValue, PropertyAttributes, PropertyDescriptor, PropertyKey, Realm, RealmConfig,
    ShouldThrowExceptions,
};

#[test]
fn test_inherited_getter_sees_receiver() {
    // B = { get v() { return this.tag } }, A = Object.create(B)
    let mut realm = create_test_realm();
    let b = realm.create_plain_object();
    let tag = PropertyKey::from("tag");
    b.create_data_property_or_throw(&mut realm, &tag, JsValue::from("B"))
        .unwrap();
    let get = realm
        .create_native_function("get v", 0, |realm, this, _| match this {
            JsValue::Object(obj) => {
                let tag = realm.key("tag");
                obj.get(realm, &tag)
            }
            _ => Ok(JsValue::Undefined),
        })
        .unwrap();
    let v = PropertyKey::from("v");
    b.define_property_or_throw(
        &mut realm,
        &v,
        &PropertyDescriptor::accessor(Some(get), None, PropertyAttributes::new(false, true, true)),
    )
    .unwrap();

    let a = realm.create_object(Some(b.clone()));
    a.create_data_property_or_throw(&mut realm, &tag, JsValue::from("A"))
        .unwrap();

    assert!(!a.has_own_property(&mut realm, &v).unwrap());
    assert_eq!(a.get(&mut realm, &v).unwrap(), JsValue::from("A"));
    assert_eq!(b.get(&mut realm, &v).unwrap(), JsValue::from("B"));
}

#[test]
fn test_inherited_setter_sees_receiver() {
    let mut realm = create_test_realm();
    let proto = realm.create_plain_object();
    let set = realm
        .create_native_function("set v", 1, |realm, this, args| {
            if let JsValue::Object(obj) = this {
                let key = realm.key("stored");
                let value = args.first().cloned().unwrap_or_default();
                obj.create_data_property_or_throw(realm, &key, value)?;
            }
            Ok(JsValue::Undefined)
        })
        .unwrap();
    let v = PropertyKey::from("v");
    proto
        .define_property_or_throw(
            &mut realm,
            &v,
            &PropertyDescriptor::accessor(None, Some(set), PropertyAttributes::new(false, false, true)),
        )
        .unwrap();
    let obj = realm.create_object(Some(proto.clone()));
    assert!(obj
        .set(&mut realm, &v, JsValue::Number(5.0), ShouldThrowExceptions::Yes)
        .unwrap());
    let stored = PropertyKey::from("stored");
    assert_eq!(obj.get(&mut realm, &stored).unwrap(), JsValue::Number(5.0));
    assert!(!proto.has_own_property(&mut realm, &stored).unwrap());
    assert!(!obj.has_own_property(&mut realm, &v).unwrap());
}

#[test]
fn test_assignment_shadows_inherited_data_property() {
    let mut realm = create_test_realm();
    let proto = realm.create_plain_object();
    let x = PropertyKey::from("x");
    proto
        .create_data_property_or_throw(&mut realm, &x, JsValue::Number(1.0))
        .unwrap();
    let obj = realm.create_object(Some(proto.clone()));
    obj.set(&mut realm, &x, JsValue::Number(2.0), ShouldThrowExceptions::Yes)
        .unwrap();
    assert_eq!(obj.get(&mut realm, &x).unwrap(), JsValue::Number(2.0));
    assert_eq!(proto.get(&mut realm, &x).unwrap(), JsValue::Number(1.0));

    // A read-only inherited property blocks the assignment
    let ro = PropertyKey::from("ro");
    proto
        .define_property_or_throw(
            &mut realm,
            &ro,
            &PropertyDescriptor::data(JsValue::Null, PropertyAttributes::NONE),
        )
        .unwrap();
    assert!(!obj
        .set(&mut realm, &ro, JsValue::Number(1.0), ShouldThrowExceptions::No)
        .unwrap());
    assert!(!obj.has_own_property(&mut realm, &ro).unwrap());
}

#[test]
fn test_set_prototype_rejects_cycles() {
    let mut realm = create_test_realm();
    let a = realm.create_plain_object();
    let b = realm.create_object(Some(a.clone()));
    let c = realm.create_object(Some(b.clone()));
    assert!(!a.internal_set_prototype_of(&mut realm, Some(c.clone())).unwrap());
    assert!(!a.internal_set_prototype_of(&mut realm, Some(a.clone())).unwrap());
    // Same prototype again is fine
    assert!(c.internal_set_prototype_of(&mut realm, Some(b)).unwrap());
}

#[test]
fn test_set_prototype_on_non_extensible_object() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    obj.internal_prevent_extensions(&mut realm).unwrap();
    let other = realm.create_plain_object();
    assert!(!obj.internal_set_prototype_of(&mut realm, Some(other)).unwrap());
    let current = obj.internal_get_prototype_of(&mut realm).unwrap();
    assert!(obj.internal_set_prototype_of(&mut realm, current).unwrap());
}

#[test]
fn test_object_prototype_is_immutable() {
    let mut realm = create_test_realm();
    let object_prototype = realm.object_prototype();
    let other = realm.create_plain_object();
    assert!(!object_prototype
        .internal_set_prototype_of(&mut realm, Some(other))
        .unwrap());
    assert!(object_prototype.internal_set_prototype_of(&mut realm, None).unwrap());
}

#[test]
fn test_own_lookup_is_cacheable() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let x = PropertyKey::from("x");
    obj.create_data_property_or_throw(&mut realm, &x, JsValue::Number(1.0))
        .unwrap();

    let receiver = JsValue::Object(obj.clone());
    let mut metadata = CacheablePropertyMetadata::default();
    let value = obj
        .internal_get(&mut realm, &x, &receiver, Some(&mut metadata), PropertyLookupPhase::OwnProperty)
        .unwrap();
    assert_eq!(value, JsValue::Number(1.0));
    match metadata {
        CacheablePropertyMetadata::OwnProperty { offset, shape } => {
            assert!(std::rc::Rc::ptr_eq(&shape, &obj.shape()));
            let o = obj.borrow();
            assert_eq!(o.get_direct(offset).and_then(|v| v.as_data()), Some(&JsValue::Number(1.0)));
        }
        other => panic!("expected an own-property hit, got {:?}", other),
    }
}

#[test]
fn test_prototype_lookup_records_holder() {
    let mut realm = create_test_realm();
    let proto = realm.create_plain_object();
    let x = PropertyKey::from("x");
    proto
        .create_data_property_or_throw(&mut realm, &x, JsValue::Number(1.0))
        .unwrap();
    let obj = realm.create_object(Some(proto.clone()));
    let receiver = JsValue::Object(obj.clone());
    let mut metadata = CacheablePropertyMetadata::default();
    obj.internal_get(&mut realm, &x, &receiver, Some(&mut metadata), PropertyLookupPhase::OwnProperty)
        .unwrap();
    match metadata {
        CacheablePropertyMetadata::InPrototypeChain { prototype, .. } => {
            assert!(Gc::ptr_eq(&prototype, &proto));
        }
        other => panic!("expected a prototype-chain hit, got {:?}", other),
    }
}

#[test]
fn test_lookup_for_foreign_receiver_is_not_cacheable() {
    let mut realm = create_test_realm();
    let proto = realm.create_plain_object();
    let obj = realm.create_object(Some(proto.clone()));
    let other = realm.create_plain_object();
    let x = PropertyKey::from("x");
    let y = PropertyKey::from("y");
    obj.create_data_property_or_throw(&mut realm, &x, JsValue::Number(1.0))
        .unwrap();
    proto
        .create_data_property_or_throw(&mut realm, &y, JsValue::Number(2.0))
        .unwrap();

    let receiver = JsValue::Object(other);
    for (key, expected) in [(x, 1.0), (y, 2.0)] {
        let mut metadata = CacheablePropertyMetadata::default();
        let value = obj
            .internal_get(&mut realm, &key, &receiver, Some(&mut metadata), PropertyLookupPhase::OwnProperty)
            .unwrap();
        assert_eq!(value, JsValue::Number(expected));
        assert!(!metadata.is_cacheable(), "{} should not be cacheable", key);
    }
}

#[test]
fn test_accessors_and_indices_are_not_cacheable() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let receiver = JsValue::Object(obj.clone());
    obj.create_data_property_or_throw(&mut realm, &PropertyKey::Index(0), JsValue::Null)
        .unwrap();
    let get = realm
        .create_native_function("get", 0, |_, _, _| Ok(JsValue::Null))
        .unwrap();
    let acc = PropertyKey::from("acc");
    obj.define_property_or_throw(
        &mut realm,
        &acc,
        &PropertyDescriptor::accessor(Some(get), None, PropertyAttributes::DEFAULT),
    )
    .unwrap();

    for key in [PropertyKey::Index(0), acc, PropertyKey::from("missing")] {
        let mut metadata = CacheablePropertyMetadata::default();
        obj.internal_get(&mut realm, &key, &receiver, Some(&mut metadata), PropertyLookupPhase::OwnProperty)
            .unwrap();
        assert!(!metadata.is_cacheable(), "{} should not be cacheable", key);
    }
}

#[test]
fn test_deep_chain_hits_recursion_limit() {
    let config = RealmConfig {
        max_recursion_depth: 16,
        ..RealmConfig::default()
    };
    let mut realm = Realm::with_config(config);
    let mut current = realm.create_plain_object();
    for _ in 0..32 {
        current = realm.create_object(Some(current));
    }
    let err = current.get(&mut realm, &PropertyKey::from("missing")).unwrap_err();
    assert!(err.is_resource_failure());
    assert!(matches!(err, JsError::RecursionLimit { .. }));
    assert_eq!(realm.depth(), 0);

    // A chain within the limit still works
    let mut shallow = realm.create_plain_object();
    for _ in 0..4 {
        shallow = realm.create_object(Some(shallow));
    }
    assert_eq!(
        shallow.get(&mut realm, &PropertyKey::from("missing")).unwrap(),
        JsValue::Undefined
    );
}
