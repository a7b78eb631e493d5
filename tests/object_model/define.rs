//! [[DefineOwnProperty]], [[Delete]] and the "or throw" wrappers

use std::rc::Rc;

use super::{create_test_realm, data};
use jsobject::{JsError, JsValue, PropertyAttributes, PropertyDescriptor, PropertyKey};

#[test]
fn test_identical_redefinition_is_a_no_op() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let key = PropertyKey::from("x");
    let desc = data(JsValue::Number(1.0), true, true, true);
    assert!(obj.internal_define_own_property(&mut realm, &key, &desc, None).unwrap());
    let shape = obj.shape();

    for _ in 0..3 {
        assert!(obj.internal_define_own_property(&mut realm, &key, &desc, None).unwrap());
    }
    assert!(Rc::ptr_eq(&obj.shape(), &shape));
    assert_eq!(
        obj.internal_get_own_property(&mut realm, &key).unwrap(),
        Some(desc)
    );
}

#[test]
fn test_identical_redefinition_of_frozen_property_succeeds() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let key = PropertyKey::from("x");
    let desc = data(JsValue::Number(1.0), false, true, false);
    obj.define_property_or_throw(&mut realm, &key, &desc).unwrap();
    assert!(obj.internal_define_own_property(&mut realm, &key, &desc, None).unwrap());
    // An empty descriptor is always accepted
    let empty = PropertyDescriptor::default();
    assert!(obj.internal_define_own_property(&mut realm, &key, &empty, None).unwrap());
}

#[test]
fn test_non_configurable_property_rejects_delete_and_redefine() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let key = PropertyKey::from("x");
    let desc = data(JsValue::Number(1.0), false, true, false);
    obj.define_property_or_throw(&mut realm, &key, &desc).unwrap();

    assert!(!obj.internal_delete(&mut realm, &key).unwrap());
    assert_eq!(obj.get(&mut realm, &key).unwrap(), JsValue::Number(1.0));

    let change_value = PropertyDescriptor::value_only(JsValue::Number(2.0));
    assert!(!obj
        .internal_define_own_property(&mut realm, &key, &change_value, None)
        .unwrap());
    let err = obj
        .define_property_or_throw(&mut realm, &key, &change_value)
        .unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));

    let make_configurable = PropertyDescriptor {
        configurable: Some(true),
        ..Default::default()
    };
    assert!(!obj
        .internal_define_own_property(&mut realm, &key, &make_configurable, None)
        .unwrap());

    let err = obj.delete_property_or_throw(&mut realm, &key).unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));
    assert_eq!(obj.get(&mut realm, &key).unwrap(), JsValue::Number(1.0));
}

#[test]
fn test_non_configurable_writable_can_become_read_only() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let key = PropertyKey::from("x");
    obj.define_property_or_throw(&mut realm, &key, &data(JsValue::Null, true, false, false))
        .unwrap();
    let value = PropertyDescriptor::value_only(JsValue::Number(5.0));
    assert!(obj.internal_define_own_property(&mut realm, &key, &value, None).unwrap());
    let read_only = PropertyDescriptor {
        writable: Some(false),
        ..Default::default()
    };
    assert!(obj.internal_define_own_property(&mut realm, &key, &read_only, None).unwrap());
    let writable_again = PropertyDescriptor {
        writable: Some(true),
        ..Default::default()
    };
    assert!(!obj
        .internal_define_own_property(&mut realm, &key, &writable_again, None)
        .unwrap());
    assert_eq!(obj.get(&mut realm, &key).unwrap(), JsValue::Number(5.0));
}

#[test]
fn test_converting_data_to_accessor_and_back() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let key = PropertyKey::from("x");
    obj.create_data_property_or_throw(&mut realm, &key, JsValue::Number(1.0))
        .unwrap();

    let get = realm
        .create_native_function("get", 0, |_, _, _| Ok(JsValue::from("from getter")))
        .unwrap();
    let accessor = PropertyDescriptor {
        get: Some(Some(get)),
        ..Default::default()
    };
    obj.define_property_or_throw(&mut realm, &key, &accessor).unwrap();
    let desc = obj.internal_get_own_property(&mut realm, &key).unwrap().unwrap();
    assert!(desc.is_accessor_descriptor());
    assert_eq!(desc.set, Some(None));
    assert_eq!(desc.enumerable, Some(true));
    assert_eq!(obj.get(&mut realm, &key).unwrap(), JsValue::from("from getter"));

    let back = PropertyDescriptor::value_only(JsValue::Number(3.0));
    obj.define_property_or_throw(&mut realm, &key, &back).unwrap();
    let desc = obj.internal_get_own_property(&mut realm, &key).unwrap().unwrap();
    assert_eq!(desc.writable, Some(false));
    assert_eq!(desc.value, Some(JsValue::Number(3.0)));
}

#[test]
fn test_define_on_non_extensible_object() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let existing = PropertyKey::from("existing");
    obj.create_data_property_or_throw(&mut realm, &existing, JsValue::Null)
        .unwrap();
    assert!(obj.internal_prevent_extensions(&mut realm).unwrap());
    assert!(!obj.internal_is_extensible(&mut realm).unwrap());

    let fresh = PropertyKey::from("fresh");
    assert!(!obj.create_data_property(&mut realm, &fresh, JsValue::Null).unwrap());
    assert!(!obj
        .create_data_property(&mut realm, &PropertyKey::Index(0), JsValue::Null)
        .unwrap());
    // Existing properties can still change
    assert!(obj
        .create_data_property(&mut realm, &existing, JsValue::Number(1.0))
        .unwrap());
}

#[test]
fn test_from_value_rejects_mixed_descriptor() {
    let mut realm = create_test_realm();
    let desc_obj = realm.create_plain_object();
    let value_key = realm.key("value");
    let get_key = realm.key("get");
    desc_obj
        .create_data_property_or_throw(&mut realm, &value_key, JsValue::Null)
        .unwrap();
    desc_obj
        .create_data_property_or_throw(&mut realm, &get_key, JsValue::Undefined)
        .unwrap();
    let err = PropertyDescriptor::from_value(&mut realm, &JsValue::Object(desc_obj)).unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));
}

#[test]
fn test_descriptor_object_round_trip() {
    let mut realm = create_test_realm();
    let desc = data(JsValue::from("v"), true, false, true);
    let obj = desc.to_object(&mut realm).unwrap();
    let back = PropertyDescriptor::from_value(&mut realm, &JsValue::Object(obj)).unwrap();
    assert_eq!(back, desc);
}

#[test]
fn test_define_direct_property_skips_validation() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let key = PropertyKey::from("fixed");
    obj.define_property_or_throw(&mut realm, &key, &data(JsValue::Null, false, false, false))
        .unwrap();
    obj.define_direct_property(&realm, &key, JsValue::Number(9.0), PropertyAttributes::DEFAULT)
        .unwrap();
    let desc = obj.internal_get_own_property(&mut realm, &key).unwrap().unwrap();
    assert_eq!(desc, data(JsValue::Number(9.0), true, true, true));
}
