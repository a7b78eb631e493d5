//! Shape sharing, transitions and dictionary mode

use std::rc::Rc;

use super::create_test_realm;
use jsobject::{JsValue, PropertyKey, RealmConfig, Realm, ShouldThrowExceptions};

#[test]
fn test_identical_transitions_share_shape() {
    let mut realm = create_test_realm();
    let a = realm.create_plain_object();
    let b = realm.create_plain_object();
    assert!(Rc::ptr_eq(&a.shape(), &b.shape()));

    for (name, n) in [("x", 1.0), ("y", 2.0)] {
        let key = PropertyKey::from(name);
        a.create_data_property_or_throw(&mut realm, &key, JsValue::Number(n))
            .unwrap();
        b.create_data_property_or_throw(&mut realm, &key, JsValue::Number(n * 10.0))
            .unwrap();
    }
    assert!(Rc::ptr_eq(&a.shape(), &b.shape()));
    assert!(!a.shape().is_dictionary());
}

#[test]
fn test_different_order_gives_different_shapes() {
    let mut realm = create_test_realm();
    let a = realm.create_plain_object();
    let b = realm.create_plain_object();
    let x = PropertyKey::from("x");
    let y = PropertyKey::from("y");
    a.create_data_property_or_throw(&mut realm, &x, JsValue::Null).unwrap();
    a.create_data_property_or_throw(&mut realm, &y, JsValue::Null).unwrap();
    b.create_data_property_or_throw(&mut realm, &y, JsValue::Null).unwrap();
    b.create_data_property_or_throw(&mut realm, &x, JsValue::Null).unwrap();
    assert!(!Rc::ptr_eq(&a.shape(), &b.shape()));
}

#[test]
fn test_delete_isolates_object_in_dictionary_mode() {
    let mut realm = create_test_realm();
    let a = realm.create_plain_object();
    let b = realm.create_plain_object();
    let x = PropertyKey::from("x");
    let y = PropertyKey::from("y");
    for obj in [&a, &b] {
        obj.create_data_property_or_throw(&mut realm, &x, JsValue::Number(1.0))
            .unwrap();
        obj.create_data_property_or_throw(&mut realm, &y, JsValue::Number(2.0))
            .unwrap();
    }
    let shared = b.shape();

    assert!(a.internal_delete(&mut realm, &x).unwrap());
    assert!(a.shape().is_dictionary());
    assert!(!Rc::ptr_eq(&a.shape(), &shared));

    // The other object is untouched
    assert!(Rc::ptr_eq(&b.shape(), &shared));
    assert!(!shared.is_dictionary());
    assert_eq!(b.get(&mut realm, &x).unwrap(), JsValue::Number(1.0));
    assert_eq!(b.get(&mut realm, &y).unwrap(), JsValue::Number(2.0));

    // Slots after the removed one were renumbered
    assert_eq!(a.get(&mut realm, &y).unwrap(), JsValue::Number(2.0));
    assert!(!a.has_own_property(&mut realm, &x).unwrap());
}

#[test]
fn test_attribute_change_forks_dictionary() {
    let mut realm = create_test_realm();
    let a = realm.create_plain_object();
    let b = realm.create_plain_object();
    let x = PropertyKey::from("x");
    a.create_data_property_or_throw(&mut realm, &x, JsValue::Null).unwrap();
    b.create_data_property_or_throw(&mut realm, &x, JsValue::Null).unwrap();

    let desc = jsobject::PropertyDescriptor {
        enumerable: Some(false),
        ..Default::default()
    };
    a.define_property_or_throw(&mut realm, &x, &desc).unwrap();
    assert!(a.shape().is_dictionary());
    let a_desc = a.internal_get_own_property(&mut realm, &x).unwrap().unwrap();
    assert_eq!(a_desc.enumerable, Some(false));
    let b_desc = b.internal_get_own_property(&mut realm, &x).unwrap().unwrap();
    assert_eq!(b_desc.enumerable, Some(true));
}

#[test]
fn test_dictionary_after_shared_property_limit() {
    let config = RealmConfig {
        max_shared_shape_properties: 4,
        ..RealmConfig::default()
    };
    let mut realm = Realm::with_config(config);
    let obj = realm.create_plain_object();
    for i in 0..4 {
        let key = PropertyKey::from(format!("p{}", i));
        obj.set(&mut realm, &key, JsValue::Number(i as f64), ShouldThrowExceptions::Yes)
            .unwrap();
    }
    assert!(!obj.shape().is_dictionary());
    let key = PropertyKey::from("p4");
    obj.set(&mut realm, &key, JsValue::Number(4.0), ShouldThrowExceptions::Yes)
        .unwrap();
    assert!(obj.shape().is_dictionary());
    for i in 0..5 {
        let key = PropertyKey::from(format!("p{}", i));
        assert_eq!(obj.get(&mut realm, &key).unwrap(), JsValue::Number(i as f64));
    }
}

#[test]
fn test_dictionary_shape_is_never_reshared() {
    let mut realm = create_test_realm();
    let a = realm.create_plain_object();
    let b = realm.create_plain_object();
    let x = PropertyKey::from("x");
    let y = PropertyKey::from("y");
    for obj in [&a, &b] {
        obj.create_data_property_or_throw(&mut realm, &x, JsValue::Null).unwrap();
        obj.internal_delete(&mut realm, &x).unwrap();
        obj.create_data_property_or_throw(&mut realm, &y, JsValue::Null).unwrap();
    }
    assert!(a.shape().is_dictionary());
    assert!(b.shape().is_dictionary());
    assert!(!Rc::ptr_eq(&a.shape(), &b.shape()));
}

#[test]
fn test_indexed_keys_do_not_touch_shape() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let before = obj.shape();
    for i in 0..10u32 {
        obj.create_data_property_or_throw(&mut realm, &PropertyKey::from(i), JsValue::from(i))
            .unwrap();
    }
    assert!(Rc::ptr_eq(&obj.shape(), &before));
    assert!(obj.borrow().indexed().is_simple_storage());

    // A gap switches to sparse storage, which stays ordered
    obj.create_data_property_or_throw(&mut realm, &PropertyKey::from(1_000_000u32), JsValue::Null)
        .unwrap();
    assert!(!obj.borrow().indexed().is_simple_storage());
    let keys = obj.own_property_keys(&mut realm).unwrap();
    assert_eq!(keys.len(), 11);
    assert_eq!(keys.last(), Some(&PropertyKey::Index(1_000_000)));
}

#[test]
fn test_prototype_change_keeps_own_properties() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let key = PropertyKey::from("own");
    obj.create_data_property_or_throw(&mut realm, &key, JsValue::Number(1.0))
        .unwrap();
    let proto = realm.create_plain_object();
    let inherited = PropertyKey::from("inherited");
    proto
        .create_data_property_or_throw(&mut realm, &inherited, JsValue::Number(2.0))
        .unwrap();

    assert!(obj.internal_set_prototype_of(&mut realm, Some(proto.clone())).unwrap());
    assert_eq!(obj.get(&mut realm, &key).unwrap(), JsValue::Number(1.0));
    assert_eq!(obj.get(&mut realm, &inherited).unwrap(), JsValue::Number(2.0));
    assert!(proto.shape().is_prototype_shape());
}
