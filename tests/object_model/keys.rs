//! [[OwnPropertyKeys]] ordering and for-in enumeration

use super::{create_test_realm, key_strings};
use jsobject::{JsValue, PropertyKey, ShouldThrowExceptions};

#[test]
fn test_own_keys_order() {
    // { b: 1, 2: 'x', a: 2, 0: 'y', [sym]: 3 }
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let sym = realm.new_symbol(Some("sym"));
    let entries = [
        (PropertyKey::from("b"), JsValue::Number(1.0)),
        (PropertyKey::from("2"), JsValue::from("x")),
        (PropertyKey::from("a"), JsValue::Number(2.0)),
        (PropertyKey::from("0"), JsValue::from("y")),
        (PropertyKey::Symbol(sym.clone()), JsValue::Number(3.0)),
    ];
    for (key, value) in entries {
        obj.create_data_property_or_throw(&mut realm, &key, value).unwrap();
    }

    let keys = obj.own_property_keys(&mut realm).unwrap();
    assert_eq!(
        keys,
        vec![
            PropertyKey::Index(0),
            PropertyKey::Index(2),
            PropertyKey::from("b"),
            PropertyKey::from("a"),
            PropertyKey::Symbol(sym),
        ]
    );
    assert_eq!(key_strings(&mut realm, &obj), ["0", "2", "b", "a", "Symbol(sym)"]);
}

#[test]
fn test_strings_and_symbols_keep_insertion_order() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    let s1 = realm.new_symbol(Some("first"));
    let s2 = realm.new_symbol(Some("second"));
    for key in [
        PropertyKey::Symbol(s2.clone()),
        PropertyKey::from("z"),
        PropertyKey::Symbol(s1.clone()),
        PropertyKey::from("m"),
        PropertyKey::from("4294967295"),
    ] {
        obj.create_data_property_or_throw(&mut realm, &key, JsValue::Null).unwrap();
    }
    assert_eq!(
        key_strings(&mut realm, &obj),
        ["z", "m", "4294967295", "Symbol(second)", "Symbol(first)"]
    );
}

#[test]
fn test_reinsertion_after_delete_moves_key_to_end() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    for name in ["a", "b", "c"] {
        obj.create_data_property_or_throw(&mut realm, &PropertyKey::from(name), JsValue::Null)
            .unwrap();
    }
    let a = PropertyKey::from("a");
    obj.internal_delete(&mut realm, &a).unwrap();
    obj.set(&mut realm, &a, JsValue::Null, ShouldThrowExceptions::Yes).unwrap();
    assert_eq!(key_strings(&mut realm, &obj), ["b", "c", "a"]);
}

#[test]
fn test_for_in_walks_prototypes_without_duplicates() {
    let mut realm = create_test_realm();
    let proto = realm.create_plain_object();
    for name in ["shadowed", "inherited", "1"] {
        proto
            .create_data_property_or_throw(&mut realm, &PropertyKey::from(name), JsValue::Null)
            .unwrap();
    }
    let hidden = PropertyKey::from("hidden");
    proto
        .create_non_enumerable_data_property_or_throw(&mut realm, &hidden, JsValue::Null)
        .unwrap();

    let obj = realm.create_object(Some(proto));
    for name in ["own", "shadowed", "0"] {
        obj.create_data_property_or_throw(&mut realm, &PropertyKey::from(name), JsValue::Null)
            .unwrap();
    }
    // A non-enumerable own property still shadows an inherited one
    let masked = PropertyKey::from("inherited");
    obj.create_non_enumerable_data_property_or_throw(&mut realm, &masked, JsValue::Null)
        .unwrap();

    let mut seen = Vec::new();
    obj.enumerate_object_properties(&mut realm, |_, key| {
        seen.push(key.to_js_string().to_string());
        Ok(())
    })
    .unwrap();
    assert_eq!(seen, ["0", "own", "shadowed", "1"]);
}

#[test]
fn test_for_in_callback_error_stops_walk() {
    let mut realm = create_test_realm();
    let obj = realm.create_plain_object();
    for name in ["a", "b", "c"] {
        obj.create_data_property_or_throw(&mut realm, &PropertyKey::from(name), JsValue::Null)
            .unwrap();
    }
    let mut count = 0;
    let result = obj.enumerate_object_properties(&mut realm, |_, _| {
        count += 1;
        if count == 2 {
            return Err(jsobject::JsError::Break { label: None });
        }
        Ok(())
    });
    assert!(matches!(result, Err(jsobject::JsError::Break { label: None })));
    assert_eq!(count, 2);
}
