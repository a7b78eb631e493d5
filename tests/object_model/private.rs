//! Class private elements

use super::create_test_realm;
use jsobject::object::{ClassElementName, ClassFieldDefinition, PrivateElement};
use jsobject::{JsError, JsValue, PropertyKey};

#[test]
fn test_duplicate_private_field_is_an_error() {
    let mut realm = create_test_realm();
    let name = realm.new_private_name("x");
    let a = realm.create_plain_object();
    let b = realm.create_plain_object();

    a.private_field_add(name.clone(), JsValue::Number(1.0)).unwrap();
    let err = a
        .private_field_add(name.clone(), JsValue::Number(2.0))
        .unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));
    assert_eq!(a.private_get(&mut realm, &name).unwrap(), JsValue::Number(1.0));

    // Another instance is independent
    b.private_field_add(name.clone(), JsValue::Number(2.0)).unwrap();
    assert_eq!(b.private_get(&mut realm, &name).unwrap(), JsValue::Number(2.0));
    assert_eq!(a.private_element_count(), 1);
}

#[test]
fn test_same_description_different_names() {
    let mut realm = create_test_realm();
    let first = realm.new_private_name("x");
    let second = realm.new_private_name("x");
    let obj = realm.create_plain_object();
    obj.private_field_add(first.clone(), JsValue::from("first")).unwrap();
    obj.private_field_add(second.clone(), JsValue::from("second")).unwrap();
    assert_eq!(obj.private_get(&mut realm, &first).unwrap(), JsValue::from("first"));
    assert_eq!(obj.private_get(&mut realm, &second).unwrap(), JsValue::from("second"));
}

#[test]
fn test_private_elements_are_invisible_to_property_access() {
    let mut realm = create_test_realm();
    let name = realm.new_private_name("secret");
    let obj = realm.create_plain_object();
    obj.private_field_add(name, JsValue::Number(1.0)).unwrap();
    assert!(obj.own_property_keys(&mut realm).unwrap().is_empty());
    let by_string = PropertyKey::from("#secret");
    assert!(!obj.has_property(&mut realm, &by_string).unwrap());
}

#[test]
fn test_private_set_rules() {
    let mut realm = create_test_realm();
    let field = realm.new_private_name("field");
    let method = realm.new_private_name("method");
    let getter_only = realm.new_private_name("getterOnly");
    let missing = realm.new_private_name("missing");

    let obj = realm.create_plain_object();
    obj.private_field_add(field.clone(), JsValue::Number(1.0)).unwrap();
    let f = realm
        .create_native_function("method", 0, |_, _, _| Ok(JsValue::Undefined))
        .unwrap();
    obj.private_method_or_accessor_add(PrivateElement::method(method.clone(), f))
        .unwrap();
    let get = realm
        .create_native_function("get", 0, |_, _, _| Ok(JsValue::from("got")))
        .unwrap();
    obj.private_method_or_accessor_add(PrivateElement::accessor(getter_only.clone(), Some(get), None))
        .unwrap();

    obj.private_set(&mut realm, &field, JsValue::Number(2.0)).unwrap();
    assert_eq!(obj.private_get(&mut realm, &field).unwrap(), JsValue::Number(2.0));

    assert!(obj.private_set(&mut realm, &method, JsValue::Null).is_err());
    assert!(obj.private_get(&mut realm, &method).unwrap().is_callable());

    assert_eq!(
        obj.private_get(&mut realm, &getter_only).unwrap(),
        JsValue::from("got")
    );
    assert!(obj.private_set(&mut realm, &getter_only, JsValue::Null).is_err());

    assert!(obj.private_get(&mut realm, &missing).is_err());
    assert!(obj.private_set(&mut realm, &missing, JsValue::Null).is_err());
}

#[test]
fn test_private_accessor_receives_instance() {
    let mut realm = create_test_realm();
    let backing = realm.new_private_name("backing");
    let value = realm.new_private_name("value");
    let obj = realm.create_plain_object();
    obj.private_field_add(backing.clone(), JsValue::Number(0.0)).unwrap();

    let read = backing.clone();
    let get = realm
        .create_native_function("get", 0, move |realm, this, _| match this {
            JsValue::Object(o) => o.private_get(realm, &read),
            _ => Ok(JsValue::Undefined),
        })
        .unwrap();
    let write = backing.clone();
    let set = realm
        .create_native_function("set", 1, move |realm, this, args| {
            if let JsValue::Object(o) = this {
                let n = args.first().map(JsValue::to_number).unwrap_or(0.0);
                o.private_set(realm, &write, JsValue::Number(n * 2.0))?;
            }
            Ok(JsValue::Undefined)
        })
        .unwrap();
    obj.private_method_or_accessor_add(PrivateElement::accessor(value.clone(), Some(get), Some(set)))
        .unwrap();

    obj.private_set(&mut realm, &value, JsValue::Number(21.0)).unwrap();
    assert_eq!(obj.private_get(&mut realm, &value).unwrap(), JsValue::Number(42.0));
    assert_eq!(obj.private_get(&mut realm, &backing).unwrap(), JsValue::Number(42.0));
}

#[test]
fn test_initialize_instance_elements() {
    let mut realm = create_test_realm();
    let method = realm.new_private_name("m");
    let count = realm.new_private_name("count");
    let m = realm
        .create_native_function("m", 0, |_, _, _| Ok(JsValue::Undefined))
        .unwrap();
    let init = realm
        .create_native_function("init", 0, |_, _, _| Ok(JsValue::Number(10.0)))
        .unwrap();
    let methods = vec![PrivateElement::method(method.clone(), m)];
    let fields = vec![
        ClassFieldDefinition {
            name: ClassElementName::Private(count.clone()),
            initializer: Some(init),
        },
        ClassFieldDefinition {
            name: ClassElementName::Public(PropertyKey::from("label")),
            initializer: None,
        },
    ];

    let a = realm.create_plain_object();
    a.initialize_instance_elements(&mut realm, &methods, &fields).unwrap();
    assert_eq!(a.private_get(&mut realm, &count).unwrap(), JsValue::Number(10.0));
    assert!(a.private_element_find(&method).is_some());
    let label = PropertyKey::from("label");
    assert!(a.has_own_property(&mut realm, &label).unwrap());
    assert_eq!(a.get(&mut realm, &label).unwrap(), JsValue::Undefined);

    // Running the initializers twice on one instance is a TypeError
    let err = a
        .initialize_instance_elements(&mut realm, &methods, &fields)
        .unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));
}
