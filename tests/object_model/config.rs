//! Realm configuration and the limits it controls

use jsobject::{JsError, JsValue, PropertyKey, Realm, RealmConfig};

#[test]
fn test_from_json_overrides_limits() {
    let config = RealmConfig::from_json(
        r#"{"gc_threshold": 0, "max_recursion_depth": 4, "max_shared_shape_properties": 2}"#,
    )
    .unwrap();
    assert_eq!(config.gc_threshold, 0);
    assert_eq!(config.max_recursion_depth, 4);
    assert_eq!(config.max_shared_shape_properties, 2);

    let err = RealmConfig::from_json("not json").unwrap_err();
    assert!(matches!(err, JsError::RangeError { .. }));
}

#[test]
fn test_from_env_uses_gc_threshold() {
    let config = RealmConfig::from_env();
    let expected = std::env::var("GC_THRESHOLD")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(RealmConfig::default().gc_threshold);
    assert_eq!(config.gc_threshold, expected);
    assert_eq!(config.max_recursion_depth, RealmConfig::default().max_recursion_depth);
}

#[test]
fn test_shared_shape_limit_switches_to_dictionary() {
    let config = RealmConfig {
        max_shared_shape_properties: 3,
        ..RealmConfig::default()
    };
    let mut realm = Realm::with_config(config);
    let obj = realm.create_plain_object();
    for name in ["a", "b", "c"] {
        obj.create_data_property_or_throw(&mut realm, &PropertyKey::from(name), JsValue::Null)
            .unwrap();
    }
    assert!(!obj.shape().is_dictionary());
    obj.create_data_property_or_throw(&mut realm, &PropertyKey::from("d"), JsValue::Null)
        .unwrap();
    assert!(obj.shape().is_dictionary());
    assert_eq!(obj.shape().property_count(), 4);
}

#[test]
fn test_recursion_limit_is_configurable() {
    let config = RealmConfig::from_json(r#"{"max_recursion_depth": 3}"#).unwrap();
    let mut realm = Realm::with_config(config);
    assert_eq!(realm.config().max_recursion_depth, 3);

    let f = realm
        .create_native_function("recurse", 0, |realm, this, args| {
            let callee = args.first().cloned().unwrap_or_default();
            realm.call(&callee, this, args)
        })
        .unwrap();
    let callee = JsValue::Object(f);
    let err = realm
        .call(&callee, JsValue::Undefined, &[callee.clone()])
        .unwrap_err();
    assert!(matches!(err, JsError::RecursionLimit { depth: 3 }));
    assert_eq!(realm.depth(), 0);
}
