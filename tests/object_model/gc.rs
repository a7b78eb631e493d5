//! Collection of unreachable objects and everything that keeps objects alive

use std::cell::RefCell;
use std::rc::Rc;

use super::create_test_realm;
use jsobject::{JsValue, PropertyKey, Realm, WeakGc};

fn disabled_gc_realm() -> Realm {
    let mut realm = create_test_realm();
    realm.set_gc_threshold(0);
    realm
}

fn link(realm: &mut Realm, from: &jsobject::JsObjectRef, name: &str, to: &jsobject::JsObjectRef) {
    let key = realm.key(name);
    from.create_data_property_or_throw(realm, &key, JsValue::Object(to.clone()))
        .unwrap();
}

fn weak(obj: &jsobject::JsObjectRef) -> WeakGc<jsobject::JsObject> {
    obj.downgrade()
}

#[test]
fn test_unreachable_cycle_is_collected() {
    let mut realm = disabled_gc_realm();
    let (a_weak, b_weak) = {
        let a = realm.create_plain_object();
        let b = realm.create_plain_object();
        link(&mut realm, &a, "other", &b);
        link(&mut realm, &b, "other", &a);
        (weak(&a), weak(&b))
    };
    assert!(a_weak.is_alive());
    let before = realm.gc_stats().live_objects;
    let collected = realm.collect_garbage();
    assert!(collected >= 2);
    assert!(!a_weak.is_alive());
    assert!(!b_weak.is_alive());
    assert!(a_weak.upgrade().is_none());
    assert_eq!(realm.gc_stats().live_objects, before - collected);
}

#[test]
fn test_locals_are_roots() {
    let mut realm = disabled_gc_realm();
    let root = realm.create_plain_object();
    let child_weak = {
        let child = realm.create_plain_object();
        link(&mut realm, &root, "child", &child);
        link(&mut realm, &child, "parent", &root);
        weak(&child)
    };
    realm.collect_garbage();
    assert!(child_weak.is_alive());
    let key = realm.key("child");
    assert!(root.get(&mut realm, &key).unwrap().is_object());
}

#[test]
fn test_prototype_kept_alive_through_shape() {
    let mut realm = disabled_gc_realm();
    let (obj, proto_weak) = {
        let proto = realm.create_plain_object();
        let marker = realm.key("marker");
        proto
            .create_data_property_or_throw(&mut realm, &marker, JsValue::from("proto"))
            .unwrap();
        let obj = realm.create_object(Some(proto.clone()));
        let own = realm.key("own");
        obj.create_data_property_or_throw(&mut realm, &own, JsValue::Null)
            .unwrap();
        (obj, weak(&proto))
    };
    realm.collect_garbage();
    assert!(proto_weak.is_alive());
    let marker = realm.key("marker");
    assert_eq!(obj.get(&mut realm, &marker).unwrap(), JsValue::from("proto"));

    drop(obj);
    realm.collect_garbage();
    assert!(!proto_weak.is_alive());
}

#[test]
fn test_indexed_and_private_values_are_traced() {
    let mut realm = disabled_gc_realm();
    let holder = realm.create_plain_object();
    let name = realm.new_private_name("hidden");
    let (indexed_weak, private_weak) = {
        let indexed = realm.create_plain_object();
        holder
            .create_data_property_or_throw(&mut realm, &PropertyKey::Index(3), JsValue::Object(indexed.clone()))
            .unwrap();
        let private = realm.create_plain_object();
        holder
            .private_field_add(name.clone(), JsValue::Object(private.clone()))
            .unwrap();
        // Close a cycle through each
        link(&mut realm, &indexed, "back", &holder);
        link(&mut realm, &private, "back", &holder);
        (weak(&indexed), weak(&private))
    };
    realm.collect_garbage();
    assert!(indexed_weak.is_alive());
    assert!(private_weak.is_alive());
    assert!(holder.private_get(&mut realm, &name).unwrap().is_object());

    drop(holder);
    realm.collect_garbage();
    assert!(!indexed_weak.is_alive());
    assert!(!private_weak.is_alive());
}

#[test]
fn test_proxy_and_arguments_trace_their_parts() {
    let mut realm = disabled_gc_realm();
    let (proxy, target_weak) = {
        let target = realm.create_plain_object();
        let handler = realm.create_plain_object();
        let proxy = realm
            .create_proxy(&JsValue::Object(target.clone()), &JsValue::Object(handler))
            .unwrap();
        (proxy, weak(&target))
    };
    let callee = realm
        .create_native_function("f", 1, |_, _, _| Ok(JsValue::Undefined))
        .unwrap();
    let (arguments, cell_weak) = {
        let in_cell = realm.create_plain_object();
        let cells = Rc::new(RefCell::new(vec![JsValue::Object(in_cell.clone())]));
        let names = [jsobject::JsString::from("x")];
        let arguments = realm
            .create_mapped_arguments(&callee, &names, cells, &[JsValue::Object(in_cell.clone())])
            .unwrap();
        (arguments, weak(&in_cell))
    };
    realm.collect_garbage();
    assert!(target_weak.is_alive());
    assert!(cell_weak.is_alive());
    assert!(arguments
        .get(&mut realm, &PropertyKey::Index(0))
        .unwrap()
        .is_object());

    jsobject::exotic::proxy::revoke_proxy(&proxy);
    realm.collect_garbage();
    assert!(!target_weak.is_alive());
}

#[test]
fn test_guard_roots_objects() {
    let mut realm = disabled_gc_realm();
    let guard = realm.create_guard();
    let guarded_weak = {
        let obj = realm.create_plain_object();
        let other = realm.create_plain_object();
        link(&mut realm, &obj, "other", &other);
        link(&mut realm, &other, "other", &obj);
        guard.guard(&obj);
        weak(&obj)
    };
    realm.collect_garbage();
    assert!(guarded_weak.is_alive());
    assert_eq!(guard.len(), 1);

    let obj = guarded_weak.upgrade().unwrap();
    assert!(guard.unguard(&obj));
    drop(obj);
    realm.collect_garbage();
    assert!(!guarded_weak.is_alive());
    assert!(guard.is_empty());
}

#[test]
fn test_automatic_collection_counts_cycles() {
    let mut realm = create_test_realm();
    realm.set_gc_threshold(4);
    let start = realm.gc_stats();
    for _ in 0..20 {
        let a = realm.create_plain_object();
        let b = realm.create_plain_object();
        link(&mut realm, &a, "b", &b);
        link(&mut realm, &b, "a", &a);
    }
    let stats = realm.gc_stats();
    assert!(stats.collections > start.collections);
    assert_eq!(stats.allocated_total, start.allocated_total + 40);
    realm.collect_garbage();
    assert_eq!(realm.gc_stats().live_objects, start.live_objects);
}

#[test]
fn test_dropping_long_property_chain_frees_every_link() {
    let mut realm = disabled_gc_realm();
    let before = realm.gc_stats().live_objects;
    let tail_weak = {
        let tail = realm.create_plain_object();
        let tail_weak = weak(&tail);
        let mut head = tail;
        for _ in 0..50_000 {
            let next = realm.create_plain_object();
            link(&mut realm, &next, "next", &head);
            head = next;
        }
        assert_eq!(realm.gc_stats().live_objects, before + 50_001);
        tail_weak
    };
    assert!(!tail_weak.is_alive());
    assert_eq!(realm.gc_stats().live_objects, before);
    assert_eq!(realm.collect_garbage(), 0);
}

#[test]
fn test_dropping_long_prototype_chain_frees_every_link() {
    let mut realm = disabled_gc_realm();
    let before = realm.gc_stats().live_objects;
    let base_weak = {
        let base = realm.create_plain_object();
        let base_weak = weak(&base);
        let mut leaf = base;
        for _ in 0..50_000 {
            leaf = realm.create_object(Some(leaf));
        }
        assert_eq!(realm.gc_stats().live_objects, before + 50_001);
        base_weak
    };
    assert!(!base_weak.is_alive());
    assert_eq!(realm.gc_stats().live_objects, before);
}
